//! Command dispatch: composition, serialization, and fan-out.
//!
//! All outbound traffic funnels through [`CommandDispatcher::send`], which
//! trims the command text, records it when a recording session is active,
//! and applies the debug-log filter. Transport failures are caught and
//! logged at this boundary; the convenience [`CommandDispatcher::dispatch`]
//! never propagates them.

use std::sync::Arc;

use gateway::{should_log, BackendGateway, ExecuteOptions, NotificationSender};
use shared::{
    domain::{Extent, ModelBounds, Point},
    error::GatewayError,
    protocol::{Command, KeyPayload, Notification, ReplayEntry, ResultValue},
};

use crate::recorder::CommandRecorder;
use crate::vocabulary::CanvasOp;

/// Form values for creating a variable or constant on the canvas. The form
/// itself is an external collaborator; it validates fields and hands the
/// result here for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableForm {
    pub name: String,
    pub var_type: String,
    pub init_value: String,
    pub units: String,
    pub rotation: f64,
    pub tooltip: String,
    /// Local names are stored without the leading `:` that marks globals.
    pub local: bool,
}

impl VariableForm {
    /// Applies the global/local naming convention: global names carry a
    /// leading `:`, local names never do.
    pub fn normalized_name(&self) -> String {
        if self.local {
            self.name.strip_prefix(':').unwrap_or(&self.name).to_string()
        } else if self.name.starts_with(':') {
            self.name.clone()
        } else {
            format!(":{}", self.name)
        }
    }
}

pub struct CommandDispatcher {
    gateway: Arc<dyn BackendGateway>,
    notifications: NotificationSender,
    recorder: Arc<CommandRecorder>,
}

impl CommandDispatcher {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        notifications: NotificationSender,
        recorder: Arc<CommandRecorder>,
    ) -> Self {
        Self {
            gateway,
            notifications,
            recorder,
        }
    }

    pub fn recorder(&self) -> &CommandRecorder {
        &self.recorder
    }

    /// The single serialization point: trims, records, logs, transmits.
    pub async fn send(&self, command: &Command) -> Result<ResultValue, GatewayError> {
        let text = command.text.trim();
        self.recorder.record(text);
        if should_log(text) {
            tracing::debug!(command = text, render = command.expects_render, "dispatch");
        }
        self.gateway
            .execute(
                text,
                ExecuteOptions {
                    render: command.expects_render,
                },
            )
            .await
    }

    pub async fn execute(&self, op: &CanvasOp) -> Result<ResultValue, GatewayError> {
        self.send(&op.to_command()).await
    }

    /// Fire-and-forget dispatch: a failure is logged and treated as a no-op.
    pub async fn dispatch(&self, op: &CanvasOp) -> Option<ResultValue> {
        match self.execute(op).await {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!(command = op.path(), %err, "command dispatch failed");
                None
            }
        }
    }

    /// Replays one recorded command verbatim.
    pub async fn replay(&self, entry: &ReplayEntry) -> Result<ResultValue, GatewayError> {
        self.send(&Command::new(entry.command.clone(), true)).await
    }

    pub fn key_press_probe(&self, payload: &KeyPayload) -> Result<bool, GatewayError> {
        self.gateway.key_press_probe(payload)
    }

    pub fn notify(&self, notification: Notification) {
        self.notifications.send(notification);
    }

    /// Zoom about a centre point, then force a repaint.
    pub async fn zoom(&self, centre: Point, factor: f64) {
        self.dispatch(&CanvasOp::Zoom {
            x: centre.x,
            y: centre.y,
            factor,
        })
        .await;
        self.dispatch(&CanvasOp::RequestRedraw).await;
    }

    /// Fits the model bounds into the given canvas extent and recentres.
    /// Returns the applied zoom factor, or None when the bounds are
    /// degenerate or unavailable.
    pub async fn zoom_to_fit(&self, canvas: Extent) -> Option<f64> {
        let bounds = self.dispatch(&CanvasOp::ModelBounds).await?;
        let bounds = ModelBounds::from_slice(bounds.as_numbers()?)?;
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return None;
        }

        let factor = (canvas.width / bounds.width()).min(canvas.height / bounds.height());
        let centre = bounds.centre();
        self.dispatch(&CanvasOp::Zoom {
            x: centre.x,
            y: centre.y,
            factor,
        })
        .await;
        self.dispatch(&CanvasOp::Recentre).await;
        self.dispatch(&CanvasOp::RequestRedraw).await;
        Some(factor)
    }

    /// Returns the view to unit zoom about the given centre.
    pub async fn reset_zoom(&self, centre: Point) {
        let zoom_factor = self
            .dispatch(&CanvasOp::ZoomFactor)
            .await
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        if zoom_factor > 0.0 {
            let rel_zoom = self
                .dispatch(&CanvasOp::RelZoom)
                .await
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            // A relative zoom of 0 would zoom by infinity; treat it as 1.
            let rel_zoom = if rel_zoom == 0.0 { 1.0 } else { rel_zoom };
            self.dispatch(&CanvasOp::Zoom {
                x: centre.x,
                y: centre.y,
                factor: 1.0 / rel_zoom,
            })
            .await;
        } else {
            self.dispatch(&CanvasOp::SetZoom { factor: 1.0 }).await;
        }

        self.dispatch(&CanvasOp::Recentre).await;
        self.dispatch(&CanvasOp::RequestRedraw).await;
    }

    /// Creates a variable as an ordered sequence of single-field commands.
    ///
    /// The sequence is best-effort, not atomic: a failure skips the
    /// remaining steps and leaves the backend partially updated. No rollback
    /// is attempted.
    pub async fn create_variable(&self, form: &VariableForm) -> Result<(), GatewayError> {
        let steps = [
            CanvasOp::AddVariable {
                name: form.normalized_name(),
                var_type: form.var_type.clone(),
            },
            CanvasOp::ItemInit {
                value: form.init_value.clone(),
            },
            CanvasOp::ItemUnits {
                units: form.units.clone(),
            },
            CanvasOp::ItemAdjustSliderBounds,
            CanvasOp::ItemRotation {
                degrees: form.rotation,
            },
            CanvasOp::ItemTooltip {
                text: form.tooltip.clone(),
            },
        ];

        for (index, step) in steps.iter().enumerate() {
            if let Err(err) = self.execute(step).await {
                tracing::error!(
                    step = index,
                    command = step.path(),
                    %err,
                    "create-variable sequence aborted; backend left partially updated"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    pub async fn create_constant(&self, value: &str) -> Result<(), GatewayError> {
        self.create_variable(&VariableForm {
            name: value.to_string(),
            var_type: "constant".to_string(),
            init_value: value.to_string(),
            units: String::new(),
            rotation: 0.0,
            tooltip: String::new(),
            local: true,
        })
        .await
    }

    pub async fn add_operation(&self, name: &str) {
        self.dispatch(&CanvasOp::AddOperation {
            name: name.to_string(),
        })
        .await;
    }

    /// Applies a new canvas background colour; the shell learns about it
    /// through a notification once the backend has accepted it.
    pub async fn set_background_color(&self, color: &str) {
        let applied = self
            .dispatch(&CanvasOp::SetBackgroundColor {
                color: color.to_string(),
            })
            .await
            .is_some();
        if applied {
            self.dispatch(&CanvasOp::RequestRedraw).await;
            self.notify(Notification::BackgroundColorChanged {
                color: color.to_string(),
            });
        }
    }

    pub async fn add_note(&self, text: &str) {
        self.dispatch(&CanvasOp::AddNote {
            text: text.to_string(),
        })
        .await;
    }

    pub async fn available_operations(&self) -> Vec<String> {
        self.dispatch(&CanvasOp::AvailableOperations)
            .await
            .and_then(|v| v.as_texts().map(<[String]>::to_vec))
            .unwrap_or_default()
    }
}
