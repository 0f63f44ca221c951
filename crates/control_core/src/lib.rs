//! Control core: turns raw input and playback timers into backend commands,
//! and reconciles backend responses back into observable state.

use std::sync::Arc;

use gateway::{BackendGateway, NotificationSender};
use shared::protocol::{KeyPayload, Notification, ReplayEntry, ToolbarAction};

pub mod dispatcher;
pub mod interpreter;
pub mod playback;
pub mod recorder;
pub mod view;
pub mod vocabulary;

pub use dispatcher::{CommandDispatcher, VariableForm};
pub use interpreter::{
    classify_text_entry, EventInterpreter, Intent, PointerEvent, PointerEventKind, TextEntryAction,
    WheelEvent,
};
pub use playback::{delay_for_speed, PlaybackController, PlaybackState};
pub use recorder::CommandRecorder;
pub use view::{ContainerGeometry, FixedSurface, SurfaceGeometry, ViewTransform};
pub use vocabulary::{CanvasOp, ZOOM_IN_FACTOR, ZOOM_OUT_FACTOR};

/// One interactive session over a primary surface: the view transform, the
/// event interpreter, and the playback controller, sharing one dispatcher.
pub struct ControlSession {
    dispatcher: Arc<CommandDispatcher>,
    view: ViewTransform,
    interpreter: EventInterpreter,
    playback: PlaybackController,
}

impl ControlSession {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        notifications: NotificationSender,
        surface: Arc<dyn SurfaceGeometry>,
    ) -> Self {
        let dispatcher = Arc::new(CommandDispatcher::new(
            gateway,
            notifications,
            Arc::new(CommandRecorder::default()),
        ));
        Self {
            view: ViewTransform::new(surface),
            interpreter: EventInterpreter::new(dispatcher.clone()),
            playback: PlaybackController::new(dispatcher.clone()),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn view_mut(&mut self) -> &mut ViewTransform {
        &mut self.view
    }

    pub async fn handle_pointer(&mut self, event: PointerEvent) -> Intent {
        self.interpreter.handle_pointer(&mut self.view, event).await
    }

    pub fn handle_wheel(&mut self, event: WheelEvent) {
        self.interpreter.handle_wheel(&mut self.view, event);
    }

    pub fn handle_key_down(&mut self, payload: KeyPayload) {
        self.interpreter.handle_key_down(payload);
    }

    pub fn handle_key_up(&mut self, payload: &KeyPayload) {
        self.interpreter.handle_key_up(payload);
    }

    pub async fn handle_text_capture_submitted(&mut self, submitted: Option<String>) {
        self.interpreter.handle_text_capture_submitted(submitted).await;
    }

    pub async fn load_replay(&self, entries: Vec<ReplayEntry>) {
        self.playback.load_replay(entries).await;
    }

    /// Routes one toolbar/menu action. Zoom actions recentre the scrollbars
    /// afterwards so the viewport stays over the model.
    pub async fn handle_toolbar(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::ZoomIn | ToolbarAction::ZoomOut => {
                let drawable = self.view.drawable_area();
                let centre =
                    shared::domain::Point::new(drawable.width / 2.0, drawable.height / 2.0);
                let factor = if matches!(action, ToolbarAction::ZoomIn) {
                    ZOOM_IN_FACTOR
                } else {
                    ZOOM_OUT_FACTOR
                };
                self.dispatcher.zoom(centre, factor).await;
                self.view.scroll_to_center();
            }
            ToolbarAction::ResetZoom => {
                let drawable = self.view.drawable_area();
                let centre =
                    shared::domain::Point::new(drawable.width / 2.0, drawable.height / 2.0);
                self.dispatcher.reset_zoom(centre).await;
                self.view.scroll_to_center();
            }
            ToolbarAction::ZoomToFit => {
                let drawable = self.view.drawable_area();
                self.dispatcher.zoom_to_fit(drawable).await;
                self.view.scroll_to_center();
            }
            ToolbarAction::SimulationSpeed(speed) => self.playback.set_speed(speed).await,
            ToolbarAction::Play => self.playback.play().await,
            ToolbarAction::Pause => self.playback.pause().await,
            ToolbarAction::Reset => self.playback.reset().await,
            ToolbarAction::Step => self.playback.step().await,
            ToolbarAction::Reverse(on) => {
                self.dispatcher.dispatch(&CanvasOp::Reverse { on }).await;
            }
        }
    }

    pub async fn set_background_color(&self, color: &str) {
        self.dispatcher.set_background_color(color).await;
    }

    /// Recomputes the view transform after a resize/layout change on the
    /// primary surface, and tells the shell about the new geometry.
    pub fn relayout(&mut self) {
        if !self.view.is_primary() {
            return;
        }
        self.view.reinitialize();
        let offset = self.view.offset();
        let drawable = self.view.drawable_area();
        self.dispatcher.notify(Notification::AppLayoutChanged {
            offset,
            drawable,
        });
    }

    /// Form submission boundary: dispatches the ordered field sequence for a
    /// validated variable form. A partial failure is logged by the
    /// dispatcher and leaves the backend partially updated.
    pub async fn submit_variable_form(&self, form: &VariableForm) {
        if self.dispatcher.create_variable(form).await.is_err() {
            tracing::warn!(name = %form.name, "variable form dispatch incomplete");
        }
    }
}

#[cfg(test)]
mod tests;
