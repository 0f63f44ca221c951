use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{CanvasOffset, Extent};

/// A single backend command, fully composed and ready to transmit.
///
/// The text follows the backend's path-like grammar:
/// `<namespace>/<action> [arg1, arg2, ...]`. Commands are immutable once
/// built; the dispatcher trims whitespace at its single serialization point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub text: String,
    pub expects_render: bool,
}

impl Command {
    pub fn new(text: impl Into<String>, expects_render: bool) -> Self {
        Self {
            text: text.into(),
            expects_render,
        }
    }

    /// Composes `path [args...]` from a path and a JSON argument list. The
    /// bracketed list is omitted entirely when there are no arguments.
    pub fn compose(path: &str, args: &[Value], expects_render: bool) -> Self {
        let text = if args.is_empty() {
            path.to_string()
        } else {
            // serde_json renders a Vec as `[a,b,c]`, which is exactly the
            // bracketed argument grammar the backend expects.
            let rendered = serde_json::to_string(args).unwrap_or_else(|_| "[]".to_string());
            format!("{path} {rendered}")
        };
        Self::new(text, expects_render)
    }
}

/// Everything the backend can hand back from a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Null,
    Flag(bool),
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
    Texts(Vec<String>),
    Object(serde_json::Map<String, Value>),
}

impl ResultValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ResultValue::Number(n) => Some(*n),
            ResultValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ResultValue::Flag(b) => Some(*b),
            ResultValue::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            ResultValue::Numbers(ns) => Some(ns),
            _ => None,
        }
    }

    /// The `(t, deltaT)` pair a step command returns.
    pub fn as_time_pair(&self) -> Option<(f64, f64)> {
        match self.as_numbers()? {
            [t, dt] => Some((*t, *dt)),
            _ => None,
        }
    }

    pub fn as_texts(&self) -> Option<&[String]> {
        match self {
            ResultValue::Texts(ts) => Some(ts),
            _ => None,
        }
    }
}

/// One recorded command in a replay file. Timestamps are milliseconds since
/// the recording started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub command: String,
    #[serde(rename = "executedAt")]
    pub executed_at: u64,
}

/// Keystroke payload handed to the backend's synchronous key-dispatch probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPayload {
    pub key: String,
    pub shift: bool,
    pub caps_lock: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub mouse_x: f64,
    pub mouse_y: f64,
}

/// A creation/edit form the control layer asks the platform shell to open.
/// Form field validation and submission are owned by the shell; the control
/// layer only seeds the initial values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRequest {
    pub title: String,
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FormRequest {
    pub fn create_constant(value: impl Into<String>) -> Self {
        Self {
            title: "Create Constant".to_string(),
            item_type: "constant".to_string(),
            name: None,
            value: Some(value.into()),
        }
    }

    pub fn create_variable(name: impl Into<String>) -> Self {
        Self {
            title: "Specify Variable Name".to_string(),
            item_type: "flow".to_string(),
            name: Some(name.into()),
            value: None,
        }
    }
}

/// Fire-and-forget notifications fanned out to the platform shell. These are
/// one-way; nothing here round-trips through the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    ContextMenu { x: f64, y: f64 },
    DoubleClick { x: f64, y: f64 },
    DisplayMouseCoordinates { x: f64, y: f64 },
    BackgroundColorChanged { color: String },
    AppLayoutChanged { offset: CanvasOffset, drawable: Extent },
    TimeUpdated { t: String, delta_t: String },
    PlayButton { visible: bool },
    PlaybackFinished,
    TextCaptureRequested { seed: String },
    OpenForm(FormRequest),
}

/// Toolbar/menu actions arriving from the shell's chrome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolbarAction {
    ZoomIn,
    ZoomOut,
    ResetZoom,
    ZoomToFit,
    SimulationSpeed(f64),
    Play,
    Pause,
    Reset,
    Step,
    Reverse(bool),
}
