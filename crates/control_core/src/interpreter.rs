//! Classification of raw pointer/keyboard events into intents.
//!
//! Every raw event routes to exactly one outcome: a pan gesture handled
//! locally against the scroll position, a click forwarded to the backend, a
//! modifier-toggled notification, or a context menu. Keystrokes are probed
//! against the backend's shortcut table first; unhandled printable keys open
//! a single-slot text capture whose submission is classified here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shared::{
    domain::{MouseButton, Point},
    protocol::{FormRequest, KeyPayload, Notification},
};

use crate::dispatcher::CommandDispatcher;
use crate::view::ViewTransform;
use crate::vocabulary::{CanvasOp, ZOOM_IN_FACTOR, ZOOM_OUT_FACTOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Up,
    Move,
    ContextMenu,
    DoubleClick,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub client_x: f64,
    pub client_y: f64,
    pub button: MouseButton,
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, client_x: f64, client_y: f64) -> Self {
        Self {
            kind,
            client_x,
            client_y,
            button: MouseButton::Left,
            shift: false,
            alt: false,
            ctrl: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub client_x: f64,
    pub client_y: f64,
    pub delta_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Down,
    Up,
    Move,
}

/// What a raw pointer event means, after disambiguation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    ContextMenu { x: f64, y: f64 },
    ModifierToggle { x: f64, y: f64 },
    PanStart,
    PanMove { scroll_to: Point },
    PanEnd,
    ClickDispatch { kind: ClickKind, x: f64, y: f64 },
    DoubleClick { x: f64, y: f64 },
    Ignore,
}

/// Transient per-gesture pointer state. `dragging` implies both origins are
/// set; all three are cleared together on mouse-up or shift release.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerState {
    pub mouse_x: f64,
    pub mouse_y: f64,
    pub shift_held: bool,
    pub dragging: bool,
    pub drag_origin: Option<Point>,
    pub scroll_origin_at_drag_start: Option<Point>,
}

impl PointerState {
    fn clear_drag(&mut self) {
        self.dragging = false;
        self.drag_origin = None;
        self.scroll_origin_at_drag_start = None;
    }
}

pub struct EventInterpreter {
    dispatcher: Arc<CommandDispatcher>,
    pointer: PointerState,
    /// Seed key of the pending text capture; at most one exists system-wide.
    text_capture: Option<String>,
    /// True while a wheel zoom command is in flight on its own task.
    awaiting_zoom: Arc<AtomicBool>,
}

impl EventInterpreter {
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self {
            dispatcher,
            pointer: PointerState::default(),
            text_capture: None,
            awaiting_zoom: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn text_capture_open(&self) -> bool {
        self.text_capture.is_some()
    }

    /// Classifies one pointer event, updating the gesture state. Pure with
    /// respect to the backend: no commands are sent here.
    pub fn classify(&mut self, view: &mut ViewTransform, event: PointerEvent) -> Intent {
        let offset = view.offset();
        self.pointer.mouse_x = event.client_x;
        self.pointer.mouse_y = event.client_y - offset.top.round();
        self.pointer.shift_held = event.shift;
        let (x, y) = (self.pointer.mouse_x, self.pointer.mouse_y);

        if event.kind == PointerEventKind::ContextMenu {
            return Intent::ContextMenu { x, y };
        }
        if event.button == MouseButton::Right {
            return Intent::Ignore;
        }

        match event.kind {
            PointerEventKind::Down if event.alt => Intent::ModifierToggle { x, y },
            PointerEventKind::Down if event.shift => {
                self.pointer.dragging = true;
                self.pointer.drag_origin = Some(Point::new(x, y));
                self.pointer.scroll_origin_at_drag_start = Some(view.scroll_position());
                Intent::PanStart
            }
            PointerEventKind::Up if self.pointer.dragging => {
                self.pointer.clear_drag();
                Intent::PanEnd
            }
            PointerEventKind::Move if self.pointer.dragging => {
                match (
                    self.pointer.drag_origin,
                    self.pointer.scroll_origin_at_drag_start,
                ) {
                    (Some(origin), Some(scroll_origin)) => {
                        let delta = origin - Point::new(x, y);
                        Intent::PanMove {
                            scroll_to: scroll_origin + delta,
                        }
                    }
                    _ => {
                        self.pointer.clear_drag();
                        Intent::Ignore
                    }
                }
            }
            PointerEventKind::DoubleClick => Intent::DoubleClick { x, y },
            PointerEventKind::Down => Intent::ClickDispatch {
                kind: ClickKind::Down,
                x: event.client_x,
                y,
            },
            PointerEventKind::Up => Intent::ClickDispatch {
                kind: ClickKind::Up,
                x: event.client_x,
                y,
            },
            PointerEventKind::Move => Intent::ClickDispatch {
                kind: ClickKind::Move,
                x: event.client_x,
                y,
            },
            PointerEventKind::ContextMenu => unreachable!("handled above"),
        }
    }

    /// Classifies and executes one pointer event. Returns the intent it
    /// acted on; failures inside dispatch are logged and swallowed, so the
    /// interpreter always returns to a consistent idle state.
    pub async fn handle_pointer(
        &mut self,
        view: &mut ViewTransform,
        event: PointerEvent,
    ) -> Intent {
        let intent = self.classify(view, event);
        match intent {
            Intent::ContextMenu { x, y } => {
                self.dispatcher.notify(Notification::ContextMenu { x, y });
            }
            Intent::ModifierToggle { x, y } => {
                self.dispatcher
                    .notify(Notification::DisplayMouseCoordinates { x, y });
            }
            Intent::PanMove { scroll_to } => {
                view.set_scroll_position(scroll_to);
            }
            Intent::ClickDispatch { kind, x, y } => {
                let op = match kind {
                    ClickKind::Down => CanvasOp::MouseDown { x, y },
                    ClickKind::Up => CanvasOp::MouseUp { x, y },
                    ClickKind::Move => CanvasOp::MouseMove { x, y },
                };
                self.dispatcher.dispatch(&op).await;
            }
            Intent::DoubleClick { x, y } => {
                self.dispatcher.notify(Notification::DoubleClick { x, y });
            }
            Intent::PanStart | Intent::PanEnd | Intent::Ignore => {}
        }
        intent
    }

    /// Wheel zoom about the pointer. The zoom command runs on its own task;
    /// wheel events arriving while one is still in flight are dropped so
    /// zoom commands never pile up faster than the backend answers them.
    pub fn handle_wheel(&mut self, view: &mut ViewTransform, event: WheelEvent) {
        let factor = if event.delta_y < 0.0 {
            ZOOM_IN_FACTOR
        } else {
            ZOOM_OUT_FACTOR
        };
        let offset = view.offset();
        let x = event.client_x - offset.left;
        let y = event.client_y - offset.top;

        if self.awaiting_zoom.swap(true, Ordering::SeqCst) {
            return;
        }
        let dispatcher = self.dispatcher.clone();
        let awaiting = self.awaiting_zoom.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(&CanvasOp::Zoom { x, y, factor }).await;
            awaiting.store(false, Ordering::SeqCst);
        });
    }

    /// Probes the backend for a shortcut binding; an unhandled printable key
    /// opens the (single-slot) text capture.
    pub fn handle_key_down(&mut self, payload: KeyPayload) {
        self.pointer.shift_held = payload.shift;
        if self.text_capture.is_some() {
            // The open capture dialog owns the keyboard.
            return;
        }

        let handled = match self.dispatcher.key_press_probe(&payload) {
            Ok(handled) => handled,
            Err(err) => {
                tracing::error!(key = %payload.key, %err, "key-dispatch probe failed");
                return;
            }
        };
        if handled {
            return;
        }

        if is_printable_key(&payload.key) && !payload.alt && !payload.ctrl {
            self.text_capture = Some(payload.key.clone());
            self.dispatcher
                .notify(Notification::TextCaptureRequested { seed: payload.key });
        }
    }

    /// Releasing shift cancels an in-progress pan.
    pub fn handle_key_up(&mut self, payload: &KeyPayload) {
        self.pointer.shift_held = payload.shift;
        if !payload.shift {
            self.pointer.clear_drag();
        }
    }

    /// Completes the pending text capture. `None` means the dialog was
    /// cancelled; either way the capture slot is freed.
    pub async fn handle_text_capture_submitted(&mut self, submitted: Option<String>) {
        self.text_capture = None;
        let Some(input) = submitted else {
            return;
        };
        if input.is_empty() {
            return;
        }

        let operations = self.dispatcher.available_operations().await;
        match classify_text_entry(&input, &operations) {
            TextEntryAction::AddNote(note) => self.dispatcher.add_note(&note).await,
            TextEntryAction::AddOperation(name) => self.dispatcher.add_operation(&name).await,
            TextEntryAction::OpenConstantForm(value) => self
                .dispatcher
                .notify(Notification::OpenForm(FormRequest::create_constant(value))),
            TextEntryAction::OpenVariableForm(name) => self
                .dispatcher
                .notify(Notification::OpenForm(FormRequest::create_variable(name))),
        }
    }
}

fn is_printable_key(key: &str) -> bool {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => (' '..='~').contains(&c),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEntryAction {
    AddNote(String),
    AddOperation(String),
    OpenConstantForm(String),
    OpenVariableForm(String),
}

/// Classifies a submitted text capture, in precedence order:
/// leading `#` is a note; a bare `-` is the subtract operation; any other
/// leading `-` pre-fills a constant; a known operation name dispatches it;
/// a number pre-fills a constant; anything else proposes a variable name.
pub fn classify_text_entry(input: &str, operations: &[String]) -> TextEntryAction {
    if let Some(note) = input.strip_prefix('#') {
        return TextEntryAction::AddNote(note.to_string());
    }
    if input == "-" {
        return TextEntryAction::AddOperation("subtract".to_string());
    }
    if input.starts_with('-') {
        return TextEntryAction::OpenConstantForm(input.to_string());
    }
    let lowered = input.to_lowercase();
    if operations.iter().any(|op| op == &lowered) {
        return TextEntryAction::AddOperation(lowered);
    }
    if input.parse::<f64>().is_ok() {
        return TextEntryAction::OpenConstantForm(input.to_string());
    }
    TextEntryAction::OpenVariableForm(input.to_string())
}
