use std::sync::Arc;

use shared::domain::{Extent, MouseButton, Point};
use shared::protocol::{KeyPayload, Notification, ResultValue};

use super::{harness, wait_until, Harness};
use crate::interpreter::{
    classify_text_entry, EventInterpreter, Intent, PointerEvent, PointerEventKind, TextEntryAction,
    WheelEvent,
};
use crate::view::{ContainerGeometry, FixedSurface, SurfaceGeometry, ViewTransform};

fn pointer_setup() -> (Harness, EventInterpreter, ViewTransform, Arc<FixedSurface>) {
    let h = harness();
    let surface = Arc::new(FixedSurface::primary(Extent::new(100.0, 100.0)));
    let view = ViewTransform::new(surface.clone());
    let interpreter = EventInterpreter::new(h.dispatcher.clone());
    (h, interpreter, view, surface)
}

fn key(key: &str) -> KeyPayload {
    KeyPayload {
        key: key.to_string(),
        shift: false,
        caps_lock: false,
        ctrl: false,
        alt: false,
        mouse_x: 0.0,
        mouse_y: 0.0,
    }
}

#[tokio::test]
async fn shift_drag_pans_by_exact_pointer_delta() {
    let (_h, mut interpreter, mut view, surface) = pointer_setup();
    surface.set_scroll_position(Point::new(500.0, 500.0));

    let down = PointerEvent::new(PointerEventKind::Down, 10.0, 20.0).with_shift();
    assert_eq!(interpreter.handle_pointer(&mut view, down).await, Intent::PanStart);

    let moved = PointerEvent::new(PointerEventKind::Move, 4.0, 12.0).with_shift();
    interpreter.handle_pointer(&mut view, moved).await;
    assert_eq!(surface.scroll_position(), Point::new(506.0, 508.0));

    // Coalesced or repeated move events land on the same target position.
    interpreter.handle_pointer(&mut view, moved).await;
    assert_eq!(surface.scroll_position(), Point::new(506.0, 508.0));
}

#[tokio::test]
async fn pan_gesture_never_reaches_the_backend() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();

    let down = PointerEvent::new(PointerEventKind::Down, 10.0, 20.0).with_shift();
    interpreter.handle_pointer(&mut view, down).await;
    let moved = PointerEvent::new(PointerEventKind::Move, 30.0, 40.0).with_shift();
    interpreter.handle_pointer(&mut view, moved).await;
    let up = PointerEvent::new(PointerEventKind::Up, 30.0, 40.0).with_shift();
    assert_eq!(interpreter.handle_pointer(&mut view, up).await, Intent::PanEnd);

    assert!(h.gateway.sent().is_empty());
}

#[tokio::test]
async fn click_after_pan_release_is_dispatched_not_panned() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();

    let down = PointerEvent::new(PointerEventKind::Down, 10.0, 20.0).with_shift();
    interpreter.handle_pointer(&mut view, down).await;
    let up = PointerEvent::new(PointerEventKind::Up, 10.0, 20.0).with_shift();
    interpreter.handle_pointer(&mut view, up).await;

    let click = PointerEvent::new(PointerEventKind::Down, 15.0, 25.0);
    let intent = interpreter.handle_pointer(&mut view, click).await;
    assert!(matches!(intent, Intent::ClickDispatch { .. }));
    assert_eq!(h.gateway.sent_paths(), ["/model/canvas/mouseDown"]);
}

#[tokio::test]
async fn right_button_terminates_event_processing() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();

    let event = PointerEvent::new(PointerEventKind::Down, 10.0, 10.0)
        .with_button(MouseButton::Right);
    assert_eq!(interpreter.handle_pointer(&mut view, event).await, Intent::Ignore);
    assert!(h.gateway.sent().is_empty());
    assert!(h.drained_notifications().is_empty());
}

#[tokio::test]
async fn context_menu_notifies_with_surface_coordinates() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();

    let event = PointerEvent::new(PointerEventKind::ContextMenu, 40.0, 50.0);
    interpreter.handle_pointer(&mut view, event).await;
    assert_eq!(
        h.drained_notifications(),
        [Notification::ContextMenu { x: 40.0, y: 50.0 }]
    );
    assert!(h.gateway.sent().is_empty());
}

#[tokio::test]
async fn alt_mousedown_reports_mouse_coordinates() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();

    let event = PointerEvent::new(PointerEventKind::Down, 7.0, 9.0).with_alt();
    assert_eq!(
        interpreter.handle_pointer(&mut view, event).await,
        Intent::ModifierToggle { x: 7.0, y: 9.0 }
    );
    assert_eq!(
        h.drained_notifications(),
        [Notification::DisplayMouseCoordinates { x: 7.0, y: 9.0 }]
    );
}

#[tokio::test]
async fn plain_move_is_forwarded_as_hover_echo() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();

    let event = PointerEvent::new(PointerEventKind::Move, 33.0, 44.0);
    interpreter.handle_pointer(&mut view, event).await;
    assert_eq!(h.gateway.sent(), ["/model/canvas/mouseMove [33.0,44.0]"]);
}

#[tokio::test]
async fn pointer_y_is_corrected_by_container_top_offset() {
    let h = harness();
    let container = ContainerGeometry {
        client: Extent::new(100.0, 100.0),
        body: Extent::new(100.0, 140.0),
        bounding_left: 0.0,
        bounding_top: 40.0,
        offset_top: 40.0,
    };
    let surface = Arc::new(FixedSurface::with_container(Some(container), true));
    let mut view = ViewTransform::new(surface);
    let mut interpreter = EventInterpreter::new(h.dispatcher.clone());

    let event = PointerEvent::new(PointerEventKind::Down, 10.0, 50.0);
    interpreter.handle_pointer(&mut view, event).await;
    assert_eq!(h.gateway.sent(), ["/model/canvas/mouseDown [10.0,10.0]"]);
}

#[tokio::test]
async fn double_click_is_an_auxiliary_notification() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();

    let event = PointerEvent::new(PointerEventKind::DoubleClick, 12.0, 13.0);
    interpreter.handle_pointer(&mut view, event).await;
    assert_eq!(
        h.drained_notifications(),
        [Notification::DoubleClick { x: 12.0, y: 13.0 }]
    );
}

#[tokio::test]
async fn wheel_zooms_in_about_the_pointer() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();

    let event = WheelEvent {
        client_x: 60.0,
        client_y: 80.0,
        delta_y: -3.0,
    };
    interpreter.handle_wheel(&mut view, event);
    let gateway = h.gateway.clone();
    wait_until(move || !gateway.sent().is_empty()).await;
    assert_eq!(h.gateway.sent(), ["/model/canvas/zoom [60.0,80.0,1.1]"]);
}

#[tokio::test]
async fn wheel_zoom_out_uses_the_outward_factor() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();

    let event = WheelEvent {
        client_x: 0.0,
        client_y: 0.0,
        delta_y: 5.0,
    };
    interpreter.handle_wheel(&mut view, event);
    let gateway = h.gateway.clone();
    wait_until(move || !gateway.sent().is_empty()).await;
    assert_eq!(h.gateway.sent(), ["/model/canvas/zoom [0.0,0.0,0.91]"]);
}

#[tokio::test]
async fn wheel_events_during_an_in_flight_zoom_are_dropped() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();
    h.gateway.delay_on("/model/canvas/zoom", 50);

    let event = WheelEvent {
        client_x: 10.0,
        client_y: 10.0,
        delta_y: -1.0,
    };
    interpreter.handle_wheel(&mut view, event);
    // Still in flight: these land on the guard and go nowhere.
    interpreter.handle_wheel(&mut view, event);
    interpreter.handle_wheel(&mut view, event);

    let gateway = h.gateway.clone();
    wait_until(move || gateway.count_path("/model/canvas/zoom") == 1).await;
    tokio::time::sleep(std::time::Duration::from_millis(80)).await;
    assert_eq!(h.gateway.count_path("/model/canvas/zoom"), 1);

    // Once the first zoom answers, the next wheel event flows again.
    interpreter.handle_wheel(&mut view, event);
    let gateway = h.gateway.clone();
    wait_until(move || gateway.count_path("/model/canvas/zoom") == 2).await;
}

#[test]
fn handled_shortcut_does_not_open_text_capture() {
    let (h, mut interpreter, _view, _surface) = pointer_setup();
    h.gateway.set_key_handled(true);

    interpreter.handle_key_down(key("x"));
    assert!(!interpreter.text_capture_open());
    assert!(h.drained_notifications().is_empty());
}

#[test]
fn unhandled_printable_key_opens_single_slot_text_capture() {
    let (h, mut interpreter, _view, _surface) = pointer_setup();
    h.gateway.set_key_handled(false);

    interpreter.handle_key_down(key("x"));
    assert!(interpreter.text_capture_open());
    assert_eq!(
        h.drained_notifications(),
        [Notification::TextCaptureRequested {
            seed: "x".to_string()
        }]
    );

    // A second keystroke while the capture is open belongs to the dialog.
    interpreter.handle_key_down(key("y"));
    assert!(h.drained_notifications().is_empty());
}

#[test]
fn modified_or_unprintable_keys_never_open_text_capture() {
    let (h, mut interpreter, _view, _surface) = pointer_setup();
    h.gateway.set_key_handled(false);

    interpreter.handle_key_down(key("ArrowLeft"));
    let mut ctrl_key = key("c");
    ctrl_key.ctrl = true;
    interpreter.handle_key_down(ctrl_key);
    let mut alt_key = key("a");
    alt_key.alt = true;
    interpreter.handle_key_down(alt_key);

    assert!(!interpreter.text_capture_open());
    assert!(h.drained_notifications().is_empty());
}

#[tokio::test]
async fn releasing_shift_cancels_the_pan_gesture() {
    let (h, mut interpreter, mut view, _surface) = pointer_setup();

    let down = PointerEvent::new(PointerEventKind::Down, 10.0, 20.0).with_shift();
    interpreter.handle_pointer(&mut view, down).await;
    interpreter.handle_key_up(&key("Shift"));

    let moved = PointerEvent::new(PointerEventKind::Move, 30.0, 40.0);
    let intent = interpreter.handle_pointer(&mut view, moved).await;
    assert!(matches!(intent, Intent::ClickDispatch { .. }));
    assert_eq!(h.gateway.sent_paths(), ["/model/canvas/mouseMove"]);
}

#[test]
fn text_entry_classification_precedence() {
    let ops: Vec<String> = vec!["exp".to_string(), "subtract".to_string()];

    assert_eq!(
        classify_text_entry("#a note", &ops),
        TextEntryAction::AddNote("a note".to_string())
    );
    assert_eq!(
        classify_text_entry("-", &ops),
        TextEntryAction::AddOperation("subtract".to_string())
    );
    assert_eq!(
        classify_text_entry("-5", &ops),
        TextEntryAction::OpenConstantForm("-5".to_string())
    );
    assert_eq!(
        classify_text_entry("EXP", &ops),
        TextEntryAction::AddOperation("exp".to_string())
    );
    assert_eq!(
        classify_text_entry("3.14", &ops),
        TextEntryAction::OpenConstantForm("3.14".to_string())
    );
    assert_eq!(
        classify_text_entry("foo", &ops),
        TextEntryAction::OpenVariableForm("foo".to_string())
    );
}

#[tokio::test]
async fn submitted_operation_name_dispatches_the_operation() {
    let (h, mut interpreter, _view, _surface) = pointer_setup();
    h.gateway.respond(
        "/model/availableOperations",
        ResultValue::Texts(vec!["exp".to_string()]),
    );

    interpreter.handle_text_capture_submitted(Some("exp".to_string())).await;
    assert!(h
        .gateway
        .sent()
        .contains(&r#"/model/canvas/addOperation ["exp"]"#.to_string()));
}

#[tokio::test]
async fn submitted_free_text_proposes_a_variable_form() {
    let (h, mut interpreter, _view, _surface) = pointer_setup();

    interpreter.handle_text_capture_submitted(Some("population".to_string())).await;
    let forms: Vec<_> = h
        .drained_notifications()
        .into_iter()
        .filter_map(|n| match n {
            Notification::OpenForm(form) => Some(form),
            _ => None,
        })
        .collect();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0].name.as_deref(), Some("population"));
    assert_eq!(forms[0].item_type, "flow");
}

#[tokio::test]
async fn cancelled_text_capture_frees_the_slot() {
    let (h, mut interpreter, _view, _surface) = pointer_setup();
    h.gateway.set_key_handled(false);

    interpreter.handle_key_down(key("x"));
    assert!(interpreter.text_capture_open());
    interpreter.handle_text_capture_submitted(None).await;
    assert!(!interpreter.text_capture_open());

    // The slot is free again for the next unhandled keystroke.
    interpreter.handle_key_down(key("z"));
    assert!(interpreter.text_capture_open());
}
