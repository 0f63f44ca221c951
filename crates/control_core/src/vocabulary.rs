//! The closed vocabulary of backend operations.
//!
//! Each variant fixes the command path, argument arity, and types at the
//! type level; serialization funnels through [`CanvasOp::to_command`] so the
//! path-and-bracketed-args grammar is composed in exactly one place.

use serde_json::Value;
use shared::protocol::Command;

pub const ZOOM_IN_FACTOR: f64 = 1.1;
pub const ZOOM_OUT_FACTOR: f64 = 0.91;

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOp {
    MouseDown { x: f64, y: f64 },
    MouseUp { x: f64, y: f64 },
    MouseMove { x: f64, y: f64 },
    Zoom { x: f64, y: f64, factor: f64 },
    SetZoom { factor: f64 },
    Recentre,
    RequestRedraw,
    SetBackgroundColor { color: String },
    AddOperation { name: String },
    AddNote { text: String },
    AddVariable { name: String, var_type: String },
    ItemInit { value: String },
    ItemUnits { units: String },
    ItemRotation { degrees: f64 },
    ItemTooltip { text: String },
    ItemAdjustSliderBounds,
    ZoomFactor,
    RelZoom,
    ModelBounds,
    Step,
    Reset,
    Running { on: bool },
    Reverse { on: bool },
    Time,
    DeltaT,
    EndTime,
    AvailableOperations,
    NewSystem,
}

impl CanvasOp {
    pub fn path(&self) -> &'static str {
        match self {
            CanvasOp::MouseDown { .. } => "/model/canvas/mouseDown",
            CanvasOp::MouseUp { .. } => "/model/canvas/mouseUp",
            CanvasOp::MouseMove { .. } => "/model/canvas/mouseMove",
            CanvasOp::Zoom { .. } => "/model/canvas/zoom",
            CanvasOp::SetZoom { .. } => "/model/canvas/model/setZoom",
            CanvasOp::Recentre => "/model/canvas/recentre",
            CanvasOp::RequestRedraw => "/model/canvas/requestRedraw",
            CanvasOp::SetBackgroundColor { .. } => "/model/canvas/backgroundColour",
            CanvasOp::AddOperation { .. } => "/model/canvas/addOperation",
            CanvasOp::AddNote { .. } => "/model/canvas/addNote",
            CanvasOp::AddVariable { .. } => "/model/canvas/addVariable",
            CanvasOp::ItemInit { .. } => "/model/canvas/itemFocus/init",
            CanvasOp::ItemUnits { .. } => "/model/canvas/itemFocus/setUnits",
            CanvasOp::ItemRotation { .. } => "/model/canvas/itemFocus/rotation",
            CanvasOp::ItemTooltip { .. } => "/model/canvas/itemFocus/tooltip",
            CanvasOp::ItemAdjustSliderBounds => "/model/canvas/itemFocus/adjustSliderBounds",
            CanvasOp::ZoomFactor => "/model/canvas/model/zoomFactor",
            CanvasOp::RelZoom => "/model/canvas/model/relZoom",
            CanvasOp::ModelBounds => "/model/canvas/model/cBounds",
            CanvasOp::Step => "/model/step",
            CanvasOp::Reset => "/model/reset",
            CanvasOp::Running { .. } => "/model/running",
            CanvasOp::Reverse { .. } => "/model/reverse",
            CanvasOp::Time => "/model/t",
            CanvasOp::DeltaT => "/model/deltaT",
            CanvasOp::EndTime => "/model/tmax",
            CanvasOp::AvailableOperations => "/model/availableOperations",
            CanvasOp::NewSystem => "/model/newSystem",
        }
    }

    /// Pure queries suppress the implicit redraw.
    pub fn expects_render(&self) -> bool {
        !matches!(
            self,
            CanvasOp::ZoomFactor
                | CanvasOp::RelZoom
                | CanvasOp::ModelBounds
                | CanvasOp::Time
                | CanvasOp::DeltaT
                | CanvasOp::EndTime
                | CanvasOp::AvailableOperations
        )
    }

    fn args(&self) -> Vec<Value> {
        match self {
            CanvasOp::MouseDown { x, y }
            | CanvasOp::MouseUp { x, y }
            | CanvasOp::MouseMove { x, y } => vec![Value::from(*x), Value::from(*y)],
            CanvasOp::Zoom { x, y, factor } => {
                vec![Value::from(*x), Value::from(*y), Value::from(*factor)]
            }
            CanvasOp::SetZoom { factor } => vec![Value::from(*factor)],
            CanvasOp::AddOperation { name } => vec![Value::from(name.clone())],
            CanvasOp::AddNote { text } | CanvasOp::ItemTooltip { text } => {
                vec![Value::from(text.clone())]
            }
            CanvasOp::SetBackgroundColor { color } => vec![Value::from(color.clone())],
            CanvasOp::AddVariable { name, var_type } => {
                vec![Value::from(name.clone()), Value::from(var_type.clone())]
            }
            CanvasOp::ItemInit { value } => vec![Value::from(value.clone())],
            CanvasOp::ItemUnits { units } => vec![Value::from(units.clone())],
            CanvasOp::ItemRotation { degrees } => vec![Value::from(*degrees)],
            CanvasOp::Running { on } | CanvasOp::Reverse { on } => vec![Value::from(*on)],
            CanvasOp::Recentre
            | CanvasOp::RequestRedraw
            | CanvasOp::ItemAdjustSliderBounds
            | CanvasOp::ZoomFactor
            | CanvasOp::RelZoom
            | CanvasOp::ModelBounds
            | CanvasOp::Step
            | CanvasOp::Reset
            | CanvasOp::Time
            | CanvasOp::DeltaT
            | CanvasOp::EndTime
            | CanvasOp::AvailableOperations
            | CanvasOp::NewSystem => Vec::new(),
        }
    }

    pub fn to_command(&self) -> Command {
        Command::compose(self.path(), &self.args(), self.expects_render())
    }
}
