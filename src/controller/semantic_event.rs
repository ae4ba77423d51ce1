//! Events re-emitted under semantic names

use crate::controller::mapping_table::{ButtonName, Hand};
use crate::controller::raw_event::{ButtonEventKind, ButtonState};
use crate::host::InstanceId;
use glam::Vec3;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SemanticPayload {
    /// `<button>changed`, state passed through untouched
    Changed {
        button: ButtonName,
        state: ButtonState,
    },
    /// `<button>down`, `<button>up`, `<button>touchstart`, `<button>touchend`
    Button {
        button: ButtonName,
        kind: ButtonEventKind,
        hand: Hand,
    },
    /// `<axis>moved`
    AxisMoved { axis: &'static str, x: f32, y: f32 },
    ControllerModelReady {
        name: &'static str,
        model: bool,
        ray_origin: Vec3,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticEvent {
    pub source: InstanceId,
    pub payload: SemanticPayload,
}

impl SemanticEvent {
    /// Event name as seen by downstream listeners, e.g. `triggerchanged`
    pub fn name(&self) -> String {
        match &self.payload {
            SemanticPayload::Changed { button, .. } => format!("{button}changed"),
            SemanticPayload::Button { button, kind, .. } => format!("{button}{kind}"),
            SemanticPayload::AxisMoved { axis, .. } => format!("{axis}moved"),
            SemanticPayload::ControllerModelReady { .. } => "controllermodelready".to_string(),
        }
    }
}
