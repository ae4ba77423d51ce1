//! Raw-to-semantic translation
//!
//! Every function here is stateless per event: it resolves the raw id for
//! the given hand and either returns exactly one semantic payload or nothing.
//! Callers emit the result immediately, so arrival order is preserved.

use crate::controller::mapping_table::{
    AxisBinding, ButtonName, Hand, InputMapping, INPUT_MAPPING_WEBXR,
};
use crate::controller::raw_event::{AxisMove, ButtonEventKind, ButtonState};
use crate::controller::semantic_event::SemanticPayload;
use tracing::debug;

/// Result of a state-change translation
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub payload: SemanticPayload,
    /// Analog trigger position, surfaced for diagnostics only
    pub analog_value: Option<f32>,
}

#[derive(Debug, Clone, Copy)]
pub struct InputTranslator {
    mapping: &'static InputMapping,
}

impl Default for InputTranslator {
    fn default() -> Self {
        Self::new(&INPUT_MAPPING_WEBXR)
    }
}

impl InputTranslator {
    pub fn new(mapping: &'static InputMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &'static InputMapping {
        self.mapping
    }

    /// Translates `buttonchanged` into `<button>changed`
    pub fn on_button_changed(
        &self,
        hand: Hand,
        id: u32,
        state: &ButtonState,
    ) -> Option<Translation> {
        let Some(button) = self.mapping.button(hand, id) else {
            debug!("Ignoring change on unmapped button {} ({} hand)", id, hand);
            return None;
        };

        let analog_value = (button == ButtonName::Trigger).then_some(state.value);
        if let Some(value) = analog_value {
            debug!(analog_value = value, "analog value of trigger press: {}", value);
        }

        Some(Translation {
            payload: SemanticPayload::Changed {
                button,
                state: *state,
            },
            analog_value,
        })
    }

    /// Shared path for down / up / touchstart / touchend
    pub fn on_button_event(
        &self,
        id: u32,
        kind: ButtonEventKind,
        hand: Hand,
    ) -> Option<SemanticPayload> {
        let Some(button) = self.mapping.button(hand, id) else {
            debug!("Ignoring {} on unmapped button {} ({} hand)", kind, id, hand);
            return None;
        };

        Some(SemanticPayload::Button { button, kind, hand })
    }

    pub fn on_axis_moved(&self, hand: Hand, event: &AxisMove) -> Vec<SemanticPayload> {
        emit_if_axes_changed(self.mapping.axes(hand), event)
    }
}

/// Emits `<axis>moved` for every binding with a changed x or y index
pub fn emit_if_axes_changed(bindings: &[AxisBinding], event: &AxisMove) -> Vec<SemanticPayload> {
    bindings
        .iter()
        .filter(|binding| event.has_changed(binding.x) || event.has_changed(binding.y))
        .map(|binding| SemanticPayload::AxisMoved {
            axis: binding.name,
            x: event.value(binding.x),
            y: event.value(binding.y),
        })
        .collect()
}
