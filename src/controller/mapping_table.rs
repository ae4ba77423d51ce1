//! Static input layout for the Logitech MX Ink stylus
//!
//! Raw button ids are positional: entry `i` of a hand's list describes raw
//! button `i`. `None` marks ids without a semantic meaning for this profile;
//! events on those ids are dropped without a trace.
//!
//! ```text
//! id:    0        1        2     3     4         5    6
//!        trigger  squeeze  none  none  touchpad  tip  dock
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Profile identity matched against the id / profile list of live devices
pub const GAMEPAD_ID: &str = "logitech-mx-ink";

/// Name carried by `controllermodelready`
pub const COMPONENT_NAME: &str = "logitech-mx-ink-controls";

/// Which hand an adapter instance serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    #[default]
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown hand: {0} (expected \"left\" or \"right\")")]
pub struct ParseHandError(pub String);

impl FromStr for Hand {
    type Err = ParseHandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Hand::Left),
            "right" => Ok(Hand::Right),
            _ => Err(ParseHandError(s.to_string())),
        }
    }
}

/// Semantic button names exposed by the stylus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonName {
    Trigger,
    Squeeze,
    Touchpad,
    Tip,
    Dock,
}

impl ButtonName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonName::Trigger => "trigger",
            ButtonName::Squeeze => "squeeze",
            ButtonName::Touchpad => "touchpad",
            ButtonName::Tip => "tip",
            ButtonName::Dock => "dock",
        }
    }
}

impl fmt::Display for ButtonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A two-dimensional control built from two raw axis indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBinding {
    pub name: &'static str,
    pub x: usize,
    pub y: usize,
}

/// Button and axis layout of one hand
#[derive(Debug)]
pub struct HandMapping {
    pub buttons: &'static [Option<ButtonName>],
    pub axes: &'static [AxisBinding],
}

/// Per-hand layout table, shared read-only by every instance
#[derive(Debug)]
pub struct InputMapping {
    pub left: HandMapping,
    pub right: HandMapping,
}

impl InputMapping {
    pub fn hand(&self, hand: Hand) -> &HandMapping {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    /// Resolves a raw button id; out-of-range ids resolve like `None` entries
    pub fn button(&self, hand: Hand, id: u32) -> Option<ButtonName> {
        let index = usize::try_from(id).ok()?;
        self.hand(hand).buttons.get(index).copied().flatten()
    }

    pub fn axes(&self, hand: Hand) -> &'static [AxisBinding] {
        self.hand(hand).axes
    }
}

const MX_INK_BUTTONS: [Option<ButtonName>; 7] = [
    Some(ButtonName::Trigger),
    Some(ButtonName::Squeeze),
    None,
    None,
    Some(ButtonName::Touchpad),
    Some(ButtonName::Tip),
    Some(ButtonName::Dock),
];

// The stylus exposes no thumbstick or touchpad axes.
const MX_INK_AXES: [AxisBinding; 0] = [];

pub static INPUT_MAPPING_WEBXR: InputMapping = InputMapping {
    left: HandMapping {
        buttons: &MX_INK_BUTTONS,
        axes: &MX_INK_AXES,
    },
    right: HandMapping {
        buttons: &MX_INK_BUTTONS,
        axes: &MX_INK_AXES,
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_mapped_id_for_both_hands() {
        for hand in [Hand::Left, Hand::Right] {
            assert_eq!(INPUT_MAPPING_WEBXR.button(hand, 0), Some(ButtonName::Trigger));
            assert_eq!(INPUT_MAPPING_WEBXR.button(hand, 1), Some(ButtonName::Squeeze));
            assert_eq!(INPUT_MAPPING_WEBXR.button(hand, 4), Some(ButtonName::Touchpad));
            assert_eq!(INPUT_MAPPING_WEBXR.button(hand, 5), Some(ButtonName::Tip));
            assert_eq!(INPUT_MAPPING_WEBXR.button(hand, 6), Some(ButtonName::Dock));
        }
    }

    #[test]
    fn none_entries_and_out_of_range_ids_are_unmapped() {
        for hand in [Hand::Left, Hand::Right] {
            assert_eq!(INPUT_MAPPING_WEBXR.button(hand, 2), None);
            assert_eq!(INPUT_MAPPING_WEBXR.button(hand, 3), None);
            assert_eq!(INPUT_MAPPING_WEBXR.button(hand, 7), None);
            assert_eq!(INPUT_MAPPING_WEBXR.button(hand, u32::MAX), None);
        }
    }

    #[test]
    fn axis_table_is_declared_but_empty() {
        assert!(INPUT_MAPPING_WEBXR.axes(Hand::Left).is_empty());
        assert!(INPUT_MAPPING_WEBXR.axes(Hand::Right).is_empty());
    }

    #[test]
    fn parses_hand_names() {
        assert_eq!("left".parse::<Hand>(), Ok(Hand::Left));
        assert_eq!(" Right ".parse::<Hand>(), Ok(Hand::Right));
        assert_eq!(
            "middle".parse::<Hand>(),
            Err(ParseHandError("middle".to_string()))
        );
        assert_eq!(Hand::default(), Hand::Left);
    }
}
