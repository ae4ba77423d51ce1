//! Notifications delivered by the host to an adapter instance
//!
//! Button notifications carry positional raw ids; the adapter resolves them
//! through the mapping table. Scene-level notifications (`ControllersUpdated`,
//! AR mode changes) and presence outcomes share the same enum so one handler
//! table can route all of them.

use crate::host::InstanceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of one raw button as reported by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ButtonState {
    pub pressed: bool,
    pub touched: bool,
    /// Analog position, 0.0 (released) to 1.0 (fully pressed)
    pub value: f32,
}

/// Snapshot of all raw axes plus the indices that changed in this update
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisMove {
    pub axis: Vec<f32>,
    pub changed: Vec<bool>,
}

impl AxisMove {
    pub fn has_changed(&self, index: usize) -> bool {
        self.changed.get(index).copied().unwrap_or(false)
    }

    pub fn value(&self, index: usize) -> f32 {
        self.axis.get(index).copied().unwrap_or(0.0)
    }
}

/// Discrete button transitions that share one handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonEventKind {
    Down,
    Up,
    TouchStart,
    TouchEnd,
}

impl ButtonEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonEventKind::Down => "down",
            ButtonEventKind::Up => "up",
            ButtonEventKind::TouchStart => "touchstart",
            ButtonEventKind::TouchEnd => "touchend",
        }
    }
}

impl fmt::Display for ButtonEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawControllerEvent {
    ButtonChanged { id: u32, state: ButtonState },
    ButtonDown { id: u32 },
    ButtonUp { id: u32 },
    TouchStart { id: u32 },
    TouchEnd { id: u32 },
    AxisMove(AxisMove),
    /// A model finished loading somewhere below the receiving entity
    ModelLoaded { target: InstanceId },
    ControllersUpdated,
    EnterArMode,
    ExitArMode,
    /// Presence check outcome: a matching device is connected
    ControllerPresent { target: InstanceId, profile: String },
    /// Presence check outcome: the previously matching device is gone
    ControllerLost { target: InstanceId },
}

impl RawControllerEvent {
    pub fn listener_kind(&self) -> ListenerKind {
        match self {
            RawControllerEvent::ButtonChanged { .. } => ListenerKind::ButtonChanged,
            RawControllerEvent::ButtonDown { .. } => ListenerKind::ButtonDown,
            RawControllerEvent::ButtonUp { .. } => ListenerKind::ButtonUp,
            RawControllerEvent::TouchStart { .. } => ListenerKind::TouchStart,
            RawControllerEvent::TouchEnd { .. } => ListenerKind::TouchEnd,
            RawControllerEvent::AxisMove(_) => ListenerKind::AxisMove,
            RawControllerEvent::ModelLoaded { .. } => ListenerKind::ModelLoaded,
            RawControllerEvent::ControllersUpdated => ListenerKind::ControllersUpdated,
            RawControllerEvent::EnterArMode => ListenerKind::EnterArMode,
            RawControllerEvent::ExitArMode => ListenerKind::ExitArMode,
            RawControllerEvent::ControllerPresent { .. }
            | RawControllerEvent::ControllerLost { .. } => ListenerKind::Presence,
        }
    }
}

/// Subscription key: one listener per kind and instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    ButtonChanged,
    ButtonDown,
    ButtonUp,
    TouchStart,
    TouchEnd,
    AxisMove,
    ModelLoaded,
    ControllersUpdated,
    EnterArMode,
    ExitArMode,
    Presence,
}

impl ListenerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerKind::ButtonChanged => "buttonchanged",
            ListenerKind::ButtonDown => "buttondown",
            ListenerKind::ButtonUp => "buttonup",
            ListenerKind::TouchStart => "touchstart",
            ListenerKind::TouchEnd => "touchend",
            ListenerKind::AxisMove => "axismove",
            ListenerKind::ModelLoaded => "model-loaded",
            ListenerKind::ControllersUpdated => "controllersupdated",
            ListenerKind::EnterArMode => "enter-ar-mode",
            ListenerKind::ExitArMode => "exit-ar-mode",
            ListenerKind::Presence => "controllerpresence",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
