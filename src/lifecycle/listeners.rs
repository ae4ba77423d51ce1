//! Listener bookkeeping for one adapter instance

use crate::controller::raw_event::{ListenerKind, RawControllerEvent};
use crate::host::{HostContext, InstanceId, SceneHost};
use crate::lifecycle::component::{Active, MxInkControls};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Listeners attached on activation and removed on deactivation
pub const RAW_LISTENERS: [ListenerKind; 9] = [
    ListenerKind::ButtonChanged,
    ListenerKind::ButtonDown,
    ListenerKind::ButtonUp,
    ListenerKind::TouchStart,
    ListenerKind::TouchEnd,
    ListenerKind::AxisMove,
    ListenerKind::ModelLoaded,
    ListenerKind::EnterArMode,
    ListenerKind::ExitArMode,
];

/// Scene-level subscriptions that drive presence re-detection
pub const PRESENCE_LISTENERS: [ListenerKind; 2] =
    [ListenerKind::ControllersUpdated, ListenerKind::Presence];

/// Tracks which subscriptions an instance currently holds
///
/// `active` is true iff the raw listener set is registered with the host.
/// Attaching while active and detaching while inactive do nothing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListenerSet {
    active: bool,
    watching_presence: bool,
}

impl ListenerSet {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_watching_presence(&self) -> bool {
        self.watching_presence
    }

    /// Returns false when the raw set was already attached
    pub fn attach(&mut self, instance: InstanceId, host: &mut dyn SceneHost) -> bool {
        if self.active {
            debug!("Raw listeners already attached for {}", instance);
            return false;
        }
        for kind in RAW_LISTENERS {
            host.subscribe(instance, kind);
        }
        self.active = true;
        debug!("Attached {} raw listeners for {}", RAW_LISTENERS.len(), instance);
        true
    }

    /// Returns false when the raw set was not attached
    pub fn detach(&mut self, instance: InstanceId, host: &mut dyn SceneHost) -> bool {
        if !self.active {
            debug!("Raw listeners already detached for {}", instance);
            return false;
        }
        for kind in RAW_LISTENERS {
            host.unsubscribe(instance, kind);
        }
        self.active = false;
        debug!("Detached raw listeners for {}", instance);
        true
    }

    pub fn watch_presence(&mut self, instance: InstanceId, host: &mut dyn SceneHost) -> bool {
        if self.watching_presence {
            return false;
        }
        for kind in PRESENCE_LISTENERS {
            host.subscribe(instance, kind);
        }
        self.watching_presence = true;
        true
    }

    pub fn unwatch_presence(&mut self, instance: InstanceId, host: &mut dyn SceneHost) -> bool {
        if !self.watching_presence {
            return false;
        }
        for kind in PRESENCE_LISTENERS {
            host.unsubscribe(instance, kind);
        }
        self.watching_presence = false;
        true
    }

    /// Whether a notification of this kind may still reach a handler
    pub fn accepts(&self, kind: ListenerKind) -> bool {
        if PRESENCE_LISTENERS.contains(&kind) {
            self.watching_presence
        } else {
            self.active
        }
    }
}

pub type Handler = fn(&mut MxInkControls<Active>, &RawControllerEvent, &mut HostContext<'_>);

/// Event kind → handler, built once per instance and reused across cycles
#[derive(Default, Clone)]
pub struct HandlerTable {
    handlers: HashMap<ListenerKind, Handler>,
}

impl HandlerTable {
    pub fn with(mut self, kind: ListenerKind, handler: Handler) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn get(&self, kind: ListenerKind) -> Option<Handler> {
        self.handlers.get(&kind).copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("HandlerTable").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SceneState;

    #[test]
    fn attach_and_detach_are_idempotent() {
        let mut scene = SceneState::default();
        let mut listeners = ListenerSet::default();
        let instance = InstanceId(3);

        assert!(listeners.attach(instance, &mut scene));
        assert!(!listeners.attach(instance, &mut scene));
        for kind in RAW_LISTENERS {
            assert_eq!(scene.subscription_count(instance, kind), 1);
        }

        assert!(listeners.detach(instance, &mut scene));
        assert!(!listeners.detach(instance, &mut scene));
        for kind in RAW_LISTENERS {
            assert_eq!(scene.subscription_count(instance, kind), 0);
        }
    }

    #[test]
    fn presence_kinds_follow_their_own_flag() {
        let mut scene = SceneState::default();
        let mut listeners = ListenerSet::default();
        let instance = InstanceId(1);

        listeners.watch_presence(instance, &mut scene);
        assert!(listeners.accepts(ListenerKind::ControllersUpdated));
        assert!(listeners.accepts(ListenerKind::Presence));
        assert!(!listeners.accepts(ListenerKind::ButtonChanged));

        listeners.attach(instance, &mut scene);
        listeners.unwatch_presence(instance, &mut scene);
        assert!(!listeners.accepts(ListenerKind::ControllersUpdated));
        assert!(listeners.accepts(ListenerKind::ModelLoaded));
        assert_eq!(
            scene.subscription_count(instance, ListenerKind::ControllersUpdated),
            0
        );
    }
}
