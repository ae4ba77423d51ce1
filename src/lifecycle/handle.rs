//! Runtime handle around the typestate component
//!
//! The host drives instances with plain method calls and cannot know the
//! typestate at compile time. The handle keeps the current state in an enum
//! and turns calls that do not apply to it into logged no-ops.

use crate::config::ControlsConfig;
use crate::controller::raw_event::RawControllerEvent;
use crate::controller::semantic_event::SemanticEvent;
use crate::host::{HostContext, InstanceId, SceneHost};
use crate::lifecycle::component::{Active, MxInkControls, Ready, Uninitialized};
use crate::lifecycle::listeners::ListenerSet;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    Active,
    TornDown,
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized(MxInkControls<Uninitialized>),
    Ready(MxInkControls<Ready>),
    Active(MxInkControls<Active>),
}

/// Applies `$body` to the component whatever its current state
macro_rules! with_component {
    ($lifecycle:expr, $c:ident => $body:expr) => {
        match $lifecycle {
            Lifecycle::Uninitialized($c) => $body,
            Lifecycle::Ready($c) => $body,
            Lifecycle::Active($c) => $body,
        }
    };
}

#[derive(Debug)]
pub struct ControlsHandle {
    instance: InstanceId,
    lifecycle: Option<Lifecycle>,
}

impl ControlsHandle {
    pub fn new(
        instance: InstanceId,
        config: ControlsConfig,
        cdn_root: &str,
        output: mpsc::Sender<SemanticEvent>,
    ) -> Self {
        let component = MxInkControls::create(instance, config, cdn_root, output);
        Self {
            instance,
            lifecycle: Some(Lifecycle::Uninitialized(component)),
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn state(&self) -> LifecycleState {
        match &self.lifecycle {
            Some(Lifecycle::Uninitialized(_)) => LifecycleState::Uninitialized,
            Some(Lifecycle::Ready(_)) => LifecycleState::Ready,
            Some(Lifecycle::Active(_)) => LifecycleState::Active,
            None => LifecycleState::TornDown,
        }
    }

    pub fn config(&self) -> Option<&ControlsConfig> {
        self.lifecycle
            .as_ref()
            .map(|lifecycle| with_component!(lifecycle, c => c.config()))
    }

    pub fn listeners(&self) -> Option<&ListenerSet> {
        self.lifecycle
            .as_ref()
            .map(|lifecycle| with_component!(lifecycle, c => c.listeners()))
    }

    pub fn is_controller_present(&self) -> bool {
        self.lifecycle
            .as_ref()
            .is_some_and(|lifecycle| with_component!(lifecycle, c => c.is_controller_present()))
    }

    pub fn initialize(&mut self) {
        self.lifecycle = match self.lifecycle.take() {
            Some(Lifecycle::Uninitialized(component)) => {
                Some(Lifecycle::Ready(component.initialize()))
            }
            other => {
                debug!("Adapter {} already initialized", self.instance);
                other
            }
        };
    }

    pub fn activate(&mut self, ctx: &mut HostContext<'_>) {
        if self.state() == LifecycleState::Uninitialized {
            self.initialize();
        }
        self.lifecycle = match self.lifecycle.take() {
            Some(Lifecycle::Ready(component)) => Some(Lifecycle::Active(component.activate(ctx))),
            Some(Lifecycle::Active(mut component)) => {
                component.reactivate(ctx);
                Some(Lifecycle::Active(component))
            }
            Some(other) => Some(other),
            None => {
                debug!("Ignoring activate on torn down adapter {}", self.instance);
                None
            }
        };
    }

    pub fn deactivate(&mut self, scene: &mut dyn SceneHost) {
        self.lifecycle = match self.lifecycle.take() {
            Some(Lifecycle::Active(component)) => {
                Some(Lifecycle::Ready(component.deactivate(scene)))
            }
            Some(mut other) => {
                debug!("Adapter {} is not active", self.instance);
                with_component!(&mut other, c => c.release(scene));
                Some(other)
            }
            None => None,
        };
    }

    /// Routes a notification to the active component; dropped otherwise
    pub fn dispatch(&mut self, event: &RawControllerEvent, ctx: &mut HostContext<'_>) {
        match &mut self.lifecycle {
            Some(Lifecycle::Active(component)) => component.dispatch(event, ctx),
            _ => debug!(
                "Dropping {} for inactive adapter {}",
                event.listener_kind(),
                self.instance
            ),
        }
    }

    /// Replaces the configuration; an active instance re-runs presence
    /// detection so tracked controls and the model follow the new values
    pub fn update_config(&mut self, config: ControlsConfig, ctx: &mut HostContext<'_>) {
        match &mut self.lifecycle {
            Some(Lifecycle::Active(component)) => {
                component.set_config(config, ctx.scene);
                component.reactivate(ctx);
            }
            Some(other) => with_component!(other, c => c.set_config(config, ctx.scene)),
            None => debug!("Ignoring config update on torn down adapter {}", self.instance),
        }
    }

    pub fn teardown(&mut self, scene: &mut dyn SceneHost) {
        match self.lifecycle.take() {
            Some(lifecycle) => with_component!(lifecycle, c => c.teardown(scene)),
            None => debug!("Adapter {} already torn down", self.instance),
        }
        info!("Adapter {} removed", self.instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::mapping_table::Hand;
    use crate::controller::raw_event::{ButtonState, ListenerKind};
    use crate::host::{DeviceCatalog, SceneState};
    use crate::lifecycle::component::AFRAME_CDN_ROOT;
    use crate::lifecycle::listeners::RAW_LISTENERS;

    struct Fixture {
        scene: SceneState,
        catalog: DeviceCatalog,
        handle: ControlsHandle,
        rx: mpsc::Receiver<SemanticEvent>,
    }

    impl Fixture {
        fn new(config: ControlsConfig) -> Self {
            let (tx, rx) = mpsc::channel(32);
            Self {
                scene: SceneState::default(),
                catalog: DeviceCatalog::default(),
                handle: ControlsHandle::new(InstanceId(1), config, AFRAME_CDN_ROOT, tx),
                rx,
            }
        }

        fn activate(&mut self) {
            let mut ctx = HostContext {
                scene: &mut self.scene,
                presence: &mut self.catalog,
            };
            self.handle.activate(&mut ctx);
        }

        fn dispatch(&mut self, event: RawControllerEvent) {
            let mut ctx = HostContext {
                scene: &mut self.scene,
                presence: &mut self.catalog,
            };
            self.handle.dispatch(&event, &mut ctx);
        }

        fn drain_names(&mut self) -> Vec<String> {
            let mut names = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                names.push(event.name());
            }
            names
        }
    }

    fn trigger(value: f32) -> RawControllerEvent {
        RawControllerEvent::ButtonChanged {
            id: 0,
            state: ButtonState {
                pressed: value > 0.5,
                touched: true,
                value,
            },
        }
    }

    #[test]
    fn walks_through_the_lifecycle() {
        let mut fx = Fixture::new(ControlsConfig::default());
        assert_eq!(fx.handle.state(), LifecycleState::Uninitialized);

        fx.handle.initialize();
        assert_eq!(fx.handle.state(), LifecycleState::Ready);

        fx.activate();
        assert_eq!(fx.handle.state(), LifecycleState::Active);

        fx.handle.deactivate(&mut fx.scene);
        assert_eq!(fx.handle.state(), LifecycleState::Ready);

        fx.handle.teardown(&mut fx.scene);
        assert_eq!(fx.handle.state(), LifecycleState::TornDown);
        assert!(fx.handle.config().is_none());
    }

    #[test]
    fn activate_initializes_on_demand() {
        let mut fx = Fixture::new(ControlsConfig::default());
        fx.activate();
        assert_eq!(fx.handle.state(), LifecycleState::Active);
    }

    #[test]
    fn double_activation_keeps_a_single_subscription_set() {
        let mut fx = Fixture::new(ControlsConfig::default());
        fx.activate();
        fx.activate();

        for kind in RAW_LISTENERS {
            assert_eq!(fx.scene.subscription_count(InstanceId(1), kind), 1);
        }
        assert_eq!(
            fx.scene
                .subscription_count(InstanceId(1), ListenerKind::ControllersUpdated),
            1
        );

        fx.dispatch(trigger(0.5));
        assert_eq!(fx.drain_names(), vec!["triggerchanged"]);
    }

    #[test]
    fn deactivating_an_inactive_instance_is_a_no_op() {
        let mut fx = Fixture::new(ControlsConfig::default());
        fx.handle.deactivate(&mut fx.scene);
        assert_eq!(fx.handle.state(), LifecycleState::Uninitialized);

        fx.handle.initialize();
        fx.handle.deactivate(&mut fx.scene);
        fx.handle.deactivate(&mut fx.scene);
        assert_eq!(fx.handle.state(), LifecycleState::Ready);
        assert_eq!(fx.scene.total_subscriptions(InstanceId(1)), 0);
        assert!(fx.drain_names().is_empty());
    }

    #[test]
    fn notifications_after_deactivation_are_inert() {
        let mut fx = Fixture::new(ControlsConfig::default());
        fx.activate();
        fx.handle.deactivate(&mut fx.scene);

        fx.dispatch(trigger(1.0));
        fx.dispatch(RawControllerEvent::ButtonDown { id: 5 });
        fx.dispatch(RawControllerEvent::ModelLoaded {
            target: InstanceId(1),
        });
        assert!(fx.drain_names().is_empty());
    }

    #[test]
    fn reactivation_restores_identical_translation() {
        let mut fx = Fixture::new(ControlsConfig {
            hand: Hand::Right,
            ..ControlsConfig::default()
        });
        let sequence = [
            trigger(0.2),
            RawControllerEvent::ButtonDown { id: 1 },
            RawControllerEvent::ButtonDown { id: 2 },
            RawControllerEvent::TouchStart { id: 5 },
            RawControllerEvent::ButtonUp { id: 6 },
        ];

        fx.activate();
        for event in sequence.iter().cloned() {
            fx.dispatch(event);
        }
        let first = fx.drain_names();

        fx.handle.deactivate(&mut fx.scene);
        fx.activate();
        for event in sequence.iter().cloned() {
            fx.dispatch(event);
        }
        let second = fx.drain_names();

        assert_eq!(
            first,
            vec!["triggerchanged", "squeezedown", "tiptouchstart", "dockup"]
        );
        assert_eq!(first, second);
    }

    #[test]
    fn config_update_while_active_re_checks_presence() {
        let mut fx = Fixture::new(ControlsConfig::default());
        fx.catalog.connect(crate::host::ConnectedDevice {
            id: "logitech-mx-ink".to_string(),
            profiles: Vec::new(),
            hand: Hand::Right,
        });
        fx.activate();
        assert_eq!(fx.catalog.pending_outcomes(), 0);

        let mut ctx = HostContext {
            scene: &mut fx.scene,
            presence: &mut fx.catalog,
        };
        fx.handle.update_config(
            ControlsConfig {
                hand: Hand::Right,
                ..ControlsConfig::default()
            },
            &mut ctx,
        );

        assert_eq!(fx.handle.config().map(|c| c.hand), Some(Hand::Right));
        assert_eq!(fx.catalog.pending_outcomes(), 1);
    }

    #[test]
    fn teardown_releases_subscriptions_from_any_state() {
        let mut fx = Fixture::new(ControlsConfig::default());
        fx.activate();
        fx.handle.teardown(&mut fx.scene);
        assert_eq!(fx.scene.total_subscriptions(InstanceId(1)), 0);

        fx.activate();
        fx.handle.teardown(&mut fx.scene);
        assert_eq!(fx.handle.state(), LifecycleState::TornDown);
        assert_eq!(fx.scene.total_subscriptions(InstanceId(1)), 0);
    }
}
