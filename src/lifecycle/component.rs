//! MX Ink adapter component with statum typestate lifecycle
//!
//! # State Machine
//!
//! ```text
//! Uninitialized ──► Ready ◄──► Active
//!       │             │          │
//!       └─────────────┴──────────┴──► torn down (teardown consumes the machine)
//! ```
//!
//! `initialize` builds the handler table, `activate` triggers a presence
//! check and attaches listeners, `deactivate` detaches them again. Only the
//! `Active` state can dispatch notifications.

use crate::config::ControlsConfig;
use crate::controller::mapping_table::{COMPONENT_NAME, GAMEPAD_ID};
use crate::controller::raw_event::{ButtonEventKind, ListenerKind, RawControllerEvent};
use crate::controller::semantic_event::{SemanticEvent, SemanticPayload};
use crate::controller::translator::InputTranslator;
use crate::host::{
    HostContext, InstanceId, PresenceDetector, PresenceQuery, SceneHost, TrackedControlsSettings,
    TrackingSpace,
};
use crate::lifecycle::listeners::{HandlerTable, ListenerSet};
use glam::Vec3;
use statum::{machine, state, transition};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const AFRAME_CDN_ROOT: &str = "https://cdn.aframe.io/";
const MODEL_GLB_PATH: &str = "controllers/logitech/";

/// URL of the stylus model below the given content root
pub fn model_url(cdn_root: &str) -> String {
    let root = cdn_root.trim_end_matches('/');
    format!("{root}/{MODEL_GLB_PATH}{GAMEPAD_ID}.glb")
}

#[state]
#[derive(Debug, Clone)]
pub enum ComponentState {
    Uninitialized,
    Ready,
    Active,
}

#[machine]
#[derive(Debug)]
pub struct MxInkControls<ComponentState> {
    instance: InstanceId,
    config: ControlsConfig,
    model_url: String,
    translator: InputTranslator,
    handlers: HandlerTable,
    listeners: ListenerSet,
    output: mpsc::Sender<SemanticEvent>,
    controller_present: bool,
    model_loaded: bool,
}

impl<S: ComponentStateTrait> MxInkControls<S> {
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn is_controller_present(&self) -> bool {
        self.controller_present
    }

    /// Replaces the configuration
    ///
    /// Tracked controls derived from the old values are removed, so the next
    /// presence confirmation re-applies them with the new ones.
    pub fn set_config(&mut self, config: ControlsConfig, scene: &mut dyn SceneHost) {
        debug!("Updating config of {}: {:?}", self.instance, config);
        self.config = config;
        if self.controller_present {
            self.controller_present = false;
            scene.remove_tracked_controls(self.instance);
        }
    }

    /// Drops every subscription; safe to call in any state
    pub fn release(&mut self, scene: &mut dyn SceneHost) {
        self.listeners.detach(self.instance, scene);
        self.listeners.unwatch_presence(self.instance, scene);
    }

    pub fn teardown(mut self, scene: &mut dyn SceneHost) {
        self.release(scene);
        info!("Adapter {} torn down", self.instance);
    }

    fn check_if_controller_present(&self, presence: &mut dyn PresenceDetector) {
        debug!(
            "Checking for {} controller on {} hand ({})",
            GAMEPAD_ID, self.config.hand, self.instance
        );
        presence.check_controller_present(
            self.instance,
            GAMEPAD_ID,
            PresenceQuery {
                hand: self.config.hand,
                iterate_controller_profiles: true,
            },
        );
    }

    fn emit(&self, payload: SemanticPayload) {
        let event = SemanticEvent {
            source: self.instance,
            payload,
        };
        debug!("Emitting {} from {}", event.name(), self.instance);
        if let Err(e) = self.output.try_send(event) {
            warn!("Dropping semantic event from {}: {}", self.instance, e);
        }
    }
}

impl MxInkControls<Uninitialized> {
    pub fn create(
        instance: InstanceId,
        config: ControlsConfig,
        cdn_root: &str,
        output: mpsc::Sender<SemanticEvent>,
    ) -> Self {
        debug!("Creating adapter {} with config {:?}", instance, config);
        Self::builder()
            .instance(instance)
            .config(config)
            .model_url(model_url(cdn_root))
            .translator(InputTranslator::default())
            .handlers(HandlerTable::default())
            .listeners(ListenerSet::default())
            .output(output)
            .controller_present(false)
            .model_loaded(false)
            .build()
    }
}

#[transition]
impl MxInkControls<Uninitialized> {
    pub fn initialize(mut self) -> MxInkControls<Ready> {
        self.handlers = HandlerTable::default()
            .with(ListenerKind::ButtonChanged, MxInkControls::<Active>::on_button_changed)
            .with(ListenerKind::ButtonDown, MxInkControls::<Active>::on_button_event)
            .with(ListenerKind::ButtonUp, MxInkControls::<Active>::on_button_event)
            .with(ListenerKind::TouchStart, MxInkControls::<Active>::on_button_event)
            .with(ListenerKind::TouchEnd, MxInkControls::<Active>::on_button_event)
            .with(ListenerKind::AxisMove, MxInkControls::<Active>::on_axis_moved)
            .with(ListenerKind::ModelLoaded, MxInkControls::<Active>::on_model_loaded)
            .with(
                ListenerKind::ControllersUpdated,
                MxInkControls::<Active>::on_controllers_update,
            )
            .with(ListenerKind::EnterArMode, MxInkControls::<Active>::on_enter_ar)
            .with(ListenerKind::ExitArMode, MxInkControls::<Active>::on_exit_ar)
            .with(ListenerKind::Presence, MxInkControls::<Active>::on_presence);

        info!(
            "Adapter {} initialized ({} hand, {} handlers)",
            self.instance,
            self.config.hand,
            self.handlers.len()
        );
        self.transition()
    }
}

#[transition]
impl MxInkControls<Ready> {
    pub fn activate(mut self, ctx: &mut HostContext<'_>) -> MxInkControls<Active> {
        info!("Activating adapter {}", self.instance);
        self.check_if_controller_present(ctx.presence);
        self.listeners.watch_presence(self.instance, ctx.scene);
        self.listeners.attach(self.instance, ctx.scene);
        self.transition()
    }
}

#[transition]
impl MxInkControls<Active> {
    pub fn deactivate(mut self, scene: &mut dyn SceneHost) -> MxInkControls<Ready> {
        info!("Deactivating adapter {}", self.instance);
        self.release(scene);
        self.transition()
    }
}

impl MxInkControls<Active> {
    /// Activation requested again while active: re-check presence only
    pub fn reactivate(&mut self, ctx: &mut HostContext<'_>) {
        debug!("Adapter {} already active", self.instance);
        self.check_if_controller_present(ctx.presence);
        self.listeners.watch_presence(self.instance, ctx.scene);
        self.listeners.attach(self.instance, ctx.scene);
    }

    pub fn dispatch(&mut self, event: &RawControllerEvent, ctx: &mut HostContext<'_>) {
        let kind = event.listener_kind();
        if !self.listeners.accepts(kind) {
            debug!("No {} listener on {}, dropping notification", kind, self.instance);
            return;
        }
        match self.handlers.get(kind) {
            Some(handler) => handler(self, event, ctx),
            None => debug!("No handler for {} on {}", kind, self.instance),
        }
    }

    fn on_button_changed(&mut self, event: &RawControllerEvent, _ctx: &mut HostContext<'_>) {
        let RawControllerEvent::ButtonChanged { id, state } = event else {
            return;
        };
        if let Some(translation) = self
            .translator
            .on_button_changed(self.config.hand, *id, state)
        {
            self.emit(translation.payload);
        }
    }

    fn on_button_event(&mut self, event: &RawControllerEvent, _ctx: &mut HostContext<'_>) {
        let (id, kind) = match event {
            RawControllerEvent::ButtonDown { id } => (*id, ButtonEventKind::Down),
            RawControllerEvent::ButtonUp { id } => (*id, ButtonEventKind::Up),
            RawControllerEvent::TouchStart { id } => (*id, ButtonEventKind::TouchStart),
            RawControllerEvent::TouchEnd { id } => (*id, ButtonEventKind::TouchEnd),
            _ => return,
        };
        if let Some(payload) = self.translator.on_button_event(id, kind, self.config.hand) {
            self.emit(payload);
        }
    }

    fn on_axis_moved(&mut self, event: &RawControllerEvent, _ctx: &mut HostContext<'_>) {
        let RawControllerEvent::AxisMove(axes) = event else {
            return;
        };
        for payload in self.translator.on_axis_moved(self.config.hand, axes) {
            self.emit(payload);
        }
    }

    fn on_model_loaded(&mut self, event: &RawControllerEvent, ctx: &mut HostContext<'_>) {
        let RawControllerEvent::ModelLoaded { target } = event else {
            return;
        };
        if *target != self.instance || !self.config.model {
            debug!("Ignoring model-loaded for {} on {}", target, self.instance);
            return;
        }

        self.model_loaded = true;
        self.emit(SemanticPayload::ControllerModelReady {
            name: COMPONENT_NAME,
            model: self.config.model,
            ray_origin: Vec3::ZERO,
        });

        if ctx.scene.is_ar_mode() {
            debug!("Hiding controller mesh of {} in AR mode", self.instance);
            ctx.scene.set_mesh_visible(self.instance, false);
        }
    }

    fn on_controllers_update(&mut self, _event: &RawControllerEvent, ctx: &mut HostContext<'_>) {
        self.check_if_controller_present(ctx.presence);
    }

    fn on_presence(&mut self, event: &RawControllerEvent, ctx: &mut HostContext<'_>) {
        match event {
            RawControllerEvent::ControllerPresent { target, profile }
                if *target == self.instance =>
            {
                if self.controller_present {
                    return;
                }
                info!("Controller {} present for {}", profile, self.instance);
                self.controller_present = true;
                self.inject_tracked_controls(ctx.scene);
            }
            RawControllerEvent::ControllerLost { target } if *target == self.instance => {
                if !self.controller_present {
                    return;
                }
                info!("Controller lost for {}", self.instance);
                self.controller_present = false;
                ctx.scene.remove_tracked_controls(self.instance);
            }
            _ => debug!("Ignoring presence outcome not addressed to {}", self.instance),
        }
    }

    fn on_enter_ar(&mut self, _event: &RawControllerEvent, ctx: &mut HostContext<'_>) {
        if self.model_loaded && self.config.model {
            ctx.scene.set_mesh_visible(self.instance, false);
        }
    }

    fn on_exit_ar(&mut self, _event: &RawControllerEvent, ctx: &mut HostContext<'_>) {
        if self.model_loaded && self.config.model {
            ctx.scene.set_mesh_visible(self.instance, true);
        }
    }

    fn inject_tracked_controls(&self, scene: &mut dyn SceneHost) {
        scene.set_tracked_controls(
            self.instance,
            TrackedControlsSettings {
                hand: self.config.hand,
                id_prefix: GAMEPAD_ID,
                orientation_offset: self.config.orientation_offset,
                space: TrackingSpace::GripSpace,
            },
        );
        if !self.config.model {
            return;
        }
        scene.attach_model(self.instance, &self.model_url);
    }
}
