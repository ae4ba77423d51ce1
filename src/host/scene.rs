//! In-process scene: subscription registry, dispatcher and host state
//!
//! # Architecture
//!
//! ```text
//! HostNotification ──► Scene::handle_notification
//!                          │
//!                          ├─► publish ──► ControlsHandle::dispatch (once per subscription)
//!                          │
//!                          └─► drain ──► presence outcomes ──► model loads
//! ```
//!
//! Subscriptions are counted rather than deduplicated, so an instance that
//! subscribed twice would really see every notification twice.

use crate::config::ControlsConfig;
use crate::controller::mapping_table::Hand;
use crate::controller::raw_event::{ListenerKind, RawControllerEvent};
use crate::controller::semantic_event::SemanticEvent;
use crate::host::presence::{ConnectedDevice, DeviceCatalog};
use crate::host::{HostContext, InstanceId, SceneHost, TrackedControlsSettings};
use crate::lifecycle::handle::ControlsHandle;
use chrono::{DateTime, Local};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("Instance {0} already exists")]
    DuplicateInstance(InstanceId),

    #[error("Unknown instance {0}")]
    UnknownInstance(InstanceId),
}

/// Notifications fed into the scene from outside (gamepad thread, tests)
#[derive(Debug, Clone)]
pub enum HostNotification {
    /// Raw input from the device currently assigned to `hand`
    Input {
        hand: Hand,
        event: RawControllerEvent,
        timestamp: DateTime<Local>,
    },
    DeviceConnected(ConnectedDevice),
    DeviceDisconnected { id: String },
    /// Scene-wide notification such as AR mode changes
    Broadcast(RawControllerEvent),
}

/// Host-side state touched by adapter instances
#[derive(Debug, Default)]
pub struct SceneState {
    subscriptions: HashMap<(InstanceId, ListenerKind), usize>,
    ar_mode: bool,
    mesh_visible: HashMap<InstanceId, bool>,
    tracked_controls: HashMap<InstanceId, TrackedControlsSettings>,
    models: HashMap<InstanceId, String>,
    model_requests: HashMap<InstanceId, usize>,
    pending_loads: VecDeque<InstanceId>,
}

impl SceneState {
    pub fn subscription_count(&self, instance: InstanceId, kind: ListenerKind) -> usize {
        self.subscriptions
            .get(&(instance, kind))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_subscriptions(&self, instance: InstanceId) -> usize {
        self.subscriptions
            .iter()
            .filter(|((id, _), _)| *id == instance)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn set_ar_mode(&mut self, ar_mode: bool) {
        self.ar_mode = ar_mode;
    }

    /// Visibility of the instance's mesh; `None` until the host touched it
    pub fn mesh_visible(&self, instance: InstanceId) -> Option<bool> {
        self.mesh_visible.get(&instance).copied()
    }

    pub fn tracked_controls(&self, instance: InstanceId) -> Option<&TrackedControlsSettings> {
        self.tracked_controls.get(&instance)
    }

    pub fn model_url(&self, instance: InstanceId) -> Option<&str> {
        self.models.get(&instance).map(String::as_str)
    }

    pub fn model_requests(&self, instance: InstanceId) -> usize {
        self.model_requests.get(&instance).copied().unwrap_or(0)
    }

    fn forget(&mut self, instance: InstanceId) {
        self.mesh_visible.remove(&instance);
        self.tracked_controls.remove(&instance);
        self.models.remove(&instance);
        self.pending_loads.retain(|id| *id != instance);
    }
}

impl SceneHost for SceneState {
    fn subscribe(&mut self, instance: InstanceId, kind: ListenerKind) {
        *self.subscriptions.entry((instance, kind)).or_insert(0) += 1;
    }

    fn unsubscribe(&mut self, instance: InstanceId, kind: ListenerKind) {
        if let Some(count) = self.subscriptions.get_mut(&(instance, kind)) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.subscriptions.remove(&(instance, kind));
            }
        }
    }

    fn is_ar_mode(&self) -> bool {
        self.ar_mode
    }

    fn set_mesh_visible(&mut self, instance: InstanceId, visible: bool) {
        self.mesh_visible.insert(instance, visible);
    }

    fn set_tracked_controls(&mut self, instance: InstanceId, settings: TrackedControlsSettings) {
        debug!("Tracked controls for {}: {:?}", instance, settings);
        self.tracked_controls.insert(instance, settings);
    }

    fn remove_tracked_controls(&mut self, instance: InstanceId) {
        self.tracked_controls.remove(&instance);
    }

    fn attach_model(&mut self, instance: InstanceId, url: &str) {
        info!("Loading model for {}: {}", instance, url);
        self.models.insert(instance, url.to_string());
        *self.model_requests.entry(instance).or_insert(0) += 1;
        self.pending_loads.push_back(instance);
    }
}

pub struct Scene {
    state: SceneState,
    catalog: DeviceCatalog,
    components: BTreeMap<InstanceId, ControlsHandle>,
    /// Complete model requests right away instead of waiting for a loader
    complete_model_loads: bool,
}

impl Scene {
    pub fn new(catalog: DeviceCatalog) -> Self {
        Self {
            state: SceneState::default(),
            catalog,
            components: BTreeMap::new(),
            complete_model_loads: true,
        }
    }

    pub fn with_model_loads(mut self, complete: bool) -> Self {
        self.complete_model_loads = complete;
        self
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    pub fn catalog(&self) -> &DeviceCatalog {
        &self.catalog
    }

    pub fn handle(&self, instance: InstanceId) -> Option<&ControlsHandle> {
        self.components.get(&instance)
    }

    pub fn instances(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.components.keys().copied()
    }

    /// Creates and initializes an adapter instance
    pub fn spawn(
        &mut self,
        instance: InstanceId,
        config: ControlsConfig,
        cdn_root: &str,
        output: mpsc::Sender<SemanticEvent>,
    ) -> Result<(), SceneError> {
        if self.components.contains_key(&instance) {
            return Err(SceneError::DuplicateInstance(instance));
        }
        let mut handle = ControlsHandle::new(instance, config, cdn_root, output);
        handle.initialize();
        self.components.insert(instance, handle);
        Ok(())
    }

    pub fn activate(&mut self, instance: InstanceId) -> Result<(), SceneError> {
        let handle = self
            .components
            .get_mut(&instance)
            .ok_or(SceneError::UnknownInstance(instance))?;
        let mut ctx = HostContext {
            scene: &mut self.state,
            presence: &mut self.catalog,
        };
        handle.activate(&mut ctx);
        self.drain();
        Ok(())
    }

    pub fn deactivate(&mut self, instance: InstanceId) -> Result<(), SceneError> {
        let handle = self
            .components
            .get_mut(&instance)
            .ok_or(SceneError::UnknownInstance(instance))?;
        handle.deactivate(&mut self.state);
        Ok(())
    }

    pub fn update_config(
        &mut self,
        instance: InstanceId,
        config: ControlsConfig,
    ) -> Result<(), SceneError> {
        let handle = self
            .components
            .get_mut(&instance)
            .ok_or(SceneError::UnknownInstance(instance))?;
        let mut ctx = HostContext {
            scene: &mut self.state,
            presence: &mut self.catalog,
        };
        handle.update_config(config, &mut ctx);
        self.drain();
        Ok(())
    }

    /// Tears the instance down and forgets everything the host kept for it
    pub fn remove(&mut self, instance: InstanceId) -> Result<(), SceneError> {
        let mut handle = self
            .components
            .remove(&instance)
            .ok_or(SceneError::UnknownInstance(instance))?;
        handle.teardown(&mut self.state);
        self.state.forget(instance);
        Ok(())
    }

    /// Deactivates and removes every instance
    pub fn shutdown(&mut self) {
        let instances: Vec<_> = self.components.keys().copied().collect();
        info!("Shutting down {} adapter instance(s)", instances.len());
        for instance in instances {
            if let Err(e) = self.deactivate(instance).and_then(|_| self.remove(instance)) {
                warn!("Failed to remove {}: {}", instance, e);
            }
        }
    }

    /// Delivers a notification to `target` (or every instance when `None`)
    pub fn publish(&mut self, target: Option<InstanceId>, event: RawControllerEvent) {
        match event {
            RawControllerEvent::EnterArMode => self.state.set_ar_mode(true),
            RawControllerEvent::ExitArMode => self.state.set_ar_mode(false),
            _ => {}
        }
        self.deliver(target, &event);
        self.drain();
    }

    /// Delivers raw input to every instance configured for `hand`
    pub fn publish_to_hand(&mut self, hand: Hand, event: RawControllerEvent) {
        let targets: Vec<_> = self
            .components
            .iter()
            .filter(|(_, handle)| handle.config().is_some_and(|c| c.hand == hand))
            .map(|(instance, _)| *instance)
            .collect();
        if targets.is_empty() {
            debug!("No instance for {} hand, dropping {}", hand, event.listener_kind());
        }
        for instance in targets {
            self.deliver(Some(instance), &event);
        }
        self.drain();
    }

    pub fn connect_device(&mut self, device: ConnectedDevice) {
        self.catalog.connect(device);
        self.publish(None, RawControllerEvent::ControllersUpdated);
    }

    pub fn disconnect_device(&mut self, id: &str) {
        if self.catalog.disconnect(id) {
            self.publish(None, RawControllerEvent::ControllersUpdated);
        }
    }

    pub fn handle_notification(&mut self, notification: HostNotification) {
        match notification {
            HostNotification::Input {
                hand,
                event,
                timestamp,
            } => {
                debug!(
                    "Input for {} hand at {}: {:?}",
                    hand,
                    timestamp.format("%H:%M:%S.%3f"),
                    event
                );
                self.publish_to_hand(hand, event);
            }
            HostNotification::DeviceConnected(device) => self.connect_device(device),
            HostNotification::DeviceDisconnected { id } => self.disconnect_device(&id),
            HostNotification::Broadcast(event) => self.publish(None, event),
        }
    }

    /// Dispatches host notifications until cancelled or the channel closes
    pub async fn run(
        mut self,
        mut notifications: mpsc::Receiver<HostNotification>,
        cancel: CancellationToken,
    ) -> Self {
        info!("Scene dispatcher running");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Scene dispatcher cancelled");
                    break;
                }
                next = notifications.recv() => match next {
                    Some(notification) => self.handle_notification(notification),
                    None => {
                        info!("Notification channel closed");
                        break;
                    }
                }
            }
        }
        self
    }

    fn deliver(&mut self, target: Option<InstanceId>, event: &RawControllerEvent) {
        let kind = event.listener_kind();
        for (instance, handle) in self.components.iter_mut() {
            if target.is_some_and(|t| t != *instance) {
                continue;
            }
            let count = self.state.subscription_count(*instance, kind);
            let mut ctx = HostContext {
                scene: &mut self.state,
                presence: &mut self.catalog,
            };
            for _ in 0..count {
                handle.dispatch(event, &mut ctx);
            }
        }
    }

    /// Delivers queued presence outcomes and completed model loads
    fn drain(&mut self) {
        loop {
            if let Some((instance, outcome)) = self.catalog.pop_outcome() {
                self.deliver(Some(instance), &outcome);
                continue;
            }
            if !self.complete_model_loads {
                break;
            }
            match self.state.pending_loads.pop_front() {
                Some(instance) => {
                    let loaded = RawControllerEvent::ModelLoaded { target: instance };
                    self.deliver(Some(instance), &loaded)
                }
                None => break,
            }
        }
    }
}
