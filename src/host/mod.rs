//! Host boundary
//!
//! The adapter never owns the scene, the device catalog or the asset loader.
//! It reaches them through the two traits below:
//!
//! ```text
//!                ┌──────────────► SceneHost        (subscriptions, AR mode,
//! MxInkControls ─┤                                  tracked controls, models)
//!                └──────────────► PresenceDetector (fire-and-forget checks)
//! ```
//!
//! [`scene::Scene`] is an in-process implementation used by the binary and
//! the tests; [`presence::DeviceCatalog`] matches connected devices by id.

pub mod presence;
pub mod scene;

pub use presence::{ConnectedDevice, DeviceCatalog};
pub use scene::{HostNotification, Scene, SceneError, SceneState};

use crate::controller::mapping_table::Hand;
use crate::controller::raw_event::ListenerKind;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one adapter instance (the entity it is attached to)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingSpace {
    GripSpace,
    TargetRaySpace,
}

/// Generic pose tracking requested once a matching device is confirmed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedControlsSettings {
    pub hand: Hand,
    pub id_prefix: &'static str,
    pub orientation_offset: Vec3,
    pub space: TrackingSpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceQuery {
    pub hand: Hand,
    /// Also accept devices listing the profile among their alternate profiles
    pub iterate_controller_profiles: bool,
}

pub trait SceneHost {
    fn subscribe(&mut self, instance: InstanceId, kind: ListenerKind);

    fn unsubscribe(&mut self, instance: InstanceId, kind: ListenerKind);

    fn is_ar_mode(&self) -> bool;

    fn set_mesh_visible(&mut self, instance: InstanceId, visible: bool);

    fn set_tracked_controls(&mut self, instance: InstanceId, settings: TrackedControlsSettings);

    fn remove_tracked_controls(&mut self, instance: InstanceId);

    /// Requests the asset loader to attach a model; completion arrives later
    /// as a `ModelLoaded` notification
    fn attach_model(&mut self, instance: InstanceId, url: &str);
}

/// Presence detection collaborator
///
/// Checks are fire-and-forget. Outcomes come back as `ControllerPresent` /
/// `ControllerLost` notifications addressed to the instance.
pub trait PresenceDetector {
    fn check_controller_present(
        &mut self,
        instance: InstanceId,
        profile: &'static str,
        query: PresenceQuery,
    );
}

/// Everything a handler may touch while it runs
pub struct HostContext<'a> {
    pub scene: &'a mut dyn SceneHost,
    pub presence: &'a mut dyn PresenceDetector,
}
