//! String-matching presence detection over a catalog of connected devices

use crate::controller::mapping_table::Hand;
use crate::controller::raw_event::RawControllerEvent;
use crate::host::{InstanceId, PresenceDetector, PresenceQuery};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

/// A live device as announced by the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedDevice {
    pub id: String,
    /// Alternate profile identifiers, most specific first
    pub profiles: Vec<String>,
    pub hand: Hand,
}

impl ConnectedDevice {
    pub fn matches(&self, profile: &str, query: &PresenceQuery) -> bool {
        if self.hand != query.hand {
            return false;
        }
        if self.id.starts_with(profile) {
            return true;
        }
        query.iterate_controller_profiles && self.profiles.iter().any(|p| p.starts_with(profile))
    }
}

/// Connected devices plus the queue of presence outcomes not yet delivered
///
/// Every successful check queues `ControllerPresent`; `ControllerLost` is
/// queued only when an instance that had a match loses it.
#[derive(Debug, Default)]
pub struct DeviceCatalog {
    devices: Vec<ConnectedDevice>,
    matched: HashMap<InstanceId, String>,
    outcomes: VecDeque<(InstanceId, RawControllerEvent)>,
}

impl DeviceCatalog {
    pub fn connect(&mut self, device: ConnectedDevice) {
        info!("Device connected: {} ({} hand)", device.id, device.hand);
        self.devices.retain(|d| d.id != device.id);
        self.devices.push(device);
    }

    pub fn disconnect(&mut self, id: &str) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| d.id != id);
        let removed = self.devices.len() != before;
        if removed {
            info!("Device disconnected: {}", id);
        } else {
            debug!("Disconnect for unknown device {}", id);
        }
        removed
    }

    pub fn devices(&self) -> &[ConnectedDevice] {
        &self.devices
    }

    pub fn find_match(&self, profile: &str, query: &PresenceQuery) -> Option<&ConnectedDevice> {
        self.devices.iter().find(|d| d.matches(profile, query))
    }

    pub fn pop_outcome(&mut self) -> Option<(InstanceId, RawControllerEvent)> {
        self.outcomes.pop_front()
    }

    pub fn pending_outcomes(&self) -> usize {
        self.outcomes.len()
    }
}

impl PresenceDetector for DeviceCatalog {
    fn check_controller_present(
        &mut self,
        instance: InstanceId,
        profile: &'static str,
        query: PresenceQuery,
    ) {
        let found = self.find_match(profile, &query).map(|d| d.id.clone());
        match found {
            Some(device_id) => {
                debug!("{} matches {} for {}", device_id, profile, instance);
                self.matched.insert(instance, device_id);
                self.outcomes.push_back((
                    instance,
                    RawControllerEvent::ControllerPresent {
                        target: instance,
                        profile: profile.to_string(),
                    },
                ));
            }
            None => {
                if self.matched.remove(&instance).is_some() {
                    let lost = RawControllerEvent::ControllerLost { target: instance };
                    self.outcomes.push_back((instance, lost));
                } else {
                    debug!("No {} controller on {} hand for {}", profile, query.hand, instance);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(hand: Hand, iterate: bool) -> PresenceQuery {
        PresenceQuery {
            hand,
            iterate_controller_profiles: iterate,
        }
    }

    fn stylus(hand: Hand) -> ConnectedDevice {
        ConnectedDevice {
            id: "logitech-mx-ink".to_string(),
            profiles: vec!["logitech-mx-ink".to_string()],
            hand,
        }
    }

    #[test]
    fn matches_on_id_prefix_and_hand() {
        let device = stylus(Hand::Right);
        assert!(device.matches("logitech-mx-ink", &query(Hand::Right, false)));
        assert!(!device.matches("logitech-mx-ink", &query(Hand::Left, false)));
        assert!(!device.matches("oculus-touch", &query(Hand::Right, true)));
    }

    #[test]
    fn alternate_profiles_only_count_when_iterating() {
        let device = ConnectedDevice {
            id: "generic-stylus".to_string(),
            profiles: vec!["logitech-mx-ink-v2".to_string(), "generic-trigger".to_string()],
            hand: Hand::Left,
        };
        assert!(!device.matches("logitech-mx-ink", &query(Hand::Left, false)));
        assert!(device.matches("logitech-mx-ink", &query(Hand::Left, true)));
    }

    #[test]
    fn absence_is_silent_until_a_match_is_lost() {
        let mut catalog = DeviceCatalog::default();
        let instance = InstanceId(0);

        catalog.check_controller_present(instance, "logitech-mx-ink", query(Hand::Left, true));
        assert_eq!(catalog.pending_outcomes(), 0);

        catalog.connect(stylus(Hand::Left));
        catalog.check_controller_present(instance, "logitech-mx-ink", query(Hand::Left, true));
        assert_eq!(
            catalog.pop_outcome(),
            Some((
                instance,
                RawControllerEvent::ControllerPresent {
                    target: instance,
                    profile: "logitech-mx-ink".to_string(),
                }
            ))
        );

        assert!(catalog.disconnect("logitech-mx-ink"));
        catalog.check_controller_present(instance, "logitech-mx-ink", query(Hand::Left, true));
        assert_eq!(
            catalog.pop_outcome(),
            Some((instance, RawControllerEvent::ControllerLost { target: instance }))
        );

        catalog.check_controller_present(instance, "logitech-mx-ink", query(Hand::Left, true));
        assert_eq!(catalog.pop_outcome(), None);
    }

    #[test]
    fn reconnecting_replaces_the_device_entry() {
        let mut catalog = DeviceCatalog::default();
        catalog.connect(stylus(Hand::Left));
        catalog.connect(stylus(Hand::Right));
        assert_eq!(catalog.devices(), &[stylus(Hand::Right)]);
        assert!(!catalog.disconnect("unknown"));
    }
}
