use crate::controller::mapping_table::Hand;
use crate::controller::raw_event::{AxisMove, ButtonState, RawControllerEvent};
use crate::host::{ConnectedDevice, HostNotification};
use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use statum::{machine, state, transition};
use std::collections::HashMap;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Analog value above which a button counts as pressed
const PRESS_THRESHOLD: f32 = 0.5;

// Raw axis slots: left stick x/y, right stick x/y
const AXIS_COUNT: usize = 4;

// Collector settings
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    pub poll_interval_us: u64,
    pub axis_deadzone: f32,
    pub device_profiles: Vec<String>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            poll_interval_us: 100,
            axis_deadzone: 0.05,
            device_profiles: Vec::new(),
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),
}

// Define collector states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<CollectionState> {
    // Gilrs context
    gilrs: Gilrs,

    settings: CollectorSettings,

    // Channel into the scene dispatcher
    sender: mpsc::Sender<HostNotification>,

    // Hand assigned to each connected gamepad
    hands: HashMap<GamepadId, Hand>,

    // Last seen axis values per gamepad
    axes: HashMap<GamepadId, [f32; AXIS_COUNT]>,
}

impl<S: CollectionStateTrait> EventCollector<S> {
    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    fn send(&self, notification: HostNotification) -> Result<(), CollectorError> {
        self.sender
            .blocking_send(notification)
            .map_err(|e| CollectorError::EventSendError(e.to_string()))
    }

    // Registers a gamepad and announces it as a device
    fn announce(&mut self, id: GamepadId) -> Result<(), CollectorError> {
        let hand = next_hand(self.hands.values());
        self.hands.insert(id, hand);
        self.axes.insert(id, [0.0; AXIS_COUNT]);

        let name = self.gilrs.gamepad(id).name().to_string();
        let device = ConnectedDevice {
            id: device_id(&name),
            profiles: self.settings.device_profiles.clone(),
            hand,
        };
        info!("Gamepad {} ({}) assigned to {} hand", name, id, hand);
        self.send(HostNotification::DeviceConnected(device))
    }
}

impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        sender: mpsc::Sender<HostNotification>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::builder()
            .gilrs(gilrs)
            .settings(settings)
            .sender(sender)
            .hands(HashMap::new())
            .axes(HashMap::new())
            .build())
    }

    // Announce already connected gamepads and transition to Collecting state
    pub fn initialize(mut self) -> Result<EventCollector<Collecting>, CollectorError> {
        let connected: Vec<GamepadId> = self.gilrs.gamepads().map(|(id, _)| id).collect();

        if connected.is_empty() {
            warn!("No gamepad connected, waiting for one");
        } else {
            info!("Found {} gamepads", connected.len());
        }
        for id in connected {
            self.announce(id)?;
        }

        Ok(self.start_collecting())
    }
}

#[transition]
impl EventCollector<Initializing> {
    fn start_collecting(self) -> EventCollector<Collecting> {
        info!("Event Collector initialized, transitioning to Collecting state");
        self.transition()
    }
}

impl EventCollector<Collecting> {
    // Forward a single gilrs event, if any is pending
    pub fn collect_next_event(&mut self) -> Result<bool, CollectorError> {
        let Some(Event { id, event, .. }) = self.gilrs.next_event() else {
            return Ok(false);
        };

        match event {
            EventType::Connected => {
                self.announce(id)?;
            }
            EventType::Disconnected => {
                self.axes.remove(&id);
                if self.hands.remove(&id).is_some() {
                    let name = self.gilrs.gamepad(id).name().to_string();
                    warn!("Gamepad {} ({}) disconnected", name, id);
                    self.send(HostNotification::DeviceDisconnected { id: device_id(&name) })?;
                }
            }
            other => {
                let Some(hand) = self.hands.get(&id).copied() else {
                    debug!("Event from unannounced gamepad {}: {:?}", id, other);
                    return Ok(true);
                };
                if let Some(raw_event) = self.convert_gilrs_event(id, other) {
                    self.send(HostNotification::Input {
                        hand,
                        event: raw_event,
                        timestamp: Local::now(),
                    })?;
                }
            }
        }
        Ok(true)
    }

    // Run the collector until cancelled
    pub fn run_collection_loop(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), CollectorError> {
        info!("Starting Event Collector loop");
        let idle = std::time::Duration::from_micros(self.settings.poll_interval_us);

        while !cancel.is_cancelled() {
            match self.collect_next_event() {
                Ok(true) => {}
                Ok(false) => std::thread::sleep(idle),
                Err(e @ CollectorError::EventSendError(_)) => {
                    error!("Scene no longer receiving: {}", e);
                    return Err(e);
                }
                Err(e) => error!("Error collecting event: {}", e),
            }
        }

        info!("Event Collector stopped");
        Ok(())
    }

    fn convert_gilrs_event(
        &mut self,
        id: GamepadId,
        event: EventType,
    ) -> Option<RawControllerEvent> {
        match event {
            EventType::ButtonChanged(button, value, _) => {
                let id = raw_button_id(button)?;
                Some(RawControllerEvent::ButtonChanged {
                    id,
                    state: button_state(value),
                })
            }
            EventType::ButtonPressed(button, _) => {
                raw_button_id(button).map(|id| RawControllerEvent::ButtonDown { id })
            }
            EventType::ButtonReleased(button, _) => {
                raw_button_id(button).map(|id| RawControllerEvent::ButtonUp { id })
            }
            EventType::AxisChanged(axis, value, _) => {
                let index = raw_axis_index(axis)?;
                let deadzone = self.settings.axis_deadzone;
                let values = self.axes.entry(id).or_insert([0.0; AXIS_COUNT]);
                values[index] = apply_deadzone(value, deadzone);

                let mut changed = vec![false; AXIS_COUNT];
                changed[index] = true;
                Some(RawControllerEvent::AxisMove(AxisMove {
                    axis: values.to_vec(),
                    changed,
                }))
            }
            EventType::ButtonRepeated(button, _) => {
                debug!("Button repeat ignored: {:?}", button);
                None
            }
            _ => {
                debug!("Unhandled event type: {:?}", event);
                None
            }
        }
    }
}

// Owns the polling thread
pub struct CollectorHandle {
    thread: Option<JoinHandle<()>>,
}

impl CollectorHandle {
    // Start polling on a dedicated thread; resolves once gilrs is up
    pub async fn spawn(
        settings: Option<CollectorSettings>,
        sender: mpsc::Sender<HostNotification>,
        cancel: CancellationToken,
    ) -> Result<Self, CollectorError> {
        info!("Spawning Event Collector with settings: {:?}", settings);
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name("gamepad-collector".to_string())
            .spawn(move || {
                let collector = EventCollector::create(settings, sender)
                    .and_then(|collector| collector.initialize());
                let mut collecting = match collector {
                    Ok(collecting) => {
                        let _ = ready_tx.send(Ok(()));
                        collecting
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = collecting.run_collection_loop(&cancel) {
                    error!("Collector thread terminated with error: {}", e);
                }
            })
            .map_err(|e| CollectorError::InitializationError(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                info!("Event Collector successfully started");
                Ok(Self {
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CollectorError::InitializationError(
                "Collector thread exited during startup".to_string(),
            )),
        }
    }

    // Wait for the polling thread; it only returns once its token is cancelled
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Collector thread panicked");
            }
        }
    }
}

// Raw ids follow the xr-standard gamepad layout
fn raw_button_id(button: Button) -> Option<u32> {
    match button {
        Button::RightTrigger2 => Some(0),
        Button::RightTrigger => Some(1),
        Button::LeftThumb => Some(2),
        Button::RightThumb => Some(3),
        Button::South => Some(4),
        Button::East => Some(5),
        Button::North => Some(6),
        _ => None,
    }
}

fn raw_axis_index(axis: Axis) -> Option<usize> {
    match axis {
        Axis::LeftStickX => Some(0),
        Axis::LeftStickY => Some(1),
        Axis::RightStickX => Some(2),
        Axis::RightStickY => Some(3),
        _ => None,
    }
}

// Hand with fewer gamepads assigned; right wins a tie
fn next_hand<'a>(assigned: impl IntoIterator<Item = &'a Hand>) -> Hand {
    let (left, right) = assigned
        .into_iter()
        .fold((0usize, 0usize), |(left, right), hand| match hand {
            Hand::Left => (left + 1, right),
            Hand::Right => (left, right + 1),
        });
    if right <= left {
        Hand::Right
    } else {
        Hand::Left
    }
}

// Button values are reported as read, without the axis deadzone
fn button_state(value: f32) -> ButtonState {
    ButtonState {
        pressed: value >= PRESS_THRESHOLD,
        touched: value > 0.0,
        value,
    }
}

fn device_id(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

// Helper function to apply deadzone to analog values
fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        // Rescale the value to the range outside the deadzone
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        sign * (value.abs() - deadzone) / (1.0 - deadzone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_gilrs_buttons_to_positional_ids() {
        assert_eq!(raw_button_id(Button::RightTrigger2), Some(0));
        assert_eq!(raw_button_id(Button::RightTrigger), Some(1));
        assert_eq!(raw_button_id(Button::East), Some(5));
        assert_eq!(raw_button_id(Button::Start), None);
        assert_eq!(raw_axis_index(Axis::RightStickY), Some(3));
        assert_eq!(raw_axis_index(Axis::LeftZ), None);
    }

    #[test]
    fn alternates_hands_in_connection_order() {
        assert_eq!(next_hand(&[] as &[Hand]), Hand::Right);
        assert_eq!(next_hand(&[Hand::Right]), Hand::Left);
        assert_eq!(next_hand(&[Hand::Right, Hand::Left]), Hand::Right);
    }

    #[test]
    fn reconnecting_pad_takes_the_freed_hand() {
        // The right pad went away, only the left one is still assigned.
        assert_eq!(next_hand(&[Hand::Left]), Hand::Right);
        assert_eq!(next_hand(&[Hand::Left, Hand::Right, Hand::Left]), Hand::Right);
    }

    #[test]
    fn button_values_bypass_the_axis_deadzone() {
        let state = button_state(0.73);
        assert_eq!(state.value, 0.73);
        assert!(state.pressed);
        assert!(state.touched);

        let light = button_state(0.03);
        assert_eq!(light.value, 0.03);
        assert!(!light.pressed);
        assert!(light.touched);
        assert!(!button_state(0.0).touched);
    }

    #[test]
    fn derives_device_ids_from_names() {
        assert_eq!(device_id("  Logitech MX  Ink "), "logitech-mx-ink");
    }

    #[test]
    fn deadzone_clamps_and_rescales() {
        assert_eq!(apply_deadzone(0.03, 0.05), 0.0);
        assert_eq!(apply_deadzone(1.0, 0.05), 1.0);
        assert!((apply_deadzone(-0.525, 0.05) + 0.5).abs() < 1e-6);
    }
}
