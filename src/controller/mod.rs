//! Controller input for the Logitech MX Ink stylus
//!
//! Implements the translation side of the adapter:
//!
//! 1. [`mapping_table`] - Static hand → raw id → semantic name layout
//! 2. [`translator`] - Stateless raw-to-semantic re-emission
//! 3. [`event_collector`] - gilrs polling thread feeding raw notifications
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Collector ──► Scene ──► Translator ──► SemanticEvent
//!             (raw ids)               (mapping table)
//! ```

pub mod event_collector;
pub mod mapping_table;
pub mod raw_event;
pub mod semantic_event;
pub mod translator;

pub use mapping_table::{ButtonName, Hand, ParseHandError, COMPONENT_NAME, GAMEPAD_ID};
pub use raw_event::{AxisMove, ButtonEventKind, ButtonState, ListenerKind, RawControllerEvent};
pub use semantic_event::{SemanticEvent, SemanticPayload};
pub use translator::InputTranslator;
