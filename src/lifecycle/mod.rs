//! Attach/detach lifecycle of the adapter's listeners
//!
//! [`component::MxInkControls`] is the typestate machine, [`handle::ControlsHandle`]
//! the runtime wrapper the host drives, [`listeners`] the subscription
//! bookkeeping and handler table shared by both.

pub mod component;
pub mod handle;
pub mod listeners;

pub use component::{model_url, MxInkControls, AFRAME_CDN_ROOT};
pub use handle::{ControlsHandle, LifecycleState};
pub use listeners::{HandlerTable, ListenerSet};
