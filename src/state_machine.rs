//! Send-and-poll controller
//!
//! Implements the Elm Architecture pattern with pure state transitions. The
//! runtime owns the I/O; this module only decides what happens next.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{ConvContext, ConvState, DEFAULT_MAX_RUN_POLLS};
pub use transition::{transition, Settled, TransitionError, ValidationError};
