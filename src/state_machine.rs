//! Debate turn orchestration
//!
//! Implements the Elm Architecture pattern: a single transition function
//! mutates the session and returns effects for the runtime to execute.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{DebateContext, DebatePhase, DebateSession, Participants, Seat, Turn};
pub use transition::{transition, TransitionError};
