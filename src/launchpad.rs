//! Step orchestration engine
//!
//! A [`Session`] binds one [`Step`] to every registered stage, dispatches
//! input to whichever stage the [`StageMachine`] reports as current, and can
//! be dumped to a [`Snapshot`] and rebuilt from one after a restart.

mod error;
pub mod fsm;
mod registry;
pub mod result;
mod session;
mod snapshot;
mod step;
mod workflow;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub(crate) mod testing;

pub use error::{ErrorKind, SessionError, StepError};
pub use fsm::{StageMachine, TransitionTable};
pub use registry::StepRegistry;
pub use result::{ResultError, StepResult, TypedResult};
pub use session::Session;
pub use snapshot::Snapshot;
pub use step::{BoundStep, Dumpable, PersistentStep, Step, StepContext};
pub use workflow::Workflow;
