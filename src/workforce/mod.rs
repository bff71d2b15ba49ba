//! Workforce: evaluator fan-out and the interaction-round driver

pub mod coordinator;
pub mod result;
pub mod session;
pub mod state;
pub mod task;

pub use coordinator::WorkforceCoordinator;
pub use result::{UnitOutcome, WorkforceResult};
pub use session::{RolePlaySession, SessionOutcome, TASK_DONE};
pub use state::WorkforceState;
pub use task::TaskDescriptor;
