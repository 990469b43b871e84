//! Forward scheduler.
//!
//! Tasks are placed one at a time in dependency order: each starts at the
//! later of the project start and its predecessors' ends, its effort is laid
//! onto the working calendar, and it gets the best-ranked matching resource.
//! Resource capacity is tracked but never delays a task.

mod core;
mod resource_load;
mod state;

pub use core::{schedule_project, ForwardPass, ForwardScheduler, SchedulerError};
pub use resource_load::{Booking, Overallocation, ResourceLoad};
pub use state::{SchedulerState, TaskState};
