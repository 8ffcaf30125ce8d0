// ABOUTME: Queue module - the job and job-queue boundary the throttle acts on.
// ABOUTME: Contains the Job/JobQueue traits and an in-memory delayed queue.

mod job;
mod memory;

pub use job::*;
pub use memory::*;
