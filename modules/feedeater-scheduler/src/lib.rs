pub mod cron_schedule;
pub mod queue;
pub mod scheduler;
pub mod status;

pub use cron_schedule::CronSchedule;
pub use queue::{JobQueue, JobRunner};
pub use scheduler::Scheduler;
pub use status::{JobStatusStore, StatusSink};
