pub mod prober;
pub mod scheduler;
pub mod state;

pub use prober::{HttpProber, Prober};
pub use scheduler::{CycleReport, HealthScheduler};
pub use state::{ProbeOutcome, FAILURE_THRESHOLD};
