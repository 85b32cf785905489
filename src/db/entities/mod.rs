//! SeaORM entities for the two durable record sets: monitored applications
//! and subscribers.

pub mod monitored_app;
pub mod subscriber;
