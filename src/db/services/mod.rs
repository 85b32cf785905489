//! Registry access. Every function takes the connection explicitly; there is no
//! process-wide handle.

pub mod app_service;
pub mod subscriber_service;

pub use app_service::*;
pub use subscriber_service::*;
