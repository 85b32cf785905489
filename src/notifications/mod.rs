pub mod notifier;
pub mod transport;

pub use notifier::{BroadcastReport, Notifier};
pub use transport::{MessageTransport, SenderError};
