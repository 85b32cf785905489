pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod monitor;
pub mod notifications;
pub mod services;
pub mod telegram;

#[cfg(test)]
mod test_support;
