pub mod account;
pub mod audit;
pub mod batch;
pub mod config;
pub mod constant;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod log;
pub mod metadata;
pub mod notify;
pub mod rpc;
pub mod sanitize;
pub mod selection;
pub mod session;
pub mod token;
pub mod transaction;
pub mod wallet;
pub use account::{AccountRecord, RecordRef};
pub use config::{Config, Network};
pub use error::ReclaimError;
pub use session::{Collaborators, ReclaimSession, SessionView};

#[cfg(test)]
pub mod tests;
