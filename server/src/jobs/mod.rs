pub mod executor;
pub mod oracle;
pub mod persist;
pub mod progress;
pub mod store;
pub mod worker;
