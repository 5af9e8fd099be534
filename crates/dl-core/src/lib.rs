pub mod codec;
pub mod config;
pub mod logging;
pub mod ops;
pub mod scheduler;
pub mod store;
pub mod walker;
