pub mod config;
pub mod retry;
pub mod types;

pub use config::Config;
pub use retry::RetryPolicy;
pub use types::*;
