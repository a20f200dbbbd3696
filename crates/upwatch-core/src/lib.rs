pub mod config;
pub mod time;
pub mod types;

pub use config::UpwatchConfig;
pub use time::epoch_millis;
pub use types::*;
