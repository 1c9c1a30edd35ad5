pub mod cache;
pub mod config;
pub mod top;
pub mod utils;

pub use cache::{handle_cache_command, CacheCommands};
pub use config::{handle_config_command, ConfigCommands};
pub use top::{handle_top_command, TopOptions};
