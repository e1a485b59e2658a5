//! CLI command implementations.

mod ask;
mod config;
mod serve;
mod tools;
mod updates;

pub use ask::run_ask;
pub use config::run_config;
pub use serve::run_serve;
pub use tools::run_tools;
pub use updates::run_updates;
