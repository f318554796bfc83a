mod commands;
mod config;
mod engine;
mod error;
mod hints;
mod pool;
mod recording;
mod service;
pub use commands::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use hints::*;
pub use pool::*;
pub use recording::*;
pub use service::*;
