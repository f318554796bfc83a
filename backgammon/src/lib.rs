pub use board::*;
pub use calibration::*;
pub use config::*;
pub use detection::*;
pub use errors::*;
pub use geometry::*;
pub use locator::*;
pub use pipeline::*;
pub use positions::*;
pub use protocol::*;
pub use reconcile::*;
pub use session::*;
pub use store::*;
pub use template::*;
pub use visualization::*;

#[cfg(test)]
mod arbitrary;
mod board;
mod calibration;
mod config;
mod detection;
mod errors;
mod geometry;
mod locator;
mod pipeline;
mod positions;
mod protocol;
mod reconcile;
mod session;
mod store;
mod template;
mod visualization;
