//! scour core — typed fetch targets, configuration, and the record model.

pub mod config;
pub mod error;
pub mod locator;
pub mod records;

pub use config::{Config, Method, Mode};
pub use error::{ScourError, ScourResult};
pub use locator::{HttpAddress, Locator, Scheme, SocketAddress};
pub use records::RecordSet;
