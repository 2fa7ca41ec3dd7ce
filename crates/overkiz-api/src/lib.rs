// overkiz-api: Async Rust client for the Overkiz cloud API (Somfy et al.)

pub mod client;
pub mod error;
pub mod models;
pub mod servers;
pub mod transport;

pub use client::OverkizClient;
pub use error::{Error, ErrorKind};
pub use models::{Device, Event, StateEntry};
pub use servers::Server;
pub use transport::TransportConfig;
