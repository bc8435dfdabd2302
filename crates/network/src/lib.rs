//! # Athena Networking Layer
//!
//! Tokio-based transport for the client's three server connections.
//!
//! ## Modules
//!
//! - [`framing`] - Splits the byte stream into whole messages
//! - [`connection`] - One TCP connection with reader and writer tasks
//! - [`handlers`] - Opcode to handler routing table

pub mod connection;
pub mod framing;
pub mod handlers;

// Re-export commonly used items
pub use connection::{Connection, ConnectionEvent, ConnectionStats};
pub use framing::MessageFramer;
pub use handlers::HandlerRegistry;
