//! TPV Redsys: card payments through the Redsys virtual POS
//!
//! This is the root crate that provides benchmark access to the internal modules.
//! For actual functionality, use the individual crates directly:
//!
//! - `redsys-core`: Merchant parameters, order identifiers, request signing and
//!   notification verification
//! - `api-server`: REST API for payment forms and gateway callbacks

// Re-export for benchmarks
pub use api_server as server;
pub use redsys_core as core;
