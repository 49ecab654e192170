//! Cross-crate behavioral specifications for the fleet control plane.
//!
//! These exercise the public surface of several `fleet-*` crates
//! together, through their fake adapters, rather than any one crate's
//! own unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/server_lifecycle.rs"]
mod server_lifecycle;
#[path = "specs/status_processor_wiring.rs"]
mod status_processor_wiring;
#[path = "specs/binary_config.rs"]
mod binary_config;
