//! # librequests - HTTP for small devices
//!
//! A minimal HTTP/1.x client for memory-constrained embedded systems. It
//! talks over transports the platform already knows how to open (a Wi-Fi
//! co-processor socket, an Ethernet driver, `std::net` on a host) and parses
//! responses incrementally so a body never has to fit in memory unless the
//! caller asks for it.
//!
//! ## Features
//!
//! - Connection pooling keyed by host, port and scheme
//! - A one-byte liveness probe that replaces silently dropped sockets
//! - Fixed-length, chunked and read-until-close response bodies
//! - Redirect following
//! - A cooperative async session for interleaving requests
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! librequests = "0.1.0"
//! ```
//!
//! See [`network::application::http`] for a complete example.
//!
//! ## Platform Support
//!
//! The crate is `no_std` and needs only `core` and `alloc`, so it runs on
//! microcontrollers with a heap as well as on hosted targets.
//!
//! ## Optional Features
//!
//! - `std`: implement `std::error::Error` for the error types
//! - `async`: the cooperative [`AsyncSession`](network::application::http::AsyncSession) (default: enabled)
//! - `defmt`: log through `defmt` for on-target debugging
//! - `log`: log through the `log` facade

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_debug_implementations)]

extern crate alloc;

#[macro_use]
mod fmt;

/// Network abstraction layer: transport traits and protocol clients.
pub mod network;
