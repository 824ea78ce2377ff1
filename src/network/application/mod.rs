//! # Application Layer Network Protocols
//!
//! Protocol clients built on the transport traits in [`crate::network`].
//! They never open sockets themselves: a [`Connect`](crate::network::Connect)
//! implementation supplied by the platform does, and the client only reads,
//! writes and closes what it is handed.

/// HTTP/1.x client implementation.
///
/// Provides pooled sessions, incremental response parsing and redirect
/// following for devices with little memory to spare.
pub mod http;
