//! # moq-session: a client-side Media over QUIC session engine
//!
//! This crate establishes and drives a client-side Media over QUIC (MoQ) session: an
//! in-memory producer/consumer cache of broadcasts, tracks, groups and frames, kept in sync
//! with a peer over either of two wire dialects.
//!
//! ## Overview
//!
//! MoQ is a pub/sub protocol built on top of QUIC that provides:
//! - **Real-time latency**: Sub-second delivery for live media
//! - **Massive scale**: CDN-like distribution via relay clustering
//! - **Network efficiency**: Leverages QUIC's multiplexing and partial reliability
//! - **Browser compatibility**: Works with WebTransport for web applications
//!
//! While designed for media, the transport is generic and can handle any live data streams.
//!
//! [`connect`] races a native WebTransport attempt against a WebSocket-tunneled fallback and
//! negotiates one of two dialects with the peer: [`lite`], a native MoQ wire format, or
//! [`ietf`], a restricted profile of draft moq-transport-07 for servers that don't speak lite.
//! Both present the same [`Session`] and [`model`] surface to the rest of the crate.
//! [`Reload`] wraps [`connect`] with automatic, exponential-backoff reconnection.

mod connect;
mod error;
mod lite;
mod model;
mod path;
mod reload;
mod session;

pub mod coding;
pub mod ietf;

pub use connect::*;
pub use error::*;
pub use model::*;
pub use path::*;
pub use reload::*;
pub use session::*;

pub const ALPN: &str = coding::Alpn::LITE_LATEST.0;
