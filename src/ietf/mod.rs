//! Support for the IETF moq-transport-07 dialect.
//!
//! This is a faithful but intentionally narrow implementation: only the messages needed
//! to publish and subscribe to live tracks are supported. Anything else (fetches, track
//! status, subscribe announces filtering, ...) is decoded to stay in sync with the peer
//! and then ignored or rejected.

mod announce;
mod control;
mod goaway;
mod message;
mod object;
mod publisher;
mod role;
mod session;
mod subscribe;
mod subscribe_announces;
mod subscriber;
mod track;
mod util;

pub use announce::*;
pub(crate) use control::*;
pub use goaway::*;
pub use message::*;
pub use object::*;
use publisher::*;
pub use role::*;
pub(crate) use session::*;
pub use subscribe::*;
pub use subscribe_announces::*;
use subscriber::*;
pub use track::*;
use util::*;
