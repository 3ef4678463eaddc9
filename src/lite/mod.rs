mod announce;
mod group;
mod info;
mod publisher;
mod session;
mod setup;
mod stream;
mod subscribe;
mod subscriber;

pub use announce::*;
pub use group::*;
pub use info::*;
use publisher::*;
pub(crate) use session::*;
pub use setup::*;
pub use stream::*;
pub use subscribe::*;
use subscriber::*;
