use std::borrow::Cow;

use crate::{coding::*, Path};

/// Sent by a subscriber to request a track from a broadcast.
#[derive(Clone, Debug)]
pub struct Subscribe<'a> {
	pub id: u64,
	pub broadcast: Path<'a>,
	pub track: Cow<'a, str>,
	pub priority: u8,
}

impl<'a> Message for Subscribe<'a> {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.id.encode(w);
		self.broadcast.as_str().encode(w);
		self.track.encode(w);
		self.priority.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let id = u64::decode(r)?;
		let broadcast = Path::from(String::decode(r)?);
		let track = Cow::Owned(String::decode(r)?);
		let priority = u8::decode(r)?;

		Ok(Self {
			id,
			broadcast,
			track,
			priority,
		})
	}
}

/// Sent by the publisher in response to a [Subscribe], confirming the track's priority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeOk {
	pub priority: u8,
}

impl Message for SubscribeOk {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.priority.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let priority = u8::decode(r)?;
		Ok(Self { priority })
	}
}

/// Sent by a subscriber over an active subscription's bidirectional stream to request a
/// priority change.
///
/// We don't support changing an active subscription's priority, so this is decoded only to
/// stay in sync with the peer and then ignored with a warning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeUpdate {
	pub priority: u8,
}

impl Message for SubscribeUpdate {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.priority.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let priority = u8::decode(r)?;
		Ok(Self { priority })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn subscribe_round_trip() {
		let msg = Subscribe {
			id: 1,
			broadcast: Path::new("room/alice"),
			track: "video".into(),
			priority: 128,
		};

		let mut buf = Vec::new();
		Message::encode(&msg, &mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = <Subscribe as Message>::decode(&mut cursor).unwrap();

		assert_eq!(decoded.id, 1);
		assert_eq!(decoded.broadcast.as_str(), "room/alice");
		assert_eq!(decoded.track, "video");
		assert_eq!(decoded.priority, 128);
	}

	#[test]
	fn subscribe_ok_round_trip() {
		let msg = SubscribeOk { priority: 5 };

		let mut buf = Vec::new();
		Message::encode(&msg, &mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = <SubscribeOk as Message>::decode(&mut cursor).unwrap();
		assert_eq!(decoded, msg);
	}

	#[test]
	fn subscribe_update_round_trip() {
		let msg = SubscribeUpdate { priority: 9 };

		let mut buf = Vec::new();
		Message::encode(&msg, &mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = <SubscribeUpdate as Message>::decode(&mut cursor).unwrap();
		assert_eq!(decoded, msg);
	}
}
