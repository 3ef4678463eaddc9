use crate::{coding::*, Path, PathOwned};

/// Sent by a subscriber to express interest in all broadcasts under a prefix.
#[derive(Clone, Debug)]
pub struct AnnouncePlease<'a> {
	pub prefix: Path<'a>,
}

impl<'a> Message for AnnouncePlease<'a> {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.prefix.as_str().encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let prefix = String::decode(r)?;
		Ok(Self { prefix: Path::from(prefix) })
	}
}

/// Sent in response to [AnnouncePlease], listing every broadcast active under the prefix
/// at the time of the request.
///
/// Suffixes are relative to the requested prefix, not absolute paths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnounceInit {
	pub suffixes: Vec<PathOwned>,
}

impl Message for AnnounceInit {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.suffixes.len().encode(w);
		for suffix in &self.suffixes {
			suffix.encode(w);
		}
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let count = usize::decode(r)?;
		let mut suffixes = Vec::with_capacity(count.min(1024));
		for _ in 0..count {
			suffixes.push(PathOwned::decode(r)?);
		}
		Ok(Self { suffixes })
	}
}

/// A single announce/unannounce delta, sent after the initial [AnnounceInit].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Announce {
	Active { suffix: PathOwned },
	Ended { suffix: PathOwned },
}

impl Message for Announce {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		match self {
			Self::Active { suffix } => {
				1u8.encode(w);
				suffix.encode(w);
			}
			Self::Ended { suffix } => {
				0u8.encode(w);
				suffix.encode(w);
			}
		}
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let active = u8::decode(r)?;
		let suffix = PathOwned::decode(r)?;

		match active {
			1 => Ok(Self::Active { suffix }),
			0 => Ok(Self::Ended { suffix }),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn announce_please_round_trip() {
		let msg = AnnouncePlease {
			prefix: Path::new("room/alice"),
		};

		let mut buf = Vec::new();
		Message::encode(&msg, &mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = <AnnouncePlease as Message>::decode(&mut cursor).unwrap();
		assert_eq!(decoded.prefix.as_str(), "room/alice");
	}

	#[test]
	fn announce_init_round_trip() {
		let msg = AnnounceInit {
			suffixes: vec![PathOwned::new("video"), PathOwned::new("audio")],
		};

		let mut buf = Vec::new();
		Message::encode(&msg, &mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = <AnnounceInit as Message>::decode(&mut cursor).unwrap();
		assert_eq!(decoded, msg);
	}

	#[test]
	fn announce_delta_round_trip() {
		let active = Announce::Active {
			suffix: PathOwned::new("video"),
		};
		let mut buf = Vec::new();
		Message::encode(&active, &mut buf);
		let mut cursor = std::io::Cursor::new(&buf);
		assert_eq!(<Announce as Message>::decode(&mut cursor).unwrap(), active);

		let ended = Announce::Ended {
			suffix: PathOwned::new("video"),
		};
		let mut buf = Vec::new();
		Message::encode(&ended, &mut buf);
		let mut cursor = std::io::Cursor::new(&buf);
		assert_eq!(<Announce as Message>::decode(&mut cursor).unwrap(), ended);
	}
}
