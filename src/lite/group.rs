use crate::coding::*;

/// Header sent at the start of each uni stream carrying group data.
///
/// Unlike the IETF dialect, the subscribe ID doubles as a demultiplexing key: the
/// peer has no other way to know which subscription a given uni stream belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
	pub subscribe: u64,
	pub sequence: u64,
}

impl Message for Group {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.subscribe.encode(w);
		self.sequence.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let subscribe = u64::decode(r)?;
		let sequence = u64::decode(r)?;
		Ok(Self { subscribe, sequence })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip() {
		let msg = Group {
			subscribe: 7,
			sequence: 42,
		};

		let mut buf = Vec::new();
		Message::encode(&msg, &mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = <Group as Message>::decode(&mut cursor).unwrap();
		assert_eq!(decoded, msg);
	}
}
