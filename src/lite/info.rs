use crate::coding::*;

/// Sent periodically over the session control stream to share liveness and
/// transport-level information with the peer, such as an estimated send rate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionInfo {
	/// The sender's current estimated bitrate in bits per second, if known.
	pub bitrate: Option<u64>,
}

impl Message for SessionInfo {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		match self.bitrate {
			Some(bitrate) => {
				1u8.encode(w);
				bitrate.encode(w);
			}
			None => 0u8.encode(w),
		}
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let has_bitrate = u8::decode(r)?;
		let bitrate = match has_bitrate {
			0 => None,
			1 => Some(u64::decode(r)?),
			_ => return Err(DecodeError::InvalidValue),
		};

		Ok(Self { bitrate })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip_with_bitrate() {
		let msg = SessionInfo { bitrate: Some(1_500_000) };

		let mut buf = Vec::new();
		Message::encode(&msg, &mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = <SessionInfo as Message>::decode(&mut cursor).unwrap();
		assert_eq!(decoded, msg);
	}

	#[test]
	fn round_trip_without_bitrate() {
		let msg = SessionInfo::default();

		let mut buf = Vec::new();
		Message::encode(&msg, &mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = <SessionInfo as Message>::decode(&mut cursor).unwrap();
		assert_eq!(decoded, msg);
	}
}
