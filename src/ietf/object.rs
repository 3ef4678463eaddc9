use bytes::Buf;

use crate::coding::{Decode, DecodeError, Encode};

const SUBGROUP_ID: u8 = 0x0;
pub(super) const OBJECT_NORMAL: u8 = 0x0;
pub(super) const GROUP_END: u8 = 0x03;

pub struct Group {
	pub subscribe_id: u64,
	pub track_alias: u64,
	pub group_id: u64,
	pub publisher_priority: u8,
}

impl Group {
	pub const STREAM_TYPE: u64 = 0x04;
}

impl Encode for Group {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.subscribe_id.encode(w);
		self.track_alias.encode(w);
		self.group_id.encode(w);
		SUBGROUP_ID.encode(w);
		self.publisher_priority.encode(w);
	}
}

impl Decode for Group {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let subscribe_id = u64::decode(r)?;
		let track_alias = u64::decode(r)?;
		let group_id = u64::decode(r)?;
		let subgroup_id = u8::decode(r)?;
		if subgroup_id != SUBGROUP_ID {
			return Err(DecodeError::InvalidValue);
		}
		let publisher_priority = u8::decode(r)?;
		Ok(Self {
			subscribe_id,
			track_alias,
			group_id,
			publisher_priority,
		})
	}
}

pub struct Frame {
	pub id: u64,
	pub payload: Option<Vec<u8>>,
}

impl Encode for Frame {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.id.encode(w);

		let size = self.payload.as_ref().map(|p| p.len()).unwrap_or(0);
		size.encode(w);

		match &self.payload {
			Some(payload) if !payload.is_empty() => w.put_slice(payload),
			Some(_) => 0u8.encode(w),
			None => GROUP_END.encode(w),
		}
	}
}

impl Decode for Frame {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let id = u64::decode(r)?;
		let size = u64::decode(r)?;

		if r.remaining() < size as usize {
			return Err(DecodeError::Short);
		}

		if size > 0 {
			let payload = r.copy_to_bytes(size as usize).to_vec();
			Ok(Self {
				id,
				payload: Some(payload),
			})
		} else {
			match u8::decode(r)? {
				OBJECT_NORMAL => Ok(Self {
					id,
					payload: Some(Vec::new()),
				}),
				GROUP_END => Ok(Self { id, payload: None }),
				_ => Err(DecodeError::InvalidValue),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn frame_round_trip() {
		let frame = Frame {
			id: 3,
			payload: Some(b"hello".to_vec()),
		};

		let mut buf = Vec::new();
		frame.encode(&mut buf);

		let mut cursor = std::io::Cursor::new(&buf[..]);
		let decoded = Frame::decode(&mut cursor).unwrap();
		assert_eq!(decoded.id, 3);
		assert_eq!(decoded.payload, Some(b"hello".to_vec()));
	}

	#[test]
	fn frame_empty_payload() {
		let frame = Frame {
			id: 1,
			payload: Some(Vec::new()),
		};

		let mut buf = Vec::new();
		frame.encode(&mut buf);

		let mut cursor = std::io::Cursor::new(&buf[..]);
		let decoded = Frame::decode(&mut cursor).unwrap();
		assert_eq!(decoded.id, 1);
		assert_eq!(decoded.payload, Some(Vec::new()));
	}

	#[test]
	fn frame_end_of_group() {
		let frame = Frame { id: 7, payload: None };

		let mut buf = Vec::new();
		frame.encode(&mut buf);

		let mut cursor = std::io::Cursor::new(&buf[..]);
		let decoded = Frame::decode(&mut cursor).unwrap();
		assert_eq!(decoded.id, 7);
		assert_eq!(decoded.payload, None);
	}

	#[test]
	fn group_header_round_trip() {
		let group = Group {
			subscribe_id: 5,
			track_alias: 9,
			group_id: 42,
			publisher_priority: 200,
		};

		let mut buf = Vec::new();
		group.encode(&mut buf);

		let mut cursor = std::io::Cursor::new(&buf[..]);
		let decoded = Group::decode(&mut cursor).unwrap();
		assert_eq!(decoded.subscribe_id, 5);
		assert_eq!(decoded.track_alias, 9);
		assert_eq!(decoded.group_id, 42);
		assert_eq!(decoded.publisher_priority, 200);
	}

	#[test]
	fn group_header_rejects_bad_subgroup_id() {
		let mut buf = Vec::new();
		5u64.encode(&mut buf);
		9u64.encode(&mut buf);
		42u64.encode(&mut buf);
		1u8.encode(&mut buf); // subgroup id must be 0
		200u8.encode(&mut buf);

		let mut cursor = std::io::Cursor::new(&buf[..]);
		assert!(matches!(Group::decode(&mut cursor), Err(DecodeError::InvalidValue)));
	}
}
