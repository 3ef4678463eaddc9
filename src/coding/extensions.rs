use std::collections::HashMap;

use super::{Decode, DecodeError, Encode};

/// A setup parameter that can be attached to [Extensions].
pub trait Extension: Encode {
	/// The unique identifier for this extension, as used on the wire.
	fn id() -> u64;
}

/// A set of setup parameters, keyed by a 64-bit extension ID.
///
/// Unknown extensions are preserved as raw bytes so they can be forwarded or ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extensions(HashMap<u64, Vec<u8>>);

impl Extensions {
	/// Set an extension, overwriting any previous value with the same ID.
	pub fn set<E: Extension>(&mut self, ext: E) {
		let mut buf = Vec::new();
		ext.encode(&mut buf);
		self.0.insert(E::id(), buf);
	}

	/// Returns whether the given extension ID is present.
	pub fn contains(&self, id: u64) -> bool {
		self.0.contains_key(&id)
	}
}

impl Encode for Extensions {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.0.len().encode(w);
		for (id, value) in &self.0 {
			id.encode(w);
			value.encode(w);
		}
	}
}

impl Decode for Extensions {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let count = usize::decode(r)?;
		let mut map = HashMap::with_capacity(count.min(1024));

		for _ in 0..count {
			let id = u64::decode(r)?;
			let value = Vec::<u8>::decode(r)?;
			map.insert(id, value);
		}

		Ok(Self(map))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ietf;

	#[test]
	fn set_and_round_trip() {
		let mut extensions = Extensions::default();
		extensions.set(ietf::Role::Both);
		assert!(extensions.contains(<ietf::Role as Extension>::id()));

		let mut buf = Vec::new();
		extensions.encode(&mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = Extensions::decode(&mut cursor).unwrap();
		assert_eq!(decoded, extensions);
	}
}
