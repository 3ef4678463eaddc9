use bytes::{Buf, BufMut};

use super::{Decode, DecodeError, Encode};

// QUIC-style variable length integer: the top two bits of the first byte
// select the length class (1/2/4/8 bytes), leaving 6/14/30/62 bits of value.
const MAX_VARINT: u64 = (1 << 62) - 1;

pub(super) fn encode_varint<W: BufMut>(v: u64, w: &mut W) {
	if v < (1 << 6) {
		w.put_u8(v as u8);
	} else if v < (1 << 14) {
		w.put_u16(0b01 << 14 | v as u16);
	} else if v < (1 << 30) {
		w.put_u32(0b10 << 30 | v as u32);
	} else if v <= MAX_VARINT {
		w.put_u64(0b11 << 62 | v);
	} else {
		panic!("varint value too large: {v}");
	}
}

pub(super) fn decode_varint<R: Buf>(r: &mut R) -> Result<u64, DecodeError> {
	if !r.has_remaining() {
		return Err(DecodeError::Short);
	}

	let tag = r.chunk()[0] >> 6;
	let len = 1usize << tag;

	if r.remaining() < len {
		return Err(DecodeError::Short);
	}

	let v = match len {
		1 => (r.get_u8() & 0x3f) as u64,
		2 => (r.get_u16() & 0x3fff) as u64,
		4 => (r.get_u32() & 0x3fffffff) as u64,
		8 => r.get_u64() & 0x3fffffffffffffff,
		_ => unreachable!(),
	};

	Ok(v)
}

impl Encode for u64 {
	fn encode<W: BufMut>(&self, w: &mut W) {
		encode_varint(*self, w)
	}
}

impl Decode for u64 {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
		decode_varint(r)
	}
}

impl Encode for usize {
	fn encode<W: BufMut>(&self, w: &mut W) {
		(*self as u64).encode(w)
	}
}

impl Decode for usize {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let v = u64::decode(r)?;
		v.try_into().map_err(|_| DecodeError::BoundsExceeded)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn roundtrip(v: u64, expect_len: usize) {
		let mut buf = Vec::new();
		v.encode(&mut buf);
		assert_eq!(buf.len(), expect_len, "wrong varint length for {v}");

		let mut r = &buf[..];
		assert_eq!(u64::decode(&mut r).unwrap(), v);
		assert!(r.is_empty());
	}

	#[test]
	fn length_classes() {
		roundtrip(0, 1);
		roundtrip(63, 1);
		roundtrip(64, 2);
		roundtrip((1 << 14) - 1, 2);
		roundtrip(1 << 14, 4);
		roundtrip((1 << 30) - 1, 4);
		roundtrip(1 << 30, 8);
		roundtrip(MAX_VARINT, 8);
	}

	#[test]
	fn short_read() {
		let mut buf = &[0b11000000u8][..];
		assert!(matches!(u64::decode(&mut buf), Err(DecodeError::Short)));
	}
}
