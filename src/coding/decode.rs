use std::borrow::Cow;
use std::sync::Arc;

use bytes::Buf;
use thiserror::Error;

pub trait Decode: Sized {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError>;
}

#[derive(Error, Clone, Debug)]
pub enum DecodeError {
	#[error("short read")]
	Short,

	#[error("invalid value")]
	InvalidValue,

	#[error("invalid message: {0}")]
	InvalidMessage(u64),

	#[error("message used too many bytes")]
	TooManyBytes,

	#[error("invalid utf-8")]
	InvalidUtf8,

	#[error("value out of bounds")]
	BoundsExceeded,

	#[error("expected end of stream")]
	ExpectedEnd,
}

impl Decode for u8 {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
		if !r.has_remaining() {
			return Err(DecodeError::Short);
		}
		Ok(r.get_u8())
	}
}

impl Decode for i8 {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let v = u8::decode(r)?;
		Ok((v as i16 - 128) as i8)
	}
}

impl Decode for String {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let size = usize::decode(r)?;
		if r.remaining() < size {
			return Err(DecodeError::Short);
		}

		let mut buf = vec![0u8; size];
		r.copy_to_slice(&mut buf);

		String::from_utf8(buf).map_err(|_| DecodeError::InvalidUtf8)
	}
}

impl Decode for Cow<'static, str> {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
		String::decode(r).map(Cow::Owned)
	}
}

impl Decode for std::time::Duration {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let micros = u64::decode(r)?;
		Ok(std::time::Duration::from_micros(micros))
	}
}

impl Decode for Vec<u8> {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let size = usize::decode(r)?;
		if r.remaining() < size {
			return Err(DecodeError::Short);
		}
		Ok(r.copy_to_bytes(size).to_vec())
	}
}

impl Decode for bytes::Bytes {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let size = usize::decode(r)?;
		if r.remaining() < size {
			return Err(DecodeError::Short);
		}
		Ok(r.copy_to_bytes(size))
	}
}

impl<T: Decode> Decode for Arc<T> {
	fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Arc::new(T::decode(r)?))
	}
}
