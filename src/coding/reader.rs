use std::{cmp, io, sync::Arc};

use bytes::{Buf, Bytes, BytesMut};

use crate::{coding::*, Error};

/// A reader for decoding messages from a stream.
pub struct Reader<S: web_transport_trait::RecvStream> {
	stream: S,
	buffer: BytesMut,
}

impl<S: web_transport_trait::RecvStream> Reader<S> {
	pub fn new(stream: S) -> Self {
		Self {
			stream,
			buffer: Default::default(),
		}
	}

	/// Decode the next message from the stream.
	pub async fn decode<T: Decode>(&mut self) -> Result<T, Error> {
		loop {
			let mut cursor = io::Cursor::new(&self.buffer);
			match T::decode(&mut cursor) {
				Ok(msg) => {
					let pos = cursor.position() as usize;
					self.buffer.advance(pos);
					return Ok(msg);
				}
				Err(DecodeError::Short) => {
					if self
						.stream
						.read_buf(&mut self.buffer)
						.await
						.map_err(|e| Error::Transport(Arc::new(e)))?
						.is_none()
					{
						// Stream closed while we still need more data.
						return Err(Error::Decode(DecodeError::Short));
					}
				}
				Err(e) => return Err(Error::Decode(e)),
			}
		}
	}

	/// Decode the next message unless the stream is closed.
	pub async fn decode_maybe<T: Decode>(&mut self) -> Result<Option<T>, Error> {
		match self.closed().await {
			Ok(()) => Ok(None),
			Err(Error::Decode(DecodeError::ExpectedEnd)) => Ok(Some(self.decode().await?)),
			Err(e) => Err(e),
		}
	}

	/// Returns a non-empty chunk of data, or `None` if the stream ended cleanly.
	pub async fn read(&mut self, max: usize) -> Result<Option<Bytes>, Error> {
		if !self.buffer.is_empty() {
			let size = cmp::min(max, self.buffer.len());
			return Ok(Some(self.buffer.split_to(size).freeze()));
		}

		self.stream
			.read_chunk(max)
			.await
			.map_err(|e| Error::Transport(Arc::new(e)))
	}

	/// Read exactly the given number of bytes from the stream.
	pub async fn read_exact(&mut self, size: usize) -> Result<Bytes, Error> {
		if self.buffer.len() >= size {
			return Ok(self.buffer.split_to(size).freeze());
		}

		let mut data = BytesMut::with_capacity(size);
		data.extend_from_slice(&self.buffer.split_to(self.buffer.len()));

		while data.len() < size {
			let remaining = size - data.len();
			let chunk = self
				.stream
				.read_chunk(remaining)
				.await
				.map_err(|e| Error::Transport(Arc::new(e)))?
				.ok_or(Error::Decode(DecodeError::Short))?;
			data.extend_from_slice(&chunk);
		}

		Ok(data.freeze())
	}

	/// Skip the given number of bytes from the stream.
	pub async fn skip(&mut self, mut size: usize) -> Result<(), Error> {
		let buffered = self.buffer.len().min(size);
		self.buffer.advance(buffered);
		size -= buffered;

		while size > 0 {
			let chunk = self
				.stream
				.read_chunk(size)
				.await
				.map_err(|e| Error::Transport(Arc::new(e)))?
				.ok_or(Error::Decode(DecodeError::Short))?;
			size -= chunk.len();
		}

		Ok(())
	}

	/// Wait until the stream is closed, erroring if there are any additional bytes.
	pub async fn closed(&mut self) -> Result<(), Error> {
		if self.buffer.is_empty()
			&& self
				.stream
				.read_buf(&mut self.buffer)
				.await
				.map_err(|e| Error::Transport(Arc::new(e)))?
				.is_none()
		{
			return Ok(());
		}

		Err(DecodeError::ExpectedEnd.into())
	}

	/// Abort the stream with the given error.
	pub fn abort(&mut self, err: &Error) {
		self.stream.stop(err.to_code());
	}
}
