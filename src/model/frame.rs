use std::{future::Future, ops::Deref};

use bytes::{Bytes, BytesMut};

use super::state;
use crate::Error;

/// An opaque chunk of data whose total size is known up front.
///
/// If the size isn't known in advance, write one [Frame] per chunk instead.
#[derive(Clone, Debug)]
pub struct Frame {
	/// The size of the frame in bytes.
	pub size: u64,
}

impl Frame {
	pub fn new(size: u64) -> Self {
		Self { size }
	}
}

impl From<u64> for Frame {
	fn from(size: u64) -> Self {
		Self { size }
	}
}

#[derive(Default, Debug)]
struct FrameState {
	chunks: Vec<Bytes>,
}

/// Writes a frame's worth of data, possibly in multiple chunks.
#[derive(Clone, Debug)]
pub struct FrameProducer {
	pub info: Frame,
	state: state::Producer<FrameState>,
}

impl FrameProducer {
	pub fn new(info: Frame) -> Self {
		Self {
			info,
			state: state::Producer::new(FrameState::default()),
		}
	}

	/// Append a chunk of data to the frame.
	pub fn write_chunk<B: Into<Bytes>>(&self, chunk: B) {
		self.state.modify(|state| state.chunks.push(chunk.into())).ok();
	}

	/// Mark the frame as complete.
	pub fn close(&self) {
		self.state.close().ok();
	}

	/// Abort the frame with an error.
	pub fn abort(&self, err: Error) {
		self.state.abort(err).ok();
	}

	/// Block until there are no more consumers.
	pub fn unused(&self) -> impl Future<Output = ()> + '_ {
		self.state.unused()
	}

	pub fn consume(&self) -> FrameConsumer {
		FrameConsumer {
			info: self.info.clone(),
			state: self.state.consume(),
			index: 0,
		}
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

impl Deref for FrameProducer {
	type Target = Frame;

	fn deref(&self) -> &Self::Target {
		&self.info
	}
}

/// Reads a frame's worth of data, chunk by chunk.
///
/// Cloning a consumer yields an independent reader starting at the current position.
#[derive(Clone, Debug)]
pub struct FrameConsumer {
	pub info: Frame,
	state: state::Consumer<FrameState>,
	index: usize,
}

impl FrameConsumer {
	/// Return the next chunk, or `None` once the frame is complete.
	pub async fn read_chunk(&mut self) -> Result<Option<Bytes>, Error> {
		let state = self.state.wait_for(|state| state.chunks.get(self.index).is_some()).await?;

		if let Some(chunk) = state.chunks.get(self.index).cloned() {
			self.index += 1;
			Ok(Some(chunk))
		} else {
			Ok(None)
		}
	}

	/// Read all of the remaining chunks into a vector.
	pub async fn read_chunks(&mut self) -> Result<Vec<Bytes>, Error> {
		self.state.closed().await?;

		let state = self.state.borrow();
		let chunks = state.chunks[self.index..].to_vec();
		self.index = state.chunks.len();

		Ok(chunks)
	}

	/// Read and concatenate all of the remaining chunks.
	pub async fn read_all(&mut self) -> Result<Bytes, Error> {
		self.state.closed().await?;

		let state = self.state.borrow();
		let chunks = &state.chunks[self.index..];
		self.index = state.chunks.len();

		let size = chunks.iter().map(Bytes::len).sum();
		let mut buf = BytesMut::with_capacity(size);
		for chunk in chunks {
			buf.extend_from_slice(chunk);
		}

		Ok(buf.freeze())
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

impl Deref for FrameConsumer {
	type Target = Frame;

	fn deref(&self) -> &Self::Target {
		&self.info
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::FutureExt;

	#[tokio::test]
	async fn write_read() {
		let producer = FrameProducer::new(Frame::new(5));
		let mut consumer = producer.consume();

		producer.write_chunk(Bytes::from_static(b"he"));
		producer.write_chunk(Bytes::from_static(b"llo"));
		producer.close();

		assert_eq!(consumer.read_chunk().await.unwrap(), Some(Bytes::from_static(b"he")));
		assert_eq!(consumer.read_chunk().await.unwrap(), Some(Bytes::from_static(b"llo")));
		assert_eq!(consumer.read_chunk().await.unwrap(), None);
	}

	#[tokio::test]
	async fn read_all() {
		let producer = FrameProducer::new(Frame::new(5));
		let mut consumer = producer.consume();

		producer.write_chunk(Bytes::from_static(b"he"));
		producer.write_chunk(Bytes::from_static(b"llo"));
		producer.close();

		assert_eq!(consumer.read_all().await.unwrap(), Bytes::from_static(b"hello"));
	}

	#[tokio::test]
	async fn abort() {
		let producer = FrameProducer::new(Frame::new(5));
		let mut consumer = producer.consume();

		producer.abort(Error::Cancel);
		assert!(matches!(consumer.read_chunk().await, Err(Error::Cancel)));
	}

	#[tokio::test]
	async fn unused() {
		let producer = FrameProducer::new(Frame::new(0));
		assert!(producer.unused().now_or_never().is_none());

		let consumer = producer.consume();
		assert!(producer.unused().now_or_never().is_none());

		drop(consumer);
		assert!(producer.unused().now_or_never().is_some());
	}
}
