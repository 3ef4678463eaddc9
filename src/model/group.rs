use std::future::Future;

use bytes::Bytes;

use super::{state, Frame, FrameConsumer, FrameProducer};
use crate::Error;

/// An ordered, finite sequence of frames within a track.
#[derive(Clone, Debug)]
pub struct Group {
	/// The sequence number of this group, monotonically nondecreasing per track.
	pub sequence: u64,
}

impl Group {
	pub fn new(sequence: u64) -> Self {
		Self { sequence }
	}
}

#[derive(Default, Debug)]
struct GroupState {
	frames: Vec<FrameConsumer>,
}

/// Writes a group's worth of frames, in order.
#[derive(Clone, Debug)]
pub struct GroupProducer {
	pub info: Group,
	state: state::Producer<GroupState>,
}

impl GroupProducer {
	pub fn new(info: Group) -> Self {
		Self {
			info,
			state: state::Producer::new(GroupState::default()),
		}
	}

	/// Create and append a new frame, returning its producer.
	pub fn create_frame(&self, frame: Frame) -> FrameProducer {
		let producer = FrameProducer::new(frame);
		self.append_frame(producer.consume());
		producer
	}

	/// Append an already-produced frame to the group.
	pub fn append_frame(&self, frame: FrameConsumer) {
		self.state.modify(|state| state.frames.push(frame)).ok();
	}

	/// Mark the group as complete; no more frames will be appended.
	pub fn close(&self) {
		self.state.close().ok();
	}

	/// Abort the group with an error.
	pub fn abort(&self, err: Error) {
		self.state.abort(err).ok();
	}

	/// Block until there are no more consumers.
	pub fn unused(&self) -> impl Future<Output = ()> + '_ {
		self.state.unused()
	}

	pub fn consume(&self) -> GroupConsumer {
		GroupConsumer {
			info: self.info.clone(),
			state: self.state.consume(),
			index: 0,
		}
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

/// Reads a group's worth of frames, in order.
///
/// Cloning a consumer yields an independent reader starting at the current position.
#[derive(Clone, Debug)]
pub struct GroupConsumer {
	pub info: Group,
	state: state::Consumer<GroupState>,
	index: usize,
}

impl GroupConsumer {
	/// Return the next frame, or `None` once the group is complete.
	pub async fn next_frame(&mut self) -> Result<Option<FrameConsumer>, Error> {
		let state = self.state.wait_for(|state| state.frames.get(self.index).is_some()).await?;

		if let Some(frame) = state.frames.get(self.index).cloned() {
			self.index += 1;
			Ok(Some(frame))
		} else {
			Ok(None)
		}
	}

	/// Read the next frame and concatenate its chunks into a single buffer.
	pub async fn read_frame(&mut self) -> Result<Option<Bytes>, Error> {
		match self.next_frame().await? {
			Some(mut frame) => Ok(Some(frame.read_all().await?)),
			None => Ok(None),
		}
	}

	/// Resolves once the group producer closes, successfully or otherwise.
	pub fn closed(&self) -> impl Future<Output = Result<(), Error>> + '_ {
		self.state.closed()
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::FutureExt;

	#[tokio::test]
	async fn frames_in_order() {
		let producer = GroupProducer::new(Group::new(0));
		let mut consumer = producer.consume();

		producer.create_frame(Frame::new(1)).write_chunk(Bytes::from_static(b"a"));
		producer.create_frame(Frame::new(1)).write_chunk(Bytes::from_static(b"b"));
		producer.close();

		assert_eq!(consumer.read_frame().await.unwrap(), Some(Bytes::from_static(b"a")));
		assert_eq!(consumer.read_frame().await.unwrap(), Some(Bytes::from_static(b"b")));
		assert_eq!(consumer.read_frame().await.unwrap(), None);
	}

	#[tokio::test]
	async fn unused() {
		let producer = GroupProducer::new(Group::new(0));
		assert!(producer.unused().now_or_never().is_none());

		let consumer = producer.consume();
		assert!(producer.unused().now_or_never().is_none());

		drop(consumer);
		assert!(producer.unused().now_or_never().is_some());
	}
}
