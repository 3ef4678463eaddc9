use std::future::Future;

use bytes::Bytes;

use super::{state, Frame, Group, GroupConsumer, GroupProducer};
use crate::Error;

/// A named, potentially infinite sequence of groups within a broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Track {
	/// The name of the track, unique within the broadcast.
	pub name: String,

	/// The priority of the track relative to other tracks in the same broadcast.
	///
	/// Higher values are more urgent.
	pub priority: u8,
}

impl Track {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			priority: 0,
		}
	}

	pub fn priority(mut self, priority: u8) -> Self {
		self.priority = priority;
		self
	}

	/// Create a producer for this track.
	pub fn produce(self) -> TrackProducer {
		TrackProducer::new(self)
	}
}

impl<T: Into<String>> From<T> for Track {
	fn from(name: T) -> Self {
		Self::new(name)
	}
}

#[derive(Default, Debug)]
struct TrackState {
	// The current (and only) group retained by the producer.
	//
	// Appending a new group replaces this, which drops the previous [GroupProducer] and
	// closes it for anyone still holding the shared handle.
	latest: Option<GroupProducer>,

	// The sequence number that the next appended group will use.
	next: u64,
}

/// Writes an infinite sequence of groups, keeping only the latest one alive.
#[derive(Clone, Debug)]
pub struct TrackProducer {
	pub info: Track,
	state: state::Producer<TrackState>,
}

impl TrackProducer {
	pub fn new(info: Track) -> Self {
		Self {
			info,
			state: state::Producer::new(TrackState::default()),
		}
	}

	/// Create and append a new group, closing the previous one.
	pub fn append_group(&self) -> GroupProducer {
		let sequence = self.state.borrow().next;
		let group = GroupProducer::new(Group::new(sequence));
		self.insert_group_producer(group.clone());
		group
	}

	/// Create a group with the given sequence, or `None` if it's older than the latest group.
	pub fn create_group(&self, group: Group) -> Option<GroupProducer> {
		let stale = self
			.state
			.borrow()
			.latest
			.as_ref()
			.is_some_and(|latest| group.sequence <= latest.info.sequence);

		if stale {
			return None;
		}

		let producer = GroupProducer::new(group);
		self.insert_group_producer(producer.clone());
		Some(producer)
	}

	fn insert_group_producer(&self, group: GroupProducer) {
		let sequence = group.info.sequence;

		self.state
			.modify(|state| {
				if let Some(old) = state.latest.replace(group) {
					old.close();
				}
				state.next = state.next.max(sequence + 1);
			})
			.ok();
	}

	/// Write a single frame as its own group.
	pub fn write_frame<B: Into<Bytes>>(&self, data: B) {
		let data = data.into();
		let group = self.append_group();
		group.create_frame(Frame::new(data.len() as u64)).write_chunk(data);
		group.close();
	}

	/// Write a UTF-8 string as a single-frame group.
	pub fn write_string(&self, data: impl AsRef<str>) {
		self.write_frame(Bytes::copy_from_slice(data.as_ref().as_bytes()));
	}

	/// Write a boolean as a single byte frame.
	pub fn write_bool(&self, data: bool) {
		self.write_frame(Bytes::from_static(if data { &[1] } else { &[0] }));
	}

	/// Write a JSON-serializable value as a single-frame group.
	#[cfg(feature = "serde")]
	pub fn write_json<T: serde::Serialize>(&self, data: &T) -> Result<(), Error> {
		let encoded = serde_json::to_vec(data).map_err(|_| Error::WrongSize)?;
		self.write_frame(encoded);
		Ok(())
	}

	/// Mark the track as closed; no more groups will be appended.
	pub fn close(&self) {
		if let Some(group) = self.state.borrow().latest.clone() {
			group.close();
		}
		self.state.close().ok();
	}

	/// Abort the track with an error.
	pub fn abort(&self, err: Error) {
		if let Some(group) = self.state.borrow().latest.clone() {
			group.abort(err.clone());
		}
		self.state.abort(err).ok();
	}

	/// Block until there are no more consumers.
	pub fn unused(&self) -> impl Future<Output = ()> + '_ {
		self.state.unused()
	}

	pub fn consume(&self) -> TrackConsumer {
		TrackConsumer::new(self.info.clone(), self.state.consume())
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

/// Reads an infinite sequence of groups, always catching up to the latest.
#[derive(Clone, Debug)]
pub struct TrackConsumer {
	pub info: Track,
	state: state::Consumer<TrackState>,
	latest: Option<u64>,
	group: Option<GroupConsumer>,
}

impl TrackConsumer {
	fn new(info: Track, state: state::Consumer<TrackState>) -> Self {
		Self {
			info,
			state,
			latest: None,
			group: None,
		}
	}

	/// Return the next group, skipping over any that were replaced before being observed.
	///
	/// Returns `None` once the track is closed and there are no newer groups.
	pub async fn next_group(&mut self) -> Result<Option<GroupConsumer>, Error> {
		let last = self.latest;

		let state = self
			.state
			.wait_for(|state| state.latest.as_ref().map(|g| g.info.sequence) != last)
			.await?;

		match &state.latest {
			Some(group) if Some(group.info.sequence) != last => {
				let group = group.consume();
				drop(state);
				self.latest = Some(group.info.sequence);
				Ok(Some(group))
			}
			_ => Ok(None),
		}
	}

	/// Return the next frame, preferring the current group but jumping ahead to a newer
	/// group as soon as one becomes available.
	///
	/// This intentionally does not wait for the current group to finish if a fresher one
	/// arrives, per the "latest group" consistency model.
	pub async fn next_frame(&mut self) -> Result<Option<Bytes>, Error> {
		loop {
			if self.group.is_none() {
				self.group = self.next_group().await?;
				if self.group.is_none() {
					return Ok(None);
				}
			}

			let sequence = self.group.as_ref().unwrap().info.sequence;
			let mut current = self.group.clone().unwrap();

			// A separate handle used only to watch for a newer group, so it doesn't
			// perturb our own `latest` bookkeeping until we actually switch to it.
			let mut probe = TrackConsumer {
				info: self.info.clone(),
				state: self.state.clone(),
				latest: self.latest,
				group: None,
			};

			tokio::select! {
				biased;
				frame = current.read_frame() => {
					match frame? {
						Some(data) => return Ok(Some(data)),
						None => {
							self.group = None;
							continue;
						}
					}
				}
				next = probe.next_group() => {
					match next? {
						Some(group) if group.info.sequence > sequence => {
							self.latest = probe.latest;
							self.group = Some(group);
						}
						_ => {}
					}
					continue;
				}
			}
		}
	}

	/// Read the next frame, concatenating chunks, from the latest-preferring stream.
	pub async fn read_frame(&mut self) -> Result<Option<Bytes>, Error> {
		self.next_frame().await
	}

	/// Read the next frame as a UTF-8 string.
	pub async fn read_string(&mut self) -> Result<Option<String>, Error> {
		match self.read_frame().await? {
			Some(data) => Ok(Some(String::from_utf8(data.to_vec()).map_err(|_| Error::WrongSize)?)),
			None => Ok(None),
		}
	}

	/// Read the next frame as a single boolean byte.
	pub async fn read_bool(&mut self) -> Result<Option<bool>, Error> {
		match self.read_frame().await? {
			Some(data) => match data.as_ref() {
				[0] => Ok(Some(false)),
				[1] => Ok(Some(true)),
				_ => Err(Error::WrongSize),
			},
			None => Ok(None),
		}
	}

	/// Read the next frame and decode it as JSON.
	#[cfg(feature = "serde")]
	pub async fn read_json<T: serde::de::DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
		match self.read_frame().await? {
			Some(data) => Ok(Some(serde_json::from_slice(&data).map_err(|_| Error::WrongSize)?)),
			None => Ok(None),
		}
	}

	/// Resolves once the track producer closes, successfully or otherwise.
	pub fn closed(&self) -> impl Future<Output = Result<(), Error>> + '_ {
		self.state.closed()
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

#[cfg(test)]
use futures::FutureExt;

#[cfg(test)]
impl TrackConsumer {
	pub fn assert_group(&mut self) -> GroupConsumer {
		self.next_group()
			.now_or_never()
			.expect("should not have blocked")
			.expect("should not error")
			.expect("should have a group")
	}

	pub fn assert_no_group(&mut self) {
		assert!(self.next_group().now_or_never().is_none(), "should have blocked");
	}

	pub fn assert_closed(&mut self) {
		let res = self.next_group().now_or_never().expect("should not have blocked");
		assert!(matches!(res, Ok(None)), "should be closed");
	}

	pub fn assert_error(&mut self) {
		let res = self.next_group().now_or_never().expect("should not have blocked");
		assert!(res.is_err(), "should be an error");
	}

	pub fn assert_not_closed(&self) {
		assert!(self.closed().now_or_never().is_none(), "should not be closed");
	}

	pub fn assert_is_clone(&self, other: &Self) {
		assert!(self.is_clone(other));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn latest_group_policy() {
		let mut producer = Track::new("time").produce();

		let mut g0 = producer.append_group();
		g0.create_frame(1.into()).write_chunk(Bytes::from_static(b"a"));

		// A consumer that starts reading g0 keeps observing it even after a newer group arrives.
		let mut mid_reader = producer.consume();
		assert_eq!(mid_reader.read_frame().await.unwrap(), Some(Bytes::from_static(b"a")));

		let mut g1 = producer.append_group();
		g1.create_frame(1.into()).write_chunk(Bytes::from_static(b"A"));
		g1.close();

		// A fresh clone only sees the latest group.
		let mut fresh = producer.consume();
		let group = fresh.assert_group();
		assert_eq!(group.info.sequence, 1);
	}

	#[tokio::test]
	async fn next_frame_switches_to_newer_group() {
		let mut producer = Track::new("time").produce();

		let mut g0 = producer.append_group();
		g0.create_frame(1.into()).write_chunk(Bytes::from_static(b"x"));
		g0.create_frame(1.into()).write_chunk(Bytes::from_static(b"y"));

		let mut consumer = producer.consume();
		assert_eq!(consumer.next_frame().await.unwrap(), Some(Bytes::from_static(b"x")));

		let mut g1 = producer.append_group();
		g1.create_frame(1.into()).write_chunk(Bytes::from_static(b"A"));

		// The next call should jump to the newer group instead of draining g0.
		assert_eq!(consumer.next_frame().await.unwrap(), Some(Bytes::from_static(b"A")));
	}

	#[tokio::test]
	async fn write_and_read_convenience() {
		let mut producer = Track::new("chat").produce();
		let mut consumer = producer.consume();

		producer.write_string("hello");
		producer.write_bool(true);

		assert_eq!(consumer.read_string().await.unwrap(), Some("hello".to_string()));
		assert_eq!(consumer.read_bool().await.unwrap(), Some(true));
	}

	#[tokio::test]
	async fn unused() {
		let producer = Track::new("time").produce();
		assert!(producer.unused().now_or_never().is_none());

		let consumer = producer.consume();
		assert!(producer.unused().now_or_never().is_none());

		drop(consumer);
		assert!(producer.unused().now_or_never().is_some());
	}
}
