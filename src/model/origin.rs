use std::collections::{hash_map, HashMap};

use futures::future::FutureExt;
use tokio::sync::mpsc;
use web_async::Lock;

use crate::{AsPath, Path, PathOwned, Produce};

use super::BroadcastConsumer;

// If there are multiple broadcasts at the same path, we use the most recent one but keep the others around.
struct BroadcastState {
	active: BroadcastConsumer,
	backup: Vec<BroadcastConsumer>,
}

#[derive(Default)]
struct ProducerState {
	active: HashMap<PathOwned, BroadcastState>,
	consumers: Vec<ConsumerState>,
}

impl ProducerState {
	// Returns true if this was a unique broadcast.
	fn publish(&mut self, path: PathOwned, broadcast: BroadcastConsumer) -> bool {
		let mut unique = true;

		match self.active.entry(path.clone()) {
			hash_map::Entry::Occupied(mut entry) => {
				let state = entry.get_mut();
				if state.active.is_clone(&broadcast) {
					// If we're already publishing this broadcast, then don't do anything.
					return false;
				}

				// Make the new broadcast the active one.
				let old = state.active.clone();
				state.active = broadcast.clone();

				// Move the old broadcast to the backup list.
				// But we need to replace any previous duplicates.
				let pos = state.backup.iter().position(|b| b.is_clone(&broadcast));
				if let Some(pos) = pos {
					state.backup[pos] = old;

					// We're already publishing this broadcast, so don't run the cleanup task.
					unique = false;
				} else {
					state.backup.push(old);
				}

				// Reannounce the path to all consumers.
				retain_mut_unordered(&mut self.consumers, |c| c.remove(&path));
			}
			hash_map::Entry::Vacant(entry) => {
				entry.insert(BroadcastState {
					active: broadcast.clone(),
					backup: Vec::new(),
				});
			}
		};

		retain_mut_unordered(&mut self.consumers, |c| c.insert(&path, &broadcast));

		unique
	}

	fn remove(&mut self, path: PathOwned, broadcast: BroadcastConsumer) {
		let mut entry = match self.active.entry(path) {
			hash_map::Entry::Occupied(entry) => entry,
			hash_map::Entry::Vacant(_) => panic!("broadcast not found"),
		};

		// See if we can remove the broadcast from the backup list.
		let pos = entry.get().backup.iter().position(|b| b.is_clone(&broadcast));
		if let Some(pos) = pos {
			entry.get_mut().backup.remove(pos);
			// Nothing else to do
			return;
		}

		// Okay so it must be the active broadcast or else we messed up.
		assert!(entry.get().active.is_clone(&broadcast));

		retain_mut_unordered(&mut self.consumers, |c| c.remove(entry.key()));

		// If there's a backup broadcast, then announce it.
		if let Some(active) = entry.get_mut().backup.pop() {
			entry.get_mut().active = active;
			retain_mut_unordered(&mut self.consumers, |c| c.insert(entry.key(), &entry.get().active));
		} else {
			// No more backups, so remove the entry.
			entry.remove();
		}
	}
}

impl Drop for ProducerState {
	fn drop(&mut self) {
		for (path, _) in self.active.drain() {
			retain_mut_unordered(&mut self.consumers, |c| c.remove(&path));
		}
	}
}

// A faster version of retain_mut that doesn't maintain the order.
fn retain_mut_unordered<T, F: Fn(&mut T) -> bool>(vec: &mut Vec<T>, f: F) {
	let mut i = 0;
	while let Some(item) = vec.get_mut(i) {
		if f(item) {
			i += 1;
		} else {
			vec.swap_remove(i);
		}
	}
}

/// A broadcast path and its associated broadcast, or None if it was unannounced.
pub type Announced = (PathOwned, Option<BroadcastConsumer>);

struct ConsumerState {
	// Only paths matching one of these prefixes are forwarded. An empty list means "everything".
	allow: Vec<PathOwned>,
	updates: mpsc::UnboundedSender<Announced>,
}

impl ConsumerState {
	fn matches(&self, path: &PathOwned) -> bool {
		self.allow.is_empty() || self.allow.iter().any(|prefix| path.has_prefix(prefix))
	}

	// Returns true if the consumer is still alive.
	fn insert(&mut self, path: &PathOwned, consumer: &BroadcastConsumer) -> bool {
		if !self.matches(path) {
			return !self.updates.is_closed();
		}
		self.updates.send((path.clone(), Some(consumer.clone()))).is_ok()
	}

	fn remove(&mut self, path: &PathOwned) -> bool {
		if !self.matches(path) {
			return !self.updates.is_closed();
		}
		self.updates.send((path.clone(), None)).is_ok()
	}
}

/// Announces broadcasts to consumers, keyed by path.
#[derive(Clone, Default)]
pub struct OriginProducer {
	root: PathOwned,
	state: Lock<ProducerState>,
}

impl OriginProducer {
	pub fn new() -> Self {
		Self {
			root: PathOwned::default(),
			state: Lock::new(ProducerState::default()),
		}
	}

	/// Return the absolute path that would be used on the wire for the given relative path.
	pub fn absolute<'a>(&self, path: impl Into<Path<'a>>) -> PathOwned {
		self.root.join(path)
	}

	/// Publish a broadcast, announcing it to all consumers.
	///
	/// The broadcast will be unannounced when it is closed.
	/// If there is already a broadcast at the same path, it will be replaced and reannounced.
	/// If the old broadcast is closed before the new one, nothing happens.
	/// If the new broadcast is closed before the old one, the old broadcast is reannounced.
	pub fn publish_broadcast<'a>(&mut self, path: impl Into<Path<'a>>, broadcast: BroadcastConsumer) {
		let path = PathOwned::new(path.into());

		if !self.state.lock().publish(path.clone(), broadcast.clone()) {
			// This is not a big deal, but we want to avoid spawning additional cleanup tasks.
			tracing::warn!(%path, "duplicate publish");
			return;
		}

		let state = self.state.clone().downgrade();

		web_async::spawn(async move {
			broadcast.closed().await;
			if let Some(state) = state.upgrade() {
				state.lock().remove(path, broadcast);
			}
		});
	}

	/// Get a specific broadcast by path.
	///
	/// The most recent, non-closed broadcast is returned if there were duplicates.
	pub fn consume_broadcast(&self, path: &str) -> Option<BroadcastConsumer> {
		let path = path.as_path().to_owned();
		self.state.lock().active.get(&path).map(|b| b.active.clone())
	}

	/// Subscribe to all announced broadcasts.
	pub fn consume_all(&self) -> OriginConsumer {
		self.consume_only(&[])
	}

	/// Subscribe to announced broadcasts, restricted to the given prefixes.
	///
	/// An empty slice means "no restriction".
	pub fn consume_only(&self, prefixes: &[Path<'_>]) -> OriginConsumer {
		let mut state = self.state.lock();

		let (tx, rx) = mpsc::unbounded_channel();
		let mut consumer = ConsumerState {
			allow: prefixes.iter().map(|p| p.to_owned()).collect(),
			updates: tx,
		};

		for (path, broadcast) in state.active.iter() {
			consumer.insert(path, &broadcast.active);
		}
		state.consumers.push(consumer);

		OriginConsumer::new(self.root.clone(), rx, self.clone())
	}

	/// Wait until all consumers have been dropped.
	///
	/// NOTE: consume can be called again to un-close the producer.
	pub async fn unused(&self) {
		while let Some(notify) = self.unused_inner() {
			notify.closed().await;
		}
	}

	fn unused_inner(&self) -> Option<mpsc::UnboundedSender<Announced>> {
		let mut state = self.state.lock();

		while let Some(consumer) = state.consumers.last() {
			if !consumer.updates.is_closed() {
				return Some(consumer.updates.clone());
			}
			state.consumers.pop();
		}

		None
	}
}

/// Consumes announced broadcasts, optionally restricted to a set of prefixes.
pub struct OriginConsumer {
	root: PathOwned,
	updates: mpsc::UnboundedReceiver<Announced>,
	producer: OriginProducer,
}

impl OriginConsumer {
	fn new(root: PathOwned, updates: mpsc::UnboundedReceiver<Announced>, producer: OriginProducer) -> Self {
		Self { root, updates, producer }
	}

	/// Return the absolute path that would be used on the wire for the given relative path.
	pub fn absolute<'a>(&self, path: impl Into<Path<'a>>) -> PathOwned {
		self.root.join(path)
	}

	/// Get a specific broadcast without waiting for an announcement.
	pub fn consume_broadcast(&self, path: &str) -> Option<BroadcastConsumer> {
		self.producer.consume_broadcast(path)
	}

	/// Returns the next (un)announced broadcast and its path.
	///
	/// The broadcast is only `None` if it was previously `Some`.
	/// The same path won't be announced/unannounced twice in a row.
	pub async fn announced(&mut self) -> Option<Announced> {
		self.updates.recv().await
	}

	/// Like [Self::announced] but returns `None` immediately if nothing is pending.
	pub fn try_announced(&mut self) -> Option<Announced> {
		self.updates.recv().now_or_never().flatten()
	}

	/// Restrict this consumer to only the given prefixes, returning a narrower clone.
	pub fn consume_only(&self, prefixes: &[Path<'_>]) -> Option<OriginConsumer> {
		Some(self.producer.consume_only(prefixes))
	}
}

/// Helper to create a paired [OriginProducer]/[OriginConsumer].
pub struct Origin;

impl Origin {
	pub fn produce() -> Produce<OriginProducer, OriginConsumer> {
		let producer = OriginProducer::new();
		let consumer = producer.consume_all();
		Produce { producer, consumer }
	}
}

#[cfg(test)]
impl OriginConsumer {
	pub fn assert_next(&mut self, path: &str, broadcast: &BroadcastConsumer) {
		let next = self.announced().now_or_never().expect("next blocked").expect("no next");
		assert_eq!(next.0.as_str(), path, "wrong path");
		assert!(next.1.unwrap().is_clone(broadcast), "should be the same broadcast");
	}

	pub fn assert_next_none(&mut self, path: &str) {
		let next = self.announced().now_or_never().expect("next blocked").expect("no next");
		assert_eq!(next.0.as_str(), path, "wrong path");
		assert!(next.1.is_none(), "should be unannounced");
	}

	pub fn assert_next_wait(&mut self) {
		assert!(self.announced().now_or_never().is_none(), "next should block");
	}

	pub fn assert_next_closed(&mut self) {
		assert!(
			self.announced().now_or_never().expect("next blocked").is_none(),
			"next should be closed"
		);
	}
}

#[cfg(test)]
mod tests {
	use crate::BroadcastProducer;

	use super::*;

	#[tokio::test]
	async fn test_announce() {
		let mut producer = OriginProducer::new();
		let broadcast1 = BroadcastProducer::new();
		let broadcast2 = BroadcastProducer::new();

		let mut consumer1 = producer.consume_all();
		consumer1.assert_next_wait();

		producer.publish_broadcast("test1", broadcast1.consume());

		consumer1.assert_next("test1", &broadcast1.consume());
		consumer1.assert_next_wait();

		let mut consumer2 = producer.consume_all();

		producer.publish_broadcast("test2", broadcast2.consume());

		consumer1.assert_next("test2", &broadcast2.consume());
		consumer1.assert_next_wait();

		consumer2.assert_next("test1", &broadcast1.consume());
		consumer2.assert_next("test2", &broadcast2.consume());
		consumer2.assert_next_wait();

		drop(broadcast1);
		tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;

		consumer1.assert_next_none("test1");
		consumer2.assert_next_none("test1");
		consumer1.assert_next_wait();
		consumer2.assert_next_wait();

		let mut consumer3 = producer.consume_all();
		consumer3.assert_next("test2", &broadcast2.consume());
		consumer3.assert_next_wait();

		drop(producer);
		tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;

		consumer1.assert_next_none("test2");
		consumer2.assert_next_none("test2");
		consumer3.assert_next_none("test2");

		consumer1.assert_next_closed();
		consumer2.assert_next_closed();
		consumer3.assert_next_closed();
	}

	#[tokio::test]
	async fn test_duplicate() {
		let mut producer = OriginProducer::new();
		let broadcast1 = BroadcastProducer::new();
		let broadcast2 = BroadcastProducer::new();

		producer.publish_broadcast("test", broadcast1.consume());
		producer.publish_broadcast("test", broadcast2.consume());
		assert!(producer.consume_broadcast("test").is_some());

		drop(broadcast1);
		tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
		assert!(producer.consume_broadcast("test").is_some());

		drop(broadcast2);
		tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
		assert!(producer.consume_broadcast("test").is_none());
	}

	#[tokio::test]
	async fn test_duplicate_reverse() {
		let mut producer = OriginProducer::new();
		let broadcast1 = BroadcastProducer::new();
		let broadcast2 = BroadcastProducer::new();

		producer.publish_broadcast("test", broadcast1.consume());
		producer.publish_broadcast("test", broadcast2.consume());
		assert!(producer.consume_broadcast("test").is_some());

		// This is harder, dropping the new broadcast first.
		drop(broadcast2);
		tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
		assert!(producer.consume_broadcast("test").is_some());

		drop(broadcast1);
		tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
		assert!(producer.consume_broadcast("test").is_none());
	}

	#[tokio::test]
	async fn test_double_publish() {
		let mut producer = OriginProducer::new();
		let broadcast = BroadcastProducer::new();

		// Ensure it doesn't crash.
		producer.publish_broadcast("test", broadcast.consume());
		producer.publish_broadcast("test", broadcast.consume());

		assert!(producer.consume_broadcast("test").is_some());

		drop(broadcast);
		tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
		assert!(producer.consume_broadcast("test").is_none());
	}

	#[tokio::test]
	async fn test_prefix_scope() {
		let mut producer = OriginProducer::new();
		let broadcast = BroadcastProducer::new();

		let mut scoped = producer.consume_only(&[Path::new("room")]);
		scoped.assert_next_wait();

		producer.publish_broadcast("other/path", broadcast.consume());
		scoped.assert_next_wait();

		producer.publish_broadcast("room/alice", broadcast.consume());
		scoped.assert_next("room/alice", &broadcast.consume());
	}
}
