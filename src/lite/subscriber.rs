use std::{
	collections::{hash_map::Entry, HashMap},
	sync::{atomic, Arc},
};

use tokio::sync::oneshot;
use web_async::Lock;

use crate::{
	coding::{Reader, Stream},
	lite,
	model::BroadcastProducer,
	AsPath, Broadcast, Error, Frame, FrameProducer, Group, GroupProducer, OriginProducer, Path, PathOwned,
	TrackProducer,
};

#[derive(Clone)]
pub(super) struct Subscriber<S: web_transport_trait::Session> {
	session: S,

	origin: Option<OriginProducer>,
	subscribes: Lock<HashMap<u64, TrackProducer>>,
	next_id: Arc<atomic::AtomicU64>,

	producers: Lock<HashMap<PathOwned, BroadcastProducer>>,
}

impl<S: web_transport_trait::Session> Subscriber<S> {
	pub fn new(session: S, origin: Option<OriginProducer>) -> Self {
		Self {
			session,
			origin,
			subscribes: Default::default(),
			next_id: Default::default(),
			producers: Default::default(),
		}
	}

	/// Ask the peer for every broadcast it has, then keep consuming the delta stream.
	///
	/// `init` is signaled as soon as the initial snapshot has been applied, so the caller
	/// doesn't race against broadcasts that were already active before we connected.
	pub async fn run(self, init: oneshot::Sender<()>) -> Result<(), Error> {
		let mut announce = Stream::open(&self.session).await?;
		announce.writer.encode(&lite::ControlType::Announce).await?;
		announce
			.writer
			.encode(&lite::AnnouncePlease { prefix: Path::new("") })
			.await?;

		let snapshot = announce.reader.decode::<lite::AnnounceInit>().await?;
		for suffix in snapshot.suffixes {
			self.recv_announce(suffix)?;
		}

		// Unblock the caller now that the initial snapshot has been applied.
		let _ = init.send(());

		let uni = self.clone();

		tokio::select! {
			res = uni.run_uni() => res,
			res = self.run_announce(announce) => res,
		}
	}

	async fn run_announce(&self, mut stream: Stream<S>) -> Result<(), Error> {
		while let Some(msg) = stream.reader.decode_maybe::<lite::Announce>().await? {
			match msg {
				lite::Announce::Active { suffix } => self.recv_announce(suffix)?,
				lite::Announce::Ended { suffix } => self.recv_unannounce(suffix)?,
			}
		}

		Ok(())
	}

	fn recv_announce(&self, suffix: PathOwned) -> Result<(), Error> {
		let origin = match &self.origin {
			Some(origin) => origin,
			None => return Ok(()),
		};

		tracing::debug!(broadcast = %origin.absolute(&suffix), "announce");

		let broadcast = Broadcast::produce();

		// Make sure the peer doesn't double announce.
		match self.producers.lock().entry(suffix.clone()) {
			Entry::Occupied(_) => return Err(Error::Duplicate),
			Entry::Vacant(entry) => entry.insert(broadcast.producer.clone()),
		};

		origin.clone().publish_broadcast(suffix.as_path(), broadcast.consumer);

		web_async::spawn(self.clone().run_broadcast(suffix, broadcast.producer));

		Ok(())
	}

	fn recv_unannounce(&self, suffix: PathOwned) -> Result<(), Error> {
		if self.origin.is_none() {
			return Ok(());
		}

		let mut producer = self.producers.lock().remove(&suffix).ok_or(Error::NotFound)?;
		tracing::debug!(broadcast = %self.origin.as_ref().unwrap().absolute(&suffix), "unannounced");
		producer.finish();

		Ok(())
	}

	async fn run_broadcast(self, path: PathOwned, mut broadcast: BroadcastProducer) {
		loop {
			// Keep serving requests until there are no more consumers.
			// This way we'll clean up the task when the broadcast is no longer needed.
			let track = tokio::select! {
				_ = broadcast.unused() => break,
				producer = broadcast.request() => match producer {
					Some(producer) => producer,
					None => break,
				},
				_ = self.session.closed() => break,
			};

			let id = self.next_id.fetch_add(1, atomic::Ordering::Relaxed);
			let this = self.clone();
			let path = path.clone();

			web_async::spawn(async move {
				this.run_subscribe(id, path, track).await;
				this.subscribes.lock().remove(&id);
			});
		}
	}

	async fn run_subscribe(&self, id: u64, broadcast: PathOwned, track: TrackProducer) {
		if let Err(err) = self.run_subscribe_inner(id, &broadcast, track.clone()).await {
			tracing::warn!(%id, %err, "subscribe error");
			track.abort(err);
		}
	}

	async fn run_subscribe_inner(&self, id: u64, broadcast: &PathOwned, track: TrackProducer) -> Result<(), Error> {
		self.subscribes.lock().insert(id, track.clone());

		let mut stream = Stream::open(&self.session).await?;
		stream.writer.encode(&lite::ControlType::Subscribe).await?;

		stream
			.writer
			.encode(&lite::Subscribe {
				id,
				broadcast: broadcast.as_path(),
				track: (&track.info.name).into(),
				priority: track.info.priority,
			})
			.await?;

		let info: lite::SubscribeOk = stream.reader.decode().await?;
		tracing::info!(id, broadcast = %self.origin.as_ref().unwrap().absolute(broadcast), track = %track.info.name, priority = info.priority, "subscribe started");

		tokio::select! {
			_ = track.unused() => {
				tracing::info!(id, broadcast = %self.origin.as_ref().unwrap().absolute(broadcast), track = %track.info.name, "subscribe cancelled");
				track.close();
			},
			res = stream.reader.closed() => {
				res?;
				track.close();
			},
		}

		stream.writer.finish().await
	}

	pub async fn run_uni(self) -> Result<(), Error> {
		loop {
			let stream = self
				.session
				.accept_uni()
				.await
				.map_err(|err| Error::Transport(Arc::new(err)))?;

			let stream = Reader::new(stream);
			let this = self.clone();

			web_async::spawn(async move {
				if let Err(err) = this.run_uni_stream(stream).await {
					tracing::debug!(%err, "error running uni stream");
				}
			});
		}
	}

	async fn run_uni_stream(mut self, mut stream: Reader<S::RecvStream>) -> Result<(), Error> {
		let kind: lite::DataType = stream.decode().await?;

		let res = match kind {
			lite::DataType::Group => self.recv_group(&mut stream).await,
		};

		if let Err(err) = res {
			stream.abort(&err);
		}

		Ok(())
	}

	async fn recv_group(&mut self, stream: &mut Reader<S::RecvStream>) -> Result<(), Error> {
		let header: lite::Group = stream.decode().await?;

		let group = {
			let mut subs = self.subscribes.lock();
			let track = subs.get_mut(&header.subscribe).ok_or(Error::Cancel)?;

			let group = Group {
				sequence: header.sequence,
			};
			track.create_group(group).ok_or(Error::Old)?
		};

		let res = tokio::select! {
			_ = group.unused() => Err(Error::Cancel),
			res = self.run_group(stream, group.clone()) => res,
		};

		match res {
			Err(Error::Cancel) | Err(Error::Transport(_)) => {
				tracing::trace!(group = %group.info.sequence, "group cancelled");
				group.abort(Error::Cancel);
			}
			Err(err) => {
				tracing::debug!(%err, group = %group.info.sequence, "group error");
				group.abort(err);
			}
			_ => {
				tracing::trace!(group = %group.info.sequence, "group complete");
				group.close();
			}
		}

		Ok(())
	}

	async fn run_group(&mut self, stream: &mut Reader<S::RecvStream>, mut group: GroupProducer) -> Result<(), Error> {
		while let Some(size) = stream.decode_maybe::<u64>().await? {
			let frame = group.create_frame(Frame { size });

			let res = tokio::select! {
				_ = frame.unused() => Err(Error::Cancel),
				res = self.run_frame(stream, frame.clone()) => res,
			};

			if let Err(err) = res {
				frame.abort(err.clone());
				return Err(err);
			}
		}

		group.close();

		Ok(())
	}

	async fn run_frame(&mut self, stream: &mut Reader<S::RecvStream>, mut frame: FrameProducer) -> Result<(), Error> {
		let mut remain = frame.info.size;

		tracing::trace!(size = %frame.info.size, "reading frame");

		while remain > 0 {
			let chunk = stream.read(remain as usize).await?.ok_or(Error::WrongSize)?;
			remain = remain.checked_sub(chunk.len() as u64).ok_or(Error::WrongSize)?;
			frame.write_chunk(chunk);
		}

		tracing::trace!(size = %frame.info.size, "read frame");

		frame.close();

		Ok(())
	}
}
