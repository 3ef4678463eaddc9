use std::time::Duration;

use tokio::sync::watch;
use url::Url;

use crate::{connect, ConnectOptions, Connection, Error};

/// Exponential backoff parameters for [Reload].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReloadOptions {
	pub initial: Duration,
	pub multiplier: f64,
	pub max: Duration,
}

impl Default for ReloadOptions {
	fn default() -> Self {
		Self {
			initial: Duration::from_secs(1),
			multiplier: 2.0,
			max: Duration::from_secs(30),
		}
	}
}

fn next_delay(delay: Duration, options: &ReloadOptions) -> Duration {
	delay.mul_f64(options.multiplier).min(options.max)
}

/// Where a [Reload] driver currently is in its connect/backoff cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReloadStatus {
	#[default]
	Disconnected,
	Connecting,
	Connected,
}

/// Wraps [connect] with automatic reconnection and exponential backoff.
///
/// The driver keeps reconnecting to the same URL for as long as it's `enabled`, resetting its
/// backoff delay after every successful connection. Clearing `enabled` cancels any pending retry
/// and stops the driver after the current connection (if any) closes.
pub struct Reload {
	url: Url,
	connect: ConnectOptions,
	backoff: ReloadOptions,
	enabled: watch::Sender<bool>,
	status: watch::Sender<ReloadStatus>,
}

impl Reload {
	pub fn new(url: Url) -> Self {
		Self::with_options(url, ConnectOptions::default(), ReloadOptions::default())
	}

	pub fn with_options(url: Url, connect: ConnectOptions, backoff: ReloadOptions) -> Self {
		Self {
			url,
			connect,
			backoff,
			enabled: watch::Sender::new(true),
			status: watch::Sender::new(ReloadStatus::Disconnected),
		}
	}

	/// The current connect/backoff state.
	pub fn status(&self) -> ReloadStatus {
		*self.status.borrow()
	}

	/// Enable or disable reconnecting. Disabling cancels any pending retry.
	pub fn set_enabled(&self, enabled: bool) {
		self.enabled.send_if_modified(|current| {
			let changed = *current != enabled;
			*current = enabled;
			changed
		});
	}

	/// Drive the reconnect loop, calling `established` with every freshly connected
	/// [Connection] and waiting for it to return before reconnecting.
	///
	/// Returns once `set_enabled(false)` is called while disconnected and no retry is pending.
	pub async fn run<F, Fut>(&self, mut established: F)
	where
		F: FnMut(Connection) -> Fut,
		Fut: std::future::Future<Output = ()>,
	{
		let mut enabled = self.enabled.subscribe();
		let mut delay = self.backoff.initial;

		loop {
			if !*enabled.borrow_and_update() {
				if enabled.changed().await.is_err() {
					return;
				}
				continue;
			}

			self.status.send_replace(ReloadStatus::Connecting);

			match connect(self.url.clone(), self.connect.clone()).await {
				Ok(conn) => {
					self.status.send_replace(ReloadStatus::Connected);
					delay = self.backoff.initial;

					established(conn).await;
				}
				Err(err) => {
					tracing::warn!(%err, url = %self.url, "connect failed, retrying");
				}
			}

			self.status.send_replace(ReloadStatus::Disconnected);

			if !*enabled.borrow() {
				continue;
			}

			tokio::select! {
				_ = tokio::time::sleep(delay) => {}
				res = enabled.changed() => {
					if res.is_err() {
						return;
					}
					continue;
				}
			}

			delay = next_delay(delay, &self.backoff);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backoff_sequence() {
		let options = ReloadOptions {
			initial: Duration::from_millis(100),
			multiplier: 2.0,
			max: Duration::from_millis(500),
		};

		let mut delay = options.initial;
		let mut sequence = vec![delay];
		for _ in 0..4 {
			delay = next_delay(delay, &options);
			sequence.push(delay);
		}

		assert_eq!(
			sequence,
			vec![
				Duration::from_millis(100),
				Duration::from_millis(200),
				Duration::from_millis(400),
				Duration::from_millis(500),
				Duration::from_millis(500),
			]
		);
	}

	#[test]
	fn status_default_is_disconnected() {
		assert_eq!(ReloadStatus::default(), ReloadStatus::Disconnected);
	}
}
