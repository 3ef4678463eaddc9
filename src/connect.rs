use std::{
	collections::HashSet,
	sync::{Arc, LazyLock, Mutex},
	time::Duration,
};

use url::Url;

use crate::{AsPath, BroadcastConsumer, Error, Origin, OriginConsumer, OriginProducer, Path, Session};

/// Hosts for which a WebSocket fallback has previously won the connect race, so the
/// WebTransport head start can be skipped on subsequent attempts.
static WEBSOCKET_WON: LazyLock<Mutex<HashSet<(String, u16)>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

fn host_port(url: &Url) -> Option<(String, u16)> {
	let host = url.host_str()?.to_string();
	let port = url.port_or_known_default()?;
	Some((host, port))
}

fn remember_websocket_won(url: &Url) {
	if let Some(hp) = host_port(url) {
		WEBSOCKET_WON.lock().unwrap().insert(hp);
	}
}

fn forget_websocket_won(url: &Url) {
	if let Some(hp) = host_port(url) {
		WEBSOCKET_WON.lock().unwrap().remove(&hp);
	}
}

/// Options controlling how [connect] establishes a session.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
	pub websocket: WebSocketOptions,
}

impl Default for ConnectOptions {
	fn default() -> Self {
		Self {
			websocket: WebSocketOptions::default(),
		}
	}
}

/// Configuration for the WebSocket-tunneled WebTransport fallback.
#[derive(Clone, Debug)]
pub struct WebSocketOptions {
	/// Whether the fallback is attempted at all.
	pub enabled: bool,

	/// Overrides the WebSocket URL; defaults to `url` with its scheme swapped (http->ws, https->wss).
	pub url: Option<Url>,

	/// How long to let the WebTransport attempt run before starting the WebSocket attempt.
	///
	/// Callers that know WebSocket won the race for this host on a previous connection
	/// should pass [Duration::ZERO] to skip the head start.
	pub delay: Duration,
}

impl Default for WebSocketOptions {
	fn default() -> Self {
		Self {
			enabled: true,
			url: None,
			delay: Duration::from_millis(200),
		}
	}
}

/// A connected MoQ session, established via [connect].
///
/// Publishing and consuming are transport-agnostic; only [Connection::close] and
/// [Connection::closed] touch the underlying WebTransport or WebSocket session.
pub struct Connection {
	url: Url,
	transport: Transport,
	publish: OriginProducer,
	subscribe: OriginConsumer,
}

enum Transport {
	Quic(Session<web_transport_quinn::Session>),
	WebSocket(Session<web_transport_ws::Session>),
}

impl Transport {
	async fn closed(&self) -> Error {
		match self {
			Self::Quic(session) => session.closed().await,
			Self::WebSocket(session) => session.closed().await,
		}
	}

	fn close(self, err: Error) {
		match self {
			Self::Quic(session) => session.close(err),
			Self::WebSocket(session) => session.close(err),
		}
	}
}

impl Connection {
	/// The URL that was used to establish this connection.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Publish a broadcast, making it visible to the peer under `path`.
	pub fn publish<'a>(&mut self, path: impl Into<Path<'a>>, broadcast: BroadcastConsumer) {
		self.publish.publish_broadcast(path, broadcast);
	}

	/// Subscribe to a broadcast that the peer has already announced.
	pub fn consume(&self, path: &str) -> Option<BroadcastConsumer> {
		self.subscribe.consume_broadcast(path)
	}

	/// Watch for broadcasts announced under `prefix`.
	pub fn announced(&self, prefix: impl AsPath) -> Option<OriginConsumer> {
		self.subscribe.consume_only(&[prefix.as_path()])
	}

	/// Close the underlying transport with the given error.
	pub fn close(self, err: Error) {
		self.transport.close(err);
	}

	/// Block until the underlying transport is closed, returning the reason.
	pub async fn closed(&self) -> Error {
		self.transport.closed().await
	}
}

/// Race a native WebTransport (QUIC) attempt against a WebSocket-tunneled fallback, performing
/// the MoQ handshake over whichever wins.
///
/// The WebSocket attempt only starts after `options.websocket.delay` has elapsed, giving
/// WebTransport a head start since it's the preferred, lower-overhead transport. If one attempt
/// fails outright the other is still given a chance to complete.
pub async fn connect(url: Url, options: ConnectOptions) -> Result<Connection, Error> {
	let publish = Origin::produce();
	let subscribe = Origin::produce();

	if !options.websocket.enabled {
		let session = connect_quic(url.clone()).await?;
		let session = Session::connect(session, publish.consumer, subscribe.producer).await?;
		return Ok(Connection {
			url,
			transport: Transport::Quic(session),
			publish: publish.producer,
			subscribe: subscribe.consumer,
		});
	}

	let remembered_ws_win = host_port(&url)
		.map(|hp| WEBSOCKET_WON.lock().unwrap().contains(&hp))
		.unwrap_or(false);

	let quic_url = url.clone();
	let quic_publish = publish.consumer.clone();
	let quic_subscribe = subscribe.producer.clone();

	let quic = async move {
		let session = connect_quic(quic_url).await?;
		let session = Session::connect(session, quic_publish, quic_subscribe).await?;
		Ok::<_, Error>(Transport::Quic(session))
	};

	let ws_url = url.clone();
	let ws_publish = publish.consumer.clone();
	let ws_subscribe = subscribe.producer.clone();
	let mut ws_options = options.websocket.clone();
	if remembered_ws_win {
		ws_options.delay = Duration::ZERO;
	}

	let ws = async move {
		if !ws_options.delay.is_zero() {
			tokio::time::sleep(ws_options.delay).await;
		}

		let session = connect_websocket(ws_url, ws_options).await?;
		let session = Session::connect(session, ws_publish, ws_subscribe).await?;
		Ok::<_, Error>(Transport::WebSocket(session))
	};

	tokio::pin!(quic, ws);

	let transport = tokio::select! {
		res = &mut quic => match res {
			Ok(transport) => {
				forget_websocket_won(&url);
				transport
			}
			Err(err) => {
				tracing::warn!(%err, %url, "WebTransport connection failed");
				let transport = ws.await?;
				remember_websocket_won(&url);
				transport
			}
		},
		res = &mut ws => match res {
			Ok(transport) => {
				remember_websocket_won(&url);
				transport
			}
			Err(err) => {
				tracing::warn!(%err, %url, "WebSocket connection failed");
				let transport = quic.await?;
				forget_websocket_won(&url);
				transport
			}
		},
	};

	Ok(Connection {
		url,
		transport,
		publish: publish.producer,
		subscribe: subscribe.consumer,
	})
}

async fn connect_quic(mut url: Url) -> Result<web_transport_quinn::Session, Error> {
	let client = web_transport_quinn::Client::new().congestion_control(web_transport_quinn::CongestionControl::LowLatency);

	// WebTransport certificates can't be self-signed in most browsers, so local development
	// servers instead publish a SHA-256 fingerprint over plain HTTP that we pin against.
	let client = match url.scheme() {
		"http" => {
			let fingerprint = fetch_fingerprint(&url).await?;
			url.set_scheme("https").expect("https is a valid scheme");
			client.server_certificate_hashes(vec![fingerprint])
		}
		"https" => client,
		scheme => return Err(Error::Config(format!("unsupported URL scheme for WebTransport: {scheme}"))),
	};

	client
		.connect(&url)
		.await
		.map_err(|err| Error::Transport(Arc::new(err)))
}

async fn fetch_fingerprint(url: &Url) -> Result<Vec<u8>, Error> {
	let mut fingerprint = url.clone();
	fingerprint.set_path("fingerprint");

	let resp = reqwest::get(fingerprint.clone())
		.await
		.map_err(|err| Error::Config(format!("failed to fetch fingerprint from {fingerprint}: {err}")))?;

	let body = resp
		.text()
		.await
		.map_err(|err| Error::Config(format!("failed to read fingerprint body: {err}")))?;

	hex::decode(body.trim()).map_err(|err| Error::Config(format!("invalid fingerprint hex: {err}")))
}

async fn connect_websocket(url: Url, options: WebSocketOptions) -> Result<web_transport_ws::Session, Error> {
	let url = options.url.unwrap_or_else(|| {
		let mut url = url;
		let scheme = match url.scheme() {
			"https" => "wss",
			_ => "ws",
		};
		url.set_scheme(scheme).expect("ws/wss is a valid scheme");
		url
	});

	tracing::debug!(%url, "connecting via WebSocket");

	let (stream, _response) = web_transport_ws::tokio_tungstenite::connect_async(url.as_str())
		.await
		.map_err(|err| Error::Transport(Arc::new(err)))?;

	Ok(web_transport_ws::Session::new(stream, false))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn websocket_options_default_delay() {
		let options = WebSocketOptions::default();
		assert!(options.enabled);
		assert_eq!(options.delay, Duration::from_millis(200));
	}

	#[test]
	fn websocket_won_memo_round_trips() {
		let url = Url::parse("https://example-moq-test-host.invalid:4443/anon").unwrap();
		assert!(!host_port(&url).map(|hp| WEBSOCKET_WON.lock().unwrap().contains(&hp)).unwrap());

		remember_websocket_won(&url);
		assert!(host_port(&url).map(|hp| WEBSOCKET_WON.lock().unwrap().contains(&hp)).unwrap());

		forget_websocket_won(&url);
		assert!(!host_port(&url).map(|hp| WEBSOCKET_WON.lock().unwrap().contains(&hp)).unwrap());
	}
}
