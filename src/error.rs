use std::sync::Arc;

use crate::coding::{DecodeError, Versions};

/// Errors that can occur while running a MoQ session.
#[derive(thiserror::Error, Clone, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The underlying transport returned an error, or the connection was closed.
	#[error("transport error: {0}")]
	Transport(Arc<dyn std::error::Error + Send + Sync>),

	/// A message failed to decode.
	#[error("decode error: {0}")]
	Decode(#[from] DecodeError),

	/// Neither side supports a common version.
	#[error("unsupported version: us={0:?} them={1:?}")]
	Version(Versions, Versions),

	/// An unexpected stream type was received.
	#[error("unexpected stream")]
	UnexpectedStream,

	/// An unexpected control message was received.
	#[error("unexpected message")]
	UnexpectedMessage,

	/// A broadcast or track is already in use.
	#[error("duplicate")]
	Duplicate,

	/// There are no more readers; the writer should stop producing.
	#[error("cancelled")]
	Cancel,

	/// A group arrived after a newer group and was dropped.
	#[error("old")]
	Old,

	/// The requested broadcast or track does not exist.
	#[error("not found")]
	NotFound,

	/// A frame was written with the wrong number of bytes.
	#[error("wrong frame size")]
	WrongSize,

	/// The peer is not allowed to perform this operation.
	#[error("unauthorized")]
	Unauthorized,

	/// The operation is not supported by this dialect.
	#[error("unsupported")]
	Unsupported,

	/// The producer was dropped without being explicitly closed or aborted.
	#[error("dropped")]
	Dropped,

	/// No usable transport was available when connecting, or connect-time setup failed
	/// (e.g. WebTransport is unsupported and the WebSocket fallback is disabled).
	#[error("configuration error: {0}")]
	Config(String),
}

impl Error {
	/// An integer code sent over the wire when resetting a stream or closing a session.
	pub fn to_code(&self) -> u32 {
		match self {
			Self::Cancel => 0,
			Self::Old => 1,
			Self::Transport(_) => 2,
			Self::Decode(_) => 3,
			Self::Unauthorized => 4,
			Self::Version(..) => 5,
			Self::UnexpectedStream => 6,
			Self::UnexpectedMessage => 7,
			Self::Duplicate => 8,
			Self::NotFound => 9,
			Self::WrongSize => 10,
			Self::Unsupported => 11,
			Self::Dropped => 12,
			Self::Config(_) => 13,
		}
	}

	/// Recover an [Error] from a wire code, losing any associated detail.
	pub fn from_code(code: u32) -> Self {
		match code {
			0 => Self::Cancel,
			1 => Self::Old,
			2 => Self::Transport(Arc::new(std::io::Error::other("transport"))),
			3 => Self::Decode(DecodeError::Short),
			4 => Self::Unauthorized,
			6 => Self::UnexpectedStream,
			7 => Self::UnexpectedMessage,
			8 => Self::Duplicate,
			9 => Self::NotFound,
			10 => Self::WrongSize,
			11 => Self::Unsupported,
			12 => Self::Dropped,
			13 => Self::Config(String::from("configuration error")),
			_ => Self::Unsupported,
		}
	}
}
