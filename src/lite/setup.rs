use crate::coding::*;

/// Sent by the client at the start of the session stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSetup {
	/// The versions supported by the client, in order of preference.
	pub versions: Versions,

	/// Extension parameters, such as the IETF `Role`.
	pub extensions: Extensions,
}

impl Message for ClientSetup {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.versions.encode(w);
		self.extensions.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let versions = Versions::decode(r)?;
		let extensions = Extensions::decode(r)?;
		Ok(Self { versions, extensions })
	}
}

/// Sent by the server in response to a [ClientSetup], selecting a single version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSetup {
	/// The version selected by the server.
	pub version: Version,

	/// Extension parameters.
	pub extensions: Extensions,
}

impl Message for ServerSetup {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.version.encode(w);
		self.extensions.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let version = Version::decode(r)?;
		let extensions = Extensions::decode(r)?;
		Ok(Self { version, extensions })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn client_setup_round_trip() {
		let mut extensions = Extensions::default();
		extensions.set(crate::ietf::Role::Both);

		let msg = ClientSetup {
			versions: [Version::LITE_LATEST, Version::IETF_LATEST].into(),
			extensions,
		};

		let mut buf = Vec::new();
		Message::encode(&msg, &mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = <ClientSetup as Message>::decode(&mut cursor).unwrap();
		assert_eq!(decoded, msg);
	}

	#[test]
	fn server_setup_round_trip() {
		let msg = ServerSetup {
			version: Version::LITE_LATEST,
			extensions: Extensions::default(),
		};

		let mut buf = Vec::new();
		Message::encode(&msg, &mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = <ServerSetup as Message>::decode(&mut cursor).unwrap();
		assert_eq!(decoded, msg);
	}
}
