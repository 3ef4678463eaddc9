use super::{Decode, DecodeError, Encode};

/// A 32-bit protocol version, negotiated during the setup handshake.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version(pub u32);

impl Version {
	/// The native "lite" dialect implemented by this crate.
	pub const LITE_LATEST: Version = Version(0xff0dad01);

	/// The IETF moq-transport-07 dialect implemented by this crate.
	pub const IETF_LATEST: Version = Version(0xff000007);
}

impl std::fmt::Debug for Version {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "0x{:08x}", self.0)
	}
}

impl Encode for Version {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		(self.0 as u64).encode(w)
	}
}

impl Decode for Version {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let v = u64::decode(r)?;
		Ok(Version(v.try_into().map_err(|_| DecodeError::BoundsExceeded)?))
	}
}

/// A list of versions, as offered by a client or supported by this implementation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Versions(Vec<Version>);

impl Versions {
	pub fn iter(&self) -> impl Iterator<Item = &Version> {
		self.0.iter()
	}

	pub fn contains(&self, version: &Version) -> bool {
		self.0.contains(version)
	}
}

impl<const N: usize> From<[Version; N]> for Versions {
	fn from(versions: [Version; N]) -> Self {
		Self(versions.to_vec())
	}
}

impl From<Vec<Version>> for Versions {
	fn from(versions: Vec<Version>) -> Self {
		Self(versions)
	}
}

impl Encode for Versions {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.0.len().encode(w);
		for version in &self.0 {
			version.encode(w);
		}
	}
}

impl Decode for Versions {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let count = usize::decode(r)?;
		let mut versions = Vec::with_capacity(count.min(1024));
		for _ in 0..count {
			versions.push(Version::decode(r)?);
		}
		Ok(Self(versions))
	}
}

/// An ALPN string advertised at the QUIC/WebTransport layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Alpn(pub &'static str);

impl Alpn {
	pub const LITE_LATEST: Alpn = Alpn("moq-lite-01");
	pub const IETF_LATEST: Alpn = Alpn("moq-00");
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn version_round_trip() {
		let mut buf = Vec::new();
		Version::LITE_LATEST.encode(&mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = Version::decode(&mut cursor).unwrap();
		assert_eq!(decoded, Version::LITE_LATEST);
	}

	#[test]
	fn versions_round_trip() {
		let versions: Versions = [Version::LITE_LATEST, Version::IETF_LATEST].into();

		let mut buf = Vec::new();
		versions.encode(&mut buf);

		let mut cursor = std::io::Cursor::new(&buf);
		let decoded = Versions::decode(&mut cursor).unwrap();
		assert_eq!(decoded, versions);
	}

	#[test]
	fn versions_contains() {
		let versions: Versions = [Version::LITE_LATEST].into();
		assert!(versions.contains(&Version::LITE_LATEST));
		assert!(!versions.contains(&Version::IETF_LATEST));
	}
}
