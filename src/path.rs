use std::borrow::Cow;
use std::fmt::{self, Display};

use crate::coding::{Decode, DecodeError, Encode};

/// A trait alias for types that can be converted to a [Path].
/// This provides better error messages and documentation.
pub trait IntoPathRef<'a>: Into<Path<'a>> {}

impl<'a, T: Into<Path<'a>>> IntoPathRef<'a> for T {}

/// A borrowed reference to a path.
///
/// This type is to [PathOwned] as `&str` is to `String`. It provides a way to work with
/// path strings without requiring ownership. Uses Cow to avoid allocations
/// when no normalization is needed, but can normalize internal multiple slashes
/// when required.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Path<'a>(Cow<'a, str>);

impl<'a> Path<'a> {
	/// Create a new Path from a string slice.
	///
	/// Leading and trailing slashes are automatically trimmed.
	/// Multiple consecutive internal slashes are collapsed to single slashes.
	pub fn new(s: &'a str) -> Self {
		let trimmed = s.trim_start_matches('/').trim_end_matches('/');

		// Check if we need to normalize (has multiple consecutive slashes)
		if trimmed.contains("//") {
			// Only allocate if we actually need to normalize
			let normalized = trimmed
				.split('/')
				.filter(|s| !s.is_empty())
				.collect::<Vec<_>>()
				.join("/");
			Self(Cow::Owned(normalized))
		} else {
			// No normalization needed - use borrowed string
			Self(Cow::Borrowed(trimmed))
		}
	}

	/// Get the path as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Check if the path is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Get the length of the path in bytes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Convert to an owned [PathOwned].
	pub fn to_owned(&self) -> PathOwned {
		PathOwned(self.0.clone().into_owned())
	}
}

impl<'a> From<&'a str> for Path<'a> {
	fn from(s: &'a str) -> Self {
		Self::new(s)
	}
}

impl<'a> From<&'a String> for Path<'a> {
	fn from(s: &'a String) -> Self {
		Self::new(s.as_str())
	}
}

impl From<String> for Path<'static> {
	fn from(s: String) -> Self {
		// It's annoying that this logic is duplicated, but I couldn't figure out how to reuse Path::new.
		let trimmed = s.trim_start_matches('/').trim_end_matches('/');

		// Check if we need to normalize (has multiple consecutive slashes)
		if trimmed.contains("//") {
			// Only allocate if we actually need to normalize
			let normalized = trimmed
				.split('/')
				.filter(|s| !s.is_empty())
				.collect::<Vec<_>>()
				.join("/");
			Self(Cow::Owned(normalized))
		} else if trimmed == s {
			// String is already trimmed and normalized, use it directly
			Self(Cow::Owned(s))
		} else {
			// Need to trim but don't need to normalize internal slashes
			Self(Cow::Owned(trimmed.to_string()))
		}
	}
}

impl<'a> From<&'a PathOwned> for Path<'a> {
	fn from(p: &'a PathOwned) -> Self {
		// PathOwned is already normalized, so we can use it directly as borrowed
		Self(Cow::Borrowed(p.0.as_str()))
	}
}

impl<'a, 'b> From<&'a Path<'b>> for Path<'a>
where
	'b: 'a,
{
	fn from(p: &'a Path<'b>) -> Self {
		Self(p.0.clone())
	}
}

impl<'a> AsRef<str> for Path<'a> {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl<'a> Display for Path<'a> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A type that can cheaply produce a borrowed [Path].
///
/// Implemented for strings and owned/borrowed paths so call sites can write
/// `value.as_path()` regardless of which concrete type they're holding.
pub trait AsPath {
	fn as_path(&self) -> Path<'_>;
}

impl AsPath for str {
	fn as_path(&self) -> Path<'_> {
		Path::new(self)
	}
}

impl AsPath for String {
	fn as_path(&self) -> Path<'_> {
		Path::new(self.as_str())
	}
}

impl AsPath for PathOwned {
	fn as_path(&self) -> Path<'_> {
		Path::new(self.0.as_str())
	}
}

impl AsPath for Path<'_> {
	fn as_path(&self) -> Path<'_> {
		Path::new(self.as_str())
	}
}

impl<T: AsPath + ?Sized> AsPath for &T {
	fn as_path(&self) -> Path<'_> {
		(**self).as_path()
	}
}

/// A broadcast path that provides safe prefix matching operations.
///
/// This type wraps a String but provides path-aware operations that respect
/// delimiter boundaries, preventing issues like "foo" matching "foobar".
///
/// Paths are automatically trimmed of leading and trailing slashes on creation,
/// making all slashes implicit at boundaries.
/// All paths are RELATIVE; you cannot join with a leading slash to make an absolute path.
///
/// # Examples
/// ```
/// use moq_lite::{PathOwned, Path};
///
/// // Creation automatically trims slashes
/// let path1 = PathOwned::new("/foo/bar/");
/// let path2 = PathOwned::new("foo/bar");
/// assert_eq!(path1, path2);
///
/// // Methods accept both &str and &PathOwned via Path
/// let base = PathOwned::new("api/v1");
/// assert!(base.has_prefix("api"));
/// assert!(base.has_prefix(&PathOwned::new("api/v1")));
///
/// let joined = base.join("users");
/// assert_eq!(joined.as_str(), "api/v1/users");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PathOwned(String);

impl PathOwned {
	/// Create a new PathOwned from a string or Path.
	///
	/// Leading and trailing slashes are automatically trimmed.
	/// Multiple consecutive internal slashes are collapsed to single slashes.
	/// If a Path is provided, sanitization is skipped since Path is already normalized.
	pub fn new<'a>(path: impl Into<Path<'a>>) -> Self {
		// Path has already done all the sanitization work
		Self(path.into().0.to_string())
	}

	/// Check if this path has the given prefix, respecting path boundaries.
	///
	/// Unlike String::starts_with, this ensures that "foo" does not match "foobar".
	/// The prefix must either:
	/// - Be exactly equal to this path
	/// - Be followed by a '/' delimiter in the original path
	/// - Be empty (matches everything)
	///
	/// # Examples
	/// ```
	/// use moq_lite::PathOwned;
	///
	/// let path = PathOwned::new("foo/bar");
	/// assert!(path.has_prefix("foo"));
	/// assert!(path.has_prefix(&PathOwned::new("foo")));
	/// assert!(path.has_prefix("foo/"));
	/// assert!(!path.has_prefix("fo"));
	///
	/// let path = PathOwned::new("foobar");
	/// assert!(!path.has_prefix("foo"));
	/// ```
	pub fn has_prefix<'a>(&self, prefix: impl Into<Path<'a>>) -> bool {
		let prefix = prefix.into();
		if prefix.is_empty() {
			return true;
		}

		if !self.0.starts_with(prefix.as_str()) {
			return false;
		}

		// Check if the prefix is the exact match
		if self.0.len() == prefix.len() {
			return true;
		}

		// Otherwise, ensure the character after the prefix is a delimiter
		self.0.chars().nth(prefix.len()) == Some('/')
	}

	/// Strip the given prefix from this path, returning the suffix.
	///
	/// Returns None if the prefix doesn't match according to has_prefix rules.
	///
	/// # Examples
	/// ```
	/// use moq_lite::PathOwned;
	///
	/// let path = PathOwned::new("foo/bar/baz");
	/// let suffix = path.strip_prefix("foo").unwrap();
	/// assert_eq!(suffix.as_str(), "bar/baz");
	///
	/// let prefix = PathOwned::new("foo/");
	/// let suffix = path.strip_prefix(&prefix).unwrap();
	/// assert_eq!(suffix.as_str(), "bar/baz");
	/// ```
	pub fn strip_prefix<'a>(&self, prefix: impl Into<Path<'a>>) -> Option<Path<'_>> {
		let prefix = prefix.into();
		if !self.has_prefix(&prefix) {
			return None;
		}

		let suffix = &self.0[prefix.len()..];
		// Trim leading slash since paths should not start with /
		let suffix = suffix.trim_start_matches('/');
		Some(Path(Cow::Borrowed(suffix)))
	}

	/// Get the path as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Check if the path is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Get the length of the path in bytes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Join this path with another path component.
	///
	/// # Examples
	/// ```
	/// use moq_lite::PathOwned;
	///
	/// let base = PathOwned::new("foo");
	/// let joined = base.join("bar");
	/// assert_eq!(joined.as_str(), "foo/bar");
	///
	/// let joined = base.join(&PathOwned::new("bar"));
	/// assert_eq!(joined.as_str(), "foo/bar");
	/// ```
	pub fn join<'a>(&self, other: impl Into<Path<'a>>) -> PathOwned {
		let other = other.into();
		if self.0.is_empty() {
			other.to_owned()
		} else if other.is_empty() {
			self.clone()
		} else {
			// Since paths are trimmed, we always need to add a slash
			PathOwned::new(format!("{}/{}", self.0, other.as_str()))
		}
	}
}

impl Display for PathOwned {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl AsRef<str> for PathOwned {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl From<String> for PathOwned {
	fn from(s: String) -> Self {
		Self::new(&s)
	}
}

impl From<&str> for PathOwned {
	fn from(s: &str) -> Self {
		Self::new(s)
	}
}

impl From<&String> for PathOwned {
	fn from(s: &String) -> Self {
		Self::new(s)
	}
}

impl From<&PathOwned> for PathOwned {
	fn from(p: &PathOwned) -> Self {
		p.clone()
	}
}

impl From<Path<'_>> for PathOwned {
	fn from(p: Path<'_>) -> Self {
		PathOwned(p.0.into_owned())
	}
}

impl Decode for PathOwned {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let path = String::decode(r)?;
		Ok(Self::new(&path))
	}
}

impl Encode for PathOwned {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.0.encode(w)
	}
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for PathOwned {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Ok(PathOwned::new(&s))
	}
}
