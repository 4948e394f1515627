//! Typed names for login users and stored files.
//!
//! Both are thin string wrappers. [`Username`] is whatever the user typed, minus surrounding
//! whitespace; [`FileId`] is opaque and only has to be non-empty, because the server assigns it.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

/// Error returned when a name cannot be used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The username was empty once surrounding whitespace was removed.
	#[error("Username cannot be blank.")]
	BlankUsername,
	/// The file identifier was empty.
	#[error("File identifier cannot be empty.")]
	EmptyFileId,
}

/// Login name submitted to the file server.
///
/// Inner spaces are kept (`"John Smith"` is a valid login); leading and trailing whitespace is
/// trimmed.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);
impl Username {
	/// Trims `value` and rejects it when nothing is left.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let trimmed = value.as_ref().trim();

		if trimmed.is_empty() {
			return Err(IdentifierError::BlankUsername);
		}

		Ok(Self(trimmed.to_owned()))
	}
}
impl TryFrom<String> for Username {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl FromStr for Username {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for Username {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Username({})", self.0)
	}
}

/// Server-assigned identifier of a stored file.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);
impl FileId {
	/// Wraps a server-assigned identifier; only the empty string is rejected.
	pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
		let value = value.into();

		if value.is_empty() { Err(IdentifierError::EmptyFileId) } else { Ok(Self(value)) }
	}
}
impl TryFrom<String> for FileId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl FromStr for FileId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for FileId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "FileId({})", self.0)
	}
}

macro_rules! impl_str_view {
	($($name:ident),+) => {
		$(
			impl Deref for $name {
				type Target = str;

				fn deref(&self) -> &Self::Target {
					&self.0
				}
			}
			impl AsRef<str> for $name {
				fn as_ref(&self) -> &str {
					&self.0
				}
			}
			impl Borrow<str> for $name {
				fn borrow(&self) -> &str {
					&self.0
				}
			}
			impl Display for $name {
				fn fmt(&self, f: &mut Formatter) -> FmtResult {
					f.write_str(&self.0)
				}
			}
			impl From<$name> for String {
				fn from(value: $name) -> Self {
					value.0
				}
			}
		)+
	};
}

impl_str_view!(Username, FileId);

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn usernames_are_trimmed_but_keep_inner_spaces() {
		let username = Username::new("  John Smith\t").expect("Spaced usernames should be accepted.");

		assert_eq!(username.as_ref(), "John Smith");
		assert_eq!(Username::new(" \n "), Err(IdentifierError::BlankUsername));
		assert_eq!(Username::new(""), Err(IdentifierError::BlankUsername));
	}

	#[test]
	fn file_ids_are_opaque() {
		let id: FileId =
			serde_json::from_str("\"quarterly report 3\"").expect("Spaced file ids should deserialize.");

		assert_eq!(id.as_ref(), "quarterly report 3");
		assert_eq!(FileId::new(""), Err(IdentifierError::EmptyFileId));
		assert!(serde_json::from_str::<FileId>("\"\"").is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<FileId, u8> = HashMap::from_iter([(
			FileId::new("file-123").expect("File id used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("file-123"), Some(&7));
	}
}
