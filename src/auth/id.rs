//! Strongly typed identifiers for local users and their grading-platform accounts.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("User identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("User identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier exceeded the allowed character count.
	#[error("User identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Opaque identifier the auth platform assigns to a local user.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);
impl UserId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for UserId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for UserId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for UserId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<UserId> for String {
	fn from(value: UserId) -> Self {
		value.0
	}
}
impl TryFrom<String> for UserId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "User({})", self.0)
	}
}
impl Display for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for UserId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

/// Numeric identity of the user on the grading platform (Canvas `id`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteUserId(pub i64);
impl RemoteUserId {
	/// Returns the raw numeric value.
	pub const fn get(self) -> i64 {
		self.0
	}
}
impl From<i64> for RemoteUserId {
	fn from(value: i64) -> Self {
		Self(value)
	}
}
impl Display for RemoteUserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0, f)
	}
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace);
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn user_ids_reject_whitespace_and_empty() {
		assert_eq!(UserId::new(""), Err(IdentifierError::Empty));
		assert_eq!(UserId::new(" user-1"), Err(IdentifierError::ContainsWhitespace));
		assert_eq!(UserId::new("user\u{00A0}1"), Err(IdentifierError::ContainsWhitespace));

		let id = UserId::new("8c1f2a77-user").expect("User fixture should be valid.");

		assert_eq!(id.as_ref(), "8c1f2a77-user");
		assert_eq!(format!("{id:?}"), "User(8c1f2a77-user)");
	}

	#[test]
	fn length_limit_is_enforced() {
		UserId::new("a".repeat(IDENTIFIER_MAX_LEN)).expect("Exact length should succeed.");

		assert_eq!(
			UserId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN })
		);
	}

	#[test]
	fn serde_enforces_validation() {
		let id: UserId =
			serde_json::from_str("\"user-42\"").expect("User id should deserialize successfully.");

		assert_eq!(&*id, "user-42");
		assert!(serde_json::from_str::<UserId>("\"with space\"").is_err());

		let remote: RemoteUserId =
			serde_json::from_str("42").expect("Remote id should deserialize from a number.");

		assert_eq!(remote, RemoteUserId(42));
	}

	#[test]
	fn borrow_supports_str_lookup() {
		let map: HashMap<UserId, u8> =
			HashMap::from_iter([(UserId::new("user-1").expect("Lookup id should be valid."), 7)]);

		assert_eq!(map.get("user-1"), Some(&7));
	}
}
