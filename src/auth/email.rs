//! Validated, lowercase-normalized email addresses.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

const EMAIL_MAX_LEN: usize = 254;

/// Error returned when an email address fails validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum EmailError {
	/// The address was empty or whitespace only.
	#[error("Email address cannot be empty.")]
	Empty,
	/// The address is not of the `local@domain` shape.
	#[error("Email address is malformed: {address}.")]
	Malformed {
		/// Offending input.
		address: String,
	},
	/// The address exceeded the allowed length.
	#[error("Email address exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted length.
		max: usize,
	},
}

/// Email address used to request one-time login links.
///
/// Surrounding whitespace is trimmed and the address is lowercased so the same mailbox
/// always maps to the same platform user.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);
impl Email {
	/// Parses and normalizes an address.
	pub fn new(value: impl AsRef<str>) -> Result<Self, EmailError> {
		let trimmed = value.as_ref().trim();

		if trimmed.is_empty() {
			return Err(EmailError::Empty);
		}
		if trimmed.len() > EMAIL_MAX_LEN {
			return Err(EmailError::TooLong { max: EMAIL_MAX_LEN });
		}

		let malformed = || EmailError::Malformed { address: trimmed.to_owned() };
		let (local, domain) = trimmed.split_once('@').ok_or_else(malformed)?;

		if local.is_empty()
			|| domain.is_empty()
			|| domain.contains('@')
			|| domain.starts_with('.')
			|| domain.ends_with('.')
			|| trimmed.chars().any(char::is_whitespace)
		{
			return Err(malformed());
		}

		Ok(Self(trimmed.to_lowercase()))
	}

	/// Domain part of the address.
	pub fn domain(&self) -> &str {
		self.0.rsplit_once('@').map(|(_, domain)| domain).unwrap_or_default()
	}
}
impl Deref for Email {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for Email {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<Email> for String {
	fn from(value: Email) -> Self {
		value.0
	}
}
impl TryFrom<String> for Email {
	type Error = EmailError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl Debug for Email {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Email({})", self.0)
	}
}
impl Display for Email {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for Email {
	type Err = EmailError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
