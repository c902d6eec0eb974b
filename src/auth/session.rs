//! Session and user models issued by the auth platform, plus session-change events.

// self
use crate::{
	_prelude::*,
	auth::{Email, TokenSecret, UserId},
};

/// Authenticated user resolved from a [`Session`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
	/// Platform-assigned identifier.
	pub id: UserId,
	/// Address the login link was sent to.
	pub email: Email,
}

/// Identity assertion issued by the auth platform after a login link is redeemed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// User the session belongs to.
	pub user: User,
	/// Platform access token; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token, if the platform issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant after which the access token is no longer accepted.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl Session {
	/// Shortcut for the owning user's identifier.
	pub fn user_id(&self) -> &UserId {
		&self.user.id
	}

	/// Returns `true` if the session has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the session is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}

/// Kind of session change reported by the auth platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
	/// Session resolved when a subscriber first attaches.
	InitialSession,
	/// A login link was redeemed.
	SignedIn,
	/// The user signed out.
	SignedOut,
	/// The platform rotated the access token.
	TokenRefreshed,
	/// The platform invalidated the session on its own (expiry, revocation).
	Expired,
}
impl SessionEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionEvent::InitialSession => "initial_session",
			SessionEvent::SignedIn => "signed_in",
			SessionEvent::SignedOut => "signed_out",
			SessionEvent::TokenRefreshed => "token_refreshed",
			SessionEvent::Expired => "expired",
		}
	}
}
impl Display for SessionEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Event delivered to session subscribers. `session` is `None` once the user is gone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionChange {
	/// What happened.
	pub event: SessionEvent,
	/// Session after the change.
	pub session: Option<Session>,
}
impl SessionChange {
	/// Change carrying the session observed at subscription time.
	pub fn initial(session: Option<Session>) -> Self {
		Self { event: SessionEvent::InitialSession, session }
	}

	/// Change emitted after a successful login-link redemption.
	pub fn signed_in(session: Session) -> Self {
		Self { event: SessionEvent::SignedIn, session: Some(session) }
	}

	/// Change emitted after an explicit sign-out.
	pub fn signed_out() -> Self {
		Self { event: SessionEvent::SignedOut, session: None }
	}

	/// Change emitted after a token rotation.
	pub fn refreshed(session: Session) -> Self {
		Self { event: SessionEvent::TokenRefreshed, session: Some(session) }
	}

	/// Change emitted when the platform drops the session on its own.
	pub fn expired() -> Self {
		Self { event: SessionEvent::Expired, session: None }
	}
}
