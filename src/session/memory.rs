//! In-process [`AuthPlatform`] for tests, demos, and offline development.
//!
//! Login links are "delivered" to an inspectable outbox. One-time codes are six digits,
//! single use, valid for an hour, and only their SHA-256 digest is retained. Individual
//! operations can be armed to fail once via [`MemoryAuthPlatform::fail_next`].

// std
use std::collections::HashSet;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{Email, Session, TokenSecret, User, UserId},
	error::TransientError,
	session::{AuthPlatform, PlatformFuture},
};

const CODE_TTL: Duration = Duration::hours(1);
const SESSION_TTL: Duration = Duration::hours(1);
const TOKEN_LEN: usize = 40;

/// Operations that can be armed to fail once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailurePoint {
	/// [`AuthPlatform::current_session`].
	SessionFetch,
	/// [`AuthPlatform::send_login_link`].
	LoginLink,
	/// [`AuthPlatform::redeem_login_link`].
	Redeem,
	/// [`AuthPlatform::refresh_session`], or the refresh attempted when an expired session is
	/// read (the session is then dropped).
	Refresh,
	/// [`AuthPlatform::sign_out`] (the local session is still dropped).
	SignOut,
}
impl FailurePoint {
	fn endpoint(self) -> &'static str {
		match self {
			FailurePoint::SessionFetch => "session",
			FailurePoint::LoginLink => "otp",
			FailurePoint::Redeem => "verify",
			FailurePoint::Refresh => "token",
			FailurePoint::SignOut => "logout",
		}
	}
}

/// Login link captured in the outbox instead of being emailed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginLink {
	/// Recipient.
	pub email: Email,
	/// One-time code embedded in the link.
	pub code: String,
	/// Landing page requested by the caller.
	pub redirect_url: Url,
	/// When the link was issued.
	pub sent_at: OffsetDateTime,
}

#[derive(Debug)]
struct PendingCode {
	digest: String,
	expires_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct PlatformState {
	current: Option<Session>,
	users: HashMap<Email, UserId>,
	pending: HashMap<Email, PendingCode>,
	outbox: Vec<LoginLink>,
	armed: HashSet<FailurePoint>,
}
impl PlatformState {
	fn trip(&mut self, point: FailurePoint) -> Result<()> {
		if self.armed.remove(&point) {
			return Err(TransientError::UnexpectedResponse {
				endpoint: point.endpoint(),
				message: "Injected failure".into(),
				status: Some(503),
			}
			.into());
		}

		Ok(())
	}

	fn user_for(&mut self, email: &Email) -> Result<User> {
		let next = self.users.len() + 1;
		let id = match self.users.get(email) {
			Some(id) => id.clone(),
			None => {
				let id = UserId::new(format!("user-{next:04}"))
					.map_err(crate::error::ValidationError::from)?;

				self.users.insert(email.clone(), id.clone());

				id
			},
		};

		Ok(User { id, email: email.clone() })
	}
}

/// Auth platform that keeps users, codes, and the current session in memory.
#[derive(Debug, Default)]
pub struct MemoryAuthPlatform {
	state: Mutex<PlatformState>,
}
impl MemoryAuthPlatform {
	/// Arms `point` so its next invocation fails with a transient error.
	pub fn fail_next(&self, point: FailurePoint) {
		self.state.lock().armed.insert(point);
	}

	/// Every link issued so far, oldest first.
	pub fn outbox(&self) -> Vec<LoginLink> {
		self.state.lock().outbox.clone()
	}

	/// Most recent link issued to `email`.
	pub fn last_link_for(&self, email: &Email) -> Option<LoginLink> {
		self.state.lock().outbox.iter().rev().find(|link| &link.email == email).cloned()
	}

	/// Installs a fresh session for `email` without the link round trip, as if one had been
	/// persisted by an earlier run.
	pub fn seed_session(&self, email: &Email) -> Result<Session> {
		let mut state = self.state.lock();
		let session = mint_session(state.user_for(email)?);

		state.current = Some(session.clone());

		Ok(session)
	}

	/// Moves the current session's expiry into the past. Returns `false` if signed out.
	pub fn expire_session(&self) -> bool {
		match self.state.lock().current.as_mut() {
			Some(session) => {
				session.expires_at = OffsetDateTime::now_utc() - Duration::seconds(1);

				true
			},
			None => false,
		}
	}

	fn refresh_locked(state: &mut PlatformState) -> Result<Session> {
		let current = state.current.take().ok_or_else(|| Error::LoginRejected {
			reason: "Refresh token not found".into(),
		})?;

		if current.refresh_token.is_none() {
			return Err(Error::LoginRejected { reason: "Refresh token not found".into() });
		}

		let session = mint_session(current.user);

		state.current = Some(session.clone());

		Ok(session)
	}
}
impl AuthPlatform for MemoryAuthPlatform {
	fn current_session(&self) -> PlatformFuture<'_, Option<Session>> {
		Box::pin(async move {
			let mut state = self.state.lock();

			state.trip(FailurePoint::SessionFetch)?;

			if state.current.as_ref().is_some_and(Session::is_expired) {
				if state.trip(FailurePoint::Refresh).is_err() {
					state.current = None;

					return Ok(None);
				}

				return Ok(Self::refresh_locked(&mut state).ok());
			}

			Ok(state.current.clone())
		})
	}

	fn send_login_link<'a>(
		&'a self,
		email: &'a Email,
		redirect_url: &'a Url,
	) -> PlatformFuture<'a, ()> {
		Box::pin(async move {
			let mut state = self.state.lock();

			state.trip(FailurePoint::LoginLink)?;

			let code = format!("{:06}", rand::rng().random_range(0..1_000_000));
			let sent_at = OffsetDateTime::now_utc();

			state.pending.insert(
				email.clone(),
				PendingCode { digest: digest(&code), expires_at: sent_at + CODE_TTL },
			);
			state.outbox.push(LoginLink {
				email: email.clone(),
				code,
				redirect_url: redirect_url.clone(),
				sent_at,
			});

			Ok(())
		})
	}

	fn redeem_login_link<'a>(
		&'a self,
		email: &'a Email,
		code: &'a str,
	) -> PlatformFuture<'a, Session> {
		Box::pin(async move {
			let mut state = self.state.lock();

			state.trip(FailurePoint::Redeem)?;

			let rejected = || Error::LoginRejected { reason: "Token has expired or is invalid".into() };
			let pending = state.pending.get(email).ok_or_else(rejected)?;

			if pending.digest != digest(code.trim()) || OffsetDateTime::now_utc() >= pending.expires_at
			{
				return Err(rejected());
			}

			state.pending.remove(email);

			let session = mint_session(state.user_for(email)?);

			state.current = Some(session.clone());

			Ok(session)
		})
	}

	fn refresh_session(&self) -> PlatformFuture<'_, Session> {
		Box::pin(async move {
			let mut state = self.state.lock();

			state.trip(FailurePoint::Refresh)?;

			Self::refresh_locked(&mut state)
		})
	}

	fn sign_out(&self) -> PlatformFuture<'_, ()> {
		Box::pin(async move {
			let mut state = self.state.lock();

			state.current = None;
			state.trip(FailurePoint::SignOut)
		})
	}
}

fn mint_session(user: User) -> Session {
	Session {
		user,
		access_token: TokenSecret::new(random_token()),
		refresh_token: Some(TokenSecret::new(random_token())),
		expires_at: OffsetDateTime::now_utc() + SESSION_TTL,
	}
}

fn random_token() -> String {
	rand::rng().sample_iter(Alphanumeric).take(TOKEN_LEN).map(char::from).collect()
}

fn digest(code: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(code.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}
