//! Session provider and the auth-platform contract it wraps.
//!
//! [`AuthPlatform`] is the seam to the external auth service: it owns the persisted session
//! and performs one-time-link sign-in, refresh, and sign-out. [`SessionProvider`] sits in
//! front of it, fails closed on session reads, and fans every change out to
//! [`SessionSubscription`]s.

pub mod memory;
pub mod provider;
#[cfg(feature = "reqwest")] pub mod hosted;

#[cfg(feature = "reqwest")] pub use hosted::HostedAuthPlatform;
pub use memory::{FailurePoint, LoginLink, MemoryAuthPlatform};
pub use provider::{SessionProvider, SessionSubscription};

// self
use crate::{
	_prelude::*,
	auth::{Email, Session},
};

/// Boxed future returned by [`AuthPlatform`] implementations.
pub type PlatformFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Contract implemented by auth platforms (hosted or in-process).
pub trait AuthPlatform
where
	Self: Send + Sync,
{
	/// Returns the persisted session, if any.
	fn current_session(&self) -> PlatformFuture<'_, Option<Session>>;

	/// Emails a one-time login link that lands on `redirect_url`.
	fn send_login_link<'a>(&'a self, email: &'a Email, redirect_url: &'a Url)
	-> PlatformFuture<'a, ()>;

	/// Redeems the one-time code carried by a login link and persists the new session.
	fn redeem_login_link<'a>(&'a self, email: &'a Email, code: &'a str)
	-> PlatformFuture<'a, Session>;

	/// Rotates the persisted session's access token.
	fn refresh_session(&self) -> PlatformFuture<'_, Session>;

	/// Drops the persisted session and revokes it remotely.
	fn sign_out(&self) -> PlatformFuture<'_, ()>;
}
