//! Fail-closed session access plus single-consumer change subscriptions.

// std
use std::sync::Weak;
// crates.io
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
// self
use crate::{
	_prelude::*,
	auth::{Email, Session, SessionChange},
	obs::{self, StepKind, StepOutcome, StepSpan},
	session::AuthPlatform,
};

#[derive(Debug, Default)]
struct Subscribers {
	next_id: u64,
	senders: HashMap<u64, UnboundedSender<SessionChange>>,
}

type SubscriberRegistry = Arc<Mutex<Subscribers>>;

/// Front end over an [`AuthPlatform`] that publishes every session change.
///
/// Platforms may rotate or drop an expired session while it is being read. The provider
/// remembers the last session it observed and publishes the difference, so subscribers
/// learn about read-time refreshes and expiries as well as explicit ones.
pub struct SessionProvider {
	platform: Arc<dyn AuthPlatform>,
	subscribers: SubscriberRegistry,
	observed: Mutex<Option<Session>>,
}
impl SessionProvider {
	/// Wraps a platform.
	pub fn new(platform: Arc<dyn AuthPlatform>) -> Self {
		Self { platform, subscribers: Default::default(), observed: Mutex::new(None) }
	}

	/// Returns the persisted session, or `None` when there is none or the read failed.
	///
	/// A read that finds the previously observed session gone publishes `Expired`; one that
	/// finds it rotated publishes `TokenRefreshed`. A failed read publishes nothing.
	pub async fn current_session(&self) -> Option<Session> {
		let span = StepSpan::new(StepKind::SessionFetch, "session_provider_current");

		obs::record_step_outcome(StepKind::SessionFetch, StepOutcome::Attempt);

		let result = span.instrument(self.platform.current_session()).await;

		obs::record_result(StepKind::SessionFetch, &result);

		let session = match result {
			Ok(session) => session,
			Err(e) => {
				obs::log_swallowed_failure(StepKind::SessionFetch, &e);

				return None;
			},
		};
		let previous = self.observe(session.clone());

		if let Some(change) = observed_change(previous.as_ref(), session.as_ref()) {
			self.publish(change);
		}

		session
	}

	/// Registers a new subscriber. Changes published afterwards are queued in order.
	pub fn subscribe(&self) -> SessionSubscription {
		let (sender, receiver) = mpsc::unbounded_channel();
		let mut subscribers = self.subscribers.lock();
		let id = subscribers.next_id;

		subscribers.next_id += 1;
		subscribers.senders.insert(id, sender);

		SessionSubscription { id, receiver, registry: Arc::downgrade(&self.subscribers) }
	}

	/// Drops the registration `id` from the provider side, closing its queue once drained.
	/// Returns `false` if it was already gone.
	pub fn release(&self, id: u64) -> bool {
		self.subscribers.lock().senders.remove(&id).is_some()
	}

	/// Number of live subscriptions.
	pub fn subscriber_count(&self) -> usize {
		let mut subscribers = self.subscribers.lock();

		subscribers.senders.retain(|_, sender| !sender.is_closed());
		subscribers.senders.len()
	}

	/// Delivers `change` to every live subscriber, pruning closed ones.
	pub fn publish(&self, change: SessionChange) {
		#[cfg(feature = "tracing")]
		tracing::debug!(event = change.event.as_str(), "publishing session change");

		self.subscribers.lock().senders.retain(|_, sender| sender.send(change.clone()).is_ok());
	}

	/// Requests a one-time login link for `email`.
	pub async fn send_login_link(&self, email: &Email, redirect_url: &Url) -> Result<()> {
		let span = StepSpan::new(StepKind::LoginLink, "session_provider_send_link");

		obs::record_step_outcome(StepKind::LoginLink, StepOutcome::Attempt);

		let result = span.instrument(self.platform.send_login_link(email, redirect_url)).await;

		obs::record_result(StepKind::LoginLink, &result);

		result
	}

	/// Redeems a one-time code and publishes [`SessionEvent::SignedIn`](crate::auth::SessionEvent::SignedIn).
	pub async fn redeem_login_link(&self, email: &Email, code: &str) -> Result<Session> {
		let span = StepSpan::new(StepKind::LoginRedeem, "session_provider_redeem_link");

		obs::record_step_outcome(StepKind::LoginRedeem, StepOutcome::Attempt);

		let result = span.instrument(self.platform.redeem_login_link(email, code)).await;

		obs::record_result(StepKind::LoginRedeem, &result);

		let session = result?;

		self.observe(Some(session.clone()));
		self.publish(SessionChange::signed_in(session.clone()));

		Ok(session)
	}

	/// Rotates the session. Publishes `TokenRefreshed` on success and `Expired` on failure.
	pub async fn refresh(&self) -> Option<Session> {
		let span = StepSpan::new(StepKind::SessionRefresh, "session_provider_refresh");

		obs::record_step_outcome(StepKind::SessionRefresh, StepOutcome::Attempt);

		let result = span.instrument(self.platform.refresh_session()).await;

		obs::record_result(StepKind::SessionRefresh, &result);

		match result {
			Ok(session) => {
				self.observe(Some(session.clone()));
				self.publish(SessionChange::refreshed(session.clone()));

				Some(session)
			},
			Err(e) => {
				obs::log_swallowed_failure(StepKind::SessionRefresh, &e);
				self.observe(None);
				self.publish(SessionChange::expired());

				None
			},
		}
	}

	/// Signs out. Subscribers always observe `SignedOut`; a remote failure is still returned.
	pub async fn sign_out(&self) -> Result<()> {
		let span = StepSpan::new(StepKind::SignOut, "session_provider_sign_out");

		obs::record_step_outcome(StepKind::SignOut, StepOutcome::Attempt);

		let result = span.instrument(self.platform.sign_out()).await;

		obs::record_result(StepKind::SignOut, &result);
		self.observe(None);
		self.publish(SessionChange::signed_out());

		result
	}

	fn observe(&self, session: Option<Session>) -> Option<Session> {
		std::mem::replace(&mut *self.observed.lock(), session)
	}
}
impl Debug for SessionProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionProvider")
			.field("subscribers", &self.subscribers.lock().senders.len())
			.finish_non_exhaustive()
	}
}

fn observed_change(previous: Option<&Session>, current: Option<&Session>) -> Option<SessionChange> {
	match (previous, current) {
		(Some(_), None) => Some(SessionChange::expired()),
		(Some(previous), Some(current)) if previous.user_id() != current.user_id() =>
			Some(SessionChange::signed_in(current.clone())),
		(Some(previous), Some(current)) if previous.access_token != current.access_token =>
			Some(SessionChange::refreshed(current.clone())),
		_ => None,
	}
}

/// Ordered queue of session changes owned by a single consumer.
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe)) releases the
/// registration.
#[derive(Debug)]
pub struct SessionSubscription {
	id: u64,
	receiver: UnboundedReceiver<SessionChange>,
	registry: Weak<Mutex<Subscribers>>,
}
impl SessionSubscription {
	/// Registration identifier, unique per provider.
	pub fn id(&self) -> u64 {
		self.id
	}

	/// Waits for the next change. Returns `None` once the provider is gone.
	pub async fn recv(&mut self) -> Option<SessionChange> {
		self.receiver.recv().await
	}

	/// Returns the next queued change without waiting.
	pub fn try_recv(&mut self) -> Option<SessionChange> {
		self.receiver.try_recv().ok()
	}

	/// Releases the registration.
	pub fn unsubscribe(self) {}
}
impl Drop for SessionSubscription {
	fn drop(&mut self) {
		if let Some(registry) = self.registry.upgrade() {
			registry.lock().senders.remove(&self.id);
		}
	}
}
