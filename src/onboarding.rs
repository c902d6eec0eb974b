//! The onboarding state machine.
//!
//! [`Onboarding`] composes the [`SessionProvider`], a [`CredentialValidator`], and a
//! [`CredentialStore`] into the linear flow
//! `Loading → Unauthenticated → TokenRequired → Ready`. Every async step fails closed into
//! the least-privileged state and nothing is retried.
//!
//! State lives behind a synchronous lock that is never held across `.await`. Each hard reset
//! (sign-out, lost session, user switch) bumps an epoch; async steps capture the epoch before
//! awaiting and drop their result if it moved in the meantime.

pub mod metrics;
pub mod screen;
pub mod state;

pub use metrics::OnboardingMetrics;
pub use screen::*;
pub use state::*;

// self
use crate::{
	_prelude::*,
	auth::{Email, RemoteUserId, Session, SessionChange, TokenSecret, User, UserId},
	error::ValidationError,
	obs,
	platform::PlatformDescriptor,
	session::{SessionProvider, SessionSubscription},
	store::{CredentialStore, CredentialStoreAdapter},
	validator::CredentialValidator,
};

#[derive(Debug, Default)]
struct Inner {
	state: OnboardingState,
	epoch: u64,
	session: Option<Session>,
	remote_user_id: Option<RemoteUserId>,
	notice: Option<Notice>,
	pending_input: Option<TokenSecret>,
	link_sent_to: Option<Email>,
	submitting: bool,
	subscription_id: Option<u64>,
}

/// Onboarding state machine driven by session changes and token submissions.
pub struct Onboarding {
	descriptor: PlatformDescriptor,
	sessions: Arc<SessionProvider>,
	validator: Arc<dyn CredentialValidator>,
	store: CredentialStoreAdapter,
	subscription: AsyncMutex<Option<SessionSubscription>>,
	inner: Mutex<Inner>,
	metrics: OnboardingMetrics,
}
impl Onboarding {
	/// Creates a machine in `Loading(Initializing)`. Call [`start`](Self::start) next.
	pub fn new(
		descriptor: PlatformDescriptor,
		sessions: Arc<SessionProvider>,
		validator: Arc<dyn CredentialValidator>,
		store: Arc<dyn CredentialStore>,
	) -> Self {
		Self {
			descriptor,
			sessions,
			validator,
			store: CredentialStoreAdapter::new(store),
			subscription: AsyncMutex::new(None),
			inner: Mutex::new(Inner::default()),
			metrics: OnboardingMetrics::default(),
		}
	}

	/// Subscribes to session changes (once), resolves the persisted session, and runs the
	/// credential check when a session exists.
	pub async fn start(&self) -> OnboardingState {
		{
			let mut subscription = self.subscription.lock().await;

			if subscription.is_none() {
				let fresh = self.sessions.subscribe();

				self.inner.lock().subscription_id = Some(fresh.id());
				*subscription = Some(fresh);
			}
		}

		let epoch = self.inner.lock().epoch;
		let session = self.sessions.current_session().await;

		if self.is_stale(epoch) {
			return self.state();
		}

		self.handle_change(SessionChange::initial(session)).await
	}

	/// Applies one session change and returns the resulting state.
	///
	/// A change without a session hard-resets to `Unauthenticated` when a session was held. A change for the user
	/// already held only swaps the session; a change for a different user resets first and
	/// then re-runs the credential check.
	pub async fn handle_change(&self, change: SessionChange) -> OnboardingState {
		let Some(session) = change.session else {
			let mut inner = self.inner.lock();

			// Only a held session makes this a reset; the first resolution just settles.
			if inner.session.is_some() {
				self.reset_locked(&mut inner);
			} else {
				self.transition(&mut inner, OnboardingState::Unauthenticated);
			}

			return inner.state;
		};
		let user_id = session.user_id().clone();
		let epoch = {
			let mut inner = self.inner.lock();

			match inner.session.as_ref().map(|current| current.user_id() == &user_id) {
				Some(true) => {
					inner.session = Some(session);

					return inner.state;
				},
				Some(false) => self.reset_locked(&mut inner),
				None => (),
			}

			inner.session = Some(session);
			self.transition(&mut inner, OnboardingState::Loading(LoadingPhase::Validating));

			inner.epoch
		};

		self.resolve_credential(user_id, epoch).await
	}

	/// Waits for the next session change and applies it. Returns `None` once the machine has
	/// no subscription (never started, torn down, or provider gone).
	pub async fn next_change(&self) -> Option<OnboardingState> {
		let change = {
			let mut subscription = self.subscription.lock().await;

			subscription.as_mut()?.recv().await?
		};

		Some(self.handle_change(change).await)
	}

	/// Applies every change already queued, without waiting for new ones.
	pub async fn drain_changes(&self) -> OnboardingState {
		loop {
			let change = {
				let mut subscription = self.subscription.lock().await;

				subscription.as_mut().and_then(SessionSubscription::try_recv)
			};

			match change {
				Some(change) => {
					self.handle_change(change).await;
				},
				None => return self.state(),
			}
		}
	}

	/// Validates and stores a Canvas token for the signed-in user.
	///
	/// Input is trimmed. A blank token is rejected before any network call. A refused token
	/// leaves the machine in `TokenRequired` without touching the store. A store failure
	/// keeps the typed input available through [`pending_input`](Self::pending_input).
	pub async fn submit_token(&self, input: &str) -> Result<OnboardingState> {
		let token = TokenSecret::new(input.trim());
		let (user_id, epoch) = {
			let mut inner = self.inner.lock();

			if inner.state != OnboardingState::TokenRequired {
				return Err(Error::InvalidState {
					operation: "submit a token",
					state: inner.state.as_str(),
				});
			}
			if inner.submitting {
				return Err(Error::InvalidState {
					operation: "submit a token",
					state: "validating a token",
				});
			}
			if token.is_blank() {
				inner.notice = Some(Notice::MissingToken);

				return Err(ValidationError::BlankToken.into());
			}

			let Some(user_id) = session_user_id(&inner) else {
				return Err(Error::InvalidState {
					operation: "submit a token",
					state: inner.state.as_str(),
				});
			};

			inner.submitting = true;
			inner.notice = None;
			inner.pending_input = Some(TokenSecret::new(input));
			self.metrics.record_submission();

			(user_id, inner.epoch)
		};
		let check = self.validator.validate(&token).await;
		let remote_user_id = {
			let mut inner = self.inner.lock();

			if self.discard_if_stale(&inner, epoch) {
				return Ok(inner.state);
			}

			match check.remote_user_id.filter(|_| check.valid) {
				Some(remote_user_id) => remote_user_id,
				None => {
					inner.submitting = false;
					inner.notice = Some(Notice::InvalidToken);
					self.metrics.record_rejection();

					return Err(Error::InvalidCredential { status: None });
				},
			}
		};
		let written = self.store.upsert_token(&user_id, token, remote_user_id).await;
		let mut inner = self.inner.lock();

		if self.discard_if_stale(&inner, epoch) {
			return Ok(inner.state);
		}

		inner.submitting = false;

		match written {
			Ok(record) => {
				inner.notice = None;
				inner.pending_input = None;
				inner.remote_user_id = Some(record.external_user_id);
				self.transition(&mut inner, OnboardingState::Ready);

				Ok(inner.state)
			},
			Err(e) => {
				inner.notice = Some(Notice::SaveFailed);
				self.metrics.record_failed_save();

				Err(e.into())
			},
		}
	}

	/// Signs out from any state.
	///
	/// The machine hard-resets to `Unauthenticated` immediately; a failure to sign out
	/// remotely is returned afterwards.
	pub async fn sign_out(&self) -> Result<()> {
		{
			let mut inner = self.inner.lock();

			self.reset_locked(&mut inner);
		}

		self.sessions.sign_out().await
	}

	/// Emails a one-time login link to `email`. Only valid while `Unauthenticated`.
	pub async fn request_login_link(&self, email: &str) -> Result<()> {
		let (email, epoch) = {
			let mut inner = self.inner.lock();

			if inner.state != OnboardingState::Unauthenticated {
				return Err(Error::InvalidState {
					operation: "request a login link",
					state: inner.state.as_str(),
				});
			}

			match Email::new(email) {
				Ok(email) => {
					inner.notice = None;

					(email, inner.epoch)
				},
				Err(e) => {
					inner.notice = Some(Notice::InvalidEmail);

					return Err(ValidationError::from(e).into());
				},
			}
		};
		let result = self.sessions.send_login_link(&email, &self.descriptor.redirect_url).await;
		let mut inner = self.inner.lock();

		if self.discard_if_stale(&inner, epoch) {
			return result;
		}

		match &result {
			Ok(()) => inner.link_sent_to = Some(email),
			Err(_) => inner.notice = Some(Notice::LoginLinkFailed),
		}

		result
	}

	/// Returns the login screen from its confirmation view to the request form.
	pub fn dismiss_login_link(&self) {
		let mut inner = self.inner.lock();

		inner.link_sent_to = None;
		inner.notice = None;
	}

	/// Releases the session subscription. Safe to call more than once.
	pub async fn teardown(&self) {
		let id = self.inner.lock().subscription_id.take();

		if let Some(id) = id {
			// Closes the queue so a pending `next_change` returns and frees the lock.
			self.sessions.release(id);
		}

		self.subscription.lock().await.take();
	}

	/// Current state.
	pub fn state(&self) -> OnboardingState {
		self.inner.lock().state
	}

	/// Session held by the machine, if any.
	pub fn session(&self) -> Option<Session> {
		self.inner.lock().session.clone()
	}

	/// Signed-in user, if any.
	pub fn user(&self) -> Option<User> {
		self.inner.lock().session.as_ref().map(|session| session.user.clone())
	}

	/// Grading-platform identity of the stored credential, once `Ready`.
	pub fn remote_user_id(&self) -> Option<RemoteUserId> {
		self.inner.lock().remote_user_id
	}

	/// Notice to show, if any.
	pub fn notice(&self) -> Option<Notice> {
		self.inner.lock().notice
	}

	/// Raw input of the last submission that did not complete.
	pub fn pending_input(&self) -> Option<TokenSecret> {
		self.inner.lock().pending_input.clone()
	}

	/// Screen matching the current state.
	pub fn screen(&self) -> Screen {
		let inner = self.inner.lock();
		let email = inner.session.as_ref().map(|session| session.user.email.clone());

		match (inner.state, email) {
			(OnboardingState::Loading(phase), _) => Screen::Loading(LoadingView::for_phase(phase)),
			(OnboardingState::TokenRequired, Some(email)) => Screen::TokenSetup(TokenSetupView {
				email,
				settings_url: self.settings_url(),
				instructions: &TOKEN_INSTRUCTIONS,
				submitting: inner.submitting,
				notice: inner.notice,
			}),
			(OnboardingState::Ready, Some(email)) =>
				Screen::Dashboard(DashboardView { email, next_steps: &DASHBOARD_NEXT_STEPS }),
			_ => Screen::Login(LoginView {
				link_sent_to: inner.link_sent_to.clone(),
				notice: inner.notice,
			}),
		}
	}

	/// In-process counters for this machine.
	pub fn metrics(&self) -> &OnboardingMetrics {
		&self.metrics
	}

	async fn resolve_credential(&self, user_id: UserId, epoch: u64) -> OnboardingState {
		let record = self.store.get_token(&user_id).await;
		let mut inner = self.inner.lock();

		if self.discard_if_stale(&inner, epoch) {
			return inner.state;
		}

		match record {
			Some(record) => {
				inner.remote_user_id = Some(record.external_user_id);
				self.transition(&mut inner, OnboardingState::Ready);
			},
			None => self.transition(&mut inner, OnboardingState::TokenRequired),
		}

		inner.state
	}

	fn reset_locked(&self, inner: &mut Inner) {
		let subscription_id = inner.subscription_id;
		let epoch = inner.epoch + 1;
		let from = inner.state;

		*inner = Inner { epoch, subscription_id, state: from, ..Default::default() };

		self.transition(inner, OnboardingState::Unauthenticated);
		self.metrics.record_reset();
	}

	fn transition(&self, inner: &mut Inner, to: OnboardingState) {
		if inner.state == to {
			return;
		}

		obs::log_transition(inner.state.as_str(), to.as_str(), inner.epoch);
		obs::record_transition(to.as_str());
		self.metrics.record_transition();

		inner.state = to;
	}

	fn is_stale(&self, epoch: u64) -> bool {
		let inner = self.inner.lock();

		self.discard_if_stale(&inner, epoch)
	}

	fn discard_if_stale(&self, inner: &Inner, epoch: u64) -> bool {
		let stale = inner.epoch != epoch;

		if stale {
			self.metrics.record_discard();
		}

		stale
	}

	fn settings_url(&self) -> Url {
		self.descriptor
			.settings_url()
			.unwrap_or_else(|_| self.descriptor.grading_base_url.clone())
	}
}
impl Debug for Onboarding {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let inner = self.inner.lock();

		f.debug_struct("Onboarding")
			.field("state", &inner.state)
			.field("epoch", &inner.epoch)
			.field("user", &inner.session.as_ref().map(Session::user_id))
			.field("notice", &inner.notice)
			.finish_non_exhaustive()
	}
}

fn session_user_id(inner: &Inner) -> Option<UserId> {
	inner.session.as_ref().map(|session| session.user_id().clone())
}
