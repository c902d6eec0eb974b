// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicUsize, Ordering},
};
// crates.io
use time::{Duration, OffsetDateTime};
use tokio::sync::Notify;
use url::Url;
// self
use integra_onboarding::{
	auth::{
		CredentialRecord, Email, RemoteUserId, Session, SessionChange, TokenSecret, User, UserId,
	},
	error::{Error, ValidationError},
	onboarding::{LoadingPhase, Notice, Onboarding, OnboardingState, Screen},
	platform::PlatformDescriptor,
	session::{FailurePoint, MemoryAuthPlatform, SessionProvider},
	store::{CredentialStore, CredentialStoreAdapter, MemoryStore, StoreError, StoreFuture},
	validator::{CredentialValidator, ValidatorFuture},
};

/// Accepts `valid-123` as Canvas user 42 and refuses everything else.
#[derive(Default)]
struct ScriptedValidator {
	calls: AtomicUsize,
}
impl CredentialValidator for ScriptedValidator {
	fn check<'a>(&'a self, token: &'a TokenSecret) -> ValidatorFuture<'a, RemoteUserId> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			match token.expose() {
				"valid-123" => Ok(RemoteUserId(42)),
				_ => Err(Error::InvalidCredential { status: Some(401) }),
			}
		})
	}
}

/// Holds every validation until released.
#[derive(Default)]
struct GatedValidator {
	entered: Notify,
	release: Notify,
}
impl CredentialValidator for GatedValidator {
	fn check<'a>(&'a self, _: &'a TokenSecret) -> ValidatorFuture<'a, RemoteUserId> {
		Box::pin(async move {
			self.entered.notify_one();
			self.release.notified().await;

			Ok(RemoteUserId(42))
		})
	}
}

/// Memory store that counts calls and can be told to refuse writes.
#[derive(Default)]
struct CountingStore {
	inner: MemoryStore,
	fetches: AtomicUsize,
	upserts: AtomicUsize,
	refuse_writes: AtomicBool,
}
impl CredentialStore for CountingStore {
	fn fetch<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Option<CredentialRecord>> {
		self.fetches.fetch_add(1, Ordering::SeqCst);

		self.inner.fetch(user_id)
	}

	fn upsert(&self, record: CredentialRecord) -> StoreFuture<'_, ()> {
		self.upserts.fetch_add(1, Ordering::SeqCst);

		if self.refuse_writes.load(Ordering::SeqCst) {
			return Box::pin(async { Err(StoreError::Backend { message: "write refused".into() }) });
		}

		self.inner.upsert(record)
	}
}

struct Harness {
	machine: Arc<Onboarding>,
	platform: Arc<MemoryAuthPlatform>,
	sessions: Arc<SessionProvider>,
	store: Arc<CountingStore>,
}

fn descriptor() -> PlatformDescriptor {
	PlatformDescriptor::builder()
		.grading_base_url(Url::parse("https://canvas.example.com").expect("Canvas URL should parse."))
		.backend_url(Url::parse("https://project.example.com").expect("Backend URL should parse."))
		.backend_api_key("anon")
		.redirect_url(Url::parse("https://integra.app/dashboard").expect("Redirect should parse."))
		.build()
		.expect("Descriptor should build.")
}

fn harness(validator: Arc<dyn CredentialValidator>) -> Harness {
	let platform = Arc::new(MemoryAuthPlatform::default());
	let sessions = Arc::new(SessionProvider::new(platform.clone()));
	let store = Arc::new(CountingStore::default());
	let machine =
		Arc::new(Onboarding::new(descriptor(), sessions.clone(), validator, store.clone()));

	Harness { machine, platform, sessions, store }
}

fn detached_session(id: &str, address: &str) -> Session {
	Session {
		user: User {
			id: UserId::new(id).expect("User fixture should be valid."),
			email: email(address),
		},
		access_token: TokenSecret::new(format!("access-{id}")),
		refresh_token: None,
		expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
	}
}

fn email(address: &str) -> Email {
	Email::new(address).expect("Email fixture should be valid.")
}

async fn sign_in(h: &Harness, address: &str) {
	let email = email(address);
	let redirect = Url::parse("https://integra.app/dashboard").expect("Redirect should parse.");

	h.sessions.send_login_link(&email, &redirect).await.expect("Login link should be sent.");

	let link = h.platform.last_link_for(&email).expect("Outbox should hold the link.");

	h.sessions.redeem_login_link(&email, &link.code).await.expect("Link should redeem.");
}

async fn seed_record(h: &Harness, user_id: &UserId) {
	CredentialStoreAdapter::new(h.store.clone())
		.upsert_token(user_id, TokenSecret::new("7~seeded"), RemoteUserId(7))
		.await
		.expect("Seeding the store should succeed.");
	h.store.upserts.store(0, Ordering::SeqCst);
}

#[tokio::test]
async fn starts_unauthenticated_without_session() {
	let h = harness(Arc::new(ScriptedValidator::default()));

	assert_eq!(h.machine.state(), OnboardingState::Loading(LoadingPhase::Initializing));
	assert!(matches!(h.machine.screen(), Screen::Loading(_)));
	assert_eq!(h.machine.start().await, OnboardingState::Unauthenticated);
	assert!(matches!(h.machine.screen(), Screen::Login(view) if view.link_sent_to.is_none()));
	assert_eq!(h.store.fetches.load(Ordering::SeqCst), 0);
	assert_eq!(h.machine.metrics().resets(), 0);
	assert_eq!(h.machine.metrics().transitions(), 1);

	h.sessions.publish(SessionChange::signed_out());

	assert_eq!(h.machine.drain_changes().await, OnboardingState::Unauthenticated);
	assert_eq!(h.machine.metrics().resets(), 0);
}

#[tokio::test]
async fn session_without_record_requires_token() {
	let validator = Arc::new(ScriptedValidator::default());
	let h = harness(validator.clone());

	h.platform.seed_session(&email("student@school.test")).expect("Seed should succeed.");

	assert_eq!(h.machine.start().await, OnboardingState::TokenRequired);
	assert_eq!(h.machine.drain_changes().await, OnboardingState::TokenRequired);
	assert_eq!(validator.calls.load(Ordering::SeqCst), 0);

	match h.machine.screen() {
		Screen::TokenSetup(view) => {
			assert_eq!(view.email, email("student@school.test"));
			assert_eq!(view.settings_url.as_str(), "https://canvas.example.com/profile/settings");
			assert!(!view.submitting);
		},
		other => panic!("Unexpected screen: {other:?}."),
	}
}

#[tokio::test]
async fn stored_record_goes_straight_to_ready() {
	let h = harness(Arc::new(ScriptedValidator::default()));
	let session =
		h.platform.seed_session(&email("student@school.test")).expect("Seed should succeed.");

	seed_record(&h, session.user_id()).await;

	assert_eq!(h.machine.start().await, OnboardingState::Ready);
	assert_eq!(h.machine.remote_user_id(), Some(RemoteUserId(7)));
	assert!(matches!(h.machine.screen(), Screen::Dashboard(view) if view.next_steps.len() == 4));
}

#[tokio::test]
async fn valid_submission_reaches_ready_exactly_once() {
	let h = harness(Arc::new(ScriptedValidator::default()));

	h.platform.seed_session(&email("student@school.test")).expect("Seed should succeed.");
	h.machine.start().await;

	let transitions = h.machine.metrics().transitions();
	let state = h.machine.submit_token("  valid-123\n").await.expect("Submission should succeed.");
	let user = h.machine.user().expect("Machine should hold the user.");
	let stored = h.store.inner.get(&user.id).expect("Record should be stored.");

	assert_eq!(state, OnboardingState::Ready);
	assert_eq!(h.machine.metrics().transitions() - transitions, 1);
	assert_eq!(h.store.upserts.load(Ordering::SeqCst), 1);
	assert_eq!(stored.external_token.expose(), "valid-123");
	assert_eq!(stored.external_user_id, RemoteUserId(42));
	assert_eq!(h.machine.pending_input(), None);
	assert!(matches!(
		h.machine.submit_token("valid-123").await,
		Err(Error::InvalidState { state: "ready", .. })
	));
}

#[tokio::test]
async fn refused_submission_never_touches_the_store() {
	let h = harness(Arc::new(ScriptedValidator::default()));

	h.platform.seed_session(&email("student@school.test")).expect("Seed should succeed.");
	h.machine.start().await;

	let result = h.machine.submit_token("bad-token").await;

	assert!(matches!(result, Err(Error::InvalidCredential { .. })));
	assert_eq!(h.machine.state(), OnboardingState::TokenRequired);
	assert_eq!(h.machine.notice(), Some(Notice::InvalidToken));
	assert_eq!(h.store.upserts.load(Ordering::SeqCst), 0);
	assert_eq!(h.machine.metrics().rejected_submissions(), 1);
}

#[tokio::test]
async fn blank_submission_is_rejected_locally() {
	let validator = Arc::new(ScriptedValidator::default());
	let h = harness(validator.clone());

	h.platform.seed_session(&email("student@school.test")).expect("Seed should succeed.");
	h.machine.start().await;

	assert!(matches!(
		h.machine.submit_token(" \t ").await,
		Err(Error::Validation(ValidationError::BlankToken))
	));
	assert_eq!(h.machine.state(), OnboardingState::TokenRequired);
	assert_eq!(h.machine.notice(), Some(Notice::MissingToken));
	assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
	assert_eq!(h.machine.metrics().submissions(), 0);
}

#[tokio::test]
async fn failed_save_keeps_typed_input() {
	let h = harness(Arc::new(ScriptedValidator::default()));

	h.platform.seed_session(&email("student@school.test")).expect("Seed should succeed.");
	h.machine.start().await;
	h.store.refuse_writes.store(true, Ordering::SeqCst);

	let result = h.machine.submit_token("valid-123 ").await;

	assert!(matches!(result, Err(Error::Storage(StoreError::Backend { .. }))));
	assert_eq!(h.machine.state(), OnboardingState::TokenRequired);
	assert_eq!(h.machine.notice(), Some(Notice::SaveFailed));
	assert_eq!(
		h.machine.pending_input().as_ref().map(TokenSecret::expose),
		Some("valid-123 ")
	);

	h.store.refuse_writes.store(false, Ordering::SeqCst);

	assert_eq!(
		h.machine.submit_token("valid-123").await.expect("Retry should succeed."),
		OnboardingState::Ready
	);
	assert_eq!(h.machine.metrics().failed_saves(), 1);
}

#[tokio::test]
async fn sign_out_hard_resets_and_next_user_sees_fresh_state() {
	let h = harness(Arc::new(ScriptedValidator::default()));

	sign_in(&h, "first@school.test").await;
	h.machine.start().await;
	h.machine.submit_token("valid-123").await.expect("Submission should succeed.");

	h.machine.sign_out().await.expect("Sign-out should succeed.");

	assert_eq!(h.machine.state(), OnboardingState::Unauthenticated);
	assert_eq!(h.machine.session(), None);
	assert_eq!(h.machine.remote_user_id(), None);
	assert_eq!(h.machine.notice(), None);
	assert_eq!(h.machine.drain_changes().await, OnboardingState::Unauthenticated);

	sign_in(&h, "second@school.test").await;

	assert_eq!(h.machine.drain_changes().await, OnboardingState::TokenRequired);
	assert_eq!(h.machine.user().map(|user| user.email), Some(email("second@school.test")));
	assert_eq!(h.machine.pending_input(), None);
	assert_eq!(h.machine.metrics().resets(), 1);
}

#[tokio::test]
async fn any_change_sequence_ending_without_session_is_unauthenticated() {
	let h = harness(Arc::new(ScriptedValidator::default()));
	let first = detached_session("user-a", "a@school.test");
	let second = detached_session("user-b", "b@school.test");

	seed_record(&h, first.user_id()).await;

	assert_eq!(h.machine.start().await, OnboardingState::Unauthenticated);

	let sequences = [
		vec![SessionChange::expired()],
		vec![SessionChange::signed_in(first.clone()), SessionChange::signed_out()],
		vec![
			SessionChange::signed_in(first.clone()),
			SessionChange::refreshed(first.clone()),
			SessionChange::signed_in(second.clone()),
			SessionChange::expired(),
		],
		vec![SessionChange::initial(Some(second.clone())), SessionChange::initial(None)],
	];

	for sequence in sequences {
		for change in sequence {
			h.sessions.publish(change);
		}

		assert_eq!(h.machine.drain_changes().await, OnboardingState::Unauthenticated);
		assert_eq!(h.machine.session(), None);
		assert_eq!(h.machine.remote_user_id(), None);
	}
}

#[tokio::test]
async fn expiry_found_on_read_signs_the_machine_out() {
	let h = harness(Arc::new(ScriptedValidator::default()));
	let session =
		h.platform.seed_session(&email("student@school.test")).expect("Seed should succeed.");

	seed_record(&h, session.user_id()).await;

	assert_eq!(h.machine.start().await, OnboardingState::Ready);

	h.platform.expire_session();

	let rotated = h.sessions.current_session().await.expect("Expired session should rotate.");

	assert_eq!(h.machine.drain_changes().await, OnboardingState::Ready);
	assert_eq!(h.machine.session(), Some(rotated));

	h.platform.expire_session();
	h.platform.fail_next(FailurePoint::Refresh);

	assert_eq!(h.sessions.current_session().await, None);
	assert_eq!(h.machine.drain_changes().await, OnboardingState::Unauthenticated);
	assert_eq!(h.machine.session(), None);
	assert_eq!(h.machine.remote_user_id(), None);
	assert_eq!(h.machine.metrics().resets(), 1);
}

#[tokio::test]
async fn refresh_for_same_user_only_swaps_session() {
	let h = harness(Arc::new(ScriptedValidator::default()));
	let session =
		h.platform.seed_session(&email("student@school.test")).expect("Seed should succeed.");

	seed_record(&h, session.user_id()).await;
	h.machine.start().await;

	let fetches = h.store.fetches.load(Ordering::SeqCst);
	let refreshed = h.sessions.refresh().await.expect("Refresh should succeed.");

	assert_eq!(h.machine.drain_changes().await, OnboardingState::Ready);
	assert_eq!(h.store.fetches.load(Ordering::SeqCst), fetches);
	assert_eq!(h.machine.session(), Some(refreshed));

	h.platform.expire_session();
	h.sessions.publish(SessionChange::expired());

	assert_eq!(h.machine.drain_changes().await, OnboardingState::Unauthenticated);
}

#[tokio::test]
async fn reset_discards_in_flight_submission() {
	let validator = Arc::new(GatedValidator::default());
	let h = harness(validator.clone());

	h.platform.seed_session(&email("student@school.test")).expect("Seed should succeed.");
	h.machine.start().await;

	let machine = h.machine.clone();
	let submission = tokio::spawn(async move { machine.submit_token("valid-123").await });

	validator.entered.notified().await;

	assert!(matches!(h.machine.screen(), Screen::TokenSetup(view) if view.submitting));

	h.machine.sign_out().await.expect("Sign-out should succeed.");
	validator.release.notify_one();

	let outcome = submission
		.await
		.expect("Submission task should complete.")
		.expect("Discarded submissions should not error.");

	assert_eq!(outcome, OnboardingState::Unauthenticated);
	assert_eq!(h.machine.state(), OnboardingState::Unauthenticated);
	assert_eq!(h.store.upserts.load(Ordering::SeqCst), 0);
	assert_eq!(h.machine.metrics().discarded_results(), 1);
}

#[tokio::test]
async fn login_link_round_trip_and_dismissal() {
	let h = harness(Arc::new(ScriptedValidator::default()));

	h.machine.start().await;

	assert!(matches!(
		h.machine.request_login_link("not-an-address").await,
		Err(Error::Validation(ValidationError::Email(_)))
	));
	assert_eq!(h.machine.notice(), Some(Notice::InvalidEmail));

	h.machine.request_login_link(" Student@School.test ").await.expect("Link should be sent.");

	assert!(matches!(
		h.machine.screen(),
		Screen::Login(view) if view.link_sent_to == Some(email("student@school.test"))
	));

	let link = h
		.platform
		.last_link_for(&email("student@school.test"))
		.expect("Outbox should hold the link.");

	assert_eq!(link.redirect_url.as_str(), "https://integra.app/dashboard");

	h.machine.dismiss_login_link();

	assert!(matches!(h.machine.screen(), Screen::Login(view) if view.link_sent_to.is_none()));

	h.sessions
		.redeem_login_link(&link.email, &link.code)
		.await
		.expect("Link should redeem.");

	assert_eq!(h.machine.next_change().await, Some(OnboardingState::TokenRequired));
	assert!(matches!(
		h.machine.request_login_link("student@school.test").await,
		Err(Error::InvalidState { state: "token_required", .. })
	));
}

#[tokio::test]
async fn teardown_releases_subscription() {
	let h = harness(Arc::new(ScriptedValidator::default()));

	h.machine.start().await;
	h.machine.start().await;

	assert_eq!(h.sessions.subscriber_count(), 1);

	let machine = h.machine.clone();
	let waiter = tokio::spawn(async move { machine.next_change().await });

	tokio::task::yield_now().await;
	h.machine.teardown().await;
	h.machine.teardown().await;

	assert_eq!(waiter.await.expect("Waiter task should complete."), None);
	assert_eq!(h.sessions.subscriber_count(), 0);
	assert_eq!(h.machine.next_change().await, None);
}

#[tokio::test]
async fn repeated_lookups_are_consistent() {
	let h = harness(Arc::new(ScriptedValidator::default()));
	let adapter = CredentialStoreAdapter::new(h.store.clone());
	let user = UserId::new("user-stable").expect("User fixture should be valid.");

	assert_eq!(adapter.get_token(&user).await, None);
	assert_eq!(adapter.get_token(&user).await, None);

	seed_record(&h, &user).await;

	let first = adapter.get_token(&user).await;
	let second = adapter.get_token(&user).await;

	assert!(first.is_some());
	assert_eq!(first, second);
}
