#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use integra_onboarding::{
	_preludet::*,
	auth::{Email, RemoteUserId, Session, TokenSecret, User, UserId},
	onboarding::{Onboarding, OnboardingState},
	session::{HostedAuthPlatform, SessionProvider},
	store::{CredentialStore, RestStore},
	validator::{CanvasValidator, CredentialValidator},
};

fn session_body() -> serde_json::Value {
	serde_json::json!({
		"access_token": "access-1",
		"token_type": "bearer",
		"expires_in": 3600,
		"refresh_token": "refresh-1",
		"user": { "id": "8d0fd2b3-user", "email": "student@school.test" }
	})
}

#[tokio::test]
async fn email_link_to_dashboard_over_the_wire() {
	let server = MockServer::start_async().await;
	let otp = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/v1/otp").header("apikey", "test-anon-key");
			then.status(200).json_body(serde_json::json!({}));
		})
		.await;
	let verify = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/v1/verify").json_body(serde_json::json!({
				"type": "magiclink",
				"email": "student@school.test",
				"token": "123456"
			}));
			then.status(200).json_body(session_body());
		})
		.await;
	let lookup = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/rest/v1/user_tokens")
				.query_param("user_id", "eq.8d0fd2b3-user")
				.header("authorization", "Bearer access-1")
				.header("apikey", "test-anon-key");
			then.status(200).json_body(serde_json::json!([]));
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/users/self").header("authorization", "Bearer 7~good");
			then.status(200).json_body(serde_json::json!({ "id": 42 }));
		})
		.await;
	let save = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/rest/v1/user_tokens")
				.query_param("on_conflict", "user_id")
				.header("authorization", "Bearer access-1")
				.header("prefer", "resolution=merge-duplicates,return=minimal");
			then.status(201);
		})
		.await;
	let logout = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/v1/logout").header("authorization", "Bearer access-1");
			then.status(204);
		})
		.await;
	let descriptor = test_descriptor(&server.base_url());
	let platform = Arc::new(
		HostedAuthPlatform::with_http_client(&descriptor, test_reqwest_http_client())
			.expect("Platform should build."),
	);
	let sessions = Arc::new(SessionProvider::new(platform.clone()));
	let store: Arc<dyn CredentialStore> = Arc::new(
		RestStore::with_http_client(&descriptor, test_reqwest_http_client())
			.expect("Store should build.")
			.with_sessions(sessions.clone()),
	);
	let validator: Arc<dyn CredentialValidator> = Arc::new(
		CanvasValidator::with_http_client(&descriptor, test_reqwest_http_client())
			.expect("Validator should build."),
	);
	let onboarding = Onboarding::new(descriptor, sessions.clone(), validator, store);
	let email = Email::new("student@school.test").expect("Email fixture should be valid.");

	assert_eq!(onboarding.start().await, OnboardingState::Unauthenticated);

	onboarding.request_login_link("student@school.test").await.expect("Link should be sent.");
	sessions.redeem_login_link(&email, " 123456 ").await.expect("Code should redeem.");

	assert_eq!(onboarding.next_change().await, Some(OnboardingState::TokenRequired));
	assert_eq!(
		onboarding.submit_token("7~good").await.expect("Submission should succeed."),
		OnboardingState::Ready
	);
	assert_eq!(onboarding.remote_user_id(), Some(RemoteUserId(42)));

	onboarding.sign_out().await.expect("Sign-out should succeed.");

	assert_eq!(onboarding.drain_changes().await, OnboardingState::Unauthenticated);
	assert!(platform.session_snapshot().is_none());

	otp.assert_async().await;
	verify.assert_async().await;
	lookup.assert_async().await;
	profile.assert_async().await;
	save.assert_async().await;
	logout.assert_async().await;
}

#[tokio::test]
async fn backend_outage_reads_as_missing_credential() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/v1/user_tokens");
			then.status(500).json_body(serde_json::json!({ "message": "db down" }));
		})
		.await;

	let test = build_test_onboarding(&server.base_url());
	let descriptor = test_descriptor(&server.base_url());
	let store: Arc<dyn CredentialStore> = Arc::new(
		RestStore::with_http_client(&descriptor, test_reqwest_http_client())
			.expect("Store should build."),
	);
	let validator: Arc<dyn CredentialValidator> = Arc::new(
		CanvasValidator::with_http_client(&descriptor, test_reqwest_http_client())
			.expect("Validator should build."),
	);
	let onboarding = Onboarding::new(descriptor, test.sessions.clone(), validator, store);

	test.platform
		.seed_session(&Email::new("student@school.test").expect("Email fixture should be valid."))
		.expect("Seed should succeed.");

	assert_eq!(onboarding.start().await, OnboardingState::TokenRequired);
}

#[tokio::test]
async fn expired_hosted_session_signs_the_machine_out() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/v1/user_tokens").header("authorization", "Bearer access-1");
			then.status(200).json_body(serde_json::json!([{
				"user_id": "8d0fd2b3-user",
				"canvas_token": "7~stored",
				"canvas_user_id": 42,
				"updated_at": "2025-09-01T08:30:00Z"
			}]));
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/v1/token");
			then.status(400).json_body(serde_json::json!({
				"error": "invalid_grant",
				"error_description": "Invalid Refresh Token"
			}));
		})
		.await;
	let descriptor = test_descriptor(&server.base_url());
	let platform = Arc::new(
		HostedAuthPlatform::with_http_client(&descriptor, test_reqwest_http_client())
			.expect("Platform should build."),
	);
	let sessions = Arc::new(SessionProvider::new(platform.clone()));
	let store: Arc<dyn CredentialStore> = Arc::new(
		RestStore::with_http_client(&descriptor, test_reqwest_http_client())
			.expect("Store should build.")
			.with_sessions(sessions.clone()),
	);
	let validator: Arc<dyn CredentialValidator> = Arc::new(
		CanvasValidator::with_http_client(&descriptor, test_reqwest_http_client())
			.expect("Validator should build."),
	);
	let onboarding = Onboarding::new(descriptor, sessions.clone(), validator, store);
	let session = Session {
		user: User {
			id: UserId::new("8d0fd2b3-user").expect("User fixture should be valid."),
			email: Email::new("student@school.test").expect("Email fixture should be valid."),
		},
		access_token: TokenSecret::new("access-1"),
		refresh_token: Some(TokenSecret::new("refresh-1")),
		expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
	};

	platform.restore_session(session.clone());

	assert_eq!(onboarding.start().await, OnboardingState::Ready);

	platform.restore_session(Session {
		expires_at: OffsetDateTime::now_utc() - Duration::seconds(1),
		..session
	});

	assert_eq!(sessions.current_session().await, None);
	assert_eq!(onboarding.drain_changes().await, OnboardingState::Unauthenticated);
	assert_eq!(onboarding.session(), None);
	refresh.assert_hits_async(1).await;
}
