//! Walks one student through the onboarding flow: email link, Canvas token, dashboard.
//!
//! Canvas is mocked with `httpmock`, the auth platform runs in memory, and the credential
//! lands in a JSON file under the system temp directory.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
use url::Url;
// self
use integra_onboarding::{
	auth::Email,
	http::ReqwestHttpClient,
	onboarding::{Onboarding, Screen},
	platform::PlatformDescriptor,
	reqwest::Client,
	session::{MemoryAuthPlatform, SessionProvider},
	store::{CredentialStore, FileStore},
	validator::{CanvasValidator, CredentialValidator},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/users/self").header("authorization", "Bearer 7~demo");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":4242,\"name\":\"Demo Student\"}");
		})
		.await;
	let descriptor = PlatformDescriptor::builder()
		.grading_base_url(Url::parse(&server.base_url())?)
		.backend_url(Url::parse("https://project.supabase.co")?)
		.backend_api_key("demo-anon-key")
		.redirect_url(Url::parse("https://integra.app/dashboard")?)
		.build()?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let platform = Arc::new(MemoryAuthPlatform::default());
	let sessions = Arc::new(SessionProvider::new(platform.clone()));
	let store_path = std::env::temp_dir().join("integra-onboarding-demo").join("tokens.json");
	let store: Arc<dyn CredentialStore> = Arc::new(FileStore::open(&store_path)?);
	let validator: Arc<dyn CredentialValidator> =
		Arc::new(CanvasValidator::with_http_client(&descriptor, http_client)?);
	let onboarding = Onboarding::new(descriptor, sessions.clone(), validator, store);

	println!("Started in state {}.", onboarding.start().await);

	onboarding.request_login_link("demo.student@school.test").await?;

	let email = Email::new("demo.student@school.test")?;
	let link = platform.last_link_for(&email).ok_or_else(|| eyre!("No login link was sent."))?;

	println!("Login link code for {email}: {}.", link.code);

	sessions.redeem_login_link(&email, &link.code).await?;

	let state = onboarding.next_change().await.ok_or_else(|| eyre!("Subscription closed."))?;

	println!("After redeeming the link: {state}.");

	if let Screen::TokenSetup(view) = onboarding.screen() {
		println!("1. Go to Canvas Settings: {}", view.settings_url);

		for (step, instruction) in view.instructions.iter().enumerate() {
			println!("{}. {instruction}", step + 2);
		}
	}

	println!("After submitting a token: {}.", onboarding.submit_token("7~demo").await?);
	println!("Credential stored in {}.", store_path.display());

	onboarding.sign_out().await?;
	onboarding.teardown().await;

	println!("After signing out: {}.", onboarding.state());

	profile_mock.assert_async().await;

	Ok(())
}
