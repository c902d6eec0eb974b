//! Passwordless onboarding for Integra: email-link sessions, Canvas token validation, and a
//! fail-closed onboarding state machine over pluggable credential stores.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod http;
pub mod obs;
pub mod onboarding;
pub mod platform;
pub mod session;
pub mod store;
pub mod validator;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests and demos.

	pub use crate::_prelude::*;

	// self
	use crate::{
		http::ReqwestHttpClient,
		onboarding::Onboarding,
		platform::PlatformDescriptor,
		session::{MemoryAuthPlatform, SessionProvider},
		store::{CredentialStore, MemoryStore},
		validator::{CanvasValidator, CredentialValidator},
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a descriptor whose grading and backend endpoints both point at `base`.
	pub fn test_descriptor(base: &str) -> PlatformDescriptor {
		let base = Url::parse(base).expect("Test base URL should parse.");

		PlatformDescriptor::builder()
			.grading_base_url(base.clone())
			.backend_url(base.clone())
			.backend_api_key("test-anon-key")
			.redirect_url(base.join("/dashboard").expect("Test redirect URL should join."))
			.build()
			.expect("Test descriptor should build.")
	}

	/// Pieces returned by [`build_test_onboarding`].
	pub struct TestOnboarding {
		/// Machine under test.
		pub onboarding: Onboarding,
		/// In-process auth platform backing the session provider.
		pub platform: Arc<MemoryAuthPlatform>,
		/// Session provider shared with the machine.
		pub sessions: Arc<SessionProvider>,
		/// In-memory credential store backing the adapter.
		pub store: Arc<MemoryStore>,
	}

	/// Constructs an [`Onboarding`] machine over an in-memory platform and store, validating
	/// tokens against a Canvas instance at `canvas_base`.
	pub fn build_test_onboarding(canvas_base: &str) -> TestOnboarding {
		let descriptor = test_descriptor(canvas_base);
		let platform = Arc::new(MemoryAuthPlatform::default());
		let sessions = Arc::new(SessionProvider::new(platform.clone()));
		let store = Arc::new(MemoryStore::default());
		let store_dyn: Arc<dyn CredentialStore> = store.clone();
		let validator: Arc<dyn CredentialValidator> =
			Arc::new(
				CanvasValidator::with_http_client(&descriptor, test_reqwest_http_client())
					.expect("Test validator should build."),
			);
		let onboarding = Onboarding::new(descriptor, sessions.clone(), validator, store_dyn);

		TestOnboarding { onboarding, platform, sessions, store }
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
