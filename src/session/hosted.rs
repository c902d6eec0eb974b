//! [`AuthPlatform`] over a hosted GoTrue-style auth API (`/auth/v1/*`).
//!
//! The current session lives in memory. Callers that persist sessions between runs restore
//! them with [`HostedAuthPlatform::restore_session`] and read them back with
//! [`HostedAuthPlatform::session_snapshot`]. An expired session is refreshed once when read;
//! if that refresh fails the session is dropped and the read reports no session.

// self
use crate::{
	_prelude::*,
	auth::{Email, Session, TokenSecret, User, UserId},
	error::{ConfigError, TransientError},
	http::{HttpReply, ReqwestHttpClient},
	platform::PlatformDescriptor,
	session::{AuthPlatform, PlatformFuture},
};

#[derive(Serialize)]
struct OtpRequest<'a> {
	email: &'a str,
	create_user: bool,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
	r#type: &'static str,
	email: &'a str,
	token: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
	access_token: String,
	refresh_token: Option<String>,
	expires_in: i64,
	user: UserResponse,
}

#[derive(Deserialize)]
struct UserResponse {
	id: String,
	email: Option<String>,
}

struct Endpoints {
	otp: Url,
	verify: Url,
	token: Url,
	logout: Url,
}

/// Hosted auth API client that keeps the current session in memory.
pub struct HostedAuthPlatform {
	http: ReqwestHttpClient,
	endpoints: Endpoints,
	api_key: TokenSecret,
	timeout: std::time::Duration,
	current: Mutex<Option<Session>>,
}
impl HostedAuthPlatform {
	/// Builds a platform client with a descriptor-bound HTTP client.
	pub fn new(descriptor: &PlatformDescriptor) -> Result<Self, ConfigError> {
		Self::with_http_client(descriptor, ReqwestHttpClient::for_descriptor(descriptor)?)
	}

	/// Builds a platform client that reuses an existing HTTP client.
	pub fn with_http_client(
		descriptor: &PlatformDescriptor,
		http: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		let mut token = descriptor.auth_url("token")?;

		token.query_pairs_mut().append_pair("grant_type", "refresh_token");

		Ok(Self {
			http,
			endpoints: Endpoints {
				otp: descriptor.auth_url("otp")?,
				verify: descriptor.auth_url("verify")?,
				token,
				logout: descriptor.auth_url("logout")?,
			},
			api_key: descriptor.backend.api_key.clone(),
			timeout: descriptor.request_timeout_std(),
			current: Mutex::new(None),
		})
	}

	/// Installs a session persisted by an earlier run.
	pub fn restore_session(&self, session: Session) {
		*self.current.lock() = Some(session);
	}

	/// Copy of the in-memory session, for callers that persist it.
	pub fn session_snapshot(&self) -> Option<Session> {
		self.current.lock().clone()
	}

	async fn post<B>(&self, endpoint: &'static str, url: &Url, body: &B) -> Result<HttpReply>
	where
		B: Serialize + ?Sized,
	{
		let request = self
			.http
			.post(url.clone())
			.timeout(self.timeout)
			.header("apikey", self.api_key.expose())
			.json(body);

		Ok(self.http.send(endpoint, request).await?)
	}

	async fn refresh_with(&self, current: &Session) -> Result<Session> {
		let refresh_token = current
			.refresh_token
			.as_ref()
			.ok_or_else(|| Error::LoginRejected { reason: "Refresh token not found".into() })?;
		let reply = self
			.post(
				"token",
				&self.endpoints.token,
				&RefreshRequest { refresh_token: refresh_token.expose() },
			)
			.await?;
		let response: SessionResponse = accept(reply, "token")?;

		into_session(response, &current.user.email, "token")
	}
}
impl AuthPlatform for HostedAuthPlatform {
	fn current_session(&self) -> PlatformFuture<'_, Option<Session>> {
		Box::pin(async move {
			let Some(current) = self.session_snapshot() else {
				return Ok(None);
			};

			if !current.is_expired() {
				return Ok(Some(current));
			}

			match self.refresh_with(&current).await {
				Ok(session) => {
					self.restore_session(session.clone());

					Ok(Some(session))
				},
				Err(e) => {
					#[cfg(feature = "tracing")]
					tracing::warn!(error = %e, "expired session could not be refreshed");
					#[cfg(not(feature = "tracing"))]
					let _ = e;

					*self.current.lock() = None;

					Ok(None)
				},
			}
		})
	}

	fn send_login_link<'a>(
		&'a self,
		email: &'a Email,
		redirect_url: &'a Url,
	) -> PlatformFuture<'a, ()> {
		Box::pin(async move {
			let mut url = self.endpoints.otp.clone();

			url.query_pairs_mut().append_pair("redirect_to", redirect_url.as_str());

			let body = OtpRequest { email: email.as_ref(), create_user: true };
			let reply = self.post("otp", &url, &body).await?;

			if reply.is_success() {
				Ok(())
			} else {
				Err(rejection(reply, "otp"))
			}
		})
	}

	fn redeem_login_link<'a>(
		&'a self,
		email: &'a Email,
		code: &'a str,
	) -> PlatformFuture<'a, Session> {
		Box::pin(async move {
			let body =
				VerifyRequest { r#type: "magiclink", email: email.as_ref(), token: code.trim() };
			let reply = self.post("verify", &self.endpoints.verify, &body).await?;
			let response: SessionResponse = accept(reply, "verify")?;
			let session = into_session(response, email, "verify")?;

			self.restore_session(session.clone());

			Ok(session)
		})
	}

	fn refresh_session(&self) -> PlatformFuture<'_, Session> {
		Box::pin(async move {
			let current = self.session_snapshot().ok_or_else(|| Error::LoginRejected {
				reason: "Refresh token not found".into(),
			})?;
			let session = self.refresh_with(&current).await?;

			self.restore_session(session.clone());

			Ok(session)
		})
	}

	fn sign_out(&self) -> PlatformFuture<'_, ()> {
		Box::pin(async move {
			let Some(current) = self.current.lock().take() else {
				return Ok(());
			};
			let request = self
				.http
				.post(self.endpoints.logout.clone())
				.timeout(self.timeout)
				.header("apikey", self.api_key.expose())
				.bearer_auth(current.access_token.expose());
			let reply = self.http.send("logout", request).await?;

			if reply.is_success() { Ok(()) } else { Err(reply.unexpected("logout").into()) }
		})
	}
}
impl Debug for HostedAuthPlatform {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HostedAuthPlatform")
			.field("otp", &self.endpoints.otp.as_str())
			.field("timeout", &self.timeout)
			.field("signed_in", &self.current.lock().is_some())
			.finish()
	}
}

fn accept<T>(reply: HttpReply, endpoint: &'static str) -> Result<T>
where
	T: serde::de::DeserializeOwned,
{
	if reply.is_success() {
		Ok(reply.parse_json(endpoint)?)
	} else {
		Err(rejection(reply, endpoint))
	}
}

fn rejection(reply: HttpReply, endpoint: &'static str) -> Error {
	if (400..500).contains(&reply.status) {
		Error::LoginRejected { reason: reply.error_message() }
	} else {
		reply.unexpected(endpoint).into()
	}
}

fn into_session(
	response: SessionResponse,
	fallback_email: &Email,
	endpoint: &'static str,
) -> Result<Session> {
	let id = UserId::new(&response.user.id).map_err(crate::error::ValidationError::from)?;
	let email = match response.user.email.as_deref().filter(|email| !email.is_empty()) {
		Some(email) => Email::new(email).map_err(crate::error::ValidationError::from)?,
		None => fallback_email.clone(),
	};

	let expires_at = Some(response.expires_in)
		.filter(|seconds| *seconds > 0)
		.and_then(|seconds| OffsetDateTime::now_utc().checked_add(Duration::seconds(seconds)))
		.ok_or_else(|| TransientError::UnexpectedResponse {
			endpoint,
			message: format!("session lifetime {}s is out of range", response.expires_in),
			status: None,
		})?;

	Ok(Session {
		user: User { id, email },
		access_token: TokenSecret::new(response.access_token),
		refresh_token: response.refresh_token.map(TokenSecret::new),
		expires_at,
	})
}
