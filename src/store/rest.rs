//! [`CredentialStore`] backed by a PostgREST-style record table on the hosted backend.
//!
//! Rows use the `{user_id, canvas_token, canvas_user_id, updated_at}` shape. Reads filter on
//! `user_id=eq.<id>`; writes `POST` with `on_conflict=user_id` and
//! `Prefer: resolution=merge-duplicates,return=minimal` so the table behaves as an upsert
//! keyed by the owning user. Requests authenticate with the backend's publishable key and,
//! when a [`SessionProvider`] is attached, the signed-in user's access token so row-level
//! policies can scope the table to its owner.

// self
use crate::{
	_prelude::*,
	auth::{CredentialRecord, RemoteUserId, TokenSecret, UserId},
	error::ConfigError,
	http::{HttpReply, ReqwestHttpClient},
	platform::PlatformDescriptor,
	session::SessionProvider,
	store::{CredentialStore, StoreError, StoreFuture},
};

const ENDPOINT: &str = "credential table";

/// Wire shape of one credential row.
#[derive(Debug, Serialize, Deserialize)]
struct CredentialRow {
	user_id: UserId,
	canvas_token: TokenSecret,
	canvas_user_id: RemoteUserId,
	#[serde(with = "time::serde::rfc3339")]
	updated_at: OffsetDateTime,
}
impl From<CredentialRecord> for CredentialRow {
	fn from(record: CredentialRecord) -> Self {
		Self {
			user_id: record.user_id,
			canvas_token: record.external_token,
			canvas_user_id: record.external_user_id,
			updated_at: record.updated_at,
		}
	}
}
impl From<CredentialRow> for CredentialRecord {
	fn from(row: CredentialRow) -> Self {
		Self {
			user_id: row.user_id,
			external_token: row.canvas_token,
			external_user_id: row.canvas_user_id,
			updated_at: row.updated_at,
		}
	}
}

/// Remote credential table client.
#[derive(Clone)]
pub struct RestStore {
	http: ReqwestHttpClient,
	table_url: Url,
	api_key: TokenSecret,
	timeout: std::time::Duration,
	sessions: Option<Arc<SessionProvider>>,
}
impl RestStore {
	/// Builds a store for the descriptor's credential table with a descriptor-bound client.
	pub fn new(descriptor: &PlatformDescriptor) -> Result<Self, ConfigError> {
		Self::with_http_client(descriptor, ReqwestHttpClient::for_descriptor(descriptor)?)
	}

	/// Builds a store that reuses an existing HTTP client.
	pub fn with_http_client(
		descriptor: &PlatformDescriptor,
		http: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			http,
			table_url: descriptor.credential_table_url()?,
			api_key: descriptor.backend.api_key.clone(),
			timeout: descriptor.request_timeout_std(),
			sessions: None,
		})
	}

	/// Authenticates requests with the current session's access token when one exists.
	pub fn with_sessions(mut self, sessions: Arc<SessionProvider>) -> Self {
		self.sessions = Some(sessions);

		self
	}

	async fn bearer(&self) -> String {
		let session = match &self.sessions {
			Some(sessions) => sessions.current_session().await,
			None => None,
		};

		match session {
			Some(session) => format!("Bearer {}", session.access_token.expose()),
			None => format!("Bearer {}", self.api_key.expose()),
		}
	}

	async fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		request
			.timeout(self.timeout)
			.header("apikey", self.api_key.expose())
			.header(reqwest::header::AUTHORIZATION, self.bearer().await)
			.header(reqwest::header::ACCEPT, "application/json")
	}

	async fn send(&self, request: reqwest::RequestBuilder) -> Result<HttpReply, StoreError> {
		let reply = self
			.http
			.send(ENDPOINT, self.authorized(request).await)
			.await
			.map_err(|e| StoreError::Backend { message: error_chain(&e) })?;

		if !reply.is_success() {
			return Err(StoreError::Backend { message: reply.unexpected(ENDPOINT).to_string() });
		}

		Ok(reply)
	}
}
impl CredentialStore for RestStore {
	fn fetch<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Option<CredentialRecord>> {
		Box::pin(async move {
			let mut url = self.table_url.clone();

			url.query_pairs_mut()
				.append_pair("user_id", &format!("eq.{user_id}"))
				.append_pair("select", "*");

			let reply = self.send(self.http.get(url)).await?;
			let rows: Vec<CredentialRow> = reply
				.parse_json(ENDPOINT)
				.map_err(|e| StoreError::Serialization { message: error_chain(&e) })?;

			Ok(rows.into_iter().next().map(CredentialRecord::from))
		})
	}

	fn upsert(&self, record: CredentialRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut url = self.table_url.clone();

			url.query_pairs_mut().append_pair("on_conflict", "user_id");

			let request = self
				.http
				.post(url)
				.header("Prefer", "resolution=merge-duplicates,return=minimal")
				.json(&CredentialRow::from(record));

			self.send(request).await.map(|_| ())
		})
	}
}
impl Debug for RestStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RestStore")
			.field("table_url", &self.table_url.as_str())
			.field("timeout", &self.timeout)
			.field("session_bound", &self.sessions.is_some())
			.finish()
	}
}

fn error_chain(error: &dyn StdError) -> String {
	let mut message = error.to_string();
	let mut source = error.source();

	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());
		source = cause.source();
	}

	message
}
