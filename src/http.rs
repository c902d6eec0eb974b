//! Transport primitives shared by the HTTP-backed adapters.
//!
//! [`ReqwestHttpClient`] wraps a reqwest client configured from a
//! [`PlatformDescriptor`](crate::platform::PlatformDescriptor): the descriptor's timeout bounds
//! every request and redirects are never followed, so a misconfigured endpoint fails instead of
//! silently forwarding bearer tokens elsewhere. Adapters hand their request builders to
//! [`ReqwestHttpClient::send`] and inspect the resulting [`HttpReply`], which keeps only the
//! status and body so parsing and error classification stay transport agnostic.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::TransientError};
#[cfg(feature = "reqwest")]
use crate::{
	error::{ConfigError, TransportError},
	platform::PlatformDescriptor,
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Status and body captured from a completed HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpReply {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Parses the body as JSON, keeping the failing path in the error.
	pub fn parse_json<T>(&self, endpoint: &'static str) -> Result<T, TransientError>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
			TransientError::MalformedBody { endpoint, source, status: Some(self.status) }
		})
	}

	/// Builds an [`TransientError::UnexpectedResponse`] from the reply, preferring the
	/// upstream's own error message when the body carries one.
	pub fn unexpected(&self, endpoint: &'static str) -> TransientError {
		TransientError::UnexpectedResponse {
			endpoint,
			message: self.error_message(),
			status: Some(self.status),
		}
	}

	/// Upstream error message (`msg`, `message`, `error_description`, or `error`), falling back
	/// to a truncated body preview.
	pub fn error_message(&self) -> String {
		if let Ok(serde_json::Value::Object(map)) =
			serde_json::from_slice::<serde_json::Value>(&self.body)
		{
			for key in ["msg", "message", "error_description", "error"] {
				if let Some(serde_json::Value::String(message)) = map.get(key) {
					return message.clone();
				}
			}
		}

		let preview = String::from_utf8_lossy(&self.body);
		let preview = preview.trim();

		if preview.is_empty() {
			return format!("HTTP {}", self.status);
		}

		preview.chars().take(BODY_PREVIEW_LIMIT).collect()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`]. Configure it to disable redirect following.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client bounded by the descriptor's timeout that never follows redirects.
	pub fn for_descriptor(descriptor: &PlatformDescriptor) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(descriptor.request_timeout_std())
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}

	/// Dispatches a prepared request and buffers the reply.
	pub async fn send(
		&self,
		endpoint: &'static str,
		request: reqwest::RequestBuilder,
	) -> Result<HttpReply, TransportError> {
		let response =
			request.send().await.map_err(|e| TransportError::network(endpoint, e))?;
		let status = response.status().as_u16();
		let body = response.bytes().await.map_err(|e| TransportError::network(endpoint, e))?;

		Ok(HttpReply { status, body: body.to_vec() })
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl std::ops::Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
