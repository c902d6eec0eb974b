//! Crate-level error types shared across the session, validator, store, and onboarding layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Upstream answered with something other than success.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Caller-supplied input was rejected before any network call.
	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// Grading platform refused the submitted credential.
	#[error("Grading platform rejected the credential.")]
	InvalidCredential {
		/// HTTP status returned by the profile endpoint, when available.
		status: Option<u16>,
	},
	/// Auth platform refused a login-link request or redemption.
	#[error("Auth platform rejected the request: {reason}.")]
	LoginRejected {
		/// Platform-supplied reason string.
		reason: String,
	},
	/// Operation is not permitted in the current onboarding state.
	#[error("Cannot {operation} while onboarding is {state}.")]
	InvalidState {
		/// Operation label.
		operation: &'static str,
		/// Label of the state the machine was in.
		state: &'static str,
	},
}

/// Configuration failures raised while assembling clients.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A request URL could not be derived from the descriptor.
	#[error("Cannot derive the {endpoint} URL from the descriptor.")]
	InvalidEndpoint {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Descriptor validation failed.
	#[error(transparent)]
	Descriptor(#[from] crate::platform::PlatformDescriptorError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Upstream answered, but not with a usable success payload.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Endpoint returned a non-success status.
	#[error("{endpoint} endpoint returned an unexpected response: {message}.")]
	UnexpectedResponse {
		/// Endpoint label.
		endpoint: &'static str,
		/// Upstream or crate-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Endpoint responded with JSON that could not be parsed.
	#[error("{endpoint} endpoint returned malformed JSON.")]
	MalformedBody {
		/// Endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TransientError {
	/// HTTP status carried by the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::UnexpectedResponse { status, .. } | Self::MalformedBody { status, .. } => *status,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

/// Input rejected locally, before anything leaves the process.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Token input was empty or whitespace only.
	#[error("Token must not be blank.")]
	BlankToken,
	/// Email address failed validation.
	#[error(transparent)]
	Email(#[from] crate::auth::EmailError),
	/// Identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
}
