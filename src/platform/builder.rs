// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	platform::{
		BackendEndpoint, DEFAULT_CREDENTIAL_TABLE, DEFAULT_GRADING_BASE_URL,
		DEFAULT_REQUEST_TIMEOUT, PlatformDescriptor,
	},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum PlatformDescriptorError {
	/// Backend URL is mandatory.
	#[error("Missing backend URL.")]
	MissingBackendUrl,
	/// Backend publishable key is mandatory.
	#[error("Missing backend API key.")]
	MissingApiKey,
	/// Login links need somewhere to land.
	#[error("Missing login redirect URL.")]
	MissingRedirectUrl,
	/// Remote endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoint URLs must be able to carry sub-paths.
	#[error("The {endpoint} endpoint cannot be used as a base URL: {url}.")]
	NotABase {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Timeouts must be positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
	/// Table names are interpolated into REST paths.
	#[error("Credential table name is invalid: {table:?}.")]
	InvalidTableName {
		/// Rejected table name.
		table: String,
	},
}

/// Builder for [`PlatformDescriptor`] values.
#[derive(Debug)]
pub struct PlatformDescriptorBuilder {
	/// Grading platform base URL.
	pub grading_base_url: Option<Url>,
	/// Backend-as-a-service project URL.
	pub backend_url: Option<Url>,
	/// Backend publishable key.
	pub backend_api_key: Option<TokenSecret>,
	/// Credential table name.
	pub credential_table: String,
	/// Login-link redirect target.
	pub redirect_url: Option<Url>,
	/// Per-request timeout.
	pub request_timeout: Duration,
}
impl PlatformDescriptorBuilder {
	/// Creates a builder seeded with the defaults.
	pub fn new() -> Self {
		Self {
			grading_base_url: None,
			backend_url: None,
			backend_api_key: None,
			credential_table: DEFAULT_CREDENTIAL_TABLE.into(),
			redirect_url: None,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}

	/// Sets the grading platform base URL.
	pub fn grading_base_url(mut self, url: Url) -> Self {
		self.grading_base_url = Some(url);

		self
	}

	/// Sets the backend project URL.
	pub fn backend_url(mut self, url: Url) -> Self {
		self.backend_url = Some(url);

		self
	}

	/// Sets the backend publishable key.
	pub fn backend_api_key(mut self, key: impl Into<String>) -> Self {
		self.backend_api_key = Some(TokenSecret::new(key));

		self
	}

	/// Overrides the credential table name.
	pub fn credential_table(mut self, table: impl Into<String>) -> Self {
		self.credential_table = table.into();

		self
	}

	/// Sets the login-link redirect target.
	pub fn redirect_url(mut self, url: Url) -> Self {
		self.redirect_url = Some(url);

		self
	}

	/// Overrides the per-request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<PlatformDescriptor, PlatformDescriptorError> {
		let grading_base_url = match self.grading_base_url {
			Some(url) => url,
			None => Url::parse(DEFAULT_GRADING_BASE_URL).map_err(|_| {
				PlatformDescriptorError::NotABase {
					endpoint: "grading",
					url: DEFAULT_GRADING_BASE_URL.into(),
				}
			})?,
		};
		let backend_url = self.backend_url.ok_or(PlatformDescriptorError::MissingBackendUrl)?;
		let api_key = self
			.backend_api_key
			.filter(|key| !key.is_blank())
			.ok_or(PlatformDescriptorError::MissingApiKey)?;
		let redirect_url = self.redirect_url.ok_or(PlatformDescriptorError::MissingRedirectUrl)?;
		let descriptor = PlatformDescriptor {
			grading_base_url,
			backend: BackendEndpoint {
				url: backend_url,
				api_key,
				credential_table: self.credential_table,
			},
			redirect_url,
			request_timeout: self.request_timeout,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}
impl Default for PlatformDescriptorBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl PlatformDescriptor {
	/// Validates invariants for the descriptor. Deserialized descriptors should be checked
	/// with this before use.
	pub fn validate(&self) -> Result<(), PlatformDescriptorError> {
		validate_endpoint("grading", &self.grading_base_url)?;
		validate_endpoint("backend", &self.backend.url)?;
		validate_endpoint("redirect", &self.redirect_url)?;

		if !self.request_timeout.is_positive() {
			return Err(PlatformDescriptorError::NonPositiveTimeout);
		}

		validate_table(&self.backend.credential_table)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), PlatformDescriptorError> {
	if url.cannot_be_a_base() {
		return Err(PlatformDescriptorError::NotABase { endpoint: name, url: url.to_string() });
	}

	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ =>
			Err(PlatformDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.map(|ip| ip.is_loopback())
			.unwrap_or(false),
		None => false,
	}
}

fn validate_table(table: &str) -> Result<(), PlatformDescriptorError> {
	let valid = !table.is_empty()
		&& table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
		&& !table.starts_with(|c: char| c.is_ascii_digit());

	if valid {
		Ok(())
	} else {
		Err(PlatformDescriptorError::InvalidTableName { table: table.into() })
	}
}
