//! Auth-domain identifiers, sessions, secrets, and stored credential records.

pub mod credential;
pub mod email;
pub mod id;
pub mod secret;
pub mod session;

pub use credential::*;
pub use email::*;
pub use id::*;
pub use secret::*;
pub use session::*;
