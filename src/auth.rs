//! Auth-domain identifiers, credentials, claims decoding, and the session state machine.

pub mod claims;
pub mod credential;
pub mod id;
pub mod session;

pub use claims::*;
pub use credential::*;
pub use id::*;
pub use session::*;
