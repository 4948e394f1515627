//! Session state machine.
//!
//! [`Session::transition`] is a pure, total function from the current session and a
//! [`SessionEvent`] to the next session plus the [`StoreEffect`] that must be applied to the
//! credential store before the next session is committed. Events that have no transition from
//! the current status leave the session untouched.

// self
use crate::{
	_prelude::*,
	auth::{CredentialSecret, IdentityDecoder},
};

/// Lifecycle status of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
	/// Startup rehydration has not finished yet.
	#[default]
	Initializing,
	/// No usable credentials.
	Unauthenticated,
	/// A login exchange is in progress.
	Authenticating,
	/// Access credential is available.
	Authenticated,
	/// The last login attempt failed.
	AuthError,
}
impl SessionStatus {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Initializing => "initializing",
			Self::Unauthenticated => "unauthenticated",
			Self::Authenticating => "authenticating",
			Self::Authenticated => "authenticated",
			Self::AuthError => "auth_error",
		}
	}
}
impl Display for SessionStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Events accepted by [`Session::transition`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
	/// Password login succeeded.
	Login {
		/// Display name of the user that logged in.
		identity: String,
		/// Newly issued access credential.
		access: CredentialSecret,
		/// Newly issued refresh credential.
		refresh: CredentialSecret,
	},
	/// Refresh exchange succeeded; the identity is decoded from `access`.
	Refresh {
		/// Newly issued access credential.
		access: CredentialSecret,
		/// Newly issued refresh credential.
		refresh: CredentialSecret,
	},
	/// Drop every credential and clear the store.
	Logout,
	/// A login exchange started.
	AuthStart,
	/// A login exchange failed.
	AuthError(ErrorKind),
	/// Startup finished without credentials.
	InitComplete,
	/// The user dismissed a login failure.
	Acknowledge,
}
impl SessionEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Login { .. } => "login",
			Self::Refresh { .. } => "refresh",
			Self::Logout => "logout",
			Self::AuthStart => "auth_start",
			Self::AuthError(_) => "auth_error",
			Self::InitComplete => "init_complete",
			Self::Acknowledge => "acknowledge",
		}
	}
}

/// Side effect on the credential store requested by a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEffect {
	/// Nothing to persist.
	None,
	/// Write the refresh credential through to the store.
	Persist(CredentialSecret),
	/// Remove every stored key.
	Clear,
}

/// Result of applying an event to a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
	/// Session to commit once the effect has been applied.
	pub next: Session,
	/// Store effect to apply before committing.
	pub effect: StoreEffect,
}

/// In-memory session snapshot.
///
/// The access credential and identity are present exactly when the status is
/// [`SessionStatus::Authenticated`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
	status: SessionStatus,
	access_credential: Option<CredentialSecret>,
	refresh_credential: Option<CredentialSecret>,
	identity: Option<String>,
	last_error: Option<ErrorKind>,
	authenticated_at: Option<OffsetDateTime>,
}
impl Session {
	/// Session at process start, before rehydration.
	pub fn initializing() -> Self {
		Self::default()
	}

	/// Session without any credentials.
	pub fn unauthenticated() -> Self {
		Self { status: SessionStatus::Unauthenticated, ..Self::default() }
	}

	/// Current lifecycle status.
	pub fn status(&self) -> SessionStatus {
		self.status
	}

	/// Current access credential, if authenticated.
	pub fn access_credential(&self) -> Option<&CredentialSecret> {
		self.access_credential.as_ref()
	}

	/// Current refresh credential, if any.
	pub fn refresh_credential(&self) -> Option<&CredentialSecret> {
		self.refresh_credential.as_ref()
	}

	/// Display name of the authenticated user.
	pub fn identity(&self) -> Option<&str> {
		self.identity.as_deref()
	}

	/// Classification of the last login failure.
	pub fn last_error(&self) -> Option<ErrorKind> {
		self.last_error
	}

	/// Instant of the last successful login or refresh.
	pub fn authenticated_at(&self) -> Option<OffsetDateTime> {
		self.authenticated_at
	}

	/// Returns `true` while startup rehydration is still running.
	pub fn is_initializing(&self) -> bool {
		matches!(self.status, SessionStatus::Initializing)
	}

	/// Returns `true` while a login exchange is in progress.
	pub fn is_authenticating(&self) -> bool {
		matches!(self.status, SessionStatus::Authenticating)
	}

	/// Returns `true` when an access credential is available.
	pub fn is_authenticated(&self) -> bool {
		matches!(self.status, SessionStatus::Authenticated)
	}

	/// Computes the next session for `event`.
	pub fn transition(&self, event: SessionEvent, decoder: &dyn IdentityDecoder) -> Transition {
		use SessionStatus::*;

		match (self.status, event) {
			(_, SessionEvent::Login { identity, access, refresh }) =>
				self.authenticate(Some(identity), access, refresh),
			(_, SessionEvent::Refresh { access, refresh }) => {
				let identity = decoder.decode_identity(&access);

				self.authenticate(identity, access, refresh)
			},
			(_, SessionEvent::Logout) =>
				Transition { next: Self::unauthenticated(), effect: StoreEffect::Clear },
			(Unauthenticated | AuthError, SessionEvent::AuthStart) => self.with(|next| {
				next.status = Authenticating;
				next.last_error = None;
			}),
			(Unauthenticated | Authenticating | AuthError, SessionEvent::AuthError(kind)) =>
				self.with(|next| {
					next.status = AuthError;
					next.last_error = Some(kind);
				}),
			(Initializing, SessionEvent::InitComplete) =>
				self.with(|next| next.status = Unauthenticated),
			(AuthError, SessionEvent::Acknowledge) => self.with(|next| {
				next.status = Unauthenticated;
				next.last_error = None;
			}),
			_ => Transition { next: self.clone(), effect: StoreEffect::None },
		}
	}

	fn authenticate(
		&self,
		identity: Option<String>,
		access: CredentialSecret,
		refresh: CredentialSecret,
	) -> Transition {
		let next = Self {
			status: SessionStatus::Authenticated,
			access_credential: Some(access),
			refresh_credential: Some(refresh.clone()),
			identity,
			last_error: None,
			authenticated_at: Some(OffsetDateTime::now_utc()),
		};

		Transition { next, effect: StoreEffect::Persist(refresh) }
	}

	fn with(&self, update: impl FnOnce(&mut Self)) -> Transition {
		let mut next = self.clone();

		update(&mut next);

		Transition { next, effect: StoreEffect::None }
	}
}
