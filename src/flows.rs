//! Session orchestration: the [`SessionManager`] facade plus the acquisition, refresh, and
//! bootstrap flows it drives.

pub mod acquire;
pub mod bootstrap;
pub mod common;
pub mod refresh;

pub use acquire::*;
pub use bootstrap::*;
pub use common::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{
		CredentialSecret, IdentityDecoder, JwtIdentityDecoder, Session, SessionEvent, StoreEffect,
		Transition, Username,
	},
	config::ServiceConfig,
	files::FileApi,
	http::{ApiClient, HttpTransport, InterceptorId, ReqwestTransport},
	intercept::Authenticator,
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::{CredentialStore, MemoryStore},
};

/// Owns the session and wires the authenticator, refresh interceptor, and credential store
/// around one [`ApiClient`].
///
/// Every session change goes through [`SessionManager::dispatch`], which applies the store effect
/// of the transition before committing it and re-registers the request authenticator whenever
/// the access credential changes.
pub struct SessionManager {
	config: ServiceConfig,
	client: Arc<ApiClient>,
	store: Arc<dyn CredentialStore>,
	acquirer: Arc<dyn TokenAcquirer>,
	decoder: Arc<dyn IdentityDecoder>,
	sleeper: Arc<dyn Sleeper>,
	coordinator: Arc<RefreshCoordinatorState>,
	refresh_metrics: Arc<RefreshMetrics>,
	session: RwLock<Session>,
	authenticator: Mutex<Option<InterceptorId>>,
	refresh_interceptor: InterceptorId,
	initialized: AsyncOnceCell<()>,
}
impl SessionManager {
	/// Starts building a manager for `config`.
	pub fn builder(config: ServiceConfig) -> SessionManagerBuilder {
		SessionManagerBuilder::new(config)
	}

	/// Service configuration in use.
	pub fn config(&self) -> &ServiceConfig {
		&self.config
	}

	/// Interceptor-aware client every authenticated request should go through.
	pub fn client(&self) -> &Arc<ApiClient> {
		&self.client
	}

	/// Shared single-flight refresh state.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinatorState> {
		&self.coordinator
	}

	/// Refresh exchange counters.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		&self.refresh_metrics
	}

	/// File data layer riding on the managed client.
	pub fn files(&self) -> FileApi {
		FileApi::new(self.client.clone())
	}

	/// Snapshot of the current session.
	pub fn session(&self) -> Session {
		self.session.read().clone()
	}

	/// Returns `true` when an access credential is available.
	pub fn is_authenticated(&self) -> bool {
		self.session.read().is_authenticated()
	}

	/// Applies `event` and returns the committed session.
	///
	/// A failed persist aborts the transition. A failed clear still drops the in-memory
	/// credentials before the error is returned.
	pub fn dispatch(&self, event: SessionEvent) -> Result<Session> {
		let mut session = self.session.write();
		let Transition { next, effect } = session.transition(event, self.decoder.as_ref());
		let cleared = match effect {
			StoreEffect::None => Ok(()),
			StoreEffect::Persist(refresh) => {
				self.store.set(&self.config.refresh_key, refresh.expose())?;

				Ok(())
			},
			StoreEffect::Clear => self.store.clear(),
		};

		if next.access_credential() != session.access_credential() {
			self.swap_authenticator(next.access_credential().cloned());
		}

		*session = next;

		cleared?;

		Ok(session.clone())
	}

	/// Exchanges a username and password for credentials.
	///
	/// The session passes through `Authenticating` and ends in `Authenticated` or `AuthError`.
	pub async fn login(&self, username: &Username, password: &str) -> Result<Session> {
		const KIND: OpKind = OpKind::Login;

		let span = OpSpan::new(KIND, "login");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.dispatch(SessionEvent::AuthStart)?;

				match self.acquirer.login(username, password).await {
					Ok(pair) => self.dispatch(SessionEvent::Login {
						identity: username.to_string(),
						access: pair.access,
						refresh: pair.refresh,
					}),
					Err(err) => {
						self.dispatch(SessionEvent::AuthError(err.kind()))?;

						Err(err)
					},
				}
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	/// Drops every credential and clears the store.
	pub fn logout(&self) -> Result<Session> {
		const KIND: OpKind = OpKind::Logout;

		let _span = OpSpan::new(KIND, "logout").entered();

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = self.dispatch(SessionEvent::Logout);

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	/// Dismisses a failed login, returning to `Unauthenticated`.
	pub fn acknowledge_error(&self) -> Result<Session> {
		self.dispatch(SessionEvent::Acknowledge)
	}

	/// Resolves once startup rehydration has finished, successfully or not.
	pub async fn initialized(&self) {
		self.initialized.wait().await;
	}

	/// Returns `true` once startup rehydration has finished.
	pub fn is_initialized(&self) -> bool {
		self.initialized.is_initialized()
	}

	pub(crate) fn stored_refresh_credential(&self) -> Result<Option<CredentialSecret>> {
		Ok(self.store.get(&self.config.refresh_key)?.map(CredentialSecret::new))
	}

	pub(crate) fn force_logout(&self) {
		const KIND: OpKind = OpKind::Logout;

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = self.dispatch(SessionEvent::Logout);

		if let Err(err) = &result {
			obs::warn_op(KIND, "Forced logout could not clear the credential store.", err);
		}

		obs::record_op_outcome(KIND, OpOutcome::of(&result));
	}

	fn swap_authenticator(&self, access: Option<CredentialSecret>) {
		let mut current = self.authenticator.lock();

		if let Some(id) = current.take() {
			self.client.eject_request(id);
		}
		if access.is_some() {
			let authenticator = Authenticator::new(self.config.endpoints.clone(), access);

			*current = Some(self.client.register_request(Arc::new(authenticator)));
		}
	}
}
impl Drop for SessionManager {
	fn drop(&mut self) {
		self.client.eject_response(self.refresh_interceptor);

		if let Some(id) = self.authenticator.get_mut().take() {
			self.client.eject_request(id);
		}
	}
}
impl Debug for SessionManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionManager")
			.field("config", &self.config)
			.field("session", &*self.session.read())
			.field("initialized", &self.is_initialized())
			.finish()
	}
}

/// Builder for [`SessionManager`]; every collaborator has a production default.
pub struct SessionManagerBuilder {
	config: ServiceConfig,
	store: Option<Arc<dyn CredentialStore>>,
	transport: Option<Arc<dyn HttpTransport>>,
	acquirer: Option<Arc<dyn TokenAcquirer>>,
	decoder: Option<Arc<dyn IdentityDecoder>>,
	sleeper: Option<Arc<dyn Sleeper>>,
	coordinator: Option<Arc<RefreshCoordinatorState>>,
}
impl SessionManagerBuilder {
	/// Creates a builder for `config`.
	pub fn new(config: ServiceConfig) -> Self {
		Self {
			config,
			store: None,
			transport: None,
			acquirer: None,
			decoder: None,
			sleeper: None,
			coordinator: None,
		}
	}

	/// Credential store (defaults to an in-memory store).
	pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// HTTP transport (defaults to [`ReqwestTransport`] on the configured base URL).
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Token acquirer (defaults to [`HttpTokenService`] on the managed client).
	pub fn acquirer(mut self, acquirer: Arc<dyn TokenAcquirer>) -> Self {
		self.acquirer = Some(acquirer);

		self
	}

	/// Identity decoder (defaults to [`JwtIdentityDecoder`]).
	pub fn decoder(mut self, decoder: Arc<dyn IdentityDecoder>) -> Self {
		self.decoder = Some(decoder);

		self
	}

	/// Bootstrap backoff sleeper (defaults to [`TokioSleeper`]).
	pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.sleeper = Some(sleeper);

		self
	}

	/// Single-flight refresh state (defaults to a fresh coordinator).
	pub fn coordinator(mut self, coordinator: Arc<RefreshCoordinatorState>) -> Self {
		self.coordinator = Some(coordinator);

		self
	}

	/// Builds the manager and registers its refresh interceptor on the client.
	pub fn build(self) -> Arc<SessionManager> {
		let Self { config, store, transport, acquirer, decoder, sleeper, coordinator } = self;
		let transport = transport
			.unwrap_or_else(|| Arc::new(ReqwestTransport::new(config.base_url.clone())));
		let client = Arc::new(ApiClient::new(transport));
		let acquirer = acquirer.unwrap_or_else(|| {
			Arc::new(HttpTokenService::new(client.clone(), config.endpoints.clone()))
		});

		Arc::new_cyclic(|manager| {
			let refresh_interceptor =
				client.register_response(Arc::new(RefreshInterceptor { manager: manager.clone() }));

			SessionManager {
				config,
				client,
				store: store.unwrap_or_else(|| Arc::new(MemoryStore::default())),
				acquirer,
				decoder: decoder.unwrap_or_else(|| Arc::new(JwtIdentityDecoder::default())),
				sleeper: sleeper.unwrap_or_else(|| Arc::new(TokioSleeper)),
				coordinator: coordinator.unwrap_or_default(),
				refresh_metrics: Default::default(),
				session: RwLock::new(Session::initializing()),
				authenticator: Mutex::new(None),
				refresh_interceptor,
				initialized: AsyncOnceCell::new(),
			}
		})
	}
}
impl Debug for SessionManagerBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionManagerBuilder").field("config", &self.config).finish()
	}
}
