//! Single-flight credential refresh driven by expired-credential failures.
//!
//! [`RefreshCoordinatorState`] tracks whether a refresh exchange is running and queues every
//! request that fails while it does. The first failing request becomes the leader and performs
//! the exchange; the others wait on a one-shot channel and are replayed (or rejected) in FIFO
//! order once the leader releases them. A leader that is dropped mid-exchange releases its
//! waiters with [`RefreshFailure::abandoned`] through the [`InFlightGuard`] destructor, so the
//! in-flight flag can never stay set.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{CredentialSecret, SessionEvent},
	error::RefreshFailure,
	flows::{SessionManager, common},
	http::{ApiClient, ApiFuture, ApiResponse},
	intercept::ResponseInterceptor,
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Result fanned out to every queued waiter.
pub type RefreshOutcome = Result<CredentialSecret, RefreshFailure>;

/// Shared single-flight state: the in-flight flag and the FIFO of waiting requests.
///
/// The waiter queue is only non-empty while a refresh is in flight; clearing the flag drains and
/// resolves the queue inside the same critical section.
#[derive(Debug, Default)]
pub struct RefreshCoordinatorState {
	inner: Mutex<CoordinatorInner>,
}
impl RefreshCoordinatorState {
	/// Creates an idle coordinator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Atomically checks the in-flight flag and either claims leadership or enqueues a waiter.
	pub fn try_enter_in_flight(&self) -> RefreshEntry<'_> {
		let mut inner = self.inner.lock();

		if inner.in_flight {
			let (sender, receiver) = oneshot::channel();

			inner.waiters.push_back(RefreshWaiter { sender });

			RefreshEntry::Waiter(RefreshTicket { receiver })
		} else {
			inner.in_flight = true;

			RefreshEntry::Leader(InFlightGuard { state: self, released: false })
		}
	}

	/// Clears the in-flight flag and resolves every waiter with `outcome`, oldest first.
	///
	/// Returns the number of waiters that were still listening.
	pub fn release_waiters(&self, outcome: RefreshOutcome) -> usize {
		let mut inner = self.inner.lock();

		inner.in_flight = false;

		inner
			.waiters
			.drain(..)
			.filter(|waiter| !waiter.sender.is_closed())
			.map(|waiter| waiter.sender.send(outcome.clone()))
			.filter(Result::is_ok)
			.count()
	}

	/// Returns `true` while a refresh exchange is running.
	pub fn is_in_flight(&self) -> bool {
		self.inner.lock().in_flight
	}

	/// Number of requests queued behind the running refresh.
	pub fn waiter_count(&self) -> usize {
		self.inner.lock().waiters.len()
	}
}

#[derive(Debug, Default)]
struct CoordinatorInner {
	in_flight: bool,
	waiters: VecDeque<RefreshWaiter>,
}

#[derive(Debug)]
struct RefreshWaiter {
	sender: oneshot::Sender<RefreshOutcome>,
}

/// Role assigned by [`RefreshCoordinatorState::try_enter_in_flight`].
#[derive(Debug)]
pub enum RefreshEntry<'a> {
	/// The caller must perform the refresh and release the waiters.
	Leader(InFlightGuard<'a>),
	/// Another caller is refreshing; wait for its outcome.
	Waiter(RefreshTicket),
}

/// Leadership token for a running refresh.
///
/// Dropping it without calling [`InFlightGuard::release`] releases every waiter with
/// [`RefreshFailure::abandoned`].
#[derive(Debug)]
pub struct InFlightGuard<'a> {
	state: &'a RefreshCoordinatorState,
	released: bool,
}
impl InFlightGuard<'_> {
	/// Ends the refresh and resolves every waiter with `outcome`.
	pub fn release(mut self, outcome: RefreshOutcome) -> usize {
		self.released = true;

		self.state.release_waiters(outcome)
	}
}
impl Drop for InFlightGuard<'_> {
	fn drop(&mut self) {
		if !self.released {
			self.state.release_waiters(Err(RefreshFailure::abandoned()));
		}
	}
}

/// Receiving half of a queued waiter.
#[derive(Debug)]
pub struct RefreshTicket {
	receiver: oneshot::Receiver<RefreshOutcome>,
}
impl RefreshTicket {
	/// Waits for the leader's outcome.
	pub async fn wait(self) -> RefreshOutcome {
		self.receiver.await.unwrap_or_else(|_| Err(RefreshFailure::abandoned()))
	}
}

/// Response interceptor that routes failures into [`SessionManager`] recovery.
pub(crate) struct RefreshInterceptor {
	pub(crate) manager: Weak<SessionManager>,
}
impl ResponseInterceptor for RefreshInterceptor {
	fn on_error<'a>(&'a self, client: &'a ApiClient, error: Error) -> ApiFuture<'a, ApiResponse> {
		Box::pin(async move {
			match self.manager.upgrade() {
				Some(manager) => manager.recover(client, error).await,
				None => Err(error),
			}
		})
	}
}

impl SessionManager {
	/// Recovers from an expired-credential failure by refreshing once and replaying the request.
	pub(crate) async fn recover(&self, client: &ApiClient, error: Error) -> Result<ApiResponse> {
		let api = match error {
			Error::Api(api) => api,
			other => return Err(other),
		};

		if self.config.endpoints.is_exempt(&api.request.path) || !common::is_expired_credential(&api)
		{
			return Err(Error::Api(api));
		}
		if api.request.is_retried() {
			obs::warn_op(OpKind::Logout, "Credential expired again after a refresh.", &api);
			self.force_logout();

			return Err(Error::AlreadyRetried(api));
		}

		let mut request = api.request;

		request.mark_retried();

		let access = match self.coordinator.try_enter_in_flight() {
			RefreshEntry::Leader(guard) => self.lead_refresh(guard).await?,
			RefreshEntry::Waiter(ticket) => {
				self.refresh_metrics.record_shared();

				ticket.wait().await?
			},
		};

		request.set_bearer(&access)?;

		client.send(request).await
	}

	async fn lead_refresh(&self, guard: InFlightGuard<'_>) -> Result<CredentialSecret> {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, "lead_refresh");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span.instrument(self.exchange_refresh_credential()).await;

		match &result {
			Ok(access) => {
				self.refresh_metrics.record_success();
				guard.release(Ok(access.clone()));
			},
			Err(err) => {
				self.refresh_metrics.record_failure();
				obs::warn_op(KIND, "Credential refresh failed.", err);

				// Log out while still in flight so no new leader reuses the rejected credential.
				if err.kind() == ErrorKind::AuthRejected {
					self.force_logout();
				}

				guard.release(Err(RefreshFailure::from_error(err)));
			},
		}

		obs::record_op_outcome(KIND, OpOutcome::of(&result));

		result
	}

	async fn exchange_refresh_credential(&self) -> Result<CredentialSecret> {
		let refresh =
			self.stored_refresh_credential()?.ok_or_else(common::missing_refresh_credential)?;
		let pair = self.acquirer.acquire(&refresh).await?;
		let access = pair.access.clone();

		self.dispatch(SessionEvent::Refresh { access: pair.access, refresh: pair.refresh })?;

		Ok(access)
	}
}
