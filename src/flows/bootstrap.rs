//! Startup rehydration.
//!
//! [`SessionManager::bootstrap`] turns a stored refresh credential back into a live session. It
//! retries transient failures with a linear backoff, gives up immediately when the credential is
//! rejected, and opens the [`SessionManager::initialized`] gate however it ends.

// self
use crate::{
	_prelude::*,
	auth::{Session, SessionEvent},
	flows::SessionManager,
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Delay capability used between bootstrap attempts.
pub trait Sleeper
where
	Self: Send + Sync,
{
	/// Completes after `duration` has elapsed.
	fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;
impl Sleeper for TokioSleeper {
	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		let duration = std::time::Duration::try_from(duration).unwrap_or_default();

		Box::pin(tokio::time::sleep(duration))
	}
}

impl SessionManager {
	/// Runs the one-time rehydration pass and returns the resulting session.
	///
	/// Acquisition failures end in `Unauthenticated` with the store cleared and are not reported
	/// as errors; only credential store failures are. Later calls return the current session.
	pub async fn bootstrap(&self) -> Result<Session> {
		let mut outcome = Ok(());
		let slot = &mut outcome;

		self.initialized
			.get_or_init(|| async move {
				*slot = self.rehydrate().await;
			})
			.await;

		outcome?;

		Ok(self.session())
	}

	async fn rehydrate(&self) -> Result<()> {
		const KIND: OpKind = OpKind::Bootstrap;

		let span = OpSpan::new(KIND, "rehydrate");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.restore_session()).await;
		let outcome = match &result {
			Ok(None) => OpOutcome::Success,
			_ => OpOutcome::Failure,
		};

		obs::record_op_outcome(KIND, outcome);

		if result.is_err() {
			// Never leave the session stuck in `Initializing`.
			if let Err(err) = self.dispatch(SessionEvent::InitComplete) {
				obs::warn_op(KIND, "Bootstrap could not complete initialization.", &err);
			}
		}

		result.map(|_| ())
	}

	/// Returns the acquisition failure that made bootstrap give up, if any.
	async fn restore_session(&self) -> Result<Option<Error>> {
		let Some(refresh) = self.stored_refresh_credential()? else {
			self.dispatch(SessionEvent::InitComplete)?;

			return Ok(None);
		};
		let policy = self.config.bootstrap;
		let mut attempt = 0;
		let failure = loop {
			attempt += 1;

			match self.acquirer.acquire(&refresh).await {
				Ok(pair) => {
					self.dispatch(SessionEvent::Refresh {
						access: pair.access,
						refresh: pair.refresh,
					})?;

					return Ok(None);
				},
				Err(err) => {
					obs::warn_op(OpKind::Bootstrap, "Bootstrap attempt failed.", &err);

					if err.kind() == ErrorKind::AuthRejected || attempt >= policy.max_attempts {
						break err;
					}

					self.sleeper.sleep(policy.delay_after(attempt)).await;
				},
			}
		};

		self.dispatch(SessionEvent::Logout)?;

		Ok(Some(failure))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn tokio_sleeper_accepts_negative_durations() {
		TokioSleeper.sleep(Duration::milliseconds(-5)).await;
		TokioSleeper.sleep(Duration::milliseconds(1)).await;
	}
}
