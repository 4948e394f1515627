//! Interceptor-aware API client.
//!
//! [`ApiClient::send`] runs every registered [`RequestInterceptor`] in registration order,
//! dispatches the request through the [`HttpTransport`], turns non-success statuses into
//! [`Error::Api`], and then offers the failure to each [`ResponseInterceptor`] in turn. The first
//! interceptor that resolves the failure wins; otherwise the last error is returned.
//!
//! Interceptors are registered and ejected by [`InterceptorId`] at any time. The registries are
//! snapshotted before any `.await`, so a registration that races a request either applies to the
//! whole request or not at all.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	http::{ApiError, ApiRequest, ApiResponse, HttpTransport},
	intercept::{RequestInterceptor, ResponseInterceptor},
};

/// Boxed future returned by client and interceptor operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

type Registry<T> = RwLock<Vec<(InterceptorId, Arc<T>)>>;

/// Handle returned when registering an interceptor; pass it back to eject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

/// HTTP client with dynamically registered request and response interceptors.
pub struct ApiClient {
	transport: Arc<dyn HttpTransport>,
	request_interceptors: Registry<dyn RequestInterceptor>,
	response_interceptors: Registry<dyn ResponseInterceptor>,
	next_id: AtomicU64,
}
impl ApiClient {
	/// Creates a client without interceptors.
	pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
		Self {
			transport,
			request_interceptors: Default::default(),
			response_interceptors: Default::default(),
			next_id: AtomicU64::new(1),
		}
	}

	/// Registers a request interceptor, appended after existing ones.
	pub fn register_request(&self, interceptor: Arc<dyn RequestInterceptor>) -> InterceptorId {
		let id = self.next_id();

		self.request_interceptors.write().push((id, interceptor));

		id
	}

	/// Removes a request interceptor; returns `false` when `id` is unknown.
	pub fn eject_request(&self, id: InterceptorId) -> bool {
		eject(&self.request_interceptors, id)
	}

	/// Registers a response interceptor, appended after existing ones.
	pub fn register_response(&self, interceptor: Arc<dyn ResponseInterceptor>) -> InterceptorId {
		let id = self.next_id();

		self.response_interceptors.write().push((id, interceptor));

		id
	}

	/// Removes a response interceptor; returns `false` when `id` is unknown.
	pub fn eject_response(&self, id: InterceptorId) -> bool {
		eject(&self.response_interceptors, id)
	}

	/// Number of registered request interceptors.
	pub fn request_interceptor_count(&self) -> usize {
		self.request_interceptors.read().len()
	}

	/// Number of registered response interceptors.
	pub fn response_interceptor_count(&self) -> usize {
		self.response_interceptors.read().len()
	}

	/// Sends `request` through the interceptor chain.
	pub fn send(&self, request: ApiRequest) -> ApiFuture<'_, ApiResponse> {
		Box::pin(async move {
			let mut error = match self.dispatch(request).await {
				Ok(response) => return Ok(response),
				Err(e) => e,
			};
			let interceptors = snapshot(&self.response_interceptors);

			for interceptor in interceptors {
				match interceptor.on_error(self, error).await {
					Ok(response) => return Ok(response),
					Err(e) => error = e,
				}
			}

			Err(error)
		})
	}

	async fn dispatch(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		for interceptor in snapshot(&self.request_interceptors) {
			interceptor.intercept(&mut request)?;
		}

		let response = self.transport.execute(&request).await?;

		if response.status.is_success() {
			Ok(response)
		} else {
			Err(ApiError::from_response(request, response).into())
		}
	}

	fn next_id(&self) -> InterceptorId {
		InterceptorId(self.next_id.fetch_add(1, Ordering::Relaxed))
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("request_interceptors", &self.request_interceptor_count())
			.field("response_interceptors", &self.response_interceptor_count())
			.finish()
	}
}

fn snapshot<T>(registry: &Registry<T>) -> Vec<Arc<T>>
where
	T: ?Sized,
{
	registry.read().iter().map(|(_, interceptor)| interceptor.clone()).collect()
}

fn eject<T>(registry: &Registry<T>, id: InterceptorId) -> bool
where
	T: ?Sized,
{
	let mut guard = registry.write();
	let before = guard.len();

	guard.retain(|(existing, _)| *existing != id);

	guard.len() != before
}
