//! The single-attempt transport the hedger fans requests out over.

use std::{future::Future, pin::Pin};

use bytes::Bytes;
use http::{Request, Response};
use http_body::Body;
use http_body_util::Full;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

/// Type-erased error returned by a [`Transport`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed, sendable future used by transports whose future type cannot be named.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Sends one request and yields one response or error.
///
/// The hedger calls [`Transport::send`] once per attempt and drops the returned
/// future as soon as that attempt is cancelled, so implementations should not
/// rely on running to completion. The returned future owns everything it needs,
/// so it can be moved onto its own task.
pub trait Transport: Send + Sync + 'static {
    /// Response body produced by this transport.
    type Body: Body<Data = Bytes> + Send + 'static;

    /// Future resolving to the outcome of one attempt.
    type Future: Future<Output = Result<Response<Self::Body>, BoxError>> + Send + 'static;

    fn send(&self, request: Request<Bytes>) -> Self::Future;
}

/// Plain HTTP/1 transport backed by a pooled hyper client.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    /// Creates a transport with its own connection pool.
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    type Body = hyper::body::Incoming;
    type Future = BoxFuture<Result<Response<Self::Body>, BoxError>>;

    fn send(&self, request: Request<Bytes>) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            client
                .request(request.map(Full::new))
                .await
                .map_err(BoxError::from)
        })
    }
}

/// Transport built from a closure, see [`transport_fn`].
#[derive(Clone)]
pub struct TransportFn<F> {
    f: F,
}

/// Wraps an async closure as a [`Transport`].
///
/// Handy for layering behaviour (logging, fault injection) underneath the
/// hedger, or for stubbing the network in tests.
///
/// ```
/// use bytes::Bytes;
/// use hedged_http::transport::{transport_fn, BoxError};
/// use http::Response;
/// use http_body_util::Full;
///
/// let transport = transport_fn(|_req| async {
///     Ok::<_, BoxError>(Response::new(Full::new(Bytes::from_static(b"ok"))))
/// });
/// # let _ = transport;
/// ```
pub fn transport_fn<F, Fut, B>(f: F) -> TransportFn<F>
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<B>, BoxError>> + Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
{
    TransportFn { f }
}

impl<F, Fut, B> Transport for TransportFn<F>
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<B>, BoxError>> + Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
{
    type Body = B;
    type Future = Fut;

    fn send(&self, request: Request<Bytes>) -> Self::Future {
        (self.f)(request)
    }
}

impl<F> std::fmt::Debug for TransportFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportFn").finish_non_exhaustive()
    }
}
