use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    tag::tag_attempt,
    transport::{BoxError, Transport},
};

/// How a single attempt ended.
pub(crate) enum Outcome<B> {
    Success(Response<B>),
    Failure(BoxError),
    Cancelled,
}

/// Message an attempt task sends back to the hedger when it finishes.
pub(crate) struct Completion<B> {
    pub(crate) index: usize,
    pub(crate) outcome: Outcome<B>,
}

/// The hedger's handle on one dispatched attempt.
#[derive(Debug)]
pub(crate) struct Attempt {
    index: usize,
    scope: CancellationToken,
    resolved: bool,
}

impl Attempt {
    /// Dispatches attempt `index` on its own task, under a child of `parent`.
    ///
    /// The attempt reports exactly one [`Completion`] on `done`.
    pub(crate) fn spawn<T: Transport>(
        index: usize,
        request: &Request<Bytes>,
        parent: &CancellationToken,
        transport: &Arc<T>,
        done: mpsc::UnboundedSender<Completion<T::Body>>,
    ) -> Self {
        let scope = parent.child_token();
        let send = transport.send(tag_attempt(clone_request(request), index));
        let token = scope.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Outcome::Cancelled,
                result = send => match result {
                    Ok(response) => Outcome::Success(response),
                    // An error surfacing after cancellation is the cancellation's doing.
                    Err(_) if token.is_cancelled() => Outcome::Cancelled,
                    Err(err) => Outcome::Failure(err),
                },
            };
            let _ = done.send(Completion { index, outcome });
        });

        Self {
            index,
            scope,
            resolved: false,
        }
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub(crate) fn resolve(&mut self) {
        self.resolved = true;
    }

    /// Cancels the attempt. Returns `true` if it was still in flight.
    pub(crate) fn cancel(&mut self) -> bool {
        self.scope.cancel();
        let was_pending = !std::mem::replace(&mut self.resolved, true);
        if was_pending {
            tracing::trace!(attempt.index = self.index, "cancelled in-flight attempt");
        }
        was_pending
    }
}

/// Copies everything an attempt needs from the caller's request.
pub(crate) fn clone_request(request: &Request<Bytes>) -> Request<Bytes> {
    let mut cloned = Request::new(request.body().clone());
    *cloned.method_mut() = request.method().clone();
    *cloned.uri_mut() = request.uri().clone();
    *cloned.version_mut() = request.version();
    *cloned.headers_mut() = request.headers().clone();
    *cloned.extensions_mut() = request.extensions().clone();
    cloned
}
