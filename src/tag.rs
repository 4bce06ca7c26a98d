//! Marks each attempt's request as the original or as a hedge.
//!
//! The mark travels in the request's [`http::Extensions`], so a transport or
//! middleware running underneath the hedger can tell duplicates apart without
//! any access to the hedger itself. The winning response carries the same
//! mark, so callers can see which attempt answered.

use http::{Request, Response};

/// Extension inserted into every request the hedger dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTag {
    index: usize,
}

impl AttemptTag {
    pub(crate) fn new(index: usize) -> Self {
        Self { index }
    }

    /// Launch index of the attempt; 0 is the original request.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_hedge(&self) -> bool {
        self.index > 0
    }
}

/// Tags `request` as attempt `index`, replacing any earlier tag.
pub fn tag_attempt<B>(mut request: Request<B>, index: usize) -> Request<B> {
    request.extensions_mut().insert(AttemptTag::new(index));
    request
}

/// Returns `true` if `request` was dispatched as a hedge rather than as the
/// original attempt. Untagged requests are not hedges.
pub fn is_hedged_request<B>(request: &Request<B>) -> bool {
    request
        .extensions()
        .get::<AttemptTag>()
        .is_some_and(AttemptTag::is_hedge)
}

/// Launch index of a tagged request.
pub fn attempt_index<B>(request: &Request<B>) -> Option<usize> {
    request.extensions().get::<AttemptTag>().map(AttemptTag::index)
}

/// Launch index of the attempt that produced a hedged call's response.
pub fn winning_attempt<B>(response: &Response<B>) -> Option<usize> {
    response.extensions().get::<AttemptTag>().map(AttemptTag::index)
}
