//! Correlation identifiers for the request-id header.

use std::sync::Arc;

/// Read access to the caller's active trace, if any.
pub trait TraceIdSource: Send + Sync {
    /// Identifier of the active trace, or `None` when no trace is active.
    fn trace_id(&self) -> Option<String>;

    fn has_active_trace_id(&self) -> bool {
        self.trace_id().is_some()
    }
}

/// A fixed, already-known trace identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl TraceIdSource for TraceId {
    fn trace_id(&self) -> Option<String> {
        (!self.0.trim().is_empty()).then(|| self.0.clone())
    }
}

/// Adapts a closure that looks up the active trace id.
#[derive(Clone)]
pub struct TraceFn<F>(pub F);

impl<F> TraceIdSource for TraceFn<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn trace_id(&self) -> Option<String> {
        (self.0)()
    }
}

impl<T: TraceIdSource + ?Sized> TraceIdSource for Arc<T> {
    fn trace_id(&self) -> Option<String> {
        (**self).trace_id()
    }
}

#[cfg(feature = "opentelemetry")]
impl TraceIdSource for opentelemetry::Context {
    fn trace_id(&self) -> Option<String> {
        use opentelemetry::trace::{TraceContextExt, TraceId as OtelTraceId};

        let trace_id = self.span().span_context().trace_id();
        (trace_id != OtelTraceId::INVALID).then(|| trace_id.to_string())
    }
}

/// Returns the active trace id from `source`, or a fresh UUID v4.
pub fn derive_identity(source: Option<&dyn TraceIdSource>) -> String {
    source
        .and_then(|source| source.trace_id())
        .unwrap_or_else(generate_request_id)
}

fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
