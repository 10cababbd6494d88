use std::{fmt, sync::Arc};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::{trace::TraceIdSource, HttpClientError, Result};

/// Per-call inputs that are not part of the payload.
///
/// Carries an optional trace source for the request-id header, an optional
/// cancellation token, and headers that override the client defaults for
/// this call only.
#[derive(Clone, Default)]
pub struct RequestContext {
    pub(crate) trace: Option<Arc<dyn TraceIdSource>>,
    pub(crate) cancel: Option<CancellationToken>,
    pub(crate) headers: HeaderMap,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("trace", &self.trace.as_ref().and_then(|t| t.trace_id()))
            .field("cancel", &self.cancel)
            .field("headers", &self.headers)
            .finish()
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace(mut self, source: impl TraceIdSource + 'static) -> Self {
        self.trace = Some(Arc::new(source));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Adds a header for this call, replacing any client default of the same name.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn trace(&self) -> Option<&dyn TraceIdSource> {
        self.trace.as_deref()
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| HttpClientError::InvalidHeader(format!("{name}: {err}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|err| HttpClientError::InvalidHeader(format!("{name}: {err}")))?;
    Ok((header_name, header_value))
}
