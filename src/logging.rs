use std::time::Duration;

use crate::HttpClientError;

/// Summary of one public call, emitted as a single log event.
pub(crate) struct CallRecord<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub payload: Option<&'a str>,
    pub duration: Duration,
    /// Transport attempts made; `0` when the call failed before sending.
    pub attempts: usize,
}

impl CallRecord<'_> {
    pub(crate) fn success_message(&self, status: u16, body: &[u8]) -> String {
        format!(
            "Request: {} {}{}, Response: {status}, Body: {}",
            self.method,
            self.url,
            self.payload_suffix(),
            strip_newlines(body)
        )
    }

    pub(crate) fn failure_message(&self, err: &HttpClientError) -> String {
        format!(
            "Request: {} {}{}, Error: {err}",
            self.method,
            self.url,
            self.payload_suffix()
        )
    }

    fn payload_suffix(&self) -> String {
        self.payload
            .map(|payload| format!(" {payload}"))
            .unwrap_or_default()
    }

    pub(crate) fn emit_success(&self, status: u16, body: &[u8]) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            action = "http_call",
            method = self.method,
            url = self.url,
            status,
            attempts = self.attempts as u64,
            duration_ms = self.duration.as_millis() as u64,
            "{}",
            self.success_message(status, body)
        );
        #[cfg(not(feature = "tracing"))]
        let _ = (status, body, self.duration, self.attempts);
    }

    pub(crate) fn emit_failure(&self, err: &HttpClientError) {
        #[cfg(feature = "tracing")]
        tracing::error!(
            action = "http_call",
            method = self.method,
            url = self.url,
            attempts = self.attempts as u64,
            duration_ms = self.duration.as_millis() as u64,
            "{}",
            self.failure_message(err)
        );
        #[cfg(not(feature = "tracing"))]
        let _ = (err, self.duration, self.attempts);
    }
}

/// Lossy UTF-8 rendering of `body` with every `\n` removed.
pub(crate) fn strip_newlines(body: &[u8]) -> String {
    String::from_utf8_lossy(body).replace('\n', "")
}
