use std::time::Duration;

/// Header carrying the per-request correlation id unless configured otherwise.
pub const DEFAULT_REQUEST_ID_HEADER: &str = "X-Request-ID";
/// Per-attempt timeout applied by [`crate::HttpClient::new`].
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
/// No retries: a single attempt per call.
pub const DEFAULT_MAX_RETRIES: usize = 0;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Fixed-interval retry policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Delay between two attempts.
    pub interval: Duration,
    /// Whether a cancelled [`crate::RequestContext`] interrupts the delay.
    ///
    /// When `false` the delay always runs to completion and the next attempt
    /// observes the cancellation instead.
    pub cancellable_sleep: bool,
}

impl RetryConfig {
    pub fn new(max_retries: usize, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
            cancellable_sleep: false,
        }
    }

    pub fn with_cancellable_sleep(mut self, cancellable: bool) -> Self {
        self.cancellable_sleep = cancellable;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL)
    }
}

/// Configures timeout, request-id header and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in seconds; `0` disables the deadline.
    pub timeout_secs: u64,
    /// Name of the header carrying the correlation id.
    pub request_id_header: String,
    pub retry: RetryConfig,
}

impl ClientOptions {
    pub(crate) fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_owned(),
            retry: RetryConfig::default(),
        }
    }
}
