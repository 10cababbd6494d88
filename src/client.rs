use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, PoisonError, RwLock,
    },
    time::{Duration, Instant},
};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Method, Url,
};
use serde::Serialize;

use crate::{
    context::parse_header,
    encode::{encode_multipart, encode_url_encoded},
    logging::CallRecord,
    retry,
    trace::derive_identity,
    wire::{self, multipart_content_type, Reply, RequestBody},
    ClientOptions, Form, HttpClientError, RequestContext, Result, RetryConfig,
};

/// Outbound HTTP client with shared default headers, request-id injection,
/// per-attempt timeout and fixed-interval retry.
///
/// Clones share the transport and the default-header map.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    headers: Arc<RwLock<HeaderMap>>,
    options: ClientOptions,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<String> = self
            .default_headers()
            .keys()
            .map(|name| name.as_str().to_owned())
            .collect();
        f.debug_struct("HttpClient")
            .field("headers", &header_names)
            .field("options", &self.options)
            .finish()
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with a 5 second timeout, no retries and the
    /// `X-Request-ID` identity header.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            headers: Arc::new(RwLock::new(HeaderMap::new())),
            options: ClientOptions::default(),
        }
    }

    /// Replaces the underlying transport, e.g. to tune pooling or proxies.
    pub fn with_transport(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn with_retry(self, max_retries: usize, interval: Duration) -> Self {
        self.with_retry_config(RetryConfig::new(max_retries, interval))
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.options.retry = retry;
        self
    }

    /// Sets the per-attempt timeout in seconds; `0` disables it.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.options.timeout_secs = timeout_secs;
        self
    }

    pub fn with_request_id_header(mut self, name: impl Into<String>) -> Self {
        self.options.request_id_header = name.into();
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sets a header sent with every subsequent request of this client and
    /// all its clones.
    pub fn set_header(&self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value);
        Ok(())
    }

    pub fn remove_header(&self, name: &str) {
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// Snapshot of the current default headers.
    pub fn default_headers(&self) -> HeaderMap {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// POSTs `payload` serialized as JSON and returns the response body.
    pub async fn post_json<T>(&self, ctx: &RequestContext, url: &str, payload: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let started = Instant::now();
        let (body, logged) = match serde_json::to_vec(payload) {
            Ok(data) => {
                let logged = String::from_utf8_lossy(&data).into_owned();
                let body = RequestBody::Bytes {
                    content_type: wire::CONTENT_TYPE_JSON,
                    data,
                };
                (Ok(body), Some(logged))
            }
            Err(err) => (Err(err.into()), None),
        };
        self.call(ctx, Method::POST, url, logged.as_deref(), started, body)
            .await
    }

    /// GETs `url` with `query` appended as `k=v` pairs.
    ///
    /// Keys and values are appended verbatim; callers must pre-encode
    /// reserved characters.
    pub async fn get<I, K, V>(&self, ctx: &RequestContext, url: &str, query: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let started = Instant::now();
        let full_url = append_query(url, query);
        self.call(ctx, Method::GET, &full_url, None, started, Ok(RequestBody::Empty))
            .await
    }

    /// POSTs `form`, URL-encoded, or as multipart when any field is a file.
    pub async fn post_form(&self, ctx: &RequestContext, url: &str, form: &Form) -> Result<Vec<u8>> {
        let started = Instant::now();
        let body = if form.has_file() {
            encode_multipart(form).await.map(RequestBody::Multipart)
        } else {
            Ok(RequestBody::Bytes {
                content_type: wire::CONTENT_TYPE_FORM,
                data: encode_url_encoded(form).into_bytes(),
            })
        };
        let logged = form.to_string();
        self.call(ctx, Method::POST, url, Some(&logged), started, body)
            .await
    }

    async fn call(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &str,
        payload: Option<&str>,
        started: Instant,
        body: Result<RequestBody>,
    ) -> Result<Vec<u8>> {
        let attempts = AtomicUsize::new(0);
        let result = match body {
            Ok(body) => self.dispatch(ctx, &method, url, &body, &attempts).await,
            Err(err) => Err(err),
        };

        let record = CallRecord {
            method: method.as_str(),
            url,
            payload,
            duration: started.elapsed(),
            attempts: attempts.load(Ordering::Relaxed),
        };
        match result {
            Ok(reply) => {
                record.emit_success(reply.status, &reply.body);
                Ok(reply.body)
            }
            Err(err) => {
                record.emit_failure(&err);
                Err(err)
            }
        }
    }

    async fn dispatch(
        &self,
        ctx: &RequestContext,
        method: &Method,
        url: &str,
        body: &RequestBody,
        attempts: &AtomicUsize,
    ) -> Result<Reply> {
        let target = Url::parse(url).map_err(|source| HttpClientError::InvalidUrl {
            url: url.to_owned(),
            source,
        })?;
        let headers = self.request_headers(ctx, body)?;

        let (target, headers) = (&target, &headers);
        retry::run(&self.options.retry, ctx.cancellation(), move |_| {
            attempts.fetch_add(1, Ordering::Relaxed);
            self.send_once(ctx, method, target, headers, body)
        })
        .await
    }

    /// Content type, then client defaults, then per-call headers; the
    /// identity header is filled in only when none of them set it.
    fn request_headers(&self, ctx: &RequestContext, body: &RequestBody) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = body.content_type() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        headers.extend(self.default_headers());
        headers.extend(ctx.headers().clone());

        let id_header = HeaderName::from_bytes(self.options.request_id_header.as_bytes())
            .map_err(|err| {
                HttpClientError::InvalidHeader(format!("{}: {err}", self.options.request_id_header))
            })?;
        let missing = headers
            .get(&id_header)
            .map_or(true, |value| value.is_empty());
        if missing {
            let identity = derive_identity(ctx.trace());
            let value = HeaderValue::from_str(&identity)
                .map_err(|err| HttpClientError::InvalidHeader(format!("{id_header}: {err}")))?;
            headers.insert(id_header, value);
        }
        Ok(headers)
    }

    async fn send_once(
        &self,
        ctx: &RequestContext,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: &RequestBody,
    ) -> Result<Reply> {
        let mut headers = headers.clone();
        let mut builder = self.http.request(method.clone(), url.clone());
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Bytes { data, .. } => builder.body(data.clone()),
            RequestBody::Multipart(multipart) => {
                let form = multipart.to_form()?;
                let content_type = HeaderValue::from_str(&multipart_content_type(&form))
                    .map_err(|err| HttpClientError::InvalidHeader(err.to_string()))?;
                headers.insert(CONTENT_TYPE, content_type);
                builder.multipart(form)
            }
        };
        builder = builder.headers(headers);
        if let Some(timeout) = self.options.timeout() {
            builder = builder.timeout(timeout);
        }

        let exchange = async {
            let response = builder
                .send()
                .await
                .map_err(HttpClientError::from_transport)?;
            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(HttpClientError::from_transport)?;
            Reply {
                status,
                body: body.to_vec(),
            }
            .classify()
        };

        match ctx.cancellation() {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(HttpClientError::Cancelled),
                reply = exchange => reply,
            },
            None => exchange.await,
        }
    }
}

fn append_query<I, K, V>(url: &str, query: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let params: Vec<String> = query
        .into_iter()
        .map(|(key, value)| format!("{}={}", key.as_ref(), value.as_ref()))
        .collect();
    if params.is_empty() {
        return url.to_owned();
    }
    format!("{url}?{}", params.join("&"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::header::CONTENT_TYPE;

    use super::{append_query, HttpClient};
    use crate::{
        trace::TraceId, wire::RequestBody, HttpClientError, RequestContext, RetryConfig,
    };

    fn json_body() -> RequestBody {
        RequestBody::Bytes {
            content_type: "application/json",
            data: b"{}".to_vec(),
        }
    }

    #[test]
    fn append_query_joins_pairs_verbatim() {
        assert_eq!(append_query("http://h/p", Vec::<(&str, &str)>::new()), "http://h/p");
        assert_eq!(append_query("http://h/p", [("k", "v")]), "http://h/p?k=v");
        assert_eq!(
            append_query("http://h/p", [("a", "1"), ("b", "x y")]),
            "http://h/p?a=1&b=x y"
        );
    }

    #[test]
    fn builder_methods_update_options() {
        let client = HttpClient::new()
            .with_timeout(0)
            .with_retry(2, Duration::from_millis(5))
            .with_request_id_header("X-Trace");
        assert_eq!(client.options().timeout_secs, 0);
        assert_eq!(client.options().retry, RetryConfig::new(2, Duration::from_millis(5)));
        assert_eq!(client.options().request_id_header, "X-Trace");
    }

    #[test]
    fn default_headers_are_shared_between_clones() {
        let client = HttpClient::new();
        let clone = client.clone();
        client.set_header("X-Tenant", "acme").expect("valid header");
        assert_eq!(
            clone.default_headers().get("x-tenant").and_then(|v| v.to_str().ok()),
            Some("acme")
        );

        clone.remove_header("X-Tenant");
        assert!(client.default_headers().is_empty());
    }

    #[test]
    fn request_headers_layer_defaults_and_call_overrides() {
        let client = HttpClient::new();
        client.set_header("X-Env", "prod").expect("valid header");
        client.set_header("X-Tenant", "acme").expect("valid header");
        let ctx = RequestContext::new()
            .with_header("X-Tenant", "other")
            .expect("valid header");

        let headers = client
            .request_headers(&ctx, &json_body())
            .expect("headers must build");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get("x-env").unwrap(), "prod");
        assert_eq!(headers.get("x-tenant").unwrap(), "other");
        assert!(!headers.get("x-request-id").unwrap().is_empty());
    }

    #[test]
    fn identity_header_prefers_caller_value_then_trace() {
        let client = HttpClient::new();
        let explicit = RequestContext::new()
            .with_trace(TraceId::new("trace-1"))
            .with_header("X-Request-ID", "caller-id")
            .expect("valid header");
        let headers = client
            .request_headers(&explicit, &RequestBody::Empty)
            .expect("headers must build");
        assert_eq!(headers.get("x-request-id").unwrap(), "caller-id");

        let traced = RequestContext::new().with_trace(TraceId::new("trace-1"));
        let headers = client
            .request_headers(&traced, &RequestBody::Empty)
            .expect("headers must build");
        assert_eq!(headers.get("x-request-id").unwrap(), "trace-1");
    }

    #[test]
    fn custom_identity_header_name_is_used() {
        let client = HttpClient::new().with_request_id_header("X-Correlation-ID");
        let headers = client
            .request_headers(&RequestContext::new(), &RequestBody::Empty)
            .expect("headers must build");
        assert!(headers.contains_key("x-correlation-id"));
        assert!(!headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn malformed_url_fails_before_any_attempt() {
        let client = HttpClient::new().with_retry(3, Duration::from_secs(30));
        let err = tokio::time::timeout(
            Duration::from_secs(1),
            client.get(&RequestContext::new(), "not a url", [("k", "v")]),
        )
        .await
        .expect("invalid url must not enter the retry loop")
        .expect_err("invalid url must fail");
        assert!(matches!(err, HttpClientError::InvalidUrl { .. }));
    }

    #[test]
    fn debug_lists_header_names_only() {
        let client = HttpClient::new();
        client
            .set_header("Authorization", "Bearer secret-token")
            .expect("valid header");
        let debug = format!("{client:?}");
        assert!(debug.contains("authorization"));
        assert!(!debug.contains("secret-token"));
    }

    #[cfg(feature = "tracing")]
    mod events {
        use std::{
            sync::{Arc, Mutex},
            time::Duration,
        };

        use tracing::{
            field::{Field, Visit},
            Event, Subscriber,
        };
        use tracing_subscriber::{layer::Context, prelude::*, Layer};

        use crate::{HttpClient, RequestContext};

        #[derive(Clone, Default)]
        struct Recorded(Arc<Mutex<Vec<Option<u64>>>>);

        struct AttemptsField(Option<u64>);

        impl Visit for AttemptsField {
            fn record_u64(&mut self, field: &Field, value: u64) {
                if field.name() == "attempts" {
                    self.0 = Some(value);
                }
            }

            fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
        }

        impl<S: Subscriber> Layer<S> for Recorded {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                if !event.metadata().target().starts_with("outbound_http") {
                    return;
                }
                let mut field = AttemptsField(None);
                event.record(&mut field);
                self.0.lock().expect("lock").push(field.0);
            }
        }

        #[tokio::test]
        async fn retried_call_emits_single_event_with_attempt_count() {
            let recorded = Recorded::default();
            let _guard =
                tracing::subscriber::set_default(tracing_subscriber::registry().with(recorded.clone()));

            let client = HttpClient::new()
                .with_timeout(1)
                .with_retry(2, Duration::from_millis(1));
            let result = client
                .get(&RequestContext::new(), "http://127.0.0.1:1/", [("k", "v")])
                .await;
            assert!(result.is_err());

            let events = recorded.0.lock().expect("lock").clone();
            assert_eq!(events, vec![Some(3)]);
        }

        #[tokio::test]
        async fn call_rejected_before_sending_reports_zero_attempts() {
            let recorded = Recorded::default();
            let _guard =
                tracing::subscriber::set_default(tracing_subscriber::registry().with(recorded.clone()));

            let client = HttpClient::new().with_retry(3, Duration::from_millis(1));
            let result = client
                .get(&RequestContext::new(), "not a url", [("k", "v")])
                .await;
            assert!(result.is_err());

            let events = recorded.0.lock().expect("lock").clone();
            assert_eq!(events, vec![Some(0)]);
        }
    }
}
