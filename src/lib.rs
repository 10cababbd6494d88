//! `outbound-http` is an async client for calling other HTTP services.
//!
//! [`HttpClient`] exposes three verbs:
//! - [`HttpClient::post_json`]
//! - [`HttpClient::get`]
//! - [`HttpClient::post_form`] (URL-encoded, or multipart when a
//!   [`FormFile`] is present)
//!
//! Every call carries the client's default headers and an identity header
//! (`X-Request-ID` unless configured otherwise), runs under a per-attempt
//! timeout and a fixed-interval [`RetryConfig`], and fails with
//! [`HttpClientError::Status`] on any status code of 300 or above.

mod client;
mod context;
mod encode;
mod error;
mod form;
mod logging;
mod options;
pub mod retry;
pub mod trace;
mod value;
mod wire;

pub use client::HttpClient;
pub use context::RequestContext;
pub use encode::{encode_multipart, encode_url_encoded};
pub use error::HttpClientError;
pub use form::Form;
pub use options::{
    ClientOptions, RetryConfig, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_ID_HEADER,
    DEFAULT_RETRY_INTERVAL, DEFAULT_TIMEOUT_SECS,
};
pub use trace::{derive_identity, TraceFn, TraceId, TraceIdSource};
pub use value::{FormFile, FormValue, Scalar};
pub use wire::{multipart_content_type, MultipartBody, MultipartPart};

pub type Result<T> = std::result::Result<T, HttpClientError>;
