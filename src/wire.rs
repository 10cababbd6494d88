use bytes::Bytes;
use reqwest::multipart;

use crate::{HttpClientError, Result};

pub(crate) const CONTENT_TYPE_JSON: &str = "application/json";
pub(crate) const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// One part of a multipart body, with file content already loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content: Bytes,
    },
}

/// Fully materialized multipart body.
///
/// A fresh [`multipart::Form`] (and boundary) is produced per attempt, so
/// the body can be resent by the retry loop without re-reading files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartBody {
    pub(crate) parts: Vec<MultipartPart>,
}

impl MultipartBody {
    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub fn to_form(&self) -> Result<multipart::Form> {
        let mut form = multipart::Form::new();
        for part in &self.parts {
            form = match part {
                MultipartPart::Text { name, value } => form.text(name.clone(), value.clone()),
                MultipartPart::File {
                    name,
                    file_name,
                    content,
                } => {
                    let part = multipart::Part::stream_with_length(
                        reqwest::Body::from(content.clone()),
                        content.len() as u64,
                    )
                    .file_name(file_name.clone())
                    .mime_str(CONTENT_TYPE_OCTET_STREAM)
                    .map_err(HttpClientError::Transport)?;
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

/// `Content-Type` value announcing the boundary of `form`.
pub fn multipart_content_type(form: &multipart::Form) -> String {
    format!("multipart/form-data; boundary={}", form.boundary())
}

/// Encoded request body, built once per call and reused by every attempt.
#[derive(Clone, Debug)]
pub(crate) enum RequestBody {
    Empty,
    Bytes {
        content_type: &'static str,
        data: Vec<u8>,
    },
    Multipart(MultipartBody),
}

impl RequestBody {
    pub(crate) fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Bytes { content_type, .. } => Some(*content_type),
            Self::Empty | Self::Multipart(_) => None,
        }
    }
}

/// Outcome of one attempt before status classification.
#[derive(Debug)]
pub(crate) struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Reply {
    pub(crate) fn classify(self) -> Result<Self> {
        if self.status >= 300 {
            return Err(HttpClientError::Status {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            });
        }
        Ok(self)
    }
}
