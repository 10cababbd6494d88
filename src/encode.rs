use bytes::Bytes;
use url::form_urlencoded;

use crate::{
    wire::{MultipartBody, MultipartPart},
    Form, FormFile, FormValue, HttpClientError, Result,
};

/// Encodes `form` as an `application/x-www-form-urlencoded` string.
///
/// File fields are skipped; use [`encode_multipart`] when
/// [`Form::has_file`] is true.
pub fn encode_url_encoded(form: &Form) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form {
        for (name, text) in expand_field(key, value) {
            serializer.append_pair(&name, &text);
        }
    }
    serializer.finish()
}

/// Builds a multipart body from `form`, reading every file field.
///
/// The first failing field aborts the whole body. Files are read in full and
/// closed before this returns.
pub async fn encode_multipart(form: &Form) -> Result<MultipartBody> {
    let mut parts = Vec::with_capacity(form.len());
    for (key, value) in form {
        match value {
            FormValue::File(file) => parts.push(file_part(key, file).await?),
            other => parts.extend(
                expand_field(key, other)
                    .into_iter()
                    .map(|(name, value)| MultipartPart::Text { name, value }),
            ),
        }
    }
    Ok(MultipartBody { parts })
}

async fn file_part(key: &str, file: &FormFile) -> Result<MultipartPart> {
    let content = tokio::fs::read(&file.path)
        .await
        .map_err(|source| HttpClientError::File {
            path: file.path.clone(),
            source,
        })?;
    Ok(MultipartPart::File {
        name: file.resolved_field(key).to_owned(),
        file_name: file.resolved_file_name(),
        content: Bytes::from(content),
    })
}

/// Expands one field into wire `(name, value)` pairs.
pub(crate) fn expand_field(key: &str, value: &FormValue) -> Vec<(String, String)> {
    match value {
        FormValue::Scalar(scalar) => vec![(key.to_owned(), scalar.to_string())],
        FormValue::List(items) => items
            .iter()
            .map(|item| (format!("{key}[]"), item.to_string()))
            .collect(),
        FormValue::Map(map) => map
            .iter()
            .map(|(sub, item)| (format!("{key}[{sub}]"), item.to_string()))
            .collect(),
        FormValue::MapList(maps) => maps
            .iter()
            .enumerate()
            .flat_map(|(index, map)| {
                map.iter()
                    .map(move |(sub, item)| (format!("{key}[{index}][{sub}]"), item.to_string()))
            })
            .collect(),
        FormValue::File(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, io::Write};

    use bytes::Bytes;

    use crate::{
        encode::{encode_multipart, encode_url_encoded, expand_field},
        wire::MultipartPart,
        Form, FormFile, FormValue, HttpClientError, Scalar,
    };

    #[test]
    fn url_encoding_expands_lists_in_order() {
        let form = Form::new()
            .field("name", "go")
            .field("ids", vec![1i64, 2]);
        assert_eq!(encode_url_encoded(&form), "ids%5B%5D=1&ids%5B%5D=2&name=go");
    }

    #[test]
    fn url_encoding_expands_maps_and_map_lists() {
        let meta = FormValue::map([("lang", "en")]);
        let items = FormValue::MapList(vec![
            BTreeMap::from([("sku".to_owned(), Scalar::text("a"))]),
            BTreeMap::from([("sku".to_owned(), Scalar::text("b"))]),
        ]);
        let form = Form::new().field("meta", meta).field("items", items);

        let decoded: Vec<(String, String)> =
            url::form_urlencoded::parse(encode_url_encoded(&form).as_bytes())
                .into_owned()
                .collect();
        assert_eq!(
            decoded,
            vec![
                ("items[0][sku]".to_owned(), "a".to_owned()),
                ("items[1][sku]".to_owned(), "b".to_owned()),
                ("meta[lang]".to_owned(), "en".to_owned()),
            ]
        );
    }

    #[test]
    fn url_encoding_skips_files_and_escapes_values() {
        let form = Form::new()
            .field("doc", FormFile::new("/nonexistent"))
            .field("q", "a b&c");
        assert_eq!(encode_url_encoded(&form), "q=a+b%26c");
    }

    #[test]
    fn numeric_scalars_render_plainly() {
        assert_eq!(
            expand_field("n", &FormValue::list([Scalar::Uint32(7), Scalar::Int32(-1)])),
            vec![
                ("n[]".to_owned(), "7".to_owned()),
                ("n[]".to_owned(), "-1".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn multipart_reads_file_and_keeps_ordinary_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"hello").expect("write temp file");

        let form = Form::new()
            .field("file", FormFile::new(file.path()).with_file_name("file.txt"))
            .field("tags", vec!["x", "y"]);
        let body = encode_multipart(&form).await.expect("multipart must build");

        assert_eq!(
            body.parts(),
            &[
                MultipartPart::File {
                    name: "file".to_owned(),
                    file_name: "file.txt".to_owned(),
                    content: Bytes::from_static(b"hello"),
                },
                MultipartPart::Text {
                    name: "tags[]".to_owned(),
                    value: "x".to_owned(),
                },
                MultipartPart::Text {
                    name: "tags[]".to_owned(),
                    value: "y".to_owned(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn multipart_uses_field_override_and_base_name() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("report.csv");
        std::fs::write(&path, "a,b").expect("write fixture");

        let form = Form::new().field("upload", FormFile::new(&path).with_field("doc"));
        let body = encode_multipart(&form).await.expect("multipart must build");

        match &body.parts()[0] {
            MultipartPart::File {
                name, file_name, ..
            } => {
                assert_eq!(name, "doc");
                assert_eq!(file_name, "report.csv");
            }
            other => panic!("expected file part, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multipart_fails_on_missing_file() {
        let form = Form::new()
            .field("a", "1")
            .field("file", FormFile::new("/definitely/not/here.bin"));
        let err = encode_multipart(&form).await.expect_err("missing file must fail");
        assert!(matches!(err, HttpClientError::File { .. }));
    }
}
