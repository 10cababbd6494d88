use std::time::Duration;

use outbound_http::{Form, FormFile, HttpClient, RequestContext};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base = std::env::var("TARGET_BASE_URL")?;

    let client = HttpClient::new()
        .with_timeout(10)
        .with_retry(2, Duration::from_millis(500));
    client.set_header("User-Agent", "outbound-http-demo")?;

    let ctx = RequestContext::new();

    let created = client
        .post_json(&ctx, &format!("{base}/items"), &json!({"name": "widget"}))
        .await?;
    println!("{}", String::from_utf8_lossy(&created));

    let listed = client
        .get(&ctx, &format!("{base}/items"), [("page", "1")])
        .await?;
    println!("{}", String::from_utf8_lossy(&listed));

    if let Ok(path) = std::env::var("UPLOAD_PATH") {
        let form = Form::new()
            .field("file", FormFile::new(path))
            .field("tags", vec!["demo", "upload"]);
        let uploaded = client
            .post_form(&ctx, &format!("{base}/upload"), &form)
            .await?;
        println!("{}", String::from_utf8_lossy(&uploaded));
    }

    Ok(())
}
