use std::future::Future;

use async_trait::async_trait;

use super::{ObjectLister, StorageError};

/// S3 bucket listing via `ListObjectsV2`.
pub struct S3Lister {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Lister {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the standard AWS environment (credentials,
    /// region, profile). A custom endpoint switches to path-style addressing
    /// for S3-compatible stores.
    pub async fn from_env(bucket: impl Into<String>, endpoint_url: Option<String>) -> Self {
        let cfg = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&cfg);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url).force_path_style(true);
        }
        Self::new(aws_sdk_s3::Client::from_conf(builder.build()), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// The part of one `ListObjectsV2` response that pagination needs.
struct Page {
    keys: Vec<String>,
    is_truncated: bool,
    next_token: Option<String>,
}

/// Request pages until the backend stops reporting a truncated result,
/// passing each continuation token to the next request.
async fn collect_pages<F, Fut, E>(mut fetch_page: F) -> Result<Vec<String>, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page, E>>,
{
    let mut keys = Vec::new();
    let mut token = None;
    loop {
        let page = fetch_page(token.take()).await?;
        keys.extend(page.keys);
        match page.next_token {
            Some(next) if page.is_truncated => token = Some(next),
            _ => return Ok(keys),
        }
    }
}

#[async_trait]
impl ObjectLister for S3Lister {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let keys = collect_pages(|token| async move {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(token)
                .send()
                .await
                .map_err(|e| StorageError::List {
                    bucket: self.bucket.clone(),
                    prefix: prefix.to_string(),
                    message: format!("{e:?}"),
                })?;
            Ok(Page {
                keys: resp
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .map(str::to_string)
                    .collect(),
                is_truncated: resp.is_truncated().unwrap_or(false),
                next_token: resp.next_continuation_token().map(str::to_string),
            })
        })
        .await?;

        tracing::trace!(prefix, keys = keys.len(), "ListObjectsV2 complete");
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::ready;

    fn page(keys: &[&str], next_token: Option<&str>, is_truncated: bool) -> Page {
        Page {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            is_truncated,
            next_token: next_token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_collects_every_page_in_order() {
        let mut pages = vec![
            page(&["item1/downloads/p1.jpg", "item1/downloads/p2.jpg"], Some("t1"), true),
            page(&["item1/downloads/p3.jpg"], Some("t2"), true),
            page(&["item1/downloads/p4.jpg"], None, false),
        ]
        .into_iter();
        let mut tokens = Vec::new();

        let keys = collect_pages(|token| {
            tokens.push(token);
            ready(pages.next().ok_or_else(|| "requested a page past the end".to_string()))
        })
        .await
        .unwrap();

        assert_eq!(
            keys,
            [
                "item1/downloads/p1.jpg",
                "item1/downloads/p2.jpg",
                "item1/downloads/p3.jpg",
                "item1/downloads/p4.jpg",
            ]
        );
        assert_eq!(tokens, [None, Some("t1".to_string()), Some("t2".to_string())]);
    }

    #[tokio::test]
    async fn test_stops_when_not_truncated_despite_token() {
        let mut calls = 0;
        let keys = collect_pages(|_| {
            calls += 1;
            ready(Ok::<_, String>(page(&["item1/ocr/p1.txt"], Some("stale"), false)))
        })
        .await
        .unwrap();
        assert_eq!(keys, ["item1/ocr/p1.txt"]);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let keys = collect_pages(|_| ready(Ok::<_, String>(page(&[], None, false))))
            .await
            .unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_page_error_stops_listing() {
        let mut calls = 0;
        let result = collect_pages(|token| {
            calls += 1;
            ready(match token {
                None => Ok(page(&["item1/ocr/p1.txt"], Some("t1"), true)),
                Some(_) => Err("throttled".to_string()),
            })
        })
        .await;
        assert_eq!(result.unwrap_err(), "throttled");
        assert_eq!(calls, 2);
    }
}
