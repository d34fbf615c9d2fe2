//! Object storage scanning for backup freshness.
//!
//! Walks a paginated listing under a target's key prefix and reduces it to
//! the newest last-modified timestamp.

use thiserror::Error;

/// Upper bound on pagination. A misbehaving store that keeps handing out
/// continuation tokens must fail the scan, not spin forever.
const MAX_PAGES: usize = 1000;

/// Listing error types.
#[derive(Error, Debug)]
pub enum ListingError {
    #[error("listing request failed: {0}")]
    Request(String),
    #[error("listing exceeded {0} pages without terminating")]
    PageLimit(usize),
}

/// One page of an object listing.
#[derive(Debug, Default)]
pub struct ListingPage {
    /// (key, last-modified unix seconds) pairs.
    pub objects: Vec<(String, i64)>,
    /// Continuation token, present only when the listing is truncated.
    pub next_token: Option<String>,
}

/// A paginated object-listing backend, swappable with an in-memory fake.
#[async_trait::async_trait]
pub trait ObjectLister: Send + Sync {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<String>,
    ) -> Result<ListingPage, ListingError>;
}

/// Walk every page under `prefix` and return the newest last-modified time.
///
/// Returns `Ok(None)` when the listing is empty, which callers must not
/// confuse with the epoch. Fails closed: any page error aborts the scan
/// rather than returning a partial maximum.
pub async fn scan_latest_upload(
    lister: &dyn ObjectLister,
    bucket: &str,
    prefix: &str,
) -> Result<Option<i64>, ListingError> {
    let mut latest: Option<i64> = None;
    let mut token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let page = lister.list_page(bucket, prefix, token.take()).await?;

        for (_, modified) in &page.objects {
            if latest.map_or(true, |current| *modified > current) {
                latest = Some(*modified);
            }
        }

        match page.next_token {
            Some(next) => token = Some(next),
            None => return Ok(latest),
        }
    }

    Err(ListingError::PageLimit(MAX_PAGES))
}

/// S3-backed lister using ListObjectsV2.
pub struct S3Lister {
    client: aws_sdk_s3::Client,
}

impl S3Lister {
    /// Build a client for the given region from ambient AWS credentials.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
        }
    }
}

#[async_trait::async_trait]
impl ObjectLister for S3Lister {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<String>,
    ) -> Result<ListingPage, ListingError> {
        let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(token) = token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ListingError::Request(e.to_string()))?;

        let objects = response
            .contents()
            .iter()
            .map(|object| {
                (
                    object.key().unwrap_or_default().to_string(),
                    object.last_modified().map(|t| t.secs()).unwrap_or(0),
                )
            })
            .collect();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListingPage {
            objects,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves a scripted sequence of pages, one per request.
    struct FakeLister {
        pages: Mutex<VecDeque<Result<ListingPage, ListingError>>>,
    }

    impl FakeLister {
        fn new(pages: Vec<Result<ListingPage, ListingError>>) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().collect()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ObjectLister for FakeLister {
        async fn list_page(
            &self,
            _bucket: &str,
            _prefix: &str,
            _token: Option<String>,
        ) -> Result<ListingPage, ListingError> {
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ListingPage::default()))
        }
    }

    fn page(timestamps: &[i64], next_token: Option<&str>) -> ListingPage {
        ListingPage {
            objects: timestamps
                .iter()
                .enumerate()
                .map(|(i, t)| (format!("key-{}", i), *t))
                .collect(),
            next_token: next_token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_scan_finds_max_across_pages() {
        let lister = FakeLister::new(vec![
            Ok(page(&[5], Some("next"))),
            Ok(page(&[9, 3], None)),
        ]);
        let latest = scan_latest_upload(&lister, "bucket", "prefix/").await.unwrap();
        assert_eq!(latest, Some(9));
    }

    #[tokio::test]
    async fn test_scan_empty_listing_is_none() {
        let lister = FakeLister::new(vec![Ok(page(&[], None))]);
        let latest = scan_latest_upload(&lister, "bucket", "prefix/").await.unwrap();
        assert_eq!(latest, None);
    }

    #[tokio::test]
    async fn test_scan_fails_closed_on_page_error() {
        let lister = FakeLister::new(vec![
            Ok(page(&[5], Some("next"))),
            Err(ListingError::Request("boom".to_string())),
        ]);
        let err = scan_latest_upload(&lister, "bucket", "prefix/").await.unwrap_err();
        assert!(matches!(err, ListingError::Request(_)));
    }

    #[tokio::test]
    async fn test_scan_bounds_pagination() {
        /// Always claims more pages exist.
        struct EndlessLister;

        #[async_trait::async_trait]
        impl ObjectLister for EndlessLister {
            async fn list_page(
                &self,
                _bucket: &str,
                _prefix: &str,
                _token: Option<String>,
            ) -> Result<ListingPage, ListingError> {
                Ok(page(&[1], Some("again")))
            }
        }

        let err = scan_latest_upload(&EndlessLister, "bucket", "prefix/")
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::PageLimit(_)));
    }
}
