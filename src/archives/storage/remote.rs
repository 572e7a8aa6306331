use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::{finalize_listing, ArchiveStorage};
use crate::archives::error::{ArchiveError, ArchiveResult};
use crate::archives::keys::{ArchiveKind, ArchiveObjectRef};
use crate::config::RemoteArchiveConfig;

/// One page of a prefix listing. `next_token` is set while the store reports more results.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next_token: Option<String>,
}

/// Minimal bucket API the remote backend needs. Implementations must map
/// "no such key" responses to [`ArchiveError::NotFound`].
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    async fn list_page(&self, prefix: &str, continuation: Option<String>) -> ArchiveResult<ListPage>;

    async fn get_object(&self, key: &str) -> ArchiveResult<Vec<u8>>;

    fn bucket(&self) -> &str;

    fn endpoint(&self) -> &str;
}

/// Archive storage over a bucket laid out as
/// `daily/{yyyymmdd}.br`, `matches/{id}.br`, `{entity}/indexBuild/{file}`,
/// `players/ts/{id}.br` and `players/photo/{id}.jpg`
#[derive(Clone)]
pub struct RemoteStorage {
    client: Arc<dyn ObjectStoreClient>,
}

impl RemoteStorage {
    pub fn new(client: Arc<dyn ObjectStoreClient>) -> Self {
        Self { client }
    }

    pub fn prefix_for(kind: ArchiveKind) -> String {
        match kind {
            ArchiveKind::Daily => "daily/".to_string(),
            ArchiveKind::MatchDetail => "matches/".to_string(),
            ArchiveKind::NameIndex(entity) => format!("{}/indexBuild/", entity),
            ArchiveKind::PlayerTimeSeries => "players/ts/".to_string(),
            ArchiveKind::PlayerPhoto => "players/photo/".to_string(),
        }
    }

    pub fn object_key(object: &ArchiveObjectRef) -> String {
        format!("{}{}", Self::prefix_for(object.kind()), object.file_name())
    }
}

#[async_trait]
impl ArchiveStorage for RemoteStorage {
    async fn list(&self, kind: ArchiveKind) -> ArchiveResult<Vec<String>> {
        let prefix = Self::prefix_for(kind);
        let mut names = Vec::new();
        let mut token: Option<String> = None;
        let mut seen = HashSet::new();
        let mut pages = 0usize;

        loop {
            let page = self.client.list_page(&prefix, token.clone()).await?;
            pages += 1;

            names.extend(
                page.keys
                    .into_iter()
                    .filter_map(|key| key.strip_prefix(prefix.as_str()).map(str::to_string)),
            );

            match page.next_token {
                // any earlier token, not just the previous one, means the store is cycling
                Some(next) if !seen.insert(next.clone()) => {
                    return Err(ArchiveError::storage(format!(
                        "listing {} revisited continuation token '{}' after {} page(s)",
                        prefix, next, pages
                    )));
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!("Listed {} objects under {} in {} page(s)", names.len(), prefix, pages);
        Ok(finalize_listing(kind, names))
    }

    async fn read(&self, object: &ArchiveObjectRef) -> ArchiveResult<Vec<u8>> {
        let key = Self::object_key(object);
        debug!("Fetching remote archive {}", key);
        self.client.get_object(&key).await
    }

    fn source(&self) -> &'static str {
        "remote"
    }

    fn describe(&self) -> serde_json::Value {
        json!({
            "bucket": self.client.bucket(),
            "endpoint": self.client.endpoint(),
        })
    }
}

/// S3-compatible client (Cloudflare R2 in production)
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    endpoint: String,
}

impl S3ObjectStore {
    pub fn new(config: &RemoteArchiveConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "bonzobyte-env",
        );

        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .endpoint_url(config.endpoint.clone())
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        info!("Remote archives: bucket '{}' at {}", config.bucket, config.endpoint);

        Self {
            client: aws_sdk_s3::Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
            endpoint: config.endpoint.clone(),
        }
    }
}

#[async_trait]
impl ObjectStoreClient for S3ObjectStore {
    async fn list_page(&self, prefix: &str, continuation: Option<String>) -> ArchiveResult<ListPage> {
        let out = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| ArchiveError::storage(format!("list {}: {}", prefix, DisplayErrorContext(&e))))?;

        let keys = out
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        let next_token = if out.is_truncated().unwrap_or(false) {
            out.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage { keys, next_token })
    }

    async fn get_object(&self, key: &str) -> ArchiveResult<Vec<u8>> {
        let out = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(out) => out,
            Err(err) => {
                let no_such_key = err.as_service_error().is_some_and(|e| e.is_no_such_key());
                let http_404 = err.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if no_such_key || http_404 {
                    return Err(ArchiveError::not_found(key));
                }
                return Err(ArchiveError::storage(format!("get {}: {}", key, DisplayErrorContext(&err))));
            }
        };

        let body = out
            .body
            .collect()
            .await
            .map_err(|e| ArchiveError::storage(format!("read body {}: {}", key, e)))?;

        Ok(body.into_bytes().to_vec())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
