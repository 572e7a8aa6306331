use anyhow::Context;
use serde_json::Value;
use std::time::Duration;

/// Thin HTTP client for the /api/archives routes
pub struct ArchiveClient {
    http: reqwest::Client,
    base: url::Url,
}

/// What the server said, including 423 lock outcomes which are not failures
#[derive(Debug)]
pub enum ArchiveReply {
    Ok(Value),
    Locked(Value),
}

impl ArchiveClient {
    pub fn new(server: &str) -> anyhow::Result<Self> {
        let mut base = url::Url::parse(server).with_context(|| format!("invalid server URL '{}'", server))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http, base })
    }

    pub fn url_for(&self, path: &str) -> anyhow::Result<url::Url> {
        self.base
            .join(&format!("api/archives/{}", path.trim_start_matches('/')))
            .with_context(|| format!("invalid archive path '{}'", path))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> anyhow::Result<ArchiveReply> {
        let url = self.url_for(path)?;
        let mut request = self.http.get(url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("{} returned a non-JSON body", url))?;

        if status.is_success() {
            Ok(ArchiveReply::Ok(body))
        } else if status == reqwest::StatusCode::LOCKED {
            Ok(ArchiveReply::Locked(body))
        } else {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            anyhow::bail!("{} ({})", message, status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_archive_paths() {
        let client = ArchiveClient::new("http://localhost:5000").unwrap();
        assert_eq!(
            client.url_for("daily/20250601").unwrap().as_str(),
            "http://localhost:5000/api/archives/daily/20250601"
        );

        let prefixed = ArchiveClient::new("https://example.com/backend").unwrap();
        assert_eq!(
            prefixed.url_for("/status").unwrap().as_str(),
            "https://example.com/backend/api/archives/status"
        );
    }

    #[test]
    fn rejects_bad_server_url() {
        assert!(ArchiveClient::new("not a url").is_err());
    }
}
