//! Template reference resolution: explicit flag, latest release, or fallback

use super::fetcher::{TemplateFetcher, TemplateSource};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request timeout for release metadata, so discovery degrades quickly
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Release metadata file inside a local mirror directory
pub const LOCAL_RELEASE_FILE: &str = "latest.json";

/// Why version discovery fell back to the default reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWarning {
    pub reason: String,
}

impl fmt::Display for ReferenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not determine the latest template release: {}", self.reason)
    }
}

/// Where a resolved reference came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    Explicit,
    LatestRelease,
    Fallback(ReferenceWarning),
}

/// A tag, branch or commit, fixed for the rest of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub name: String,
    pub source: ReferenceSource,
}

impl ResolvedReference {
    pub fn warning(&self) -> Option<&ReferenceWarning> {
        match &self.source {
            ReferenceSource::Fallback(warning) => Some(warning),
            _ => None,
        }
    }
}

impl fmt::Display for ResolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

impl TemplateFetcher {
    /// Resolve the reference to fetch. Never fails: discovery problems fall
    /// back to `fallback` with a warning attached.
    pub async fn resolve_reference(&self, explicit: Option<&str>, fallback: &str) -> ResolvedReference {
        if let Some(reference) = explicit.map(str::trim).filter(|r| !r.is_empty()) {
            return ResolvedReference {
                name: reference.to_string(),
                source: ReferenceSource::Explicit,
            };
        }

        match self.latest_release_tag().await {
            Ok(tag) => {
                debug!(%tag, "resolved latest template release");
                ResolvedReference {
                    name: tag,
                    source: ReferenceSource::LatestRelease,
                }
            }
            Err(reason) => {
                warn!(%reason, fallback, "latest release lookup failed, using fallback");
                ResolvedReference {
                    name: fallback.to_string(),
                    source: ReferenceSource::Fallback(ReferenceWarning { reason }),
                }
            }
        }
    }

    async fn latest_release_tag(&self) -> std::result::Result<String, String> {
        let release: LatestRelease = match self.source() {
            TemplateSource::Remote(endpoints) => {
                let url = Self::build_url(
                    &endpoints.api,
                    &["repos", self.owner(), self.repo(), "releases", "latest"],
                )
                .map_err(|e| e.to_string())?;

                let response = self
                    .client()
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, "application/vnd.github+json")
                    .timeout(METADATA_TIMEOUT)
                    .send()
                    .await
                    .map_err(|e| format!("request to {} failed: {}", url, e))?;

                if !response.status().is_success() {
                    return Err(format!("{} returned HTTP {}", url, response.status()));
                }

                response
                    .json()
                    .await
                    .map_err(|e| format!("invalid release metadata from {}: {}", url, e))?
            }
            TemplateSource::Local(dir) => {
                let path = dir.join(LOCAL_RELEASE_FILE);
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
                serde_json::from_str(&content)
                    .map_err(|e| format!("invalid release metadata in {}: {}", path.display(), e))?
            }
        };

        let tag = release.tag_name.trim();
        if tag.is_empty() {
            return Err("latest release has an empty tag".to_string());
        }
        Ok(tag.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fetcher::test_support::{remote_fetcher, serve};
    use super::super::fetcher::RemoteEndpoints;
    use super::*;
    use url::Url;

    fn local_fetcher(dir: &std::path::Path) -> TemplateFetcher {
        TemplateFetcher::from_local(dir.to_path_buf(), "acme/starter", "test").unwrap()
    }

    #[tokio::test]
    async fn test_explicit_reference_wins() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = local_fetcher(dir.path())
            .resolve_reference(Some(" feature/login "), "v1.0.0")
            .await;
        assert_eq!(resolved.name, "feature/login");
        assert_eq!(resolved.source, ReferenceSource::Explicit);
    }

    #[tokio::test]
    async fn test_latest_release_from_local_mirror() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LOCAL_RELEASE_FILE),
            r#"{"tag_name":"v2.3.0","name":"Release 2.3.0"}"#,
        )
        .unwrap();

        let resolved = local_fetcher(dir.path()).resolve_reference(None, "v1.0.0").await;
        assert_eq!(resolved.name, "v2.3.0");
        assert_eq!(resolved.source, ReferenceSource::LatestRelease);
        assert!(resolved.warning().is_none());
    }

    #[tokio::test]
    async fn test_blank_explicit_reference_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = local_fetcher(dir.path()).resolve_reference(Some("  "), "v1.0.0").await;
        assert_eq!(resolved.name, "v1.0.0");
        assert!(resolved.warning().is_some());
    }

    #[tokio::test]
    async fn test_invalid_metadata_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCAL_RELEASE_FILE), "{ not json").unwrap();

        let resolved = local_fetcher(dir.path()).resolve_reference(None, "v1.0.0").await;
        assert_eq!(resolved.name, "v1.0.0");
        assert!(matches!(resolved.source, ReferenceSource::Fallback(_)));
    }

    #[tokio::test]
    async fn test_network_error_falls_back_with_warning() {
        let unreachable = Url::parse("http://127.0.0.1:9").unwrap();
        let source = TemplateSource::Remote(RemoteEndpoints {
            api: unreachable.clone(),
            archive: unreachable.clone(),
            raw: unreachable,
        });
        let fetcher = TemplateFetcher::new(source, "acme/starter", "test").unwrap();

        let resolved = fetcher.resolve_reference(None, "v1.0.0").await;
        assert_eq!(resolved.name, "v1.0.0");
        let warning = resolved.warning().expect("fallback should carry a warning");
        assert!(warning.reason.contains("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_latest_release_from_remote_api() {
        let body = br#"{"tag_name":"v3.1.0","name":"Templates 3.1.0","draft":false}"#;
        let base = serve("200 OK", body.to_vec()).await;

        let resolved = remote_fetcher(&base).resolve_reference(None, "v1.0.0").await;

        assert_eq!(resolved.name, "v3.1.0");
        assert_eq!(resolved.source, ReferenceSource::LatestRelease);
    }

    #[tokio::test]
    async fn test_rate_limited_api_falls_back() {
        let body = br#"{"message":"API rate limit exceeded"}"#;
        let base = serve("403 Forbidden", body.to_vec()).await;

        let resolved = remote_fetcher(&base).resolve_reference(None, "v1.0.0").await;

        assert_eq!(resolved.name, "v1.0.0");
        let warning = resolved.warning().expect("fallback should carry a warning");
        assert!(warning.reason.contains("403"));
        assert!(warning.reason.contains("/repos/acme/starter/releases/latest"));
    }
}
