//! Template archive fetching from remote (GitHub) or a local mirror directory
//!
//! Both sources produce a gzip-compressed tarball that is streamed straight
//! into the extractor:
//! - Remote: response chunks are forwarded through a bounded channel
//! - Local: `<dir>/<reference>.tar.gz` is read from disk
//!
//! Every entry loses the archive's single top-level wrapper directory.

use crate::config::Settings;
use crate::error::{Result, ScaffoldError};
use crate::product::ProductConfig;
use crate::scaffold::RollbackHandle;
use flate2::read::GzDecoder;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

/// Chunks buffered between the download and the extractor
const CHUNK_QUEUE_DEPTH: usize = 8;

/// Connect timeout applied to every request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote endpoints for one template repository
#[derive(Debug, Clone)]
pub struct RemoteEndpoints {
    /// Release metadata (`<api>/repos/<owner>/<repo>/releases/latest`)
    pub api: Url,
    /// Tarballs (`<archive>/<owner>/<repo>/tar.gz/<reference>`)
    pub archive: Url,
    /// Raw files (`<raw>/<owner>/<repo>/<reference>/<file>`)
    pub raw: Url,
}

/// Template source - either remote endpoints or a local mirror directory
#[derive(Debug, Clone)]
pub enum TemplateSource {
    Remote(RemoteEndpoints),
    /// Directory holding `latest.json`, `<reference>.tar.gz` and `.templateignore`
    Local(PathBuf),
}

impl TemplateSource {
    /// Create a template source from a product config and resolved settings
    pub fn from_settings<C: ProductConfig>(config: &C, settings: &Settings) -> Result<Self> {
        if let Some(dir) = &settings.template_dir {
            return Ok(Self::local(dir.clone()));
        }

        let endpoints = match &settings.template_url {
            Some(mirror) => RemoteEndpoints {
                api: mirror.clone(),
                archive: mirror.clone(),
                raw: mirror.clone(),
            },
            None => RemoteEndpoints {
                api: parse_base(config.api_base_url())?,
                archive: parse_base(config.archive_base_url())?,
                raw: parse_base(config.raw_base_url())?,
            },
        };
        Ok(Self::Remote(endpoints))
    }

    /// Create a local template source from a path
    pub fn local(path: PathBuf) -> Self {
        Self::Local(path)
    }
}

fn parse_base(url: &str) -> Result<Url> {
    Url::parse(url)
        .map_err(|e| ScaffoldError::validation(format!("Invalid template URL {}: {}", url, e)))
}

/// Template fetcher - retrieves release metadata, archives and ignore files
pub struct TemplateFetcher {
    source: TemplateSource,
    owner: String,
    repo: String,
    client: reqwest::Client,
}

impl TemplateFetcher {
    /// Create a new fetcher for `owner/repo` with a custom user agent
    pub fn new(source: TemplateSource, repository: &str, user_agent: &str) -> Result<Self> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| {
                ScaffoldError::validation(format!(
                    "Template repository must look like 'owner/repo', got '{}'",
                    repository
                ))
            })?;

        Ok(Self {
            source,
            owner: owner.to_string(),
            repo: repo.to_string(),
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        })
    }

    /// Create a fetcher from a product config and resolved settings
    pub fn from_settings<C: ProductConfig>(config: &C, settings: &Settings) -> Result<Self> {
        let source = TemplateSource::from_settings(config, settings)?;
        Self::new(source, config.template_repo(), config.user_agent())
    }

    /// Create a fetcher for a local mirror directory
    pub fn from_local(path: PathBuf, repository: &str, user_agent: &str) -> Result<Self> {
        Self::new(TemplateSource::local(path), repository, user_agent)
    }

    /// Get the template source
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub(crate) fn owner(&self) -> &str {
        &self.owner
    }

    pub(crate) fn repo(&self) -> &str {
        &self.repo
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Build a URL by appending path segments, preserving query parameters.
    /// Segments containing `/` are split so branch names stay readable.
    pub(crate) fn build_url(base: &Url, segments: &[&str]) -> Result<Url> {
        let mut url = base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ScaffoldError::Download {
                url: base.to_string(),
                reason: "URL cannot have path segments".to_string(),
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.extend(segment.split('/').filter(|s| !s.is_empty()));
            }
        }
        Ok(url)
    }

    /// Download the archive for `reference` and extract it into `dest`.
    ///
    /// Every write is taken under `rollback`, so extraction stops once the run
    /// is rolled back. Returns the number of files written.
    pub async fn fetch_into(
        &self,
        reference: &str,
        dest: &Path,
        rollback: &RollbackHandle,
    ) -> Result<usize> {
        {
            let _guard = rollback.hold()?;
            std::fs::create_dir_all(dest)?;
        }

        match &self.source {
            TemplateSource::Remote(endpoints) => {
                let url = Self::build_url(
                    &endpoints.archive,
                    &[&self.owner, &self.repo, "tar.gz", reference],
                )?;
                self.stream_remote(url, dest, rollback).await
            }
            TemplateSource::Local(dir) => {
                let archive_path = dir.join(format!("{}.tar.gz", reference.replace('/', "-")));
                let file = std::fs::File::open(&archive_path).map_err(|e| ScaffoldError::Download {
                    url: archive_path.display().to_string(),
                    reason: e.to_string(),
                })?;
                let dest = dest.to_path_buf();
                let rollback = rollback.clone();
                tokio::task::spawn_blocking(move || {
                    extract_tar_gz(BufReader::new(file), &dest, &rollback)
                })
                .await
                .map_err(ScaffoldError::extraction)?
            }
        }
    }

    /// Fetch a single text file from the template repository at `reference`.
    ///
    /// Errors are returned as a reason string; callers treat them as "absent".
    pub async fn fetch_raw_file(
        &self,
        reference: &str,
        file_name: &str,
    ) -> std::result::Result<String, String> {
        match &self.source {
            TemplateSource::Remote(endpoints) => {
                let url = Self::build_url(
                    &endpoints.raw,
                    &[&self.owner, &self.repo, reference, file_name],
                )
                .map_err(|e| e.to_string())?;
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| format!("request to {} failed: {}", url, e))?;
                if !response.status().is_success() {
                    return Err(format!("{} returned HTTP {}", url, response.status()));
                }
                response
                    .text()
                    .await
                    .map_err(|e| format!("failed to read {}: {}", url, e))
            }
            TemplateSource::Local(dir) => {
                let path = dir.join(file_name);
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| format!("failed to read {}: {}", path.display(), e))
            }
        }
    }

    async fn stream_remote(
        &self,
        url: Url,
        dest: &Path,
        rollback: &RollbackHandle,
    ) -> Result<usize> {
        debug!(%url, "downloading template archive");
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ScaffoldError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ScaffoldError::Download {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        if response.content_length() == Some(0) {
            return Err(ScaffoldError::Download {
                url: url.to_string(),
                reason: "response has no body".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel::<std::io::Result<Vec<u8>>>(CHUNK_QUEUE_DEPTH);
        let target = dest.to_path_buf();
        let rollback = rollback.clone();
        let extractor = tokio::task::spawn_blocking(move || {
            extract_tar_gz(ChunkReader::new(rx), &target, &rollback)
        });

        let mut received = 0usize;
        let mut transport_error = None;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    received += chunk.len();
                    // A closed channel means the extractor already stopped; its error wins.
                    if tx.send(Ok(chunk.to_vec())).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let reason = e.to_string();
                    let _ = tx
                        .send(Err(std::io::Error::other(reason.clone())))
                        .await;
                    transport_error = Some(reason);
                    break;
                }
            }
        }
        drop(tx);

        let extracted = extractor.await.map_err(ScaffoldError::extraction)?;
        if let Some(reason) = transport_error {
            return Err(ScaffoldError::Download {
                url: url.to_string(),
                reason,
            });
        }
        if received == 0 {
            return Err(ScaffoldError::Download {
                url: url.to_string(),
                reason: "response has no body".to_string(),
            });
        }
        extracted
    }
}

/// Blocking `Read` over chunks pushed by the download task
struct ChunkReader {
    rx: mpsc::Receiver<std::io::Result<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl ChunkReader {
    fn new(rx: mpsc::Receiver<std::io::Result<Vec<u8>>>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.pos >= self.chunk.len() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(0),
            }
        }

        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Extract a gzip-compressed tarball into `dest`, dropping the wrapper directory
pub fn extract_tar_gz<R: Read>(
    reader: R,
    dest: &Path,
    rollback: &RollbackHandle,
) -> Result<usize> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut written = 0;

    for entry in archive.entries().map_err(ScaffoldError::extraction)? {
        let mut entry = entry.map_err(ScaffoldError::extraction)?;
        let path = entry.path().map_err(ScaffoldError::extraction)?.into_owned();

        let Some(relative) = strip_wrapper(&path)? else {
            continue;
        };

        let entry_type = entry.header().entry_type();
        let target = dest.join(&relative);
        if entry_type.is_dir() {
            let _guard = rollback.hold()?;
            std::fs::create_dir_all(&target)?;
        } else if entry_type.is_file() {
            // Read the body before taking the guard; a stalled download must not block rollback.
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).map_err(|e| {
                ScaffoldError::extraction(format!("{}: {}", relative.display(), e))
            })?;
            let mode = entry.header().mode().ok();

            let _guard = rollback.hold()?;
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, &contents)?;
            apply_mode(&target, mode)?;
            written += 1;
        } else {
            debug!(path = %relative.display(), ?entry_type, "skipping archive entry");
        }
    }

    Ok(written)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    match mode {
        Some(mode) => {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o777))
        }
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> std::io::Result<()> {
    Ok(())
}

/// Remove the first path component; `None` for the wrapper itself
fn strip_wrapper(path: &Path) -> Result<Option<PathBuf>> {
    let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));

    match components.next() {
        Some(Component::Normal(_)) => {}
        None => return Ok(None),
        Some(_) => {
            return Err(ScaffoldError::extraction(format!(
                "unsafe path in archive: {}",
                path.display()
            )))
        }
    }

    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => {
                return Err(ScaffoldError::extraction(format!(
                    "unsafe path in archive: {}",
                    path.display()
                )))
            }
        }
    }

    Ok(if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::{remote_fetcher, serve, serve_raw, tarball, write_tarball};
    use super::*;

    #[test]
    fn test_build_url_appends_segments() {
        let base = Url::parse("https://codeload.github.com").unwrap();
        let url =
            TemplateFetcher::build_url(&base, &["acme", "starter", "tar.gz", "feature/login"])
                .unwrap();
        assert_eq!(
            url.as_str(),
            "https://codeload.github.com/acme/starter/tar.gz/feature/login"
        );
    }

    #[test]
    fn test_build_url_preserves_query() {
        let base = Url::parse("https://mirror.example.com/templates/?token=abc").unwrap();
        let url = TemplateFetcher::build_url(&base, &["acme", "starter"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://mirror.example.com/templates/acme/starter?token=abc"
        );
    }

    #[test]
    fn test_repository_must_be_owner_slash_repo() {
        let source = TemplateSource::local(PathBuf::from("."));
        assert!(TemplateFetcher::new(source.clone(), "acme/starter", "test").is_ok());
        assert!(TemplateFetcher::new(source.clone(), "starter", "test").is_err());
        assert!(TemplateFetcher::new(source, "acme/starter/extra", "test").is_err());
    }

    #[test]
    fn test_extract_strips_wrapper_directory() {
        let dest = tempfile::tempdir().unwrap();
        let bytes = tarball(
            "starter-1.2.0",
            &[
                ("package.json", b"{\"name\":\"starter\"}"),
                ("src/index.ts", b"export {};"),
            ],
        );

        let written = extract_tar_gz(bytes.as_slice(), dest.path(), &RollbackHandle::new()).unwrap();

        assert_eq!(written, 2);
        assert!(dest.path().join("package.json").is_file());
        assert!(dest.path().join("src/index.ts").is_file());
        assert!(!dest.path().join("starter-1.2.0").exists());
    }

    #[test]
    fn test_strip_wrapper_rejects_parent_components() {
        assert!(strip_wrapper(Path::new("wrapper/../escape.txt")).is_err());
        assert!(strip_wrapper(Path::new("/etc/passwd")).is_err());
        assert_eq!(strip_wrapper(Path::new("wrapper")).unwrap(), None);
        assert_eq!(strip_wrapper(Path::new("./wrapper/")).unwrap(), None);
        assert_eq!(
            strip_wrapper(Path::new("wrapper/a/b.txt")).unwrap(),
            Some(PathBuf::from("a/b.txt"))
        );
    }

    #[test]
    fn test_corrupt_archive_is_extraction_error() {
        let dest = tempfile::tempdir().unwrap();
        let err = extract_tar_gz(&b"definitely not gzip"[..], dest.path(), &RollbackHandle::new())
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_fetch_into_from_local_mirror() {
        let mirror = tempfile::tempdir().unwrap();
        write_tarball(
            mirror.path(),
            "v1.0.0",
            "starter-1.0.0",
            &[("README.md", b"# Starter")],
        );
        let work = tempfile::tempdir().unwrap();
        let dest = work.path().join("nested/my-app");

        let fetcher =
            TemplateFetcher::from_local(mirror.path().to_path_buf(), "acme/starter", "test")
                .unwrap();
        let written = fetcher
            .fetch_into("v1.0.0", &dest, &RollbackHandle::new())
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(
            std::fs::read_to_string(dest.join("README.md")).unwrap(),
            "# Starter"
        );
    }

    #[tokio::test]
    async fn test_fetch_into_missing_archive_is_download_error() {
        let mirror = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let fetcher =
            TemplateFetcher::from_local(mirror.path().to_path_buf(), "acme/starter", "test")
                .unwrap();
        let err = fetcher
            .fetch_into("v9.9.9", &work.path().join("app"), &RollbackHandle::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::Download { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_download_error() {
        let source = TemplateSource::Remote(RemoteEndpoints {
            api: Url::parse("http://127.0.0.1:9").unwrap(),
            archive: Url::parse("http://127.0.0.1:9").unwrap(),
            raw: Url::parse("http://127.0.0.1:9").unwrap(),
        });
        let fetcher = TemplateFetcher::new(source, "acme/starter", "test").unwrap();
        let work = tempfile::tempdir().unwrap();
        let err = fetcher
            .fetch_into("main", &work.path().join("app"), &RollbackHandle::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::Download { .. }));
    }

    #[test]
    fn test_extraction_stops_after_rollback() {
        let dest = tempfile::tempdir().unwrap();
        let bytes = tarball("starter-1.0.0", &[("package.json", b"{}")]);
        let rollback = RollbackHandle::new();
        rollback.rollback();

        let err = extract_tar_gz(bytes.as_slice(), dest.path(), &rollback).unwrap_err();

        assert!(matches!(err, ScaffoldError::Cancelled));
        assert!(!dest.path().join("package.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_keeps_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dest = tempfile::tempdir().unwrap();
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(9);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "starter/bin/dev", &b"#!/bin/sh"[..])
            .unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();

        extract_tar_gz(bytes.as_slice(), dest.path(), &RollbackHandle::new()).unwrap();

        let mode = std::fs::metadata(dest.path().join("bin/dev"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[tokio::test]
    async fn test_remote_archive_streamed_in_small_chunks() {
        let bytes = tarball(
            "acme-starter-4f2c1a9",
            &[
                ("package.json", b"{\"name\":\"starter\",\"version\":\"0.0.0\"}"),
                ("src/main.ts", b"console.log('hello from the starter template');"),
            ],
        );
        let base = serve("200 OK", bytes).await;
        let work = tempfile::tempdir().unwrap();
        let dest = work.path().join("app");

        let written = remote_fetcher(&base)
            .fetch_into("v1.0.0", &dest, &RollbackHandle::new())
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            std::fs::read_to_string(dest.join("src/main.ts")).unwrap(),
            "console.log('hello from the starter template');"
        );
        assert!(dest.join("package.json").is_file());
        assert!(!dest.join("acme-starter-4f2c1a9").exists());
    }

    #[tokio::test]
    async fn test_remote_not_found_is_download_error() {
        let base = serve("404 Not Found", b"Not Found".to_vec()).await;
        let work = tempfile::tempdir().unwrap();

        let err = remote_fetcher(&base)
            .fetch_into("v0.0.1", &work.path().join("app"), &RollbackHandle::new())
            .await
            .unwrap_err();

        match err {
            ScaffoldError::Download { url, reason } => {
                assert!(url.ends_with("/acme/starter/tar.gz/v0.0.1"));
                assert!(reason.contains("404"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_remote_empty_body_is_download_error() {
        let base = serve("200 OK", Vec::new()).await;
        let work = tempfile::tempdir().unwrap();

        let err = remote_fetcher(&base)
            .fetch_into("v1.0.0", &work.path().join("app"), &RollbackHandle::new())
            .await
            .unwrap_err();

        match err {
            ScaffoldError::Download { reason, .. } => assert_eq!(reason, "response has no body"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_remote_empty_body_without_length_is_download_error() {
        let base = serve_raw(
            "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_string(),
            Vec::new(),
        )
        .await;
        let work = tempfile::tempdir().unwrap();

        let err = remote_fetcher(&base)
            .fetch_into("v1.0.0", &work.path().join("app"), &RollbackHandle::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScaffoldError::Download { .. }));
    }

    #[tokio::test]
    async fn test_remote_raw_file() {
        let base = serve("200 OK", b"*.test.ts\ndocs/\n".to_vec()).await;

        let text = remote_fetcher(&base)
            .fetch_raw_file("v1.0.0", ".templateignore")
            .await
            .unwrap();

        assert_eq!(text, "*.test.ts\ndocs/\n");
    }
}
