//! Cover art resolution.
//!
//! A cover is resolved once per directory and reused for every file in it:
//! try the configured URL first, fall back to the fixed local candidate
//! list on any network or decode failure. Downloaded images are validated
//! by decoding before use and staged in temporary files that disappear
//! with the resolver.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::COVER_CANDIDATES;

/// Downloads larger than this are rejected outright.
const MAX_DOWNLOAD_BYTES: u64 = 32 * 1024 * 1024;

/// Content types accepted from a cover URL, with the extension used for
/// the staged file.
const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
];

/// Errors from cover resolution. These never fail a batch; the caller
/// falls back to the local search and ultimately to a Skip.
#[derive(Error, Debug)]
pub enum CoverError {
    #[error("download failed: {0}")]
    Fetch(String),

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("image did not decode: {0}")]
    Decode(String),

    #[error("I/O error while staging cover: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cover operations.
pub type CoverResult<T> = Result<T, CoverError>;

/// HTTP client for cover downloads.
pub struct CoverFetcher {
    agent: ureq::Agent,
    user_agent: String,
    timeout: Duration,
}

impl CoverFetcher {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(timeout)
            .build();
        Self {
            agent,
            user_agent: user_agent.into(),
            timeout,
        }
    }

    /// Download a cover image and validate it decodes.
    ///
    /// Returns the raw bytes and the extension derived from the response
    /// content type (or, failing that, the URL path).
    pub fn download(&self, url: &str) -> CoverResult<(Vec<u8>, &'static str)> {
        tracing::debug!("Downloading cover from {}", url);

        let response = self
            .agent
            .get(url)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .call()
            .map_err(|e| CoverError::Fetch(e.to_string()))?;

        let content_type = response
            .header("Content-Type")
            .unwrap_or("")
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        let extension = accepted_extension(&content_type)
            .or_else(|| extension_from_url(url))
            .ok_or(CoverError::UnsupportedType(content_type))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_DOWNLOAD_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| CoverError::Fetch(e.to_string()))?;

        image::load_from_memory(&bytes).map_err(|e| CoverError::Decode(e.to_string()))?;

        Ok((bytes, extension))
    }

    /// Resolve a VGMdb album page to its cover image URL.
    ///
    /// Fetches the page and pulls the `og:image` meta content out of the
    /// HTML with a plain scan.
    pub fn resolve_vgmdb_cover(&self, page_url: &str) -> CoverResult<String> {
        tracing::debug!("Resolving VGMdb cover from {}", page_url);

        let response = self
            .agent
            .get(page_url)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .call()
            .map_err(|e| CoverError::Fetch(e.to_string()))?;

        let mut html = String::new();
        response
            .into_reader()
            .take(MAX_DOWNLOAD_BYTES)
            .read_to_string(&mut html)
            .map_err(|e| CoverError::Fetch(e.to_string()))?;

        extract_og_image(&html)
            .ok_or_else(|| CoverError::Fetch("page has no og:image meta tag".to_string()))
    }
}

/// Whether a URL points at a VGMdb album page rather than an image.
pub fn is_vgmdb_album_url(url: &str) -> bool {
    url.contains("vgmdb.net/album/")
}

fn accepted_extension(content_type: &str) -> Option<&'static str> {
    ACCEPTED_TYPES
        .iter()
        .find(|(ct, _)| *ct == content_type)
        .map(|(_, ext)| *ext)
}

fn extension_from_url(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next()?;
    let ext = path.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("png"),
        "jpg" | "jpeg" => Some("jpg"),
        "webp" => Some("webp"),
        _ => None,
    }
}

/// Pull the content of `<meta property="og:image" content="...">`.
fn extract_og_image(html: &str) -> Option<String> {
    for chunk in html.split("<meta").skip(1) {
        let tag = match chunk.find('>') {
            Some(end) => &chunk[..end],
            None => continue,
        };
        if !tag.contains("og:image") {
            continue;
        }
        let rest = match tag.find("content=") {
            Some(start) => &tag[start + "content=".len()..],
            None => continue,
        };
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => continue,
        };
        let value = &rest[1..];
        if let Some(end) = value.find(quote) {
            let url = value[..end].trim();
            if !url.is_empty() {
                return Some(url.to_string());
            }
        }
    }
    None
}

/// First matching local cover file in a directory, in fixed search order.
pub fn find_local_cover(dir: &Path) -> Option<PathBuf> {
    COVER_CANDIDATES.iter().map(|name| dir.join(name)).find(|p| p.is_file())
}

/// A cover usable for embedding.
enum ResolvedCover {
    /// Local file found by the fallback search.
    Local(PathBuf),
    /// Downloaded image staged in a temp file; removed when the resolver
    /// is dropped.
    Downloaded(NamedTempFile),
}

impl ResolvedCover {
    fn path(&self) -> PathBuf {
        match self {
            Self::Local(path) => path.clone(),
            Self::Downloaded(staged) => staged.path().to_path_buf(),
        }
    }
}

/// Per-directory cover cache for one batch (resolve-once, embed-many).
pub struct CoverResolver {
    fetcher: CoverFetcher,
    url: Option<String>,
    cache: Mutex<HashMap<PathBuf, Option<ResolvedCover>>>,
}

impl CoverResolver {
    pub fn new(fetcher: CoverFetcher, url: Option<String>) -> Self {
        Self {
            fetcher,
            url,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the cover for a directory.
    ///
    /// Returns the path to an image file, or `None` when neither the URL
    /// nor the local search yields one. The result (including `None`) is
    /// cached per directory for the life of the resolver.
    pub fn resolve(&self, dir: &Path) -> Option<PathBuf> {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get(dir) {
            return entry.as_ref().map(ResolvedCover::path);
        }

        let resolved = self.resolve_uncached(dir);
        let path = resolved.as_ref().map(ResolvedCover::path);
        cache.insert(dir.to_path_buf(), resolved);
        path
    }

    fn resolve_uncached(&self, dir: &Path) -> Option<ResolvedCover> {
        if let Some(url) = &self.url {
            match self.try_download(url, dir) {
                Ok(staged) => return Some(ResolvedCover::Downloaded(staged)),
                Err(e) => {
                    tracing::warn!("Cover download failed ({}), trying local files", e);
                }
            }
        }

        find_local_cover(dir).map(ResolvedCover::Local)
    }

    fn try_download(&self, url: &str, dir: &Path) -> CoverResult<NamedTempFile> {
        let image_url = if is_vgmdb_album_url(url) {
            self.fetcher.resolve_vgmdb_cover(url)?
        } else {
            url.to_string()
        };

        let (bytes, extension) = self.fetcher.download(&image_url)?;

        let mut staged = tempfile::Builder::new()
            .prefix(".atk-cover-")
            .suffix(&format!(".{extension}"))
            .tempfile_in(dir)?;
        staged.write_all(&bytes)?;
        staged.flush()?;

        Ok(staged)
    }
}
