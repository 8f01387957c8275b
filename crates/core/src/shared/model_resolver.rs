use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use reqwest::blocking::Response;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("access to {url} was refused (status {status}); check the access token")]
    Unauthorized { url: String, status: u16 },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model {0} is not cached and has no download location")]
    NotFound(String),
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Where a model file lives and how to fetch it.
#[derive(Clone, Copy, Debug)]
pub struct ModelRequest<'a> {
    /// Path relative to the cache root, e.g. `alignment/fr/model.onnx`.
    pub name: &'a str,
    pub url: Option<&'a str>,
    pub bundled_dir: Option<&'a Path>,
    /// Sent as a bearer token when downloading gated models.
    pub auth_token: Option<&'a str>,
}

impl<'a> ModelRequest<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            url: None,
            bundled_dir: None,
            auth_token: None,
        }
    }

    pub fn with_url(mut self, url: Option<&'a str>) -> Self {
        self.url = url;
        self
    }

    pub fn with_bundled_dir(mut self, dir: Option<&'a Path>) -> Self {
        self.bundled_dir = dir;
        self
    }

    pub fn with_auth_token(mut self, token: Option<&'a str>) -> Self {
        self.auth_token = token;
        self
    }
}

/// Resolve a model file by name, checking cache locations before downloading.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. Bundled path (a user-supplied models directory)
/// 3. Download from URL to cache
pub fn resolve(request: &ModelRequest<'_>) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    resolve_in(&cache_dir, request)
}

/// Same as [`resolve`] with an explicit cache root.
pub fn resolve_in(cache_dir: &Path, request: &ModelRequest<'_>) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(request.name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = request.bundled_dir {
        let bundled_path = dir.join(request.name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    let url = request
        .url
        .ok_or_else(|| ModelResolveError::NotFound(request.name.to_string()))?;
    let parent = cached_path.parent().unwrap_or(cache_dir);
    fs::create_dir_all(parent).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {url}", request.name);
    download(url, &cached_path, request.auth_token)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Parley/models/`
/// - Linux: `$XDG_CACHE_HOME/Parley/models/` or `~/.cache/Parley/models/`
/// - Windows: `%LOCALAPPDATA%/Parley/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Parley").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Parley").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

/// Stream `url` into a sibling `.part` file, then rename it into place.
fn download(url: &str, dest: &Path, auth_token: Option<&str>) -> Result<(), ModelResolveError> {
    let part = dest.with_extension("part");
    let result = fetch(url, auth_token).and_then(|mut response| {
        let write_err = |source| ModelResolveError::Write {
            path: part.clone(),
            source,
        };
        let file = fs::File::create(&part).map_err(write_err)?;
        let mut sink = ProgressWriter::new(file, url, response.content_length());
        io::copy(&mut response, &mut sink).map_err(write_err)?;
        sink.into_inner().sync_all().map_err(write_err)?;
        fs::rename(&part, dest).map_err(|source| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn fetch(url: &str, auth_token: Option<&str>) -> Result<Response, ModelResolveError> {
    let mut request = reqwest::blocking::Client::new().get(url);
    if let Some(token) = auth_token {
        request = request.bearer_auth(token);
    }
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };

    let response = request.send().map_err(download_err)?;
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ModelResolveError::Unauthorized {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.error_for_status().map_err(download_err)
}

/// Logs download progress at every tenth of the expected size.
struct ProgressWriter<'a, W> {
    inner: W,
    url: &'a str,
    total: Option<u64>,
    written: u64,
    reported_tenths: u64,
}

impl<'a, W: Write> ProgressWriter<'a, W> {
    fn new(inner: W, url: &'a str, total: Option<u64>) -> Self {
        Self {
            inner,
            url,
            total: total.filter(|&t| t > 0),
            written: 0,
            reported_tenths: 0,
        }
    }

    fn into_inner(self) -> W {
        log::debug!("Downloaded {} bytes from {}", self.written, self.url);
        self.inner
    }
}

impl<W: Write> Write for ProgressWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if let Some(total) = self.total {
            let tenths = self.written * 10 / total;
            if tenths > self.reported_tenths {
                self.reported_tenths = tenths;
                log::info!("Downloading {}: {}%", self.url, tenths.min(10) * 10);
            }
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
