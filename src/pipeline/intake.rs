//! File intake: turn user-selected files into base64 [`UploadedFile`]s.
//!
//! Only images and PDF documents are accepted. The MIME type is taken from
//! the file's magic bytes when they are recognisable and from the extension
//! otherwise, so a scan saved as `paper.dat` still goes out as `image/jpeg`.
//! Inputs may be local paths or HTTP(S) URLs; URLs are fetched into memory.

use crate::error::PyqError;
use crate::progress::ProgressCallback;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// One exam paper ready to be sent: name, MIME type and base64 payload.
///
/// Immutable once built; the session drops it on reset or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    name: String,
    mime_type: String,
    base64_payload: String,
}

impl UploadedFile {
    /// Build from already-encoded parts.
    ///
    /// Rejects an empty payload and anything that is not an image or PDF.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        base64_payload: impl Into<String>,
    ) -> Result<Self, PyqError> {
        let name = name.into();
        let mime_type = mime_type.into();
        let base64_payload = base64_payload.into();
        if !is_supported_mime(&mime_type) {
            return Err(PyqError::UnsupportedFileType { name });
        }
        if base64_payload.is_empty() {
            return Err(PyqError::EmptyFile { name });
        }
        Ok(Self {
            name,
            mime_type,
            base64_payload,
        })
    }

    /// Detect the MIME type of `bytes` and base64-encode them.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, PyqError> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(PyqError::EmptyFile { name });
        }
        let mime = detect_mime(&name, bytes).ok_or_else(|| PyqError::UnsupportedFileType {
            name: name.clone(),
        })?;
        let payload = STANDARD.encode(bytes);
        debug!("Encoded '{}' ({}) → {} bytes base64", name, mime, payload.len());
        Ok(Self {
            name,
            mime_type: mime.to_string(),
            base64_payload: payload,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn base64_payload(&self) -> &str {
        &self.base64_payload
    }

    /// `data:<mime>;base64,<payload>`, the form a browser file reader yields.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_payload)
    }

    /// Size of the decoded payload in bytes, computed from the base64 length.
    pub fn size_bytes(&self) -> u64 {
        let len = self.base64_payload.len() as u64;
        let padding = self
            .base64_payload
            .bytes()
            .rev()
            .take_while(|&b| b == b'=')
            .count() as u64;
        ((len / 4) * 3).saturating_sub(padding.min(2))
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == "application/pdf"
    }
}

/// Ordered list of files waiting to be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQueue {
    files: Vec<UploadedFile>,
}

impl FileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    /// Remove the file at `index`, keeping the relative order of the rest.
    pub fn remove(&mut self, index: usize) -> Result<UploadedFile, PyqError> {
        if index >= self.files.len() {
            return Err(PyqError::FileIndexOutOfRange {
                index,
                len: self.files.len(),
            });
        }
        Ok(self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn as_slice(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadedFile> {
        self.files.iter()
    }
}

impl From<Vec<UploadedFile>> for FileQueue {
    fn from(files: Vec<UploadedFile>) -> Self {
        Self { files }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// True for `image/*` and `application/pdf`.
pub fn is_supported_mime(mime: &str) -> bool {
    mime == "application/pdf" || (mime.starts_with("image/") && mime.len() > "image/".len())
}

/// Work out the MIME type from magic bytes, falling back to the extension.
pub fn detect_mime(name: &str, bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF") {
        return Some("application/pdf");
    }
    if let Ok(format) = image::guess_format(bytes) {
        let mime = format.to_mime_type();
        if is_supported_mime(mime) {
            return Some(mime);
        }
    }
    mime_from_extension(name)
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())?;
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => return None,
    };
    Some(mime)
}

/// Load every input (path or URL) concurrently, preserving the given order.
pub async fn load_inputs(
    inputs: &[String],
    download_timeout_secs: u64,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<UploadedFile>, PyqError> {
    if inputs.is_empty() {
        return Err(PyqError::NoFiles);
    }
    let total = inputs.len();
    let files = try_join_all(inputs.iter().enumerate().map(|(i, input)| async move {
        let file = load_input(input, download_timeout_secs).await?;
        if let Some(cb) = progress {
            cb.on_file_loaded(i + 1, total, file.name(), file.size_bytes());
        }
        Ok::<_, PyqError>(file)
    }))
    .await?;
    info!("Loaded {} files", files.len());
    Ok(files)
}

/// Load a single local path or URL.
pub async fn load_input(input: &str, download_timeout_secs: u64) -> Result<UploadedFile, PyqError> {
    if is_url(input) {
        download_url(input, download_timeout_secs).await
    } else {
        load_file(input).await
    }
}

/// Read a local file and encode it.
pub async fn load_file(path: impl AsRef<Path>) -> Result<UploadedFile, PyqError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => PyqError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => PyqError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;
    let name = file_name(path);
    debug!("Read '{}' ({} bytes)", path.display(), bytes.len());
    UploadedFile::from_bytes(name, &bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedFile, PyqError> {
    info!("Downloading exam paper from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PyqError::Transport {
            message: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PyqError::ApiTimeout { secs: timeout_secs }
        } else {
            PyqError::Transport {
                message: format!("download of '{url}' failed: {e}"),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PyqError::Transport {
            message: format!("download of '{url}' failed: HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| PyqError::Transport {
        message: format!("download of '{url}' failed: {e}"),
    })?;

    UploadedFile::from_bytes(filename_from_url(url), &bytes)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}

/// Last non-empty path segment of a URL, or a generic name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded-paper".to_string()
}
