#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

use gateclear_contracts::ContractViolation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub blob_ref: String,
    pub size_bytes: u64,
}

#[derive(Debug)]
pub enum UploadError {
    InvalidRequest(&'static str),
    InvalidEndpoint(String),
    Transport(String),
    RejectedStatus(u16),
    Io(std::io::Error),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest(reason) => write!(f, "invalid upload request: {reason}"),
            Self::InvalidEndpoint(url) => write!(f, "invalid upload endpoint: {url}"),
            Self::Transport(err) => write!(f, "upload transport error: {err}"),
            Self::RejectedStatus(code) => write!(f, "upload rejected with status {code}"),
            Self::Io(err) => write!(f, "upload io error: {err}"),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<std::io::Error> for UploadError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Blob-store seam. Implementations persist the bytes and return a stable
/// reference; retry/timeout policy is the implementation's concern.
pub trait DocumentUploader {
    fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError>;
}

impl<U: DocumentUploader + ?Sized> DocumentUploader for Box<U> {
    fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        (**self).upload(request)
    }
}

fn validate_request(request: &UploadRequest) -> Result<(), UploadError> {
    if request.bytes.is_empty() {
        return Err(UploadError::InvalidRequest("bytes must not be empty"));
    }
    if request.filename.trim().is_empty() || request.filename.contains('/') {
        return Err(UploadError::InvalidRequest("filename must be a bare name"));
    }
    if request.mime_type.trim().is_empty() {
        return Err(UploadError::InvalidRequest("mime type must not be empty"));
    }
    Ok(())
}

pub fn sha256_hex16(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(16);
    for b in &digest[..8] {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// The blob store's timeout/retry policy is not pinned down upstream, so it
/// is an explicit, documented knob here: one bounded-timeout attempt plus at
/// most one retry on transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub timeout_ms: u32,
    pub retry_once: bool,
}

impl UploadPolicy {
    pub fn v1(timeout_ms: u32, retry_once: bool) -> Result<Self, ContractViolation> {
        if !(100..=120_000).contains(&timeout_ms) {
            return Err(ContractViolation::InvalidValue {
                field: "upload_policy.timeout_ms",
                reason: "must be within 100..=120000",
            });
        }
        Ok(Self {
            timeout_ms,
            retry_once,
        })
    }

    pub fn mvp_v1() -> Self {
        Self {
            timeout_ms: 10_000,
            retry_once: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UploadResponseBody {
    blob_ref: Option<String>,
}

/// HTTP PUT uploader. Objects are content-addressed by a sha256 prefix so a
/// retried upload of identical bytes lands on the same key.
#[derive(Debug, Clone)]
pub struct HttpBlobUploader {
    base_url: Url,
    policy: UploadPolicy,
    agent: ureq::Agent,
}

impl HttpBlobUploader {
    pub fn new(base_url: &str, policy: UploadPolicy) -> Result<Self, UploadError> {
        let parsed = Url::parse(base_url)
            .map_err(|_| UploadError::InvalidEndpoint(base_url.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(UploadError::InvalidEndpoint(base_url.to_string()));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(u64::from(policy.timeout_ms)))
            .build();
        Ok(Self {
            base_url: parsed,
            policy,
            agent,
        })
    }

    fn object_url(&self, request: &UploadRequest) -> Result<Url, UploadError> {
        let key = format!("{}-{}", sha256_hex16(&request.bytes), request.filename);
        self.base_url
            .join(&key)
            .map_err(|_| UploadError::InvalidEndpoint(self.base_url.to_string()))
    }

    fn put_once(&self, url: &Url, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        let response = self
            .agent
            .put(url.as_str())
            .set("Content-Type", &request.mime_type)
            .send_bytes(&request.bytes);
        match response {
            Ok(resp) => {
                let fallback = url.to_string();
                let body: UploadResponseBody = resp
                    .into_string()
                    .ok()
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .unwrap_or_default();
                Ok(UploadReceipt {
                    blob_ref: body.blob_ref.unwrap_or(fallback),
                    size_bytes: request.bytes.len() as u64,
                })
            }
            Err(ureq::Error::Status(code, _)) => Err(UploadError::RejectedStatus(code)),
            Err(ureq::Error::Transport(err)) => Err(UploadError::Transport(err.to_string())),
        }
    }
}

impl DocumentUploader for HttpBlobUploader {
    fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        validate_request(request)?;
        let url = self.object_url(request)?;
        match self.put_once(&url, request) {
            Err(UploadError::Transport(_)) if self.policy.retry_once => {
                self.put_once(&url, request)
            }
            other => other,
        }
    }
}

/// Filesystem-backed uploader for local runs and tests: the blob store is a
/// directory and the blob ref is the written path.
#[derive(Debug, Clone)]
pub struct LocalDirUploader {
    dir: PathBuf,
}

impl LocalDirUploader {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl DocumentUploader for LocalDirUploader {
    fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        validate_request(request)?;
        fs::create_dir_all(&self.dir)?;
        let key = format!("{}-{}", sha256_hex16(&request.bytes), request.filename);
        let path = self.dir.join(&key);
        fs::write(&path, &request.bytes)?;
        Ok(UploadReceipt {
            blob_ref: path.to_string_lossy().into_owned(),
            size_bytes: request.bytes.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(1);
        std::env::temp_dir().join(format!("gateclear-upload-test-{name}-{suffix}"))
    }

    #[test]
    fn at_up_01_local_uploads_are_content_addressed_and_stable() {
        let dir = temp_dir("stable");
        let uploader = LocalDirUploader::new(dir.clone());
        let request = UploadRequest {
            bytes: b"form bytes".to_vec(),
            filename: "form.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
        };
        let first = uploader.upload(&request).unwrap();
        let second = uploader.upload(&request).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.size_bytes, 10);
        assert!(std::path::Path::new(&first.blob_ref).exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn at_up_02_empty_and_pathy_requests_are_rejected() {
        let uploader = LocalDirUploader::new(temp_dir("reject"));
        let empty = UploadRequest {
            bytes: Vec::new(),
            filename: "form.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
        };
        assert!(matches!(
            uploader.upload(&empty),
            Err(UploadError::InvalidRequest(_))
        ));
        let pathy = UploadRequest {
            bytes: b"x".to_vec(),
            filename: "../escape.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
        };
        assert!(matches!(
            uploader.upload(&pathy),
            Err(UploadError::InvalidRequest(_))
        ));
    }

    #[test]
    fn at_up_03_policy_bounds_are_enforced() {
        assert!(UploadPolicy::v1(10_000, true).is_ok());
        assert!(UploadPolicy::v1(50, true).is_err());
        assert!(UploadPolicy::v1(500_000, false).is_err());
        assert!(HttpBlobUploader::new("not a url", UploadPolicy::mvp_v1()).is_err());
        assert!(HttpBlobUploader::new("https://blobs.example/v1/", UploadPolicy::mvp_v1()).is_ok());
    }
}
