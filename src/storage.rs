//! File storage for resumes and company logos.
//!
//! Objects live under `<root>/<bucket>/<user_id>/`. Logos are public and are
//! referenced by absolute path. Resumes are private: the profile stores a
//! bucket-relative key that must be resolved through [`ObjectStore::resolve`].

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::error::{HubError, HubResult};

const LOGO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Resume,
    Logo,
}

impl UploadKind {
    fn bucket(&self) -> &'static str {
        match self {
            UploadKind::Resume => "resumes",
            UploadKind::Logo => "logos",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// What the profile records: an absolute path for public objects, a
    /// storage key for private ones.
    pub reference: String,
    pub public: bool,
}

#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    resume_max_bytes: u64,
    logo_max_bytes: u64,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>, resume_max_bytes: u64, logo_max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            resume_max_bytes,
            logo_max_bytes,
        }
    }

    pub fn upload(&self, kind: UploadKind, user_id: &str, source: &Path) -> HubResult<StoredObject> {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let size = fs::metadata(source)?.len();

        match kind {
            UploadKind::Resume => {
                if ext != "pdf" || !has_pdf_magic(source)? {
                    return Err(HubError::Upload("Please upload a PDF file".to_string()));
                }
                if size > self.resume_max_bytes {
                    return Err(HubError::Upload(format!(
                        "Resume must be less than {}",
                        human_size(self.resume_max_bytes)
                    )));
                }
            }
            UploadKind::Logo => {
                if !LOGO_EXTENSIONS.contains(&ext.as_str()) {
                    return Err(HubError::Upload("Please upload an image file".to_string()));
                }
                if size > self.logo_max_bytes {
                    return Err(HubError::Upload(format!(
                        "Logo must be less than {}",
                        human_size(self.logo_max_bytes)
                    )));
                }
            }
        }

        if !is_plain_segment(user_id) {
            return Err(HubError::Upload("Invalid owner id".to_string()));
        }

        let key = format!("{}/{}/{}.{}", kind.bucket(), user_id, kind.bucket().trim_end_matches('s'), ext);
        let dest = self.root.join(&key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, &dest)?;
        tracing::info!(key = %key, bytes = size, "object stored");

        Ok(match kind {
            UploadKind::Resume => StoredObject {
                reference: key,
                public: false,
            },
            UploadKind::Logo => StoredObject {
                reference: dest.to_string_lossy().into_owned(),
                public: true,
            },
        })
    }

    /// Resolve a private storage key to a readable path inside the store.
    pub fn resolve(&self, key: &str) -> HubResult<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(HubError::Forbidden("Invalid storage key".to_string()));
        }
        let path = self.root.join(relative);
        if !path.is_file() {
            return Err(HubError::NotFound(format!("file '{}'", key)));
        }
        Ok(path)
    }
}

fn has_pdf_magic(path: &Path) -> HubResult<bool> {
    let mut header = [0u8; 4];
    let mut file = fs::File::open(path)?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(&header == b"%PDF"),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn is_plain_segment(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn human_size(bytes: u64) -> String {
    format!("{}MB", bytes / (1024 * 1024))
}
