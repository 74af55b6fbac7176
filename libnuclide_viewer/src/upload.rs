use base64::Engine;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

use super::constants::DEFAULT_MAX_UPLOAD_BYTES;
use super::error::UploadError;

/// A single uploaded file. The payload is shared, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub payload: Arc<[u8]>,
}

impl UploadedFile {
    pub fn new(name: &str, payload: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            payload: Arc::from(payload),
        }
    }

    /// Read a file from disk, keyed by its file name (not its full path)
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let name = path
            .file_name()
            .ok_or_else(|| UploadError::BadFilePath(path.to_path_buf()))?
            .to_string_lossy()
            .to_string();
        let payload = std::fs::read(path)?;
        Ok(Self::new(&name, payload))
    }

    /// Decode the `data:<mime>;base64,<content>` form produced by browser uploads
    pub fn from_data_url(name: &str, data_url: &str) -> Result<Self, UploadError> {
        let (header, content) = data_url
            .split_once(',')
            .ok_or_else(|| UploadError::MalformedDataUrl(name.to_string()))?;
        if !header.starts_with("data:") || !header.ends_with(";base64") {
            return Err(UploadError::MalformedDataUrl(name.to_string()));
        }
        let payload = base64::engine::general_purpose::STANDARD
            .decode(content.trim())
            .map_err(|e| UploadError::BadBase64(name.to_string(), e))?;
        Ok(Self::new(name, payload))
    }

    pub fn size_bytes(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Per-session store of uploads, keyed by file name.
///
/// Names keep the order in which they were first uploaded; re-uploading a name replaces
/// the payload in place. There is no removal.
#[derive(Debug, Clone)]
pub struct UploadStore {
    files: IndexMap<String, Arc<[u8]>>,
    max_upload_bytes: u64,
}

impl Default for UploadStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl UploadStore {
    pub fn new(max_upload_bytes: u64) -> Self {
        Self {
            files: IndexMap::new(),
            max_upload_bytes,
        }
    }

    /// Insert or overwrite the payload for `file.name`
    pub fn record(&mut self, file: UploadedFile) -> Result<(), UploadError> {
        let size = file.size_bytes();
        if size > self.max_upload_bytes {
            return Err(UploadError::TooLarge {
                name: file.name,
                size: human_bytes::human_bytes(size as f64),
                limit: human_bytes::human_bytes(self.max_upload_bytes as f64),
            });
        }
        let replaced = self.files.insert(file.name.clone(), file.payload).is_some();
        spdlog::info!(
            "{} upload {} ({})",
            if replaced { "Replaced" } else { "Recorded" },
            file.name,
            human_bytes::human_bytes(size as f64)
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<[u8]>> {
        self.files.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }
}
