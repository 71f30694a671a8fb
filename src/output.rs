use crate::error::RenderError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub const DEFAULT_PREVIEW_TTL: Duration = Duration::from_secs(60);
const PREVIEW_SCHEME: &str = "blob:ledgerpdf/";
const FALLBACK_FILE_STEM: &str = "document";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Keep the bytes in memory behind a short-lived handle.
    Preview,
    /// Write `<sanitized document number>.pdf` into `dir`.
    Persist { dir: PathBuf },
}

#[derive(Debug, Clone)]
pub enum RenderOutput {
    Preview(PreviewHandle),
    Persisted { path: PathBuf, bytes: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle {
    pub url: String,
    pub expires_at: Instant,
    pub bytes: usize,
}

struct PreviewEntry {
    data: Arc<Vec<u8>>,
    expires_at: Instant,
}

/// In-memory previews with a bounded lifetime. Expired entries are dropped
/// when read and on every publish.
#[derive(Clone)]
pub struct PreviewStore {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, PreviewEntry>>>,
    sequence: Arc<AtomicU64>,
}

impl Default for PreviewStore {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_TTL)
    }
}

impl PreviewStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PreviewEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn publish(&self, data: Vec<u8>) -> PreviewHandle {
        let now = Instant::now();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let url = format!("{}{}-{}", PREVIEW_SCHEME, digest_prefix(&data), seq);
        let expires_at = now + self.ttl;
        let bytes = data.len();
        let mut entries = self.lock();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            url.clone(),
            PreviewEntry {
                data: Arc::new(data),
                expires_at,
            },
        );
        PreviewHandle {
            url,
            expires_at,
            bytes,
        }
    }

    /// Returns the bytes behind a live handle. Reading an expired handle
    /// purges it.
    pub fn fetch(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.lock();
        let expired = entries.get(url)?.expires_at <= now;
        if expired {
            entries.remove(url);
            return None;
        }
        entries.get(url).map(|entry| Arc::clone(&entry.data))
    }

    pub fn revoke(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn digest_prefix(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

/// Replaces every character that is not ASCII alphanumeric, `-` or `_`.
pub fn sanitize_file_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.chars().all(|ch| ch == '_') {
        return FALLBACK_FILE_STEM.to_string();
    }
    cleaned
}

pub fn persisted_path(dir: &Path, document_number: &str) -> PathBuf {
    dir.join(format!("{}.pdf", sanitize_file_name(document_number)))
}

pub struct OutputFinalizer {
    store: PreviewStore,
}

impl OutputFinalizer {
    pub fn new(store: PreviewStore) -> Self {
        Self { store }
    }

    pub fn finalize(
        &self,
        data: Vec<u8>,
        mode: &OutputMode,
        document_number: &str,
    ) -> Result<RenderOutput, RenderError> {
        match mode {
            OutputMode::Preview => Ok(RenderOutput::Preview(self.store.publish(data))),
            OutputMode::Persist { dir } => {
                std::fs::create_dir_all(dir)?;
                let path = persisted_path(dir, document_number);
                std::fs::write(&path, &data)?;
                Ok(RenderOutput::Persisted {
                    path,
                    bytes: data.len(),
                })
            }
        }
    }
}
