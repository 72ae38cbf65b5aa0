//! Local collaborator adapters
//!
//! Filesystem-backed persistence and evidence storage plus a notifier that
//! turns notifications into tracing events. Enough to run the engine without
//! any remote service.

use crate::collaborators::{EvidenceUpload, FileStorage, NotificationLevel, NotificationSink, StoredFile};
use assess_commit::{CollaboratorError, SnapshotStore};
use assess_state::{AssessmentId, AssessmentSnapshot, EvidenceId};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// One pretty-printed JSON file per assessment
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write never leaves a truncated snapshot behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `root` (created on first save)
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the snapshots
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for an assessment
    #[must_use]
    pub fn path_for(&self, id: &AssessmentId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Read a snapshot back, `None` if it was never saved
    ///
    /// # Errors
    /// I/O or decoding failures
    pub async fn load(&self, id: &AssessmentId) -> Result<Option<AssessmentSnapshot>, CollaboratorError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot))
    }
}

/// Decode a snapshot file written by [`JsonFileStore`]
///
/// # Errors
/// I/O or decoding failures
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<AssessmentSnapshot, CollaboratorError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn save(&self, snapshot: &AssessmentSnapshot) -> Result<(), CollaboratorError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(&snapshot.assessment_id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

/// Evidence storage addressed by the blake3 digest of the content
///
/// Identical bytes map to the same file and the same evidence id.
#[derive(Debug, Clone)]
pub struct ContentAddressedStorage {
    root: PathBuf,
}

impl ContentAddressedStorage {
    /// Storage rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Hex digest of `bytes`
    #[must_use]
    pub fn digest(bytes: &[u8]) -> String {
        hex::encode(blake3::hash(bytes).as_bytes())
    }

    /// On-disk location for a digest (`<root>/<2 hex>/<rest>`)
    #[must_use]
    pub fn path_for(&self, digest: &str) -> PathBuf {
        let (prefix, rest) = digest.split_at(2.min(digest.len()));
        self.root.join(prefix).join(rest)
    }
}

#[async_trait]
impl FileStorage for ContentAddressedStorage {
    async fn upload(&self, file: EvidenceUpload) -> Result<StoredFile, CollaboratorError> {
        if file.bytes.is_empty() {
            return Err(CollaboratorError::Rejected(format!("{} is empty", file.name)));
        }
        let digest = Self::digest(&file.bytes);
        let path = self.path_for(&digest);

        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(%digest, "evidence content already stored");
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &file.bytes).await?;
        }

        Ok(StoredFile {
            id: EvidenceId::new(format!("ev-{}", &digest[..16])),
            name: file.name,
            url: format!("file://{}", path.display()),
            size: file.bytes.len() as u64,
            mime_type: file.mime_type,
            uploaded_at: Utc::now(),
        })
    }
}

/// Notifications as tracing events on the `assess::notify` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Error => tracing::error!(target: "assess::notify", "{message}"),
            NotificationLevel::Warning => tracing::warn!(target: "assess::notify", "{message}"),
            NotificationLevel::Success | NotificationLevel::Info => {
                tracing::info!(target: "assess::notify", %level, "{message}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_state::{
        AssessmentStatus, Completion, EvidenceLibrary, ResponseStore, SessionTiming, SnapshotHeader,
    };

    fn snapshot() -> AssessmentSnapshot {
        AssessmentSnapshot::assemble(
            SnapshotHeader {
                assessment_id: AssessmentId::new(),
                framework_id: "fw".into(),
                framework_version: "1".into(),
                status: AssessmentStatus::InProgress,
            },
            &ResponseStore::new(),
            &EvidenceLibrary::new(),
            Completion::new(0, 2),
            SessionTiming::starting_now(),
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn json_store_round_trips_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("snapshots"));
        let mut snap = snapshot();

        assert!(store.load(&snap.assessment_id).await.unwrap().is_none());
        store.save(&snap).await.unwrap();

        snap.answered_count = 1;
        snap.progress_percentage = 50;
        store.save(&snap).await.unwrap();

        let loaded = store.load(&snap.assessment_id).await.unwrap().unwrap();
        assert_eq!(loaded, snap);
        assert_eq!(read_snapshot(store.path_for(&snap.assessment_id)).unwrap(), snap);
        assert!(!store.path_for(&snap.assessment_id).with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let id = AssessmentId::new();
        std::fs::write(store.path_for(&id), b"{ not json").unwrap();
        assert!(matches!(
            store.load(&id).await,
            Err(CollaboratorError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn content_addressing_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ContentAddressedStorage::new(dir.path());

        let a = storage
            .upload(EvidenceUpload::new("policy.pdf", "application/pdf", b"policy v1".to_vec()))
            .await
            .unwrap();
        let b = storage
            .upload(EvidenceUpload::new("copy.pdf", "application/pdf", b"policy v1".to_vec()))
            .await
            .unwrap();
        let c = storage
            .upload(EvidenceUpload::new("policy.pdf", "application/pdf", b"policy v2".to_vec()))
            .await
            .unwrap();

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.size, 9);
        let digest = ContentAddressedStorage::digest(b"policy v1");
        assert_eq!(std::fs::read(storage.path_for(&digest)).unwrap(), b"policy v1");
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ContentAddressedStorage::new(dir.path());
        let err = storage
            .upload(EvidenceUpload::new("empty.txt", "text/plain", Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Rejected(_)));
    }
}
