use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use anyhow::{Context, Result};
use base64::Engine;
use log::warn;
use serde::Serialize;
use uuid::Uuid;

use super::validator::{CandidateFile, FileKind, InputMode};

/// Exclusive owner of one preview file on disk. The preview exists from
/// staging until the handle is dropped; `Drop` removes it, so replacing a
/// batch, clearing the store, or abandoning a half-built commit releases
/// every preview exactly once.
#[derive(Debug)]
pub struct PreviewHandle {
    path: PathBuf,
}

impl PreviewHandle {
    async fn create(preview_dir: &Path, kind: FileKind, bytes: &[u8]) -> Result<Self> {
        let path = preview_dir.join(format!("{}.{}", Uuid::new_v4(), kind.extension()));
        // Own the path before the write: if the write fails, or the future
        // is dropped mid-commit, the file is still removed.
        let handle = Self { path };
        tokio::fs::write(&handle.path, bytes)
            .await
            .with_context(|| format!("Failed to write preview {}", handle.path.display()))?;
        Ok(handle)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove preview {}: {}", self.path.display(), err);
            }
        }
    }
}

/// One accepted file in its transportable form. Deliberately not `Clone`:
/// the preview handle has exactly one owner.
#[derive(Debug)]
pub struct StagedFile {
    pub file_name: String,
    pub kind: FileKind,
    pub size_bytes: u64,
    pub data_uri: String,
    preview: PreviewHandle,
}

impl StagedFile {
    pub(crate) async fn stage(
        candidate: CandidateFile,
        bytes: Vec<u8>,
        preview_dir: &Path,
    ) -> Result<Self> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let data_uri = format!("data:{};base64,{}", candidate.kind.mime(), encoded);
        let preview = PreviewHandle::create(preview_dir, candidate.kind, &bytes).await?;
        Ok(Self {
            file_name: candidate.file_name,
            kind: candidate.kind,
            size_bytes: bytes.len() as u64,
            data_uri,
            preview,
        })
    }

    pub fn preview_path(&self) -> &Path {
        self.preview.path()
    }
}

/// The files accepted from one drop/select event, in drop order.
#[derive(Debug)]
pub struct IntakeBatch {
    files: Vec<StagedFile>,
    mode: InputMode,
}

impl IntakeBatch {
    pub fn new(files: Vec<StagedFile>) -> Self {
        let mode = InputMode::derive(files.iter().map(|file| file.kind));
        Self { files, mode }
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn view(&self) -> BatchView {
        BatchView {
            encoded_files: self.files.iter().map(|f| f.data_uri.clone()).collect(),
            mode: self.mode,
            files: self
                .files
                .iter()
                .map(|f| StagedFileInfo {
                    file_name: f.file_name.clone(),
                    kind: f.kind,
                    size_bytes: f.size_bytes,
                    preview_path: f.preview_path().to_string_lossy().into_owned(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StagedFileInfo {
    pub file_name: String,
    pub kind: FileKind,
    pub size_bytes: u64,
    pub preview_path: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    pub encoded_files: Vec<String>,
    pub mode: InputMode,
    pub files: Vec<StagedFileInfo>,
}

/// Holds at most one active batch. The batch is only handed out read-only;
/// swapping it in or out releases the previous previews through `Drop`.
pub struct StagingStore {
    preview_dir: PathBuf,
    current: RwLock<Option<IntakeBatch>>,
}

impl StagingStore {
    pub fn new(preview_dir: PathBuf) -> Self {
        Self {
            preview_dir,
            current: RwLock::new(None),
        }
    }

    pub fn preview_dir(&self) -> &Path {
        &self.preview_dir
    }

    pub fn replace(&self, batch: IntakeBatch) {
        let mut guard = self.current.write().unwrap();
        *guard = Some(batch);
    }

    pub fn clear(&self) {
        let mut guard = self.current.write().unwrap();
        *guard = None;
    }

    pub fn view(&self) -> Option<BatchView> {
        self.current.read().unwrap().as_ref().map(IntakeBatch::view)
    }

    pub fn is_empty(&self) -> bool {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map_or(true, IntakeBatch::is_empty)
    }
}
