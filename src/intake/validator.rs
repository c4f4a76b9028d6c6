use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures_util::future::try_join_all;
use image::ImageFormat;
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

use super::staging::{IntakeBatch, StagedFile};

/// Default limits, matching the upload widget's dropzone options.
pub const MAX_FILES: usize = 10;
pub const MAX_SIZE_BYTES: u64 = 200 * 1024 * 1024;

const SNIFF_LEN: usize = 16;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Png,
    Jpeg,
    Pdf,
}

impl FileKind {
    pub fn mime(self) -> &'static str {
        match self {
            FileKind::Png => "image/png",
            FileKind::Jpeg => "image/jpeg",
            FileKind::Pdf => "application/pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Png => "png",
            FileKind::Jpeg => "jpeg",
            FileKind::Pdf => "pdf",
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(FileKind::Png),
            "jpg" | "jpeg" => Some(FileKind::Jpeg),
            "pdf" => Some(FileKind::Pdf),
            _ => None,
        }
    }

    /// Determine the kind from the file's leading bytes. The extension is
    /// never trusted on its own; content wins when the two disagree.
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(b"%PDF-") {
            return Some(FileKind::Pdf);
        }
        match image::guess_format(header) {
            Ok(ImageFormat::Png) => Some(FileKind::Png),
            Ok(ImageFormat::Jpeg) => Some(FileKind::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Image,
    Pdf,
}

impl InputMode {
    /// One mode per batch: `pdf` as soon as any member is a PDF payload.
    pub fn derive<I: IntoIterator<Item = FileKind>>(kinds: I) -> Self {
        if kinds.into_iter().any(|kind| kind == FileKind::Pdf) {
            InputMode::Pdf
        } else {
            InputMode::Image
        }
    }
}

/// Rejection codes mirror the dropzone error codes the chrome already knows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RejectReason {
    #[serde(rename = "file-invalid-type")]
    InvalidType,
    #[serde(rename = "file-too-large")]
    TooLarge,
    #[serde(rename = "too-many-files")]
    TooManyFiles,
}

impl RejectReason {
    pub fn message(self) -> &'static str {
        match self {
            RejectReason::InvalidType => "File type must be PNG, JPEG, or PDF",
            RejectReason::TooLarge => "File is larger than 200 MiB",
            RejectReason::TooManyFiles => "No more than 10 files may be uploaded at once",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RejectedFile {
    pub file_name: String,
    pub reason: RejectReason,
    pub message: String,
}

impl RejectedFile {
    fn new(path: &Path, reason: RejectReason) -> Self {
        Self {
            file_name: display_name(path),
            reason,
            message: reason.message().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub max_files: usize,
    pub max_size_bytes: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES,
            max_size_bytes: MAX_SIZE_BYTES,
        }
    }
}

/// A file that passed screening but has not been converted yet.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: FileKind,
    pub size_bytes: u64,
}

#[derive(Debug)]
pub struct Screened {
    pub accepted: Vec<CandidateFile>,
    pub rejected: Vec<RejectedFile>,
}

/// Partition one drop/select event into accepted and rejected files.
///
/// A drop with more candidates than `max_files` is rejected wholesale, the
/// dropzone way. Per file the first failing check wins: kind, then size.
/// Rejected files never make it into a batch; an unreadable file fails the
/// whole event instead (the caller reports it as a conversion failure).
pub async fn screen(paths: &[PathBuf], config: &IntakeConfig) -> Result<Screened> {
    if paths.len() > config.max_files {
        return Ok(Screened {
            accepted: Vec::new(),
            rejected: paths
                .iter()
                .map(|path| RejectedFile::new(path, RejectReason::TooManyFiles))
                .collect(),
        });
    }

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for path in paths {
        let header = read_header(path).await?;
        let kind = match FileKind::sniff(&header) {
            Some(kind) => kind,
            None => {
                rejected.push(RejectedFile::new(path, RejectReason::InvalidType));
                continue;
            }
        };
        if let Some(claimed) = FileKind::from_extension(path) {
            if claimed != kind {
                warn!(
                    "{} has a {} extension but {} content; using content",
                    path.display(),
                    claimed.extension(),
                    kind.extension()
                );
            }
        }

        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        if metadata.len() > config.max_size_bytes {
            rejected.push(RejectedFile::new(path, RejectReason::TooLarge));
            continue;
        }

        accepted.push(CandidateFile {
            path: path.clone(),
            file_name: display_name(path),
            kind,
            size_bytes: metadata.len(),
        });
    }

    Ok(Screened { accepted, rejected })
}

/// Convert every accepted file into its transportable form and stage a
/// preview copy. The per-file conversions run concurrently and are joined
/// all-or-nothing: one failure aborts the whole commit, and previews written
/// so far are released again on the way out.
pub async fn convert(accepted: Vec<CandidateFile>, preview_dir: &Path) -> Result<IntakeBatch> {
    let files = try_join_all(
        accepted
            .into_iter()
            .map(|candidate| convert_one(candidate, preview_dir)),
    )
    .await?;
    Ok(IntakeBatch::new(files))
}

async fn convert_one(candidate: CandidateFile, preview_dir: &Path) -> Result<StagedFile> {
    let bytes = tokio::fs::read(&candidate.path)
        .await
        .with_context(|| format!("Failed to read {}", candidate.path.display()))?;
    StagedFile::stage(candidate, bytes, preview_dir).await
}

async fn read_header(path: &Path) -> Result<Vec<u8>> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut header = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut header)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(header)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
