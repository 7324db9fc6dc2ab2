//! Upload gate: decides whether the query interface is reachable.

use std::path::{Path, PathBuf};

use crate::api::{DocumentApi, UploadReply};
use crate::error::ApiError;

pub const PDF_MIME: &str = "application/pdf";

/// Banner text for a file that isn't a PDF.
pub const INVALID_FILE_TYPE: &str = "Please upload a PDF file only.";

/// Banner text when the backend accepted the file without a message.
pub const DEFAULT_UPLOAD_SUCCESS: &str = "File uploaded successfully!";

/// Used for a failed upload when the backend gave no `detail`.
pub const DEFAULT_UPLOAD_FAILURE: &str = "Failed to upload PDF.";

/// A file the user picked, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub mime: &'static str,
}

impl SelectedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let mime = mime_for_path(&path);
        Self { path, name, mime }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime == PDF_MIME
    }
}

/// Media type for a file, judged by its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => PDF_MIME,
        "txt" | "text" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Read the file and send it to the backend.
pub async fn send_file<A>(api: &A, file: &SelectedFile) -> Result<UploadReply, ApiError>
where
    A: DocumentApi + ?Sized,
{
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| ApiError::File {
            path: file.path.clone(),
            source,
        })?;
    api.upload_pdf(&file.name, bytes).await
}

/// Outcome of the most recent upload attempt.
#[derive(Debug, Clone, Default)]
pub struct UploadGate {
    file_name: Option<String>,
    accepted: bool,
}

impl UploadGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Whether queries may be submitted.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub(crate) fn attempt(&mut self, file: &SelectedFile) {
        self.file_name = Some(file.name.clone());
    }

    pub(crate) fn settle(&mut self, succeeded: bool) {
        self.accepted = succeeded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("report.pdf")), PDF_MIME);
        assert_eq!(mime_for_path(Path::new("REPORT.PDF")), PDF_MIME);
        assert_eq!(mime_for_path(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_for_path(Path::new("no_extension")), "application/octet-stream");
    }

    #[test]
    fn test_selected_file_uses_base_name() {
        let file = SelectedFile::from_path("/home/me/docs/report.pdf");
        assert_eq!(file.name, "report.pdf");
        assert!(file.is_pdf());

        let notes = SelectedFile::from_path("notes.txt");
        assert!(!notes.is_pdf());
    }

    #[test]
    fn test_gate_revoked_by_failed_attempt() {
        let mut gate = UploadGate::new();
        gate.attempt(&SelectedFile::from_path("a.pdf"));
        gate.settle(true);
        assert!(gate.is_accepted());

        gate.attempt(&SelectedFile::from_path("b.pdf"));
        gate.settle(false);
        assert!(!gate.is_accepted());
        assert_eq!(gate.file_name(), Some("b.pdf"));
    }

    #[tokio::test]
    async fn test_send_file_reports_missing_file() {
        use crate::api::QueryReply;
        use async_trait::async_trait;

        struct Unreachable;

        #[async_trait]
        impl DocumentApi for Unreachable {
            async fn upload_pdf(&self, _: &str, _: Vec<u8>) -> Result<UploadReply, ApiError> {
                panic!("must not be called for an unreadable file");
            }
            async fn query(&self, _: &str) -> Result<QueryReply, ApiError> {
                unreachable!()
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let file = SelectedFile::from_path(dir.path().join("gone.pdf"));
        let err = send_file(&Unreachable, &file).await.unwrap_err();
        assert!(matches!(err, ApiError::File { .. }));
    }

    #[tokio::test]
    async fn test_send_file_passes_bytes_and_name() {
        use crate::api::QueryReply;
        use async_trait::async_trait;
        use std::sync::Mutex;

        #[derive(Default)]
        struct Recorder {
            seen: Mutex<Option<(String, Vec<u8>)>>,
        }

        #[async_trait]
        impl DocumentApi for Recorder {
            async fn upload_pdf(&self, name: &str, bytes: Vec<u8>) -> Result<UploadReply, ApiError> {
                *self.seen.lock().unwrap() = Some((name.to_string(), bytes));
                Ok(UploadReply::default())
            }
            async fn query(&self, _: &str) -> Result<QueryReply, ApiError> {
                unreachable!()
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::File::create(&path).unwrap().write_all(b"%PDF-1.7").unwrap();

        let api = Recorder::default();
        send_file(&api, &SelectedFile::from_path(&path)).await.unwrap();

        let seen = api.seen.lock().unwrap().clone();
        assert_eq!(seen, Some(("report.pdf".to_string(), b"%PDF-1.7".to_vec())));
    }
}
