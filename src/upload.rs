//! CSV upload state machine.
//!
//! `Empty -> Selected -> Uploading -> Selected`. Each transfer is tagged with
//! an [`UploadTicket`]; selecting a new file retires the current ticket so
//! late progress or outcomes from an older transfer are dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::TransportError;

pub const MISSING_FILE: &str = "📁 Please choose a CSV file first.";

/// A file chosen through the picker or dropped onto the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn read(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            path: path.to_path_buf(),
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    MissingFile,
    Success(String),
    Failure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Neutral,
    Positive,
    Negative,
}

impl UploadStatus {
    pub fn message(&self) -> String {
        match self {
            UploadStatus::Idle => String::new(),
            UploadStatus::MissingFile => MISSING_FILE.to_string(),
            UploadStatus::Success(message) => format!("✅ {}", message),
            UploadStatus::Failure(reason) => format!("❌ Upload failed: {}", reason),
        }
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            UploadStatus::Idle => StatusTone::Neutral,
            UploadStatus::Success(_) => StatusTone::Positive,
            UploadStatus::MissingFile | UploadStatus::Failure(_) => StatusTone::Negative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub ticket: UploadTicket,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Integer percent of `loaded` over `total`. An unknown or zero total counts
/// as 1 byte.
pub fn progress_percent(loaded: u64, total: Option<u64>) -> u8 {
    let total = total.filter(|t| *t > 0).unwrap_or(1);
    let percent = (loaded as f64 * 100.0 / total as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Default)]
pub struct UploadSession {
    selected: Option<SelectedFile>,
    progress: u8,
    status: UploadStatus,
    in_flight: Option<UploadTicket>,
    next_ticket: u64,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Selection from the picker. Only the first offered file is kept.
    pub fn select_file<I>(&mut self, files: I)
    where
        I: IntoIterator<Item = SelectedFile>,
    {
        self.replace_selection(files.into_iter().next());
    }

    /// Selection by drag-and-drop. Same rules as [`select_file`](Self::select_file):
    /// additional files in the drop are ignored.
    pub fn drop_file<I>(&mut self, files: I)
    where
        I: IntoIterator<Item = SelectedFile>,
    {
        self.replace_selection(files.into_iter().next());
    }

    fn replace_selection(&mut self, file: Option<SelectedFile>) {
        if let Some(ticket) = self.in_flight.take() {
            info!(?ticket, "selection changed during transfer; detaching it");
        }
        match &file {
            Some(f) => info!(name = %f.name, bytes = f.bytes.len(), "file selected"),
            None => info!("selection cleared"),
        }
        self.selected = file;
        self.progress = 0;
        self.status = UploadStatus::Idle;
    }

    /// Reports a selection that could not be read from disk.
    pub fn reject_selection(&mut self, path: &Path, err: &io::Error) {
        warn!(path = %path.display(), error = %err, "could not read selected file");
        self.selected = None;
        self.in_flight = None;
        self.progress = 0;
        self.status = UploadStatus::Failure(format!("could not read {}: {}", path.display(), err));
    }

    /// Starts a transfer of the selected file.
    ///
    /// With nothing selected the status becomes [`UploadStatus::MissingFile`]
    /// and `None` is returned. A call while a transfer is running is ignored.
    pub fn begin_upload(&mut self) -> Option<UploadRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        let Some(file) = &self.selected else {
            self.status = UploadStatus::MissingFile;
            return None;
        };

        let ticket = UploadTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        info!(?ticket, name = %file.name, "upload started");

        Some(UploadRequest {
            ticket,
            file_name: file.name.clone(),
            bytes: file.bytes.clone(),
        })
    }

    /// Applies a progress tick. Progress never moves backwards.
    pub fn record_progress(&mut self, ticket: UploadTicket, loaded: u64, total: Option<u64>) {
        if self.in_flight != Some(ticket) {
            return;
        }
        let percent = progress_percent(loaded, total);
        if percent > self.progress {
            self.progress = percent;
        }
    }

    pub fn settle(&mut self, ticket: UploadTicket, outcome: Result<String, TransportError>) {
        if self.in_flight != Some(ticket) {
            return;
        }
        self.in_flight = None;

        match outcome {
            Ok(message) => {
                info!(?ticket, %message, "upload succeeded");
                self.progress = 100;
                self.status = UploadStatus::Success(message);
            }
            Err(err) => {
                warn!(?ticket, error = %err, "upload failed");
                self.status = UploadStatus::Failure(err.reason());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn file(name: &str, bytes: &[u8]) -> SelectedFile {
        SelectedFile {
            name: name.to_string(),
            path: PathBuf::from(name),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_upload_without_file_sets_missing_file() {
        let mut upload = UploadSession::new();
        assert!(upload.begin_upload().is_none());
        assert_eq!(upload.status(), &UploadStatus::MissingFile);
        assert_eq!(upload.status().message(), MISSING_FILE);
        assert_eq!(upload.status().tone(), StatusTone::Negative);
        assert_eq!(upload.progress(), 0);
    }

    #[test]
    fn test_missing_file_does_not_touch_progress() {
        let mut upload = UploadSession::new();
        upload.select_file([file("a.csv", b"1")]);
        let request = upload.begin_upload().unwrap();
        upload.record_progress(request.ticket, 1, Some(2));
        upload.settle(request.ticket, Ok("done".to_string()));
        upload.select_file(Vec::new());

        assert_eq!(upload.progress(), 0);
        assert!(upload.begin_upload().is_none());
        assert_eq!(upload.progress(), 0);
        assert_eq!(upload.status(), &UploadStatus::MissingFile);
    }

    #[test]
    fn test_selection_keeps_first_file_and_resets() {
        let mut upload = UploadSession::new();
        upload.select_file([file("old.csv", b"x")]);
        upload.begin_upload();
        upload.status = UploadStatus::Failure("boom".to_string());
        upload.progress = 40;

        upload.drop_file([file("first.csv", b"1"), file("second.csv", b"2")]);
        assert_eq!(upload.selected().map(|f| f.name.as_str()), Some("first.csv"));
        assert_eq!(upload.progress(), 0);
        assert_eq!(upload.status(), &UploadStatus::Idle);
        assert!(!upload.is_uploading());
    }

    #[test]
    fn test_picker_and_drop_are_equivalent() {
        let mut picked = UploadSession::new();
        let mut dropped = UploadSession::new();
        picked.select_file([file("r.csv", b"abc")]);
        dropped.drop_file([file("r.csv", b"abc")]);

        assert_eq!(picked.selected(), dropped.selected());
        assert_eq!(picked.progress(), dropped.progress());
        assert_eq!(picked.status(), dropped.status());
    }

    #[test]
    fn test_success_scenario() {
        let mut upload = UploadSession::new();
        upload.select_file([file("readings.csv", b"rpm,speed\n800,0\n")]);
        let request = upload.begin_upload().unwrap();
        assert_eq!(request.file_name, "readings.csv");
        assert!(upload.is_uploading());

        upload.record_progress(request.ticket, 10, Some(17));
        upload.settle(request.ticket, Ok("12 rows imported".to_string()));

        assert_eq!(upload.progress(), 100);
        assert_eq!(upload.status().tone(), StatusTone::Positive);
        assert!(upload.status().message().contains("12 rows imported"));
        assert!(!upload.is_uploading());
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_100() {
        let mut upload = UploadSession::new();
        upload.select_file([file("r.csv", &[0u8; 1000])]);
        let request = upload.begin_upload().unwrap();

        let mut observed = Vec::new();
        for loaded in [100, 500, 300, 900, 850] {
            upload.record_progress(request.ticket, loaded, Some(1000));
            observed.push(upload.progress());
        }
        upload.settle(request.ticket, Ok("ok".to_string()));
        observed.push(upload.progress());

        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(observed, vec![10, 50, 50, 90, 90, 100]);
    }

    #[test]
    fn test_failure_prefers_server_detail() {
        let mut upload = UploadSession::new();
        upload.select_file([file("r.txt", b"x")]);
        let request = upload.begin_upload().unwrap();
        upload.record_progress(request.ticket, 1, Some(1));
        upload.settle(
            request.ticket,
            Err(TransportError::Status {
                status: StatusCode::BAD_REQUEST,
                detail: Some("Only CSV files are allowed.".to_string()),
            }),
        );

        assert_eq!(
            upload.status().message(),
            "❌ Upload failed: Only CSV files are allowed."
        );
        assert_eq!(upload.status().tone(), StatusTone::Negative);
        assert_eq!(upload.progress(), 100);
        assert!(upload.selected().is_some());
    }

    #[test]
    fn test_failure_without_detail_uses_transport_text() {
        let mut upload = UploadSession::new();
        upload.select_file([file("r.csv", b"x")]);
        let request = upload.begin_upload().unwrap();
        upload.settle(
            request.ticket,
            Err(TransportError::Status {
                status: StatusCode::BAD_GATEWAY,
                detail: None,
            }),
        );
        assert_eq!(
            upload.status().message(),
            "❌ Upload failed: Request failed with status 502 Bad Gateway"
        );
    }

    #[test]
    fn test_second_upload_while_in_flight_is_ignored() {
        let mut upload = UploadSession::new();
        upload.select_file([file("r.csv", b"x")]);
        assert!(upload.begin_upload().is_some());
        assert!(upload.begin_upload().is_none());
    }

    #[test]
    fn test_stale_ticket_events_are_dropped() {
        let mut upload = UploadSession::new();
        upload.select_file([file("a.csv", b"x")]);
        let old = upload.begin_upload().unwrap();

        upload.select_file([file("b.csv", b"y")]);
        upload.record_progress(old.ticket, 1, Some(1));
        upload.settle(old.ticket, Ok("a imported".to_string()));

        assert_eq!(upload.progress(), 0);
        assert_eq!(upload.status(), &UploadStatus::Idle);

        let fresh = upload.begin_upload().unwrap();
        assert_ne!(fresh.ticket, old.ticket);
    }

    #[test]
    fn test_progress_percent_rounding_and_unknown_total() {
        assert_eq!(progress_percent(0, Some(3)), 0);
        assert_eq!(progress_percent(1, Some(3)), 33);
        assert_eq!(progress_percent(2, Some(3)), 67);
        assert_eq!(progress_percent(3, Some(3)), 100);
        assert_eq!(progress_percent(0, None), 0);
        assert_eq!(progress_percent(5, Some(0)), 100);
        assert_eq!(progress_percent(1, None), 100);
    }

    #[test]
    fn test_status_tone_for_idle_is_neutral() {
        assert_eq!(UploadStatus::Idle.tone(), StatusTone::Neutral);
        assert_eq!(UploadStatus::Idle.message(), "");
    }

    #[test]
    fn test_read_selected_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        std::fs::write(&path, "rpm\n900\n").unwrap();

        let selected = SelectedFile::read(&path).unwrap();
        assert_eq!(selected.name, "readings.csv");
        assert_eq!(selected.bytes, b"rpm\n900\n");

        assert!(SelectedFile::read(&dir.path().join("missing.csv")).is_err());
    }

    #[test]
    fn test_reject_selection_reports_failure() {
        let mut upload = UploadSession::new();
        upload.select_file([file("a.csv", b"x")]);
        let err = io::Error::new(io::ErrorKind::NotFound, "not found");
        upload.reject_selection(Path::new("/tmp/gone.csv"), &err);

        assert!(upload.selected().is_none());
        assert_eq!(upload.status().tone(), StatusTone::Negative);
        assert!(upload.status().message().contains("/tmp/gone.csv"));
    }
}
