//! Dashboard model shared by the server-side render and `assets/console.js`.
//!
//! The page state is a plain value; every browser action becomes a
//! [`DashboardEvent`] folded in by [`reduce`], and the `render_*` functions in
//! [`render`] turn the result into HTML fragments.

pub mod progress;
pub mod render;

use std::collections::BTreeSet;

use crate::models::api::IngestResponse;
use crate::models::store::{DeleteOutcome, DriveFile, StoredFile, VectorStoreSummary};

use progress::ProgressEstimator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Map a flash category onto a status kind.
    pub fn from_category(category: &str) -> Self {
        match category {
            "success" => Self::Success,
            "error" | "danger" => Self::Error,
            _ => Self::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    pub stores: Vec<VectorStoreSummary>,
    pub selected_store: Option<String>,
    pub files: Vec<StoredFile>,
    /// File IDs ticked for deletion.
    pub checked: BTreeSet<String>,
    /// Whether the file list panel is expanded.
    pub expanded: bool,
    pub upload: Option<ProgressEstimator>,
    pub drive_files: Vec<DriveFile>,
    pub status: Option<StatusMessage>,
}

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    StoresLoaded(Vec<VectorStoreSummary>),
    StoreCreated(VectorStoreSummary),
    StoreSelected(String),
    FilesLoaded {
        store_id: String,
        files: Vec<StoredFile>,
    },
    FileToggled(String),
    AllFilesToggled(bool),
    FilesDeleted(DeleteOutcome),
    FileListToggled,
    UploadStarted,
    UploadTick,
    UploadFinished(Vec<IngestResponse>),
    DriveFilesLoaded(Vec<DriveFile>),
    DriveFileIngested {
        file_name: String,
        result: IngestResponse,
    },
    Failed(String),
    StatusCleared,
}

impl DashboardState {
    pub fn selected(&self) -> Option<&VectorStoreSummary> {
        let id = self.selected_store.as_deref()?;
        self.stores.iter().find(|s| s.id == id)
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            kind,
            text: text.into(),
        });
    }

    fn set_file_count(&mut self, store_id: &str, file_count: u64) {
        if let Some(store) = self.stores.iter_mut().find(|s| s.id == store_id) {
            store.file_count = file_count;
        }
    }
}

/// Apply one event to the dashboard state.
pub fn reduce(event: DashboardEvent, mut state: DashboardState) -> DashboardState {
    match event {
        DashboardEvent::StoresLoaded(stores) => {
            state.stores = stores;
            let still_there = state
                .selected_store
                .as_deref()
                .is_some_and(|id| state.stores.iter().any(|s| s.id == id));
            if !still_there {
                state.selected_store = state.stores.first().map(|s| s.id.clone());
                state.files.clear();
                state.checked.clear();
            }
        }
        DashboardEvent::StoreCreated(store) => {
            state.set_status(
                StatusKind::Success,
                format!("Created vector store \"{}\"", store.name),
            );
            state.selected_store = Some(store.id.clone());
            state.stores.push(store);
            state.files.clear();
            state.checked.clear();
        }
        DashboardEvent::StoreSelected(store_id) => {
            if state.selected_store.as_deref() != Some(store_id.as_str()) {
                state.files.clear();
                state.checked.clear();
            }
            state.selected_store = Some(store_id);
        }
        DashboardEvent::FilesLoaded { store_id, files } => {
            // Ignore answers for a store that is no longer selected.
            if state.selected_store.as_deref() == Some(store_id.as_str()) {
                state.checked.retain(|id| files.iter().any(|f| &f.id == id));
                state.set_file_count(&store_id, files.len() as u64);
                state.files = files;
            }
        }
        DashboardEvent::FileToggled(file_id) => {
            if !state.checked.remove(&file_id) && state.files.iter().any(|f| f.id == file_id) {
                state.checked.insert(file_id);
            }
        }
        DashboardEvent::AllFilesToggled(on) => {
            state.checked = if on {
                state.files.iter().map(|f| f.id.clone()).collect()
            } else {
                BTreeSet::new()
            };
        }
        DashboardEvent::FilesDeleted(outcome) => {
            state.files.retain(|f| !outcome.deleted.contains(&f.id));
            for id in &outcome.deleted {
                state.checked.remove(id);
            }
            if let Some(store_id) = state.selected_store.clone() {
                let remaining = state.files.len() as u64;
                state.set_file_count(&store_id, remaining);
            }
            if outcome.failed.is_empty() {
                state.set_status(
                    StatusKind::Success,
                    format!("Deleted {} file(s)", outcome.deleted.len()),
                );
            } else {
                state.set_status(
                    StatusKind::Error,
                    format!(
                        "Deleted {} file(s); {} could not be deleted",
                        outcome.deleted.len(),
                        outcome.failed.len()
                    ),
                );
            }
        }
        DashboardEvent::FileListToggled => {
            state.expanded = !state.expanded;
        }
        DashboardEvent::UploadStarted => {
            state.upload = Some(ProgressEstimator::default());
            state.set_status(StatusKind::Info, "Uploading...");
        }
        DashboardEvent::UploadTick => {
            if let Some(progress) = state.upload.as_mut() {
                progress.tick();
            }
        }
        DashboardEvent::UploadFinished(results) => {
            if let Some(progress) = state.upload.as_mut() {
                progress.complete();
            }
            for result in &results {
                state.set_file_count(&result.vector_store_id, result.file_count);
            }
            let names: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
            state.set_status(
                StatusKind::Success,
                format!("Ingested {}", names.join(", ")),
            );
        }
        DashboardEvent::DriveFilesLoaded(files) => {
            let count = files.len();
            state.drive_files = files;
            state.set_status(StatusKind::Info, format!("Found {count} file(s) in folder"));
        }
        DashboardEvent::DriveFileIngested { file_name, result } => {
            state.set_file_count(&result.vector_store_id, result.file_count);
            state.set_status(
                StatusKind::Success,
                format!("Imported {file_name} from Google Drive"),
            );
        }
        DashboardEvent::Failed(message) => {
            state.upload = None;
            state.set_status(StatusKind::Error, message);
        }
        DashboardEvent::StatusCleared => {
            state.status = None;
        }
    }
    state
}
