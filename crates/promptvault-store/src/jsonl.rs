//! Catalog persistence as a single append-only JSONL event log.

use crate::state::{CatalogEvent, CatalogState, SCHEMA_VERSION};
use crate::{CatalogStore, StoreError};
use fs2::FileExt;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use promptvault_protocol::{
    Execution, ExecutionId, Fragment, FragmentId, Template, TemplateId, Version, VersionHistory,
    VersionId,
};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Name of the event log inside the store root.
const LOG_FILE: &str = "catalog.jsonl";

/// JSONL-backed catalog store.
///
/// Every mutation is appended to `catalog.jsonl` before it becomes visible.
/// The log is replayed into memory on open; reads never touch the disk.
///
/// Several processes may share one log. Writers hold an exclusive advisory
/// lock on the file, fold in whatever other handles appended since their
/// last read, and only then validate and append. A version number taken by
/// another process therefore surfaces as [`StoreError::VersionConflict`].
pub struct JsonlCatalogStore {
    /// Path of the event log.
    path: PathBuf,
    /// Replayed catalog state.
    state: RwLock<CatalogState>,
    /// Byte offset of the log consumed into `state`; also serializes writers.
    cursor: Mutex<u64>,
}

impl JsonlCatalogStore {
    /// Open (or create) a catalog under the given root directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let path = root.join(LOG_FILE);
        let mut file = lock_log(&path)?;
        if file.metadata()?.len() == 0 {
            let header = serde_json::to_string(&CatalogEvent::SchemaVersion {
                version: SCHEMA_VERSION,
            })?;
            file.write_all(format!("{header}\n").as_bytes())?;
            debug!("initialized catalog log (path={})", path.display());
        }
        let mut state = CatalogState::default();
        let offset = sync_from(&mut file, &path, 0, &mut state)?;
        info!("opened JSONL catalog store (path={})", path.display());
        Ok(Self {
            path,
            state: RwLock::new(state),
            cursor: Mutex::new(offset),
        })
    }

    /// Location of the event log.
    pub fn log_path(&self) -> &Path {
        &self.path
    }

    /// Validate, persist, then apply an event.
    fn commit(&self, event: CatalogEvent) -> Result<(), StoreError> {
        self.commit_with(|_| Some(event)).map(|_| ())
    }

    /// Build an event from the up-to-date state and commit it.
    ///
    /// Returns false when `build` yields nothing to write.
    fn commit_with<F>(&self, build: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&CatalogState) -> Option<CatalogEvent>,
    {
        let mut cursor = self.cursor.lock();
        let mut file = lock_log(&self.path)?;
        let mut state = self.state.write();
        *cursor = sync_from(&mut file, &self.path, *cursor, &mut state)?;

        let Some(event) = build(&state) else {
            return Ok(false);
        };
        state.validate(&event)?;
        let line = format!("{}\n", serde_json::to_string(&event)?);
        file.seek(SeekFrom::Start(*cursor))?;
        file.write_all(line.as_bytes())?;
        *cursor += line.len() as u64;
        state.apply_validated(event);
        Ok(true)
    }
}

/// Open the log for reading and appending under an exclusive advisory lock.
///
/// The lock is released when the returned handle is dropped.
fn lock_log(path: &Path) -> Result<File, StoreError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.lock_exclusive()?;
    Ok(file)
}

/// Fold log events past `offset` into `state`; returns the new offset.
///
/// A trailing line without a newline is left over from an interrupted write
/// and is cut off. Events that no longer validate against the state before
/// them are skipped so the rest of the catalog stays readable.
fn sync_from(
    file: &mut File,
    path: &Path,
    offset: u64,
    state: &mut CatalogState,
) -> Result<u64, StoreError> {
    file.seek(SeekFrom::Start(offset))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;

    let mut needs_header = offset == 0;
    let mut consumed = 0usize;
    let mut events = 0usize;
    while let Some(len) = tail[consumed..].iter().position(|byte| *byte == b'\n') {
        let line = &tail[consumed..consumed + len];
        consumed += len + 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let event: CatalogEvent = serde_json::from_slice(line)?;
        if needs_header {
            if !matches!(event, CatalogEvent::SchemaVersion { .. }) {
                return Err(StoreError::MissingSchemaHeader);
            }
            needs_header = false;
        }
        match state.validate(&event) {
            Ok(()) => state.apply_validated(event),
            Err(err @ StoreError::UnsupportedSchema(_)) => return Err(err),
            Err(err) => warn!(
                "skipping catalog event that no longer applies (path={}): {}",
                path.display(),
                err
            ),
        }
        events += 1;
    }

    let synced = offset + consumed as u64;
    if consumed < tail.len() {
        warn!(
            "truncating torn catalog line (path={}, offset={}, bytes={})",
            path.display(),
            synced,
            tail.len() - consumed
        );
        file.set_len(synced)?;
    }
    if needs_header {
        return Err(StoreError::MissingSchemaHeader);
    }
    if events > 0 {
        debug!(
            "replayed catalog log (path={}, events={}, offset={})",
            path.display(),
            events,
            synced
        );
    }
    Ok(synced)
}

impl CatalogStore for JsonlCatalogStore {
    fn save_fragment(&self, fragment: &Fragment) -> Result<(), StoreError> {
        debug!("saving fragment (fragment_id={})", fragment.id);
        self.commit(CatalogEvent::FragmentSaved {
            fragment: fragment.clone(),
        })
    }

    fn get_fragment(&self, id: FragmentId) -> Result<Option<Fragment>, StoreError> {
        Ok(self.state.read().fragment(id))
    }

    fn list_fragments(&self) -> Result<Vec<Fragment>, StoreError> {
        Ok(self.state.read().fragments())
    }

    fn delete_fragment(&self, id: FragmentId) -> Result<bool, StoreError> {
        let deleted = self.commit_with(|state| {
            state
                .has_fragment(id)
                .then_some(CatalogEvent::FragmentDeleted { fragment_id: id })
        })?;
        if deleted {
            info!("deleted fragment (fragment_id={id})");
        } else {
            warn!("fragment not found (fragment_id={id})");
        }
        Ok(deleted)
    }

    fn save_template(&self, template: &Template) -> Result<(), StoreError> {
        debug!("saving template (template_id={})", template.id);
        self.commit(CatalogEvent::TemplateSaved {
            template: template.clone(),
        })
    }

    fn get_template(&self, id: TemplateId) -> Result<Option<Template>, StoreError> {
        Ok(self.state.read().template(id))
    }

    fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        Ok(self.state.read().templates())
    }

    fn delete_template(&self, id: TemplateId) -> Result<bool, StoreError> {
        let deleted = self.commit_with(|state| {
            state
                .has_template(id)
                .then_some(CatalogEvent::TemplateDeleted { template_id: id })
        })?;
        if deleted {
            info!("deleted template with history (template_id={id})");
        } else {
            warn!("template not found (template_id={id})");
        }
        Ok(deleted)
    }

    fn template_fragments(&self, id: TemplateId) -> Result<Vec<Fragment>, StoreError> {
        self.state.read().template_fragments(id)
    }

    fn latest_version(&self, template_id: TemplateId) -> Result<Option<Version>, StoreError> {
        Ok(self.state.read().latest_version(template_id).cloned())
    }

    fn get_version(&self, id: VersionId) -> Result<Option<Version>, StoreError> {
        Ok(self.state.read().version(id))
    }

    fn list_versions(&self, template_id: TemplateId) -> Result<Vec<Version>, StoreError> {
        Ok(self.state.read().versions(template_id))
    }

    fn insert_version(&self, version: &Version) -> Result<(), StoreError> {
        info!(
            "recording version (template_id={}, version_number={})",
            version.template_id, version.version_number
        );
        self.commit(CatalogEvent::VersionCreated {
            version: version.clone(),
        })
    }

    fn insert_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        debug!(
            "recording execution (execution_id={}, version_id={})",
            execution.id, execution.version_id
        );
        self.commit(CatalogEvent::ExecutionRecorded {
            execution: execution.clone(),
        })
    }

    fn history(&self, template_id: TemplateId) -> Result<Vec<VersionHistory>, StoreError> {
        self.state.read().history(template_id)
    }

    fn latest_execution(&self, template_id: TemplateId) -> Result<Option<Execution>, StoreError> {
        Ok(self.state.read().latest_execution(template_id))
    }

    fn delete_executions(&self, ids: &[ExecutionId]) -> Result<usize, StoreError> {
        let mut count = 0;
        self.commit_with(|state| {
            let existing = state.existing_executions(ids);
            count = existing.len();
            (count > 0).then_some(CatalogEvent::ExecutionsDeleted {
                execution_ids: existing,
            })
        })?;
        if count > 0 {
            info!("deleted executions (count={count})");
        }
        Ok(count)
    }
}
