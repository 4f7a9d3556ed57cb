//! Durable, ordered set of monitored channels.
//!
//! Every mutation rewrites the full snapshot to a sibling temp file and renames
//! it over the previous one, so a reader either sees the old list or the new
//! one, never a torn write. Reads always go to disk; the registry keeps no
//! in-memory copy that could drift from what another handle wrote.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, StorageError};
use crate::fetch::VideoFetcher;
use crate::types::{Source, SourceIdentity, SourceOrigin};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub added: Vec<Source>,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct SourceRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SourceRegistry {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All sources in insertion order. A missing file is an empty registry.
    pub fn list(&self) -> Result<Vec<Source>, StorageError> {
        Ok(self.load()?.sources)
    }

    /// Resolve `locator` through the fetch adapter and register the channel.
    ///
    /// The registry is left untouched on any error. Resolution happens before the
    /// write lock is taken, so a slow probe never blocks other mutations.
    pub async fn add(
        &self,
        fetcher: &dyn VideoFetcher,
        locator: &str,
    ) -> Result<Source, RegistryError> {
        let identity = fetcher.resolve_identity(locator).await?;
        self.insert(identity, SourceOrigin::Manual)
    }

    /// Register an already-resolved identity.
    pub fn insert(
        &self,
        identity: SourceIdentity,
        origin: SourceOrigin,
    ) -> Result<Source, RegistryError> {
        let _guard = self.lock()?;
        let mut snap = self.load()?;
        if let Some(existing) = snap.sources.iter().find(|s| s.id == identity.source_id) {
            return Err(RegistryError::Duplicate {
                source_id: existing.id.clone(),
                display_name: existing.display_name.clone(),
            });
        }
        let source = Source::from_identity(identity, origin, Utc::now());
        snap.sources.push(source.clone());
        self.save(&snap)?;
        tracing::info!(source_id = %source.id, name = %source.display_name, "source added");
        Ok(source)
    }

    /// Bulk registration of subscriptions pulled from an account. Already
    /// registered ids are skipped rather than reported as errors.
    pub fn import_synced(
        &self,
        identities: Vec<SourceIdentity>,
    ) -> Result<ImportReport, StorageError> {
        let _guard = self.lock()?;
        let mut snap = self.load()?;
        let mut report = ImportReport::default();
        let now = Utc::now();

        for identity in identities {
            if identity.source_id.trim().is_empty()
                || snap.sources.iter().any(|s| s.id == identity.source_id)
            {
                report.skipped += 1;
                continue;
            }
            let source = Source::from_identity(identity, SourceOrigin::Synced, now);
            snap.sources.push(source.clone());
            report.added.push(source);
        }

        if !report.added.is_empty() {
            self.save(&snap)?;
        }
        tracing::info!(
            added = report.added.len(),
            skipped = report.skipped,
            "synced sources imported"
        );
        Ok(report)
    }

    /// Remove the first source whose display name matches, ignoring case.
    ///
    /// Two channels can share a display name; only the first is removed. Prefer
    /// [`SourceRegistry::remove_by_id`].
    pub fn remove(&self, display_name: &str) -> Result<bool, StorageError> {
        self.remove_where(|s| s.display_name.to_lowercase() == display_name.to_lowercase())
    }

    pub fn remove_by_id(&self, source_id: &str) -> Result<bool, StorageError> {
        self.remove_where(|s| s.id == source_id)
    }

    /// Channels get renamed upstream; the display name is the only field that
    /// ever changes after registration.
    pub fn refresh_display_name(
        &self,
        source_id: &str,
        display_name: &str,
    ) -> Result<bool, StorageError> {
        let _guard = self.lock()?;
        let mut snap = self.load()?;
        let Some(source) = snap.sources.iter_mut().find(|s| s.id == source_id) else {
            return Ok(false);
        };
        if source.display_name == display_name {
            return Ok(false);
        }
        source.display_name = display_name.to_string();
        self.save(&snap)?;
        Ok(true)
    }

    fn remove_where(&self, pred: impl Fn(&Source) -> bool) -> Result<bool, StorageError> {
        let _guard = self.lock()?;
        let mut snap = self.load()?;
        let Some(idx) = snap.sources.iter().position(pred) else {
            return Ok(false);
        };
        let removed = snap.sources.remove(idx);
        self.save(&snap)?;
        tracing::info!(source_id = %removed.id, name = %removed.display_name, "source removed");
        Ok(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.write_lock.lock().map_err(|_| StorageError::Poisoned)
    }

    fn load(&self) -> Result<Snapshot, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(Snapshot::default()),
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Snapshot::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, snap: &Snapshot) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&serde_json::to_vec_pretty(snap)?)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str, name: &str) -> SourceIdentity {
        SourceIdentity {
            source_id: id.into(),
            display_name: name.into(),
            canonical_url: format!("https://www.youtube.com/channel/{id}"),
        }
    }

    fn registry() -> (tempfile::TempDir, SourceRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let reg = SourceRegistry::open(dir.path().join("state").join("sources.json"));
        (dir, reg)
    }

    #[test]
    fn missing_file_is_empty() {
        let (_dir, reg) = registry();
        assert!(reg.list().unwrap().is_empty());
    }

    #[test]
    fn insert_keeps_order_and_rejects_duplicates() {
        let (_dir, reg) = registry();
        reg.insert(identity("UC2", "Beta"), SourceOrigin::Manual).unwrap();
        reg.insert(identity("UC1", "Alpha"), SourceOrigin::Manual).unwrap();

        let err = reg
            .insert(identity("UC2", "Beta again"), SourceOrigin::Manual)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { ref source_id, .. } if source_id == "UC2"));

        let ids: Vec<_> = reg.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["UC2", "UC1"]);
    }

    #[test]
    fn remove_by_name_is_case_insensitive_first_match() {
        let (_dir, reg) = registry();
        reg.insert(identity("UC1", "Same"), SourceOrigin::Manual).unwrap();
        reg.insert(identity("UC2", "same"), SourceOrigin::Manual).unwrap();

        assert!(reg.remove("SAME").unwrap());
        let left = reg.list().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, "UC2");
        assert!(!reg.remove("missing").unwrap());
    }

    #[test]
    fn remove_by_id_is_exact() {
        let (_dir, reg) = registry();
        reg.insert(identity("UC1", "One"), SourceOrigin::Manual).unwrap();
        assert!(!reg.remove_by_id("uc1").unwrap());
        assert!(reg.remove_by_id("UC1").unwrap());
        assert!(reg.list().unwrap().is_empty());
    }

    #[test]
    fn import_skips_known_and_blank_ids() {
        let (_dir, reg) = registry();
        reg.insert(identity("UC1", "One"), SourceOrigin::Manual).unwrap();

        let report = reg
            .import_synced(vec![
                identity("UC1", "One"),
                identity("UC2", "Two"),
                identity("", "Nameless"),
                identity("UC2", "Two dup"),
            ])
            .unwrap();
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.skipped, 3);

        let list = reg.list().unwrap();
        assert_eq!(list[1].origin, SourceOrigin::Synced);
        assert_eq!(list[0].origin, SourceOrigin::Manual);
    }

    #[test]
    fn refresh_display_name_persists() {
        let (_dir, reg) = registry();
        reg.insert(identity("UC1", "Old"), SourceOrigin::Manual).unwrap();
        assert!(reg.refresh_display_name("UC1", "New").unwrap());
        assert!(!reg.refresh_display_name("UC1", "New").unwrap());
        assert!(!reg.refresh_display_name("UC9", "New").unwrap());

        let reopened = SourceRegistry::open(reg.path().to_path_buf());
        assert_eq!(reopened.list().unwrap()[0].display_name, "New");
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let (_dir, reg) = registry();
        reg.insert(identity("UC1", "One"), SourceOrigin::Manual).unwrap();
        assert!(reg.path().exists());
        assert!(!reg.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_snapshot_is_a_storage_error() {
        let (_dir, reg) = registry();
        fs::create_dir_all(reg.path().parent().unwrap()).unwrap();
        fs::write(reg.path(), "{ not json").unwrap();
        assert!(matches!(reg.list(), Err(StorageError::Corrupt(_))));
    }
}
