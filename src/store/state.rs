use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::MigrationRecord;
use crate::store::lock;

pub const STATE_FILE: &str = "migration_state.json";

/// Durable record of per-repository migration progress, keyed by
/// `workspace/slug`. Every mutation is written through to disk immediately, so
/// a crash loses at most the in-flight record's final transition.
pub struct StateStore {
    path: PathBuf,
    records: BTreeMap<String, MigrationRecord>,
}

impl StateStore {
    /// Load the state file, or start empty if it does not exist yet. Entries
    /// written by other versions of the tool keep their unknown fields (see
    /// `MigrationRecord::extra`).
    pub fn load(path: &Path) -> Result<Self> {
        let records = if path.exists() {
            let data = fs::read_to_string(path)?;
            serde_json::from_str(&data)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&MigrationRecord> {
        self.records.get(key)
    }

    pub fn records(&self) -> impl Iterator<Item = &MigrationRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or replace one record and persist the whole store before
    /// returning. Entries for repositories absent from the current selection
    /// are never touched, so prior runs' decisions survive a narrower re-run.
    pub fn upsert(&mut self, record: MigrationRecord) -> Result<()> {
        self.records.insert(record.key(), record);
        self.persist()
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| STATE_FILE.to_string());
        name.push_str(".lock");
        self.path.with_file_name(name)
    }

    /// Write the full map to a sibling temp file, then rename over the state
    /// file. The rename keeps a crash mid-write from truncating prior records.
    fn persist(&self) -> Result<()> {
        let lock_file = lock::acquire_lock(&self.lock_path())?;

        let json = serde_json::to_string_pretty(&self.records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        lock::release_lock(lock_file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DestinationPlan, MigrationStatus, SourceRepoRef};
    use tempfile::tempdir;

    fn record(workspace: &str, slug: &str) -> MigrationRecord {
        MigrationRecord::new(
            SourceRepoRef {
                workspace: workspace.into(),
                slug: slug.into(),
                clone_url: format!("https://bitbucket.org/{workspace}/{slug}.git"),
            },
            DestinationPlan::new("acme", slug),
        )
    }

    #[test]
    fn load_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = StateStore::load(&dir.path().join(STATE_FILE)).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn upsert_is_visible_to_a_fresh_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);

        let mut store = StateStore::load(&path).unwrap();
        let mut rec = record("team", "widgets");
        rec.status = MigrationStatus::InProgress;
        rec.attempts = 1;
        store.upsert(rec).unwrap();

        // Write-through: no explicit flush/close needed.
        let reloaded = StateStore::load(&path).unwrap();
        let found = reloaded.get("team/widgets").unwrap();
        assert_eq!(found.status, MigrationStatus::InProgress);
        assert_eq!(found.attempts, 1);
    }

    #[test]
    fn upsert_preserves_other_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);

        let mut store = StateStore::load(&path).unwrap();
        store.upsert(record("team", "alpha")).unwrap();
        store.upsert(record("team", "beta")).unwrap();

        // Re-run with a narrower selection touching only beta.
        let mut store = StateStore::load(&path).unwrap();
        let mut beta = store.get("team/beta").unwrap().clone();
        beta.status = MigrationStatus::Succeeded;
        store.upsert(beta).unwrap();

        let reloaded = StateStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.get("team/alpha").is_some());
    }

    #[test]
    fn unknown_record_fields_survive_rewrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);

        fs::write(
            &path,
            r#"{
                "team/widgets": {
                    "source": {"workspace": "team", "slug": "widgets",
                               "clone_url": "https://bitbucket.org/team/widgets.git"},
                    "destination": {"owner": "acme", "name": "widgets"},
                    "status": "succeeded",
                    "attempts": 3,
                    "annotations": {"reviewed_by": "ops"}
                }
            }"#,
        )
        .unwrap();

        let mut store = StateStore::load(&path).unwrap();
        store.upsert(record("team", "gadgets")).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("annotations"));
        assert!(raw.contains("reviewed_by"));
    }

    #[test]
    fn records_iterate_in_key_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);

        let mut store = StateStore::load(&path).unwrap();
        store.upsert(record("zeta", "one")).unwrap();
        store.upsert(record("alpha", "two")).unwrap();

        let keys: Vec<String> = store.records().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["alpha/two", "zeta/one"]);
    }
}
