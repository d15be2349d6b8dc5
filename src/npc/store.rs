//! NPC Record Store: the authoritative collection of NPC records, persisted as one
//! JSON document mapping record id to record.
//!
//! Every mutation is followed by a synchronous full-document write so an edit is
//! never lost to a crash. Writes go through a locked temp-file-and-rename so a
//! reader never observes a half-written document.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, info, warn};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::logutil::escape_log;
use crate::npc::errors::NpcError;
use crate::npc::types::{InstanceId, NpcField, NpcRecord, Vec3};

/// Serializes a record slice as a JSON object keyed by record id.
struct RecordsDocument<'a>(&'a [NpcRecord]);

impl Serialize for RecordsDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for record in self.0 {
            map.serialize_entry(&record.id, record)?;
        }
        map.end()
    }
}

/// Loaded document entries in the order they appear in the file.
struct LoadedRecords(Vec<(String, NpcRecord)>);

impl<'de> Deserialize<'de> for LoadedRecords {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = LoadedRecords;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of record id to NPC record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, record)) = access.next_entry::<String, NpcRecord>()? {
                    entries.push((key, record));
                }
                Ok(LoadedRecords(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// File-backed store of [`NpcRecord`]s in insertion order.
pub struct NpcStore {
    path: PathBuf,
    records: Vec<NpcRecord>,
}

impl NpcStore {
    /// Open the store at `path`. A missing or unparseable document starts an empty
    /// store; only a failure to create the parent directory is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, NpcError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let records = Self::load_records(&path);
        info!("Loaded {} NPC record(s) from {}", records.len(), path.display());
        Ok(Self { path, records })
    }

    fn load_records(path: &Path) -> Vec<NpcRecord> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read NPC data {}: {} (starting empty)", path.display(), e);
                return Vec::new();
            }
        };
        if content.trim().is_empty() {
            return Vec::new();
        }
        let loaded: LoadedRecords = match serde_json::from_str(&content) {
            Ok(l) => l,
            Err(e) => {
                warn!("Failed to parse NPC data {}: {} (starting empty)", path.display(), e);
                return Vec::new();
            }
        };

        let mut records: Vec<NpcRecord> = Vec::with_capacity(loaded.0.len());
        for (key, mut record) in loaded.0 {
            if record.id != key {
                warn!(
                    "NPC record keyed '{}' carried id '{}'; using the key",
                    escape_log(&key),
                    escape_log(&record.id)
                );
                record.id = key;
            }
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
        }
        records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Allocate a fresh id, store a record with defaults for every other field and persist.
    pub fn create(&mut self, name: &str, position: Vec3, orientation: Vec3) -> Result<String, NpcError> {
        self.create_with(name, position, orientation, |_| {})
    }

    /// Like [`NpcStore::create`], letting the caller adjust defaults before the first save.
    pub fn create_with(
        &mut self,
        name: &str,
        position: Vec3,
        orientation: Vec3,
        init: impl FnOnce(&mut NpcRecord),
    ) -> Result<String, NpcError> {
        let id = Uuid::new_v4().to_string();
        let mut record = NpcRecord::new(&id, name, position, orientation);
        init(&mut record);
        self.records.push(record);
        if let Err(e) = self.save() {
            self.records.pop();
            return Err(e);
        }
        info!("Created NPC '{}' ({})", escape_log(name), id);
        Ok(id)
    }

    /// Insert or replace a fully-formed record and persist.
    pub fn put(&mut self, record: NpcRecord) -> Result<(), NpcError> {
        if record.id.is_empty() {
            return Err(NpcError::InvalidInput("record id is empty".to_string()));
        }
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                let live = existing.live_instance;
                *existing = record;
                existing.live_instance = live;
            }
            None => self.records.push(record),
        }
        self.save()
    }

    pub fn get(&self, id: &str) -> Result<&NpcRecord, NpcError> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| NpcError::NotFound(format!("npc: {}", id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// Apply `mutation` to the record and persist the whole document.
    pub fn update<R>(
        &mut self,
        id: &str,
        mutation: impl FnOnce(&mut NpcRecord) -> R,
    ) -> Result<R, NpcError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| NpcError::NotFound(format!("npc: {}", id)))?;
        let out = mutation(record);
        self.save()?;
        Ok(out)
    }

    /// Apply a parsed field edit. `None` (unparseable number) still re-saves
    /// but leaves the record untouched.
    pub fn update_field(&mut self, id: &str, field: Option<NpcField>) -> Result<&NpcRecord, NpcError> {
        self.update(id, |record| {
            if let Some(field) = field {
                field.apply(record);
            }
        })?;
        self.get(id)
    }

    /// Remove a record. The caller must despawn any live instance first.
    /// If the document cannot be written the record stays in place.
    pub fn delete(&mut self, id: &str) -> Result<bool, NpcError> {
        let Some(pos) = self.records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let removed = self.records.remove(pos);
        if let Err(e) = self.save() {
            self.records.insert(pos, removed);
            return Err(e);
        }
        if removed.live_instance.is_some() {
            warn!("Deleted NPC {} while instance still bound", id);
        }
        Ok(true)
    }

    pub fn list_all(&self) -> &[NpcRecord] {
        &self.records
    }

    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// First record whose id equals `token`, otherwise the first whose name
    /// contains it. Several names sharing the substring resolve to the earliest.
    pub fn find_by_id_or_name(&self, token: &str) -> Option<&NpcRecord> {
        self.records
            .iter()
            .find(|r| r.id == token)
            .or_else(|| self.records.iter().find(|r| r.name.contains(token)))
    }

    /// Set or clear the in-memory live instance correlation. Not persisted.
    pub(crate) fn bind_instance(&mut self, id: &str, instance: Option<InstanceId>) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.live_instance = instance;
                true
            }
            None => false,
        }
    }

    /// Overwrite the persisted document with the full in-memory collection.
    pub fn save(&self) -> Result<(), NpcError> {
        let content = serde_json::to_string_pretty(&RecordsDocument(&self.records))?;
        write_file_locked(&self.path, &content)?;
        debug!("Saved {} NPC record(s) to {}", self.records.len(), self.path.display());
        Ok(())
    }
}

/// Replace `path` with `content` under an exclusive lock via temp file and rename.
fn write_file_locked(path: &Path, content: &str) -> Result<(), NpcError> {
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    lock_file.lock_exclusive()?;

    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let base = path.file_name().and_then(|s| s.to_str()).unwrap_or("npcs.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                if let Err(e) = tmp.write_all(content.as_bytes()).and_then(|_| tmp.flush()) {
                    let _ = fs::remove_file(&candidate);
                    return Err(NpcError::Io(e));
                }
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => return Err(NpcError::Io(e)),
        }
    };

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(NpcError::Io(e));
    }
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }
    drop(lock_file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_in(dir: &TempDir) -> NpcStore {
        NpcStore::open(dir.path().join("npcs.json")).expect("store")
    }

    #[test]
    fn missing_document_starts_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_in(&dir);
        assert!(store.is_empty());
    }

    #[test]
    fn garbage_document_starts_empty() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("npcs.json"), "{ not json").unwrap();
        let store = open_in(&dir);
        assert!(store.is_empty());
    }

    #[test]
    fn create_persists_immediately() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_in(&dir);
        let id = store
            .create("Guard", Vec3::new(1.0, 2.0, 3.0), Vec3::default())
            .expect("create");
        let raw = fs::read_to_string(dir.path().join("npcs.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc[&id]["name"], "Guard");
        assert_eq!(doc[&id]["position"]["y"], 2.0);
    }

    #[test]
    fn key_overrides_embedded_id() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("npcs.json"),
            r#"{"k1": {"id": "other", "name": "Ann"}}"#,
        )
        .unwrap();
        let store = open_in(&dir);
        assert_eq!(store.get("k1").expect("k1").name, "Ann");
        assert!(store.get("other").is_err());
    }

    fn temp_leftovers(dir: &TempDir) -> Vec<String> {
        fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains(".tmp-"))
            .collect()
    }

    #[test]
    fn failed_delete_keeps_record() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_in(&dir);
        let id = store.create("Stays", Vec3::default(), Vec3::default()).unwrap();

        // A directory where the document should be makes every write fail.
        let path = dir.path().join("npcs.json");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.delete(&id).is_err());
        assert_eq!(store.get(&id).expect("still present").name, "Stays");
        assert!(store.create("Ghost", Vec3::default(), Vec3::default()).is_err());
        assert_eq!(store.len(), 1);
        assert!(temp_leftovers(&dir).is_empty());
    }

    #[test]
    fn saves_leave_no_temp_files() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_in(&dir);
        let id = store.create("A", Vec3::default(), Vec3::default()).unwrap();
        store.update(&id, |r| r.health = 5.0).unwrap();
        store.delete(&id).unwrap();
        assert!(temp_leftovers(&dir).is_empty());
    }

    #[test]
    fn delete_reports_absence() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = open_in(&dir);
        let id = store.create("A", Vec3::default(), Vec3::default()).unwrap();
        assert!(store.delete(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
    }
}
