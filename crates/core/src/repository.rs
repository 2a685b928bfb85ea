//! Saved game records persisted as one collection in a key-value store.

use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{LifecycleError, Result},
    models::{Draft, GameRecord},
    store::KeyValueStore,
};

/// Store key holding the serialized collection.
pub const STORE_KEY: &str = "vibr.games";

/// Saved games mirrored in memory and written back whole on every mutation.
pub struct Repository<S> {
    store: S,
    records: Vec<GameRecord>,
}

impl<S: KeyValueStore> Repository<S> {
    /// Load the collection from `store`.
    ///
    /// Unreadable contents are discarded with a warning rather than failing;
    /// only an I/O failure of the store itself is reported.
    pub fn init(store: S) -> Result<Self> {
        let records = match store.get(STORE_KEY)? {
            Some(raw) => decode_records(&raw),
            None => Vec::new(),
        };
        info!(count = records.len(), "Saved games loaded");
        Ok(Self { store, records })
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of saved games.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been saved.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All saved games, oldest first.
    pub fn list(&self) -> Vec<GameRecord> {
        self.records.clone()
    }

    /// Saved games whose name or prompt contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<GameRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.list();
        }
        self.records
            .iter()
            .filter(|record| {
                record.name.to_lowercase().contains(&needle)
                    || record.prompt.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Fetch one saved game.
    pub fn load(&self, id: &str) -> Result<GameRecord> {
        self.records
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))
    }

    /// Save a draft as a new record.
    pub fn create(&mut self, draft: &Draft) -> Result<GameRecord> {
        validate_draft(draft)?;
        let record = GameRecord {
            id: Uuid::new_v4().to_string(),
            name: draft.name.clone(),
            prompt: draft.prompt.clone(),
            code: draft.code.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut next = self.records.clone();
        next.push(record.clone());
        self.commit(next)?;
        info!(id = %record.id, name = %record.name, "Game saved");
        Ok(record)
    }

    /// Overwrite the editable fields of an existing record.
    pub fn update(&mut self, id: &str, draft: &Draft) -> Result<GameRecord> {
        validate_draft(draft)?;
        let mut next = self.records.clone();
        let record = next
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))?;
        record.name = draft.name.clone();
        record.prompt = draft.prompt.clone();
        record.code = draft.code.clone();
        record.updated_at = Some(Utc::now());
        let updated = record.clone();

        self.commit(next)?;
        info!(id = %updated.id, name = %updated.name, "Game updated");
        Ok(updated)
    }

    /// Remove a record; unknown ids are ignored.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        if !self.records.iter().any(|record| record.id == id) {
            debug!(%id, "Delete ignored: no such game");
            return Ok(());
        }
        let next: Vec<GameRecord> = self
            .records
            .iter()
            .filter(|record| record.id != id)
            .cloned()
            .collect();
        self.commit(next)?;
        info!(%id, "Game deleted");
        Ok(())
    }

    fn commit(&mut self, next: Vec<GameRecord>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&next)
            .map_err(|err| LifecycleError::Persistence(err.to_string()))?;
        self.store.set(STORE_KEY, &serialized)?;
        self.records = next;
        Ok(())
    }
}

fn validate_draft(draft: &Draft) -> Result<()> {
    if draft.name.trim().is_empty() {
        return Err(LifecycleError::validation("Please enter a game title"));
    }
    if !draft.has_code() {
        return Err(LifecycleError::validation("No game code to save"));
    }
    Ok(())
}

/// Decode a stored collection, dropping anything that does not fit the schema.
pub(crate) fn decode_records(raw: &str) -> Vec<GameRecord> {
    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            warn!(kind = json_kind(&other), "Stored games are not a list; starting empty");
            return Vec::new();
        }
        Err(err) => {
            warn!("Stored games are unreadable ({err}); starting empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let record: GameRecord = match serde_json::from_value(item) {
            Ok(record) => record,
            Err(err) => {
                warn!(index, "Dropping malformed saved game: {err}");
                continue;
            }
        };
        if record.name.trim().is_empty() || record.code.trim().is_empty() {
            warn!(index, id = %record.id, "Dropping saved game with empty name or code");
            continue;
        }
        if !seen.insert(record.id.clone()) {
            warn!(index, id = %record.id, "Dropping saved game with duplicate id");
            continue;
        }
        records.push(record);
    }
    records
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, MemoryStore};
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(LifecycleError::Persistence("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(LifecycleError::Persistence("quota exceeded".to_string()))
        }
    }

    fn sample_draft() -> Draft {
        Draft::new("Shooter", "Space shooter with aliens", "import pygame\n")
    }

    #[test]
    fn save_list_round_trip() -> Result<()> {
        let mut repo = Repository::init(MemoryStore::new())?;
        let draft = sample_draft();
        let record = repo.create(&draft)?;

        let listed = repo.list();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].same_content(&draft));
        assert_eq!(listed[0].id, record.id);
        assert!(listed[0].created_at <= Utc::now());
        Ok(())
    }

    #[test]
    fn list_preserves_insertion_order() -> Result<()> {
        let mut repo = Repository::init(MemoryStore::new())?;
        for name in ["First", "Second", "Third"] {
            repo.create(&Draft::new(name, "prompt", "code"))?;
        }
        let names: Vec<String> = repo.list().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["First", "Second", "Third"]);
        Ok(())
    }

    #[test]
    fn persisted_collection_survives_reinit() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path());
        let mut repo = Repository::init(store.clone())?;
        let record = repo.create(&sample_draft())?;

        let reopened = Repository::init(store.clone())?;
        assert_eq!(reopened.list(), vec![record.clone()]);

        let raw = store.get(STORE_KEY)?.expect("collection written");
        let value: Value = serde_json::from_str(&raw)?;
        let stored = &value[0];
        for key in ["id", "name", "prompt", "code", "createdAt"] {
            assert!(stored.get(key).is_some(), "missing {key}");
        }
        Ok(())
    }

    #[test]
    fn create_requires_name_and_code() -> Result<()> {
        let mut repo = Repository::init(MemoryStore::new())?;
        assert!(matches!(
            repo.create(&Draft::new("  ", "p", "code")),
            Err(LifecycleError::Validation(_))
        ));
        assert!(matches!(
            repo.create(&Draft::new("Name", "p", "")),
            Err(LifecycleError::Validation(_))
        ));
        assert!(repo.is_empty());
        Ok(())
    }

    #[test]
    fn delete_is_idempotent() -> Result<()> {
        let mut repo = Repository::init(MemoryStore::new())?;
        let record = repo.create(&sample_draft())?;
        let before = repo.list();

        repo.delete("missing")?;
        assert_eq!(repo.list(), before);

        repo.delete(&record.id)?;
        assert!(repo.is_empty());
        repo.delete(&record.id)?;
        assert!(repo.is_empty());
        Ok(())
    }

    #[test]
    fn load_missing_is_not_found() -> Result<()> {
        let repo = Repository::init(MemoryStore::new())?;
        assert_eq!(
            repo.load("nope"),
            Err(LifecycleError::NotFound("nope".to_string()))
        );
        Ok(())
    }

    #[test]
    fn reloaded_draft_saves_equivalent_record() -> Result<()> {
        let mut repo = Repository::init(MemoryStore::new())?;
        let original = repo.create(&sample_draft())?;
        let loaded = repo.load(&original.id)?;
        let copy = repo.create(&loaded.to_draft())?;

        assert_ne!(copy.id, original.id);
        assert_eq!(
            (&copy.name, &copy.prompt, &copy.code),
            (&original.name, &original.prompt, &original.code)
        );
        Ok(())
    }

    #[test]
    fn update_keeps_identity() -> Result<()> {
        let mut repo = Repository::init(MemoryStore::new())?;
        let original = repo.create(&sample_draft())?;
        let updated = repo.update(
            &original.id,
            &Draft::new("Shooter II", "prompt", "new code"),
        )?;
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at.is_some());
        assert_eq!(repo.load(&original.id)?.name, "Shooter II");
        assert!(matches!(
            repo.update("missing", &sample_draft()),
            Err(LifecycleError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn search_matches_name_or_prompt() -> Result<()> {
        let mut repo = Repository::init(MemoryStore::new())?;
        repo.create(&Draft::new("Shooter", "aliens in space", "code"))?;
        repo.create(&Draft::new("Snake", "classic snake", "code"))?;
        assert_eq!(repo.search("ALIENS").len(), 1);
        assert_eq!(repo.search("s").len(), 2);
        assert_eq!(repo.search("  ").len(), 2);
        assert!(repo.search("tetris").is_empty());
        Ok(())
    }

    #[test]
    fn failed_write_leaves_collection_unchanged() -> Result<()> {
        let inner = MemoryStore::new();
        let mut seeded = Repository::init(inner.clone())?;
        let existing = seeded.create(&sample_draft())?;

        let mut repo = Repository::init(ReadOnlyStore(inner))?;
        assert!(matches!(
            repo.create(&sample_draft()),
            Err(LifecycleError::Persistence(_))
        ));
        assert!(matches!(
            repo.delete(&existing.id),
            Err(LifecycleError::Persistence(_))
        ));
        assert_eq!(repo.list(), vec![existing]);
        Ok(())
    }

    #[test]
    fn malformed_store_reads_as_empty() -> Result<()> {
        for raw in ["not json", "{\"games\": []}", "null"] {
            let store = MemoryStore::new();
            store.set(STORE_KEY, raw)?;
            let repo = Repository::init(store)?;
            assert!(repo.is_empty(), "{raw} should decode to empty");
        }
        Ok(())
    }

    #[test]
    fn non_utf8_store_file_opens_empty() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path());
        fs::write(store.path_for(STORE_KEY), [0xff, 0xfe, b'[', b']'])?;

        let mut repo = Repository::init(store.clone())?;
        assert!(repo.is_empty());
        repo.create(&sample_draft())?;
        assert_eq!(Repository::init(store)?.len(), 1);
        Ok(())
    }

    #[test]
    fn padded_name_is_stored_as_typed() -> Result<()> {
        let mut repo = Repository::init(MemoryStore::new())?;
        let draft = Draft::new(" Shooter ", "p", "code");
        let record = repo.create(&draft)?;
        assert_eq!(record.name, " Shooter ");
        assert!(repo.list()[0].same_content(&draft));

        let renamed = Draft::new("  Shooter II", "p", "code");
        let updated = repo.update(&record.id, &renamed)?;
        assert!(updated.same_content(&renamed));
        Ok(())
    }

    #[test]
    fn invalid_records_are_dropped_individually() {
        let raw = json!([
            {"id": "a", "name": "Good", "prompt": "p", "code": "c", "createdAt": "2024-05-01T12:00:00Z"},
            {"id": "b", "name": "No code", "prompt": "p", "createdAt": "2024-05-01T12:00:00Z"},
            {"id": "c", "name": "", "prompt": "p", "code": "c", "createdAt": "2024-05-01T12:00:00Z"},
            {"id": "a", "name": "Dup", "prompt": "p", "code": "c", "createdAt": "2024-05-01T12:00:00Z"},
            {"id": "d", "name": "Bad date", "prompt": "p", "code": "c", "createdAt": "yesterday"},
            42,
            {"id": "e", "name": "Also good", "prompt": "", "code": "c", "createdAt": "2024-05-02T08:30:00.123Z"}
        ])
        .to_string();
        let records = decode_records(&raw);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "e"]);
    }
}
