use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use redb::{Database, ReadableTable, TableDefinition};

use crate::store::model::{EntryFields, EntryRecord};

const ENTRIES: TableDefinition<u64, &[u8]> = TableDefinition::new("entries");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ID: &str = "next_id";

/// redb-backed record store. Clones share one database handle and are safe
/// to use from any number of request tasks.
///
/// The store moves ciphertext only; encryption and decryption happen in the
/// handlers, on the far side of this boundary.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Opens (or creates) the database and makes sure both tables exist,
    /// so later read transactions never race table creation.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).context("open database")?;
        let txn = db.begin_write()?;
        {
            txn.open_table(ENTRIES)?;
            txn.open_table(META)?;
        }
        txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Insert a new record, assigning the next id from the persistent
    /// counter. Counter bump and insert commit in one transaction.
    pub fn insert(&self, fields: EntryFields) -> Result<EntryRecord> {
        let txn = self.db.begin_write()?;
        let record = {
            let mut meta = txn.open_table(META)?;
            let id = meta.get(NEXT_ID)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(NEXT_ID, id + 1)?;

            let record = fields.into_record(id);
            let bytes = encode(&record)?;
            let mut entries = txn.open_table(ENTRIES)?;
            entries.insert(id, bytes.as_slice())?;
            record
        };
        txn.commit()?;
        Ok(record)
    }

    pub fn get(&self, id: u64) -> Result<Option<EntryRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Replace all fields of an existing record. Returns `None` (and writes
    /// nothing) when the id is unknown.
    pub fn update(&self, id: u64, fields: EntryFields) -> Result<Option<EntryRecord>> {
        let txn = self.db.begin_write()?;
        let updated = {
            let mut entries = txn.open_table(ENTRIES)?;
            let exists = entries.get(id)?.is_some();
            if exists {
                let record = fields.into_record(id);
                let bytes = encode(&record)?;
                entries.insert(id, bytes.as_slice())?;
                Some(record)
            } else {
                None
            }
        };
        txn.commit()?;
        Ok(updated)
    }

    /// Delete a record by id. Returns true if it existed.
    pub fn delete(&self, id: u64) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut entries = txn.open_table(ENTRIES)?;
            let existed = entries.remove(id)?.is_some();
            existed
        };
        txn.commit()?;
        Ok(existed)
    }

    /// List records ordered by (name, url), optionally filtered to names
    /// containing `query`.
    pub fn list(&self, query: Option<&str>) -> Result<Vec<EntryRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;

        let mut records = Vec::new();
        for item in table.iter()? {
            let (_k, v) = item?;
            let record = decode(v.value())?;
            if query.map_or(true, |q| record.matches_query(q)) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.listing_order(b));
        Ok(records)
    }
}

fn encode(record: &EntryRecord) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(record, bincode::config::standard())
        .context("bincode encode entry")
}

fn decode(bytes: &[u8]) -> Result<EntryRecord> {
    let (record, _): (EntryRecord, _) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .context("bincode decode entry")?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> Store {
        Store::open(&dir.path().join("keyrack.db")).unwrap()
    }

    fn fields(name: &str, url: &str) -> EntryFields {
        EntryFields {
            name: name.into(),
            url: url.into(),
            login: "user".into(),
            secret: "AAAAAAAAAAAAAAAAAAAAAA==".into(),
        }
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let a = store.insert(fields("a", "https://a.example")).unwrap();
        let b = store.insert(fields("b", "https://b.example")).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn ids_are_never_reused_after_delete() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let a = store.insert(fields("a", "https://a.example")).unwrap();
        assert!(store.delete(a.id).unwrap());
        let b = store.insert(fields("b", "https://b.example")).unwrap();
        assert_eq!(b.id, 2);
    }

    #[test]
    fn get_returns_what_was_inserted() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let inserted = store.insert(fields("mail", "https://mail.example")).unwrap();
        let fetched = store.get(inserted.id).unwrap().unwrap();
        assert_eq!(fetched.name, "mail");
        assert_eq!(fetched.url, "https://mail.example");
        assert_eq!(fetched.login, "user");
        assert_eq!(fetched.secret, "AAAAAAAAAAAAAAAAAAAAAA==");
    }

    #[test]
    fn get_unknown_id_is_none() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.get(999).unwrap().is_none());
    }

    #[test]
    fn update_replaces_fields_and_keeps_id() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let inserted = store.insert(fields("old", "https://old.example")).unwrap();
        let updated = store
            .update(inserted.id, fields("new", "https://new.example"))
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.name, "new");
        assert_eq!(store.get(inserted.id).unwrap().unwrap().name, "new");
    }

    #[test]
    fn update_unknown_id_is_none() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.update(999, fields("x", "https://x.example")).unwrap().is_none());
    }

    #[test]
    fn delete_reports_whether_it_existed() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let inserted = store.insert(fields("x", "https://x.example")).unwrap();
        assert!(store.delete(inserted.id).unwrap());
        assert!(!store.delete(inserted.id).unwrap());
        assert!(store.get(inserted.id).unwrap().is_none());
    }

    #[test]
    fn list_is_sorted_by_name_then_url() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(fields("mail", "https://b.example")).unwrap();
        store.insert(fields("bank", "https://bank.example")).unwrap();
        store.insert(fields("mail", "https://a.example")).unwrap();

        let listed = store.list(None).unwrap();
        let keys: Vec<(&str, &str)> = listed
            .iter()
            .map(|r| (r.name.as_str(), r.url.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("bank", "https://bank.example"),
                ("mail", "https://a.example"),
                ("mail", "https://b.example"),
            ]
        );
    }

    #[test]
    fn list_filters_by_name_substring() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.insert(fields("facebook", "https://facebook.com")).unwrap();
        store.insert(fields("bank", "https://bank.example")).unwrap();

        let hits = store.list(Some("face")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "facebook");
        assert!(store.list(Some("zzz")).unwrap().is_empty());
    }

    #[test]
    fn empty_store_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.list(None).unwrap().is_empty());
    }
}
