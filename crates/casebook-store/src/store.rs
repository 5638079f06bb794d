use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use casebook_core::chronology::{merge_documents, merge_events};
use casebook_core::{
    now_millis, Case, CaseStatus, ChronologyEvent, ComplianceReport, NewCase, ScannedDocument,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::state::{StateKind, SCHEMA_VERSION};
use crate::{Result, StoreError};

mod embedded {
    refinery::embed_migrations!("migrations");
}

pub struct CaseStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl CaseStore {
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(default_db_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(&path)?;
        embedded::migrations::runner().run(&mut conn)?;

        tracing::info!("Case database initialized at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(path),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        embedded::migrations::runner().run(&mut conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // Cases

    pub fn create_case(&self, new: NewCase) -> Result<Case> {
        if new.reference.trim().is_empty() {
            return Err(StoreError::InvalidInput("Case reference is required".to_string()));
        }
        if new.title.trim().is_empty() {
            return Err(StoreError::InvalidInput("Case title is required".to_string()));
        }

        let case = Case::new(new);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cases (id, reference, title, client, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                case.id,
                case.reference,
                case.title,
                case.client,
                case.status.as_str(),
                case.created_at,
                case.updated_at,
            ],
        )?;

        tracing::debug!("Created case {} ({})", case.id, case.reference);
        Ok(case)
    }

    pub fn get_case(&self, id: &str) -> Result<Option<Case>> {
        let conn = self.lock()?;
        read_case(&conn, id)
    }

    pub fn require_case(&self, id: &str) -> Result<Case> {
        self.get_case(id)?
            .ok_or_else(|| StoreError::NotFound(format!("case {}", id)))
    }

    pub fn list_cases(&self) -> Result<Vec<Case>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, reference, title, client, status, created_at, updated_at
             FROM cases ORDER BY created_at DESC, id",
        )?;
        let rows = stmt.query_map([], case_from_row)?;

        let mut cases = Vec::new();
        for row in rows {
            cases.push(row?);
        }
        Ok(cases)
    }

    pub fn update_case_status(&self, id: &str, status: CaseStatus) -> Result<Case> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE cases SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now_millis(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("case {}", id)));
        }
        read_case(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("case {}", id)))
    }

    /// Delete a case and every state blob it owns. Returns false if it did not exist.
    pub fn delete_case(&self, id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let state_rows = tx.execute("DELETE FROM case_state WHERE case_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM cases WHERE id = ?1", params![id])?;
        tx.commit()?;

        tracing::debug!("Deleted case {} with {} state entries", id, state_rows);
        Ok(deleted > 0)
    }

    // Case state

    pub fn get_state(&self, case_id: &str, kind: StateKind) -> Result<Option<serde_json::Value>> {
        let conn = self.lock()?;
        read_state(&conn, &kind.key(case_id))
    }

    pub fn get_state_as<T: DeserializeOwned>(
        &self,
        case_id: &str,
        kind: StateKind,
    ) -> Result<Option<T>> {
        let conn = self.lock()?;
        read_state(&conn, &kind.key(case_id))
    }

    pub fn put_state<T: Serialize>(&self, case_id: &str, kind: StateKind, value: &T) -> Result<()> {
        let conn = self.lock()?;
        if read_case(&conn, case_id)?.is_none() {
            return Err(StoreError::NotFound(format!("case {}", case_id)));
        }
        write_state(&conn, case_id, kind, value)
    }

    /// Read-modify-write a state blob inside one immediate transaction, so concurrent
    /// writers to the same key serialize instead of overwriting each other.
    pub fn update_state<T, F>(&self, case_id: &str, kind: StateKind, update: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(T) -> T,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if read_case(&tx, case_id)?.is_none() {
            return Err(StoreError::NotFound(format!("case {}", case_id)));
        }
        let current: T = read_state(&tx, &kind.key(case_id))?.unwrap_or_default();
        let updated = update(current);
        write_state(&tx, case_id, kind, &updated)?;
        tx.commit()?;

        Ok(updated)
    }

    pub fn delete_state(&self, case_id: &str, kind: StateKind) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM case_state WHERE key = ?1",
            params![kind.key(case_id)],
        )?;
        Ok(deleted > 0)
    }

    pub fn list_state_keys(&self, case_id: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM case_state WHERE case_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![case_id], |row| row.get(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    // Typed helpers

    pub fn documents(&self, case_id: &str) -> Result<Vec<ScannedDocument>> {
        Ok(self
            .get_state_as(case_id, StateKind::ScannedDocuments)?
            .unwrap_or_default())
    }

    pub fn chronology(&self, case_id: &str) -> Result<Vec<ChronologyEvent>> {
        Ok(self
            .get_state_as(case_id, StateKind::Chronology)?
            .unwrap_or_default())
    }

    pub fn compliance(&self, case_id: &str) -> Result<Option<ComplianceReport>> {
        self.get_state_as(case_id, StateKind::Compliance)
    }

    pub fn save_compliance(&self, report: &ComplianceReport) -> Result<()> {
        self.put_state(&report.case_id, StateKind::Compliance, report)
    }

    /// Merge processed documents and their events into the case in a single transaction.
    /// Returns the stored document list and chronology after the merge.
    pub fn merge_ingest(
        &self,
        case_id: &str,
        documents: Vec<ScannedDocument>,
        events: Vec<ChronologyEvent>,
    ) -> Result<(Vec<ScannedDocument>, Vec<ChronologyEvent>)> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if read_case(&tx, case_id)?.is_none() {
            return Err(StoreError::NotFound(format!("case {}", case_id)));
        }

        let stored_docs: Vec<ScannedDocument> =
            read_state(&tx, &StateKind::ScannedDocuments.key(case_id))?.unwrap_or_default();
        let stored_events: Vec<ChronologyEvent> =
            read_state(&tx, &StateKind::Chronology.key(case_id))?.unwrap_or_default();

        // Events from an incoming document that lost the file-name race belong to a
        // document this case does not keep.
        let stored_names: HashSet<String> =
            stored_docs.iter().map(|d| d.file_name.clone()).collect();
        let events: Vec<ChronologyEvent> = events
            .into_iter()
            .filter(|e| !stored_names.contains(&e.source_document))
            .collect();

        let merged_docs = merge_documents(stored_docs, documents);
        let merged_events = merge_events(stored_events, events);

        write_state(&tx, case_id, StateKind::ScannedDocuments, &merged_docs)?;
        write_state(&tx, case_id, StateKind::Chronology, &merged_events)?;
        tx.execute(
            "UPDATE cases SET updated_at = ?1 WHERE id = ?2",
            params![now_millis(), case_id],
        )?;
        tx.commit()?;

        tracing::info!(
            "Case {} now has {} documents and {} events",
            case_id,
            merged_docs.len(),
            merged_events.len()
        );
        Ok((merged_docs, merged_events))
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("casebook")
        .join("casebook.db")
}

fn case_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Case> {
    Ok(Case {
        id: row.get(0)?,
        reference: row.get(1)?,
        title: row.get(2)?,
        client: row.get(3)?,
        status: CaseStatus::from_str(&row.get::<_, String>(4)?),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn read_case(conn: &Connection, id: &str) -> Result<Option<Case>> {
    let case = conn
        .query_row(
            "SELECT id, reference, title, client, status, created_at, updated_at
             FROM cases WHERE id = ?1",
            params![id],
            case_from_row,
        )
        .optional()?;
    Ok(case)
}

fn read_state<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT schema_version, value_json FROM case_state WHERE key = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((version, json)) = row else {
        return Ok(None);
    };
    if version > SCHEMA_VERSION {
        return Err(StoreError::SchemaVersion {
            key: key.to_string(),
            found: version,
        });
    }
    Ok(Some(serde_json::from_str(&json)?))
}

fn write_state<T: Serialize>(
    conn: &Connection,
    case_id: &str,
    kind: StateKind,
    value: &T,
) -> Result<()> {
    let key = kind.key(case_id);
    let json = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO case_state (key, case_id, kind, schema_version, value_json, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(key) DO UPDATE SET
            schema_version = excluded.schema_version,
            value_json = excluded.value_json,
            updated_at = excluded.updated_at",
        params![key, case_id, kind.as_str(), SCHEMA_VERSION, json, now_millis()],
    )?;

    tracing::debug!("Saved state {} ({} bytes)", key, json.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebook_core::{CheckStatus, ComplianceCheck, EventCategory};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn new_case(store: &CaseStore, reference: &str) -> Case {
        store
            .create_case(NewCase {
                reference: reference.to_string(),
                title: "R v Example".to_string(),
                client: "Example".to_string(),
            })
            .unwrap()
    }

    fn event(id: &str, date: &str) -> ChronologyEvent {
        ChronologyEvent {
            id: id.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time: None,
            title: id.to_string(),
            description: id.to_string(),
            category: EventCategory::Other,
            source_document: "doc.txt".to_string(),
            entities: Vec::new(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_case_crud() {
        let store = CaseStore::open_in_memory().unwrap();
        let case = new_case(&store, "SWK2024/0117");

        assert_eq!(store.get_case(&case.id).unwrap(), Some(case.clone()));
        assert_eq!(store.list_cases().unwrap().len(), 1);

        let closed = store.update_case_status(&case.id, CaseStatus::Closed).unwrap();
        assert_eq!(closed.status, CaseStatus::Closed);

        assert!(store.delete_case(&case.id).unwrap());
        assert!(!store.delete_case(&case.id).unwrap());
        assert_eq!(store.get_case(&case.id).unwrap(), None);
    }

    #[test]
    fn test_create_case_requires_title() {
        let store = CaseStore::open_in_memory().unwrap();
        let result = store.create_case(NewCase {
            reference: "X1".to_string(),
            title: "  ".to_string(),
            client: String::new(),
        });
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn test_state_round_trip_and_keys() {
        let store = CaseStore::open_in_memory().unwrap();
        let case = new_case(&store, "A1");

        let args = json!({"grounds": ["abuse of process"]});
        store
            .put_state(&case.id, StateKind::SkeletonArguments, &args)
            .unwrap();
        assert_eq!(
            store.get_state(&case.id, StateKind::SkeletonArguments).unwrap(),
            Some(args)
        );
        assert_eq!(
            store.list_state_keys(&case.id).unwrap(),
            vec![format!("skeleton_arguments_{}", case.id)]
        );

        assert!(store.delete_state(&case.id, StateKind::SkeletonArguments).unwrap());
        assert_eq!(store.get_state(&case.id, StateKind::SkeletonArguments).unwrap(), None);
    }

    #[test]
    fn test_state_requires_case() {
        let store = CaseStore::open_in_memory().unwrap();
        let result = store.put_state("missing", StateKind::Analysis, &json!({}));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_update_state_is_read_modify_write() {
        let store = CaseStore::open_in_memory().unwrap();
        let case = new_case(&store, "A2");

        for i in 0..3 {
            store
                .update_state(&case.id, StateKind::Chronology, |mut events: Vec<ChronologyEvent>| {
                    events.push(event(&format!("e{}", i), "2024-01-01"));
                    events
                })
                .unwrap();
        }
        assert_eq!(store.chronology(&case.id).unwrap().len(), 3);
    }

    #[test]
    fn test_merge_ingest_dedupes() {
        let store = CaseStore::open_in_memory().unwrap();
        let case = new_case(&store, "A3");

        let first = ScannedDocument::pending("statement.txt", 10);
        store
            .merge_ingest(&case.id, vec![first], vec![event("b", "2024-03-01")])
            .unwrap();

        let again = ScannedDocument::pending("statement.txt", 12);
        let other = ScannedDocument::pending("bundle.pdf", 99);
        let (docs, events) = store
            .merge_ingest(
                &case.id,
                vec![again, other],
                vec![event("b", "2024-03-01"), event("a", "2023-01-01")],
            )
            .unwrap();

        let names: Vec<&str> = docs.iter().map(|d| d.file_name.as_str()).collect();
        assert_eq!(names, vec!["statement.txt", "bundle.pdf"]);
        assert_eq!(docs[0].size_bytes, 10);

        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_merge_ingest_drops_events_of_duplicate_document() {
        let store = CaseStore::open_in_memory().unwrap();
        let case = new_case(&store, "A5");

        let mut first = event("a", "2024-03-01");
        first.source_document = "statement.txt".to_string();
        store
            .merge_ingest(
                &case.id,
                vec![ScannedDocument::pending("statement.txt", 10)],
                vec![first],
            )
            .unwrap();

        let mut late = event("b", "2024-04-01");
        late.source_document = "statement.txt".to_string();
        let (docs, events) = store
            .merge_ingest(
                &case.id,
                vec![ScannedDocument::pending("statement.txt", 11)],
                vec![late],
            )
            .unwrap();

        assert_eq!(docs.len(), 1);
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(store.chronology(&case.id).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_case_removes_state() {
        let store = CaseStore::open_in_memory().unwrap();
        let case = new_case(&store, "A4");
        let report = ComplianceReport::new(
            &case.id,
            vec![ComplianceCheck {
                id: "case-details".to_string(),
                name: "Case details".to_string(),
                category: "Case".to_string(),
                status: CheckStatus::Pass,
                details: String::new(),
            }],
        );
        store.save_compliance(&report).unwrap();
        assert_eq!(store.compliance(&case.id).unwrap(), Some(report));

        store.delete_case(&case.id).unwrap();
        assert!(store.list_state_keys(&case.id).unwrap().is_empty());
    }

    #[test]
    fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("casebook.db");

        let id = {
            let store = CaseStore::new(Some(path.clone())).unwrap();
            new_case(&store, "D1").id
        };

        let reopened = CaseStore::new(Some(path.clone())).unwrap();
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        assert!(reopened.get_case(&id).unwrap().is_some());
    }

    #[test]
    fn test_newer_schema_rejected() {
        let store = CaseStore::open_in_memory().unwrap();
        let case = new_case(&store, "A5");
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "INSERT INTO case_state (key, case_id, kind, schema_version, value_json, updated_at)
                 VALUES (?1, ?2, 'analysis', 99, '{}', 0)",
                params![StateKind::Analysis.key(&case.id), case.id],
            )
            .unwrap();
        }
        let result = store.get_state(&case.id, StateKind::Analysis);
        assert!(matches!(result, Err(StoreError::SchemaVersion { found: 99, .. })));
    }
}
