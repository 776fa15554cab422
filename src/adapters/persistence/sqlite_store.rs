//! SQLite-backed GroupStore via libsql.
//!
//! Single `directory_groups` table; `UNIQUE(code)` enforces join-code uniqueness and
//! member-count increments are one `UPDATE ... RETURNING` statement.
//! Database file: {data_dir}/directory.db

use crate::adapters::persistence::{SnapshotHub, new_document_id};
use crate::domain::{DomainError, Group, GroupId, JoinCode, NewGroup};
use crate::ports::{GroupStore, GroupStream};
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, Row, params};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const GROUPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS directory_groups (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    kind TEXT NOT NULL,
    code TEXT NOT NULL UNIQUE,
    member_count INTEGER NOT NULL DEFAULT 1 CHECK (member_count >= 1),
    created_at INTEGER NOT NULL
)"#;
const GROUPS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_directory_groups_created ON directory_groups (created_at)";

const SELECT_COLUMNS: &str = "id, name, kind, code, member_count, created_at";

/// Retries when a freshly generated document id collides with an existing row.
const MAX_ID_ATTEMPTS: usize = 3;

fn store_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Store(e.to_string())
}

pub struct SqliteGroupStore {
    db: Database,
    db_path: PathBuf,
    /// Serializes in-process writers so snapshots are published in write order.
    write_lock: Mutex<()>,
    hub: SnapshotHub,
}

impl SqliteGroupStore {
    /// Connect to (or create) the database and ensure the schema exists.
    /// Call once at startup; the returned store is safe to share via Arc.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(store_err)?;
        let db_path = base.join("directory.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(store_err)?;
        let conn = db.connect().map_err(store_err)?;

        // PRAGMA returns a row; query and drain (execute fails when rows are returned).
        run_pragma(&conn, "PRAGMA journal_mode=WAL").await?;
        run_pragma(&conn, "PRAGMA synchronous=NORMAL").await?;

        conn.execute(GROUPS_TABLE, ()).await.map_err(store_err)?;
        conn.execute(GROUPS_INDEX, ()).await.map_err(store_err)?;

        info!(path = %db_path.display(), "SQLite directory store connected (WAL)");

        Ok(Self {
            db,
            db_path,
            write_lock: Mutex::new(()),
            hub: SnapshotHub::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn connection(&self) -> Result<Connection, DomainError> {
        let conn = self.db.connect().map_err(store_err)?;
        run_pragma(&conn, "PRAGMA busy_timeout = 5000").await?;
        Ok(conn)
    }

    async fn query_one(
        conn: &Connection,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<Group>, DomainError> {
        let mut rows = conn.query(sql, params).await.map_err(store_err)?;
        let group = match rows.next().await.map_err(store_err)? {
            Some(row) => Some(row_to_group(&row)?),
            None => None,
        };
        // Drain so UPDATE ... RETURNING statements run to completion.
        while rows.next().await.map_err(store_err)?.is_some() {}
        Ok(group)
    }

    async fn select_all(conn: &Connection) -> Result<Vec<Group>, DomainError> {
        let sql = format!(
            "SELECT {} FROM directory_groups ORDER BY created_at, rowid",
            SELECT_COLUMNS
        );
        let mut rows = conn.query(&sql, ()).await.map_err(store_err)?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            match row_to_group(&row) {
                Ok(g) => groups.push(g),
                Err(e) => warn!(error = %e, "skipping malformed group row"),
            }
        }
        Ok(groups)
    }

    /// Re-read the table and broadcast it. Called with `write_lock` held.
    async fn publish_snapshot(&self, conn: &Connection) {
        if self.hub.subscriber_count() == 0 {
            return;
        }
        match Self::select_all(conn).await {
            Ok(snapshot) => self.hub.publish(snapshot),
            Err(e) => warn!(error = %e, "failed to read snapshot for subscribers"),
        }
    }
}

async fn run_pragma(conn: &Connection, pragma: &str) -> Result<(), DomainError> {
    let mut rows = conn
        .query(pragma, ())
        .await
        .map_err(|e| DomainError::Store(format!("{} failed: {}", pragma, e)))?;
    while rows.next().await.map_err(store_err)?.is_some() {}
    Ok(())
}

fn row_to_group(row: &Row) -> Result<Group, DomainError> {
    let id: String = row.get(0).map_err(store_err)?;
    let name: String = row.get(1).map_err(store_err)?;
    let kind: String = row.get(2).map_err(store_err)?;
    let code: String = row.get(3).map_err(store_err)?;
    let member_count: i64 = row.get(4).map_err(store_err)?;
    let created_ms: i64 = row.get(5).map_err(store_err)?;
    let code = JoinCode::parse(&code)
        .map_err(|e| DomainError::Store(format!("row {} has bad code: {}", id, e)))?;
    let member_count = u64::try_from(member_count)
        .map_err(|_| DomainError::Store(format!("row {} has negative member_count", id)))?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(created_ms).unwrap_or_default();
    Ok(Group {
        id: GroupId(id),
        name,
        kind,
        code,
        member_count,
        created_at,
    })
}

fn is_unique_violation(e: &libsql::Error, column: &str) -> bool {
    let msg = e.to_string();
    msg.contains("UNIQUE constraint failed") && msg.contains(column)
}

#[async_trait::async_trait]
impl GroupStore for SqliteGroupStore {
    async fn create(&self, draft: NewGroup) -> Result<Group, DomainError> {
        let _guard = self.write_lock.lock().await;
        let conn = self.connection().await?;
        let created_at = Utc::now();

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = new_document_id();
            let result = conn
                .execute(
                    r#"
                    INSERT INTO directory_groups (id, name, kind, code, member_count, created_at)
                    VALUES (?1, ?2, ?3, ?4, 1, ?5)
                    "#,
                    params![
                        id.as_str(),
                        draft.name.as_str(),
                        draft.kind.as_str(),
                        draft.code.as_str(),
                        created_at.timestamp_millis()
                    ],
                )
                .await;
            match result {
                Ok(_) => {
                    let group = Group::from_new(id, draft, created_at);
                    debug!(group_id = %group.id, code = %group.code, "group inserted");
                    self.publish_snapshot(&conn).await;
                    return Ok(group);
                }
                Err(e) if is_unique_violation(&e, "directory_groups.code") => {
                    return Err(DomainError::Conflict(format!(
                        "join code {} already in use",
                        draft.code
                    )));
                }
                Err(e) if is_unique_violation(&e, "directory_groups.id") => {
                    debug!(group_id = %id, "document id collision, regenerating");
                    continue;
                }
                Err(e) => return Err(store_err(e)),
            }
        }
        Err(DomainError::Store(
            "could not allocate a unique document id".into(),
        ))
    }

    async fn find_by_code(&self, code: &JoinCode) -> Result<Option<Group>, DomainError> {
        let conn = self.connection().await?;
        let sql = format!(
            "SELECT {} FROM directory_groups WHERE code = ?1",
            SELECT_COLUMNS
        );
        Self::query_one(&conn, &sql, params![code.as_str()]).await
    }

    async fn get(&self, id: &GroupId) -> Result<Option<Group>, DomainError> {
        let conn = self.connection().await?;
        let sql = format!(
            "SELECT {} FROM directory_groups WHERE id = ?1",
            SELECT_COLUMNS
        );
        Self::query_one(&conn, &sql, params![id.as_str()]).await
    }

    async fn increment_member_count(&self, id: &GroupId) -> Result<Group, DomainError> {
        let _guard = self.write_lock.lock().await;
        let conn = self.connection().await?;
        let sql = format!(
            "UPDATE directory_groups SET member_count = member_count + 1 WHERE id = ?1 RETURNING {}",
            SELECT_COLUMNS
        );
        let group = Self::query_one(&conn, &sql, params![id.as_str()])
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("no group with id {}", id)))?;
        self.publish_snapshot(&conn).await;
        Ok(group)
    }

    async fn rename(&self, id: &GroupId, name: &str) -> Result<Group, DomainError> {
        let _guard = self.write_lock.lock().await;
        let conn = self.connection().await?;
        let sql = format!(
            "UPDATE directory_groups SET name = ?2 WHERE id = ?1 RETURNING {}",
            SELECT_COLUMNS
        );
        let group = Self::query_one(&conn, &sql, params![id.as_str(), name])
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("no group with id {}", id)))?;
        self.publish_snapshot(&conn).await;
        Ok(group)
    }

    async fn list(&self) -> Result<Vec<Group>, DomainError> {
        let conn = self.connection().await?;
        Self::select_all(&conn).await
    }

    async fn subscribe(&self) -> Result<GroupStream, DomainError> {
        let _guard = self.write_lock.lock().await;
        let rx = self.hub.receiver();
        let conn = self.connection().await?;
        let initial = Self::select_all(&conn).await?;
        Ok(SnapshotHub::stream_from(rx, initial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;

    fn draft(name: &str, code: &str) -> NewGroup {
        NewGroup::new(name, "Team", JoinCode::parse(code).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_create_find_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let created = {
            let store = SqliteGroupStore::connect(dir.path()).await.unwrap();
            store.create(draft("Eagles", "AB12CD")).await.unwrap()
        };
        assert_eq!(created.member_count, 1);

        let store = SqliteGroupStore::connect(dir.path()).await.unwrap();
        let found = store
            .find_by_code(&JoinCode::parse("AB12CD").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "Eagles");
        assert_eq!(found.kind, "Team");
        assert_eq!(
            found.created_at.timestamp_millis(),
            created.created_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteGroupStore::connect(dir.path()).await.unwrap();
        store.create(draft("Eagles", "AB12CD")).await.unwrap();
        let err = store.create(draft("Hawks", "AB12CD")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)), "got {err:?}");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_increment_and_rename() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteGroupStore::connect(dir.path()).await.unwrap();
        let g = store.create(draft("Eagles", "AB12CD")).await.unwrap();

        let joined = store.increment_member_count(&g.id).await.unwrap();
        assert_eq!(joined.member_count, 2);

        let renamed = store.rename(&g.id, "Golden Eagles").await.unwrap();
        assert_eq!(renamed.name, "Golden Eagles");
        assert_eq!(renamed.member_count, 2);

        let missing = GroupId("missing".into());
        assert!(matches!(
            store.increment_member_count(&missing).await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            store.rename(&missing, "x").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteGroupStore::connect(dir.path()).await.unwrap());
        let g = store.create(draft("Eagles", "AB12CD")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            let id = g.id.clone();
            handles.push(tokio::spawn(async move {
                store.increment_member_count(&id).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let after = store.get(&g.id).await.unwrap().unwrap();
        assert_eq!(after.member_count, 21);
    }

    #[tokio::test]
    async fn test_subscribe_receives_snapshot_after_create() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteGroupStore::connect(dir.path()).await.unwrap();
        let mut stream = store.subscribe().await.unwrap();
        assert!(stream.next().await.unwrap().is_empty());

        store.create(draft("Eagles", "AB12CD")).await.unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].code.as_str(), "AB12CD");
    }
}
