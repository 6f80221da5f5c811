//! SQLite-backed content store implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{
    ContentError, ContentFilter, ContentPatch, ContentRecord, ContentStatus, ContentStore,
    MediaEntry, MediaKind, MediaMerge,
};
use crate::processing::merge_media;

const SELECT_COLUMNS: &str = "id, organization_id, user_id, name, ref_id, render_type, images, videos, objects_3d, has_alpha, orientation, status, is_active, created_at, updated_at";

/// SQLite-backed content store.
///
/// Blocking SQLite calls run on the blocking thread pool so the async callers
/// (dispatch tasks, subscription workers, handlers) never stall the runtime.
pub struct SqliteContentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContentStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, ContentError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, ContentError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), ContentError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS contents (
                id TEXT PRIMARY KEY,
                organization_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                ref_id TEXT NOT NULL DEFAULT '',
                render_type TEXT NOT NULL DEFAULT '',
                images TEXT NOT NULL DEFAULT '[]',
                videos TEXT NOT NULL DEFAULT '[]',
                objects_3d TEXT NOT NULL DEFAULT '[]',
                has_alpha INTEGER NOT NULL DEFAULT 0,
                orientation TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_contents_org ON contents(organization_id, is_active);
            CREATE INDEX IF NOT EXISTS idx_contents_ref_id ON contents(ref_id);
            CREATE INDEX IF NOT EXISTS idx_contents_created_at ON contents(created_at);
            "#,
        )
        .map_err(db_err)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, ContentError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, ContentError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| ContentError::Database("connection lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| ContentError::Database(format!("store task failed: {}", e)))?
    }

    fn build_where_clause(filter: &ContentFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref organization_id) = filter.organization_id {
            conditions.push("organization_id = ?");
            params.push(Box::new(organization_id.clone()));
        }

        if let Some(ref status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.clone()));
        }

        if let Some(ref render_type) = filter.render_type {
            conditions.push("render_type = ?");
            params.push(Box::new(render_type.clone()));
        }

        if !filter.include_inactive {
            conditions.push("is_active = 1");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ContentRecord> {
        let images: String = row.get(6)?;
        let videos: String = row.get(7)?;
        let objects_3d: String = row.get(8)?;
        let status: String = row.get(11)?;
        let created_at: String = row.get(13)?;
        let updated_at: String = row.get(14)?;

        Ok(ContentRecord {
            id: row.get(0)?,
            organization_id: row.get(1)?,
            user_id: row.get(2)?,
            name: row.get(3)?,
            ref_id: row.get(4)?,
            render_type: row.get(5)?,
            images: parse_media(6, &images)?,
            videos: parse_media(7, &videos)?,
            objects_3d: parse_media(8, &objects_3d)?,
            has_alpha: row.get(9)?,
            orientation: row.get(10)?,
            status: ContentStatus::from(status),
            is_active: row.get(12)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn write_patch(conn: &Connection, id: &str, patch: &ContentPatch) -> Result<bool, ContentError> {
        let mut assignments: Vec<&'static str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = patch.name {
            assignments.push("name = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(ref render_type) = patch.render_type {
            assignments.push("render_type = ?");
            values.push(Box::new(render_type.clone()));
        }
        if let Some(ref orientation) = patch.orientation {
            assignments.push("orientation = ?");
            values.push(Box::new(orientation.clone()));
        }
        if let Some(ref status) = patch.status {
            assignments.push("status = ?");
            values.push(Box::new(status.as_str().to_string()));
        }
        if let Some(has_alpha) = patch.has_alpha {
            assignments.push("has_alpha = ?");
            values.push(Box::new(has_alpha));
        }
        for kind in MediaKind::ALL {
            if let Some(list) = patch.media(kind) {
                assignments.push(match kind {
                    MediaKind::Image => "images = ?",
                    MediaKind::Video => "videos = ?",
                    MediaKind::Object3d => "objects_3d = ?",
                });
                values.push(Box::new(media_json(list)?));
            }
        }

        assignments.push("updated_at = ?");
        values.push(Box::new(Utc::now().to_rfc3339()));
        values.push(Box::new(id.to_string()));

        let sql = format!("UPDATE contents SET {} WHERE id = ?", assignments.join(", "));
        let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        let changed = conn.execute(&sql, param_refs.as_slice()).map_err(db_err)?;
        Ok(changed > 0)
    }

    fn query_one(
        conn: &Connection,
        sql: &str,
        param: &str,
    ) -> Result<Option<ContentRecord>, ContentError> {
        match conn.query_row(sql, params![param], Self::row_to_record) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }
}

fn db_err(e: rusqlite::Error) -> ContentError {
    match e {
        rusqlite::Error::FromSqlConversionFailure(column, _, source) => {
            ContentError::Serialization(format!("column {}: {}", column, source))
        }
        other => ContentError::Database(other.to_string()),
    }
}

fn media_json(list: &[MediaEntry]) -> Result<String, ContentError> {
    serde_json::to_string(list).map_err(|e| ContentError::Serialization(e.to_string()))
}

fn parse_media(column: usize, json: &str) -> rusqlite::Result<Vec<MediaEntry>> {
    serde_json::from_str(json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn insert(&self, record: &ContentRecord) -> Result<(), ContentError> {
        let record = record.clone();
        let images = media_json(&record.images)?;
        let videos = media_json(&record.videos)?;
        let objects_3d = media_json(&record.objects_3d)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO contents (id, organization_id, user_id, name, ref_id, render_type, images, videos, objects_3d, has_alpha, orientation, status, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.id,
                    record.organization_id,
                    record.user_id,
                    record.name,
                    record.ref_id,
                    record.render_type,
                    images,
                    videos,
                    objects_3d,
                    record.has_alpha,
                    record.orientation,
                    record.status.as_str(),
                    record.is_active,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<ContentRecord>, ContentError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let sql = format!("SELECT {} FROM contents WHERE id = ?", SELECT_COLUMNS);
            Self::query_one(conn, &sql, &id)
        })
        .await
    }

    async fn find_by_ref_id(&self, ref_id: &str) -> Result<Option<ContentRecord>, ContentError> {
        let ref_id = ref_id.to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM contents WHERE ref_id = ? AND is_active = 1",
                SELECT_COLUMNS
            );
            Self::query_one(conn, &sql, &ref_id)
        })
        .await
    }

    async fn ref_id_exists(&self, ref_id: &str) -> Result<bool, ContentError> {
        let ref_id = ref_id.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM contents WHERE ref_id = ?",
                    params![ref_id],
                    |row| row.get(0),
                )
                .map_err(db_err)?;
            Ok(count > 0)
        })
        .await
    }

    async fn list(&self, filter: &ContentFilter) -> Result<Vec<ContentRecord>, ContentError> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let (where_clause, params) = Self::build_where_clause(&filter);
            let sql = format!(
                "SELECT {} FROM contents {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
                SELECT_COLUMNS, where_clause
            );

            let mut stmt = conn.prepare(&sql).map_err(db_err)?;

            let mut all_params = params;
            all_params.push(Box::new(filter.limit));
            all_params.push(Box::new(filter.offset));
            let param_refs: Vec<&dyn rusqlite::ToSql> =
                all_params.iter().map(|p| p.as_ref()).collect();

            let rows = stmt
                .query_map(param_refs.as_slice(), Self::row_to_record)
                .map_err(db_err)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row.map_err(db_err)?);
            }
            Ok(records)
        })
        .await
    }

    async fn count(&self, filter: &ContentFilter) -> Result<i64, ContentError> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let (where_clause, params) = Self::build_where_clause(&filter);
            let sql = format!("SELECT COUNT(*) FROM contents {}", where_clause);
            let param_refs: Vec<&dyn rusqlite::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();

            conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
                .map_err(db_err)
        })
        .await
    }

    async fn update(&self, id: &str, patch: &ContentPatch) -> Result<bool, ContentError> {
        let id = id.to_string();
        let patch = patch.clone();
        self.with_conn(move |conn| Self::write_patch(conn, &id, &patch))
            .await
    }

    async fn merge_update(
        &self,
        id: &str,
        patch: &ContentPatch,
        merges: &[MediaMerge],
    ) -> Result<bool, ContentError> {
        let id = id.to_string();
        let mut patch = patch.clone();
        let merges = merges.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction().map_err(db_err)?;

            let sql = format!("SELECT {} FROM contents WHERE id = ?", SELECT_COLUMNS);
            let Some(current) = Self::query_one(&tx, &sql, &id)? else {
                return Ok(false);
            };

            for merge in &merges {
                let base = patch
                    .media(merge.kind)
                    .map(|list| list.to_vec())
                    .unwrap_or_else(|| current.media(merge.kind).to_vec());
                patch.set_media(merge.kind, merge_media(&base, &merge.entries));
            }

            let changed = Self::write_patch(&tx, &id, &patch)?;
            tx.commit().map_err(db_err)?;
            Ok(changed)
        })
        .await
    }

    async fn transition_status(
        &self,
        id: &str,
        from: &ContentStatus,
        to: &ContentStatus,
    ) -> Result<bool, ContentError> {
        let id = id.to_string();
        let from = from.as_str().to_string();
        let to = to.as_str().to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE contents SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
                    params![to, Utc::now().to_rfc3339(), id, from],
                )
                .map_err(db_err)?;
            Ok(changed > 0)
        })
        .await
    }

    async fn soft_delete(&self, id: &str, organization_id: &str) -> Result<bool, ContentError> {
        let id = id.to_string();
        let organization_id = organization_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE contents SET is_active = 0, updated_at = ? WHERE id = ? AND organization_id = ? AND is_active = 1",
                    params![Utc::now().to_rfc3339(), id, organization_id],
                )
                .map_err(db_err)?;
            Ok(changed > 0)
        })
        .await
    }
}
