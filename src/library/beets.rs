//! beets library database adapter

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

use super::TrackLibrary;

const ATTRIBUTE_QUERY: &str = "\
    SELECT items.path, item_attributes.value \
    FROM items \
    INNER JOIN item_attributes ON items.id = item_attributes.entity_id \
    WHERE item_attributes.key = ? \
      AND item_attributes.value IS NOT NULL \
      AND item_attributes.value != '' \
      AND item_attributes.value != '0'";

/// Read-only view of a beets `library.db`
pub struct BeetsLibrary {
    conn: Connection,
}

impl BeetsLibrary {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open beets library {:?}", path))?;
        debug!("Opened beets library at {}", path.display());
        Ok(Self { conn })
    }
}

impl TrackLibrary for BeetsLibrary {
    fn paths_with_attribute(&self, attr: &str) -> Result<Vec<(Vec<u8>, String)>> {
        let mut stmt = self
            .conn
            .prepare(ATTRIBUTE_QUERY)
            .context("Failed to prepare library query")?;

        let rows = stmt
            .query_map([attr], |row| {
                // beets stores paths as BLOBs, older databases as TEXT
                let path = match row.get_ref(0)? {
                    ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Some(bytes.to_vec()),
                    _ => None,
                };
                let value = match row.get_ref(1)? {
                    ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
                    ValueRef::Integer(n) => n.to_string(),
                    ValueRef::Real(n) => n.to_string(),
                    _ => String::new(),
                };
                Ok(path.map(|p| (p, value)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to query library attribute {}", attr))?;

        let rows: Vec<(Vec<u8>, String)> = rows.into_iter().flatten().collect();
        debug!("Library returned {} tracks with {}", rows.len(), attr);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("library.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, path BLOB);
             CREATE TABLE item_attributes (
                 id INTEGER PRIMARY KEY, entity_id INTEGER, key TEXT, value TEXT
             );",
        )
        .unwrap();

        let items: [(i64, &[u8]); 5] = [
            (1, b"/music/a.mp3"),
            (2, b"/music/b.mp3"),
            (3, b"/music/c.mp3"),
            (4, b"/music/d.mp3"),
            (5, b"/music/e.mp3"),
        ];
        for (id, path) in items {
            conn.execute("INSERT INTO items (id, path) VALUES (?1, ?2)", params![id, path])
                .unwrap();
        }

        let attrs: [(i64, &str, Option<&str>); 5] = [
            (1, "ib_trackid", Some("1001")),
            (2, "ib_trackid", Some("0")),
            (3, "ib_trackid", Some("")),
            (4, "ib_trackid", None),
            (5, "genre", Some("jazz")),
        ];
        for (entity, key, value) in attrs {
            conn.execute(
                "INSERT INTO item_attributes (entity_id, key, value) VALUES (?1, ?2, ?3)",
                params![entity, key, value],
            )
            .unwrap();
        }
        path
    }

    #[test]
    fn test_only_recorded_values_are_returned() {
        let dir = TempDir::new().unwrap();
        let library = BeetsLibrary::open(&fixture(&dir)).unwrap();

        let rows = library.paths_with_attribute("ib_trackid").unwrap();
        assert_eq!(rows, vec![(b"/music/a.mp3".to_vec(), "1001".to_string())]);
    }

    #[test]
    fn test_attribute_key_is_respected() {
        let dir = TempDir::new().unwrap();
        let library = BeetsLibrary::open(&fixture(&dir)).unwrap();

        let rows = library.paths_with_attribute("genre").unwrap();
        assert_eq!(rows, vec![(b"/music/e.mp3".to_vec(), "jazz".to_string())]);
    }

    #[test]
    fn test_missing_database_fails() {
        let dir = TempDir::new().unwrap();
        assert!(BeetsLibrary::open(&dir.path().join("missing.db")).is_err());
    }
}
