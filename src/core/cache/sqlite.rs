//! SQLite store backend for persistent storage.

use super::{FingerprintStore, StoreStats, StoredImage};
use crate::core::hasher::Fingerprint;
use crate::core::record::{ContentId, ExclusionPair, FingerprintSet};
use crate::error::StoreError;
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Version written to the `metadata` table.
///
/// A store holding any other version is dropped and recreated on open,
/// unless migration is skipped.
pub const SCHEMA_VERSION: i64 = 2;

/// Options for opening a store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a statement waits on a locked database
    pub busy_timeout: Duration,
    /// Check the schema version and rebuild on mismatch
    pub migrate: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            migrate: true,
        }
    }
}

/// SQLite-backed fingerprint/exclusion store
///
/// Uses WAL (Write-Ahead Logging) mode so readers proceed while a write is
/// in progress. The connection sits behind a mutex, so the store can be
/// shared by parallel fingerprint and persistence tasks.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

fn query_failed(e: rusqlite::Error) -> StoreError {
    StoreError::QueryFailed(e.to_string())
}

impl SqliteStore {
    /// Open or create a store with default options
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with(path, &StoreOptions::default())
    }

    /// Open or create a store
    pub fn open_with(path: &Path, options: &StoreOptions) -> Result<Self, StoreError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.busy_timeout(options.busy_timeout)
            .map_err(query_failed)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(query_failed)?;

        if options.migrate {
            let version = Self::read_schema_version(&conn)?;
            if version != Some(SCHEMA_VERSION) {
                tracing::info!(
                    found = ?version,
                    expected = SCHEMA_VERSION,
                    "Rebuilding fingerprint store"
                );
                Self::drop_tables(&conn)?;
            }
        }

        Self::create_tables(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    /// Drop every table and recreate an empty schema
    pub fn reset(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        Self::drop_tables(&conn)?;
        Self::create_tables(&conn)
    }

    /// Version recorded in the `metadata` table, if any
    pub fn schema_version(&self) -> Result<Option<i64>, StoreError> {
        let conn = self.lock()?;
        Self::read_schema_version(&conn)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn read_schema_version(conn: &Connection) -> Result<Option<i64>, StoreError> {
        let has_metadata: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'metadata'",
                [],
                |row| row.get(0),
            )
            .map_err(query_failed)?;

        if has_metadata == 0 {
            return Ok(None);
        }

        let result = conn.query_row("SELECT version FROM metadata LIMIT 1", [], |row| {
            row.get::<_, i64>(0)
        });

        match result {
            Ok(version) => Ok(Some(version)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(query_failed(e)),
        }
    }

    fn drop_tables(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "DROP TABLE IF EXISTS metadata;
             DROP TABLE IF EXISTS image;
             DROP TABLE IF EXISTS fingerprint;
             DROP TABLE IF EXISTS exclusion;",
        )
        .map_err(query_failed)
    }

    fn create_tables(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata (
                version INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS image (
                identity TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS fingerprint (
                identity TEXT NOT NULL,
                size_factor INTEGER NOT NULL,
                bits INTEGER NOT NULL,
                average TEXT,
                perceptual TEXT,
                difference TEXT,
                PRIMARY KEY (identity, size_factor)
            );
            CREATE TABLE IF NOT EXISTS exclusion (
                first TEXT NOT NULL,
                second TEXT NOT NULL,
                PRIMARY KEY (first, second)
            );
            CREATE INDEX IF NOT EXISTS idx_exclusion_second ON exclusion(second);",
        )
        .map_err(query_failed)?;

        conn.execute(
            "INSERT INTO metadata (version) SELECT ?1 WHERE NOT EXISTS (SELECT 1 FROM metadata)",
            [SCHEMA_VERSION],
        )
        .map_err(query_failed)?;

        Ok(())
    }

    fn parse_fingerprint(text: Option<String>, bits: u32) -> Result<Option<Fingerprint>, StoreError> {
        text.map(|t| Fingerprint::from_hex(&t, bits))
            .transpose()
            .map_err(StoreError::from)
    }
}

impl FingerprintStore for SqliteStore {
    fn find(&self, id: &ContentId) -> Result<Option<StoredImage>, StoreError> {
        let conn = self.lock()?;

        let result = conn.query_row(
            "SELECT name, width, height FROM image WHERE identity = ?1",
            [id.as_str()],
            |row| {
                Ok(StoredImage {
                    name: row.get(0)?,
                    width: row.get(1)?,
                    height: row.get(2)?,
                })
            },
        );

        match result {
            Ok(image) => Ok(Some(image)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(query_failed(e)),
        }
    }

    fn find_fingerprints(&self, id: &ContentId) -> Result<HashMap<u32, FingerprintSet>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                "SELECT size_factor, bits, average, perceptual, difference
                 FROM fingerprint WHERE identity = ?1",
            )
            .map_err(query_failed)?;

        let rows = stmt
            .query_map([id.as_str()], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .map_err(query_failed)?;

        let mut sets = HashMap::new();
        for row in rows {
            let (size_factor, bits, average, perceptual, difference) = row.map_err(query_failed)?;
            sets.insert(
                size_factor,
                FingerprintSet {
                    size_factor,
                    average: Self::parse_fingerprint(average, bits)?,
                    perceptual: Self::parse_fingerprint(perceptual, bits)?,
                    difference: Self::parse_fingerprint(difference, bits)?,
                },
            );
        }

        Ok(sets)
    }

    fn find_exclusions(&self, id: &ContentId) -> Result<HashSet<ContentId>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                "SELECT second FROM exclusion WHERE first = ?1
                 UNION
                 SELECT first FROM exclusion WHERE second = ?1",
            )
            .map_err(query_failed)?;

        let partners = stmt
            .query_map([id.as_str()], |row| row.get::<_, String>(0))
            .map_err(query_failed)?
            .map(|r| r.map(ContentId::from_stored).map_err(query_failed))
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(partners)
    }

    fn save_image(
        &self,
        id: &ContentId,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR IGNORE INTO image (identity, name, width, height, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.as_str(),
                name,
                width,
                height,
                chrono::Utc::now().to_rfc3339(),
            ],
        )
        .map_err(query_failed)?;

        Ok(())
    }

    fn save_fingerprints(
        &self,
        id: &ContentId,
        size_factor: u32,
        fingerprints: &FingerprintSet,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;

        let bits = [
            &fingerprints.average,
            &fingerprints.perceptual,
            &fingerprints.difference,
        ]
        .into_iter()
        .flatten()
        .map(|f| f.bit_len())
        .next()
        .unwrap_or(size_factor * size_factor);

        conn.execute(
            "INSERT OR REPLACE INTO fingerprint
             (identity, size_factor, bits, average, perceptual, difference)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.as_str(),
                size_factor,
                bits,
                fingerprints.average.as_ref().map(Fingerprint::to_hex),
                fingerprints.perceptual.as_ref().map(Fingerprint::to_hex),
                fingerprints.difference.as_ref().map(Fingerprint::to_hex),
            ],
        )
        .map_err(query_failed)?;

        Ok(())
    }

    fn save_exclusion(&self, a: &ContentId, b: &ContentId) -> Result<(), StoreError> {
        let pair = ExclusionPair::new(a.clone(), b.clone());
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR IGNORE INTO exclusion (first, second) VALUES (?1, ?2)",
            params![pair.first().as_str(), pair.second().as_str()],
        )
        .map_err(query_failed)?;

        Ok(())
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.lock()?;

        let count = |table: &str| -> Result<usize, StoreError> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get::<_, i64>(0).map(|v| v as usize)
            })
            .map_err(query_failed)
        };

        Ok(StoreStats {
            images: count("image")?,
            fingerprint_sets: count("fingerprint")?,
            exclusions: count("exclusion")?,
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;

        conn.execute_batch(
            "DELETE FROM image;
             DELETE FROM fingerprint;
             DELETE FROM exclusion;",
        )
        .map_err(query_failed)
    }
}
