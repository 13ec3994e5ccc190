//! Snapshot persistence for the memory log.
//!
//! A snapshot is the whole [`MemoryLog`] serialised to JSON. Two backends:
//!
//! - [`JsonFileStore`]: a pretty-printed JSON file, replaced atomically by
//!   writing a sibling temp file and renaming it over the target.
//! - [`SqliteStore`]: the same JSON inside a BLOB column of a single-row
//!   table, with WAL mode and an optional CRC-32 checksum.
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS soul_snapshots (
//!     slot       INTEGER PRIMARY KEY CHECK (slot = 0),
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::config::{PersistenceConfig, StorageBackend};
use crate::error::{Result, SoulError};
use crate::memory::MemoryLog;

/// Somewhere a [`MemoryLog`] snapshot can be read from and written to.
pub trait SnapshotStore: Send {
    /// Read the stored snapshot. `Ok(None)` when nothing has been saved yet.
    ///
    /// # Errors
    /// Returns an error if the snapshot exists but cannot be read or parsed.
    fn load(&self) -> Result<Option<MemoryLog>>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be written.
    fn save(&self, log: &MemoryLog) -> Result<()>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;

    /// Move an unreadable snapshot aside so the next save cannot overwrite it.
    /// Returns where it went, or `None` if there was nothing to move.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be moved.
    fn quarantine(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Open the backend selected by `config`.
///
/// # Errors
/// Returns an error if the SQLite database cannot be opened.
pub fn open_store(config: &PersistenceConfig) -> Result<Box<dyn SnapshotStore>> {
    match config.backend {
        StorageBackend::Json => Ok(Box::new(JsonFileStore::new(&config.path))),
        StorageBackend::Sqlite => Ok(Box::new(SqliteStore::open(&config.path, config)?)),
    }
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// Pretty-printed JSON file store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path` (created on first save).
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    fn corrupt_path(&self) -> PathBuf {
        self.sibling(".corrupt")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<MemoryLog>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        let log: MemoryLog = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Loaded memory snapshot");
        Ok(Some(log))
    }

    fn save(&self, log: &MemoryLog) -> Result<()> {
        let start = Instant::now();
        let json = serde_json::to_vec_pretty(log)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(
            path = %self.path.display(),
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved memory snapshot"
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn quarantine(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let target = self.corrupt_path();
        std::fs::rename(&self.path, &target)?;
        Ok(Some(target.display().to_string()))
    }
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS soul_snapshots (
    slot       INTEGER PRIMARY KEY CHECK (slot = 0),
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

/// Single-row SQLite snapshot store.
pub struct SqliteStore {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns [`SoulError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "Snapshot database opened");

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// In-memory database, for tests.
    ///
    /// # Errors
    /// Returns [`SoulError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Run `PRAGMA integrity_check`; `true` when the database is sound.
    ///
    /// # Errors
    /// Returns [`SoulError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

impl SnapshotStore for SqliteStore {
    fn load(&self) -> Result<Option<MemoryLog>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum FROM soul_snapshots WHERE slot = 0")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row([], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        expected = %expected,
                        actual = %actual,
                        "Snapshot checksum mismatch, possible corruption"
                    );
                }
            }
        }

        let log: MemoryLog = serde_json::from_slice(&data)
            .map_err(|e| SoulError::Serialization(e.to_string()))?;
        Ok(Some(log))
    }

    fn save(&self, log: &MemoryLog) -> Result<()> {
        let json = serde_json::to_vec(log)?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        self.conn.execute(
            "INSERT INTO soul_snapshots (slot, data, updated_at, checksum)
             VALUES (0, ?1, ?2, ?3)
             ON CONFLICT(slot) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![json, Utc::now().to_rfc3339(), checksum],
        )?;
        debug!(bytes = json.len(), "Saved memory snapshot row");
        Ok(())
    }

    fn location(&self) -> String {
        format!("sqlite:{}", self.db_path.display())
    }

    fn quarantine(&self) -> Result<Option<String>> {
        self.conn.execute_batch(CORRUPT_SCHEMA)?;
        let moved = self.conn.execute(
            "INSERT INTO soul_snapshots_corrupt (data, updated_at, checksum, quarantined_at)
             SELECT data, updated_at, checksum, ?1 FROM soul_snapshots WHERE slot = 0",
            params![Utc::now().to_rfc3339()],
        )?;
        if moved == 0 {
            return Ok(None);
        }
        self.conn.execute("DELETE FROM soul_snapshots WHERE slot = 0", [])?;
        Ok(Some(format!("sqlite:{}#soul_snapshots_corrupt", self.db_path.display())))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// CRC-32 (ISO 3309) of `data` as lowercase hex.
fn crc32_hex(data: &[u8]) -> String {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    format!("{:08x}", !crc)
}

const CORRUPT_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS soul_snapshots_corrupt (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    data           BLOB NOT NULL,
    updated_at     TEXT NOT NULL,
    checksum       TEXT,
    quarantined_at TEXT NOT NULL
);";

/// Adds `.optional()` to `rusqlite::Result`, mapping `QueryReturnedNoRows` to `Ok(None)`.
trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn sample_log() -> MemoryLog {
        let mut log = MemoryLog::default();
        log.push_conversation(Role::User, "What is a soul?");
        log.push_conversation(Role::Agent, "A question that asks itself.");
        log.push_thought("DRM: the lighthouse forgot its keeper");
        log.push_fact("Learned about Stoicism: virtue is the only good...");
        log.set_opinion("Absurdism", "Comforting, somehow.");
        log
    }

    #[test]
    fn crc32_known_vector() {
        assert_eq!(crc32_hex(b"123456789"), "cbf43926");
    }

    #[test]
    fn json_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("nested").join("memory.json"));
        assert!(store.load().expect("load").is_none());

        let log = sample_log();
        store.save(&log).expect("save");
        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded, log);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn json_store_uses_snapshot_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("memory.json"));
        store.save(&sample_log()).expect("save");
        let raw = std::fs::read_to_string(store.path()).expect("read");
        for key in [
            "conversations",
            "learned_facts",
            "internal_thoughts",
            "opinions",
            "wisdom",
            "last_session",
        ] {
            assert!(raw.contains(&format!("\"{key}\"")), "missing key {key}");
        }
    }

    #[test]
    fn json_store_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.json");
        std::fs::write(&path, b"{ not json").expect("write");
        assert!(JsonFileStore::new(&path).load().is_err());
    }

    #[test]
    fn json_store_quarantine_keeps_the_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.json");
        let store = JsonFileStore::new(&path);
        assert_eq!(store.quarantine().expect("nothing to move"), None);

        std::fs::write(&path, b"{ not json").expect("write");
        let moved = store.quarantine().expect("rename").expect("moved");
        assert!(moved.ends_with("memory.json.corrupt"));
        assert!(!path.exists());
        assert_eq!(
            std::fs::read(dir.path().join("memory.json.corrupt")).expect("read"),
            b"{ not json"
        );
    }

    #[test]
    fn sqlite_store_quarantine_moves_the_row() {
        let store = SqliteStore::open_in_memory(&PersistenceConfig::default()).expect("open");
        assert_eq!(store.quarantine().expect("empty"), None);

        store.save(&sample_log()).expect("save");
        assert!(store.quarantine().expect("move").is_some());
        assert!(store.load().expect("load").is_none());
        let kept: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM soul_snapshots_corrupt", [], |row| row.get(0))
            .expect("count");
        assert_eq!(kept, 1);
    }

    #[test]
    fn sqlite_store_round_trip_and_overwrite() {
        let store = SqliteStore::open_in_memory(&PersistenceConfig::default()).expect("open");
        assert!(store.load().expect("load").is_none());

        let mut log = sample_log();
        store.save(&log).expect("save");
        log.push_thought("second save");
        store.save(&log).expect("save again");

        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded.internal_thoughts.len(), 2);
        assert!(store.integrity_check().expect("check"));
    }

    #[test]
    fn sqlite_store_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("soul.db");
        let config = PersistenceConfig::default();
        {
            let store = SqliteStore::open(&path, &config).expect("open");
            store.save(&sample_log()).expect("save");
        }
        let store = SqliteStore::open(&path, &config).expect("reopen");
        assert_eq!(store.load().expect("load").expect("present").conversations.len(), 2);
    }
}
