//! SQLite-backed store. Rows hold JSON documents keyed by claim type plus source or owner.

use super::{Store, StoreError};
use crate::types::{AccumulatorState, Claim, ClaimType};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS accumulators (
        claim_type TEXT NOT NULL,
        source_id TEXT NOT NULL,
        value TEXT NOT NULL,
        updated_utc INTEGER NOT NULL,
        PRIMARY KEY (claim_type, source_id)
    );
    CREATE TABLE IF NOT EXISTS claims (
        claim_type TEXT NOT NULL,
        owner TEXT NOT NULL,
        value TEXT NOT NULL,
        updated_utc INTEGER NOT NULL,
        PRIMARY KEY (claim_type, owner)
    );
"#;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`. Creates parent dirs if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))
    }
}

fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

impl Store for SqliteStore {
    fn accumulator(
        &self,
        claim_type: ClaimType,
        source_id: &str,
    ) -> Result<Option<AccumulatorState>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT value FROM accumulators WHERE claim_type = ?1 AND source_id = ?2")?;
        let row = stmt
            .query_row([claim_type.as_str(), source_id], |r| r.get::<_, String>(0))
            .optional()?;
        match row {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set_accumulator(
        &mut self,
        claim_type: ClaimType,
        source_id: &str,
        state: &AccumulatorState,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO accumulators (claim_type, source_id, value, updated_utc) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![claim_type.as_str(), source_id, json, now_unix()],
        )?;
        Ok(())
    }

    fn accumulators(
        &self,
        claim_type: ClaimType,
    ) -> Result<Vec<(String, AccumulatorState)>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source_id, value FROM accumulators WHERE claim_type = ?1 ORDER BY source_id",
        )?;
        let rows = stmt.query_map([claim_type.as_str()], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (source_id, json) = row?;
            out.push((source_id, serde_json::from_str(&json)?));
        }
        Ok(out)
    }

    fn claim(&self, claim_type: ClaimType, owner: &str) -> Result<Option<Claim>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM claims WHERE claim_type = ?1 AND owner = ?2")?;
        let row = stmt
            .query_row([claim_type.as_str(), owner], |r| r.get::<_, String>(0))
            .optional()?;
        match row {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set_claim(&mut self, claim: &Claim) -> Result<(), StoreError> {
        let json = serde_json::to_string(claim)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO claims (claim_type, owner, value, updated_utc) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![claim.claim_type.as_str(), claim.owner, json, now_unix()],
        )?;
        Ok(())
    }

    fn claims(&self, claim_type: ClaimType) -> Result<Vec<Claim>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT value FROM claims WHERE claim_type = ?1 ORDER BY owner")?;
        let rows = stmt.query_map([claim_type.as_str()], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }
}
