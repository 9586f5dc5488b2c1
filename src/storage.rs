//! Alert history storage.
//!
//! The alert history is an append-only, ordered log. The core pipeline only
//! appends; nothing in this module mutates or deletes a stored alert. Two
//! implementations: SQLite for the service, in-memory for tests and
//! ephemeral runs.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::Alert;

/// An alert as persisted: the alert payload plus its storage identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredAlert {
    pub id: i64,
    /// Unix epoch seconds at append time.
    pub created_at: i64,
    #[serde(flatten)]
    pub alert: Alert,
}

/// Aggregate counts over the whole history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertStats {
    pub total: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

/// Append-only alert history.
pub trait AlertStore {
    /// Append an alert, returning its assigned id. Ids are strictly
    /// increasing in append order.
    fn append(&mut self, alert: &Alert) -> Result<i64>;

    /// The most recent `limit` alerts, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<StoredAlert>>;

    fn by_id(&self, id: i64) -> Result<Option<StoredAlert>>;

    fn count(&self) -> Result<usize>;

    fn stats(&self) -> Result<AlertStats>;
}

fn now_s() -> Result<i64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| anyhow!("system clock before unix epoch"))?;
    i64::try_from(now.as_secs()).map_err(|_| anyhow!("system clock exceeds i64 range"))
}

fn fold_stats<'a, I: Iterator<Item = &'a Alert>>(alerts: I) -> AlertStats {
    let mut stats = AlertStats::default();
    for alert in alerts {
        stats.total += 1;
        *stats
            .by_severity
            .entry(alert.severity.as_str().to_string())
            .or_insert(0) += 1;
        *stats
            .by_type
            .entry(alert.alert_type.as_str().to_string())
            .or_insert(0) += 1;
    }
    stats
}

// ----------------------------------------------------------------------------
// SQLite store
// ----------------------------------------------------------------------------

pub struct SqliteAlertStore {
    conn: Connection,
}

impl SqliteAlertStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        // alert_type and severity are denormalized out of the payload so
        // stats can aggregate in SQL.
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS alerts (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              created_at INTEGER NOT NULL,
              alert_type TEXT NOT NULL,
              severity TEXT NOT NULL,
              payload_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alerts_created ON alerts(created_at);
            "#,
        )?;
        Ok(())
    }

    fn row_to_stored(id: i64, created_at: i64, payload: &str) -> Result<StoredAlert> {
        let alert: Alert = serde_json::from_str(payload)?;
        Ok(StoredAlert {
            id,
            created_at,
            alert,
        })
    }
}

impl AlertStore for SqliteAlertStore {
    fn append(&mut self, alert: &Alert) -> Result<i64> {
        let created_at = now_s()?;
        let payload_json = serde_json::to_string(alert)?;
        self.conn.execute(
            r#"
            INSERT INTO alerts(created_at, alert_type, severity, payload_json)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                created_at,
                alert.alert_type.as_str(),
                alert.severity.as_str(),
                payload_json
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredAlert>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, payload_json FROM alerts ORDER BY id DESC LIMIT ?1",
        )?;
        let mut rows = stmt.query(params![limit as i64])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let created_at: i64 = row.get(1)?;
            let payload: String = row.get(2)?;
            out.push(Self::row_to_stored(id, created_at, &payload)?);
        }
        Ok(out)
    }

    fn by_id(&self, id: i64) -> Result<Option<StoredAlert>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, created_at, payload_json FROM alerts WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let id: i64 = row.get(0)?;
        let created_at: i64 = row.get(1)?;
        let payload: String = row.get(2)?;
        Ok(Some(Self::row_to_stored(id, created_at, &payload)?))
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn stats(&self) -> Result<AlertStats> {
        let mut stats = AlertStats {
            total: self.count()?,
            ..AlertStats::default()
        };

        let mut stmt = self
            .conn
            .prepare("SELECT severity, COUNT(*) FROM alerts GROUP BY severity")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let severity: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            stats.by_severity.insert(severity, count as usize);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT alert_type, COUNT(*) FROM alerts GROUP BY alert_type")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let alert_type: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            stats.by_type.insert(alert_type, count as usize);
        }

        Ok(stats)
    }
}

// ----------------------------------------------------------------------------
// In-memory store
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryAlertStore {
    entries: Vec<StoredAlert>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn append(&mut self, alert: &Alert) -> Result<i64> {
        let id = self.entries.len() as i64 + 1;
        self.entries.push(StoredAlert {
            id,
            created_at: now_s()?,
            alert: alert.clone(),
        });
        Ok(id)
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredAlert>> {
        Ok(self.entries.iter().rev().take(limit).cloned().collect())
    }

    fn by_id(&self, id: i64) -> Result<Option<StoredAlert>> {
        Ok(self.entries.iter().find(|e| e.id == id).cloned())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn stats(&self) -> Result<AlertStats> {
        Ok(fold_stats(self.entries.iter().map(|e| &e.alert)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlertType, Severity};

    fn alert(alert_type: AlertType, severity: Severity) -> Alert {
        Alert {
            alert_type,
            message: "test alert".to_string(),
            severity,
            frame: 10,
            timestamp_seconds: 0.4,
            video_id: Some("cam-1".to_string()),
            simulated: false,
        }
    }

    fn exercise_store<S: AlertStore>(store: &mut S) {
        let first = store.append(&alert(AlertType::Crowd, Severity::Medium)).unwrap();
        let second = store.append(&alert(AlertType::Violence, Severity::High)).unwrap();
        let third = store.append(&alert(AlertType::Crowd, Severity::Low)).unwrap();
        assert!(first < second && second < third);

        assert_eq!(store.count().unwrap(), 3);

        let recent = store.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, third);
        assert_eq!(recent[1].id, second);

        let fetched = store.by_id(second).unwrap().unwrap();
        assert_eq!(fetched.alert.alert_type, AlertType::Violence);
        assert_eq!(fetched.alert.video_id.as_deref(), Some("cam-1"));
        assert!(store.by_id(9999).unwrap().is_none());

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_type["crowd"], 2);
        assert_eq!(stats.by_type["violence"], 1);
        assert_eq!(stats.by_severity["high"], 1);
        assert_eq!(stats.by_severity["medium"], 1);
        assert_eq!(stats.by_severity["low"], 1);
    }

    #[test]
    fn in_memory_store_round_trip() {
        let mut store = InMemoryAlertStore::new();
        exercise_store(&mut store);
    }

    #[test]
    fn sqlite_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("alerts.db");
        let mut store = SqliteAlertStore::open(db_path.to_str().unwrap()).unwrap();
        exercise_store(&mut store);
    }

    #[test]
    fn sqlite_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("alerts.db");
        let db_path = db_path.to_str().unwrap();
        {
            let mut store = SqliteAlertStore::open(db_path).unwrap();
            store.append(&alert(AlertType::Object, Severity::Low)).unwrap();
        }
        let store = SqliteAlertStore::open(db_path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        let recent = store.recent(10).unwrap();
        assert_eq!(recent[0].alert.alert_type, AlertType::Object);
    }
}
