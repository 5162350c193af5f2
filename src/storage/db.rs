use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, Row};
use std::path::Path;

use crate::{
    error::Result,
    rewards::reporter::{CycleResult, OutcomeRecord},
    storage::models::{CycleRecord, HistoryStats},
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS claim_cycles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recorded_at TEXT NOT NULL,
                event TEXT NOT NULL,
                result TEXT NOT NULL,
                claimed INTEGER NOT NULL,
                message TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cycles_recorded_at ON claim_cycles(recorded_at)",
            [],
        )?;

        Ok(())
    }

    pub fn save_cycle(&self, record: &OutcomeRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO claim_cycles (recorded_at, event, result, claimed, message)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.recorded_at.to_rfc3339(),
                record.fields.event,
                record.fields.result.to_string(),
                record.fields.count.unwrap_or(0),
                record.message,
            ],
        )?;
        Ok(())
    }

    /// Most recent cycles first
    pub fn get_cycle_history(&self, limit: Option<usize>) -> Result<Vec<CycleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recorded_at, event, result, claimed, message
             FROM claim_cycles
             ORDER BY recorded_at DESC, id DESC
             LIMIT ?1",
        )?;

        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let records = stmt
            .query_map([limit], cycle_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn get_stats(&self) -> Result<HistoryStats> {
        let count_result = |result: CycleResult| -> Result<usize> {
            let n: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM claim_cycles WHERE result = ?1",
                [result.to_string()],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        };

        let total_cycles: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM claim_cycles", [], |row| row.get(0))?;

        let total_claimed: Option<i64> = self.conn.query_row(
            "SELECT SUM(claimed) FROM claim_cycles WHERE result = 'ok'",
            [],
            |row| row.get(0),
        )?;

        let last_success: Option<String> = self.conn.query_row(
            "SELECT MAX(recorded_at) FROM claim_cycles WHERE result = 'ok'",
            [],
            |row| row.get(0),
        )?;

        Ok(HistoryStats {
            total_cycles: total_cycles as usize,
            ok_cycles: count_result(CycleResult::Ok)?,
            empty_cycles: count_result(CycleResult::None)?,
            error_cycles: count_result(CycleResult::Error)?,
            total_claimed: total_claimed.unwrap_or(0) as u64,
            last_success: last_success
                .map(|s| parse_timestamp(&s, 0))
                .transpose()?,
        })
    }
}

fn parse_timestamp(s: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn cycle_from_row(row: &Row<'_>) -> rusqlite::Result<CycleRecord> {
    let recorded_at: String = row.get(1)?;
    let result: String = row.get(3)?;

    Ok(CycleRecord {
        id: row.get(0)?,
        recorded_at: parse_timestamp(&recorded_at, 1)?,
        event: row.get(2)?,
        result: result.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into())
        })?,
        claimed: row.get(4)?,
        message: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minutes)
    }

    #[test]
    fn test_history_is_newest_first_and_limited() {
        let db = Database::new(":memory:").unwrap();
        db.save_cycle(&OutcomeRecord::nothing_to_claim(at(0))).unwrap();
        db.save_cycle(&OutcomeRecord::claimed(4, "gold 10", at(5))).unwrap();
        db.save_cycle(&OutcomeRecord::failed("timeout", at(10))).unwrap();

        let all = db.get_cycle_history(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].result, CycleResult::Error);
        assert_eq!(all[2].result, CycleResult::None);
        assert_eq!(all[1].claimed, 4);
        assert_eq!(all[1].recorded_at, at(5));

        let latest = db.get_cycle_history(Some(1)).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].result, CycleResult::Error);
    }

    #[test]
    fn test_stats_aggregate_cycles() {
        let db = Database::new(":memory:").unwrap();
        db.save_cycle(&OutcomeRecord::claimed(2, "", at(0))).unwrap();
        db.save_cycle(&OutcomeRecord::claimed(3, "", at(60))).unwrap();
        db.save_cycle(&OutcomeRecord::all_attempts_failed(1, at(70))).unwrap();
        db.save_cycle(&OutcomeRecord::failed("boom", at(80))).unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_cycles, 4);
        assert_eq!(stats.ok_cycles, 2);
        assert_eq!(stats.empty_cycles, 1);
        assert_eq!(stats.error_cycles, 1);
        assert_eq!(stats.total_claimed, 5);
        assert_eq!(stats.last_success, Some(at(60)));
        assert_eq!(stats.success_rate(), 50.0);
    }

    #[test]
    fn test_empty_database_stats() {
        let db = Database::new(":memory:").unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_cycles, 0);
        assert_eq!(stats.total_claimed, 0);
        assert!(stats.last_success.is_none());
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_file_backed_database_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");
        let db = Database::new(path.to_str().unwrap()).unwrap();
        db.save_cycle(&OutcomeRecord::nothing_to_claim(at(0))).unwrap();
        assert!(path.exists());
    }
}
