//! Planner ↔ redb persistence.
//!
//! redb is a save file: loaded on boot, flushed on every mutation.
//! Never queried at runtime — the Planner is the runtime truth.

use crate::planner::{Event, Planner, Week};
use redb::{Database, ReadableTable, TableDefinition};
use std::sync::Arc;

const PLANNER_WEEKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("planner_weeks");
const PLANNER_META: TableDefinition<&str, &[u8]> = TableDefinition::new("planner_meta");

/// Thin handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct SaveFile {
    db: Arc<Database>,
}

impl SaveFile {
    /// Open (or create) the save file at the given path.
    /// Creates tables if they don't exist.
    pub fn open(path: &str) -> Result<Self, SaveFileError> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(PLANNER_WEEKS)?;
            let _ = txn.open_table(PLANNER_META)?;
        }
        txn.commit()?;

        Ok(SaveFile { db: Arc::new(db) })
    }

    /// Load the entire planner from disk. Called once at boot.
    ///
    /// Weeks come back in key (uuid) order, so they are re-sorted by start
    /// date — ranges are disjoint, which makes that the display order.
    pub fn load_planner(&self) -> Result<Planner, SaveFileError> {
        let mut planner = Planner::new();
        let txn = self.db.begin_read()?;

        let weeks_table = txn.open_table(PLANNER_WEEKS)?;
        for entry in weeks_table.iter()? {
            let (_, value) = entry?;
            let week: Week = postcard::from_bytes(value.value())
                .map_err(|e| SaveFileError::Decode(e.to_string()))?;
            planner.weeks.push(week);
        }
        planner.weeks.sort_by_key(|w| w.start_date);

        let meta_table = txn.open_table(PLANNER_META)?;
        if let Some(rev_data) = meta_table.get("revision")? {
            let bytes = rev_data.value();
            if bytes.len() == 8 {
                planner.revision = u64::from_le_bytes(bytes.try_into().unwrap());
            }
        }

        Ok(planner)
    }

    /// Flush a single event to disk. Called after every Planner::apply().
    /// Writes the affected week + updated revision in one transaction.
    pub fn flush(&self, planner: &Planner, event: &Event) -> Result<(), SaveFileError> {
        let week_id = event.week_id();
        let txn = self.db.begin_write()?;
        {
            let mut weeks = txn.open_table(PLANNER_WEEKS)?;
            let mut meta = txn.open_table(PLANNER_META)?;

            match event {
                Event::WeekDeleted { .. } => {
                    weeks.remove(week_id.as_bytes().as_slice())?;
                }
                _ => {
                    // Look up the current state in the planner and write the
                    // whole week entity (tasks and resources embedded).
                    let week = planner
                        .week(week_id)
                        .expect("flushed event refers to a week the planner does not hold");
                    let bytes = postcard::to_allocvec(week)
                        .map_err(|e| SaveFileError::Encode(e.to_string()))?;
                    weeks.insert(week_id.as_bytes().as_slice(), bytes.as_slice())?;
                }
            }

            // Always update revision
            meta.insert("revision", planner.revision.to_le_bytes().as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SaveFileError {
    Redb(String),
    Decode(String),
    Encode(String),
}

// redb 2.x has many error types. Blanket them all into SaveFileError::Redb.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for SaveFileError {
            fn from(e: $t) -> Self { SaveFileError::Redb(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

impl std::fmt::Display for SaveFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveFileError::Redb(e) => write!(f, "redb: {e}"),
            SaveFileError::Decode(e) => write!(f, "decode: {e}"),
            SaveFileError::Encode(e) => write!(f, "encode: {e}"),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{Command, TaskInput, TaskStatus};
    use chrono::NaiveDate;
    use std::fs;
    use uuid::Uuid;

    /// Create a temp save file that auto-cleans.
    fn temp_save(name: &str) -> (SaveFile, String) {
        let path = format!("/tmp/planner_test_{name}_{}.redb", std::process::id());
        let _ = fs::remove_file(&path); // clean up any leftover
        let sf = SaveFile::open(&path).unwrap();
        (sf, path)
    }

    fn cleanup(path: &str) {
        let _ = fs::remove_file(path);
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn create_week(
        planner: &mut Planner,
        sf: &SaveFile,
        title: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Uuid {
        let event = planner
            .apply(Command::CreateWeek {
                title: title.into(),
                start_date: start,
                end_date: end,
                description: String::new(),
            })
            .unwrap();
        sf.flush(planner, &event).unwrap();
        event.week_id()
    }

    #[test]
    fn round_trip_empty_planner() {
        let (sf, path) = temp_save("empty");

        let planner = sf.load_planner().unwrap();
        assert_eq!(planner.weeks.len(), 0);
        assert_eq!(planner.revision, 0);

        cleanup(&path);
    }

    #[test]
    fn flush_and_reload_weeks_and_tasks() {
        let (sf, path) = temp_save("weeks");

        let mut planner = sf.load_planner().unwrap();
        let id = create_week(&mut planner, &sf, "Algorithms", d(2024, 2, 12), d(2024, 2, 18));

        let event = planner
            .apply(Command::AddTask {
                week_id: id,
                task: TaskInput {
                    date: d(2024, 2, 12),
                    study_time: 90,
                    description: "Graphs".into(),
                    is_holiday: false,
                    has_meeting: true,
                    status: None,
                },
            })
            .unwrap();
        sf.flush(&planner, &event).unwrap();

        // Reboot — planner should come back in the same state
        let planner2 = sf.load_planner().unwrap();
        assert_eq!(planner2.revision, 2);
        assert_eq!(planner2.weeks.len(), 1);

        let week = planner2.week(id).unwrap();
        assert_eq!(week.title, "Algorithms");
        assert_eq!(week.tasks.len(), 1);
        assert_eq!(week.tasks[0].day, "Monday");
        assert_eq!(week.tasks[0].study_time, 90);
        assert!(week.tasks[0].has_meeting);
        assert_eq!(week.tasks[0].status, TaskStatus::Todo);

        cleanup(&path);
    }

    #[test]
    fn delete_week_removes_from_disk() {
        let (sf, path) = temp_save("delete");

        let mut planner = sf.load_planner().unwrap();
        let id = create_week(&mut planner, &sf, "Doomed", d(2024, 2, 12), d(2024, 2, 18));

        let event = planner.apply(Command::DeleteWeek { week_id: id }).unwrap();
        sf.flush(&planner, &event).unwrap();

        // Reboot — week should be gone, revision kept
        let planner2 = sf.load_planner().unwrap();
        assert_eq!(planner2.weeks.len(), 0);
        assert_eq!(planner2.revision, 2);

        cleanup(&path);
    }

    #[test]
    fn load_orders_weeks_by_start_date() {
        let (sf, path) = temp_save("order");

        let mut planner = sf.load_planner().unwrap();
        create_week(&mut planner, &sf, "March", d(2024, 3, 4), d(2024, 3, 10));
        create_week(&mut planner, &sf, "February", d(2024, 2, 12), d(2024, 2, 18));

        let planner2 = sf.load_planner().unwrap();
        let titles: Vec<&str> = planner2.weeks.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["February", "March"]);

        cleanup(&path);
    }
}
