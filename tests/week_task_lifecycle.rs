//! End-to-end planner lifecycle against a real save file: build up a
//! schedule, mutate it, then reload from disk as a fresh boot would.

use chrono::NaiveDate;
use planner_server::persist::SaveFile;
use planner_server::planner::{Command, Planner, PlannerError, TaskInput, TaskStatus};
use uuid::Uuid;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

struct Harness {
    save_file: SaveFile,
    planner: Planner,
    path: String,
}

impl Harness {
    fn new(name: &str) -> Self {
        let path = format!("/tmp/planner_it_{name}_{}.redb", std::process::id());
        let _ = std::fs::remove_file(&path);
        let save_file = SaveFile::open(&path).unwrap();
        let planner = save_file.load_planner().unwrap();
        Harness { save_file, planner, path }
    }

    /// The server's mutation path: apply, then flush.
    fn run(&mut self, cmd: Command) -> Result<Uuid, PlannerError> {
        let event = self.planner.apply(cmd)?;
        self.save_file.flush(&self.planner, &event).unwrap();
        Ok(event.week_id())
    }

    /// Simulated reboot: reload everything from the save file.
    fn reboot(&self) -> Planner {
        self.save_file.load_planner().unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn study(date: NaiveDate, desc: &str, minutes: u32) -> TaskInput {
    TaskInput {
        date,
        study_time: minutes,
        description: desc.into(),
        is_holiday: false,
        has_meeting: false,
        status: None,
    }
}

#[test]
fn full_week_lifecycle_survives_reboot() {
    let mut h = Harness::new("lifecycle");

    let week_id = h
        .run(Command::CreateWeek {
            title: "Algorithms review".into(),
            start_date: d(2024, 2, 12),
            end_date: d(2024, 2, 18),
            description: "Sorting and graphs".into(),
        })
        .unwrap();

    h.run(Command::AddTask { week_id, task: study(d(2024, 2, 12), "Quicksort", 90) })
        .unwrap();
    h.run(Command::AddTask { week_id, task: study(d(2024, 2, 13), "Dijkstra", 60) })
        .unwrap();
    h.run(Command::AddTask {
        week_id,
        task: TaskInput {
            date: d(2024, 2, 16),
            study_time: 0,
            description: String::new(),
            is_holiday: true,
            has_meeting: false,
            status: None,
        },
    })
    .unwrap();

    h.run(Command::SetTaskStatus { week_id, index: 0, status: TaskStatus::Completed })
        .unwrap();
    h.run(Command::AddResource {
        week_id,
        title: "CLRS".into(),
        url: "https://example.com/clrs".into(),
    })
    .unwrap();

    // Reboot and verify the whole shape came back.
    let planner = h.reboot();
    assert_eq!(planner.revision, 6);

    let week = planner.week(week_id).unwrap();
    assert_eq!(week.title, "Algorithms review");
    assert_eq!(week.tasks.len(), 3);
    assert_eq!(week.resources.len(), 1);

    assert_eq!(week.tasks[0].status, TaskStatus::Completed);
    assert_eq!(week.tasks[0].day, "Monday");
    assert_eq!(week.tasks[1].day, "Tuesday");
    assert_eq!(week.tasks[2].status, TaskStatus::Holiday);
    assert!(week.tasks[2].is_holiday);
}

#[test]
fn task_deletion_keeps_survivors_in_order_across_reboot() {
    let mut h = Harness::new("deletion");

    let week_id = h
        .run(Command::CreateWeek {
            title: "Week".into(),
            start_date: d(2024, 3, 4),
            end_date: d(2024, 3, 10),
            description: String::new(),
        })
        .unwrap();

    for (day, desc) in [(4, "a"), (5, "b"), (6, "c")] {
        h.run(Command::AddTask { week_id, task: study(d(2024, 3, day), desc, 30) })
            .unwrap();
    }

    h.run(Command::DeleteTask { week_id, index: 0 }).unwrap();

    let planner = h.reboot();
    let week = planner.week(week_id).unwrap();
    let descs: Vec<&str> = week.tasks.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(descs, vec!["b", "c"]);
}

#[test]
fn overlapping_week_rejected_and_nothing_written() {
    let mut h = Harness::new("overlap");

    h.run(Command::CreateWeek {
        title: "First".into(),
        start_date: d(2024, 2, 12),
        end_date: d(2024, 2, 18),
        description: String::new(),
    })
    .unwrap();

    let result = h.run(Command::CreateWeek {
        title: "Clash".into(),
        start_date: d(2024, 2, 15),
        end_date: d(2024, 2, 21),
        description: String::new(),
    });
    assert_eq!(result.unwrap_err(), PlannerError::OverlappingWeek);

    let planner = h.reboot();
    assert_eq!(planner.weeks.len(), 1);
    assert_eq!(planner.revision, 1);
}

#[test]
fn deleted_week_stays_deleted_after_reboot() {
    let mut h = Harness::new("week_delete");

    let keep = h
        .run(Command::CreateWeek {
            title: "Keep".into(),
            start_date: d(2024, 2, 12),
            end_date: d(2024, 2, 18),
            description: String::new(),
        })
        .unwrap();
    let doomed = h
        .run(Command::CreateWeek {
            title: "Doomed".into(),
            start_date: d(2024, 2, 19),
            end_date: d(2024, 2, 25),
            description: String::new(),
        })
        .unwrap();

    h.run(Command::DeleteWeek { week_id: doomed }).unwrap();

    let planner = h.reboot();
    assert_eq!(planner.weeks.len(), 1);
    assert!(planner.week(keep).is_some());
    assert!(planner.week(doomed).is_none());
}
