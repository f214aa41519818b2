use crate::dates;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Entity types ──────────────────────────────────────────────

/// Task lifecycle label.
///
/// Holiday is terminal-ish: a task flagged `is_holiday` is forced here and
/// stays until the flag is cleared by an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Completed,
    Holiday,
}

/// A single planned study session (or holiday marker) within a week.
///
/// `day` is always derived from `date` — clients never set it, and every
/// write path recomputes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub date: NaiveDate,
    pub day: String,
    /// Planned duration in minutes. Zero for holiday markers.
    pub study_time: u32,
    pub description: String,
    pub is_holiday: bool,
    pub has_meeting: bool,
    pub status: TaskStatus,
}

/// A reference link attached to a week.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub url: String,
}

/// A titled date range holding tasks in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
    pub tasks: Vec<Task>,
    pub resources: Vec<Resource>,
}

/// Client-submitted task fields. Note the absence of `day` — it cannot be
/// submitted, only derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub date: NaiveDate,
    #[serde(default)]
    pub study_time: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_holiday: bool,
    #[serde(default)]
    pub has_meeting: bool,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

// ── Commands (client → planner) ───────────────────────────────

/// A command is something a client wants to happen. The planner validates
/// it, applies it, and returns an Event (or an error).
#[derive(Debug, Clone)]
pub enum Command {
    CreateWeek {
        title: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        description: String,
    },
    DeleteWeek {
        week_id: Uuid,
    },
    AddTask {
        week_id: Uuid,
        task: TaskInput,
    },
    UpdateTask {
        week_id: Uuid,
        index: usize,
        task: TaskInput,
    },
    DeleteTask {
        week_id: Uuid,
        index: usize,
    },
    SetTaskStatus {
        week_id: Uuid,
        index: usize,
        status: TaskStatus,
    },
    AddResource {
        week_id: Uuid,
        title: String,
        url: String,
    },
    DeleteResource {
        week_id: Uuid,
        resource_id: Uuid,
    },
}

// ── Events (planner → clients) ────────────────────────────────

/// What actually happened. Broadcast to all sync subscribers as tagged
/// JSON; each event carries the revision it was applied at.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Event {
    WeekCreated {
        revision: u64,
        week: Week,
    },
    WeekDeleted {
        revision: u64,
        week_id: Uuid,
    },
    TaskAdded {
        revision: u64,
        week_id: Uuid,
        index: usize,
        task: Task,
    },
    TaskUpdated {
        revision: u64,
        week_id: Uuid,
        index: usize,
        task: Task,
    },
    TaskDeleted {
        revision: u64,
        week_id: Uuid,
        index: usize,
    },
    TaskStatusChanged {
        revision: u64,
        week_id: Uuid,
        index: usize,
        status: TaskStatus,
    },
    ResourceAdded {
        revision: u64,
        week_id: Uuid,
        resource: Resource,
    },
    ResourceDeleted {
        revision: u64,
        week_id: Uuid,
        resource_id: Uuid,
    },
}

impl Event {
    /// The week this event touched. Drives the per-week save file flush.
    pub fn week_id(&self) -> Uuid {
        match self {
            Event::WeekCreated { week, .. } => week.id,
            Event::WeekDeleted { week_id, .. }
            | Event::TaskAdded { week_id, .. }
            | Event::TaskUpdated { week_id, .. }
            | Event::TaskDeleted { week_id, .. }
            | Event::TaskStatusChanged { week_id, .. }
            | Event::ResourceAdded { week_id, .. }
            | Event::ResourceDeleted { week_id, .. } => *week_id,
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerError {
    WeekNotFound,
    TaskNotFound,
    ResourceNotFound,
    MissingTitle,
    EndBeforeStart,
    /// New week's range shares at least one day with an existing week.
    OverlappingWeek,
    MissingStudyTime,
    MissingDescription,
    MissingResourceFields,
}

impl std::fmt::Display for PlannerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            PlannerError::WeekNotFound => "Week not found",
            PlannerError::TaskNotFound => "Task not found",
            PlannerError::ResourceNotFound => "Resource not found",
            PlannerError::MissingTitle => "Title is required",
            PlannerError::EndBeforeStart => "End date must be after start date",
            PlannerError::OverlappingWeek => "A week already exists for these dates",
            PlannerError::MissingStudyTime => "Study duration is required",
            PlannerError::MissingDescription => "Task description is required",
            PlannerError::MissingResourceFields => "Resource title and URL are required",
        };
        f.write_str(msg)
    }
}

// ── The Planner ────────────────────────────────────────────────

/// The authoritative planner state. Lives in memory, loaded from the save
/// file on boot. All mutations go through apply() which validates, mutates,
/// and returns an Event for flush + broadcast. Failed commands leave the
/// state untouched.
pub struct Planner {
    /// Weeks kept sorted by start date — ranges are disjoint, so this is a
    /// total order and doubles as display order.
    pub weeks: Vec<Week>,
    pub revision: u64,
}

impl Planner {
    pub fn new() -> Self {
        Planner {
            weeks: Vec::new(),
            revision: 0,
        }
    }

    pub fn week(&self, id: Uuid) -> Option<&Week> {
        self.weeks.iter().find(|w| w.id == id)
    }

    fn week_mut(&mut self, id: Uuid) -> Result<&mut Week, PlannerError> {
        self.weeks
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(PlannerError::WeekNotFound)
    }

    /// Linear scan overlap check against every existing week.
    fn has_overlap(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.weeks
            .iter()
            .any(|w| dates::ranges_overlap(start, end, w.start_date, w.end_date))
    }

    /// Apply a command. Returns the resulting Event on success.
    /// This is THE mutation codepath — every state change goes through here.
    pub fn apply(&mut self, cmd: Command) -> Result<Event, PlannerError> {
        match cmd {
            Command::CreateWeek { title, start_date, end_date, description } => {
                if title.trim().is_empty() {
                    return Err(PlannerError::MissingTitle);
                }
                if end_date < start_date {
                    return Err(PlannerError::EndBeforeStart);
                }
                if self.has_overlap(start_date, end_date) {
                    return Err(PlannerError::OverlappingWeek);
                }

                let week = Week {
                    id: Uuid::new_v4(),
                    title,
                    start_date,
                    end_date,
                    description,
                    tasks: Vec::new(),
                    resources: Vec::new(),
                };

                // Keep the list sorted by start date.
                let pos = self
                    .weeks
                    .partition_point(|w| w.start_date < week.start_date);
                self.weeks.insert(pos, week.clone());

                self.revision += 1;
                Ok(Event::WeekCreated {
                    revision: self.revision,
                    week,
                })
            }

            Command::DeleteWeek { week_id } => {
                let pos = self
                    .weeks
                    .iter()
                    .position(|w| w.id == week_id)
                    .ok_or(PlannerError::WeekNotFound)?;
                self.weeks.remove(pos);

                self.revision += 1;
                Ok(Event::WeekDeleted {
                    revision: self.revision,
                    week_id,
                })
            }

            Command::AddTask { week_id, task } => {
                let week = self.week_mut(week_id)?;
                let task = materialize_task(task)?;
                week.tasks.push(task.clone());
                let index = week.tasks.len() - 1;

                self.revision += 1;
                Ok(Event::TaskAdded {
                    revision: self.revision,
                    week_id,
                    index,
                    task,
                })
            }

            Command::UpdateTask { week_id, index, task } => {
                let week = self.week_mut(week_id)?;
                let task = materialize_task(task)?;
                let slot = week
                    .tasks
                    .get_mut(index)
                    .ok_or(PlannerError::TaskNotFound)?;
                *slot = task.clone();

                self.revision += 1;
                Ok(Event::TaskUpdated {
                    revision: self.revision,
                    week_id,
                    index,
                    task,
                })
            }

            Command::DeleteTask { week_id, index } => {
                let week = self.week_mut(week_id)?;
                if index >= week.tasks.len() {
                    return Err(PlannerError::TaskNotFound);
                }
                // Vec::remove preserves the relative order of survivors.
                week.tasks.remove(index);

                self.revision += 1;
                Ok(Event::TaskDeleted {
                    revision: self.revision,
                    week_id,
                    index,
                })
            }

            Command::SetTaskStatus { week_id, index, status } => {
                let week = self.week_mut(week_id)?;
                let task = week
                    .tasks
                    .get_mut(index)
                    .ok_or(PlannerError::TaskNotFound)?;
                task.status = status;

                self.revision += 1;
                Ok(Event::TaskStatusChanged {
                    revision: self.revision,
                    week_id,
                    index,
                    status,
                })
            }

            Command::AddResource { week_id, title, url } => {
                if title.trim().is_empty() || url.trim().is_empty() {
                    return Err(PlannerError::MissingResourceFields);
                }
                let week = self.week_mut(week_id)?;
                let resource = Resource {
                    id: Uuid::new_v4(),
                    title,
                    url,
                };
                week.resources.push(resource.clone());

                self.revision += 1;
                Ok(Event::ResourceAdded {
                    revision: self.revision,
                    week_id,
                    resource,
                })
            }

            Command::DeleteResource { week_id, resource_id } => {
                let week = self.week_mut(week_id)?;
                let pos = week
                    .resources
                    .iter()
                    .position(|r| r.id == resource_id)
                    .ok_or(PlannerError::ResourceNotFound)?;
                week.resources.remove(pos);

                self.revision += 1;
                Ok(Event::ResourceDeleted {
                    revision: self.revision,
                    week_id,
                    resource_id,
                })
            }
        }
    }
}

/// Validate submitted task fields and build the stored entity.
///
/// Holiday markers skip the duration/description requirements and are forced
/// to Holiday status; everything else defaults to Todo unless the client
/// sent an explicit status.
fn materialize_task(input: TaskInput) -> Result<Task, PlannerError> {
    if !input.is_holiday {
        if input.study_time == 0 {
            return Err(PlannerError::MissingStudyTime);
        }
        if input.description.trim().is_empty() {
            return Err(PlannerError::MissingDescription);
        }
    }

    let status = if input.is_holiday {
        TaskStatus::Holiday
    } else {
        input.status.unwrap_or(TaskStatus::Todo)
    };

    Ok(Task {
        day: dates::day_name(input.date).to_string(),
        date: input.date,
        study_time: input.study_time,
        description: input.description,
        is_holiday: input.is_holiday,
        has_meeting: input.has_meeting,
        status,
    })
}

// ── Tests ──────────────────────────────────────────────────────
