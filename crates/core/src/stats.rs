//! Derived dashboard statistics.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Note, NoteId, PomodoroSession, Subject, Task};
use crate::progress::{mean_percent, percent};
use crate::time::start_of_day;

/// How many notes the dashboard surfaces as "recent".
pub const RECENT_NOTES: usize = 3;

/// Focus-time summary over completed work sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroStats {
    pub total_sessions: u32,
    pub total_minutes: u32,
    pub today_sessions: u32,
    pub week_sessions: u32,
}

impl PomodoroStats {
    /// Summarise sessions as of `now`.
    ///
    /// Only completed `work` sessions count. "Today" is the current UTC day;
    /// "week" is the trailing seven days.
    #[must_use]
    pub fn compute<'a>(sessions: impl IntoIterator<Item = &'a PomodoroSession>, now: DateTime<Utc>) -> Self {
        let today = start_of_day(now);
        let week_ago = now - Duration::days(7);

        let mut stats = Self::default();
        let mut total_secs: u64 = 0;
        for session in sessions.into_iter().filter(|s| s.is_focus()) {
            stats.total_sessions += 1;
            total_secs += u64::from(session.duration());
            if session.completed_at() >= today {
                stats.today_sessions += 1;
            }
            if session.completed_at() >= week_ago {
                stats.week_sessions += 1;
            }
        }
        // round(secs / 60), halves up
        stats.total_minutes = u32::try_from((total_secs + 30) / 60).unwrap_or(u32::MAX);
        stats
    }
}

/// Everything the dashboard shows for one user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub pending_tasks: u32,
    pub due_today: u32,
    pub overdue: u32,
    pub due_tomorrow: u32,
    pub completed_tasks: u32,
    pub completion_rate: u8,
    pub active_subjects: u32,
    pub average_progress: u8,
    pub notes_count: u32,
    pub recent_notes: Vec<NoteId>,
    pub pomodoro: PomodoroStats,
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl DashboardStats {
    #[must_use]
    pub fn compute(
        tasks: &[Task],
        subjects: &[Subject],
        notes: &[Note],
        sessions: &[PomodoroSession],
        now: DateTime<Utc>,
    ) -> Self {
        let today = start_of_day(now);
        let tomorrow = today + Duration::days(1);
        let day_after = tomorrow + Duration::days(1);

        let mut stats = Self::default();
        for task in tasks {
            if !task.status().is_open() {
                stats.completed_tasks += 1;
                continue;
            }
            stats.pending_tasks += 1;
            let Some(due) = task.due_date() else {
                continue;
            };
            if due < today {
                stats.overdue += 1;
            } else if due < tomorrow {
                stats.due_today += 1;
            } else if due < day_after {
                stats.due_tomorrow += 1;
            }
        }
        stats.completion_rate = percent(
            u64::from(stats.completed_tasks),
            u64::from(count(tasks.len())),
        );

        stats.active_subjects = count(subjects.len());
        stats.average_progress = mean_percent(subjects.iter().map(|s| s.progress().percent()));

        stats.notes_count = count(notes.len());
        let mut recent: Vec<&Note> = notes.iter().collect();
        recent.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        stats.recent_notes = recent.iter().take(RECENT_NOTES).map(|n| n.id()).collect();

        stats.pomodoro = PomodoroStats::compute(sessions, now);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CreateNote, CreatePomodoroSession, CreateSubject, CreateTask, PomodoroSessionId,
        SessionKind, SubjectId, TaskId, TaskStatus, UserId,
    };
    use crate::progress::SubjectProgress;
    use crate::time::fixed_now;

    fn owner() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn task(status: TaskStatus, due: Option<DateTime<Utc>>) -> Task {
        let mut input = CreateTask::titled("t");
        input.status = Some(status);
        input.due_date = due;
        Task::new(TaskId::generate(), owner(), input, fixed_now()).unwrap()
    }

    fn session(kind: SessionKind, secs: u32, at: DateTime<Utc>, done: bool) -> PomodoroSession {
        PomodoroSession::new(
            PomodoroSessionId::generate(),
            owner(),
            CreatePomodoroSession {
                kind,
                duration: secs,
                completed_at: at,
                was_completed: done,
                task_id: None,
                subject_id: None,
            },
            at,
        )
        .unwrap()
    }

    #[test]
    fn pomodoro_stats_count_only_completed_work() {
        let now = fixed_now();
        let sessions = vec![
            session(SessionKind::Work, 1500, now - Duration::hours(1), true),
            session(SessionKind::Work, 1500, now - Duration::days(3), true),
            session(SessionKind::Work, 1530, now - Duration::days(10), true),
            session(SessionKind::Work, 1500, now, false),
            session(SessionKind::Break, 300, now, true),
        ];
        let stats = PomodoroStats::compute(&sessions, now);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.today_sessions, 1);
        assert_eq!(stats.week_sessions, 2);
        // 4530 s = 75.5 min
        assert_eq!(stats.total_minutes, 76);
    }

    #[test]
    fn dashboard_buckets_tasks_by_due_date() {
        let now = fixed_now();
        let tasks = vec![
            task(TaskStatus::Pending, Some(now + Duration::minutes(30))),
            task(TaskStatus::InProgress, Some(now - Duration::days(2))),
            task(TaskStatus::Pending, Some(now + Duration::days(1))),
            task(TaskStatus::Pending, None),
            task(TaskStatus::Completed, Some(now - Duration::days(5))),
        ];
        let stats = DashboardStats::compute(&tasks, &[], &[], &[], now);
        assert_eq!(stats.pending_tasks, 4);
        assert_eq!(stats.due_today, 1);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.due_tomorrow, 1);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.completion_rate, 20);
    }

    #[test]
    fn dashboard_averages_subject_progress_and_lists_recent_notes() {
        let now = fixed_now();
        let mut a = Subject::new(
            SubjectId::generate(),
            owner(),
            CreateSubject {
                name: "A".into(),
                color: "#000".into(),
                icon: None,
                professor: None,
                schedule: None,
            },
            now,
        )
        .unwrap();
        a.apply_progress(SubjectProgress::from_counts(3, 2));
        let b = Subject::new(
            SubjectId::generate(),
            owner(),
            CreateSubject {
                name: "B".into(),
                color: "#fff".into(),
                icon: None,
                professor: None,
                schedule: None,
            },
            now,
        )
        .unwrap();

        let notes: Vec<Note> = (0..5)
            .map(|i| {
                Note::new(
                    NoteId::generate(),
                    owner(),
                    CreateNote {
                        title: format!("n{i}"),
                        content: "c".into(),
                        subject_id: None,
                        tags: None,
                        is_favorite: None,
                    },
                    now + Duration::minutes(i),
                )
                .unwrap()
            })
            .collect();

        let stats = DashboardStats::compute(&[], &[a, b], &notes, &[], now);
        assert_eq!(stats.active_subjects, 2);
        // (67 + 0) / 2 = 33.5
        assert_eq!(stats.average_progress, 34);
        assert_eq!(stats.notes_count, 5);
        assert_eq!(stats.recent_notes, vec![notes[4].id(), notes[3].id(), notes[2].id()]);
        assert_eq!(stats.completion_rate, 0);
    }
}
