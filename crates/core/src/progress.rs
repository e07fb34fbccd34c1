//! Subject progress aggregation.
//!
//! A subject's `totalTopics`, `completedTopics`, and `progress` fields are
//! never edited directly. They are derived from the subject's topic set
//! every time a topic is created, updated, or deleted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{SubjectId, Topic};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("completed topics ({completed}) exceeds total topics ({total})")]
    CompletedExceedsTotal { total: u32, completed: u32 },

    #[error("stored progress {stored} does not match {completed}/{total} (expected {expected})")]
    Mismatch {
        total: u32,
        completed: u32,
        stored: u8,
        expected: u8,
    },
}

/// Aggregate completion counters for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    total_topics: u32,
    completed_topics: u32,
    progress: u8,
}

impl SubjectProgress {
    /// Progress of a subject without topics.
    pub const EMPTY: Self = Self {
        total_topics: 0,
        completed_topics: 0,
        progress: 0,
    };

    /// Builds the aggregate from raw counts.
    ///
    /// `completed` is clamped to `total`.
    #[must_use]
    pub fn from_counts(total: u32, completed: u32) -> Self {
        let completed = completed.min(total);
        Self {
            total_topics: total,
            completed_topics: completed,
            progress: percent(u64::from(completed), u64::from(total)),
        }
    }

    /// Recomputes the aggregate from the complete topic set of one subject.
    #[must_use]
    pub fn from_topics<'a, I>(topics: I) -> Self
    where
        I: IntoIterator<Item = &'a Topic>,
    {
        Self::from_completion_flags(topics.into_iter().map(Topic::is_completed))
    }

    /// Recomputes the aggregate from one completion flag per topic.
    #[must_use]
    pub fn from_completion_flags(flags: impl IntoIterator<Item = bool>) -> Self {
        let (total, completed) = flags
            .into_iter()
            .fold((0_u32, 0_u32), |(total, done), flag| {
                (total.saturating_add(1), done.saturating_add(u32::from(flag)))
            });
        Self::from_counts(total, completed)
    }

    /// Rehydrate stored counters, checking they still satisfy the rounding rule.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` when the stored fields are inconsistent.
    pub fn from_persisted(total: u32, completed: u32, progress: u8) -> Result<Self, ProgressError> {
        if completed > total {
            return Err(ProgressError::CompletedExceedsTotal { total, completed });
        }
        let expected = Self::from_counts(total, completed);
        if expected.progress != progress {
            return Err(ProgressError::Mismatch {
                total,
                completed,
                stored: progress,
                expected: expected.progress,
            });
        }
        Ok(expected)
    }

    #[must_use]
    pub fn total_topics(&self) -> u32 {
        self.total_topics
    }

    #[must_use]
    pub fn completed_topics(&self) -> u32 {
        self.completed_topics
    }

    /// Completion percentage, 0..=100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.progress
    }
}

/// A topic write together with the parent subject's recomputed progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicChange {
    pub topic: Topic,
    pub subject_progress: SubjectProgress,
}

/// Outcome of deleting a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRemoval {
    pub subject_id: SubjectId,
    pub subject_progress: SubjectProgress,
}

/// `round(part / whole * 100)` with ties rounded up; `0` when `whole == 0`.
///
/// Integer arithmetic keeps halves exact (1/8 → 13, 2/3 → 67).
#[must_use]
pub fn percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole);
    let rounded = (200 * part + whole) / (2 * whole);
    u8::try_from(rounded).unwrap_or(100)
}

/// Rounded mean of a set of percentages; `0` for an empty set.
#[must_use]
pub fn mean_percent(values: impl IntoIterator<Item = u8>) -> u8 {
    let (sum, count) = values
        .into_iter()
        .fold((0_u64, 0_u64), |(sum, count), v| (sum + u64::from(v), count + 1));
    if count == 0 {
        return 0;
    }
    let rounded = (2 * sum + count) / (2 * count);
    u8::try_from(rounded).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreateTopic, SubjectId, TopicId, UserId};
    use crate::time::fixed_now;

    fn topic(completed: bool) -> Topic {
        Topic::new(
            TopicId::generate(),
            UserId::new("u1").unwrap(),
            CreateTopic {
                subject_id: SubjectId::generate(),
                name: "Limits".into(),
                description: None,
                is_completed: Some(completed),
                order: None,
                resources: None,
            },
            0,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn empty_topic_set_has_zero_progress() {
        let p = SubjectProgress::from_topics(&[]);
        assert_eq!(p, SubjectProgress::EMPTY);
        assert_eq!(
            (p.total_topics(), p.completed_topics(), p.percent()),
            (0, 0, 0)
        );
    }

    #[test]
    fn two_of_three_rounds_to_67() {
        let topics = vec![topic(true), topic(true), topic(false)];
        let p = SubjectProgress::from_topics(&topics);
        assert_eq!(
            (p.total_topics(), p.completed_topics(), p.percent()),
            (3, 2, 67)
        );
    }

    #[test]
    fn removing_the_done_topic_drops_to_zero() {
        let mut topics = vec![topic(true), topic(false)];
        assert_eq!(SubjectProgress::from_topics(&topics).percent(), 50);
        topics.remove(0);
        let p = SubjectProgress::from_topics(&topics);
        assert_eq!(
            (p.total_topics(), p.completed_topics(), p.percent()),
            (1, 0, 0)
        );
    }

    #[test]
    fn aggregation_is_idempotent() {
        let topics = vec![topic(true), topic(false), topic(false)];
        let first = SubjectProgress::from_topics(&topics);
        let second = SubjectProgress::from_topics(&topics);
        assert_eq!(first, second);
    }

    #[test]
    fn percent_matches_round_half_up_for_small_sets() {
        for total in 1_u64..=40 {
            for done in 0..=total {
                let whole = 100 * done / total;
                let remainder = 100 * done % total;
                let expected = if 2 * remainder >= total { whole + 1 } else { whole };
                assert_eq!(u64::from(percent(done, total)), expected, "{done}/{total}");
            }
        }
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(1, 200), 1);
        assert_eq!(percent(1, 2), 50);
    }

    #[test]
    fn from_persisted_rejects_inconsistent_counters() {
        assert!(SubjectProgress::from_persisted(3, 2, 67).is_ok());
        assert!(matches!(
            SubjectProgress::from_persisted(3, 2, 50),
            Err(ProgressError::Mismatch { expected: 67, .. })
        ));
        assert!(matches!(
            SubjectProgress::from_persisted(1, 2, 100),
            Err(ProgressError::CompletedExceedsTotal { .. })
        ));
    }

    #[test]
    fn mean_percent_rounds_and_handles_empty() {
        assert_eq!(mean_percent([]), 0);
        assert_eq!(mean_percent([50, 51]), 51);
        assert_eq!(mean_percent([0, 100, 100]), 67);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(SubjectProgress::from_counts(4, 1)).unwrap();
        assert_eq!(json["totalTopics"], 4);
        assert_eq!(json["completedTopics"], 1);
        assert_eq!(json["progress"], 25);
    }
}
