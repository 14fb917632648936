//! Typed statistics records for one instructor/year/round/course row.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

/// Histogram of integer scores 1..=10. All ten buckets always exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingDistribution([u64; 10]);

impl RatingDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `score`, or 0 when the score is outside 1..=10.
    pub fn get(&self, score: u8) -> u64 {
        Self::index(score).map(|i| self.0[i]).unwrap_or(0)
    }

    /// Sets the count for `score`. Scores outside 1..=10 are ignored.
    pub fn set(&mut self, score: u8, count: u64) {
        if let Some(i) = Self::index(score) {
            self.0[i] = count;
        }
    }

    /// Iterates `(score, count)` pairs in ascending score order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(i, count)| (i as u8 + MIN_SCORE, *count))
    }

    pub fn total(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Returns a new histogram with both sets of counts added together.
    pub fn merge(&self, other: &RatingDistribution) -> RatingDistribution {
        let mut out = *self;
        for (slot, count) in out.0.iter_mut().zip(other.0.iter()) {
            *slot = slot.saturating_add(*count);
        }
        out
    }

    fn index(score: u8) -> Option<usize> {
        (MIN_SCORE..=MAX_SCORE)
            .contains(&score)
            .then(|| (score - MIN_SCORE) as usize)
    }
}

impl Serialize for RatingDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (score, count) in self.iter() {
            map.serialize_entry(&score.to_string(), &count)?;
        }
        map.end()
    }
}

/// Per-question statistics within one metrics subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuestionStat {
    pub question_id: String,
    pub question_text: String,
    pub question_type: String,
    pub satisfaction_type: Option<String>,
    pub order_index: i64,
    pub total_answers: u64,
    pub average: Option<f64>,
    pub rating_distribution: RatingDistribution,
    pub text_answers: Vec<String>,
}

/// Averages, histogram, question stats and free text for either the real or
/// the test responses of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSet {
    pub avg_overall: Option<f64>,
    pub avg_course: Option<f64>,
    pub avg_instructor: Option<f64>,
    pub avg_operation: Option<f64>,
    pub rating_distribution: RatingDistribution,
    pub question_stats: Vec<QuestionStat>,
    pub text_responses: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubsetCounts {
    pub survey_count: u64,
    pub active_survey_count: u64,
    pub response_count: u64,
    pub text_response_count: u64,
}

impl SubsetCounts {
    pub fn add(&self, other: &SubsetCounts) -> SubsetCounts {
        SubsetCounts {
            survey_count: self.survey_count.saturating_add(other.survey_count),
            active_survey_count: self
                .active_survey_count
                .saturating_add(other.active_survey_count),
            response_count: self.response_count.saturating_add(other.response_count),
            text_response_count: self
                .text_response_count
                .saturating_add(other.text_response_count),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsRecord {
    pub instructor_id: Option<String>,
    pub instructor_name: Option<String>,
    pub education_year: i32,
    pub education_round: i32,
    pub course_name: String,

    pub real_counts: SubsetCounts,
    pub test_counts: SubsetCounts,
    pub last_response_at: Option<DateTime<Utc>>,

    pub real: MetricsSet,
    pub test: MetricsSet,
}

impl StatsRecord {
    /// Counts selected by the include-test toggle.
    pub fn counts(&self, include_test: bool) -> SubsetCounts {
        if include_test {
            self.real_counts.add(&self.test_counts)
        } else {
            self.real_counts
        }
    }

    /// `(metrics, responses)` pairs selected by the include-test toggle,
    /// real first.
    pub fn subsets(&self, include_test: bool) -> Vec<(&MetricsSet, u64)> {
        let mut out = vec![(&self.real, self.real_counts.response_count)];
        if include_test {
            out.push((&self.test, self.test_counts.response_count));
        }
        out
    }
}
