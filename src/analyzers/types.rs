//! Output types produced by the aggregation pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::stats::{RatingDistribution, SubsetCounts};

/// Response-weighted satisfaction averages. `None` when nothing contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SatisfactionAverages {
    pub overall: Option<f64>,
    pub course: Option<f64>,
    pub instructor: Option<f64>,
    pub operation: Option<f64>,
}

/// Real-only or real+test view of a single record, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CombinedMetrics {
    pub counts: SubsetCounts,
    pub averages: SatisfactionAverages,
    pub rating_distribution: RatingDistribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RoundKey {
    pub education_year: i32,
    pub education_round: i32,
}

impl fmt::Display for RoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-R{}", self.education_year, self.education_round)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_surveys: u64,
    pub active_surveys: u64,
    pub total_responses: u64,
    pub total_text_responses: u64,
    pub course_count: usize,
    pub instructor_count: usize,
    pub averages: SatisfactionAverages,
    pub last_response_at: Option<DateTime<Utc>>,
}

/// One chronological point per distinct (year, round).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub round: RoundKey,
    pub label: String,
    pub survey_count: u64,
    pub response_count: u64,
    pub averages: SatisfactionAverages,
}

/// All rounds and instructors of one normalized course name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseBreakdown {
    pub course_key: String,
    pub course_name: String,
    pub rounds: Vec<RoundKey>,
    pub instructor_count: usize,
    pub survey_count: u64,
    pub response_count: u64,
    pub text_response_count: u64,
    pub averages: SatisfactionAverages,
}

/// A question merged across records by `question_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionInsight {
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

/// Distinct values available for building filter choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub rounds: Vec<i32>,
    pub courses: Vec<String>,
}
