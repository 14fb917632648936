//! Everything one screen of statistics needs, derived in one pass over a
//! freshly loaded record list.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::analyzers::aggregate::{
    course_breakdown, has_data, question_insights, rating_distribution, summary_metrics,
    trend_series,
};
use crate::analyzers::types::{
    CourseBreakdown, FilterOptions, QuestionInsight, SummaryMetrics, TrendPoint,
};
use crate::filters::{Filters, YearFilter, apply_filters, normalize_course_name};
use crate::stats::{RatingDistribution, StatsRecord};

#[derive(Debug, Clone, Serialize)]
pub struct StatsView {
    pub include_test: bool,
    pub has_data: bool,
    pub options: FilterOptions,
    pub summary: SummaryMetrics,
    pub trend: Vec<TrendPoint>,
    pub courses: Vec<CourseBreakdown>,
    pub rating_distribution: RatingDistribution,
    pub questions: Vec<QuestionInsight>,
    #[serde(skip)]
    pub records: Vec<StatsRecord>,
}

impl StatsView {
    /// Filters `records` and runs every derivation on the result. Filter
    /// options are taken from the unfiltered set.
    pub fn build(records: &[StatsRecord], filters: &Filters, include_test: bool) -> Self {
        let filtered = apply_filters(records, filters);

        StatsView {
            include_test,
            has_data: has_data(&filtered, include_test),
            options: filter_options(records, filters.year),
            summary: summary_metrics(&filtered, include_test),
            trend: trend_series(&filtered, include_test),
            courses: course_breakdown(&filtered, include_test),
            rating_distribution: rating_distribution(&filtered, include_test),
            questions: question_insights(&filtered, include_test),
            records: filtered,
        }
    }
}

pub fn filter_options(records: &[StatsRecord], year: YearFilter) -> FilterOptions {
    FilterOptions {
        years: available_years(records),
        rounds: available_rounds(records, year),
        courses: available_courses(records),
    }
}

/// Distinct years, newest first.
pub fn available_years(records: &[StatsRecord]) -> Vec<i32> {
    let years: BTreeSet<i32> = records.iter().map(|r| r.education_year).collect();
    years.into_iter().rev().collect()
}

/// Distinct rounds (ascending) within `year`, or across all years.
pub fn available_rounds(records: &[StatsRecord], year: YearFilter) -> Vec<i32> {
    let rounds: BTreeSet<i32> = records
        .iter()
        .filter(|r| match year {
            YearFilter::All => true,
            YearFilter::Year(y) => r.education_year == y,
        })
        .map(|r| r.education_round)
        .collect();
    rounds.into_iter().collect()
}

/// One display name per normalized course, sorted by name.
pub fn available_courses(records: &[StatsRecord]) -> Vec<String> {
    let mut by_key: BTreeMap<String, String> = BTreeMap::new();
    for record in records {
        let name = record.course_name.trim();
        if name.is_empty() {
            continue;
        }
        by_key
            .entry(normalize_course_name(name))
            .or_insert_with(|| name.to_string());
    }

    let mut names: Vec<String> = by_key.into_values().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::RoundFilter;
    use crate::stats::SubsetCounts;

    fn record(year: i32, round: i32, course: &str, responses: u64) -> StatsRecord {
        StatsRecord {
            education_year: year,
            education_round: round,
            course_name: course.into(),
            real_counts: SubsetCounts {
                survey_count: 1,
                response_count: responses,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_options_come_from_unfiltered_records() {
        let records = vec![
            record(2023, 3, "Rust", 1),
            record(2024, 1, "rust", 1),
            record(2024, 2, "Go", 1),
            record(2024, 2, "  ", 1),
        ];

        let filters = Filters {
            year: YearFilter::Year(2024),
            round: RoundFilter::Latest,
            ..Default::default()
        };
        let view = StatsView::build(&records, &filters, false);

        assert_eq!(view.options.years, vec![2024, 2023]);
        assert_eq!(view.options.rounds, vec![1, 2]);
        assert_eq!(view.options.courses, vec!["Go", "Rust"]);
        assert_eq!(view.records.len(), 2);
        assert_eq!(view.summary.total_responses, 2);
        assert!(view.has_data);
    }

    #[test]
    fn test_empty_view() {
        let view = StatsView::build(&[], &Filters::default(), true);
        assert!(!view.has_data);
        assert_eq!(view.summary.total_surveys, 0);
        assert_eq!(view.summary.averages.overall, None);
        assert!(view.trend.is_empty());
        assert!(view.courses.is_empty());
        assert_eq!(view.rating_distribution.iter().count(), 10);
        assert_eq!(view.options, FilterOptions::default());
    }
}
