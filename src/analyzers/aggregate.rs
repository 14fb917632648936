use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::analyzers::types::{
    CombinedMetrics, CourseBreakdown, QuestionInsight, RoundKey, SummaryMetrics, TrendPoint,
};
use crate::analyzers::utility::{AverageAccumulator, WeightedMean};
use crate::filters::normalize_course_name;
use crate::stats::{RatingDistribution, StatsRecord, SubsetCounts};

/// Merges the subsets selected by `include_test` for a single record.
///
/// Averages are weighted by each subset's response count, so a subset with
/// no responses never moves the result.
pub fn combined_metrics(record: &StatsRecord, include_test: bool) -> CombinedMetrics {
    let mut averages = AverageAccumulator::default();
    let mut rating_distribution = RatingDistribution::new();

    for (metrics, responses) in record.subsets(include_test) {
        averages.add_metrics(metrics, responses);
        rating_distribution = rating_distribution.merge(&metrics.rating_distribution);
    }

    CombinedMetrics {
        counts: record.counts(include_test),
        averages: averages.finish(),
        rating_distribution,
    }
}

/// Totals and response-weighted averages across the filtered records.
///
/// Records without selected responses still count toward survey totals.
pub fn summary_metrics(records: &[StatsRecord], include_test: bool) -> SummaryMetrics {
    let mut counts = SubsetCounts::default();
    let mut averages = AverageAccumulator::default();
    let mut courses = HashSet::new();
    let mut instructors = HashSet::new();
    let mut last_response_at = None;

    for record in records {
        counts = counts.add(&record.counts(include_test));
        for (metrics, responses) in record.subsets(include_test) {
            averages.add_metrics(metrics, responses);
        }

        courses.insert(normalize_course_name(&record.course_name));
        if let Some(key) = instructor_key(record) {
            instructors.insert(key);
        }
        last_response_at = last_response_at.max(record.last_response_at);
    }

    SummaryMetrics {
        total_surveys: counts.survey_count,
        active_surveys: counts.active_survey_count,
        total_responses: counts.response_count,
        total_text_responses: counts.text_response_count,
        course_count: courses.len(),
        instructor_count: instructors.len(),
        averages: averages.finish(),
        last_response_at,
    }
}

pub fn trend_series(records: &[StatsRecord], include_test: bool) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<RoundKey, (SubsetCounts, AverageAccumulator)> = BTreeMap::new();

    for record in records {
        let entry = buckets.entry(round_key(record)).or_default();
        entry.0 = entry.0.add(&record.counts(include_test));
        for (metrics, responses) in record.subsets(include_test) {
            entry.1.add_metrics(metrics, responses);
        }
    }

    buckets
        .into_iter()
        .map(|(round, (counts, averages))| TrendPoint {
            round,
            label: round.to_string(),
            survey_count: counts.survey_count,
            response_count: counts.response_count,
            averages: averages.finish(),
        })
        .collect()
}

#[derive(Default)]
struct CourseAccumulator {
    course_name: String,
    rounds: BTreeSet<RoundKey>,
    instructors: HashSet<String>,
    counts: SubsetCounts,
    averages: AverageAccumulator,
}

/// One entry per normalized course name, most responses first.
pub fn course_breakdown(records: &[StatsRecord], include_test: bool) -> Vec<CourseBreakdown> {
    let mut map: HashMap<String, CourseAccumulator> = HashMap::new();

    for record in records {
        let key = normalize_course_name(&record.course_name);
        let entry = map.entry(key).or_insert_with(|| CourseAccumulator {
            course_name: record.course_name.trim().to_string(),
            ..Default::default()
        });

        entry.rounds.insert(round_key(record));
        if let Some(instructor) = instructor_key(record) {
            entry.instructors.insert(instructor);
        }
        entry.counts = entry.counts.add(&record.counts(include_test));
        for (metrics, responses) in record.subsets(include_test) {
            entry.averages.add_metrics(metrics, responses);
        }
    }

    let mut breakdown: Vec<CourseBreakdown> = map
        .into_iter()
        .map(|(course_key, acc)| CourseBreakdown {
            course_key,
            course_name: acc.course_name,
            rounds: acc.rounds.into_iter().collect(),
            instructor_count: acc.instructors.len(),
            survey_count: acc.counts.survey_count,
            response_count: acc.counts.response_count,
            text_response_count: acc.counts.text_response_count,
            averages: acc.averages.finish(),
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.response_count
            .cmp(&a.response_count)
            .then_with(|| a.course_name.cmp(&b.course_name))
    });
    breakdown
}

/// Sums every selected 1..=10 histogram into one.
pub fn rating_distribution(records: &[StatsRecord], include_test: bool) -> RatingDistribution {
    records
        .iter()
        .flat_map(|r| r.subsets(include_test))
        .fold(RatingDistribution::new(), |acc, (metrics, _)| {
            acc.merge(&metrics.rating_distribution)
        })
}

struct QuestionAccumulator {
    insight: QuestionInsight,
    first_seen: usize,
    average: WeightedMean,
}

/// Merges question stats by `question_id`, summing answers, re-weighting the
/// average and concatenating text answers in record order.
pub fn question_insights(records: &[StatsRecord], include_test: bool) -> Vec<QuestionInsight> {
    let mut order: Vec<QuestionAccumulator> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        for (metrics, _) in record.subsets(include_test) {
            for stat in &metrics.question_stats {
                let slot = *index.entry(stat.question_id.clone()).or_insert_with(|| {
                    order.push(QuestionAccumulator {
                        insight: QuestionInsight {
                            question_id: stat.question_id.clone(),
                            question_text: stat.question_text.clone(),
                            question_type: stat.question_type.clone(),
                            satisfaction_type: stat.satisfaction_type.clone(),
                            order_index: stat.order_index,
                            total_answers: 0,
                            average: None,
                            rating_distribution: RatingDistribution::new(),
                            text_answers: Vec::new(),
                        },
                        first_seen: order.len(),
                        average: WeightedMean::default(),
                    });
                    order.len() - 1
                });

                let acc = &mut order[slot];
                acc.insight.total_answers =
                    acc.insight.total_answers.saturating_add(stat.total_answers);
                acc.average.add(stat.average, stat.total_answers);
                acc.insight.rating_distribution =
                    acc.insight.rating_distribution.merge(&stat.rating_distribution);
                acc.insight
                    .text_answers
                    .extend(stat.text_answers.iter().cloned());
            }
        }
    }

    order.sort_by_key(|acc| (acc.insight.order_index, acc.first_seen));
    order
        .into_iter()
        .map(|acc| QuestionInsight {
            average: acc.average.value(),
            ..acc.insight
        })
        .collect()
}

/// True when anything was answered, or when surveys exist for the selection
/// even if nobody has responded yet.
///
/// Only responses follow the test-data toggle; assigned surveys count from
/// either subset.
pub fn has_data(records: &[StatsRecord], include_test: bool) -> bool {
    records.iter().any(|r| {
        let assigned = [&r.real_counts, &r.test_counts]
            .iter()
            .any(|c| c.survey_count > 0 || c.active_survey_count > 0);
        assigned || r.counts(include_test).response_count > 0
    })
}

fn round_key(record: &StatsRecord) -> RoundKey {
    RoundKey {
        education_year: record.education_year,
        education_round: record.education_round,
    }
}

fn instructor_key(record: &StatsRecord) -> Option<String> {
    record
        .instructor_id
        .clone()
        .or_else(|| record.instructor_name.clone())
}
