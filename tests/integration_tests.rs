use course_stats::analyzers::view::StatsView;
use course_stats::error::Result;
use course_stats::filters::{CourseFilter, Filters, RoundFilter, YearFilter};
use course_stats::loader::{LoadOutcome, StatsLoader};
use course_stats::output::write_csv;
use course_stats::parser::parse_rows;
use course_stats::services::stats_api::StatsSource;
use course_stats::stats::StatsRecord;
use serde_json::Value;

fn fixture_rows() -> Vec<Value> {
    serde_json::from_str(include_str!("fixtures/instructor_stats.json"))
        .expect("fixture is valid JSON")
}

fn fixture_records() -> Vec<StatsRecord> {
    parse_rows(&fixture_rows())
}

fn close(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|a| (a - expected).abs() < 1e-9)
}

struct FixtureSource;

#[async_trait::async_trait]
impl StatsSource for FixtureSource {
    async fn fetch_rows(&self, _instructor_id: &str) -> Result<Vec<Value>> {
        Ok(fixture_rows())
    }
}

#[test]
fn test_full_pipeline_without_test_data() {
    let records = fixture_records();
    assert_eq!(records.len(), 3);

    let view = StatsView::build(&records, &Filters::default(), false);
    let summary = &view.summary;

    assert!(view.has_data);
    assert_eq!(summary.total_surveys, 4);
    assert_eq!(summary.active_surveys, 2);
    assert_eq!(summary.total_responses, 20);
    assert_eq!(summary.total_text_responses, 4);
    assert_eq!(summary.course_count, 2);
    assert_eq!(summary.instructor_count, 1);
    assert!(close(summary.averages.overall, 7.9));
    assert_eq!(
        summary.last_response_at.map(|t| t.to_rfc3339()),
        Some("2024-03-02T14:00:00+00:00".to_string())
    );

    assert_eq!(view.trend.len(), 2);
    assert_eq!(view.trend[0].label, "2023-R4");
    assert_eq!(view.trend[1].survey_count, 3);
    assert!(close(view.trend[1].averages.overall, 7.0));

    assert_eq!(view.courses.len(), 2);
    assert_eq!(view.courses[0].course_name, "Cloud Operations");
    assert_eq!(view.courses[0].rounds.len(), 2);
    assert_eq!(view.courses[1].course_name, "Data Engineering");
    assert_eq!(view.courses[1].averages.overall, None);

    assert_eq!(view.rating_distribution.total(), 20);
    assert_eq!(view.rating_distribution.get(7), 6);
    assert_eq!(view.rating_distribution.get(4), 0);

    assert_eq!(view.questions.len(), 2);
    assert_eq!(view.questions[0].question_id, "q-course");
    assert_eq!(view.questions[0].total_answers, 20);
    assert!(close(view.questions[0].average, 7.6));
    assert_eq!(view.questions[1].text_answers.len(), 3);
}

#[test]
fn test_full_pipeline_with_test_data() {
    let view = StatsView::build(&fixture_records(), &Filters::default(), true);

    assert_eq!(view.summary.total_surveys, 5);
    assert_eq!(view.summary.total_responses, 24);
    assert!(close(view.summary.averages.overall, 7.25));
    assert_eq!(view.rating_distribution.get(4), 4);
    assert_eq!(view.questions[0].total_answers, 24);
    assert!(close(view.questions[0].average, 7.0));
}

#[test]
fn test_latest_round_keeps_every_course_in_that_round() {
    let filters = Filters {
        round: RoundFilter::Latest,
        ..Default::default()
    };
    let view = StatsView::build(&fixture_records(), &filters, false);

    assert_eq!(view.records.len(), 2);
    assert!(view
        .records
        .iter()
        .all(|r| r.education_year == 2024 && r.education_round == 1));
    assert_eq!(view.summary.total_responses, 8);
    assert_eq!(view.options.years, vec![2024, 2023]);
}

#[test]
fn test_course_with_only_assigned_surveys_has_data() {
    let filters = Filters {
        year: YearFilter::Year(2024),
        round: RoundFilter::Latest,
        course: CourseFilter::Course("data engineering".into()),
    };
    let view = StatsView::build(&fixture_records(), &filters, false);

    assert!(view.has_data);
    assert_eq!(view.summary.total_responses, 0);
    assert_eq!(view.summary.averages.overall, None);
    assert_eq!(view.rating_distribution.total(), 0);
}

#[test]
fn test_unmatched_filter_yields_zero_view() {
    let filters = Filters {
        year: YearFilter::Year(2019),
        ..Default::default()
    };
    let view = StatsView::build(&fixture_records(), &filters, true);

    assert!(!view.has_data);
    assert_eq!(view.summary.total_surveys, 0);
    assert!(view.trend.is_empty());
    assert!(view.courses.is_empty());
    assert!(view.questions.is_empty());
    assert_eq!(view.rating_distribution.iter().count(), 10);
}

#[test]
fn test_csv_export_of_filtered_records() {
    let filters = Filters {
        course: CourseFilter::Course("CLOUD OPERATIONS".into()),
        ..Default::default()
    };
    let view = StatsView::build(&fixture_records(), &filters, false);

    let mut buf = Vec::new();
    write_csv(&mut buf, &view.records, false).unwrap();
    let content = String::from_utf8(buf).unwrap();

    assert_eq!(content.lines().count(), 3);
    assert!(content.contains("Cloud Operations"));
    assert!(!content.contains("Data Engineering"));
}

#[tokio::test]
async fn test_loader_feeds_view() {
    let loader = StatsLoader::new(FixtureSource);
    assert_eq!(loader.load("inst-42").await, LoadOutcome::Loaded(3));

    let state = loader.snapshot();
    let view = StatsView::build(&state.records, &Filters::default(), false);
    assert_eq!(view.summary.total_responses, 20);
}
