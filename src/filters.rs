//! Year / round / course narrowing of a record set, and the query-string
//! form the filter state is shared through.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;

use crate::stats::StatsRecord;

const ALL: &str = "all";
const LATEST: &str = "latest";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoundFilter {
    #[default]
    All,
    /// Max round within the max year of the already-narrowed set.
    Latest,
    Round(i32),
}

/// Parsed from a query value; `"all"` (any case) and blank mean [`CourseFilter::All`],
/// so a course literally named "all" cannot be selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CourseFilter {
    #[default]
    All,
    Course(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub year: YearFilter,
    pub round: RoundFilter,
    pub course: CourseFilter,
}

/// Lowercases and strips all whitespace so "Data  Science" == "data science".
pub fn normalize_course_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Narrows `records` by year and course, then resolves the round filter
/// against what is left.
pub fn apply_filters(records: &[StatsRecord], filters: &Filters) -> Vec<StatsRecord> {
    let course_key = match &filters.course {
        CourseFilter::All => None,
        CourseFilter::Course(name) => Some(normalize_course_name(name)),
    };

    let narrowed: Vec<&StatsRecord> = records
        .iter()
        .filter(|r| match filters.year {
            YearFilter::All => true,
            YearFilter::Year(year) => r.education_year == year,
        })
        .filter(|r| match &course_key {
            None => true,
            Some(key) => normalize_course_name(&r.course_name) == *key,
        })
        .collect();

    match filters.round {
        RoundFilter::All => narrowed.into_iter().cloned().collect(),
        RoundFilter::Round(round) => narrowed
            .into_iter()
            .filter(|r| r.education_round == round)
            .cloned()
            .collect(),
        RoundFilter::Latest => {
            let Some((year, round)) = latest_round(narrowed.iter().copied()) else {
                return Vec::new();
            };
            narrowed
                .into_iter()
                .filter(|r| r.education_year == year && r.education_round == round)
                .cloned()
                .collect()
        }
    }
}

/// `(max year, max round within that year)`, or `None` for an empty set.
pub fn latest_round<'a>(
    records: impl Iterator<Item = &'a StatsRecord> + Clone,
) -> Option<(i32, i32)> {
    let year = records.clone().map(|r| r.education_year).max()?;
    let round = records
        .filter(|r| r.education_year == year)
        .map(|r| r.education_round)
        .max()?;
    Some((year, round))
}

impl Filters {
    /// Reads `year`, `round` and `course` query parameters. Missing or
    /// unparseable values fall back to `all`.
    pub fn from_query(url: &Url) -> Self {
        let mut filters = Filters::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "year" => filters.year = value.parse().unwrap_or_default(),
                "round" => filters.round = value.parse().unwrap_or_default(),
                "course" => filters.course = value.parse().unwrap_or_default(),
                _ => {}
            }
        }
        filters
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("year", self.year.to_string()),
            ("round", self.round.to_string()),
            ("course", self.course.to_string()),
        ]
    }

    /// Replaces the filter parameters on `url`, keeping unrelated ones.
    pub fn apply_to_url(&self, url: &mut Url) {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !matches!(k.as_ref(), "year" | "round" | "course"))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        for (k, v) in self.to_query_pairs() {
            pairs.append_pair(k, &v);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFilterError(String);

impl fmt::Display for ParseFilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid filter value: {}", self.0)
    }
}

impl std::error::Error for ParseFilterError {}

impl FromStr for YearFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ALL) || s.is_empty() {
            return Ok(YearFilter::All);
        }
        s.parse()
            .map(YearFilter::Year)
            .map_err(|_| ParseFilterError(s.to_string()))
    }
}

impl FromStr for RoundFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ALL) || s.is_empty() {
            return Ok(RoundFilter::All);
        }
        if s.eq_ignore_ascii_case(LATEST) {
            return Ok(RoundFilter::Latest);
        }
        s.parse()
            .map(RoundFilter::Round)
            .map_err(|_| ParseFilterError(s.to_string()))
    }
}

impl FromStr for CourseFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ALL) || s.is_empty() {
            Ok(CourseFilter::All)
        } else {
            Ok(CourseFilter::Course(s.to_string()))
        }
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => f.write_str(ALL),
            YearFilter::Year(year) => write!(f, "{year}"),
        }
    }
}

impl fmt::Display for RoundFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundFilter::All => f.write_str(ALL),
            RoundFilter::Latest => f.write_str(LATEST),
            RoundFilter::Round(round) => write!(f, "{round}"),
        }
    }
}

impl fmt::Display for CourseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseFilter::All => f.write_str(ALL),
            CourseFilter::Course(name) => f.write_str(name),
        }
    }
}
