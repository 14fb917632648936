use crate::analyzers::types::SatisfactionAverages;
use crate::stats::MetricsSet;

/// Running response-weighted mean. Values without weight are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedMean {
    total: f64,
    weight: f64,
}

impl WeightedMean {
    pub fn add(&mut self, value: Option<f64>, weight: u64) {
        if let Some(v) = value {
            if weight > 0 && v.is_finite() {
                self.total += v * weight as f64;
                self.weight += weight as f64;
            }
        }
    }

    /// `None` until something with non-zero weight was added.
    pub fn value(&self) -> Option<f64> {
        if self.weight == 0.0 {
            None
        } else {
            Some(self.total / self.weight)
        }
    }
}

/// Weighted means for the four satisfaction categories.
#[derive(Debug, Default, Clone, Copy)]
pub struct AverageAccumulator {
    overall: WeightedMean,
    course: WeightedMean,
    instructor: WeightedMean,
    operation: WeightedMean,
}

impl AverageAccumulator {
    pub fn add_metrics(&mut self, metrics: &MetricsSet, responses: u64) {
        self.overall.add(metrics.avg_overall, responses);
        self.course.add(metrics.avg_course, responses);
        self.instructor.add(metrics.avg_instructor, responses);
        self.operation.add(metrics.avg_operation, responses);
    }

    pub fn finish(&self) -> SatisfactionAverages {
        SatisfactionAverages {
            overall: self.overall.value(),
            course: self.course.value(),
            instructor: self.instructor.value(),
            operation: self.operation.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_mean_empty_is_none() {
        assert_eq!(WeightedMean::default().value(), None);
    }

    #[test]
    fn test_weighted_mean_skips_zero_weight_and_missing() {
        let mut mean = WeightedMean::default();
        mean.add(Some(8.0), 10);
        mean.add(Some(1.0), 0);
        mean.add(None, 50);
        assert_eq!(mean.value(), Some(8.0));
    }

    #[test]
    fn test_weighted_mean_weights_by_responses() {
        let mut mean = WeightedMean::default();
        mean.add(Some(8.0), 10);
        mean.add(Some(4.0), 5);
        let value = mean.value().unwrap();
        assert!((value - 100.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_mean_handles_max_weights() {
        let mut mean = WeightedMean::default();
        mean.add(Some(9.0), u64::MAX);
        mean.add(Some(9.0), u64::MAX);
        assert!((mean.value().unwrap() - 9.0).abs() < 1e-9);
    }
}
