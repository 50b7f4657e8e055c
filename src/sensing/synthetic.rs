use rand::Rng;

use crate::models::MetricKind;

/// Placeholder temperature drawn uniformly from the metric's plausible
/// range. Only used once every real tier has failed.
pub fn synthetic_celsius<R: Rng>(metric: MetricKind, rng: &mut R) -> f32 {
    rng.gen_range(metric.synthetic_range())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn values_stay_inside_documented_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for metric in MetricKind::ALL {
            let range = metric.synthetic_range();
            for _ in 0..10_000 {
                let value = synthetic_celsius(metric, &mut rng);
                assert!(range.contains(&value), "{metric}: {value} outside {range:?}");
            }
        }
    }

    #[test]
    fn processor_range_is_35_to_45() {
        let range = MetricKind::Processor.synthetic_range();
        assert_eq!(range.start, 35.0);
        assert_eq!(range.end, 45.0);
    }
}
