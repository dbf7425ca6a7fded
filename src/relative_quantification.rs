use crate::prelude::*;
use ndarray::ArrayView1;
use std::f64::consts::LN_2;

/// Ct reported for a well without any numeric reading.
pub const UNDETERMINED_CT: f64 = 38.0;

/// Mean and sample standard deviation (n - 1 divisor) of `values`.
///
/// A single value has a standard deviation of exactly 0. An empty
/// slice yields zeros.
pub fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    let values = ArrayView1::from(values);
    let mean = match values.mean() {
        Some(mean) => mean,
        None => return (0.0, 0.0),
    };
    let std_dev = if values.len() > 1 { values.std(1.0) } else { 0.0 };
    if std_dev.is_nan() {
        return (mean, 0.0);
    }
    (mean, std_dev)
}

/// Parses a raw Ct reading. Non-finite readings are treated as missing.
pub fn parse_ct(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Baseline the quantification of a sample is measured against.
#[derive(Clone, Copy, Default)]
struct Reference {
    mean: f64,
    std_dev: f64,
}

impl GeneResult {
    /// Rebuilds `values` from the raw readings and refreshes the mean and
    /// standard deviation.
    fn merge_raw_values(&mut self) {
        self.values = self
            .raw_values
            .iter()
            .filter_map(|raw| {
                let value = parse_ct(raw);
                if value.is_none() {
                    log::warn!("[ab7300] reading '{}' is not a number", raw);
                }
                value
            })
            .collect();
        if self.values.is_empty() {
            self.values.push(UNDETERMINED_CT);
        }
        let (mean, std_dev) = mean_and_std_dev(&self.values);
        self.mean = mean;
        self.std_dev = std_dev;
    }

    fn propagated_error(&self, reference: Reference) -> f64 {
        (2.0 * reference.std_dev.powi(2) + 2.0 * self.std_dev.powi(2)).sqrt()
    }
}

pub trait RelativeQuantification {
    /// Quantifies every target gene relative to the `mock` sample.
    fn relative_quantification(&mut self, mock: &str);
}

impl RelativeQuantification for Experiment {
    fn relative_quantification(&mut self, mock: &str) {
        let reference = match self.endogenous_controls.get(mock) {
            Some(control) => Reference {
                mean: control.mean,
                std_dev: control.std_dev,
            },
            None => {
                log::warn!("[ab7300] mock '{}' has no endogenous control, using 0", mock);
                Reference::default()
            }
        };

        for (detector_name, detector) in self.detectors.iter_mut() {
            match detector.get_mut(mock) {
                Some(gene) => {
                    gene.merge_raw_values();
                    gene.d_ct = gene.mean - reference.mean;
                    gene.dd_ct = 0.0;
                    gene.dd_ct_err = gene.propagated_error(reference);
                    gene.rq = 1.0;
                    gene.rq_err = (LN_2 * LN_2).sqrt();
                }
                None => {
                    // Other samples of this detector are compared to a
                    // zero-valued mock.
                    log::warn!("[ab7300] mock for detector '{}' not found!", detector_name);
                }
            }

            let mock_d_ct = detector.get(mock).map_or(0.0, |gene| gene.d_ct);
            for (_, gene) in detector.iter_mut().filter(|(name, _)| name.as_str() != mock) {
                gene.merge_raw_values();
                gene.d_ct = gene.mean - reference.mean;
                gene.dd_ct = gene.d_ct - mock_d_ct;
                gene.dd_ct_err = gene.propagated_error(reference);
                gene.rq = 2f64.powf(-gene.dd_ct);
                gene.rq_err = (gene.rq.powi(2) * LN_2 * LN_2 * gene.dd_ct_err.powi(2)).sqrt();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::tests::{fixture, row};
    use proptest::prelude::*;
    use std::error::Error;

    const EPSILON: f64 = 1e-9;

    fn observe(experiment: &mut Experiment, task: &str, sample: &str, detector: &str, ct: &str) {
        experiment._observe(match task {
            "ENDO" => Observation::EndogenousControl(sample.into(), detector.into(), ct.into()),
            _ => Observation::Target(sample.into(), detector.into(), ct.into()),
        });
    }

    #[test]
    fn test_single_value_has_zero_std_dev() {
        assert_eq!(mean_and_std_dev(&[20.0]), (20.0, 0.0));
    }

    #[test]
    fn test_replicates() {
        let (mean, std_dev) = mean_and_std_dev(&[20.0, 22.0]);
        assert_eq!(mean, 21.0);
        assert!((std_dev - 2f64.sqrt()).abs() < EPSILON);
    }

    #[test]
    fn test_parse_ct() {
        assert_eq!(parse_ct("23.5"), Some(23.5));
        assert_eq!(parse_ct("Undetermined"), None);
        assert_eq!(parse_ct("NaN"), None);
        assert_eq!(parse_ct(" 23.5"), None);
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(mean_and_std_dev(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_mock_scenario() -> Result<(), Box<dyn Error>> {
        let content = fixture(&[
            row(1, "S1", "GAPDH", "ENDO", "20.0"),
            row(2, "S1", "GeneA", "Target", "22.0"),
        ]);
        let experiment = crate::compute(&content, "S1")?;

        let control = &experiment.endogenous_controls["S1"];
        assert_eq!(control.mean, 20.0);
        assert_eq!(control.detectors["GAPDH"], vec!["20.0"]);

        let gene = experiment.target_gene("GeneA", "S1").unwrap();
        assert_eq!(gene.d_ct, 2.0);
        assert_eq!(gene.dd_ct, 0.0);
        assert_eq!(gene.rq, 1.0);
        assert!((gene.rq_err - LN_2).abs() < EPSILON);
        Ok(())
    }

    #[test]
    fn test_relative_quantity() {
        let mut experiment = Experiment::new();
        observe(&mut experiment, "ENDO", "Mock", "GAPDH", "20.0");
        observe(&mut experiment, "ENDO", "Mock", "GAPDH", "22.0");
        observe(&mut experiment, "Target", "Mock", "GeneA", "25.0");
        observe(&mut experiment, "Target", "Treated", "GeneA", "23.0");
        observe(&mut experiment, "Target", "Treated", "GeneA", "24.0");
        experiment.relative_quantification("Mock");

        let mock = experiment.target_gene("GeneA", "Mock").unwrap();
        assert_eq!(mock.d_ct, 4.0);
        assert!((mock.dd_ct_err - 2.0).abs() < EPSILON);

        let treated = experiment.target_gene("GeneA", "Treated").unwrap();
        let sd = 0.5f64.sqrt();
        assert_eq!(treated.mean, 23.5);
        assert!((treated.std_dev - sd).abs() < EPSILON);
        assert!((treated.d_ct - 2.5).abs() < EPSILON);
        assert!((treated.dd_ct + 1.5).abs() < EPSILON);
        assert!((treated.rq - 2f64.powf(1.5)).abs() < EPSILON);

        let dd_ct_err = (2.0 * 2.0 + 2.0 * sd * sd).sqrt();
        assert!((treated.dd_ct_err - dd_ct_err).abs() < EPSILON);
        assert!((treated.rq_err - treated.rq * LN_2 * dd_ct_err).abs() < EPSILON);
    }

    #[test]
    fn test_undetermined_gene_uses_placeholder() {
        let mut experiment = Experiment::new();
        observe(&mut experiment, "ENDO", "Mock", "GAPDH", "20.0");
        observe(&mut experiment, "Target", "Mock", "GeneA", "25.0");
        observe(&mut experiment, "Target", "Treated", "GeneA", "Undetermined");
        experiment.relative_quantification("Mock");

        let treated = experiment.target_gene("GeneA", "Treated").unwrap();
        assert_eq!(treated.values, vec![UNDETERMINED_CT]);
        assert_eq!(treated.mean, UNDETERMINED_CT);
        assert_eq!(treated.std_dev, 0.0);
        assert_eq!(treated.raw_values, vec!["Undetermined"]);
    }

    #[test]
    fn test_detector_without_mock_uses_zero_baseline() {
        let mut experiment = Experiment::new();
        observe(&mut experiment, "ENDO", "Mock", "GAPDH", "20.0");
        observe(&mut experiment, "Target", "Treated", "GeneB", "23.0");
        experiment.relative_quantification("Mock");

        let treated = experiment.target_gene("GeneB", "Treated").unwrap();
        assert_eq!(treated.d_ct, 3.0);
        assert_eq!(treated.dd_ct, 3.0);
        assert_eq!(treated.rq, 0.125);
    }

    #[test]
    fn test_missing_mock_control_uses_zero_baseline() {
        let mut experiment = Experiment::new();
        observe(&mut experiment, "Target", "Mock", "GeneA", "25.0");
        observe(&mut experiment, "Target", "Treated", "GeneA", "23.0");
        experiment.relative_quantification("Mock");

        assert_eq!(experiment.target_gene("GeneA", "Mock").unwrap().d_ct, 25.0);
        let treated = experiment.target_gene("GeneA", "Treated").unwrap();
        assert_eq!(treated.d_ct, 23.0);
        assert_eq!(treated.dd_ct, -2.0);
        assert_eq!(treated.rq, 4.0);
    }

    #[test]
    fn test_quantification_is_idempotent() {
        let mut experiment = Experiment::new();
        observe(&mut experiment, "ENDO", "Mock", "GAPDH", "20.0");
        observe(&mut experiment, "Target", "Mock", "GeneA", "25.0");
        observe(&mut experiment, "Target", "Treated", "GeneA", "23.0");
        experiment.relative_quantification("Mock");
        let once = experiment.clone();
        experiment.relative_quantification("Mock");
        assert_eq!(experiment, once);
    }

    proptest! {
        #[test]
        fn prop_single_value_std_dev_is_zero(x in -1.0e6f64..1.0e6) {
            let (mean, std_dev) = mean_and_std_dev(&[x]);
            prop_assert_eq!(mean, x);
            prop_assert_eq!(std_dev, 0.0);
        }

        #[test]
        fn prop_std_dev_is_unbiased(values in prop::collection::vec(0.0f64..45.0, 2..24)) {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let expected = (values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
            let (m, s) = mean_and_std_dev(&values);
            prop_assert!((m - mean).abs() < 1e-9);
            prop_assert!((s - expected).abs() < 1e-9);
        }

        #[test]
        fn prop_mock_is_unit_and_rq_follows_dd_ct(
            endo in 15.0f64..25.0,
            mock in 15.0f64..38.0,
            samples in prop::collection::vec(15.0f64..38.0, 1..8),
        ) {
            let mut experiment = Experiment::new();
            observe(&mut experiment, "ENDO", "Mock", "GAPDH", &endo.to_string());
            observe(&mut experiment, "Target", "Mock", "GeneA", &mock.to_string());
            for (i, ct) in samples.iter().enumerate() {
                observe(&mut experiment, "Target", &format!("S{}", i), "GeneA", &ct.to_string());
            }
            experiment.relative_quantification("Mock");

            let mock_gene = experiment.target_gene("GeneA", "Mock").unwrap();
            prop_assert_eq!(mock_gene.dd_ct, 0.0);
            prop_assert_eq!(mock_gene.rq, 1.0);
            for gene in experiment.detectors["GeneA"].values() {
                prop_assert!(gene.rq > 0.0);
                prop_assert!((gene.rq - 2f64.powf(-gene.dd_ct)).abs() < 1e-12);
            }
        }
    }
}
