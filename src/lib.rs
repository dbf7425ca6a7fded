#![crate_name = "qpcr"]
//! Relative quantification of real-time PCR experiments.
//!
//! Raw instrument text is turned into `Observation`s by an observable
//! (see `observable::Ab7300Builder`), collected into an `Experiment`,
//! quantified with the comparative Ct method and finally rendered by
//! one of the exporters in `export`.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod prelude;

pub mod error;
pub mod export;
pub mod observable;
pub mod rate_limit;
pub mod relative_quantification;
pub mod store;

use crate::error::Result;
use crate::observable::Ab7300Builder;
use crate::relative_quantification::{mean_and_std_dev, parse_ct, RelativeQuantification};

pub type Detectors = BTreeMap<String, TargetGenes>;
pub type TargetGenes = BTreeMap<String, GeneResult>;
pub type EndogenousControls = BTreeMap<String, EndoResult>;
pub type RawValues = BTreeMap<String, Vec<String>>;

/// Readings and quantification of one sample under one detector.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeneResult {
    pub raw_values: Vec<String>,
    pub values: Vec<f64>,
    pub mean: f64,
    pub std_dev: f64,
    #[serde(rename = "DCt")]
    pub d_ct: f64,
    #[serde(rename = "DdCt")]
    pub dd_ct: f64,
    #[serde(rename = "DdCtErr")]
    pub dd_ct_err: f64,
    #[serde(rename = "RQ")]
    pub rq: f64,
    #[serde(rename = "RQErr")]
    pub rq_err: f64,
}

/// Readings of an endogenous control, grouped by the detector that
/// measured them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndoResult {
    pub detectors: RawValues,
    pub values: Vec<f64>,
    pub mean: f64,
    pub std_dev: f64,
}

/// An observation of a single well
pub enum Observation {
    /// A reading of an endogenous control.
    /// Sample's name, Detector's name, raw Ct value
    EndogenousControl(String, String, String),

    /// A reading of a target gene.
    /// Sample's name, Detector's name, raw Ct value
    Target(String, String, String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Experiment {
    pub detectors: Detectors,
    pub endogenous_controls: EndogenousControls,
}

impl Experiment {
    /// Constructs a new empty `Experiment`
    ///
    /// The `Experiment` can be filled up iteratively by calling
    /// `observe()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes a single `Observation`
    ///
    /// Endogenous controls have their statistics refreshed on every
    /// numeric reading. Target genes only collect raw values, they are
    /// quantified later by `relative_quantification()`.
    pub fn _observe(&mut self, observation: Observation) {
        match observation {
            Observation::EndogenousControl(sample, detector, value) => {
                let control = self.endogenous_controls.entry(sample).or_default();
                match parse_ct(&value) {
                    Some(v) => {
                        control.values.push(v);
                        let (mean, std_dev) = mean_and_std_dev(&control.values);
                        control.mean = mean;
                        control.std_dev = std_dev;
                    }
                    None => {
                        log::warn!(
                            "[ab7300] endogenous control reading '{}' under detector '{}' is not a number",
                            value,
                            detector
                        );
                    }
                }
                control.detectors.entry(detector).or_default().push(value);
            }
            Observation::Target(sample, detector, value) => {
                self.detectors
                    .entry(detector)
                    .or_default()
                    .entry(sample)
                    .or_default()
                    .raw_values
                    .push(value);
            }
        }
    }

    /// Observe all the data in the argument.
    pub fn observe<I>(&mut self, observable: I) -> Result<()>
    where
        I: Iterator<Item = Result<Observation>>,
    {
        for observation in observable {
            self._observe(observation?);
        }
        Ok(())
    }

    /// Looks up the result of `sample` under `detector`.
    pub fn target_gene(&self, detector: &str, sample: &str) -> Option<&GeneResult> {
        self.detectors.get(detector).and_then(|genes| genes.get(sample))
    }

    /// A list of the names of all detectors in an experiment
    pub fn detector_names(&self) -> Vec<&String> {
        self.detectors.keys().collect()
    }
}

/// Parses an AB7300 export and quantifies it against the `mock` sample.
///
/// Fails only when `content` is not recognised as an AB7300 export.
/// Malformed rows and readings are logged and skipped.
pub fn compute(content: &str, mock: &str) -> Result<Experiment> {
    let mut experiment = Experiment::new();
    experiment.observe(Ab7300Builder::new().from_text(content)?)?;
    experiment.relative_quantification(mock);
    Ok(experiment)
}
