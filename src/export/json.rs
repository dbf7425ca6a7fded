use super::Exporter;
use crate::error::{QpcrError, Result};
use crate::Experiment;

/// Structured export, also the persisted form of an experiment.
pub struct JsonExport;

fn check(location: &str, field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        return Ok(());
    }
    Err(QpcrError::Export {
        format: "json",
        reason: format!("{} of {} is {}, not a JSON number", field, location, value),
    })
}

/// Fails on the first number JSON cannot represent.
///
/// serde_json writes `inf` and `NaN` as `null`, which would not load back.
pub(crate) fn ensure_finite(experiment: &Experiment) -> Result<()> {
    for (name, control) in &experiment.endogenous_controls {
        let location = format!("endogenous control '{}'", name);
        for value in &control.values {
            check(&location, "Values", *value)?;
        }
        check(&location, "Mean", control.mean)?;
        check(&location, "StdDev", control.std_dev)?;
    }
    for (detector_name, detector) in &experiment.detectors {
        for (name, gene) in detector {
            let location = format!("'{}' under detector '{}'", name, detector_name);
            for value in &gene.values {
                check(&location, "Values", *value)?;
            }
            let fields = [
                ("Mean", gene.mean),
                ("StdDev", gene.std_dev),
                ("DCt", gene.d_ct),
                ("DdCt", gene.dd_ct),
                ("DdCtErr", gene.dd_ct_err),
                ("RQ", gene.rq),
                ("RQErr", gene.rq_err),
            ];
            for (field, value) in fields.iter() {
                check(&location, field, *value)?;
            }
        }
    }
    Ok(())
}

impl Exporter for JsonExport {
    fn export(&self, experiment: &Experiment) -> Result<Vec<u8>> {
        ensure_finite(experiment)?;
        Ok(serde_json::to_vec(experiment)?)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}
