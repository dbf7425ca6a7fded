use super::Exporter;
use crate::error::{QpcrError, Result};
use crate::Experiment;

const CONTROL_HEADER: [&str; 3] = ["name", "mean", "stddev"];
const GENE_HEADER: [&str; 9] = [
    "detector", "name", "mean", "stddev", "dct", "ddct", "ddcterr", "rq", "rqerr",
];

/// Flat table export: endogenous controls, a blank line, then one row
/// per detector and sample.
pub struct CsvExport;

pub(crate) fn decimal(value: f64) -> String {
    format!("{:.6}", value)
}

fn into_inner(wtr: ::csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    wtr.into_inner().map_err(|e| QpcrError::Export {
        format: "csv",
        reason: e.error().to_string(),
    })
}

impl Exporter for CsvExport {
    fn export(&self, experiment: &Experiment) -> Result<Vec<u8>> {
        let mut wtr = ::csv::Writer::from_writer(Vec::new());
        wtr.write_record(&CONTROL_HEADER)?;
        for (name, control) in &experiment.endogenous_controls {
            wtr.write_record(&[name.clone(), decimal(control.mean), decimal(control.std_dev)])?;
        }
        let mut content = into_inner(wtr)?;
        content.push(b'\n');

        let mut wtr = ::csv::Writer::from_writer(content);
        wtr.write_record(&GENE_HEADER)?;
        for (detector_name, detector) in &experiment.detectors {
            for (name, gene) in detector {
                wtr.write_record(&[
                    detector_name.clone(),
                    name.clone(),
                    decimal(gene.mean),
                    decimal(gene.std_dev),
                    decimal(gene.d_ct),
                    decimal(gene.dd_ct),
                    decimal(gene.dd_ct_err),
                    decimal(gene.rq),
                    decimal(gene.rq_err),
                ])?;
            }
        }
        into_inner(wtr)
    }

    fn content_type(&self) -> &'static str {
        "text/csv"
    }
}
