use super::Exporter;
use crate::error::{QpcrError, Result};
use crate::{EndoResult, Experiment, GeneResult};
use serde::{Deserialize, Serialize};

/// Tree export. Names are carried as attributes, readings and results
/// as child elements.
pub struct XmlExport;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlExperiment {
    detectors: XmlDetectors,
    #[serde(rename = "endogenous-controls")]
    endogenous_controls: XmlEndogenousControls,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlDetectors {
    #[serde(rename = "detector", default)]
    items: Vec<XmlDetector>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlDetector {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "target-genes")]
    target_genes: XmlTargetGenes,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlTargetGenes {
    #[serde(rename = "target-gene", default)]
    items: Vec<XmlTargetGene>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlTargetGene {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "raw-values")]
    raw_values: XmlRawValues,
    values: XmlValues,
    mean: f64,
    stddev: f64,
    dct: f64,
    ddct: f64,
    ddcterr: f64,
    rq: f64,
    rqerr: f64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlRawValues {
    #[serde(rename = "raw-value", default)]
    items: Vec<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlValues {
    #[serde(rename = "value", default)]
    items: Vec<f64>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlEndogenousControls {
    #[serde(rename = "endogenous-control", default)]
    items: Vec<XmlEndogenousControl>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlEndogenousControl {
    #[serde(rename = "@name")]
    name: String,
    detectors: XmlControlDetectors,
    values: XmlValues,
    mean: f64,
    stddev: f64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlControlDetectors {
    #[serde(rename = "detector", default)]
    items: Vec<XmlControlDetector>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct XmlControlDetector {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "raw-values")]
    raw_values: XmlRawValues,
}

impl XmlTargetGene {
    fn new(name: &str, gene: &GeneResult) -> Self {
        Self {
            name: name.to_string(),
            raw_values: XmlRawValues {
                items: gene.raw_values.clone(),
            },
            values: XmlValues {
                items: gene.values.clone(),
            },
            mean: gene.mean,
            stddev: gene.std_dev,
            dct: gene.d_ct,
            ddct: gene.dd_ct,
            ddcterr: gene.dd_ct_err,
            rq: gene.rq,
            rqerr: gene.rq_err,
        }
    }
}

impl XmlEndogenousControl {
    fn new(name: &str, control: &EndoResult) -> Self {
        Self {
            name: name.to_string(),
            detectors: XmlControlDetectors {
                items: control
                    .detectors
                    .iter()
                    .map(|(detector, raw_values)| XmlControlDetector {
                        name: detector.clone(),
                        raw_values: XmlRawValues {
                            items: raw_values.clone(),
                        },
                    })
                    .collect(),
            },
            values: XmlValues {
                items: control.values.clone(),
            },
            mean: control.mean,
            stddev: control.std_dev,
        }
    }
}

impl From<&Experiment> for XmlExperiment {
    fn from(experiment: &Experiment) -> XmlExperiment {
        XmlExperiment {
            detectors: XmlDetectors {
                items: experiment
                    .detectors
                    .iter()
                    .map(|(name, genes)| XmlDetector {
                        name: name.clone(),
                        target_genes: XmlTargetGenes {
                            items: genes
                                .iter()
                                .map(|(gene_name, gene)| XmlTargetGene::new(gene_name, gene))
                                .collect(),
                        },
                    })
                    .collect(),
            },
            endogenous_controls: XmlEndogenousControls {
                items: experiment
                    .endogenous_controls
                    .iter()
                    .map(|(name, control)| XmlEndogenousControl::new(name, control))
                    .collect(),
            },
        }
    }
}

fn export_error<E: std::fmt::Display>(e: E) -> QpcrError {
    QpcrError::Export {
        format: "xml",
        reason: e.to_string(),
    }
}

impl Exporter for XmlExport {
    fn export(&self, experiment: &Experiment) -> Result<Vec<u8>> {
        let document = XmlExperiment::from(experiment);
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let mut ser = quick_xml::se::Serializer::with_root(&mut xml, Some("experiment"))
            .map_err(export_error)?;
        ser.indent(' ', 2);
        document.serialize(ser).map_err(export_error)?;
        Ok(xml.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "application/xml"
    }
}
