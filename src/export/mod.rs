//! Renderers turning a quantified `Experiment` into a downloadable payload.
use crate::error::{QpcrError, Result};
use crate::Experiment;
use std::fmt;
use std::str::FromStr;

pub mod csv;
pub mod json;
pub mod ods;
pub mod xlsx;
pub mod xml;

pub use self::csv::CsvExport;
pub use self::json::JsonExport;
pub use self::ods::OdsExport;
pub use self::xlsx::XlsxExport;
pub use self::xml::XmlExport;

pub trait Exporter {
    fn export(&self, experiment: &Experiment) -> Result<Vec<u8>>;
    fn content_type(&self) -> &'static str;
}

/// The closed set of supported export formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Xml,
    Ods,
    /// Office Open XML spreadsheet. Not implemented yet, exports are empty.
    Xlsx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Json,
        ExportFormat::Csv,
        ExportFormat::Xml,
        ExportFormat::Ods,
        ExportFormat::Xlsx,
    ];

    pub fn exporter(self) -> Box<dyn Exporter> {
        match self {
            ExportFormat::Json => Box::new(JsonExport),
            ExportFormat::Csv => Box::new(CsvExport),
            ExportFormat::Xml => Box::new(XmlExport),
            ExportFormat::Ods => Box::new(OdsExport),
            ExportFormat::Xlsx => Box::new(XlsxExport),
        }
    }

    pub fn content_type(self) -> &'static str {
        self.exporter().content_type()
    }

    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xml => "xml",
            ExportFormat::Ods => "ods",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    /// Picks the format announced by an `Accept` style content type.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.trim();
        ExportFormat::ALL
            .iter()
            .copied()
            .find(|format| format.content_type().eq_ignore_ascii_case(content_type))
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = QpcrError;

    /// Accepts a short name (`csv`) or a content type (`text/csv`).
    fn from_str(s: &str) -> Result<Self> {
        ExportFormat::ALL
            .iter()
            .copied()
            .find(|format| format.name().eq_ignore_ascii_case(s.trim()))
            .or_else(|| ExportFormat::from_content_type(s))
            .ok_or_else(|| QpcrError::UnknownFormat(s.to_string()))
    }
}

/// A rendered experiment.
#[derive(Clone, Debug, PartialEq)]
pub struct Export {
    pub payload: Vec<u8>,
    pub content_type: &'static str,
}

pub fn export(experiment: &Experiment, format: ExportFormat) -> Result<Export> {
    let exporter = format.exporter();
    let payload = exporter.export(experiment).map_err(|e| {
        log::error!("[export|{}] experiment export failed: {}", format, e);
        e
    })?;
    log::debug!("[export|{}] {} bytes generated", format, payload.len());
    Ok(Export {
        payload,
        content_type: exporter.content_type(),
    })
}
