use super::Exporter;
use crate::error::Result;
use crate::Experiment;

/// Office Open XML spreadsheet export.
///
/// Not implemented: the payload is always empty. Callers negotiating this
/// content type receive an empty document rather than an error.
pub struct XlsxExport;

impl Exporter for XlsxExport {
    fn export(&self, _experiment: &Experiment) -> Result<Vec<u8>> {
        log::warn!("[export|xlsx] xlsx export is not implemented, returning an empty document");
        Ok(Vec::new())
    }

    fn content_type(&self) -> &'static str {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }
}
