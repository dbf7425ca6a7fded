pub use crate::error::{QpcrError, Result};
pub use crate::export::{export, Export, ExportFormat, Exporter};
pub use crate::observable::Ab7300Builder;
pub use crate::relative_quantification::RelativeQuantification;
pub use crate::{EndoResult, Experiment, GeneResult, Observation};
