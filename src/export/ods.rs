use super::csv::decimal;
use super::Exporter;
use crate::error::{QpcrError, Result};
use crate::Experiment;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

pub const MIMETYPE: &str = include_str!("ods/mimetype");
pub const MANIFEST: &str = include_str!("ods/manifest.xml");
pub const META: &str = include_str!("ods/meta.xml");
pub const SETTINGS: &str = include_str!("ods/settings.xml");
pub const STYLES: &str = include_str!("ods/styles.xml");

const CONTENT_HEAD: &str = include_str!("ods/content_head.xml");
const CONTENT_TAIL: &str = include_str!("ods/content_tail.xml");

/// Package parts that do not depend on the experiment, in archive order
/// after `mimetype` and `content.xml`.
pub const STATIC_PARTS: [(&str, &str); 4] = [
    ("META-INF/manifest.xml", MANIFEST),
    ("meta.xml", META),
    ("settings.xml", SETTINGS),
    ("styles.xml", STYLES),
];

const COLUMNS: usize = 9;

/// OpenDocument spreadsheet export holding the flat table on a single
/// sheet called "Results".
pub struct OdsExport;

fn export_error<E: std::fmt::Display>(e: E) -> QpcrError {
    QpcrError::Export {
        format: "ods",
        reason: e.to_string(),
    }
}

struct Table {
    writer: Writer<Vec<u8>>,
}

impl Table {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(export_error)
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.event(Event::Start(start))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn row(&mut self) -> Result<()> {
        self.start("table:table-row", &[("table:style-name", "ro1")])
    }

    fn cell(&mut self, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        self.start("table:table-cell", attributes)?;
        self.start("text:p", &[])?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end("text:p")?;
        self.end("table:table-cell")
    }

    fn string_cell(&mut self, text: &str) -> Result<()> {
        self.cell(&[("office:value-type", "string")], text)
    }

    fn float_cell(&mut self, value: f64) -> Result<()> {
        let value = decimal(value);
        self.cell(
            &[("office:value-type", "float"), ("office:value", value.as_str())],
            &value,
        )
    }

    /// Pads a row to the table width.
    fn empty_cells(&mut self, count: usize) -> Result<()> {
        let count = count.to_string();
        let mut cell = BytesStart::new("table:table-cell");
        cell.push_attribute(("table:number-columns-repeated", count.as_str()));
        self.event(Event::Empty(cell))
    }

    fn header(&mut self, labels: &[&str]) -> Result<()> {
        self.row()?;
        for label in labels {
            self.string_cell(label)?;
        }
        if labels.len() < COLUMNS {
            self.empty_cells(COLUMNS - labels.len())?;
        }
        self.end("table:table-row")
    }

    fn render(mut self, experiment: &Experiment) -> Result<Vec<u8>> {
        self.start(
            "table:table",
            &[("table:name", "Results"), ("table:style-name", "ta1")],
        )?;

        self.header(&["name", "mean", "stddev"])?;
        for (name, control) in &experiment.endogenous_controls {
            self.row()?;
            self.string_cell(name)?;
            self.float_cell(control.mean)?;
            self.float_cell(control.std_dev)?;
            self.empty_cells(COLUMNS - 3)?;
            self.end("table:table-row")?;
        }

        self.row()?;
        self.empty_cells(COLUMNS)?;
        self.end("table:table-row")?;

        self.header(&[
            "detector", "name", "mean", "stddev", "dct", "ddct", "ddcterr", "rq", "rqerr",
        ])?;
        for (detector_name, detector) in &experiment.detectors {
            for (name, gene) in detector {
                self.row()?;
                self.string_cell(detector_name)?;
                self.string_cell(name)?;
                for value in [
                    gene.mean,
                    gene.std_dev,
                    gene.d_ct,
                    gene.dd_ct,
                    gene.dd_ct_err,
                    gene.rq,
                    gene.rq_err,
                ]
                .iter()
                {
                    self.float_cell(*value)?;
                }
                self.end("table:table-row")?;
            }
        }

        self.end("table:table")?;
        Ok(self.writer.into_inner())
    }
}

/// Renders `content.xml`, the only part that varies between experiments.
pub fn content_xml(experiment: &Experiment) -> Result<Vec<u8>> {
    let table = Table::new().render(experiment)?;
    let mut content = Vec::with_capacity(CONTENT_HEAD.len() + table.len() + CONTENT_TAIL.len());
    content.extend_from_slice(CONTENT_HEAD.as_bytes());
    content.extend_from_slice(&table);
    content.push(b'\n');
    content.extend_from_slice(CONTENT_TAIL.as_bytes());
    Ok(content)
}

impl Exporter for OdsExport {
    fn export(&self, experiment: &Experiment) -> Result<Vec<u8>> {
        // Fixed timestamps keep identical experiments byte-identical.
        let stored = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(DateTime::default());
        let deflated = stored.clone().compression_method(CompressionMethod::Deflated);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        // The mimetype must come first and uncompressed.
        zip.start_file("mimetype", stored.clone())?;
        zip.write_all(MIMETYPE.as_bytes())?;

        zip.start_file("content.xml", deflated.clone())?;
        zip.write_all(&content_xml(experiment)?)?;

        for (name, part) in STATIC_PARTS.iter() {
            zip.start_file(*name, deflated.clone())?;
            zip.write_all(part.as_bytes())?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn content_type(&self) -> &'static str {
        "application/vnd.oasis.opendocument.spreadsheet"
    }
}
