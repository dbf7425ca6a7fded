use crate::error::{QpcrError, Result};
use crate::prelude::*;
use csv;
use std::collections::BTreeMap;
use std::io::Cursor;

const INSTRUMENT: &str = "Applied Biosystems 7300 Real-Time PCR System";
const SOFTWARE: &str = "SDS v1.4";

// 0-based positions of the fields used in a results row.
const SAMPLE_FIELD: usize = 3;
const DETECTOR_FIELD: usize = 4;
const TASK_FIELD: usize = 5;
const CT_FIELD: usize = 6;

/// Produces Observations from the results table of an AB7300 export
///
/// `Ab7300` implements Iterator so it can be passed
/// directly to `Experiment::observe()`. Rows that cannot be
/// used are logged and skipped.
pub struct Ab7300 {
    records: csv::StringRecordsIntoIter<Cursor<Vec<u8>>>,
    first_line: usize,
    fields: usize,
}

impl Ab7300 {
    fn new(records: csv::StringRecordsIntoIter<Cursor<Vec<u8>>>, first_line: usize, fields: usize) -> Self {
        Self {
            records,
            first_line,
            fields,
        }
    }
}

impl Iterator for Ab7300 {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Result<Observation>> {
        loop {
            let row = match self.records.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(QpcrError::from(e))),
            };
            let line = self.first_line + row.position().map_or(1, |p| p.line() as usize) - 1;

            if row.len() != self.fields {
                log::warn!(
                    "[ab7300] line {} has {} fields instead of {}, skipping",
                    line,
                    row.len(),
                    self.fields
                );
                continue;
            }

            let (sample, detector, task, value) = match (
                row.get(SAMPLE_FIELD),
                row.get(DETECTOR_FIELD),
                row.get(TASK_FIELD),
                row.get(CT_FIELD),
            ) {
                (Some(s), Some(d), Some(t), Some(v)) => (s, d, t, v),
                _ => {
                    log::warn!("[ab7300] line {} is too short for a results row, skipping", line);
                    continue;
                }
            };

            match task {
                "ENDO" => {
                    return Some(Ok(Observation::EndogenousControl(
                        sample.to_string(),
                        detector.to_string(),
                        value.to_string(),
                    )))
                }
                "Target" => {
                    return Some(Ok(Observation::Target(
                        sample.to_string(),
                        detector.to_string(),
                        value.to_string(),
                    )))
                }
                other => {
                    log::warn!("[ab7300] ignoring unknown task type '{}' on line {}", other, line);
                }
            }
        }
    }
}

pub struct Ab7300Builder {
    instrument: String,
    software: String,
    data_section: usize,
    fields: usize,
    delimiter: u8,
}

impl Ab7300Builder {
    /// Construct a new AB7300 builder for SDS v1.4 exports
    pub fn new() -> Self {
        Self {
            instrument: INSTRUMENT.to_owned(),
            software: SOFTWARE.to_owned(),
            data_section: 11,
            fields: 22,
            delimiter: b',',
        }
    }

    pub fn instrument(&mut self, instrument: &str) -> &mut Self {
        self.instrument = instrument.to_owned();
        self
    }

    pub fn software(&mut self, software: &str) -> &mut Self {
        self.software = software.to_owned();
        self
    }

    /// Sets the 1-based section holding the results table.
    ///
    /// Sections are separated by empty lines.
    pub fn data_section(&mut self, data_section: usize) -> &mut Self {
        self.data_section = data_section;
        self
    }

    pub fn fields(&mut self, fields: usize) -> &mut Self {
        self.fields = fields;
        self
    }

    pub fn delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    fn validate(&self, content: &str) -> Result<()> {
        for signature in [&self.instrument, &self.software].iter() {
            if !content.contains(signature.as_str()) {
                return Err(QpcrError::Format {
                    instrument: "ab7300",
                    signature: signature.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn from_text(&self, content: &str) -> Result<Ab7300> {
        self.validate(content)?;

        let mut section = 1;
        let mut first_line = 1;
        let mut data = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.is_empty() {
                section += 1;
                continue;
            }
            if section > self.data_section {
                break;
            }
            if section == self.data_section {
                if data.is_empty() {
                    first_line = idx + 1;
                }
                data.extend_from_slice(line.as_bytes());
                data.push(b'\n');
            }
        }

        if data.is_empty() {
            log::warn!("[ab7300] section {} holds no rows", self.data_section);
        }

        let rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .delimiter(self.delimiter)
            // Rows end at `\n` only, a stray `\r` stays inside its field.
            .terminator(csv::Terminator::Any(b'\n'))
            .from_reader(Cursor::new(data));

        Ok(Ab7300::new(rdr.into_records(), first_line, self.fields))
    }

    /// The sample to quantify against when none was named: the first
    /// sample called `mock`, ignoring case.
    pub fn suggested_mock(&self, content: &str) -> Result<String> {
        self.suggest_mocks(content)?
            .into_iter()
            .find(|(_, is_mock)| *is_mock)
            .map(|(sample, _)| sample)
            .ok_or(QpcrError::MissingMock)
    }

    /// Lists the sample names of the results table.
    ///
    /// A sample is flagged as a mock candidate when it is called
    /// `mock`, ignoring case.
    pub fn suggest_mocks(&self, content: &str) -> Result<BTreeMap<String, bool>> {
        let mut samples = BTreeMap::new();
        for observation in self.from_text(content)? {
            let sample = match observation? {
                Observation::EndogenousControl(sample, _, _) => sample,
                Observation::Target(sample, _, _) => sample,
            };
            let is_mock = sample.eq_ignore_ascii_case("mock");
            samples.insert(sample, is_mock);
        }
        Ok(samples)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::error::Error;

    /// A 22 field results row.
    pub(crate) fn row(well: u32, sample: &str, detector: &str, task: &str, ct: &str) -> String {
        format!(
            "{},A{},Plate1,{},{},{},{}{}",
            well,
            well,
            sample,
            detector,
            task,
            ct,
            ",".repeat(15)
        )
    }

    /// An export with ten leading sections, the given results rows and a
    /// trailing amplification section.
    pub(crate) fn fixture<S: AsRef<str>>(rows: &[S]) -> String {
        let mut text = String::from("SDS v1.4\nApplied Biosystems 7300 Real-Time PCR System\n");
        for section in 2..=10 {
            text.push('\n');
            text.push_str(&format!("Section {}\n", section));
        }
        text.push('\n');
        for r in rows {
            text.push_str(r.as_ref());
            text.push('\n');
        }
        text.push_str("\nAmplification\n1,2,3\n");
        text
    }

    fn observations(content: &str) -> std::result::Result<Vec<Observation>, Box<dyn Error>> {
        Ok(Ab7300Builder::new()
            .from_text(content)?
            .collect::<Result<Vec<_>>>()?)
    }

    #[test]
    fn test_missing_signatures_are_rejected() {
        let rows = [row(1, "S1", "GeneA", "Target", "22.0")];
        let content = fixture(&rows);

        let no_instrument = content.replace(INSTRUMENT, "Some Other System");
        match Ab7300Builder::new().from_text(&no_instrument) {
            Err(QpcrError::Format { signature, .. }) => assert_eq!(signature, INSTRUMENT),
            _ => panic!("expected a format error"),
        }

        let no_software = content.replace(SOFTWARE, "SDS v2.0");
        match Ab7300Builder::new().from_text(&no_software) {
            Err(QpcrError::Format { signature, .. }) => assert_eq!(signature, SOFTWARE),
            _ => panic!("expected a format error"),
        }
    }

    #[test]
    fn test_only_data_section_is_read() -> std::result::Result<(), Box<dyn Error>> {
        let mut content = fixture(&[row(1, "S1", "GeneA", "Target", "22.0")]);
        content.push_str(&format!("\n{}\n", row(2, "S2", "GeneA", "Target", "23.0")));
        let content = content.replace("Section 4", &row(3, "S3", "GeneA", "Target", "24.0"));

        let found = observations(&content)?;
        assert_eq!(found.len(), 1);
        match &found[0] {
            Observation::Target(sample, detector, value) => {
                assert_eq!(sample, "S1");
                assert_eq!(detector, "GeneA");
                assert_eq!(value, "22.0");
            }
            _ => panic!("expected a target observation"),
        }
        Ok(())
    }

    #[test]
    fn test_short_line_is_skipped() -> std::result::Result<(), Box<dyn Error>> {
        let rows = vec![
            row(1, "S1", "GAPDH", "ENDO", "20.0"),
            "1,2,3,4,5,6,7,8,9,10".to_string(),
            row(2, "S1", "GeneA", "Target", "22.0"),
        ];
        let found = observations(&fixture(&rows))?;
        assert_eq!(found.len(), 2);
        assert!(matches!(found[0], Observation::EndogenousControl(..)));
        assert!(matches!(found[1], Observation::Target(..)));
        Ok(())
    }

    #[test]
    fn test_unknown_task_is_ignored() -> std::result::Result<(), Box<dyn Error>> {
        let rows = [
            row(1, "S1", "GeneA", "Unknown", "22.0"),
            row(2, "S1", "GeneA", "NTC", "Undetermined"),
            row(3, "S2", "GeneA", "Target", "23.0"),
        ];
        let found = observations(&fixture(&rows))?;
        assert_eq!(found.len(), 1);
        Ok(())
    }

    #[test]
    fn test_quotes_are_not_special() -> std::result::Result<(), Box<dyn Error>> {
        let rows = [row(1, "\"S1", "GeneA\"", "Target", "22.0")];
        let found = observations(&fixture(&rows))?;
        match &found[0] {
            Observation::Target(sample, detector, _) => {
                assert_eq!(sample, "\"S1");
                assert_eq!(detector, "GeneA\"");
            }
            _ => panic!("expected a target observation"),
        }
        Ok(())
    }

    #[test]
    fn test_crlf_line_endings() -> std::result::Result<(), Box<dyn Error>> {
        let content = fixture(&[row(1, "S1", "GeneA", "Target", "22.0")]).replace('\n', "\r\n");
        let found = observations(&content)?;
        assert_eq!(found.len(), 1);
        Ok(())
    }

    #[test]
    fn test_carriage_return_inside_field() -> std::result::Result<(), Box<dyn Error>> {
        let rows = [row(1, "S1", "GeneA", "Target", "22.0").replace("Plate1", "Plate\r1")];
        let found = observations(&fixture(&rows))?;
        assert_eq!(found.len(), 1);
        match &found[0] {
            Observation::Target(sample, _, value) => {
                assert_eq!(sample, "S1");
                assert_eq!(value, "22.0");
            }
            _ => panic!("expected a target observation"),
        }
        Ok(())
    }

    #[test]
    fn test_custom_layout() -> std::result::Result<(), Box<dyn Error>> {
        let content = "SDS v1.4 Applied Biosystems 7300 Real-Time PCR System\n\n1;A1;P;S1;GeneA;Target;22.0\n";
        let found: Vec<_> = Ab7300Builder::new()
            .data_section(2)
            .fields(7)
            .delimiter(b';')
            .from_text(content)?
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(found.len(), 1);
        Ok(())
    }

    #[test]
    fn test_suggest_mocks() -> std::result::Result<(), Box<dyn Error>> {
        let rows = [
            row(1, "Mock", "GAPDH", "ENDO", "20.0"),
            row(2, "Mock", "GeneA", "Target", "22.0"),
            row(3, "Treated", "GeneA", "Target", "21.0"),
        ];
        let samples = Ab7300Builder::new().suggest_mocks(&fixture(&rows))?;
        assert_eq!(samples.len(), 2);
        assert_eq!(samples["Mock"], true);
        assert_eq!(samples["Treated"], false);
        Ok(())
    }

    #[test]
    fn test_suggested_mock() -> std::result::Result<(), Box<dyn Error>> {
        let rows = [
            row(1, "MOCK", "GAPDH", "ENDO", "20.0"),
            row(2, "Treated", "GeneA", "Target", "21.0"),
        ];
        assert_eq!(Ab7300Builder::new().suggested_mock(&fixture(&rows))?, "MOCK");
        Ok(())
    }

    #[test]
    fn test_no_suggested_mock() {
        let rows = [
            row(1, "Control", "GAPDH", "ENDO", "20.0"),
            row(2, "Treated", "GeneA", "Target", "21.0"),
        ];
        assert!(matches!(
            Ab7300Builder::new().suggested_mock(&fixture(&rows)),
            Err(QpcrError::MissingMock)
        ));
    }
}
