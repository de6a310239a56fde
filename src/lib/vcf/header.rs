//! VCF header model.
//!
//! Keeps the `##` meta lines in their original order, the parsed `##INFO`
//! definitions, the `#CHROM` column line, and the individuals (sample columns).

use std::io::{self, Write};

use crate::errors::{CompscoreError, Result};

/// INFO key written by the compound scorer.
pub const CORRECTED_RANK_SCORE: &str = "CorrectedRankScore";

/// Minimum number of columns in the `#CHROM` line (through INFO).
const MIN_HEADER_COLUMNS: usize = 8;

/// A parsed `##INFO=<...>` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoDefinition {
    /// INFO key.
    pub id: String,
    /// Cardinality (`1`, `A`, `.`, ...).
    pub number: String,
    /// Value type (`Integer`, `String`, ...).
    pub kind: String,
    /// Free-text description, without the surrounding quotes.
    pub description: String,
}

impl InfoDefinition {
    #[must_use]
    pub fn new(id: &str, number: &str, kind: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            number: number.to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
        }
    }

    /// The field added to every scored output.
    #[must_use]
    pub fn corrected_rank_score() -> Self {
        Self::new(
            CORRECTED_RANK_SCORE,
            "1",
            "Integer",
            "The corrected rank score for this variant.",
        )
    }

    /// Renders the definition as a `##INFO` meta line.
    #[must_use]
    pub fn to_meta_line(&self) -> String {
        format!(
            "##INFO=<ID={},Number={},Type={},Description=\"{}\">",
            self.id, self.number, self.kind, self.description
        )
    }

    /// Parses a `##INFO=<...>` line.
    ///
    /// # Errors
    /// Returns an error if the line is not an INFO line or has no `ID`.
    pub fn parse(line: &str) -> Result<Self> {
        let body = line
            .strip_prefix("##INFO=<")
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or_else(|| CompscoreError::MalformedHeader {
                reason: format!("not an INFO definition: {line}"),
            })?;

        let mut definition = Self::new("", "", "", "");
        for (key, value) in split_structured_fields(body) {
            match key {
                "ID" => definition.id = value,
                "Number" => definition.number = value,
                "Type" => definition.kind = value,
                "Description" => definition.description = value,
                _ => {}
            }
        }

        if definition.id.is_empty() {
            return Err(CompscoreError::MalformedHeader {
                reason: format!("INFO definition without ID: {line}"),
            });
        }
        Ok(definition)
    }
}

/// Splits `key=value,key="quoted, value"` pairs, honoring double quotes.
fn split_structured_fields(body: &str) -> Vec<(&str, String)> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut prev = '\0';

    for (i, c) in body.char_indices() {
        match c {
            '"' if prev != '\\' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        prev = c;
    }
    fields.push(&body[start..]);

    fields
        .into_iter()
        .filter_map(|field| field.split_once('='))
        .map(|(key, value)| {
            let value = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value);
            (key.trim(), value.replace("\\\"", "\""))
        })
        .collect()
}

/// Whether `line` is an `##INFO` definition for `id`, whatever its field order.
fn declares_info(line: &str, id: &str) -> bool {
    line.starts_with("##INFO=") && InfoDefinition::parse(line).is_ok_and(|d| d.id == id)
}

/// The VCF header: meta lines, INFO definitions, column line and individuals.
#[derive(Debug, Clone, Default)]
pub struct Header {
    meta_lines: Vec<String>,
    info: Vec<InfoDefinition>,
    columns: Vec<String>,
    individuals: Vec<String>,
}

impl Header {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a `##` meta line, parsing it further when it is an INFO definition.
    ///
    /// # Errors
    /// Returns an error if the line does not start with `##` or is a malformed INFO line.
    pub fn parse_meta_data(&mut self, line: &str) -> Result<()> {
        if !line.starts_with("##") {
            return Err(CompscoreError::MalformedHeader {
                reason: format!("meta line must start with '##': {line}"),
            });
        }

        if line.starts_with("##INFO=") {
            let definition = InfoDefinition::parse(line)?;
            match self.info.iter_mut().find(|d| d.id == definition.id) {
                Some(existing) => *existing = definition,
                None => self.info.push(definition),
            }
        }
        self.meta_lines.push(line.to_string());
        Ok(())
    }

    /// Parses the `#CHROM` column line. Columns after `FORMAT` are individuals.
    ///
    /// # Errors
    /// Returns an error if the line is not a `#CHROM` line or has too few columns.
    pub fn parse_header_line(&mut self, line: &str) -> Result<()> {
        let columns: Vec<String> = line.split('\t').map(str::to_string).collect();

        if columns.first().map(String::as_str) != Some("#CHROM") {
            return Err(CompscoreError::MalformedHeader {
                reason: format!("column line must start with '#CHROM': {line}"),
            });
        }
        if columns.len() < MIN_HEADER_COLUMNS {
            return Err(CompscoreError::MalformedHeader {
                reason: format!(
                    "expected at least {MIN_HEADER_COLUMNS} columns in the #CHROM line, found {}",
                    columns.len()
                ),
            });
        }

        self.individuals = columns.iter().skip(MIN_HEADER_COLUMNS + 1).cloned().collect();
        self.columns = columns;
        Ok(())
    }

    /// Registers an INFO field so that it appears exactly once in the header.
    ///
    /// An existing definition with the same id is replaced in place; otherwise the
    /// new line goes right after the last `##INFO` line.
    pub fn add_info(&mut self, definition: InfoDefinition) {
        let line = definition.to_meta_line();
        let id = definition.id.clone();

        match self.info.iter_mut().find(|d| d.id == definition.id) {
            Some(existing) => *existing = definition,
            None => self.info.push(definition),
        }

        match self.meta_lines.iter().position(|l| declares_info(l, &id)) {
            Some(first) => {
                self.meta_lines[first] = line;
                let mut index = 0;
                self.meta_lines.retain(|l| {
                    let keep = index <= first || !declares_info(l, &id);
                    index += 1;
                    keep
                });
            }
            None => self.insert_info_line(line),
        }
    }

    fn insert_info_line(&mut self, line: String) {
        let position = self
            .meta_lines
            .iter()
            .rposition(|l| l.starts_with("##INFO="))
            .map_or(self.meta_lines.len(), |i| i + 1);
        self.meta_lines.insert(position, line);
    }

    /// Looks up an INFO definition by id.
    #[must_use]
    pub fn info(&self, id: &str) -> Option<&InfoDefinition> {
        self.info.iter().find(|d| d.id == id)
    }

    /// Position of a sub-field in the VEP `CSQ` annotation (`Format: A|B|...`).
    #[must_use]
    pub fn vep_field_index(&self, name: &str) -> Option<usize> {
        let description = &self.info("CSQ")?.description;
        let (_, format) = description.split_once("Format:")?;
        format.trim().split('|').position(|field| field.trim() == name)
    }

    #[must_use]
    pub fn meta_lines(&self) -> &[String] {
        &self.meta_lines
    }

    /// Sample identifiers, in column order.
    #[must_use]
    pub fn individuals(&self) -> &[String] {
        &self.individuals
    }

    /// Whether the `#CHROM` line has been seen.
    #[must_use]
    pub fn has_column_line(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Writes the meta lines followed by the column line.
    ///
    /// # Errors
    /// Propagates I/O errors from the writer.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        for line in &self.meta_lines {
            writeln!(writer, "{line}")?;
        }
        if !self.columns.is_empty() {
            writeln!(writer, "{}", self.columns.join("\t"))?;
        }
        Ok(())
    }
}
