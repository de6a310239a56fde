//! A single VCF data line, split into the columns the scorer needs.

use crate::errors::{CompscoreError, Result};

/// Number of mandatory VCF columns (CHROM through INFO).
const MANDATORY_COLUMNS: usize = 8;

/// A parsed variant record.
///
/// Only the INFO column is decoded; FORMAT and genotype columns are carried
/// through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    line_number: u64,
    chrom: String,
    pos: u64,
    id: String,
    reference: String,
    alternate: String,
    qual: String,
    filter: String,
    info: Vec<(String, Option<String>)>,
    /// FORMAT followed by one column per individual.
    genotypes: Vec<String>,
}

impl Variant {
    /// Parses a tab-separated data line.
    ///
    /// # Errors
    /// Returns [`CompscoreError::MalformedRecord`] when the line has fewer than eight
    /// columns, an empty chromosome, or a position that is not a positive integer.
    pub fn parse(line: &str, line_number: u64) -> Result<Self> {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < MANDATORY_COLUMNS {
            return Err(CompscoreError::MalformedRecord {
                line_number,
                reason: format!(
                    "expected at least {MANDATORY_COLUMNS} columns, found {}",
                    columns.len()
                ),
            });
        }

        if columns[0].is_empty() {
            return Err(CompscoreError::MalformedRecord {
                line_number,
                reason: "empty chromosome".to_string(),
            });
        }

        let pos = match columns[1].parse::<u64>() {
            Ok(pos) if pos > 0 => pos,
            _ => {
                return Err(CompscoreError::MalformedRecord {
                    line_number,
                    reason: format!("invalid position '{}'", columns[1]),
                });
            }
        };

        let info = if columns[7] == "." {
            Vec::new()
        } else {
            columns[7]
                .split(';')
                .filter(|entry| !entry.is_empty())
                .map(|entry| match entry.split_once('=') {
                    Some((key, value)) => (key.to_string(), Some(value.to_string())),
                    None => (entry.to_string(), None),
                })
                .collect()
        };

        Ok(Self {
            line_number,
            chrom: columns[0].to_string(),
            pos,
            id: columns[2].to_string(),
            reference: columns[3].to_string(),
            alternate: columns[4].to_string(),
            qual: columns[5].to_string(),
            filter: columns[6].to_string(),
            info,
            genotypes: columns[MANDATORY_COLUMNS..].iter().map(|c| (*c).to_string()).collect(),
        })
    }

    /// Identifier used to link compound partners: `CHROM_POS_REF_ALT`.
    #[must_use]
    pub fn variant_id(&self) -> String {
        format!("{}_{}_{}_{}", self.chrom, self.pos, self.reference, self.alternate)
    }

    #[must_use]
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    #[must_use]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    #[must_use]
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Value of an INFO key. Flags (keys without `=`) yield an empty string.
    #[must_use]
    pub fn info(&self, key: &str) -> Option<&str> {
        self.info
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_deref().unwrap_or(""))
    }

    /// Sets an INFO key, replacing an existing value or appending a new entry.
    pub fn set_info(&mut self, key: &str, value: String) {
        match self.info.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = Some(value),
            None => self.info.push((key.to_string(), Some(value))),
        }
    }

    /// Number of genotype columns (those after FORMAT).
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.genotypes.len().saturating_sub(1)
    }

    /// Renders the record back to a tab-separated line (no trailing newline).
    #[must_use]
    pub fn to_line(&self) -> String {
        let info = if self.info.is_empty() {
            ".".to_string()
        } else {
            self.info
                .iter()
                .map(|(key, value)| match value {
                    Some(value) => format!("{key}={value}"),
                    None => key.clone(),
                })
                .collect::<Vec<_>>()
                .join(";")
        };

        let pos = self.pos.to_string();
        let mut columns: Vec<&str> = vec![
            self.chrom.as_str(),
            pos.as_str(),
            self.id.as_str(),
            self.reference.as_str(),
            self.alternate.as_str(),
            self.qual.as_str(),
            self.filter.as_str(),
            info.as_str(),
        ];
        columns.extend(self.genotypes.iter().map(String::as_str));
        columns.join("\t")
    }
}
