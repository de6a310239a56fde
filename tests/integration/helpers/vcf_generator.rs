//! Synthetic VCF generation for integration tests.
//!
//! Records are laid out in contiguous chromosome blocks with ascending positions.
//! Every five consecutive records share a gene and list each other as compound
//! partners; every eleventh record is intergenic.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::Path;

/// Builder for a deterministic VCF.
#[derive(Debug, Clone)]
pub struct SyntheticVcf {
    records: usize,
    samples: Vec<String>,
    chromosomes: Vec<String>,
    malformed_every: Option<usize>,
    vep: bool,
}

impl SyntheticVcf {
    pub fn new(records: usize) -> Self {
        Self {
            records,
            samples: vec!["proband".to_string(), "mother".to_string(), "father".to_string()],
            chromosomes: vec!["1".to_string(), "2".to_string(), "X".to_string()],
            malformed_every: None,
            vep: false,
        }
    }

    pub fn samples(mut self, samples: &[&str]) -> Self {
        self.samples = samples.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn chromosomes(mut self, chromosomes: &[&str]) -> Self {
        self.chromosomes = chromosomes.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Replaces every `n`-th record with an unparsable line.
    pub fn malformed_every(mut self, n: usize) -> Self {
        self.malformed_every = Some(n);
        self
    }

    /// Writes genes as VEP `CSQ` annotations instead of `Annotation`.
    pub fn vep(mut self) -> Self {
        self.vep = true;
        self
    }

    pub fn header(&self) -> String {
        let mut header = String::from("##fileformat=VCFv4.2\n");
        header.push_str(
            "##INFO=<ID=Annotation,Number=.,Type=String,Description=\"Annotates what feature(s) this variant belongs to.\">\n",
        );
        header.push_str(
            "##INFO=<ID=Compounds,Number=.,Type=String,Description=\"List of compound pairs for this variant.\">\n",
        );
        header.push_str(
            "##INFO=<ID=RankScore,Number=.,Type=String,Description=\"The rank score for this variant in this family. family_id:rank_score.\">\n",
        );
        if self.vep {
            header.push_str(
                "##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|Consequence|SYMBOL|Feature\">\n",
            );
        }
        header.push_str("##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n");
        header.push_str("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO");
        if !self.samples.is_empty() {
            header.push_str("\tFORMAT");
            for sample in &self.samples {
                header.push('\t');
                header.push_str(sample);
            }
        }
        header.push('\n');
        header
    }

    fn chrom(&self, i: usize) -> &str {
        let block = (i * self.chromosomes.len()) / self.records.max(1);
        &self.chromosomes[block.min(self.chromosomes.len() - 1)]
    }

    fn pos(i: usize) -> usize {
        100 + i * 10
    }

    fn gene(i: usize) -> Option<String> {
        (i % 11 != 0).then(|| format!("GENE{}", i / 5))
    }

    fn variant_id(&self, i: usize) -> String {
        format!("{}_{}_A_G", self.chrom(i), Self::pos(i))
    }

    pub fn record_line(&self, i: usize) -> String {
        let chrom = self.chrom(i);
        if let Some(n) = self.malformed_every {
            if i % n == n - 1 {
                return format!("{chrom}\tnot_a_position\t.\tA\tG\t.\t.\t.");
            }
        }

        let mut info = String::new();
        if let Some(gene) = Self::gene(i) {
            if self.vep {
                write!(info, "CSQ=G|missense_variant|{gene}|T{i}").unwrap();
            } else {
                write!(info, "Annotation={gene}").unwrap();
            }

            let partners: Vec<String> = [i.checked_sub(1), Some(i + 1)]
                .into_iter()
                .flatten()
                .filter(|&j| j < self.records && Self::gene(j).as_ref() == Some(&gene))
                .filter(|&j| self.chrom(j) == chrom)
                .map(|j| self.variant_id(j))
                .collect();
            if !partners.is_empty() {
                write!(info, ";Compounds=fam:{}", partners.join("|")).unwrap();
            }
            info.push(';');
        }
        write!(info, "RankScore=fam:{}", (i * 7) % 20).unwrap();

        let mut line = format!("{chrom}\t{}\t.\tA\tG\t50\tPASS\t{info}", Self::pos(i));
        if !self.samples.is_empty() {
            line.push_str("\tGT");
            for _ in &self.samples {
                line.push_str("\t0/1");
            }
        }
        line
    }

    pub fn render(&self) -> String {
        let mut text = self.header();
        for i in 0..self.records {
            text.push_str(&self.record_line(i));
            text.push('\n');
        }
        text
    }

    pub fn write(&self, path: &Path) {
        std::fs::write(path, self.render()).expect("Failed to write synthetic VCF");
    }
}
