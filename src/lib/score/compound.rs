//! Compound-aware rank score correction.
//!
//! A variant that is only damaging together with a compound partner (another variant
//! in the same gene, e.g. compound heterozygosity) is less interesting when none of
//! its partners is itself convincing. For every family the variant's rank score is
//! lowered by `penalty` when it has partners in the batch and none of them reaches
//! `threshold`.
//!
//! Input INFO fields:
//! - `RankScore=fam:12,fam2:7` (non-integer scores are truncated)
//! - `Compounds=fam:1_200_A_G|1_300_C_T,fam2:1_200_A_G`
//!
//! Output INFO fields:
//! - `CorrectedRankScore=fam:12,fam2:1`
//! - `Compounds=fam:1_200_A_G>14|1_300_C_T>3,...` (partners outside the batch stay bare)

use ahash::AHashMap;

use super::{BatchScorer, ScoredBatch};
use crate::batch::Batch;
use crate::errors::{CompscoreError, Result};
use crate::vcf::CORRECTED_RANK_SCORE;
use crate::vcf::Variant;

/// Partner score a compound needs to keep the variant's score intact.
pub const DEFAULT_THRESHOLD: i64 = 9;

/// Amount subtracted when no partner reaches the threshold.
pub const DEFAULT_PENALTY: i64 = 6;

const RANK_SCORE: &str = "RankScore";
const COMPOUNDS: &str = "Compounds";

/// Scores per family, in the order they appear on the variant.
type FamilyScores = Vec<(String, i64)>;

/// Partner ids per family, in the order they appear on the variant.
type FamilyPartners = Vec<(String, Vec<String>)>;

/// Corrects rank scores using the scores of compound partners in the same batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompoundScorer {
    threshold: i64,
    penalty: i64,
}

impl Default for CompoundScorer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_PENALTY)
    }
}

impl CompoundScorer {
    #[must_use]
    pub fn new(threshold: i64, penalty: i64) -> Self {
        Self { threshold, penalty }
    }

    #[must_use]
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    #[must_use]
    pub fn penalty(&self) -> i64 {
        self.penalty
    }

    fn correct(&self, variant: &mut Variant, lookup: &AHashMap<String, FamilyScores>) -> Result<()> {
        let variant_id = variant.variant_id();
        let Some(scores) = lookup.get(&variant_id) else {
            return Ok(());
        };

        let partners = match variant.info(COMPOUNDS) {
            Some(raw) => parse_compounds(raw).map_err(|reason| CompscoreError::Scoring {
                variant_id: variant_id.clone(),
                reason,
            })?,
            None => Vec::new(),
        };

        let corrected: Vec<String> = scores
            .iter()
            .map(|(family, score)| {
                let partner_scores: Vec<i64> = partners
                    .iter()
                    .filter(|(f, _)| f == family)
                    .flat_map(|(_, ids)| ids.iter())
                    .filter_map(|id| family_score(lookup, id, family))
                    .collect();
                let weak = !partner_scores.is_empty()
                    && partner_scores.iter().all(|partner| *partner < self.threshold);
                let value = if weak { score.saturating_sub(self.penalty) } else { *score };
                format!("{family}:{value}")
            })
            .collect();
        variant.set_info(CORRECTED_RANK_SCORE, corrected.join(","));

        if !partners.is_empty() {
            let rewritten: Vec<String> = partners
                .iter()
                .map(|(family, ids)| {
                    let annotated: Vec<String> = ids
                        .iter()
                        .map(|id| match family_score(lookup, id, family) {
                            Some(score) => format!("{id}>{score}"),
                            None => id.clone(),
                        })
                        .collect();
                    format!("{family}:{}", annotated.join("|"))
                })
                .collect();
            variant.set_info(COMPOUNDS, rewritten.join(","));
        }
        Ok(())
    }
}

impl BatchScorer for CompoundScorer {
    fn score(&self, batch: &Batch, individuals: &[String]) -> Result<ScoredBatch> {
        let mut lookup: AHashMap<String, FamilyScores> = AHashMap::with_capacity(batch.len());
        for variant in batch.variants() {
            let variant_id = variant.variant_id();
            if variant.sample_count() != individuals.len() {
                return Err(CompscoreError::Scoring {
                    variant_id,
                    reason: format!(
                        "{} genotype columns but the header lists {} individuals",
                        variant.sample_count(),
                        individuals.len()
                    ),
                });
            }
            if let Some(raw) = variant.info(RANK_SCORE) {
                let scores = parse_rank_scores(raw)
                    .map_err(|reason| CompscoreError::Scoring { variant_id: variant_id.clone(), reason })?;
                lookup.insert(variant_id, scores);
            }
        }

        let mut variants = batch.variants().to_vec();
        for variant in &mut variants {
            self.correct(variant, &lookup)?;
        }
        Ok(ScoredBatch { index: batch.index(), variants })
    }
}

fn family_score(lookup: &AHashMap<String, FamilyScores>, id: &str, family: &str) -> Option<i64> {
    lookup.get(id)?.iter().find(|(f, _)| f == family).map(|(_, score)| *score)
}

/// Parses `fam:score[,fam:score]`.
fn parse_rank_scores(raw: &str) -> std::result::Result<FamilyScores, String> {
    raw.split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (family, score) = entry
                .rsplit_once(':')
                .ok_or_else(|| format!("{RANK_SCORE} entry '{entry}' is not family:score"))?;
            let score: f64 = score
                .parse()
                .map_err(|_| format!("{RANK_SCORE} entry '{entry}' has a non-numeric score"))?;
            if !score.is_finite() {
                return Err(format!("{RANK_SCORE} entry '{entry}' has a non-finite score"));
            }
            // `as` saturates at the i64 bounds.
            #[allow(clippy::cast_possible_truncation)]
            let score = score.trunc() as i64;
            Ok((family.to_string(), score))
        })
        .collect()
}

/// Parses `fam:id|id[,fam:id]`, dropping any `>score` left by an earlier run.
fn parse_compounds(raw: &str) -> std::result::Result<FamilyPartners, String> {
    raw.split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (family, ids) = entry
                .split_once(':')
                .ok_or_else(|| format!("{COMPOUNDS} entry '{entry}' is not family:ids"))?;
            let ids = ids
                .split('|')
                .map(|id| id.split_once('>').map_or(id, |(id, _)| id))
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
            Ok((family.to_string(), ids))
        })
        .collect()
}
