use std::path::Path;

use super::{for_each_hit_line, malformed};
use crate::error::EvidenceError;
use crate::protein::ProteinMap;
use crate::refdb::ReferenceDatabase;
use crate::types::PairwiseCall;

/// query, subject, ..., e-value, bit score
pub const MIN_PAIRWISE_FIELDS: usize = 4;

/// Sensitive pass over a tabular pairwise-alignment table (BLAST outfmt 6 layout).
/// A hit to a known RNA-virus accession makes the protein viral; nothing is
/// ever retracted and no taxon is derived.
pub fn run_pairwise_pass(
    path: &Path,
    proteins: &mut ProteinMap,
    db: &ReferenceDatabase,
) -> Result<Vec<PairwiseCall>, EvidenceError> {
    let mut calls = Vec::new();
    for_each_hit_line(path, |line, fields| {
        let Some(protein) = proteins.get_mut(fields[0]) else {
            return Ok(());
        };
        if fields.len() < MIN_PAIRWISE_FIELDS {
            return Err(malformed(
                path,
                line,
                format!("expected at least {} fields, found {}", MIN_PAIRWISE_FIELDS, fields.len()),
            ));
        }

        let accession = fields[1];
        if !db.is_known_viral_accession(accession) {
            return Ok(());
        }
        protein.mark_pairwise_viral(accession);

        let score = fields[fields.len() - 1];
        let e_value = fields[fields.len() - 2];
        log::debug!("{}\t{}\t{}\t{}", protein.id, accession, score, e_value);
        calls.push(PairwiseCall {
            protein_id: protein.id.clone(),
            accession: accession.to_string(),
            score: score.to_string(),
            e_value: e_value.to_string(),
        });
        Ok(())
    })?;
    Ok(calls)
}
