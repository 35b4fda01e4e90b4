// src/lib.rs
pub mod error;
pub mod types;
pub mod refdb;
pub mod fasta;
pub mod protein;
pub mod contig;
pub mod evidence;
pub mod aggregate;
pub mod emit;
pub mod tools;

use std::path::PathBuf;

use crate::aggregate::{aggregate, build_contigs};
use crate::contig::{Contig, ContigMap, TaxonomyMode};
use crate::emit::reconstruct_sequences;
use crate::error::{ConfigError, VirbotError};
use crate::evidence::{collect_evidence, EvidenceReport};
use crate::protein::parse_protein_headers;
use crate::refdb::ReferenceDatabase;
use crate::types::RunTotals;

/// Files a prediction run reads.
#[derive(Debug, Clone)]
pub struct PredictInputs {
    /// Input contigs; read twice, so it must be a regular (optionally gzipped) file.
    pub contigs: PathBuf,
    /// Predicted proteins, named `<contig>_<n>`.
    pub proteins: PathBuf,
    /// Profile-search table.
    pub profile_hits: PathBuf,
    /// Pairwise-alignment table; needed in sensitive mode only.
    pub pairwise_hits: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PredictOptions {
    pub taxonomy_mode: TaxonomyMode,
    pub sensitive: bool,
}

/// Everything a prediction run produced. Output text is generated on demand
/// (see the `emit` module).
pub struct PredictionResults {
    /// All input contigs in input order, with their proteins attached.
    pub contigs: ContigMap,
    /// Accepted profile and pairwise calls plus cluster hit counts.
    pub evidence: EvidenceReport,
    pub totals: RunTotals,
    /// Whether the pairwise section belongs in the evidence log.
    pub sensitive: bool,
}

impl PredictionResults {
    /// Positive contigs in input order.
    pub fn positive_contigs(&self) -> impl Iterator<Item = &Contig> {
        self.contigs.values().filter(|c| c.is_positive)
    }
}

/// Classifies the input contigs from their protein evidence.
pub fn predict(
    inputs: &PredictInputs,
    db: &ReferenceDatabase,
    options: PredictOptions,
) -> Result<PredictionResults, VirbotError> {
    let pairwise_hits = if options.sensitive {
        Some(
            inputs
                .pairwise_hits
                .as_deref()
                .ok_or(ConfigError::MissingPairwiseHits)?,
        )
    } else {
        None
    };

    // 1. Predicted proteins
    let mut proteins = parse_protein_headers(&inputs.proteins)?;
    log::info!("Num of proteins: {}", proteins.len());

    // 2. Evidence passes
    let evidence = collect_evidence(&mut proteins, db, &inputs.profile_hits, pairwise_hits)?;

    // 3. Contigs, viral gene content, taxonomy
    let mut contigs = build_contigs(&inputs.contigs)?;
    let totals = aggregate(&mut contigs, proteins, options.taxonomy_mode);

    log::info!("total num of contigs: {}", totals.total_contigs);
    log::info!("num of contigs containing gene(s): {}", totals.contigs_with_genes);
    log::info!("num of contigs lacking gene(s): {}", totals.contigs_without_genes);
    log::info!("num of positive contigs: {}", totals.positive_contigs);

    // 4. Sequences of the positive contigs
    let retrieved = reconstruct_sequences(&inputs.contigs, &mut contigs)?;
    log::info!("Retrieved sequences of {} positive contigs", retrieved);

    Ok(PredictionResults {
        contigs,
        evidence,
        totals,
        sensitive: options.sensitive,
    })
}
