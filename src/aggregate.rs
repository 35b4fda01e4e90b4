//src/aggregate.rs

use std::path::Path;

use crate::contig::{Contig, ContigMap, TaxonomyMode, ROOT_TAXON};
use crate::error::SequenceFileError;
use crate::fasta::read_headers;
use crate::protein::ProteinMap;
use crate::types::RunTotals;

/// Viral gene content cutoff for a positive contig: one viral gene in sixteen.
pub const VIRAL_GENE_CONTENT_CUTOFF: f64 = 0.0625;

#[inline]
pub fn is_positive_fraction(fraction: f64) -> bool {
    fraction >= VIRAL_GENE_CONTENT_CUTOFF
}

/// One `Contig` per header of the input file, in order of appearance.
/// A repeated id keeps its first position and the latest header.
pub fn build_contigs<P: AsRef<Path>>(path: P) -> Result<ContigMap, SequenceFileError> {
    let headers = read_headers(path.as_ref())?;
    let mut contigs = ContigMap::with_capacity(headers.len());
    for header in headers {
        let contig = Contig::new(&header.id, &header.line);
        contigs.insert(header.id, contig);
    }
    Ok(contigs)
}

/// Moves every protein into its owning contig. Proteins whose contig is not
/// in the input are dropped; their number is returned.
pub fn attach_proteins(contigs: &mut ContigMap, proteins: ProteinMap) -> usize {
    let mut dropped = 0;
    for (_, protein) in proteins {
        match contigs.get_mut(&protein.contig_id) {
            Some(contig) => contig.add_protein(protein),
            None => {
                log::debug!("protein {} has no contig {} in the input", protein.id, protein.contig_id);
                dropped += 1;
            }
        }
    }
    dropped
}

/// Computes the viral gene fraction and taxon of every contig and marks the
/// positive ones. Positive contigs without a taxon get the root label.
pub fn classify_contigs(contigs: &mut ContigMap, mode: TaxonomyMode) -> RunTotals {
    let mut totals = RunTotals {
        total_contigs: contigs.len(),
        ..RunTotals::default()
    };

    for contig in contigs.values_mut() {
        let fraction = contig.compute_viral_gene_fraction();
        contig.assign_taxonomy(mode);

        contig.is_positive = is_positive_fraction(fraction);
        if contig.is_positive {
            if contig.assigned_taxon.is_none() {
                contig.assigned_taxon = Some(ROOT_TAXON.to_string());
            }
            totals.positive_contigs += 1;
        }
        if !contig.proteins.is_empty() {
            totals.contigs_with_genes += 1;
        }
        totals.total_proteins += contig.proteins.len();
    }
    totals.contigs_without_genes = totals.total_contigs - totals.contigs_with_genes;
    totals
}

/// Attaches proteins and classifies contigs in one go.
pub fn aggregate(contigs: &mut ContigMap, proteins: ProteinMap, mode: TaxonomyMode) -> RunTotals {
    let dropped = attach_proteins(contigs, proteins);
    if dropped > 0 {
        log::warn!("{} predicted proteins did not match any input contig", dropped);
    }
    classify_contigs(contigs, mode)
}
