//src/types.rs

/// One row of the positive-contig summary table:
///  Contig_acc  RNA-viral_gene_content  Encoded_proteins_num  Likely_taxa
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub contig_id: String,
    pub viral_gene_fraction: f64,   // unrounded; rounded when rendered
    pub protein_count: usize,
    pub taxon: String,
}

/// A protein accepted through the profile-search path.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCall {
    pub protein_id: String,
    pub cluster_id: u32,
    pub threshold: f64,
    pub score: f64,
    pub e_value: f64,
    pub taxon: String,
}

/// A protein accepted through a pairwise hit to a known viral accession.
/// Score and e-value are kept as the table spelled them; they are only reported.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseCall {
    pub protein_id: String,
    pub accession: String,
    pub score: String,
    pub e_value: String,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub total_contigs: usize,
    pub contigs_with_genes: usize,
    pub contigs_without_genes: usize,
    pub positive_contigs: usize,
    pub total_proteins: usize,
}
