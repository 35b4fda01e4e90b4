//src/protein.rs

use indexmap::IndexMap;
use std::path::Path;

use crate::error::SequenceFileError;
use crate::fasta::read_headers;

/// Proteins keyed by id, in order of appearance in the predicted-protein file.
pub type ProteinMap = IndexMap<String, Protein>;

/// A profile hit must be strictly below this e-value to be accepted.
pub const MAX_PROFILE_E_VALUE: f64 = 1e-3;

/// The best profile match recorded for a protein.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestHit {
    pub cluster_id: u32,
    pub score: f64,
    pub e_value: f64,
}

impl BestHit {
    /// Bit score reaches the cluster threshold and the e-value is significant.
    #[inline]
    pub fn passes(&self, threshold: f64) -> bool {
        self.score >= threshold && self.e_value < MAX_PROFILE_E_VALUE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Protein {
    pub id: String,
    pub contig_id: String,
    pub best_hit: Option<BestHit>,
    pub is_viral: bool,
    /// Only ever set by the profile path.
    pub potential_taxon: Option<String>,
    /// Known viral accession matched in sensitive mode.
    pub viral_accession: Option<String>,
}

/// Owning contig of a predicted protein: proteins are named `<contig>_<n>`.
pub fn contig_id_of(protein_id: &str) -> &str {
    match protein_id.rsplit_once('_') {
        Some((contig, _)) => contig,
        None => protein_id,
    }
}

impl Protein {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            contig_id: contig_id_of(id).to_string(),
            best_hit: None,
            is_viral: false,
            potential_taxon: None,
            viral_accession: None,
        }
    }

    /// Keeps `hit` if it is the first one or scores strictly higher than the
    /// current best. Returns whether the best hit changed.
    pub fn offer_hit(&mut self, hit: BestHit) -> bool {
        match self.best_hit {
            Some(best) if hit.score <= best.score => false,
            _ => {
                self.best_hit = Some(hit);
                true
            }
        }
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_hit.map(|h| h.score)
    }

    pub fn mark_profile_viral(&mut self, taxon: &str) {
        self.is_viral = true;
        self.potential_taxon = Some(taxon.to_string());
    }

    /// Sensitive-mode call. Never touches the taxon.
    pub fn mark_pairwise_viral(&mut self, accession: &str) {
        self.is_viral = true;
        self.viral_accession = Some(accession.to_string());
    }

    /// Taxon usable for contig-level assignment: viral and non-empty.
    pub fn usable_taxon(&self) -> Option<&str> {
        if !self.is_viral {
            return None;
        }
        self.potential_taxon.as_deref().filter(|t| !t.is_empty())
    }
}

/// Builds one `Protein` per header of the predicted-protein file.
pub fn parse_protein_headers<P: AsRef<Path>>(path: P) -> Result<ProteinMap, SequenceFileError> {
    let headers = read_headers(path.as_ref())?;
    let mut proteins = ProteinMap::with_capacity(headers.len());
    for header in headers {
        let protein = Protein::new(&header.id);
        proteins.insert(header.id, protein);
    }
    Ok(proteins)
}
