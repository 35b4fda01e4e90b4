//src/contig.rs

use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::protein::{Protein, ProteinMap};

/// Contigs keyed by id, in order of appearance in the input file.
pub type ContigMap = IndexMap<String, Contig>;

/// Label given to a positive contig when no viral protein carried a taxon.
pub const ROOT_TAXON: &str = "Riboviria";

/// How a single contig-level taxon is derived from per-protein calls.
/// Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaxonomyMode {
    /// Taxon of the highest-scoring viral protein.
    #[default]
    Top,
    /// Longest common prefix of all viral-protein taxa.
    Lca,
}

impl FromStr for TaxonomyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("TOP") {
            Ok(TaxonomyMode::Top)
        } else if s.eq_ignore_ascii_case("LCA") {
            Ok(TaxonomyMode::Lca)
        } else {
            Err(ConfigError::InvalidTaxonomyMode(s.to_string()))
        }
    }
}

impl fmt::Display for TaxonomyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonomyMode::Top => f.write_str("TOP"),
            TaxonomyMode::Lca => f.write_str("LCA"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contig {
    pub id: String,
    /// Header line exactly as read, line break included.
    pub header: String,
    /// Body text, filled in only for positive contigs.
    pub sequence: Option<String>,
    pub proteins: ProteinMap,
    pub viral_gene_fraction: f64,
    pub assigned_taxon: Option<String>,
    pub is_positive: bool,
}

impl Contig {
    pub fn new(id: &str, header: &str) -> Self {
        Self {
            id: id.to_string(),
            header: header.to_string(),
            sequence: None,
            proteins: ProteinMap::new(),
            viral_gene_fraction: 0.0,
            assigned_taxon: None,
            is_positive: false,
        }
    }

    pub fn add_protein(&mut self, protein: Protein) {
        self.proteins.insert(protein.id.clone(), protein);
    }

    pub fn viral_protein_count(&self) -> usize {
        self.proteins.values().filter(|p| p.is_viral).count()
    }

    /// Fraction of encoded proteins called viral; 0 for a contig without proteins.
    pub fn compute_viral_gene_fraction(&mut self) -> f64 {
        self.viral_gene_fraction = if self.proteins.is_empty() {
            0.0
        } else {
            self.viral_protein_count() as f64 / self.proteins.len() as f64
        };
        self.viral_gene_fraction
    }

    pub fn assign_taxonomy(&mut self, mode: TaxonomyMode) {
        self.assigned_taxon = match mode {
            TaxonomyMode::Top => top_scoring_taxon(&self.proteins).map(str::to_string),
            TaxonomyMode::Lca => common_prefix_taxon(&self.proteins),
        };
    }
}

/// Taxon of the viral protein with the strictly highest best score.
/// On equal scores the first protein in insertion order wins.
pub fn top_scoring_taxon(proteins: &ProteinMap) -> Option<&str> {
    let mut top: Option<(f64, &str)> = None;
    for protein in proteins.values() {
        let (Some(taxon), Some(score)) = (protein.usable_taxon(), protein.best_score()) else {
            continue;
        };
        match top {
            Some((best, _)) if score <= best => {}
            _ => top = Some((score, taxon)),
        }
    }
    top.map(|(_, taxon)| taxon)
}

/// Folds the viral-protein taxa in insertion order down to their longest
/// common leading prefix.
pub fn common_prefix_taxon(proteins: &ProteinMap) -> Option<String> {
    let mut taxa = proteins.values().filter_map(Protein::usable_taxon);
    let mut acc = taxa.next()?;
    for taxon in taxa {
        acc = longest_common_prefix(acc, taxon);
    }
    Some(acc.to_string())
}

/// Character-wise longest common prefix. Not aware of the `;` rank
/// separators, so the result may end in the middle of a rank name.
pub fn longest_common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let mut end = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            break;
        }
        end += ca.len_utf8();
    }
    &a[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protein::BestHit;

    fn viral(id: &str, score: f64, taxon: Option<&str>) -> Protein {
        let mut p = Protein::new(id);
        p.offer_hit(BestHit { cluster_id: 1, score, e_value: 1e-10 });
        match taxon {
            Some(t) => p.mark_profile_viral(t),
            None => p.is_viral = true,
        }
        p
    }

    fn non_viral(id: &str, score: f64) -> Protein {
        let mut p = Protein::new(id);
        p.offer_hit(BestHit { cluster_id: 1, score, e_value: 1e-10 });
        p
    }

    fn contig_with(proteins: Vec<Protein>) -> Contig {
        let mut c = Contig::new("c1", ">c1\n");
        for p in proteins {
            c.add_protein(p);
        }
        c
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("TOP".parse::<TaxonomyMode>().unwrap(), TaxonomyMode::Top);
        assert_eq!("lca".parse::<TaxonomyMode>().unwrap(), TaxonomyMode::Lca);
        assert!(matches!(
            "BEST".parse::<TaxonomyMode>(),
            Err(ConfigError::InvalidTaxonomyMode(_))
        ));
        assert_eq!(TaxonomyMode::Lca.to_string(), "LCA");
    }

    #[test]
    fn fraction_counts_viral_proteins() {
        let mut c = contig_with(vec![
            viral("c1_1", 30.0, Some("A")),
            non_viral("c1_2", 5.0),
            non_viral("c1_3", 5.0),
            Protein::new("c1_4"),
        ]);
        assert_eq!(c.compute_viral_gene_fraction(), 0.25);
    }

    #[test]
    fn fraction_is_zero_without_proteins() {
        let mut c = Contig::new("empty", ">empty\n");
        assert_eq!(c.compute_viral_gene_fraction(), 0.0);
    }

    #[test]
    fn top_mode_picks_highest_score() {
        let mut c = contig_with(vec![
            viral("c1_1", 10.0, Some("Riboviria;A")),
            viral("c1_2", 25.0, Some("Riboviria;B")),
            non_viral("c1_3", 99.0),
        ]);
        c.assign_taxonomy(TaxonomyMode::Top);
        assert_eq!(c.assigned_taxon.as_deref(), Some("Riboviria;B"));
    }

    #[test]
    fn top_mode_tie_keeps_first() {
        let mut c = contig_with(vec![
            viral("c1_1", 25.0, Some("first")),
            viral("c1_2", 25.0, Some("second")),
        ]);
        c.assign_taxonomy(TaxonomyMode::Top);
        assert_eq!(c.assigned_taxon.as_deref(), Some("first"));
    }

    #[test]
    fn top_mode_ignores_viral_proteins_without_taxon() {
        let mut c = contig_with(vec![
            viral("c1_1", 80.0, None),
            viral("c1_2", 12.0, Some("kept")),
        ]);
        c.assign_taxonomy(TaxonomyMode::Top);
        assert_eq!(c.assigned_taxon.as_deref(), Some("kept"));
    }

    #[test]
    fn lca_single_taxon_is_exact() {
        let mut c = contig_with(vec![
            non_viral("c1_1", 1.0),
            viral("c1_2", 30.0, Some("Riboviria;Orthornavirae;Kitrinoviricota")),
        ]);
        c.assign_taxonomy(TaxonomyMode::Lca);
        assert_eq!(
            c.assigned_taxon.as_deref(),
            Some("Riboviria;Orthornavirae;Kitrinoviricota")
        );
    }

    #[test]
    fn lca_collapses_to_character_prefix() {
        let mut c = contig_with(vec![
            viral("c1_1", 30.0, Some("Riboviria;Leviviricetes;X")),
            viral("c1_2", 20.0, Some("Riboviria;Leviviricetes;Y")),
        ]);
        c.assign_taxonomy(TaxonomyMode::Lca);
        assert_eq!(c.assigned_taxon.as_deref(), Some("Riboviria;Leviviricetes;"));
    }

    #[test]
    fn lca_can_cut_inside_a_rank_name() {
        let mut c = contig_with(vec![
            viral("c1_1", 30.0, Some("Riboviria;Pisuviricota;Pisoniviricetes")),
            viral("c1_2", 20.0, Some("Riboviria;Pisuviricota;Picornaviricetes")),
        ]);
        c.assign_taxonomy(TaxonomyMode::Lca);
        assert_eq!(c.assigned_taxon.as_deref(), Some("Riboviria;Pisuviricota;Pi"));
    }

    #[test]
    fn no_usable_taxon_leaves_assignment_empty() {
        let mut c = contig_with(vec![viral("c1_1", 30.0, None), viral("c1_2", 3.0, Some(""))]);
        c.assign_taxonomy(TaxonomyMode::Lca);
        assert_eq!(c.assigned_taxon, None);
        c.assign_taxonomy(TaxonomyMode::Top);
        assert_eq!(c.assigned_taxon, None);
    }

    #[test]
    fn prefix_of_identical_and_nested_labels() {
        assert_eq!(longest_common_prefix("Riboviria", "Riboviria"), "Riboviria");
        assert_eq!(longest_common_prefix("Riboviria;X", "Riboviria"), "Riboviria");
        assert_eq!(longest_common_prefix("abc", "xyz"), "");
        assert_eq!(longest_common_prefix("virus;α", "virus;β"), "virus;");
    }
}
