pub mod pairwise;
pub mod profile;

use ahash::AHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::EvidenceError;
use crate::protein::ProteinMap;
use crate::refdb::ReferenceDatabase;
use crate::types::{PairwiseCall, ProfileCall};

pub use pairwise::run_pairwise_pass;
pub use profile::run_profile_pass;

/// Everything the evidence phase reports back for one run.
#[derive(Debug, Clone, Default)]
pub struct EvidenceReport {
    pub profile_calls: Vec<ProfileCall>,
    pub pairwise_calls: Vec<PairwiseCall>,
    /// cluster id -> number of proteins accepted through it
    pub cluster_hits: AHashMap<u32, usize>,
}

impl EvidenceReport {
    /// Cluster hit counts, most frequent first, ties by cluster id.
    pub fn cluster_hits_by_frequency(&self) -> Vec<(u32, usize)> {
        let mut counts: Vec<(u32, usize)> =
            self.cluster_hits.iter().map(|(&c, &n)| (c, n)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts
    }
}

/// Runs the profile pass and, when a pairwise table is given, the sensitive pass on top.
pub fn collect_evidence(
    proteins: &mut ProteinMap,
    db: &ReferenceDatabase,
    profile_hits: &Path,
    pairwise_hits: Option<&Path>,
) -> Result<EvidenceReport, EvidenceError> {
    let mut report = EvidenceReport::default();

    report.profile_calls = run_profile_pass(profile_hits, proteins, db)?;
    for call in &report.profile_calls {
        *report.cluster_hits.entry(call.cluster_id).or_insert(0) += 1;
    }
    log::info!(
        "Parsing of protein HMM-match result finished: {} proteins accepted",
        report.profile_calls.len()
    );
    for (cluster_id, n) in report.cluster_hits_by_frequency() {
        log::debug!("cluster_{} accepted {} protein(s)", cluster_id, n);
    }

    if let Some(path) = pairwise_hits {
        report.pairwise_calls = run_pairwise_pass(path, proteins, db)?;
        log::info!(
            "Parsing of protein DIAMOND-match result finished: {} hits to known RNA-virus proteins",
            report.pairwise_calls.len()
        );
    }

    Ok(report)
}

/// Feeds the whitespace-split fields of every data line to `handle`,
/// with its 1-based line number. Comment (`#`) and blank lines are skipped.
pub(crate) fn for_each_hit_line<F>(path: &Path, mut handle: F) -> Result<(), EvidenceError>
where
    F: FnMut(usize, &[&str]) -> Result<(), EvidenceError>,
{
    let io_err = |source| EvidenceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);

    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(io_err)?;
        if line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        handle(idx + 1, &fields)?;
    }
    Ok(())
}

pub(crate) fn malformed(path: &Path, line: usize, reason: String) -> EvidenceError {
    EvidenceError::Malformed {
        path: path.to_path_buf(),
        line,
        reason,
    }
}
