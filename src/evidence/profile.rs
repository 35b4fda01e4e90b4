use std::path::Path;

use super::{for_each_hit_line, malformed};
use crate::error::EvidenceError;
use crate::protein::{BestHit, ProteinMap};
use crate::refdb::ReferenceDatabase;
use crate::types::ProfileCall;

/// Literal prefix of the profile names in the reference library.
pub const CLUSTER_PREFIX: &str = "cluster_";

const PROTEIN_FIELD: usize = 0;
const CLUSTER_FIELD: usize = 2;
const E_VALUE_FIELD: usize = 4;
const SCORE_FIELD: usize = 5;

/// `cluster_<id>` -> `<id>`
pub fn parse_cluster_token(token: &str) -> Option<u32> {
    token.strip_prefix(CLUSTER_PREFIX)?.parse().ok()
}

/// Phase one: keep the single best-scoring hit of every known protein.
/// Returns the number of hit lines that matched a known protein.
pub fn record_profile_hits(
    path: &Path,
    proteins: &mut ProteinMap,
    db: &ReferenceDatabase,
) -> Result<usize, EvidenceError> {
    let mut used = 0;
    for_each_hit_line(path, |line, fields| {
        let Some(protein) = proteins.get_mut(fields[PROTEIN_FIELD]) else {
            return Ok(());
        };
        if fields.len() <= SCORE_FIELD {
            return Err(malformed(
                path,
                line,
                format!("expected at least {} fields, found {}", SCORE_FIELD + 1, fields.len()),
            ));
        }

        let token = fields[CLUSTER_FIELD];
        let cluster_id = parse_cluster_token(token)
            .ok_or_else(|| malformed(path, line, format!("bad cluster name {:?}", token)))?;
        if db.cluster(cluster_id).is_none() {
            return Err(EvidenceError::UnknownCluster {
                path: path.to_path_buf(),
                line,
                cluster_id,
            });
        }
        let e_value: f64 = fields[E_VALUE_FIELD].parse().map_err(|_| {
            malformed(path, line, format!("bad e-value {:?}", fields[E_VALUE_FIELD]))
        })?;
        let score: f64 = fields[SCORE_FIELD].parse().map_err(|_| {
            malformed(path, line, format!("bad bit score {:?}", fields[SCORE_FIELD]))
        })?;

        protein.offer_hit(BestHit {
            cluster_id,
            score,
            e_value,
        });
        used += 1;
        Ok(())
    })?;
    Ok(used)
}

/// Phase two: test each protein's best hit against its cluster threshold.
/// Rejected proteins keep their hit bookkeeping.
pub fn accept_best_hits(proteins: &mut ProteinMap, db: &ReferenceDatabase) -> Vec<ProfileCall> {
    let mut calls = Vec::new();
    for protein in proteins.values_mut() {
        let Some(hit) = protein.best_hit else {
            continue;
        };
        let Some(cluster) = db.cluster(hit.cluster_id) else {
            log::warn!("{}: best hit cluster_{} has no reference entry", protein.id, hit.cluster_id);
            continue;
        };
        if !hit.passes(cluster.threshold) {
            continue;
        }

        protein.mark_profile_viral(cluster.taxon);
        log::debug!(
            "{}\tcluster_{}_({:.1})\t{}\t{}\t{}",
            protein.id,
            hit.cluster_id,
            cluster.threshold,
            hit.score,
            hit.e_value,
            cluster.taxon
        );
        calls.push(ProfileCall {
            protein_id: protein.id.clone(),
            cluster_id: hit.cluster_id,
            threshold: cluster.threshold,
            score: hit.score,
            e_value: hit.e_value,
            taxon: cluster.taxon.to_string(),
        });
    }
    calls
}

/// Reads a profile-search table (`hmmsearch --tblout` layout) and calls viral proteins.
pub fn run_profile_pass(
    path: &Path,
    proteins: &mut ProteinMap,
    db: &ReferenceDatabase,
) -> Result<Vec<ProfileCall>, EvidenceError> {
    let used = record_profile_hits(path, proteins, db)?;
    log::debug!("{} profile hit lines matched predicted proteins", used);
    Ok(accept_best_hits(proteins, db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protein::Protein;
    use ahash::AHashSet;
    use std::fs;

    fn db() -> ReferenceDatabase {
        let thresholds = [(3u32, 30.0), (8, 100.0)].into_iter().collect();
        let taxa = [
            (3u32, "Riboviria;Orthornavirae;Pisuviricota".to_string()),
            (8, "Riboviria;Orthornavirae;Lenarviricota".to_string()),
        ]
        .into_iter()
        .collect();
        ReferenceDatabase::new(thresholds, taxa, AHashSet::new())
    }

    fn proteins(ids: &[&str]) -> ProteinMap {
        ids.iter().map(|id| (id.to_string(), Protein::new(id))).collect()
    }

    fn table(dir: &tempfile::TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("VB_hmmer.out");
        fs::write(&path, text).unwrap();
        path
    }

    const HITS: &str = "\
#                                                               --- full sequence ----
# target name        accession  query name           accession    E-value  score  bias
#------------------- ---------- -------------------- ---------- --------- ------ -----
c1_1                 -          cluster_3            -            2.1e-12   45.2   0.3
c1_1                 -          cluster_8            -            1.0e-40  120.0   0.0
c1_2                 -          cluster_3            -            5.0e-02   31.0   0.0
c1_3                 -          cluster_8            -            1.0e-20   99.9   0.0
unknown_1            -          cluster_999          -            1.0e-20   99.9   0.0
#
# Program:         hmmsearch
";

    #[test]
    fn best_hit_then_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = table(&dir, HITS);
        let mut prots = proteins(&["c1_1", "c1_2", "c1_3", "c1_4"]);

        let calls = run_profile_pass(&path, &mut prots, &db()).unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].protein_id, "c1_1");
        assert_eq!(calls[0].cluster_id, 8);
        assert_eq!(calls[0].threshold, 100.0);

        let p1 = &prots["c1_1"];
        assert!(p1.is_viral);
        assert_eq!(p1.potential_taxon.as_deref(), Some("Riboviria;Orthornavirae;Lenarviricota"));

        // e-value too large: rejected but bookkeeping kept
        let p2 = &prots["c1_2"];
        assert!(!p2.is_viral);
        assert_eq!(p2.best_hit.unwrap().cluster_id, 3);
        assert_eq!(p2.potential_taxon, None);

        // score just under threshold
        let p3 = &prots["c1_3"];
        assert!(!p3.is_viral);
        assert_eq!(p3.best_score(), Some(99.9));

        assert!(prots["c1_4"].best_hit.is_none());
    }

    #[test]
    fn only_the_best_hit_is_tested() {
        // the weaker hit would pass cluster_3, but the stronger one fails cluster_8
        let dir = tempfile::tempdir().unwrap();
        let path = table(
            &dir,
            "c1_1 - cluster_3 - 1e-10 40.0 0\nc1_1 - cluster_8 - 1e-10 90.0 0\n",
        );
        let mut prots = proteins(&["c1_1"]);
        let calls = run_profile_pass(&path, &mut prots, &db()).unwrap();
        assert!(calls.is_empty());
        assert!(!prots["c1_1"].is_viral);
    }

    #[test]
    fn equal_score_keeps_first_hit() {
        let dir = tempfile::tempdir().unwrap();
        let path = table(
            &dir,
            "c1_1 - cluster_3 - 1e-10 150.0 0\nc1_1 - cluster_8 - 1e-10 150.0 0\n",
        );
        let mut prots = proteins(&["c1_1"]);
        run_profile_pass(&path, &mut prots, &db()).unwrap();
        assert_eq!(prots["c1_1"].best_hit.unwrap().cluster_id, 3);
    }

    #[test]
    fn reparsing_is_a_fixed_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = table(&dir, HITS);
        let mut once = proteins(&["c1_1", "c1_2", "c1_3"]);
        run_profile_pass(&path, &mut once, &db()).unwrap();

        let mut twice = once.clone();
        run_profile_pass(&path, &mut twice, &db()).unwrap();

        for (id, p) in &once {
            assert_eq!(p.best_hit, twice[id].best_hit);
            assert_eq!(p.is_viral, twice[id].is_viral);
        }
    }

    #[test]
    fn unknown_cluster_is_fatal_for_known_proteins() {
        let dir = tempfile::tempdir().unwrap();
        let path = table(&dir, "c1_1 - cluster_3 - 1e-10 40.0 0\nc1_1 - cluster_42 - 1e-10 40.0 0\n");
        let mut prots = proteins(&["c1_1"]);
        match run_profile_pass(&path, &mut prots, &db()) {
            Err(EvidenceError::UnknownCluster { line, cluster_id, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(cluster_id, 42);
            }
            other => panic!("expected UnknownCluster, got {:?}", other),
        }
    }

    #[test]
    fn lines_for_unknown_proteins_are_skipped_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = table(&dir, "other_1 - garbage - x y\n");
        let mut prots = proteins(&["c1_1"]);
        assert!(run_profile_pass(&path, &mut prots, &db()).unwrap().is_empty());
    }

    #[test]
    fn malformed_fields_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut prots = proteins(&["c1_1"]);

        let path = table(&dir, "c1_1 - profile3 - 1e-10 40.0 0\n");
        assert!(matches!(
            run_profile_pass(&path, &mut prots, &db()),
            Err(EvidenceError::Malformed { line: 1, .. })
        ));

        let path = table(&dir, "c1_1 - cluster_3 - 1e-10\n");
        assert!(matches!(
            run_profile_pass(&path, &mut prots, &db()),
            Err(EvidenceError::Malformed { .. })
        ));

        let path = table(&dir, "c1_1 - cluster_3 - 1e-10 strong 0\n");
        assert!(matches!(
            run_profile_pass(&path, &mut prots, &db()),
            Err(EvidenceError::Malformed { .. })
        ));
    }

    #[test]
    fn cluster_token_parsing() {
        assert_eq!(parse_cluster_token("cluster_17"), Some(17));
        assert_eq!(parse_cluster_token("cluster_"), None);
        assert_eq!(parse_cluster_token("17"), None);
    }
}
