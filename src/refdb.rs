//src/refdb.rs

use ahash::{AHashMap, AHashSet};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::ReferenceLoadError;

pub type ThresholdMap = AHashMap<u32, f64>;
pub type ClusterTaxaMap = AHashMap<u32, String>;
pub type AccessionSet = AHashSet<String>;

pub const THRESHOLD_FILE: &str = "VirBot_hmm_threshold.txt";
pub const CLUSTER_TAXA_FILE: &str = "VirBot_hmm_taxa_full.txt";
pub const VIRAL_ACCESSION_FILE: &str = "VirBot_RNAvirus_acc.txt";
pub const PROFILE_LIBRARY_FILE: &str = "VirBot.hmm";
pub const PAIRWISE_DB_FILE: &str = "VirBot.dmnd";

/// A usable bundle holds the three tables plus the two search databases.
pub const MIN_BUNDLE_ENTRIES: usize = 5;

/// Paths of everything a run needs from the reference directory.
#[derive(Debug, Clone)]
pub struct ReferenceBundle {
    pub dir: PathBuf,
}

impl ReferenceBundle {
    /// Checks that `dir` exists and holds enough entries to be a complete bundle.
    pub fn locate<P: AsRef<Path>>(dir: P) -> Result<Self, ReferenceLoadError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ReferenceLoadError::BundleMissing(dir));
        }
        let found = fs::read_dir(&dir)
            .map_err(|source| ReferenceLoadError::Io {
                path: dir.clone(),
                source,
            })?
            .count();
        if found < MIN_BUNDLE_ENTRIES {
            return Err(ReferenceLoadError::BundleIncomplete {
                dir,
                found,
                required: MIN_BUNDLE_ENTRIES,
            });
        }
        Ok(Self { dir })
    }

    pub fn threshold_table(&self) -> PathBuf {
        self.dir.join(THRESHOLD_FILE)
    }

    pub fn cluster_taxa_table(&self) -> PathBuf {
        self.dir.join(CLUSTER_TAXA_FILE)
    }

    pub fn viral_accession_table(&self) -> PathBuf {
        self.dir.join(VIRAL_ACCESSION_FILE)
    }

    pub fn profile_library(&self) -> PathBuf {
        self.dir.join(PROFILE_LIBRARY_FILE)
    }

    pub fn pairwise_db(&self) -> PathBuf {
        self.dir.join(PAIRWISE_DB_FILE)
    }
}

/// Score threshold and taxon label of one reference cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterRef<'a> {
    pub threshold: f64,
    pub taxon: &'a str,
}

/// The three reference tables. Built once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDatabase {
    pub thresholds: ThresholdMap,
    pub cluster_taxa: ClusterTaxaMap,
    pub known_viral_accessions: AccessionSet,
}

impl ReferenceDatabase {
    pub fn new(
        thresholds: ThresholdMap,
        cluster_taxa: ClusterTaxaMap,
        known_viral_accessions: AccessionSet,
    ) -> Self {
        Self {
            thresholds,
            cluster_taxa,
            known_viral_accessions,
        }
    }

    /// Loads the three tables from explicit paths.
    pub fn load<P, Q, R>(
        threshold_path: P,
        taxa_path: Q,
        accession_path: R,
    ) -> Result<Self, ReferenceLoadError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let thresholds = parse_thresholds(threshold_path)?;
        let cluster_taxa = parse_cluster_taxa(taxa_path)?;
        let known_viral_accessions = parse_viral_accessions(accession_path)?;

        log::info!(
            "Loaded reference tables: {} cluster thresholds, {} cluster taxa, {} viral accessions",
            thresholds.len(),
            cluster_taxa.len(),
            known_viral_accessions.len()
        );

        Ok(Self::new(thresholds, cluster_taxa, known_viral_accessions))
    }

    pub fn from_bundle(bundle: &ReferenceBundle) -> Result<Self, ReferenceLoadError> {
        Self::load(
            bundle.threshold_table(),
            bundle.cluster_taxa_table(),
            bundle.viral_accession_table(),
        )
    }

    /// Threshold and taxon of `cluster_id`, or `None` unless both tables know it.
    pub fn cluster(&self, cluster_id: u32) -> Option<ClusterRef<'_>> {
        let threshold = *self.thresholds.get(&cluster_id)?;
        let taxon = self.cluster_taxa.get(&cluster_id)?;
        Some(ClusterRef { threshold, taxon })
    }

    pub fn is_known_viral_accession(&self, accession: &str) -> bool {
        self.known_viral_accessions.contains(accession)
    }
}

fn open_table(path: &Path) -> Result<BufReader<File>, ReferenceLoadError> {
    match File::open(path) {
        Ok(f) => Ok(BufReader::new(f)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ReferenceLoadError::Missing(path.to_path_buf()))
        }
        Err(source) => Err(ReferenceLoadError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Runs `parse_line` over every non-blank line, tagging failures with the line number.
fn for_each_line<F>(path: &Path, mut parse_line: F) -> Result<(), ReferenceLoadError>
where
    F: FnMut(&str) -> Result<(), String>,
{
    let reader = open_table(path)?;
    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|source| ReferenceLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        parse_line(line).map_err(|reason| ReferenceLoadError::Malformed {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        })?;
    }
    Ok(())
}

fn parse_cluster_id(field: &str) -> Result<u32, String> {
    field
        .parse()
        .map_err(|_| format!("cluster id {:?} is not an integer", field))
}

/// Parses a threshold table:
/// ```text
/// <cluster-id> <min-bit-score>
/// ```
pub fn parse_thresholds<P: AsRef<Path>>(path: P) -> Result<ThresholdMap, ReferenceLoadError> {
    let mut thresholds = ThresholdMap::new();
    for_each_line(path.as_ref(), |line| {
        let mut parts = line.split_whitespace();
        let (id_str, thr_str) = match (parts.next(), parts.next()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err("expected <cluster-id> <threshold>".to_string()),
        };
        let cluster_id = parse_cluster_id(id_str)?;
        let threshold: f64 = thr_str
            .parse()
            .map_err(|_| format!("threshold {:?} is not a number", thr_str))?;
        thresholds.insert(cluster_id, threshold);
        Ok(())
    })?;
    Ok(thresholds)
}

/// Parses a cluster taxonomy table:
/// ```text
/// <cluster-id>\t<taxon-label>
/// ```
pub fn parse_cluster_taxa<P: AsRef<Path>>(path: P) -> Result<ClusterTaxaMap, ReferenceLoadError> {
    let mut taxa = ClusterTaxaMap::new();
    for_each_line(path.as_ref(), |line| {
        let mut parts = line.split('\t');
        let (id_str, taxon) = match (parts.next(), parts.next()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err("expected <cluster-id>\\t<taxon>".to_string()),
        };
        let cluster_id = parse_cluster_id(id_str.trim())?;
        taxa.insert(cluster_id, taxon.to_string());
        Ok(())
    })?;
    Ok(taxa)
}

/// Parses the known RNA-virus accession list, one accession per line.
pub fn parse_viral_accessions<P: AsRef<Path>>(path: P) -> Result<AccessionSet, ReferenceLoadError> {
    let mut accessions = AccessionSet::new();
    for_each_line(path.as_ref(), |line| {
        accessions.insert(line.to_string());
        Ok(())
    })?;
    Ok(accessions)
}
