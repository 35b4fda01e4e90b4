//src/error.rs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while locating or reading the reference bundle.
/// All of them are fatal: no parsing starts with a partial database.
#[derive(Debug, Error)]
pub enum ReferenceLoadError {
    #[error("reference table {0:?} does not exist")]
    Missing(PathBuf),

    #[error("cannot read reference table {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path:?} line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("reference directory {0:?} does not exist")]
    BundleMissing(PathBuf),

    #[error("reference directory {dir:?} holds {found} entries, expected at least {required}")]
    BundleIncomplete {
        dir: PathBuf,
        found: usize,
        required: usize,
    },
}

/// Failures while reading profile-search or pairwise-alignment hit tables.
#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("cannot read hit table {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path:?} line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The hit table names a cluster the reference bundle does not know,
    /// which means a bad reference install or a tool/database version skew.
    #[error("{path:?} line {line}: cluster_{cluster_id} is missing from the reference tables")]
    UnknownCluster {
        path: PathBuf,
        line: usize,
        cluster_id: u32,
    },
}

#[derive(Debug, Error)]
pub enum SequenceFileError {
    #[error("cannot read sequence file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path:?} line {line}: header without an identifier")]
    EmptyHeader { path: PathBuf, line: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the taxonomic mode should be \"TOP\" or \"LCA\", got {0:?}")]
    InvalidTaxonomyMode(String),

    #[error("sensitive mode requested but no pairwise-alignment hit table was given")]
    MissingPairwiseHits,

    #[error("the output directory {0:?} already exists and is not empty")]
    OutputDirNotEmpty(PathBuf),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not start {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{tool} terminated with error code {code}:\n\n{stderr}")]
    Failed {
        tool: &'static str,
        code: i32,
        stderr: String,
    },
}

impl ToolError {
    /// Exit code to hand back to the shell, mirroring the failed tool.
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::Failed { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Top-level error of a prediction run.
#[derive(Debug, Error)]
pub enum VirbotError {
    #[error(transparent)]
    Reference(#[from] ReferenceLoadError),

    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    #[error(transparent)]
    SequenceFile(#[from] SequenceFileError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
