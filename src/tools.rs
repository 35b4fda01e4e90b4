//src/tools.rs

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{ConfigError, ToolError, VirbotError};
use crate::fasta::{is_gzipped, open_sequence_reader};
use crate::refdb::ReferenceBundle;

pub const PRODIGAL: &str = "prodigal";
pub const HMMSEARCH: &str = "hmmsearch";
pub const DIAMOND: &str = "diamond";

/// Output directory of a run and the scratch files the external tools write.
#[derive(Debug, Clone)]
pub struct RunLayout {
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
}

impl RunLayout {
    /// Creates `output_dir` and its `tmp/` sub-directory. An existing,
    /// non-empty output directory is refused.
    pub fn create<P: AsRef<Path>>(output_dir: P) -> Result<Self, VirbotError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if output_dir.exists() && fs::read_dir(&output_dir)?.next().is_some() {
            return Err(ConfigError::OutputDirNotEmpty(output_dir).into());
        }
        let temp_dir = output_dir.join("tmp");
        fs::create_dir_all(&temp_dir)?;
        Ok(Self {
            output_dir,
            temp_dir,
        })
    }

    /// Plain-text copy of a gzipped contig input.
    pub fn decompressed_input(&self) -> PathBuf {
        self.temp_dir.join("input.fa")
    }

    pub fn predicted_proteins(&self) -> PathBuf {
        self.temp_dir.join("protein.faa")
    }

    pub fn profile_hits(&self) -> PathBuf {
        self.temp_dir.join("VB_hmmer.out")
    }

    pub fn pairwise_hits(&self) -> PathBuf {
        self.temp_dir.join("VB_diamond.out")
    }
}

/// Runs `cmd` to completion. A non-zero exit is fatal and carries the tool's stderr.
pub fn run_tool(tool: &'static str, cmd: &mut Command) -> Result<(), ToolError> {
    log::debug!("running {:?}", cmd);
    let output = cmd
        .output()
        .map_err(|source| ToolError::Spawn { tool, source })?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool,
            code: output.status.code().unwrap_or(1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Contig file prodigal can read. Prodigal only takes plain text, so a
/// gzipped input is decompressed into the run's tmp directory first.
pub fn prodigal_input(input: &Path, layout: &RunLayout) -> io::Result<PathBuf> {
    if !is_gzipped(input) {
        return Ok(input.to_path_buf());
    }
    let target = layout.decompressed_input();
    let mut reader = open_sequence_reader(input)?;
    let mut writer = BufWriter::new(File::create(&target)?);
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    log::debug!("decompressed {} into {} ({} bytes)", input.display(), target.display(), bytes);
    Ok(target)
}

fn prodigal_command(input: &Path, layout: &RunLayout) -> Command {
    let mut cmd = Command::new(PRODIGAL);
    cmd.arg("-i")
        .arg(input)
        .arg("-a")
        .arg(layout.predicted_proteins())
        .args(["-p", "meta"]);
    cmd
}

/// Predicts proteins of the input contigs in metagenomic mode.
pub fn run_prodigal(input: &Path, layout: &RunLayout) -> Result<(), VirbotError> {
    let input = prodigal_input(input, layout)?;
    run_tool(PRODIGAL, &mut prodigal_command(&input, layout))?;
    Ok(())
}

/// Searches the predicted proteins against the profile library.
pub fn run_hmmsearch(
    bundle: &ReferenceBundle,
    layout: &RunLayout,
    threads: usize,
) -> Result<(), ToolError> {
    run_tool(
        HMMSEARCH,
        Command::new(HMMSEARCH)
            .arg("--tblout")
            .arg(layout.profile_hits())
            .args(["--noali", "-E", "0.001", "--cpu"])
            .arg(threads.to_string())
            .arg(bundle.profile_library())
            .arg(layout.predicted_proteins()),
    )
}

/// Aligns the predicted proteins against the pairwise reference database.
pub fn run_diamond(
    bundle: &ReferenceBundle,
    layout: &RunLayout,
    threads: usize,
) -> Result<(), ToolError> {
    run_tool(
        DIAMOND,
        Command::new(DIAMOND)
            .arg("blastp")
            .arg("--db")
            .arg(bundle.pairwise_db())
            .arg("--query")
            .arg(layout.predicted_proteins())
            .args(["--outfmt", "6", "--max-target-seqs", "1"])
            .arg("--threads")
            .arg(threads.to_string())
            .args(["--evalue", "1e-5", "--out"])
            .arg(layout.pairwise_hits()),
    )
}
