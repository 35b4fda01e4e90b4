//src/emit.rs

use std::fmt::Write as FmtWrite;
use std::fs;
use std::io;
use std::path::Path;

use crate::contig::ContigMap;
use crate::error::SequenceFileError;
use crate::fasta::collect_record_bodies;
use crate::types::SummaryRow;
use crate::PredictionResults;

pub const POSITIVE_FASTA_FILE: &str = "output.vb.fasta";
pub const SUMMARY_FILE: &str = "pos_contig_score.csv";
pub const EVIDENCE_LOG_FILE: &str = "hit_evidence.tsv";

pub const SUMMARY_HEADER: &str =
    "Contig_acc,RNA-viral_gene_content,Encoded_proteins_num,Likely_taxa";
pub const PROFILE_LOG_HEADER: &str =
    "Protein_acc\tHMM_name_(corresponding_threshold)\tBit_score\tE-value\tTaxa";
pub const PAIRWISE_LOG_HEADER: &str = "Protein_acc\tReference_acc\tBit_score\tE-value";

/// Second pass over the input: copies the body of every positive contig into
/// its `sequence`. Returns how many positive contigs got a sequence.
pub fn reconstruct_sequences(path: &Path, contigs: &mut ContigMap) -> Result<usize, SequenceFileError> {
    let bodies = collect_record_bodies(path, |id| {
        contigs.get(id).map(|c| c.is_positive).unwrap_or(false)
    })?;

    let mut filled = 0;
    for (id, body) in bodies {
        if let Some(contig) = contigs.get_mut(&id) {
            if contig.sequence.is_none() {
                filled += 1;
            }
            contig.sequence = Some(body);
        }
    }
    Ok(filled)
}

/// Fraction rounded to two decimals, ties to even.
pub fn round_fraction(fraction: f64) -> f64 {
    (fraction * 100.0).round_ties_even() / 100.0
}

/// Shortest round-trip rendering of a float that keeps a trailing `.0` on
/// whole numbers and switches to a signed, two-digit exponent below 1e-4 or
/// from 1e16 up (`45.0`, `0.001`, `1.5e-05`, `1e+16`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{:e}", value);
        let Some((mantissa, exponent)) = sci.split_once('e') else {
            return sci.clone();
        };
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        format!("{}e{}{:0>2}", mantissa, sign, digits)
    } else if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

impl PredictionResults {
    /// Summary rows of the positive contigs, in input order.
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        self.positive_contigs()
            .map(|c| SummaryRow {
                contig_id: c.id.clone(),
                viral_gene_fraction: c.viral_gene_fraction,
                protein_count: c.proteins.len(),
                taxon: c.assigned_taxon.clone().unwrap_or_default(),
            })
            .collect()
    }

    /// Writes the summary table (header plus one row per positive contig) to `writer`.
    pub fn write_summary_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(SUMMARY_HEADER.split(','))?;
        for row in self.summary_rows() {
            csv_writer.write_record(&[
                row.contig_id,
                format!("{:.2}", round_fraction(row.viral_gene_fraction)),
                row.protein_count.to_string(),
                row.taxon,
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Generate the summary CSV on demand
    pub fn get_summary_csv(&self) -> csv::Result<String> {
        let mut buffer = Vec::new();
        self.write_summary_csv(&mut buffer)?;
        let text = String::from_utf8(buffer)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(text)
    }

    /// Generate the positive-contig sequence file on demand: original header
    /// line followed by the original body lines.
    pub fn get_positive_fasta(&self) -> String {
        let mut output = String::new();
        for contig in self.positive_contigs() {
            output.push_str(&contig.header);
            if !contig.header.ends_with('\n') {
                output.push('\n');
            }
            if let Some(seq) = &contig.sequence {
                output.push_str(seq);
                if !seq.is_empty() && !seq.ends_with('\n') {
                    output.push('\n');
                }
            }
        }
        output
    }

    /// Generate the human-readable evidence log on demand
    pub fn get_evidence_log(&self) -> String {
        let mut output = String::new();
        output.push_str(PROFILE_LOG_HEADER);
        output.push('\n');
        for call in &self.evidence.profile_calls {
            let _ = writeln!(
                output,
                "{}\tcluster_{}_({:.1})\t{}\t{}\t{}",
                call.protein_id,
                call.cluster_id,
                call.threshold,
                format_float(call.score),
                format_float(call.e_value),
                call.taxon
            );
        }

        if self.sensitive {
            output.push_str(PAIRWISE_LOG_HEADER);
            output.push('\n');
            for call in &self.evidence.pairwise_calls {
                let _ = writeln!(
                    output,
                    "{}\t{}\t{}\t{}",
                    call.protein_id, call.accession, call.score, call.e_value
                );
            }
        }
        output
    }

    /// Writes the three run artifacts into `dir`.
    pub fn write_outputs<P: AsRef<Path>>(&self, dir: P) -> io::Result<()> {
        let dir = dir.as_ref();
        fs::write(dir.join(POSITIVE_FASTA_FILE), self.get_positive_fasta())?;
        self.write_summary_csv(fs::File::create(dir.join(SUMMARY_FILE))?)?;
        fs::write(dir.join(EVIDENCE_LOG_FILE), self.get_evidence_log())?;
        Ok(())
    }
}
