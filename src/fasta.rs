//src/fasta.rs

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::SequenceFileError;

/// Marker opening every header line.
pub const HEADER_MARKER: char = '>';

/// A header line together with the identifier taken from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaHeader {
    pub id: String,
    /// The full line as read, line break included.
    pub line: String,
}

#[inline]
pub fn is_gzipped(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// Opens a sequence file, transparently decompressing it if the name ends with ".gz".
pub fn open_sequence_reader(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let f = File::open(path)?;

    let reader: Box<dyn BufRead> = if is_gzipped(path) {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

/// First whitespace-delimited token of a header line, marker stripped.
pub fn header_id(line: &str) -> Option<&str> {
    line.trim_start_matches(HEADER_MARKER).split_whitespace().next()
}

/// Lists every header of the file in order of appearance. Body lines are skipped.
pub fn read_headers(path: &Path) -> Result<Vec<FastaHeader>, SequenceFileError> {
    let io_err = |source| SequenceFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = open_sequence_reader(path).map_err(io_err)?;

    let mut headers = Vec::new();
    let mut line = String::new();
    let mut line_no = 0;
    loop {
        line.clear();
        if reader.read_line(&mut line).map_err(io_err)? == 0 {
            break;
        }
        line_no += 1;
        if !line.starts_with(HEADER_MARKER) {
            continue;
        }
        let id = header_id(&line).ok_or_else(|| SequenceFileError::EmptyHeader {
            path: path.to_path_buf(),
            line: line_no,
        })?;
        headers.push(FastaHeader {
            id: id.to_string(),
            line: line.clone(),
        });
    }
    Ok(headers)
}

/// Re-scans the file and returns `(id, body)` for every record accepted by `keep`,
/// in file order. The body is the verbatim concatenation of the record's lines
/// (line breaks preserved, header excluded). The record still open at end of
/// file is flushed like any other.
pub fn collect_record_bodies<F>(
    path: &Path,
    mut keep: F,
) -> Result<Vec<(String, String)>, SequenceFileError>
where
    F: FnMut(&str) -> bool,
{
    let io_err = |source| SequenceFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = open_sequence_reader(path).map_err(io_err)?;

    let mut bodies = Vec::new();
    let mut open: Option<(String, String)> = None;
    let mut line = String::new();
    let mut line_no = 0;
    loop {
        line.clear();
        if reader.read_line(&mut line).map_err(io_err)? == 0 {
            break;
        }
        line_no += 1;

        if line.starts_with(HEADER_MARKER) {
            if let Some(done) = open.take() {
                bodies.push(done);
            }
            let id = header_id(&line).ok_or_else(|| SequenceFileError::EmptyHeader {
                path: path.to_path_buf(),
                line: line_no,
            })?;
            if keep(id) {
                open = Some((id.to_string(), String::new()));
            }
        } else if let Some((_, body)) = open.as_mut() {
            body.push_str(&line);
        }
    }
    // do not lose the last record
    if let Some(done) = open.take() {
        bodies.push(done);
    }
    Ok(bodies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const CONTIGS: &str = ">c1 len=12 cov=3.0\nACGTAC\nGTACGT\n>c2\nTTTT\n>c3 last\nGGGG\nCC\n";

    fn write_tmp(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn header_id_takes_first_token() {
        assert_eq!(header_id(">k141_7 flag=1 multi=2.0\n"), Some("k141_7"));
        assert_eq!(header_id(">\n"), None);
    }

    #[test]
    fn read_headers_keeps_full_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "contigs.fa", CONTIGS);

        let headers = read_headers(&path).unwrap();
        let ids: Vec<&str> = headers.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(headers[0].line, ">c1 len=12 cov=3.0\n");
    }

    #[test]
    fn read_headers_rejects_empty_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "bad.fa", ">c1\nAC\n>   \nGG\n");

        match read_headers(&path) {
            Err(SequenceFileError::EmptyHeader { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected EmptyHeader, got {:?}", other),
        }
    }

    #[test]
    fn record_bodies_are_verbatim_and_last_record_is_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "contigs.fa", CONTIGS);

        let bodies = collect_record_bodies(&path, |id| id != "c2").unwrap();
        assert_eq!(
            bodies,
            vec![
                ("c1".to_string(), "ACGTAC\nGTACGT\n".to_string()),
                ("c3".to_string(), "GGGG\nCC\n".to_string()),
            ]
        );
    }

    #[test]
    fn last_record_without_trailing_newline_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "contigs.fa", ">a\nAC\n>b\nGT");

        let bodies = collect_record_bodies(&path, |_| true).unwrap();
        assert_eq!(bodies[1], ("b".to_string(), "GT".to_string()));
    }

    #[test]
    fn gzip_input_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contigs.fa.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(CONTIGS.as_bytes()).unwrap();
        enc.finish().unwrap();

        let headers = read_headers(&path).unwrap();
        assert_eq!(headers.len(), 3);
        let bodies = collect_record_bodies(&path, |id| id == "c2").unwrap();
        assert_eq!(bodies, vec![("c2".to_string(), "TTTT\n".to_string())]);
    }
}
