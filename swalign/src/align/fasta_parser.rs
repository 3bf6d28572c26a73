use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Result, anyhow, ensure};
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub comment: String,
    pub sequence: String,
}

pub fn parse_pair_fasta_file(path: impl AsRef<Path>) -> Result<(FastaRecord, FastaRecord)> {
    let path = path.as_ref();
    let mut records = parse_fasta_file(path)?;
    ensure!(
        records.len() == 2,
        "Expected paired fasta file with two records, but found {} records",
        records.len()
    );

    let second = records.remove(1);
    let first = records.remove(0);
    Ok((first, second))
}

fn parse_fasta_file(path: &Path) -> Result<Vec<FastaRecord>> {
    debug!("Parsing fasta file {path:?}");
    let input = BufReader::new(
        File::open(path).map_err(|error| anyhow!("Unable to open input file {path:?}: {error}"))?,
    );
    parse_fasta(input).map_err(|error| anyhow!("Unable to parse fasta file {path:?}: {error}"))
}

fn parse_fasta(input: impl BufRead) -> Result<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut current_record: Option<FastaRecord> = None;

    for line in input.lines() {
        let line = line?;
        let line = line.trim_end();

        if let Some(header) = line.strip_prefix('>') {
            records.extend(current_record.take());
            let (id, comment) = header.split_once(char::is_whitespace).unwrap_or((header, ""));
            current_record = Some(FastaRecord {
                id: id.to_string(),
                comment: comment.trim().to_string(),
                sequence: String::new(),
            });
        } else if let Some(record) = &mut current_record {
            record
                .sequence
                .extend(line.chars().filter(|c| !c.is_whitespace()));
        } else if !line.trim().is_empty() {
            return Err(anyhow!(
                "Found non-whitespace characters before first fasta record: {line}"
            ));
        }
    }

    records.extend(current_record);
    ensure!(!records.is_empty(), "The input contains no fasta record");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::{FastaRecord, parse_fasta};

    #[test]
    fn multiline_records() {
        let input = "\n>first some comment\nACG\nTT\n>second\n\nGG A\n";
        assert_eq!(
            parse_fasta(input.as_bytes()).unwrap(),
            vec![
                FastaRecord {
                    id: "first".to_string(),
                    comment: "some comment".to_string(),
                    sequence: "ACGTT".to_string(),
                },
                FastaRecord {
                    id: "second".to_string(),
                    comment: String::new(),
                    sequence: "GGA".to_string(),
                },
            ]
        );
    }

    #[test]
    fn sequence_before_header() {
        assert!(parse_fasta("ACGT\n>first\nA\n".as_bytes()).is_err());
        assert!(parse_fasta("\n\n".as_bytes()).is_err());
    }
}
