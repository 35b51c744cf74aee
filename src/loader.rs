//! Line-oriented key file reader.
//!
//! One record per line: `key<SEP>value`. The record is split on the first
//! separator byte, so values may contain the separator but keys cannot. The
//! trailing `\n` (and a `\r` before it) is not part of the value.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{EngineError, Result};

pub const DEFAULT_SEPARATOR: u8 = b'\t';

/// Parse every record of `reader`. Empty lines are skipped.
pub fn parse_records<R: BufRead>(reader: R, separator: u8) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut pairs = Vec::new();

    for (idx, line) in reader.split(b'\n').enumerate() {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            continue;
        }

        let Some(at) = line.iter().position(|&b| b == separator) else {
            return Err(EngineError::MalformedRecord {
                line: idx + 1,
                record: line,
            });
        };
        let value = line[at + 1..].to_vec();
        line.truncate(at);
        pairs.push((line, value));
    }

    tracing::debug!(records = pairs.len(), "Key records parsed");
    Ok(pairs)
}

/// Open `path` and parse its records.
pub fn load_file<P: AsRef<Path>>(path: P, separator: u8) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let file = File::open(path.as_ref())?;
    parse_records(BufReader::new(file), separator)
}
