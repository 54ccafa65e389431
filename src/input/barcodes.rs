use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use crate::input::InputError;
use crate::input::reader::open_maybe_gz;

pub fn parse_barcodes(path: &Path) -> Result<Vec<String>, InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();
    let mut barcodes = Vec::new();
    let mut seen = HashSet::new();

    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }
        let line = buf.trim();
        if line.is_empty() {
            continue;
        }
        // 10x barcode files may carry extra columns; the first one is the id.
        let barcode = line.split('\t').next().unwrap_or(line).to_string();
        if !seen.insert(barcode.clone()) {
            return Err(InputError::InvalidInput(format!(
                "duplicate barcode: {barcode}"
            )));
        }
        barcodes.push(barcode);
    }

    if barcodes.is_empty() {
        return Err(InputError::Parse("barcodes file is empty".to_string()));
    }

    Ok(barcodes)
}
