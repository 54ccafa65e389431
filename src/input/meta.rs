use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::input::InputError;
use crate::input::reader::open_maybe_gz;
use crate::model::rss::CellAnnotation;

/// Tab-separated per-cell metadata aligned to the barcode order of the
/// expression matrix. Cells missing from the file get empty values.
#[derive(Debug, Clone)]
pub struct CellMeta {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub barcodes: Vec<String>,
}

impl CellMeta {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Category labels from one column. Cells with an empty value stay
    /// unannotated.
    pub fn annotation(&self, column: &str) -> Result<CellAnnotation, InputError> {
        let idx = self.column_index(column).ok_or_else(|| {
            InputError::MissingInput(format!(
                "metadata has no column {column:?} (available: {})",
                self.columns.join(", ")
            ))
        })?;
        let mut annotation = CellAnnotation::new();
        for (barcode, row) in self.barcodes.iter().zip(&self.rows) {
            let label = row.get(idx).map(|s| s.as_str()).unwrap_or("");
            if !label.is_empty() {
                annotation.insert(barcode.clone(), label);
            }
        }
        Ok(annotation)
    }
}

pub fn load_meta(path: &Path, barcodes: &[String]) -> Result<CellMeta, InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();

    if reader.read_line(&mut buf)? == 0 {
        return Err(InputError::Parse("meta file is empty".to_string()));
    }
    let header: Vec<String> = buf
        .trim_end()
        .split('\t')
        .map(|s| s.trim().to_string())
        .collect();
    if header.iter().all(|h| h.is_empty()) {
        return Err(InputError::Parse("meta file header is empty".to_string()));
    }

    let barcode_col = header
        .iter()
        .position(|h| {
            let lower = h.to_ascii_lowercase();
            lower == "barcode" || lower == "barcodes" || lower == "cell"
        })
        .unwrap_or(0);
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != barcode_col)
        .map(|(_, h)| h.clone())
        .collect();

    let mut by_barcode: HashMap<String, Vec<String>> = HashMap::new();
    let mut line_no = 1usize;
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim_end();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        let Some(barcode) = fields.get(barcode_col).filter(|b| !b.is_empty()) else {
            tracing::warn!(line = line_no, "meta line has no barcode; skipping");
            continue;
        };
        if by_barcode.contains_key(*barcode) {
            tracing::warn!(line = line_no, barcode = %barcode, "duplicate barcode in metadata; keeping first");
            continue;
        }
        let row = (0..header.len())
            .filter(|&i| i != barcode_col)
            .map(|i| fields.get(i).copied().unwrap_or("").to_string())
            .collect();
        by_barcode.insert(barcode.to_string(), row);
    }

    let unmatched = barcodes
        .iter()
        .filter(|bc| !by_barcode.contains_key(bc.as_str()))
        .count();
    if unmatched > 0 {
        tracing::warn!(unmatched, "cells without a metadata row");
    }

    let rows = barcodes
        .iter()
        .map(|bc| {
            by_barcode
                .get(bc)
                .cloned()
                .unwrap_or_else(|| vec![String::new(); columns.len()])
        })
        .collect();

    Ok(CellMeta {
        columns,
        rows,
        barcodes: barcodes.to_vec(),
    })
}
