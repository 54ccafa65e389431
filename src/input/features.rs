use std::io::BufRead;
use std::path::Path;

use crate::input::InputError;
use crate::input::reader::open_maybe_gz;

#[derive(Debug, Clone)]
pub struct Feature {
    pub id: String,
    pub symbol: String,
    pub symbol_norm: String,
    pub feature_type: Option<String>,
}

impl Feature {
    /// v2 files carry no type column; every row is a gene there.
    pub fn is_gene_expression(&self) -> bool {
        match &self.feature_type {
            None => true,
            Some(t) => t.eq_ignore_ascii_case("Gene Expression"),
        }
    }
}

/// Reads `features.tsv` (v3, three columns) or `genes.tsv` (v2, two columns).
pub fn parse_features(path: &Path) -> Result<Vec<Feature>, InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();
    let mut features = Vec::new();
    let mut line_no = 0usize;
    let mut first_width: Option<usize> = None;

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
        let cols: Vec<&str> = line.split('\t').map(str::trim).collect();
        if cols.len() < 2 {
            return Err(InputError::Parse(format!(
                "features line {} has <2 columns",
                line_no
            )));
        }
        match first_width {
            None => first_width = Some(cols.len()),
            Some(2) if cols.len() >= 3 => {
                tracing::warn!(
                    line = line_no,
                    "features file has extra columns after a two-column first line"
                );
            }
            Some(_) => {}
        }
        features.push(Feature {
            id: cols[0].to_string(),
            symbol: cols[1].to_string(),
            symbol_norm: normalize_symbol(cols[1]),
            feature_type: cols.get(2).map(|t| t.to_string()),
        });
    }

    if features.is_empty() {
        return Err(InputError::Parse("features file is empty".to_string()));
    }

    Ok(features)
}

/// Uppercases a gene symbol and strips Ensembl version suffixes
/// (`ENSG00000141510.17` → `ENSG00000141510`).
pub fn normalize_symbol(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let upper = trimmed.to_ascii_uppercase();
    if let Some((left, right)) = upper.rsplit_once('.') {
        if left.starts_with("ENS") && !right.is_empty() && right.chars().all(|c| c.is_ascii_digit())
        {
            return left.to_string();
        }
    }
    upper
}
