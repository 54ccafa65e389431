use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::input::reader::open_maybe_gz;
use crate::input::{GeneIndex, InputError};

pub fn find_matrix_path(input_dir: &Path) -> Result<PathBuf, InputError> {
    for name in ["matrix.mtx", "matrix.mtx.gz"] {
        let path = input_dir.join(name);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(InputError::MissingInput(
        "missing matrix.mtx or matrix.mtx.gz".to_string(),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueField {
    Integer,
    Real,
}

/// Reads a MatrixMarket coordinate file (features × cells) into per-cell
/// columns keyed by gene id. Features without a gene id are skipped; features
/// sharing a gene id are summed.
pub fn read_mtx_columns(
    path: &Path,
    n_features_raw: usize,
    n_cells: usize,
    gene_index: &GeneIndex,
) -> Result<Vec<Vec<(u32, f32)>>, InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();

    if reader.read_line(&mut buf)? == 0 {
        return Err(InputError::Parse("matrix.mtx is empty".to_string()));
    }
    let field = parse_banner(buf.trim_end())?;

    let (rows, cols) = loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            return Err(InputError::Parse("missing matrix size line".to_string()));
        }
        let line = buf.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(InputError::Parse("invalid matrix size line".to_string()));
        }
        let rows = parse_usize(parts[0], "row count")?;
        let cols = parse_usize(parts[1], "column count")?;
        parse_usize(parts[2], "nnz count")?;
        break (rows, cols);
    };

    if rows != n_features_raw {
        return Err(InputError::InvalidInput(format!(
            "matrix row count {} does not match features {}",
            rows, n_features_raw
        )));
    }
    if cols != n_cells {
        return Err(InputError::InvalidInput(format!(
            "matrix column count {} does not match barcodes {}",
            cols, n_cells
        )));
    }

    let mut per_col: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); cols];
    let mut line_no = 0usize;
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(InputError::Parse(format!(
                "invalid matrix entry at line {}",
                line_no
            )));
        }
        let row = parse_usize(parts[0], "row index")?;
        let col = parse_usize(parts[1], "col index")?;
        let value = match field {
            ValueField::Integer => parts[2]
                .parse::<i64>()
                .map(|v| v as f64)
                .map_err(|_| InputError::Parse(format!("invalid value at line {}", line_no)))?,
            ValueField::Real => parts[2]
                .parse::<f64>()
                .map_err(|_| InputError::Parse(format!("invalid value at line {}", line_no)))?,
        };
        if row == 0 || row > rows || col == 0 || col > cols {
            return Err(InputError::Parse(format!(
                "matrix entry out of bounds at line {}",
                line_no
            )));
        }
        if value == 0.0 {
            continue;
        }
        if let Some(gene_id) = gene_index.gene_id_by_feature.get(row - 1).and_then(|g| *g) {
            *per_col[col - 1].entry(gene_id as u32).or_insert(0.0) += value;
        }
    }

    Ok(per_col
        .into_iter()
        .map(|m| m.into_iter().map(|(g, v)| (g, v as f32)).collect())
        .collect())
}

fn parse_banner(header: &str) -> Result<ValueField, InputError> {
    if !header.starts_with("%%MatrixMarket") {
        return Err(InputError::Parse("missing MatrixMarket header".to_string()));
    }
    let lower = header.to_ascii_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    if !tokens.contains(&"coordinate") {
        return Err(InputError::InvalidInput(
            "only coordinate MatrixMarket files are supported".to_string(),
        ));
    }
    if tokens.contains(&"integer") {
        Ok(ValueField::Integer)
    } else if tokens.contains(&"real") || tokens.contains(&"double") {
        Ok(ValueField::Real)
    } else {
        Err(InputError::InvalidInput(format!(
            "unsupported MatrixMarket value field in header: {header}"
        )))
    }
}

fn parse_usize(raw: &str, what: &str) -> Result<usize, InputError> {
    raw.parse()
        .map_err(|_| InputError::Parse(format!("invalid {what}: {raw}")))
}
