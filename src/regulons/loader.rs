use std::collections::{BTreeMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use crate::input::InputError;
use crate::input::reader::open_maybe_gz;
use crate::regulons::Regulon;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegulonFormat {
    /// `name<TAB>description<TAB>gene<TAB>gene...`
    Gmt,
    /// `regulon<TAB>gene`, one pair per line.
    Pairs,
}

impl RegulonFormat {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".gmt") {
            RegulonFormat::Gmt
        } else {
            RegulonFormat::Pairs
        }
    }
}

pub fn load_regulons(path: &Path) -> Result<Vec<Regulon>, InputError> {
    let format = RegulonFormat::from_path(path);
    let reader = open_maybe_gz(path)?;
    parse_regulons(reader, format)
}

/// Parses regulons in first-appearance order. Duplicate genes inside a
/// regulon are kept once; blank lines and `#` comments are skipped, as is a
/// leading `regulon<TAB>gene` header in the pairs format.
pub fn parse_regulons(
    mut reader: Box<dyn BufRead>,
    format: RegulonFormat,
) -> Result<Vec<Regulon>, InputError> {
    let mut order: Vec<String> = Vec::new();
    let mut genes: BTreeMap<String, (Vec<String>, HashSet<String>)> = BTreeMap::new();
    let mut buf = String::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim_end();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').map(|c| c.trim()).collect();
        let (name, members): (&str, &[&str]) = match format {
            RegulonFormat::Gmt => {
                if cols.len() < 3 {
                    return Err(InputError::Parse(format!(
                        "regulon line {} has <3 columns",
                        line_no
                    )));
                }
                (cols[0], &cols[2..])
            }
            RegulonFormat::Pairs => {
                if cols.len() < 2 {
                    return Err(InputError::Parse(format!(
                        "regulon line {} has <2 columns",
                        line_no
                    )));
                }
                if order.is_empty() && cols[0].eq_ignore_ascii_case("regulon") {
                    continue;
                }
                (cols[0], &cols[1..2])
            }
        };
        if name.is_empty() {
            return Err(InputError::Parse(format!(
                "regulon line {} has an empty name",
                line_no
            )));
        }
        let (members_in_order, seen) = genes.entry(name.to_string()).or_insert_with(|| {
            order.push(name.to_string());
            (Vec::new(), HashSet::new())
        });
        for &gene in members {
            if !gene.is_empty() && seen.insert(gene.to_string()) {
                members_in_order.push(gene.to_string());
            }
        }
    }

    if order.is_empty() {
        return Err(InputError::Parse("regulon file is empty".to_string()));
    }

    Ok(order
        .into_iter()
        .map(|name| {
            let (members, _) = genes.remove(&name).unwrap_or_default();
            Regulon::new(name, members)
        })
        .collect())
}

#[cfg(test)]
#[path = "../../tests/src_inline/regulons/loader.rs"]
mod tests;
