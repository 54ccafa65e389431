use std::fmt::Write;

use crate::model::matrices::{AucMatrix, BinaryMatrix};
use crate::model::rss::RssTable;
use crate::model::thresholds::ThresholdSet;
use crate::regulons::RegulonAudit;
use crate::report::{format_f32_6, format_opt_f32};

/// Regulons as rows, cells as columns; `NA` for entries not computed.
pub fn render_auc_tsv(auc: &AucMatrix) -> String {
    let mut out = String::new();
    push_header(&mut out, &auc.cells);
    for (regulon, row) in auc.regulons.iter().zip(&auc.values) {
        out.push_str(regulon);
        for v in row {
            out.push('\t');
            out.push_str(&format_opt_f32(*v));
        }
        out.push('\n');
    }
    out
}

pub fn render_binary_tsv(binary: &BinaryMatrix) -> String {
    let mut out = String::new();
    push_header(&mut out, &binary.cells);
    for (regulon, row) in binary.regulons.iter().zip(&binary.values) {
        out.push_str(regulon);
        for v in row {
            out.push('\t');
            match v {
                Some(b) => {
                    let _ = write!(out, "{b}");
                }
                None => out.push_str("NA"),
            }
        }
        out.push('\n');
    }
    out
}

/// One line per regulon: applied threshold, its provenance, the estimated
/// selection and every candidate as `kind=value`.
pub fn render_thresholds_tsv(thresholds: &ThresholdSet, binary: &BinaryMatrix) -> String {
    let mut out = String::from("regulon\tthreshold\tsource\tconfidence\tselected\tcandidates\n");
    for regulon in &binary.regulons {
        let applied = binary.applied.get(regulon);
        let estimated = thresholds.get(regulon);
        let candidates = estimated
            .map(|t| {
                t.candidates
                    .iter()
                    .map(|c| format!("{}={}", c.kind.label(), format_f32_6(c.value)))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            regulon,
            format_opt_f32(applied.map(|a| a.value)),
            applied
                .map(|a| format!("{:?}", a.source).to_ascii_lowercase())
                .unwrap_or_else(|| "NA".to_string()),
            estimated
                .map(|t| format!("{:?}", t.confidence))
                .unwrap_or_else(|| "NA".to_string()),
            estimated.map(|t| t.selected.label()).unwrap_or("NA"),
            candidates,
        );
    }
    out
}

pub fn render_rss_tsv(rss: &RssTable) -> String {
    let mut out = String::from("regulon\tcategory\tn_cells\trss\n");
    for row in &rss.rows {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            row.regulon,
            row.category,
            row.n_cells,
            format_opt_f32(row.score)
        );
    }
    out
}

pub fn render_audits_tsv(audits: &[RegulonAudit]) -> String {
    let mut out =
        String::from("regulon\tsize_defined\tsize_scored\tn_missing\texcluded\tmissing_genes\n");
    for a in audits {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            a.regulon,
            a.size_defined,
            a.size_scored,
            a.missing_genes.len(),
            a.excluded
                .map(|e| format!("{e:?}"))
                .unwrap_or_else(|| "-".to_string()),
            a.missing_genes.join(","),
        );
    }
    out
}

fn push_header(out: &mut String, cells: &[String]) {
    out.push_str("regulon");
    for cell in cells {
        out.push('\t');
        out.push_str(cell);
    }
    out.push('\n');
}
