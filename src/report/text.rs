use crate::model::rss::RssTable;
use crate::model::thresholds::Confidence;
use crate::report::json::SummaryData;
use crate::report::{format_f32_6, format_opt_f32};

const TOP_PER_CATEGORY: usize = 5;

pub fn render_report_text(data: &SummaryData, rss: Option<&RssTable>) -> String {
    let mut out = String::new();

    out.push_str("Regulon Activity Report\n");
    out.push_str("=======================\n\n");

    out.push_str("1. Input\n");
    out.push_str(&format!(
        "Cells: {}\nGenes: {}\nRegulons defined: {}\nRegulons scored: {}\nRank cutoff: {}\n",
        data.input.n_cells,
        data.input.n_genes,
        data.input.n_regulons_defined,
        data.input.n_regulons_scored,
        data.cutoff_rank
    ));
    if data.cancelled {
        out.push_str("Run was cancelled; unscored entries are reported as NA.\n");
    }
    out.push('\n');

    out.push_str("2. Thresholds\n");
    out.push_str(&format!(
        "Confidently bimodal: {} of {}\nManual overrides: {}\n",
        data.n_bimodal,
        data.regulons.len(),
        data.n_overrides
    ));
    let flagged: Vec<&str> = data
        .regulons
        .iter()
        .filter(|r| matches!(r.confidence, Some(c) if c != Confidence::Bimodal))
        .map(|r| r.regulon.as_str())
        .collect();
    if !flagged.is_empty() {
        out.push_str(&format!("Not confidently bimodal: {}\n", flagged.join(", ")));
    }
    out.push('\n');

    out.push_str("3. Most active regulons\n");
    let mut by_activity: Vec<_> = data
        .regulons
        .iter()
        .filter_map(|r| r.active_fraction.map(|f| (r.regulon.as_str(), f)))
        .filter(|(_, f)| *f > 0.0)
        .collect();
    by_activity.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    if by_activity.is_empty() {
        out.push_str("No regulon is active in any cell.\n");
    }
    for (regulon, fraction) in by_activity.iter().take(10) {
        out.push_str(&format!("{}: {} of cells active\n", regulon, format_f32_6(*fraction)));
    }
    out.push('\n');

    if let Some(rss) = rss {
        out.push_str("4. Category-specific regulons\n");
        let mut categories: Vec<&str> = rss.rows.iter().map(|r| r.category.as_str()).collect();
        categories.sort();
        categories.dedup();
        for category in categories {
            let top = rss.top_for_category(category, TOP_PER_CATEGORY);
            let listed = top
                .iter()
                .map(|(r, s)| format!("{} ({})", r, format_opt_f32(Some(*s))))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "{}: {}\n",
                category,
                if listed.is_empty() { "undefined" } else { listed.as_str() }
            ));
        }
        out.push('\n');
    }

    if !data.diagnostics.is_empty() {
        out.push_str(&format!("Diagnostics: {} (see summary.json)\n", data.diagnostics.len()));
    }

    out
}
