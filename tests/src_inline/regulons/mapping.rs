use super::*;

fn expr(genes: &[&str]) -> ExpressionMatrix {
    let rows = vec![vec![1.0, 2.0]; genes.len()];
    ExpressionMatrix::from_dense(
        genes.iter().map(|g| g.to_string()).collect(),
        vec!["c1".to_string(), "c2".to_string()],
        &rows,
    )
    .unwrap()
}

fn params(min_size: usize) -> AucParams {
    let mut p = AucParams::default_v1();
    p.min_regulon_size = min_size;
    p
}

#[test]
fn test_lookup_prefers_exact_then_normalized() {
    let m = expr(&["Sox2", "ENSG0001.4", "Pax6"]);
    let lookup = GeneLookup::new(&m);
    assert_eq!(lookup.resolve("Sox2"), Some(0));
    assert_eq!(lookup.resolve("SOX2"), Some(0));
    assert_eq!(lookup.resolve("ENSG0001"), Some(1));
    assert_eq!(lookup.resolve("pax6 "), Some(2));
    assert_eq!(lookup.resolve("Nanog"), None);
}

#[test]
fn test_map_regulon_dedups_and_reports_missing() {
    let m = expr(&["A", "B", "C"]);
    let lookup = GeneLookup::new(&m);
    let regulon = Regulon::new("TF1", ["C", "A", "c", "Z"]);
    let (mapped, missing) = map_regulon(&regulon, &lookup).unwrap();
    assert_eq!(mapped.name, "TF1");
    assert_eq!(mapped.genes, vec![0, 2]);
    assert_eq!(missing, vec!["Z".to_string()]);
}

#[test]
fn test_map_regulon_with_no_matching_gene_is_empty() {
    let m = expr(&["A", "B"]);
    let lookup = GeneLookup::new(&m);
    let regulon = Regulon::new("TF2", ["X", "Y"]);
    let err = map_regulon(&regulon, &lookup).unwrap_err();
    assert_eq!(
        err,
        ScoringError::EmptyRegulon {
            regulon: "TF2".to_string(),
            dropped: 2
        }
    );
}

#[test]
fn test_repeated_missing_identifiers_count_once() {
    let m = expr(&["A", "B"]);
    let lookup = GeneLookup::new(&m);

    let (_, missing) = map_regulon(&Regulon::new("tf", ["A", "X", "X"]), &lookup).unwrap();
    assert_eq!(missing, vec!["X".to_string()]);

    let err = map_regulon(&Regulon::new("e", ["Y", "Y", "Y"]), &lookup).unwrap_err();
    assert_eq!(
        err,
        ScoringError::EmptyRegulon {
            regulon: "e".to_string(),
            dropped: 1
        }
    );

    let regulons = vec![
        Regulon::new("tf", ["A", "X", "X"]),
        Regulon::new("e", ["Y", "Z", "Y"]),
    ];
    let prepared = prepare_regulons(&m, &regulons, &params(1));
    assert_eq!(prepared.audits[0].size_defined, 2);
    assert_eq!(prepared.audits[0].missing_genes, vec!["X".to_string()]);
    assert_eq!(prepared.audits[1].excluded, Some(ExclusionReason::Empty));
    assert_eq!(
        prepared.audits[1].missing_genes,
        vec!["Y".to_string(), "Z".to_string()]
    );
    assert_eq!(
        prepared.diagnostics[0].message,
        "1 genes absent from expression matrix"
    );
}

#[test]
fn test_prepare_regulons_applies_size_policy() {
    let m = expr(&["A", "B", "C", "D"]);
    let regulons = vec![
        Regulon::new("big", ["A", "B", "C"]),
        Regulon::new("small", ["D"]),
        Regulon::new("empty", ["Q"]),
        Regulon::new("big", ["A", "B", "C", "D"]),
    ];
    let prepared = prepare_regulons(&m, &regulons, &params(2));

    assert_eq!(prepared.scorable.len(), 1);
    assert_eq!(prepared.scorable[0].name, "big");
    assert_eq!(prepared.scorable[0].genes, vec![0, 1, 2]);

    let reasons: Vec<_> = prepared.audits.iter().map(|a| a.excluded).collect();
    assert_eq!(
        reasons,
        vec![
            None,
            Some(ExclusionReason::BelowMinSize),
            Some(ExclusionReason::Empty),
            Some(ExclusionReason::DuplicateName),
        ]
    );
    assert_eq!(prepared.excluded().count(), 3);

    let kinds: Vec<&str> = prepared.diagnostics.iter().map(|d| d.kind).collect();
    assert!(kinds.contains(&"below_min_size"));
    assert!(kinds.contains(&"empty_regulon"));
    assert!(kinds.contains(&"duplicate_name"));
}

#[test]
fn test_prepare_regulons_records_dropped_genes() {
    let m = expr(&["A", "B"]);
    let regulons = vec![Regulon::new("tf", ["A", "B", "missing"])];
    let prepared = prepare_regulons(&m, &regulons, &params(1));
    assert_eq!(prepared.scorable.len(), 1);
    let audit = &prepared.audits[0];
    assert_eq!(audit.size_defined, 3);
    assert_eq!(audit.size_scored, 2);
    assert_eq!(audit.missing_genes, vec!["missing".to_string()]);
    assert_eq!(prepared.diagnostics.len(), 1);
    assert_eq!(prepared.diagnostics[0].kind, "genes_dropped");
}
