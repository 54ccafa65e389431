use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::barcodes::parse_barcodes;
use super::features::{Feature, normalize_symbol, parse_features};
use super::meta::load_meta;
use super::overrides::{load_threshold_overrides, parse_threshold_overrides};
use super::*;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("kira_regulons_input_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, contents: &str) {
    let mut f = BufWriter::new(File::create(path).unwrap());
    f.write_all(contents.as_bytes()).unwrap();
}

fn write_gz(path: &Path, contents: &str) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

fn feature(symbol: &str, feature_type: Option<&str>) -> Feature {
    Feature {
        id: format!("ID_{symbol}"),
        symbol: symbol.to_string(),
        symbol_norm: normalize_symbol(symbol),
        feature_type: feature_type.map(str::to_string),
    }
}

#[test]
fn test_feature_parsing_v2_v3() {
    let dir = make_temp_dir();
    let v2_path = dir.join("genes.tsv");
    let v3_path = dir.join("features.tsv.gz");

    write_file(&v2_path, "GENE1\tActb\nGENE2\tGapdh\n");
    write_gz(
        &v3_path,
        "ENSG0001\tSOX2\tGene Expression\nAB0001\tCD3\tAntibody Capture\n",
    );

    let v2 = parse_features(&v2_path).unwrap();
    assert_eq!(v2.len(), 2);
    assert_eq!(v2[0].feature_type, None);
    assert!(v2[1].is_gene_expression());

    let v3 = parse_features(&v3_path).unwrap();
    assert_eq!(v3.len(), 2);
    assert_eq!(v3[0].feature_type.as_deref(), Some("Gene Expression"));
    assert!(v3[0].is_gene_expression());
    assert!(!v3[1].is_gene_expression());
}

#[test]
fn test_gene_symbol_normalization() {
    assert_eq!(normalize_symbol("  ensG000001.12 "), "ENSG000001");
    assert_eq!(normalize_symbol(" sox2 "), "SOX2");
    assert_eq!(normalize_symbol("MT.1"), "MT.1");
    assert_eq!(normalize_symbol(""), "");
}

#[test]
fn test_gene_index_merges_duplicates_and_skips_other_types() {
    let features = vec![
        feature("GeneA", None),
        feature("genea", None),
        feature("CD3", Some("Antibody Capture")),
        feature("GeneB", Some("Gene Expression")),
    ];
    let index = build_gene_index(&features);
    assert_eq!(index.genes, vec!["GeneA".to_string(), "GeneB".to_string()]);
    assert_eq!(
        index.gene_id_by_feature,
        vec![Some(0), Some(0), None, Some(1)]
    );
}

#[test]
fn test_barcodes_parse_order_and_duplicates() {
    let dir = make_temp_dir();
    let path = dir.join("barcodes.tsv");
    write_file(&path, "AA-1\nBB-1\tx\nCC-1\n");
    assert_eq!(parse_barcodes(&path).unwrap(), vec!["AA-1", "BB-1", "CC-1"]);

    write_file(&path, "AA-1\nAA-1\n");
    assert!(matches!(
        parse_barcodes(&path),
        Err(InputError::InvalidInput(_))
    ));
}

#[test]
fn test_metadata_join_and_annotation() {
    let dir = make_temp_dir();
    let meta_path = dir.join("meta.tsv");
    write_file(
        &meta_path,
        "barcode\tcell_type\tsample\nAA-1\tT\tS1\nCC-1\tB\tS2\n",
    );

    let barcodes = vec!["AA-1".to_string(), "BB-1".to_string(), "CC-1".to_string()];
    let meta = load_meta(&meta_path, &barcodes).unwrap();
    assert_eq!(meta.columns, vec!["cell_type".to_string(), "sample".to_string()]);
    assert_eq!(meta.rows[1], vec!["".to_string(), "".to_string()]);

    let annotation = meta.annotation("Cell_Type").unwrap();
    assert_eq!(annotation.len(), 2);
    assert_eq!(annotation.label("AA-1"), Some("T"));
    assert_eq!(annotation.label("BB-1"), None);
    assert_eq!(annotation.label("CC-1"), Some("B"));

    assert!(matches!(
        meta.annotation("cluster"),
        Err(InputError::MissingInput(_))
    ));
}

#[test]
fn test_load_tenx_directory() {
    let dir = make_temp_dir();
    write_gz(
        &dir.join("features.tsv.gz"),
        "E1\tA\tGene Expression\nE2\tB\tGene Expression\nE3\ta\tGene Expression\nP1\tCD3\tAntibody Capture\n",
    );
    write_file(&dir.join("barcodes.tsv"), "c1\nc2\n");
    write_file(
        &dir.join("matrix.mtx"),
        "%%MatrixMarket matrix coordinate integer general\n% comment\n4 2 5\n1 1 3\n3 1 2\n2 2 7\n4 2 9\n1 2 0\n",
    );

    let bundle = load_input(&dir, None).unwrap();
    assert_eq!(bundle.n_cells(), 2);
    assert_eq!(bundle.n_genes(), 2);
    assert_eq!(bundle.n_features_raw, 4);

    let expr = load_expression(&bundle).unwrap();
    assert_eq!(expr.genes(), &["A".to_string(), "B".to_string()]);
    // rows 1 and 3 share the normalized symbol A
    assert_eq!(expr.value(0, 0), 5.0);
    assert_eq!(expr.value(1, 1), 7.0);
    assert_eq!(expr.nnz(), 2);
}

#[test]
fn test_load_input_reports_missing_files() {
    let dir = make_temp_dir();
    write_file(&dir.join("barcodes.tsv"), "c1\n");
    let err = load_input(&dir, None).unwrap_err();
    assert!(matches!(err, InputError::MissingInput(_)));
}

#[test]
fn test_matrix_dimension_mismatch_is_rejected() {
    let dir = make_temp_dir();
    write_file(&dir.join("features.tsv"), "E1\tA\tGene Expression\n");
    write_file(&dir.join("barcodes.tsv"), "c1\nc2\n");
    write_file(
        &dir.join("matrix.mtx"),
        "%%MatrixMarket matrix coordinate real general\n1 3 1\n1 1 0.5\n",
    );
    let bundle = load_input(&dir, None).unwrap();
    assert!(matches!(
        load_expression(&bundle),
        Err(InputError::InvalidInput(_))
    ));
}

#[test]
fn test_negative_counts_are_rejected() {
    let dir = make_temp_dir();
    write_file(&dir.join("features.tsv"), "E1\tA\tGene Expression\n");
    write_file(&dir.join("barcodes.tsv"), "c1\n");
    write_file(
        &dir.join("matrix.mtx"),
        "%%MatrixMarket matrix coordinate integer general\n1 1 1\n1 1 -4\n",
    );
    let bundle = load_input(&dir, None).unwrap();
    assert!(matches!(
        load_expression(&bundle),
        Err(InputError::Scoring(ScoringError::InvalidInput(_)))
    ));
}

#[test]
fn test_threshold_overrides_parse() {
    let text = "regulon\tthreshold\n# manual\nSOX2\t0.12\n\nPAX6\t0.3\n";
    let overrides =
        parse_threshold_overrides(Box::new(std::io::Cursor::new(text.to_string()))).unwrap();
    assert_eq!(overrides.len(), 2);
    assert_eq!(overrides.get("SOX2"), Some(&0.12));
    assert_eq!(overrides.get("PAX6"), Some(&0.3));
}

#[test]
fn test_threshold_overrides_reject_bad_rows() {
    let dup = "A\t0.1\nA\t0.2\n";
    assert!(matches!(
        parse_threshold_overrides(Box::new(std::io::Cursor::new(dup.to_string()))),
        Err(InputError::InvalidInput(_))
    ));
    let bad = "A\tlow\n";
    assert!(matches!(
        parse_threshold_overrides(Box::new(std::io::Cursor::new(bad.to_string()))),
        Err(InputError::Parse(_))
    ));
    let inf = "A\tinf\n";
    assert!(matches!(
        parse_threshold_overrides(Box::new(std::io::Cursor::new(inf.to_string()))),
        Err(InputError::InvalidInput(_))
    ));
}

#[test]
fn test_threshold_overrides_from_gz_file() {
    let dir = make_temp_dir();
    let path = dir.join("thr.tsv.gz");
    write_gz(&path, "SOX2\t0.25\n");
    let overrides = load_threshold_overrides(&path).unwrap();
    assert_eq!(overrides.get("SOX2"), Some(&0.25));
}
