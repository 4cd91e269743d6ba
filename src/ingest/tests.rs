use super::*;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

fn source() -> PathBuf {
    PathBuf::from("/data/women_rights.json")
}

#[test]
fn parses_records_in_order() {
    let text = json!([
        {"title": "Dowry Prohibition Act", "description": "Dowry is illegal."},
        {"title": "Maternity Benefit Act", "description": "Paid maternity leave."}
    ])
    .to_string();

    let records = parse_knowledge_base(&text, &source()).expect("should parse");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].seq_num, 1);
    assert_eq!(records[0].description, "Dowry is illegal.");
    assert_eq!(records[1].seq_num, 2);
    assert_eq!(records[1].metadata["title"], "Maternity Benefit Act");
}

#[test]
fn empty_array_is_valid() {
    let records = parse_knowledge_base("[]", &source()).expect("should parse");
    assert!(records.is_empty());
}

#[test]
fn invalid_json_is_a_parse_error() {
    let error = parse_knowledge_base("[{", &source()).expect_err("must fail");
    assert!(matches!(error, IngestError::Parse { .. }));
}

#[test]
fn top_level_object_is_rejected() {
    let error = parse_knowledge_base(r#"{"description": "x"}"#, &source()).expect_err("must fail");
    assert!(matches!(error, IngestError::NotAnArray(_)));
}

#[test]
fn non_object_record_is_malformed() {
    let error = parse_knowledge_base(r#"[{"description": "ok"}, 42]"#, &source())
        .expect_err("must fail");

    match error {
        IngestError::MalformedRecord { seq_num, .. } => assert_eq!(seq_num, 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_description_is_malformed() {
    let error = parse_knowledge_base(r#"[{"title": "No body"}]"#, &source()).expect_err("must fail");

    match error {
        IngestError::MalformedRecord { seq_num, reason } => {
            assert_eq!(seq_num, 1);
            assert!(reason.contains("description"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_string_description_is_malformed() {
    let error =
        parse_knowledge_base(r#"[{"description": ["a", "b"]}]"#, &source()).expect_err("must fail");
    assert!(matches!(error, IngestError::MalformedRecord { seq_num: 1, .. }));
}

#[test]
fn metadata_keeps_only_primitives() {
    let record = json!({
        "category": "Marriage",
        "title": "Protection of Women from Domestic Violence Act",
        "description": "Protection orders and residence rights.",
        "history": null,
        "purpose": 2005,
        "case_examples": ["Indra Sarma v. V.K.V. Sarma"],
        "unrelated": "not copied"
    });
    let Value::Object(record) = record else {
        panic!("fixture is an object");
    };

    let metadata = build_metadata(&record, "/data/kb.json", 7);

    assert_eq!(metadata["category"], "Marriage");
    assert_eq!(metadata["purpose"], 2005);
    assert_eq!(metadata["source"], "/data/kb.json");
    assert_eq!(metadata["seq_num"], 7);
    assert!(metadata.contains_key("description"));
    assert!(!metadata.contains_key("history"));
    assert!(!metadata.contains_key("case_examples"));
    assert!(!metadata.contains_key("unrelated"));
    assert!(metadata.values().all(is_primitive));
}

#[test]
fn primitive_detection() {
    assert!(is_primitive(&json!("text")));
    assert!(is_primitive(&json!(1.5)));
    assert!(is_primitive(&json!(false)));
    assert!(is_primitive(&Value::Null));
    assert!(!is_primitive(&json!([1])));
    assert!(!is_primitive(&json!({"a": 1})));
}

#[test]
fn chunks_carry_record_metadata() {
    let description = (0..120)
        .map(|i| format!("word{i}"))
        .collect::<Vec<_>>()
        .join(" ");
    let text = json!([{"title": "Long", "description": description}]).to_string();
    let records = parse_knowledge_base(&text, &source()).expect("should parse");

    let chunks = prepare_chunks(&records[0], &ChunkingConfig::default());

    assert!(chunks.len() > 1);
    for (index, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index as usize, index);
        assert_eq!(chunk.metadata["title"], "Long");
        assert_eq!(chunk.metadata["seq_num"], 1);
    }
}

#[test]
fn blank_description_has_no_chunks() {
    let records =
        parse_knowledge_base(r#"[{"description": "   "}]"#, &source()).expect("should parse");
    assert!(prepare_chunks(&records[0], &ChunkingConfig::default()).is_empty());
}

#[test]
fn load_reports_missing_file() {
    let error = load_knowledge_base(Path::new("/nonexistent/kb.json")).expect_err("must fail");
    assert!(matches!(error, IngestError::Read { .. }));
}

#[test]
fn load_records_source_path() {
    let mut file = NamedTempFile::new().expect("should create temp file");
    write!(file, r#"[{{"description": "Equal pay for equal work."}}]"#)
        .expect("should write fixture");

    let records = load_knowledge_base(file.path()).expect("should load");
    let canonical = file
        .path()
        .canonicalize()
        .expect("temp file has a canonical path");

    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].metadata["source"],
        canonical.display().to_string()
    );
}
