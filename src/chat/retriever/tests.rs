use super::*;
use serde_json::json;

fn search_result(content: &str, distance: f32) -> SearchResult {
    let mut metadata = ChunkMetadata::new();
    metadata.insert("title".to_string(), json!("Sexual Harassment of Women at Workplace Act"));
    SearchResult {
        content: content.to_string(),
        metadata,
        chunk_index: 0,
        distance,
    }
}

#[test]
fn no_documents_gives_sentinel() {
    let documents: [&str; 0] = [];
    assert_eq!(join_documents(&documents), NO_RELEVANT_INFORMATION);
}

#[test]
fn single_document_has_no_separator() {
    let joined = join_documents(&["Only chunk"]);
    assert_eq!(joined, "Only chunk");
    assert!(!joined.contains(CHUNK_SEPARATOR));
}

#[test]
fn separators_between_documents() {
    let joined = join_documents(&["one", "two", "three"]);

    assert_eq!(joined, "one\n\n---\n\ntwo\n\n---\n\nthree");
    assert_eq!(joined.matches(CHUNK_SEPARATOR).count(), 2);
}

#[test]
fn preview_keeps_short_text() {
    assert_eq!(preview_text("line one\nline two", 400), "line one line two");
}

#[test]
fn preview_truncates_long_text() {
    let text = "ä".repeat(450);

    let preview = preview_text(&text, PREVIEW_CHARS);

    assert!(preview.ends_with("..."));
    assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
}

#[test]
fn describe_match_contains_rank_distance_and_text() {
    let description = describe_match(2, &search_result("Every employer\nmust form an ICC.", 0.25));

    assert!(description.starts_with("#2 distance: 0.2500"));
    assert!(description.contains("Sexual Harassment of Women at Workplace Act"));
    assert!(description.contains("text: Every employer must form an ICC."));
}

#[test]
fn empty_result_is_sentinel() {
    let result = RetrievalResult::empty();

    assert!(result.is_empty());
    assert_eq!(result.context, NO_RELEVANT_INFORMATION);
}
