use chat_core::{Provenance, ProvenanceResolver, SourceRecord, SourceType};
use pretty_assertions::assert_eq;

fn resolver() -> ProvenanceResolver {
    ProvenanceResolver::new("app.example.com")
}

#[test]
fn cross_origin_url_is_external() {
    let source = SourceRecord::new(7, "IBM").with_url("https://ibm.com/x");
    assert_eq!(resolver().resolve(&source), Provenance::External);
}

#[test]
fn explicit_internal_beats_cross_origin_url() {
    let source = SourceRecord::new(7, "IBM")
        .with_url("https://ibm.com/x")
        .with_type(SourceType::Internal);
    assert_eq!(resolver().resolve(&source), Provenance::Internal);
}

#[test]
fn explicit_external_beats_same_origin_url() {
    let source = SourceRecord::new(1, "Docs")
        .with_url("https://app.example.com/docs")
        .with_type(SourceType::External);
    assert_eq!(resolver().resolve(&source), Provenance::External);
}

#[test]
fn missing_url_and_type_is_internal() {
    let source = SourceRecord::new(2, "Handbook");
    assert_eq!(resolver().resolve(&source), Provenance::Internal);

    let blank = SourceRecord::new(3, "Blank").with_url("   ");
    assert_eq!(resolver().resolve(&blank), Provenance::Internal);
}

#[test]
fn relative_or_malformed_url_is_internal() {
    let relative = SourceRecord::new(4, "Page").with_url("/kb/article/12");
    let malformed = SourceRecord::new(5, "Broken").with_url("http://");
    assert_eq!(resolver().resolve(&relative), Provenance::Internal);
    assert_eq!(resolver().resolve(&malformed), Provenance::Internal);
}

#[test]
fn same_host_and_loopback_are_internal() {
    let same = SourceRecord::new(1, "Same").with_url("https://APP.example.com/a");
    let local = SourceRecord::new(2, "Local").with_url("http://localhost:3000/a");
    let loopback = SourceRecord::new(3, "Loop").with_url("http://127.0.0.1/a");
    for source in [same, local, loopback] {
        assert_eq!(resolver().resolve(&source), Provenance::Internal, "{}", source.title);
    }
}

#[test]
fn without_page_host_only_loopback_is_internal() {
    let resolver = ProvenanceResolver::default();
    let remote = SourceRecord::new(1, "Remote").with_url("https://example.org");
    let local = SourceRecord::new(2, "Local").with_url("http://localhost/a");
    assert!(resolver.is_external(&remote));
    assert!(!resolver.is_external(&local));
}

#[test]
fn record_parses_camel_case_json() {
    let source: SourceRecord = serde_json::from_str(
        r#"{"key":3,"title":"T","content":"C","sourceType":"external","sourceName":"N"}"#,
    )
    .unwrap();
    assert_eq!(source.key, 3);
    assert_eq!(source.source_type, Some(SourceType::External));
    assert_eq!(source.source_name.as_deref(), Some("N"));
    assert_eq!(source.url, None);
}
