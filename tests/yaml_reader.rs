// tests/yaml_reader.rs

use abiflow::errors::AbiflowError;
use abiflow::yamlio::YamlDocReader;

const LOG: &str = "\
 ABINIT 9.6.2\n\
 some solver chatter\n\
--- !Kpoints\n\
reduced_coordinates_of_qpoints: [[0, 0, 0], [0.5, 0, 0]]\n\
...\n\
 more chatter\n\
--- !IrredPerts\n\
irred_perts:\n\
  - {idir: 1, ipert: 1, qpt: [0, 0, 0]}\n\
...\n\
 normal exit\n";

#[test]
fn next_doc_with_tag_returns_tagged_body() {
    let mut reader = YamlDocReader::from_string(LOG);

    let doc = reader
        .next_doc_with_tag("!IrredPerts")
        .expect("well-formed stream")
        .expect("document present");

    assert!(doc.contains("irred_perts:"));
    assert!(doc.contains("{idir: 1, ipert: 1, qpt: [0, 0, 0]}"));
    // Delimiter lines are not part of the body.
    assert!(!doc.contains("---"));
    assert!(!doc.contains("..."));
}

#[test]
fn tag_lookup_then_all_docs_sees_the_same_text() {
    let mut reader = YamlDocReader::from_string(LOG);

    let tagged = reader
        .next_doc_with_tag("!Kpoints")
        .expect("well-formed stream")
        .expect("document present");

    reader.rewind();
    let all = reader.all_docs().expect("well-formed stream");

    assert_eq!(all.len(), 2);
    assert!(all.contains(&tagged));
}

#[test]
fn missing_tag_is_empty_result_not_error() {
    let mut reader = YamlDocReader::from_string(LOG);

    let doc = reader
        .next_doc_with_tag("!NoSuchTag")
        .expect("missing tag is not an error");

    assert!(doc.is_none());
}

#[test]
fn unterminated_section_is_malformed_for_tag_lookup() {
    let text = "chatter\n--- !Kpoints\nreduced_coordinates_of_qpoints: []\n";
    let mut reader = YamlDocReader::from_string(text);

    let err = reader.next_doc_with_tag("!Kpoints").unwrap_err();
    assert!(matches!(err, AbiflowError::MalformedSection(_)));
}

#[test]
fn unterminated_trailing_doc_is_malformed_for_all_docs() {
    let text = "\
--- !Kpoints\n\
reduced_coordinates_of_qpoints: []\n\
...\n\
--- !Other\n\
unclosed: true\n";
    let mut reader = YamlDocReader::from_string(text);

    let err = reader.all_docs().unwrap_err();
    assert!(matches!(err, AbiflowError::MalformedSection(_)));
}

#[test]
fn successive_lookups_walk_documents_with_the_same_tag() {
    let text = "\
--- !Kpoints\n\
first: 1\n\
...\n\
--- !Kpoints\n\
second: 2\n\
...\n";
    let mut reader = YamlDocReader::from_string(text);

    let first = reader.next_doc_with_tag("!Kpoints").unwrap().unwrap();
    let second = reader.next_doc_with_tag("!Kpoints").unwrap().unwrap();
    let third = reader.next_doc_with_tag("!Kpoints").unwrap();

    assert!(first.contains("first"));
    assert!(second.contains("second"));
    assert!(third.is_none());
}

#[test]
fn docs_iteration_is_restartable() {
    let mut reader = YamlDocReader::from_string(LOG);

    let first_pass = reader.all_docs().unwrap();
    let second_pass = reader.all_docs().unwrap();

    assert_eq!(first_pass, second_pass);
}
