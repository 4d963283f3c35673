use super::*;

fn record(question: &str, answer: &str) -> FaqRecord {
    FaqRecord {
        question: question.to_string(),
        answer: answer.to_string(),
        category: "Billing".to_string(),
    }
}

#[test]
fn identical_records_are_consistent() {
    let records = vec![record("A?", "a"), record("B?", "b")];
    let report = check_against_corpus(&records, &records);

    assert!(report.is_consistent);
    assert!(!report.requires_rebuild());
    assert!(report.changes.is_empty());
    assert_eq!(report.indexed_records, 2);
    assert_eq!(report.corpus_records, 2);
}

#[test]
fn answer_edit_does_not_require_rebuild() {
    let indexed = vec![record("A?", "a")];
    let corpus = vec![record("A?", "a, revised")];
    let report = check_against_corpus(&indexed, &corpus);

    assert!(!report.is_consistent);
    assert!(!report.requires_rebuild());
    assert_eq!(
        report.changes,
        vec![RecordChange::MetadataChanged {
            position: 0,
            question: "A?".to_string()
        }]
    );
}

#[test]
fn category_move_is_metadata_change() {
    let indexed = vec![record("A?", "a")];
    let mut moved = record("A?", "a");
    moved.category = "Account".to_string();

    let report = check_against_corpus(&indexed, &[moved]);
    assert!(matches!(
        report.changes.as_slice(),
        [RecordChange::MetadataChanged { position: 0, .. }]
    ));
}

#[test]
fn question_edit_requires_rebuild() {
    let indexed = vec![record("A?", "a"), record("B?", "b")];
    let corpus = vec![record("A?", "a"), record("Bee?", "b")];
    let report = check_against_corpus(&indexed, &corpus);

    assert!(report.requires_rebuild());
    assert_eq!(
        report.changes,
        vec![RecordChange::QuestionChanged {
            position: 1,
            indexed: "B?".to_string(),
            current: "Bee?".to_string()
        }]
    );
}

#[test]
fn appended_and_removed_records() {
    let short = vec![record("A?", "a")];
    let long = vec![record("A?", "a"), record("B?", "b"), record("C?", "c")];

    let grown = check_against_corpus(&short, &long);
    let added: Vec<usize> = grown.changes.iter().map(RecordChange::position).collect();
    assert_eq!(added, vec![1, 2]);
    assert!(
        grown
            .changes
            .iter()
            .all(|change| matches!(change, RecordChange::Added { .. }))
    );

    let shrunk = check_against_corpus(&long, &short);
    assert_eq!(
        shrunk.changes,
        vec![
            RecordChange::Removed {
                position: 1,
                question: "B?".to_string()
            },
            RecordChange::Removed {
                position: 2,
                question: "C?".to_string()
            },
        ]
    );
    assert!(shrunk.requires_rebuild());
}

#[test]
fn middle_insertion_shifts_positions() {
    let indexed = vec![record("A?", "a"), record("C?", "c")];
    let corpus = vec![record("A?", "a"), record("B?", "b"), record("C?", "c")];
    let report = check_against_corpus(&indexed, &corpus);

    assert_eq!(report.changes.len(), 2);
    assert!(matches!(
        report.changes[0],
        RecordChange::QuestionChanged { position: 1, .. }
    ));
    assert!(matches!(
        report.changes[1],
        RecordChange::Added { position: 2, .. }
    ));
}
