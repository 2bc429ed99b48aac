use std::fs;

use memm::{Corpus, Error, Evaluation};

#[test]
fn test_evaluate_files() {
    let dir = tempfile::tempdir().unwrap();
    let gold_path = dir.path().join("gold.wtag");
    let predicted_path = dir.path().join("predicted.wtag");
    fs::write(&gold_path, "The_DT dog_NN barked_VBD ._.\nIt_PRP ran_VBD\n").unwrap();
    fs::write(&predicted_path, "The_DT dog_VB barked_VBD ._.\nIt_PRP ran_VBN\n").unwrap();

    let gold = Corpus::read_tagged(&gold_path).unwrap();
    let predicted = Corpus::read_tagged(&predicted_path).unwrap();
    let evaluation = Evaluation::compare(&gold, &predicted).unwrap();

    assert_eq!(evaluation.total(), 6);
    assert_eq!(evaluation.correct(), 4);
    assert_eq!(evaluation.count("NN", "VB"), 1);
    assert_eq!(evaluation.count("VBD", "VBN"), 1);
    assert_eq!(evaluation.count("VBD", "VBD"), 1);
    assert_eq!(evaluation.most_confused(1), vec![("NN", 1)]);
}

#[test]
fn test_line_count_mismatch_is_fatal() {
    let gold = Corpus::parse_tagged(b"a_X\nb_Y\n").unwrap();
    let predicted = Corpus::parse_tagged(b"a_X\n").unwrap();
    assert!(matches!(
        Evaluation::compare(&gold, &predicted),
        Err(Error::SentenceCountMismatch {
            gold: 2,
            predicted: 1
        })
    ));
}

#[test]
fn test_token_count_mismatch_is_fatal() {
    let gold = Corpus::parse_tagged(b"a_X\nb_Y c_Z\n").unwrap();
    let predicted = Corpus::parse_tagged(b"a_X\nb_Y\n").unwrap();
    let err = Evaluation::compare(&gold, &predicted).unwrap_err();
    assert!(matches!(
        err,
        Error::TokenCountMismatch {
            line: 2,
            gold: 2,
            predicted: 1
        }
    ));
}
