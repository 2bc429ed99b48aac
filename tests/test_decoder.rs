use memm::history::History;
use memm::train::{Trainer, TrainerConfig};
use memm::{Beam, Corpus, FeatureKey, Model};

const CORPUS: &str = "\
The_DT dog_NN barked_VBD ._.
A_DT cat_NN sat_VBD ._.
The_DT cat_NN barked_VBD ._.
A_DT dog_NN sat_VBD ._.
The_DT big_NN dog_NN sat_VBD ._.
";

fn trained() -> Model {
    let corpus = Corpus::parse_tagged(CORPUS.as_bytes()).unwrap();
    let mut trainer = Trainer::new(TrainerConfig::default());
    trainer.set("max_iterations", "30").unwrap();
    trainer.append_corpus(&corpus).unwrap();
    trainer.train().unwrap().0
}

const SENTENCES: [&[&str]; 5] = [
    &["The", "dog", "sat", "."],
    &["A", "big", "cat", "barked", "."],
    &["dog", "The", ".", "A", "sat", "cat"],
    &["unseen", "words", "only"],
    &["."],
];

#[test]
fn test_output_length_matches_input() {
    let model = trained();
    for beam in [Beam::Width(1), Beam::Width(3), Beam::Exhaustive] {
        let tagger = model.tagger(beam);
        for words in SENTENCES {
            assert_eq!(tagger.tag(words).unwrap().len(), words.len());
        }
    }
}

#[test]
fn test_wide_beam_matches_exhaustive() {
    let model = trained();
    // (|Y| + 1)^2 bounds the number of reachable (u, v) states
    let saturated = (model.num_tags() + 1).pow(2);
    let exhaustive = model.tagger(Beam::Exhaustive);
    for width in [saturated, saturated + 7, 1000] {
        let tagger = model.tagger(Beam::Width(width));
        for words in SENTENCES {
            assert_eq!(tagger.tag(words).unwrap(), exhaustive.tag(words).unwrap());
        }
    }
}

#[test]
fn test_decoding_is_deterministic() {
    let model = trained();
    let tagger = model.tagger(Beam::Width(2));
    for words in SENTENCES {
        assert_eq!(tagger.tag(words).unwrap(), tagger.tag(words).unwrap());
    }
}

#[test]
fn test_tag_ngrams_follow_output() {
    let model = trained();
    let template = *model.template();
    let tagger = model.tagger(Beam::Width(4));
    for words in SENTENCES {
        let tags = tagger.tag(words).unwrap();
        for k in 0..words.len() {
            let history = History::from_tagged(words, &tags, k);
            let instances = template.instances(&history);
            let prev = if k >= 1 { tags[k - 1] } else { "*" };
            let prev_prev = if k >= 2 { tags[k - 2] } else { "*" };
            assert!(instances.contains(&FeatureKey::TagTrigram {
                prev_prev: prev_prev.to_string(),
                prev: prev.to_string(),
                tag: tags[k].to_string(),
            }));
            assert!(instances.contains(&FeatureKey::TagBigram {
                prev: prev.to_string(),
                tag: tags[k].to_string(),
            }));
        }
    }
}

#[test]
fn test_trained_model_tags_training_sentences() {
    let model = trained();
    let corpus = Corpus::parse_tagged(CORPUS.as_bytes()).unwrap();
    let tagged = model.tagger(Beam::default()).tag_corpus(&corpus).unwrap();
    let evaluation = memm::Evaluation::compare(&corpus, &tagged).unwrap();
    assert!(evaluation.accuracy() > 0.9, "{}", evaluation);
}
