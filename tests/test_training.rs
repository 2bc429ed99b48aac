use memm::history::History;
use memm::train::{Trainer, TrainerConfig, TrainingContext, WeightInit};
use memm::vocabulary::ClassStatistics;
use memm::{Corpus, Error, FeatureClass, Template, TemplateVersion, ThresholdPolicy, Vocabulary};

const CORPUS: &str = "\
The_DT dog_NN barked_VBD ._.
A_DT cat_NN sat_VBD ._.
The_DT cat_NN barked_VBD ._.
A_DT dog_NN sat_VBD ._.
";

fn corpus() -> Corpus {
    Corpus::parse_tagged(CORPUS.as_bytes()).unwrap()
}

#[test]
fn test_objective_non_increasing() {
    let mut trainer = Trainer::new(TrainerConfig::default());
    trainer.set("max_iterations", "50").unwrap();
    trainer.append_corpus(&corpus()).unwrap();
    let (model, report) = trainer.train().unwrap();

    let history = report.objective_history();
    assert!(!history.is_empty());
    for pair in history.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9, "objective went up: {:?}", pair);
    }
    assert!(report.objective <= history[0] + 1e-9);
    assert_eq!(model.weights().len(), model.vocabulary().len());
}

#[test]
fn test_seeded_initialization_is_reproducible() {
    let config = TrainerConfig {
        init: WeightInit::Normal {
            seed: 42,
            std_dev: 0.5,
        },
        ..TrainerConfig::default()
    };
    let run = || {
        let mut trainer = Trainer::new(config.clone());
        trainer.set("max_iterations", "10").unwrap();
        trainer.append_corpus(&corpus()).unwrap();
        trainer.train().unwrap().0
    };
    assert_eq!(run().weights(), run().weights());
}

#[test]
fn test_vocabulary_is_contiguous_and_deterministic() {
    let template = Template::default();
    let policy = ThresholdPolicy::default();
    let a = Vocabulary::build(&corpus(), &template, &policy).unwrap();
    let b = Vocabulary::build(&corpus(), &template, &policy).unwrap();
    assert_eq!(a, b);
    for (index, key) in a.keys().iter().enumerate() {
        assert_eq!(a.get(key), Some(index as u32));
    }
    // Class order is preserved along the index
    let classes: Vec<FeatureClass> = a.keys().iter().map(|k| k.class()).collect();
    let mut sorted = classes.clone();
    sorted.sort();
    assert_eq!(classes, sorted);
}

#[test]
fn test_cached_activations_match_template() {
    let corpus = corpus();
    let template = Template::new(TemplateVersion::Model1);
    let stats = ClassStatistics::collect(&corpus, &template).unwrap();
    let vocabulary = Vocabulary::from_statistics(&stats, &ThresholdPolicy::keep_all());
    let context = TrainingContext::prepare(&corpus, &template, &vocabulary, stats.tags()).unwrap();
    assert_eq!(context.num_positions(), corpus.num_tokens());

    let mut position = 0;
    for sentence in &corpus {
        for k in 0..sentence.len() {
            for (y, tag) in stats.tags().iter().enumerate() {
                let mut tags = sentence.tags.clone();
                tags[k] = tag.clone();
                let history = History::from_tagged(&sentence.words, &tags, k);
                assert_eq!(context.active(position, y), &template.activate(&history, &vocabulary)[..]);
            }
            position += 1;
        }
    }
}

#[test]
fn test_training_errors() {
    let trainer = Trainer::new(TrainerConfig::default());
    assert!(matches!(trainer.train(), Err(Error::EmptyCorpus)));

    let mut config = TrainerConfig::default();
    config.template.classes = memm::FeatureClasses::empty();
    let mut trainer = Trainer::new(config);
    trainer.append_corpus(&corpus()).unwrap();
    assert!(matches!(trainer.train(), Err(Error::NoFeatures)));
}

#[test]
fn test_malformed_corpus_is_fatal() {
    let result = Corpus::parse_tagged(b"The_DT dog barked_VBD\n");
    assert!(matches!(
        result,
        Err(Error::MalformedToken { line: 1, .. })
    ));
}
