use memm::train::{LbfgsParams, LineSearchAlgorithm, Trainer, TrainerConfig};

#[test]
fn test_lambda_negative_validation() {
    let mut trainer = Trainer::new(TrainerConfig::default());

    // lambda must be non-negative
    let result = trainer.set("lambda", "-1.0");
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().to_string(), "lambda must be non-negative");

    // lambda = 0.0 should be allowed
    assert!(trainer.set("lambda", "0.0").is_ok());

    // lambda > 0.0 should be allowed
    assert!(trainer.set("lambda", "1.0").is_ok());
    assert_eq!(trainer.params().lambda(), 1.0);
}

#[test]
fn test_epsilon_validation() {
    let mut trainer = Trainer::new(TrainerConfig::default());
    assert!(trainer.set("epsilon", "0.0").is_ok());

    let result = trainer.set("epsilon", "-0.001");
    assert!(result.is_err());
    assert_eq!(
        result.unwrap_err().to_string(),
        "epsilon must be non-negative"
    );
}

#[test]
fn test_max_iterations_validation() {
    let mut trainer = Trainer::new(TrainerConfig::default());
    let result = trainer.set("max_iterations", "0");
    assert_eq!(
        result.unwrap_err().to_string(),
        "max_iterations must be at least 1"
    );
    assert!(trainer.set("max_iterations", "1").is_ok());
    assert_eq!(trainer.get("max_iterations").unwrap(), "1");
}

#[test]
fn test_max_linesearch_validation() {
    let mut params = LbfgsParams::default();
    assert!(params.set_max_linesearch(0).is_err());
    assert!(params.set_max_linesearch(40).is_ok());
    assert_eq!(params.max_linesearch(), 40);
}

#[test]
fn test_linesearch_names() {
    let mut trainer = Trainer::new(TrainerConfig::default());
    for (name, expected) in [
        ("MoreThuente", LineSearchAlgorithm::MoreThuente),
        ("Backtracking", LineSearchAlgorithm::BacktrackingArmijo),
        ("BacktrackingWolfe", LineSearchAlgorithm::BacktrackingWolfe),
        (
            "BacktrackingStrongWolfe",
            LineSearchAlgorithm::BacktrackingStrongWolfe,
        ),
    ] {
        trainer.set("linesearch", name).unwrap();
        assert_eq!(trainer.params().linesearch(), expected);
    }
    assert!(trainer.set("linesearch", "Newton").is_err());
}

#[test]
fn test_unknown_parameter() {
    let mut trainer = Trainer::new(TrainerConfig::default());
    assert_eq!(
        trainer.set("c1", "1.0").unwrap_err().to_string(),
        "unknown parameter: c1"
    );
    assert!(trainer.get("feature.minfreq").is_err());
}

#[test]
fn test_beam_and_template_parsing() {
    assert!("0".parse::<memm::Beam>().is_err());
    assert_eq!("12".parse::<memm::Beam>().unwrap(), memm::Beam::Width(12));
    assert_eq!(
        "Model1".parse::<memm::TemplateVersion>().unwrap(),
        memm::TemplateVersion::Model1
    );
    assert!("model3".parse::<memm::TemplateVersion>().is_err());
}
