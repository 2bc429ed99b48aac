use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tempfile::NamedTempFile;

use memm::train::{Trainer, TrainerConfig, WeightInit};
use memm::{Beam, Corpus, Evaluation, Model, TemplateVersion};

#[derive(Parser, Debug)]
#[command(about = "Train and run a maximum-entropy Markov model part-of-speech tagger.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model on a word_tag corpus
    Train(TrainArgs),
    /// Tag a corpus with a trained model
    Tag(TagArgs),
    /// Compare a predicted corpus against a gold corpus
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// A tagged training corpus, one `word_tag ...` sentence per line
    #[arg(long)]
    corpus: PathBuf,

    /// The file to write the trained model to
    #[arg(long)]
    model: PathBuf,

    /// A JSON trainer configuration; the flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// The rule generation (model1 or model2)
    #[arg(long)]
    template: Option<TemplateVersion>,

    /// L2 regularization strength
    #[arg(long)]
    lambda: Option<f64>,

    /// Maximum number of L-BFGS iterations
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Start from N(0, 1) weights drawn with this seed instead of zeros
    #[arg(long)]
    seed: Option<u64>,

    /// Optimizer parameters as name=value, e.g. `--set epsilon=1e-6`
    #[arg(long = "set", value_name = "NAME=VALUE")]
    params: Vec<String>,
}

#[derive(Args, Debug)]
struct TagArgs {
    /// A trained model
    #[arg(long)]
    model: PathBuf,

    /// Sentences to tag; tags already present are ignored
    #[arg(long)]
    input: PathBuf,

    /// Where to write the tagged sentences
    #[arg(long)]
    output: PathBuf,

    /// Beam width, a positive integer or "exhaustive"
    #[arg(long, default_value = "50")]
    beam: Beam,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// The tagged reference corpus
    #[arg(long)]
    gold: PathBuf,

    /// The tagger output
    #[arg(long)]
    predicted: PathBuf,
}

fn train(args: TrainArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => TrainerConfig::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => TrainerConfig::default(),
    };
    if let Some(version) = args.template {
        config.template.version = version;
    }
    if let Some(lambda) = args.lambda {
        config.lbfgs.set_lambda(lambda)?;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.lbfgs.set_max_iterations(max_iterations)?;
    }
    if let Some(seed) = args.seed {
        config.init = WeightInit::Normal { seed, std_dev: 1.0 };
    }

    let corpus = Corpus::read_tagged(&args.corpus)
        .with_context(|| format!("failed to read corpus {}", args.corpus.display()))?;
    let mut trainer = Trainer::new(config);
    for param in &args.params {
        let (name, value) = param
            .split_once('=')
            .with_context(|| format!("expected NAME=VALUE, got {:?}", param))?;
        trainer.set(name.trim(), value)?;
    }
    trainer.append_corpus(&corpus)?;

    let (model, report) = trainer.train()?;
    log::info!(
        "{} iterations, final loss {:.6}{}",
        report.iterations.len(),
        report.objective,
        if report.converged { "" } else { " (not converged)" }
    );
    model.save(&args.model)?;
    Ok(())
}

fn tag(args: TagArgs) -> Result<()> {
    let model = Model::load(&args.model)
        .with_context(|| format!("failed to load model {}", args.model.display()))?;
    let input = Corpus::read_untagged(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let tagged = model.tagger(args.beam).tag_corpus(&input)?;
    write_atomically(&args.output, |writer| Ok(tagged.write_to(writer)?))
}

fn evaluate(args: EvaluateArgs) -> Result<()> {
    let gold = Corpus::read_tagged(&args.gold)
        .with_context(|| format!("failed to read {}", args.gold.display()))?;
    let predicted = Corpus::read_tagged(&args.predicted)
        .with_context(|| format!("failed to read {}", args.predicted.display()))?;
    let evaluation = Evaluation::compare(&gold, &predicted)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write!(out, "{}", evaluation)?;
    Ok(())
}

/// Write through a temporary file next to `path` and rename it into place
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(file.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }
    file.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train(args) => train(args),
        Command::Tag(args) => tag(args),
        Command::Evaluate(args) => evaluate(args),
    }
}
