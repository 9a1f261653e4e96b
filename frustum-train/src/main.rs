//! Training front end for the frustum point classifier.
//!
//! Two subcommands:
//! - `preprocess`: normalize a directory of raw frustum files into a
//!   preprocessed copy (rotate to center, standardize per frustum).
//! - `train`: run the training input pipeline for a class and set of
//!   hyperparameters: load both splits, compute and persist the global
//!   normalization statistics, then draw every epoch's resampled and
//!   augmented batches at the boundary where a classifier would consume
//!   them.

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use frustum_data::{
    list_frustum_files, load_frustum, rotate_to_center, scale_standard, write_frustum,
};
use frustum_train::{
    BatchStream, Prefetcher, RaggedDataset, data_and_label_split, load_split,
    preprocess_raw_train, preprocess_raw_val, steps_per_epoch,
};

/// Number of batches computed ahead of the consumer.
const PREFETCH_DEPTH: usize = 4;

#[derive(Parser)]
#[command(name = "frustum-train")]
#[command(about = "Input pipeline for training a per-point frustum classifier", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw frustum files into a preprocessed copy
    Preprocess {
        /// Directory containing raw frustum files
        input: PathBuf,
        /// Target directory for the preprocessed files
        output: PathBuf,
    },
    /// Run the training input pipeline
    Train(TrainArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Directory containing training frustum files
    train: PathBuf,

    /// Directory containing validation frustum files
    val: PathBuf,

    /// Number of points to sample from each frustum
    #[arg(short = 'n', long, default_value_t = 768)]
    num_points: usize,

    /// Number of epochs to draw
    #[arg(short, long, default_value_t = 120)]
    epochs: usize,

    /// Number of samples per batch
    #[arg(short, long, default_value_t = 32)]
    batch: usize,

    /// Learning rate handed to the downstream classifier
    #[arg(short, long, default_value_t = 3e-4)]
    learning_rate: f32,

    /// Object class to train on
    #[arg(long, value_enum, default_value_t = ClassName::Person)]
    class_name: ClassName,

    /// Identifier for this run; class name plus timestamp if left empty
    #[arg(long)]
    run_id: Option<String>,

    /// Seed for resampling and augmentation randomness
    #[arg(long)]
    seed: Option<u64>,

    /// Cap on the number of frustums to load per split (0 = no cap)
    #[arg(long)]
    sample_limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ClassName {
    Person,
    Car,
}

impl ClassName {
    fn as_str(self) -> &'static str {
        match self {
            ClassName::Person => "person",
            ClassName::Car => "car",
        }
    }
}

impl std::fmt::Display for ClassName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Preprocess { input, output } => run_preprocess(&input, &output),
        Commands::Train(args) => run_train(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Rotate and standardize every frustum file under `input`, writing the
/// result under `output` with the same filename.
///
/// Statistics here are per frustum (non-cache mode); this command prepares
/// standalone normalized copies and plays no part in train/val statistics.
fn run_preprocess(input: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    let files = list_frustum_files(input)?;
    if files.is_empty() {
        return Err(format!("no frustum files found under {}", input.display()).into());
    }
    std::fs::create_dir_all(output)?;

    for path in &files {
        let (frustum, class_name) = load_frustum(path)?;
        let rotated =
            rotate_to_center(&frustum).map_err(|e| format!("{}: {e}", path.display()))?;
        let (scaled, _) =
            scale_standard(&rotated).map_err(|e| format!("{}: {e}", path.display()))?;

        let file_name = path.file_name().ok_or("frustum file without a name")?;
        write_frustum(&output.join(file_name), &scaled, &class_name)?;
    }

    info!(count = files.len(), output = %output.display(), "preprocessing finished");
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<(), Box<dyn Error>> {
    if !args.train.is_dir() {
        return Err(format!("invalid train path: {}", args.train.display()).into());
    }
    if !args.val.is_dir() {
        return Err(format!("invalid validation path: {}", args.val.display()).into());
    }

    let class_name = args.class_name.as_str();

    let raw_train = load_split(&args.train, class_name, args.sample_limit)?;
    info!(samples = raw_train.len(), "raw training data loaded");

    let (preprocessed, stats) = preprocess_raw_train(&raw_train)?;
    let (train_x, train_y) = data_and_label_split(&preprocessed);
    info!(x = train_x.len(), y = train_y.len(), "preprocessed training data");
    info!(scale = ?stats.scale, mean = ?stats.mean, "global training statistics");

    let raw_val = load_split(&args.val, class_name, args.sample_limit)?;
    info!(samples = raw_val.len(), "raw validation data loaded");

    let (val_x, val_y) = preprocess_raw_val(&raw_val, &stats)?;
    info!(x = val_x.len(), y = val_y.len(), "preprocessed validation data");

    let steps = steps_per_epoch(train_x.len(), args.batch);
    info!(
        steps_per_epoch = steps,
        batch_size = args.batch,
        num_points = args.num_points,
        epochs = args.epochs,
        learning_rate = args.learning_rate,
        "pipeline configuration"
    );

    // The statistics must outlive this run: any model trained on these
    // batches needs the same pair to preprocess its inference inputs.
    let run_id = args.run_id.unwrap_or_else(|| default_run_id(class_name));
    let run_dir = Path::new("models").join(&run_id);
    std::fs::create_dir_all(&run_dir)?;
    let stats_path = run_dir.join("normalization.json");
    serde_json::to_writer_pretty(BufWriter::new(File::create(&stats_path)?), &stats)?;
    info!(path = %stats_path.display(), "persisted normalization statistics");

    let train_rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let val_rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_os_rng(),
    };

    let train_data = Arc::new(RaggedDataset::new(train_x, train_y));
    let val_data = Arc::new(RaggedDataset::new(val_x, val_y));

    let stream = BatchStream::new(
        train_data,
        args.num_points,
        args.batch,
        args.epochs,
        true,
        train_rng,
    );
    let mut batches = Prefetcher::new(stream, PREFETCH_DEPTH);

    for epoch in 0..args.epochs {
        let mut points = 0usize;
        let mut foreground = 0usize;
        for _ in 0..steps {
            let batch = batches.next().ok_or("batch stream ended early")??;
            points += batch.len() * args.num_points;
            foreground += batch
                .labels
                .iter()
                .flatten()
                .filter(|&&label| label > 0.5)
                .count();
        }
        info!(
            epoch = epoch + 1,
            steps,
            foreground_fraction = foreground as f32 / points as f32,
            "epoch drawn"
        );
    }

    // One pass over validation, resampled but never augmented.
    let val_stream = BatchStream::new(val_data, args.num_points, args.batch, 1, false, val_rng);
    let mut val_batches = 0usize;
    for batch in Prefetcher::new(val_stream, PREFETCH_DEPTH) {
        batch?;
        val_batches += 1;
    }
    info!(batches = val_batches, "validation batches drawn");

    info!(
        run_id = %run_id,
        scale = ?stats.scale,
        mean = ?stats.mean,
        "run complete"
    );
    Ok(())
}

fn default_run_id(class_name: &str) -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{class_name}-{seconds}")
}
