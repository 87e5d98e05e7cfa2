//! strsvm command line interface
//!
//! Cross-validates classifiers against a SQLite sample store, classifies
//! single queries with a saved model and inspects model files.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};
use std::path::PathBuf;
use std::process;
use strsvm::persistence::SerializableModel;
use strsvm::{
    sidecar_path, CrossValidator, DataType, EncodedValue, Encoder, KernelType, LabelMap,
    ProblemParams, Result, SVMError, Sample, Session, SplitPolicy, SqliteSource,
};

#[derive(Parser)]
#[command(name = "strsvm")]
#[command(about = "SVM classification of strings, token sequences and count vectors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a labeled corpus, train (or reuse) a model and score it
    Crossval(CrossvalArgs),
    /// Classify one query with a saved model
    Predict(PredictArgs),
    /// Display model information
    Info(InfoArgs),
}

/// Problem parameters; flags override values from `--params`
#[derive(Args)]
struct ParamArgs {
    /// JSON file with problem parameters
    #[arg(long)]
    params: Option<PathBuf>,

    /// Data representation: vector, string or tokens
    #[arg(long, value_parser = parse_data_type)]
    data_type: Option<DataType>,

    /// Kernel: linear, poly, rbf, edit or subseq
    #[arg(long, value_parser = parse_kernel)]
    kernel: Option<KernelType>,

    /// Regularization parameter C
    #[arg(short = 'C', long)]
    c: Option<f64>,

    /// Kernel width, or decay for the subsequence kernel
    #[arg(long)]
    gamma: Option<f64>,

    /// Polynomial degree, or subsequence length
    #[arg(long)]
    degree: Option<u32>,

    /// Polynomial offset
    #[arg(long)]
    coef0: Option<f64>,
}

impl ParamArgs {
    fn resolve(&self) -> Result<ProblemParams> {
        self.resolve_over(ProblemParams::default())
    }

    /// Apply `--params` and the flags on top of `base`
    fn resolve_over(&self, base: ProblemParams) -> Result<ProblemParams> {
        let mut params = match &self.params {
            Some(path) => ProblemParams::from_file(path)?,
            None => base,
        };
        if let Some(data_type) = self.data_type {
            params.data_type = data_type;
        }
        if let Some(kernel) = self.kernel {
            params.kernel = kernel;
        }
        if let Some(c) = self.c {
            params.c = c;
        }
        if let Some(gamma) = self.gamma {
            params.gamma = gamma;
        }
        if let Some(degree) = self.degree {
            params.degree = degree;
        }
        if let Some(coef0) = self.coef0 {
            params.coef0 = coef0;
        }
        params.validate()?;
        Ok(params)
    }
}

fn parse_data_type(s: &str) -> std::result::Result<DataType, String> {
    s.parse().map_err(|e: SVMError| e.to_string())
}

fn parse_kernel(s: &str) -> std::result::Result<KernelType, String> {
    s.parse().map_err(|e: SVMError| e.to_string())
}

#[derive(Args)]
struct CrossvalArgs {
    /// SQLite database holding the samples
    #[arg(long)]
    db: PathBuf,

    /// Column holding the labels to learn
    #[arg(long)]
    label_column: String,

    /// Proportion of each label used for training
    #[arg(long, default_value = "0.8")]
    training: f64,

    /// Proportion of each label used at all
    #[arg(long, default_value = "1.0")]
    total: f64,

    /// SQL appended to the sample query, e.g. "WHERE os = 'linux'"
    #[arg(long = "where", default_value = "")]
    constraints: String,

    /// Table holding the samples
    #[arg(long, default_value = "data")]
    table: String,

    /// Directory where models are kept and reused
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,

    /// Seed for reproducible splits
    #[arg(long)]
    seed: Option<u64>,

    /// Train on one sample fewer per label, as older tooling did
    #[arg(long)]
    legacy_split: bool,

    #[command(flatten)]
    params: ParamArgs,
}

#[derive(Args)]
struct PredictArgs {
    /// Saved model file
    #[arg(short, long)]
    model: PathBuf,

    /// Raw string query
    #[arg(long)]
    text: Option<String>,

    /// Whitespace-separated token query, e.g. "3 1 4"
    #[arg(long)]
    tokens: Option<String>,

    /// Largest token of the training corpus, for vector models
    #[arg(long)]
    max_token: Option<u32>,

    /// Checked against the parameters stored in the model
    #[command(flatten)]
    params: ParamArgs,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Crossval(args) => crossval_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn crossval_command(args: CrossvalArgs) -> Result<()> {
    let params = args.params.resolve()?;
    info!(
        "Cross-validating {} on {:?} with {} kernel over {} data",
        args.label_column, args.db, params.kernel, params.data_type
    );

    let source = SqliteSource::new(&args.db).with_table(args.table);
    let policy = if args.legacy_split {
        SplitPolicy::Legacy
    } else {
        SplitPolicy::Exact
    };
    let mut validator = CrossValidator::new(source, params)?
        .with_model_dir(&args.model_dir)
        .with_split_policy(policy);
    if let Some(seed) = args.seed {
        validator = validator.with_seed(seed);
    }

    let report = validator.cross_validate(
        &args.label_column,
        args.training,
        args.total,
        &args.constraints,
    )?;
    println!("{report}");
    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let session = Session::open(&args.model)?;
    let params = session.params();
    let requested = args.params.resolve_over(params.clone())?;
    if requested != *params {
        return Err(SVMError::InvalidParameter(format!(
            "Model {} was trained with {}, not {}",
            args.model.display(),
            params,
            requested
        )));
    }

    let value = match params.data_type {
        DataType::String => EncodedValue::Text(args.text.ok_or_else(|| {
            SVMError::InvalidParameter("--text is required for string models".to_string())
        })?),
        DataType::Tokens | DataType::Vector => {
            let tokens = args.tokens.ok_or_else(|| {
                SVMError::InvalidParameter(format!(
                    "--tokens is required for {} models",
                    params.data_type
                ))
            })?;
            let sample = Sample::parse("", args.text.as_deref().unwrap_or(""), &tokens)?;
            let max_token = match (args.max_token, params.data_type) {
                (Some(max_token), _) => max_token,
                (None, DataType::Vector) => {
                    warn!("No --max-token given, sizing the vector from the query");
                    sample.max_token().unwrap_or(0)
                }
                (None, _) => sample.max_token().unwrap_or(0),
            };
            Encoder::new(params.data_type, max_token).encode(&sample)?
        }
    };

    println!("{}", session.predict(&value)?);
    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    let model = SerializableModel::load_from_file(&args.model)?
        .ok_or_else(|| SVMError::ModelNotFound(args.model.clone()))?;
    println!("{}", model.summary());

    let labels_path = sidecar_path(&args.model);
    if labels_path.exists() {
        let labels = LabelMap::load(&labels_path)?;
        println!("Labels:");
        for (label, code) in labels.iter() {
            println!("  {code}: {label}");
        }
    } else {
        warn!("No label file at {:?}", labels_path);
    }
    Ok(())
}
