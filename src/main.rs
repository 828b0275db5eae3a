use anyhow::{ensure, Context as _};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rforest::{GridSearch, RandomForestOptions, Table};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "rforest")]
#[command(about = "Train and evaluate a random forest regressor on a CSV table")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility (random when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel training (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Debug, Args)]
struct DataArgs {
    /// Path to the input CSV file
    #[arg(long)]
    data: PathBuf,

    /// Name of the target column
    #[arg(long, default_value = "medv")]
    target: String,

    /// Fraction of rows held out for testing
    #[arg(long, default_value_t = 0.5)]
    test_ratio: f64,

    /// Build trees on worker threads
    #[arg(long, default_value_t = false)]
    parallel: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train one forest and report train and test MSE
    Train {
        #[command(flatten)]
        data: DataArgs,

        /// Number of trees
        #[arg(long, default_value_t = 20)]
        trees: usize,

        /// Number of split levels per tree
        #[arg(long, default_value_t = 5)]
        max_depth: usize,

        /// Write the first tree to stderr
        #[arg(long, default_value_t = false)]
        dump_tree: bool,
    },

    /// Report test MSE for every combination of forest size and depth
    Grid {
        #[command(flatten)]
        data: DataArgs,

        /// Comma-separated forest sizes
        #[arg(long, value_delimiter = ',', required = true)]
        sizes: Vec<usize>,

        /// Comma-separated tree depths
        #[arg(long, value_delimiter = ',', required = true)]
        depths: Vec<usize>,
    },
}

#[derive(Debug, Serialize)]
struct TrainReport {
    trees: usize,
    max_depth: usize,
    train_rows: usize,
    test_rows: usize,
    train_mse: f64,
    test_mse: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let seed = cli.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!(seed, "seeded");

    match cli.command {
        Command::Train {
            data,
            trees,
            max_depth,
            dump_tree,
        } => {
            let dataset = rforest::io::read_csv_path(&data.data, &data.target)
                .with_context(|| format!("failed to load {:?}", data.data))?;
            let (train, test) = split(&dataset.table(), &data, seed)?;

            let forest = forest_options(&data, seed)
                .trees(trees)
                .max_depth(max_depth)
                .fit(&train)?;
            let report = TrainReport {
                trees,
                max_depth,
                train_rows: train.rows_len(),
                test_rows: test.rows_len(),
                train_mse: rforest::mean_squared_error(&train, &forest)
                    .context("failed to evaluate the training set")?,
                test_mse: rforest::mean_squared_error(&test, &forest)
                    .context("failed to evaluate the test set")?,
            };

            if dump_tree {
                if let Some(tree) = forest.trees().first() {
                    eprint!("{}", tree);
                }
            }
            serde_json::to_writer_pretty(std::io::stdout().lock(), &report)?;
            println!();
        }
        Command::Grid {
            data,
            sizes,
            depths,
        } => {
            let dataset = rforest::io::read_csv_path(&data.data, &data.target)
                .with_context(|| format!("failed to load {:?}", data.data))?;
            let (train, test) = split(&dataset.table(), &data, seed)?;

            let grid = GridSearch::run(
                &sizes,
                &depths,
                &train,
                &test,
                &forest_options(&data, seed),
            )?;
            serde_json::to_writer_pretty(std::io::stdout().lock(), &grid)?;
            println!();
        }
    }

    Ok(())
}

fn split<'a>(
    table: &Table<'a>,
    data: &DataArgs,
    seed: u64,
) -> anyhow::Result<(Table<'a>, Table<'a>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (train, test) = table.train_test_split(data.test_ratio, &mut rng)?;
    ensure!(!train.is_empty(), "test ratio {} leaves no training rows", data.test_ratio);
    ensure!(!test.is_empty(), "test ratio {} leaves no test rows", data.test_ratio);
    info!(train = train.rows_len(), test = test.rows_len(), "split dataset");
    Ok((train, test))
}

fn forest_options(data: &DataArgs, seed: u64) -> RandomForestOptions {
    // The split consumes `seed` itself.
    RandomForestOptions::new()
        .seed(seed.wrapping_add(1))
        .parallel(data.parallel)
}
