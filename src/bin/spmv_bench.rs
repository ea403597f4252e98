//! Command-line harness for exercising the SpMV engine against a
//! generated banded matrix: run a single timed call, or sweep thread
//! models and report relative timings.

use clap::{Parser, Subcommand, ValueEnum};
use spmv_engine::{Config, CsrMatrix, Operation, PartitionKind, ThreadModel, TunableMatrix};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "spmv-bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one timed SpMV call and print elapsed time.
    Run {
        /// Matrix dimension (square, banded).
        #[arg(short, long, default_value_t = 1000)]
        size: usize,

        /// Half-bandwidth of the generated matrix.
        #[arg(short, long, default_value_t = 3)]
        bandwidth: usize,

        /// Threading model.
        #[arg(short, long, value_enum, default_value_t = ThreadModelArg::Single)]
        thread_model: ThreadModelArg,

        /// Number of worker threads / requested partitions.
        #[arg(short = 'n', long, default_value_t = 1)]
        threads: usize,

        /// Apply the transpose operator instead of the normal one.
        #[arg(long, default_value_t = false)]
        transpose: bool,
    },

    /// Sweep every thread model at a fixed size and report timings.
    Sweep {
        #[arg(short, long, default_value_t = 4096)]
        size: usize,

        #[arg(short, long, default_value_t = 4)]
        threads: usize,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ThreadModelArg {
    Single,
    PerCall,
    Pool,
    ForkJoin,
}

impl From<ThreadModelArg> for ThreadModel {
    fn from(v: ThreadModelArg) -> Self {
        match v {
            ThreadModelArg::Single => ThreadModel::Single,
            ThreadModelArg::PerCall => ThreadModel::PerCallThreads,
            ThreadModelArg::Pool => ThreadModel::ThreadPool,
            ThreadModelArg::ForkJoin => ThreadModel::ForkJoin,
        }
    }
}

fn banded_matrix(n: usize, band: usize) -> CsrMatrix<'static> {
    let mut triplets = Vec::new();
    for i in 0..n {
        for d in 0..=band {
            if i + d < n {
                triplets.push((i, i + d, 1.0 + d as f64));
            }
            if d > 0 && i >= d {
                triplets.push((i, i - d, 1.0 + d as f64));
            }
        }
    }
    CsrMatrix::from_triplets(&triplets, n, n).expect("generated banded matrix is well-formed")
}

fn run_once(size: usize, bandwidth: usize, thread_model: ThreadModel, threads: usize, transpose: bool) {
    let a = banded_matrix(size, bandwidth);
    let config = Config::with_threads(thread_model, threads, PartitionKind::OneD);
    let mut handle = TunableMatrix::new(a, config);
    if threads > 1 {
        handle.partition().expect("partitioning a well-formed matrix cannot fail");
    }

    let op = if transpose { Operation::Transpose } else { Operation::Normal };
    let x = vec![1.0; size];
    let mut y = vec![0.0; size];

    let start = Instant::now();
    handle.spmv(op, 1.0, &x, 0.0, &mut y).expect("spmv on a dimension-matched call cannot fail");
    let elapsed = start.elapsed();

    println!("size={size} bandwidth={bandwidth} thread_model={thread_model:?} threads={threads} op={op}");
    println!("elapsed: {:.3} ms", elapsed.as_secs_f64() * 1000.0);
}

fn sweep(size: usize, threads: usize) {
    println!("{:>14} {:>10} {:>12}", "thread_model", "threads", "elapsed_ms");
    for &thread_model in &[ThreadModel::Single, ThreadModel::PerCallThreads, ThreadModel::ThreadPool, ThreadModel::ForkJoin] {
        let a = banded_matrix(size, 4);
        let config = Config::with_threads(thread_model, threads, PartitionKind::OneD);
        let mut handle = TunableMatrix::new(a, config);
        handle.partition().expect("partitioning a well-formed matrix cannot fail");

        let x = vec![1.0; size];
        let mut y = vec![0.0; size];
        let start = Instant::now();
        handle.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).expect("spmv on a dimension-matched call cannot fail");
        let elapsed = start.elapsed();

        println!("{:>14?} {:>10} {:>12.3}", thread_model, threads, elapsed.as_secs_f64() * 1000.0);
    }
}

fn main() {
    spmv_engine::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { size, bandwidth, thread_model, threads, transpose } => {
            run_once(size, bandwidth, thread_model.into(), threads, transpose);
        }
        Commands::Sweep { size, threads } => sweep(size, threads),
    }
}
