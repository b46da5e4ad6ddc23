//! Emits random solvable puzzle instances, one per line.

use std::process::ExitCode;

use clap::Parser;

use puzzle24::random::{random_puzzle, set_seed};

#[derive(Parser)]
#[command(about = "Generate random solvable 24-puzzle instances")]
struct Args {
    /// How many instances to generate.
    #[arg(short = 'n', value_name = "count", default_value_t = 1)]
    count: u64,

    /// Seed for the random number generator; runs with the same seed
    /// produce the same instances.
    #[arg(short = 's', value_name = "seed")]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    if let Some(seed) = args.seed {
        set_seed(seed);
    }

    for _ in 0..args.count {
        println!("{}", random_puzzle());
    }

    ExitCode::SUCCESS
}
