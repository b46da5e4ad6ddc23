//! Generates a single pattern database and writes it to disk.

use std::{fs::File, path::PathBuf, process::ExitCode};

use clap::Parser;

use puzzle24::{
    pdb::{
        generate::generate, histogram, identify::identify, parallel::MAX_JOBS, verify::verify,
        PatternDb, Workers,
    },
    tileset::tileset::Tileset,
};

#[derive(Parser)]
#[command(about = "Generate a pattern database for a tile set")]
struct Args {
    /// The tile set, as a comma-separated tile list, e.g. 0,1,2,5,6.
    tileset: String,

    /// Directory to write the database to. The file is named after the
    /// tile list.
    #[arg(short = 'd', value_name = "pdbdir", default_value = ".")]
    pdbdir: PathBuf,

    /// Identify the database after generation (collapse the zero-aware
    /// layout to the additive one).
    #[arg(short = 'i')]
    identify: bool,

    /// Number of worker threads.
    #[arg(short = 'j', value_name = "n", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..=MAX_JOBS as i64))]
    jobs: u16,

    /// Verify the database before writing it.
    #[arg(short = 'v')]
    verify: bool,

    /// Print the distance histogram to stderr.
    #[arg(short = 'H')]
    histogram: bool,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let ts: Tileset = args.tileset.parse()?;
    let workers = Workers::new(usize::from(args.jobs));

    let mut pdb = PatternDb::allocate(ts)?;
    let rounds = generate(&mut pdb, &workers);
    log::info!("finished after {rounds} rounds");

    if args.identify {
        pdb = identify(pdb, &workers);
    }

    if args.verify {
        verify(&pdb, &workers)?;
        log::info!("verification passed");
    }

    if args.histogram {
        let hist = histogram::histogram(&pdb, &workers, false);
        for (dist, &count) in hist.iter().enumerate() {
            if count != 0 {
                eprintln!("{dist:3}: {count:20}");
            }
        }
    }

    let suffix = if args.identify { "ipdb" } else { "pdb" };
    let path = args.pdbdir.join(format!("{}.{suffix}", pdb.tileset()));
    log::info!("storing PDB to {}", path.display());

    let mut file = File::create(&path)?;
    pdb.store(&mut file)?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("genpdb: {e}");
            ExitCode::FAILURE
        }
    }
}
