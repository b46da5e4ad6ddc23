//! The search driver: solves puzzles from stdin with a PDB catalogue.
//!
//! For every input line holding a puzzle in comma-separated tile notation,
//! one line is written to stdout: the puzzle, the solution length, the
//! number of expanded nodes, and the move sequence as comma-separated
//! destination squares.

use std::{
    fs::File,
    io::{self, BufRead as _, Write as _},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;

use puzzle24::{
    catalogue::Catalogue,
    fsm::Fsm,
    pdb::{parallel::MAX_JOBS, Workers},
    puzzle::puzzle::Puzzle,
    search::ida::search_ida,
};

#[derive(Parser)]
#[command(about = "Find optimal 24-puzzle solutions using pattern databases")]
struct Args {
    /// Catalogue file describing the heuristics to use.
    catalogue: PathBuf,

    /// Directory to load PDB files from and store generated ones to.
    #[arg(short = 'd', value_name = "pdbdir")]
    pdbdir: Option<PathBuf>,

    /// Treat the catalogue's PDBs as identified (collapse zero-aware
    /// databases to the additive layout).
    #[arg(short = 'i')]
    identify: bool,

    /// Number of worker threads for PDB generation.
    #[arg(short = 'j', value_name = "n", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..=MAX_JOBS as i64))]
    jobs: u16,

    /// Prune move sequences with this finite state machine.
    #[arg(short = 'm', value_name = "fsmfile")]
    fsmfile: Option<PathBuf>,
}

fn run(args: &Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let workers = Workers::new(usize::from(args.jobs));
    let cat = Catalogue::load(
        &args.catalogue,
        args.pdbdir.as_deref(),
        args.identify,
        &workers,
    )?;

    let loaded;
    let fsm: &Fsm = match &args.fsmfile {
        Some(path) => {
            let mut file = File::open(path)?;
            loaded = Fsm::load(&mut file)?;
            &loaded
        }
        None => Fsm::simple(),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failed = false;

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let p: Puzzle = match line.trim().parse() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("cannot parse puzzle: {e}");
                failed = true;
                continue;
            }
        };

        if !p.is_solvable() {
            writeln!(out, "{p} unsolvable")?;
            continue;
        }

        let result = search_ida(&cat, fsm, &p, None);
        match result.path {
            Some(path) if path.is_empty() => writeln!(out, "{p} 0 {}", result.expanded)?,
            Some(path) => writeln!(out, "{p} {} {} {path}", path.len(), result.expanded)?,
            None => {
                eprintln!("{p}: no path found");
                failed = true;
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("solve: {e}");
            ExitCode::FAILURE
        }
    }
}
