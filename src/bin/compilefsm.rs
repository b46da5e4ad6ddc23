//! Compiles a finite state machine from a list of forbidden move
//! sequences.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read as _},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;

use puzzle24::fsm::compile::{add_moribund, compile};

#[derive(Parser)]
#[command(about = "Compile a move-pruning finite state machine from a loop list")]
struct Args {
    /// Output file for the compiled machine.
    output: PathBuf,

    /// Loop file to read, one half-loop per line as a comma-separated
    /// square list. Reads stdin if not given.
    #[arg(short = 'f', value_name = "loopfile")]
    loopfile: Option<PathBuf>,

    /// Compute moribundness tables and write the extended format.
    #[arg(short = 'm')]
    moribund: bool,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut fsm = match &args.loopfile {
        Some(path) => compile(BufReader::new(File::open(path)?))?,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            compile(text.as_bytes())?
        }
    };

    log::info!("compiled {} states", fsm.state_count());

    if args.moribund {
        add_moribund(&mut fsm);
    }

    let mut out = BufWriter::new(File::create(&args.output)?);
    fsm.write(&mut out, args.moribund)?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("compilefsm: {e}");
            ExitCode::FAILURE
        }
    }
}
