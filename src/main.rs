// Headless front end: every run is a batch job over the files given with -i.

use std::process::ExitCode;

use clap::Parser;

use pixelfe::cli::{self, CliArgs};
use pixelfe::logger;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Initialize session log (overwrites previous session log)
    logger::init();
    logger::set_echo_stderr(args.verbose);

    cli::run(args)
}
