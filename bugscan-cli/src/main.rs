use clap::Parser;
use color_eyre::eyre::Result;

mod cli;
mod direct;
mod logging;

use cli::{Cli, Command, ScanMode};

fn print_banner() {
    println!("------------------------------------------------------------");
    println!("██████  ██    ██  ██████  ███████  ██████  █████  ███    ██ ");
    println!("██   ██ ██    ██ ██       ██      ██      ██   ██ ████   ██ ");
    println!("██████  ██    ██ ██   ███ ███████ ██      ███████ ██ ██  ██ ");
    println!("██   ██ ██    ██ ██    ██      ██ ██      ██   ██ ██  ██ ██ ");
    println!("██████   ██████   ██████  ███████  ██████ ██   ██ ██   ████ ");
    println!("                  VERSION:            {:<22}", env!("CARGO_PKG_VERSION"));
    println!("------------------------------------------------------------");
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    logging::initialize_logging(cli.verbose)?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    if !cli.quiet {
        print_banner();
    }

    match cli.command {
        Command::Scan(scan) => match scan.mode {
            ScanMode::Direct(args) => {
                let config = args.to_config();
                direct::run(scan.threads, &args.filename, config).await
            }
        },
    }
}
