use bugscan::config::{DEFAULT_THREADS, DirectConfig, OutputFormat, Schemes, ServerList};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "bugscan", version, about = "Concurrent host reconnaissance scanner")]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Do not print the banner
    #[arg(short, long, global = true)]
    pub quiet: bool,
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a list of targets
    Scan(ScanArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Number of probes running at the same time
    #[arg(short, long, default_value_t = DEFAULT_THREADS, global = true)]
    pub threads: usize,
    #[command(subcommand)]
    pub mode: ScanMode,
}

#[derive(Debug, Subcommand)]
pub enum ScanMode {
    /// Connect straight to each target and group them by server
    Direct(DirectArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Args)]
pub struct DirectArgs {
    /// Domain list file, one host[:port] per line
    #[arg(short, long)]
    pub filename: PathBuf,
    /// `all` or a comma separated list of server names
    #[arg(short, long = "server-list", default_value = "all")]
    pub server_list: ServerList,
    /// Use https instead of http
    #[arg(long)]
    pub https: bool,
    /// Try both http and https
    #[arg(long)]
    pub both_schemes: bool,
    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
    /// HTTP method
    #[arg(short, long, default_value = "HEAD")]
    pub method: String,
    /// Write grouped results to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Format of the results file
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    pub format: FormatArg,
}

impl DirectArgs {
    pub fn to_config(&self) -> DirectConfig {
        DirectConfig {
            servers: self.server_list.clone(),
            schemes: Schemes::from_flags(self.https, self.both_schemes),
            method: self.method.clone(),
            timeout: Duration::from_secs(self.timeout),
            output: self.output.clone(),
            format: self.format.into(),
            ..Default::default()
        }
    }
}
