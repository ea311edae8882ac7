use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sot_core::{Config, DEFAULT_CONFIG_FILE};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod input;
mod shutdown;

#[derive(Parser)]
#[command(name = "sot", version)]
#[command(about = "Sea of Thieves entity tracker")]
struct Cli {
    /// Configuration file; defaults are used if it does not exist
    #[arg(short, long, global = true, env = "SOT_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Target executable name
    #[arg(long, global = true)]
    exe: Option<String>,

    /// Attach to this process id instead of searching by name
    #[arg(long, global = true)]
    pid: Option<u32>,

    /// Offset table (JSON)
    #[arg(long, global = true)]
    offsets: Option<PathBuf>,

    /// Build key in a versioned offset table
    #[arg(long, global = true)]
    build: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Track entities and stream frames as JSON lines (default)
    Run(RunArgs),
    /// Resolve the world, object and name anchors
    Anchors {
        /// Write a diagnostic dump with memory samples to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ignore the anchor cache and scan the image
        #[arg(long)]
        rescan: bool,
    },
    /// Enumerate the level once and list its named actors
    Entities {
        /// Only list actors whose raw name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Resolve one name identity through the global name table
    Name { identity: i32 },
    /// Dump raw memory in hex
    Hexdump {
        /// Address (hex, 0x prefix optional)
        address: String,

        #[arg(default_value_t = 256)]
        size: usize,

        /// Show the ASCII column
        #[arg(short, long)]
        ascii: bool,
    },
}

#[derive(Args, Default)]
pub struct RunArgs {
    /// Append frames to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Screen width override
    #[arg(long)]
    pub width: Option<u32>,

    /// Screen height override
    #[arg(long)]
    pub height: Option<u32>,

    /// Do not read or write the anchor cache
    #[arg(long)]
    pub no_cache: bool,
}

impl Cli {
    /// Load the config file and apply command-line overrides on top.
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(&self.config)?;
        if let Some(exe) = &self.exe {
            config.target.exe_name = exe.clone();
        }
        if let Some(build) = &self.build {
            config.target.build = Some(build.clone());
        }
        if let Some(offsets) = &self.offsets {
            config.paths.offsets = offsets.clone();
        }
        if let Some(Command::Run(run)) = &self.command {
            if let Some(width) = run.width {
                config.screen.width = width;
            }
            if let Some(height) = run.height {
                config.screen.height = height;
            }
            if run.no_cache {
                config.paths.anchor_cache = None;
            }
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries frames
    let directive = if cli.verbose { "sot=debug" } else { "sot=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    let config = cli.load_config()?;
    debug!("Effective config: {:?}", config);

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => commands::run::run(&config, cli.pid, args.output.as_deref()),
        Command::Anchors { output, rescan } => {
            commands::anchors::run(&config, cli.pid, output.as_deref(), rescan)
        }
        Command::Entities { filter } => {
            commands::entities::run(&config, cli.pid, filter.as_deref())
        }
        Command::Name { identity } => commands::name::run(&config, cli.pid, identity),
        Command::Hexdump {
            address,
            size,
            ascii,
        } => commands::hexdump::run(&config, cli.pid, &address, size, ascii),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::try_parse_from(["sot"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "sot",
            "--config",
            "/nonexistent/sot.toml",
            "--exe",
            "Other.exe",
            "--build",
            "steam",
            "run",
            "--width",
            "2560",
            "--no-cache",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.target.exe_name, "Other.exe");
        assert_eq!(config.target.build.as_deref(), Some("steam"));
        assert_eq!(config.screen.width, 2560);
        assert_eq!(config.screen.height, 0);
        assert!(config.paths.anchor_cache.is_none());
    }

    #[test]
    fn test_hexdump_arguments() {
        let cli = Cli::try_parse_from(["sot", "hexdump", "0x1000", "64", "--ascii"]).unwrap();
        let Some(Command::Hexdump {
            address,
            size,
            ascii,
        }) = cli.command
        else {
            panic!("expected hexdump");
        };
        assert_eq!(address, "0x1000");
        assert_eq!(size, 64);
        assert!(ascii);
    }
}
