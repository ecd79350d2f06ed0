mod cli;
mod commands;
mod config;
mod reconcile;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, KubeArgs};
use config::Settings;
use kubekit::Manifest;
use state::StateFile;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub settings: Settings,
}

impl Context {
    /// Where resource records are kept
    pub fn state_path(&self) -> Result<PathBuf> {
        self.settings.state_path()
    }

    /// Load the state file
    pub fn load_state(&self) -> Result<(StateFile, PathBuf)> {
        let path = self.state_path()?;
        let state = StateFile::load(&path)?;
        Ok((state, path))
    }

    /// A manifest handler wired to the configured kubectl
    pub fn manifest(&self) -> Result<Manifest> {
        Ok(Manifest::with_runner(self.settings.runner()?))
    }
}

impl From<KubeArgs> for Settings {
    fn from(args: KubeArgs) -> Self {
        Self {
            kubectl: args.kubectl,
            kubeconfig: args.kubeconfig,
            context: args.context,
            timeout_secs: args.timeout,
            state_file: args.state,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Err(err) = run(cli) {
        commands::report(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "kmanifest", &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load()?.merge(Settings::from(cli.kube));
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        settings,
    };

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, &args.file, args.name.as_deref()),
        Command::Refresh { name } => commands::refresh::run(&ctx, name.as_deref()),
        Command::Destroy { name, yes } => commands::destroy::run(&ctx, &name, yes),
        Command::Import { name, selflink } => commands::import::run(&ctx, &name, &selflink),
        Command::Diff(args) => commands::inspect::diff(&ctx, &args.file, args.name.as_deref()),
        Command::Show { name } => commands::inspect::show(&ctx, name.as_deref()),
        Command::Normalize { file } => commands::inspect::normalize(&file),
        Command::Completions { .. } => Ok(()),
    }
}
