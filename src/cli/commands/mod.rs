use crate::config::{ProjectConfig, Settings, TemplateResolver};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod list;
pub mod run;
pub mod show;
pub mod validate;

use super::Output;

/// Directory, relative to the working tree, holding the project file.
pub const HOOKS_DIR: &str = "hooks";
pub const PROJECT_FILE: &str = "hookwarden.toml";

#[derive(Parser)]
#[command(
    name = "hookwarden",
    version = env!("CARGO_PKG_VERSION"),
    about = "Profile-based commit hooks with configurable checks and handlers",
    long_about = "hookwarden partitions a repository into profiles by path, runs the checks \
                  configured for each profile on pre- and post-commit, and reports the \
                  results through notification handlers."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use a custom settings file instead of the user and repository ones
    #[arg(long, value_name = "FILE", global = true, env = "HOOKWARDEN_SETTINGS")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the process of a hook against the current transaction
    Run(run::RunArgs),
    /// Validate a project configuration
    Validate(validate::ValidateArgs),
    /// Print the resolved project configuration
    Show(show::ShowArgs),
    /// List the available checks and handlers
    List(list::ListArgs),
}

/// Where to find the repository and its project configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Repository to operate on
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub repo: PathBuf,

    /// Project configuration file [default: <repo>/hooks/hookwarden.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.repo.join(HOOKS_DIR).join(PROJECT_FILE))
    }

    /// Read the project file and apply its template chain. The file's
    /// directory becomes `${hooks}`.
    pub fn load(&self, settings: &Settings) -> Result<ProjectConfig> {
        let path = self.config_path();
        let hooks_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let hooks_dir = hooks_dir
            .canonicalize()
            .with_context(|| format!("Hooks directory {} does not exist", hooks_dir.display()))?;
        debug!(config = %path.display(), hooks = %hooks_dir.display(), "Loading project configuration");

        TemplateResolver::new(settings.template_dirs.clone())
            .load(&path, &hooks_dir)
            .with_context(|| format!("Failed to load project configuration {}", path.display()))
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        let output = Output::new(self.verbose > 0, self.quiet);
        let settings = Settings::load_with_custom_config(self.settings.as_deref())?;
        debug!(?settings, "Loaded settings");

        match self.command {
            Commands::Run(args) => run::execute(args, &settings, &output),
            Commands::Validate(args) => validate::execute(args, &settings, &output),
            Commands::Show(args) => show::execute(args, &settings),
            Commands::List(args) => list::execute(args, &output),
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_config_path() {
        let args = ProjectArgs {
            repo: PathBuf::from("/srv/repo"),
            config: None,
        };
        assert_eq!(
            args.config_path(),
            PathBuf::from("/srv/repo/hooks/hookwarden.toml")
        );
    }
}
