use super::ProjectArgs;
use crate::cli::Output;
use crate::config::{ConfigValidator, Hook, Settings, ValidationMode};
use crate::module::Registry;
use crate::runner::{ProcessRunner, RunResult};
use crate::transaction::{Changeset, GitTransaction};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Hook to run: precommit or postcommit
    pub hook: Hook,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Run only this profile
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Read the commit message from FILE (git passes it to commit-msg hooks)
    #[arg(long, value_name = "FILE")]
    pub message_file: Option<PathBuf>,

    /// Fail on the first check or handler error instead of recording it
    #[arg(long)]
    pub debug: bool,
}

pub fn execute(args: RunArgs, settings: &Settings, output: &Output) -> Result<()> {
    let config = args.project.load(settings)?;
    let registry = Registry::builtin();

    if settings.validate {
        if let Err(errors) = ConfigValidator::new(&registry, ValidationMode::Accumulate).validate(&config) {
            output.error(&format!(
                "Configuration {} is invalid",
                args.project.config_path().display()
            ));
            for error in &errors {
                output.indent(&error.to_string());
            }
            std::process::exit(1);
        }
    }

    let mut transaction = GitTransaction::open(&args.project.repo, args.hook)?;
    if let Some(path) = &args.message_file {
        let message = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read commit message from {}", path.display()))?;
        transaction = transaction.with_message(message.trim_end());
    }

    output.verbose(&format!("Running {} hook", args.hook));
    let mut runner = ProcessRunner::new(args.hook, &config, Changeset::new(transaction), registry)
        .debug(args.debug);
    let result = match &args.profile {
        Some(profile) => runner.run_profile(profile)?,
        None => runner.run()?,
    };

    match result {
        RunResult::Success => {
            output.verbose(&format!("{} hook finished successfully", args.hook));
            Ok(())
        }
        RunResult::Error => {
            output.task_summary("✖", &format!("{} hook failed", args.hook), false);
            std::process::exit(result.exit_code());
        }
    }
}
