use super::ProjectArgs;
use crate::cli::Output;
use crate::config::{ConfigValidator, Settings, ValidationMode};
use crate::module::Registry;
use anyhow::Result;
use clap::{Args, ValueEnum};
use serde_json::json;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Stop at the first error
    #[arg(long)]
    pub fail_fast: bool,
}

pub fn execute(args: ValidateArgs, settings: &Settings, output: &Output) -> Result<()> {
    let path = args.project.config_path();
    let config = args.project.load(settings)?;
    let registry = Registry::builtin();
    let mode = if args.fail_fast {
        ValidationMode::FailFast
    } else {
        ValidationMode::Accumulate
    };

    let errors = match ConfigValidator::new(&registry, mode).validate(&config) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    match args.format {
        ReportFormat::Json => {
            let report = json!({
                "config": path.display().to_string(),
                "templates": config.extended.keys().collect::<Vec<_>>(),
                "valid": errors.is_empty(),
                "errors": errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ReportFormat::Text => {
            if errors.is_empty() {
                output.success(&format!("Configuration {} is valid", path.display()));
                for name in config.extended.keys() {
                    output.verbose(&format!("extends {name}"));
                }
            } else {
                output.error(&format!(
                    "Configuration {} has {} error(s)",
                    path.display(),
                    errors.len()
                ));
                for error in &errors {
                    output.indent(&error.to_string());
                }
            }
        }
    }

    if !errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
