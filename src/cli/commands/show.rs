use super::ProjectArgs;
use crate::config::Settings;
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Print the configuration after inheritance and interpolation, then the
/// templates it was built from, root first.
pub fn execute(args: ShowArgs, settings: &Settings) -> Result<()> {
    let config = args.project.load(settings)?;
    println!("{}", serde_json::to_string_pretty(config.tree())?);

    if !config.extended.is_empty() {
        println!();
        println!("Template chain:");
        for (name, path) in &config.extended {
            println!("  {} ({})", name, path.display());
        }
    }
    Ok(())
}
