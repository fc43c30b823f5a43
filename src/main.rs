use anyhow::Result;
use clap::Parser;
use hookwarden::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
