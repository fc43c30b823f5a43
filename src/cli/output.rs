//! Styled terminal output for the CLI commands

use console::style;

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    /// Errors are shown even in quiet mode.
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✖").red(), message);
    }

    /// Only shown in verbose mode.
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            println!("{} {}", style("ℹ").dim(), style(message).dim());
        }
    }

    pub fn section_header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().cyan());
        }
    }

    pub fn list_item(&self, item: &str) {
        println!("  • {}", item);
    }

    pub fn indent(&self, message: &str) {
        eprintln!("    {}", message);
    }

    pub fn task_summary(&self, icon: &str, message: &str, success: bool) {
        if success {
            println!("{} {}", style(icon).green().bold(), style(message).green());
        } else {
            eprintln!("{} {}", style(icon).red().bold(), style(message).red());
        }
    }
}
