//! Built-in handlers

mod console;
mod file;

pub use console::Console;
pub use file::{File, FileConfig};
