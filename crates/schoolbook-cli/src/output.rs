//! Output formatting and display utilities

use colored::Colorize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", msg.bold().underline());
}

/// Print an aligned `key: value` line
pub fn field(key: &str, value: impl std::fmt::Display) {
    println!("  {:<20} {}", format!("{key}:").dimmed(), value);
}

/// Print the tool banner
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!("{}", format!("Schoolbook v{}", version).bold());
    println!("{}", "School records API".dimmed());
}

/// Print a JSON report
pub fn print_json(value: &serde_json::Value) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
