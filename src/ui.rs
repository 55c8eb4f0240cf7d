use authsync::{AttributeValue, Attributes, SchemePhase};
use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Attribute Formatting
// ============================================================================

/// Render attributes as `key = value` pairs on one line
pub fn format_attributes(attributes: &Attributes) -> String {
    if attributes.is_empty() {
        return "(no attributes)".to_string();
    }
    attributes
        .iter()
        .map(|(key, value)| format!("{key} = {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a single changed attribute as `key: old → new`
pub fn format_change(key: &str, from: Option<&AttributeValue>, to: Option<&AttributeValue>) -> String {
    let render = |v: Option<&AttributeValue>| v.map_or_else(|| "(unset)".to_string(), ToString::to_string);
    format!("{key}: {} → {}", render(from), render(to))
}

/// Colored label for a scheme phase
pub fn phase_label(phase: SchemePhase) -> String {
    let text = phase.to_string();
    match phase {
        SchemePhase::Applied => text.green().to_string(),
        SchemePhase::Merged => text.cyan().to_string(),
        SchemePhase::Fetched => text.yellow().to_string(),
        SchemePhase::Unchanged | SchemePhase::Skipped => text.dimmed().to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
