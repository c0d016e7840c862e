// src/utils/logging.rs

//! Log formatting helpers on top of the `log` facade.
//!
//! Provides consistent headers and summaries for pipeline runs.

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Format a summary section as lines.
pub fn summary_lines(title: &str, items: &[(&str, String)]) -> Vec<String> {
    let mut lines = vec![format!("[SUMMARY] {}", title)];
    lines.extend(
        items
            .iter()
            .map(|(key, value)| format!("    {}: {}", key, value)),
    );
    lines
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    for line in summary_lines(title, items) {
        log::info!("{}", line);
    }
}
