use colored::{ColoredString, Colorize};
use kubekit::ResourceState;

/// Leading mark of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// Informational, nothing changed
    Note,
    /// A change went through
    Done,
    /// The cluster differs from what was recorded
    Drift,
    /// Nothing to do for this resource
    Skip,
}

impl Mark {
    fn glyph(self) -> ColoredString {
        match self {
            Self::Note => "ℹ".blue(),
            Self::Done => "✓".green(),
            Self::Drift => "⚠".yellow(),
            Self::Skip => "·".dimmed(),
        }
    }
}

/// Print one status line
pub fn status(mark: Mark, msg: &str) {
    println!("{} {}", mark.glyph(), msg);
}

/// Print an error to stderr
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print advice under an error
pub fn hint(msg: &str) {
    eprintln!("  {}", msg.dimmed());
}

/// Print a resource name as a heading
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print an aligned field of a resource
pub fn field(key: &str, value: &str) {
    println!("  {} {}", format!("{:<9}", format!("{key}:")).dimmed(), value);
}

/// Print a multi-line document, indented under its field
pub fn block(text: &str) {
    for line in text.lines() {
        println!("    {}", line.dimmed());
    }
}

/// Colored lifecycle state
pub fn state(state: ResourceState) -> ColoredString {
    match state {
        ResourceState::Present => "present".green(),
        ResourceState::Absent => "absent".dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_labels() {
        assert!(state(ResourceState::Present).to_string().contains("present"));
        assert!(state(ResourceState::Absent).to_string().contains("absent"));
    }
}
