//! Console styling for the competition CLI

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Foreground colors used by the report
#[derive(Debug, Clone, Copy)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Cyan,
    Gray,
}

impl Color {
    fn code(self) -> &'static str {
        match self {
            Color::Red => "\x1b[31m",
            Color::Green => "\x1b[32m",
            Color::Yellow => "\x1b[33m",
            Color::Cyan => "\x1b[36m",
            Color::Gray => "\x1b[90m",
        }
    }

    pub fn paint(self, text: &str) -> String {
        format!("{}{}{}", self.code(), text, RESET)
    }
}

/// Status cell for one run: "ok", or the abort reason in red
pub fn run_status(error: Option<&str>) -> String {
    match error {
        None => Color::Green.paint("ok"),
        Some(reason) => Color::Red.paint(reason),
    }
}

/// Title followed by a rule filling out to 50 columns
pub fn print_banner(title: &str) {
    let rule = "─".repeat(50usize.saturating_sub(title.chars().count()));
    println!();
    println!("{}{}", BOLD, Color::Cyan.paint(&format!("{} {}", title, rule)));
    println!();
}

pub fn print_section(title: &str) {
    println!();
    println!("  {}{}{}", BOLD, title, RESET);
    println!("  {}", Color::Gray.paint(&"─".repeat(40)));
}

pub fn print_field(key: &str, value: &str) {
    println!("  {} {}", Color::Gray.paint(&format!("{}:", key)), value);
}

/// Closing line of a sweep
pub fn print_outcome(completed: usize, aborted: usize) {
    if aborted == 0 {
        println!("{} {} runs completed", Color::Green.paint("✓"), completed);
    } else {
        println!(
            "{} {}",
            Color::Yellow.paint("⚠"),
            Color::Yellow.paint(&format!("{} runs completed, {} aborted", completed, aborted))
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status() {
        assert_eq!(run_status(None), "\x1b[32mok\x1b[0m");
        let aborted = run_status(Some("round 2 failed while judging"));
        assert!(aborted.starts_with("\x1b[31m"));
        assert!(aborted.contains("round 2 failed while judging"));
    }
}
