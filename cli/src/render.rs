use owo_colors::OwoColorize;
use owo_colors::Style;
use qtube_core::protocol::ParsedAnswer;

/// Terminal styles; every style is plain when color is off.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    heading: Style,
    label: Style,
    error: Style,
    dim: Style,
}

impl Palette {
    pub fn new(with_ansi: bool) -> Self {
        if !with_ansi {
            return Self {
                heading: Style::new(),
                label: Style::new(),
                error: Style::new(),
                dim: Style::new(),
            };
        }
        Self {
            heading: Style::new().bold(),
            label: Style::new().cyan(),
            error: Style::new().red().bold(),
            dim: Style::new().dimmed(),
        }
    }

    pub fn error(&self, message: &str) -> String {
        format!("{}", message.style(self.error))
    }

    pub fn dim(&self, message: &str) -> String {
        format!("{}", message.style(self.dim))
    }
}

/// Answer text followed by numbered citations. The numbers are what the
/// user types to seek.
pub fn format_answer(parsed: &ParsedAnswer, palette: &Palette) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Answer".style(palette.heading)));
    for line in parsed.answer.lines() {
        out.push_str(&format!("  {line}\n"));
    }
    if parsed.timestamps.is_empty() {
        return out;
    }
    out.push_str(&format!("\n{}\n", "Timestamps".style(palette.heading)));
    for (index, citation) in parsed.timestamps.iter().enumerate() {
        let number = index + 1;
        let label = citation.label.style(palette.label);
        if citation.description.is_empty() {
            out.push_str(&format!("  [{number}] {label}\n"));
        } else {
            out.push_str(&format!("  [{number}] {label}  {}\n", citation.description));
        }
    }
    out
}
