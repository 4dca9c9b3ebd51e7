//! Colored terminal output.
//!
//! Uses `termcolor`. Respects `NO_COLOR` and the `--color` flag.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from the CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: &str) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        "always" => ColorChoice::Always,
        "never" => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Styled writer for stdout.
pub struct StyledOutput {
    stdout: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
        }
    }

    fn styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    // ── Convenience helpers ──────────────────────────────────────────

    /// Plain line.
    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{}", text);
    }

    /// Bold section heading on its own line.
    pub fn heading(&mut self, text: &str) {
        self.styled(text, None, true);
        self.line("");
    }

    /// `label` in cyan, padded, followed by `value`.
    pub fn field(&mut self, label: &str, value: &str) {
        self.styled(&format!("{:<14}", label), Some(Color::Cyan), false);
        self.line(value);
    }

    /// Green bold text.
    pub fn success(&mut self, text: &str) {
        self.styled(text, Some(Color::Green), true);
    }

    /// Yellow bold text.
    pub fn warning(&mut self, text: &str) {
        self.styled(text, Some(Color::Yellow), true);
    }

    /// Red bold text.
    pub fn error(&mut self, text: &str) {
        self.styled(text, Some(Color::Red), true);
    }
}
