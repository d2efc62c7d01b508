//! Stylesheet for terminal output, owo-colors style structs.

use owo_colors::Style;

/// Centralized stylesheet. Starts plain; `colorize` turns colors on.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success markers (green)
    pub success: Style,
    /// Warnings (yellow)
    pub warning: Style,
    /// Errors (red)
    pub error: Style,
    /// Informational notes (blue)
    pub info: Style,
    /// Secondary text
    pub dim: Style,
    /// Emphasis, e.g. generated passwords
    pub bold: Style,
    /// Section titles
    pub header: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.bold = Style::new().bold();
        self.header = Style::new().bold().cyan();
    }
}
