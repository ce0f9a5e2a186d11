//! Pretty printing utilities for emitted source.
//!
//! Statements are laid out line by line with [`CodeFormatter`]; long
//! expressions (runtime calls with many arguments) go through the `pretty`
//! crate so they wrap at [`DEFAULT_WIDTH`] with aligned continuation lines.

use pretty::RcDoc;
use std::fmt;

/// Default line width for pretty printing.
pub const DEFAULT_WIDTH: usize = 100;

/// A pretty-printable value.
pub trait PrettyPrint {
    /// Convert to a pretty document.
    fn to_doc(&self) -> RcDoc<'_, ()>;

    /// Pretty print to a string with the given width.
    fn pretty_print(&self, width: usize) -> Result<String, fmt::Error> {
        let mut output = String::new();
        self.to_doc().render_fmt(width, &mut output)?;
        Ok(output)
    }

    /// Pretty print with default width.
    fn pretty(&self) -> Result<String, fmt::Error> {
        self.pretty_print(DEFAULT_WIDTH)
    }
}

/// A simple code formatter for generated code.
#[derive(Debug)]
pub struct CodeFormatter {
    output: String,
    indent_level: usize,
    indent_str: String,
    at_line_start: bool,
}

impl CodeFormatter {
    /// Create a new formatter with the given indent string.
    pub fn new(indent_str: &str) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent_str: indent_str.to_string(),
            at_line_start: true,
        }
    }

    /// Create a formatter with default settings (2 spaces).
    pub fn default_indent() -> Self {
        Self::new("  ")
    }

    /// Current indentation width in characters.
    pub fn indent_width(&self) -> usize {
        self.indent_level * self.indent_str.len()
    }

    /// Increase indentation level.
    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    /// Decrease indentation level.
    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    /// Write text.
    pub fn write(&mut self, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                self.output.push('\n');
                self.at_line_start = true;
            } else {
                if self.at_line_start {
                    for _ in 0..self.indent_level {
                        self.output.push_str(&self.indent_str);
                    }
                    self.at_line_start = false;
                }
                self.output.push(c);
            }
        }
    }

    /// Write a line.
    pub fn writeln(&mut self, s: &str) {
        self.write(s);
        self.write("\n");
    }

    /// Write an empty line.
    pub fn newline(&mut self) {
        self.output.push('\n');
        self.at_line_start = true;
    }

    /// Get the formatted output.
    pub fn finish(self) -> String {
        self.output
    }
}
