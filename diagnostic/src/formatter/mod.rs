use colored::*;

use crate::{
  diagnostic::{Diagnostic, LabelStyle},
  diagnostic_code::Severity,
};

/// Formats a single `Diagnostic` against the source text it was raised
/// from, rustc-style. The core never calls this on its own — an embedding
/// host opts in by calling `Diagnostic::render`/`render_plain` (or this
/// type directly) when it wants to show a user a parse failure.
pub struct DiagnosticFormatter<'a> {
  diagnostic: &'a Diagnostic,
  source_lines: Vec<String>,
}

impl<'a> DiagnosticFormatter<'a> {
  pub fn new(diagnostic: &'a Diagnostic, source: &str) -> Self {
    let source_lines: Vec<String> = source.lines().map(|s| s.to_string()).collect();
    Self {
      diagnostic,
      source_lines,
    }
  }

  fn severity_text(&self) -> &'static str {
    match self.diagnostic.severity {
      Severity::Error => "error",
      Severity::Note => "note",
      Severity::Help => "help",
    }
  }

  fn underline_char(&self, style: LabelStyle) -> char {
    match style {
      LabelStyle::Primary => '^',
      LabelStyle::Secondary => '-',
    }
  }

  fn get_line_content(&self, line_num: usize) -> Option<&str> {
    if line_num == 0 {
      return None;
    }
    self.source_lines.get(line_num - 1).map(|s| s.as_str())
  }

  /// Colored, human-facing rendering.
  pub fn format(&self) -> String {
    let mut output = String::new();

    let header = format!(
      "{}: [{}]: {}",
      self.severity_text().red().bold(),
      self.diagnostic.code.code().red().bold(),
      self.diagnostic.message
    );
    output.push_str(&header);
    output.push('\n');

    for label in &self.diagnostic.labels {
      output.push_str(&format!(
        "  {} {}:{}:{}\n",
        "-->".blue().bold(),
        label.span.source.white().bold(),
        label.span.line.to_string().white().bold(),
        label.span.column.to_string().white().bold()
      ));

      output.push_str(&format!("   {}\n", "|".blue().bold()));

      if let Some(line_content) = self.get_line_content(label.span.line) {
        let line_num = label.span.line;

        output.push_str(&format!(
          " {} {} {}\n",
          line_num.to_string().blue().bold(),
          "|".blue().bold(),
          line_content
        ));

        let start_col = label.span.column.saturating_sub(1);
        let length = label.span.length.max(1);
        let padding = " ".repeat(start_col);
        let underline = self.underline_char(label.style).to_string().repeat(length);

        let colored_underline = match label.style {
          LabelStyle::Primary => underline.red().bold(),
          LabelStyle::Secondary => underline.cyan().bold(),
        };

        output.push_str(&format!("   {} {}{}\n", "|".blue().bold(), padding, colored_underline));

        if let Some(msg) = &label.message {
          let colored_msg = match label.style {
            LabelStyle::Primary => msg.red().bold(),
            LabelStyle::Secondary => msg.cyan().bold(),
          };
          output.push_str(&format!("   {} {}{}\n", "|".blue().bold(), padding, colored_msg));
        }
      }

      output.push_str(&format!("   {}\n", "|".blue().bold()));
    }

    for note in &self.diagnostic.notes {
      output.push_str(&format!("   {} {}: {}\n", "=".blue().bold(), "note".cyan().bold(), note));
    }

    if let Some(help) = &self.diagnostic.help {
      output.push_str(&format!("   {} {}: {}\n", "=".blue().bold(), "help".cyan().bold(), help));
    }

    output
  }

  /// Plain-text rendering, safe for log files and non-TTY output.
  pub fn format_plain(&self) -> String {
    let mut output = String::new();

    output.push_str(&format!(
      "{}: [{}]: {}\n",
      self.severity_text(),
      self.diagnostic.code.code(),
      self.diagnostic.message
    ));

    for label in &self.diagnostic.labels {
      output.push_str(&format!(
        "  --> {}:{}:{}\n",
        label.span.source, label.span.line, label.span.column
      ));

      output.push_str("   |\n");

      if let Some(line_content) = self.get_line_content(label.span.line) {
        output.push_str(&format!(" {:>3} | {}\n", label.span.line, line_content));

        let start_col = label.span.column.saturating_sub(1);
        let length = label.span.length.max(1);
        let padding = " ".repeat(start_col);
        let underline = self.underline_char(label.style).to_string().repeat(length);

        output.push_str(&format!("   | {}{}\n", padding, underline));

        if let Some(msg) = &label.message {
          output.push_str(&format!("   | {}{}\n", padding, msg));
        }
      }

      output.push_str("   |\n");
    }

    for note in &self.diagnostic.notes {
      output.push_str(&format!("   = note: {}\n", note));
    }

    if let Some(help) = &self.diagnostic.help {
      output.push_str(&format!("   = help: {}\n", help));
    }

    output
  }
}
