pub mod diagnostic;
pub mod diagnostic_code;
pub mod formatter;

pub use diagnostic::{Diagnostic, Label, LabelStyle, Span};
pub use diagnostic_code::{DiagnosticCode, Severity};
pub use formatter::DiagnosticFormatter;

impl Diagnostic {
  /// Colored, rustc-style rendering of this diagnostic against the
  /// source text it was raised from.
  pub fn render(&self, source: &str) -> String {
    DiagnosticFormatter::new(self, source).format()
  }

  /// Plain-text rendering, safe for log files and non-TTY output.
  pub fn render_plain(&self, source: &str) -> String {
    DiagnosticFormatter::new(self, source).format_plain()
  }
}
