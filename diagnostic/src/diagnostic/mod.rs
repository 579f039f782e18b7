use crate::diagnostic_code::{DiagnosticCode, Severity};

/// A location in the source expression, in both byte-offset and
/// line/column form. `source` is a caller-supplied label (`"<expression>"`
/// by default) so a host embedding several named snippets can still tell
/// them apart in rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
  pub source: String,
  pub offset: usize,
  pub line: usize,
  pub column: usize,
  pub length: usize,
}

impl Span {
  pub fn new(offset: usize, line: usize, column: usize, length: usize) -> Self {
    Self {
      source: "<expression>".to_string(),
      offset,
      line,
      column,
      length,
    }
  }
}

/// Label for underlining a specific span of source text.
#[derive(Debug, Clone)]
pub struct Label {
  pub span: Span,
  pub message: Option<String>,
  pub style: LabelStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
  Primary,
  Secondary,
}

impl Label {
  pub fn primary(span: Span, message: Option<String>) -> Self {
    Self {
      span,
      message,
      style: LabelStyle::Primary,
    }
  }

  pub fn secondary(span: Span, message: Option<String>) -> Self {
    Self {
      span,
      message,
      style: LabelStyle::Secondary,
    }
  }
}

/// A single diagnostic: a stable code, a message, and the labeled spans
/// that explain it. One `Diagnostic` backs exactly one `ParseError`,
/// `InvocationError`, `ConfigurationError` or `DynamicBindingError` —
/// there is no batch accumulator here, because a failed parse or
/// invocation aborts immediately rather than collecting further errors.
#[derive(Debug, Clone)]
pub struct Diagnostic {
  pub code: DiagnosticCode,
  pub severity: Severity,
  pub message: String,
  pub labels: Vec<Label>,
  pub notes: Vec<String>,
  pub help: Option<String>,
}

impl Diagnostic {
  pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
    Self {
      severity: code.severity(),
      code,
      message: message.into(),
      labels: Vec::new(),
      notes: Vec::new(),
      help: None,
    }
  }

  pub fn with_label(mut self, label: Label) -> Self {
    self.labels.push(label);
    self
  }

  pub fn with_note(mut self, note: impl Into<String>) -> Self {
    self.notes.push(note.into());
    self
  }

  pub fn with_help(mut self, help: impl Into<String>) -> Self {
    self.help = Some(help.into());
    self
  }

  /// Byte offset of the diagnostic's primary label, if any. Public error
  /// types expose this directly so a host can locate a failure without
  /// re-rendering the whole diagnostic.
  pub fn primary_offset(&self) -> Option<usize> {
    self
      .labels
      .iter()
      .find(|l| l.style == LabelStyle::Primary)
      .map(|l| l.span.offset)
  }
}
