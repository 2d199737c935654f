//! Structured assembler diagnostics.
//!
//! Assembly is best-effort: every problem becomes a [`Diagnostic`] and
//! parsing continues, so one run can surface multiple errors. Rendering
//! here is plain text; a colorizing printer can consume the fields
//! directly instead of `Display`.

use std::fmt;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    #[error("unknown token")]
    UnknownToken,
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("unexpected end of line")]
    UnexpectedEol,
    #[error("expected comma")]
    ExpectedComma,
    #[error("expected an operator at the start of the line")]
    ExpectedOperator,
    #[error("instruction takes no operand")]
    NoOperandAllowed,
    #[error("undefined label")]
    UndefinedLabel,
    #[error("duplicate label")]
    DuplicateLabel,
    #[error("closing delimiter does not match the opening one")]
    MismatchedDelimiter,
    #[error("expected L, HL, BP or an integer")]
    ExpectedExprMember,
    #[error("expected `+`, `-` or a closing delimiter")]
    ExpectedExprOperator,
    #[error("more than one base register in memory expression")]
    MultipleMemoryBase,
    #[error("invalid stack index")]
    InvalidStackIndex,
    #[error("invalid indexed-memory index")]
    InvalidMemoryIndex,
    #[error("value does not fit in 8 bits and was truncated")]
    U8Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl DiagKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagKind::U8Overflow => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One reported problem, carrying enough source context to render a
/// caret-underlined excerpt without going back to the source text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub severity: Severity,
    /// Offending token's source substring (empty for end-of-line errors).
    pub token: String,
    /// 0-based column of the token within the line.
    pub col: usize,
    pub line: String,
    /// 1-based source line number.
    pub line_nr: usize,
    pub path: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}:{}:{}: {}: {}",
            self.path,
            self.line_nr,
            self.col + 1,
            self.severity,
            self.kind
        )?;
        writeln!(f, "  {}", self.line)?;
        let width = self.token.len().max(1);
        write!(f, "  {}{}", " ".repeat(self.col), "^".repeat(width))
    }
}

/// Diagnostic sink threaded through every parsing function, replacing
/// ambient globals with explicit context.
#[derive(Debug)]
pub struct Reporter {
    path: String,
    line: String,
    line_nr: usize,
    pub diags: Vec<Diagnostic>,
}

impl Reporter {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            line: String::new(),
            line_nr: 0,
            diags: Vec::new(),
        }
    }

    /// Sets the source line all subsequent reports attach to.
    pub fn set_line(&mut self, line: &crate::tokenizer::TokenLine) {
        self.line = line.text.clone();
        self.line_nr = line.number;
    }

    pub fn report(&mut self, kind: DiagKind, token: &str, col: usize) {
        self.report_at(kind, token, col, self.line.clone(), self.line_nr);
    }

    /// Report against explicit source context, used by pass 2 where the
    /// current-line state no longer matches the recorded reference.
    pub fn report_at(
        &mut self,
        kind: DiagKind,
        token: &str,
        col: usize,
        line: String,
        line_nr: usize,
    ) {
        self.diags.push(Diagnostic {
            kind,
            severity: kind.severity(),
            token: token.to_string(),
            col,
            line,
            line_nr,
            path: self.path.clone(),
        });
    }

    pub fn token(&mut self, kind: DiagKind, token: &crate::tokenizer::Token) {
        self.report(kind, &token.text, token.col);
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn line_nr(&self) -> usize {
        self.line_nr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendering_underlines_the_token() {
        let diag = Diagnostic {
            kind: DiagKind::UnknownToken,
            severity: Severity::Error,
            token: "foo".to_string(),
            col: 5,
            line: "LOAD foo".to_string(),
            line_nr: 3,
            path: "prog.s".to_string(),
        };
        let text = diag.to_string();
        assert!(text.starts_with("prog.s:3:6: error: unknown token"));
        assert!(text.ends_with("  LOAD foo\n       ^^^"));
    }

    #[test]
    fn overflow_is_a_warning() {
        assert_eq!(DiagKind::U8Overflow.severity(), Severity::Warning);
        assert_eq!(DiagKind::UndefinedLabel.severity(), Severity::Error);
    }
}
