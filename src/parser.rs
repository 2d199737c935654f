//! Token cursor, immediate parsing and the memory-expression resolver.

use crate::diag::{DiagKind, Reporter};
use crate::tokenizer::{Radix, RegToken, Token, TokenKind, TokenLine};

/// Cursor over one line's tokens. Exposes both the next token and the
/// last consumed one, so end-of-line errors can point at the token the
/// line stopped after.
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(line: &'a TokenLine) -> Self {
        Self {
            tokens: &line.tokens,
            pos: 0,
        }
    }

    pub fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    /// The most recently consumed token, if any.
    pub fn last(&self) -> Option<&'a Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }
}

/// Advances the cursor, reporting "unexpected end of line" at the last
/// consumed token when the line runs out.
pub fn next_token<'a>(cur: &mut TokenCursor<'a>, reporter: &mut Reporter) -> Option<&'a Token> {
    match cur.next() {
        Some(token) => Some(token),
        None => {
            match cur.last() {
                Some(prev) => reporter.token(DiagKind::UnexpectedEol, prev),
                None => reporter.report(DiagKind::UnexpectedEol, "", 0),
            }
            None
        }
    }
}

/// Parses a numeric literal token. Scanning stops at the first character
/// that is not a digit of the token's radix, and the value accumulates
/// with 16-bit wraparound; overflow warnings are the caller's concern.
pub fn parse_immediate(token: &Token) -> u16 {
    let (digits, radix) = match token.kind {
        TokenKind::Int(Radix::Bin) => (&token.text[2..], 2),
        TokenKind::Int(Radix::Oct) => (&token.text[2..], 8),
        TokenKind::Int(Radix::Dec) => (&token.text[..], 10),
        TokenKind::Int(Radix::Hex) => (&token.text[2..], 16),
        _ => return 0,
    };

    let mut val: u16 = 0;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => val = val.wrapping_mul(radix as u16).wrapping_add(d as u16),
            None => break,
        }
    }
    val
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Invalid,
    /// No base register: the accumulated value is an absolute address.
    Imm,
    L,
    Hl,
    Bp,
}

/// A resolved memory expression: classified base plus the signed offset
/// accumulated around it. `base` is the token that established the mode,
/// kept for diagnostics at the call site.
#[derive(Debug, Clone, Copy)]
pub struct MemExpr<'a> {
    pub mode: AddrMode,
    pub offset: u16,
    pub base: Option<&'a Token>,
}

impl MemExpr<'_> {
    fn invalid() -> Self {
        MemExpr {
            mode: AddrMode::Invalid,
            offset: 0,
            base: None,
        }
    }
}

fn is_closer(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RParen | TokenKind::RSquare | TokenKind::RCurly
    )
}

/// Parses the sum expression between a consumed opening delimiter and
/// `end`. At most one of `L`/`HL`/`BP` may appear; signs apply to the
/// numeric members around it. Returns an `Invalid` expression after
/// reporting when the grammar is violated.
pub fn parse_mem_expr<'a>(
    cur: &mut TokenCursor<'a>,
    end: TokenKind,
    reporter: &mut Reporter,
) -> MemExpr<'a> {
    let mut expr = MemExpr {
        mode: AddrMode::Invalid,
        offset: 0,
        base: None,
    };
    let mut negate = false;

    // Optional leading sign.
    if let Some(token) = cur.peek() {
        match token.kind {
            TokenKind::Plus => {
                cur.next();
            }
            TokenKind::Minus => {
                cur.next();
                negate = true;
            }
            _ => {}
        }
    }

    loop {
        // Expression member: an integer or a base register.
        let token = match next_token(cur, reporter) {
            Some(token) => token,
            None => return MemExpr::invalid(),
        };
        match token.kind {
            TokenKind::Int(_) => {
                let val = parse_immediate(token);
                if negate {
                    expr.offset = expr.offset.wrapping_sub(val);
                } else {
                    expr.offset = expr.offset.wrapping_add(val);
                }
            }
            TokenKind::Register(RegToken::L) => {
                if !set_base(&mut expr, AddrMode::L, token) {
                    reporter.token(DiagKind::MultipleMemoryBase, token);
                    return MemExpr::invalid();
                }
            }
            TokenKind::Register(RegToken::Hl) => {
                if !set_base(&mut expr, AddrMode::Hl, token) {
                    reporter.token(DiagKind::MultipleMemoryBase, token);
                    return MemExpr::invalid();
                }
            }
            TokenKind::Register(RegToken::Bp) => {
                if !set_base(&mut expr, AddrMode::Bp, token) {
                    reporter.token(DiagKind::MultipleMemoryBase, token);
                    return MemExpr::invalid();
                }
            }
            _ => {
                reporter.token(DiagKind::ExpectedExprMember, token);
                return MemExpr::invalid();
            }
        }

        // Continuation operator or the closing delimiter.
        let token = match next_token(cur, reporter) {
            Some(token) => token,
            None => return MemExpr::invalid(),
        };
        match token.kind {
            TokenKind::Plus => negate = false,
            TokenKind::Minus => negate = true,
            kind if is_closer(kind) => {
                if kind == end {
                    if expr.mode == AddrMode::Invalid {
                        expr.mode = AddrMode::Imm;
                    }
                    return expr;
                }
                reporter.token(DiagKind::MismatchedDelimiter, token);
                return MemExpr::invalid();
            }
            _ => {
                reporter.token(DiagKind::ExpectedExprOperator, token);
                return MemExpr::invalid();
            }
        }
    }
}

fn set_base<'a>(expr: &mut MemExpr<'a>, mode: AddrMode, token: &'a Token) -> bool {
    if expr.mode != AddrMode::Invalid {
        return false;
    }
    expr.mode = mode;
    expr.base = Some(token);
    true
}
