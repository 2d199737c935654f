//! Line tokenizer for the OC8 assembly language.
//!
//! Each source line becomes a [`TokenLine`]; tokens keep their source
//! substring and starting column so diagnostics can point back into the
//! line. Lines that produce no tokens are dropped by [`tokenize`].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Noop,
    Halt,
    Ei,
    Di,
    Et,
    Dt,
    Clra,
    Reset,
    Load,
    Store,
    Xch,
    Add,
    Adc,
    Sub,
    Sbc,
    Inc,
    Dec,
    Neg,
    Not,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Rol,
    Ror,
    Addw,
    Subw,
    Mulw,
    Divw,
    Jmp,
    Js,
    Jns,
    Jz,
    Jnz,
    Jc,
    Jnc,
    Jext,
    Cmp,
    Push,
    Pop,
    Call,
    Ret,
    Enter,
    Leave,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegToken {
    Acc,
    R0,
    R1,
    H,
    L,
    Hl,
    Sp,
    Bp,
    Pc,
    Flags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Bin,
    Oct,
    Dec,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Mnemonic(Mnemonic),
    Register(RegToken),
    Int(Radix),
    /// Reference to a label or named constant (`.name`).
    LabelRef,
    /// Label definition (`name:`, the colon is part of the substring).
    LabelDef,
    /// `name` immediately followed by `[`, the base of an indexed label.
    IndexedLabel,
    /// Quoted run; each byte between the quotes is emitted verbatim.
    QuotedBytes,
    Comment,
    Unknown,
    Comma,
    Plus,
    Minus,
    Equals,
    LParen,
    RParen,
    LSquare,
    RSquare,
    LCurly,
    RCurly,
}

impl TokenKind {
    pub fn is_immediate(self) -> bool {
        matches!(self, TokenKind::Int(_))
    }

    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::Comment)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source substring of the token.
    pub text: String,
    /// 0-based starting column within the line.
    pub col: usize,
}

/// One tokenized source line plus the context diagnostics need.
#[derive(Debug, Clone)]
pub struct TokenLine {
    pub tokens: Vec<Token>,
    pub text: String,
    /// 1-based source line number.
    pub number: usize,
}

/// Closed keyword vocabulary: mnemonics and register names, case-sensitive.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("NOOP", TokenKind::Mnemonic(Mnemonic::Noop)),
    ("HALT", TokenKind::Mnemonic(Mnemonic::Halt)),
    ("EI", TokenKind::Mnemonic(Mnemonic::Ei)),
    ("DI", TokenKind::Mnemonic(Mnemonic::Di)),
    ("ET", TokenKind::Mnemonic(Mnemonic::Et)),
    ("DT", TokenKind::Mnemonic(Mnemonic::Dt)),
    ("CLRA", TokenKind::Mnemonic(Mnemonic::Clra)),
    ("RESET", TokenKind::Mnemonic(Mnemonic::Reset)),
    ("LOAD", TokenKind::Mnemonic(Mnemonic::Load)),
    ("STORE", TokenKind::Mnemonic(Mnemonic::Store)),
    ("XCH", TokenKind::Mnemonic(Mnemonic::Xch)),
    ("ADD", TokenKind::Mnemonic(Mnemonic::Add)),
    ("ADC", TokenKind::Mnemonic(Mnemonic::Adc)),
    ("SUB", TokenKind::Mnemonic(Mnemonic::Sub)),
    ("SBC", TokenKind::Mnemonic(Mnemonic::Sbc)),
    ("INC", TokenKind::Mnemonic(Mnemonic::Inc)),
    ("DEC", TokenKind::Mnemonic(Mnemonic::Dec)),
    ("NEG", TokenKind::Mnemonic(Mnemonic::Neg)),
    ("NOT", TokenKind::Mnemonic(Mnemonic::Not)),
    ("AND", TokenKind::Mnemonic(Mnemonic::And)),
    ("OR", TokenKind::Mnemonic(Mnemonic::Or)),
    ("XOR", TokenKind::Mnemonic(Mnemonic::Xor)),
    ("SHL", TokenKind::Mnemonic(Mnemonic::Shl)),
    ("SHR", TokenKind::Mnemonic(Mnemonic::Shr)),
    ("ROL", TokenKind::Mnemonic(Mnemonic::Rol)),
    ("ROR", TokenKind::Mnemonic(Mnemonic::Ror)),
    ("ADDW", TokenKind::Mnemonic(Mnemonic::Addw)),
    ("SUBW", TokenKind::Mnemonic(Mnemonic::Subw)),
    ("MULW", TokenKind::Mnemonic(Mnemonic::Mulw)),
    ("DIVW", TokenKind::Mnemonic(Mnemonic::Divw)),
    ("JMP", TokenKind::Mnemonic(Mnemonic::Jmp)),
    ("JS", TokenKind::Mnemonic(Mnemonic::Js)),
    ("JNS", TokenKind::Mnemonic(Mnemonic::Jns)),
    ("JZ", TokenKind::Mnemonic(Mnemonic::Jz)),
    ("JNZ", TokenKind::Mnemonic(Mnemonic::Jnz)),
    ("JC", TokenKind::Mnemonic(Mnemonic::Jc)),
    ("JNC", TokenKind::Mnemonic(Mnemonic::Jnc)),
    ("JEXT", TokenKind::Mnemonic(Mnemonic::Jext)),
    ("CMP", TokenKind::Mnemonic(Mnemonic::Cmp)),
    ("PUSH", TokenKind::Mnemonic(Mnemonic::Push)),
    ("POP", TokenKind::Mnemonic(Mnemonic::Pop)),
    ("CALL", TokenKind::Mnemonic(Mnemonic::Call)),
    ("RET", TokenKind::Mnemonic(Mnemonic::Ret)),
    ("ENTER", TokenKind::Mnemonic(Mnemonic::Enter)),
    ("LEAVE", TokenKind::Mnemonic(Mnemonic::Leave)),
    ("MIN", TokenKind::Mnemonic(Mnemonic::Min)),
    ("MAX", TokenKind::Mnemonic(Mnemonic::Max)),
    ("ACC", TokenKind::Register(RegToken::Acc)),
    ("R0", TokenKind::Register(RegToken::R0)),
    ("R1", TokenKind::Register(RegToken::R1)),
    ("H", TokenKind::Register(RegToken::H)),
    ("L", TokenKind::Register(RegToken::L)),
    ("HL", TokenKind::Register(RegToken::Hl)),
    ("SP", TokenKind::Register(RegToken::Sp)),
    ("BP", TokenKind::Register(RegToken::Bp)),
    ("PC", TokenKind::Register(RegToken::Pc)),
    ("FLAGS", TokenKind::Register(RegToken::Flags)),
];

fn is_label_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_'
}

fn is_keyword_byte(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit()
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek().map_or(false, &pred) {
            self.pos += 1;
        }
    }

    /// Scans exactly one token starting at the current position.
    fn symbol(&mut self) -> TokenKind {
        let start = self.pos;
        match self.bump().expect("symbol() called at end of line") {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LSquare,
            b']' => TokenKind::RSquare,
            b'{' => TokenKind::LCurly,
            b'}' => TokenKind::RCurly,
            b',' => TokenKind::Comma,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'=' => TokenKind::Equals,
            b';' => {
                self.pos = self.bytes.len();
                TokenKind::Comment
            }
            b'.' => {
                self.eat_while(is_label_byte);
                TokenKind::LabelRef
            }
            b'"' => {
                while let Some(b) = self.bump() {
                    if b == b'"' {
                        return TokenKind::QuotedBytes;
                    }
                }
                TokenKind::Unknown
            }
            b'0'..=b'9' => {
                match self.peek().map(|b| b.to_ascii_lowercase()) {
                    Some(b'b') => {
                        self.pos += 1;
                        self.eat_while(|b| b.is_ascii_hexdigit());
                        TokenKind::Int(Radix::Bin)
                    }
                    Some(b'o') => {
                        self.pos += 1;
                        self.eat_while(|b| b.is_ascii_hexdigit());
                        TokenKind::Int(Radix::Oct)
                    }
                    Some(b'x') => {
                        self.pos += 1;
                        self.eat_while(|b| b.is_ascii_hexdigit());
                        TokenKind::Int(Radix::Hex)
                    }
                    _ => {
                        self.eat_while(|b| b.is_ascii_digit());
                        TokenKind::Int(Radix::Dec)
                    }
                }
            }
            b'A'..=b'Z' => {
                // Longest-match-then-validate: take the whole uppercase run
                // and require an exact hit in the closed keyword set.
                self.eat_while(is_keyword_byte);
                let word = &self.bytes[start..self.pos];
                KEYWORDS
                    .iter()
                    .find(|(kw, _)| kw.as_bytes() == word)
                    .map(|&(_, kind)| kind)
                    .unwrap_or(TokenKind::Unknown)
            }
            b'a'..=b'z' | b'_' => {
                self.eat_while(is_label_byte);
                match self.peek() {
                    Some(b':') => {
                        self.pos += 1;
                        TokenKind::LabelDef
                    }
                    Some(b'[') => TokenKind::IndexedLabel,
                    _ => TokenKind::Unknown,
                }
            }
            _ => {
                // A multi-byte UTF-8 character must be consumed whole so
                // the token substring stays on a char boundary.
                self.eat_while(|b| b & 0xC0 == 0x80);
                TokenKind::Unknown
            }
        }
    }
}

/// Tokenizes a single line. Never fails; unrecognized runs come back as
/// [`TokenKind::Unknown`] and are reported by the code generator.
pub fn tokenize_line(line: &str, number: usize) -> TokenLine {
    let mut scanner = Scanner {
        bytes: line.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();

    loop {
        scanner.eat_while(|b| b == b' ' || b == b'\t');
        if scanner.peek().is_none() {
            break;
        }

        let start = scanner.pos;
        let kind = scanner.symbol();
        tokens.push(Token {
            kind,
            text: line[start..scanner.pos].to_string(),
            col: start,
        });
    }

    TokenLine {
        tokens,
        text: line.to_string(),
        number,
    }
}

/// Tokenizes a whole program, discarding lines that yield no tokens.
pub fn tokenize(source: &str) -> Vec<TokenLine> {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| tokenize_line(line, i + 1))
        .filter(|line| !line.tokens.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<TokenKind> {
        tokenize_line(line, 1).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn mnemonic_and_immediate() {
        assert_eq!(
            kinds("LOAD 5"),
            vec![
                TokenKind::Mnemonic(Mnemonic::Load),
                TokenKind::Int(Radix::Dec)
            ]
        );
    }

    #[test]
    fn radix_markers() {
        assert_eq!(kinds("0b101"), vec![TokenKind::Int(Radix::Bin)]);
        assert_eq!(kinds("0o17"), vec![TokenKind::Int(Radix::Oct)]);
        assert_eq!(kinds("0xFF"), vec![TokenKind::Int(Radix::Hex)]);
        assert_eq!(kinds("0X1f"), vec![TokenKind::Int(Radix::Hex)]);
    }

    #[test]
    fn registers_split_inside_expressions() {
        assert_eq!(
            kinds("(HL+5)"),
            vec![
                TokenKind::LParen,
                TokenKind::Register(RegToken::Hl),
                TokenKind::Plus,
                TokenKind::Int(Radix::Dec),
                TokenKind::RParen
            ]
        );
    }

    #[test]
    fn keyword_prefix_with_trailing_junk_is_unknown() {
        assert_eq!(kinds("ADDX"), vec![TokenKind::Unknown]);
    }

    #[test]
    fn non_ascii_characters_become_unknown_tokens() {
        let toks = tokenize_line("LOAD 5 é", 1).tokens;
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[2].kind, TokenKind::Unknown);
        assert_eq!(toks[2].text, "é");

        let toks = tokenize_line("наклейка", 1).tokens;
        assert!(toks.iter().all(|t| t.kind == TokenKind::Unknown));
    }

    #[test]
    fn label_forms() {
        assert_eq!(kinds("loop_1:"), vec![TokenKind::LabelDef]);
        assert_eq!(kinds(".loop_1"), vec![TokenKind::LabelRef]);
        let toks = tokenize_line("table[HL]", 1).tokens;
        assert_eq!(toks[0].kind, TokenKind::IndexedLabel);
        assert_eq!(toks[0].text, "table");
        assert_eq!(toks[1].kind, TokenKind::LSquare);
    }

    #[test]
    fn comment_drains_line() {
        let toks = tokenize_line("ADD 3 ; trailing words, ADD", 1).tokens;
        assert_eq!(toks.last().unwrap().kind, TokenKind::Comment);
        assert_eq!(toks.len(), 3);
    }

    #[test]
    fn quoted_bytes_keep_quotes_in_text() {
        let toks = tokenize_line("\"hi there\"", 1).tokens;
        assert_eq!(toks[0].kind, TokenKind::QuotedBytes);
        assert_eq!(toks[0].text, "\"hi there\"");
    }

    #[test]
    fn columns_are_recorded() {
        let toks = tokenize_line("  LOAD  R0", 1).tokens;
        assert_eq!(toks[0].col, 2);
        assert_eq!(toks[1].col, 8);
    }

    #[test]
    fn blank_lines_are_dropped() {
        let lines = tokenize("LOAD 1\n\n   \nHALT\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].number, 4);
    }
}
