//! Lexer over the structural tool-call sentinels
//!
//! Splits completion text into runs of plain text and the four sentinels that
//! shape a tool-call batch. All other sentinels (end-of-sentence, role tags,
//! the call separator) stay inside text runs; the call body parser deals
//! with those.

use super::sentinels::{CALLS_BEGIN, CALLS_END, CALL_BEGIN, CALL_END, SENTINEL_PREFIX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    CallsBegin,
    CallBegin,
    CallEnd,
    CallsEnd,
}

/// A token borrowing its source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

const STRUCTURAL: [(&str, TokenKind); 4] = [
    (CALLS_BEGIN, TokenKind::CallsBegin),
    (CALL_BEGIN, TokenKind::CallBegin),
    (CALL_END, TokenKind::CallEnd),
    (CALLS_END, TokenKind::CallsEnd),
];

/// Iterator of tokens over a completion
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Sentinel starting exactly at byte `at`, if any
    fn sentinel_at(&self, at: usize) -> Option<(&'a str, TokenKind)> {
        let rest = &self.src[at..];
        STRUCTURAL
            .iter()
            .find(|(lit, _)| rest.starts_with(lit))
            .map(|&(lit, kind)| (&self.src[at..at + lit.len()], kind))
    }

    /// Byte offset of the next structural sentinel at or after `from`
    fn next_sentinel(&self, from: usize) -> Option<usize> {
        let mut cursor = from;
        while let Some(offset) = self.src[cursor..].find(SENTINEL_PREFIX) {
            let at = cursor + offset;
            if self.sentinel_at(at).is_some() {
                return Some(at);
            }
            cursor = at + SENTINEL_PREFIX.len();
        }
        None
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.src.len() {
            return None;
        }

        if let Some((text, kind)) = self.sentinel_at(self.pos) {
            self.pos += text.len();
            return Some(Token { kind, text });
        }

        let end = self.next_sentinel(self.pos).unwrap_or(self.src.len());
        let text = &self.src[self.pos..end];
        self.pos = end;
        Some(Token {
            kind: TokenKind::Text,
            text,
        })
    }
}

/// Tokenize a whole completion
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    Lexer::new(src).collect()
}
