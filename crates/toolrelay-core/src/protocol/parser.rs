//! Completion parser
//!
//! Drives a small state machine over the lexer's tokens and extracts tool
//! calls from a completion. Malformed call segments are skipped and reported;
//! nothing here returns an error.

use std::sync::Arc;

use crate::logging::Logger;
use crate::types::{CallKind, ToolCallRecord};

use super::lexer::{Lexer, TokenKind};
use super::sentinels::{CALLS_BEGIN, CALL_SEPARATOR, CODE_FENCE, END_OF_SENTENCE, JSON_FENCE};

/// Why a call segment was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// The segment was never closed by a call-end sentinel
    MissingCallEnd,
    /// Neither the separator sentinel nor whitespace follows the kind tag
    MissingSeparator,
    /// No fenced JSON arguments block
    MissingArguments,
    /// Nothing between the separator and the arguments block
    EmptyToolName,
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedReason::MissingCallEnd => write!(f, "missing call-end sentinel"),
            MalformedReason::MissingSeparator => write!(f, "missing separator"),
            MalformedReason::MissingArguments => write!(f, "missing arguments block"),
            MalformedReason::EmptyToolName => write!(f, "empty tool name"),
        }
    }
}

/// A call segment that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedToolCall {
    /// Raw segment text between call-begin and where the segment ended
    pub segment: String,
    pub reason: MalformedReason,
}

/// Result of parsing one completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// No usable tool call: the text is the answer
    PlainAnswer(String),
    /// At least one tool call was extracted
    ToolCallBatch {
        /// Trimmed text preceding the batch
        preamble: String,
        calls: Vec<ToolCallRecord>,
        /// Segments skipped as malformed
        skipped: Vec<MalformedToolCall>,
    },
}

impl ParseOutcome {
    /// Calls in this outcome (empty for a plain answer)
    pub fn calls(&self) -> &[ToolCallRecord] {
        match self {
            ParseOutcome::PlainAnswer(_) => &[],
            ParseOutcome::ToolCallBatch { calls, .. } => calls,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    Preamble,
    /// Inside the batch, between calls
    InBatch,
    /// Inside a call segment
    InCall,
    /// Batch closed; trailing text is ignored
    Closed,
}

#[derive(Debug, Default)]
struct Scan {
    preamble: String,
    calls: Vec<ToolCallRecord>,
    skipped: Vec<MalformedToolCall>,
}

impl Scan {
    fn finish_segment(&mut self, segment: &str) {
        match parse_call_body(segment) {
            Ok((kind, name, args)) => {
                let id = ToolCallRecord::ordinal_id(self.calls.len());
                self.calls
                    .push(ToolCallRecord::new(id, name, args).with_kind(kind));
            }
            Err(reason) => self.skip(segment, reason),
        }
    }

    fn skip(&mut self, segment: &str, reason: MalformedReason) {
        self.skipped.push(MalformedToolCall {
            segment: segment.to_string(),
            reason,
        });
    }

    fn into_outcome(self) -> ParseOutcome {
        let preamble = self.preamble.trim().to_string();
        if self.calls.is_empty() {
            return ParseOutcome::PlainAnswer(preamble);
        }
        ParseOutcome::ToolCallBatch {
            preamble,
            calls: self.calls,
            skipped: self.skipped,
        }
    }
}

fn scan_batch(text: &str) -> Scan {
    let mut scan = Scan::default();
    let mut state = State::Preamble;
    let mut segment = String::new();

    for token in Lexer::new(text) {
        match state {
            State::Preamble => match token.kind {
                TokenKind::CallsBegin => state = State::InBatch,
                _ => scan.preamble.push_str(token.text),
            },
            State::InBatch => match token.kind {
                TokenKind::CallBegin => {
                    segment.clear();
                    state = State::InCall;
                }
                TokenKind::CallsEnd | TokenKind::CallsBegin => state = State::Closed,
                // Text before the first call and stray call-ends are dropped
                TokenKind::Text | TokenKind::CallEnd => {}
            },
            State::InCall => match token.kind {
                TokenKind::Text => segment.push_str(token.text),
                TokenKind::CallEnd => {
                    scan.finish_segment(&segment);
                    state = State::InBatch;
                }
                TokenKind::CallBegin => {
                    scan.skip(&segment, MalformedReason::MissingCallEnd);
                    segment.clear();
                }
                TokenKind::CallsEnd | TokenKind::CallsBegin => {
                    scan.skip(&segment, MalformedReason::MissingCallEnd);
                    state = State::Closed;
                }
            },
            State::Closed => break,
        }
    }

    if state == State::InCall {
        scan.skip(&segment, MalformedReason::MissingCallEnd);
    }

    scan
}

/// Split one closed call segment into (kind, tool name, raw arguments)
fn parse_call_body(segment: &str) -> Result<(CallKind, String, String), MalformedReason> {
    let (kind, rest) = segment
        .split_once(CALL_SEPARATOR)
        .or_else(|| segment.trim_start().split_once(char::is_whitespace))
        .ok_or(MalformedReason::MissingSeparator)?;

    let (name, args) = rest
        .split_once(JSON_FENCE)
        .ok_or(MalformedReason::MissingArguments)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(MalformedReason::EmptyToolName);
    }

    let args = args.trim();
    let args = match args.split_once(CODE_FENCE) {
        Some((body, _trailing)) => body.trim(),
        None => args,
    };

    Ok((CallKind::from_tag(kind.trim()), name.to_string(), args.to_string()))
}

/// Parse a completion without logging skipped segments
pub fn parse_completion(text: &str) -> ParseOutcome {
    if !text.contains(CALLS_BEGIN) {
        return ParseOutcome::PlainAnswer(strip_end_of_sentence(text));
    }
    scan_batch(text).into_outcome()
}

/// Text with every end-of-sentence sentinel removed
///
/// Whitespace after a trailing sentinel goes with it; other whitespace is kept.
pub fn strip_end_of_sentence(text: &str) -> String {
    let body = text
        .trim_end()
        .strip_suffix(END_OF_SENTENCE)
        .unwrap_or(text);
    body.replace(END_OF_SENTENCE, "")
}

/// Parser that reports skipped segments to a logger
pub struct SentinelParser {
    logger: Arc<dyn Logger>,
}

impl SentinelParser {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    pub fn parse(&self, text: &str) -> ParseOutcome {
        if !text.contains(CALLS_BEGIN) {
            return ParseOutcome::PlainAnswer(strip_end_of_sentence(text));
        }

        let scan = scan_batch(text);
        for skipped in &scan.skipped {
            self.logger.warn(&format!(
                "[SentinelParser] Skipped malformed tool call ({}): {:?}",
                skipped.reason, skipped.segment
            ));
        }
        if scan.calls.is_empty() {
            self.logger.warn(&format!(
                "[SentinelParser] Tool call block had no usable calls ({} skipped)",
                scan.skipped.len()
            ));
        }
        scan.into_outcome()
    }
}
