//! Sentinel tool-calling protocol
//!
//! Text-only backends have no structured function-calling channel, so tool
//! calls travel inside the completion text between sentinel markers:
//!
//! ```text
//! preamble<｜tool▁calls▁begin｜>
//!   <｜tool▁call▁begin｜>function<｜tool▁sep｜>fs__read_file
//!   ```json
//!   {"path": "/tmp/notes.txt"}
//!   ```<｜tool▁call▁end｜>
//! <｜tool▁calls▁end｜><｜end▁of▁sentence｜>
//! ```
//!
//! - [`formatter`] renders a conversation plus the tool catalogue
//! - [`lexer`] and [`parser`] turn a completion back into tool calls
//! - [`repair`] decodes the argument text leniently

pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod repair;
pub mod sentinels;

pub use formatter::{encode_calls, encode_output, PromptFormatter, DEFAULT_SYSTEM_PROMPT};
pub use parser::{
    parse_completion, strip_end_of_sentence, MalformedReason, MalformedToolCall, ParseOutcome,
    SentinelParser,
};
pub use repair::{RepairError, RepairLadder, RepairResult, RepairStrategy, Repaired, FALLBACK_FIELD};
