//! Sentinel literals of the DeepSeek-V3 chat template
//!
//! Every structural sentinel is a distinct `<｜...｜>` literal; none is a
//! substring of another, which the lexer relies on.

/// Opens a batch of tool calls
pub const CALLS_BEGIN: &str = "<｜tool▁calls▁begin｜>";
/// Opens one tool call
pub const CALL_BEGIN: &str = "<｜tool▁call▁begin｜>";
/// Separates the call kind tag from the tool name
pub const CALL_SEPARATOR: &str = "<｜tool▁sep｜>";
/// Closes one tool call
pub const CALL_END: &str = "<｜tool▁call▁end｜>";
/// Closes a batch of tool calls
pub const CALLS_END: &str = "<｜tool▁calls▁end｜>";

pub const OUTPUTS_BEGIN: &str = "<｜tool▁outputs▁begin｜>";
pub const OUTPUT_BEGIN: &str = "<｜tool▁output▁begin｜>";
pub const OUTPUT_END: &str = "<｜tool▁output▁end｜>";
pub const OUTPUTS_END: &str = "<｜tool▁outputs▁end｜>";

/// Terminates an assistant turn
pub const END_OF_SENTENCE: &str = "<｜end▁of▁sentence｜>";
pub const USER_TAG: &str = "<｜User｜>";
pub const ASSISTANT_TAG: &str = "<｜Assistant｜>";

/// Opening fence of the arguments block
pub const JSON_FENCE: &str = "```json";
/// Closing code fence
pub const CODE_FENCE: &str = "```";

/// Common prefix of every sentinel, used by the lexer to find candidates
pub(crate) const SENTINEL_PREFIX: &str = "<｜";

/// Every sentinel literal in the grammar
pub const ALL: [&str; 12] = [
    CALLS_BEGIN,
    CALL_BEGIN,
    CALL_SEPARATOR,
    CALL_END,
    CALLS_END,
    OUTPUTS_BEGIN,
    OUTPUT_BEGIN,
    OUTPUT_END,
    OUTPUTS_END,
    END_OF_SENTENCE,
    USER_TAG,
    ASSISTANT_TAG,
];
