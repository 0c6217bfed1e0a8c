//! A module implementing lexical analysis (tokenization) for command lines.
//!
//! Words are separated by whitespace. There is no quoting: every run of
//! non-blank characters is one word.

use crate::error::ShellError;

/// Maximum number of words (command name included) in one command.
pub const MAX_ARGS: usize = 64;

/// Cut a trailing comment off `line`.
///
/// A `#` only starts a comment at the beginning of a word, so a line whose
/// first non-blank character is `#` becomes blank, while `a#b` is left alone.
pub fn strip_comment(line: &str) -> &str {
    let mut at_word_start = true;
    for (i, ch) in line.char_indices() {
        if ch == '#' && at_word_start {
            return &line[..i];
        }
        at_word_start = ch.is_whitespace();
    }
    line
}

/// Splits `line` into owned words without touching the input.
///
/// # Returns
/// The argument vector, or a syntax error when it holds more than [`MAX_ARGS`] words.
pub fn split_into_tokens(line: &str) -> Result<Vec<String>, ShellError> {
    let words: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
    if words.len() > MAX_ARGS {
        return Err(ShellError::Syntax(format!(
            "too many arguments (at most {MAX_ARGS})"
        )));
    }
    Ok(words)
}
