//! Line classification for raw serial output.
//!
//! Pure text transforms: no I/O, no state. Modem consoles decorate output
//! with ANSI color sequences and pad responses with carriage returns and
//! blank lines; these helpers reduce a raw decoded buffer to the logical
//! lines the rest of the system reasons about.

const ESC: char = '\u{1b}';

/// Remove ANSI escape sequences of the form `ESC [ <digits/;>* m`.
///
/// Only that exact shape is removed. An escape that does not complete the
/// pattern (missing bracket, unexpected byte, truncated at buffer end) is
/// preserved verbatim.
pub fn strip_ansi(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ESC && i + 1 < chars.len() && chars[i + 1] == '[' {
            let mut j = i + 2;
            while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == ';') {
                j += 1;
            }
            if j < chars.len() && chars[j] == 'm' {
                i = j + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Split a raw decoded buffer into trimmed logical lines.
///
/// ANSI sequences are stripped first, then the buffer is split on line
/// boundaries and each line is whitespace-trimmed. Fully empty lines at the
/// leading and trailing edges of the block are dropped; interior blank lines
/// are kept.
pub fn classify(raw: &str) -> Vec<String> {
    let stripped = strip_ansi(raw);
    let mut lines: Vec<String> = stripped.lines().map(|l| l.trim().to_string()).collect();
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_text_without_escapes_passes_through(input in "[^\\x1B]{0,64}") {
            prop_assert_eq!(strip_ansi(&input), input);
        }

        #[test]
        fn prop_interleaved_sgr_sequences_are_removed(
            parts in proptest::collection::vec(
                ("[a-zA-Z0-9 +:,.%_=-]{0,12}", proptest::collection::vec(0u32..200, 0..3)),
                0..6,
            )
        ) {
            let mut dirty = String::new();
            let mut clean = String::new();
            for (text, codes) in &parts {
                dirty.push_str(text);
                clean.push_str(text);
                let body = codes
                    .iter()
                    .map(|code| code.to_string())
                    .collect::<Vec<_>>()
                    .join(";");
                dirty.push_str(&format!("\u{1b}[{}m", body));
            }
            prop_assert_eq!(strip_ansi(&dirty), clean);
        }

        #[test]
        fn prop_stripping_never_grows_the_buffer(input in "(\\PC|\\x1B){0,64}") {
            prop_assert!(strip_ansi(&input).len() <= input.len());
        }
    }
}
