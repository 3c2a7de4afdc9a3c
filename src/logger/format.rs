//! Log formatting and output with ANSI colors and text wrapping
//!
//! Handles:
//! - Colorized console output with aligned tag and level columns
//! - Word wrapping of long messages
//! - Mirroring every line to the optional log file
//! - Broken pipe handling when output is piped into `head` and friends

use super::file::write_to_file;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

const TAG_WIDTH: usize = 10;
const LOG_TYPE_WIDTH: usize = 8;
const BRACKET_SPACE_WIDTH: usize = 3;
const TOTAL_PREFIX_WIDTH: usize = TAG_WIDTH + LOG_TYPE_WIDTH + BRACKET_SPACE_WIDTH * 2;

/// Maximum line length before wrapping
const MAX_LINE_LENGTH: usize = 145;

/// Format and output a log message
pub fn format_and_log(tag: LogTag, log_type: &str, message: &str) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();
    let prefix = format!("{} ", time).dimmed().to_string();

    let base_line = format!(
        "{}[{}] [{}] ",
        prefix,
        format_tag(&tag),
        format_log_type(log_type)
    );

    let base_length = strip_ansi_codes(&base_line)
        .len()
        .max(TOTAL_PREFIX_WIDTH + time.len() + 1);
    let available_space = if MAX_LINE_LENGTH > base_length {
        MAX_LINE_LENGTH - base_length
    } else {
        50
    };

    let chunks = wrap_text(message, available_space);
    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let tag_clean = tag.to_plain_string();

    print_stdout_safe(&format!("{}{}", base_line, chunks[0]));
    write_to_file(&format!(
        "{} [{}] [{}] {}",
        timestamp, tag_clean, log_type, chunks[0]
    ));

    if chunks.len() > 1 {
        let continuation_prefix = " ".repeat(base_length);
        for chunk in &chunks[1..] {
            print_stdout_safe(&format!("{}{}", continuation_prefix, chunk));
            write_to_file(&format!(
                "{} [{}] [{}] {}",
                timestamp, tag_clean, log_type, chunk
            ));
        }
    }
}

fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::Webserver => label.bright_green().bold(),
        LogTag::Relay => label.bright_cyan().bold(),
        LogTag::Upstream => label.bright_purple().bold(),
        LogTag::Client => label.bright_blue().bold(),
    }
}

fn format_log_type(log_type: &str) -> ColoredString {
    let label = format!("{:<width$}", log_type, width = LOG_TYPE_WIDTH);
    match log_type.to_uppercase().as_str() {
        "ERROR" => label.bright_red().bold(),
        "WARNING" => label.bright_yellow().bold(),
        "DEBUG" | "VERBOSE" => label.dimmed(),
        _ => label.white().bold(),
    }
}

/// Print to stdout but ignore broken pipe errors
fn print_stdout_safe(message: &str) {
    if let Err(e) = writeln!(stdout(), "{}", message) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
    if let Err(e) = stdout().flush() {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
}

/// Remove ANSI color codes from text
pub(crate) fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_escape = false;

    for ch in text.chars() {
        if ch == '\x1b' {
            in_escape = true;
        } else if in_escape && ch == 'm' {
            in_escape = false;
        } else if !in_escape {
            result.push(ch);
        }
    }
    result
}

/// Wrap text at word boundaries, respecting existing newlines
pub(crate) fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut result = Vec::new();

    for line in text.split('\n') {
        if strip_ansi_codes(line).chars().count() <= max_width {
            result.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split_whitespace() {
            let word_len = strip_ansi_codes(word).chars().count();
            let current_len = strip_ansi_codes(&current).chars().count();

            if word_len > max_width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                result.extend(break_long_word(word, max_width));
            } else if current.is_empty() {
                current = word.to_string();
            } else if current_len + word_len + 1 <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::replace(&mut current, word.to_string()));
            }
        }

        if !current.is_empty() {
            result.push(current);
        }
    }

    if result.is_empty() {
        result.push(String::new());
    }

    result
}

/// Break a word longer than the line into fixed-width chunks (char boundaries)
fn break_long_word(word: &str, max_width: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes() {
        let colored = "relay".bright_cyan().bold().to_string();
        assert_eq!(strip_ansi_codes(&colored), "relay");
        assert_eq!(strip_ansi_codes("plain"), "plain");
    }

    #[test]
    fn test_wrap_text_on_word_boundaries() {
        let lines = wrap_text("device bus-12 moved to a new position", 12);
        assert!(lines.iter().all(|l| l.chars().count() <= 12));
        assert_eq!(lines.join(" "), "device bus-12 moved to a new position");
    }

    #[test]
    fn test_wrap_text_breaks_long_words() {
        let lines = wrap_text("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_text_keeps_newlines() {
        let lines = wrap_text("first\nsecond", 80);
        assert_eq!(lines, vec!["first", "second"]);
    }
}
