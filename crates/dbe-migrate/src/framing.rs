//! Script framing protocol.
//!
//! A script is inspected line by line, each line trimmed first:
//!
//! - if the first non-blank line is exactly [`NO_TRANSACTION_MARKER`], the
//!   script runs without an enclosing transaction and the marker is dropped
//! - a line equal to [`BATCH_SEPARATOR`] (any case) ends the current batch
//! - whatever is left after the last line forms the final batch
//!
//! The same rules apply to every backend.

/// Directive that disables the per-script transaction.
pub const NO_TRANSACTION_MARKER: &str = "-- DBEVOLVE: NO_TRANSACTION";

/// Line that separates execution batches.
pub const BATCH_SEPARATOR: &str = "GO";

/// A script split into executable batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedScript {
    /// Whether the script runs inside one transaction
    pub transactional: bool,

    /// Non-blank batches in file order
    pub batches: Vec<String>,
}

impl FramedScript {
    /// Frame `text` according to the protocol.
    pub fn parse(text: &str) -> Self {
        let mut transactional = true;
        let mut seen_content = false;
        let mut batches = Vec::new();
        let mut buffer = String::new();

        for line in text.lines().map(str::trim) {
            if !seen_content && !line.is_empty() {
                seen_content = true;
                if line == NO_TRANSACTION_MARKER {
                    transactional = false;
                    continue;
                }
            }

            if line.eq_ignore_ascii_case(BATCH_SEPARATOR) {
                flush(&mut buffer, &mut batches);
            } else {
                buffer.push_str(line);
                buffer.push('\n');
            }
        }
        flush(&mut buffer, &mut batches);

        Self {
            transactional,
            batches,
        }
    }
}

fn flush(buffer: &mut String, batches: &mut Vec<String>) {
    let batch = buffer.trim();
    if !batch.is_empty() {
        batches.push(batch.to_string());
    }
    buffer.clear();
}

#[cfg(test)]
#[path = "framing_test.rs"]
mod tests;
