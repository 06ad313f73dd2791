//! Transport Adapters
//!
//! Three interchangeable sources of line-delimited potentiometer
//! readings, at most one active at a time:
//!
//! - [`serial`] - byte-stream port at a fixed baud rate
//! - [`ble`] - GATT notification subscription with bounded auto-reconnect
//! - [`demo`] - local timer synthesizing a noisy sinusoid
//!
//! Adapters push decoded lines and lifecycle reports into a channel
//! owned by the connection manager. Each connection gets a fresh
//! channel; events from a torn-down adapter are never attributed to a
//! live one.

pub mod ble;
pub mod demo;
pub mod serial;

use thiserror::Error;

/// Events pushed by the active adapter into the lifecycle manager.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A decoded, trimmed, non-empty text line.
    Line(String),
    /// An unexpected loss was observed; a bounded reconnect attempt is
    /// about to run.
    Reconnecting { attempt: u32 },
    /// Reconnect succeeded, notifications are flowing again.
    Reconnected,
    /// The transport is gone for good; manual reconnect required.
    ConnectionLost { reason: String },
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("{0} is not available on this system")]
    Unsupported(&'static str),
    #[error("no matching device found")]
    NoDeviceFound,
    #[error("negotiation failed: {0}")]
    Negotiation(String),
    #[error(transparent)]
    Serial(#[from] serialport::Error),
    #[error(transparent)]
    Ble(#[from] btleplug::Error),
}

/// Split a notification payload or text chunk into candidate lines:
/// runs of `\r`/`\n` separate, surrounding whitespace trimmed, empties
/// dropped. The numeric test happens downstream in the ingestion path.
pub(crate) fn split_lines(chunk: &str) -> impl Iterator<Item = &str> {
    chunk
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

/// Reassembles complete lines from arbitrarily fragmented byte chunks.
///
/// A reading split across two reads ("51" then "2\n") must surface as
/// one line, not two; the trailing partial line is carried until its
/// terminator arrives.
#[derive(Debug, Default)]
pub(crate) struct LineAssembler {
    pending: String,
}

impl LineAssembler {
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(bytes));

        let mut lines = Vec::new();
        while let Some(terminator) = self.pending.find('\n') {
            let raw: String = self.pending.drain(..=terminator).collect();
            let line = raw.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_handles_mixed_terminators() {
        let lines: Vec<&str> = split_lines("512\r\n613\n\r\n  7 \n").collect();
        assert_eq!(lines, vec!["512", "613", "7"]);
    }

    #[test]
    fn split_lines_drops_empty_input() {
        assert_eq!(split_lines("\r\n\r\n").count(), 0);
        assert_eq!(split_lines("   ").count(), 0);
    }

    #[test]
    fn assembler_carries_partial_lines_across_chunks() {
        let mut assembler = LineAssembler::default();
        assert!(assembler.feed(b"51").is_empty());
        assert_eq!(assembler.feed(b"2\n7"), vec!["512".to_string()]);
        assert_eq!(assembler.feed(b"5\n"), vec!["75".to_string()]);
    }

    #[test]
    fn assembler_yields_multiple_lines_per_chunk() {
        let mut assembler = LineAssembler::default();
        assert_eq!(
            assembler.feed(b"1\n2\r\n3\n"),
            vec!["1".to_string(), "2".to_string(), "3".to_string()]
        );
    }
}
