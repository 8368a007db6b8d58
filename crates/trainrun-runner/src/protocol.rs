//! Status protocol spoken by the external job on stdout.
//!
//! The job writes one JSON object per line. [`StatusCodec`] buffers raw
//! stdout chunks, cuts them at newlines and decodes each line into a
//! [`ProtocolMessage`]. Lines that fail to decode are logged and skipped;
//! they never end the stream.

use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, FramedRead};
use tracing::{trace, warn};

use crate::error::RunnerError;

/// One decoded status line from the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProtocolMessage {
    /// Overall progress, 0-100.
    Progress {
        #[serde(rename = "progress")]
        percent: f64,
    },

    /// Training stopped early at the given epoch.
    EarlyStopping { epoch: u64 },

    /// Training finished and wrote its artifacts.
    Complete {
        model_path: String,
        history_path: String,
        #[serde(rename = "final_train_loss")]
        train_loss: f64,
        #[serde(rename = "final_val_loss")]
        val_loss: f64,
    },

    /// The job gave up and says why.
    Error {
        #[serde(rename = "error")]
        message: String,
    },
}

impl ProtocolMessage {
    /// Parse a single line.
    pub fn parse(line: &[u8]) -> Result<Self, RunnerError> {
        Ok(serde_json::from_slice(line)?)
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::EarlyStopping { .. } => "early_stopping",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// Returns true for the messages that end a job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Newline-delimited JSON decoder for [`ProtocolMessage`].
#[derive(Debug, Default)]
pub struct StatusCodec {
    /// Bytes of the buffer already searched for a newline.
    next_index: usize,

    /// Lines dropped because they did not decode.
    dropped: u64,
}

impl StatusCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn parse_candidate(&mut self, line: &[u8]) -> Option<ProtocolMessage> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }

        match ProtocolMessage::parse(line) {
            Ok(message) => {
                trace!(message_type = message.kind(), "Decoded status line");
                Some(message)
            }
            Err(e) => {
                self.dropped += 1;
                let preview: String = String::from_utf8_lossy(line).chars().take(200).collect();
                warn!(
                    error = %e,
                    raw_len = line.len(),
                    preview = %preview,
                    "Failed to parse job output line"
                );
                None
            }
        }
    }
}

impl Decoder for StatusCodec {
    type Item = ProtocolMessage;
    type Error = RunnerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');
            let Some(offset) = newline else {
                self.next_index = src.len();
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if let Some(message) = self.parse_candidate(&line[..line.len() - 1]) {
                return Ok(Some(message));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        if src.is_empty() {
            return Ok(None);
        }

        // Unterminated last line.
        let line = src.split_to(src.len());
        self.next_index = 0;
        Ok(self.parse_candidate(&line))
    }
}

/// In-order stream of status messages read from a job's stdout.
pub type ProtocolReader<R> = FramedRead<R, StatusCodec>;

/// Wrap a job's stdout in a [`ProtocolReader`].
pub fn reader<R: AsyncRead>(stdout: R) -> ProtocolReader<R> {
    FramedRead::new(stdout, StatusCodec::new())
}
