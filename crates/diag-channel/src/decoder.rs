// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Splits the byte stream into [`DiagnosticsFrame`]s.
//!
//! The producer writes one JSON document per tick with no framing. The
//! client treats a short read as a document boundary, but a boundary may
//! still hold several concatenated documents (the reader fell behind) or
//! end inside one (the writer's buffer was split). Complete documents are
//! parsed with a streaming deserializer; an unfinished tail is carried
//! over to the next boundary.

use crate::{ChannelError, DiagnosticsFrame};

/// Largest unfinished tail kept between boundaries.
pub const MAX_PENDING_BYTES: usize = 64 * 1024;

/// Accumulates stream bytes and yields parsed frames at boundaries.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes from one read.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Bytes accumulated but not yet parsed.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drops the buffer if it outgrew [`MAX_PENDING_BYTES`] without reaching
    /// a boundary, returning the error to report. Call after every push.
    pub fn enforce_limit(&mut self) -> Option<ChannelError> {
        if self.pending.len() <= MAX_PENDING_BYTES {
            return None;
        }
        let len = self.pending.len();
        self.pending.clear();
        Some(ChannelError::Parse {
            len,
            detail: format!("unterminated document exceeds {MAX_PENDING_BYTES} bytes"),
        })
    }

    /// Discards any partial document, e.g. after the peer disconnected.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Parses every complete document accumulated so far.
    ///
    /// A malformed document yields one [`ChannelError::Parse`] and the rest
    /// of the boundary is dropped, since a JSON stream cannot be
    /// resynchronised reliably.
    pub fn drain(&mut self) -> Vec<Result<DiagnosticsFrame, ChannelError>> {
        let mut out = Vec::new();
        let mut consumed = 0;
        let mut stream =
            serde_json::Deserializer::from_slice(&self.pending).into_iter::<DiagnosticsFrame>();

        loop {
            match stream.next() {
                None => {
                    consumed = self.pending.len();
                    break;
                }
                Some(Ok(frame)) => {
                    consumed = stream.byte_offset();
                    out.push(Ok(frame));
                }
                Some(Err(e)) if e.is_eof() => {
                    // Unfinished document: keep it for the next boundary.
                    break;
                }
                Some(Err(e)) => {
                    let len = self.pending.len() - consumed;
                    out.push(Err(ChannelError::Parse {
                        len,
                        detail: e.to_string(),
                    }));
                    consumed = self.pending.len();
                    break;
                }
            }
        }

        self.pending.drain(..consumed);
        if let Some(e) = self.enforce_limit() {
            out.push(Err(e));
        }
        // Whitespace between documents is not worth keeping.
        if self.pending.iter().all(u8::is_ascii_whitespace) {
            self.pending.clear();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(results: Vec<Result<DiagnosticsFrame, ChannelError>>) -> Vec<DiagnosticsFrame> {
        results.into_iter().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_single_document() {
        let mut d = FrameDecoder::new();
        d.push(br#"{"writeSequence":7,"logs":["boot ok"]}"#);
        let out = frames(d.drain());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].logs, vec!["boot ok"]);
        assert_eq!(d.pending_len(), 0);
    }

    #[test]
    fn test_concatenated_documents() {
        let mut d = FrameDecoder::new();
        d.push(br#"{"writeSequence":2}{"writeSequence":4} {"writeSequence":6}"#);
        let seqs: Vec<u32> = frames(d.drain()).iter().map(|f| f.write_sequence).collect();
        assert_eq!(seqs, vec![2, 4, 6]);
    }

    #[test]
    fn test_split_document_is_carried_over() {
        let mut d = FrameDecoder::new();
        d.push(br#"{"writeSequence":2}{"writeSeq"#);
        assert_eq!(frames(d.drain()).len(), 1);
        assert!(d.pending_len() > 0);
        d.push(br#"uence":4}"#);
        let out = frames(d.drain());
        assert_eq!(out[0].write_sequence, 4);
        assert_eq!(d.pending_len(), 0);
    }

    #[test]
    fn test_malformed_document_dropped() {
        let mut d = FrameDecoder::new();
        d.push(br#"{"writeSequence":1}{"logs": nope}{"writeSequence":3}"#);
        let out = d.drain();
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(ChannelError::Parse { .. })));
        assert_eq!(d.pending_len(), 0);

        d.push(br#"{"writeSequence":5}"#);
        assert_eq!(frames(d.drain())[0].write_sequence, 5);
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let mut d = FrameDecoder::new();
        d.push(br#"{"writeSequence":"seven"}"#);
        assert!(matches!(d.drain()[0], Err(ChannelError::Parse { .. })));
    }

    #[test]
    fn test_limit_enforced_between_boundaries() {
        let mut d = FrameDecoder::new();
        d.push(b"{\"logs\":[\"");
        assert!(d.enforce_limit().is_none());
        for _ in 0..(MAX_PENDING_BYTES / 4096 + 1) {
            d.push(&[b'a'; 4096]);
        }
        assert!(matches!(d.enforce_limit(), Some(ChannelError::Parse { .. })));
        assert_eq!(d.pending_len(), 0);

        d.push(br#"{"writeSequence":9}"#);
        assert_eq!(frames(d.drain())[0].write_sequence, 9);
    }

    #[test]
    fn test_oversized_tail_is_dropped() {
        let mut d = FrameDecoder::new();
        d.push(b"{\"logs\":[\"");
        d.push(&vec![b'a'; MAX_PENDING_BYTES + 1]);
        let out = d.drain();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_err());
        assert_eq!(d.pending_len(), 0);
    }
}
