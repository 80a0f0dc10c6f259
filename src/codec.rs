/*
 * SPDX-FileCopyrightText: 2022 perillamint
 *
 * SPDX-License-Identifier: MPL-2.0
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Incremental JSON framing for the device console.
//!
//! The firmware prints boot logs, heartbeats and colored log lines on the same
//! link as its JSON replies. [`FrameDecoder`] is fed raw chunks as they arrive
//! and hands back every complete top-level JSON object found so far.

use crate::consts::MAX_BUFFER_LENGTH;
use bytes::{Buf, BytesMut};
use lazy_static::lazy_static;
use log::{trace, warn};
use regex::Regex;
use serde_json::Value;
use std::collections::VecDeque;
use std::io::{Error, Result};
use tokio_util::codec::Decoder;

lazy_static! {
    static ref ANSI_SGR: Regex = Regex::new(r"\x1b\[[0-9;]*m").expect("valid SGR pattern");
}

/// Stream decoder owning the carry-over buffer of one exchange.
pub struct FrameDecoder {
    /// Trailing bytes of a UTF-8 sequence split by a chunk boundary.
    pending: Vec<u8>,
    buffer: String,
    max_buffer_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_limit(MAX_BUFFER_LENGTH)
    }

    /// Create a decoder whose buffer never grows past `max_buffer_len` bytes.
    pub fn with_limit(max_buffer_len: usize) -> Self {
        Self {
            pending: vec![],
            buffer: String::new(),
            max_buffer_len,
        }
    }

    /// Text received but not yet resolved into a JSON value.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Pour a raw chunk into the decoder and collect every JSON value
    /// completed by it, in stream order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Value> {
        let text = self.decode_utf8(chunk);
        self.buffer.push_str(&text.replace('\r', "\n"));

        // Strip over the whole buffer so an escape split across chunks goes too.
        if ANSI_SGR.is_match(&self.buffer) {
            self.buffer = ANSI_SGR.replace_all(&self.buffer, "").into_owned();
        }

        let values = extract_values(&mut self.buffer);
        self.enforce_limit();
        values
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    rest = &rest[rest.len()..];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end, wait for the next chunk.
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        out
    }

    fn enforce_limit(&mut self) {
        if self.buffer.len() <= self.max_buffer_len {
            return;
        }

        // Noise ahead of the pending candidate goes first, the candidate stays whole.
        let keep_from = self.buffer.find('{').unwrap_or(self.buffer.len());
        warn!(
            "Decode buffer exceeded {} bytes, dropping {} bytes of unframed output",
            self.max_buffer_len, keep_from
        );
        self.buffer.drain(..keep_from);
        if self.buffer.len() > self.max_buffer_len {
            warn!("Unterminated object larger than buffer ceiling, discarding it");
            self.buffer.clear();
        }
    }
}

/// Pull every complete top-level JSON value out of `buffer`.
///
/// Consumed text (noise before an object and the object itself) is removed.
/// Balanced candidates that fail to parse are dropped, as is a candidate whose
/// string literal runs into a line break. An unterminated object is left in
/// place for the next call.
pub fn extract_values(buffer: &mut String) -> Vec<Value> {
    let mut values = vec![];

    while let Some(start) = buffer.find('{') {
        match scan_candidate(&buffer[start..]) {
            Candidate::Complete(len) => {
                let end = start + len;
                let parsed = serde_json::from_str::<Value>(buffer[start..end].trim());
                buffer.drain(..end);

                match parsed {
                    Ok(value) => values.push(value),
                    Err(e) => trace!("Dropping malformed candidate: {}", e),
                }
            }
            Candidate::Broken(len) => {
                trace!("Dropping candidate cut by a line break");
                buffer.drain(..start + len);
            }
            Candidate::Incomplete => break,
        }
    }

    values
}

enum Candidate {
    /// Balanced object of this length.
    Complete(usize),
    /// Not JSON: a string literal hit a raw line break at this offset.
    Broken(usize),
    /// Needs more input.
    Incomplete,
}

/// Scan the object at the head of `text` (which starts with `{`).
/// Braces inside string literals do not count.
fn scan_candidate(text: &str) -> Candidate {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            if b == b'\n' {
                return Candidate::Broken(i);
            }
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Candidate::Complete(i + 1);
                }
            }
            _ => {}
        }
    }

    Candidate::Incomplete
}

/// [`Decoder`] adapter so a console byte stream can be read as a stream of
/// JSON values with `FramedRead`.
#[derive(Default)]
pub struct JsonFrameCodec {
    decoder: FrameDecoder,
    ready: VecDeque<Value>,
}

impl Decoder for JsonFrameCodec {
    type Item = Value;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Value>> {
        if !buf.is_empty() {
            let values = self.decoder.feed(&buf[..]);
            buf.advance(buf.len());
            self.ready.extend(values);
        }
        Ok(self.ready.pop_front())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    const STREAM: &[u8] = b"I (312) boot: ESP-IDF v5.1\r\n\x1b[0;32mI (320) heartbeat\x1b[0m\r\n\
{\"networks\":[{\"ssid\":\"Home\",\"rssi\":-40}]}\r\nW (400) wifi: retry\r\n\
{\"results\":[\"{\\\"result\\\":\\\"{\\\\\\\"hostname\\\\\\\":\\\\\\\"tracker1\\\\\\\"}\\\"}\"]}\n\
{\"error\":\"invalid mode\"}";

    fn expected() -> Vec<Value> {
        vec![
            json!({"networks": [{"ssid": "Home", "rssi": -40}]}),
            json!({"results": ["{\"result\":\"{\\\"hostname\\\":\\\"tracker1\\\"}\"}"]}),
            json!({"error": "invalid mode"}),
        ]
    }

    #[test]
    fn extracts_objects_from_noise() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.feed(STREAM), expected());
        assert_eq!(decoder.buffer(), "");
    }

    #[test]
    fn chunk_boundaries_do_not_matter() {
        let mut whole = FrameDecoder::new();
        let reference = whole.feed(STREAM);

        for size in [1, 2, 3, 7, 16, 64] {
            let mut decoder = FrameDecoder::new();
            let mut values = vec![];
            for chunk in STREAM.chunks(size) {
                values.extend(decoder.feed(chunk));
            }
            assert_eq!(values, reference, "chunk size {}", size);
            assert_eq!(decoder.buffer(), whole.buffer());
        }
    }

    #[test]
    fn final_brace_split_across_reads() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"{\"error\":{\"code\":1}").is_empty());
        assert!(decoder.feed(b"}").len() == 1);
        assert_eq!(decoder.buffer(), "");

        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"{\"a\":{\"b\":1}").is_empty());
        assert_eq!(decoder.feed(b"}"), vec![json!({"a": {"b": 1}})]);
    }

    #[test]
    fn plain_text_is_left_untouched() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"I (10) boot: hello\r").is_empty());
        assert_eq!(decoder.buffer(), "I (10) boot: hello\n");
    }

    #[test]
    fn malformed_candidate_is_dropped() {
        let mut decoder = FrameDecoder::new();
        let values = decoder.feed(b"{not json} noise {\"ok\":true}");
        assert_eq!(values, vec![json!({"ok": true})]);
        assert_eq!(decoder.buffer(), "");
    }

    #[test]
    fn braces_inside_strings() {
        let mut decoder = FrameDecoder::new();
        let values = decoder.feed(b"{\"hostname\":\"we{ird}\\\"}{\"}");
        assert_eq!(values, vec![json!({"hostname": "we{ird}\"}{"})]);
    }

    #[test]
    fn unbalanced_quote_in_log_line() {
        let stream = b"W (5) wifi: {ssid \"Bob's} retry\r\n{\"networks\":[]}\r\n";
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.feed(stream), vec![json!({"networks": []})]);
        assert_eq!(decoder.buffer(), "\n\n");

        let mut decoder = FrameDecoder::new();
        let mut values = vec![];
        for chunk in stream.chunks(3) {
            values.extend(decoder.feed(chunk));
        }
        assert_eq!(values, vec![json!({"networks": []})]);
    }

    #[test]
    fn split_utf8_sequence() {
        let text = "{\"ssid\":\"Caf\u{e9} \u{1f4f6}\"}".as_bytes();
        let mut decoder = FrameDecoder::new();
        let mut values = vec![];
        for b in text {
            values.extend(decoder.feed(&[*b]));
        }
        assert_eq!(values, vec![json!({"ssid": "Caf\u{e9} \u{1f4f6}"})]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"\xff\xfe log").is_empty());
        assert_eq!(decoder.buffer(), "\u{fffd}\u{fffd} log");
    }

    #[test]
    fn ansi_escape_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"{\"error\":\"x\"\x1b[0").is_empty());
        assert_eq!(decoder.feed(b";31m}"), vec![json!({"error": "x"})]);
    }

    #[test]
    fn buffer_ceiling() {
        let mut decoder = FrameDecoder::with_limit(16);
        decoder.feed(b"0123456789abcdefXYZ");
        assert_eq!(decoder.buffer(), "");

        decoder.feed(b"0123456789{\"a\":");
        assert_eq!(decoder.buffer(), "0123456789{\"a\":");
        decoder.feed(b"12");
        assert_eq!(decoder.buffer(), "{\"a\":12");
        assert_eq!(decoder.feed(b"}"), vec![json!({"a": 12})]);
    }

    #[test]
    fn buffer_ceiling_keeps_nested_candidate_whole() {
        let mut decoder = FrameDecoder::with_limit(16);
        decoder.feed(b"0123456789");
        decoder.feed(b"{\"a\":{\"b\":");
        assert_eq!(decoder.buffer(), "{\"a\":{\"b\":");
        assert_eq!(decoder.feed(b"1}}"), vec![json!({"a": {"b": 1}})]);
    }

    #[test]
    fn codec_yields_values_one_at_a_time() {
        let mut codec = JsonFrameCodec::default();
        let mut buf = BytesMut::from(&b"{\"a\":1}log{\"b\""[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(json!({"a": 1})));
        assert!(buf.is_empty());
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b":2}{\"c\":3}");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(json!({"b": 2})));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(json!({"c": 3})));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }
}
