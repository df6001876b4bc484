// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The streaming adapter: buffers an arbitrary `Read` source, keeps the window aligned to the
//! next syncword, and emits one frame per call.

use std::io::Read;

use log::{debug, trace, warn};

use crate::descriptor::DescriptorInfo;
use crate::error::Result;
use crate::error::Status;
use crate::options::ReaderOptions;
use crate::packet::{FrameInfo, Packet};
use crate::parser::parse_frame;
use crate::state::ParserState;
use crate::sync::{find_sync, MAX_FRAME_SIZE};

const WINDOW_CAPACITY: usize = 128 * MAX_FRAME_SIZE;

/// Streams frames out of an arbitrary byte source, re-aligning to the next syncword whenever a
/// frame fails to parse.
///
/// Maintains a fixed-capacity window (never grown); when appending new bytes would overflow it,
/// the unconsumed tail is compacted to the start of the window first. Reads larger than the
/// available free space are accepted only partially.
pub struct StreamReader<R> {
    inner: R,
    state: ParserState,
    window: Vec<u8>,
    len: usize,
    eof: bool,
    options: ReaderOptions,
    descriptor: Option<DescriptorInfo>,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_options(inner, ReaderOptions::default())
    }

    pub fn with_options(inner: R, options: ReaderOptions) -> Self {
        StreamReader {
            inner,
            state: ParserState::new(),
            window: vec![0u8; WINDOW_CAPACITY],
            len: 0,
            eof: false,
            options,
            descriptor: None,
        }
    }

    /// The descriptor built from the most recent sync frame, if `options.eager_descriptor` is
    /// set (or a sync frame has been seen since it was last turned on).
    pub fn descriptor(&self) -> Option<&DescriptorInfo> {
        self.descriptor.as_ref()
    }

    /// Consume `n` bytes from the front of the window.
    fn consume(&mut self, n: usize) {
        self.window.copy_within(n..self.len, 0);
        self.len -= n;
    }

    /// Top up the window from the underlying source, compacting first if necessary.
    ///
    /// Returns the number of bytes appended, which is `0` only at genuine end of stream.
    fn fill(&mut self) -> Result<usize> {
        if self.len == self.window.len() {
            // Window is already full of unconsumed data with nowhere to compact to; the caller
            // must make progress (consume or resync) before calling fill again.
            return Ok(0);
        }

        let read = self.inner.read(&mut self.window[self.len..])?;
        self.len += read;
        if read == 0 {
            self.eof = true;
        }
        Ok(read)
    }

    /// Discard bytes up to (but not including) the next candidate syncword in the window.
    ///
    /// Returns `false` if no syncword is present in the current window and more input is
    /// needed before scanning can continue.
    fn resync(&mut self) -> bool {
        match find_sync(&self.window[..self.len]) {
            Some(0) => true,
            Some(offset) => {
                trace!("dropping {} bytes while resyncing", offset);
                self.consume(offset);
                true
            }
            None => {
                // Keep the last 3 bytes: a syncword may straddle the next read.
                let keep = self.len.min(3);
                self.consume(self.len - keep);
                false
            }
        }
    }

    /// Parse and return the next frame, or `Ok(None)` at clean end of stream.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            if !self.resync() {
                if self.fill()? == 0 {
                    return Ok(None);
                }
                continue;
            }

            match parse_frame(&mut self.state, &self.window[..self.len], self.options.eager_descriptor)? {
                (Status::Ok, Some(info), descriptor) => {
                    if descriptor.is_some() {
                        self.descriptor = descriptor;
                    }
                    let data = self.window[..info.frame_bytes as usize].to_vec();
                    self.consume(info.frame_bytes as usize);
                    return Ok(Some(Packet::new(data, info)));
                }
                (Status::Incomplete, ..) => {
                    if self.eof {
                        debug!("truncated frame at end of stream, discarding {} bytes", self.len);
                        return Ok(None);
                    }
                    if self.fill()? == 0 {
                        return Ok(None);
                    }
                }
                (Status::Invalid, ..) | (Status::NoSync, ..) => {
                    warn!("discarding malformed frame, resyncing");
                    self.consume(1);
                }
                (Status::Ok, None, _) => unreachable!("OK status always carries FrameInfo"),
            }
        }
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }
}

/// Convenience alias used by callers that only need the per-frame metadata, not the payload.
pub type FrameOutcome = (Status, Option<FrameInfo>);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn verify_stream_reader_returns_none_on_empty_input() {
        let mut r = StreamReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(r.next_packet().unwrap().is_none());
    }

    #[test]
    fn verify_stream_reader_has_no_descriptor_before_any_sync_frame() {
        let r = StreamReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(r.descriptor().is_none());
    }

    #[test]
    fn verify_stream_reader_discards_garbage_before_first_syncword() {
        let mut bytes = vec![0xAAu8; 10];
        bytes.extend_from_slice(&crate::sync::SYNC_WORD.to_be_bytes());
        // Not a complete frame, but should resync to offset 10 without error before running out
        // of input.
        let mut r = StreamReader::new(Cursor::new(bytes));
        assert!(r.next_packet().unwrap().is_none());
    }
}
