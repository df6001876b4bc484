// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The demuxer adapter: locate the payload region (if the input is a `DTSHDHDR` container),
//! parse the first sync frame once to obtain the stream descriptor, then stream raw packets up
//! to the maximum frame size out of the payload region.

use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::container::locate_payload;
use crate::descriptor::DescriptorInfo;
use crate::error::{decode_error, Result};
use crate::error::Status;
use crate::options::ReaderOptions;
use crate::packet::Packet;
use crate::parser::parse_frame;
use crate::state::ParserState;
use crate::sync::MAX_FRAME_SIZE;

/// File extension recognized by this adapter.
pub const EXTENSION: &str = "dtsx";

/// Probe score returned when a syncword is found and a single frame parses successfully.
pub const PROBE_SCORE: u8 = u8::MAX - 3;

/// A one-shot demultiplexer over a seekable byte source.
pub struct DtsUhdReader<R> {
    source: R,
    state: ParserState,
    payload_end: Option<u64>,
    descriptor: DescriptorInfo,
}

impl<R: Read + Seek> DtsUhdReader<R> {
    /// Open `source`, locating the payload region and parsing its first sync frame to build the
    /// stream descriptor.
    pub fn try_new(source: R) -> Result<Self> {
        Self::try_new_with_options(source, ReaderOptions::default())
    }

    /// As [`Self::try_new`], but with an explicit [`ReaderOptions`] (only `probe_bytes` matters
    /// to this adapter).
    pub fn try_new_with_options(mut source: R, options: ReaderOptions) -> Result<Self> {
        let mut probe = vec![0u8; options.probe_bytes];
        let read = source.read(&mut probe)?;
        probe.truncate(read);

        let (payload_start, payload_end) = match locate_payload(&probe)? {
            Some(loc) => (loc.offset as u64, loc.size.map(|size| loc.offset as u64 + size)),
            None => (0, None),
        };

        source.seek(SeekFrom::Start(payload_start))?;

        let mut head = vec![0u8; MAX_FRAME_SIZE];
        let read = source.read(&mut head)?;
        head.truncate(read);

        let mut state = ParserState::new();
        let (status, _info, descriptor) = parse_frame(&mut state, &head, true)?;

        if status != Status::Ok {
            return decode_error("failed to parse initial sync frame");
        }

        let descriptor = match descriptor {
            Some(d) => d,
            None => return decode_error("sync frame parsed but no suitable default object found"),
        };

        debug!("dts-uhd stream: {} channels, {} Hz", descriptor.channel_count, descriptor.sample_rate);

        source.seek(SeekFrom::Start(payload_start))?;

        Ok(DtsUhdReader { source, state, payload_end, descriptor })
    }

    pub fn descriptor(&self) -> &DescriptorInfo {
        &self.descriptor
    }

    /// Probe score for `context`: the leading bytes of a candidate input.
    pub fn score(context: &[u8]) -> u8 {
        let mut state = ParserState::new();
        match crate::sync::find_sync(context) {
            Some(offset) => match parse_frame(&mut state, &context[offset..], false) {
                Ok((Status::Ok, ..)) => PROBE_SCORE,
                _ => 0,
            },
            None => 0,
        }
    }

    /// Read and return the next raw packet from the payload region, or `Ok(None)` at the end of
    /// the payload (or source).
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        let pos = self.source.stream_position()?;
        if let Some(end) = self.payload_end {
            if pos >= end {
                return Ok(None);
            }
        }

        let mut buf = vec![0u8; MAX_FRAME_SIZE];
        let limit = match self.payload_end {
            Some(end) => buf.len().min((end - pos) as usize),
            None => buf.len(),
        };

        let read = self.source.read(&mut buf[..limit])?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);

        let (status, info, _) = parse_frame(&mut self.state, &buf, false)?;

        match status {
            Status::Ok => {
                let info = info.expect("OK status always carries FrameInfo");
                let frame_bytes = info.frame_bytes as usize;
                self.source.seek(SeekFrom::Start(pos + frame_bytes as u64))?;
                buf.truncate(frame_bytes);
                Ok(Some(Packet::new(buf, info)))
            }
            Status::Incomplete => Ok(None),
            Status::Invalid | Status::NoSync => decode_error("malformed frame in payload region"),
        }
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_score_rejects_buffer_without_syncword() {
        let ctx = [0u8; 32];
        assert_eq!(DtsUhdReader::<std::io::Cursor<Vec<u8>>>::score(&ctx), 0);
    }
}
