// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Locating the elementary-stream payload inside an optional `DTSHDHDR`/`STRMDATA` container.
//!
//! A DTS-UHD elementary stream may appear bare (just sync/non-sync frames back to back) or
//! wrapped in a small chunked container: an 8-byte ASCII tag followed by an 8-byte big-endian
//! size, repeated until a `STRMDATA` chunk is reached. Everything from the end of that chunk's
//! header to the end of its declared size (or end of file, if the size is unknown) is the
//! elementary stream payload.

use crate::error::{decode_error, Result};

const HEADER_TAG: &[u8; 8] = b"DTSHDHDR";
const STREAM_TAG: &[u8; 8] = b"STRMDATA";
const CHUNK_HEADER_LEN: usize = 16;

/// The location of the elementary-stream payload within a buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PayloadLocation {
    /// Byte offset, from the start of the buffer, at which the elementary stream begins.
    pub offset: usize,
    /// Declared size of the payload in bytes, or `None` if the chunk extends to end of input.
    pub size: Option<u64>,
}

/// Inspect the leading bytes of `buf` for a `DTSHDHDR` container and locate its `STRMDATA` chunk.
///
/// Returns `Ok(None)` when `buf` does not begin with a recognized container tag, meaning the
/// buffer should be treated as a bare elementary stream starting at offset 0.
pub fn locate_payload(buf: &[u8]) -> Result<Option<PayloadLocation>> {
    if buf.len() < CHUNK_HEADER_LEN || &buf[0..8] != HEADER_TAG {
        return Ok(None);
    }

    // DTSHDHDR is a chunk like any other: tag + 8-byte size + a payload of that size. Skip past
    // its own payload, not just its header, before scanning the chunks that follow it.
    let header_size = u64::from_be_bytes(buf[8..16].try_into().unwrap());
    let mut pos = CHUNK_HEADER_LEN + header_size as usize;

    while pos + CHUNK_HEADER_LEN <= buf.len() {
        let tag = &buf[pos..pos + 8];
        let size = u64::from_be_bytes(buf[pos + 8..pos + 16].try_into().unwrap());
        let header_end = pos + CHUNK_HEADER_LEN;

        if tag == STREAM_TAG {
            return Ok(Some(PayloadLocation {
                offset: header_end,
                size: if size == 0 { None } else { Some(size) },
            }));
        }

        if size == 0 {
            return decode_error("container chunk declares zero size before STRMDATA");
        }

        pos = header_end + size as usize;
    }

    decode_error("container header present but STRMDATA chunk not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(tag: &[u8; 8], payload_len: u64) -> Vec<u8> {
        let mut v = tag.to_vec();
        v.extend_from_slice(&payload_len.to_be_bytes());
        v
    }

    #[test]
    fn verify_bare_stream_has_no_container() {
        let buf = [0x40, 0x41, 0x1b, 0xf2, 0, 0, 0, 0];
        assert_eq!(locate_payload(&buf).unwrap(), None);
    }

    #[test]
    fn verify_locates_strmdata_directly() {
        let mut buf = chunk(HEADER_TAG, 0);
        buf.extend_from_slice(&chunk(STREAM_TAG, 1024));
        buf.extend_from_slice(&[0u8; 8]);

        let loc = locate_payload(&buf).unwrap().unwrap();
        assert_eq!(loc.offset, 32);
        assert_eq!(loc.size, Some(1024));
    }

    #[test]
    fn verify_skips_dtshdhdr_payload() {
        let mut buf = chunk(HEADER_TAG, 8);
        buf.extend_from_slice(&[0xbb; 8]); // DTSHDHDR's own declared payload.
        buf.extend_from_slice(&chunk(STREAM_TAG, 512));

        let loc = locate_payload(&buf).unwrap().unwrap();
        assert_eq!(loc.offset, 16 + 8 + 16);
        assert_eq!(loc.size, Some(512));
    }

    #[test]
    fn verify_skips_intermediate_chunks() {
        let mut buf = chunk(HEADER_TAG, 0);
        buf.extend_from_slice(&chunk(b"METADATA", 4));
        buf.extend_from_slice(&[0xaa; 4]);
        buf.extend_from_slice(&chunk(STREAM_TAG, 0));

        let loc = locate_payload(&buf).unwrap().unwrap();
        assert_eq!(loc.offset, 16 + 16 + 4 + 16);
        assert_eq!(loc.size, None);
    }

    #[test]
    fn verify_missing_strmdata_is_an_error() {
        let buf = chunk(HEADER_TAG, 0);
        assert!(locate_payload(&buf).is_err());
    }
}
