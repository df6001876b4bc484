// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter configuration, in the shape of a plain `Copy` options struct rather than a builder.

/// Options shared by [`crate::reader::StreamReader`] and [`crate::demux::DtsUhdReader`].
#[derive(Copy, Clone, Debug)]
pub struct ReaderOptions {
    /// Re-walk the metadata chunks on every sync frame (not just the first) to keep the exposed
    /// descriptor current as the stream's object/presentation layout changes. Off by default:
    /// most callers only need the descriptor once, up front, and metadata-chunk parsing is the
    /// most expensive part of a frame to walk.
    pub eager_descriptor: bool,

    /// Size, in bytes, of the initial probe read [`crate::demux::DtsUhdReader::try_new`] uses to
    /// locate the container payload and parse the first sync frame. Unused by `StreamReader`.
    pub probe_bytes: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions { eager_descriptor: false, probe_bytes: 64 * 1024 }
    }
}
