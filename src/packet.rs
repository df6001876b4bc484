// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output types emitted per parsed frame.

/// Per-frame metadata produced by a successful `parse_frame` call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameInfo {
    pub sync: bool,
    pub frame_bytes: u64,
    pub sample_rate: u32,
    pub sample_count: u64,
    pub duration_num: u64,
    pub duration_den: u64,
}

impl FrameInfo {
    /// Frame duration in seconds, as a reduced-precision `f64`.
    ///
    /// The exact rational form is available via `duration_num`/`duration_den` for callers that
    /// need exact timestamp accumulation without floating-point drift.
    pub fn duration_secs(&self) -> f64 {
        if self.duration_den == 0 {
            0.0
        }
        else {
            self.duration_num as f64 / self.duration_den as f64
        }
    }
}

/// A single opaque, undecoded elementary-stream frame handed to downstream consumers.
#[derive(Clone, Debug)]
pub struct Packet {
    pub data: Vec<u8>,
    pub info: FrameInfo,
}

impl Packet {
    pub fn new(data: Vec<u8>, info: FrameInfo) -> Self {
        Packet { data, info }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
