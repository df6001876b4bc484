// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A pure Rust frame parser and demultiplexer for the DTS-UHD (DTS:X Profile 2) bitstream, as
//! standardized by ETSI TS 103 491.
//!
//! The crate is layered bottom-up:
//!
//! - [`bitstream`] and [`crc`] are the bit-level primitives the format's custom encoding is
//!   built from.
//! - [`sync`] locates frame boundaries; [`container`] locates the elementary stream inside an
//!   optional chunked wrapper.
//! - [`state`] holds everything that survives across frames; [`parser::parse_frame`] is the
//!   single entry point that walks one frame and mutates that state.
//! - [`descriptor`] turns accumulated object state into a sample-entry-equivalent descriptor.
//! - [`reader`] and [`demux`] are the two adapters most callers actually want: a streaming
//!   reader over an arbitrary byte source, and a one-shot demuxer over a seekable one. Both take
//!   an [`options::ReaderOptions`].

pub mod bitstream;
pub mod container;
pub mod crc;
pub mod demux;
pub mod descriptor;
pub mod error;
pub mod options;
pub mod packet;
pub mod parser;
pub mod reader;
pub mod state;
pub mod sync;

pub use demux::DtsUhdReader;
pub use descriptor::DescriptorInfo;
pub use error::{Error, Result, Status};
pub use options::ReaderOptions;
pub use packet::{FrameInfo, Packet};
pub use parser::parse_frame;
pub use reader::StreamReader;
pub use state::ParserState;
