// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios over hand-built synthetic frames.
//!
//! Every frame here uses `full_channel_mix_flag = true`, which collapses most of the format's
//! optional fields to fixed values and keeps the synthetic bitstreams small enough to lay out
//! by hand.

use dts_uhd::container::locate_payload;
use dts_uhd::crc;
use dts_uhd::error::Status;
use dts_uhd::parser::parse_frame;
use dts_uhd::state::ParserState;
use dts_uhd::sync::{NON_SYNC_WORD, SYNC_WORD};

/// A minimal big-endian, MSB-first bit writer used only to author test fixtures. It mirrors the
/// `VarField` encoding but only ever emits the narrowest (index 0) form, which is sufficient for
/// every value used in these fixtures.
struct BitWriter {
    bits: Vec<bool>,
}

impl BitWriter {
    fn new() -> Self {
        BitWriter { bits: Vec::new() }
    }

    fn push(&mut self, value: u64, width: u32) {
        for i in (0..width).rev() {
            self.bits.push((value >> i) & 1 != 0);
        }
    }

    /// Encode `value` using the narrowest `VarField` index (a single `0` prefix bit followed by
    /// `table[0]` value bits). Only valid when `value` fits in `table[0]` bits.
    fn push_var_field(&mut self, table: [u32; 4], value: u64) {
        assert!(value < (1u64 << table[0]), "fixture value does not fit the index-0 VarField width");
        self.push(0, 1);
        self.push(value, table[0]);
    }

    fn pad_to_bit(&mut self, total_bits: usize) {
        assert!(self.bits.len() <= total_bits, "fixture already exceeds the requested padding length");
        while self.bits.len() < total_bits {
            self.bits.push(false);
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        let mut bytes = vec![0u8; (self.bits.len() + 7) / 8];
        for (i, &bit) in self.bits.iter().enumerate() {
            if bit {
                bytes[i / 8] |= 0x80 >> (i % 8);
            }
        }
        bytes
    }
}

/// Build a minimal full-channel-mix sync frame: mono (activity 0x1), 48 kHz, one navi entry
/// whose id defaults to `navi_id`. Returns the complete frame bytes (`ftoc_bytes` + one 3-byte
/// MD01 chunk).
fn build_sync_frame(navi_id: u64) -> Vec<u8> {
    let mut w = BitWriter::new();
    w.push(u64::from(SYNC_WORD), 32);
    w.push_var_field([5, 8, 10, 12], 15); // ftoc_bytes = 16
    w.push(1, 1); // full_channel_mix_flag
    w.push(0, 2); // frame_duration select -> 512
    w.push(0, 3); // frame_duration_code -> x1
    w.push(2, 2); // clock_rate select -> 48000
    w.push(0, 1); // no timestamp
    w.push(0, 2); // sample_rate_mod
    w.push_var_field([6, 9, 12, 15], 3); // chunks[0].bytes = 3 (the MD01 chunk below)
    w.push_var_field([2, 4, 6, 8], navi_id); // navi[0].id
    w.push_var_field([9, 11, 13, 16], 0); // navi[0].bytes = 0
    w.pad_to_bit(14 * 8);

    let mut ftoc = w.into_bytes();
    assert_eq!(ftoc.len(), 14);
    ftoc.push(0);
    ftoc.push(0);

    'search: for hi in 0u8..=255 {
        for lo in 0u8..=255 {
            ftoc[14] = hi;
            ftoc[15] = lo;
            if crc::validate(&ftoc) {
                break 'search;
            }
        }
    }
    assert!(crc::validate(&ftoc), "failed to find a zero-residue CRC trailer for the fixture");

    // The single FTOC chunk: an MD01 (id=1) whose body is all-zero, which decodes to a mono
    // (ch_activity_mask table index 0) object on presentation 0.
    ftoc.push(1);
    ftoc.push(0);
    ftoc.push(0);

    ftoc
}

/// A matching non-sync frame: all state is inherited, so only the FTOC size field and an empty
/// chunk-navigation tail are present.
fn build_non_sync_frame() -> Vec<u8> {
    let mut w = BitWriter::new();
    w.push(u64::from(NON_SYNC_WORD), 32);
    w.push_var_field([5, 8, 10, 12], 15); // ftoc_bytes = 16
    w.push_var_field([9, 11, 13, 16], 0); // navi[0].bytes = 0
    w.pad_to_bit(16 * 8);
    w.into_bytes()
}

#[test]
fn scenario_1_minimal_sync_frame_mono() {
    let mut state = ParserState::new();
    let frame = build_sync_frame(0);

    let (status, info, descriptor) = parse_frame(&mut state, &frame, true).unwrap();
    assert_eq!(status, Status::Ok);

    let info = info.unwrap();
    assert!(info.sync);
    assert_eq!(info.sample_rate, 48000);

    let descriptor = descriptor.expect("sync frame with a suitable object must yield a descriptor");
    assert_eq!(&descriptor.coding_name, b"dtsx");
    assert_eq!(descriptor.channel_count, 1);
    assert_eq!(descriptor.channel_mask, 1);
    assert_eq!(descriptor.num_pres_code, 0);
    assert_eq!(descriptor.decoder_profile_code, 0);
    assert_eq!(descriptor.max_payload_code, 0);
}

#[test]
fn scenario_2_sync_then_non_sync_sequence() {
    let mut state = ParserState::new();

    let sync_frame = build_sync_frame(0);
    let (status, info, _) = parse_frame(&mut state, &sync_frame, false).unwrap();
    assert_eq!(status, Status::Ok);
    assert!(info.unwrap().sync);

    let non_sync_frame = build_non_sync_frame();
    let (status, info, _) = parse_frame(&mut state, &non_sync_frame, false).unwrap();
    assert_eq!(status, Status::Ok);
    let info = info.unwrap();
    assert!(!info.sync);
    assert_eq!(info.sample_rate, 48000);
}

#[test]
fn scenario_2_non_sync_before_any_sync_yields_nosync() {
    let mut state = ParserState::new();
    let non_sync_frame = build_non_sync_frame();

    let (status, ..) = parse_frame(&mut state, &non_sync_frame, false).unwrap();
    assert_eq!(status, Status::NoSync);
}

#[test]
fn scenario_3_truncated_inputs_are_incomplete() {
    let frame = build_sync_frame(0);

    let mut state = ParserState::new();
    let (status, ..) = parse_frame(&mut state, &frame[0..3], false).unwrap();
    assert_eq!(status, Status::Incomplete);

    // Shorter than the declared ftoc_bytes (16).
    let mut state = ParserState::new();
    let (status, ..) = parse_frame(&mut state, &frame[0..15], false).unwrap();
    assert_eq!(status, Status::Incomplete);

    // One byte short of the full frame (19 bytes).
    let mut state = ParserState::new();
    let (status, ..) = parse_frame(&mut state, &frame[0..frame.len() - 1], false).unwrap();
    assert_eq!(status, Status::Incomplete);
}

#[test]
fn scenario_4_corrupted_ftoc_crc_is_invalid() {
    let mut frame = build_sync_frame(0);
    // The last FTOC byte is pure CRC trailer, never interpreted as a decoded field.
    let last = frame.len() - 1;
    frame[13] ^= 0x01;
    let _ = last;

    let mut state = ParserState::new();
    let (status, ..) = parse_frame(&mut state, &frame, false).unwrap();
    assert_eq!(status, Status::Invalid);
}

#[test]
fn scenario_5_container_locator_finds_strmdata() {
    let mut container = Vec::new();
    container.extend_from_slice(b"DTSHDHDR");
    container.extend_from_slice(&0u64.to_be_bytes());
    container.extend_from_slice(b"STRMDATA");

    let payload = build_sync_frame(0);
    container.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    let k = container.len();
    container.extend_from_slice(&payload);

    let loc = locate_payload(&container).unwrap().unwrap();
    assert_eq!(loc.offset, k);
    assert_eq!(loc.size, Some(payload.len() as u64));
}

#[test]
fn scenario_6_navi_id_three_halves_sample_count() {
    let mut state = ParserState::new();
    let frame = build_sync_frame(3);

    let (status, info, _) = parse_frame(&mut state, &frame, false).unwrap();
    assert_eq!(status, Status::Ok);

    let info = info.unwrap();
    // Without the id=3 fraction, sample_count would be 512 * 48000 / 48000 = 512.
    assert_eq!(info.sample_count, 256);
}

#[test]
fn scenario_6_navi_id_four_quarters_sample_count() {
    let mut state = ParserState::new();
    let frame = build_sync_frame(4);

    let (status, info, _) = parse_frame(&mut state, &frame, false).unwrap();
    assert_eq!(status, Status::Ok);

    let info = info.unwrap();
    assert_eq!(info.sample_count, 128);
}
