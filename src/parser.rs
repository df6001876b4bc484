// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The frame parser: a single-entry-point state machine that walks the FTOC, the chunk
//! navigation table, and (for sync frames, when a descriptor is requested) the MD01 metadata
//! chunk, mutating [`ParserState`] and producing a [`FrameInfo`] and, on sync frames, a
//! [`DescriptorInfo`].

use crate::bitstream::{read_var_field, BitReader};
use crate::crc;
use crate::descriptor::{self, DescriptorInfo};
use crate::error::{null_error, Result, Status};
use crate::packet::FrameInfo;
use crate::state::{ChunkDesc, Md01, ParserState, RepType};
use crate::sync::{NON_SYNC_WORD, SYNC_WORD};

const FRAME_DURATIONS: [u32; 4] = [512, 480, 384, 0];
const CLOCK_RATES: [u32; 4] = [32000, 44100, 48000, 0];
const CH_ACTIVITY_TABLE: [u64; 14] = [
    0x1, 0x2, 0x6, 0xF, 0x1F, 0x84B, 0x2F, 0x802F, 0x486B, 0x886B, 0x3FBFB, 0x3, 0x7, 0x843,
];

#[derive(Copy, Clone, PartialEq, Eq)]
enum StaticParamsMode {
    Full,
    OnlyFirst,
}

/// Parse a single frame from the head of `bytes`.
///
/// `want_descriptor` requests that, on a sync frame, the metadata chunks also be walked to
/// rebuild the [`DescriptorInfo`] (this is the expensive path; a streaming caller that has
/// already captured the descriptor from an earlier sync frame can pass `false`).
///
/// Returns `Err(Error::Null(..))` only when `bytes` is empty, which is a caller-contract
/// violation distinct from every other outcome; all other results are carried in the returned
/// [`Status`].
pub fn parse_frame(
    state: &mut ParserState,
    bytes: &[u8],
    want_descriptor: bool,
) -> Result<(Status, Option<FrameInfo>, Option<DescriptorInfo>)> {
    if bytes.is_empty() {
        return null_error("bytes");
    }

    // Stage 1: preflight.
    if bytes.len() < 4 {
        return Ok((Status::Incomplete, None, None));
    }

    let word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let is_sync = match word {
        w if w == SYNC_WORD => true,
        w if w == NON_SYNC_WORD => false,
        _ => return Ok((Status::NoSync, None, None)),
    };

    if !is_sync && !state.saw_sync {
        return Ok((Status::NoSync, None, None));
    }

    let mut reader = BitReader::new(bytes);
    reader.skip(32);

    // Stage 2: FTOC size.
    let ftoc_bytes = read_var_field(&mut reader, [5, 8, 10, 12], true) + 1;
    if ftoc_bytes < 5 || ftoc_bytes as usize >= bytes.len() {
        return Ok((Status::Incomplete, None, None));
    }

    // Stage 3: stream parameters.
    let full_channel_mix_flag = if is_sync { reader.read_bit() } else { state.full_channel_mix_flag };

    if !full_channel_mix_flag || is_sync {
        if !crc::validate(&bytes[0..ftoc_bytes as usize]) {
            return Ok((Status::Invalid, None, None));
        }
    }

    if is_sync {
        state.full_channel_mix_flag = full_channel_mix_flag;

        state.major_version = if full_channel_mix_flag {
            2
        } else {
            let wide = reader.read_bit();
            let width = if wide { 6 } else { 3 };
            let first = reader.read(width);
            reader.skip(width);
            first as u32 + 2
        };

        let duration_base = FRAME_DURATIONS[reader.read(2) as usize];
        state.frame_duration_code = reader.read(3) as u32;
        state.frame_duration = duration_base * (state.frame_duration_code + 1);
        state.clock_rate = CLOCK_RATES[reader.read(2) as usize];

        if state.frame_duration == 0 || state.clock_rate == 0 {
            return Ok((Status::Invalid, None, None));
        }

        if reader.read_bit() {
            reader.skip(36);
        }

        state.sample_rate_mod = reader.read(2) as u32;
        state.sample_rate = state.clock_rate << state.sample_rate_mod;

        if !full_channel_mix_flag {
            reader.skip(1);
            state.interactive_obj_limits_present = reader.read_bit();
        }
        else {
            state.interactive_obj_limits_present = false;
        }
    }

    // Stage 4: audio presentations.
    parse_audio_presentations(&mut reader, state, is_sync, full_channel_mix_flag);

    // Stage 5: chunk navigation.
    let chunk_count = parse_chunk_navigation(&mut reader, state, is_sync, full_channel_mix_flag);

    // Stage 6: frame size check.
    state.ftoc_bytes = ftoc_bytes;
    let frame_bytes = ftoc_bytes + state.chunk_bytes;
    state.frame_bytes = frame_bytes;

    if frame_bytes as usize > bytes.len() {
        return Ok((Status::Incomplete, None, None));
    }

    // Stage 7: metadata chunks.
    let mut descriptor = None;
    if want_descriptor && is_sync {
        reader.align_to(ftoc_bytes as usize * 8);

        let mut offset_bytes = ftoc_bytes;
        for i in 0..chunk_count {
            let chunk = state.chunks[i];
            let chunk_end = offset_bytes + chunk.bytes;

            if chunk.crc_flag {
                let start = offset_bytes as usize;
                let end = chunk_end as usize;
                if end > bytes.len() || !crc::validate(&bytes[start..end]) {
                    return Ok((Status::Invalid, None, None));
                }
            }

            let chunk_id = reader.read(8) as u32;
            if chunk_id == 1 {
                parse_md01(&mut reader, state, full_channel_mix_flag, state.interactive_obj_limits_present);
            }

            reader.align_to(chunk_end as usize * 8);
            offset_bytes = chunk_end;
        }

        descriptor = descriptor::build_descriptor(state);
    }

    // Stage 8: duration fraction.
    let fraction = state
        .navi
        .iter()
        .find(|e| e.present && (e.id == 3 || e.id == 4))
        .map(|e| if e.id == 3 { 2 } else { 4 })
        .unwrap_or(1);

    let sample_count = u64::from(state.frame_duration) * u64::from(state.sample_rate)
        / (u64::from(state.clock_rate) * fraction);

    state.saw_sync = true;

    let info = FrameInfo {
        sync: is_sync,
        frame_bytes,
        sample_rate: state.sample_rate,
        sample_count,
        duration_num: u64::from(state.frame_duration),
        duration_den: u64::from(state.clock_rate) * fraction,
    };

    Ok((Status::Ok, Some(info), descriptor))
}

fn parse_audio_presentations(reader: &mut BitReader<'_>, state: &mut ParserState, is_sync: bool, full_channel_mix_flag: bool) {
    if is_sync {
        state.num_audio_pres = if full_channel_mix_flag {
            1
        }
        else {
            read_var_field(reader, [0, 2, 4, 5], true) as u32 + 1
        };

        for p in 0..state.num_audio_pres as usize {
            state.audio[p] = Default::default();
        }
    }

    for p in 0..state.num_audio_pres as usize {
        let selectable = if is_sync {
            let selectable = if full_channel_mix_flag { true } else { reader.read_bit() };
            state.audio[p].selectable = selectable;
            selectable
        }
        else {
            state.audio[p].selectable
        };

        if selectable && is_sync {
            let dep_mask = if p > 0 { reader.read(p as u32) } else { 0 };
            for i in 0..p {
                if dep_mask & (1 << i) != 0 {
                    let bit = reader.read(1);
                    state.audio[p].mask |= (bit as u32) << i;
                }
            }
        }

        if selectable {
            for i in 0..p {
                if state.audio[p].mask & (1 << i) != 0 {
                    let consume = if is_sync { true } else { reader.read_bit() };
                    if consume {
                        read_var_field(reader, [4, 8, 16, 32], true);
                    }
                }
            }
        }
    }
}

/// Returns the number of chunk-descriptor slots populated for this frame (`state.chunks[0..n]`).
fn parse_chunk_navigation(reader: &mut BitReader<'_>, state: &mut ParserState, is_sync: bool, full_channel_mix_flag: bool) -> usize {
    let chunk_count = if full_channel_mix_flag {
        if is_sync { 1 } else { 0 }
    }
    else {
        read_var_field(reader, [2, 4, 6, 8], true) as usize
    };

    state.ensure_chunk_capacity(chunk_count);

    let mut chunk_bytes_acc = 0u64;
    for i in 0..chunk_count {
        let bytes = read_var_field(reader, [6, 9, 12, 15], true);
        let crc_flag = if full_channel_mix_flag { false } else { reader.read_bit() };
        state.chunks[i] = ChunkDesc { crc_flag, bytes };
        chunk_bytes_acc += bytes;
    }

    let audio_chunks = if full_channel_mix_flag { 1 } else { read_var_field(reader, [2, 4, 6, 8], true) as usize };

    if is_sync {
        state.navi.clear();
    }
    else {
        for entry in &mut state.navi {
            entry.present = false;
        }
    }

    for _ in 0..audio_chunks {
        let index = if full_channel_mix_flag { 0 } else { read_var_field(reader, [2, 4, 6, 8], true) };

        let slot = state.navi_slot(index);
        state.navi[slot].present = true;
        state.navi[slot].index = index;

        let id_present = if is_sync { true } else if full_channel_mix_flag { false } else { reader.read_bit() };
        if id_present {
            state.navi[slot].id = read_var_field(reader, [2, 4, 6, 8], true) as u32;
        }

        let bytes = read_var_field(reader, [9, 11, 13, 16], true);
        state.navi[slot].bytes = bytes;
    }

    state.purge_navi();

    let navi_bytes: u64 = state.navi.iter().filter(|e| e.present).map(|e| e.bytes).sum();
    state.chunk_bytes = chunk_bytes_acc + navi_bytes;

    chunk_count
}

fn is_suitable_for_render(reader: &mut BitReader<'_>, object_id: u32) -> bool {
    if object_id >= 224 {
        return true;
    }

    if reader.read_bit() {
        true
    }
    else {
        let skip_bits = read_var_field(reader, [8, 10, 12, 14], true);
        reader.skip(skip_bits as u32);
        false
    }
}

fn parse_md01(reader: &mut BitReader<'_>, state: &mut ParserState, full_channel_mix_flag: bool, interactive_obj_limits_present: bool) {
    let md_idx = state.ensure_md01_index(1);

    let object_list: Vec<u32> = if full_channel_mix_flag {
        vec![256]
    }
    else {
        let count = read_var_field(reader, [3, 4, 6, 8], true) as usize;
        let mut list = Vec::with_capacity(count);
        for _ in 0..count {
            let wide = reader.read_bit();
            let id = if wide { reader.read(8) } else { reader.read(4) } as u32;
            list.push(id);
        }
        list
    };
    state.md01[md_idx].object_list = object_list.clone();

    if state.audio[0].selectable {
        for _ in 0..4 {
            if reader.read_bit() {
                reader.skip(5);
            }
        }
        if reader.read_bit() {
            let md: &mut Md01 = &mut state.md01[md_idx];
            parse_multi_frame_static_metadata(reader, md, full_channel_mix_flag);
        }
    }

    state.md01[md_idx].clear_objects();

    if !full_channel_mix_flag && reader.read_bit() {
        reader.skip(11);
    }

    for &id in &object_list {
        if !is_suitable_for_render(reader, id) {
            continue;
        }

        let slot = Md01::slot_index(id);
        let was_started = state.md01[md_idx].object[slot].started;
        state.md01[md_idx].object[slot].pres_index = 0;
        state.md01[md_idx].object[slot].started = true;

        reader.skip(1); // "id != 256" gating bit, consumed unconditionally.

        if id <= 223 || id == 256 {
            parse_object_metadata(
                reader,
                state,
                md_idx,
                slot,
                id,
                was_started,
                interactive_obj_limits_present,
            );
        }

        break;
    }
}

fn parse_object_metadata(
    reader: &mut BitReader<'_>,
    state: &mut ParserState,
    md_idx: usize,
    slot: usize,
    object_id: u32,
    was_started: bool,
    interactive_obj_limits_present: bool,
) {
    if !was_started {
        let rep_type = reader.read(3) as u8;
        state.md01[md_idx].object[slot].rep_type = rep_type;
    }

    let rep_type = RepType::from_bits(state.md01[md_idx].object[slot].rep_type as u64);
    let is_ch_mask = rep_type.is_ch_mask_based();
    let is_3d = rep_type.is_3d_metadata();

    if is_ch_mask && object_id != 256 {
        reader.skip(3);
        if reader.read_bit() {
            let w = if reader.read_bit() { 3 } else { 5 };
            reader.skip(w);
        }
        read_var_field(reader, [1, 4, 4, 8], true);
        read_var_field(reader, [3, 3, 4, 8], true);
        if reader.read_bit() {
            reader.skip(8);
        }
        if reader.read_bit() && interactive_obj_limits_present && reader.read_bit() {
            reader.skip(5 + if is_3d { 6 } else { 0 });
        }
    }

    let ch_index = if rep_type == RepType::Binaural { 1 } else { reader.read(4) };
    let ch_activity_mask = match ch_index {
        14 => reader.read(16),
        15 => reader.read(32),
        _ => CH_ACTIVITY_TABLE[ch_index as usize],
    };

    state.md01[md_idx].object[slot].ch_activity_mask = ch_activity_mask;
}

fn parse_multi_frame_static_metadata(reader: &mut BitReader<'_>, md: &mut Md01, full_channel_mix_flag: bool) {
    md.packets_acquired = 0;
    md.static_md_packets = if full_channel_mix_flag {
        1
    }
    else {
        read_var_field(reader, [0, 6, 9, 12], true) as u32 + 1
    };
    md.static_md_packet_size = if full_channel_mix_flag {
        0
    }
    else {
        read_var_field(reader, [5, 7, 9, 11], true) as u32 + 3
    };

    let total = md.static_md_packets as usize * md.static_md_packet_size as usize;
    if md.buf.len() < total {
        md.buf.resize(total, 0);
    }

    md.static_md_update_flag = if md.static_md_packets > 1 { reader.read_bit() } else { true };

    while md.packets_acquired < md.static_md_packets {
        let offset = md.packets_acquired as usize * md.static_md_packet_size as usize;
        for i in 0..md.static_md_packet_size as usize {
            md.buf[offset + i] = reader.read(8) as u8;
        }
        md.packets_acquired += 1;

        let just_wrote_last = md.packets_acquired == md.static_md_packets;
        let just_wrote_first = md.packets_acquired == 1 && md.static_md_packets > 1;

        if just_wrote_last && (md.static_md_update_flag || !md.static_md_extracted) {
            parse_static_params(md, full_channel_mix_flag, StaticParamsMode::Full);
        }
        else if just_wrote_first && (md.static_md_update_flag || !md.static_md_extracted) {
            parse_static_params(md, full_channel_mix_flag, StaticParamsMode::OnlyFirst);
        }
    }
}

fn parse_static_params(md: &mut Md01, full_channel_mix_flag: bool, mode: StaticParamsMode) {
    let mut r = BitReader::new(&md.buf);

    let nominal_flag = if full_channel_mix_flag { true } else { r.read_bit() };

    let loudness_sets: u32 = if nominal_flag {
        if full_channel_mix_flag {
            1
        }
        else if r.read_bit() {
            3
        }
        else {
            1
        }
    }
    else {
        r.read(4) as u32 + 1
    };

    for _ in 0..loudness_sets {
        r.skip(6);
        if !nominal_flag {
            r.skip(5);
        }
        r.skip(if nominal_flag { 2 } else { 4 });
    }

    if mode == StaticParamsMode::OnlyFirst {
        return;
    }

    if !nominal_flag {
        r.skip(1);
    }

    for _ in 0..3 {
        if r.read_bit() {
            if r.read(4) == 15 {
                r.skip(15);
            }
            if r.read_bit() {
                r.skip(36);
            }
        }
    }

    if !full_channel_mix_flag {
        let total_bits = md.static_md_packets as usize * md.static_md_packet_size as usize * 8;
        r.align_to(total_bits);
    }

    md.static_md_extracted = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_parse_frame_rejects_empty_buffer() {
        let mut state = ParserState::new();
        assert!(parse_frame(&mut state, &[], false).is_err());
    }

    #[test]
    fn verify_parse_frame_incomplete_on_short_buffer() {
        let mut state = ParserState::new();
        let (status, info, desc) = parse_frame(&mut state, &[0x40, 0x41, 0x1b], false).unwrap();
        assert_eq!(status, Status::Incomplete);
        assert!(info.is_none());
        assert!(desc.is_none());
    }

    #[test]
    fn verify_parse_frame_nosync_before_any_sync() {
        let mut state = ParserState::new();
        let buf = NON_SYNC_WORD.to_be_bytes();
        let (status, ..) = parse_frame(&mut state, &buf, false).unwrap();
        assert_eq!(status, Status::NoSync);
    }

    #[test]
    fn verify_parse_frame_nosync_on_unrecognized_word() {
        let mut state = ParserState::new();
        let buf = [0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 0];
        let (status, ..) = parse_frame(&mut state, &buf, false).unwrap();
        assert_eq!(status, Status::NoSync);
    }
}
