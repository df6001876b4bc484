// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building the stream descriptor (sample-entry-equivalent metadata) from parsed state, and
//! serializing it into the `udts` extradata box.

use crate::state::ParserState;

/// One row of the channel-activity translation table: a single activity bit, the normative
/// 32-bit channel mask it contributes, and the host-side 64-bit channel mask it contributes.
struct ActivityRow {
    activity_bit: u32,
    channel_mask: u32,
    host_mask: u64,
}

// Host-side bit positions, one per abstract channel position named in the governing channel
// layout table. Laid out the way a consuming multimedia framework's own channel-position
// bitflags would (distinct bit per position, first 18 matching the WAVEFORMATEXTENSIBLE channel
// order), not as a copy of the normative 32-bit mask.
const HOST_FRONT_LEFT: u64 = 1 << 0;
const HOST_FRONT_RIGHT: u64 = 1 << 1;
const HOST_FRONT_CENTER: u64 = 1 << 2;
const HOST_LFE1: u64 = 1 << 3;
const HOST_REAR_LEFT: u64 = 1 << 4;
const HOST_REAR_RIGHT: u64 = 1 << 5;
const HOST_FRONT_LEFT_CENTER: u64 = 1 << 6;
const HOST_FRONT_RIGHT_CENTER: u64 = 1 << 7;
const HOST_REAR_CENTER: u64 = 1 << 8;
const HOST_SIDE_LEFT: u64 = 1 << 9;
const HOST_SIDE_RIGHT: u64 = 1 << 10;
const HOST_TOP_CENTER: u64 = 1 << 11;
const HOST_TOP_FRONT_LEFT: u64 = 1 << 12;
const HOST_TOP_FRONT_CENTER: u64 = 1 << 13;
const HOST_TOP_FRONT_RIGHT: u64 = 1 << 14;
const HOST_TOP_REAR_LEFT: u64 = 1 << 15;
const HOST_TOP_REAR_CENTER: u64 = 1 << 16;
const HOST_TOP_REAR_RIGHT: u64 = 1 << 17;
const HOST_LFE2: u64 = 1 << 18;
const HOST_TOP_SIDE_LEFT: u64 = 1 << 19;
const HOST_TOP_SIDE_RIGHT: u64 = 1 << 20;
const HOST_BOTTOM_FRONT_CENTER: u64 = 1 << 21;
const HOST_BOTTOM_FRONT_LEFT: u64 = 1 << 22;
const HOST_BOTTOM_FRONT_RIGHT: u64 = 1 << 23;
const HOST_FRONT_LEFT_WIDE: u64 = 1 << 24;
const HOST_FRONT_RIGHT_WIDE: u64 = 1 << 25;

/// The 20-row activity-map table, in the order given by the governing channel layout table.
/// Order is significant only in that it is iterated in full; contributions are OR-accumulated.
const ACTIVITY_MAP: [ActivityRow; 20] = [
    ActivityRow { activity_bit: 0x000001, channel_mask: 0x00000001, host_mask: HOST_FRONT_CENTER },
    ActivityRow { activity_bit: 0x000002, channel_mask: 0x00000006, host_mask: HOST_FRONT_LEFT | HOST_FRONT_RIGHT },
    ActivityRow { activity_bit: 0x000004, channel_mask: 0x00000018, host_mask: HOST_SIDE_LEFT | HOST_SIDE_RIGHT },
    ActivityRow { activity_bit: 0x000008, channel_mask: 0x00000020, host_mask: HOST_LFE1 },
    ActivityRow { activity_bit: 0x000010, channel_mask: 0x00000040, host_mask: HOST_REAR_CENTER },
    ActivityRow { activity_bit: 0x000020, channel_mask: 0x0000A000, host_mask: HOST_TOP_FRONT_LEFT | HOST_TOP_FRONT_RIGHT },
    ActivityRow { activity_bit: 0x000040, channel_mask: 0x00000180, host_mask: HOST_REAR_LEFT | HOST_REAR_RIGHT },
    ActivityRow { activity_bit: 0x000080, channel_mask: 0x00004000, host_mask: HOST_TOP_FRONT_CENTER },
    ActivityRow { activity_bit: 0x000100, channel_mask: 0x00080000, host_mask: HOST_TOP_CENTER },
    ActivityRow { activity_bit: 0x000200, channel_mask: 0x00001800, host_mask: HOST_FRONT_LEFT_CENTER | HOST_FRONT_RIGHT_CENTER },
    ActivityRow { activity_bit: 0x000400, channel_mask: 0x00060000, host_mask: HOST_FRONT_LEFT_WIDE | HOST_FRONT_RIGHT_WIDE },
    ActivityRow { activity_bit: 0x000800, channel_mask: 0x00000600, host_mask: HOST_SIDE_LEFT | HOST_SIDE_RIGHT },
    ActivityRow { activity_bit: 0x001000, channel_mask: 0x00010000, host_mask: HOST_LFE2 },
    ActivityRow { activity_bit: 0x002000, channel_mask: 0x00300000, host_mask: HOST_TOP_SIDE_LEFT | HOST_TOP_SIDE_RIGHT },
    ActivityRow { activity_bit: 0x004000, channel_mask: 0x00400000, host_mask: HOST_TOP_REAR_CENTER },
    ActivityRow { activity_bit: 0x008000, channel_mask: 0x01800000, host_mask: HOST_TOP_REAR_LEFT | HOST_TOP_REAR_RIGHT },
    ActivityRow { activity_bit: 0x010000, channel_mask: 0x02000000, host_mask: HOST_BOTTOM_FRONT_CENTER },
    ActivityRow { activity_bit: 0x020000, channel_mask: 0x0C000000, host_mask: HOST_BOTTOM_FRONT_LEFT | HOST_BOTTOM_FRONT_RIGHT },
    ActivityRow { activity_bit: 0x140000, channel_mask: 0x30000000, host_mask: HOST_TOP_FRONT_LEFT | HOST_TOP_FRONT_RIGHT },
    ActivityRow { activity_bit: 0x080000, channel_mask: 0xC0000000, host_mask: HOST_TOP_REAR_LEFT | HOST_TOP_REAR_RIGHT },
];

/// Stream configuration derived from a successfully parsed sync frame; the crate's equivalent of
/// an MP4 sample entry. Only meaningful when `valid` is `true`.
#[derive(Copy, Clone, Debug, Default)]
pub struct DescriptorInfo {
    pub valid: bool,
    pub coding_name: [u8; 4],
    pub decoder_profile_code: u32,
    pub frame_duration_code: u32,
    pub max_payload_code: u32,
    pub num_pres_code: u32,
    pub base_sample_freq_code: u32,
    pub sample_rate_mod: u32,
    pub rep_type: u8,
    pub sample_rate: u32,
    pub sample_size: u32,
    pub channel_count: u32,
    pub channel_mask: u32,
    pub host_channel_mask: u64,
}

/// Translate a raw channel-activity mask into a normative/host channel mask pair and the
/// resulting channel count, by OR-accumulating every activity row whose bit is set.
pub fn translate_activity_mask(ch_activity_mask: u64) -> (u32, u64, u32) {
    let mut channel_mask = 0u32;
    let mut host_channel_mask = 0u64;

    for row in &ACTIVITY_MAP {
        if ch_activity_mask & u64::from(row.activity_bit) != 0 {
            channel_mask |= row.channel_mask;
            host_channel_mask |= row.host_mask;
        }
    }

    (channel_mask, host_channel_mask, channel_mask.count_ones())
}

/// The identity of the "default audio" object selected for descriptor purposes: which MD01's
/// object table it lives in, its slot index, and its `pres_index`.
#[derive(Copy, Clone, Debug)]
pub struct DefaultObject {
    pub md01_index: usize,
    pub object_slot: usize,
    pub pres_index: u32,
}

/// Select the "default audio" object across all metadata chunks: the started object, belonging
/// to a selectable presentation, with the smallest `pres_index` (ties broken by smallest object
/// slot index, which is itself the smallest object id since slots are indexed by id).
pub fn select_default_object(state: &ParserState) -> Option<DefaultObject> {
    let mut best: Option<DefaultObject> = None;

    for (md01_index, md01) in state.md01.iter().enumerate() {
        for (slot, obj) in md01.object.iter().enumerate() {
            if !obj.started {
                continue;
            }

            let pres = state.audio.get(obj.pres_index as usize);
            if !pres.map(|p| p.selectable).unwrap_or(false) {
                continue;
            }

            let better = match &best {
                None => true,
                Some(b) => {
                    (obj.pres_index, slot) < (b.pres_index, b.object_slot)
                }
            };

            if better {
                best = Some(DefaultObject { md01_index, object_slot: slot, pres_index: obj.pres_index });
            }
        }
    }

    best
}

/// Build the stream descriptor from the current parser state, following a successful sync-frame
/// parse. Returns `None` if no suitable default object has been observed yet.
pub fn build_descriptor(state: &ParserState) -> Option<DescriptorInfo> {
    let default_obj = select_default_object(state)?;
    let obj = &state.md01[default_obj.md01_index].object[default_obj.object_slot];

    let (channel_mask, host_channel_mask, channel_count) = translate_activity_mask(obj.ch_activity_mask);

    Some(DescriptorInfo {
        valid: true,
        coding_name: if state.major_version > 2 { *b"dtsy" } else { *b"dtsx" },
        decoder_profile_code: state.major_version.saturating_sub(2),
        frame_duration_code: state.frame_duration_code,
        max_payload_code: if state.major_version > 2 { 1 } else { 0 },
        num_pres_code: state.num_audio_pres.saturating_sub(1),
        base_sample_freq_code: if state.sample_rate == 48000 { 1 } else { 0 },
        sample_rate_mod: state.sample_rate_mod,
        rep_type: obj.rep_type,
        sample_rate: state.sample_rate,
        sample_size: 16,
        channel_count,
        channel_mask,
        host_channel_mask,
    })
}

/// Serialize a [`DescriptorInfo`] into the fixed `udts` extradata box: big-endian, bit-packed,
/// padded to a byte boundary, with the total byte size written as the leading 32-bit word.
pub fn write_udts_box(info: &DescriptorInfo) -> Vec<u8> {
    let num_pres = info.num_pres_code + 1;

    let mut bits: Vec<bool> = Vec::with_capacity(96 + num_pres as usize);

    push_bits(&mut bits, 0, 32); // box_size, filled in below.
    for byte in *b"udts" {
        push_bits(&mut bits, u64::from(byte), 8);
    }
    push_bits(&mut bits, u64::from(info.decoder_profile_code), 6);
    push_bits(&mut bits, u64::from(info.frame_duration_code), 2);
    push_bits(&mut bits, u64::from(info.max_payload_code), 3);
    push_bits(&mut bits, u64::from(info.num_pres_code), 5);
    push_bits(&mut bits, u64::from(info.channel_mask), 32);
    push_bits(&mut bits, u64::from(info.base_sample_freq_code), 1);
    push_bits(&mut bits, u64::from(info.sample_rate_mod), 2);
    push_bits(&mut bits, u64::from(info.rep_type), 3);
    push_bits(&mut bits, 0, 3); // reserved
    push_bits(&mut bits, 0, 1); // reserved

    for _ in 0..num_pres {
        push_bits(&mut bits, 0, 1); // id-tag-presence per presentation, all 0.
    }

    let mut bytes = pack_bits(&bits);
    let total_len = bytes.len() as u32;
    bytes[0..4].copy_from_slice(&total_len.to_be_bytes());
    bytes
}

fn push_bits(bits: &mut Vec<bool>, value: u64, width: u32) {
    for i in (0..width).rev() {
        bits.push((value >> i) & 1 != 0);
    }
}

fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; (bits.len() + 7) / 8];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MdObject;

    #[test]
    fn verify_translate_activity_mask_single_bit() {
        for row in &ACTIVITY_MAP {
            let (channel_mask, _host_mask, channel_count) = translate_activity_mask(u64::from(row.activity_bit));
            assert_eq!(channel_mask, row.channel_mask);
            assert_eq!(channel_count, row.channel_mask.count_ones());
        }
    }

    #[test]
    fn verify_translate_activity_mask_mono() {
        let (channel_mask, host_mask, channel_count) = translate_activity_mask(0x1);
        assert_eq!(channel_mask, 1);
        assert_eq!(host_mask, HOST_FRONT_CENTER);
        assert_eq!(channel_count, 1);
    }

    #[test]
    fn verify_host_mask_is_not_a_copy_of_normative_mask() {
        for row in &ACTIVITY_MAP {
            assert_ne!(
                row.host_mask, u64::from(row.channel_mask),
                "host mask for activity bit {:#x} mirrors the normative mask",
                row.activity_bit
            );
        }
    }

    #[test]
    fn verify_select_default_object_picks_smallest_pres_index() {
        let mut state = ParserState::new();
        state.audio[0].selectable = true;
        state.audio[1].selectable = true;

        let md01 = state.md01_mut(1);
        md01.object[5] = MdObject { started: true, pres_index: 1, rep_type: 0, ch_activity_mask: 0x2 };
        md01.object[2] = MdObject { started: true, pres_index: 0, rep_type: 0, ch_activity_mask: 0x1 };

        let chosen = select_default_object(&state).unwrap();
        assert_eq!(chosen.object_slot, 2);
        assert_eq!(chosen.pres_index, 0);
    }

    #[test]
    fn verify_select_default_object_requires_selectable_presentation() {
        let mut state = ParserState::new();
        // Presentation 0 is not selectable; its object must not be chosen.
        let md01 = state.md01_mut(1);
        md01.object[0] = MdObject { started: true, pres_index: 0, rep_type: 0, ch_activity_mask: 0x1 };

        assert!(select_default_object(&state).is_none());
    }

    #[test]
    fn verify_write_udts_box_leading_size_and_tag() {
        let info = DescriptorInfo {
            valid: true,
            coding_name: *b"dtsx",
            decoder_profile_code: 0,
            frame_duration_code: 0,
            max_payload_code: 0,
            num_pres_code: 0,
            base_sample_freq_code: 1,
            sample_rate_mod: 0,
            rep_type: 0,
            sample_rate: 48000,
            sample_size: 16,
            channel_count: 1,
            channel_mask: 1,
            host_channel_mask: 1,
        };

        let bytes = write_udts_box(&info);
        let size = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        assert_eq!(size as usize, bytes.len());
        assert_eq!(&bytes[4..8], b"udts");
    }
}
