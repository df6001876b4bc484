// dts-uhd
// Copyright (c) 2026 The dts-uhd Contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-frame parser state: the FTOC chunk descriptor array, the NAVI table, and the MD01
//! metadata chunk records that persist across the lifetime of a single stream.

/// A representation type for an audio object, decoded from a 3-bit field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RepType {
    ChMaskBased = 0,
    Mtrx2d = 1,
    Mtrx3d = 2,
    Binaural = 3,
    Ambisonic = 4,
    AudioTracks = 5,
    Obj3dSingleSrcPerWf = 6,
    Mono3dObjectSingleSrcPerWf = 7,
}

impl RepType {
    /// Decode a 3-bit field value into a `RepType`; all eight values are defined so this never
    /// fails.
    pub fn from_bits(v: u64) -> RepType {
        match v & 0x7 {
            0 => RepType::ChMaskBased,
            1 => RepType::Mtrx2d,
            2 => RepType::Mtrx3d,
            3 => RepType::Binaural,
            4 => RepType::Ambisonic,
            5 => RepType::AudioTracks,
            6 => RepType::Obj3dSingleSrcPerWf,
            _ => RepType::Mono3dObjectSingleSrcPerWf,
        }
    }

    /// Whether this representation type carries a channel-mask-style activity descriptor.
    pub fn is_ch_mask_based(self) -> bool {
        matches!(
            self,
            RepType::Binaural | RepType::ChMaskBased | RepType::Mtrx2d | RepType::Mtrx3d
        )
    }

    /// Whether this representation type is one of the 3D-metadata object kinds.
    pub fn is_3d_metadata(self) -> bool {
        matches!(self, RepType::Obj3dSingleSrcPerWf | RepType::Mono3dObjectSingleSrcPerWf)
    }
}

/// Per-presentation selection state, retained across frames.
#[derive(Copy, Clone, Debug, Default)]
pub struct Presentation {
    pub mask: u32,
    pub selectable: bool,
}

/// One entry of the FTOC's chunk descriptor array, rebuilt each frame.
#[derive(Copy, Clone, Debug, Default)]
pub struct ChunkDesc {
    pub crc_flag: bool,
    pub bytes: u64,
}

/// One slot of the audio-chunk navigation table. Slots survive across frames; a slot with
/// `present == false` and `bytes == 0` is free for reuse.
#[derive(Copy, Clone, Debug)]
pub struct NaviEntry {
    pub index: u64,
    pub id: u32,
    pub bytes: u64,
    pub present: bool,
}

impl Default for NaviEntry {
    fn default() -> Self {
        NaviEntry { index: 0, id: 256, bytes: 0, present: false }
    }
}

/// Per-object decoded state, one slot per possible object id (0..=255), plus a distinguished
/// slot at index 256 for objects whose id fell outside that range.
#[derive(Copy, Clone, Debug, Default)]
pub struct MdObject {
    pub started: bool,
    pub pres_index: u32,
    pub rep_type: u8,
    pub ch_activity_mask: u64,
}

/// State for a single metadata chunk (only chunk id 1 is currently defined by the format).
#[derive(Clone, Debug)]
pub struct Md01 {
    pub chunk_id: u32,
    pub object_list: Vec<u32>,
    pub object: Vec<MdObject>,
    pub static_md_packets: u32,
    pub static_md_packet_size: u32,
    pub packets_acquired: u32,
    pub static_md_update_flag: bool,
    pub static_md_extracted: bool,
    pub buf: Vec<u8>,
}

impl Md01 {
    fn new(chunk_id: u32) -> Self {
        Md01 {
            chunk_id,
            object_list: Vec::new(),
            object: vec![MdObject::default(); 257],
            static_md_packets: 0,
            static_md_packet_size: 0,
            packets_acquired: 0,
            static_md_update_flag: false,
            static_md_extracted: false,
            buf: Vec::new(),
        }
    }

    /// Normalize a wire-level object id into the `object[]` slot index: ids outside `[0, 255]`
    /// collapse onto the distinguished "default" slot at index 256.
    pub fn slot_index(object_id: u32) -> usize {
        if object_id <= 255 {
            object_id as usize
        }
        else {
            256
        }
    }

    /// Zero out the per-object table ahead of a new frame's object pass.
    pub fn clear_objects(&mut self) {
        for obj in &mut self.object {
            *obj = MdObject::default();
        }
    }
}

/// Cross-frame parser state for a single DTS-UHD elementary stream.
///
/// Created once per stream and mutated only by [`crate::parser::parse_frame`]; never shared
/// between two concurrently-parsed streams.
#[derive(Clone, Debug)]
pub struct ParserState {
    pub saw_sync: bool,
    pub major_version: u32,
    pub full_channel_mix_flag: bool,
    pub interactive_obj_limits_present: bool,

    pub frame_duration: u32,
    pub frame_duration_code: u32,
    pub clock_rate: u32,
    pub sample_rate: u32,
    pub sample_rate_mod: u32,

    pub ftoc_bytes: u64,
    pub chunk_bytes: u64,
    pub frame_bytes: u64,

    pub num_audio_pres: u32,
    pub audio: Vec<Presentation>,

    pub chunks: Vec<ChunkDesc>,
    pub navi: Vec<NaviEntry>,
    pub md01: Vec<Md01>,
}

impl Default for ParserState {
    fn default() -> Self {
        ParserState {
            saw_sync: false,
            major_version: 0,
            full_channel_mix_flag: false,
            interactive_obj_limits_present: false,
            frame_duration: 0,
            frame_duration_code: 0,
            clock_rate: 0,
            sample_rate: 0,
            sample_rate_mod: 0,
            ftoc_bytes: 0,
            chunk_bytes: 0,
            frame_bytes: 0,
            num_audio_pres: 0,
            audio: vec![Presentation::default(); 32],
            chunks: Vec::new(),
            navi: Vec::new(),
            md01: Vec::new(),
        }
    }
}

impl ParserState {
    /// Construct a fresh state for a new stream; equivalent to `Default::default`, spelled out
    /// at call sites that read better as a constructor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find (or append) the `Md01` record with the given `chunk_id`. Only `chunk_id == 1` is
    /// ever requested by the current format revision, but the lookup is id-keyed rather than a
    /// single field to accommodate any future metadata chunk kind without reshaping the type.
    pub fn md01_mut(&mut self, chunk_id: u32) -> &mut Md01 {
        let idx = self.ensure_md01_index(chunk_id);
        &mut self.md01[idx]
    }

    /// Find (or append) the `Md01` record with the given `chunk_id` and return its index,
    /// without holding a borrow of `self`. Lets the caller interleave access to other fields
    /// (e.g. `audio`) between touching the returned record.
    pub fn ensure_md01_index(&mut self, chunk_id: u32) -> usize {
        if let Some(idx) = self.md01.iter().position(|m| m.chunk_id == chunk_id) {
            return idx;
        }
        self.md01.push(Md01::new(chunk_id));
        self.md01.len() - 1
    }

    /// Ensure `chunks` has at least `count` entries, growing (never shrinking) as needed.
    pub fn ensure_chunk_capacity(&mut self, count: usize) {
        if self.chunks.len() < count {
            self.chunks.resize(count, ChunkDesc::default());
        }
    }

    /// Find an existing navi slot for `index`, or allocate one (reusing the lowest free slot
    /// where possible), returning its position in `navi`.
    pub fn navi_slot(&mut self, index: u64) -> usize {
        // Locate by index regardless of `present`: on a non-sync frame every entry was just
        // marked absent before this call, but a slot carrying this index from an earlier frame
        // (with its stored `id` and `bytes`) must still be found and reused, not shadowed by a
        // freshly appended one.
        if let Some(pos) = self.navi.iter().position(|e| e.index == index) {
            return pos;
        }

        if let Some(pos) = self.navi.iter().position(|e| !e.present && e.bytes == 0) {
            return pos;
        }

        self.navi.push(NaviEntry::default());
        self.navi.len() - 1
    }

    /// Remove stale bytes from navi slots that were not refreshed this frame.
    pub fn purge_navi(&mut self) {
        for entry in &mut self.navi {
            if !entry.present {
                entry.bytes = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_rep_type_classification() {
        assert!(RepType::Binaural.is_ch_mask_based());
        assert!(RepType::ChMaskBased.is_ch_mask_based());
        assert!(!RepType::Ambisonic.is_ch_mask_based());
        assert!(RepType::Obj3dSingleSrcPerWf.is_3d_metadata());
        assert!(!RepType::AudioTracks.is_3d_metadata());
    }

    #[test]
    fn verify_md01_slot_index_normalizes_out_of_range() {
        assert_eq!(Md01::slot_index(0), 0);
        assert_eq!(Md01::slot_index(255), 255);
        assert_eq!(Md01::slot_index(256), 256);
        assert_eq!(Md01::slot_index(9999), 256);
    }

    #[test]
    fn verify_md01_mut_creates_then_reuses() {
        let mut state = ParserState::new();
        state.md01_mut(1).static_md_packets = 4;
        assert_eq!(state.md01.len(), 1);
        assert_eq!(state.md01_mut(1).static_md_packets, 4);
    }

    #[test]
    fn verify_navi_slot_reuses_freed_entry() {
        let mut state = ParserState::new();

        let a = state.navi_slot(10);
        state.navi[a].present = true;
        state.navi[a].bytes = 100;

        // A sync-frame reset: mark nothing present, then purge clears stale bytes.
        state.navi[a].present = false;
        state.purge_navi();
        assert_eq!(state.navi[a].bytes, 0);

        // New index reuses the freed slot rather than appending.
        let b = state.navi_slot(20);
        assert_eq!(a, b);
    }

    #[test]
    fn verify_navi_slot_finds_absent_entry_by_index() {
        let mut state = ParserState::new();

        // A prior sync frame's entry: carries a real id and nonzero bytes, then the following
        // non-sync frame marks it absent (present = false) before re-scanning the FTOC, the way
        // parse_chunk_navigation does at the top of every non-sync frame.
        let a = state.navi_slot(7);
        state.navi[a].present = true;
        state.navi[a].id = 3;
        state.navi[a].bytes = 40;
        state.navi[a].present = false;

        // The non-sync frame carries no id (id_present == false), so it must find this same
        // slot by index alone to keep its stored id, not append a fresh slot at the default id.
        let b = state.navi_slot(7);
        assert_eq!(a, b);
        assert_eq!(state.navi[b].id, 3);
    }
}
