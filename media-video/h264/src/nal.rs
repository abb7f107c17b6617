use std::{iter::from_fn, mem::take};

pub(crate) const NAL_UNIT_HEADER_NRI_MASK: u8 = 0b01100000;
pub(crate) const NAL_UNIT_HEADER_TYPE_MASK: u8 = 0b00011111;

pub(crate) const NAL_UNIT_IDR: u8 = 5;
pub(crate) const NAL_UNIT_SPS: u8 = 7;
pub(crate) const NAL_UNIT_PPS: u8 = 8;

/// Aggregation packet types
pub(crate) const NAL_UNIT_STAP_A: u8 = 24;
pub(crate) const NAL_UNIT_STAP_B: u8 = 25;
pub(crate) const NAL_UNIT_MTAP16: u8 = 26;
pub(crate) const NAL_UNIT_MTAP24: u8 = 27;

/// Fragmentation packet types
pub(crate) const NAL_UNIT_FU_A: u8 = 28;
pub(crate) const NAL_UNIT_FU_B: u8 = 29;

pub(crate) const FU_HEADER_LEN: usize = 2;
pub(crate) const FU_START_BIT: u8 = 1 << 7;
pub(crate) const FU_END_BIT: u8 = 1 << 6;

/// Annex B start code written in front of every NAL unit
pub(crate) const NAL_UNIT_PREFIX: [u8; 4] = [0, 0, 0, 1];

/// The single byte NAL unit header: forbidden_zero_bit(1), nal_ref_idc(2), nal_unit_type(5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NalHeader(u8);

impl NalHeader {
    pub(crate) fn from_byte(b: u8) -> Self {
        Self(b)
    }

    pub(crate) fn new(nal_ref_idc: u8, nal_unit_type: u8) -> Self {
        Self(
            ((nal_ref_idc << 5) & NAL_UNIT_HEADER_NRI_MASK)
                | (nal_unit_type & NAL_UNIT_HEADER_TYPE_MASK),
        )
    }

    pub(crate) fn nal_ref_idc(self) -> u8 {
        (self.0 & NAL_UNIT_HEADER_NRI_MASK) >> 5
    }

    pub(crate) fn nal_unit_type(self) -> u8 {
        self.0 & NAL_UNIT_HEADER_TYPE_MASK
    }

    pub(crate) fn to_byte(self) -> u8 {
        self.0
    }
}

/// How a NAL unit type is handled when received as RTP payload in non-interleaved mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NalKind {
    FuA,
    /// Allowed in non-interleaved mode, but not handled (no known source emits it)
    StapA,
    /// Only valid in interleaved mode
    Interleaved,
    ParameterSet,
    IdrSlice,
    Single,
}

impl NalKind {
    pub(crate) fn of(nal_unit_type: u8) -> Self {
        match nal_unit_type {
            NAL_UNIT_FU_A => NalKind::FuA,
            NAL_UNIT_STAP_A => NalKind::StapA,
            NAL_UNIT_STAP_B | NAL_UNIT_MTAP16 | NAL_UNIT_MTAP24 | NAL_UNIT_FU_B => {
                NalKind::Interleaved
            }
            NAL_UNIT_SPS | NAL_UNIT_PPS => NalKind::ParameterSet,
            NAL_UNIT_IDR => NalKind::IdrSlice,
            _ => NalKind::Single,
        }
    }
}

/// Returns the position of the next start code as (nal unit end, prefix length)
///
/// Zero bytes in front of a 3 byte start code count towards the prefix, so 4 byte start codes and
/// trailing_zero_8bits never end up in the preceding NAL unit.
fn next_nal_prefix(data: &[u8]) -> Option<(usize, usize)> {
    let mut zero_count = 0;
    for (index, byte) in data.iter().enumerate() {
        if *byte == 0 {
            zero_count += 1;
        } else if *byte == 1 && zero_count >= 2 {
            let prefix_length = zero_count + 1;
            let nal_unit_end = index - zero_count;

            return Some((nal_unit_end, prefix_length));
        } else {
            zero_count = 0;
        }
    }

    None
}

/// Split an Annex B byte stream into its NAL units, without start codes
pub(crate) fn nal_units(mut data: &[u8]) -> impl Iterator<Item = &[u8]> {
    from_fn(move || {
        while !data.is_empty() {
            let Some((nal_unit_end, prefix_length)) = next_nal_prefix(data) else {
                return Some(take(&mut data));
            };

            let ret = &data[..nal_unit_end];
            data = &data[nal_unit_end + prefix_length..];

            if !ret.is_empty() {
                return Some(ret);
            }
        }

        None
    })
}
