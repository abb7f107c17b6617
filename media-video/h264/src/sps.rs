use crate::{
    H264Profile,
    bitstream::{BitReader, remove_emulation_prevention},
    nal::{NAL_UNIT_SPS, NalHeader, nal_units},
};

/// The subset of a sequence parameter set required to compute the picture dimensions
///
/// Every other field up to `frame_mbs_only_flag` is read to advance the cursor and dropped, parsing stops
/// after it. Cropping is not applied, so dimensions are always multiples of a macroblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sps {
    pub profile_idc: u8,
    /// Defaults to 1 (4:2:0) for profiles which don't carry it
    pub chroma_format_idc: u32,
    pub pic_width_in_mbs_minus1: u32,
    pub pic_height_in_map_units_minus1: u32,
    pub frame_mbs_only_flag: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SpsError {
    #[error("SPS does not start with an Annex B start code")]
    MissingStartCode,
    #[error("SPS ended before all required fields were read")]
    Truncated,
    #[error("pic_order_cnt_type {0} is not in the range of 0 to 2")]
    InvalidPicOrderCntType(u64),
    #[error("SPS field {0} exceeds its value range")]
    ValueOutOfRange(&'static str),
}

/// Failed to derive the picture format from configuration bytes
#[derive(Debug, thiserror::Error)]
pub enum H264ConfigError {
    #[error("configuration bytes contain no sequence parameter set")]
    MissingSps,
    #[error(transparent)]
    InvalidSps(#[from] SpsError),
}

impl Sps {
    /// Parse an SPS NAL unit preceded by a 3 or 4 byte Annex B start code
    pub fn parse_annex_b(data: &[u8]) -> Result<Self, SpsError> {
        let nal = data
            .strip_prefix(&[0, 0, 0, 1])
            .or_else(|| data.strip_prefix(&[0, 0, 1]))
            .ok_or(SpsError::MissingStartCode)?;

        Self::parse(nal)
    }

    /// Parse the first SPS found in an Annex B sequence of parameter sets, e.g. the configuration bytes
    /// created from the `sprop-parameter-sets`
    pub fn from_config(config: &[u8]) -> Result<Self, H264ConfigError> {
        let nal = nal_units(config)
            .find(|nal| NalHeader::from_byte(nal[0]).nal_unit_type() == NAL_UNIT_SPS)
            .ok_or(H264ConfigError::MissingSps)?;

        Ok(Self::parse(nal)?)
    }

    /// Parse an SPS NAL unit (header byte and payload, without start code)
    ///
    /// The type in the NAL unit header is not checked.
    pub fn parse(nal: &[u8]) -> Result<Self, SpsError> {
        let rbsp = remove_emulation_prevention(nal.get(1..).ok_or(SpsError::Truncated)?);
        let mut r = BitReader::new(&rbsp);

        let profile_idc = r.read_bits(8) as u8;
        let _constraint_set_flags = r.read_bits(6);
        let _reserved_zero_2bits = r.read_bits(2);
        let _level_idc = r.read_bits(8);
        let _seq_parameter_set_id = r.read_exp_golomb_unsigned();

        let mut chroma_format_idc = 1;

        if H264Profile::from_profile_idc(profile_idc)
            .is_some_and(H264Profile::has_chroma_format_info)
        {
            chroma_format_idc = r.read_exp_golomb_unsigned();
            if chroma_format_idc == 3 {
                let _separate_colour_plane_flag = r.read_flag();
            }
            let _bit_depth_luma_minus8 = r.read_exp_golomb_unsigned();
            let _bit_depth_chroma_minus8 = r.read_exp_golomb_unsigned();
            let _qpprime_y_zero_transform_bypass_flag = r.read_flag();

            let seq_scaling_matrix_present_flag = r.read_flag();
            if seq_scaling_matrix_present_flag {
                let list_count = if chroma_format_idc != 3 { 8 } else { 12 };

                for i in 0..list_count {
                    let seq_scaling_list_present_flag = r.read_flag();
                    if seq_scaling_list_present_flag {
                        skip_scaling_list(&mut r, if i < 6 { 16 } else { 64 });
                    }

                    if !r.good() {
                        return Err(SpsError::Truncated);
                    }
                }
            }
        }

        let _log2_max_frame_num_minus4 = r.read_exp_golomb_unsigned();

        let pic_order_cnt_type = r.read_exp_golomb_unsigned();
        match pic_order_cnt_type {
            0 => {
                let _log2_max_pic_order_cnt_lsb_minus4 = r.read_exp_golomb_unsigned();
            }
            1 => {
                let _delta_pic_order_always_zero_flag = r.read_flag();
                let _offset_for_non_ref_pic = r.read_exp_golomb_signed();
                let _offset_for_top_to_bottom_field = r.read_exp_golomb_signed();
                let num_ref_frames_in_pic_order_cnt_cycle = r.read_exp_golomb_unsigned();

                for _ in 0..num_ref_frames_in_pic_order_cnt_cycle {
                    let _offset_for_ref_frame = r.read_exp_golomb_signed();

                    if !r.good() {
                        return Err(SpsError::Truncated);
                    }
                }
            }
            2 => {}
            // A truncated SPS reads as 0, only a fully read value can be out of range
            _ if r.good() => return Err(SpsError::InvalidPicOrderCntType(pic_order_cnt_type)),
            _ => return Err(SpsError::Truncated),
        }

        let _max_num_ref_frames = r.read_exp_golomb_unsigned();
        let _gaps_in_frame_num_value_allowed_flag = r.read_flag();
        let pic_width_in_mbs_minus1 = r.read_exp_golomb_unsigned();
        let pic_height_in_map_units_minus1 = r.read_exp_golomb_unsigned();
        let frame_mbs_only_flag = r.read_flag();

        if !r.good() {
            return Err(SpsError::Truncated);
        }

        let sps = Sps {
            profile_idc,
            chroma_format_idc: u32::try_from(chroma_format_idc)
                .map_err(|_| SpsError::ValueOutOfRange("chroma_format_idc"))?,
            pic_width_in_mbs_minus1: u32::try_from(pic_width_in_mbs_minus1)
                .map_err(|_| SpsError::ValueOutOfRange("pic_width_in_mbs_minus1"))?,
            pic_height_in_map_units_minus1: u32::try_from(pic_height_in_map_units_minus1)
                .map_err(|_| SpsError::ValueOutOfRange("pic_height_in_map_units_minus1"))?,
            frame_mbs_only_flag,
        };

        if sps.dimensions().is_none() {
            return Err(SpsError::ValueOutOfRange("picture dimensions"));
        }

        log::trace!("parsed sps from the first {} bits: {sps:?}", r.position());

        Ok(sps)
    }

    pub fn profile(&self) -> Option<H264Profile> {
        H264Profile::from_profile_idc(self.profile_idc)
    }

    /// Width & height in pixels, `None` if they don't fit into an u32
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let width = self
            .pic_width_in_mbs_minus1
            .checked_add(1)?
            .checked_mul(16)?;

        let field_factor = if self.frame_mbs_only_flag { 1 } else { 2 };
        let height = self
            .pic_height_in_map_units_minus1
            .checked_add(1)?
            .checked_mul(16 * field_factor)?;

        Some((width, height))
    }
}

/// Advance the reader past a scaling_list(), H.264 section 7.3.2.1.1.1
///
/// The scaling values themselves are not of interest.
fn skip_scaling_list(r: &mut BitReader<'_>, size: usize) {
    let mut last_scale: i64 = 8;
    let mut next_scale: i64 = 8;

    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = r.read_exp_golomb_signed();
            next_scale = (last_scale + delta_scale + 256).rem_euclid(256);
        }

        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
}
