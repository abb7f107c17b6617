/// H.264 profile, as identified by the `profile_idc` of a sequence parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H264Profile {
    /// Baseline and Constrained Baseline
    Baseline,
    Main,
    Extended,
    High,
    High10,
    High422,
    High444Predictive,
    CAVLC444Intra,
    ScalableBaseline,
    ScalableHigh,
    MultiviewHigh,
    StereoHigh,
}

impl H264Profile {
    pub const fn profile_idc(self) -> u8 {
        match self {
            H264Profile::Baseline => 66,
            H264Profile::Main => 77,
            H264Profile::Extended => 88,
            H264Profile::High => 100,
            H264Profile::High10 => 110,
            H264Profile::High422 => 122,
            H264Profile::High444Predictive => 244,
            H264Profile::CAVLC444Intra => 44,
            H264Profile::ScalableBaseline => 83,
            H264Profile::ScalableHigh => 86,
            H264Profile::MultiviewHigh => 118,
            H264Profile::StereoHigh => 128,
        }
    }

    pub const fn from_profile_idc(profile_idc: u8) -> Option<Self> {
        let profile = match profile_idc {
            66 => H264Profile::Baseline,
            77 => H264Profile::Main,
            88 => H264Profile::Extended,
            100 => H264Profile::High,
            110 => H264Profile::High10,
            122 => H264Profile::High422,
            244 => H264Profile::High444Predictive,
            44 => H264Profile::CAVLC444Intra,
            83 => H264Profile::ScalableBaseline,
            86 => H264Profile::ScalableHigh,
            118 => H264Profile::MultiviewHigh,
            128 => H264Profile::StereoHigh,
            _ => return None,
        };

        Some(profile)
    }

    /// Whether the SPS of this profile carries chroma format, bit depth and scaling matrix fields
    ///
    /// New profiles get added to this list as the standard evolves, check the latest version of
    /// ITU-T H.264 section 7.3.2.1.1 when streams of an unknown profile fail to decode.
    pub const fn has_chroma_format_info(self) -> bool {
        match self {
            H264Profile::Baseline | H264Profile::Main | H264Profile::Extended => false,
            H264Profile::High
            | H264Profile::High10
            | H264Profile::High422
            | H264Profile::High444Predictive
            | H264Profile::CAVLC444Intra
            | H264Profile::ScalableBaseline
            | H264Profile::ScalableHigh
            | H264Profile::MultiviewHigh
            | H264Profile::StereoHigh => true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn profile_idc_roundtrip() {
        for idc in 0..=u8::MAX {
            if let Some(profile) = H264Profile::from_profile_idc(idc) {
                assert_eq!(profile.profile_idc(), idc);
            }
        }
    }

    #[test]
    fn chroma_format_profiles() {
        let with_chroma_info: Vec<u8> = (0..=u8::MAX)
            .filter(|&idc| {
                H264Profile::from_profile_idc(idc).is_some_and(H264Profile::has_chroma_format_info)
            })
            .collect();

        assert_eq!(with_chroma_info, [44, 83, 86, 100, 110, 118, 122, 128, 244]);
    }
}
