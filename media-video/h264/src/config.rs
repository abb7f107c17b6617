/// Behavior of the [`H264FrameReassembler`](crate::H264FrameReassembler)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct H264ReassemblerConfig {
    /// Maximum number of in-band SPS/PPS units kept until the next frame starts
    ///
    /// The oldest sets are evicted once the limit is reached. Values below 1 are treated as 1.
    pub max_parameter_sets: usize,

    /// Drop every NAL unit with a `nal_ref_idc` of 0
    ///
    /// Some encoders emit malformed SEI units with `nal_ref_idc` set to 0 which must not reach the decoder.
    /// Only disable this for sources which mark all of their NAL units that way.
    pub drop_non_reference: bool,
}

impl Default for H264ReassemblerConfig {
    fn default() -> Self {
        Self {
            max_parameter_sets: 10,
            drop_non_reference: true,
        }
    }
}
