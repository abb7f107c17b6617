//! H.264 depacketization for RTSP video sources
//!
//! Reassembles access units from RTP packets (RFC 6184, non-interleaved mode), derives the decoder
//! configuration from the SDP `fmtp` attribute and reads the picture dimensions from the SPS.

mod bitstream;
mod config;
mod encoding;
mod fmtp;
mod nal;
mod parameter_sets;
mod payload;
mod profile;
mod sps;

pub use config::H264ReassemblerConfig;
pub use encoding::H264Encoding;
pub use fmtp::{H264Fmtp, H264PacketizationMode, ParseH264FmtpError, parse_fmtp};
pub use payload::{H264FrameReassembler, is_end_of_frame};
pub use profile::H264Profile;
pub use sps::{H264ConfigError, Sps, SpsError};
