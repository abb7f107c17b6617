//! Codec specific behavior of the RTSP video source
//!
//! Every supported video encoding implements [`RtpVideoEncoding`]. The RTSP session layer uses it once
//! during setup to turn the SDP `rtpmap` & `fmtp` attributes into [`VideoParameters`], and afterwards
//! feeds it every RTP packet of the stream to reassemble complete frames.

use bytes::Bytes;
use rtp::RtpPacket;
use std::{error::Error, fmt};

mod rtpmap;
mod sample;

pub use rtpmap::{ParseRtpMapError, RtpMap};
pub use sample::{BufferSample, ConstructSampleError, MediaSample};

/// Four character code identifying a video format, packed in host (little endian) byte order
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub u32);

impl FourCC {
    pub const fn from_bytes(code: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(code))
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_bytes() {
            write!(f, "{}", char::from(b))?;
        }

        Ok(())
    }
}

/// Picture properties derived from a codec configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    /// Frames per second, if the configuration carries it
    pub frame_rate: Option<f64>,
}

/// Everything learned about a video stream from its SDP media description
#[derive(Debug, Clone)]
pub struct VideoParameters {
    /// Decoder configuration, prepended to every key frame
    pub config: Bytes,
    pub format: VideoFormat,
}

/// Result of feeding a single RTP packet into [`RtpVideoEncoding::extract_frame`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStatus {
    /// The frame under construction is complete and can be taken
    pub full_frame: bool,
    /// The frame under construction is a key frame
    pub key_frame: bool,
}

/// A completed frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Bytes,
    pub key_frame: bool,
}

/// Failed to derive [`VideoParameters`] from the SDP attributes
#[derive(Debug, thiserror::Error)]
pub enum ParseSdpError<F: Error + 'static, C: Error + 'static> {
    #[error("encoding {found:?} does not match {expected:?}")]
    EncodingMismatch {
        expected: &'static str,
        found: String,
    },
    #[error("invalid fmtp attribute")]
    Fmtp(#[source] F),
    #[error("invalid codec configuration")]
    Config(#[source] C),
}

/// Capabilities of a single video encoding transported over RTP
///
/// Instances hold per stream state and must not be shared between streams.
pub trait RtpVideoEncoding {
    type FmtpError: Error + 'static;
    type ConfigError: Error + 'static;

    /// FourCC representing the video format of the stream
    fn fourcc(&self) -> FourCC;

    /// MIME subtype as used in the SDP `rtpmap` attribute
    fn mime_subtype(&self) -> &'static str;

    /// Parse the line containing the SDP `fmtp` attribute into the codec's configuration bytes
    fn parse_fmtp(&self, line: &str) -> Result<Bytes, Self::FmtpError>;

    /// Derive the picture properties from configuration bytes returned by [`parse_fmtp`](Self::parse_fmtp)
    fn parse_config(&self, config: &[u8]) -> Result<VideoFormat, Self::ConfigError>;

    /// Parse the SDP attributes from the reply to the RTSP DESCRIBE request
    ///
    /// `encoding_name` is taken from the `rtpmap` attribute.
    fn parse_sdp(
        &self,
        encoding_name: &str,
        fmtp_line: &str,
    ) -> Result<VideoParameters, ParseSdpError<Self::FmtpError, Self::ConfigError>> {
        let expected = self.mime_subtype();

        if !encoding_name.eq_ignore_ascii_case(expected) {
            return Err(ParseSdpError::EncodingMismatch {
                expected,
                found: encoding_name.into(),
            });
        }

        let config = self.parse_fmtp(fmtp_line).map_err(ParseSdpError::Fmtp)?;
        let format = self.parse_config(&config).map_err(ParseSdpError::Config)?;

        log::debug!(
            "{} stream configured with {}x{}",
            self.fourcc(),
            format.width,
            format.height
        );

        Ok(VideoParameters { config, format })
    }

    /// Returns whether the packet carries the last part of a frame, without touching any reassembly state
    fn is_end_of_frame(&self, packet: &RtpPacket) -> bool;

    /// Feed the next RTP packet of the stream into the frame under construction
    ///
    /// `config` is prepended to key frames.
    fn extract_frame(&mut self, packet: &RtpPacket, config: &[u8]) -> FrameStatus;

    /// Move the frame under construction out, leaving an empty one behind
    fn take_frame(&mut self) -> Frame;

    /// Copy a completed frame into a media sample, marking it as sync point if it's a key frame
    fn construct_sample(
        &self,
        frame: &[u8],
        key_frame: bool,
        sample: &mut dyn MediaSample,
    ) -> Result<(), ConstructSampleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_packing() {
        let fourcc = FourCC::from_bytes(*b"H264");

        assert_eq!(
            fourcc.0,
            u32::from(b'H') | u32::from(b'2') << 8 | u32::from(b'6') << 16 | u32::from(b'4') << 24
        );
        assert_eq!(fourcc.to_string(), "H264");
        assert_eq!(format!("{fourcc:?}"), "FourCC(H264)");
    }
}
