use crate::{
    H264FrameReassembler, H264ReassemblerConfig, ParseH264FmtpError,
    fmtp::parse_fmtp,
    nal::NAL_UNIT_PREFIX,
    sps::{H264ConfigError, Sps, SpsError},
};
use bytes::Bytes;
use codec::{
    ConstructSampleError, FourCC, Frame, FrameStatus, MediaSample, RtpVideoEncoding, VideoFormat,
};
use rtp::RtpPacket;

/// H.264 over RTP as described by RFC 6184, non-interleaved mode only
#[derive(Debug, Default)]
pub struct H264Encoding {
    reassembler: H264FrameReassembler,
}

impl H264Encoding {
    pub const FOURCC: FourCC = FourCC::from_bytes(*b"H264");
    pub const MIME_SUBTYPE: &'static str = "H264";

    pub fn new(config: H264ReassemblerConfig) -> Self {
        Self {
            reassembler: H264FrameReassembler::new(config),
        }
    }

    pub fn reassembler(&self) -> &H264FrameReassembler {
        &self.reassembler
    }

    pub fn reassembler_mut(&mut self) -> &mut H264FrameReassembler {
        &mut self.reassembler
    }
}

impl RtpVideoEncoding for H264Encoding {
    type FmtpError = ParseH264FmtpError;
    type ConfigError = H264ConfigError;

    fn fourcc(&self) -> FourCC {
        Self::FOURCC
    }

    fn mime_subtype(&self) -> &'static str {
        Self::MIME_SUBTYPE
    }

    fn parse_fmtp(&self, line: &str) -> Result<Bytes, ParseH264FmtpError> {
        parse_fmtp(line).inspect_err(|e| log::warn!("rejecting H.264 fmtp {line:?}: {e}"))
    }

    fn parse_config(&self, config: &[u8]) -> Result<VideoFormat, H264ConfigError> {
        let sps = Sps::from_config(config)
            .inspect_err(|e| log::warn!("failed to read dimensions from H.264 config: {e}"))?;

        let (width, height) = sps
            .dimensions()
            .ok_or(SpsError::ValueOutOfRange("picture dimensions"))?;

        Ok(VideoFormat {
            width,
            height,
            frame_rate: None,
        })
    }

    fn is_end_of_frame(&self, packet: &RtpPacket) -> bool {
        self.reassembler.is_end_of_frame(&packet.payload)
    }

    fn extract_frame(&mut self, packet: &RtpPacket, config: &[u8]) -> FrameStatus {
        self.reassembler.extract_frame(packet, config)
    }

    fn take_frame(&mut self) -> Frame {
        self.reassembler.take_frame()
    }

    fn construct_sample(
        &self,
        frame: &[u8],
        key_frame: bool,
        sample: &mut dyn MediaSample,
    ) -> Result<(), ConstructSampleError> {
        if !frame.starts_with(&NAL_UNIT_PREFIX) || frame.len() <= NAL_UNIT_PREFIX.len() {
            return Err(ConstructSampleError::MalformedFrame);
        }

        let capacity = sample.capacity();

        if capacity < frame.len() {
            return Err(ConstructSampleError::InsufficientCapacity {
                frame_len: frame.len(),
                capacity,
            });
        }

        sample.set_data(frame);
        sample.set_sync_point(key_frame);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::{BufferSample, ParseSdpError};

    const FMTP: &str = "fmtp:96 packetization-mode=1;profile-level-id=4D401E;sprop-parameter-sets=Z01AHppkBYHv/lBgYGQAAA+gAAE4gBA=,aO48gA==";

    #[test]
    fn identification() {
        let encoding = H264Encoding::default();

        assert_eq!(encoding.fourcc(), FourCC::from_bytes(*b"H264"));
        assert_eq!(encoding.fourcc().0, 0x3436_3248);
        assert_eq!(encoding.mime_subtype(), "H264");
    }

    #[test]
    fn parse_sdp() {
        let encoding = H264Encoding::default();

        let params = encoding.parse_sdp("H264", FMTP).unwrap();

        assert_eq!(params.format.width, 704);
        assert_eq!(params.format.height, 480);
        assert_eq!(params.format.frame_rate, None);
        assert_eq!(&params.config[..5], &[0, 0, 0, 1, 0x67]);

        assert!(encoding.parse_sdp("h264", FMTP).is_ok());
    }

    #[test]
    fn parse_sdp_errors() {
        let encoding = H264Encoding::default();

        assert!(matches!(
            encoding.parse_sdp("H265", FMTP),
            Err(ParseSdpError::EncodingMismatch { .. })
        ));
        assert!(matches!(
            encoding.parse_sdp("H264", "fmtp:96 packetization-mode=0"),
            Err(ParseSdpError::Fmtp(_))
        ));

        // Only a PPS, no SPS
        assert!(matches!(
            encoding.parse_sdp(
                "H264",
                "fmtp:96 packetization-mode=1;sprop-parameter-sets=aO48gA=="
            ),
            Err(ParseSdpError::Config(H264ConfigError::MissingSps))
        ));
    }

    #[test]
    fn construct_sample() {
        let encoding = H264Encoding::default();
        let frame = [0, 0, 0, 1, 0x65, 0x88, 0x84];

        let mut sample = BufferSample::with_capacity(64);
        encoding
            .construct_sample(&frame, true, &mut sample)
            .unwrap();

        assert_eq!(sample.data(), frame);
        assert!(sample.is_sync_point());

        encoding
            .construct_sample(&frame, false, &mut sample)
            .unwrap();
        assert!(!sample.is_sync_point());
    }

    #[test]
    fn construct_sample_errors() {
        let encoding = H264Encoding::default();
        let mut sample = BufferSample::with_capacity(6);

        assert!(matches!(
            encoding.construct_sample(&[0, 0, 0, 1, 0x65, 0x88, 0x84], true, &mut sample),
            Err(ConstructSampleError::InsufficientCapacity {
                frame_len: 7,
                capacity: 6,
            })
        ));
        assert!(matches!(
            encoding.construct_sample(&[0, 0, 1, 0x65], true, &mut sample),
            Err(ConstructSampleError::MalformedFrame)
        ));
        assert!(matches!(
            encoding.construct_sample(&[0, 0, 0, 1], true, &mut sample),
            Err(ConstructSampleError::MalformedFrame)
        ));
        assert!(sample.data().is_empty());
    }
}
