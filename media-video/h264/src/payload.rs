use crate::{
    H264ReassemblerConfig,
    nal::{
        FU_END_BIT, FU_HEADER_LEN, FU_START_BIT, NAL_UNIT_FU_A, NAL_UNIT_FU_B,
        NAL_UNIT_HEADER_TYPE_MASK, NAL_UNIT_PREFIX, NalHeader, NalKind,
    },
    parameter_sets::ParameterSetCache,
};
use bytes::Bytes;
use codec::{Frame, FrameStatus};
use rtp::RtpPacket;
use std::mem::take;

/// Reassemble H.264 access units from RTP packets of a non-interleaved mode stream (RFC 6184)
///
/// Every completed frame is an Annex B byte stream. Key frames start with the stream's configuration bytes,
/// in-band parameter sets are written in front of the next frame that starts after them.
///
/// Packet loss is not detected here, a lost fragment corrupts its frame but never the following ones.
#[derive(Debug)]
pub struct H264FrameReassembler {
    config: H264ReassemblerConfig,
    parameter_sets: ParameterSetCache,
    frame: Vec<u8>,
    key_frame: bool,
    /// `frame` holds a completed access unit which hasn't been taken yet
    complete: bool,
}

impl Default for H264FrameReassembler {
    fn default() -> Self {
        Self::new(H264ReassemblerConfig::default())
    }
}

impl H264FrameReassembler {
    pub fn new(config: H264ReassemblerConfig) -> Self {
        Self {
            parameter_sets: ParameterSetCache::new(config.max_parameter_sets),
            config,
            frame: Vec::new(),
            key_frame: false,
            complete: false,
        }
    }

    /// The frame currently under construction
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn is_key_frame(&self) -> bool {
        self.key_frame
    }

    /// Number of in-band parameter sets waiting for the next frame
    pub fn pending_parameter_sets(&self) -> usize {
        self.parameter_sets.len()
    }

    /// Discard the frame under construction and all pending parameter sets
    pub fn reset(&mut self) {
        self.begin_frame();
        self.parameter_sets.clear();
    }

    /// Feed the next RTP packet of the stream into the frame under construction
    ///
    /// `config` is written in front of every key frame. The marker bit is not used to detect frame boundaries.
    pub fn extract_frame(&mut self, packet: &RtpPacket, config: &[u8]) -> FrameStatus {
        let payload = &packet.payload;

        let Some(&b0) = payload.first() else {
            log::debug!("dropping packet with empty payload");
            return FrameStatus::default();
        };

        let header = NalHeader::from_byte(b0);

        if header.nal_ref_idc() == 0 && self.config.drop_non_reference {
            log::debug!(
                "dropping NAL unit of type {} with nal_ref_idc of 0",
                header.nal_unit_type()
            );
            return FrameStatus::default();
        }

        match NalKind::of(header.nal_unit_type()) {
            NalKind::FuA => self.extract_fu_a(header, payload, config),
            NalKind::StapA => {
                log::debug!("dropping unsupported STAP-A packet");
                FrameStatus::default()
            }
            NalKind::Interleaved => {
                log::debug!(
                    "dropping interleaved mode packet of type {}",
                    header.nal_unit_type()
                );
                FrameStatus::default()
            }
            NalKind::ParameterSet => {
                log::trace!(
                    "saving in-band parameter set of type {}, {} bytes",
                    header.nal_unit_type(),
                    payload.len()
                );

                self.parameter_sets.save(payload.clone());
                FrameStatus::default()
            }
            NalKind::IdrSlice => {
                self.begin_frame();
                self.frame.extend_from_slice(config);
                self.parameter_sets.drain_into(&mut self.frame);
                self.frame.extend_from_slice(&NAL_UNIT_PREFIX);
                self.frame.extend_from_slice(payload);
                self.key_frame = true;

                log::trace!(
                    "IDR slice completed key frame of {} bytes",
                    self.frame.len()
                );

                self.status(true)
            }
            NalKind::Single => {
                self.begin_frame();
                self.parameter_sets.drain_into(&mut self.frame);
                self.frame.extend_from_slice(&NAL_UNIT_PREFIX);
                self.frame.extend_from_slice(payload);

                log::trace!(
                    "NAL unit of type {} completed frame of {} bytes",
                    header.nal_unit_type(),
                    self.frame.len()
                );

                self.status(true)
            }
        }
    }

    fn extract_fu_a(
        &mut self,
        fu_indicator: NalHeader,
        payload: &[u8],
        config: &[u8],
    ) -> FrameStatus {
        if payload.len() < FU_HEADER_LEN {
            log::debug!("dropping FU-A packet without FU header");
            return FrameStatus::default();
        }

        let fu_header = payload[1];
        let nal_unit_type = fu_header & NAL_UNIT_HEADER_TYPE_MASK;
        let start = fu_header & FU_START_BIT != 0;
        let end = fu_header & FU_END_BIT != 0;

        // A completed frame is never extended, it is only kept around until taken
        if start || self.frame.is_empty() || self.complete {
            if !start {
                log::debug!("FU-A fragment without preceding start fragment, starting new frame");
            } else if !self.frame.is_empty() && !self.complete {
                log::trace!(
                    "FU-A start fragment discards {} pending bytes",
                    self.frame.len()
                );
            }

            let header = NalHeader::new(fu_indicator.nal_ref_idc(), nal_unit_type);

            self.begin_frame();
            self.parameter_sets.drain_into(&mut self.frame);
            self.frame.extend_from_slice(&NAL_UNIT_PREFIX);
            self.frame.push(header.to_byte());
        }

        self.frame.extend_from_slice(&payload[FU_HEADER_LEN..]);

        if !end {
            return self.status(false);
        }

        if NalKind::of(nal_unit_type) == NalKind::IdrSlice {
            self.frame.splice(0..0, config.iter().copied());
            self.key_frame = true;
        }

        log::trace!(
            "FU-A end fragment completed frame of {} bytes, key frame: {}",
            self.frame.len(),
            self.key_frame
        );

        self.status(true)
    }

    /// Move the frame under construction out, leaving an empty one behind
    pub fn take_frame(&mut self) -> Frame {
        self.complete = false;

        Frame {
            data: Bytes::from(take(&mut self.frame)),
            key_frame: take(&mut self.key_frame),
        }
    }

    /// Whether the payload carries the last fragment of a frame, honoring the `drop_non_reference` setting
    pub fn is_end_of_frame(&self, payload: &[u8]) -> bool {
        match payload {
            [b0, fu_header, ..] if !self.config.drop_non_reference => {
                is_fragmentation_unit(*b0) && fu_header & FU_END_BIT != 0
            }
            _ => is_end_of_frame(payload),
        }
    }

    fn begin_frame(&mut self) {
        self.frame.clear();
        self.key_frame = false;
        self.complete = false;
    }

    fn status(&mut self, full_frame: bool) -> FrameStatus {
        self.complete = full_frame;

        FrameStatus {
            full_frame,
            key_frame: self.key_frame,
        }
    }
}

/// Returns whether the RTP payload is the end fragment of a FU-A or FU-B unit
///
/// Units with a `nal_ref_idc` of 0 never end a frame, since the reassembler drops them.
pub fn is_end_of_frame(payload: &[u8]) -> bool {
    let [b0, fu_header, ..] = *payload else {
        return false;
    };

    if NalHeader::from_byte(b0).nal_ref_idc() == 0 {
        return false;
    }

    is_fragmentation_unit(b0) && fu_header & FU_END_BIT != 0
}

fn is_fragmentation_unit(b0: u8) -> bool {
    matches!(
        NalHeader::from_byte(b0).nal_unit_type(),
        NAL_UNIT_FU_A | NAL_UNIT_FU_B
    )
}
