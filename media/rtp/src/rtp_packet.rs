use crate::{RtpTimestamp, SequenceNumber, Ssrc};
use bytes::Bytes;

/// A received RTP packet
///
/// Depacketizers only look at the `payload` and the `marker` bit, the remaining header fields are kept
/// for the transport's own bookkeeping (loss detection, logging).
#[derive(Debug, Default, Clone)]
pub struct RtpPacket {
    pub pt: u8,
    pub sequence_number: SequenceNumber,
    pub ssrc: Ssrc,
    pub timestamp: RtpTimestamp,
    pub marker: bool,
    pub payload: Bytes,
}

impl RtpPacket {
    /// Parse a UDP datagram into an RTP packet.
    ///
    /// The payload is a zero-copy view into `bytes`, with header extensions and padding removed.
    pub fn parse(bytes: impl Into<Bytes>) -> Result<Self, rtp_types::RtpParseError> {
        let packet: Bytes = bytes.into();

        let parsed = rtp_types::RtpPacket::parse(&packet[..])?;

        Ok(RtpPacket {
            pt: parsed.payload_type(),
            sequence_number: SequenceNumber(parsed.sequence_number()),
            ssrc: Ssrc(parsed.ssrc()),
            timestamp: RtpTimestamp(parsed.timestamp()),
            marker: parsed.marker_bit(),
            payload: packet.slice_ref(parsed.payload()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_datagram() {
        #[rustfmt::skip]
        let datagram: &[u8] = &[
            0x80, 0xE0, // V=2, M=1, PT=96
            0x12, 0x34, // sequence number
            0x00, 0x01, 0x5F, 0x90, // timestamp
            0xDE, 0xAD, 0xBE, 0xEF, // ssrc
            0x7C, 0x85, 0xAA, 0xBB, // FU-A payload
        ];

        let packet = RtpPacket::parse(Bytes::from_static(datagram)).unwrap();

        assert_eq!(packet.pt, 96);
        assert!(packet.marker);
        assert_eq!(packet.sequence_number, SequenceNumber(0x1234));
        assert_eq!(packet.timestamp, RtpTimestamp(90_000));
        assert_eq!(packet.ssrc, Ssrc(0xDEADBEEF));
        assert_eq!(&packet.payload[..], &[0x7C, 0x85, 0xAA, 0xBB]);
    }

    #[test]
    fn reject_truncated_header() {
        assert!(RtpPacket::parse(Bytes::from_static(&[0x80, 0x60, 0x00])).is_err());
    }
}
