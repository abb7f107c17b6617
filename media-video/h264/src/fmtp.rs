use crate::{Sps, nal::NAL_UNIT_PREFIX};
use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use bytes::{BufMut, Bytes, BytesMut};
use std::str::FromStr;

/// Some encoders omit the `=` padding of the sprop-parameter-sets
const SPROP_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Specifies the RTP packetization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H264PacketizationMode {
    /// Each RTP packet contains exactly one H.264 NAL unit
    SingleNal = 0,

    /// NAL units are sent in decoding order, large NAL units are fragmented using FU-A
    ///
    /// The only mode supported for reception.
    NonInterleaved = 1,

    /// NAL units can be transmitted out of order, using STAP-B, MTAP and FU-B packets
    Interleaved = 2,
}

impl FromStr for H264PacketizationMode {
    type Err = ParseH264FmtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::SingleNal),
            "1" => Ok(Self::NonInterleaved),
            "2" => Ok(Self::Interleaved),
            _ => Err(ParseH264FmtpError::InvalidPacketizationMode(s.into())),
        }
    }
}

/// The parts of an H.264 `fmtp` attribute required to receive a stream
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct H264Fmtp {
    /// `packetization-mode`, `None` if absent
    pub packetization_mode: Option<H264PacketizationMode>,
    /// Decoded `sprop-parameter-sets`, in the order they appeared in
    pub sprop_parameter_sets: Vec<Bytes>,
    /// `profile-level-id` as profile_idc, profile_iop & level_idc
    pub profile_level_id: Option<[u8; 3]>,
}

/// Failed to parse H.264 fmtp line
#[derive(Debug, thiserror::Error)]
pub enum ParseH264FmtpError {
    #[error("fmtp attribute has no packetization-mode")]
    MissingPacketizationMode,
    #[error("invalid packetization-mode {0:?}")]
    InvalidPacketizationMode(String),
    #[error("packetization mode {0:?} is not supported, only non-interleaved mode is")]
    UnsupportedPacketizationMode(H264PacketizationMode),
    #[error("fmtp attribute contains no sprop-parameter-sets")]
    MissingParameterSets,
    #[error("sprop-parameter-sets contains invalid base64")]
    InvalidBase64(#[from] base64::DecodeError),
}

impl FromStr for H264Fmtp {
    type Err = ParseH264FmtpError;

    /// Parses the attribute line, with or without the `a=fmtp:<pt>` part
    ///
    /// Parameters are delimited by spaces and semicolons, names are matched case sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fmtp = Self::default();

        let tokens = s
            .trim_matches([' ', ';'])
            .split([' ', ';'])
            .filter(|token| !token.is_empty());

        for token in tokens {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };

            if key.starts_with("packetization-mode") {
                fmtp.packetization_mode = Some(value.parse()?);
            } else if key.starts_with("sprop-parameter-sets") {
                fmtp.sprop_parameter_sets = parse_sprop_parameter_sets(value)?;
            } else if key.starts_with("profile-level-id") {
                fmtp.profile_level_id = parse_profile_level_id(value);
            }
        }

        Ok(fmtp)
    }
}

impl H264Fmtp {
    /// Create the decoder configuration from the parameter sets
    ///
    /// Every set is written as Annex B NAL unit. Fails unless the stream uses non-interleaved mode and carries
    /// at least one parameter set, the returned bytes are never empty.
    pub fn config_bytes(&self) -> Result<Bytes, ParseH264FmtpError> {
        match self.packetization_mode {
            Some(H264PacketizationMode::NonInterleaved) => {}
            Some(mode) => return Err(ParseH264FmtpError::UnsupportedPacketizationMode(mode)),
            None => return Err(ParseH264FmtpError::MissingPacketizationMode),
        }

        if self.sprop_parameter_sets.is_empty() {
            return Err(ParseH264FmtpError::MissingParameterSets);
        }

        let len = self
            .sprop_parameter_sets
            .iter()
            .map(|set| NAL_UNIT_PREFIX.len() + set.len())
            .sum();

        let mut config = BytesMut::with_capacity(len);

        for set in &self.sprop_parameter_sets {
            config.put_slice(&NAL_UNIT_PREFIX);
            config.put_slice(set);
        }

        Ok(config.freeze())
    }

    /// Whether the `profile-level-id` names the same profile as the SPS, true if absent
    pub fn profile_matches(&self, sps: &Sps) -> bool {
        self.profile_level_id
            .is_none_or(|[profile_idc, ..]| profile_idc == sps.profile_idc)
    }
}

/// Parse an SDP fmtp line into the decoder configuration bytes of the stream
///
/// A `profile-level-id` which disagrees with the SPS is logged, the SPS wins.
pub fn parse_fmtp(line: &str) -> Result<Bytes, ParseH264FmtpError> {
    let fmtp: H264Fmtp = line.parse()?;
    let config = fmtp.config_bytes()?;

    if let Ok(sps) = Sps::from_config(&config) {
        if !fmtp.profile_matches(&sps) {
            log::warn!(
                "fmtp profile-level-id {:02X?} does not match SPS profile_idc {}",
                fmtp.profile_level_id,
                sps.profile_idc
            );
        }
    }

    Ok(config)
}

fn parse_sprop_parameter_sets(value: &str) -> Result<Vec<Bytes>, ParseH264FmtpError> {
    let mut sets = Vec::new();

    for field in value.split(',').filter(|field| !field.is_empty()) {
        let mut set = SPROP_BASE64.decode(field)?;

        // Some cameras append a start code to every set
        if set.ends_with(&NAL_UNIT_PREFIX) {
            log::debug!("stripping trailing start code from sprop-parameter-set");
            set.truncate(set.len() - NAL_UNIT_PREFIX.len());
        }

        if set.is_empty() {
            continue;
        }

        sets.push(Bytes::from(set));
    }

    Ok(sets)
}

fn parse_profile_level_id(value: &str) -> Option<[u8; 3]> {
    if value.len() != 6 {
        log::debug!("ignoring malformed profile-level-id {value:?}");
        return None;
    }

    let id = u32::from_str_radix(value, 16).ok()?.to_be_bytes();

    Some([id[1], id[2], id[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_fmtp() {
        let line = "fmtp:96 packetization-mode=1;profile-level-id=4D401E;sprop-parameter-sets=Z01AHppkBYHv/lBgYGQAAA+gAAE4gBA=,aO48gA==";

        let fmtp: H264Fmtp = line.parse().unwrap();

        assert_eq!(
            fmtp.packetization_mode,
            Some(H264PacketizationMode::NonInterleaved)
        );
        assert_eq!(fmtp.profile_level_id, Some([0x4D, 0x40, 0x1E]));
        assert_eq!(fmtp.sprop_parameter_sets.len(), 2);
        assert_eq!(&fmtp.sprop_parameter_sets[1][..], [0x68, 0xEE, 0x3C, 0x80]);

        let config = fmtp.config_bytes().unwrap();

        assert_eq!(&config[..5], &[0, 0, 0, 1, 0x67]);
        assert_eq!(config.len(), 4 + 23 + 4 + 4);
        assert_eq!(&config[27..], &[0, 0, 0, 1, 0x68, 0xEE, 0x3C, 0x80]);
    }

    #[test]
    fn profile_level_id_against_sps() {
        let sps_line = "sprop-parameter-sets=Z01AHppkBYHv/lBgYGQAAA+gAAE4gBA=";

        for (profile_level_id, matches) in [("4D401E", true), ("42E01F", false), ("", true)] {
            let line = format!(
                "fmtp:96 packetization-mode=1;profile-level-id={profile_level_id};{sps_line}"
            );
            let fmtp: H264Fmtp = line.parse().unwrap();
            let sps = Sps::from_config(&fmtp.config_bytes().unwrap()).unwrap();

            assert_eq!(fmtp.profile_matches(&sps), matches);

            // A mismatch is not an error
            assert!(parse_fmtp(&line).is_ok());
        }
    }

    #[test]
    fn delimiters_collapse() {
        let config =
            parse_fmtp(" ;a=fmtp:96  packetization-mode=1;; sprop-parameter-sets=aO48gA==; ")
                .unwrap();

        assert_eq!(&config[..], &[0, 0, 0, 1, 0x68, 0xEE, 0x3C, 0x80]);
    }

    #[test]
    fn unpadded_base64() {
        let config = parse_fmtp("packetization-mode=1;sprop-parameter-sets=aO48gA").unwrap();

        assert_eq!(&config[..], &[0, 0, 0, 1, 0x68, 0xEE, 0x3C, 0x80]);
    }

    #[test]
    fn trailing_start_code() {
        let config = parse_fmtp(
            "packetization-mode=1;sprop-parameter-sets=Z00AHpWoLQ9puAgICBAAAAAB,aO48gAAAAAE=",
        )
        .unwrap();

        assert_eq!(
            &config[..],
            &[
                0, 0, 0, 1, 0x67, 0x4D, 0x00, 0x1E, 0x95, 0xA8, 0x2D, 0x0F, 0x69, 0xB8, 0x08,
                0x08, 0x08, 0x10, 0, 0, 0, 1, 0x68, 0xEE, 0x3C, 0x80,
            ]
        );
    }

    #[test]
    fn empty_fields_are_skipped() {
        let fmtp: H264Fmtp = "packetization-mode=1;sprop-parameter-sets=,aO48gA==,"
            .parse()
            .unwrap();

        assert_eq!(fmtp.sprop_parameter_sets.len(), 1);
    }

    #[test]
    fn packetization_mode_required() {
        assert!(matches!(
            parse_fmtp("fmtp:96 sprop-parameter-sets=aO48gA=="),
            Err(ParseH264FmtpError::MissingPacketizationMode)
        ));

        for mode in ["0", "2"] {
            let line = format!("fmtp:96 packetization-mode={mode};sprop-parameter-sets=aO48gA==");

            assert!(matches!(
                parse_fmtp(&line),
                Err(ParseH264FmtpError::UnsupportedPacketizationMode(_))
            ));
        }

        assert!(matches!(
            parse_fmtp("fmtp:96 packetization-mode=one;sprop-parameter-sets=aO48gA=="),
            Err(ParseH264FmtpError::InvalidPacketizationMode(_))
        ));
    }

    #[test]
    fn parameter_sets_required() {
        assert!(matches!(
            parse_fmtp("fmtp:96 packetization-mode=1"),
            Err(ParseH264FmtpError::MissingParameterSets)
        ));
        assert!(matches!(
            parse_fmtp("fmtp:96 packetization-mode=1;sprop-parameter-sets=,"),
            Err(ParseH264FmtpError::MissingParameterSets)
        ));
        assert!(matches!(
            parse_fmtp("fmtp:96 packetization-mode=1;sprop-parameter-sets=Z0%%"),
            Err(ParseH264FmtpError::InvalidBase64(_))
        ));
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!(matches!(
            parse_fmtp("fmtp:96 Packetization-Mode=1;sprop-parameter-sets=aO48gA=="),
            Err(ParseH264FmtpError::MissingPacketizationMode)
        ));
    }
}
