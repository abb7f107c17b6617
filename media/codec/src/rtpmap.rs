use std::{num::ParseIntError, str::FromStr};

/// SDP `rtpmap` attribute, mapping a payload type to an encoding
///
/// e.g. `a=rtpmap:96 H264/90000`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMap {
    pub payload_type: u8,
    pub encoding_name: String,
    pub clock_rate: u32,
    pub encoding_params: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseRtpMapError {
    #[error("rtpmap attribute is missing the encoding")]
    MissingEncoding,
    #[error("rtpmap attribute is missing the clock rate")]
    MissingClockRate,
    #[error("encountered invalid integer {0}")]
    InvalidValue(#[from] ParseIntError),
}

impl FromStr for RtpMap {
    type Err = ParseRtpMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("a=").unwrap_or(s);
        let s = s.strip_prefix("rtpmap:").unwrap_or(s);

        let (payload_type, encoding) = s.split_once(' ').ok_or(ParseRtpMapError::MissingEncoding)?;

        let mut parts = encoding.trim().splitn(3, '/');

        let encoding_name = parts
            .next()
            .filter(|name| !name.is_empty())
            .ok_or(ParseRtpMapError::MissingEncoding)?;

        let clock_rate = parts.next().ok_or(ParseRtpMapError::MissingClockRate)?;

        Ok(Self {
            payload_type: payload_type.parse()?,
            encoding_name: encoding_name.into(),
            clock_rate: clock_rate.parse()?,
            encoding_params: parts.next().map(Into::into),
        })
    }
}
