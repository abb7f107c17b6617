use bitstream_io::{BigEndian, BitRead};
use std::borrow::Cow;

/// Sequential cursor over the bits of an immutable byte slice
///
/// Reading past the end puts the reader into a terminal error state. From then on every read returns zero
/// without advancing the cursor, so a parser can read all of its fields and check [`good`](Self::good)
/// once at the end.
pub(crate) struct BitReader<'a> {
    reader: bitstream_io::BitReader<&'a [u8], BigEndian>,
    /// Bits consumed so far
    position: u64,
    /// Total number of bits in the buffer
    len: u64,
    good: bool,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            reader: bitstream_io::BitReader::new(data),
            position: 0,
            len: data.len() as u64 * 8,
            good: true,
        }
    }

    /// Returns false once any read has failed
    pub(crate) fn good(&self) -> bool {
        self.good
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    fn fail(&mut self) {
        if self.good {
            log::trace!(
                "bit reader exhausted at bit {} of {}",
                self.position,
                self.len
            );
        }

        self.good = false;
    }

    /// Read `n` bits (at most 32) as unsigned big endian value
    pub(crate) fn read_bits(&mut self, n: u32) -> u32 {
        if !self.good {
            return 0;
        }

        if n > u32::BITS || self.position + u64::from(n) > self.len {
            self.fail();
            return 0;
        }

        if n == 0 {
            return 0;
        }

        match self.reader.read_var::<u32>(n) {
            Ok(value) => {
                self.position += u64::from(n);
                value
            }
            Err(_) => {
                self.fail();
                0
            }
        }
    }

    /// u(1)
    pub(crate) fn read_flag(&mut self) -> bool {
        self.read_bits(1) != 0
    }

    /// ue(v), H.264 section 9.1
    ///
    /// Codes with more than 32 leading zero bits put the reader into the error state.
    pub(crate) fn read_exp_golomb_unsigned(&mut self) -> u64 {
        let mut leading_zero_bits = 0;

        while !self.read_flag() {
            if !self.good {
                return 0;
            }

            leading_zero_bits += 1;

            if leading_zero_bits > u32::BITS {
                self.fail();
                return 0;
            }
        }

        let suffix = self.read_bits(leading_zero_bits);

        if !self.good {
            return 0;
        }

        (1u64 << leading_zero_bits) - 1 + u64::from(suffix)
    }

    /// se(v), H.264 section 9.1.1
    pub(crate) fn read_exp_golomb_signed(&mut self) -> i64 {
        let code_num = self.read_exp_golomb_unsigned();

        // code_num is below 2^33, it always fits
        let magnitude = code_num.div_ceil(2) as i64;

        if code_num % 2 == 1 {
            magnitude
        } else {
            -magnitude
        }
    }
}

/// Convert a NAL unit's payload to its RBSP by removing the emulation prevention bytes (00 00 03)
pub(crate) fn remove_emulation_prevention(nal: &[u8]) -> Cow<'_, [u8]> {
    let mut zero_count = 0;
    let mut rbsp: Option<Vec<u8>> = None;

    for (index, &byte) in nal.iter().enumerate() {
        if zero_count >= 2 && byte == 3 {
            rbsp.get_or_insert_with(|| nal[..index].to_vec());
            zero_count = 0;
            continue;
        }

        if let Some(rbsp) = &mut rbsp {
            rbsp.push(byte);
        }

        if byte == 0 {
            zero_count += 1;
        } else {
            zero_count = 0;
        }
    }

    match rbsp {
        Some(rbsp) => Cow::Owned(rbsp),
        None => Cow::Borrowed(nal),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fixed_width_reads() {
        let mut reader = BitReader::new(&[0b1011_0011, 0xFF, 0x00, 0x12, 0x34]);

        assert!(reader.read_flag());
        assert_eq!(reader.read_bits(3), 0b011);
        assert_eq!(reader.read_bits(8), 0b0011_1111);
        assert_eq!(reader.read_bits(0), 0);
        assert_eq!(reader.position(), 12);
        assert_eq!(reader.read_bits(28), 0xF00_1234);
        assert!(reader.good());
    }

    #[test]
    fn full_width_read_does_not_overflow() {
        let mut reader = BitReader::new(&[0xFF, 0xFF, 0xFF, 0xFF]);

        assert_eq!(reader.read_bits(32), u32::MAX);
        assert!(reader.good());
    }

    #[test]
    fn exp_golomb_unsigned() {
        // 1 | 010 | 011 | 00100 | 00101
        let mut reader = BitReader::new(&[0xA6, 0x42, 0x80]);

        for expected in 0..=4 {
            assert_eq!(reader.read_exp_golomb_unsigned(), expected);
        }
        assert_eq!(reader.position(), 17);
        assert!(reader.good());
    }

    #[test]
    fn exp_golomb_signed() {
        // code numbers 0 to 4 map to 0, 1, -1, 2, -2
        let mut reader = BitReader::new(&[0xA6, 0x42, 0x80]);

        for expected in [0, 1, -1, 2, -2] {
            assert_eq!(reader.read_exp_golomb_signed(), expected);
        }
        assert!(reader.good());
    }

    #[test]
    fn large_exp_golomb() {
        // 32 leading zeros, then the marker and a 32 bit suffix of ones
        let mut reader = BitReader::new(&[0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0x80]);

        assert_eq!(reader.read_exp_golomb_unsigned(), (1 << 33) - 2);
        assert!(reader.good());
    }

    #[test]
    fn too_many_leading_zeros() {
        let mut reader = BitReader::new(&[0, 0, 0, 0, 0, 0xFF]);

        assert_eq!(reader.read_exp_golomb_unsigned(), 0);
        assert!(!reader.good());
    }

    #[test]
    fn exhaustion_is_terminal() {
        let mut reader = BitReader::new(&[0xFF]);

        assert_eq!(reader.read_bits(6), 0b11_1111);
        assert_eq!(reader.read_bits(4), 0);
        assert!(!reader.good());
        assert_eq!(reader.position(), 6);

        // the remaining two bits stay unreachable
        assert!(!reader.read_flag());
        assert_eq!(reader.read_exp_golomb_unsigned(), 0);
        assert_eq!(reader.position(), 6);
    }

    #[test]
    fn exp_golomb_running_out_of_suffix() {
        // 00100 needs 5 bits, only 3 available after the first byte's 5 bits
        let mut reader = BitReader::new(&[0b1111_1001]);

        assert_eq!(reader.read_bits(5), 0b11111);
        assert_eq!(reader.read_exp_golomb_unsigned(), 0);
        assert!(!reader.good());
    }

    #[test]
    fn emulation_prevention() {
        let nal = [0x67, 0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x00, 0x03];
        assert_eq!(
            &remove_emulation_prevention(&nal)[..],
            &[0x67, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x03]
        );

        let untouched = [0x67, 0x00, 0x03, 0x00, 0x00, 0x01];
        assert!(matches!(
            remove_emulation_prevention(&untouched),
            Cow::Borrowed(_)
        ));
    }
}
