//! Codec for RuuviTag BLE advertisements carrying data format 5 (RAWv2).
//!
//! An advertisement as forwarded by the gateway is 31 bytes: a 3 byte flags
//! structure followed by one manufacturer-specific AD structure whose payload
//! holds the format 5 sensor fields.
//!
//! See: https://docs.ruuvi.com/communication/bluetooth-advertisements/data-format-5-rawv2

use crate::mac_address::MacAddress;
use thiserror::Error;

/// Total size of a format 5 advertisement on the wire.
pub const ADVERTISEMENT_LEN: usize = 31;

/// Required value of the AD length byte (bytes following the length field).
pub const ADVERTISEMENT_LENGTH: u8 = 27;

/// Bluetooth manufacturer-specific data type (AD type 0xFF).
pub const MANUFACTURER_DATA_TYPE: u8 = 0xff;

/// Ruuvi Innovations manufacturer ID, sent least significant byte first.
pub const RUUVI_MANUFACTURER_ID: u16 = 0x0499;

/// The only data format this codec decodes.
pub const DATA_FORMAT_5: u8 = 5;

/// Bytes following the manufacturer ID: format version plus sensor fields.
pub const PAYLOAD_LEN: usize = ADVERTISEMENT_LENGTH as usize - 3;

/// Offset of the payload (format version byte) within the advertisement.
const PAYLOAD_OFFSET: usize = ADVERTISEMENT_LEN - PAYLOAD_LEN;

/// Error types for decoding advertisements.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The hex text could not be turned into bytes
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
    /// A field needs more bytes than the input has left
    #[error("Truncated input: {field} at offset {offset} needs {needed} byte(s), {available} available")]
    TruncatedInput {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// A fixed header field holds an unexpected value
    #[error("Structural mismatch: {field} at offset {offset}: expected {expected:#x}, got {got:#x}")]
    StructuralMismatch {
        field: &'static str,
        offset: usize,
        expected: usize,
        got: usize,
    },
    /// Data format other than 5
    #[error("Unsupported format: RuuviTag data format {0} (only format 5 is supported)")]
    UnsupportedFormat(u8),
}

/// Packed battery voltage and transmit power.
///
/// The upper 11 bits are millivolts above 1.6 V, the lower 5 bits are the
/// transmit power above -40 dBm in 2 dBm steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PowerWord(pub u16);

impl PowerWord {
    const TX_POWER_BITS: u32 = 5;
    const TX_POWER_MASK: u16 = (1 << Self::TX_POWER_BITS) - 1;
    const VOLTAGE_MASK: u16 = (1 << 11) - 1;

    /// Pack voltage and tx power bits. Out-of-range bits are masked off.
    pub fn from_parts(voltage_bits: u16, tx_power_bits: u8) -> Self {
        Self(
            (voltage_bits & Self::VOLTAGE_MASK) << Self::TX_POWER_BITS
                | (u16::from(tx_power_bits) & Self::TX_POWER_MASK),
        )
    }

    /// Millivolts above the 1.6 V baseline.
    pub fn voltage_bits(self) -> u16 {
        self.0 >> Self::TX_POWER_BITS
    }

    /// 2 dBm steps above the -40 dBm baseline.
    pub fn tx_power_bits(self) -> u8 {
        (self.0 & Self::TX_POWER_MASK) as u8
    }
}

/// Raw sensor fields of a format 5 payload, before unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Format5Sample {
    /// Temperature in 0.005 °C
    pub temperature: i16,
    /// Relative humidity in 0.0025 %
    pub humidity: u16,
    /// Pressure in Pa, offset by -50000 Pa
    pub pressure: u16,
    /// Acceleration in milli-g
    pub acceleration_x: i16,
    pub acceleration_y: i16,
    pub acceleration_z: i16,
    pub power: PowerWord,
    /// Incremented by motion detection interrupts
    pub movement_counter: u8,
    /// Incremented for every measurement, used for de-duplication
    pub measurement_sequence: u16,
    pub mac: MacAddress,
}

impl Format5Sample {
    fn decode(payload: &[u8; PAYLOAD_LEN]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::with_base(payload, PAYLOAD_OFFSET);

        let version = cursor.u8("format version")?;
        if version != DATA_FORMAT_5 {
            return Err(DecodeError::UnsupportedFormat(version));
        }

        Ok(Self {
            temperature: cursor.be_i16("temperature")?,
            humidity: cursor.be_u16("humidity")?,
            pressure: cursor.be_u16("pressure")?,
            acceleration_x: cursor.be_i16("acceleration x")?,
            acceleration_y: cursor.be_i16("acceleration y")?,
            acceleration_z: cursor.be_i16("acceleration z")?,
            power: PowerWord(cursor.be_u16("power")?),
            movement_counter: cursor.u8("movement counter")?,
            measurement_sequence: cursor.be_u16("measurement sequence")?,
            mac: MacAddress(cursor.take("mac address")?),
        })
    }

    /// Encode the sample as a payload, format version byte included.
    pub fn encode(&self) -> [u8; PAYLOAD_LEN] {
        let mut out = [0u8; PAYLOAD_LEN];
        out[0] = DATA_FORMAT_5;
        out[1..3].copy_from_slice(&self.temperature.to_be_bytes());
        out[3..5].copy_from_slice(&self.humidity.to_be_bytes());
        out[5..7].copy_from_slice(&self.pressure.to_be_bytes());
        out[7..9].copy_from_slice(&self.acceleration_x.to_be_bytes());
        out[9..11].copy_from_slice(&self.acceleration_y.to_be_bytes());
        out[11..13].copy_from_slice(&self.acceleration_z.to_be_bytes());
        out[13..15].copy_from_slice(&self.power.0.to_be_bytes());
        out[15] = self.movement_counter;
        out[16..18].copy_from_slice(&self.measurement_sequence.to_be_bytes());
        out[18..24].copy_from_slice(&self.mac.octets());
        out
    }
}

/// One decoded manufacturer-specific advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleAdvertisement {
    /// Flags AD structure, passed through without validation
    pub flags: [u8; 3],
    /// Content length after this byte, always 27
    pub length: u8,
    /// AD type, always 0xFF
    pub ad_type: u8,
    /// Always 0x0499
    pub manufacturer_id: u16,
    /// Format version byte plus sensor fields
    pub payload: [u8; PAYLOAD_LEN],
    pub sample: Format5Sample,
}

impl BleAdvertisement {
    /// Build a well-formed advertisement around `sample`.
    pub fn new(flags: [u8; 3], sample: Format5Sample) -> Self {
        Self {
            flags,
            length: ADVERTISEMENT_LENGTH,
            ad_type: MANUFACTURER_DATA_TYPE,
            manufacturer_id: RUUVI_MANUFACTURER_ID,
            payload: sample.encode(),
            sample,
        }
    }

    /// Wire bytes of the advertisement.
    pub fn to_bytes(&self) -> [u8; ADVERTISEMENT_LEN] {
        let mut out = [0u8; ADVERTISEMENT_LEN];
        out[..3].copy_from_slice(&self.flags);
        out[3] = self.length;
        out[4] = self.ad_type;
        out[5..7].copy_from_slice(&self.manufacturer_id.to_le_bytes());
        out[PAYLOAD_OFFSET..].copy_from_slice(&self.payload);
        out
    }

    /// Upper-case hex text of the wire bytes, as the gateway sends it.
    pub fn to_hex(&self) -> String {
        self.to_bytes().iter().map(|b| format!("{b:02X}")).collect()
    }
}

/// Sequential reader over the advertisement bytes.
struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
    base: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Cursor whose reported offsets start at `base`.
    fn with_base(data: &'a [u8], base: usize) -> Self {
        Cursor {
            data,
            position: 0,
            base,
        }
    }

    fn offset(&self) -> usize {
        self.base + self.position
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    fn take<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let remaining = self.remaining();
        if remaining.len() < N {
            return Err(DecodeError::TruncatedInput {
                field,
                offset: self.offset(),
                needed: N,
                available: remaining.len(),
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&remaining[..N]);
        self.position += N;
        Ok(out)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        let [byte]: [u8; 1] = self.take(field)?;
        Ok(byte)
    }

    fn be_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        self.take(field).map(u16::from_be_bytes)
    }

    fn be_i16(&mut self, field: &'static str) -> Result<i16, DecodeError> {
        self.take(field).map(i16::from_be_bytes)
    }

    fn le_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        self.take(field).map(u16::from_le_bytes)
    }
}

fn expect_value(
    field: &'static str,
    offset: usize,
    expected: usize,
    got: usize,
) -> Result<(), DecodeError> {
    if expected == got {
        Ok(())
    } else {
        Err(DecodeError::StructuralMismatch {
            field,
            offset,
            expected,
            got,
        })
    }
}

/// Decode a raw advertisement.
///
/// Header checks run in wire order: length byte, AD type, manufacturer ID,
/// payload length, then format version. The first failing check is
/// returned; nothing is decoded past it.
pub fn decode(data: &[u8]) -> Result<BleAdvertisement, DecodeError> {
    let mut cursor = Cursor::new(data);

    let flags = cursor.take("flags")?;

    let offset = cursor.offset();
    let length = cursor.u8("length")?;
    expect_value(
        "length",
        offset,
        ADVERTISEMENT_LENGTH.into(),
        length.into(),
    )?;

    let offset = cursor.offset();
    let ad_type = cursor.u8("ad type")?;
    expect_value(
        "ad type",
        offset,
        MANUFACTURER_DATA_TYPE.into(),
        ad_type.into(),
    )?;

    let offset = cursor.offset();
    let manufacturer_id = cursor.le_u16("manufacturer id")?;
    expect_value(
        "manufacturer id",
        offset,
        RUUVI_MANUFACTURER_ID.into(),
        manufacturer_id.into(),
    )?;

    let offset = cursor.offset();
    let rest = cursor.remaining();
    let payload: [u8; PAYLOAD_LEN] =
        rest.try_into()
            .map_err(|_| DecodeError::StructuralMismatch {
                field: "payload length",
                offset,
                expected: usize::from(length) - 3,
                got: rest.len(),
            })?;

    let sample = Format5Sample::decode(&payload)?;

    Ok(BleAdvertisement {
        flags,
        length,
        ad_type,
        manufacturer_id,
        payload,
        sample,
    })
}

/// Decode an advertisement given as hex text.
pub fn decode_hex(text: &str) -> Result<BleAdvertisement, DecodeError> {
    decode(&hex_to_bytes(text)?)
}

/// Convert hex text to bytes. Surrounding whitespace is ignored, digits may
/// be upper or lower case.
pub fn hex_to_bytes(text: &str) -> Result<Vec<u8>, DecodeError> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return Err(DecodeError::InvalidHex(format!(
            "odd number of digits ({})",
            text.len()
        )));
    }

    text.as_bytes()
        .chunks(2)
        .map(|pair| match (nibble(pair[0]), nibble(pair[1])) {
            (Some(high), Some(low)) => Ok(high << 4 | low),
            _ => Err(DecodeError::InvalidHex(format!(
                "'{}' is not a hex byte",
                String::from_utf8_lossy(pair)
            ))),
        })
        .collect()
}

fn nibble(digit: u8) -> Option<u8> {
    char::from(digit).to_digit(16).map(|value| value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_FLAGS, sample_advertisement, vendor_sample};

    // Valid vector from the data format 5 documentation.
    const VENDOR_HEX: &str = "0201061BFF99040512FC5394C37C0004FFFC040CAC364200CDCBB8334C884F";
    const VENDOR_MAX_HEX: &str = "0201061BFF9904057FFFFFFEFFFE7FFF7FFF7FFFFFDEFEFFFECBB8334C884F";
    const VENDOR_MIN_HEX: &str = "0201061BFF9904058001000000008001800180010000000000CBB8334C884F";

    fn vendor_bytes() -> Vec<u8> {
        hex_to_bytes(VENDOR_HEX).unwrap()
    }

    #[test]
    fn test_decode_vendor_vector() {
        let adv = decode_hex(VENDOR_HEX).unwrap();
        assert_eq!(adv.flags, [0x02, 0x01, 0x06]);
        assert_eq!(adv.length, 27);
        assert_eq!(adv.ad_type, 0xFF);
        assert_eq!(adv.manufacturer_id, 0x0499);
        assert_eq!(adv.payload[0], 5);

        let sample = adv.sample;
        assert_eq!(sample.temperature, 4860);
        assert_eq!(sample.humidity, 21396);
        assert_eq!(sample.pressure, 50044);
        assert_eq!(sample.acceleration_x, 4);
        assert_eq!(sample.acceleration_y, -4);
        assert_eq!(sample.acceleration_z, 1036);
        assert_eq!(sample.power, PowerWord(0xAC36));
        assert_eq!(sample.power.voltage_bits(), 1377);
        assert_eq!(sample.power.tx_power_bits(), 22);
        assert_eq!(sample.movement_counter, 66);
        assert_eq!(sample.measurement_sequence, 205);
        assert_eq!(sample.mac.to_string(), "CB:B8:33:4C:88:4F");
        assert_eq!(sample, vendor_sample());
    }

    #[test]
    fn test_decode_vendor_extremes() {
        let max = decode_hex(VENDOR_MAX_HEX).unwrap().sample;
        assert_eq!(max.temperature, 32767);
        assert_eq!(max.humidity, 65534);
        assert_eq!(max.pressure, 65534);
        assert_eq!(max.acceleration_z, 32767);
        assert_eq!(max.power.voltage_bits(), 2046);
        assert_eq!(max.power.tx_power_bits(), 30);
        assert_eq!(max.movement_counter, 254);
        assert_eq!(max.measurement_sequence, 65534);

        let min = decode_hex(VENDOR_MIN_HEX).unwrap().sample;
        assert_eq!(min.temperature, -32767);
        assert_eq!(min.humidity, 0);
        assert_eq!(min.acceleration_x, -32767);
        assert_eq!(min.power.voltage_bits(), 0);
        assert_eq!(min.power.tx_power_bits(), 0);
    }

    #[test]
    fn test_decode_temperature_0x0514() {
        let sample = Format5Sample {
            temperature: 0x0514,
            ..vendor_sample()
        };
        let hex = sample_advertisement(sample).to_hex();
        assert!(hex.starts_with("0201061BFF990405"));
        assert_eq!(&hex[16..20], "0514");

        let adv = decode_hex(&hex).unwrap();
        assert_eq!(adv.sample.temperature, 1300);
    }

    #[test]
    fn test_decode_rejects_wrong_length_byte() {
        let mut data = vendor_bytes();
        data[3] = 0x1A;
        assert_eq!(
            decode(&data),
            Err(DecodeError::StructuralMismatch {
                field: "length",
                offset: 3,
                expected: 27,
                got: 26,
            })
        );
    }

    #[test]
    fn test_decode_rejects_wrong_ad_type() {
        let mut data = vendor_bytes();
        data[4] = 0x16;
        assert!(matches!(
            decode(&data),
            Err(DecodeError::StructuralMismatch {
                field: "ad type",
                offset: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_decode_rejects_big_endian_manufacturer_id() {
        let mut data = vendor_bytes();
        data[5] = 0x04;
        data[6] = 0x99;
        assert_eq!(
            decode(&data),
            Err(DecodeError::StructuralMismatch {
                field: "manufacturer id",
                offset: 5,
                expected: 0x0499,
                got: 0x9904,
            })
        );
    }

    #[test]
    fn test_decode_rejects_unsupported_format() {
        let mut data = vendor_bytes();
        data[7] = 0x06;
        assert_eq!(decode(&data), Err(DecodeError::UnsupportedFormat(6)));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut data = vendor_bytes();
        data.push(0x00);
        assert_eq!(
            decode(&data),
            Err(DecodeError::StructuralMismatch {
                field: "payload length",
                offset: 7,
                expected: 24,
                got: 25,
            })
        );
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        let data = vendor_bytes();
        assert!(matches!(
            decode(&data[..30]),
            Err(DecodeError::StructuralMismatch {
                field: "payload length",
                got: 23,
                ..
            })
        ));
    }

    #[test]
    fn test_decode_truncated_header() {
        let data = vendor_bytes();
        assert_eq!(
            decode(&data[..6]),
            Err(DecodeError::TruncatedInput {
                field: "manufacturer id",
                offset: 5,
                needed: 2,
                available: 1,
            })
        );
        assert!(matches!(
            decode(&[]),
            Err(DecodeError::TruncatedInput { field: "flags", .. })
        ));
    }

    #[test]
    fn test_decode_every_prefix_fails_without_panicking() {
        let data = vendor_bytes();
        for end in 0..data.len() {
            assert!(decode(&data[..end]).is_err(), "prefix of {end} bytes");
        }
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            vendor_sample(),
            Format5Sample::default(),
            Format5Sample {
                temperature: i16::MIN,
                humidity: u16::MAX,
                pressure: u16::MAX,
                acceleration_x: i16::MIN,
                acceleration_y: i16::MAX,
                acceleration_z: -1,
                power: PowerWord(u16::MAX),
                movement_counter: u8::MAX,
                measurement_sequence: u16::MAX,
                mac: MacAddress([0xFF; 6]),
            },
        ];
        for sample in samples {
            let adv = BleAdvertisement::new(TEST_FLAGS, sample);
            assert_eq!(decode(&adv.to_bytes()), Ok(adv.clone()));
            assert_eq!(decode_hex(&adv.to_hex()), Ok(adv));
        }
    }

    #[test]
    fn test_encode_matches_vendor_vector() {
        let adv = BleAdvertisement::new([0x02, 0x01, 0x06], vendor_sample());
        assert_eq!(adv.to_hex(), VENDOR_HEX);
    }

    #[test]
    fn test_power_word_layout() {
        let power = PowerWord::from_parts(1377, 22);
        assert_eq!(power, PowerWord(0xAC36));
        assert_eq!(PowerWord::from_parts(0x7FF, 0x1F), PowerWord(0xFFFF));
        assert_eq!(PowerWord::from_parts(0, 1), PowerWord(0x0001));
        assert_eq!(PowerWord::from_parts(1, 0), PowerWord(0x0020));
    }

    #[test]
    fn test_hex_to_bytes() {
        assert_eq!(hex_to_bytes("00ff7A").unwrap(), vec![0x00, 0xFF, 0x7A]);
        assert_eq!(hex_to_bytes("  0a0B\n").unwrap(), vec![0x0A, 0x0B]);
        assert!(hex_to_bytes("").unwrap().is_empty());
        assert!(matches!(hex_to_bytes("abc"), Err(DecodeError::InvalidHex(_))));
        assert!(matches!(hex_to_bytes("zz"), Err(DecodeError::InvalidHex(_))));
        assert!(matches!(hex_to_bytes("+1"), Err(DecodeError::InvalidHex(_))));
        assert!(matches!(hex_to_bytes("é0"), Err(DecodeError::InvalidHex(_))));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::StructuralMismatch {
            field: "length",
            offset: 3,
            expected: 27,
            got: 26,
        };
        assert_eq!(
            err.to_string(),
            "Structural mismatch: length at offset 3: expected 0x1b, got 0x1a"
        );
        assert_eq!(
            DecodeError::UnsupportedFormat(3).to_string(),
            "Unsupported format: RuuviTag data format 3 (only format 5 is supported)"
        );
    }
}
