//! Fixed-point codecs for SMC payloads
//!
//! - `fpe2`: unsigned RPM, big-endian, 2 fractional bits
//! - `sp78`: signed temperature, big-endian, 8 fractional bits
//!
//! Temperatures are carried as decidegrees Celsius (`450` = 45.0°C).

/// Largest RPM representable in `fpe2` (`0xFFFF >> 2`)
pub const MAX_ENCODABLE_RPM: u16 = 0x3FFF;

/// Encode an RPM value to `fpe2` wire bytes
///
/// - RPM 0 → `[0x00, 0x00]`
/// - RPM 1000 → `[0x0F, 0xA0]` (4000)
/// - values above [`MAX_ENCODABLE_RPM`] saturate
#[inline]
pub fn encode_rpm(rpm: u16) -> [u8; 2] {
    let value = rpm.min(MAX_ENCODABLE_RPM) << 2;
    value.to_be_bytes()
}

/// Decode `fpe2` wire bytes to whole RPM, dropping the fractional bits
#[inline]
pub fn decode_rpm(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes) >> 2
}

/// Decode `sp78` wire bytes to decidegrees Celsius
///
/// Uses signed arithmetic so negative values truncate toward zero:
/// `-0.5°C` (`0xFF80`) decodes to `-5`, not `-6`.
#[inline]
pub fn decode_temperature(bytes: [u8; 2]) -> i16 {
    let raw = i16::from_be_bytes(bytes) as i32;
    ((raw * 10) / 256) as i16
}

/// Two-sided clamp
///
/// The lower bound is checked first, so an inverted range (`min > max`) yields
/// `min` for low values and `max` for high values instead of panicking.
#[inline]
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        return min;
    }
    if value > max {
        return max;
    }
    value
}

/// Format decidegrees for display, e.g. `"45.5°C"` or `"-2.5°C"`
pub fn format_decidegrees(value: i16) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = (value as i32).abs();
    format!("{}{}.{}°C", sign, abs / 10, abs % 10)
}
