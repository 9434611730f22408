//! Characteristic payload layouts.
//!
//! Heart rate follows the Heart Rate Measurement layout: a flags byte whose
//! bit 0 selects a `u8` or little-endian `u16` value. Oxygen is a flags byte
//! followed by SpO2 as a little-endian IEEE-11073 SFLOAT. Decoded values
//! outside their physiological range are rejected, never clamped.

use thiserror::Error;

pub const HEART_RATE_MIN_BPM: u16 = 1;
pub const HEART_RATE_MAX_BPM: u16 = 300;
pub const OXYGEN_MIN_PERCENT: f64 = 0.0;
pub const OXYGEN_MAX_PERCENT: f64 = 100.0;

const HR_FLAG_VALUE_U16: u8 = 0x01;

const SFLOAT_NAN: u16 = 0x07FF;
const SFLOAT_NRES: u16 = 0x0800;
const SFLOAT_POS_INF: u16 = 0x07FE;
const SFLOAT_NEG_INF: u16 = 0x0802;
const SFLOAT_RESERVED: u16 = 0x0801;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("{field} payload truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{field} value {value} out of range")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("{field} value is not a number")]
    NotANumber { field: &'static str },
}

pub fn decode_heart_rate(payload: &[u8]) -> Result<u16, DecodeError> {
    let Some(&flags) = payload.first() else {
        return Err(DecodeError::Truncated {
            field: "heart_rate",
            expected: 2,
            actual: 0,
        });
    };

    let bpm = if flags & HR_FLAG_VALUE_U16 != 0 {
        match payload.get(1..3) {
            Some(bytes) => u16::from_le_bytes([bytes[0], bytes[1]]),
            None => {
                return Err(DecodeError::Truncated {
                    field: "heart_rate",
                    expected: 3,
                    actual: payload.len(),
                })
            }
        }
    } else {
        match payload.get(1) {
            Some(&value) => u16::from(value),
            None => {
                return Err(DecodeError::Truncated {
                    field: "heart_rate",
                    expected: 2,
                    actual: payload.len(),
                })
            }
        }
    };

    if !(HEART_RATE_MIN_BPM..=HEART_RATE_MAX_BPM).contains(&bpm) {
        return Err(DecodeError::OutOfRange {
            field: "heart_rate",
            value: f64::from(bpm),
        });
    }

    Ok(bpm)
}

pub fn encode_heart_rate(bpm: u16) -> Vec<u8> {
    match u8::try_from(bpm) {
        Ok(small) => vec![0x00, small],
        Err(_) => {
            let [lo, hi] = bpm.to_le_bytes();
            vec![HR_FLAG_VALUE_U16, lo, hi]
        }
    }
}

pub fn decode_oxygen(payload: &[u8]) -> Result<f64, DecodeError> {
    let Some(bytes) = payload.get(1..3) else {
        return Err(DecodeError::Truncated {
            field: "oxygen",
            expected: 3,
            actual: payload.len(),
        });
    };

    let raw = u16::from_le_bytes([bytes[0], bytes[1]]);
    let value = decode_sfloat(raw).ok_or(DecodeError::NotANumber { field: "oxygen" })?;

    if !(OXYGEN_MIN_PERCENT..=OXYGEN_MAX_PERCENT).contains(&value) {
        return Err(DecodeError::OutOfRange {
            field: "oxygen",
            value,
        });
    }

    Ok(value)
}

/// Encodes with one decimal place (exponent -1). `None` outside the range
/// [`decode_oxygen`] accepts.
pub fn encode_oxygen(percent: f64) -> Option<Vec<u8>> {
    if !(OXYGEN_MIN_PERCENT..=OXYGEN_MAX_PERCENT).contains(&percent) {
        return None;
    }
    let mantissa = (percent * 10.0).round() as i16;
    let raw = (0xF_u16 << 12) | (mantissa as u16 & 0x0FFF);
    let [lo, hi] = raw.to_le_bytes();
    Some(vec![0x00, lo, hi])
}

fn decode_sfloat(raw: u16) -> Option<f64> {
    if matches!(
        raw,
        SFLOAT_NAN | SFLOAT_NRES | SFLOAT_POS_INF | SFLOAT_NEG_INF | SFLOAT_RESERVED
    ) {
        return None;
    }

    let mut mantissa = i32::from(raw & 0x0FFF);
    if mantissa >= 0x0800 {
        mantissa -= 0x1000;
    }
    let mut exponent = i32::from(raw >> 12);
    if exponent >= 0x8 {
        exponent -= 0x10;
    }

    let mantissa = f64::from(mantissa);
    Some(if exponent >= 0 {
        mantissa * 10_f64.powi(exponent)
    } else {
        mantissa / 10_f64.powi(-exponent)
    })
}
