//! Fixed-order binary feature vectors

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::InputError;
use crate::indicator::{Indicator, FEATURE_COUNT};

/// One subject's answers: exactly fifteen codes, each 0 or 1, in
/// [`Indicator::ALL`] order.
///
/// Every constructor validates, so a `FeatureVector` in hand always satisfies
/// the invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<u8>")]
pub struct FeatureVector([u8; FEATURE_COUNT]);

impl FeatureVector {
    pub fn all_zero() -> Self {
        Self([0; FEATURE_COUNT])
    }

    pub fn all_one() -> Self {
        Self([1; FEATURE_COUNT])
    }

    /// Build from integer codes in training order.
    pub fn from_codes(codes: &[i64]) -> Result<Self, InputError> {
        if codes.len() != FEATURE_COUNT {
            return Err(InputError::WrongLength {
                expected: FEATURE_COUNT,
                found: codes.len(),
            });
        }
        let mut out = [0u8; FEATURE_COUNT];
        for (slot, (&code, indicator)) in out.iter_mut().zip(codes.iter().zip(Indicator::ALL)) {
            *slot = check_code(indicator, code)?;
        }
        Ok(Self(out))
    }

    /// Build from textual cells in training order (CSV rows, CLI lists).
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Result<Self, InputError> {
        if cells.len() != FEATURE_COUNT {
            return Err(InputError::WrongLength {
                expected: FEATURE_COUNT,
                found: cells.len(),
            });
        }
        let mut out = [0u8; FEATURE_COUNT];
        for (slot, (cell, indicator)) in out.iter_mut().zip(cells.iter().zip(Indicator::ALL)) {
            *slot = parse_code(indicator, cell.as_ref())?;
        }
        Ok(Self(out))
    }

    /// Build from `(key, raw value)` pairs, as submitted by the HTML form.
    ///
    /// Every indicator must appear exactly once; unknown keys are rejected.
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self, InputError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut slots: [Option<u8>; FEATURE_COUNT] = [None; FEATURE_COUNT];
        for (key, raw) in pairs {
            let key = key.as_ref();
            let indicator =
                Indicator::from_key(key).ok_or_else(|| InputError::UnknownField(key.to_string()))?;
            let slot = &mut slots[indicator.index()];
            if slot.is_some() {
                return Err(InputError::DuplicateField(key.to_string()));
            }
            *slot = Some(parse_code(indicator, raw.as_ref())?);
        }
        Self::from_slots(slots)
    }

    /// Build from a key → code map, as submitted in JSON.
    pub fn from_map(map: &BTreeMap<String, i64>) -> Result<Self, InputError> {
        let mut slots: [Option<u8>; FEATURE_COUNT] = [None; FEATURE_COUNT];
        for (key, &code) in map {
            let indicator =
                Indicator::from_key(key).ok_or_else(|| InputError::UnknownField(key.clone()))?;
            slots[indicator.index()] = Some(check_code(indicator, code)?);
        }
        Self::from_slots(slots)
    }

    fn from_slots(slots: [Option<u8>; FEATURE_COUNT]) -> Result<Self, InputError> {
        let mut out = [0u8; FEATURE_COUNT];
        for (indicator, (slot, value)) in Indicator::ALL.iter().zip(out.iter_mut().zip(slots)) {
            *slot = value.ok_or_else(|| InputError::MissingField(indicator.key().to_string()))?;
        }
        Ok(Self(out))
    }

    /// Vector whose bit `i` (least significant first) is the code of indicator `i`.
    ///
    /// Bits above the fifteenth are ignored.
    pub fn from_bits(bits: u16) -> Self {
        let mut out = [0u8; FEATURE_COUNT];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = ((bits >> i) & 1) as u8;
        }
        Self(out)
    }

    /// Every one of the 2^15 possible answer sets.
    pub fn enumerate_all() -> impl Iterator<Item = FeatureVector> {
        (0u16..(1 << FEATURE_COUNT)).map(Self::from_bits)
    }

    pub fn get(&self, indicator: Indicator) -> u8 {
        self.0[indicator.index()]
    }

    /// Copy with one answer replaced.
    pub fn with(mut self, indicator: Indicator, code: bool) -> Self {
        self.0[indicator.index()] = u8::from(code);
        self
    }

    pub fn codes(&self) -> [u8; FEATURE_COUNT] {
        self.0
    }

    /// Model input representation.
    pub fn as_f64(&self) -> [f64; FEATURE_COUNT] {
        self.0.map(f64::from)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Indicator, u8)> + '_ {
        Indicator::ALL.iter().copied().zip(self.0.iter().copied())
    }

    /// Answers keyed by indicator key.
    pub fn to_map(&self) -> BTreeMap<String, u8> {
        self.iter()
            .map(|(indicator, code)| (indicator.key().to_string(), code))
            .collect()
    }
}

fn check_code(indicator: Indicator, code: i64) -> Result<u8, InputError> {
    match code {
        0 => Ok(0),
        1 => Ok(1),
        value => Err(InputError::InvalidCode {
            feature: indicator,
            value,
        }),
    }
}

/// Parse one textual answer. Accepts integers and integral floats ("1.0").
pub fn parse_code(indicator: Indicator, raw: &str) -> Result<u8, InputError> {
    let trimmed = raw.trim();
    if let Ok(code) = trimmed.parse::<i64>() {
        return check_code(indicator, code);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => check_code(indicator, v as i64),
        _ => Err(InputError::Unparseable {
            feature: indicator,
            raw: raw.to_string(),
        }),
    }
}

impl TryFrom<Vec<i64>> for FeatureVector {
    type Error = InputError;

    fn try_from(codes: Vec<i64>) -> Result<Self, Self::Error> {
        Self::from_codes(&codes)
    }
}

impl From<FeatureVector> for Vec<u8> {
    fn from(v: FeatureVector) -> Self {
        v.0.to_vec()
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, code) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{code}")?;
        }
        Ok(())
    }
}
