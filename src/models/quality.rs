//! Remark (RMK) codes of the surface-observation archive and what each code
//! implies for the value it annotates.
//!
//! The same numeric code means different things for different field families:
//! code 2 on sunshine or solar radiation is a night-time zero, while on cloud
//! cover or precipitation it marks an hour on which no observation was
//! scheduled. The policy is
//! therefore looked up per (family, code) in [`policy`] and never inferred at
//! call sites.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ProcessingError, Result};
use crate::models::field::{Field, FieldFamily};

/// Ordinal remark-code domain. `Interpolated` is not an archive code; it marks
/// values manufactured by the resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCode {
    NotCreated,
    Missing,
    NotObserved,
    BelowTrueExtreme,
    AboveTrueExtreme,
    Estimated,
    NoPhenomenon,
    PreviousDayExtreme,
    Normal,
    NextDayExtreme,
    Interpolated,
}

/// What a code does to the literal value stored next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// Value is absent whatever the archive stored.
    Null,
    /// Value is a physical zero whatever the archive stored.
    Zero,
    /// The stored value stands.
    Literal,
}

pub struct QualityCodeInfo {
    pub code: QualityCode,
    pub value: u8,
    pub description: &'static str,
}

/// Archive remark codes 0-9.
pub const QUALITY_CODE_TABLE: [QualityCodeInfo; 10] = [
    QualityCodeInfo {
        code: QualityCode::NotCreated,
        value: 0,
        description: "observation value not created",
    },
    QualityCodeInfo {
        code: QualityCode::Missing,
        value: 1,
        description: "missing",
    },
    QualityCodeInfo {
        code: QualityCode::NotObserved,
        value: 2,
        description: "not observed",
    },
    QualityCodeInfo {
        code: QualityCode::BelowTrueExtreme,
        value: 3,
        description: "daily extreme at or below the true value, or estimated absence of phenomenon",
    },
    QualityCodeInfo {
        code: QualityCode::AboveTrueExtreme,
        value: 4,
        description: "daily extreme at or above the true value, or absence taken from regional data",
    },
    QualityCodeInfo {
        code: QualityCode::Estimated,
        value: 5,
        description: "contains estimated values, or 24-hour mean with missing hours",
    },
    QualityCodeInfo {
        code: QualityCode::NoPhenomenon,
        value: 6,
        description: "no phenomenon (precipitation, sunshine, snowfall, snow depth, minimum sea-level pressure)",
    },
    QualityCodeInfo {
        code: QualityCode::PreviousDayExtreme,
        value: 7,
        description: "daily extreme occurred on the previous day",
    },
    QualityCodeInfo {
        code: QualityCode::Normal,
        value: 8,
        description: "normal observation",
    },
    QualityCodeInfo {
        code: QualityCode::NextDayExtreme,
        value: 9,
        description: "daily extreme occurred on the next day, or automatic value from the type-80 station equipment (to 1990)",
    },
];

/// Numeric form of [`QualityCode::Interpolated`]: NOT_OBSERVED offset by ten.
pub const INTERPOLATED_CODE: u8 = 12;

use NullPolicy::{Literal, Null, Zero};

// Indexed by QualityCode::index().
const CONTINUOUS_POLICY: [NullPolicy; 11] = [
    Null, Null, Null, Literal, Literal, Literal, Literal, Literal, Literal, Literal, Literal,
];
const ACCUMULATIVE_POLICY: [NullPolicy; 11] = [
    Null, Null, Null, Literal, Literal, Literal, Zero, Literal, Literal, Literal, Literal,
];
const RADIATIVE_POLICY: [NullPolicy; 11] = [
    Null, Null, Zero, Literal, Literal, Literal, Zero, Literal, Literal, Literal, Literal,
];
const DISCRETE_POLICY: [NullPolicy; 11] = [
    Null, Null, Null, Literal, Literal, Literal, Literal, Literal, Literal, Literal, Literal,
];

impl QualityCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0..=9 => Some(QUALITY_CODE_TABLE[value as usize].code),
            INTERPOLATED_CODE => Some(QualityCode::Interpolated),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            QualityCode::Interpolated => INTERPOLATED_CODE,
            other => other.index() as u8,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    pub fn description(&self) -> &'static str {
        match self {
            QualityCode::Interpolated => "interpolated by the resampler",
            other => QUALITY_CODE_TABLE[other.index()].description,
        }
    }

    /// Codes a null value may carry in terminal output.
    pub fn is_absence(&self) -> bool {
        matches!(self, QualityCode::NotCreated | QualityCode::Missing)
    }

    /// Null values with these codes may be filled by the resampler.
    pub fn is_fillable(&self) -> bool {
        matches!(
            self,
            QualityCode::NotCreated | QualityCode::Missing | QualityCode::NotObserved
        )
    }
}

impl fmt::Display for QualityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Policy for a code on a field family.
pub fn policy(family: FieldFamily, code: QualityCode) -> NullPolicy {
    let table = match family {
        FieldFamily::Continuous => &CONTINUOUS_POLICY,
        FieldFamily::Accumulative => &ACCUMULATIVE_POLICY,
        FieldFamily::Radiative => &RADIATIVE_POLICY,
        FieldFamily::Discrete => &DISCRETE_POLICY,
    };
    table[code.index()]
}

/// Parse a one-digit archive remark token for `field`.
pub fn classify(field: Field, raw_token: &str) -> Result<QualityCode> {
    let token = raw_token.trim();
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_digit() => {
            let value = c as u8 - b'0';
            QualityCode::from_u8(value).ok_or_else(|| decode_error(field, raw_token))
        }
        _ => Err(decode_error(field, raw_token)),
    }
}

fn decode_error(field: Field, raw_token: &str) -> ProcessingError {
    ProcessingError::Decode {
        field,
        token: raw_token.to_string(),
        line: None,
    }
}

/// Value implied by `code` regardless of what was stored, if any.
pub fn implied_value_when_null(family: FieldFamily, code: QualityCode) -> Option<f64> {
    match policy(family, code) {
        Zero => Some(0.0),
        Null | Literal => None,
    }
}

/// Apply the family policy of `field` to a decoded literal value.
pub fn resolve(field: Field, code: QualityCode, literal: Option<f64>) -> Option<f64> {
    match policy(field.family(), code) {
        Null => None,
        Zero => Some(0.0),
        Literal => literal,
    }
}
