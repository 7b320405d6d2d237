//! Sixteen-point wind direction table plus calm, shared by the archive codes,
//! the web-table labels and the vector angles used for interpolation.

/// One entry of the 17-symbol wind direction table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindDirectionEntry {
    /// Legacy archive code: 0 = calm, 1 = NNE ... 16 = N.
    pub code: u8,
    pub label: &'static str,
    pub abbreviation: &'static str,
    /// Vector angle counter-clockwise from east, pointing where the wind blows.
    pub degrees: f64,
}

/// Angle assigned to calm, outside the [0, 360) range of the compass points.
pub const CALM_DEGREES: f64 = 360.0;

pub const WIND_DIRECTION_TABLE: [WindDirectionEntry; 17] = [
    WindDirectionEntry { code: 0, label: "静穏", abbreviation: "CALM", degrees: 360.0 },
    WindDirectionEntry { code: 1, label: "北北東", abbreviation: "NNE", degrees: 247.5 },
    WindDirectionEntry { code: 2, label: "北東", abbreviation: "NE", degrees: 225.0 },
    WindDirectionEntry { code: 3, label: "東北東", abbreviation: "ENE", degrees: 202.5 },
    WindDirectionEntry { code: 4, label: "東", abbreviation: "E", degrees: 180.0 },
    WindDirectionEntry { code: 5, label: "東南東", abbreviation: "ESE", degrees: 157.5 },
    WindDirectionEntry { code: 6, label: "南東", abbreviation: "SE", degrees: 135.0 },
    WindDirectionEntry { code: 7, label: "南南東", abbreviation: "SSE", degrees: 112.5 },
    WindDirectionEntry { code: 8, label: "南", abbreviation: "S", degrees: 90.0 },
    WindDirectionEntry { code: 9, label: "南南西", abbreviation: "SSW", degrees: 67.5 },
    WindDirectionEntry { code: 10, label: "南西", abbreviation: "SW", degrees: 45.0 },
    WindDirectionEntry { code: 11, label: "西南西", abbreviation: "WSW", degrees: 22.5 },
    WindDirectionEntry { code: 12, label: "西", abbreviation: "W", degrees: 0.0 },
    WindDirectionEntry { code: 13, label: "西北西", abbreviation: "WNW", degrees: 337.5 },
    WindDirectionEntry { code: 14, label: "北西", abbreviation: "NW", degrees: 315.0 },
    WindDirectionEntry { code: 15, label: "北北西", abbreviation: "NNW", degrees: 292.5 },
    WindDirectionEntry { code: 16, label: "北", abbreviation: "N", degrees: 270.0 },
];

pub fn by_code(code: u8) -> Option<&'static WindDirectionEntry> {
    WIND_DIRECTION_TABLE.get(code as usize)
}

/// Look up a Japanese label ("北西") or an abbreviation ("NW", "Calm").
pub fn by_label(label: &str) -> Option<&'static WindDirectionEntry> {
    let label = label.trim();
    WIND_DIRECTION_TABLE.iter().find(|entry| {
        entry.label == label || entry.abbreviation.eq_ignore_ascii_case(label)
    })
}

pub fn by_degrees(degrees: f64) -> Option<&'static WindDirectionEntry> {
    WIND_DIRECTION_TABLE
        .iter()
        .find(|entry| (entry.degrees - degrees).abs() < 1e-9)
}

pub fn is_calm(degrees: f64) -> bool {
    (degrees - CALM_DEGREES).abs() < 1e-9
}
