//! Component categories and value normalization
//!
//! Stored values are free text ("100n", "4.7µ", "10k"). For display they are
//! rescaled into a canonical unit chosen by the component's category so that
//! a parts table can show, and sort on, comparable magnitudes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Component category. Unknown names are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
#[allow(clippy::upper_case_acronyms)]
pub enum Category {
    Resistor,
    Capacitor,
    Inductor,
    IC,
    Transistor,
    Diode,
    LED,
    Connector,
    Switch,
    CrystalOscillator,
    Other(String),
}

impl Category {
    /// Sentinel used by search filters to mean "any category".
    pub const ALL_FILTER: &'static str = "All";

    pub const KNOWN: [Category; 10] = [
        Category::Resistor,
        Category::Capacitor,
        Category::Inductor,
        Category::IC,
        Category::Transistor,
        Category::Diode,
        Category::LED,
        Category::Connector,
        Category::Switch,
        Category::CrystalOscillator,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Resistor => "Resistor",
            Category::Capacitor => "Capacitor",
            Category::Inductor => "Inductor",
            Category::IC => "IC",
            Category::Transistor => "Transistor",
            Category::Diode => "Diode",
            Category::LED => "LED",
            Category::Connector => "Connector",
            Category::Switch => "Switch",
            Category::CrystalOscillator => "Crystal/Oscillator",
            Category::Other(name) => name,
        }
    }

    /// Units offered when composing a value for this category.
    pub fn unit_choices(&self) -> &'static [&'static str] {
        match self {
            Category::Resistor => &["Ω", "kΩ", "MΩ", "GΩ"],
            Category::Capacitor => &["pF", "nF", "µF", "mF", "F"],
            Category::Inductor => &["nH", "µH", "mH", "H"],
            Category::CrystalOscillator => &["Hz", "kHz", "MHz", "GHz"],
            _ => &[],
        }
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        Category::KNOWN
            .iter()
            .find(|c| c.as_str() == name)
            .cloned()
            .unwrap_or_else(|| Category::Other(name.to_string()))
    }
}

impl From<String> for Category {
    fn from(name: String) -> Self {
        Category::from(name.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::from(s))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A display-ready magnitude and unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedValue {
    pub magnitude: f64,
    pub unit: &'static str,
}

impl NormalizedValue {
    pub const UNPARSED: NormalizedValue = NormalizedValue {
        magnitude: 0.0,
        unit: "",
    };

    pub fn new(raw: &str, category: &str) -> Self {
        let (magnitude, unit) = normalize_value(raw, category);
        Self { magnitude, unit }
    }

    /// `(0.0, "")` is the normalizer's "could not parse" marker, not a reading.
    pub fn is_normalized(&self) -> bool {
        *self != Self::UNPARSED
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "{} {}", self.magnitude, self.unit)
        }
    }
}

fn si_multiplier(prefix: char) -> Option<f64> {
    match prefix {
        'p' => Some(1e-12),
        'n' => Some(1e-9),
        'u' | 'µ' | 'μ' => Some(1e-6),
        'm' => Some(1e-3),
        'k' => Some(1e3),
        'M' => Some(1e6),
        _ => None,
    }
}

/// Round to 3 decimals from the exact binary value; halves that are not
/// exactly representable go to the nearer side.
fn round3(value: f64) -> f64 {
    format!("{:.3}", value).parse().unwrap_or(value)
}

/// Normalize a raw value string into `(magnitude, canonical unit)`.
///
/// Digits and `.` are collected into the numeric part and every other
/// character into the suffix, in a single pass. Only the first suffix
/// character is consulted as an SI prefix. Returns `(0.0, "")` when the
/// numeric part does not parse.
pub fn normalize_value(raw: &str, category: &str) -> (f64, &'static str) {
    if raw.is_empty() {
        return (0.0, "");
    }

    let mut numeric = String::new();
    let mut suffix = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            numeric.push(ch);
        } else {
            suffix.push(ch);
        }
    }

    let mut value = match numeric.parse::<f64>() {
        Ok(v) => v,
        Err(_) => return (0.0, ""),
    };

    if let Some(multiplier) = suffix.chars().next().and_then(si_multiplier) {
        value *= multiplier;
    }

    let (value, unit) = match Category::from(category) {
        Category::Resistor => {
            if value >= 1e6 {
                (value / 1e6, "MΩ")
            } else if value >= 1e3 {
                (value / 1e3, "kΩ")
            } else {
                (value, "Ω")
            }
        }
        Category::Capacitor => {
            if value >= 1e-6 {
                (value * 1e6, "µF")
            } else if value >= 1e-9 {
                (value * 1e9, "nF")
            } else {
                (value * 1e12, "pF")
            }
        }
        Category::Inductor => {
            if value >= 1e-3 {
                (value * 1e3, "mH")
            } else if value >= 1e-6 {
                (value * 1e6, "µH")
            } else {
                (value * 1e9, "nH")
            }
        }
        _ => (value, ""),
    };

    (round3(value), unit)
}
