//! Classification policy.
//!
//! The detector's label set is fixed and closed, so labels are a tagged enum
//! rather than strings, and the compliance mapping is a single exhaustive
//! table. There is no string-prefix dispatch anywhere: the table below is
//! the only source of truth for which classes count as violations.

use std::fmt;

/// Closed set of classes the PPE model can emit, in model output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PpeClass {
    Hardhat,
    Mask,
    NoHardhat,
    NoMask,
    NoSafetyVest,
    Person,
    SafetyCone,
    SafetyVest,
    Machinery,
    Vehicle,
}

/// Compliance category for a detected class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compliance {
    Compliant,
    NonCompliant,
    /// Labels outside the compliance-sensitive set (people, vehicles, ...).
    Neutral,
}

impl PpeClass {
    /// All classes, in model output order.
    pub const ALL: [PpeClass; 10] = [
        PpeClass::Hardhat,
        PpeClass::Mask,
        PpeClass::NoHardhat,
        PpeClass::NoMask,
        PpeClass::NoSafetyVest,
        PpeClass::Person,
        PpeClass::SafetyCone,
        PpeClass::SafetyVest,
        PpeClass::Machinery,
        PpeClass::Vehicle,
    ];

    /// Map a model class index to a class. `None` for indices outside the
    /// closed set (a malformed model output, not a neutral detection).
    pub fn from_index(index: usize) -> Option<PpeClass> {
        Self::ALL.get(index).copied()
    }

    /// The model's label string for this class.
    pub fn name(&self) -> &'static str {
        match self {
            PpeClass::Hardhat => "Hardhat",
            PpeClass::Mask => "Mask",
            PpeClass::NoHardhat => "NO-Hardhat",
            PpeClass::NoMask => "NO-Mask",
            PpeClass::NoSafetyVest => "NO-Safety Vest",
            PpeClass::Person => "Person",
            PpeClass::SafetyCone => "Safety Cone",
            PpeClass::SafetyVest => "Safety Vest",
            PpeClass::Machinery => "machinery",
            PpeClass::Vehicle => "vehicle",
        }
    }

    /// Exhaustive class-to-compliance table.
    pub fn compliance(&self) -> Compliance {
        match self {
            PpeClass::NoHardhat | PpeClass::NoMask | PpeClass::NoSafetyVest => {
                Compliance::NonCompliant
            }
            PpeClass::Hardhat | PpeClass::Mask | PpeClass::SafetyVest => Compliance::Compliant,
            PpeClass::Person
            | PpeClass::SafetyCone
            | PpeClass::Machinery
            | PpeClass::Vehicle => Compliance::Neutral,
        }
    }

    /// Display color for this class's annotations.
    pub fn color(&self) -> [u8; 3] {
        self.compliance().color()
    }
}

impl fmt::Display for PpeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Compliance {
    /// RGB annotation color: red for violations, green for worn PPE,
    /// blue for everything else.
    pub fn color(&self) -> [u8; 3] {
        match self {
            Compliance::NonCompliant => [255, 0, 0],
            Compliance::Compliant => [0, 255, 0],
            Compliance::Neutral => [0, 0, 255],
        }
    }
}

/// Format a confidence for display labels: ceiling at hundredths, shortest
/// decimal form. 0.8734 renders as "0.88" and 0.800 as "0.8".
pub fn format_confidence(confidence: f32) -> String {
    // Stay in f32: widening to f64 first exposes representation noise
    // (0.91f32 widens to 0.9100000262.., whose ceiling lands on 0.92).
    let rounded = (confidence * 100.0).ceil() / 100.0;
    format!("{}", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_maps_to_exactly_one_category() {
        let mut compliant = 0;
        let mut non_compliant = 0;
        let mut neutral = 0;
        for class in PpeClass::ALL {
            match class.compliance() {
                Compliance::Compliant => compliant += 1,
                Compliance::NonCompliant => non_compliant += 1,
                Compliance::Neutral => neutral += 1,
            }
        }
        assert_eq!(compliant, 3);
        assert_eq!(non_compliant, 3);
        assert_eq!(neutral, 4);
    }

    #[test]
    fn index_mapping_follows_model_order() {
        assert_eq!(PpeClass::from_index(0), Some(PpeClass::Hardhat));
        assert_eq!(PpeClass::from_index(4), Some(PpeClass::NoSafetyVest));
        assert_eq!(PpeClass::from_index(9), Some(PpeClass::Vehicle));
        assert_eq!(PpeClass::from_index(10), None);
    }

    #[test]
    fn violation_classes_are_red() {
        assert_eq!(PpeClass::NoHardhat.color(), [255, 0, 0]);
        assert_eq!(PpeClass::SafetyVest.color(), [0, 255, 0]);
        assert_eq!(PpeClass::Person.color(), [0, 0, 255]);
    }

    #[test]
    fn confidence_display_uses_ceiling_at_hundredths() {
        assert_eq!(format_confidence(0.8734), "0.88");
        assert_eq!(format_confidence(0.800), "0.8");
        assert_eq!(format_confidence(0.91), "0.91");
        assert_eq!(format_confidence(1.0), "1");
    }
}
