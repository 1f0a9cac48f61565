use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::default_true;

/// Administrative level of a geo zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneLevel {
    Country,
    State,
    Ut,
    District,
    City,
}

/// Inclusive pincode interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PincodeRange {
    pub start: u32,
    pub end: u32,
}

impl PincodeRange {
    pub fn contains(&self, pincode: u32) -> bool {
        self.start <= pincode && pincode <= self.end
    }

    pub fn overlaps(&self, other: &PincodeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Geographic pricing zone, owned by the geo catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoZone {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub level: ZoneLevel,
    #[serde(default)]
    pub pincode_ranges: Vec<PincodeRange>,
    pub currency: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl GeoZone {
    pub fn contains_pincode(&self, pincode: u32) -> bool {
        self.pincode_ranges.iter().any(|r| r.contains(pincode))
    }

    /// First pair of ranges inside this zone that overlap, if any
    pub fn overlapping_ranges(&self) -> Option<(PincodeRange, PincodeRange)> {
        let mut sorted = self.pincode_ranges.clone();
        sorted.sort_by_key(|r| (r.start, r.end));
        sorted
            .windows(2)
            .find(|pair| pair[0].overlaps(&pair[1]))
            .map(|pair| (pair[0], pair[1]))
    }
}

/// Customer segment (retail, wholesale, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSegment {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(ranges: Vec<(u32, u32)>) -> GeoZone {
        GeoZone {
            id: Uuid::new_v4(),
            name: "Karnataka".to_string(),
            code: "KA".to_string(),
            level: ZoneLevel::State,
            pincode_ranges: ranges
                .into_iter()
                .map(|(start, end)| PincodeRange { start, end })
                .collect(),
            currency: "INR".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_contains_pincode() {
        let z = zone(vec![(560001, 560100), (570001, 570050)]);
        assert!(z.contains_pincode(560050));
        assert!(z.contains_pincode(570050));
        assert!(!z.contains_pincode(565000));
    }

    #[test]
    fn test_overlapping_ranges_detected() {
        let z = zone(vec![(570001, 570050), (560001, 560100), (560090, 560200)]);
        let (a, b) = z.overlapping_ranges().unwrap();
        assert_eq!(a.start, 560001);
        assert_eq!(b.start, 560090);

        let clean = zone(vec![(560001, 560100), (560101, 560200)]);
        assert!(clean.overlapping_ranges().is_none());
    }
}
