//! Merged records and the per-tick merge

use std::collections::BTreeMap;
use std::fmt;

/// Field keys a position fix is written under
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const ALTITUDE: &str = "altitude";
pub const HEADING: &str = "heading";

/// Position snapshot; every field may be missing independently
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionFix {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
}

impl PositionFix {
    fn fields(&self) -> [(&'static str, Option<f64>); 4] {
        [
            (LATITUDE, self.latitude),
            (LONGITUDE, self.longitude),
            (ALTITUDE, self.altitude),
            (HEADING, self.heading),
        ]
    }
}

/// Flat field-name to value mapping for one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<&'static str, f64>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, key: &'static str, value: f64) {
        self.fields.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.fields.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in key order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(&'static str, f64)> for Record {
    fn from_iter<I: IntoIterator<Item = (&'static str, f64)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        f.write_str("}")
    }
}

/// Combine one tick's OBD readings with the position fix, if any.
///
/// Present fix fields overwrite same-named keys; absent ones are left out
/// rather than written as NaN. An empty result is returned as-is.
pub fn merge(readings: Record, fix: Option<PositionFix>) -> Record {
    let mut merged = readings;
    if let Some(fix) = fix {
        for (key, value) in fix.fields() {
            if let Some(value) = value {
                merged.insert(key, value);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn obd(pairs: &[(&'static str, f64)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_readings_only() {
        let readings = obd(&[("rpm", 1500.0), ("speed", 40.0)]);
        let merged = merge(readings.clone(), None);
        assert_eq!(merged, readings);
        assert_eq!(merged.to_string(), "{rpm: 1500, speed: 40}");
    }

    #[test]
    fn test_fix_without_altitude_omits_it() {
        let fix = PositionFix {
            latitude: Some(37.0),
            longitude: Some(-122.0),
            altitude: None,
            heading: Some(90.0),
        };
        let merged = merge(Record::new(), Some(fix));
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(LATITUDE), Some(37.0));
        assert_eq!(merged.get(LONGITUDE), Some(-122.0));
        assert_eq!(merged.get(HEADING), Some(90.0));
        assert!(!merged.contains(ALTITUDE));
    }

    #[test]
    fn test_empty_stays_empty() {
        assert!(merge(Record::new(), None).is_empty());
        assert!(merge(Record::new(), Some(PositionFix::default())).is_empty());
    }

    #[test]
    fn test_fix_overwrites_reserved_key() {
        let readings = obd(&[("latitude", 1.0), ("rpm", 800.0)]);
        let fix = PositionFix {
            latitude: Some(48.1),
            ..Default::default()
        };
        let merged = merge(readings, Some(fix));
        assert_eq!(merged.get(LATITUDE), Some(48.1));
        assert_eq!(merged.get("rpm"), Some(800.0));
    }

    fn readings_strategy() -> impl Strategy<Value = Record> {
        (
            proptest::option::of(0.0..16_000.0f64),
            proptest::option::of(0.0..655.0f64),
            proptest::option::of(0.0..255.0f64),
        )
            .prop_map(|(rpm, maf, speed)| {
                [("rpm", rpm), ("maf", maf), ("speed", speed)]
                    .into_iter()
                    .filter_map(|(k, v)| v.map(|v| (k, v)))
                    .collect()
            })
    }

    fn fix_strategy() -> impl Strategy<Value = PositionFix> {
        (
            proptest::option::of(-90.0..90.0f64),
            proptest::option::of(-180.0..180.0f64),
            proptest::option::of(-400.0..9000.0f64),
            proptest::option::of(0.0..360.0f64),
        )
            .prop_map(|(latitude, longitude, altitude, heading)| PositionFix {
                latitude,
                longitude,
                altitude,
                heading,
            })
    }

    proptest! {
        #[test]
        fn prop_no_fix_is_identity(readings in readings_strategy()) {
            prop_assert_eq!(merge(readings.clone(), None), readings);
        }

        #[test]
        fn prop_fix_never_drops_obd_keys(
            readings in readings_strategy(),
            fix in fix_strategy(),
        ) {
            let merged = merge(readings.clone(), Some(fix));
            for (key, value) in readings.iter() {
                prop_assert_eq!(merged.get(key), Some(value));
            }
            let present = fix.fields().iter().filter(|(_, v)| v.is_some()).count();
            prop_assert_eq!(merged.len(), readings.len() + present);
        }
    }
}
