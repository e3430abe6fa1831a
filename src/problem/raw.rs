//! Serialized input record, as produced by external data loaders.

use serde::{Deserialize, Serialize};

/// Unvalidated scheduling input.
///
/// Field names follow the JSON data files the scheduler consumes. Convert
/// with [`ProblemData::from_raw`](super::ProblemData::from_raw) before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProblem {
    pub num_patients: usize,
    pub num_therapist_types: usize,
    pub num_therapists: usize,
    pub num_days: usize,
    pub slots_per_day: usize,
    /// Minutes per slot.
    pub slot_length: u32,
    /// First lunch slot (inclusive).
    pub lunch_start: i64,
    /// Last lunch slot (inclusive).
    pub lunch_end: i64,
    /// Required minutes, `[day][patient][type]`.
    #[serde(rename = "R")]
    pub requirements: Vec<Vec<Vec<u32>>>,
    /// Patient needs type at all, `[patient][type]`.
    #[serde(rename = "A")]
    pub eligibility: Vec<Vec<u8>>,
    /// Therapist may deliver type, `[therapist][type]`.
    #[serde(rename = "therapist_type", alias = "Capable")]
    pub capability: Vec<Vec<u8>>,
    /// Therapist on duty, `[therapist][day][slot]`.
    #[serde(rename = "C")]
    pub availability: Vec<Vec<Vec<u8>>>,
    /// Minutes multiplier, `[therapist]`.
    #[serde(rename = "E", alias = "efficiency")]
    pub efficiency: Vec<f64>,
}

impl RawProblem {
    /// An instance where every patient needs every type, every therapist
    /// delivers every type and is always on duty at efficiency 1.0, no
    /// minutes are required yet, and there is no lunch break.
    ///
    /// Convenient as a starting point for programmatic construction.
    pub fn open(
        num_patients: usize,
        num_therapist_types: usize,
        num_therapists: usize,
        num_days: usize,
        slots_per_day: usize,
        slot_length: u32,
    ) -> Self {
        Self {
            num_patients,
            num_therapist_types,
            num_therapists,
            num_days,
            slots_per_day,
            slot_length,
            lunch_start: -1,
            lunch_end: -1,
            requirements: vec![vec![vec![0; num_therapist_types]; num_patients]; num_days],
            eligibility: vec![vec![1; num_therapist_types]; num_patients],
            capability: vec![vec![1; num_therapist_types]; num_therapists],
            availability: vec![vec![vec![1; slots_per_day]; num_days]; num_therapists],
            efficiency: vec![1.0; num_therapists],
        }
    }

    /// Sets the inclusive lunch window.
    pub fn with_lunch(mut self, start: i64, end: i64) -> Self {
        self.lunch_start = start;
        self.lunch_end = end;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_shapes() {
        let raw = RawProblem::open(2, 3, 4, 5, 6, 30);
        assert_eq!(raw.requirements.len(), 5);
        assert_eq!(raw.requirements[0].len(), 2);
        assert_eq!(raw.requirements[0][0].len(), 3);
        assert_eq!(raw.eligibility.len(), 2);
        assert_eq!(raw.capability.len(), 4);
        assert_eq!(raw.availability[3][4].len(), 6);
        assert_eq!(raw.efficiency, vec![1.0; 4]);
    }

    #[test]
    fn test_json_field_names() {
        let json = r#"{
            "num_patients": 1, "num_therapist_types": 1, "num_therapists": 1,
            "num_days": 1, "slots_per_day": 2, "slot_length": 30,
            "lunch_start": 1, "lunch_end": 1,
            "R": [[[60]]], "A": [[1]], "Capable": [[1]],
            "C": [[[1, 0]]], "efficiency": [0.5]
        }"#;
        let raw: RawProblem = serde_json::from_str(json).unwrap();
        assert_eq!(raw.requirements, vec![vec![vec![60]]]);
        assert_eq!(raw.capability, vec![vec![1]]);
        assert_eq!(raw.availability, vec![vec![vec![1, 0]]]);
        assert_eq!(raw.efficiency, vec![0.5]);

        let back = serde_json::to_value(&raw).unwrap();
        assert!(back.get("therapist_type").is_some());
        assert!(back.get("E").is_some());
    }
}
