//! The matching-safe public profile projection.
//!
//! This is the record under `/public/{uid}`: the fields a stranger may
//! see, denormalized from the owner's private profile and preferences.
//! Records read back from the store may predate newer fields, so every
//! field carries an explicit default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Self-declared gender. `Other` is a valid profile value but cannot
/// anchor a room: new-room invites require a concrete gender.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

impl Gender {
    /// Whether this value can be locked onto a room.
    pub fn is_concrete(self) -> bool {
        matches!(self, Gender::Male | Gender::Female)
    }

    /// Room label used for default group names.
    pub fn room_label(self) -> &'static str {
        match self {
            Gender::Male => "Boys Room",
            Gender::Female => "Girls Room",
            Gender::Other => "Room",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Preferred roommate gender. `Any` disables the hard filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderPreference {
    #[default]
    Any,
    Male,
    Female,
}

/// The gender gate shared by scoring and invite validation: does a
/// stated preference admit a counterpart of the given gender?
pub fn gender_allows(preference: GenderPreference, gender: Gender) -> bool {
    match preference {
        GenderPreference::Any => true,
        GenderPreference::Male => gender == Gender::Male,
        GenderPreference::Female => gender == Gender::Female,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepSchedule {
    Early,
    #[default]
    Mid,
    Late,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyHabit {
    Solo,
    Group,
    #[default]
    Mixed,
}

fn default_ordinal() -> u8 {
    3
}

/// Public profile projection. Budget bounds are minor currency units;
/// ordinal preferences run 1–5.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub budget_min: i64,
    #[serde(default)]
    pub budget_max: i64,
    #[serde(default = "default_ordinal")]
    pub cleanliness: u8,
    #[serde(default = "default_ordinal")]
    pub noise_tolerance: u8,
    #[serde(default)]
    pub sleep_schedule: SleepSchedule,
    #[serde(default)]
    pub smoker: bool,
    #[serde(default)]
    pub drinker: bool,
    #[serde(default = "default_ordinal")]
    pub guests_tolerance: u8,
    #[serde(default)]
    pub study_habits: StudyHabit,
    #[serde(default)]
    pub roommate_gender_preference: GenderPreference,
    #[serde(default)]
    pub updated_at: i64,
}

impl Default for PublicProfile {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            gender: Gender::default(),
            languages: Vec::new(),
            budget_min: 0,
            budget_max: 0,
            cleanliness: default_ordinal(),
            noise_tolerance: default_ordinal(),
            sleep_schedule: SleepSchedule::default(),
            smoker: false,
            drinker: false,
            guests_tolerance: default_ordinal(),
            study_habits: StudyHabit::default(),
            roommate_gender_preference: GenderPreference::default(),
            updated_at: 0,
        }
    }
}

/// Rejected profile write.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidProfile {
    #[error("budget range is inverted: min {min} exceeds max {max}")]
    BudgetRange { min: i64, max: i64 },

    #[error("{field} must be between 1 and 5, got {value}")]
    OrdinalRange { field: &'static str, value: u8 },
}

impl PublicProfile {
    /// Validate the record before it is written to the store.
    pub fn validate(&self) -> Result<(), InvalidProfile> {
        if self.budget_min > self.budget_max {
            return Err(InvalidProfile::BudgetRange {
                min: self.budget_min,
                max: self.budget_max,
            });
        }
        for (field, value) in [
            ("cleanliness", self.cleanliness),
            ("noise_tolerance", self.noise_tolerance),
            ("guests_tolerance", self.guests_tolerance),
        ] {
            if !(1..=5).contains(&value) {
                return Err(InvalidProfile::OrdinalRange { field, value });
            }
        }
        Ok(())
    }
}
