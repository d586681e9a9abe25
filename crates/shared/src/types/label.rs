//! Closed label types that are persisted as text.
//!
//! Single labels are stored as their display text so existing rows stay
//! readable. Sets of labels are stored as a versioned json document; older
//! rows written as a bare json array or a comma separated string still decode.

use std::{collections::BTreeSet, fmt, ops::Deref};

use rusqlite::{
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
    ToSql,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current version written into encoded label sets
pub const LABEL_SET_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabelError {
    #[error("Unknown {kind} label: {value:?}")]
    Unknown { kind: &'static str, value: String },
    #[error("Unsupported label set version {0}")]
    UnsupportedVersion(u32),
    #[error("Malformed label set {value:?}: {message}")]
    Malformed { value: String, message: String },
}

pub trait StoredLabel: Sized + Copy + Ord + 'static {
    /// Name of the label family used in error messages
    const KIND: &'static str;
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;

    /// Legacy spellings accepted when decoding
    fn aliases(&self) -> &'static [&'static str];

    fn decode(value: &str) -> Result<Self, LabelError> {
        let wanted = normalize(value);
        Self::ALL
            .iter()
            .copied()
            .find(|l| {
                normalize(l.label()) == wanted || l.aliases().iter().any(|a| normalize(a) == wanted)
            })
            .ok_or_else(|| LabelError::Unknown {
                kind: Self::KIND,
                value: value.to_owned(),
            })
    }
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! stored_label {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $label:literal $([$($alias:literal),* $(,)?])?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )*
        }

        impl StoredLabel for $name {
            const KIND: &'static str = $kind;
            const ALL: &'static [Self] = &[ $( Self::$variant, )* ];

            fn label(&self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )*
                }
            }

            fn aliases(&self) -> &'static [&'static str] {
                match self {
                    $( Self::$variant => &[ $($($alias,)*)? ], )*
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = LabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::decode(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::decode(&s).map_err(serde::de::Error::custom)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.label()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                Self::decode(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }

        impl From<$name> for sea_query::Value {
            fn from(value: $name) -> Self {
                value.label().into()
            }
        }

        impl sea_query::Nullable for $name {
            fn null() -> sea_query::Value {
                sea_query::Value::String(None)
            }
        }
    };
}

stored_label!(
    /// Muscle groups a workout or exercise can target
    pub enum MuscleGroup ("muscle group") {
        Chest => "Chest" ["Pecs"],
        Back => "Back" ["Lats"],
        Shoulders => "Shoulders" ["Delts"],
        Biceps => "Biceps",
        Triceps => "Triceps",
        Legs => "Legs" ["Quads"],
        Glutes => "Glutes",
        Core => "Core" ["Abs"],
    }
);

stored_label!(
    pub enum WorkoutCategory ("workout category") {
        Push => "Push",
        Pull => "Pull",
        Legs => "Legs" ["Leg Day"],
        UpperBody => "Upper Body" ["Upper"],
        LowerBody => "Lower Body" ["Lower"],
        FullBody => "Full Body" ["Full"],
        Cardio => "Cardio",
        Other => "Other" ["Custom"],
    }
);

stored_label!(
    /// The user's current body weight goal
    pub enum GoalType ("goal type") {
        Cutting => "Cutting" ["Cut", "Lose Weight"],
        Bulking => "Bulking" ["Bulk", "Gain Weight"],
        Maintenance => "Maintenance" ["Maintain"],
    }
);

stored_label!(
    pub enum UnitSystem ("unit system") {
        Metric => "Metric" ["kg"],
        Imperial => "Imperial" ["lb", "lbs"],
    }
);

impl WorkoutCategory {
    /// Muscle groups assigned to a new workout of this category
    pub fn default_muscle_groups(&self) -> LabelSet<MuscleGroup> {
        use MuscleGroup::*;
        let groups: &[MuscleGroup] = match self {
            WorkoutCategory::Push => &[Chest, Shoulders, Triceps],
            WorkoutCategory::Pull => &[Back, Biceps],
            WorkoutCategory::Legs => &[Legs, Glutes],
            WorkoutCategory::UpperBody => &[Chest, Back, Shoulders, Biceps, Triceps],
            WorkoutCategory::LowerBody => &[Legs, Glutes, Core],
            WorkoutCategory::FullBody => MuscleGroup::ALL,
            WorkoutCategory::Cardio | WorkoutCategory::Other => &[],
        };
        groups.iter().copied().collect()
    }
}

const KG_PER_LB: f64 = 0.453_592_37;

impl UnitSystem {
    pub fn from_kg(&self, kg: f64) -> f64 {
        match self {
            UnitSystem::Metric => kg,
            UnitSystem::Imperial => kg / KG_PER_LB,
        }
    }

    pub fn to_kg(&self, value: f64) -> f64 {
        match self {
            UnitSystem::Metric => value,
            UnitSystem::Imperial => value * KG_PER_LB,
        }
    }

    pub fn weight_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "kg",
            UnitSystem::Imperial => "lb",
        }
    }

    pub fn format_weight(&self, kg: f64) -> String {
        format!("{:.1} {}", self.from_kg(kg), self.weight_suffix())
    }
}

/// An unordered set of labels stored in a single text column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet<T: StoredLabel>(BTreeSet<T>);

#[derive(Serialize, Deserialize)]
struct EncodedLabelSet {
    v: u32,
    labels: Vec<String>,
}

impl<T: StoredLabel> Default for LabelSet<T> {
    fn default() -> Self {
        Self(BTreeSet::new())
    }
}

impl<T: StoredLabel> Deref for LabelSet<T> {
    type Target = BTreeSet<T>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: StoredLabel> FromIterator<T> for LabelSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: StoredLabel> LabelSet<T> {
    pub fn insert(&mut self, label: T) -> bool {
        self.0.insert(label)
    }

    pub fn remove(&mut self, label: &T) -> bool {
        self.0.remove(label)
    }

    pub fn encode(&self) -> String {
        let encoded = EncodedLabelSet {
            v: LABEL_SET_VERSION,
            labels: self.0.iter().map(|l| l.label().to_owned()).collect(),
        };
        // Serializing a struct of plain strings can't fail
        serde_json::to_string(&encoded).unwrap_or_default()
    }

    pub fn decode(value: &str) -> Result<Self, LabelError> {
        let trimmed = value.trim();
        let malformed = |e: serde_json::Error| LabelError::Malformed {
            value: value.to_owned(),
            message: e.to_string(),
        };

        let labels: Vec<String> = if trimmed.starts_with('{') {
            let encoded: EncodedLabelSet = serde_json::from_str(trimmed).map_err(malformed)?;
            if encoded.v != LABEL_SET_VERSION {
                return Err(LabelError::UnsupportedVersion(encoded.v));
            }
            encoded.labels
        } else if trimmed.starts_with('[') {
            serde_json::from_str(trimmed).map_err(malformed)?
        } else {
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        };

        labels.iter().map(|l| T::decode(l)).collect()
    }
}

impl<T: StoredLabel> ToSql for LabelSet<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.encode()))
    }
}

impl<T: StoredLabel> FromSql for LabelSet<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::decode(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl<T: StoredLabel> From<LabelSet<T>> for sea_query::Value {
    fn from(value: LabelSet<T>) -> Self {
        value.encode().into()
    }
}

pub type MuscleGroups = LabelSet<MuscleGroup>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_is_lenient_about_case_and_aliases() {
        assert_eq!(MuscleGroup::decode(" chest "), Ok(MuscleGroup::Chest));
        assert_eq!(MuscleGroup::decode("Abs"), Ok(MuscleGroup::Core));
        assert_eq!(WorkoutCategory::decode("full_body"), Ok(WorkoutCategory::FullBody));
        assert_eq!(GoalType::decode("Lose Weight"), Ok(GoalType::Cutting));
        assert!(matches!(
            GoalType::decode("Recomp"),
            Err(LabelError::Unknown { kind: "goal type", .. })
        ));
    }

    #[test]
    fn test_label_set_reads_legacy_encodings() {
        let expected: MuscleGroups = [MuscleGroup::Chest, MuscleGroup::Triceps].into_iter().collect();

        assert_eq!(MuscleGroups::decode(r#"["Triceps","Chest"]"#), Ok(expected.clone()));
        assert_eq!(MuscleGroups::decode("Chest, Triceps"), Ok(expected.clone()));
        assert_eq!(MuscleGroups::decode(&expected.encode()), Ok(expected));
        assert_eq!(MuscleGroups::decode(""), Ok(MuscleGroups::default()));
    }

    #[test]
    fn test_label_set_rejects_future_versions() {
        assert_eq!(
            MuscleGroups::decode(r#"{"v":2,"labels":["Chest"]}"#),
            Err(LabelError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn test_encoded_label_set_is_versioned() {
        let set: MuscleGroups = [MuscleGroup::Legs].into_iter().collect();
        assert_eq!(set.encode(), r#"{"v":1,"labels":["Legs"]}"#);
    }

    #[test]
    fn test_category_defaults() {
        assert!(WorkoutCategory::Push.default_muscle_groups().contains(&MuscleGroup::Chest));
        assert!(WorkoutCategory::Cardio.default_muscle_groups().is_empty());
        assert_eq!(
            WorkoutCategory::FullBody.default_muscle_groups().len(),
            MuscleGroup::ALL.len()
        );
    }

    #[test]
    fn test_imperial_conversion() {
        let lb = UnitSystem::Imperial.from_kg(100.0);
        assert!((lb - 220.462).abs() < 0.001);
        assert!((UnitSystem::Imperial.to_kg(lb) - 100.0).abs() < 1e-9);
        assert_eq!(UnitSystem::Metric.format_weight(80.04), "80.0 kg");
    }
}
