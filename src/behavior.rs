//! Patient behavior model
//!
//! Composes a glucose offset from four independent factors: the patient's
//! medical condition, their medication, how hard they exercise and what they
//! eat. Exercise intensity and diet type are picked once per patient from
//! their age; every call to [`UserBehavior::glucose_reading_effect`] redraws
//! all four factor values.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::models::UserId;
use crate::reference::ReferenceIndex;
use crate::sampling::uniform;

/// Effect range (mg/dL) for a medical condition; `(0, 0)` when unknown.
pub fn condition_range(condition: Option<&str>) -> (f64, f64) {
    match condition.unwrap_or_default() {
        "Type 1 Diabetes" => (-15.0, 25.0),
        "Type 2 Diabetes" => (-10.0, 15.0),
        "Gestational Diabetes" => (-10.0, 20.0),
        "Prediabetes" => (-10.0, 10.0),
        "Insulin Resistance" => (-5.0, 15.0),
        "Hypoglycemia" => (-10.0, 0.0),
        "Hyperglycemia" => (10.0, 30.0),
        "Metabolic Syndrome" => (-10.0, 20.0),
        "Polycystic Ovary Syndrome" => (-5.0, 15.0),
        "Cystic Fibrosis-Related Diabetes" => (-15.0, 25.0),
        "Chronic Pancreatitis" => (-10.0, 20.0),
        "Monogenic Diabetes" => (-10.0, 20.0),
        _ => (0.0, 0.0),
    }
}

/// Effect range (mg/dL) for a medication; `(0, 0)` when unknown.
pub fn medication_range(medication: Option<&str>) -> (f64, f64) {
    match medication.unwrap_or_default() {
        "Insulin Glargine" => (-10.0, -5.0),
        "Metformin" => (-16.0, -10.0),
        "Insulin Lispro" => (-15.0, -5.0),
        "Glipizide" => (-12.0, -6.0),
        "Glyburide" => (-15.0, -10.0),
        "Dapagliflozin" | "Empagliflozin" | "Liraglutide" | "Exenatide" | "Sitagliptin" => {
            (-15.0, -5.0)
        }
        _ => (0.0, 0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseIntensity {
    High,
    Medium,
    Low,
    None,
}

impl ExerciseIntensity {
    /// Young adults lean towards harder workouts, older adults towards none.
    pub fn for_age<R: Rng + ?Sized>(age: u32, rng: &mut R) -> Self {
        use ExerciseIntensity::*;
        let choices: &[Self] = match age {
            18..=35 => &[High, Medium, Low],
            36..=60 => &[Medium, Low, None],
            _ => &[Low, None],
        };
        *choices.choose(rng).unwrap_or(&Low)
    }

    /// Offset range, already signed (exercise lowers glucose).
    pub fn effect_range(self) -> (f64, f64) {
        match self {
            ExerciseIntensity::High => (-15.0, -5.0),
            ExerciseIntensity::Medium => (-10.0, -3.0),
            ExerciseIntensity::Low | ExerciseIntensity::None => (0.0, 0.0),
        }
    }
}

impl fmt::Display for ExerciseIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExerciseIntensity::High => "high",
            ExerciseIntensity::Medium => "medium",
            ExerciseIntensity::Low => "low",
            ExerciseIntensity::None => "none",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DietType {
    HighCarb,
    Balanced,
    LowCarb,
}

impl DietType {
    /// Patients over 40 never pick a high-carb diet.
    pub fn for_age<R: Rng + ?Sized>(age: u32, rng: &mut R) -> Self {
        use DietType::*;
        let choices: &[Self] = if age < 40 {
            &[HighCarb, Balanced, LowCarb]
        } else {
            &[Balanced, LowCarb]
        };
        *choices.choose(rng).unwrap_or(&Balanced)
    }

    pub fn effect_range(self) -> (f64, f64) {
        match self {
            DietType::HighCarb => (10.0, 30.0),
            DietType::Balanced => (5.0, 15.0),
            DietType::LowCarb => (0.0, 10.0),
        }
    }
}

impl fmt::Display for DietType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DietType::HighCarb => "high_carb",
            DietType::Balanced => "balanced",
            DietType::LowCarb => "low_carb",
        };
        f.write_str(name)
    }
}

/// Lifestyle profile of one patient, fixed for the whole run
#[derive(Debug, Clone, PartialEq)]
pub struct UserBehavior {
    pub user_id: UserId,
    pub age: u32,
    pub condition: Option<String>,
    pub medication: Option<String>,
    pub exercise_intensity: ExerciseIntensity,
    pub diet_type: DietType,
}

impl UserBehavior {
    /// Derive exercise intensity and diet from age; condition and medication come from reference data.
    pub fn new<R: Rng + ?Sized>(
        user_id: UserId,
        age: u32,
        condition: Option<String>,
        medication: Option<String>,
        rng: &mut R,
    ) -> Self {
        let exercise_intensity = ExerciseIntensity::for_age(age, rng);
        let diet_type = DietType::for_age(age, rng);

        Self {
            user_id,
            age,
            condition,
            medication,
            exercise_intensity,
            diet_type,
        }
    }

    pub fn condition_effect<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let (low, high) = condition_range(self.condition.as_deref());
        uniform(rng, low, high)
    }

    pub fn medication_effect<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let (low, high) = medication_range(self.medication.as_deref());
        uniform(rng, low, high)
    }

    pub fn exercise_effect<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let (low, high) = self.exercise_intensity.effect_range();
        uniform(rng, low, high)
    }

    pub fn diet_effect<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let (low, high) = self.diet_type.effect_range();
        uniform(rng, low, high)
    }

    /// Sum of all four factors, freshly drawn.
    pub fn glucose_reading_effect<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.condition_effect(rng)
            + self.medication_effect(rng)
            + self.exercise_effect(rng)
            + self.diet_effect(rng)
    }

    /// Bounds any value of [`Self::glucose_reading_effect`] falls within.
    pub fn effect_bounds(&self) -> (f64, f64) {
        [
            condition_range(self.condition.as_deref()),
            medication_range(self.medication.as_deref()),
            self.exercise_intensity.effect_range(),
            self.diet_type.effect_range(),
        ]
        .iter()
        .fold((0.0, 0.0), |(lo, hi), (l, h)| (lo + l, hi + h))
    }
}

/// Build one behavior profile per user in snapshot order.
pub fn create_user_behaviors<R: Rng + ?Sized>(
    reference: &ReferenceIndex,
    rng: &mut R,
) -> HashMap<UserId, UserBehavior> {
    reference
        .users()
        .iter()
        .map(|user| {
            let behavior = UserBehavior::new(
                user.user_id,
                user.age,
                reference.condition(user.user_id).map(str::to_owned),
                reference.medication(user.user_id).map(str::to_owned),
                rng,
            );
            debug!(
                user_id = user.user_id,
                age = user.age,
                exercise = %behavior.exercise_intensity,
                diet = %behavior.diet_type,
                "Derived user behavior"
            );
            (user.user_id, behavior)
        })
        .collect()
}
