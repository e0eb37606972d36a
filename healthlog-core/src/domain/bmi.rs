//! BMI result domain model

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Pounds-per-square-inch to kilograms-per-square-metre factor
const IMPERIAL_FACTOR: f64 = 703.0;

/// A single recorded measurement belonging to one user
///
/// `result_date` is `None` until insert, where it is stamped with the
/// current time of that insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiResult {
    pub id: Option<i64>,
    pub user_id: i64,
    pub age: i32,
    pub weight: i32,
    pub height: f64,
    pub bmi: f64,
    pub health_condition: String,
    pub result_date: Option<NaiveDateTime>,
}

impl BmiResult {
    pub fn new(
        user_id: i64,
        age: i32,
        weight: i32,
        height: f64,
        bmi: f64,
        health_condition: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            user_id,
            age,
            weight,
            height,
            bmi,
            health_condition: health_condition.into(),
            result_date: None,
        }
    }
}

/// Units for weight and height
///
/// Metric takes kilograms and centimetres, imperial takes pounds and inches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    Metric,
    #[default]
    Imperial,
}

impl FromStr for UnitSystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            other => Err(Error::validation(format!("Unknown unit system: {}", other))),
        }
    }
}

/// Standard adult BMI categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthCondition {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl HealthCondition {
    pub fn classify(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal weight",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

impl fmt::Display for HealthCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inputs for a BMI computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub age: i32,
    pub weight: i32,
    pub height: f64,
    pub units: UnitSystem,
}

impl Measurement {
    /// Body mass index rounded to one decimal place
    pub fn bmi(&self) -> Result<f64> {
        if self.weight <= 0 {
            return Err(Error::validation("Weight must be positive"));
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err(Error::validation("Height must be positive"));
        }
        if self.age < 0 {
            return Err(Error::validation("Age cannot be negative"));
        }

        let weight = f64::from(self.weight);
        let raw = match self.units {
            UnitSystem::Metric => {
                let meters = self.height / 100.0;
                weight / (meters * meters)
            }
            UnitSystem::Imperial => IMPERIAL_FACTOR * weight / (self.height * self.height),
        };

        Ok((raw * 10.0).round() / 10.0)
    }

    /// Build an uncommitted result for `user_id`
    pub fn into_result(self, user_id: i64) -> Result<BmiResult> {
        let bmi = self.bmi()?;
        let condition = HealthCondition::classify(bmi);
        Ok(BmiResult::new(
            user_id,
            self.age,
            self.weight,
            self.height,
            bmi,
            condition.as_str(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imperial_bmi() {
        // 150 lb at 65 in
        let m = Measurement { age: 30, weight: 150, height: 65.0, units: UnitSystem::Imperial };
        assert_eq!(m.bmi().unwrap(), 25.0);
    }

    #[test]
    fn test_metric_bmi() {
        // 70 kg at 175 cm
        let m = Measurement { age: 30, weight: 70, height: 175.0, units: UnitSystem::Metric };
        assert_eq!(m.bmi().unwrap(), 22.9);
    }

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(HealthCondition::classify(18.4), HealthCondition::Underweight);
        assert_eq!(HealthCondition::classify(18.5), HealthCondition::Normal);
        assert_eq!(HealthCondition::classify(24.9), HealthCondition::Normal);
        assert_eq!(HealthCondition::classify(25.0), HealthCondition::Overweight);
        assert_eq!(HealthCondition::classify(29.9), HealthCondition::Overweight);
        assert_eq!(HealthCondition::classify(30.0), HealthCondition::Obese);
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        let zero_height = Measurement { age: 30, weight: 70, height: 0.0, units: UnitSystem::Metric };
        assert!(matches!(zero_height.bmi(), Err(Error::Validation(_))));

        let zero_weight = Measurement { age: 30, weight: 0, height: 170.0, units: UnitSystem::Metric };
        assert!(matches!(zero_weight.bmi(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_into_result() {
        let m = Measurement { age: 41, weight: 95, height: 170.0, units: UnitSystem::Metric };
        let result = m.into_result(3).unwrap();
        assert_eq!(result.user_id, 3);
        assert_eq!(result.bmi, 32.9);
        assert_eq!(result.health_condition, "Obese");
        assert!(result.id.is_none());
        assert!(result.result_date.is_none());
    }

    #[test]
    fn test_unit_system_parse() {
        assert_eq!("Metric".parse::<UnitSystem>().unwrap(), UnitSystem::Metric);
        assert_eq!("imperial".parse::<UnitSystem>().unwrap(), UnitSystem::Imperial);
        assert!("stone".parse::<UnitSystem>().is_err());
    }
}
