//! BMI service - recording and reading measurement history

use crate::domain::result::{Error, Result};
use crate::domain::{BmiResult, Measurement, UnitSystem};
use crate::ports::BmiFilter;

use super::Session;

/// BMI result operations over an explicit session
pub struct BmiService {
    units: UnitSystem,
}

impl BmiService {
    pub fn new(units: UnitSystem) -> Self {
        Self { units }
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// Stage an already computed result
    pub fn record(&self, session: &mut Session, result: BmiResult) -> BmiResult {
        session.add(result.clone());
        result
    }

    /// Compute BMI and its classification in the configured units, then stage it
    pub fn record_measurement(
        &self,
        session: &mut Session,
        user_id: i64,
        age: i32,
        weight: i32,
        height: f64,
    ) -> Result<BmiResult> {
        let measurement = Measurement {
            age,
            weight,
            height,
            units: self.units,
        };
        let result = measurement.into_result(user_id)?;
        Ok(self.record(session, result))
    }

    /// A user's results, newest first
    pub fn history(&self, session: &Session, user_id: i64) -> Result<Vec<BmiResult>> {
        let mut results = session
            .repository()
            .find_bmi_results(&BmiFilter::UserId(user_id))?;
        results.sort_by(|a, b| b.result_date.cmp(&a.result_date).then(b.id.cmp(&a.id)));
        Ok(results)
    }

    pub fn latest(&self, session: &Session, user_id: i64) -> Result<Option<BmiResult>> {
        Ok(self.history(session, user_id)?.into_iter().next())
    }

    pub fn get(&self, session: &Session, id: i64) -> Result<BmiResult> {
        session
            .repository()
            .first_bmi_result(&BmiFilter::Id(id))?
            .ok_or_else(|| Error::not_found(format!("BMI result {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::User;
    use crate::ports::Repository;

    fn session_with_user() -> (Session, i64) {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let mut session = Session::new(Arc::new(repo));
        session.add(User::new("alice", "digest", "a@x.com", "Alice", "A"));
        let persisted = session.commit().unwrap();
        let user_id = persisted[0].as_user().unwrap().id.unwrap();
        (session, user_id)
    }

    #[test]
    fn test_record_measurement_computes_bmi() {
        let (mut session, user_id) = session_with_user();
        let service = BmiService::new(UnitSystem::Imperial);

        let staged = service.record_measurement(&mut session, user_id, 30, 150, 65.0).unwrap();
        assert_eq!(staged.bmi, 25.0);
        assert_eq!(staged.health_condition, "Overweight");

        session.commit().unwrap();
        let latest = service.latest(&session, user_id).unwrap().unwrap();
        assert_eq!(latest.bmi, 25.0);
        assert!(latest.result_date.is_some());
    }

    #[test]
    fn test_invalid_measurement_stages_nothing() {
        let (mut session, user_id) = session_with_user();
        let service = BmiService::new(UnitSystem::Metric);

        let err = service.record_measurement(&mut session, user_id, 30, 70, 0.0).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!session.has_pending());
    }

    #[test]
    fn test_history_newest_first() {
        let (mut session, user_id) = session_with_user();
        let service = BmiService::new(UnitSystem::Metric);

        for weight in [80, 78, 76] {
            service.record_measurement(&mut session, user_id, 40, weight, 180.0).unwrap();
            session.commit().unwrap();
        }

        let history = service.history(&session, user_id).unwrap();
        let weights: Vec<i32> = history.iter().map(|r| r.weight).collect();
        assert_eq!(weights, vec![76, 78, 80]);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (session, _) = session_with_user();
        let service = BmiService::new(UnitSystem::Metric);
        assert!(matches!(service.get(&session, 12345), Err(Error::NotFound(_))));
    }
}
