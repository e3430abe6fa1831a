//! Scheduling pipeline: build, solve, decode.

use tracing::{info, warn};

use crate::cp::{BranchAndBoundSolver, CpSolver, SolverConfig};
use crate::error::{ScheduleError, ScheduleResult};
use crate::formulation::{ModelBuilder, TherapyModel};
use crate::problem::{ProblemData, RawProblem};

use super::config::SchedulerConfig;
use super::decoder::decode;
use super::types::{ScheduleReport, ScheduleStatus};

/// Therapy scheduler.
///
/// Each call to [`solve`](Self::solve) builds a fresh model from the
/// problem, solves it once within the configured budget, and decodes the
/// answer. Nothing is kept between calls.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_therapy::problem::RawProblem;
/// use u_therapy::schedule::{SchedulerConfig, ScheduleStatus, TherapyScheduler};
///
/// let mut raw = RawProblem::open(1, 1, 1, 1, 4, 30).with_lunch(2, 2);
/// raw.requirements[0][0][0] = 60;
///
/// let scheduler = TherapyScheduler::new(
///     SchedulerConfig::default().with_time_limit(Duration::from_secs(5)),
/// );
/// let data = scheduler.load(raw).unwrap();
/// let report = scheduler.solve(&data).unwrap();
///
/// assert_eq!(report.status, ScheduleStatus::Optimal);
/// assert!(report.schedule.iter().all(|s| s.slot != 2));
/// assert!((60.0..=90.0).contains(&report.total_minutes));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TherapyScheduler {
    config: SchedulerConfig,
}

impl TherapyScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Validates a raw record under the configured lunch policy.
    pub fn load(&self, raw: RawProblem) -> ScheduleResult<ProblemData> {
        Ok(ProblemData::from_raw(raw, self.config.lunch_policy)?)
    }

    /// Parses and validates a JSON record under the configured lunch policy.
    pub fn load_json(&self, json: &str) -> ScheduleResult<ProblemData> {
        Ok(ProblemData::from_json(json, self.config.lunch_policy)?)
    }

    /// Builds the constraint model without solving it.
    pub fn build_model(&self, data: &ProblemData) -> ScheduleResult<TherapyModel> {
        self.config.validate().map_err(ScheduleError::Config)?;
        let built = ModelBuilder::new(data)
            .with_weights(self.config.required_weight, self.config.bonus_weight)
            .with_overtreatment_factor(self.config.overtreatment_factor)
            .build();
        built.model.validate()?;
        Ok(built)
    }

    /// Schedules `data` with the built-in [`BranchAndBoundSolver`].
    pub fn solve(&self, data: &ProblemData) -> ScheduleResult<ScheduleReport> {
        self.solve_with(data, &BranchAndBoundSolver::new())
    }

    /// Schedules `data` with any [`CpSolver`].
    pub fn solve_with<S: CpSolver + ?Sized>(
        &self,
        data: &ProblemData,
        solver: &S,
    ) -> ScheduleResult<ScheduleReport> {
        let built = self.build_model(data)?;

        let mut solver_config = SolverConfig::default()
            .with_time_limit(self.config.time_limit())
            .with_stop_after_first(self.config.stop_after_first);
        if let Some(nodes) = self.config.node_limit {
            solver_config = solver_config.with_node_limit(nodes);
        }

        info!(
            time_limit_secs = self.config.time_limit_secs,
            "starting optimization"
        );
        let solution = solver.solve(&built.model, &solver_config);
        let solve_time_seconds = solution.solve_time.as_secs_f64();

        let Some(status) = ScheduleStatus::from_solver(solution.status) else {
            return Err(ScheduleError::SolverRejected);
        };

        info!(
            %status,
            objective = ?solution.objective_value,
            nodes = solution.nodes,
            solve_time_seconds,
            "optimization finished"
        );

        if !status.is_schedule_found() {
            warn!(%status, "no schedule found");
            return Ok(ScheduleReport::without_schedule(status, solve_time_seconds));
        }

        let decoded = decode(data, &built.space, &solution.values, self.config.day_start)?;
        info!(
            sessions = decoded.sessions.len(),
            total_minutes = decoded.total_minutes,
            "schedule decoded"
        );

        Ok(ScheduleReport {
            status,
            total_minutes: decoded.total_minutes,
            average_minutes_per_patient: decoded.average_minutes_per_patient,
            solve_time_seconds,
            schedule: decoded.sessions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{CpModel, CpSolution, SolverStatus};
    use crate::problem::LunchPolicy;
    use crate::schedule::audit::audit;
    use std::time::Duration;

    fn config() -> SchedulerConfig {
        SchedulerConfig::default().with_time_limit(Duration::from_secs(10))
    }

    /// A solver that never answers.
    struct Silent(SolverStatus);

    impl CpSolver for Silent {
        fn solve(&self, _model: &CpModel, _config: &SolverConfig) -> CpSolution {
            CpSolution::empty(self.0)
        }
    }

    /// A solver that returns too few values.
    struct Truncating;

    impl CpSolver for Truncating {
        fn solve(&self, _model: &CpModel, _config: &SolverConfig) -> CpSolution {
            let mut solution = CpSolution::empty(SolverStatus::Feasible);
            solution.values = vec![false];
            solution
        }
    }

    fn two_patients() -> RawProblem {
        // two patients needing type 0, one therapist, six slots with lunch at 3
        let mut raw = RawProblem::open(2, 1, 1, 1, 6, 30).with_lunch(3, 3);
        raw.requirements[0][0][0] = 60;
        raw.requirements[0][1][0] = 30;
        raw
    }

    #[test]
    fn test_single_patient_with_lunch() {
        let mut raw = RawProblem::open(1, 1, 1, 1, 4, 30).with_lunch(2, 2);
        raw.requirements[0][0][0] = 60;
        let scheduler = TherapyScheduler::new(config());
        let data = scheduler.load(raw).unwrap();
        let report = scheduler.solve(&data).unwrap();

        assert_eq!(report.status, ScheduleStatus::Optimal);
        assert!(report.schedule.iter().all(|s| s.slot != 2));
        assert!(report.total_minutes >= 60.0 && report.total_minutes <= 90.0);
        assert!(report.schedule.iter().all(|s| s.minutes == 30.0));
        assert!(audit(&data, &report.schedule, 1.5).is_empty());
    }

    #[test]
    fn test_shared_therapist() {
        let scheduler = TherapyScheduler::new(config());
        let data = scheduler.load(two_patients()).unwrap();
        let report = scheduler.solve(&data).unwrap();

        assert_eq!(report.status, ScheduleStatus::Optimal);
        assert!(audit(&data, &report.schedule, 1.5).is_empty());
        // 5 working slots shared: caps are 90 and 45 min → 3 + 1 slots
        assert_eq!(report.schedule.len(), 4);
        assert_eq!(report.total_minutes, 120.0);
        assert_eq!(report.average_minutes_per_patient, Some(60.0));
    }

    #[test]
    fn test_efficiency_scales_minutes() {
        let mut raw = RawProblem::open(1, 1, 1, 1, 2, 30);
        raw.requirements[0][0][0] = 60;
        raw.efficiency[0] = 0.5;
        let scheduler = TherapyScheduler::new(config());
        let data = scheduler.load(raw).unwrap();
        let report = scheduler.solve(&data).unwrap();

        assert_eq!(report.schedule.len(), 2);
        assert_eq!(report.total_minutes, 30.0);
        assert_eq!(report.schedule[0].time, "08:00");
        assert_eq!(report.schedule[1].time, "08:30");
    }

    #[test]
    fn test_continuity_prefers_single_therapist() {
        // two therapists, each on duty for half the day
        let mut raw = RawProblem::open(1, 1, 2, 2, 4, 30);
        raw.requirements[0][0][0] = 120;
        raw.requirements[1][0][0] = 120;
        for d in 0..2 {
            raw.availability[0][d] = vec![1, 1, 0, 0];
            raw.availability[1][d] = vec![0, 0, 1, 1];
        }
        let scheduler = TherapyScheduler::new(config());
        let data = scheduler.load(raw).unwrap();
        let report = scheduler.solve(&data).unwrap();

        assert_eq!(report.status, ScheduleStatus::Optimal);
        let therapists: std::collections::BTreeSet<usize> =
            report.schedule.iter().map(|s| s.therapist).collect();
        assert_eq!(therapists.len(), 1);
        assert_eq!(report.schedule.len(), 4);
    }

    #[test]
    fn test_no_patients() {
        let scheduler = TherapyScheduler::new(config());
        let data = scheduler.load(RawProblem::open(0, 2, 2, 2, 4, 30)).unwrap();
        let report = scheduler.solve(&data).unwrap();
        assert_eq!(report.status, ScheduleStatus::Optimal);
        assert!(report.schedule.is_empty());
        assert_eq!(report.average_minutes_per_patient, None);
    }

    #[test]
    fn test_infeasible_and_timeout_are_statuses() {
        let scheduler = TherapyScheduler::new(config());
        let data = scheduler.load(two_patients()).unwrap();

        let report = scheduler
            .solve_with(&data, &Silent(SolverStatus::Infeasible))
            .unwrap();
        assert_eq!(report.status, ScheduleStatus::Infeasible);
        assert!(report.schedule.is_empty());

        let report = scheduler
            .solve_with(&data, &Silent(SolverStatus::Timeout))
            .unwrap();
        assert_eq!(report.status, ScheduleStatus::TimeoutNoSolution);
        assert!(!report.is_schedule_found());
    }

    #[test]
    fn test_solver_rejection_is_error() {
        let scheduler = TherapyScheduler::new(config());
        let data = scheduler.load(two_patients()).unwrap();
        let err = scheduler
            .solve_with(&data, &Silent(SolverStatus::ModelInvalid))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::SolverRejected));
    }

    #[test]
    fn test_truncated_assignment_is_error() {
        let scheduler = TherapyScheduler::new(config());
        let data = scheduler.load(two_patients()).unwrap();
        let err = scheduler.solve_with(&data, &Truncating).unwrap_err();
        assert!(matches!(err, ScheduleError::IncompleteAssignment { .. }));
    }

    #[test]
    fn test_stop_after_first_is_flagged() {
        let scheduler = TherapyScheduler::new(config().with_stop_after_first(true));
        let data = scheduler.load(two_patients()).unwrap();
        let report = scheduler.solve(&data).unwrap();
        assert_eq!(report.status, ScheduleStatus::Feasible);
        assert!(!report.is_optimal());
        assert!(audit(&data, &report.schedule, 1.5).is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let scheduler = TherapyScheduler::new(config().with_weights(-1.0, 1.0));
        let data = scheduler.load(two_patients()).unwrap();
        assert!(matches!(
            scheduler.solve(&data),
            Err(ScheduleError::Config(_))
        ));
    }

    #[test]
    fn test_strict_lunch_policy_on_load() {
        let scheduler = TherapyScheduler::new(config().with_lunch_policy(LunchPolicy::Strict));
        let raw = RawProblem::open(1, 1, 1, 1, 4, 30).with_lunch(3, 8);
        assert!(matches!(
            scheduler.load(raw),
            Err(ScheduleError::Problem(_))
        ));
    }

    #[test]
    fn test_load_json() {
        let json = serde_json::to_string(&two_patients()).unwrap();
        let scheduler = TherapyScheduler::default();
        let data = scheduler.load_json(&json).unwrap();
        assert_eq!(data.dims().patients, 2);
        assert!(scheduler.load_json("[]").is_err());
    }
}
