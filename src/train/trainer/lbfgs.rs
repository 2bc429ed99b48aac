use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::super::context::TrainingContext;
use super::{IterationRecord, TrainingReport};
use crate::error::{Error, Result};

/// Line search algorithm for L-BFGS optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineSearchAlgorithm {
    /// More-Thuente line search
    #[default]
    MoreThuente,
    /// Backtracking with Armijo condition
    BacktrackingArmijo,
    /// Backtracking with Wolfe condition
    BacktrackingWolfe,
    /// Backtracking with strong Wolfe condition
    BacktrackingStrongWolfe,
}

impl LineSearchAlgorithm {
    fn to_liblbfgs_str(self) -> &'static str {
        match self {
            Self::MoreThuente => "MoreThuente",
            Self::BacktrackingArmijo => "BacktrackingArmijo",
            Self::BacktrackingWolfe => "BacktrackingWolfe",
            Self::BacktrackingStrongWolfe => "BacktrackingStrongWolfe",
        }
    }
}

impl FromStr for LineSearchAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MoreThuente" => Ok(Self::MoreThuente),
            "Backtracking" | "BacktrackingArmijo" => Ok(Self::BacktrackingArmijo),
            "BacktrackingWolfe" => Ok(Self::BacktrackingWolfe),
            "BacktrackingStrongWolfe" => Ok(Self::BacktrackingStrongWolfe),
            _ => Err(Error::invalid_parameter(format!(
                "unknown line search algorithm {:?}",
                s
            ))),
        }
    }
}

impl fmt::Display for LineSearchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_liblbfgs_str())
    }
}

/// L-BFGS training parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LbfgsParams {
    lambda: f64,
    max_iterations: usize,
    epsilon: f64,
    period: usize,
    delta: f64,
    linesearch: LineSearchAlgorithm,
    max_linesearch: usize,
}

impl Default for LbfgsParams {
    fn default() -> Self {
        Self {
            lambda: 0.2,
            max_iterations: 1000,
            epsilon: 1e-5,
            period: 10,
            delta: 1e-5,
            linesearch: LineSearchAlgorithm::default(),
            max_linesearch: 20,
        }
    }
}

impl LbfgsParams {
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Set the L2 regularization strength
    pub fn set_lambda(&mut self, lambda: f64) -> Result<()> {
        if !(lambda >= 0.0) || !lambda.is_finite() {
            return Err(Error::invalid_parameter("lambda must be non-negative"));
        }
        self.lambda = lambda;
        Ok(())
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        if max_iterations < 1 {
            return Err(Error::invalid_parameter("max_iterations must be at least 1"));
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        if !(epsilon >= 0.0) {
            return Err(Error::invalid_parameter("epsilon must be non-negative"));
        }
        self.epsilon = epsilon;
        Ok(())
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Set the period for delta-based convergence test.
    ///
    /// Setting period to 0 disables the delta-based convergence test
    /// (only gradient-based epsilon test is used).
    pub fn set_period(&mut self, period: usize) {
        self.period = period;
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn set_delta(&mut self, delta: f64) -> Result<()> {
        if !(delta >= 0.0) {
            return Err(Error::invalid_parameter("delta must be non-negative"));
        }
        self.delta = delta;
        Ok(())
    }

    pub fn linesearch(&self) -> LineSearchAlgorithm {
        self.linesearch
    }

    pub fn set_linesearch(&mut self, linesearch: LineSearchAlgorithm) {
        self.linesearch = linesearch;
    }

    pub fn max_linesearch(&self) -> usize {
        self.max_linesearch
    }

    pub fn set_max_linesearch(&mut self, max_linesearch: usize) -> Result<()> {
        if max_linesearch == 0 {
            return Err(Error::invalid_parameter("max_linesearch must be positive"));
        }
        self.max_linesearch = max_linesearch;
        Ok(())
    }

    /// Set a parameter by name
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "lambda" | "c2" => self.set_lambda(parse(name, value)?),
            "max_iterations" => self.set_max_iterations(parse(name, value)?),
            "epsilon" => self.set_epsilon(parse(name, value)?),
            "period" => {
                self.set_period(parse(name, value)?);
                Ok(())
            }
            "delta" => self.set_delta(parse(name, value)?),
            "linesearch" => {
                self.set_linesearch(value.parse()?);
                Ok(())
            }
            "max_linesearch" => self.set_max_linesearch(parse(name, value)?),
            _ => Err(Error::invalid_parameter(format!("unknown parameter: {}", name))),
        }
    }

    /// Get a parameter by name
    pub fn get(&self, name: &str) -> Result<String> {
        let value = match name {
            "lambda" | "c2" => self.lambda.to_string(),
            "max_iterations" => self.max_iterations.to_string(),
            "epsilon" => self.epsilon.to_string(),
            "period" => self.period.to_string(),
            "delta" => self.delta.to_string(),
            "linesearch" => self.linesearch.to_string(),
            "max_linesearch" => self.max_linesearch.to_string(),
            _ => return Err(Error::invalid_parameter(format!("unknown parameter: {}", name))),
        };
        Ok(value)
    }

    /// Re-check values that bypassed the setters (e.g. deserialized ones)
    pub fn validate(&self) -> Result<()> {
        let mut checked = Self::default();
        checked.set_lambda(self.lambda)?;
        checked.set_max_iterations(self.max_iterations)?;
        checked.set_epsilon(self.epsilon)?;
        checked.set_delta(self.delta)?;
        checked.set_max_linesearch(self.max_linesearch)?;
        Ok(())
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_parameter(format!("invalid value for {}: {:?}", name, value)))
}

/// Minimize the regularized negative log-likelihood over `context`,
/// starting from and updating `weights`.
pub(super) fn minimize(
    context: &TrainingContext,
    params: &LbfgsParams,
    weights: &mut [f64],
) -> Result<TrainingReport> {
    let lambda = params.lambda();
    let mut report = TrainingReport::default();
    // Numeric failures inside the callback surface here, not as optimizer errors
    let mut failure: Option<Error> = None;
    let mut evaluations = 0usize;

    let evaluate = |x: &[f64], gx: &mut [f64]| -> Result<f64, anyhow::Error> {
        evaluations += 1;
        match context.evaluate_into(x, lambda, gx) {
            Ok(fx) => Ok(fx),
            Err(e) => {
                let message = e.to_string();
                failure = Some(e);
                Err(anyhow::anyhow!(message))
            }
        }
    };

    let progress = |prgr: &liblbfgs::Progress| -> bool {
        log::debug!(
            "Iteration {}: loss = {:.6}, ||x|| = {:.6}, ||g|| = {:.6}",
            prgr.niter,
            prgr.fx,
            prgr.xnorm,
            prgr.gnorm
        );
        report.iterations.push(IterationRecord {
            iteration: prgr.niter,
            objective: prgr.fx,
            gradient_norm: prgr.gnorm,
            weight_norm: prgr.xnorm,
        });
        false // continue optimization
    };

    let result = liblbfgs::lbfgs()
        .with_max_iterations(params.max_iterations())
        .with_epsilon(params.epsilon())
        .with_fx_delta(params.delta(), params.period())
        .with_max_linesearch(params.max_linesearch())
        .with_linesearch_algorithm(params.linesearch().to_liblbfgs_str())
        .minimize(weights, evaluate, progress);

    if let Some(e) = failure {
        return Err(e);
    }
    report.evaluations = evaluations;
    match result {
        Ok(outcome) => report.objective = outcome.fx,
        Err(e) => {
            check_stop(e, &report.iterations)?;
            // `weights` holds the last accepted point
            let (objective, _) = context.objective_and_gradient(weights, lambda)?;
            report.objective = objective;
        }
    }
    report.converged = stopping_test_met(&report.iterations, params);
    log::info!(
        "L-BFGS finished after {} iterations ({} evaluations), loss = {:.6}",
        report.iterations.len(),
        report.evaluations,
        report.objective
    );
    Ok(report)
}

/// An optimizer stop before any accepted step is an error; a later one keeps
/// the last accepted point.
fn check_stop(stop: anyhow::Error, iterations: &[IterationRecord]) -> Result<()> {
    if iterations.is_empty() {
        return Err(Error::Optimizer(format!("{:#}", stop)));
    }
    log::warn!(
        "L-BFGS stopped early after {} iterations: {:#}",
        iterations.len(),
        stop
    );
    Ok(())
}

/// Whether the last accepted iterate satisfies the gradient test
/// `||g|| / max(1, ||x||) <= epsilon` or, with a non-zero period, the
/// objective-delta test `(f[k - period] - f[k]) / |f[k]| < delta`.
fn stopping_test_met(iterations: &[IterationRecord], params: &LbfgsParams) -> bool {
    let Some(last) = iterations.last() else {
        return false;
    };
    if last.gradient_norm / last.weight_norm.max(1.0) <= params.epsilon() {
        return true;
    }
    let period = params.period();
    if period == 0 || iterations.len() <= period {
        return false;
    }
    let past = iterations[iterations.len() - 1 - period].objective;
    let rate = (past - last.objective) / last.objective.abs().max(f64::MIN_POSITIVE);
    rate < params.delta()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(iteration: usize, objective: f64, gradient_norm: f64) -> IterationRecord {
        IterationRecord {
            iteration,
            objective,
            gradient_norm,
            weight_norm: 2.0,
        }
    }

    #[test]
    fn test_gradient_stopping_test() {
        let params = LbfgsParams::default();
        assert!(!stopping_test_met(&[], &params));
        // ||g|| / ||x|| = 1e-5 / 2
        assert!(stopping_test_met(&[record(1, 10.0, 1e-5)], &params));
        assert!(!stopping_test_met(&[record(1, 10.0, 1e-3)], &params));
        let mut small_x = record(1, 10.0, 5e-5);
        small_x.weight_norm = 0.1;
        assert!(!stopping_test_met(&[small_x], &params));
    }

    #[test]
    fn test_delta_stopping_test() {
        let mut params = LbfgsParams::default();
        params.set("period", "2").unwrap();
        params.set("delta", "1e-3").unwrap();
        let flat = [
            record(1, 10.0, 1.0),
            record(2, 9.99999, 1.0),
            record(3, 9.99998, 1.0),
        ];
        assert!(stopping_test_met(&flat, &params));
        // not enough history for the period yet
        assert!(!stopping_test_met(&flat[..2], &params));
        let falling = [
            record(1, 10.0, 1.0),
            record(2, 8.0, 1.0),
            record(3, 6.0, 1.0),
        ];
        assert!(!stopping_test_met(&falling, &params));
        params.set("period", "0").unwrap();
        assert!(!stopping_test_met(&flat, &params));
    }

    #[test]
    fn test_iteration_limit_is_not_convergence() {
        let mut params = LbfgsParams::default();
        params.set("max_iterations", "3").unwrap();
        params.set("period", "0").unwrap();
        let history = [
            record(1, 10.0, 4.0),
            record(2, 8.0, 2.0),
            record(3, 6.0, 1.0),
        ];
        assert!(!stopping_test_met(&history, &params));
    }

    #[test]
    fn test_stop_without_accepted_step_is_an_error() {
        let stop = anyhow::anyhow!("line search failed");
        match check_stop(stop, &[]) {
            Err(Error::Optimizer(message)) => assert!(message.contains("line search failed")),
            other => panic!("expected an optimizer error, got {:?}", other),
        }
        let stop = anyhow::anyhow!("line search failed");
        assert!(check_stop(stop, &[record(1, 10.0, 1.0)]).is_ok());
    }

    #[test]
    fn test_defaults() {
        let params = LbfgsParams::default();
        assert_eq!(params.lambda(), 0.2);
        assert_eq!(params.max_iterations(), 1000);
        assert_eq!(params.linesearch(), LineSearchAlgorithm::MoreThuente);
    }

    #[test]
    fn test_set_and_get_by_name() {
        let mut params = LbfgsParams::default();
        params.set("lambda", "0.5").unwrap();
        params.set("linesearch", "BacktrackingWolfe").unwrap();
        params.set("period", "0").unwrap();
        assert_eq!(params.get("lambda").unwrap(), "0.5");
        assert_eq!(params.get("linesearch").unwrap(), "BacktrackingWolfe");
        assert_eq!(params.period(), 0);
        assert!(params.set("lambda", "abc").is_err());
        assert!(params.set("lambda", "-1").is_err());
        assert!(params.set("unknown", "1").is_err());
        assert!(params.get("unknown").is_err());
    }

    #[test]
    fn test_validate_catches_deserialized_values() {
        let params: LbfgsParams = serde_json::from_str(r#"{"lambda": -0.5}"#).unwrap();
        assert!(params.validate().is_err());
        let params: LbfgsParams = serde_json::from_str(r#"{"max_iterations": 50}"#).unwrap();
        assert!(params.validate().is_ok());
        assert_eq!(params.max_iterations(), 50);
        assert_eq!(params.lambda(), 0.2);
    }
}
