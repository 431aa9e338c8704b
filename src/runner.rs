use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::client::{ChainClient, TxOutcome};
use crate::driver::{duration_ms, Driver, StepReport};
use crate::error::{Error, ErrorKind};
use crate::registry::ContractRegistry;
use crate::scenario::{Scenario, ScenarioPlan, Step};

/// Final state of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failed,
    TimedOut,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    /// First error the scenario hit, or why it was skipped
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Driver operations in the order they ran
    pub steps: Vec<StepReport>,
}

impl ScenarioReport {
    fn skipped(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: Outcome::Skipped,
            duration_ms: 0,
            error: Some(reason.to_string()),
            error_kind: None,
            steps: Vec::new(),
        }
    }
}

/// Scenario counts of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub skipped: usize,
    /// Percentage of executed scenarios that succeeded
    pub pass_rate: f64,
}

impl RunSummary {
    fn from_reports(reports: &[ScenarioReport]) -> Self {
        let count = |outcome: Outcome| reports.iter().filter(|r| r.outcome == outcome).count();
        let succeeded = count(Outcome::Success);
        let failed = count(Outcome::Failed);
        let timed_out = count(Outcome::TimedOut);
        let skipped = count(Outcome::Skipped);

        let executed = succeeded + failed + timed_out;
        let pass_rate = if executed > 0 {
            (succeeded as f64 / executed as f64) * 100.0
        } else {
            0.0
        };

        Self {
            total: reports.len(),
            succeeded,
            failed,
            timed_out,
            skipped,
            pass_rate,
        }
    }
}

/// Result of running a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub scenarios: Vec<ScenarioReport>,
    pub summary: RunSummary,
    /// Code ids and addresses the run produced
    pub registry: ContractRegistry,
}

impl RunReport {
    /// True when no executed scenario failed or timed out
    pub fn is_success(&self) -> bool {
        self.summary.failed == 0 && self.summary.timed_out == 0
    }

    /// Kind of the first failure, if any
    pub fn first_error_kind(&self) -> Option<ErrorKind> {
        self.scenarios
            .iter()
            .filter(|s| matches!(s.outcome, Outcome::Failed | Outcome::TimedOut))
            .find_map(|s| s.error_kind)
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Write the report as pretty JSON
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}

/// Runs scenario plans in declaration order on one driver
pub struct ScenarioRunner<C> {
    driver: Driver<C>,
}

impl<C: ChainClient> ScenarioRunner<C> {
    pub fn new(driver: Driver<C>) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &Driver<C> {
        &self.driver
    }

    pub fn into_driver(self) -> Driver<C> {
        self.driver
    }

    /// Run every enabled scenario of `plan`.
    ///
    /// Failures are recorded against their scenario. Unless
    /// `continue_on_failure` is set, the first failure halts the run and every
    /// later scenario is reported `Skipped`.
    pub async fn run(&mut self, plan: &ScenarioPlan) -> RunReport {
        let started_at = chrono::Utc::now().to_rfc3339();
        let continue_on_failure = self.driver.config().continue_on_failure;
        info!("Starting run of {} scenarios", plan.scenarios.len());

        for (role, address) in &plan.contracts {
            self.driver.adopt(role, address.clone());
        }

        let mut reports = Vec::with_capacity(plan.scenarios.len());
        let mut halted = false;

        for scenario in &plan.scenarios {
            if !scenario.enabled {
                debug!("Scenario {} is disabled", scenario.name);
                reports.push(ScenarioReport::skipped(&scenario.name, "disabled"));
                continue;
            }
            if halted {
                reports.push(ScenarioReport::skipped(
                    &scenario.name,
                    "run halted after an earlier failure",
                ));
                continue;
            }

            let report = self.run_scenario(scenario).await;
            if report.outcome != Outcome::Success && !continue_on_failure {
                error!(
                    "Scenario {} did not succeed and continue_on_failure is false, halting",
                    scenario.name
                );
                halted = true;
            }
            reports.push(report);
        }

        let summary = RunSummary::from_reports(&reports);
        info!(
            "Run finished: {}/{} succeeded, {} failed, {} timed out, {} skipped",
            summary.succeeded, summary.total, summary.failed, summary.timed_out, summary.skipped
        );

        RunReport {
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            scenarios: reports,
            summary,
            registry: self.driver.registry().clone(),
        }
    }

    /// Run one scenario under its deadline
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> ScenarioReport {
        let deadline = scenario.timeout(self.driver.config().scenario_timeout());
        let started = Instant::now();
        info!("Running scenario {}", scenario.name);

        let result = timeout(deadline, self.run_steps(scenario)).await;
        let steps = self.driver.take_step_reports();

        let (outcome, error, error_kind) = match result {
            Ok(Ok(())) => (Outcome::Success, None, None),
            Ok(Err(e)) => {
                let outcome = if e.kind() == ErrorKind::Timeout {
                    Outcome::TimedOut
                } else {
                    Outcome::Failed
                };
                (outcome, Some(e.detail()), Some(e.kind()))
            }
            Err(_) => {
                warn!(
                    "Scenario {} exceeded {}ms",
                    scenario.name,
                    deadline.as_millis()
                );
                (
                    Outcome::TimedOut,
                    Some(scenario_timeout_message(deadline)),
                    Some(ErrorKind::Timeout),
                )
            }
        };

        let duration_ms = duration_ms(started.elapsed());
        info!(
            "Scenario {} finished as {:?} in {}ms",
            scenario.name, outcome, duration_ms
        );

        ScenarioReport {
            name: scenario.name.clone(),
            outcome,
            duration_ms,
            error,
            error_kind,
            steps,
        }
    }

    async fn run_steps(&mut self, scenario: &Scenario) -> Result<(), Error> {
        let continue_on_failure = self.driver.config().continue_on_failure;
        let mut first_error = None;

        for (index, step) in scenario.steps.iter().enumerate() {
            debug!("{} step {}: {}", scenario.name, index + 1, step);
            if let Err(e) = self.run_step(step).await {
                error!("{} step {} ({}) failed: {}", scenario.name, index + 1, step, e);
                if !continue_on_failure {
                    return Err(e);
                }
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    async fn run_step(&mut self, step: &Step) -> Result<(), Error> {
        let driver = &mut self.driver;
        match step {
            Step::Upload { role, artifact } => {
                driver.upload_artifact(role, artifact).await?;
            }
            Step::Instantiate {
                role,
                msg,
                label,
                code_id,
                funds,
            } => {
                if let Some(code_id) = code_id {
                    driver.adopt_code(role, *code_id);
                }
                driver
                    .instantiate(role, msg, label.as_deref(), funds)
                    .await?;
            }
            Step::Execute { role, msg, funds } => {
                let outcome = driver.execute(role, msg, funds).await?;
                log_events(step, &outcome);
            }
            Step::Query { role, msg, expect } => {
                let response = driver.query(role, msg).await?;
                if let Some(expected) = expect {
                    if &response != expected {
                        return Err(Error::ExpectationFailed(format!(
                            "query on {} returned {} but {} was expected",
                            role, response, expected
                        )));
                    }
                }
            }
            Step::Balance { address, denom } => {
                let coin = driver.balance(address.as_deref(), denom).await?;
                info!("Balance: {}", coin);
            }
            Step::Send { recipient, amount } => {
                let outcome = driver.send(recipient, amount).await?;
                log_events(step, &outcome);
            }
            Step::InstantiateSwap {
                manager,
                swap,
                debug,
                funds,
            } => {
                let outcome = driver
                    .instantiate_swap_via_manager(manager, swap, *debug, funds)
                    .await?;
                log_events(step, &outcome);
            }
            Step::InstantiateCw20 {
                manager,
                token,
                etf_name,
                etf_symbol,
            } => {
                let outcome = driver
                    .instantiate_cw20_via_manager(manager, token, etf_name, etf_symbol)
                    .await?;
                log_events(step, &outcome);
            }
            Step::SwapTokens {
                manager,
                swap,
                initial_balance,
                etf,
                funds,
            } => {
                let outcome = driver
                    .swap_tokens(manager, swap.as_deref(), initial_balance.clone(), etf, funds)
                    .await?;
                log_events(step, &outcome);
            }
            Step::RedeemTokens {
                manager,
                etf_name,
                funds,
            } => {
                let outcome = driver.redeem_tokens(manager, etf_name, funds).await?;
                log_events(step, &outcome);
            }
        }
        Ok(())
    }
}

fn log_events(step: &Step, outcome: &TxOutcome) {
    info!(
        "{} committed in tx {}: {}",
        step,
        outcome.tx_hash,
        events_json(outcome)
    );
}

/// Events of a committed tx as one line of JSON
pub(crate) fn events_json(outcome: &TxOutcome) -> String {
    serde_json::to_string(&outcome.events).unwrap_or_default()
}

fn scenario_timeout_message(deadline: Duration) -> String {
    format!("scenario timed out after {}ms", deadline.as_millis())
}
