use std::path::PathBuf;

use clap::Args;

use crate::config::Settings;
use crate::error::{Error, ErrorKind};
use crate::runner::{Outcome, RunReport, ScenarioRunner};
use crate::scenario::ScenarioPlan;

use super::signing_driver;

#[derive(Args, Debug, Clone)]
pub struct RunCommand {
    /// Scenario plan (TOML)
    #[arg(long)]
    pub plan: PathBuf,

    /// Run only these scenarios
    #[arg(long)]
    pub only: Vec<String>,

    /// Enable a scenario disabled in the plan
    #[arg(long)]
    pub enable: Vec<String>,

    /// Disable a scenario
    #[arg(long)]
    pub disable: Vec<String>,

    /// Keep going after a failed step or scenario
    #[arg(long)]
    pub continue_on_failure: bool,

    /// Write the JSON run report here
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunCommand {
    pub async fn execute(self, mut settings: Settings) -> Result<(), Error> {
        let mut plan = ScenarioPlan::load(&self.plan)?;
        if !self.only.is_empty() {
            plan.only(&self.only)?;
        }
        for name in &self.enable {
            plan.set_enabled(name, true)?;
        }
        for name in &self.disable {
            plan.set_enabled(name, false)?;
        }
        if self.continue_on_failure {
            settings.driver.continue_on_failure = true;
        }

        let driver = signing_driver(&settings)?;
        let mut runner = ScenarioRunner::new(driver);
        let report = runner.run(&plan).await;

        print_report(&report);
        if let Some(path) = &self.report {
            report.write(path)?;
        }

        if report.is_success() {
            Ok(())
        } else {
            Err(Error::RunFailed {
                kind: report
                    .first_error_kind()
                    .unwrap_or(ErrorKind::ConfigError),
                failed: report.summary.failed + report.summary.timed_out,
                total: report.summary.total,
            })
        }
    }
}

fn print_report(report: &RunReport) {
    for scenario in &report.scenarios {
        let status = match scenario.outcome {
            Outcome::Success => "ok",
            Outcome::Failed => "FAILED",
            Outcome::TimedOut => "TIMED OUT",
            Outcome::Skipped => "skipped",
        };
        print!("{:<32} {:<10} {:>8}ms", scenario.name, status, scenario.duration_ms);
        match (&scenario.error_kind, &scenario.error) {
            (Some(kind), Some(error)) => println!("  [{}] {}", kind, error),
            (None, Some(reason)) => println!("  ({})", reason),
            _ => println!(),
        }
    }

    let summary = &report.summary;
    println!();
    println!(
        "{} scenarios: {} succeeded, {} failed, {} timed out, {} skipped ({:.1}% pass rate)",
        summary.total,
        summary.succeeded,
        summary.failed,
        summary.timed_out,
        summary.skipped,
        summary.pass_rate
    );

    for role in report.registry.roles() {
        if let Some(record) = report.registry.get(role) {
            let code = record
                .code_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            let address = record.address.as_deref().unwrap_or("-");
            println!("{:<16} code {:<8} {}", role, code, address);
        }
    }
}
