//! Sequential execution of a prepared batch.
//!
//! Jobs are taken from a queue one at a time; the next submission starts only
//! after the previous one has settled. A failing job is recorded and the
//! batch moves on. `processed` advances exactly once per job, whatever its
//! outcome.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use slidebatch_protocol::{ExportRow, Provider};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::Result;
use crate::gateway::Gateway;
use crate::pattern::{BatchPlan, ValidationError};

/// A design the gateway generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
	pub name: String,
	pub url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thumbnail: Option<String>,
}

/// A job the gateway rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailure {
	pub name: String,
	pub reason: String,
	/// The credential was rejected; later jobs will likely fail too.
	pub auth_failure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum JobOutcome {
	Succeeded(JobResult),
	Failed(JobFailure),
}

impl JobOutcome {
	pub fn name(&self) -> &str {
		match self {
			JobOutcome::Succeeded(result) => &result.name,
			JobOutcome::Failed(failure) => &failure.name,
		}
	}
}

/// State of a batch, in progress or finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchRun {
	pub total: usize,
	pub processed: usize,
	/// Successful jobs, in submission order.
	pub results: Vec<JobResult>,
	pub failures: Vec<JobFailure>,
}

impl BatchRun {
	pub fn new(total: usize) -> Self {
		Self {
			total,
			..Self::default()
		}
	}

	pub fn is_complete(&self) -> bool {
		self.processed == self.total
	}

	pub fn is_fully_successful(&self) -> bool {
		self.results.len() == self.total
	}

	/// Whole-number completion percentage.
	pub fn percent(&self) -> u8 {
		if self.total == 0 {
			return 100;
		}
		((self.processed * 100) / self.total).min(100) as u8
	}

	pub fn export_rows(&self) -> Vec<ExportRow> {
		self.results
			.iter()
			.map(|result| ExportRow {
				name: result.name.clone(),
				url: result.url.clone(),
			})
			.collect()
	}

	fn record(&mut self, outcome: &JobOutcome) {
		match outcome {
			JobOutcome::Succeeded(result) => self.results.push(result.clone()),
			JobOutcome::Failed(failure) => self.failures.push(failure.clone()),
		}
		self.processed += 1;
	}
}

/// Progress published after every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
	pub processed: usize,
	pub total: usize,
	pub results: Vec<JobResult>,
	pub last: JobOutcome,
}

/// Submits the jobs of a [`BatchPlan`] one at a time.
#[derive(Clone)]
pub struct BatchRunner {
	gateway: Arc<dyn Gateway>,
}

impl BatchRunner {
	pub fn new(gateway: Arc<dyn Gateway>) -> Self {
		Self { gateway }
	}

	/// Runs every job of `plan` in order, calling `on_progress` after each.
	pub async fn run<F>(&self, plan: &BatchPlan, canva_token: &str, mut on_progress: F) -> BatchRun
	where
		F: FnMut(&BatchProgress),
	{
		let mut run = BatchRun::new(plan.len());
		let mut queue: VecDeque<_> = plan.jobs.iter().collect();
		info!(target = "slidebatch.batch", total = run.total, template = %plan.template, "starting batch");

		while let Some(job) = queue.pop_front() {
			let outcome = match self.gateway.generate_design(canva_token, &plan.request(job)).await {
				Ok(response) => JobOutcome::Succeeded(JobResult {
					name: job.name.clone(),
					url: response.url,
					thumbnail: response.thumbnail,
				}),
				Err(err) => {
					warn!(target = "slidebatch.batch", job = %job.name, error = %err, "job failed");
					JobOutcome::Failed(JobFailure {
						name: job.name.clone(),
						reason: err.to_string(),
						auth_failure: err.is_auth_failure(),
					})
				}
			};

			run.record(&outcome);
			on_progress(&BatchProgress {
				processed: run.processed,
				total: run.total,
				results: run.results.clone(),
				last: outcome,
			});
		}

		info!(
			target = "slidebatch.batch",
			total = run.total,
			succeeded = run.results.len(),
			failed = run.failures.len(),
			"batch finished"
		);
		run
	}

	/// Runs the batch on a task, streaming progress through the returned
	/// receiver. The stream ends when the batch does.
	pub fn spawn(self, plan: BatchPlan, canva_token: String) -> (mpsc::UnboundedReceiver<BatchProgress>, JoinHandle<BatchRun>) {
		let (tx, rx) = mpsc::unbounded_channel();
		let task = tokio::spawn(async move {
			self.run(&plan, &canva_token, |progress| {
				let _ = tx.send(progress.clone());
			})
			.await
		});
		(rx, task)
	}

	/// Exports the successful results to a spreadsheet and returns its URL.
	pub async fn export(&self, run: &BatchRun, google_token: Option<&str>) -> Result<String> {
		let Some(google_token) = google_token.filter(|token| !token.is_empty()) else {
			return Err(ValidationError::MissingCredential(Provider::Google).into());
		};
		let rows = run.export_rows();
		if rows.is_empty() {
			return Err(ValidationError::NothingToExport.into());
		}
		let url = self.gateway.export_results(google_token, &rows).await?;
		info!(target = "slidebatch.batch", rows = rows.len(), %url, "results exported");
		Ok(url)
	}
}
