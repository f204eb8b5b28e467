//! Runs the extraction pipeline across a set of capability descriptors,
//! sequentially or with bounded parallelism, and guarantees exactly one
//! result per descriptor in the original order.

use kiosko_common::{CapabilityDescriptor, RunStatus, ScrapeRunResult};
use kiosko_drivers::session::{BrowserSession, SessionFactory};
use kiosko_scraper::pipeline::{self, ImageSink, PipelineConfig};
use kiosko_translate::TranslationChain;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Instant};

/// Time allowed for status reporting and connection teardown after a
/// session blows its deadline.
const CLEANUP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Sequential,
    Parallel { max_parallel: usize },
}

/// Drives one scrape run per descriptor through open → pipeline → report →
/// close, isolating failures so one bad session never sinks its siblings.
#[derive(Clone)]
pub struct Orchestrator {
    factory: Arc<dyn SessionFactory>,
    pipeline: PipelineConfig,
    translator: Option<Arc<TranslationChain>>,
    images: Arc<dyn ImageSink>,
    deadline: Option<Duration>,
}

impl Orchestrator {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        pipeline: PipelineConfig,
        translator: Option<Arc<TranslationChain>>,
        images: Arc<dyn ImageSink>,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            factory,
            pipeline,
            translator,
            images,
            deadline,
        }
    }

    /// Run every descriptor and return one result per descriptor, in input
    /// order. Never returns early: a failed or timed-out session yields a
    /// failed result in its slot.
    ///
    /// The deadline, when configured, is shared: it starts here and bounds
    /// every session, including ones that have not started yet.
    pub async fn run_all(
        &self,
        descriptors: &[CapabilityDescriptor],
        mode: RunMode,
    ) -> Vec<ScrapeRunResult> {
        let deadline = self.deadline.map(|d| Instant::now() + d);

        match mode {
            RunMode::Sequential => {
                let mut results = Vec::with_capacity(descriptors.len());
                for descriptor in descriptors {
                    results.push(self.run_one(descriptor.clone(), deadline).await);
                }
                results
            }
            RunMode::Parallel { max_parallel } => {
                self.run_parallel(descriptors, max_parallel, deadline).await
            }
        }
    }

    async fn run_parallel(
        &self,
        descriptors: &[CapabilityDescriptor],
        max_parallel: usize,
        deadline: Option<Instant>,
    ) -> Vec<ScrapeRunResult> {
        let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
        let mut handles = Vec::with_capacity(descriptors.len());

        for (idx, descriptor) in descriptors.iter().cloned().enumerate() {
            let this = self.clone();
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                // The semaphore is never closed while handles are live.
                let _permit = semaphore.acquire_owned().await.ok();
                (idx, this.run_one(descriptor, deadline).await)
            }));
        }

        let mut slots: Vec<Option<ScrapeRunResult>> =
            descriptors.iter().map(|_| None).collect();
        for handle in handles {
            match handle.await {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => tracing::error!(error = %e, "session task aborted"),
            }
        }

        slots
            .into_iter()
            .zip(descriptors)
            .map(|(slot, descriptor)| {
                slot.unwrap_or_else(|| {
                    ScrapeRunResult::failed("", descriptor.clone(), "session task aborted")
                })
            })
            .collect()
    }

    async fn run_one(
        &self,
        descriptor: CapabilityDescriptor,
        deadline: Option<Instant>,
    ) -> ScrapeRunResult {
        let label = descriptor.label();

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                tracing::warn!(session = %label, "deadline exhausted before session start");
                return ScrapeRunResult::failed("", descriptor, "timeout");
            }
        }

        tracing::info!(session = %label, "opening session");
        let mut session = match self.factory.open(&descriptor).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(session = %label, error = %e, "session open failed");
                return ScrapeRunResult::failed("", descriptor, e.to_string());
            }
        };

        let outcome = {
            let pipeline_run = pipeline::run(
                session.as_mut(),
                &descriptor,
                &self.pipeline,
                self.translator.as_deref(),
                self.images.as_ref(),
            );
            match deadline {
                Some(deadline) => timeout_at(deadline, pipeline_run).await,
                None => Ok(pipeline_run.await),
            }
        };

        match outcome {
            Ok(result) => {
                let reason = match result.status {
                    RunStatus::Passed => format!("scraped {} articles", result.articles.len()),
                    RunStatus::Failed => result
                        .error_detail
                        .clone()
                        .unwrap_or_else(|| "scrape failed".to_string()),
                };
                session.report_status(result.status, &reason).await;
                session.close().await;
                tracing::info!(session = %label, status = ?result.status, %reason, "session finished");
                result
            }
            Err(_) => {
                tracing::warn!(session = %label, "session deadline exceeded");
                let session_id = session.id().to_string();
                cleanup_after_deadline(session.as_mut()).await;
                ScrapeRunResult::failed(session_id, descriptor, "timeout")
            }
        }
    }
}

/// Best-effort report and teardown for a session that ran out of time,
/// itself bounded so a wedged connection cannot stall the run further.
async fn cleanup_after_deadline(session: &mut dyn BrowserSession) {
    let cleanup = async {
        session.report_status(RunStatus::Failed, "timeout").await;
        session.close().await;
    };
    if tokio::time::timeout(CLEANUP_GRACE, cleanup).await.is_err() {
        tracing::warn!("session cleanup did not finish within grace period");
    }
}
