//! Background ingest jobs.
//!
//! Each job keeps the full log of its pipeline events so a client can subscribe
//! late and still replay everything from the start.

use std::sync::{Arc, RwLock};

use casebook_pipeline::{DocumentInput, IngestPipeline, PipelineEvent};
use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Progress {
    len: usize,
    finished: bool,
}

pub struct IngestJob {
    pub id: String,
    pub case_id: String,
    cancel: CancellationToken,
    events: RwLock<Vec<PipelineEvent>>,
    progress: watch::Sender<Progress>,
}

impl IngestJob {
    fn new(case_id: &str) -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            case_id: case_id.to_string(),
            cancel: CancellationToken::new(),
            events: RwLock::new(Vec::new()),
            progress,
        }
    }

    fn push(&self, event: PipelineEvent) {
        let len = match self.events.write() {
            Ok(mut events) => {
                events.push(event);
                events.len()
            }
            Err(_) => return,
        };
        self.progress.send_modify(|p| p.len = len);
    }

    fn finish(&self) {
        self.progress.send_modify(|p| p.finished = true);
    }

    pub fn is_finished(&self) -> bool {
        self.progress.borrow().finished
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn event_at(&self, index: usize) -> Option<PipelineEvent> {
        self.events.read().ok()?.get(index).cloned()
    }

    /// Wait for the event at `index`. `None` once the job has finished and the log is exhausted.
    pub async fn next_event(&self, index: usize) -> Option<PipelineEvent> {
        let mut rx = self.progress.subscribe();
        loop {
            let progress = *rx.borrow_and_update();
            if index < progress.len {
                return self.event_at(index);
            }
            if progress.finished {
                return None;
            }
            rx.changed().await.ok()?;
        }
    }
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<String, Arc<IngestJob>>,
}

impl JobRegistry {
    pub fn get(&self, id: &str) -> Option<Arc<IngestJob>> {
        self.jobs.get(id).map(|j| j.clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Drop finished jobs, returning how many were removed
    pub fn prune_finished(&self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| !job.is_finished());
        before - self.jobs.len()
    }

    /// Run an ingest batch in the background and return its job handle
    pub fn spawn(
        &self,
        pipeline: Arc<IngestPipeline>,
        case_id: &str,
        documents: Vec<DocumentInput>,
    ) -> Arc<IngestJob> {
        let job = Arc::new(IngestJob::new(case_id));
        self.jobs.insert(job.id.clone(), job.clone());

        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);

        let recorder = job.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                recorder.push(event);
            }
            recorder.finish();
        });

        let runner = job.clone();
        tokio::spawn(async move {
            let cancel = runner.cancel.clone();
            match pipeline.run(&runner.case_id, documents, cancel, tx).await {
                Ok(summary) => tracing::info!(
                    "Job {} finished: {} processed, {} failed",
                    runner.id,
                    summary.processed,
                    summary.failed
                ),
                Err(e) => tracing::warn!("Job {} ended: {}", runner.id, e),
            }
        });

        tracing::info!("Started ingest job {} for case {}", job.id, case_id);
        job
    }
}
