//! Serialized kernel access with a caller-side timeout.
//!
//! One long-lived thread owns the kernel and takes jobs in arrival order from
//! a bounded queue. Callers wait on a per-job reply channel for at most the
//! configured timeout. A timed-out job keeps the kernel until it finishes;
//! jobs arriving while the queue is full are rejected.

use std::io;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread;
use std::time::Duration;

use part_analysis::{
    AnalysisError, AnalysisOrchestrator, AnalysisRequest, AnalysisResult, ArtifactSink,
    MeshRequest,
};
use step_kernel::GeometryKernel;
use tracing::{debug, instrument, warn};

use crate::artifacts::ArtifactStore;
use crate::errors::ServiceError;

/// Everything one analysis needs, owned so it can cross to the kernel thread.
///
/// The job only names the input file; whoever staged it keeps ownership.
#[derive(Debug)]
pub struct AnalysisJob {
    pub path: PathBuf,
    pub file_name: String,
    pub material: Option<String>,
    pub mesh: Option<MeshRequest>,
    pub artifacts: Option<ArtifactStore>,
}

type Outcome = Result<AnalysisResult, AnalysisError>;

struct Queued {
    job: AnalysisJob,
    reply: mpsc::Sender<Outcome>,
}

/// Handle to the kernel thread. Dropping it closes the queue and the thread
/// exits after its current job.
pub struct KernelWorker<K> {
    jobs: SyncSender<Queued>,
    queue_depth: usize,
    timeout: Duration,
    _kernel: PhantomData<fn() -> K>,
}

impl<K> KernelWorker<K>
where
    K: GeometryKernel + Send + 'static,
{
    pub fn new(
        kernel: K,
        orchestrator: AnalysisOrchestrator,
        timeout: Duration,
        queue_depth: usize,
    ) -> io::Result<Self> {
        let (jobs, queue) = mpsc::sync_channel(queue_depth);
        thread::Builder::new()
            .name("kernel-worker".to_string())
            .spawn(move || serve(kernel, orchestrator, queue))?;
        Ok(Self {
            jobs,
            queue_depth,
            timeout,
            _kernel: PhantomData,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    /// Queue `job` for the kernel thread and wait for its result.
    #[instrument(skip_all, fields(file = %job.file_name))]
    pub fn run(&self, job: AnalysisJob) -> Result<AnalysisResult, ServiceError> {
        let (reply, outcome) = mpsc::channel();
        match self.jobs.try_send(Queued { job, reply }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(depth = self.queue_depth, "kernel queue full, rejecting job");
                return Err(ServiceError::Busy {
                    depth: self.queue_depth,
                });
            }
            Err(TrySendError::Disconnected(_)) => return Err(ServiceError::WorkerPanicked),
        }

        match outcome.recv_timeout(self.timeout) {
            Ok(outcome) => Ok(outcome?),
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = self.timeout.as_millis(), "kernel call timed out");
                Err(ServiceError::Timeout {
                    after_ms: self.timeout.as_millis(),
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(ServiceError::WorkerPanicked),
        }
    }
}

/// Kernel thread body: one job at a time until every handle is gone.
fn serve<K: GeometryKernel>(
    mut kernel: K,
    orchestrator: AnalysisOrchestrator,
    queue: Receiver<Queued>,
) {
    for Queued { job, reply } in queue {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_job(&mut kernel, &orchestrator, &job)
        }));
        match outcome {
            // The receiver is gone when the caller already timed out.
            Ok(outcome) => {
                if reply.send(outcome).is_err() {
                    debug!(file = %job.file_name, "result discarded after timeout");
                }
            }
            Err(_) => warn!(
                file = %job.file_name,
                "analysis panicked, kernel kept for the next job"
            ),
        }
    }
    debug!("kernel queue closed, worker exiting");
}

fn run_job<K: GeometryKernel>(
    kernel: &mut K,
    orchestrator: &AnalysisOrchestrator,
    job: &AnalysisJob,
) -> Outcome {
    let request = AnalysisRequest {
        path: &job.path,
        file_name: &job.file_name,
        material: job.material.as_deref(),
        mesh: job.mesh,
    };
    let sink = job.artifacts.as_ref().map(|s| s as &dyn ArtifactSink);
    orchestrator.analyze(kernel, &request, sink)
}
