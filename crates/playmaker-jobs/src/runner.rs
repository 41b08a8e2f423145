use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

use playmaker_gateway::dispatcher::Dispatcher;

use crate::job::{Job, RetryPolicy};
use crate::mailer::Mailer;

/// Everything a worker needs to execute jobs.
#[derive(Clone)]
pub struct JobContext {
    pub dispatcher: Dispatcher,
    pub mailer: Arc<dyn Mailer>,
}

/// Cloneable fire-and-forget enqueue handle. The call site never observes a
/// result; at-least-once execution with no ordering is the contract.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    pub fn enqueue(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warn!("Job runner is gone; job dropped");
        }
    }
}

/// Start `workers` worker tasks draining a shared queue in parallel.
/// Returns the enqueue handle; the workers run until every handle is dropped
/// and the queue is drained.
pub fn start(workers: usize, ctx: JobContext) -> JobQueue {
    let (tx, rx) = mpsc::unbounded_channel();
    let rx = Arc::new(Mutex::new(rx));

    for worker_id in 0..workers {
        let rx = rx.clone();
        let ctx = ctx.clone();
        tokio::spawn(worker_loop(worker_id, rx, ctx));
    }

    info!("Job runner started with {} workers", workers);
    JobQueue { tx }
}

async fn worker_loop(worker_id: usize, rx: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>, ctx: JobContext) {
    loop {
        // Hold the lock only while waiting for the next job so workers pull
        // in parallel with execution.
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        info!("Worker {} running {}", worker_id, job.name());
        run_with_policy(&ctx, &job, job.retry_policy()).await;
    }
}

/// Execute one job, applying its retry policy. Exhausted retries and
/// no-policy failures alike are logged and dropped.
pub async fn run_with_policy(ctx: &JobContext, job: &Job, policy: Option<RetryPolicy>) {
    let mut attempt: u32 = 0;
    loop {
        match execute(ctx, job).await {
            Ok(()) => return,
            Err(e) => match policy {
                Some(p) if attempt < p.max_retries => {
                    attempt += 1;
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {:#}",
                        job.name(),
                        attempt,
                        p.max_retries,
                        p.backoff,
                        e
                    );
                    tokio::time::sleep(p.backoff).await;
                }
                _ => {
                    warn!("{} failed, dropping: {:#}", job.name(), e);
                    return;
                }
            },
        }
    }
}

async fn execute(ctx: &JobContext, job: &Job) -> anyhow::Result<()> {
    match job {
        Job::NotificationFanOut {
            kind,
            text,
            link,
            sender_id,
            receiver_ids,
        } => {
            ctx.dispatcher
                .fan_out(*kind, text, link.as_deref(), *sender_id, receiver_ids)
                .await
        }

        Job::TrialStatusMail {
            email,
            trial_name,
            message,
        } => {
            let subject = format!("{} status updation", trial_name);
            ctx.mailer.send(std::slice::from_ref(email), &subject, message)
        }

        Job::TrialCancellationMail {
            recipients,
            trial_name,
            academy_name,
            reason,
        } => {
            let body = format!(
                "Dear player,\n\nWe regret to inform you that the trial '{}' conducted by \
                 '{}' has been cancelled due to {}. Any payment processed will be refunded \
                 within 3-7 days. Contact {} for further information.\n\nBest regards,\nPlayMaker",
                trial_name, academy_name, reason, academy_name
            );
            ctx.mailer.send(recipients, "Trial cancelled", &body)
        }
    }
}
