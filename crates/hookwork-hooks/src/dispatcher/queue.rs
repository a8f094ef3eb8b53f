//! Execution queue and its single worker
//!
//! Matched rules are queued as `(rule, context)` jobs and executed one at a
//! time by one worker task, so the actions of two rules never interleave.

use std::sync::{Arc, Mutex};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, info};

use crate::{
    error::{HooksError, Result},
    executor::RuleExecutor,
    notify::{EngineEvent, Notifier},
    recorder::StatsRecorder,
    types::{ExecutionContext, Rule},
};

enum QueueItem {
    Job {
        rule: Rule,
        context: Arc<ExecutionContext>,
    },
    /// Completed once every item queued before it has been processed
    Barrier(oneshot::Sender<()>),
}

/// FIFO of rule executions drained by one worker
pub struct ExecutionQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<QueueItem>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ExecutionQueue {
    /// Spawn the worker on the current tokio runtime
    ///
    /// # Errors
    ///
    /// [`HooksError::RuntimeError`] when called outside a tokio runtime.
    pub fn start(
        executor: Arc<dyn RuleExecutor>,
        recorder: StatsRecorder,
        notifier: Notifier,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| HooksError::RuntimeError(format!("No tokio runtime: {}", e)))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = runtime.spawn(run_worker(receiver, executor, recorder, notifier));

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue rules for execution, in the given order
    ///
    /// # Errors
    ///
    /// [`HooksError::QueueClosed`] after [`ExecutionQueue::shutdown`].
    pub fn enqueue(&self, rules: Vec<Rule>, context: Arc<ExecutionContext>) -> Result<()> {
        let sender = self.sender()?;
        for rule in rules {
            sender
                .send(QueueItem::Job {
                    rule,
                    context: context.clone(),
                })
                .map_err(|_| HooksError::QueueClosed)?;
        }
        Ok(())
    }

    /// Whether the queue still accepts work
    pub fn is_open(&self) -> bool {
        self.sender().is_ok()
    }

    /// Wait until everything queued before this call has been executed
    pub async fn wait_idle(&self) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.sender()?
            .send(QueueItem::Barrier(done))
            .map_err(|_| HooksError::QueueClosed)?;
        wait.await.map_err(|_| HooksError::QueueClosed)
    }

    /// Stop accepting work, let the worker drain the queue and wait for it
    ///
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().map(|mut s| s.take()).unwrap_or(None);
        drop(sender);

        let worker = self.worker.lock().map(|mut w| w.take()).unwrap_or(None);
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Execution worker ended abnormally");
            }
        }
    }

    fn sender(&self) -> Result<mpsc::UnboundedSender<QueueItem>> {
        self.sender
            .lock()
            .map_err(|e| HooksError::RuntimeError(format!("Failed to acquire queue lock: {}", e)))?
            .clone()
            .ok_or(HooksError::QueueClosed)
    }
}

impl std::fmt::Debug for ExecutionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionQueue")
            .field("open", &self.is_open())
            .finish()
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<QueueItem>,
    executor: Arc<dyn RuleExecutor>,
    recorder: StatsRecorder,
    notifier: Notifier,
) {
    debug!("Execution worker started");

    while let Some(item) = receiver.recv().await {
        match item {
            QueueItem::Job { rule, context } => {
                let rule_id = rule.id.clone();
                let job = tokio::spawn(execute_job(
                    rule,
                    context,
                    executor.clone(),
                    recorder.clone(),
                    notifier.clone(),
                ));
                // A panic inside one job must not take the worker down
                if let Err(e) = job.await {
                    error!(rule_id = %rule_id, error = %e, "Rule execution aborted");
                }
            }
            QueueItem::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }

    info!("Execution worker stopped");
}

async fn execute_job(
    rule: Rule,
    context: Arc<ExecutionContext>,
    executor: Arc<dyn RuleExecutor>,
    recorder: StatsRecorder,
    notifier: Notifier,
) {
    debug!(rule_id = %rule.id, trigger = %context.trigger, "Executing queued rule");

    let result = executor.execute_rule(&rule, context.clone()).await;
    recorder.record(&rule, &context, &result).await;

    notifier.notify(&EngineEvent::RuleExecuted {
        rule,
        context,
        result,
    });
}
