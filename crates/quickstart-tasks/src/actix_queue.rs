use actix::prelude::*;
use async_trait::async_trait;
use tracing::Instrument;

use quickstart_core::QuickstartError;
use quickstart_observability::{annotate_span_with_trace_ids, Metrics};

use crate::{DynTaskDispatcher, Task, TaskQueue};

/// Runs dispatched tasks off the request path.
///
/// Each task is driven on its own future, so a slow handler does not hold up
/// the ones queued behind it.
pub struct TaskActor {
    dispatcher: DynTaskDispatcher,
    metrics: Option<Metrics>,
}

impl TaskActor {
    pub fn new(dispatcher: DynTaskDispatcher) -> Self {
        Self {
            dispatcher,
            metrics: None,
        }
    }

    pub fn with_metrics(dispatcher: DynTaskDispatcher, metrics: Metrics) -> Self {
        Self {
            dispatcher,
            metrics: Some(metrics),
        }
    }
}

impl Actor for TaskActor {
    type Context = Context<Self>;
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct RunTask {
    pub task: Task,
}

impl Handler<RunTask> for TaskActor {
    type Result = ResponseFuture<()>;

    fn handle(&mut self, msg: RunTask, _: &mut Self::Context) -> Self::Result {
        let dispatcher = self.dispatcher.clone();
        let metrics = self.metrics.clone();
        let task = msg.task;

        let span = tracing::info_span!(
            "task.dispatch",
            trace_id = tracing::field::Empty,
            span_id = tracing::field::Empty,
            task_id = %task.id,
            task_path = %task.path
        );
        annotate_span_with_trace_ids(&span);

        Box::pin(
            async move {
                match dispatcher.dispatch(&task).await {
                    Ok(()) => {
                        tracing::debug!("task dispatched");
                        if let Some(m) = &metrics {
                            m.tasks_dispatched_total.inc();
                        }
                    }
                    Err(err) => {
                        // No retry.
                        tracing::warn!(error = %err, "task dispatch failed (best-effort)");
                        if let Some(m) = &metrics {
                            m.tasks_failed_total.inc();
                        }
                    }
                }
            }
            .instrument(span),
        )
    }
}

/// A `TaskQueue` backed by `TaskActor`.
///
/// Uses `do_send`, so enqueueing never waits for the task to run.
#[derive(Clone)]
pub struct ActixTaskQueue {
    addr: Addr<TaskActor>,
}

impl ActixTaskQueue {
    pub fn new(addr: Addr<TaskActor>) -> Self {
        Self { addr }
    }

    /// Start a `TaskActor` on the current arbiter and wrap it.
    pub fn start(dispatcher: DynTaskDispatcher, metrics: Option<Metrics>) -> Self {
        let actor = match metrics {
            Some(metrics) => TaskActor::with_metrics(dispatcher, metrics),
            None => TaskActor::new(dispatcher),
        };
        Self::new(actor.start())
    }
}

#[async_trait]
impl TaskQueue for ActixTaskQueue {
    async fn enqueue(&self, task: Task) -> Result<String, QuickstartError> {
        if !self.addr.connected() {
            return Err(QuickstartError::task_queue("task actor is not running"));
        }

        let id = task.id.clone();
        tracing::info!(task_id = %id, task_path = %task.path, "task enqueued");
        self.addr.do_send(RunTask { task });
        Ok(id)
    }
}
