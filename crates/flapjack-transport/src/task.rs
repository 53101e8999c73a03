//! Waiting for server-side write tasks to be published.
//!
//! Every write call returns a task id immediately; the work happens
//! asynchronously server-side. [`Transporter::wait_for_task`] polls the
//! task status endpoint on a fixed interval until the task is reported
//! published or the wall-clock budget runs out.

use serde::Deserialize;
use tokio::time::{sleep, Instant};

use flapjack_error::{Error, Result};

use crate::call::CallType;
use crate::transporter::{RequestOptions, Transporter};

use std::time::Duration;

#[derive(Debug, Deserialize, PartialEq, Eq)]
enum TaskStatus {
    #[serde(rename = "published")]
    Published,
    #[serde(rename = "notPublished")]
    NotPublished,
}

#[derive(Debug, Deserialize)]
struct TaskStatusResponse {
    status: TaskStatus,
}

impl Transporter {
    /// Polls until `task_id` on `index` is published, using the configured
    /// poll interval and max wait.
    ///
    /// Each poll is a read call routed through the normal retry strategy,
    /// so status queries get host failover too. The interval is fixed
    /// rather than backing off: tasks typically publish within seconds and
    /// responsiveness matters more than request volume here.
    ///
    /// Cancellation: dropping the returned future between polls stops
    /// polling promptly and has no effect on the server-side task.
    ///
    /// # Errors
    ///
    /// [`Error::TaskTimeout`] once the budget is exhausted while the task
    /// is still unpublished; any fatal error from a status query itself
    /// propagates unchanged.
    pub async fn wait_for_task(&self, index: &str, task_id: u64) -> Result<()> {
        self.wait_for_task_with(index, task_id, self.config().task_max_wait)
            .await
    }

    /// Like [`wait_for_task`](Transporter::wait_for_task) with an explicit
    /// wall-clock budget.
    pub async fn wait_for_task_with(
        &self,
        index: &str,
        task_id: u64,
        max_wait: Duration,
    ) -> Result<()> {
        let interval = self.config().task_poll_interval;
        let path = format!("/indexes/{index}/task/{task_id}");
        let options = RequestOptions::new();
        let started = Instant::now();

        loop {
            let response: TaskStatusResponse = self
                .request(reqwest::Method::GET, &path, None::<&()>, CallType::READ, &options)
                .await?;
            if response.status == TaskStatus::Published {
                tracing::debug!(index, task_id, elapsed = ?started.elapsed(), "task published");
                return Ok(());
            }

            if started.elapsed() >= max_wait {
                return Err(Error::TaskTimeout {
                    index: index.to_string(),
                    task_id,
                    elapsed: started.elapsed(),
                });
            }
            sleep(interval).await;
        }
    }
}
