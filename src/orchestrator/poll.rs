//! Job status polling

use indicatif::ProgressBar;
use log::{debug, info, warn};
use tokio::time::Instant;

use crate::client::AnalysisApi;
use crate::client::models::JobStatus;
use crate::config::PollSettings;
use crate::error::{Error, Result};

/// Poll a job until it completes.
///
/// Each round sleeps `settings.interval` and then fetches the status, so the
/// first request goes out one interval after submission. `failed` is an
/// error. Without a timeout the loop only ends on a terminal status.
pub async fn poll_to_completion<C: AnalysisApi + ?Sized>(
    client: &C,
    job_id: &str,
    settings: PollSettings,
    progress: Option<&ProgressBar>,
) -> Result<JobStatus> {
    let started = Instant::now();
    info!("Waiting for job {} to complete", job_id);

    loop {
        tokio::time::sleep(settings.interval).await;

        let status = client.get_job_status(job_id).await?;
        debug!("Job {} status: {}", job_id, status);
        if let Some(bar) = progress {
            bar.set_message(format!("Job {} is {}", job_id, status));
        }

        if status.is_terminal() {
            return match status {
                JobStatus::Failed => Err(Error::JobFailed {
                    job_id: job_id.to_string(),
                }),
                _ => {
                    info!("Job {} completed", job_id);
                    Ok(status)
                }
            };
        }
        if status == JobStatus::Unknown {
            warn!("Job {} reported an unrecognized status", job_id);
        }

        if let Some(timeout) = settings.timeout {
            if started.elapsed() >= timeout {
                return Err(Error::PollTimeout {
                    job_id: job_id.to_string(),
                    timeout,
                });
            }
        }
    }
}
