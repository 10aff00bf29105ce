// IDC background jobs
//
// Mutating services answer with a `JobID` when they run on a background
// thread. Status and response data are read-only services, so they go
// through the relay's GET passthrough.

use tracing::debug;

use crate::error::Error;
use crate::idc::client::IdcClient;
use crate::idc::models::{IdcResponse, LocalData};
use crate::idc::service::IdcOperation;
use crate::poller::{JobReport, JobStatusSource, JobSubmitter, Submission};

const JOB_STATUS_SERVICE: &str = "SCS_GET_BACKGROUND_SERVICE_JOB_STATUS";
const JOB_DATA_SERVICE: &str = "SCS_GET_BACKGROUND_SERVICE_JOB_RESPONSE_DATA";

const STATUS_COMPLETE: &str = "COMPLETE";
const STATUS_FAILED: &str = "FAILED";

impl JobReport {
    /// Decode an IDC job status block.
    ///
    /// A missing status or `FAILED` is a failure whatever the percentage.
    /// Otherwise `COMPLETE` or a percentage of exactly `100` finishes the
    /// job, and anything else is running.
    pub fn from_idc(data: &LocalData) -> Self {
        let percentage = data
            .job_percentage
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok());

        match data.job_status.as_deref() {
            None | Some("" | STATUS_FAILED) => Self::failed(data.job_message.clone()),
            Some(STATUS_COMPLETE) => Self::complete(),
            Some(_) if percentage == Some(100) => Self::complete(),
            Some(_) => Self::running(percentage),
        }
    }
}

impl JobStatusSource for IdcClient {
    async fn job_status(&self, job_id: &str) -> Result<JobReport, Error> {
        let resp: IdcResponse = self.get_json(JOB_STATUS_SERVICE, &[("JobID", job_id)]).await?;
        let report = JobReport::from_idc(&resp.local_data);
        debug!(job_id, phase = ?report.phase, "job status");
        Ok(report)
    }

    async fn job_diagnostics(&self, job_id: &str) -> Result<Option<String>, Error> {
        let resp: IdcResponse = self.get_json(JOB_DATA_SERVICE, &[("JobID", job_id)]).await?;
        Ok(resp
            .local_data
            .status_message
            .filter(|m| !m.is_empty()))
    }
}

impl JobSubmitter for IdcClient {
    type Operation = IdcOperation;

    async fn submit_job(&self, op: &IdcOperation) -> Result<Submission, Error> {
        let resp = self.submit(op).await?;
        Ok(Submission {
            job_id: resp.local_data.job_id.filter(|id| !id.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::JobPhase;

    fn data(status: Option<&str>, pct: Option<&str>) -> LocalData {
        LocalData {
            job_status: status.map(str::to_owned),
            job_percentage: pct.map(str::to_owned),
            job_message: Some("boom".into()),
            ..LocalData::default()
        }
    }

    #[test]
    fn percentage_hundred_completes_a_running_job() {
        assert_eq!(
            JobReport::from_idc(&data(Some("PROCESSING"), Some("100"))).phase,
            JobPhase::Complete
        );
        assert_eq!(
            JobReport::from_idc(&data(Some("COMPLETE"), None)).phase,
            JobPhase::Complete
        );
    }

    #[test]
    fn failure_sentinels() {
        for status in [None, Some(""), Some("FAILED")] {
            let report = JobReport::from_idc(&data(status, Some("40")));
            assert_eq!(report.phase, JobPhase::Failed);
            assert_eq!(report.message.as_deref(), Some("boom"));
        }
    }

    #[test]
    fn failure_wins_over_full_percentage() {
        for status in [None, Some(""), Some("FAILED")] {
            let report = JobReport::from_idc(&data(status, Some("100")));
            assert_eq!(report.phase, JobPhase::Failed, "{status:?}");
        }
    }

    #[test]
    fn in_progress_reports_percentage() {
        assert_eq!(
            JobReport::from_idc(&data(Some("PROCESSING"), Some("35"))).phase,
            JobPhase::Running {
                percentage: Some(35)
            }
        );
    }
}
