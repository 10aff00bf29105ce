use tracing::info;

use crate::command::verify_site;
use crate::controller::SiteController;
use crate::error::CoreError;

/// Ask the server to rebuild the pre-rendered pages of a site. Does not
/// wait for the job; returns its id when the server hands one back.
pub(crate) async fn refresh_prerender_cache(
    ctl: &SiteController,
    name: &str,
) -> Result<Option<String>, CoreError> {
    let reporter = ctl.reporter();
    let rest = ctl.connection().rest_client()?;
    let site = verify_site(&rest, name, &[], reporter).await?;

    let submission = rest.refresh_prerender_cache(&site.id).await?;
    match &submission.job_id {
        Some(job_id) => reporter.step(&format!("pre-render cache refresh started (job {job_id})")),
        None => reporter.step("pre-render cache refresh started"),
    }
    info!(site = name, job_id = ?submission.job_id, "pre-render refresh requested");
    Ok(submission.job_id)
}
