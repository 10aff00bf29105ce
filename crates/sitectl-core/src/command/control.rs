// Publish, unpublish, bring online or take offline.

use tracing::info;

use crate::collab::Reporter;
use crate::command::await_submission;
use crate::controller::SiteController;
use crate::error::CoreError;
use crate::model::{Site, SiteAction};
use crate::session::with_relay;

pub(crate) async fn control_site(
    ctl: &SiteController,
    name: &str,
    action: SiteAction,
) -> Result<(), CoreError> {
    let reporter = ctl.reporter();

    if ctl.connection().uses_rest() {
        let rest = ctl.connection().rest_client()?;
        let site = rest
            .get_site(name, &[])
            .await?
            .ok_or_else(|| CoreError::not_found("site", name))?;
        let site = Site::from(&site);
        check(&site, action, reporter)?;
        let submission = rest
            .transition_site(&site.id, action.rest_transition())
            .await?;
        await_submission(&rest, submission, reporter).await?;
        finished(&site, action, reporter);
        return Ok(());
    }

    with_relay(ctl.connection(), reporter, |s| async move {
        let site = s
            .idc
            .find_site(name)
            .await?
            .ok_or_else(|| CoreError::not_found("site", name))?;
        let site = Site::from(&site);
        check(&site, action, reporter)?;
        s.run(&action.idc_operation(&site.id)).await?;
        finished(&site, action, reporter);
        Ok(())
    })
    .await
}

/// Report the current state and apply the ordering rules.
fn check(site: &Site, action: SiteAction, reporter: &dyn Reporter) -> Result<(), CoreError> {
    reporter.step(&format!(
        "get site: runtimeStatus: {}  publishStatus: {}",
        site.status.runtime, site.status.publish
    ));
    action.check(&site.name, site.status)
}

fn finished(site: &Site, action: SiteAction, reporter: &dyn Reporter) {
    info!(site = %site.name, %action, "site action finished");
    reporter.step(&action.finished_message(&site.name));
}
