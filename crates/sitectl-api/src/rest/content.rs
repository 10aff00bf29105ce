// Content management endpoints
//
// Base path: /content/management/api/v1.1/

use serde_json::json;
use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::rest::types::{BulkValidation, Collection, ContentItem, LocalizationPolicy, Repository};

const CONTENT: &str = "/content/management/api/v1.1";

const PAGE_LIMIT: &str = "500";

impl RestClient {
    pub async fn repositories(&self) -> Result<Vec<Repository>, Error> {
        let page: Collection<Repository> = self
            .get_with_params(
                &format!("{CONTENT}/repositories"),
                &[("limit", PAGE_LIMIT.into())],
            )
            .await?;
        Ok(page.items)
    }

    /// Find a repository by name, ignoring case.
    pub async fn repository_by_name(&self, name: &str) -> Result<Option<Repository>, Error> {
        Ok(self
            .repositories()
            .await?
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(name)))
    }

    pub async fn localization_policies(&self) -> Result<Vec<LocalizationPolicy>, Error> {
        let page: Collection<LocalizationPolicy> = self
            .get_with_params(
                &format!("{CONTENT}/localizationPolicies"),
                &[("limit", PAGE_LIMIT.into())],
            )
            .await?;
        Ok(page.items)
    }

    /// Every item published to or targeted at a channel.
    pub async fn channel_items(&self, channel_token: &str) -> Result<Vec<ContentItem>, Error> {
        let page: Collection<ContentItem> = self
            .get_with_params(
                &format!("{CONTENT}/items"),
                &[
                    ("channelToken", channel_token.to_owned()),
                    ("limit", PAGE_LIMIT.into()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    /// Check whether items could be published to a channel.
    pub async fn validate_channel_items(
        &self,
        channel_id: &str,
        item_ids: &[String],
    ) -> Result<BulkValidation, Error> {
        debug!(channel_id, count = item_ids.len(), "validating items");
        let q = item_ids
            .iter()
            .map(|id| format!("id eq \"{id}\""))
            .collect::<Vec<_>>()
            .join(" or ");
        let body = json!({
            "q": q,
            "operations": {
                "validatePublish": {
                    "channels": [{ "id": channel_id }]
                }
            }
        });
        self.post(&format!("{CONTENT}/bulkItemsOperations"), &body)
            .await
    }
}
