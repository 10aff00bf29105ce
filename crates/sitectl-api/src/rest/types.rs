// REST API request and response types
//
// Field names follow the server's camelCase JSON. Everything optional on
// the wire is `Option` or defaulted so partial `expand` results decode.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::poller::JobReport;

// ── Envelopes ────────────────────────────────────────────────────────

/// Paged collection wrapper used by every list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Problem-details style error body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Status document behind a `202 Accepted` job URL.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestJob {
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_percentage: Option<u32>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

impl RestJob {
    pub fn report(&self) -> JobReport {
        let error_message = || {
            self.error
                .as_ref()
                .and_then(|e| e.detail.clone().or_else(|| e.title.clone()))
        };
        match self.progress.as_deref() {
            Some("succeeded") => JobReport::complete(),
            Some("failed" | "aborted") => JobReport::failed(error_message()),
            _ if self.completed && self.error.is_some() => JobReport::failed(error_message()),
            _ if self.completed => JobReport::complete(),
            _ => JobReport::running(self.completed_percentage),
        }
    }
}

// ── Sites ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelToken {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ChannelToken {
    pub fn secret(&self) -> Option<&str> {
        self.token.as_deref().or(self.value.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub channel_tokens: Vec<ChannelToken>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteSecurity {
    #[serde(default)]
    pub access: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessMember {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessMembers {
    #[serde(default)]
    pub items: Vec<AccessMember>,
}

/// A site as returned by the sites management API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestSite {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub site_prefix: Option<String>,
    #[serde(default)]
    pub default_language: Option<String>,
    #[serde(default)]
    pub is_enterprise: bool,
    #[serde(default)]
    pub runtime_status: Option<String>,
    #[serde(default)]
    pub publish_status: Option<String>,
    #[serde(default)]
    pub repository: Option<Reference>,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub localization_policy: Option<Reference>,
    #[serde(default)]
    pub security: Option<SiteSecurity>,
    #[serde(default)]
    pub access: Option<AccessMembers>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_enterprise: bool,
    #[serde(default)]
    pub localization_policy: Option<Reference>,
}

/// Body of `POST /sites`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteRequest {
    pub name: String,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localization_policy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
}

// ── Content ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizationPolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required_values: Vec<String>,
    #[serde(default)]
    pub optional_values: Vec<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Response of a bulk `validatePublish` operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkValidation {
    #[serde(default)]
    pub operations: Option<BulkOperations>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperations {
    #[serde(default)]
    pub validate_publish: Option<ValidatePublish>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePublish {
    #[serde(default)]
    pub validation_results: Vec<ValidationResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    #[serde(default)]
    pub policy_validation: Option<PolicyValidation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyValidation {
    #[serde(default)]
    pub items: Vec<ItemValidation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemValidation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub validations: Vec<PublishValidation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishValidation {
    #[serde(default)]
    pub publishable: bool,
    #[serde(default)]
    pub results: Vec<ValidationMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMessage {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub message: String,
}

// ── Documents ────────────────────────────────────────────────────────

/// A user or group as the documents API reports it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocUser {
    pub id: String,
    #[serde(default)]
    pub login_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(rename = "type", default)]
    pub principal_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocGroup {
    #[serde(rename = "groupID")]
    pub group_id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderMember {
    pub user: DocUser,
    #[serde(default)]
    pub role: Option<String>,
}

/// Answer of a share or unshare call. `errorCode` `"0"` is success.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResult {
    #[serde(default, deserialize_with = "lenient_code")]
    pub error_code: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user: Option<DocUser>,
}

impl ShareResult {
    pub fn is_success(&self) -> bool {
        self.error_code == "0"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_code")]
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocFolder {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One child of a folder listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderItem {
    #[serde(rename = "type", default)]
    pub item_type: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl FolderItem {
    pub fn is_folder(&self) -> bool {
        self.item_type == "folder"
    }
}

/// Result of exporting a template to a zip in the documents store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateExport {
    pub file: DocFile,
}

fn lenient_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}
