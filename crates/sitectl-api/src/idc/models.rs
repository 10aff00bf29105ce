// IDC service response types
//
// Every IDC service answers with `{ LocalData: {...}, ResultSets: {...} }`.
// `LocalData` carries the status envelope and scalar outputs; result sets
// are column-major tables (`fields` + `rows`) that we flatten into records.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One flattened result-set row, keyed by field name.
pub type Record = HashMap<String, String>;

/// Top-level IDC response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdcResponse {
    #[serde(rename = "LocalData", default)]
    pub local_data: LocalData,
    #[serde(rename = "ResultSets", default)]
    pub result_sets: HashMap<String, ResultSet>,
}

impl IdcResponse {
    /// Flatten a named result set into records. Missing sets yield no rows.
    pub fn records(&self, name: &str) -> Vec<Record> {
        self.result_sets
            .get(name)
            .map(ResultSet::records)
            .unwrap_or_default()
    }
}

/// The `LocalData` block. Scalar values arrive as strings from most
/// services, but some pods send numbers, so the typed fields accept both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalData {
    #[serde(rename = "StatusCode", default, deserialize_with = "lenient_string")]
    pub status_code: Option<String>,
    #[serde(rename = "StatusMessage", default)]
    pub status_message: Option<String>,
    #[serde(rename = "JobID", default, deserialize_with = "lenient_string")]
    pub job_id: Option<String>,
    #[serde(rename = "JobStatus", default)]
    pub job_status: Option<String>,
    #[serde(rename = "JobPercentage", default, deserialize_with = "lenient_string")]
    pub job_percentage: Option<String>,
    #[serde(rename = "JobMessage", default)]
    pub job_message: Option<String>,
    #[serde(rename = "dUser", default)]
    pub user: Option<String>,
    #[serde(rename = "idcToken", default)]
    pub idc_token: Option<String>,
    #[serde(rename = "ProductVersion", default)]
    pub product_version: Option<String>,
    #[serde(rename = "SiteValidation", default)]
    pub site_validation: Option<String>,
    #[serde(rename = "ImportConflicts", default, deserialize_with = "lenient_string")]
    pub import_conflicts: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl LocalData {
    /// `StatusCode` `"0"` is the only success sentinel.
    pub fn is_success(&self) -> bool {
        self.status_code.as_deref() == Some("0")
    }

    /// A best-effort human-readable message for a failed call.
    pub fn failure_message(&self) -> String {
        self.status_message
            .clone()
            .or_else(|| self.status_code.as_ref().map(|c| format!("StatusCode {c}")))
            .unwrap_or_else(|| "no status in response".into())
    }

    pub fn has_import_conflicts(&self) -> bool {
        self.import_conflicts
            .as_deref()
            .is_some_and(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
    }
}

/// A column-major IDC table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub fields: Vec<ResultField>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultField {
    pub name: String,
}

impl ResultSet {
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.fields
                    .iter()
                    .zip(row)
                    .map(|(field, value)| (field.name.clone(), value_to_string(value)))
                    .collect()
            })
            .collect()
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Typed views over records ────────────────────────────────────────

/// A site or template folder as listed by `SCS_BROWSE_SITES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdcSite {
    /// `fFolderGUID`
    pub id: String,
    /// `fFolderName`
    pub name: String,
    /// `xScsIsSiteActive == "1"`
    pub online: bool,
    /// `xScsSitePublishStatus == "published"`
    pub published: bool,
    /// `isEnterprise == "1"`
    pub enterprise: bool,
    /// Raw `xScsIsSecureSite` access code; empty or `"0"` means public.
    pub secure_site: Option<String>,
}

impl IdcSite {
    /// Build from a browse row. Rows without a GUID are skipped.
    pub fn from_record(record: &Record) -> Option<Self> {
        let id = record.get("fFolderGUID").filter(|v| !v.is_empty())?.clone();
        let name = record.get("fFolderName").cloned().unwrap_or_default();
        let flag = |key: &str, expected: &str| record.get(key).is_some_and(|v| v == expected);
        Some(Self {
            id,
            name,
            online: flag("xScsIsSiteActive", "1"),
            published: flag("xScsSitePublishStatus", "published"),
            enterprise: flag("isEnterprise", "1"),
            secure_site: record
                .get("xScsIsSecureSite")
                .filter(|v| !v.is_empty())
                .cloned(),
        })
    }
}

/// A conflict row from `ImportConflictsResultSet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportConflict {
    pub conflict: String,
    pub name: String,
    pub owner: String,
    pub resolution: String,
}

impl ImportConflict {
    pub fn from_record(record: &Record) -> Self {
        let field = |key: &str| record.get(key).cloned().unwrap_or_default();
        Self {
            conflict: field("conflict"),
            name: field("name"),
            owner: field("fCreatorLoginName"),
            resolution: field("resolution"),
        }
    }
}

impl std::fmt::Display for ImportConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} owned by {} {}",
            self.conflict, self.name, self.owner, self.resolution
        )
    }
}

// ── Site info file ──────────────────────────────────────────────────

/// Body of `SCS_GET_SITE_INFO_FILE` with `IsJson=1`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteInfoFile {
    #[serde(default)]
    pub base: Option<SiteInfoBase>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteInfoBase {
    #[serde(default)]
    pub properties: Option<SiteProperties>,
}

/// `base.properties` of a site or template info file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProperties {
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_enterprise: bool,
    #[serde(default)]
    pub localization_policy: Option<String>,
    #[serde(default)]
    pub default_language: Option<String>,
    #[serde(default)]
    pub channel_access_tokens: Vec<ChannelAccessToken>,
    #[serde(default)]
    pub repository_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelAccessToken {
    pub name: String,
    pub value: String,
}

// ── Site publish validation ─────────────────────────────────────────

/// `LocalData.SiteValidation` of `SCS_VALIDATE_SITE_PUBLISH`, itself a
/// JSON document encoded as a string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteValidation {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub valid: bool,
    #[serde(default)]
    pub pages: Vec<PageValidation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageValidation {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub publishable: bool,
    #[serde(default)]
    pub languages: Vec<LanguageValidation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageValidation {
    #[serde(default)]
    pub validation: String,
    #[serde(default)]
    pub policy_status: String,
    #[serde(default)]
    pub language: String,
}

// ── Lenient scalar decoding ─────────────────────────────────────────

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_status_code_is_accepted() {
        let resp: IdcResponse = serde_json::from_value(json!({
            "LocalData": { "StatusCode": 0, "JobID": 4711, "Extra": "kept" }
        }))
        .unwrap();
        assert!(resp.local_data.is_success());
        assert_eq!(resp.local_data.job_id.as_deref(), Some("4711"));
        assert_eq!(resp.local_data.extra["Extra"], "kept");
    }

    #[test]
    fn result_set_flattens_by_field_name() {
        let resp: IdcResponse = serde_json::from_value(json!({
            "LocalData": { "StatusCode": "0" },
            "ResultSets": {
                "SiteInfo": {
                    "fields": [{ "name": "fFolderGUID" }, { "name": "fFolderName" },
                               { "name": "xScsIsSiteActive" }, { "name": "xScsSitePublishStatus" }],
                    "rows": [["F1", "Blog", "1", "published"], ["", "Orphan", "0", ""]]
                }
            }
        }))
        .unwrap();

        let sites: Vec<IdcSite> = resp
            .records("SiteInfo")
            .iter()
            .filter_map(IdcSite::from_record)
            .collect();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "Blog");
        assert!(sites[0].online);
        assert!(sites[0].published);
        assert!(!sites[0].enterprise);
    }

    #[test]
    fn import_conflict_renders_owner_and_resolution() {
        let record: Record = [
            ("conflict", "theme"),
            ("name", "StarterTheme"),
            ("fCreatorLoginName", "alice"),
            ("resolution", "none"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        let conflict = ImportConflict::from_record(&record);
        assert_eq!(
            conflict.to_string(),
            "theme: StarterTheme owned by alice none"
        );
    }

    #[test]
    fn site_properties_accept_string_enterprise_flag() {
        let info: SiteInfoFile = serde_json::from_value(json!({
            "base": { "properties": {
                "siteName": "Blog",
                "isEnterprise": "true",
                "defaultLanguage": "en-US",
                "channelAccessTokens": [{ "name": "defaultToken", "value": "abc" }]
            }}
        }))
        .unwrap();
        let props = info.base.unwrap().properties.unwrap();
        assert!(props.is_enterprise);
        assert_eq!(props.channel_access_tokens[0].value, "abc");
    }
}
