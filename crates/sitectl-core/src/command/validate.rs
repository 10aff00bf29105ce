// Validate a site and the assets on its channel for publishing.

use serde::Serialize;

use sitectl_api::RestClient;
use sitectl_api::idc::SiteValidation;
use sitectl_api::rest::types::BulkValidation;

use crate::collab::Reporter;
use crate::controller::SiteController;
use crate::error::CoreError;
use crate::session::with_relay;

const DEFAULT_TOKEN: &str = "defaultToken";

/// Publish readiness of a site's pages and its channel's assets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub site: String,
    pub site_valid: bool,
    /// Pages that cannot be published.
    pub pages: Vec<PageReport>,
    /// `None` when the channel has no assets.
    pub assets: Option<Vec<AssetValidation>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub name: String,
    /// `<validation> <policyStatus> language <language>` per language.
    pub languages: Vec<String>,
}

/// An asset that cannot be published.
#[derive(Debug, Clone, Serialize)]
pub struct AssetValidation {
    pub name: String,
    pub item_type: String,
    pub language: Option<String>,
    pub results: Vec<AssetResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetResult {
    pub item_id: String,
    pub valid: bool,
    pub message: String,
}

fn row(label: &str, value: &str) -> String {
    format!("  {label:<12} : {value}")
}

impl ValidationReport {
    pub fn assets_valid(&self) -> bool {
        self.assets.as_ref().is_none_or(Vec::is_empty)
    }

    /// Both validation trees as printable lines.
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![
            "Site Validation:".to_owned(),
            format!("  is valid: {}", self.site_valid),
        ];
        if !self.site_valid {
            for page in &self.pages {
                lines.push(row("page name", &page.name));
                for (i, language) in page.languages.iter().enumerate() {
                    lines.push(row(if i == 0 { "languages" } else { " " }, language));
                }
            }
        }

        lines.push("Assets Validation:".to_owned());
        match &self.assets {
            None => lines.push("  no assets".to_owned()),
            Some(assets) if assets.is_empty() => lines.push("  is valid: true".to_owned()),
            Some(assets) => {
                for asset in assets {
                    lines.push(row("name", &asset.name));
                    lines.push(row("type", &asset.item_type));
                    lines.push(row("language", asset.language.as_deref().unwrap_or("")));
                    for result in &asset.results {
                        lines.push(row("item id", &result.item_id));
                        lines.push(row("valid", &result.valid.to_string()));
                        lines.push(row("message", &result.message));
                    }
                    lines.push(String::new());
                }
            }
        }
        lines
    }
}

/// Where the site's assets live.
struct ChannelFacts {
    repository_id: Option<String>,
    channel_id: String,
    channel_token: String,
    default_language: String,
}

pub(crate) async fn validate_site(
    ctl: &SiteController,
    name: &str,
) -> Result<ValidationReport, CoreError> {
    let reporter = ctl.reporter();
    let rest = ctl.connection().rest_client()?;

    let (facts, site_validation) = if ctl.connection().uses_rest() {
        let site = rest
            .get_site(name, &["channel", "repository"])
            .await?
            .ok_or_else(|| CoreError::not_found("site", name))?;
        require_enterprise(name, site.is_enterprise)?;
        let default_language = require_language(name, site.default_language)?;
        let tokens: Vec<(String, String)> = site
            .channel
            .iter()
            .flat_map(|c| c.channel_tokens.iter())
            .filter_map(|t| t.secret().map(|s| (t.name.clone(), s.to_owned())))
            .collect();
        let facts = ChannelFacts {
            repository_id: site.repository.map(|r| r.id),
            channel_id: site.channel.map(|c| c.id).unwrap_or_default(),
            channel_token: pick_token(&tokens),
            default_language,
        };
        report_site(reporter, &facts);
        let validation = rest.validate_site(name).await?;
        (facts, validation)
    } else {
        with_relay(ctl.connection(), reporter, |s| async move {
            reporter.step("establish user session");
            let site = s
                .idc
                .find_site(name)
                .await?
                .ok_or_else(|| CoreError::not_found("site", name))?;
            require_enterprise(name, site.enterprise)?;

            let info = s.idc.site_info(name).await?;
            if info.site_name.is_none() {
                return Err(CoreError::Api {
                    message: "failed to get site info".into(),
                    status: None,
                });
            }
            let default_language = require_language(name, info.default_language)?;
            let tokens: Vec<(String, String)> = info
                .channel_access_tokens
                .into_iter()
                .map(|t| (t.name, t.value))
                .collect();
            let facts = ChannelFacts {
                repository_id: info.repository_id,
                channel_id: info.channel_id.unwrap_or_default(),
                channel_token: pick_token(&tokens),
                default_language,
            };
            report_site(reporter, &facts);
            let validation = s.idc.validate_site_publish(&site.id).await?;
            Ok((facts, validation))
        })
        .await?
    };

    let mut report = site_report(name, &site_validation);
    report.assets = validate_assets(&rest, &facts).await?;
    Ok(report)
}

fn require_enterprise(name: &str, enterprise: bool) -> Result<(), CoreError> {
    if enterprise {
        Ok(())
    } else {
        Err(CoreError::invalid_state(format!(
            "site {name} is not an enterprise site"
        )))
    }
}

fn require_language(name: &str, language: Option<String>) -> Result<String, CoreError> {
    language.filter(|l| !l.is_empty()).ok_or_else(|| {
        CoreError::invalid_state(format!(
            "site {name} is not configured with a default language"
        ))
    })
}

/// The `defaultToken`, else the first token.
fn pick_token(tokens: &[(String, String)]) -> String {
    tokens
        .iter()
        .find(|(name, _)| name == DEFAULT_TOKEN)
        .or_else(|| tokens.first())
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

fn report_site(reporter: &dyn Reporter, facts: &ChannelFacts) {
    reporter.step("get site");
    reporter.info(&format!(
        "   repository: {}",
        facts.repository_id.as_deref().unwrap_or("")
    ));
    reporter.info(&format!("   channel: {}", facts.channel_id));
    reporter.info(&format!("   channelToken: {}", facts.channel_token));
    reporter.info(&format!("   defaultLanguage: {}", facts.default_language));
}

fn site_report(name: &str, validation: &SiteValidation) -> ValidationReport {
    ValidationReport {
        site: name.to_owned(),
        site_valid: validation.valid,
        pages: validation
            .pages
            .iter()
            .filter(|p| !p.publishable)
            .map(|p| PageReport {
                name: p.name.clone(),
                languages: p
                    .languages
                    .iter()
                    .map(|l| {
                        format!("{} {} language {}", l.validation, l.policy_status, l.language)
                    })
                    .collect(),
            })
            .collect(),
        assets: None,
    }
}

async fn validate_assets(
    rest: &RestClient,
    facts: &ChannelFacts,
) -> Result<Option<Vec<AssetValidation>>, CoreError> {
    let items = rest.channel_items(&facts.channel_token).await?;
    if items.is_empty() {
        return Ok(None);
    }
    let ids: Vec<String> = items.into_iter().map(|i| i.id).collect();
    let validation = rest.validate_channel_items(&facts.channel_id, &ids).await?;
    Ok(asset_failures(validation))
}

fn asset_failures(validation: BulkValidation) -> Option<Vec<AssetValidation>> {
    let results = validation.operations?.validate_publish?.validation_results;
    let mut failures = Vec::new();
    for item in results
        .into_iter()
        .filter_map(|r| r.policy_validation)
        .flat_map(|p| p.items)
    {
        for check in item.validations.iter().filter(|v| !v.publishable) {
            failures.push(AssetValidation {
                name: item.name.clone(),
                item_type: item.item_type.clone(),
                language: item.language.clone(),
                results: check
                    .results
                    .iter()
                    .map(|r| AssetResult {
                        item_id: r.item_id.clone(),
                        valid: r.valid,
                        message: r.message.clone(),
                    })
                    .collect(),
            });
        }
    }
    Some(failures)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn default_token_wins_over_first() {
        let tokens = vec![
            ("other".to_owned(), "a".to_owned()),
            (DEFAULT_TOKEN.to_owned(), "b".to_owned()),
        ];
        assert_eq!(pick_token(&tokens), "b");
        assert_eq!(pick_token(&tokens[..1]), "a");
        assert_eq!(pick_token(&[]), "");
    }

    #[test]
    fn renders_failing_pages_and_assets() {
        let validation: SiteValidation = serde_json::from_value(json!({
            "valid": false,
            "pages": [
                { "name": "home", "publishable": true, "languages": [] },
                { "name": "about", "publishable": false, "languages": [
                    { "validation": "missing", "policyStatus": "required", "language": "fr-FR" },
                    { "validation": "missing", "policyStatus": "required", "language": "de-DE" }
                ]}
            ]
        }))
        .unwrap();
        let bulk: BulkValidation = serde_json::from_value(json!({
            "operations": { "validatePublish": { "validationResults": [{
                "policyValidation": { "items": [{
                    "id": "CORE1", "name": "Banner", "type": "Image", "language": "en-US",
                    "validations": [{ "publishable": false, "results": [
                        { "itemId": "CORE1", "valid": false, "message": "missing fr-FR" }
                    ]}]
                }]}
            }]}}
        }))
        .unwrap();

        let mut report = site_report("blog", &validation);
        report.assets = asset_failures(bulk);
        assert!(!report.assets_valid());

        let rendered = report.render().join("\n");
        insta::assert_snapshot!(rendered.trim_end(), @r"
        Site Validation:
          is valid: false
          page name    : about
          languages    : missing required language fr-FR
                       : missing required language de-DE
        Assets Validation:
          name         : Banner
          type         : Image
          language     : en-US
          item id      : CORE1
          valid        : false
          message      : missing fr-FR
        ");
    }

    #[test]
    fn empty_channel_reports_no_assets() {
        let report = ValidationReport {
            site: "blog".into(),
            site_valid: true,
            ..ValidationReport::default()
        };
        assert_eq!(
            report.render(),
            vec![
                "Site Validation:",
                "  is valid: true",
                "Assets Validation:",
                "  no assets"
            ]
        );
    }
}
