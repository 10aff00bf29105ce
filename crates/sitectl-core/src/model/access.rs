// ── Site access descriptor ──
//
// Who may view a secure site once it is online. The legacy surface stores
// the selection as a small integer; only the eight combinations in
// `ACCESS_TABLE` exist there. The REST surface uses a list of strings.

use std::fmt;

use strum::{EnumIter, IntoEnumIterator};

use crate::error::CoreError;

/// One audience that can be allowed onto a secure site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum AccessGroup {
    CloudUsers,
    Visitors,
    ServiceUsers,
    SpecificUsers,
}

impl AccessGroup {
    /// Label as shown in the site security dialog.
    pub fn label(self) -> &'static str {
        match self {
            Self::CloudUsers => "Cloud users",
            Self::Visitors => "Visitors",
            Self::ServiceUsers => "Service users",
            Self::SpecificUsers => "Specific users",
        }
    }

    /// Value used by the REST `security.access` list.
    pub fn rest_value(self) -> &'static str {
        match self {
            Self::CloudUsers => "cloud",
            Self::Visitors => "visitors",
            Self::ServiceUsers => "service",
            Self::SpecificUsers => "named",
        }
    }

    /// Parse a dialog label or a REST value, ignoring case.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::iter().find(|g| {
            g.label().eq_ignore_ascii_case(raw) || g.rest_value().eq_ignore_ascii_case(raw)
        })
    }
}

impl fmt::Display for AccessGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

use AccessGroup::{CloudUsers, ServiceUsers, SpecificUsers, Visitors};

/// Legacy `xScsIsSecureSite` codes. Any code or combination outside this
/// table is rejected.
const ACCESS_TABLE: &[(u32, &[AccessGroup])] = &[
    (30, &[CloudUsers, Visitors, ServiceUsers, SpecificUsers]),
    (22, &[Visitors, ServiceUsers, SpecificUsers]),
    (6, &[Visitors, ServiceUsers]),
    (18, &[Visitors, SpecificUsers]),
    (20, &[ServiceUsers, SpecificUsers]),
    (2, &[Visitors]),
    (4, &[ServiceUsers]),
    (16, &[SpecificUsers]),
];

/// Code of a public site on the legacy surface.
pub const PUBLIC_ACCESS_CODE: u32 = 0;

/// REST access value of a public site.
pub const EVERYONE: &str = "everyone";

/// An ordered, duplicate-free set of access groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteAccess {
    groups: Vec<AccessGroup>,
}

impl SiteAccess {
    pub fn new(groups: impl IntoIterator<Item = AccessGroup>) -> Self {
        let mut groups: Vec<AccessGroup> = groups.into_iter().collect();
        groups.sort();
        groups.dedup();
        Self { groups }
    }

    /// Every group; the default for a site that is being secured.
    pub fn all() -> Self {
        Self::new(AccessGroup::iter())
    }

    /// Parse user-supplied labels such as `"Visitors,Specific users"`.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self, CoreError> {
        let mut groups = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            let group = AccessGroup::parse(label)
                .ok_or_else(|| CoreError::InvalidAccessSet(label.to_owned()))?;
            groups.push(group);
        }
        Ok(Self::new(groups))
    }

    /// Decode a legacy code. Codes outside the table are an error.
    pub fn from_code(code: u32) -> Result<Self, CoreError> {
        ACCESS_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, groups)| Self::new(groups.iter().copied()))
            .ok_or(CoreError::InvalidAccessCode(code))
    }

    /// Encode as a legacy code. Combinations outside the table are an error.
    pub fn code(&self) -> Result<u32, CoreError> {
        ACCESS_TABLE
            .iter()
            .find(|(_, groups)| *groups == self.groups.as_slice())
            .map(|(code, _)| *code)
            .ok_or_else(|| CoreError::InvalidAccessSet(self.to_string()))
    }

    /// REST values. Cloud users imply every other audience.
    pub fn rest_values(&self) -> Vec<String> {
        let groups = if self.contains(CloudUsers) {
            Self::all().groups
        } else {
            self.groups.clone()
        };
        groups.iter().map(|g| g.rest_value().to_owned()).collect()
    }

    /// Read a REST `security.access` list, ignoring values that are not
    /// audiences (such as `everyone`).
    pub fn from_rest_values<S: AsRef<str>>(values: &[S]) -> Self {
        Self::new(values.iter().filter_map(|v| AccessGroup::parse(v.as_ref())))
    }

    pub fn contains(&self, group: AccessGroup) -> bool {
        self.groups.contains(&group)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[AccessGroup] {
        &self.groups
    }
}

impl fmt::Display for SiteAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.groups.iter().map(|g| g.label()).collect();
        f.write_str(&labels.join(", "))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn every_table_entry_round_trips() {
        for (code, groups) in ACCESS_TABLE {
            let access = SiteAccess::from_code(*code).unwrap();
            assert_eq!(access.groups(), *groups);
            assert_eq!(access.code().unwrap(), *code);
        }
    }

    #[test]
    fn codes_outside_the_table_are_rejected() {
        for code in [0, 1, 8, 10, 14, 24, 26, 28, 31] {
            assert!(matches!(
                SiteAccess::from_code(code),
                Err(CoreError::InvalidAccessCode(c)) if c == code
            ));
        }
    }

    #[test]
    fn combinations_outside_the_table_are_rejected() {
        let cloud_only = SiteAccess::new([CloudUsers]);
        assert!(matches!(cloud_only.code(), Err(CoreError::InvalidAccessSet(_))));
        let partial_cloud = SiteAccess::new([CloudUsers, Visitors]);
        assert!(partial_cloud.code().is_err());
        assert!(SiteAccess::default().code().is_err());
    }

    #[test]
    fn labels_parse_in_any_order_and_case() {
        let access = SiteAccess::from_labels(&["specific users", "Visitors", "visitors"]).unwrap();
        assert_eq!(access.groups(), &[Visitors, SpecificUsers]);
        assert_eq!(access.code().unwrap(), 18);
        assert!(SiteAccess::from_labels(&["Robots"]).is_err());
    }

    #[test]
    fn cloud_users_imply_everyone_on_rest() {
        let access = SiteAccess::new([CloudUsers]);
        assert_eq!(
            access.rest_values(),
            vec!["cloud", "visitors", "service", "named"]
        );
        let access = SiteAccess::from_rest_values(&["visitors", "named", "everyone"]);
        assert_eq!(access.to_string(), "Visitors, Specific users");
    }
}
