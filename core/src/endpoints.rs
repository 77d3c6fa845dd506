//! Endpoint table mapping operation names to URL paths.

use std::collections::BTreeMap;
use std::fmt;

/// The remote operations the façade knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AddVersion,
    Cancel,
    DeleteProject,
    DeleteVersion,
    ListJobs,
    ListProjects,
    ListSpiders,
    ListVersions,
    Schedule,
}

impl Endpoint {
    pub const ALL: [Endpoint; 9] = [
        Endpoint::AddVersion,
        Endpoint::Cancel,
        Endpoint::DeleteProject,
        Endpoint::DeleteVersion,
        Endpoint::ListJobs,
        Endpoint::ListProjects,
        Endpoint::ListSpiders,
        Endpoint::ListVersions,
        Endpoint::Schedule,
    ];

    /// Key under which this operation is stored in an [`Endpoints`] table.
    pub fn key(self) -> &'static str {
        match self {
            Endpoint::AddVersion => "add_version",
            Endpoint::Cancel => "cancel",
            Endpoint::DeleteProject => "delete_project",
            Endpoint::DeleteVersion => "delete_version",
            Endpoint::ListJobs => "list_jobs",
            Endpoint::ListProjects => "list_projects",
            Endpoint::ListSpiders => "list_spiders",
            Endpoint::ListVersions => "list_versions",
            Endpoint::Schedule => "schedule",
        }
    }

    pub fn default_path(self) -> &'static str {
        match self {
            Endpoint::AddVersion => "/addversion.json",
            Endpoint::Cancel => "/cancel.json",
            Endpoint::DeleteProject => "/delproject.json",
            Endpoint::DeleteVersion => "/delversion.json",
            Endpoint::ListJobs => "/listjobs.json",
            Endpoint::ListProjects => "/listprojects.json",
            Endpoint::ListSpiders => "/listspiders.json",
            Endpoint::ListVersions => "/listversions.json",
            Endpoint::Schedule => "/schedule.json",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Operation name to path table. Starts from the defaults; overrides replace
/// single entries and may also add keys the façade does not use itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    paths: BTreeMap<String, String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            paths: Endpoint::ALL
                .iter()
                .map(|e| (e.key().to_string(), e.default_path().to_string()))
                .collect(),
        }
    }
}

impl Endpoints {
    /// Default table with `overrides` applied on top.
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut endpoints = Self::default();
        endpoints.extend(overrides);
        endpoints
    }

    pub fn set(&mut self, key: impl Into<String>, path: impl Into<String>) {
        self.paths.insert(key.into(), path.into());
    }

    pub fn extend<I, K, V>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, path) in overrides {
            self.set(key, path);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.paths.get(key).map(String::as_str)
    }
}
