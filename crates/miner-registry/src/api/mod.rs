//! npm registry and downloads API response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full package document from the npm registry.
///
/// Only the fields the miner inspects are typed; everything else is kept
/// verbatim in `rest` so the stored record holds the whole document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PackageDocument {
    /// Document id (the package name)
    #[serde(rename = "_id")]
    pub id: String,
    /// Source repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryField>,
    /// Version (and created/modified) to timestamp
    #[serde(default)]
    pub time: Map<String, Value>,
    /// Remaining document fields
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl PackageDocument {
    /// Repository URL, whichever shape the document uses
    pub fn repository_url(&self) -> Option<&str> {
        self.repository.as_ref().and_then(RepositoryField::url)
    }

    /// Repository URL if it points at GitHub
    pub fn github_url(&self) -> Option<&str> {
        self.repository_url().filter(|url| url.contains("://github.com"))
    }

    /// String values of the `time` map
    pub fn publish_times(&self) -> impl Iterator<Item = &str> {
        self.time.values().filter_map(Value::as_str)
    }
}

/// `repository` field: a bare URL string or a `{type, url}` object
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RepositoryField {
    /// Shorthand string form
    Url(String),
    /// Object form
    Detailed {
        /// Repository type (usually "git")
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        repo_type: Option<String>,
        /// Repository URL
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        /// Package directory inside a monorepo
        #[serde(default, skip_serializing_if = "Option::is_none")]
        directory: Option<String>,
    },
    /// Anything else published in the wild
    Other(Value),
}

impl RepositoryField {
    /// Repository URL, if one is present
    pub fn url(&self) -> Option<&str> {
        match self {
            RepositoryField::Url(url) => Some(url),
            RepositoryField::Detailed { url, .. } => url.as_deref(),
            RepositoryField::Other(_) => None,
        }
    }
}

/// Point download count over a period
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DownloadsPoint {
    /// Total downloads in the period
    pub downloads: u64,
    /// First day of the period
    pub start: String,
    /// Last day of the period
    pub end: String,
    /// Package name
    pub package: String,
}

/// Body returned by the downloads API
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DownloadsResponse {
    /// Counts for the requested period
    Point(DownloadsPoint),
    /// The API had no data for the package or period
    Missing {
        /// API error message
        error: String,
    },
}

impl DownloadsResponse {
    /// Counts, or the API's reason for having none
    pub fn into_point(self) -> Result<DownloadsPoint, String> {
        match self {
            DownloadsResponse::Point(point) => Ok(point),
            DownloadsResponse::Missing { error } => Err(error),
        }
    }
}
