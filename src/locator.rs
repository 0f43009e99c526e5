//! Archive location derivation.
//!
//! Every module path maps to exactly one [`HostingConvention`]. Adding a new
//! host means adding a variant and a row to [`HOSTED`].

use crate::error::FetchError;

/// Known archive URL conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostingConvention {
    /// `https://github.com/<owner>/<repo>/archive/refs/tags/<version>.zip`
    GitHub,
    /// `https://gitlab.com/<owner>/<repo>/-/archive/<version>/<repo>-<version>.zip`
    GitLab,
    /// `https://<module path>/archive/<version>.zip`
    Generic,
}

/// Host prefixes with a dedicated convention
const HOSTED: &[(&str, HostingConvention)] = &[
    ("github.com/", HostingConvention::GitHub),
    ("gitlab.com/", HostingConvention::GitLab),
];

impl HostingConvention {
    /// Pick the convention for a module path
    pub fn for_module(module_path: &str) -> Self {
        HOSTED
            .iter()
            .find(|(prefix, _)| module_path.starts_with(prefix))
            .map(|&(_, convention)| convention)
            .unwrap_or(HostingConvention::Generic)
    }

    pub fn name(&self) -> &'static str {
        match self {
            HostingConvention::GitHub => "github",
            HostingConvention::GitLab => "gitlab",
            HostingConvention::Generic => "generic",
        }
    }

    /// Build the archive URL for a module version
    pub fn archive_url(&self, module_path: &str, version: &str) -> Result<String, FetchError> {
        match self {
            HostingConvention::GitHub => {
                let (owner, repo) = self.owner_repo(module_path)?;
                Ok(format!(
                    "https://github.com/{}/{}/archive/refs/tags/{}.zip",
                    owner, repo, version
                ))
            }
            HostingConvention::GitLab => {
                let (owner, repo) = self.owner_repo(module_path)?;
                Ok(format!(
                    "https://gitlab.com/{}/{}/-/archive/{}/{}-{}.zip",
                    owner, repo, version, repo, version
                ))
            }
            HostingConvention::Generic => {
                Ok(format!("https://{}/archive/{}.zip", module_path, version))
            }
        }
    }

    /// Second and third path segments. Subdirectory and major-version
    /// suffixes beyond them are ignored.
    fn owner_repo<'a>(&self, module_path: &'a str) -> Result<(&'a str, &'a str), FetchError> {
        let mut parts = module_path.split('/').skip(1);
        match (parts.next(), parts.next()) {
            (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => Ok((owner, repo)),
            _ => Err(FetchError::InvalidModulePath {
                convention: self.name(),
                path: module_path.to_string(),
            }),
        }
    }
}

/// Derive the archive URL for a module version
pub fn archive_url(module_path: &str, version: &str) -> Result<String, FetchError> {
    HostingConvention::for_module(module_path).archive_url(module_path, version)
}
