//! Install types: what kind of install the operator chose, which decides how
//! the uploads folder is mapped.

use std::fmt;
use std::str::FromStr;

use crate::error::RelocateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstallType {
    /// No choice made yet; mapping is refused.
    NotSet,
    SingleSite,
    SingleSiteOnSubdomain,
    SingleSiteOnSubfolder,
    RecoverySingleSite,
    MultisiteSubdomain,
    MultisiteSubfolder,
    /// One subsite of a multisite archive turned into a standalone site.
    Standalone,
    SubsiteOnSubdomain,
    SubsiteOnSubfolder,
}

impl InstallType {
    pub const ALL: [Self; 10] = [
        Self::NotSet,
        Self::SingleSite,
        Self::SingleSiteOnSubdomain,
        Self::SingleSiteOnSubfolder,
        Self::RecoverySingleSite,
        Self::MultisiteSubdomain,
        Self::MultisiteSubfolder,
        Self::Standalone,
        Self::SubsiteOnSubdomain,
        Self::SubsiteOnSubfolder,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotSet => "not_set",
            Self::SingleSite => "single_site",
            Self::SingleSiteOnSubdomain => "single_site_on_subdomain",
            Self::SingleSiteOnSubfolder => "single_site_on_subfolder",
            Self::RecoverySingleSite => "recovery_single_site",
            Self::MultisiteSubdomain => "multisite_subdomain",
            Self::MultisiteSubfolder => "multisite_subfolder",
            Self::Standalone => "standalone",
            Self::SubsiteOnSubdomain => "subsite_on_subdomain",
            Self::SubsiteOnSubfolder => "subsite_on_subfolder",
        }
    }

    /// `true` for install types that take a single subsite's uploads folder
    /// out of a multisite archive, so the recorded uploads root is not the
    /// right source.
    pub const fn uses_uploads_override(self) -> bool {
        matches!(
            self,
            Self::Standalone | Self::SubsiteOnSubdomain | Self::SubsiteOnSubfolder
        )
    }
}

impl fmt::Display for InstallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallType {
    type Err = RelocateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RelocateError::UnknownInstallType(s.to_owned()))
    }
}
