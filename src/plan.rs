//! Migration plans: the JSON configuration one relocation run works from.
//!
//! ```json
//! {
//!   "rules": [
//!     {"kind": "url", "search": "http://old.com", "replace": "https://new.com",
//!      "priority": 10, "scope": ["___!GLOBAL!___"]}
//!   ],
//!   "archive": {"home": "/var/www", "abs": "/var/www", "wpcontent": "...", ...},
//!   "target":  {"home": "/srv/site", "abs": "/srv/site", "wpcontent": "...", ...},
//!   "installType": "single_site",
//!   "uploadsOverrides": {"standalone": "/var/www/wp-content/uploads/sites/3"},
//!   "files": ["**/*.php", "**/.htaccess"]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RelocateError, RelocateResult};
use crate::paths::{ArchivePaths, InstallType, PathMapper, WpPaths};
use crate::replace::{RuleRecord, RuleRegistry};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    /// Rules in registry export format.
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
    #[serde(default)]
    pub archive: Option<ArchivePaths>,
    #[serde(default)]
    pub target: Option<WpPaths>,
    #[serde(default = "default_install_type")]
    pub install_type: String,
    /// Install type name → recorded uploads folder to relocate instead of
    /// the archive's uploads root.
    #[serde(default)]
    pub uploads_overrides: BTreeMap<String, String>,
    /// Include globs for the file rewrite pass.
    #[serde(default = "default_files")]
    pub files: Vec<String>,
}

fn default_install_type() -> String {
    InstallType::SingleSite.as_str().to_owned()
}

fn default_files() -> Vec<String> {
    vec!["**/*".to_owned()]
}

impl MigrationPlan {
    /// Read a plan from a JSON file.
    pub fn load(path: &Path) -> RelocateResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| RelocateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let plan = Self::from_json(&json)?;
        debug!(path = %path.display(), rules = plan.rules.len(), "migration plan loaded");
        Ok(plan)
    }

    pub fn from_json(json: &str) -> RelocateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// A fresh registry holding the plan's rules.
    pub fn registry(&self) -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry.import(self.rules.iter().cloned());
        registry
    }

    /// A path mapper for the plan's archive and target layouts.
    pub fn path_mapper(&self) -> RelocateResult<PathMapper> {
        let archive = self
            .archive
            .clone()
            .ok_or(RelocateError::IncompletePlan("archive"))?;
        let target = self
            .target
            .clone()
            .ok_or(RelocateError::IncompletePlan("target"))?;
        let install_type: InstallType = self.install_type.parse()?;

        self.uploads_overrides
            .iter()
            .try_fold(PathMapper::new(archive, target, install_type), |mapper, (name, uploads)| {
                let t: InstallType = name.parse()?;
                Ok(mapper.with_uploads_override(t, uploads.clone()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathsMapping;

    fn plan_json() -> serde_json::Value {
        serde_json::json!({
            "rules": [
                {"kind": "url", "search": "http://old.com", "replace": "https://new.com"},
                {"kind": "path", "search": "/var/www", "replace": "/srv/site", "scope": ["files"]}
            ],
            "archive": {
                "home": "/var/www", "abs": "/var/www",
                "wpcontent": "/var/www/wp-content",
                "plugins": "/var/www/wp-content/plugins",
                "muplugins": "/var/www/wp-content/mu-plugins",
                "uploads": "/var/www/wp-content/uploads"
            },
            "target": {
                "home": "/srv/site", "abs": "/srv/site",
                "wpcontent": "/srv/site/wp-content",
                "plugins": "/srv/site/wp-content/plugins",
                "muplugins": "/srv/site/wp-content/mu-plugins",
                "uploads": "/srv/site/wp-content/uploads"
            }
        })
    }

    #[test]
    fn test_defaults() {
        let plan = MigrationPlan::from_json("{}").expect("parse");
        assert!(plan.rules.is_empty());
        assert_eq!(plan.install_type, "single_site");
        assert_eq!(plan.files, ["**/*"]);
        assert!(matches!(plan.path_mapper(), Err(RelocateError::IncompletePlan("archive"))));
    }

    #[test]
    fn test_registry_and_mapper() {
        let plan = MigrationPlan::from_json(&plan_json().to_string()).expect("parse");

        let registry = plan.registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.rules_for(None, true, true).len(), 1);
        assert_eq!(registry.rules_for(Some("files"), true, true).len(), 2);

        let mut mapper = plan.path_mapper().expect("mapper");
        assert_eq!(
            mapper.paths_mapping(false).expect("mapping"),
            &PathsMapping::Single("/srv/site".to_owned())
        );
    }

    #[test]
    fn test_unknown_install_type() {
        let mut json = plan_json();
        json["installType"] = serde_json::json!("cluster");
        let plan = MigrationPlan::from_json(&json.to_string()).expect("parse");
        assert!(matches!(plan.path_mapper(), Err(RelocateError::UnknownInstallType(_))));
    }

    #[test]
    fn test_unknown_rule_kind_rejected() {
        let err = MigrationPlan::from_json(r#"{"rules":[{"kind":"regex","search":"a","replace":"b"}]}"#)
            .expect_err("must fail");
        assert!(matches!(err, RelocateError::Json(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MigrationPlan::load(Path::new("/nonexistent/site-relocate/plan.json"))
            .expect_err("must fail");
        assert!(matches!(err, RelocateError::Io { .. }));
    }
}
