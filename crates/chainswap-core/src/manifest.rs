//! Module: manifest
//! Responsibility: declarative TOML loading of engine settings and swapper
//! configurations.
//! Does not own: validation rules, which are the same as for an
//! interactive create (see `swapper`).

use crate::{
    chain::DEFAULT_MAX_CHAIN_DEPTH,
    env::Env,
    error::{Error, ErrorOrigin},
    swapper::{ConstraintDraft, SwapperDraft, SwapperId},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ManifestError
///

#[derive(Debug, ThisError)]
pub enum ManifestError {
    #[error("manifest parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("max_chain_depth must be at least 1")]
    ZeroChainDepth,
}

impl From<ManifestError> for Error {
    fn from(err: ManifestError) -> Self {
        Self::validation(ErrorOrigin::Manifest, err.to_string())
    }
}

///
/// Settings
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Prefix of bound action names and wizard titles.
    pub action_prefix: String,
    pub max_chain_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            action_prefix: "Chained swap".to_string(),
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }
}

///
/// SwapperEntry
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwapperEntry {
    pub name: String,
    pub model: String,
    pub field: String,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default, rename = "constraint")]
    pub constraints: Vec<ConstraintDraft>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub bind_action: bool,
}

impl SwapperEntry {
    #[must_use]
    pub fn to_draft(&self) -> SwapperDraft {
        SwapperDraft {
            name: self.name.clone(),
            model: self.model.clone(),
            field: self.field.clone(),
            chains: self.chains.clone(),
            constraints: self.constraints.clone(),
            groups: self.groups.clone(),
        }
    }
}

///
/// Manifest
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "swapper")]
    pub swappers: Vec<SwapperEntry>,
}

impl Manifest {
    pub fn from_toml(source: &str) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(source)?;
        if manifest.settings.max_chain_depth == 0 {
            return Err(ManifestError::ZeroChainDepth);
        }

        Ok(manifest)
    }
}

impl Env {
    /// Apply the manifest's settings and create its swappers, binding actions
    /// where requested. Nothing is kept if any entry fails.
    pub fn load_manifest(&mut self, manifest: Manifest) -> Result<Vec<SwapperId>, Error> {
        let swappers = self.swappers.clone();
        let actions = self.actions.clone();
        let settings = std::mem::replace(&mut self.settings, manifest.settings);

        match self.load_entries(&manifest.swappers) {
            Ok(ids) => {
                tracing::info!(swappers = ids.len(), "manifest loaded");
                Ok(ids)
            }
            Err(err) => {
                self.swappers = swappers;
                self.actions = actions;
                self.settings = settings;
                tracing::warn!(error = %err.display_with_class(), "manifest rejected");

                Err(err)
            }
        }
    }

    fn load_entries(&mut self, entries: &[SwapperEntry]) -> Result<Vec<SwapperId>, Error> {
        let mut ids = Vec::with_capacity(entries.len());

        for entry in entries {
            let id = self.create_swapper(entry.to_draft()).map_err(|err| {
                Error::new(
                    err.class,
                    err.origin,
                    format!("swapper '{}': {}", entry.name, err.message),
                )
            })?;
            if entry.bind_action {
                self.add_action(id)?;
            }
            ids.push(id);
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{self, PARTNER};

    fn env() -> Env {
        Env::new(demo::registry().unwrap()).unwrap()
    }

    #[test]
    fn demo_manifest_parses() {
        let manifest = Manifest::from_toml(demo::MANIFEST).unwrap();

        assert_eq!(manifest.settings, Settings::default());
        assert_eq!(manifest.swappers.len(), 1);

        let entry = &manifest.swappers[0];
        assert_eq!(entry.model, PARTNER);
        assert_eq!(entry.chains, ["child_ids.lang"]);
        assert_eq!(entry.constraints[0].name, "Only parent company");
        assert!(entry.bind_action);
    }

    #[test]
    fn settings_default_when_omitted() {
        let manifest = Manifest::from_toml("").unwrap();

        assert_eq!(manifest, Manifest::default());
        assert_eq!(manifest.settings.max_chain_depth, DEFAULT_MAX_CHAIN_DEPTH);
    }

    #[test]
    fn unknown_keys_and_zero_depth_are_rejected() {
        assert!(matches!(
            Manifest::from_toml("[settings]\nprefix = 'x'"),
            Err(ManifestError::Parse(_))
        ));
        assert!(matches!(
            Manifest::from_toml("[settings]\nmax_chain_depth = 0"),
            Err(ManifestError::ZeroChainDepth)
        ));
    }

    #[test]
    fn load_creates_and_binds() {
        let mut env = env();
        let ids = env
            .load_manifest(Manifest::from_toml(demo::MANIFEST).unwrap())
            .unwrap();

        let swapper = env.swapper(ids[0]).unwrap();
        assert_eq!(swapper.name(), "Language");
        let action = env.actions().get(swapper.action().unwrap()).unwrap();
        assert_eq!(action.name, "Chained swap: Language");
    }

    #[test]
    fn settings_drive_depth_and_prefix() {
        let mut env = env();
        let manifest = Manifest::from_toml(
            r#"
            [settings]
            action_prefix = "Cascade"
            max_chain_depth = 2

            [[swapper]]
            name = "Language"
            model = "res.partner"
            field = "lang"
            chains = ["child_ids.lang"]
            bind_action = true
            "#,
        )
        .unwrap();
        let ids = env.load_manifest(manifest).unwrap();

        let action = env.bound_actions(PARTNER, &[]);
        assert_eq!(action[0].name, "Cascade: Language");

        let err = env
            .write_swapper(
                ids[0],
                crate::swapper::SwapperPatch {
                    chains: Some(vec!["child_ids.parent_id.lang".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn failed_load_keeps_nothing() {
        let mut env = env();
        let manifest = Manifest::from_toml(
            r#"
            [settings]
            action_prefix = "Other"

            [[swapper]]
            name = "Good"
            model = "res.partner"
            field = "lang"
            bind_action = true

            [[swapper]]
            name = "Bad"
            model = "res.partner"
            field = "lang"
            chains = ["name.lang"]
            "#,
        )
        .unwrap();

        let err = env.load_manifest(manifest).unwrap_err();

        assert!(err.is_validation());
        assert!(err.message.contains("swapper 'Bad'"));
        assert!(env.swappers().is_empty());
        assert!(env.actions().is_empty());
        assert_eq!(env.settings(), &Settings::default());
    }
}
