// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use config::{Config, Manager};
use header::Locale;
use log::debug;
use serde::{Deserialize, Serialize};

/// Defaults read from `hdrtool.yaml`, system wide then per user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Do not let a lone epoch decide dependency comparisons
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nopromote: Option<bool>,
    /// Transaction color used to filter multilib files and provides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// Locale for translated strings, the environment is used otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl Config for Settings {
    fn domain() -> String {
        "hdrtool".to_owned()
    }

    fn merge(self, other: Self) -> Self {
        Self {
            nopromote: other.nopromote.or(self.nopromote),
            color: other.color.or(self.color),
            locale: other.locale.or(self.locale),
        }
    }
}

impl Settings {
    /// Load from `config_dir` when given, otherwise from `/` then the
    /// user's config directory
    pub fn load(config_dir: Option<&Path>) -> Self {
        let managers = match config_dir {
            Some(dir) => vec![Manager::custom(dir)],
            None => [Some(Manager::system("/", "hdrtool")), Manager::user("hdrtool").ok()]
                .into_iter()
                .flatten()
                .collect(),
        };

        let settings = managers
            .iter()
            .filter_map(Manager::load::<Self>)
            .reduce(Self::merge)
            .unwrap_or_default();
        debug!("Settings: {settings:?}");

        settings
    }

    pub fn nopromote(&self) -> bool {
        self.nopromote.unwrap_or(depset::DEFAULT_NOPROMOTE)
    }

    pub fn color(&self) -> u32 {
        self.color.unwrap_or(0)
    }

    pub fn locale(&self) -> Locale {
        match &self.locale {
            Some(locale) => Locale::new(locale),
            None => Locale::from_env(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.nopromote());
        assert_eq!(settings.color(), 0);
    }

    #[test]
    fn later_layers_win() {
        let system = Settings {
            nopromote: Some(false),
            color: Some(3),
            locale: None,
        };
        let user = Settings {
            nopromote: None,
            color: Some(2),
            locale: Some("de_DE".to_owned()),
        };

        let merged = system.merge(user);
        assert!(!merged.nopromote());
        assert_eq!(merged.color(), 2);
        assert_eq!(merged.locale(), Locale::new("de_DE"));
    }

    #[test]
    fn load_custom_dir() {
        let dir = std::env::temp_dir().join(format!("hdrtool-settings-{}", std::process::id()));
        let manager = Manager::custom(&dir);
        manager
            .save(
                "local",
                &Settings {
                    color: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();

        let settings = Settings::load(Some(&dir));
        assert_eq!(settings.color(), 1);
        assert!(settings.nopromote());

        fs_err::remove_dir_all(dir).unwrap();
    }
}
