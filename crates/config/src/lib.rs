// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Layered YAML configuration
//!
//! A config domain is read from `<domain>.yaml` and every `<domain>.d/*.yaml`
//! file of each layer of a scope, in order, and folded with
//! [`Config::merge`] so later layers win.

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use fs_err as fs;
use log::{debug, warn};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

const EXTENSION: &str = "yaml";

pub trait Config: DeserializeOwned {
    fn domain() -> String;

    fn merge(self, other: Self) -> Self;
}

#[derive(Debug, Clone)]
pub struct Manager {
    scope: Scope,
}

impl Manager {
    /// Config is loaded / merged from `usr/share` & `etc` relative to `root`
    /// and saved to `etc/{program}/{domain}.d/{name}.yaml`
    pub fn system(root: impl Into<PathBuf>, program: impl ToString) -> Self {
        Self {
            scope: Scope::System {
                root: root.into(),
                program: program.to_string(),
            },
        }
    }

    /// Config is loaded from $XDG_CONFIG_HOME and saved to
    /// $XDG_CONFIG_HOME/{program}/{domain}.d/{name}.yaml
    pub fn user(program: impl ToString) -> Result<Self, CreateUserError> {
        Ok(Self {
            scope: Scope::User {
                config: dirs::config_dir().ok_or(CreateUserError)?,
                program: program.to_string(),
            },
        })
    }

    /// Config is loaded from `path` and saved to
    /// `path`/{domain}.d/{name}.yaml
    pub fn custom(path: impl Into<PathBuf>) -> Self {
        Self {
            scope: Scope::Custom(path.into()),
        }
    }

    /// Merge every readable file of the domain. `None` when no layer has one.
    pub fn load<T: Config>(&self) -> Option<T> {
        let domain = T::domain();

        self.scope
            .layers()
            .into_iter()
            .flat_map(|layer| [layer.file(&domain)].into_iter().chain(enumerate_dir(&layer.dir(&domain))))
            .filter(|path| path.exists())
            .filter_map(|path| read_config(&path))
            .reduce(T::merge)
    }

    pub fn save<T: Config + Serialize>(&self, name: impl fmt::Display, config: &T) -> Result<(), SaveError> {
        let domain = T::domain();

        let dir = self.scope.save_dir(&domain);

        fs::create_dir_all(&dir).map_err(|io| SaveError::CreateDir(dir.clone(), io))?;

        let path = dir.join(format!("{name}.{EXTENSION}"));

        let serialized = serde_yaml::to_string(config)?;

        fs::write(&path, serialized).map_err(|io| SaveError::Write(path, io))?;

        Ok(())
    }

    pub fn delete<T: Config>(&self, name: impl fmt::Display) -> Result<(), io::Error> {
        let domain = T::domain();

        let path = self.scope.save_dir(&domain).join(format!("{name}.{EXTENSION}"));

        fs::remove_file(path)
    }
}

#[derive(Debug, Error)]
#[error("$HOME or $XDG_CONFIG_HOME env not set")]
pub struct CreateUserError;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("create config dir {0:?}")]
    CreateDir(PathBuf, #[source] io::Error),
    #[error("serialize config")]
    Yaml(#[from] serde_yaml::Error),
    #[error("write config file {0:?}")]
    Write(PathBuf, #[source] io::Error),
}

/// `.yaml` files of a drop-in directory in name order
fn enumerate_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return vec![];
    };

    let mut paths = read_dir
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();

            (extension == EXTENSION).then_some(path)
        })
        .collect::<Vec<_>>();
    paths.sort();
    paths
}

fn read_config<T: Config>(path: &Path) -> Option<T> {
    let bytes = fs::read(path).ok()?;

    match serde_yaml::from_slice(&bytes) {
        Ok(config) => {
            debug!("Loaded config {path:?}");
            Some(config)
        }
        Err(error) => {
            warn!("Ignoring invalid config {path:?}: {error}");
            None
        }
    }
}

#[derive(Debug, Clone)]
enum Scope {
    System { program: String, root: PathBuf },
    User { program: String, config: PathBuf },
    Custom(PathBuf),
}

impl Scope {
    fn save_dir(&self, domain: &str) -> PathBuf {
        match self {
            Scope::System { root, program } => Layer::System {
                root,
                base: SystemBase::Admin,
                program,
            },
            Scope::User { config, program } => Layer::User { config, program },
            Scope::Custom(dir) => Layer::Custom(dir),
        }
        .dir(domain)
    }

    /// Layers in merge order
    fn layers(&self) -> Vec<Layer<'_>> {
        match self {
            // Vendor first so admin overrides win
            Scope::System { root, program } => [SystemBase::Vendor, SystemBase::Admin]
                .into_iter()
                .map(|base| Layer::System { root, base, program })
                .collect(),
            Scope::User { config, program } => vec![Layer::User { config, program }],
            Scope::Custom(root) => vec![Layer::Custom(root)],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SystemBase {
    Admin,
    Vendor,
}

impl SystemBase {
    fn path(self) -> &'static str {
        match self {
            SystemBase::Admin => "etc",
            SystemBase::Vendor => "usr/share",
        }
    }
}

enum Layer<'a> {
    System {
        root: &'a Path,
        base: SystemBase,
        program: &'a str,
    },
    User {
        config: &'a Path,
        program: &'a str,
    },
    Custom(&'a Path),
}

impl Layer<'_> {
    fn config_dir(&self) -> PathBuf {
        match self {
            Layer::System { root, base, program } => root.join(base.path()).join(program),
            Layer::User { config, program } => config.join(program),
            Layer::Custom(dir) => dir.to_path_buf(),
        }
    }

    fn file(&self, domain: &str) -> PathBuf {
        self.config_dir().join(format!("{domain}.{EXTENSION}"))
    }

    fn dir(&self, domain: &str) -> PathBuf {
        self.config_dir().join(format!("{domain}.d"))
    }
}
