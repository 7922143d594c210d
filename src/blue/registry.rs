// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Action Registry

//! Static name → factory table for defender actions. The catalog refers to
//! implementations by these names only.

use std::collections::BTreeMap;

use super::action::{BlueAction, TargetKind};
use super::actions::{
    DecoyConfig, DeployDecoyHost, IsolateDecoy, IsolateDecoyHost, IsolateHost, Nothing, QuarantineHost,
    ReconnectHost, RemoveDecoyHost, RemoveQuarantineHost, Restore,
};
use super::shared::SharedData;
use crate::error::ConfigError;

/// Everything a factory needs to build one catalog entry.
pub struct ActionDecl<'a> {
    pub name: &'a str,
    pub configs: &'a serde_yaml::Value,
    /// Only the containers this action declared.
    pub shared: &'a BTreeMap<String, SharedData>,
}

impl ActionDecl<'_> {
    fn decoy_config(&self) -> Result<DecoyConfig, ConfigError> {
        if self.configs.is_null() {
            return Ok(DecoyConfig::default());
        }
        Ok(serde_yaml::from_value(self.configs.clone())?)
    }

    fn shared(&self, key: &str, kind: &'static str) -> Result<Option<SharedData>, ConfigError> {
        let Some(data) = self.shared.get(key) else {
            return Ok(None);
        };
        let found = data.borrow().kind();
        let compatible = match kind {
            "IsolateData" => found == "IsolateData",
            _ => found != "IsolateData",
        };
        if !compatible {
            return Err(ConfigError::InvalidValue {
                key: format!("{}.shared_data.{key}", self.name),
                reason: format!("expected {kind}, found {found}"),
            });
        }
        Ok(Some(data.clone()))
    }

    fn required_shared(&self, key: &str, kind: &'static str) -> Result<SharedData, ConfigError> {
        self.shared(key, kind)?.ok_or_else(|| ConfigError::UnknownSharedData {
            action: self.name.to_string(),
            name: key.to_string(),
        })
    }
}

type Factory = fn(&ActionDecl<'_>) -> BuildResult;

pub struct RegistryEntry {
    pub class: &'static str,
    pub target: TargetKind,
    factory: Factory,
}

impl RegistryEntry {
    /// # Errors
    /// Bad `configs` or missing / mistyped shared data.
    pub fn build(&self, decl: &ActionDecl<'_>) -> Result<Box<dyn BlueAction>, ConfigError> {
        (self.factory)(decl)
    }
}

const DECOY_LIST: &str = "decoy_list";
const QUARANTINE_LIST: &str = "quarantine_list";
const ISOLATE_DATA: &str = "isolate_data";

type BuildResult = Result<Box<dyn BlueAction>, ConfigError>;

fn deploy_decoy_host(decl: &ActionDecl<'_>) -> BuildResult {
    let host_type = decl.decoy_config()?.host_type().map_err(|e| invalid_configs(decl, e))?;
    Ok(Box::new(DeployDecoyHost::new(host_type, decl.shared(DECOY_LIST, "list")?)))
}

fn remove_decoy_host(decl: &ActionDecl<'_>) -> BuildResult {
    Ok(Box::new(RemoveDecoyHost::new(decl.shared(DECOY_LIST, "list")?)))
}

fn isolate_decoy_host(decl: &ActionDecl<'_>) -> BuildResult {
    let host_type = decl.decoy_config()?.host_type().map_err(|e| invalid_configs(decl, e))?;
    Ok(Box::new(IsolateDecoyHost::new(host_type, decl.shared(ISOLATE_DATA, "IsolateData")?)))
}

fn isolate_decoy(decl: &ActionDecl<'_>) -> BuildResult {
    Ok(Box::new(IsolateDecoy::new(decl.required_shared(ISOLATE_DATA, "IsolateData")?)))
}

fn isolate_host(_: &ActionDecl<'_>) -> BuildResult {
    Ok(Box::new(IsolateHost))
}

fn reconnect_host(_: &ActionDecl<'_>) -> BuildResult {
    Ok(Box::new(ReconnectHost))
}

fn quarantine_host(decl: &ActionDecl<'_>) -> BuildResult {
    Ok(Box::new(QuarantineHost::new(decl.shared(QUARANTINE_LIST, "list")?)))
}

fn remove_quarantine_host(decl: &ActionDecl<'_>) -> BuildResult {
    Ok(Box::new(RemoveQuarantineHost::new(decl.shared(QUARANTINE_LIST, "list")?)))
}

fn restore(_: &ActionDecl<'_>) -> BuildResult {
    Ok(Box::new(Restore))
}

fn nothing(_: &ActionDecl<'_>) -> BuildResult {
    Ok(Box::new(Nothing))
}

static REGISTRY: [RegistryEntry; 10] = [
    RegistryEntry { class: "DeployDecoyHost", target: TargetKind::Subnet, factory: deploy_decoy_host },
    RegistryEntry { class: "RemoveDecoyHost", target: TargetKind::Subnet, factory: remove_decoy_host },
    RegistryEntry { class: "IsolateDecoyHost", target: TargetKind::Subnet, factory: isolate_decoy_host },
    RegistryEntry { class: "IsolateDecoy", target: TargetKind::Range, factory: isolate_decoy },
    RegistryEntry { class: "IsolateHost", target: TargetKind::Host, factory: isolate_host },
    RegistryEntry { class: "ReconnectHost", target: TargetKind::Host, factory: reconnect_host },
    RegistryEntry { class: "QuarantineHost", target: TargetKind::Host, factory: quarantine_host },
    RegistryEntry { class: "RemoveQuarantineHost", target: TargetKind::Host, factory: remove_quarantine_host },
    RegistryEntry { class: "Restore", target: TargetKind::Host, factory: restore },
    RegistryEntry { class: "Nothing", target: TargetKind::Standalone, factory: nothing },
];

fn invalid_configs(decl: &ActionDecl<'_>, err: crate::network::NetworkError) -> ConfigError {
    ConfigError::InvalidValue {
        key: format!("{}.configs", decl.name),
        reason: err.to_string(),
    }
}

/// # Errors
/// [`ConfigError::UnknownActionClass`] if nothing is registered under `class`.
pub fn lookup(class: &str) -> Result<&'static RegistryEntry, ConfigError> {
    REGISTRY
        .iter()
        .find(|e| e.class == class)
        .ok_or_else(|| ConfigError::UnknownActionClass(class.to_string()))
}

pub fn classes() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|e| e.class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blue::shared::SharedDataDecl;

    #[test]
    fn every_reference_class_is_registered() {
        let names: Vec<_> = classes().collect();
        assert_eq!(names.len(), 10);
        for class in ["DeployDecoyHost", "IsolateDecoy", "RemoveQuarantineHost", "Nothing"] {
            assert!(names.contains(&class), "missing {class}");
        }
    }

    #[test]
    fn unknown_class_is_a_config_error() {
        let err = lookup("LaunchMissiles");
        assert!(matches!(err, Err(ConfigError::UnknownActionClass(_))), "expected UnknownActionClass");
    }

    #[test]
    fn isolate_decoy_requires_its_data() {
        let entry = lookup("IsolateDecoy").expect("test: entry");
        let shared = BTreeMap::new();
        let configs = serde_yaml::Value::Null;
        let decl = ActionDecl {
            name: "isolate_decoy",
            configs: &configs,
            shared: &shared,
        };
        let err = entry.build(&decl);
        assert!(matches!(err, Err(ConfigError::UnknownSharedData { .. })), "expected UnknownSharedData, got {err:?}");
    }

    #[test]
    fn mistyped_shared_data_is_rejected() {
        let entry = lookup("IsolateDecoy").expect("test: entry");
        let shared = BTreeMap::from([(
            ISOLATE_DATA.to_string(),
            SharedDataDecl::Builtin("list".into()).build().expect("test: list"),
        )]);
        let configs = serde_yaml::Value::Null;
        let decl = ActionDecl {
            name: "isolate_decoy",
            configs: &configs,
            shared: &shared,
        };
        let err = entry.build(&decl);
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })), "expected InvalidValue, got {err:?}");
    }

    #[test]
    fn decoy_configs_are_parsed() {
        let entry = lookup("DeployDecoyHost").expect("test: entry");
        let configs: serde_yaml::Value =
            serde_yaml::from_str("decoy_type: server\nservices:\n  - name: ssh\n    port: 22\n").expect("test: yaml");
        let shared = BTreeMap::new();
        let decl = ActionDecl {
            name: "deploy_decoy",
            configs: &configs,
            shared: &shared,
        };
        let action = entry.build(&decl).expect("test: build");
        assert_eq!(action.target_kind(), TargetKind::Subnet);
        assert_eq!(action.class(), "DeployDecoyHost");
    }
}
