// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Shared Action State

//! Named containers declared once in the action catalog and handed to every
//! action that lists them. Cleared on environment reset.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_ISOLATE_SIZE: usize = 10;

/// Bounded list of (decoy, subnet) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolateData {
    pub size: usize,
    decoys: Vec<(String, String)>,
}

impl IsolateData {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            decoys: Vec::new(),
        }
    }

    /// False when the list is full.
    pub fn append_decoy(&mut self, decoy: &str, subnet: &str) -> bool {
        if self.decoys.len() >= self.size {
            return false;
        }
        self.decoys.push((decoy.to_string(), subnet.to_string()));
        true
    }

    pub fn get(&self, i: usize) -> Option<(&str, &str)> {
        self.decoys.get(i).map(|(d, s)| (d.as_str(), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.decoys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoys.is_empty()
    }

    pub fn clear(&mut self) {
        self.decoys.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedContainer {
    List(Vec<String>),
    Set(BTreeSet<String>),
    Dict(BTreeMap<String, String>),
    Isolate(IsolateData),
}

impl SharedContainer {
    pub fn kind(&self) -> &'static str {
        match self {
            SharedContainer::List(_) => "list",
            SharedContainer::Set(_) => "set",
            SharedContainer::Dict(_) => "dict",
            SharedContainer::Isolate(_) => "IsolateData",
        }
    }

    /// Record a name. Dicts key it to the empty string.
    pub fn insert(&mut self, item: &str) -> bool {
        match self {
            SharedContainer::List(v) => {
                v.push(item.to_string());
                true
            }
            SharedContainer::Set(s) => s.insert(item.to_string()),
            SharedContainer::Dict(m) => m.insert(item.to_string(), String::new()).is_none(),
            SharedContainer::Isolate(_) => false,
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        match self {
            SharedContainer::List(v) => v.iter().any(|x| x == item),
            SharedContainer::Set(s) => s.contains(item),
            SharedContainer::Dict(m) => m.contains_key(item),
            SharedContainer::Isolate(d) => d.decoys.iter().any(|(h, _)| h == item),
        }
    }

    /// Drop the first occurrence. Returns whether anything was removed.
    pub fn remove(&mut self, item: &str) -> bool {
        match self {
            SharedContainer::List(v) => match v.iter().position(|x| x == item) {
                Some(i) => {
                    v.remove(i);
                    true
                }
                None => false,
            },
            SharedContainer::Set(s) => s.remove(item),
            SharedContainer::Dict(m) => m.remove(item).is_some(),
            SharedContainer::Isolate(d) => match d.decoys.iter().position(|(h, _)| h == item) {
                Some(i) => {
                    d.decoys.remove(i);
                    true
                }
                None => false,
            },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SharedContainer::List(v) => v.len(),
            SharedContainer::Set(s) => s.len(),
            SharedContainer::Dict(m) => m.len(),
            SharedContainer::Isolate(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match self {
            SharedContainer::List(v) => v.clear(),
            SharedContainer::Set(s) => s.clear(),
            SharedContainer::Dict(m) => m.clear(),
            SharedContainer::Isolate(d) => d.clear(),
        }
    }

    pub fn as_isolate_mut(&mut self) -> Option<&mut IsolateData> {
        match self {
            SharedContainer::Isolate(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_isolate(&self) -> Option<&IsolateData> {
        match self {
            SharedContainer::Isolate(d) => Some(d),
            _ => None,
        }
    }
}

/// One container, shared by every action that declared it.
pub type SharedData = Rc<RefCell<SharedContainer>>;

// ─── Declarations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomDataArgs {
    #[serde(default)]
    pub size: Option<usize>,
}

/// `list`, `set`, `dict`, or `{class: IsolateData, args: {size}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SharedDataDecl {
    Builtin(String),
    Custom {
        class: String,
        #[serde(default)]
        args: CustomDataArgs,
    },
}

impl SharedDataDecl {
    /// # Errors
    /// [`ConfigError::UnknownSharedDataKind`] for anything else.
    pub fn build(&self) -> Result<SharedData, ConfigError> {
        let container = match self {
            SharedDataDecl::Builtin(kind) => match kind.as_str() {
                "list" => SharedContainer::List(Vec::new()),
                "set" => SharedContainer::Set(BTreeSet::new()),
                "dict" => SharedContainer::Dict(BTreeMap::new()),
                other => return Err(ConfigError::UnknownSharedDataKind(other.to_string())),
            },
            SharedDataDecl::Custom { class, args } => match class.as_str() {
                "IsolateData" => SharedContainer::Isolate(IsolateData::new(args.size.unwrap_or(DEFAULT_ISOLATE_SIZE))),
                other => return Err(ConfigError::UnknownSharedDataKind(other.to_string())),
            },
        };
        Ok(Rc::new(RefCell::new(container)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolate_data_is_bounded() {
        let mut data = IsolateData::new(2);
        assert!(data.append_decoy("a", "dmz"));
        assert!(data.append_decoy("b", "dmz"));
        assert!(!data.append_decoy("c", "dmz"));
        assert_eq!(data.get(1), Some(("b", "dmz")));
        data.clear();
        assert!(data.is_empty());
    }

    #[test]
    fn declarations_parse_from_yaml() {
        let yaml = "a: list\nb: set\nc:\n  class: IsolateData\n  args:\n    size: 3\n";
        let decls: BTreeMap<String, SharedDataDecl> = serde_yaml::from_str(yaml).expect("test: yaml");
        let c = decls["c"].build().expect("test: build");
        assert_eq!(c.borrow().as_isolate().map(|d| d.size), Some(3));
        assert_eq!(decls["b"].build().expect("test: build").borrow().kind(), "set");
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        let err = SharedDataDecl::Builtin("queue".into()).build();
        assert!(matches!(err, Err(ConfigError::UnknownSharedDataKind(ref k)) if k == "queue"), "expected UnknownSharedDataKind, got {err:?}");
    }

    #[test]
    fn list_semantics() {
        let mut list = SharedContainer::List(Vec::new());
        list.insert("h1");
        list.insert("h1");
        assert_eq!(list.len(), 2);
        assert!(list.remove("h1"));
        assert!(list.contains("h1"));
        list.clear();
        assert!(list.is_empty());
    }
}
