// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - ATT&CK Technique Catalog

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::phase::KillChainPhase;
use crate::error::ConfigError;
use crate::network::Host;

const BUILTIN_TECHNIQUES: &str = include_str!("../resources/techniques.yaml");

/// Always used for a ping sweep.
pub const PING_SWEEP_TECHNIQUE: &str = "T1018";
/// Always used for a port scan.
pub const PORT_SCAN_TECHNIQUE: &str = "T1046";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomicTest {
    pub name: String,
    pub platforms: Vec<String>,
    pub executor: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub cleanup: Vec<String>,
}

impl AtomicTest {
    pub fn supports(&self, os: &str) -> bool {
        self.platforms.iter().any(|p| p.eq_ignore_ascii_case(os))
    }

    /// Prerequisites, then the test itself, then cleanup.
    pub fn command_sequence(&self) -> impl Iterator<Item = &str> {
        self.prerequisites
            .iter()
            .chain(&self.commands)
            .chain(&self.cleanup)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technique {
    pub mitre_id: String,
    pub name: String,
    pub kill_chain_phases: Vec<String>,
    #[serde(default)]
    pub cve_list: BTreeSet<String>,
    #[serde(default)]
    pub atomic_tests: Vec<AtomicTest>,
}

impl Technique {
    pub fn is_subtechnique(&self) -> bool {
        self.mitre_id.contains('.')
    }

    pub fn parent_technique(&self) -> &str {
        self.mitre_id.split('.').next().unwrap_or(&self.mitre_id)
    }

    /// Union of the platforms of every atomic test.
    pub fn supported_os(&self) -> BTreeSet<String> {
        self.atomic_tests
            .iter()
            .flat_map(|t| t.platforms.iter().map(|p| p.to_ascii_lowercase()))
            .collect()
    }

    pub fn covers_phase(&self, phase: KillChainPhase) -> bool {
        self.kill_chain_phases.iter().any(|p| p == phase.name())
    }

    /// Usable against `host` for `phase`: lists the phase, runs on the host's
    /// OS and shares at least one CVE with the host type.
    pub fn is_valid_for(&self, phase: KillChainPhase, host: &Host) -> bool {
        self.covers_phase(phase)
            && self.supported_os().contains(&host.os.to_ascii_lowercase())
            && !self.cve_list.is_disjoint(&host.host_type.cve_list)
    }

    /// A random atomic test that runs on `os`.
    pub fn choose_test(&self, os: &str, rng: &mut impl Rng) -> Option<&AtomicTest> {
        let tests: Vec<&AtomicTest> = self.atomic_tests.iter().filter(|t| t.supports(os)).collect();
        tests.choose(rng).copied()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechniqueCatalog {
    techniques: BTreeMap<String, Technique>,
}

#[derive(Deserialize)]
struct CatalogFile {
    techniques: Vec<Technique>,
}

impl TechniqueCatalog {
    /// # Errors
    /// [`ConfigError::Yaml`] on malformed input.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Ok(file.techniques.into_iter().collect())
    }

    /// # Errors
    /// Only if the embedded catalog is malformed.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml_str(BUILTIN_TECHNIQUES)
    }

    pub fn get(&self, mitre_id: &str) -> Option<&Technique> {
        self.techniques.get(mitre_id)
    }

    /// # Errors
    /// [`ConfigError::UnknownTechnique`] if the id is not in the catalog.
    pub fn require(&self, mitre_id: &str) -> Result<&Technique, ConfigError> {
        self.get(mitre_id)
            .ok_or_else(|| ConfigError::UnknownTechnique(mitre_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.techniques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }

    /// Ids of the techniques valid against `host` for `phase`.
    pub fn valid_techniques(&self, phase: KillChainPhase, host: &Host) -> Vec<String> {
        self.techniques
            .values()
            .filter(|t| t.is_valid_for(phase, host))
            .map(|t| t.mitre_id.clone())
            .collect()
    }

    /// Valid techniques for each of `phases` against `host`.
    pub fn validity_map(&self, host: &Host, phases: &[KillChainPhase]) -> BTreeMap<KillChainPhase, Vec<String>> {
        phases
            .iter()
            .map(|&phase| (phase, self.valid_techniques(phase, host)))
            .collect()
    }
}

impl FromIterator<Technique> for TechniqueCatalog {
    fn from_iter<I: IntoIterator<Item = Technique>>(iter: I) -> Self {
        Self {
            techniques: iter.into_iter().map(|t| (t.mitre_id.clone(), t)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::HostType;
    use crate::types::seeded_rng;

    fn host(type_name: &str, os: &str, cves: &[&str]) -> Host {
        let ty = HostType::new(type_name, os).with_cves(cves.iter().copied());
        Host::new("target", "subnet", ty, &mut seeded_rng(1))
    }

    #[test]
    fn builtin_catalog_has_sweep_and_scan() {
        let catalog = TechniqueCatalog::builtin().expect("test: builtin");
        assert!(catalog.get(PING_SWEEP_TECHNIQUE).is_some());
        assert!(catalog.get(PORT_SCAN_TECHNIQUE).is_some());
        assert!(catalog.len() >= 10);
    }

    #[test]
    fn validity_needs_phase_os_and_cve() {
        let catalog = TechniqueCatalog::builtin().expect("test: builtin");
        let linux = host("linux_server", "linux", &["CVE-2021-4034"]);
        let esc = catalog.valid_techniques(KillChainPhase::PrivilegeEscalation, &linux);
        assert_eq!(esc, vec!["T1068".to_string()]);

        // right CVE, wrong OS for every impact technique that lists it
        let odd = host("bsd_server", "freebsd", &["CVE-2021-4034"]);
        assert!(catalog.valid_techniques(KillChainPhase::Impact, &odd).is_empty());

        let unpatched_nothing = host("linux_server", "linux", &[]);
        assert!(catalog.valid_techniques(KillChainPhase::Discovery, &unpatched_nothing).is_empty());
    }

    #[test]
    fn subtechnique_parent() {
        let catalog = TechniqueCatalog::builtin().expect("test: builtin");
        let uac = catalog.get("T1548.002").expect("test: uac");
        assert!(uac.is_subtechnique());
        assert_eq!(uac.parent_technique(), "T1548");
        assert_eq!(uac.supported_os(), BTreeSet::from(["windows".to_string()]));
    }

    #[test]
    fn chosen_test_matches_os() {
        let catalog = TechniqueCatalog::builtin().expect("test: builtin");
        let sweep = catalog.get(PING_SWEEP_TECHNIQUE).expect("test: sweep");
        let mut rng = seeded_rng(4);
        let test = sweep.choose_test("linux", &mut rng).expect("test: linux test");
        assert!(test.supports("linux"));
        assert!(sweep.choose_test("plan9", &mut rng).is_none());
    }

    #[test]
    fn require_names_the_missing_technique() {
        let catalog = TechniqueCatalog::builtin().expect("test: builtin");
        assert!(catalog.require(PORT_SCAN_TECHNIQUE).is_ok());
        let err = catalog.require("T9999");
        assert!(matches!(err, Err(ConfigError::UnknownTechnique(ref id)) if id == "T9999"), "got {err:?}");
    }
}
