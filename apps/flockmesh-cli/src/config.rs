// config.rs — loads a FlockMesh fixture workspace from a directory tree,
// mirroring `GatewayConfig::for_project`'s role in the ancestor: a single
// place that resolves on-disk paths into the in-memory handles the
// commands operate on.
//
// Expected layout, all optional (missing pieces fall back to empty/default):
//   <root>/policy/context.json          -> PolicyContext
//   <root>/policy/profiles/*.json       -> { "name": ..., "rules": {...} }
//   <root>/policy/admins/*.json         -> PolicyAdminConfig, set-union merged
//   <root>/policy/history.json          -> Vec<PolicyPatchHistoryEntry>
//   <root>/kits/*.kit.json              -> AgentKit (flockmesh_blueprint::kit)
//   <root>/connectors/*.json            -> ConnectorManifest
//   <root>/audit.jsonl                  -> hash-chained audit ledger

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use flockmesh_blueprint::{ConnectorId, ConnectorManifest, KitLibrary};
use flockmesh_policy::{
    CapabilityId, PolicyAdminConfig, PolicyContext, PolicyLibrary, PolicyLibraryHandle,
    PolicyPatchHistoryEntry, PolicyProfile, PolicyRule, ProfileName,
};

/// On-disk shape of a profile fixture file — `hash` is derived, not stored.
#[derive(Debug, Deserialize, Serialize)]
struct ProfileFixture {
    name: String,
    #[serde(default)]
    rules: BTreeMap<CapabilityId, PolicyRule>,
}

pub struct Workspace {
    pub root: PathBuf,
    pub policy_library: PolicyLibraryHandle,
    pub admin_config: PolicyAdminConfig,
    pub context: PolicyContext,
    pub kit_library: KitLibrary,
    pub manifests: HashMap<ConnectorId, ConnectorManifest>,
}

impl Workspace {
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let policy_library = PolicyLibraryHandle::new(load_profiles(&root.join("policy/profiles"))?);
        let admin_config = load_admin_configs(&root.join("policy/admins"))?;
        let context = load_context(&root.join("policy/context.json"))?;
        let kit_library = KitLibrary::load_dir(root.join("kits"))?;
        let manifests = load_manifests(&root.join("connectors"))?;

        Ok(Self {
            root,
            policy_library,
            admin_config,
            context,
            kit_library,
            manifests,
        })
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join("policy/history.json")
    }

    pub fn load_history(&self) -> Result<Vec<PolicyPatchHistoryEntry>> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save_history(&self, entries: &[PolicyPatchHistoryEntry]) -> Result<()> {
        let path = self.history_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(entries)?)
            .with_context(|| format!("writing {}", path.display()))
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join("audit.jsonl")
    }

    /// Persist `profile` back to its fixture file, so a patch/rollback
    /// survives the CLI process exiting.
    pub fn save_profile(&self, profile: &PolicyProfile) -> Result<()> {
        let dir = self.root.join("policy/profiles");
        fs::create_dir_all(&dir)?;
        let fixture = ProfileFixture {
            name: profile.name.to_string(),
            rules: profile.rules.clone(),
        };
        let path = dir.join(format!("{}.json", profile.name));
        fs::write(&path, serde_json::to_string_pretty(&fixture)?)
            .with_context(|| format!("writing {}", path.display()))
    }
}

fn load_profiles(dir: &Path) -> Result<PolicyLibrary> {
    let mut library = PolicyLibrary::new();
    if !dir.exists() {
        return Ok(library);
    }
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let fixture: ProfileFixture =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let name = ProfileName::new(fixture.name)?;
        let profile = PolicyProfile::new(name.clone(), fixture.rules);
        library.insert(name, profile);
    }
    Ok(library)
}

fn load_admin_configs(dir: &Path) -> Result<PolicyAdminConfig> {
    let mut merged = PolicyAdminConfig::default();
    if !dir.exists() {
        return Ok(merged);
    }
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let config: PolicyAdminConfig =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        merged.merge(config);
    }
    Ok(merged)
}

fn load_context(path: &Path) -> Result<PolicyContext> {
    if !path.exists() {
        anyhow::bail!(
            "no policy context fixture at {} (expected a PolicyContext JSON document)",
            path.display()
        );
    }
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn load_manifests(dir: &Path) -> Result<HashMap<ConnectorId, ConnectorManifest>> {
    let mut manifests = HashMap::new();
    if !dir.exists() {
        return Ok(manifests);
    }
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let manifest: ConnectorManifest =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        manifests.insert(manifest.connector_id.clone(), manifest);
    }
    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_directories_fall_back_to_empty() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("context_stub.json"),
            "{}",
        )
        .unwrap();
        // context.json itself is required, so write a minimal valid one.
        fs::create_dir_all(dir.path().join("policy")).unwrap();
        fs::write(
            dir.path().join("policy/context.json"),
            serde_json::json!({
                "org_policy": "org_default",
                "workspace_policy": "org_default",
                "agent_policy": "org_default",
                "run_override": null
            })
            .to_string(),
        )
        .unwrap();

        let workspace = Workspace::load(dir.path()).unwrap();
        assert!(workspace.policy_library.snapshot().is_empty());
        assert!(workspace.manifests.is_empty());
        assert_eq!(workspace.kit_library.all().count(), 2);
    }

    #[test]
    fn loads_a_profile_fixture() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("policy/profiles")).unwrap();
        fs::write(
            dir.path().join("policy/profiles/org_default.json"),
            serde_json::json!({
                "name": "org_default",
                "rules": {
                    "message.send": {"decision": "escalate", "required_approvals": 1}
                }
            })
            .to_string(),
        )
        .unwrap();
        fs::write(
            dir.path().join("policy/context.json"),
            serde_json::json!({
                "org_policy": "org_default",
                "workspace_policy": "org_default",
                "agent_policy": "org_default",
                "run_override": null
            })
            .to_string(),
        )
        .unwrap();

        let workspace = Workspace::load(dir.path()).unwrap();
        let snapshot = workspace.policy_library.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&ProfileName::new("org_default").unwrap()));
    }
}
