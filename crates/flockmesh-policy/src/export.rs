// export.rs — signed history export.
//
// The signing key itself is supplied by the caller — key management stays
// external. This module only computes the signature
// over the canonical serialization of the entries being exported.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde::{Deserialize, Serialize};

use crate::canonical::canonical_json;
use crate::error::PolicyError;
use crate::patch::PolicyPatchHistoryEntry;

/// `PolicyPatchHistoryExportPackage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyPatchHistoryExportPackage {
    pub entries: Vec<PolicyPatchHistoryEntry>,
    /// Base64-encoded Ed25519 signature over the canonical JSON of `entries`.
    pub signature: String,
    /// Base64-encoded Ed25519 public key, included so a verifier doesn't
    /// need an out-of-band copy.
    pub public_key: String,
}

/// Sign `entries`' canonical serialization with `signing_key`.
pub fn export_history(
    entries: &[PolicyPatchHistoryEntry],
    signing_key: &Ed25519KeyPair,
) -> PolicyPatchHistoryExportPackage {
    let canonical = canonical_json(&entries);
    let signature = signing_key.sign(canonical.as_bytes());

    PolicyPatchHistoryExportPackage {
        entries: entries.to_vec(),
        signature: BASE64.encode(signature.as_ref()),
        public_key: BASE64.encode(signing_key.public_key().as_ref()),
    }
}

/// Verify a `PolicyPatchHistoryExportPackage`'s signature against its own
/// embedded public key. Returns `Ok(())` on a valid signature.
pub fn verify_export(package: &PolicyPatchHistoryExportPackage) -> Result<(), PolicyError> {
    let public_key_bytes = BASE64
        .decode(&package.public_key)
        .map_err(|e| PolicyError::InvalidExportSignature(e.to_string()))?;
    let signature_bytes = BASE64
        .decode(&package.signature)
        .map_err(|e| PolicyError::InvalidExportSignature(e.to_string()))?;

    let public_key =
        ring::signature::UnparsedPublicKey::new(&ring::signature::ED25519, &public_key_bytes);
    let canonical = canonical_json(&package.entries);

    public_key
        .verify(canonical.as_bytes(), &signature_bytes)
        .map_err(|_| PolicyError::InvalidExportSignature("signature verification failed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ProfileName, UserId};
    use crate::profile::PolicyProfile;
    use chrono::{TimeZone, Utc};
    use ring::rand::SystemRandom;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn sample_entry() -> PolicyPatchHistoryEntry {
        let name = ProfileName::new("org_default").unwrap();
        let before = PolicyProfile::new(name.clone(), BTreeMap::new());
        let after = PolicyProfile::new(name.clone(), BTreeMap::new());
        PolicyPatchHistoryEntry {
            patch_id: Uuid::new_v4(),
            profile_name: name,
            before_hash: before.hash.clone(),
            after_hash: after.hash.clone(),
            before_snapshot: before,
            after_snapshot: after,
            actor_id: UserId::new("usr_admin0001").unwrap(),
            applied_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            rollback_of: None,
        }
    }

    fn generate_key() -> Ed25519KeyPair {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap()
    }

    #[test]
    fn export_round_trips_and_verifies() {
        let key = generate_key();
        let entries = vec![sample_entry()];
        let package = export_history(&entries, &key);

        assert!(verify_export(&package).is_ok());
    }

    #[test]
    fn tampering_with_entries_invalidates_signature() {
        let key = generate_key();
        let entries = vec![sample_entry()];
        let mut package = export_history(&entries, &key);

        package.entries[0].after_hash = "tampered".to_string();
        assert!(verify_export(&package).is_err());
    }
}
