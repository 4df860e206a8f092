//! Content-hash-verified loading of circuit verifying keys.
//!
//! Each circuit's verifying key is read from disk and checked against a
//! blake3 digest recorded in the manifest before it is trusted, so a
//! tampered or stale artifact on the filesystem is refused rather than
//! silently loaded.

use crate::circuit::Circuit;
use crate::error::ProvingError;
use ark_bn254::Bn254;
use ark_groth16::{prepare_verifying_key, PreparedVerifyingKey, VerifyingKey};
use ark_serialize::CanonicalDeserialize;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// One circuit's entry in the manifest: where its verifying key lives, and
/// the digest it must hash to.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    /// Path to the verifying key file, relative to the manifest's directory.
    pub path: String,
    /// Hex-encoded blake3 digest of the verifying key's canonical bytes.
    pub blake3: String,
}

/// The manifest of verifying-key artifacts for every fixed circuit.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// The client-side ballot proof's verifying key.
    pub ballot: ManifestEntry,
    /// The recursive aggregation circuit's verifying key.
    pub aggregation: ManifestEntry,
    /// The state-transition circuit's verifying key.
    pub state_transition: ManifestEntry,
    /// The results circuit's verifying key.
    pub results: ManifestEntry,
}

impl Manifest {
    fn entry(&self, circuit: Circuit) -> &ManifestEntry {
        match circuit {
            Circuit::Ballot => &self.ballot,
            Circuit::Aggregation => &self.aggregation,
            Circuit::StateTransition => &self.state_transition,
            Circuit::Results => &self.results,
        }
    }
}

/// Loaded, content-verified verifying keys for every fixed circuit, ready
/// for [`crate::verify`].
pub struct ArtifactStore {
    verifying_keys: HashMap<Circuit, PreparedVerifyingKey<Bn254>>,
}

impl ArtifactStore {
    /// Load and verify every circuit's verifying key named by the manifest
    /// at `manifest_path`. Artifact paths are resolved relative to the
    /// manifest's own directory.
    pub fn load(manifest_path: impl AsRef<Path>) -> Result<Self, ProvingError> {
        let manifest_path = manifest_path.as_ref();
        let manifest_bytes = std::fs::read(manifest_path).map_err(|source| ProvingError::Io {
            path: manifest_path.display().to_string(),
            source,
        })?;
        let manifest_text = String::from_utf8_lossy(&manifest_bytes);
        let manifest: Manifest = toml::from_str(&manifest_text).map_err(|e| ProvingError::Malformed {
            path: manifest_path.display().to_string(),
            reason: e.to_string(),
        })?;
        let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));

        let mut verifying_keys = HashMap::new();
        for circuit in [
            Circuit::Ballot,
            Circuit::Aggregation,
            Circuit::StateTransition,
            Circuit::Results,
        ] {
            let vk = load_entry(base_dir, manifest.entry(circuit))?;
            verifying_keys.insert(circuit, prepare_verifying_key(&vk));
        }

        Ok(Self { verifying_keys })
    }

    /// Build a store directly from already-validated verifying keys,
    /// bypassing disk/manifest loading. Used by tests and by callers that
    /// fetch artifacts from a different source (e.g. embedded bytes).
    pub fn from_verifying_keys(keys: HashMap<Circuit, VerifyingKey<Bn254>>) -> Self {
        Self {
            verifying_keys: keys
                .into_iter()
                .map(|(circuit, vk)| (circuit, prepare_verifying_key(&vk)))
                .collect(),
        }
    }

    /// The prepared verifying key for `circuit`.
    pub fn verifying_key(
        &self,
        circuit: Circuit,
    ) -> Result<&PreparedVerifyingKey<Bn254>, ProvingError> {
        self.verifying_keys
            .get(&circuit)
            .ok_or(ProvingError::UnknownCircuit(circuit))
    }
}

fn load_entry(base_dir: &Path, entry: &ManifestEntry) -> Result<VerifyingKey<Bn254>, ProvingError> {
    let path = base_dir.join(&entry.path);
    let bytes = std::fs::read(&path).map_err(|source| ProvingError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let actual = blake3::hash(&bytes).to_hex().to_string();
    if actual != entry.blake3 {
        return Err(ProvingError::HashMismatch {
            path: path.display().to_string(),
            expected: entry.blake3.clone(),
            actual,
        });
    }

    VerifyingKey::<Bn254>::deserialize_compressed(&bytes[..]).map_err(|e| ProvingError::Malformed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::pairing::Pairing;
    use ark_groth16::Groth16;
    use ark_serialize::CanonicalSerialize;
    use ark_snark::CircuitSpecificSetupSNARK;
    use ark_std::test_rng;

    #[derive(Clone)]
    struct TrivialCircuit;

    impl ark_relations::r1cs::ConstraintSynthesizer<<Bn254 as Pairing>::ScalarField> for TrivialCircuit {
        fn generate_constraints(
            self,
            _cs: ark_relations::r1cs::ConstraintSystemRef<<Bn254 as Pairing>::ScalarField>,
        ) -> ark_relations::r1cs::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn tampered_artifact_bytes_are_rejected() {
        let mut rng = test_rng();
        let (_pk, vk) = Groth16::<Bn254>::setup(TrivialCircuit, &mut rng).unwrap();

        let mut bytes = Vec::new();
        vk.serialize_compressed(&mut bytes).unwrap();
        let real_hash = blake3::hash(&bytes).to_hex().to_string();

        let dir = tempfile::tempdir().unwrap();
        let vk_path = dir.path().join("ballot.vk");
        std::fs::write(&vk_path, &bytes).unwrap();

        let manifest_path = dir.path().join("manifest.toml");
        let manifest = format!(
            "[ballot]\npath = \"ballot.vk\"\nblake3 = \"{}\"\n\
             [aggregation]\npath = \"ballot.vk\"\nblake3 = \"{}\"\n\
             [state_transition]\npath = \"ballot.vk\"\nblake3 = \"{}\"\n\
             [results]\npath = \"ballot.vk\"\nblake3 = \"wrong-hash\"\n",
            real_hash, real_hash, real_hash
        );
        std::fs::write(&manifest_path, manifest).unwrap();

        let result = ArtifactStore::load(&manifest_path);
        assert!(matches!(result, Err(ProvingError::HashMismatch { .. })));
    }

    #[test]
    fn well_formed_manifest_loads_every_circuit() {
        let mut rng = test_rng();
        let (_pk, vk) = Groth16::<Bn254>::setup(TrivialCircuit, &mut rng).unwrap();

        let mut bytes = Vec::new();
        vk.serialize_compressed(&mut bytes).unwrap();
        let hash = blake3::hash(&bytes).to_hex().to_string();

        let dir = tempfile::tempdir().unwrap();
        let vk_path = dir.path().join("ballot.vk");
        std::fs::write(&vk_path, &bytes).unwrap();

        let manifest_path = dir.path().join("manifest.toml");
        let manifest = format!(
            "[ballot]\npath = \"ballot.vk\"\nblake3 = \"{hash}\"\n\
             [aggregation]\npath = \"ballot.vk\"\nblake3 = \"{hash}\"\n\
             [state_transition]\npath = \"ballot.vk\"\nblake3 = \"{hash}\"\n\
             [results]\npath = \"ballot.vk\"\nblake3 = \"{hash}\"\n",
        );
        std::fs::write(&manifest_path, manifest).unwrap();

        let store = ArtifactStore::load(&manifest_path).unwrap();
        assert!(store.verifying_key(Circuit::Ballot).is_ok());
        assert!(store.verifying_key(Circuit::Results).is_ok());
    }
}
