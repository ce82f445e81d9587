// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

//! In-process stand-in for the remote key service.
//!
//! Instances register themselves under a name and are reachable through
//! `fake://<name>` endpoints. Key material and signatures are derived
//! deterministically from resource names, so the service needs no state
//! beyond the key catalog and results are reproducible across runs. The
//! material is shaped like the real thing (valid SPKI documents, ASN.1
//! ECDSA signatures) but is not cryptographically sound.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::kms::{KeyAlgorithm, KeyVersion, KmsClient};
use crate::spki;

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

static REGISTRY: Lazy<Mutex<HashMap<String, Arc<FakeKms>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Returns the registered instance backing a `fake://` endpoint
pub fn connect(instance: &str) -> Result<Arc<dyn KmsClient>> {
    let registry = match REGISTRY.lock() {
        Ok(r) => r,
        Err(_) => return Err(Error::internal("fake registry poisoned")),
    };
    match registry.get(instance) {
        Some(kms) => Ok(kms.clone() as Arc<dyn KmsClient>),
        None => Err(Error::failed_precondition(format!(
            "unknown fake kms instance {}",
            instance
        ))),
    }
}

#[derive(Debug)]
struct Catalog {
    /// key ring name to its versions
    key_rings: HashMap<String, Vec<KeyVersion>>,
    /// version name to its algorithm, for the data plane
    versions: HashMap<String, KeyAlgorithm>,
}

#[derive(Debug)]
pub struct FakeKms {
    name: String,
    catalog: Mutex<Catalog>,
}

impl FakeKms {
    /// Creates and registers a new instance under the given name
    pub fn new(name: &str) -> Arc<FakeKms> {
        let kms = Arc::new(FakeKms {
            name: name.to_string(),
            catalog: Mutex::new(Catalog {
                key_rings: HashMap::new(),
                versions: HashMap::new(),
            }),
        });
        if let Ok(mut registry) = REGISTRY.lock() {
            registry.insert(name.to_string(), kms.clone());
        }
        kms
    }

    /// The endpoint string that resolves back to this instance
    pub fn endpoint(&self) -> String {
        format!("fake://{}", self.name)
    }

    /// Creates an empty key ring
    pub fn create_key_ring(&self, name: &str) {
        if let Ok(mut catalog) = self.catalog.lock() {
            catalog.key_rings.entry(name.to_string()).or_default();
        }
    }

    /// Creates a key with one enabled version and returns the version
    /// resource name
    pub fn create_key(
        &self,
        key_ring: &str,
        key_id: &str,
        algorithm: KeyAlgorithm,
    ) -> Result<String> {
        let name =
            format!("{}/cryptoKeys/{}/cryptoKeyVersions/1", key_ring, key_id);
        let public_key = public_key_for(&name, algorithm)?;
        let mut catalog = match self.catalog.lock() {
            Ok(c) => c,
            Err(_) => return Err(Error::internal("fake catalog poisoned")),
        };
        catalog.versions.insert(name.clone(), algorithm);
        catalog
            .key_rings
            .entry(key_ring.to_string())
            .or_default()
            .push(KeyVersion {
                name: name.clone(),
                algorithm: algorithm,
                public_key: public_key,
            });
        Ok(name)
    }
}

impl KmsClient for FakeKms {
    fn list_key_versions(&self, key_ring: &str) -> Result<Vec<KeyVersion>> {
        let catalog = match self.catalog.lock() {
            Ok(c) => c,
            Err(_) => return Err(Error::internal("fake catalog poisoned")),
        };
        match catalog.key_rings.get(key_ring) {
            Some(versions) => Ok(versions.clone()),
            None => Err(Error::not_found(format!(
                "key ring {} does not exist",
                key_ring
            ))),
        }
    }

    fn asymmetric_sign(&self, version: &str, digest: &[u8]) -> Result<Vec<u8>> {
        let algorithm = self.version_algorithm(version)?;
        match algorithm.curve() {
            Some(curve) => {
                let size = curve.coord_size();
                let r = derive_bytes(&[version.as_bytes(), digest, b"r"], size);
                let s = derive_bytes(&[version.as_bytes(), digest, b"s"], size);
                spki::ecdsa_sig_from_raw(&r, &s)
            }
            None => {
                let size = algorithm.key_bits() / 8;
                let mut sig =
                    derive_bytes(&[version.as_bytes(), digest, b"sig"], size);
                // keep the value below the modulus
                sig[0] = 0x01;
                Ok(sig)
            }
        }
    }

    fn asymmetric_decrypt(
        &self,
        version: &str,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let _ = self.version_algorithm(version)?;
        Ok(derive_bytes(&[version.as_bytes(), ciphertext, b"pt"], 32))
    }
}

impl FakeKms {
    fn version_algorithm(&self, version: &str) -> Result<KeyAlgorithm> {
        let catalog = match self.catalog.lock() {
            Ok(c) => c,
            Err(_) => return Err(Error::internal("fake catalog poisoned")),
        };
        match catalog.versions.get(version) {
            Some(algorithm) => Ok(*algorithm),
            None => Err(Error::not_found(format!(
                "key version {} does not exist",
                version
            ))),
        }
    }
}

/// Expands the concatenated seed material into `len` bytes via chained
/// SHA-256 invocations
fn derive_bytes(seeds: &[&[u8]], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut counter: u32 = 0;
    while out.len() < len {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update(counter.to_be_bytes());
        out.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    out.truncate(len);
    out
}

fn public_key_for(name: &str, algorithm: KeyAlgorithm) -> Result<Vec<u8>> {
    match algorithm.curve() {
        Some(curve) => {
            let size = curve.coord_size();
            let x = derive_bytes(&[name.as_bytes(), b"x"], size);
            let y = derive_bytes(&[name.as_bytes(), b"y"], size);
            let mut point = Vec::with_capacity(1 + 2 * size);
            point.push(0x04);
            point.extend_from_slice(&x);
            point.extend_from_slice(&y);
            spki::spki_for_ec(curve, &point)
        }
        None => {
            let size = algorithm.key_bits() / 8;
            let mut modulus = derive_bytes(&[name.as_bytes(), b"n"], size);
            // full-width odd modulus
            modulus[0] |= 0x80;
            modulus[size - 1] |= 0x01;
            spki::spki_for_rsa(&modulus, &[0x01, 0x00, 0x01])
        }
    }
}
