// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

//! Contract with the remote key management service.
//!
//! The provider core only talks to the service through the [`KmsClient`]
//! trait; transports are resolved from the configured endpoint. The
//! `fake` scheme yields an in-process service with deterministic key
//! material, used by the test suite and local development.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pkcs11::*;
use crate::spki::EcCurve;

pub mod fake;

/// The asymmetric algorithms a key version can carry, mirroring the
/// subset of the remote service's algorithm catalog this module
/// supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    RsaSignPkcs2048,
    RsaSignPkcs3072,
    RsaSignPkcs4096,
    RsaSignPss2048,
    RsaSignPss3072,
    RsaSignPss4096,
    RsaDecryptOaep2048,
    RsaDecryptOaep3072,
    RsaDecryptOaep4096,
    EcSignP256,
    EcSignP384,
}

/// What a key version may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    Sign,
    Decrypt,
}

impl KeyAlgorithm {
    pub fn purpose(&self) -> KeyPurpose {
        match self {
            KeyAlgorithm::RsaDecryptOaep2048
            | KeyAlgorithm::RsaDecryptOaep3072
            | KeyAlgorithm::RsaDecryptOaep4096 => KeyPurpose::Decrypt,
            _ => KeyPurpose::Sign,
        }
    }

    pub fn key_type(&self) -> CK_KEY_TYPE {
        match self.curve() {
            Some(_) => CKK_EC,
            None => CKK_RSA,
        }
    }

    pub fn curve(&self) -> Option<EcCurve> {
        match self {
            KeyAlgorithm::EcSignP256 => Some(EcCurve::P256),
            KeyAlgorithm::EcSignP384 => Some(EcCurve::P384),
            _ => None,
        }
    }

    pub fn key_bits(&self) -> usize {
        match self {
            KeyAlgorithm::RsaSignPkcs2048
            | KeyAlgorithm::RsaSignPss2048
            | KeyAlgorithm::RsaDecryptOaep2048 => 2048,
            KeyAlgorithm::RsaSignPkcs3072
            | KeyAlgorithm::RsaSignPss3072
            | KeyAlgorithm::RsaDecryptOaep3072 => 3072,
            KeyAlgorithm::RsaSignPkcs4096
            | KeyAlgorithm::RsaSignPss4096
            | KeyAlgorithm::RsaDecryptOaep4096 => 4096,
            KeyAlgorithm::EcSignP256 => 256,
            KeyAlgorithm::EcSignP384 => 384,
        }
    }

    /// The one PKCS#11 mechanism a key of this algorithm works with
    pub fn mechanism(&self) -> CK_MECHANISM_TYPE {
        match self {
            KeyAlgorithm::RsaSignPkcs2048
            | KeyAlgorithm::RsaSignPkcs3072
            | KeyAlgorithm::RsaSignPkcs4096 => CKM_RSA_PKCS,
            KeyAlgorithm::RsaSignPss2048
            | KeyAlgorithm::RsaSignPss3072
            | KeyAlgorithm::RsaSignPss4096 => CKM_RSA_PKCS_PSS,
            KeyAlgorithm::RsaDecryptOaep2048
            | KeyAlgorithm::RsaDecryptOaep3072
            | KeyAlgorithm::RsaDecryptOaep4096 => CKM_RSA_PKCS_OAEP,
            KeyAlgorithm::EcSignP256 | KeyAlgorithm::EcSignP384 => CKM_ECDSA,
        }
    }

    /// Length in bytes of a signature produced by this algorithm, in
    /// the form handed back through the PKCS#11 interface
    pub fn signature_size(&self) -> usize {
        match self.curve() {
            Some(curve) => 2 * curve.coord_size(),
            None => self.key_bits() / 8,
        }
    }
}

/// One enabled key version inside a remote key ring
#[derive(Debug, Clone)]
pub struct KeyVersion {
    /// Full resource name of the version, e.g.
    /// `projects/p/locations/l/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1`
    pub name: String,
    pub algorithm: KeyAlgorithm,
    /// DER encoded SubjectPublicKeyInfo of the version's public half
    pub public_key: Vec<u8>,
}

impl KeyVersion {
    /// The short key identifier, used as the object label
    pub fn key_id(&self) -> &str {
        let mut components = self.name.split('/');
        while let Some(c) = components.next() {
            if c == "cryptoKeys" {
                match components.next() {
                    Some(id) => return id,
                    None => break,
                }
            }
        }
        &self.name
    }
}

/// Synchronous client interface to the remote key service.
///
/// Calls block the calling thread; the provider never spawns threads of
/// its own.
pub trait KmsClient: Debug + Send + Sync {
    /// Lists the enabled key versions of a key ring
    fn list_key_versions(&self, key_ring: &str) -> Result<Vec<KeyVersion>>;

    /// Signs a message digest with the named key version.
    ///
    /// ECDSA signatures come back in ASN.1 form and are converted at
    /// the PKCS#11 boundary.
    fn asymmetric_sign(&self, version: &str, digest: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts a ciphertext with the named key version
    fn asymmetric_decrypt(
        &self,
        version: &str,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;
}

/// Resolves a client for the configured endpoint.
///
/// The gRPC transport to a real service is provided by the embedding
/// distribution; this crate only ships the in-process fake.
pub fn connect(
    endpoint: &str,
    _use_insecure_credentials: bool,
) -> Result<Arc<dyn KmsClient>> {
    if let Some(instance) = endpoint.strip_prefix("fake://") {
        return fake::connect(instance);
    }
    Err(Error::unimplemented(format!(
        "no transport available for endpoint {}",
        endpoint
    )))
}
