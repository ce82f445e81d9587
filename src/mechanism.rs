// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

use std::collections::BTreeMap;

use crate::error::Result;
use crate::kms::KeyAlgorithm;
use crate::pkcs11::*;

use once_cell::sync::Lazy;

static REGISTRY: Lazy<Mechanisms> = Lazy::new(Mechanisms::supported);

/// The process-wide mechanism registry
pub fn registry() -> &'static Mechanisms {
    &REGISTRY
}

/// The mechanism registry: a static mapping from mechanism code to its
/// key-size bounds and capability flags. Enumeration follows ascending
/// mechanism codes.
#[derive(Debug)]
pub struct Mechanisms {
    tree: BTreeMap<CK_MECHANISM_TYPE, CK_MECHANISM_INFO>,
}

impl Mechanisms {
    /// The set supported against the remote service
    pub fn supported() -> Mechanisms {
        let mut tree = BTreeMap::new();
        tree.insert(
            CKM_RSA_PKCS,
            CK_MECHANISM_INFO {
                ulMinKeySize: 2048,
                ulMaxKeySize: 4096,
                flags: CKF_SIGN,
            },
        );
        tree.insert(
            CKM_RSA_PKCS_PSS,
            CK_MECHANISM_INFO {
                ulMinKeySize: 2048,
                ulMaxKeySize: 4096,
                flags: CKF_SIGN,
            },
        );
        tree.insert(
            CKM_RSA_PKCS_OAEP,
            CK_MECHANISM_INFO {
                ulMinKeySize: 2048,
                ulMaxKeySize: 4096,
                flags: CKF_DECRYPT,
            },
        );
        tree.insert(
            CKM_ECDSA,
            CK_MECHANISM_INFO {
                ulMinKeySize: 256,
                ulMaxKeySize: 384,
                flags: CKF_SIGN
                    | CKF_EC_F_P
                    | CKF_EC_NAMEDCURVE
                    | CKF_EC_UNCOMPRESS,
            },
        );
        Mechanisms { tree: tree }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn list(&self) -> Vec<CK_MECHANISM_TYPE> {
        self.tree.keys().cloned().collect()
    }

    pub fn info(&self, typ: CK_MECHANISM_TYPE) -> Result<&CK_MECHANISM_INFO> {
        match self.tree.get(&typ) {
            Some(info) => Ok(info),
            None => Err(CKR_MECHANISM_INVALID)?,
        }
    }
}

/// Checks that a mechanism can start a signing operation with a key of
/// the given algorithm
pub fn validate_sign(
    mechanisms: &Mechanisms,
    mech: CK_MECHANISM_TYPE,
    algorithm: KeyAlgorithm,
) -> Result<()> {
    let info = mechanisms.info(mech)?;
    if info.flags & CKF_SIGN == 0 {
        return Err(CKR_MECHANISM_INVALID)?;
    }
    if mechanism_key_type(mech) != algorithm.key_type() {
        return Err(CKR_KEY_TYPE_INCONSISTENT)?;
    }
    if algorithm.mechanism() != mech {
        return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
    }
    Ok(())
}

/// Checks that a mechanism can start a decryption operation with a key
/// of the given algorithm
pub fn validate_decrypt(
    mechanisms: &Mechanisms,
    mech: CK_MECHANISM_TYPE,
    algorithm: KeyAlgorithm,
) -> Result<()> {
    let info = mechanisms.info(mech)?;
    if info.flags & CKF_DECRYPT == 0 {
        return Err(CKR_MECHANISM_INVALID)?;
    }
    if mechanism_key_type(mech) != algorithm.key_type() {
        return Err(CKR_KEY_TYPE_INCONSISTENT)?;
    }
    if algorithm.mechanism() != mech {
        return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
    }
    Ok(())
}

fn mechanism_key_type(mech: CK_MECHANISM_TYPE) -> CK_KEY_TYPE {
    match mech {
        CKM_ECDSA => CKK_EC,
        _ => CKK_RSA,
    }
}
