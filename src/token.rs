// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

//! A token materializes one remote key ring as a set of PKCS#11
//! objects, and owns the login view shared by every session on its
//! slot. Object tables are built once at provider initialization; the
//! token is permanently write protected.

use std::collections::HashMap;

use crate::certs;
use crate::config::TokenConfig;
use crate::error::Result;
use crate::kms::KmsClient;
use crate::object::{self, Object};
use crate::pkcs11::*;
use crate::spki;

use log;
use sha2::{Digest, Sha256};

static MANUFACTURER_ID: [CK_UTF8CHAR; 32] =
    *b"kms-pkcs11                      ";
static TOKEN_MODEL: [CK_UTF8CHAR; 16] = *b"Cloud KMS Token ";

/// Mints object handles; handles are provider-wide unique so a handle
/// resolves in exactly one token's table
#[derive(Debug)]
pub struct Handles {
    next: CK_OBJECT_HANDLE,
}

impl Handles {
    pub fn new() -> Handles {
        Handles { next: 1 }
    }

    pub fn next(&mut self) -> CK_OBJECT_HANDLE {
        let next = self.next;
        self.next += 1;
        next
    }
}

/// Copies a string into a fixed-size, space-padded field
pub fn copy_sized_string(s: &[u8], dst: &mut [u8]) {
    let len = std::cmp::min(s.len(), dst.len());
    dst[..len].copy_from_slice(&s[..len]);
    for b in dst[len..].iter_mut() {
        *b = 0x20;
    }
}

#[derive(Debug)]
pub struct Token {
    slot_info: CK_SLOT_INFO,
    info: CK_TOKEN_INFO,
    objects: HashMap<CK_OBJECT_HANDLE, Object>,
    /// enumeration order of the object table
    ordered: Vec<CK_OBJECT_HANDLE>,
    logged_in: bool,
}

impl Token {
    /// Builds the token for one configured key ring: fetches the
    /// enabled key versions and materializes a private and a public
    /// key object per version, plus a certificate when requested.
    pub fn new(
        conf: &TokenConfig,
        client: &dyn KmsClient,
        generate_certs: bool,
        handles: &mut Handles,
    ) -> Result<Token> {
        let mut label = [0x20u8; 32];
        copy_sized_string(conf.label.as_bytes(), &mut label);

        let mut description = [0x20u8; 64];
        copy_sized_string(conf.key_ring.as_bytes(), &mut description);

        // stable serial derived from the key ring name
        let mut serial = [0u8; 16];
        let digest = Sha256::digest(conf.key_ring.as_bytes());
        let mut hexser = String::with_capacity(16);
        for b in &digest[..8] {
            hexser.push_str(&format!("{:02x}", b));
        }
        copy_sized_string(hexser.as_bytes(), &mut serial);

        let mut token = Token {
            slot_info: CK_SLOT_INFO {
                slotDescription: description,
                manufacturerID: MANUFACTURER_ID,
                flags: CKF_TOKEN_PRESENT,
                hardwareVersion: CK_VERSION { major: 0, minor: 0 },
                firmwareVersion: CK_VERSION { major: 0, minor: 0 },
            },
            info: CK_TOKEN_INFO {
                label: label,
                manufacturerID: MANUFACTURER_ID,
                model: TOKEN_MODEL,
                serialNumber: serial,
                flags: CKF_TOKEN_INITIALIZED
                    | CKF_WRITE_PROTECTED
                    | CKF_USER_PIN_INITIALIZED
                    | CKF_SO_PIN_LOCKED,
                ulMaxSessionCount: CK_EFFECTIVELY_INFINITE,
                ulSessionCount: CK_UNAVAILABLE_INFORMATION,
                ulMaxRwSessionCount: 0,
                ulRwSessionCount: CK_UNAVAILABLE_INFORMATION,
                ulMaxPinLen: 0,
                ulMinPinLen: 0,
                ulTotalPublicMemory: CK_UNAVAILABLE_INFORMATION,
                ulFreePublicMemory: CK_UNAVAILABLE_INFORMATION,
                ulTotalPrivateMemory: CK_UNAVAILABLE_INFORMATION,
                ulFreePrivateMemory: CK_UNAVAILABLE_INFORMATION,
                hardwareVersion: CK_VERSION { major: 0, minor: 0 },
                firmwareVersion: CK_VERSION { major: 0, minor: 0 },
                utcTime: *b"0000000000000000",
            },
            objects: HashMap::new(),
            ordered: Vec::new(),
            logged_in: false,
        };

        let versions = client.list_key_versions(&conf.key_ring)?;
        log::debug!(
            "token {:?}: {} enabled key versions in {}",
            conf.label,
            versions.len(),
            conf.key_ring
        );
        for version in &versions {
            let key = spki::parse_spki(&version.public_key)?;
            token.install(object::private_key(version, &key)?, handles);
            token.install(object::public_key(version, &key)?, handles);
            if generate_certs && certs::certifiable(version.algorithm) {
                let cert = certs::generate_self_signed(version, client)?;
                token.install(object::certificate(version, &cert)?, handles);
            }
        }

        Ok(token)
    }

    fn install(&mut self, mut obj: Object, handles: &mut Handles) {
        let handle = handles.next();
        obj.set_handle(handle);
        self.ordered.push(handle);
        self.objects.insert(handle, obj);
    }

    pub fn get_token_info(&self) -> &CK_TOKEN_INFO {
        &self.info
    }

    pub fn get_slot_info(&self) -> &CK_SLOT_INFO {
        &self.slot_info
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// The session state every session on this slot observes
    pub fn session_state(&self) -> CK_STATE {
        if self.logged_in {
            CKS_RO_USER_FUNCTIONS
        } else {
            CKS_RO_PUBLIC_SESSION
        }
    }

    /// Moves the token to the user view; the PIN is not consulted,
    /// authentication is federated through the service credentials
    pub fn login(&mut self) -> Result<()> {
        if self.logged_in {
            return Err(CKR_USER_ALREADY_LOGGED_IN)?;
        }
        self.logged_in = true;
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        if !self.logged_in {
            return Err(CKR_USER_NOT_LOGGED_IN)?;
        }
        self.logged_in = false;
        Ok(())
    }

    pub fn object(&self, handle: CK_OBJECT_HANDLE) -> Result<&Object> {
        match self.objects.get(&handle) {
            Some(obj) => Ok(obj),
            None => Err(CKR_OBJECT_HANDLE_INVALID)?,
        }
    }

    /// Snapshot of every object handle whose attributes match the
    /// template, in stable enumeration order
    pub fn search(&self, template: &[CK_ATTRIBUTE]) -> Vec<CK_OBJECT_HANDLE> {
        let mut found = Vec::new();
        for handle in &self.ordered {
            if let Some(obj) = self.objects.get(handle) {
                if obj.match_template(template) {
                    found.push(*handle);
                }
            }
        }
        found
    }
}
