// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

//! The core representation of the PKCS#11 objects a token exposes:
//! private keys, public keys and synthesized certificates. Attribute
//! tables are built once when the token is constructed and are
//! immutable afterwards; every attribute on an object is either public,
//! sensitive (present but never returned) or absent.

use crate::attribute::Attribute;
use crate::certs::CertificateData;
use crate::error::Result;
use crate::kms::{KeyAlgorithm, KeyPurpose, KeyVersion};
use crate::pkcs11::*;
use crate::spki::{self, PublicKey};

/// RSA private key components that exist on the remote service but can
/// never be read through this interface
static RSA_PRIVATE_COMPONENTS: [CK_ATTRIBUTE_TYPE; 7] = [
    CKA_VALUE,
    CKA_PRIVATE_EXPONENT,
    CKA_PRIME_1,
    CKA_PRIME_2,
    CKA_EXPONENT_1,
    CKA_EXPONENT_2,
    CKA_COEFFICIENT,
];

/// The EC private scalar
static EC_PRIVATE_COMPONENTS: [CK_ATTRIBUTE_TYPE; 1] = [CKA_VALUE];

/// The key version backing a key object
#[derive(Debug, Clone)]
pub struct KmsKeyRef {
    pub version: String,
    pub algorithm: KeyAlgorithm,
}

/// A token object and its attribute table
#[derive(Debug, Clone)]
pub struct Object {
    handle: CK_OBJECT_HANDLE,
    class: CK_OBJECT_CLASS,
    attributes: Vec<Attribute>,
    sensitive: &'static [CK_ATTRIBUTE_TYPE],
    kms_key: Option<KmsKeyRef>,
}

impl Object {
    pub fn get_handle(&self) -> CK_OBJECT_HANDLE {
        self.handle
    }

    pub fn set_handle(&mut self, handle: CK_OBJECT_HANDLE) {
        self.handle = handle;
    }

    pub fn get_class(&self) -> CK_OBJECT_CLASS {
        self.class
    }

    /// The remote key version this object is a view of, when it is a
    /// key object
    pub fn kms_key(&self) -> Option<&KmsKeyRef> {
        self.kms_key.as_ref()
    }

    pub fn get_attr(&self, ck_type: CK_ATTRIBUTE_TYPE) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.get_type() == ck_type)
    }

    fn is_sensitive_attr(&self, ck_type: CK_ATTRIBUTE_TYPE) -> bool {
        self.sensitive.contains(&ck_type)
    }

    /// Checks that every template entry matches an attribute on this
    /// object with a byte-identical value. Attributes with no
    /// retrievable value never match.
    pub fn match_template(&self, template: &[CK_ATTRIBUTE]) -> bool {
        for ck_attr in template {
            match self.attributes.iter().find(|a| a.match_ck_attr(ck_attr)) {
                Some(_) => (),
                None => return false,
            }
        }
        true
    }

    /// Answers an attribute template in place, one entry at a time.
    ///
    /// Every entry is processed even after a failure; each entry's
    /// ulValueLen reflects that entry's own outcome. The aggregate
    /// result is the first failure encountered in template order.
    pub fn fill_template(&self, template: &mut [CK_ATTRIBUTE]) -> Result<()> {
        let mut result = CKR_OK;
        for entry in template.iter_mut() {
            let rv = self.fill_entry(entry);
            if rv != CKR_OK && result == CKR_OK {
                result = rv;
            }
        }
        if result == CKR_OK {
            Ok(())
        } else {
            Err(result)?
        }
    }

    fn fill_entry(&self, entry: &mut CK_ATTRIBUTE) -> CK_RV {
        if self.is_sensitive_attr(entry.type_) {
            entry.ulValueLen = CK_UNAVAILABLE_INFORMATION;
            return CKR_ATTRIBUTE_SENSITIVE;
        }
        let attr = match self.get_attr(entry.type_) {
            Some(a) => a,
            None => {
                entry.ulValueLen = CK_UNAVAILABLE_INFORMATION;
                return CKR_ATTRIBUTE_TYPE_INVALID;
            }
        };
        let value = attr.get_value();
        if entry.pValue.is_null() {
            entry.ulValueLen = value.len() as CK_ULONG;
            return CKR_OK;
        }
        if (entry.ulValueLen as usize) < value.len() {
            entry.ulValueLen = CK_UNAVAILABLE_INFORMATION;
            return CKR_BUFFER_TOO_SMALL;
        }
        unsafe {
            std::ptr::copy_nonoverlapping(
                value.as_ptr(),
                entry.pValue as *mut u8,
                value.len(),
            );
        }
        entry.ulValueLen = value.len() as CK_ULONG;
        CKR_OK
    }
}

/// Attributes shared by both halves of a key pair
fn common_key_attributes(
    version: &KeyVersion,
    class: CK_OBJECT_CLASS,
) -> Vec<Attribute> {
    vec![
        Attribute::from_ulong(CKA_CLASS, class),
        Attribute::from_ulong(CKA_KEY_TYPE, version.algorithm.key_type()),
        Attribute::from_bool(CKA_TOKEN, true),
        Attribute::from_bool(CKA_PRIVATE, false),
        Attribute::from_string(CKA_LABEL, version.key_id().to_string()),
        Attribute::from_bytes(CKA_ID, version.name.as_bytes().to_vec()),
        Attribute::from_bool(CKA_LOCAL, false),
        Attribute::from_bool(CKA_MODIFIABLE, false),
        Attribute::from_bool(CKA_COPYABLE, false),
        Attribute::from_bool(CKA_DESTROYABLE, false),
        Attribute::from_bool(CKA_DERIVE, false),
        Attribute::from_bool(CKA_WRAP, false),
        Attribute::from_bool(CKA_UNWRAP, false),
        Attribute::from_bool(CKA_SIGN_RECOVER, false),
        Attribute::from_bool(CKA_VERIFY_RECOVER, false),
    ]
}

/// Public key material shadows present on both object halves
fn material_attributes(
    version: &KeyVersion,
    key: &PublicKey,
) -> Result<Vec<Attribute>> {
    let mut attrs = vec![Attribute::from_bytes(
        CKA_PUBLIC_KEY_INFO,
        version.public_key.clone(),
    )];
    match key {
        PublicKey::Rsa { modulus, exponent } => {
            attrs.push(Attribute::from_bytes(CKA_MODULUS, modulus.clone()));
            attrs.push(Attribute::from_bytes(
                CKA_PUBLIC_EXPONENT,
                exponent.clone(),
            ));
        }
        PublicKey::Ec { curve, point } => {
            attrs.push(Attribute::from_bytes(
                CKA_EC_PARAMS,
                spki::ec_params_der(*curve)?,
            ));
            attrs.push(Attribute::from_bytes(
                CKA_EC_POINT,
                spki::ec_point_der(point)?,
            ));
        }
    }
    Ok(attrs)
}

/// Builds the private-key view of a key version
pub fn private_key(version: &KeyVersion, key: &PublicKey) -> Result<Object> {
    let sign = version.algorithm.purpose() == KeyPurpose::Sign;
    let mut attributes = common_key_attributes(version, CKO_PRIVATE_KEY);
    attributes.push(Attribute::from_bool(CKA_SENSITIVE, true));
    attributes.push(Attribute::from_bool(CKA_ALWAYS_SENSITIVE, true));
    attributes.push(Attribute::from_bool(CKA_EXTRACTABLE, false));
    attributes.push(Attribute::from_bool(CKA_NEVER_EXTRACTABLE, true));
    attributes.push(Attribute::from_bool(CKA_ALWAYS_AUTHENTICATE, false));
    attributes.push(Attribute::from_bool(CKA_SIGN, sign));
    attributes.push(Attribute::from_bool(CKA_DECRYPT, !sign));
    attributes.push(Attribute::from_bool(CKA_VERIFY, false));
    attributes.push(Attribute::from_bool(CKA_ENCRYPT, false));
    attributes.append(&mut material_attributes(version, key)?);
    Ok(Object {
        handle: CK_INVALID_HANDLE,
        class: CKO_PRIVATE_KEY,
        attributes: attributes,
        sensitive: match key {
            PublicKey::Rsa { .. } => &RSA_PRIVATE_COMPONENTS,
            PublicKey::Ec { .. } => &EC_PRIVATE_COMPONENTS,
        },
        kms_key: Some(KmsKeyRef {
            version: version.name.clone(),
            algorithm: version.algorithm,
        }),
    })
}

/// Builds the public-key view of a key version
pub fn public_key(version: &KeyVersion, key: &PublicKey) -> Result<Object> {
    let sign = version.algorithm.purpose() == KeyPurpose::Sign;
    let mut attributes = common_key_attributes(version, CKO_PUBLIC_KEY);
    attributes.push(Attribute::from_bool(CKA_VERIFY, sign));
    attributes.push(Attribute::from_bool(CKA_ENCRYPT, !sign));
    attributes.push(Attribute::from_bool(CKA_SIGN, false));
    attributes.push(Attribute::from_bool(CKA_DECRYPT, false));
    if let PublicKey::Rsa { modulus, .. } = key {
        attributes.push(Attribute::from_ulong(
            CKA_MODULUS_BITS,
            (modulus.len() * 8) as CK_ULONG,
        ));
    }
    attributes.append(&mut material_attributes(version, key)?);
    Ok(Object {
        handle: CK_INVALID_HANDLE,
        class: CKO_PUBLIC_KEY,
        attributes: attributes,
        sensitive: &[],
        kms_key: Some(KmsKeyRef {
            version: version.name.clone(),
            algorithm: version.algorithm,
        }),
    })
}

/// Builds the certificate object synthesized for a key version
pub fn certificate(
    version: &KeyVersion,
    cert: &CertificateData,
) -> Result<Object> {
    let attributes = vec![
        Attribute::from_ulong(CKA_CLASS, CKO_CERTIFICATE),
        Attribute::from_ulong(CKA_CERTIFICATE_TYPE, CKC_X_509),
        Attribute::from_bool(CKA_TOKEN, true),
        Attribute::from_bool(CKA_PRIVATE, false),
        Attribute::from_string(CKA_LABEL, version.key_id().to_string()),
        Attribute::from_bytes(CKA_ID, version.name.as_bytes().to_vec()),
        Attribute::from_bool(CKA_MODIFIABLE, false),
        Attribute::from_bool(CKA_COPYABLE, false),
        Attribute::from_bool(CKA_DESTROYABLE, false),
        Attribute::from_bytes(CKA_VALUE, cert.der.clone()),
        Attribute::from_bytes(CKA_SUBJECT, cert.subject.clone()),
        Attribute::from_bytes(CKA_ISSUER, cert.issuer.clone()),
        Attribute::from_bytes(CKA_SERIAL_NUMBER, cert.serial.clone()),
    ];
    Ok(Object {
        handle: CK_INVALID_HANDLE,
        class: CKO_CERTIFICATE,
        attributes: attributes,
        sensitive: &[],
        kms_key: None,
    })
}
