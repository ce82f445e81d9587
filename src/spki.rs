// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

//! Helpers to (de)serialize the ASN.1 structures this module exchanges
//! with the remote key service: SubjectPublicKeyInfo documents, RSA
//! public keys, EC parameters and ECDSA signature values.

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::pkcs11::*;

use asn1;

pub const RSA_ENCRYPTION_OID: asn1::ObjectIdentifier =
    asn1::oid!(1, 2, 840, 113549, 1, 1, 1);
pub const SHA256_RSA_ENCRYPTION_OID: asn1::ObjectIdentifier =
    asn1::oid!(1, 2, 840, 113549, 1, 1, 11);
pub const EC_PUBLIC_KEY_OID: asn1::ObjectIdentifier =
    asn1::oid!(1, 2, 840, 10045, 2, 1);
pub const EC_SECP256R1_OID: asn1::ObjectIdentifier =
    asn1::oid!(1, 2, 840, 10045, 3, 1, 7);
pub const EC_SECP384R1_OID: asn1::ObjectIdentifier =
    asn1::oid!(1, 3, 132, 0, 34);
pub const ECDSA_WITH_SHA256_OID: asn1::ObjectIdentifier =
    asn1::oid!(1, 2, 840, 10045, 4, 3, 2);
pub const ECDSA_WITH_SHA384_OID: asn1::ObjectIdentifier =
    asn1::oid!(1, 2, 840, 10045, 4, 3, 3);
pub const COMMON_NAME_OID: asn1::ObjectIdentifier = asn1::oid!(2, 5, 4, 3);

/// DER encoding of an ASN.1 NULL, used as the parameter field of RSA
/// algorithm identifiers
static NULL_DER: &[u8] = &[0x05, 0x00];

/// Wrapper object to properly handle DER encoded big unsigned integers
///
/// Checks that the high order bit is clear, otherwise allocates a copy
/// with a prepended zero byte so the value is not interpreted as
/// negative; redundant leading zeroes are skipped on the way in.
pub struct DerBigUint<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> DerBigUint<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::invalid_argument("empty integer"));
        }
        let de = if data[0] & 0x80 == 0x80 {
            let mut v = Vec::with_capacity(data.len() + 1);
            v.push(0);
            v.extend_from_slice(data);
            DerBigUint {
                data: Cow::Owned(v),
            }
        } else {
            let mut skip = 0;
            while data[skip] == 0
                && skip + 1 < data.len()
                && data[skip + 1] & 0x80 == 0
            {
                skip += 1;
            }
            DerBigUint {
                data: Cow::from(&data[skip..]),
            }
        };
        match asn1::BigUint::new(&de.data) {
            Some(_) => Ok(de),
            None => Err(CKR_GENERAL_ERROR)?,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl<'a> asn1::SimpleAsn1Readable<'a> for DerBigUint<'a> {
    const TAG: asn1::Tag = asn1::BigUint::TAG;
    fn parse_data(data: &'a [u8]) -> asn1::ParseResult<Self> {
        match DerBigUint::new(data) {
            Ok(x) => Ok(x),
            Err(_) => {
                Err(asn1::ParseError::new(asn1::ParseErrorKind::InvalidValue))
            }
        }
    }
}

impl asn1::SimpleAsn1Writable for DerBigUint<'_> {
    const TAG: asn1::Tag = asn1::BigUint::TAG;
    fn write_data(&self, dest: &mut asn1::WriteBuf) -> asn1::WriteResult {
        dest.push_slice(self.as_bytes())
    }
}

/// Defined in RFC 5280
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct AlgorithmIdentifier<'a> {
    pub oid: asn1::ObjectIdentifier,
    pub params: Option<asn1::Tlv<'a>>,
}

/// Defined in RFC 5280
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub struct SubjectPublicKeyInfo<'a> {
    pub algorithm: AlgorithmIdentifier<'a>,
    pub subject_public_key: asn1::BitString<'a>,
}

/// Defined in RFC 8017 A.1.1
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
struct RsaPublicKey<'a> {
    modulus: DerBigUint<'a>,
    public_exponent: DerBigUint<'a>,
}

/// Defined in RFC 3279 2.2.3
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
struct EcdsaSigValue<'a> {
    r: DerBigUint<'a>,
    s: DerBigUint<'a>,
}

/// The named curves usable with the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
}

impl EcCurve {
    pub fn oid(&self) -> asn1::ObjectIdentifier {
        match self {
            EcCurve::P256 => EC_SECP256R1_OID,
            EcCurve::P384 => EC_SECP384R1_OID,
        }
    }

    pub fn from_oid(oid: &asn1::ObjectIdentifier) -> Result<EcCurve> {
        if oid == &EC_SECP256R1_OID {
            Ok(EcCurve::P256)
        } else if oid == &EC_SECP384R1_OID {
            Ok(EcCurve::P384)
        } else {
            Err(Error::invalid_argument(format!(
                "unsupported curve {}",
                oid
            )))
        }
    }

    pub fn bits(&self) -> usize {
        match self {
            EcCurve::P256 => 256,
            EcCurve::P384 => 384,
        }
    }

    /// Byte length of one coordinate
    pub fn coord_size(&self) -> usize {
        (self.bits() + 7) / 8
    }

    /// Byte length of the digest the curve is paired with
    pub fn digest_size(&self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
        }
    }
}

/// A public key extracted from a SubjectPublicKeyInfo document
#[derive(Debug, Clone)]
pub enum PublicKey {
    Rsa {
        /// Big-endian modulus with no leading zeroes
        modulus: Vec<u8>,
        /// Big-endian public exponent
        exponent: Vec<u8>,
    },
    Ec {
        curve: EcCurve,
        /// Uncompressed X9.62 point
        point: Vec<u8>,
    },
}

fn strip_leading_zeroes(data: &[u8]) -> Vec<u8> {
    let mut skip = 0;
    while skip + 1 < data.len() && data[skip] == 0 {
        skip += 1;
    }
    data[skip..].to_vec()
}

/// Parses a DER SubjectPublicKeyInfo into the key material the token
/// exposes through attributes
pub fn parse_spki(der: &[u8]) -> Result<PublicKey> {
    let spki = asn1::parse_single::<SubjectPublicKeyInfo>(der)?;
    let keybits = spki.subject_public_key.as_bytes();
    if spki.algorithm.oid == RSA_ENCRYPTION_OID {
        let rsa = asn1::parse_single::<RsaPublicKey>(keybits)?;
        Ok(PublicKey::Rsa {
            modulus: strip_leading_zeroes(rsa.modulus.as_bytes()),
            exponent: strip_leading_zeroes(rsa.public_exponent.as_bytes()),
        })
    } else if spki.algorithm.oid == EC_PUBLIC_KEY_OID {
        let params = match spki.algorithm.params {
            Some(p) => p,
            None => {
                return Err(Error::invalid_argument("missing EC parameters"))
            }
        };
        let curve = EcCurve::from_oid(&params.parse::<asn1::ObjectIdentifier>()?)?;
        if keybits.len() != 1 + 2 * curve.coord_size() || keybits[0] != 0x04 {
            return Err(Error::invalid_argument("malformed EC point"));
        }
        Ok(PublicKey::Ec {
            curve: curve,
            point: keybits.to_vec(),
        })
    } else {
        Err(Error::invalid_argument(format!(
            "unsupported key algorithm {}",
            spki.algorithm.oid
        )))
    }
}

/// DER encoding of the namedCurve choice of ECParameters
pub fn ec_params_der(curve: EcCurve) -> Result<Vec<u8>> {
    Ok(asn1::write_single(&curve.oid())?)
}

/// CKA_EC_POINT format: the X9.62 point wrapped in an OCTET STRING
pub fn ec_point_der(point: &[u8]) -> Result<Vec<u8>> {
    Ok(asn1::write_single(&point)?)
}

/// Assembles a DER SubjectPublicKeyInfo for an RSA public key
pub fn spki_for_rsa(modulus: &[u8], exponent: &[u8]) -> Result<Vec<u8>> {
    let key = asn1::write_single(&RsaPublicKey {
        modulus: DerBigUint::new(modulus)?,
        public_exponent: DerBigUint::new(exponent)?,
    })?;
    let spki = SubjectPublicKeyInfo {
        algorithm: AlgorithmIdentifier {
            oid: RSA_ENCRYPTION_OID,
            params: Some(asn1::parse_single::<asn1::Tlv>(NULL_DER)?),
        },
        subject_public_key: match asn1::BitString::new(&key, 0) {
            Some(bs) => bs,
            None => return Err(CKR_GENERAL_ERROR)?,
        },
    };
    Ok(asn1::write_single(&spki)?)
}

/// Assembles a DER SubjectPublicKeyInfo for an EC public key
pub fn spki_for_ec(curve: EcCurve, point: &[u8]) -> Result<Vec<u8>> {
    let params = asn1::write_single(&curve.oid())?;
    let spki = SubjectPublicKeyInfo {
        algorithm: AlgorithmIdentifier {
            oid: EC_PUBLIC_KEY_OID,
            params: Some(asn1::parse_single::<asn1::Tlv>(&params)?),
        },
        subject_public_key: match asn1::BitString::new(point, 0) {
            Some(bs) => bs,
            None => return Err(CKR_GENERAL_ERROR)?,
        },
    };
    Ok(asn1::write_single(&spki)?)
}

/// Converts an ASN.1 ECDSA signature, as produced by the remote
/// service, into the fixed-width r||s form PKCS#11 mandates
pub fn ecdsa_sig_to_raw(der: &[u8], curve: EcCurve) -> Result<Vec<u8>> {
    let sig = asn1::parse_single::<EcdsaSigValue>(der)?;
    let size = curve.coord_size();
    let mut out = vec![0u8; 2 * size];
    for (i, val) in [&sig.r, &sig.s].iter().enumerate() {
        let bytes = strip_leading_zeroes(val.as_bytes());
        if bytes.len() > size {
            return Err(Error::internal("signature component out of range"));
        }
        out[(i + 1) * size - bytes.len()..(i + 1) * size]
            .copy_from_slice(&bytes);
    }
    Ok(out)
}

/// Assembles an ASN.1 ECDSA signature from fixed-width components
pub fn ecdsa_sig_from_raw(r: &[u8], s: &[u8]) -> Result<Vec<u8>> {
    Ok(asn1::write_single(&EcdsaSigValue {
        r: DerBigUint::new(r)?,
        s: DerBigUint::new(s)?,
    })?)
}
