// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

//! Synthesizes a self-signed X.509 certificate per signing key version,
//! for callers that expect every private key to pair with a
//! certificate object. The TBS structure embeds the version's public
//! key document and the signature is produced by the remote service.

use crate::error::{Error, Result};
use crate::kms::{KeyAlgorithm, KeyVersion, KmsClient};
use crate::pkcs11::CKR_GENERAL_ERROR;
use crate::spki::{
    AlgorithmIdentifier, DerBigUint, COMMON_NAME_OID, ECDSA_WITH_SHA256_OID,
    ECDSA_WITH_SHA384_OID, SHA256_RSA_ENCRYPTION_OID,
};

use asn1;
use sha2::{Digest, Sha256, Sha384};

/// A synthesized certificate and the fields mirrored into attributes
#[derive(Debug, Clone)]
pub struct CertificateData {
    pub der: Vec<u8>,
    pub subject: Vec<u8>,
    pub issuer: Vec<u8>,
    pub serial: Vec<u8>,
}

#[derive(asn1::Asn1Read, asn1::Asn1Write)]
struct AttributeTypeValue<'a> {
    typ: asn1::ObjectIdentifier,
    value: asn1::Utf8String<'a>,
}

#[derive(asn1::Asn1Read, asn1::Asn1Write)]
struct Validity {
    not_before: asn1::UtcTime,
    not_after: asn1::UtcTime,
}

#[derive(asn1::Asn1Read, asn1::Asn1Write)]
struct TbsCertificate<'a> {
    #[explicit(0)]
    version: Option<u64>,
    serial_number: DerBigUint<'a>,
    signature: AlgorithmIdentifier<'a>,
    issuer: asn1::Tlv<'a>,
    validity: Validity,
    subject: asn1::Tlv<'a>,
    subject_public_key_info: asn1::Tlv<'a>,
}

#[derive(asn1::Asn1Read, asn1::Asn1Write)]
struct Certificate<'a> {
    tbs_certificate: asn1::Tlv<'a>,
    signature_algorithm: AlgorithmIdentifier<'a>,
    signature_value: asn1::BitString<'a>,
}

/// Whether a certificate is synthesized for this algorithm.
///
/// PSS keys are skipped; their certificates would require the
/// RSASSA-PSS AlgorithmIdentifier parameter encoding.
pub fn certifiable(algorithm: KeyAlgorithm) -> bool {
    match algorithm {
        KeyAlgorithm::RsaSignPkcs2048
        | KeyAlgorithm::RsaSignPkcs3072
        | KeyAlgorithm::RsaSignPkcs4096
        | KeyAlgorithm::EcSignP256
        | KeyAlgorithm::EcSignP384 => true,
        _ => false,
    }
}

/// DER encoding of a single-RDN X.501 name, `CN=<common name>`
fn encode_name(common_name: &str) -> Result<Vec<u8>> {
    let atv = AttributeTypeValue {
        typ: COMMON_NAME_OID,
        value: asn1::Utf8String::new(common_name),
    };
    let rdn = asn1::SetOfWriter::new([atv]);
    Ok(asn1::write_single(&asn1::SequenceOfWriter::new([rdn]))?)
}

fn signature_oid(algorithm: KeyAlgorithm) -> asn1::ObjectIdentifier {
    match algorithm {
        KeyAlgorithm::EcSignP256 => ECDSA_WITH_SHA256_OID,
        KeyAlgorithm::EcSignP384 => ECDSA_WITH_SHA384_OID,
        _ => SHA256_RSA_ENCRYPTION_OID,
    }
}

fn tbs_digest(algorithm: KeyAlgorithm, tbs: &[u8]) -> Vec<u8> {
    match algorithm {
        KeyAlgorithm::EcSignP384 => Sha384::digest(tbs).to_vec(),
        _ => Sha256::digest(tbs).to_vec(),
    }
}

/// Builds a self-signed certificate for a signing key version.
///
/// The serial number is derived from the version resource name so the
/// certificate is stable across provider restarts.
pub fn generate_self_signed(
    version: &KeyVersion,
    client: &dyn KmsClient,
) -> Result<CertificateData> {
    if !certifiable(version.algorithm) {
        return Err(Error::failed_precondition(format!(
            "no certificate synthesized for {:?}",
            version.algorithm
        )));
    }

    let name = encode_name(version.key_id())?;
    let mut serial = Sha256::digest(version.name.as_bytes())[..8].to_vec();
    // serials are positive integers
    serial[0] &= 0x7f;
    serial[0] |= 0x01;

    static NULL_DER: &[u8] = &[0x05, 0x00];
    let sig_oid = signature_oid(version.algorithm);
    let sig_params = match version.algorithm {
        KeyAlgorithm::EcSignP256 | KeyAlgorithm::EcSignP384 => None,
        _ => Some(asn1::parse_single::<asn1::Tlv>(NULL_DER)?),
    };

    let tbs = asn1::write_single(&TbsCertificate {
        version: Some(2),
        serial_number: DerBigUint::new(&serial)?,
        signature: AlgorithmIdentifier {
            oid: sig_oid.clone(),
            params: sig_params,
        },
        issuer: asn1::parse_single::<asn1::Tlv>(&name)?,
        validity: Validity {
            not_before: asn1::UtcTime::new(asn1::DateTime::new(
                2020, 1, 1, 0, 0, 0,
            )?)?,
            not_after: asn1::UtcTime::new(asn1::DateTime::new(
                2049, 12, 31, 23, 59, 59,
            )?)?,
        },
        subject: asn1::parse_single::<asn1::Tlv>(&name)?,
        subject_public_key_info: asn1::parse_single::<asn1::Tlv>(
            &version.public_key,
        )?,
    })?;

    let digest = tbs_digest(version.algorithm, &tbs);
    let signature = client.asymmetric_sign(&version.name, &digest)?;

    let sig_params = match version.algorithm {
        KeyAlgorithm::EcSignP256 | KeyAlgorithm::EcSignP384 => None,
        _ => Some(asn1::parse_single::<asn1::Tlv>(NULL_DER)?),
    };
    let der = asn1::write_single(&Certificate {
        tbs_certificate: asn1::parse_single::<asn1::Tlv>(&tbs)?,
        signature_algorithm: AlgorithmIdentifier {
            oid: sig_oid,
            params: sig_params,
        },
        signature_value: match asn1::BitString::new(&signature, 0) {
            Some(bs) => bs,
            None => return Err(CKR_GENERAL_ERROR)?,
        },
    })?;

    Ok(CertificateData {
        der: der,
        subject: name.clone(),
        issuer: name,
        serial: asn1::write_single(&DerBigUint::new(&serial)?)?,
    })
}
