// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

use super::*;
use crate::attribute::CK_ULONG_SIZE;

use serial_test::serial;

fn find_one(
    session: CK_SESSION_HANDLE,
    class: CK_OBJECT_CLASS,
    label: &str,
) -> CK_OBJECT_HANDLE {
    let mut template = [
        CK_ATTRIBUTE {
            type_: CKA_CLASS,
            pValue: &class as *const _ as CK_VOID_PTR,
            ulValueLen: CK_ULONG_SIZE as CK_ULONG,
        },
        CK_ATTRIBUTE {
            type_: CKA_LABEL,
            pValue: label.as_ptr() as CK_VOID_PTR,
            ulValueLen: label.len() as CK_ULONG,
        },
    ];
    let found = find_all(session, &mut template);
    assert_eq!(found.len(), 1);
    found[0]
}

fn mech(mechanism: CK_MECHANISM_TYPE) -> CK_MECHANISM {
    CK_MECHANISM {
        mechanism: mechanism,
        pParameter: std::ptr::null_mut(),
        ulParameterLen: 0,
    }
}

#[test]
#[serial]
fn test_ecdsa_sign() {
    let kms = TestKms::new("ecdsa_sign");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP256);
    kms.initialize();

    let session = open_session(0);
    let key = find_one(session, CKO_PRIVATE_KEY, "ck");

    let mut mechanism = mech(CKM_ECDSA);
    assert_eq!(fn_sign_init(session, &mut mechanism, key), CKR_OK);

    let digest = [0xabu8; 32];
    // length probe keeps the operation alive
    let mut sig_len: CK_ULONG = 0;
    assert_eq!(
        fn_sign(
            session,
            digest.as_ptr() as CK_BYTE_PTR,
            digest.len() as CK_ULONG,
            std::ptr::null_mut(),
            &mut sig_len
        ),
        CKR_OK
    );
    assert_eq!(sig_len, 64);

    // undersized buffer keeps it alive too
    let mut signature = [0u8; 64];
    sig_len = 10;
    assert_eq!(
        fn_sign(
            session,
            digest.as_ptr() as CK_BYTE_PTR,
            digest.len() as CK_ULONG,
            signature.as_mut_ptr(),
            &mut sig_len
        ),
        CKR_BUFFER_TOO_SMALL
    );
    assert_eq!(sig_len, 64);

    assert_eq!(
        fn_sign(
            session,
            digest.as_ptr() as CK_BYTE_PTR,
            digest.len() as CK_ULONG,
            signature.as_mut_ptr(),
            &mut sig_len
        ),
        CKR_OK
    );
    assert_eq!(sig_len, 64);
    assert_ne!(signature, [0u8; 64]);

    // the operation terminated with the signature
    assert_eq!(
        fn_sign(
            session,
            digest.as_ptr() as CK_BYTE_PTR,
            digest.len() as CK_ULONG,
            signature.as_mut_ptr(),
            &mut sig_len
        ),
        CKR_OPERATION_NOT_INITIALIZED
    );

    kms.finalize();
}

#[test]
#[serial]
fn test_ecdsa_sign_is_deterministic_per_input() {
    let kms = TestKms::new("ecdsa_sign_repeat");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP384);
    kms.initialize();

    let session = open_session(0);
    let key = find_one(session, CKO_PRIVATE_KEY, "ck");
    let digest = [0x11u8; 48];

    let mut first = [0u8; 96];
    let mut second = [0u8; 96];
    for out in [&mut first, &mut second] {
        let mut mechanism = mech(CKM_ECDSA);
        assert_eq!(fn_sign_init(session, &mut mechanism, key), CKR_OK);
        let mut sig_len = out.len() as CK_ULONG;
        assert_eq!(
            fn_sign(
                session,
                digest.as_ptr() as CK_BYTE_PTR,
                digest.len() as CK_ULONG,
                out.as_mut_ptr(),
                &mut sig_len
            ),
            CKR_OK
        );
        assert_eq!(sig_len, 96);
    }
    assert_eq!(first, second);

    kms.finalize();
}

#[test]
#[serial]
fn test_ecdsa_sign_rejects_bad_digest_length() {
    let kms = TestKms::new("ecdsa_digest_len");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP256);
    kms.initialize();

    let session = open_session(0);
    let key = find_one(session, CKO_PRIVATE_KEY, "ck");

    let mut mechanism = mech(CKM_ECDSA);
    assert_eq!(fn_sign_init(session, &mut mechanism, key), CKR_OK);

    let digest = [0u8; 31];
    let mut signature = [0u8; 64];
    let mut sig_len = signature.len() as CK_ULONG;
    assert_eq!(
        fn_sign(
            session,
            digest.as_ptr() as CK_BYTE_PTR,
            digest.len() as CK_ULONG,
            signature.as_mut_ptr(),
            &mut sig_len
        ),
        CKR_DATA_LEN_RANGE
    );
    // the failure terminated the operation
    assert_eq!(
        fn_sign(
            session,
            digest.as_ptr() as CK_BYTE_PTR,
            digest.len() as CK_ULONG,
            signature.as_mut_ptr(),
            &mut sig_len
        ),
        CKR_OPERATION_NOT_INITIALIZED
    );

    kms.finalize();
}

#[test]
#[serial]
fn test_sign_init_validation() {
    let kms = TestKms::new("sign_init_validation");
    kms.create_key(0, "ec", KeyAlgorithm::EcSignP256);
    kms.create_key(0, "rsa", KeyAlgorithm::RsaSignPkcs2048);
    kms.create_key(0, "oaep", KeyAlgorithm::RsaDecryptOaep2048);
    kms.initialize();

    let session = open_session(0);
    let ec_key = find_one(session, CKO_PRIVATE_KEY, "ec");
    let rsa_key = find_one(session, CKO_PRIVATE_KEY, "rsa");
    let oaep_key = find_one(session, CKO_PRIVATE_KEY, "oaep");
    let public_key = find_one(session, CKO_PUBLIC_KEY, "ec");

    assert_eq!(
        fn_sign_init(session, std::ptr::null_mut(), ec_key),
        CKR_ARGUMENTS_BAD
    );
    assert_eq!(
        fn_sign_init(session, &mut mech(CKM_ECDSA), CK_INVALID_HANDLE),
        CKR_OBJECT_HANDLE_INVALID
    );
    assert_eq!(
        fn_sign_init(session, &mut mech(CKM_ECDSA), public_key),
        CKR_KEY_HANDLE_INVALID
    );
    assert_eq!(
        fn_sign_init(session, &mut mech(CKM_RSA_X9_31), rsa_key),
        CKR_MECHANISM_INVALID
    );
    // a decrypt-only mechanism cannot start a signature
    assert_eq!(
        fn_sign_init(session, &mut mech(CKM_RSA_PKCS_OAEP), oaep_key),
        CKR_MECHANISM_INVALID
    );
    assert_eq!(
        fn_sign_init(session, &mut mech(CKM_RSA_PKCS), ec_key),
        CKR_KEY_TYPE_INCONSISTENT
    );
    assert_eq!(
        fn_sign_init(session, &mut mech(CKM_ECDSA), rsa_key),
        CKR_KEY_TYPE_INCONSISTENT
    );
    // a PKCS#1 key does not sign with PSS
    assert_eq!(
        fn_sign_init(session, &mut mech(CKM_RSA_PKCS_PSS), rsa_key),
        CKR_KEY_FUNCTION_NOT_PERMITTED
    );

    // a second initialization needs the first to finish
    assert_eq!(fn_sign_init(session, &mut mech(CKM_ECDSA), ec_key), CKR_OK);
    assert_eq!(
        fn_sign_init(session, &mut mech(CKM_ECDSA), ec_key),
        CKR_OPERATION_ACTIVE
    );

    kms.finalize();
}

#[test]
#[serial]
fn test_rsa_pkcs_sign() {
    let kms = TestKms::new("rsa_sign");
    kms.create_key(0, "rsa", KeyAlgorithm::RsaSignPkcs2048);
    kms.initialize();

    let session = open_session(0);
    let key = find_one(session, CKO_PRIVATE_KEY, "rsa");

    let mut mechanism = mech(CKM_RSA_PKCS);
    assert_eq!(fn_sign_init(session, &mut mechanism, key), CKR_OK);

    let digest = [0x42u8; 32];
    let mut signature = [0u8; 256];
    let mut sig_len = signature.len() as CK_ULONG;
    assert_eq!(
        fn_sign(
            session,
            digest.as_ptr() as CK_BYTE_PTR,
            digest.len() as CK_ULONG,
            signature.as_mut_ptr(),
            &mut sig_len
        ),
        CKR_OK
    );
    assert_eq!(sig_len, 256);

    kms.finalize();
}

#[test]
#[serial]
fn test_rsa_pss_sign_params() {
    let kms = TestKms::new("pss_sign");
    kms.create_key(0, "pss", KeyAlgorithm::RsaSignPss2048);
    kms.initialize();

    let session = open_session(0);
    let key = find_one(session, CKO_PRIVATE_KEY, "pss");

    let mut params = CK_RSA_PKCS_PSS_PARAMS {
        hashAlg: CKM_SHA256,
        mgf: CKG_MGF1_SHA256,
        sLen: 32,
    };

    // parameter blob must have the right size
    let mut mechanism = CK_MECHANISM {
        mechanism: CKM_RSA_PKCS_PSS,
        pParameter: &mut params as *mut _ as CK_VOID_PTR,
        ulParameterLen: 1,
    };
    assert_eq!(
        fn_sign_init(session, &mut mechanism, key),
        CKR_MECHANISM_PARAM_INVALID
    );

    mechanism.ulParameterLen =
        std::mem::size_of::<CK_RSA_PKCS_PSS_PARAMS>() as CK_ULONG;
    assert_eq!(fn_sign_init(session, &mut mechanism, key), CKR_OK);

    let digest = [0x17u8; 32];
    let mut signature = [0u8; 256];
    let mut sig_len = signature.len() as CK_ULONG;
    assert_eq!(
        fn_sign(
            session,
            digest.as_ptr() as CK_BYTE_PTR,
            digest.len() as CK_ULONG,
            signature.as_mut_ptr(),
            &mut sig_len
        ),
        CKR_OK
    );
    assert_eq!(sig_len, 256);

    kms.finalize();
}

#[test]
#[serial]
fn test_oaep_decrypt() {
    let kms = TestKms::new("oaep_decrypt");
    kms.create_key(0, "oaep", KeyAlgorithm::RsaDecryptOaep2048);
    kms.initialize();

    let session = open_session(0);
    let key = find_one(session, CKO_PRIVATE_KEY, "oaep");

    let mut params = CK_RSA_PKCS_OAEP_PARAMS {
        hashAlg: CKM_SHA256,
        mgf: CKG_MGF1_SHA256,
        source: CKZ_DATA_SPECIFIED,
        pSourceData: std::ptr::null_mut(),
        ulSourceDataLen: 0,
    };
    let mut mechanism = CK_MECHANISM {
        mechanism: CKM_RSA_PKCS_OAEP,
        pParameter: &mut params as *mut _ as CK_VOID_PTR,
        ulParameterLen: std::mem::size_of::<CK_RSA_PKCS_OAEP_PARAMS>()
            as CK_ULONG,
    };
    assert_eq!(fn_decrypt_init(session, &mut mechanism, key), CKR_OK);

    let ciphertext = [0x55u8; 256];
    // probe before the remote call reports the modulus size
    let mut out_len: CK_ULONG = 0;
    assert_eq!(
        fn_decrypt(
            session,
            ciphertext.as_ptr() as CK_BYTE_PTR,
            ciphertext.len() as CK_ULONG,
            std::ptr::null_mut(),
            &mut out_len
        ),
        CKR_OK
    );
    assert_eq!(out_len, 256);

    // an undersized buffer reports the exact plaintext size
    let mut plaintext = [0u8; 256];
    out_len = 10;
    assert_eq!(
        fn_decrypt(
            session,
            ciphertext.as_ptr() as CK_BYTE_PTR,
            ciphertext.len() as CK_ULONG,
            plaintext.as_mut_ptr(),
            &mut out_len
        ),
        CKR_BUFFER_TOO_SMALL
    );
    assert_eq!(out_len, 32);

    assert_eq!(
        fn_decrypt(
            session,
            ciphertext.as_ptr() as CK_BYTE_PTR,
            ciphertext.len() as CK_ULONG,
            plaintext.as_mut_ptr(),
            &mut out_len
        ),
        CKR_OK
    );
    assert_eq!(out_len, 32);

    assert_eq!(
        fn_decrypt(
            session,
            ciphertext.as_ptr() as CK_BYTE_PTR,
            ciphertext.len() as CK_ULONG,
            plaintext.as_mut_ptr(),
            &mut out_len
        ),
        CKR_OPERATION_NOT_INITIALIZED
    );

    kms.finalize();
}

#[test]
#[serial]
fn test_decrypt_init_validation() {
    let kms = TestKms::new("decrypt_init_validation");
    kms.create_key(0, "rsa", KeyAlgorithm::RsaSignPkcs2048);
    kms.create_key(0, "oaep", KeyAlgorithm::RsaDecryptOaep2048);
    kms.initialize();

    let session = open_session(0);
    let sign_key = find_one(session, CKO_PRIVATE_KEY, "rsa");
    let oaep_key = find_one(session, CKO_PRIVATE_KEY, "oaep");

    // a sign-only mechanism cannot start a decryption
    assert_eq!(
        fn_decrypt_init(session, &mut mech(CKM_RSA_PKCS), oaep_key),
        CKR_MECHANISM_INVALID
    );
    // a signing key cannot decrypt
    let mut params = CK_RSA_PKCS_OAEP_PARAMS {
        hashAlg: CKM_SHA256,
        mgf: CKG_MGF1_SHA256,
        source: CKZ_DATA_SPECIFIED,
        pSourceData: std::ptr::null_mut(),
        ulSourceDataLen: 0,
    };
    let mut mechanism = CK_MECHANISM {
        mechanism: CKM_RSA_PKCS_OAEP,
        pParameter: &mut params as *mut _ as CK_VOID_PTR,
        ulParameterLen: std::mem::size_of::<CK_RSA_PKCS_OAEP_PARAMS>()
            as CK_ULONG,
    };
    assert_eq!(
        fn_decrypt_init(session, &mut mechanism, sign_key),
        CKR_KEY_FUNCTION_NOT_PERMITTED
    );

    kms.finalize();
}

#[test]
#[serial]
fn test_one_operation_at_a_time() {
    let kms = TestKms::new("one_operation");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP256);
    kms.initialize();

    let session = open_session(0);
    let key = find_one(session, CKO_PRIVATE_KEY, "ck");

    // an active find blocks a sign init on the same session
    assert_eq!(fn_find_objects_init(session, std::ptr::null_mut(), 0), CKR_OK);
    assert_eq!(
        fn_sign_init(session, &mut mech(CKM_ECDSA), key),
        CKR_OPERATION_ACTIVE
    );
    assert_eq!(fn_find_objects_final(session), CKR_OK);

    // other sessions are unaffected
    let other = open_session(0);
    assert_eq!(fn_sign_init(session, &mut mech(CKM_ECDSA), key), CKR_OK);
    assert_eq!(fn_sign_init(other, &mut mech(CKM_ECDSA), key), CKR_OK);

    kms.finalize();
}

#[test]
#[serial]
fn test_multi_part_operations_not_supported() {
    let kms = TestKms::new("multi_part");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP256);
    kms.initialize();

    let session = open_session(0);
    let mut part = [0u8; 4];
    assert_eq!(
        fn_sign_update(session, part.as_mut_ptr(), part.len() as CK_ULONG),
        CKR_FUNCTION_NOT_SUPPORTED
    );
    let mut len: CK_ULONG = 0;
    assert_eq!(
        fn_sign_final(session, std::ptr::null_mut(), &mut len),
        CKR_FUNCTION_NOT_SUPPORTED
    );
    assert_eq!(
        fn_decrypt_update(
            session,
            part.as_mut_ptr(),
            part.len() as CK_ULONG,
            std::ptr::null_mut(),
            &mut len
        ),
        CKR_FUNCTION_NOT_SUPPORTED
    );

    kms.finalize();
}
