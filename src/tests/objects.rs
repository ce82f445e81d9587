// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

use super::*;
use crate::attribute::CK_ULONG_SIZE;

use serial_test::serial;

#[test]
#[serial]
fn test_find_no_objects() {
    let kms = TestKms::new("find_empty");
    kms.initialize();

    let session = open_session(0);
    assert_eq!(fn_find_objects_init(session, std::ptr::null_mut(), 0), CKR_OK);

    let mut handle: CK_OBJECT_HANDLE = CK_INVALID_HANDLE;
    let mut count: CK_ULONG = CK_UNAVAILABLE_INFORMATION;
    assert_eq!(fn_find_objects(session, &mut handle, 1, &mut count), CKR_OK);
    assert_eq!(count, 0);

    assert_eq!(fn_find_objects_final(session), CKR_OK);

    kms.finalize();
}

#[test]
#[serial]
fn test_find_state_machine() {
    let kms = TestKms::new("find_state");
    kms.initialize();

    let session = open_session(0);

    // no find active yet
    let mut handle: CK_OBJECT_HANDLE = CK_INVALID_HANDLE;
    let mut count: CK_ULONG = 0;
    assert_eq!(
        fn_find_objects(session, &mut handle, 1, &mut count),
        CKR_OPERATION_NOT_INITIALIZED
    );
    assert_eq!(
        fn_find_objects_final(session),
        CKR_OPERATION_NOT_INITIALIZED
    );

    assert_eq!(fn_find_objects_init(session, std::ptr::null_mut(), 0), CKR_OK);
    assert_eq!(
        fn_find_objects_init(session, std::ptr::null_mut(), 0),
        CKR_OPERATION_ACTIVE
    );
    assert_eq!(fn_find_objects_final(session), CKR_OK);

    // template pointer is required when a count is given
    assert_eq!(
        fn_find_objects_init(session, std::ptr::null_mut(), 1),
        CKR_ARGUMENTS_BAD
    );

    // output pointers are required
    assert_eq!(fn_find_objects_init(session, std::ptr::null_mut(), 0), CKR_OK);
    assert_eq!(
        fn_find_objects(session, std::ptr::null_mut(), 0, &mut count),
        CKR_ARGUMENTS_BAD
    );
    assert_eq!(
        fn_find_objects(session, &mut handle, 1, std::ptr::null_mut()),
        CKR_ARGUMENTS_BAD
    );
    assert_eq!(fn_find_objects_final(session), CKR_OK);

    // session validation precedes everything else
    assert_eq!(
        fn_find_objects(0, std::ptr::null_mut(), 0, std::ptr::null_mut()),
        CKR_SESSION_HANDLE_INVALID
    );
    assert_eq!(fn_find_objects_final(0), CKR_SESSION_HANDLE_INVALID);

    kms.finalize();
}

#[test]
#[serial]
fn test_find_ec_private_key() {
    let kms = TestKms::new("find_ec_key");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP256);
    kms.initialize();

    let session = open_session(0);

    let class = CKO_PRIVATE_KEY;
    let key_type = CKK_EC;
    let mut template = [
        CK_ATTRIBUTE {
            type_: CKA_CLASS,
            pValue: &class as *const _ as CK_VOID_PTR,
            ulValueLen: CK_ULONG_SIZE as CK_ULONG,
        },
        CK_ATTRIBUTE {
            type_: CKA_KEY_TYPE,
            pValue: &key_type as *const _ as CK_VOID_PTR,
            ulValueLen: CK_ULONG_SIZE as CK_ULONG,
        },
    ];
    let found = find_all(session, &mut template);
    assert_eq!(found.len(), 1);

    // read back class and label
    let mut read_class: CK_OBJECT_CLASS = CK_UNAVAILABLE_INFORMATION;
    let mut label = [0u8; 2];
    let mut read = [
        CK_ATTRIBUTE {
            type_: CKA_CLASS,
            pValue: &mut read_class as *mut _ as CK_VOID_PTR,
            ulValueLen: CK_ULONG_SIZE as CK_ULONG,
        },
        CK_ATTRIBUTE {
            type_: CKA_LABEL,
            pValue: label.as_mut_ptr() as CK_VOID_PTR,
            ulValueLen: label.len() as CK_ULONG,
        },
    ];
    assert_eq!(
        fn_get_attribute_value(session, found[0], read.as_mut_ptr(), 2),
        CKR_OK
    );
    assert_eq!(read_class, CKO_PRIVATE_KEY);
    assert_eq!(&label, b"ck");

    // the public half exists too
    let pub_class = CKO_PUBLIC_KEY;
    let mut template = class_template(&pub_class);
    assert_eq!(find_all(session, &mut template).len(), 1);

    kms.finalize();
}

#[test]
#[serial]
fn test_objects_are_per_token() {
    let kms = TestKms::new("objects_per_token");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP256);
    kms.initialize();

    let s0 = open_session(0);
    let s1 = open_session(1);

    let class = CKO_PRIVATE_KEY;
    let mut template = class_template(&class);
    let found = find_all(s0, &mut template);
    assert_eq!(found.len(), 1);

    // the second token has no objects
    let mut template = class_template(&class);
    assert_eq!(find_all(s1, &mut template).len(), 0);

    // and the first token's handle does not resolve through it
    let mut key_type: CK_KEY_TYPE = 0;
    let mut attr = CK_ATTRIBUTE {
        type_: CKA_KEY_TYPE,
        pValue: &mut key_type as *mut _ as CK_VOID_PTR,
        ulValueLen: CK_ULONG_SIZE as CK_ULONG,
    };
    assert_eq!(
        fn_get_attribute_value(s1, found[0], &mut attr, 1),
        CKR_OBJECT_HANDLE_INVALID
    );
    assert_eq!(fn_get_attribute_value(s0, found[0], &mut attr, 1), CKR_OK);
    assert_eq!(key_type, CKK_EC);

    kms.finalize();
}

#[test]
#[serial]
fn test_get_attribute_value_outcomes() {
    let kms = TestKms::new("attr_outcomes");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP256);
    kms.initialize();

    let session = open_session(0);
    let class = CKO_PRIVATE_KEY;
    let mut template = class_template(&class);
    let key = find_all(session, &mut template)[0];

    // sensitive attribute
    let mut value = [0u8; 256];
    let mut attr = CK_ATTRIBUTE {
        type_: CKA_VALUE,
        pValue: value.as_mut_ptr() as CK_VOID_PTR,
        ulValueLen: value.len() as CK_ULONG,
    };
    assert_eq!(
        fn_get_attribute_value(session, key, &mut attr, 1),
        CKR_ATTRIBUTE_SENSITIVE
    );
    assert_eq!(attr.ulValueLen, CK_UNAVAILABLE_INFORMATION);

    // absent attribute
    let mut attr = CK_ATTRIBUTE {
        type_: CKA_MODULUS,
        pValue: value.as_mut_ptr() as CK_VOID_PTR,
        ulValueLen: value.len() as CK_ULONG,
    };
    assert_eq!(
        fn_get_attribute_value(session, key, &mut attr, 1),
        CKR_ATTRIBUTE_TYPE_INVALID
    );
    assert_eq!(attr.ulValueLen, CK_UNAVAILABLE_INFORMATION);

    // size probe
    let mut attr = CK_ATTRIBUTE {
        type_: CKA_PUBLIC_KEY_INFO,
        pValue: std::ptr::null_mut(),
        ulValueLen: 0,
    };
    assert_eq!(fn_get_attribute_value(session, key, &mut attr, 1), CKR_OK);
    assert!(attr.ulValueLen > 0);
    assert_ne!(attr.ulValueLen, CK_UNAVAILABLE_INFORMATION);

    // undersized buffer
    let mut short = [0u8; 2];
    let mut attr = CK_ATTRIBUTE {
        type_: CKA_EC_PARAMS,
        pValue: short.as_mut_ptr() as CK_VOID_PTR,
        ulValueLen: short.len() as CK_ULONG,
    };
    assert_eq!(
        fn_get_attribute_value(session, key, &mut attr, 1),
        CKR_BUFFER_TOO_SMALL
    );
    assert_eq!(attr.ulValueLen, CK_UNAVAILABLE_INFORMATION);

    // handle and argument validation
    assert_eq!(
        fn_get_attribute_value(0, 0, std::ptr::null_mut(), 0),
        CKR_SESSION_HANDLE_INVALID
    );
    assert_eq!(
        fn_get_attribute_value(session, 0, std::ptr::null_mut(), 0),
        CKR_OBJECT_HANDLE_INVALID
    );
    assert_eq!(
        fn_get_attribute_value(session, key, std::ptr::null_mut(), 1),
        CKR_ARGUMENTS_BAD
    );

    kms.finalize();
}

#[test]
#[serial]
fn test_get_attribute_value_processes_every_entry() {
    let kms = TestKms::new("attr_mixed");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP256);
    kms.initialize();

    let session = open_session(0);
    let class = CKO_PRIVATE_KEY;
    let mut template = class_template(&class);
    let key = find_all(session, &mut template)[0];

    let mut decrypt: CK_BBOOL = CK_UNAVAILABLE_INFORMATION as CK_BBOOL;
    let mut token: CK_BBOOL = CK_UNAVAILABLE_INFORMATION as CK_BBOOL;
    let mut value_buf = [0u8; 2];
    let mut point_buf = [0u8; 2];
    let mut modulus_buf = [0u8; 2];
    let mut attrs = [
        CK_ATTRIBUTE {
            type_: CKA_DECRYPT,
            pValue: &mut decrypt as *mut _ as CK_VOID_PTR,
            ulValueLen: 1,
        },
        CK_ATTRIBUTE {
            type_: CKA_VALUE,
            pValue: value_buf.as_mut_ptr() as CK_VOID_PTR,
            ulValueLen: value_buf.len() as CK_ULONG,
        },
        CK_ATTRIBUTE {
            type_: CKA_EC_POINT,
            pValue: point_buf.as_mut_ptr() as CK_VOID_PTR,
            ulValueLen: point_buf.len() as CK_ULONG,
        },
        CK_ATTRIBUTE {
            type_: CKA_MODULUS,
            pValue: modulus_buf.as_mut_ptr() as CK_VOID_PTR,
            ulValueLen: modulus_buf.len() as CK_ULONG,
        },
        CK_ATTRIBUTE {
            type_: CKA_TOKEN,
            pValue: &mut token as *mut _ as CK_VOID_PTR,
            ulValueLen: 1,
        },
    ];

    let rv = fn_get_attribute_value(session, key, attrs.as_mut_ptr(), 5);
    assert!(
        rv == CKR_BUFFER_TOO_SMALL
            || rv == CKR_ATTRIBUTE_SENSITIVE
            || rv == CKR_ATTRIBUTE_TYPE_INVALID
    );

    // entries with sufficient buffers were processed anyway
    assert_eq!(decrypt, CK_FALSE);
    assert_eq!(attrs[0].ulValueLen, 1);
    assert_eq!(token, CK_TRUE);
    assert_eq!(attrs[4].ulValueLen, 1);

    // every failing entry reports its own outcome
    assert_eq!(attrs[1].ulValueLen, CK_UNAVAILABLE_INFORMATION);
    assert_eq!(attrs[2].ulValueLen, CK_UNAVAILABLE_INFORMATION);
    assert_eq!(attrs[3].ulValueLen, CK_UNAVAILABLE_INFORMATION);

    kms.finalize();
}

#[test]
#[serial]
fn test_certificates_synthesized_on_opt_in() {
    let kms = TestKms::new("certs_opt_in");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP256);
    kms.create_key(0, "dk", KeyAlgorithm::RsaDecryptOaep2048);
    kms.write_config(true);
    kms.initialize();

    let session = open_session(0);
    let class = CKO_CERTIFICATE;
    let mut template = class_template(&class);
    let found = find_all(session, &mut template);
    // decryption keys get no certificate
    assert_eq!(found.len(), 1);

    let mut attr = CK_ATTRIBUTE {
        type_: CKA_VALUE,
        pValue: std::ptr::null_mut(),
        ulValueLen: 0,
    };
    assert_eq!(fn_get_attribute_value(session, found[0], &mut attr, 1), CKR_OK);
    let mut der = vec![0u8; attr.ulValueLen as usize];
    attr.pValue = der.as_mut_ptr() as CK_VOID_PTR;
    assert_eq!(fn_get_attribute_value(session, found[0], &mut attr, 1), CKR_OK);
    // a DER SEQUENCE
    assert_eq!(der[0], 0x30);

    kms.finalize();
}

#[test]
#[serial]
fn test_no_certificates_by_default() {
    let kms = TestKms::new("certs_default");
    kms.create_key(0, "ck", KeyAlgorithm::EcSignP256);
    kms.initialize();

    let session = open_session(0);
    let class = CKO_CERTIFICATE;
    let mut template = class_template(&class);
    assert_eq!(find_all(session, &mut template).len(), 0);

    kms.finalize();
}
