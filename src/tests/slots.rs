// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

use super::*;

use serial_test::serial;

#[test]
#[serial]
fn test_get_info() {
    let kms = TestKms::new("get_info");
    kms.initialize();

    assert_eq!(fn_get_info(std::ptr::null_mut()), CKR_ARGUMENTS_BAD);

    let mut info = CK_INFO {
        cryptokiVersion: CK_VERSION { major: 0, minor: 0 },
        manufacturerID: [0; 32],
        flags: 0,
        libraryDescription: [0; 32],
        libraryVersion: CK_VERSION { major: 0, minor: 0 },
    };
    assert_eq!(fn_get_info(&mut info), CKR_OK);
    assert_eq!(info.cryptokiVersion, CK_VERSION { major: 2, minor: 40 });

    kms.finalize();
}

#[test]
#[serial]
fn test_get_slot_list() {
    let kms = TestKms::new("slot_list");
    kms.initialize();

    assert_eq!(
        fn_get_slot_list(CK_FALSE, std::ptr::null_mut(), std::ptr::null_mut()),
        CKR_ARGUMENTS_BAD
    );

    // size probe, twice to check it is stable
    let mut count: CK_ULONG = 0;
    assert_eq!(
        fn_get_slot_list(CK_FALSE, std::ptr::null_mut(), &mut count),
        CKR_OK
    );
    assert_eq!(count, 2);
    assert_eq!(
        fn_get_slot_list(CK_FALSE, std::ptr::null_mut(), &mut count),
        CKR_OK
    );
    assert_eq!(count, 2);

    // undersized buffer reports the required size
    let mut slots = [CK_UNAVAILABLE_INFORMATION; 2];
    count = 1;
    assert_eq!(
        fn_get_slot_list(CK_FALSE, slots.as_mut_ptr(), &mut count),
        CKR_BUFFER_TOO_SMALL
    );
    assert_eq!(count, 2);

    count = 2;
    assert_eq!(
        fn_get_slot_list(CK_FALSE, slots.as_mut_ptr(), &mut count),
        CKR_OK
    );
    assert_eq!(count, 2);
    assert_eq!(slots, [0, 1]);

    kms.finalize();
}

#[test]
#[serial]
fn test_get_slot_info() {
    let kms = TestKms::new("slot_info");
    kms.initialize();

    let mut info = CK_SLOT_INFO {
        slotDescription: [0; 64],
        manufacturerID: [0; 32],
        flags: 0,
        hardwareVersion: CK_VERSION { major: 0, minor: 0 },
        firmwareVersion: CK_VERSION { major: 0, minor: 0 },
    };
    assert_eq!(fn_get_slot_info(0, &mut info), CKR_OK);
    assert_eq!(info.flags & CKF_TOKEN_PRESENT, CKF_TOKEN_PRESENT);

    assert_eq!(
        fn_get_slot_info(2, std::ptr::null_mut()),
        CKR_SLOT_ID_INVALID
    );
    assert_eq!(fn_get_slot_info(0, std::ptr::null_mut()), CKR_ARGUMENTS_BAD);

    kms.finalize();
}

#[test]
#[serial]
fn test_get_token_info() {
    let kms = TestKms::new("token_info");
    kms.initialize();

    let mut info = unsafe { std::mem::zeroed::<CK_TOKEN_INFO>() };
    assert_eq!(fn_get_token_info(0, &mut info), CKR_OK);
    assert_eq!(
        info.flags & CKF_TOKEN_INITIALIZED,
        CKF_TOKEN_INITIALIZED
    );
    assert_eq!(info.flags & CKF_WRITE_PROTECTED, CKF_WRITE_PROTECTED);
    assert_eq!(&info.label[..4], b"foo ");

    let mut info2 = unsafe { std::mem::zeroed::<CK_TOKEN_INFO>() };
    assert_eq!(fn_get_token_info(1, &mut info2), CKR_OK);
    assert_eq!(&info2.label[..4], b"bar ");
    // serials derive from distinct key rings
    assert_ne!(info.serialNumber, info2.serialNumber);

    assert_eq!(
        fn_get_token_info(2, std::ptr::null_mut()),
        CKR_SLOT_ID_INVALID
    );

    kms.finalize();
}
