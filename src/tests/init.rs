// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

use super::*;
use crate::config::CONFIG_ENV_VARIABLE;

use serial_test::serial;

#[test]
#[serial]
fn test_initialize_from_args() {
    let kms = TestKms::new("init_from_args");
    kms.initialize();
    kms.finalize();
}

#[test]
#[serial]
fn test_initialize_fails_on_second_call() {
    let kms = TestKms::new("init_twice");
    kms.initialize();
    assert_eq!(kms.initialize_rv(), CKR_CRYPTOKI_ALREADY_INITIALIZED);
    kms.finalize();
}

#[test]
#[serial]
fn test_initialize_from_environment() {
    let kms = TestKms::new("init_from_env");
    std::env::set_var(CONFIG_ENV_VARIABLE, kms.config_path());
    let ret = fn_initialize(std::ptr::null_mut());
    std::env::remove_var(CONFIG_ENV_VARIABLE);
    assert_eq!(ret, CKR_OK);
    kms.finalize();
}

#[test]
#[serial]
fn test_init_args_without_reserved_loads_from_env() {
    let kms = TestKms::new("init_env_fallback");
    std::env::set_var(CONFIG_ENV_VARIABLE, kms.config_path());
    let mut args = kms.make_init_args();
    args.pReserved = std::ptr::null_mut();
    let ret = fn_initialize(&mut args as *mut _ as CK_VOID_PTR);
    std::env::remove_var(CONFIG_ENV_VARIABLE);
    assert_eq!(ret, CKR_OK);
    kms.finalize();
}

#[test]
#[serial]
fn test_initialize_fails_without_config() {
    std::env::remove_var(CONFIG_ENV_VARIABLE);
    assert_eq!(fn_initialize(std::ptr::null_mut()), CKR_ARGUMENTS_BAD);
}

#[test]
#[serial]
fn test_initialize_fails_on_missing_file() {
    let kms = TestKms::new("init_missing_file");
    std::fs::remove_file(kms.config_path()).unwrap();
    assert_eq!(kms.initialize_rv(), CKR_GENERAL_ERROR);
}

#[test]
#[serial]
fn test_initialize_fails_on_unknown_key_ring() {
    let kms = TestKms::new("init_bad_ring");
    let content = format!(
        "tokens:\n  - key_ring: \"projects/p/locations/global/keyRings/absent\"\n    label: \"foo\"\nkms_endpoint: \"{}\"\n",
        kms.fake.endpoint()
    );
    std::fs::write(kms.config_path(), content).unwrap();
    kms.set_config_mode(0o600);
    assert_eq!(kms.initialize_rv(), CKR_GENERAL_ERROR);
    // a failed initialization leaves no observable state behind
    assert_eq!(fn_finalize(std::ptr::null_mut()), CKR_CRYPTOKI_NOT_INITIALIZED);
}

#[cfg(unix)]
#[test]
#[serial]
fn test_initialize_rejects_writable_config() {
    let kms = TestKms::new("init_writable_config");
    kms.set_config_mode(0o666);
    assert_eq!(kms.initialize_rv(), CKR_GENERAL_ERROR);
    kms.set_config_mode(0o600);
    kms.initialize();
    kms.finalize();
}

#[test]
#[serial]
fn test_finalize_fails_without_initialize() {
    assert_eq!(
        fn_finalize(std::ptr::null_mut()),
        CKR_CRYPTOKI_NOT_INITIALIZED
    );
}

#[test]
#[serial]
fn test_finalize_rejects_reserved_argument() {
    let kms = TestKms::new("finalize_reserved");
    kms.initialize();
    let mut bogus: u64 = 0;
    assert_eq!(
        fn_finalize(&mut bogus as *mut _ as CK_VOID_PTR),
        CKR_ARGUMENTS_BAD
    );
    kms.finalize();
}

#[test]
#[serial]
fn test_reinitialize_after_finalize() {
    let kms = TestKms::new("reinit");
    kms.initialize();
    kms.finalize();
    kms.initialize();
    kms.finalize();
}

#[test]
#[serial]
fn test_uninitialized_entry_points() {
    let mut info = CK_INFO {
        cryptokiVersion: CK_VERSION { major: 0, minor: 0 },
        manufacturerID: [0; 32],
        flags: 0,
        libraryDescription: [0; 32],
        libraryVersion: CK_VERSION { major: 0, minor: 0 },
    };
    assert_eq!(fn_get_info(&mut info), CKR_CRYPTOKI_NOT_INITIALIZED);
    let mut count: CK_ULONG = 0;
    assert_eq!(
        fn_get_slot_list(CK_FALSE, std::ptr::null_mut(), &mut count),
        CKR_CRYPTOKI_NOT_INITIALIZED
    );
    assert_eq!(
        fn_get_slot_info(0, std::ptr::null_mut()),
        CKR_CRYPTOKI_NOT_INITIALIZED
    );
    assert_eq!(
        fn_get_token_info(0, std::ptr::null_mut()),
        CKR_CRYPTOKI_NOT_INITIALIZED
    );
    assert_eq!(
        fn_get_mechanism_list(0, std::ptr::null_mut(), &mut count),
        CKR_CRYPTOKI_NOT_INITIALIZED
    );
    let mut handle: CK_SESSION_HANDLE = CK_INVALID_HANDLE;
    assert_eq!(
        fn_open_session(0, 0, std::ptr::null_mut(), None, &mut handle),
        CKR_CRYPTOKI_NOT_INITIALIZED
    );
    assert_eq!(fn_close_session(0), CKR_CRYPTOKI_NOT_INITIALIZED);
    assert_eq!(
        fn_login(0, CKU_USER, std::ptr::null_mut(), 0),
        CKR_CRYPTOKI_NOT_INITIALIZED
    );
    assert_eq!(fn_logout(0), CKR_CRYPTOKI_NOT_INITIALIZED);
    assert_eq!(
        fn_get_attribute_value(0, 0, std::ptr::null_mut(), 0),
        CKR_CRYPTOKI_NOT_INITIALIZED
    );
    assert_eq!(
        fn_find_objects_init(0, std::ptr::null_mut(), 0),
        CKR_CRYPTOKI_NOT_INITIALIZED
    );
    assert_eq!(
        fn_find_objects(0, std::ptr::null_mut(), 0, std::ptr::null_mut()),
        CKR_CRYPTOKI_NOT_INITIALIZED
    );
    assert_eq!(fn_find_objects_final(0), CKR_CRYPTOKI_NOT_INITIALIZED);
}

#[test]
#[serial]
fn test_get_function_list() {
    assert_eq!(
        C_GetFunctionList(std::ptr::null_mut()),
        CKR_ARGUMENTS_BAD
    );

    let mut list: CK_FUNCTION_LIST_PTR = std::ptr::null();
    assert_eq!(C_GetFunctionList(&mut list), CKR_OK);
    assert!(!list.is_null());

    let table = unsafe { &*list };
    assert_eq!(table.version, CK_VERSION { major: 2, minor: 40 });

    // the table entries are live
    let kms = TestKms::new("function_list");
    let mut args = kms.make_init_args();
    let initialize = table.C_Initialize.unwrap();
    assert_eq!(initialize(&mut args as *mut _ as CK_VOID_PTR), CKR_OK);
    let mut info = CK_INFO {
        cryptokiVersion: CK_VERSION { major: 0, minor: 0 },
        manufacturerID: [0; 32],
        flags: 0,
        libraryDescription: [0; 32],
        libraryVersion: CK_VERSION { major: 0, minor: 0 },
    };
    assert_eq!(table.C_GetInfo.unwrap()(&mut info), CKR_OK);
    assert_eq!(table.C_Finalize.unwrap()(std::ptr::null_mut()), CKR_OK);
}
