// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

//! PKCS#11 provider backed by a cloud key management service.
//!
//! A configuration file binds remote key rings to virtual tokens; the
//! key versions inside each ring surface as key objects that callers
//! enumerate, inspect and use for signing or asymmetric decryption.
//! Private key material never leaves the remote service.
//!
//! This file is the C-ABI bridge: every exported Cryptoki entry point
//! validates its raw arguments, dispatches into the provider state and
//! translates internal errors into PKCS#11 return codes. Nothing
//! unwinds across the C boundary.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::RwLock;

pub mod attribute;
pub mod certs;
pub mod config;
pub mod error;
pub mod kms;
pub mod log;
pub mod mechanism;
pub mod object;
pub mod pkcs11;
pub mod provider;
pub mod session;
pub mod spki;
pub mod token;

use config::Config;
use pkcs11::*;
use provider::Provider;
use session::{DecryptState, SignState};

/// The initialization latch: Initialize and Finalize take the write
/// side, every other entry point the read side. The provider is either
/// fully constructed or absent.
static PROVIDER: RwLock<Option<Provider>> = RwLock::new(None);

/// Acquires the provider for reading; bails out of the calling entry
/// point with CKR_CRYPTOKI_NOT_INITIALIZED before any other validation
/// when the latch is empty.
macro_rules! provider_rlock {
    ($guard:ident, $provider:ident) => {
        let $guard = match PROVIDER.read() {
            Ok(guard) => guard,
            Err(_) => return CKR_GENERAL_ERROR,
        };
        let $provider = match $guard.as_ref() {
            Some(provider) => provider,
            None => return CKR_CRYPTOKI_NOT_INITIALIZED,
        };
    };
}

macro_rules! ok_or_ret {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(err) => return err.rv(),
        }
    };
}

macro_rules! ret_to_rv {
    ($result:expr) => {
        match $result {
            Ok(()) => CKR_OK,
            Err(err) => err.rv(),
        }
    };
}

extern "C" fn fn_initialize(init_args: CK_VOID_PTR) -> CK_RV {
    log::setup();

    let mut path_arg: Option<String> = None;
    if !init_args.is_null() {
        let args = init_args as *const CK_C_INITIALIZE_ARGS;
        let reserved = unsafe { (*args).pReserved };
        if !reserved.is_null() {
            let path =
                match unsafe { CStr::from_ptr(reserved as *const c_char) }
                    .to_str()
                {
                    Ok(path) => path,
                    Err(_) => return CKR_ARGUMENTS_BAD,
                };
            path_arg = Some(path.to_string());
        }
    }

    let mut guard = match PROVIDER.write() {
        Ok(guard) => guard,
        Err(_) => return CKR_GENERAL_ERROR,
    };
    if guard.is_some() {
        return CKR_CRYPTOKI_ALREADY_INITIALIZED;
    }
    let result = Config::resolve_path(path_arg.as_deref())
        .and_then(|path| Config::from_file(&path))
        .and_then(Provider::new);
    match result {
        Ok(provider) => {
            *guard = Some(provider);
            CKR_OK
        }
        Err(err) => err.rv(),
    }
}

extern "C" fn fn_finalize(reserved: CK_VOID_PTR) -> CK_RV {
    if !reserved.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    let mut guard = match PROVIDER.write() {
        Ok(guard) => guard,
        Err(_) => return CKR_GENERAL_ERROR,
    };
    if guard.is_none() {
        return CKR_CRYPTOKI_NOT_INITIALIZED;
    }
    *guard = None;
    CKR_OK
}

static CRYPTOKI_VERSION: CK_VERSION = CK_VERSION { major: 2, minor: 40 };
static MANUFACTURER_ID: [CK_UTF8CHAR; 32] =
    *b"kms-pkcs11                      ";
static LIBRARY_DESCRIPTION: [CK_UTF8CHAR; 32] =
    *b"Cloud KMS PKCS#11 Library       ";
static LIBRARY_VERSION: CK_VERSION = CK_VERSION { major: 0, minor: 1 };

static MODULE_INFO: CK_INFO = CK_INFO {
    cryptokiVersion: CRYPTOKI_VERSION,
    manufacturerID: MANUFACTURER_ID,
    flags: 0,
    libraryDescription: LIBRARY_DESCRIPTION,
    libraryVersion: LIBRARY_VERSION,
};

extern "C" fn fn_get_info(info: CK_INFO_PTR) -> CK_RV {
    provider_rlock!(_guard, _provider);
    if info.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    unsafe {
        *info = MODULE_INFO;
    }
    CKR_OK
}

extern "C" fn fn_get_slot_list(
    _token_present: CK_BBOOL,
    slot_list: CK_SLOT_ID_PTR,
    count: CK_ULONG_PTR,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    if count.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    let num = provider.slot_count();
    if slot_list.is_null() {
        unsafe {
            *count = num as CK_ULONG;
        }
        return CKR_OK;
    }
    if unsafe { *count } < num as CK_ULONG {
        unsafe {
            *count = num as CK_ULONG;
        }
        return CKR_BUFFER_TOO_SMALL;
    }
    for slot_id in 0..num {
        unsafe {
            core::ptr::write(
                slot_list.add(slot_id),
                slot_id as CK_SLOT_ID,
            );
        }
    }
    unsafe {
        *count = num as CK_ULONG;
    }
    CKR_OK
}

extern "C" fn fn_get_slot_info(
    slot_id: CK_SLOT_ID,
    info: CK_SLOT_INFO_PTR,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    let token = ok_or_ret!(provider.token(slot_id));
    if info.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    unsafe {
        core::ptr::write(info, *token.get_slot_info());
    }
    CKR_OK
}

extern "C" fn fn_get_token_info(
    slot_id: CK_SLOT_ID,
    info: CK_TOKEN_INFO_PTR,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    let token = ok_or_ret!(provider.token(slot_id));
    if info.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    unsafe {
        core::ptr::write(info, *token.get_token_info());
    }
    CKR_OK
}

extern "C" fn fn_get_mechanism_list(
    slot_id: CK_SLOT_ID,
    mechanism_list: CK_MECHANISM_TYPE_PTR,
    count: CK_ULONG_PTR,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    {
        let _token = ok_or_ret!(provider.token(slot_id));
    }
    if count.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    let mechs = mechanism::registry().list();
    if mechanism_list.is_null() {
        unsafe {
            *count = mechs.len() as CK_ULONG;
        }
        return CKR_OK;
    }
    if unsafe { *count } < mechs.len() as CK_ULONG {
        unsafe {
            *count = mechs.len() as CK_ULONG;
        }
        return CKR_BUFFER_TOO_SMALL;
    }
    for (idx, mech) in mechs.iter().enumerate() {
        unsafe {
            core::ptr::write(mechanism_list.add(idx), *mech);
        }
    }
    unsafe {
        *count = mechs.len() as CK_ULONG;
    }
    CKR_OK
}

extern "C" fn fn_get_mechanism_info(
    slot_id: CK_SLOT_ID,
    typ: CK_MECHANISM_TYPE,
    info: CK_MECHANISM_INFO_PTR,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    {
        let _token = ok_or_ret!(provider.token(slot_id));
    }
    if info.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    let mech_info = ok_or_ret!(mechanism::registry().info(typ));
    unsafe {
        core::ptr::write(info, *mech_info);
    }
    CKR_OK
}

extern "C" fn fn_open_session(
    slot_id: CK_SLOT_ID,
    flags: CK_FLAGS,
    _application: CK_VOID_PTR,
    _notify: CK_NOTIFY,
    ph_session: CK_SESSION_HANDLE_PTR,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    {
        let _token = ok_or_ret!(provider.token(slot_id));
    }
    if flags & CKF_SERIAL_SESSION == 0 {
        return CKR_SESSION_PARALLEL_NOT_SUPPORTED;
    }
    if flags & CKF_RW_SESSION != 0 {
        // the token is permanently write protected
        return CKR_TOKEN_WRITE_PROTECTED;
    }
    if ph_session.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    let handle = ok_or_ret!(provider.open_session(slot_id, flags));
    unsafe {
        core::ptr::write(ph_session, handle);
    }
    CKR_OK
}

extern "C" fn fn_close_session(s_handle: CK_SESSION_HANDLE) -> CK_RV {
    provider_rlock!(_guard, provider);
    ret_to_rv!(provider.close_session(s_handle))
}

extern "C" fn fn_close_all_sessions(slot_id: CK_SLOT_ID) -> CK_RV {
    provider_rlock!(_guard, provider);
    {
        let _token = ok_or_ret!(provider.token(slot_id));
    }
    ret_to_rv!(provider.close_all_sessions(slot_id))
}

extern "C" fn fn_get_session_info(
    s_handle: CK_SESSION_HANDLE,
    info: CK_SESSION_INFO_PTR,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    let (slot_id, flags) = ok_or_ret!(provider.with_session(
        s_handle,
        |session| Ok((session.get_slot_id(), session.get_flags()))
    ));
    if info.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    let token = ok_or_ret!(provider.token(slot_id));
    let session_info = CK_SESSION_INFO {
        slotID: slot_id,
        state: token.session_state(),
        flags: flags,
        ulDeviceError: 0,
    };
    unsafe {
        core::ptr::write(info, session_info);
    }
    CKR_OK
}

extern "C" fn fn_login(
    s_handle: CK_SESSION_HANDLE,
    user_type: CK_USER_TYPE,
    _pin: CK_UTF8CHAR_PTR,
    _pin_len: CK_ULONG,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    let slot_id = ok_or_ret!(provider.session_slot(s_handle));
    match user_type {
        // there is no security officer on this token
        CKU_SO => CKR_PIN_LOCKED,
        CKU_USER => {
            let mut token = ok_or_ret!(provider.token_mut(slot_id));
            ret_to_rv!(token.login())
        }
        _ => CKR_USER_TYPE_INVALID,
    }
}

extern "C" fn fn_logout(s_handle: CK_SESSION_HANDLE) -> CK_RV {
    provider_rlock!(_guard, provider);
    let slot_id = ok_or_ret!(provider.session_slot(s_handle));
    let mut token = ok_or_ret!(provider.token_mut(slot_id));
    ret_to_rv!(token.logout())
}

extern "C" fn fn_get_attribute_value(
    s_handle: CK_SESSION_HANDLE,
    o_handle: CK_OBJECT_HANDLE,
    template: CK_ATTRIBUTE_PTR,
    count: CK_ULONG,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    let slot_id = ok_or_ret!(provider.session_slot(s_handle));
    let token = ok_or_ret!(provider.token(slot_id));
    let obj = ok_or_ret!(token.object(o_handle));
    if count == 0 {
        return CKR_OK;
    }
    if template.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    let tmpl: &mut [CK_ATTRIBUTE] =
        unsafe { std::slice::from_raw_parts_mut(template, count as usize) };
    ret_to_rv!(obj.fill_template(tmpl))
}

extern "C" fn fn_find_objects_init(
    s_handle: CK_SESSION_HANDLE,
    template: CK_ATTRIBUTE_PTR,
    count: CK_ULONG,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    let slot_id = ok_or_ret!(provider.session_slot(s_handle));
    if template.is_null() && count > 0 {
        return CKR_ARGUMENTS_BAD;
    }
    let tmpl: &[CK_ATTRIBUTE] = if count == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(template, count as usize) }
    };
    let handles = {
        let token = ok_or_ret!(provider.token(slot_id));
        token.search(tmpl)
    };
    ret_to_rv!(
        provider.with_session(s_handle, |session| session.find_init(handles))
    )
}

extern "C" fn fn_find_objects(
    s_handle: CK_SESSION_HANDLE,
    ph_object: CK_OBJECT_HANDLE_PTR,
    max_object_count: CK_ULONG,
    pul_object_count: CK_ULONG_PTR,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    ok_or_ret!(provider.session_slot(s_handle));
    if ph_object.is_null() || pul_object_count.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    let handles = ok_or_ret!(provider.with_session(s_handle, |session| {
        session.find_next(max_object_count as usize)
    }));
    for (idx, handle) in handles.iter().enumerate() {
        unsafe {
            core::ptr::write(ph_object.add(idx), *handle);
        }
    }
    unsafe {
        *pul_object_count = handles.len() as CK_ULONG;
    }
    CKR_OK
}

extern "C" fn fn_find_objects_final(s_handle: CK_SESSION_HANDLE) -> CK_RV {
    provider_rlock!(_guard, provider);
    ret_to_rv!(provider.with_session(s_handle, |session| session.find_final()))
}

/// Validates mechanism parameter shape for the operation-init calls
fn check_mechanism_params(mechanism: &CK_MECHANISM) -> CK_RV {
    match mechanism.mechanism {
        CKM_RSA_PKCS | CKM_ECDSA => {
            if mechanism.ulParameterLen != 0 {
                return CKR_MECHANISM_PARAM_INVALID;
            }
        }
        CKM_RSA_PKCS_PSS => {
            if mechanism.ulParameterLen as usize
                != std::mem::size_of::<CK_RSA_PKCS_PSS_PARAMS>()
            {
                return CKR_MECHANISM_PARAM_INVALID;
            }
        }
        CKM_RSA_PKCS_OAEP => {
            if mechanism.ulParameterLen as usize
                != std::mem::size_of::<CK_RSA_PKCS_OAEP_PARAMS>()
            {
                return CKR_MECHANISM_PARAM_INVALID;
            }
        }
        _ => (),
    }
    CKR_OK
}

extern "C" fn fn_sign_init(
    s_handle: CK_SESSION_HANDLE,
    mechanism: CK_MECHANISM_PTR,
    key: CK_OBJECT_HANDLE,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    let slot_id = ok_or_ret!(provider.session_slot(s_handle));
    if mechanism.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    let mech = unsafe { *mechanism };
    let key_ref = {
        let token = ok_or_ret!(provider.token(slot_id));
        let obj = ok_or_ret!(token.object(key));
        if obj.get_class() != CKO_PRIVATE_KEY {
            return CKR_KEY_HANDLE_INVALID;
        }
        match obj.kms_key() {
            Some(key_ref) => key_ref.clone(),
            None => return CKR_KEY_HANDLE_INVALID,
        }
    };
    ok_or_ret!(mechanism::validate_sign(
        mechanism::registry(),
        mech.mechanism,
        key_ref.algorithm
    ));
    let rv = check_mechanism_params(&mech);
    if rv != CKR_OK {
        return rv;
    }
    ret_to_rv!(provider.with_session(s_handle, |session| {
        session.sign_init(SignState {
            version: key_ref.version,
            algorithm: key_ref.algorithm,
        })
    }))
}

extern "C" fn fn_sign(
    s_handle: CK_SESSION_HANDLE,
    data: CK_BYTE_PTR,
    data_len: CK_ULONG,
    signature: CK_BYTE_PTR,
    pul_signature_len: CK_ULONG_PTR,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    let client = provider.client();
    ret_to_rv!(provider.with_session(s_handle, |session| {
        let (version, algorithm) = {
            let state = session.sign_state()?;
            (state.version.clone(), state.algorithm)
        };
        if pul_signature_len.is_null() {
            session.clear_operation();
            return Err(CKR_ARGUMENTS_BAD)?;
        }
        let sig_size = algorithm.signature_size() as CK_ULONG;
        if signature.is_null() {
            // length probe, the operation stays active
            unsafe {
                *pul_signature_len = sig_size;
            }
            return Ok(());
        }
        if unsafe { *pul_signature_len } < sig_size {
            unsafe {
                *pul_signature_len = sig_size;
            }
            return Err(CKR_BUFFER_TOO_SMALL)?;
        }
        // past this point the operation terminates, whatever happens
        if data.is_null() {
            session.clear_operation();
            return Err(CKR_ARGUMENTS_BAD)?;
        }
        let input = unsafe {
            std::slice::from_raw_parts(data, data_len as usize)
        };
        if let Some(curve) = algorithm.curve() {
            if input.len() != curve.digest_size() {
                session.clear_operation();
                return Err(CKR_DATA_LEN_RANGE)?;
            }
        }
        let result =
            client.asymmetric_sign(&version, input).and_then(|sig| {
                match algorithm.curve() {
                    Some(curve) => spki::ecdsa_sig_to_raw(&sig, curve),
                    None => Ok(sig),
                }
            });
        session.clear_operation();
        let sig_bytes = result?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                sig_bytes.as_ptr(),
                signature,
                sig_bytes.len(),
            );
            *pul_signature_len = sig_bytes.len() as CK_ULONG;
        }
        Ok(())
    }))
}

extern "C" fn fn_decrypt_init(
    s_handle: CK_SESSION_HANDLE,
    mechanism: CK_MECHANISM_PTR,
    key: CK_OBJECT_HANDLE,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    let slot_id = ok_or_ret!(provider.session_slot(s_handle));
    if mechanism.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    let mech = unsafe { *mechanism };
    let key_ref = {
        let token = ok_or_ret!(provider.token(slot_id));
        let obj = ok_or_ret!(token.object(key));
        if obj.get_class() != CKO_PRIVATE_KEY {
            return CKR_KEY_HANDLE_INVALID;
        }
        match obj.kms_key() {
            Some(key_ref) => key_ref.clone(),
            None => return CKR_KEY_HANDLE_INVALID,
        }
    };
    ok_or_ret!(mechanism::validate_decrypt(
        mechanism::registry(),
        mech.mechanism,
        key_ref.algorithm
    ));
    let rv = check_mechanism_params(&mech);
    if rv != CKR_OK {
        return rv;
    }
    ret_to_rv!(provider.with_session(s_handle, |session| {
        session.decrypt_init(DecryptState {
            version: key_ref.version,
            algorithm: key_ref.algorithm,
            plaintext: None,
        })
    }))
}

extern "C" fn fn_decrypt(
    s_handle: CK_SESSION_HANDLE,
    encrypted_data: CK_BYTE_PTR,
    encrypted_data_len: CK_ULONG,
    data: CK_BYTE_PTR,
    pul_data_len: CK_ULONG_PTR,
) -> CK_RV {
    provider_rlock!(_guard, provider);
    let client = provider.client();
    ret_to_rv!(provider.with_session(s_handle, |session| {
        let (version, algorithm) = {
            let state = session.decrypt_state_mut()?;
            (state.version.clone(), state.algorithm)
        };
        if pul_data_len.is_null() {
            session.clear_operation();
            return Err(CKR_ARGUMENTS_BAD)?;
        }
        if data.is_null() {
            // length probe before the remote call reports the upper
            // bound, afterwards the exact plaintext size
            let len = match session.decrypt_state_mut()?.plaintext {
                Some(ref plaintext) => plaintext.len() as CK_ULONG,
                None => (algorithm.key_bits() / 8) as CK_ULONG,
            };
            unsafe {
                *pul_data_len = len;
            }
            return Ok(());
        }
        if session.decrypt_state_mut()?.plaintext.is_none() {
            if encrypted_data.is_null() {
                session.clear_operation();
                return Err(CKR_ARGUMENTS_BAD)?;
            }
            let input = unsafe {
                std::slice::from_raw_parts(
                    encrypted_data,
                    encrypted_data_len as usize,
                )
            };
            let plaintext = match client.asymmetric_decrypt(&version, input) {
                Ok(plaintext) => plaintext,
                Err(err) => {
                    session.clear_operation();
                    return Err(err);
                }
            };
            session.decrypt_state_mut()?.plaintext = Some(plaintext);
        }
        let plaintext_len = match session.decrypt_state_mut()?.plaintext {
            Some(ref plaintext) => plaintext.len() as CK_ULONG,
            None => 0,
        };
        if unsafe { *pul_data_len } < plaintext_len {
            unsafe {
                *pul_data_len = plaintext_len;
            }
            return Err(CKR_BUFFER_TOO_SMALL)?;
        }
        let plaintext = session
            .decrypt_state_mut()?
            .plaintext
            .take()
            .unwrap_or_default();
        unsafe {
            std::ptr::copy_nonoverlapping(
                plaintext.as_ptr(),
                data,
                plaintext.len(),
            );
            *pul_data_len = plaintext.len() as CK_ULONG;
        }
        session.clear_operation();
        Ok(())
    }))
}

/* Entry points outside the scope of this provider. InitToken and the
 * PIN calls have nothing to manage (the token is write protected and
 * authentication is federated), and the remaining families are not
 * supported against the remote service. */

extern "C" fn fn_init_token(
    _slot_id: CK_SLOT_ID,
    _pin: CK_UTF8CHAR_PTR,
    _pin_len: CK_ULONG,
    _label: CK_UTF8CHAR_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_init_pin(
    _session: CK_SESSION_HANDLE,
    _pin: CK_UTF8CHAR_PTR,
    _pin_len: CK_ULONG,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_set_pin(
    _session: CK_SESSION_HANDLE,
    _old_pin: CK_UTF8CHAR_PTR,
    _old_len: CK_ULONG,
    _new_pin: CK_UTF8CHAR_PTR,
    _new_len: CK_ULONG,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_get_operation_state(
    _session: CK_SESSION_HANDLE,
    _operation_state: CK_BYTE_PTR,
    _pul_operation_state_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_set_operation_state(
    _session: CK_SESSION_HANDLE,
    _operation_state: CK_BYTE_PTR,
    _operation_state_len: CK_ULONG,
    _encryption_key: CK_OBJECT_HANDLE,
    _authentication_key: CK_OBJECT_HANDLE,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_create_object(
    _session: CK_SESSION_HANDLE,
    _template: CK_ATTRIBUTE_PTR,
    _count: CK_ULONG,
    _object_handle: CK_OBJECT_HANDLE_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_copy_object(
    _session: CK_SESSION_HANDLE,
    _object: CK_OBJECT_HANDLE,
    _template: CK_ATTRIBUTE_PTR,
    _count: CK_ULONG,
    _ph_new_object: CK_OBJECT_HANDLE_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_destroy_object(
    _session: CK_SESSION_HANDLE,
    _object: CK_OBJECT_HANDLE,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_get_object_size(
    _session: CK_SESSION_HANDLE,
    _object: CK_OBJECT_HANDLE,
    _pul_size: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_set_attribute_value(
    _session: CK_SESSION_HANDLE,
    _object: CK_OBJECT_HANDLE,
    _template: CK_ATTRIBUTE_PTR,
    _count: CK_ULONG,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_encrypt_init(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    _key: CK_OBJECT_HANDLE,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_encrypt(
    _session: CK_SESSION_HANDLE,
    _data: CK_BYTE_PTR,
    _data_len: CK_ULONG,
    _encrypted_data: CK_BYTE_PTR,
    _pul_encrypted_data_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_encrypt_update(
    _session: CK_SESSION_HANDLE,
    _part: CK_BYTE_PTR,
    _part_len: CK_ULONG,
    _encrypted_part: CK_BYTE_PTR,
    _pul_encrypted_part_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_encrypt_final(
    _session: CK_SESSION_HANDLE,
    _last_encrypted_part: CK_BYTE_PTR,
    _pul_last_encrypted_part_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_decrypt_update(
    _session: CK_SESSION_HANDLE,
    _encrypted_part: CK_BYTE_PTR,
    _encrypted_part_len: CK_ULONG,
    _part: CK_BYTE_PTR,
    _pul_part_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_decrypt_final(
    _session: CK_SESSION_HANDLE,
    _last_part: CK_BYTE_PTR,
    _pul_last_part_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_digest_init(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_digest(
    _session: CK_SESSION_HANDLE,
    _data: CK_BYTE_PTR,
    _data_len: CK_ULONG,
    _digest: CK_BYTE_PTR,
    _pul_digest_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_digest_update(
    _session: CK_SESSION_HANDLE,
    _part: CK_BYTE_PTR,
    _part_len: CK_ULONG,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_digest_key(
    _session: CK_SESSION_HANDLE,
    _key: CK_OBJECT_HANDLE,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_digest_final(
    _session: CK_SESSION_HANDLE,
    _digest: CK_BYTE_PTR,
    _pul_digest_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_sign_update(
    _session: CK_SESSION_HANDLE,
    _part: CK_BYTE_PTR,
    _part_len: CK_ULONG,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_sign_final(
    _session: CK_SESSION_HANDLE,
    _signature: CK_BYTE_PTR,
    _pul_signature_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_sign_recover_init(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    _key: CK_OBJECT_HANDLE,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_sign_recover(
    _session: CK_SESSION_HANDLE,
    _data: CK_BYTE_PTR,
    _data_len: CK_ULONG,
    _signature: CK_BYTE_PTR,
    _pul_signature_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_verify_init(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    _key: CK_OBJECT_HANDLE,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_verify(
    _session: CK_SESSION_HANDLE,
    _data: CK_BYTE_PTR,
    _data_len: CK_ULONG,
    _signature: CK_BYTE_PTR,
    _signature_len: CK_ULONG,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_verify_update(
    _session: CK_SESSION_HANDLE,
    _part: CK_BYTE_PTR,
    _part_len: CK_ULONG,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_verify_final(
    _session: CK_SESSION_HANDLE,
    _signature: CK_BYTE_PTR,
    _signature_len: CK_ULONG,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_verify_recover_init(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    _key: CK_OBJECT_HANDLE,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_verify_recover(
    _session: CK_SESSION_HANDLE,
    _signature: CK_BYTE_PTR,
    _signature_len: CK_ULONG,
    _data: CK_BYTE_PTR,
    _pul_data_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_digest_encrypt_update(
    _session: CK_SESSION_HANDLE,
    _part: CK_BYTE_PTR,
    _part_len: CK_ULONG,
    _encrypted_part: CK_BYTE_PTR,
    _pul_encrypted_part_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_decrypt_digest_update(
    _session: CK_SESSION_HANDLE,
    _encrypted_part: CK_BYTE_PTR,
    _encrypted_part_len: CK_ULONG,
    _part: CK_BYTE_PTR,
    _pul_part_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_sign_encrypt_update(
    _session: CK_SESSION_HANDLE,
    _part: CK_BYTE_PTR,
    _part_len: CK_ULONG,
    _encrypted_part: CK_BYTE_PTR,
    _pul_encrypted_part_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_decrypt_verify_update(
    _session: CK_SESSION_HANDLE,
    _encrypted_part: CK_BYTE_PTR,
    _encrypted_part_len: CK_ULONG,
    _part: CK_BYTE_PTR,
    _pul_part_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_generate_key(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    _template: CK_ATTRIBUTE_PTR,
    _count: CK_ULONG,
    _ph_key: CK_OBJECT_HANDLE_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_generate_key_pair(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    _public_key_template: CK_ATTRIBUTE_PTR,
    _public_key_attribute_count: CK_ULONG,
    _private_key_template: CK_ATTRIBUTE_PTR,
    _private_key_attribute_count: CK_ULONG,
    _ph_public_key: CK_OBJECT_HANDLE_PTR,
    _ph_private_key: CK_OBJECT_HANDLE_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_wrap_key(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    _wrapping_key: CK_OBJECT_HANDLE,
    _key: CK_OBJECT_HANDLE,
    _wrapped_key: CK_BYTE_PTR,
    _pul_wrapped_key_len: CK_ULONG_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_unwrap_key(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    _unwrapping_key: CK_OBJECT_HANDLE,
    _wrapped_key: CK_BYTE_PTR,
    _wrapped_key_len: CK_ULONG,
    _template: CK_ATTRIBUTE_PTR,
    _attribute_count: CK_ULONG,
    _ph_key: CK_OBJECT_HANDLE_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_derive_key(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    _base_key: CK_OBJECT_HANDLE,
    _template: CK_ATTRIBUTE_PTR,
    _attribute_count: CK_ULONG,
    _ph_key: CK_OBJECT_HANDLE_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_seed_random(
    _session: CK_SESSION_HANDLE,
    _seed: CK_BYTE_PTR,
    _seed_len: CK_ULONG,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_generate_random(
    _session: CK_SESSION_HANDLE,
    _random_data: CK_BYTE_PTR,
    _random_len: CK_ULONG,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_get_function_status(_session: CK_SESSION_HANDLE) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_cancel_function(_session: CK_SESSION_HANDLE) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}
extern "C" fn fn_wait_for_slot_event(
    _flags: CK_FLAGS,
    _slot: CK_SLOT_ID_PTR,
    _reserved: CK_VOID_PTR,
) -> CK_RV {
    CKR_FUNCTION_NOT_SUPPORTED
}

pub static FNLIST_240: CK_FUNCTION_LIST = CK_FUNCTION_LIST {
    version: CK_VERSION { major: 2, minor: 40 },
    C_Initialize: Some(fn_initialize),
    C_Finalize: Some(fn_finalize),
    C_GetInfo: Some(fn_get_info),
    C_GetFunctionList: Some(C_GetFunctionList),
    C_GetSlotList: Some(fn_get_slot_list),
    C_GetSlotInfo: Some(fn_get_slot_info),
    C_GetTokenInfo: Some(fn_get_token_info),
    C_GetMechanismList: Some(fn_get_mechanism_list),
    C_GetMechanismInfo: Some(fn_get_mechanism_info),
    C_InitToken: Some(fn_init_token),
    C_InitPIN: Some(fn_init_pin),
    C_SetPIN: Some(fn_set_pin),
    C_OpenSession: Some(fn_open_session),
    C_CloseSession: Some(fn_close_session),
    C_CloseAllSessions: Some(fn_close_all_sessions),
    C_GetSessionInfo: Some(fn_get_session_info),
    C_GetOperationState: Some(fn_get_operation_state),
    C_SetOperationState: Some(fn_set_operation_state),
    C_Login: Some(fn_login),
    C_Logout: Some(fn_logout),
    C_CreateObject: Some(fn_create_object),
    C_CopyObject: Some(fn_copy_object),
    C_DestroyObject: Some(fn_destroy_object),
    C_GetObjectSize: Some(fn_get_object_size),
    C_GetAttributeValue: Some(fn_get_attribute_value),
    C_SetAttributeValue: Some(fn_set_attribute_value),
    C_FindObjectsInit: Some(fn_find_objects_init),
    C_FindObjects: Some(fn_find_objects),
    C_FindObjectsFinal: Some(fn_find_objects_final),
    C_EncryptInit: Some(fn_encrypt_init),
    C_Encrypt: Some(fn_encrypt),
    C_EncryptUpdate: Some(fn_encrypt_update),
    C_EncryptFinal: Some(fn_encrypt_final),
    C_DecryptInit: Some(fn_decrypt_init),
    C_Decrypt: Some(fn_decrypt),
    C_DecryptUpdate: Some(fn_decrypt_update),
    C_DecryptFinal: Some(fn_decrypt_final),
    C_DigestInit: Some(fn_digest_init),
    C_Digest: Some(fn_digest),
    C_DigestUpdate: Some(fn_digest_update),
    C_DigestKey: Some(fn_digest_key),
    C_DigestFinal: Some(fn_digest_final),
    C_SignInit: Some(fn_sign_init),
    C_Sign: Some(fn_sign),
    C_SignUpdate: Some(fn_sign_update),
    C_SignFinal: Some(fn_sign_final),
    C_SignRecoverInit: Some(fn_sign_recover_init),
    C_SignRecover: Some(fn_sign_recover),
    C_VerifyInit: Some(fn_verify_init),
    C_Verify: Some(fn_verify),
    C_VerifyUpdate: Some(fn_verify_update),
    C_VerifyFinal: Some(fn_verify_final),
    C_VerifyRecoverInit: Some(fn_verify_recover_init),
    C_VerifyRecover: Some(fn_verify_recover),
    C_DigestEncryptUpdate: Some(fn_digest_encrypt_update),
    C_DecryptDigestUpdate: Some(fn_decrypt_digest_update),
    C_SignEncryptUpdate: Some(fn_sign_encrypt_update),
    C_DecryptVerifyUpdate: Some(fn_decrypt_verify_update),
    C_GenerateKey: Some(fn_generate_key),
    C_GenerateKeyPair: Some(fn_generate_key_pair),
    C_WrapKey: Some(fn_wrap_key),
    C_UnwrapKey: Some(fn_unwrap_key),
    C_DeriveKey: Some(fn_derive_key),
    C_SeedRandom: Some(fn_seed_random),
    C_GenerateRandom: Some(fn_generate_random),
    C_GetFunctionStatus: Some(fn_get_function_status),
    C_CancelFunction: Some(fn_cancel_function),
    C_WaitForSlotEvent: Some(fn_wait_for_slot_event),
};

/// The only exported symbol; loaders reach everything else through the
/// returned table. Succeeds without initialization.
#[no_mangle]
pub extern "C" fn C_GetFunctionList(
    fnlist: CK_FUNCTION_LIST_PTR_PTR,
) -> CK_RV {
    if fnlist.is_null() {
        return CKR_ARGUMENTS_BAD;
    }
    unsafe {
        *fnlist = &FNLIST_240;
    }
    CKR_OK
}

#[cfg(test)]
mod tests;
