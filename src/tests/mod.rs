// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

use std::ffi::CString;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::kms::fake::FakeKms;
use crate::kms::KeyAlgorithm;

use tempfile::TempDir;

mod init;
mod objects;
mod signatures;
mod slots;

/* The provider is a process-wide singleton, so every test that touches
 * the entry points runs under #[serial]; only the pure encoding tests
 * run in parallel. */

static INSTANCE: AtomicUsize = AtomicUsize::new(0);

pub struct TestKms {
    /// keeps the configuration directory alive for the test's duration
    _dir: TempDir,
    pub fake: Arc<FakeKms>,
    pub key_rings: [String; 2],
    config_path: String,
}

impl TestKms {
    /// Builds a fake service with two key rings and writes a matching
    /// two-token configuration file ("foo" and "bar")
    pub fn new(name: &str) -> TestKms {
        let id = INSTANCE.fetch_add(1, Ordering::Relaxed);
        let fake = FakeKms::new(&format!("{}-{}", name, id));
        let key_rings = [
            "projects/p/locations/global/keyRings/ring1".to_string(),
            "projects/p/locations/global/keyRings/ring2".to_string(),
        ];
        fake.create_key_ring(&key_rings[0]);
        fake.create_key_ring(&key_rings[1]);

        let dir = tempfile::tempdir().unwrap();
        let config_path =
            dir.path().join("config.yaml").to_str().unwrap().to_string();
        let kms = TestKms {
            _dir: dir,
            fake: fake,
            key_rings: key_rings,
            config_path: config_path,
        };
        kms.write_config(false);
        kms
    }

    pub fn config_path(&self) -> &str {
        &self.config_path
    }

    pub fn write_config(&self, generate_certs: bool) {
        let content = format!(
            "tokens:\n  \
             - key_ring: \"{}\"\n    \
               label: \"foo\"\n  \
             - key_ring: \"{}\"\n    \
               label: \"bar\"\n\
             kms_endpoint: \"{}\"\n\
             generate_certs: {}\n",
            self.key_rings[0],
            self.key_rings[1],
            self.fake.endpoint(),
            generate_certs,
        );
        fs::write(&self.config_path, content).unwrap();
        self.set_config_mode(0o600);
    }

    pub fn set_config_mode(&self, mode: u32) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(
                &self.config_path,
                fs::Permissions::from_mode(mode),
            )
            .unwrap();
        }
        #[cfg(not(unix))]
        let _ = mode;
    }

    pub fn create_key(
        &self,
        ring: usize,
        key_id: &str,
        algorithm: KeyAlgorithm,
    ) -> String {
        self.fake
            .create_key(&self.key_rings[ring], key_id, algorithm)
            .unwrap()
    }

    pub fn make_init_args(&self) -> CK_C_INITIALIZE_ARGS {
        CK_C_INITIALIZE_ARGS {
            CreateMutex: None,
            DestroyMutex: None,
            LockMutex: None,
            UnlockMutex: None,
            flags: 0,
            pReserved: CString::new(self.config_path.as_str())
                .unwrap()
                .into_raw() as CK_VOID_PTR,
        }
    }

    pub fn initialize_rv(&self) -> CK_RV {
        let mut args = self.make_init_args();
        fn_initialize(&mut args as *mut _ as CK_VOID_PTR)
    }

    pub fn initialize(&self) {
        assert_eq!(self.initialize_rv(), CKR_OK);
    }

    pub fn finalize(&self) {
        assert_eq!(fn_finalize(std::ptr::null_mut()), CKR_OK);
    }
}

/// Opens a read-only serial session on the slot
pub fn open_session(slot: CK_SLOT_ID) -> CK_SESSION_HANDLE {
    let mut handle: CK_SESSION_HANDLE = CK_INVALID_HANDLE;
    let ret = fn_open_session(
        slot,
        CKF_SERIAL_SESSION,
        std::ptr::null_mut(),
        None,
        &mut handle,
    );
    assert_eq!(ret, CKR_OK);
    assert_ne!(handle, CK_INVALID_HANDLE);
    handle
}

/// Runs a find for the template and returns all matching handles
pub fn find_all(
    session: CK_SESSION_HANDLE,
    template: &mut [CK_ATTRIBUTE],
) -> Vec<CK_OBJECT_HANDLE> {
    let ret = fn_find_objects_init(
        session,
        if template.is_empty() {
            std::ptr::null_mut()
        } else {
            template.as_mut_ptr()
        },
        template.len() as CK_ULONG,
    );
    assert_eq!(ret, CKR_OK);
    let mut found = Vec::new();
    loop {
        let mut batch = [CK_INVALID_HANDLE; 4];
        let mut count: CK_ULONG = 0;
        let ret = fn_find_objects(
            session,
            batch.as_mut_ptr(),
            batch.len() as CK_ULONG,
            &mut count,
        );
        assert_eq!(ret, CKR_OK);
        if count == 0 {
            break;
        }
        found.extend_from_slice(&batch[..count as usize]);
    }
    assert_eq!(fn_find_objects_final(session), CKR_OK);
    found
}

/// Template entry helper for class matches
pub fn class_template(
    class: &CK_OBJECT_CLASS,
) -> [CK_ATTRIBUTE; 1] {
    [CK_ATTRIBUTE {
        type_: CKA_CLASS,
        pValue: class as *const CK_OBJECT_CLASS as CK_VOID_PTR,
        ulValueLen: std::mem::size_of::<CK_OBJECT_CLASS>() as CK_ULONG,
    }]
}
