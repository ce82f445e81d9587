// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

//! The process-wide provider state: the slot/token vector, the session
//! table, and the session handle allocator. The provider is either
//! fully constructed or absent; partial initialization is never
//! observable (construction happens before the instance is installed
//! in the global latch).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard,
    RwLockWriteGuard};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::kms::{self, KmsClient};
use crate::pkcs11::*;
use crate::session::Session;
use crate::token::{Handles, Token};

use log;

/// Session handles are never reused within a process, even across
/// finalize and reinitialize cycles
static NEXT_SESSION_HANDLE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct Provider {
    client: Arc<dyn KmsClient>,
    slots: Vec<RwLock<Token>>,
    sessions: RwLock<HashMap<CK_SESSION_HANDLE, Mutex<Session>>>,
}

impl Provider {
    /// Connects the service client and builds one token per configured
    /// key ring. Any failure discards everything built so far.
    pub fn new(config: Config) -> Result<Provider> {
        let client = kms::connect(
            &config.kms_endpoint,
            config.use_insecure_grpc_channel_credentials,
        )?;
        let mut handles = Handles::new();
        let mut slots = Vec::with_capacity(config.tokens.len());
        for conf in &config.tokens {
            let token = Token::new(
                conf,
                client.as_ref(),
                config.generate_certs,
                &mut handles,
            )?;
            slots.push(RwLock::new(token));
        }
        log::info!("provider initialized with {} token(s)", slots.len());
        Ok(Provider {
            client: client,
            slots: slots,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub fn client(&self) -> Arc<dyn KmsClient> {
        self.client.clone()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn token(
        &self,
        slot_id: CK_SLOT_ID,
    ) -> Result<RwLockReadGuard<'_, Token>> {
        let slot = match self.slots.get(slot_id as usize) {
            Some(s) => s,
            None => return Err(CKR_SLOT_ID_INVALID)?,
        };
        slot.read().map_err(|_| Error::internal("token lock poisoned"))
    }

    pub fn token_mut(
        &self,
        slot_id: CK_SLOT_ID,
    ) -> Result<RwLockWriteGuard<'_, Token>> {
        let slot = match self.slots.get(slot_id as usize) {
            Some(s) => s,
            None => return Err(CKR_SLOT_ID_INVALID)?,
        };
        slot.write().map_err(|_| Error::internal("token lock poisoned"))
    }

    /// Installs a new session on a slot; flag validation happened at
    /// the entry point
    pub fn open_session(
        &self,
        slot_id: CK_SLOT_ID,
        flags: CK_FLAGS,
    ) -> Result<CK_SESSION_HANDLE> {
        let handle = NEXT_SESSION_HANDLE.fetch_add(1, Ordering::Relaxed)
            as CK_SESSION_HANDLE;
        let mut sessions = self.sessions_mut()?;
        sessions.insert(handle, Mutex::new(Session::new(slot_id, flags)));
        Ok(handle)
    }

    /// Drops a session; its handle is never valid again
    pub fn close_session(&self, handle: CK_SESSION_HANDLE) -> Result<()> {
        let mut sessions = self.sessions_mut()?;
        match sessions.remove(&handle) {
            Some(_) => Ok(()),
            None => Err(CKR_SESSION_HANDLE_INVALID)?,
        }
    }

    pub fn close_all_sessions(&self, slot_id: CK_SLOT_ID) -> Result<()> {
        let mut sessions = self.sessions_mut()?;
        sessions.retain(|_, session| match session.lock() {
            Ok(s) => s.get_slot_id() != slot_id,
            Err(_) => false,
        });
        Ok(())
    }

    /// Resolves the slot a session lives on, validating the handle
    pub fn session_slot(&self, handle: CK_SESSION_HANDLE) -> Result<CK_SLOT_ID> {
        self.with_session(handle, |session| Ok(session.get_slot_id()))
    }

    /// Runs the closure with the session locked. Token locks must not
    /// be held while calling this, and the closure must not take any.
    pub fn with_session<F, R>(&self, handle: CK_SESSION_HANDLE, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> Result<R>,
    {
        let sessions = match self.sessions.read() {
            Ok(s) => s,
            Err(_) => return Err(Error::internal("session table poisoned")),
        };
        let session = match sessions.get(&handle) {
            Some(s) => s,
            None => return Err(CKR_SESSION_HANDLE_INVALID)?,
        };
        let mut guard: MutexGuard<'_, Session> = session
            .lock()
            .map_err(|_| Error::internal("session lock poisoned"))?;
        f(&mut guard)
    }

    fn sessions_mut(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<CK_SESSION_HANDLE, Mutex<Session>>>>
    {
        self.sessions
            .write()
            .map_err(|_| Error::internal("session table poisoned"))
    }
}
