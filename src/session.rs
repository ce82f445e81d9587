// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

//! Per-caller session state: the slot cursor, and the single in-flight
//! operation a session may hold at a time.

use crate::error::Result;
use crate::kms::KeyAlgorithm;
use crate::pkcs11::*;

/// An in-progress object search
#[derive(Debug)]
pub struct FindState {
    handles: Vec<CK_OBJECT_HANDLE>,
    pos: usize,
}

/// An initialized signing operation
#[derive(Debug)]
pub struct SignState {
    pub version: String,
    pub algorithm: KeyAlgorithm,
}

/// An initialized decryption operation; the remote result is cached so
/// the probe-then-fetch convention costs one service call
#[derive(Debug)]
pub struct DecryptState {
    pub version: String,
    pub algorithm: KeyAlgorithm,
    pub plaintext: Option<Vec<u8>>,
}

/// The session's operation slot; at most one variant other than None
/// is ever held
#[derive(Debug)]
pub enum Operation {
    None,
    Find(FindState),
    Sign(SignState),
    Decrypt(DecryptState),
}

#[derive(Debug)]
pub struct Session {
    slot_id: CK_SLOT_ID,
    flags: CK_FLAGS,
    operation: Operation,
}

impl Session {
    pub fn new(slot_id: CK_SLOT_ID, flags: CK_FLAGS) -> Session {
        Session {
            slot_id: slot_id,
            flags: flags,
            operation: Operation::None,
        }
    }

    pub fn get_slot_id(&self) -> CK_SLOT_ID {
        self.slot_id
    }

    pub fn get_flags(&self) -> CK_FLAGS {
        self.flags
    }

    fn check_no_operation(&self) -> Result<()> {
        match self.operation {
            Operation::None => Ok(()),
            _ => Err(CKR_OPERATION_ACTIVE)?,
        }
    }

    pub fn clear_operation(&mut self) {
        self.operation = Operation::None;
    }

    /* find */

    pub fn find_init(&mut self, handles: Vec<CK_OBJECT_HANDLE>) -> Result<()> {
        self.check_no_operation()?;
        self.operation = Operation::Find(FindState {
            handles: handles,
            pos: 0,
        });
        Ok(())
    }

    /// Draws up to max handles from the cursor; the end of the stream
    /// is an empty result, not an error
    pub fn find_next(&mut self, max: usize) -> Result<Vec<CK_OBJECT_HANDLE>> {
        let state = match self.operation {
            Operation::Find(ref mut f) => f,
            _ => return Err(CKR_OPERATION_NOT_INITIALIZED)?,
        };
        let amount = std::cmp::min(max, state.handles.len() - state.pos);
        let out = state.handles[state.pos..state.pos + amount].to_vec();
        state.pos += amount;
        Ok(out)
    }

    pub fn find_final(&mut self) -> Result<()> {
        match self.operation {
            Operation::Find(_) => {
                self.operation = Operation::None;
                Ok(())
            }
            _ => Err(CKR_OPERATION_NOT_INITIALIZED)?,
        }
    }

    /* sign */

    pub fn sign_init(&mut self, state: SignState) -> Result<()> {
        self.check_no_operation()?;
        self.operation = Operation::Sign(state);
        Ok(())
    }

    pub fn sign_state(&self) -> Result<&SignState> {
        match self.operation {
            Operation::Sign(ref s) => Ok(s),
            _ => Err(CKR_OPERATION_NOT_INITIALIZED)?,
        }
    }

    /* decrypt */

    pub fn decrypt_init(&mut self, state: DecryptState) -> Result<()> {
        self.check_no_operation()?;
        self.operation = Operation::Decrypt(state);
        Ok(())
    }

    pub fn decrypt_state_mut(&mut self) -> Result<&mut DecryptState> {
        match self.operation {
            Operation::Decrypt(ref mut d) => Ok(d),
            _ => Err(CKR_OPERATION_NOT_INITIALIZED)?,
        }
    }
}
