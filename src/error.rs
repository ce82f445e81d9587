// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

use std::error;
use std::fmt;

use crate::pkcs11::*;

/// The Result type used within the project, wraps
/// errors via the custom Error struct
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of internal failures, roughly mirroring the status
/// space of the remote key service. Each kind has a default PKCS#11
/// return code that applies when no explicit hint is attached.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    FailedPrecondition,
    AlreadyExists,
    PermissionDenied,
    OutOfRange,
    Unimplemented,
    Internal,
}

/// The project's error object
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    /// The PKCS#11 return code hint, when one is more specific than
    /// the kind default
    ckrv: Option<CK_RV>,
    /// The error message string if set
    errmsg: Option<String>,
    /// The originating error, if a mapping occurred
    origin: Option<Box<dyn error::Error + Send + Sync>>,
}

impl Error {
    fn new(kind: ErrorKind) -> Error {
        Error {
            kind: kind,
            ckrv: None,
            errmsg: None,
            origin: None,
        }
    }

    /// Creates an error that represents a PKCS#11 return code
    pub fn ck_rv(ckrv: CK_RV) -> Error {
        Error {
            kind: kind_for_rv(ckrv),
            ckrv: Some(ckrv),
            errmsg: None,
            origin: None,
        }
    }

    /// Creates an error that represents a PKCS#11 return code, and
    /// includes an error message
    pub fn ck_rv_with_errmsg<S: Into<String>>(ckrv: CK_RV, errmsg: S) -> Error {
        let mut e = Error::ck_rv(ckrv);
        e.errmsg = Some(errmsg.into());
        e
    }

    /// Creates an error that represents a PKCS#11 return code, and stores
    /// the originating error that was mapped to this code
    pub fn ck_rv_from_error<E>(ckrv: CK_RV, error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        let mut e = Error::ck_rv(ckrv);
        e.origin = Some(error.into());
        e
    }

    pub fn not_found<S: Into<String>>(errmsg: S) -> Error {
        let mut e = Error::new(ErrorKind::NotFound);
        e.errmsg = Some(errmsg.into());
        e
    }

    pub fn invalid_argument<S: Into<String>>(errmsg: S) -> Error {
        let mut e = Error::new(ErrorKind::InvalidArgument);
        e.errmsg = Some(errmsg.into());
        e
    }

    pub fn failed_precondition<S: Into<String>>(errmsg: S) -> Error {
        let mut e = Error::new(ErrorKind::FailedPrecondition);
        e.errmsg = Some(errmsg.into());
        e
    }

    pub fn permission_denied<S: Into<String>>(errmsg: S) -> Error {
        let mut e = Error::new(ErrorKind::PermissionDenied);
        e.errmsg = Some(errmsg.into());
        e
    }

    pub fn unimplemented<S: Into<String>>(errmsg: S) -> Error {
        let mut e = Error::new(ErrorKind::Unimplemented);
        e.errmsg = Some(errmsg.into());
        e
    }

    pub fn internal<S: Into<String>>(errmsg: S) -> Error {
        let mut e = Error::new(ErrorKind::Internal);
        e.errmsg = Some(errmsg.into());
        e
    }

    /// Creates a general (unspecified) error from a previous error
    pub fn other_error<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        let mut e = Error::new(ErrorKind::Internal);
        e.origin = Some(error.into());
        e
    }

    /// Attaches a return code hint to an existing error
    pub fn with_rv(mut self, ckrv: CK_RV) -> Error {
        self.ckrv = Some(ckrv);
        self
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the PKCS#11 return code for this error; the attached
    /// hint wins over the kind default
    pub fn rv(&self) -> CK_RV {
        match self.ckrv {
            Some(rv) => rv,
            None => match self.kind {
                ErrorKind::InvalidArgument => CKR_ARGUMENTS_BAD,
                ErrorKind::OutOfRange => CKR_BUFFER_TOO_SMALL,
                ErrorKind::Unimplemented => CKR_FUNCTION_NOT_SUPPORTED,
                ErrorKind::PermissionDenied => CKR_DEVICE_ERROR,
                ErrorKind::NotFound
                | ErrorKind::FailedPrecondition
                | ErrorKind::AlreadyExists
                | ErrorKind::Internal => CKR_GENERAL_ERROR,
            },
        }
    }
}

/// Infers a kind for errors created from a naked return code
fn kind_for_rv(rv: CK_RV) -> ErrorKind {
    match rv {
        CKR_ARGUMENTS_BAD
        | CKR_ATTRIBUTE_TYPE_INVALID
        | CKR_ATTRIBUTE_VALUE_INVALID
        | CKR_MECHANISM_INVALID
        | CKR_MECHANISM_PARAM_INVALID
        | CKR_DATA_LEN_RANGE => ErrorKind::InvalidArgument,
        CKR_SLOT_ID_INVALID
        | CKR_SESSION_HANDLE_INVALID
        | CKR_OBJECT_HANDLE_INVALID
        | CKR_KEY_HANDLE_INVALID => ErrorKind::NotFound,
        CKR_CRYPTOKI_NOT_INITIALIZED
        | CKR_OPERATION_ACTIVE
        | CKR_OPERATION_NOT_INITIALIZED
        | CKR_USER_ALREADY_LOGGED_IN
        | CKR_USER_NOT_LOGGED_IN
        | CKR_TOKEN_WRITE_PROTECTED => ErrorKind::FailedPrecondition,
        CKR_CRYPTOKI_ALREADY_INITIALIZED => ErrorKind::AlreadyExists,
        CKR_ATTRIBUTE_SENSITIVE
        | CKR_PIN_LOCKED
        | CKR_KEY_FUNCTION_NOT_PERMITTED => ErrorKind::PermissionDenied,
        CKR_BUFFER_TOO_SMALL => ErrorKind::OutOfRange,
        CKR_FUNCTION_NOT_SUPPORTED | CKR_SESSION_PARALLEL_NOT_SUPPORTED => {
            ErrorKind::Unimplemented
        }
        _ => ErrorKind::Internal,
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref msg) = self.errmsg {
            return write!(f, "{}", msg);
        }
        if let Some(ref origin) = self.origin {
            return origin.fmt(f);
        }
        match self.ckrv {
            Some(rv) => write!(f, "CK_RV 0x{:08x}", rv),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.origin {
            Some(ref origin) => Some(origin.as_ref()),
            None => None,
        }
    }
}

impl From<CK_RV> for Error {
    /// Maps a naked PKCS#11 return code to an Error
    fn from(rv: CK_RV) -> Error {
        Error::ck_rv(rv)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::other_error(error)
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(error: std::num::TryFromIntError) -> Error {
        Error::other_error(error)
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(error: std::array::TryFromSliceError) -> Error {
        Error::other_error(error)
    }
}

impl From<asn1::ParseError> for Error {
    fn from(error: asn1::ParseError) -> Error {
        Error::other_error(error)
    }
}

impl From<asn1::WriteError> for Error {
    fn from(error: asn1::WriteError) -> Error {
        Error::other_error(error)
    }
}
