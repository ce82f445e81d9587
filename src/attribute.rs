// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

//! Typed attribute values and conversions between the internal byte
//! representation and the PKCS#11 template structures.

use crate::error::{Error, Result};
use crate::pkcs11::*;

pub const CK_ULONG_SIZE: usize = std::mem::size_of::<CK_ULONG>();

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrType {
    BoolType,
    NumType,
    StringType,
    BytesType,
}

#[derive(Debug)]
struct Attrmap<'a> {
    id: CK_ATTRIBUTE_TYPE,
    name: &'a str,
    atype: AttrType,
}

macro_rules! attrmap_element {
    ($id:expr; as $attrtype:ident) => {
        Attrmap {
            id: $id,
            name: stringify!($id),
            atype: AttrType::$attrtype,
        }
    };
}

static ATTRMAP: [Attrmap<'_>; 41] = [
    attrmap_element!(CKA_CLASS; as NumType),
    attrmap_element!(CKA_TOKEN; as BoolType),
    attrmap_element!(CKA_PRIVATE; as BoolType),
    attrmap_element!(CKA_LABEL; as StringType),
    attrmap_element!(CKA_VALUE; as BytesType),
    attrmap_element!(CKA_CERTIFICATE_TYPE; as NumType),
    attrmap_element!(CKA_ISSUER; as BytesType),
    attrmap_element!(CKA_SERIAL_NUMBER; as BytesType),
    attrmap_element!(CKA_KEY_TYPE; as NumType),
    attrmap_element!(CKA_SUBJECT; as BytesType),
    attrmap_element!(CKA_ID; as BytesType),
    attrmap_element!(CKA_SENSITIVE; as BoolType),
    attrmap_element!(CKA_ENCRYPT; as BoolType),
    attrmap_element!(CKA_DECRYPT; as BoolType),
    attrmap_element!(CKA_WRAP; as BoolType),
    attrmap_element!(CKA_UNWRAP; as BoolType),
    attrmap_element!(CKA_SIGN; as BoolType),
    attrmap_element!(CKA_SIGN_RECOVER; as BoolType),
    attrmap_element!(CKA_VERIFY; as BoolType),
    attrmap_element!(CKA_VERIFY_RECOVER; as BoolType),
    attrmap_element!(CKA_DERIVE; as BoolType),
    attrmap_element!(CKA_MODULUS; as BytesType),
    attrmap_element!(CKA_MODULUS_BITS; as NumType),
    attrmap_element!(CKA_PUBLIC_EXPONENT; as BytesType),
    attrmap_element!(CKA_PRIVATE_EXPONENT; as BytesType),
    attrmap_element!(CKA_PRIME_1; as BytesType),
    attrmap_element!(CKA_PRIME_2; as BytesType),
    attrmap_element!(CKA_EXPONENT_1; as BytesType),
    attrmap_element!(CKA_EXPONENT_2; as BytesType),
    attrmap_element!(CKA_COEFFICIENT; as BytesType),
    attrmap_element!(CKA_PUBLIC_KEY_INFO; as BytesType),
    attrmap_element!(CKA_EXTRACTABLE; as BoolType),
    attrmap_element!(CKA_LOCAL; as BoolType),
    attrmap_element!(CKA_NEVER_EXTRACTABLE; as BoolType),
    attrmap_element!(CKA_ALWAYS_SENSITIVE; as BoolType),
    attrmap_element!(CKA_MODIFIABLE; as BoolType),
    attrmap_element!(CKA_COPYABLE; as BoolType),
    attrmap_element!(CKA_DESTROYABLE; as BoolType),
    attrmap_element!(CKA_EC_PARAMS; as BytesType),
    attrmap_element!(CKA_EC_POINT; as BytesType),
    attrmap_element!(CKA_ALWAYS_AUTHENTICATE; as BoolType),
];

/// A single typed attribute value.
///
/// Booleans are stored as one byte, CK_ULONGs as native-endian
/// fixed-width integers, strings and blobs verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    ck_type: CK_ATTRIBUTE_TYPE,
    attrtype: AttrType,
    value: Vec<u8>,
}

impl Attribute {
    pub fn get_type(&self) -> CK_ATTRIBUTE_TYPE {
        self.ck_type
    }

    pub fn get_attrtype(&self) -> AttrType {
        self.attrtype
    }

    pub fn get_value(&self) -> &Vec<u8> {
        &self.value
    }

    /// Checks whether a template entry selects this attribute with a
    /// byte-identical value
    pub fn match_ck_attr(&self, attr: &CK_ATTRIBUTE) -> bool {
        if self.ck_type != attr.type_ {
            return false;
        }
        match attr.to_buf() {
            Ok(buf) => buf == self.value,
            Err(_) => false,
        }
    }

    pub fn name(&self) -> String {
        for a in &ATTRMAP {
            if a.id == self.ck_type {
                return a.name.to_string();
            }
        }
        self.ck_type.to_string()
    }

    pub fn to_bool(&self) -> Result<bool> {
        if self.value.len() != 1 {
            return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
        }
        Ok(self.value[0] != 0)
    }

    pub fn to_ulong(&self) -> Result<CK_ULONG> {
        if self.value.len() != CK_ULONG_SIZE {
            return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
        }
        Ok(CK_ULONG::from_ne_bytes(self.value.as_slice().try_into()?))
    }

    pub fn to_string(&self) -> Result<String> {
        match std::str::from_utf8(&self.value) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
        }
    }

    pub fn to_bytes(&self) -> Result<&Vec<u8>> {
        Ok(&self.value)
    }
}

macro_rules! conversion_from_type {
    (make $fn1:ident; from $rtype:ty; as $atype:ident; via $conv:ident) => {
        pub fn $fn1(t: CK_ATTRIBUTE_TYPE, val: $rtype) -> Attribute {
            Attribute {
                ck_type: t,
                attrtype: AttrType::$atype,
                value: $conv(val),
            }
        }
    };
}

fn bool_to_vec(val: bool) -> Vec<u8> {
    vec![if val { CK_TRUE } else { CK_FALSE }]
}

fn ulong_to_vec(val: CK_ULONG) -> Vec<u8> {
    Vec::from(val.to_ne_bytes())
}

fn string_to_vec(val: String) -> Vec<u8> {
    Vec::from(val.as_bytes())
}

fn bytes_to_vec(val: Vec<u8>) -> Vec<u8> {
    val
}

impl Attribute {
    conversion_from_type! {make from_bool; from bool; as BoolType; via bool_to_vec}
    conversion_from_type! {make from_ulong; from CK_ULONG; as NumType; via ulong_to_vec}
    conversion_from_type! {make from_string; from String; as StringType; via string_to_vec}
    conversion_from_type! {make from_bytes; from Vec<u8>; as BytesType; via bytes_to_vec}
}

/// Returns the declared value type for an attribute code
pub fn attr_type(t: CK_ATTRIBUTE_TYPE) -> Result<AttrType> {
    for a in &ATTRMAP {
        if a.id == t {
            return Ok(a.atype);
        }
    }
    Err(Error::not_found(t.to_string()))
}

impl CK_ATTRIBUTE {
    /// Copies the caller-provided value into an owned buffer
    pub fn to_buf(&self) -> Result<Vec<u8>> {
        if self.ulValueLen == 0 {
            return Ok(Vec::new());
        }
        if self.pValue.is_null() {
            return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
        }
        let buf: &[u8] = unsafe {
            std::slice::from_raw_parts(
                self.pValue as *const u8,
                self.ulValueLen as usize,
            )
        };
        Ok(buf.to_vec())
    }
}
