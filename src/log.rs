// Copyright 2025 The kms-pkcs11 Authors
// See LICENSE.txt file for terms

use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Once;

use simplelog::{Config, LevelFilter, SimpleLogger, WriteLogger};

static LOG_INIT: Once = Once::new();

/// Sets up the logging backend the first time the module is
/// initialized; C_Initialize calls this before anything else.
///
/// Controlled by the environment variable KMS_PKCS11_LOG:
/// - `<level>` logs to standard output
/// - `<level>:<path>` appends to the named file
/// Levels are the usual filter names (off, error, warn, info, debug,
/// trace); an unparsable level falls back to warn. When the variable
/// is absent, or the sink cannot be opened, logging stays disabled.
pub fn setup() {
    LOG_INIT.call_once(|| {
        let spec = match std::env::var("KMS_PKCS11_LOG") {
            Ok(spec) => spec,
            Err(_) => return,
        };
        let (level, sink) = match spec.split_once(':') {
            Some((level, path)) => (level, Some(path)),
            None => (spec.as_str(), None),
        };
        let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Warn);
        let _ = match sink {
            None => SimpleLogger::init(level, Config::default()),
            Some(path) => {
                let file = match OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                {
                    Ok(file) => file,
                    Err(_) => return,
                };
                WriteLogger::init(level, Config::default(), file)
            }
        };
    });
}
