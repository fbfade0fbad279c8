// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn valid_machine_is_accepted() {
    let file = write_temp(r#"{"id":"m","initial":"a","states":{"a":{}}}"#);
    assert!(run(file.path()).is_ok());
}

#[test]
fn invalid_machine_is_rejected() {
    let file = write_temp(r#"{"id":"m","initial":"missing","states":{"a":{}}}"#);
    assert!(run(file.path()).is_err());
}

#[test]
fn missing_file_is_reported() {
    assert!(run(std::path::Path::new("/nonexistent/machine.json")).is_err());
}
