//! Unit tests for domain error types

use stash_domain::Error;

#[test]
fn test_corrupt_entry_error_names_key() {
    let error = Error::corrupt_entry("u:1", "expected value at line 1");
    let display = error.to_string();
    assert!(display.contains("u:1"));
    assert!(display.contains("expected value"));
}

#[test]
fn test_transient_classification() {
    assert!(Error::network("connection refused").is_transient());
    assert!(Error::timeout("GET u:1").is_transient());
    assert!(!Error::remote("WRONGTYPE").is_transient());
    assert!(!Error::configuration("bad level").is_transient());
    assert!(!Error::corrupt_entry("k", "eof").is_transient());
}

#[test]
fn test_io_error_from_std() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: Error = io.into();
    assert!(matches!(error, Error::IoSimple { .. }));
}

#[test]
fn test_configuration_with_source_keeps_source() {
    use std::error::Error as _;

    let io = std::io::Error::other("disk");
    let error = Error::configuration_with_source("cannot read config", io);
    assert!(error.is_configuration());
    assert!(error.source().is_some());
}
