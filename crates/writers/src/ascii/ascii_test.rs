//! Tests for the ASCII writer's pure helpers
//!
//! File and rotation behavior is covered end to end in
//! `tests/ascii_writer.rs`; these tests pin down the option parsing and
//! naming rules.

use super::{parse_bool, timestamp, AsciiWriter, Options};

#[test]
fn test_parse_bool_accepts_t_and_f_only() {
    assert!(parse_bool("tsv", "T").unwrap());
    assert!(!parse_bool("tsv", "F").unwrap());
    assert!(parse_bool("tsv", "true").is_err());
    assert!(parse_bool("tsv", "").is_err());
}

#[test]
fn test_default_options() {
    let opts = Options::default();
    assert_eq!(opts.separator, "\t");
    assert_eq!(opts.set_separator, ",");
    assert_eq!(opts.empty_field, "(empty)");
    assert_eq!(opts.unset_field, "-");
    assert_eq!(opts.meta_prefix, "#");
    assert_eq!(opts.gzip_level, 0);
    assert_eq!(opts.gzip_file_extension, "gz");
    assert!(opts.include_meta);
    assert!(!opts.use_json);
}

#[test]
fn test_special_paths() {
    assert!(AsciiWriter::is_special("/dev/stdout"));
    assert!(AsciiWriter::is_special("/dev/null"));
    assert!(!AsciiWriter::is_special("logs/conn"));
}

#[test]
fn test_suffixed_name_plain() {
    let writer = AsciiWriter::new();
    assert_eq!(writer.suffixed_name("conn.2024-01-01"), "conn.2024-01-01.log");
}

#[test]
fn test_suffixed_name_gzip() {
    let mut writer = AsciiWriter::new();
    writer.opts.gzip_level = 6;
    assert_eq!(
        writer.suffixed_name("conn.2024-01-01"),
        "conn.2024-01-01.log.gz"
    );
}

#[test]
fn test_timestamp_format() {
    let rendered = timestamp(1_700_000_000.0);
    // %Y-%m-%d-%H-%M-%S: 19 characters, 5 dashes.
    assert_eq!(rendered.len(), 19);
    assert_eq!(rendered.matches('-').count(), 5);
}

#[test]
fn test_timestamp_zero_means_now() {
    let rendered = timestamp(0.0);
    assert_eq!(rendered.len(), 19);
}
