//! Delimiter-separated text formatter
//!
//! Renders records as one line of separator-joined columns. Strings are
//! escaped so that a line always splits cleanly on the separator:
//! embedded separator sequences and non-printable bytes come out as
//! `\xNN` hex escapes. Container cells join their elements with the set
//! separator; unset cells and empty values render as the configured
//! placeholder strings.

use std::fmt::Write as FmtWrite;

use vigil_record::{Field, LogRecord, Value, ValueData};

use super::{FormatError, LogFormatter};

/// Separator and placeholder strings for ASCII output
#[derive(Debug, Clone)]
pub struct SeparatorInfo {
    /// Column separator
    pub separator: String,

    /// Separator between elements of a container cell
    pub set_separator: String,

    /// Placeholder for unset cells
    pub unset_field: String,

    /// Placeholder for empty strings and empty containers
    pub empty_field: String,
}

impl Default for SeparatorInfo {
    fn default() -> Self {
        Self {
            separator: "\t".to_string(),
            set_separator: ",".to_string(),
            unset_field: "-".to_string(),
            empty_field: "(empty)".to_string(),
        }
    }
}

/// Formatter for delimiter-separated text logs
#[derive(Debug, Clone)]
pub struct AsciiFormatter {
    sep: SeparatorInfo,
    enable_utf8: bool,
}

impl AsciiFormatter {
    /// Create a formatter with the given separators
    pub fn new(sep: SeparatorInfo, enable_utf8: bool) -> Self {
        Self { sep, enable_utf8 }
    }

    fn render_value(&self, out: &mut String, value: &Value) -> Result<(), FormatError> {
        let Some(data) = value.data() else {
            out.push_str(&self.sep.unset_field);
            return Ok(());
        };

        match data {
            ValueData::Bool(true) => out.push('T'),
            ValueData::Bool(false) => out.push('F'),
            ValueData::Count(v) => {
                let _ = write!(out, "{v}");
            }
            ValueData::Int(v) => {
                let _ = write!(out, "{v}");
            }
            ValueData::Double(v) | ValueData::Time(v) | ValueData::Interval(v) => {
                let _ = write!(out, "{v:.6}");
            }
            ValueData::String(s) => self.render_string(out, s),
            ValueData::Port(p) => {
                let _ = write!(out, "{p}");
            }
            ValueData::Addr(a) => {
                let _ = write!(out, "{a}");
            }
            ValueData::Subnet(s) => {
                let _ = write!(out, "{s}");
            }
            ValueData::Enum(e) => self.render_string(out, e),
            ValueData::Set(elems) | ValueData::Vector(elems) | ValueData::Record(elems) => {
                self.render_elements(out, elems)?;
            }
            ValueData::Table(entries) => {
                if entries.is_empty() {
                    out.push_str(&self.sep.empty_field);
                }
                for (i, (key, val)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(&self.sep.set_separator);
                    }
                    self.render_value(out, key)?;
                    out.push('=');
                    self.render_value(out, val)?;
                }
            }
        }
        Ok(())
    }

    fn render_elements(&self, out: &mut String, elems: &[Value]) -> Result<(), FormatError> {
        if elems.is_empty() {
            out.push_str(&self.sep.empty_field);
            return Ok(());
        }
        for (i, elem) in elems.iter().enumerate() {
            if i > 0 {
                out.push_str(&self.sep.set_separator);
            }
            self.render_value(out, elem)?;
        }
        Ok(())
    }

    /// Append a string with separator and control-byte escaping
    fn render_string(&self, out: &mut String, s: &str) {
        if s.is_empty() {
            out.push_str(&self.sep.empty_field);
            return;
        }

        let sep = self.sep.separator.as_str();
        let mut rest = s;
        while !rest.is_empty() {
            if !sep.is_empty() && rest.starts_with(sep) {
                for byte in sep.bytes() {
                    push_hex(out, byte);
                }
                rest = &rest[sep.len()..];
                continue;
            }

            let ch = rest.chars().next().expect("non-empty");
            if ch.is_ascii() {
                let byte = ch as u8;
                if (0x20..0x7f).contains(&byte) && ch != '\\' {
                    out.push(ch);
                } else if ch == '\\' {
                    out.push_str("\\\\");
                } else {
                    push_hex(out, byte);
                }
            } else if self.enable_utf8 {
                out.push(ch);
            } else {
                let mut buf = [0u8; 4];
                for byte in ch.encode_utf8(&mut buf).bytes() {
                    push_hex(out, byte);
                }
            }
            rest = &rest[ch.len_utf8()..];
        }
    }
}

fn push_hex(out: &mut String, byte: u8) {
    let _ = write!(out, "\\x{byte:02x}");
}

impl LogFormatter for AsciiFormatter {
    fn format(
        &self,
        _fields: &[Field],
        record: &LogRecord,
        out: &mut String,
    ) -> Result<(), FormatError> {
        for (i, value) in record.iter().enumerate() {
            if i > 0 {
                out.push_str(&self.sep.separator);
            }
            self.render_value(out, value)?;
        }
        Ok(())
    }
}

/// Hex-escape the non-printable bytes of a string
///
/// Used for header values (the separator itself renders as `\x09`).
pub fn escaped(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if (0x20..0x7f).contains(&byte) {
            out.push(byte as char);
        } else {
            push_hex(&mut out, byte);
        }
    }
    out
}

#[cfg(test)]
#[path = "ascii_test.rs"]
mod ascii_test;
