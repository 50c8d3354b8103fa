//! Tagged value cells
//!
//! A [`Value`] is one cell of a log record: a type tag plus optional data.
//! A cell may be *unset* (no data) independently of its tag, which is how
//! optional columns are represented. The tag of a set cell always agrees
//! with the tag of its data; constructors enforce this.

use std::net::IpAddr;

use crate::field::{Field, TypeTag};

/// A log record: an ordered sequence of value cells matching a schema
///
/// Ownership is exclusive; records move between pipeline stages and are
/// dropped by whichever stage consumes them.
pub type LogRecord = Vec<Value>;

/// An IP subnet as prefix plus width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subnet {
    pub prefix: IpAddr,
    pub width: u8,
}

impl std::fmt::Display for Subnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.prefix, self.width)
    }
}

/// The data carried by a set value cell
#[derive(Debug, Clone, PartialEq)]
pub enum ValueData {
    Bool(bool),
    Count(u64),
    Int(i64),
    /// Floating-point value
    Double(f64),
    /// Absolute timestamp in seconds since the epoch
    Time(f64),
    /// Duration in seconds
    Interval(f64),
    String(String),
    Port(u16),
    Addr(IpAddr),
    Subnet(Subnet),
    Enum(String),
    Set(Vec<Value>),
    Vector(Vec<Value>),
    Table(Vec<(Value, Value)>),
    Record(Vec<Value>),
}

impl ValueData {
    /// The type tag this data carries
    pub const fn tag(&self) -> TypeTag {
        match self {
            Self::Bool(_) => TypeTag::Bool,
            Self::Count(_) => TypeTag::Count,
            Self::Int(_) => TypeTag::Int,
            Self::Double(_) => TypeTag::Double,
            Self::Time(_) => TypeTag::Time,
            Self::Interval(_) => TypeTag::Interval,
            Self::String(_) => TypeTag::String,
            Self::Port(_) => TypeTag::Port,
            Self::Addr(_) => TypeTag::Addr,
            Self::Subnet(_) => TypeTag::Subnet,
            Self::Enum(_) => TypeTag::Enum,
            Self::Set(_) => TypeTag::Set,
            Self::Vector(_) => TypeTag::Vector,
            Self::Table(_) => TypeTag::Table,
            Self::Record(_) => TypeTag::Record,
        }
    }
}

/// One cell of a log record
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    tag: TypeTag,
    data: Option<ValueData>,
}

impl Value {
    /// Create a set cell; the tag is derived from the data
    pub fn from_data(data: ValueData) -> Self {
        Self {
            tag: data.tag(),
            data: Some(data),
        }
    }

    /// Create an unset cell with the given tag
    pub const fn unset(tag: TypeTag) -> Self {
        Self { tag, data: None }
    }

    pub fn bool(v: bool) -> Self {
        Self::from_data(ValueData::Bool(v))
    }

    pub fn count(v: u64) -> Self {
        Self::from_data(ValueData::Count(v))
    }

    pub fn int(v: i64) -> Self {
        Self::from_data(ValueData::Int(v))
    }

    pub fn double(v: f64) -> Self {
        Self::from_data(ValueData::Double(v))
    }

    pub fn time(secs: f64) -> Self {
        Self::from_data(ValueData::Time(secs))
    }

    pub fn interval(secs: f64) -> Self {
        Self::from_data(ValueData::Interval(secs))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self::from_data(ValueData::String(v.into()))
    }

    pub fn port(v: u16) -> Self {
        Self::from_data(ValueData::Port(v))
    }

    pub fn addr(v: IpAddr) -> Self {
        Self::from_data(ValueData::Addr(v))
    }

    pub fn subnet(prefix: IpAddr, width: u8) -> Self {
        Self::from_data(ValueData::Subnet(Subnet { prefix, width }))
    }

    pub fn enum_name(v: impl Into<String>) -> Self {
        Self::from_data(ValueData::Enum(v.into()))
    }

    pub fn set(elems: Vec<Value>) -> Self {
        Self::from_data(ValueData::Set(elems))
    }

    pub fn vector(elems: Vec<Value>) -> Self {
        Self::from_data(ValueData::Vector(elems))
    }

    /// The cell's type tag (meaningful whether or not the cell is set)
    #[inline]
    pub const fn tag(&self) -> TypeTag {
        self.tag
    }

    /// The cell's data, or `None` when unset
    #[inline]
    pub const fn data(&self) -> Option<&ValueData> {
        self.data.as_ref()
    }

    #[inline]
    pub const fn is_unset(&self) -> bool {
        self.data.is_none()
    }

    /// Check whether this cell may occupy the given column
    ///
    /// Unset cells match any column whose tag agrees with theirs.
    #[inline]
    pub fn matches(&self, field: &Field) -> bool {
        self.tag == field.tag
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod value_test;
