//! Typed values for the Bolt data model.
//!
//! [`Value`] is a closed enum over everything a query result can contain.
//! Graph and temporal structures get their own Rust types rather than a
//! generic tagged-structure representation, so a decoded [`Node`] is a
//! `Node` and not a field list the caller has to pick apart.

use std::fmt;

use chrono::{
    DateTime as ChronoDateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike,
};

use super::PackError;

/// Nanoseconds per second, used by the temporal conversions.
const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A value received from or sent to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit IEEE 754 float.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// A byte array.
    Bytes(Vec<u8>),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A string-keyed map of values.
    Map(ValueMap),
    /// A graph node. Receive-only.
    Node(Node),
    /// A graph relationship bound to its endpoints. Receive-only.
    Relationship(Relationship),
    /// A relationship without endpoint information. Receive-only.
    UnboundRelationship(UnboundRelationship),
    /// An alternating node/relationship walk. Receive-only.
    Path(Path),
    /// A calendar date.
    Date(Date),
    /// A time of day with a UTC offset. Receive-only.
    Time(Time),
    /// A time of day without timezone information.
    LocalTime(LocalTime),
    /// A point in time with a UTC offset. Receive-only.
    DateTime(DateTime),
    /// A point in time with a named timezone. Receive-only.
    DateTimeZoneId(DateTimeZoneId),
    /// A point in time without timezone information.
    LocalDateTime(LocalDateTime),
    /// A calendar-aware span of time.
    Duration(Duration),
    /// A 2D spatial point. Receive-only.
    Point2d(Point2d),
    /// A 3D spatial point. Receive-only.
    Point3d(Point3d),
}

impl Value {
    /// The name of this value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Node(_) => "node",
            Value::Relationship(_) => "relationship",
            Value::UnboundRelationship(_) => "unbound relationship",
            Value::Path(_) => "path",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::LocalTime(_) => "local time",
            Value::DateTime(_) => "date time",
            Value::DateTimeZoneId(_) => "zoned date time",
            Value::LocalDateTime(_) => "local date time",
            Value::Duration(_) => "duration",
            Value::Point2d(_) => "2d point",
            Value::Point3d(_) => "3d point",
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The float, if this is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The byte array, if this is one.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The list, if this is one.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// The map, if this is one.
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// The node, if this is one.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// The relationship, if this is one.
    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// The path, if this is one.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<ValueMap> for Value {
    fn from(v: ValueMap) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A string-keyed map that preserves insertion order.
///
/// Lookups scan linearly, which is the right trade-off for the small maps
/// Bolt messages carry (parameters, metadata, properties). Equality is
/// order-independent.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: Vec<(String, Value)>,
}

impl ValueMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by key. With duplicate keys (possible only through
    /// [`ValueMap::insert_unchecked`]), the first match wins.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert an entry, rejecting duplicate keys.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), PackError> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(PackError::DuplicateKey(key));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    /// Insert an entry without checking for duplicates. Used on the decode
    /// path, where the server's encoding is taken as-is.
    pub fn insert_unchecked(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl FromIterator<(String, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert_unchecked(k, v);
        }
        map
    }
}

impl IntoIterator for ValueMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A graph node.
///
/// Equality treats `labels` as a set; the server makes no ordering
/// promise for labels.
#[derive(Debug, Clone)]
pub struct Node {
    /// Server-assigned node id.
    pub id: i64,
    /// Labels attached to the node.
    pub labels: Vec<String>,
    /// Node properties.
    pub properties: ValueMap,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.id != other.id || self.labels.len() != other.labels.len() {
            return false;
        }
        let mut a: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        let mut b: Vec<&str> = other.labels.iter().map(String::as_str).collect();
        a.sort_unstable();
        b.sort_unstable();
        a == b && self.properties == other.properties
    }
}

/// A relationship bound to its endpoint nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    /// Server-assigned relationship id.
    pub id: i64,
    /// Id of the node the relationship starts at.
    pub start_id: i64,
    /// Id of the node the relationship ends at.
    pub end_id: i64,
    /// Relationship type.
    pub type_: String,
    /// Relationship properties.
    pub properties: ValueMap,
}

/// A relationship as it appears inside a [`Path`], without endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct UnboundRelationship {
    /// Server-assigned relationship id.
    pub id: i64,
    /// Relationship type.
    pub type_: String,
    /// Relationship properties.
    pub properties: ValueMap,
}

/// An alternating walk of nodes and relationships.
///
/// `indices` encodes the walk as pairs: a signed 1-based reference into
/// `relationships` (negative means the relationship is traversed against
/// its direction) followed by a 0-based reference into `nodes`. The
/// decoder validates the references, so the accessors here do not fail on
/// decoded paths.
#[derive(Debug, Clone)]
pub struct Path {
    /// Distinct nodes appearing on the path. The first is the start node.
    pub nodes: Vec<Node>,
    /// Distinct relationships appearing on the path.
    pub relationships: Vec<UnboundRelationship>,
    /// The walk, as alternating relationship and node references.
    pub indices: Vec<i64>,
}

/// One step of a path walk: the relationship taken and the node arrived at.
#[derive(Debug, PartialEq)]
pub struct Hop<'a> {
    /// The relationship traversed.
    pub relationship: &'a UnboundRelationship,
    /// Whether it was traversed against its direction.
    pub reversed: bool,
    /// The node the hop arrives at.
    pub node: &'a Node,
}

impl Path {
    /// Number of hops (relationships) on the path.
    pub fn hop_count(&self) -> usize {
        self.indices.len() / 2
    }

    /// The node the path starts at.
    pub fn start(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Iterate the hops of the walk. Yields `None` for a hop whose
    /// references do not resolve, which cannot happen for decoded paths.
    pub fn hops(&self) -> impl Iterator<Item = Option<Hop<'_>>> {
        self.indices.chunks(2).map(move |pair| {
            let [rel_ref, node_ref] = pair else {
                return None;
            };
            if *rel_ref == 0 {
                return None;
            }
            let relationship = self.relationships.get(rel_ref.unsigned_abs() as usize - 1)?;
            let node = self.nodes.get(usize::try_from(*node_ref).ok()?)?;
            Some(Hop {
                relationship,
                reversed: *rel_ref < 0,
                node,
            })
        })
    }
}

impl PartialEq for Path {
    /// Paths are equal when they describe the same walk: same start node
    /// and the same sequence of resolved hops. The layout of the `nodes`
    /// and `relationships` pools does not matter.
    fn eq(&self, other: &Self) -> bool {
        self.start() == other.start()
            && self.indices.len() == other.indices.len()
            && self.hops().zip(other.hops()).all(|(a, b)| a == b)
    }
}

/// A calendar date, stored as days since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    /// Days since 1970-01-01. Negative for earlier dates.
    pub days: i64,
}

impl Date {
    /// Convert from a chrono date.
    pub fn from_naive(date: NaiveDate) -> Self {
        // NaiveDate::default() is the Unix epoch.
        Date {
            days: date.signed_duration_since(NaiveDate::default()).num_days(),
        }
    }

    /// Convert to a chrono date. `None` if out of chrono's range.
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::default().checked_add_signed(chrono::Duration::try_days(self.days)?)
    }
}

/// A time of day with a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    /// Nanoseconds since midnight, in the local timezone.
    pub nanoseconds: i64,
    /// Timezone offset from UTC, in seconds.
    pub tz_offset_seconds: i64,
}

impl Time {
    /// The local time component as a chrono time, if in range.
    pub fn to_naive(self) -> Option<NaiveTime> {
        nanos_to_naive_time(self.nanoseconds)
    }

    /// The offset as a chrono offset, if in range.
    pub fn offset(self) -> Option<FixedOffset> {
        FixedOffset::east_opt(i32::try_from(self.tz_offset_seconds).ok()?)
    }
}

/// A time of day without timezone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    /// Nanoseconds since midnight.
    pub nanoseconds: i64,
}

impl LocalTime {
    /// Convert from a chrono time.
    pub fn from_naive(time: NaiveTime) -> Self {
        LocalTime {
            nanoseconds: time.num_seconds_from_midnight() as i64 * NANOS_PER_SEC
                + time.nanosecond() as i64,
        }
    }

    /// Convert to a chrono time. `None` if out of range.
    pub fn to_naive(self) -> Option<NaiveTime> {
        nanos_to_naive_time(self.nanoseconds)
    }
}

fn nanos_to_naive_time(nanoseconds: i64) -> Option<NaiveTime> {
    if nanoseconds < 0 {
        return None;
    }
    let secs = u32::try_from(nanoseconds / NANOS_PER_SEC).ok()?;
    let nanos = (nanoseconds % NANOS_PER_SEC) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

/// A point in time with a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    /// Seconds since the Unix epoch, in the local timezone.
    pub seconds: i64,
    /// Sub-second nanoseconds.
    pub nanoseconds: i64,
    /// Timezone offset from UTC, in seconds.
    pub tz_offset_seconds: i64,
}

impl DateTime {
    /// Convert to a chrono datetime with a fixed offset. `None` if the
    /// instant or the offset is out of chrono's range.
    ///
    /// `seconds` counts in local wall-clock time, so the UTC instant is
    /// obtained by subtracting the offset first.
    pub fn to_fixed_offset(self) -> Option<ChronoDateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(i32::try_from(self.tz_offset_seconds).ok()?)?;
        let utc_seconds = self.seconds.checked_sub(self.tz_offset_seconds)?;
        let nanos = u32::try_from(self.nanoseconds).ok()?;
        Some(ChronoDateTime::from_timestamp(utc_seconds, nanos)?.with_timezone(&offset))
    }
}

/// A point in time with a named timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeZoneId {
    /// Seconds since the Unix epoch, in the named timezone.
    pub seconds: i64,
    /// Sub-second nanoseconds.
    pub nanoseconds: i64,
    /// IANA timezone name, e.g. `Europe/Zagreb`.
    pub tz_id: String,
}

/// A point in time without timezone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDateTime {
    /// Seconds since the Unix epoch.
    pub seconds: i64,
    /// Sub-second nanoseconds.
    pub nanoseconds: i64,
}

impl LocalDateTime {
    /// Convert from a chrono datetime.
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        LocalDateTime {
            seconds: dt.and_utc().timestamp(),
            nanoseconds: dt.and_utc().timestamp_subsec_nanos() as i64,
        }
    }

    /// Convert to a chrono datetime. `None` if out of range.
    pub fn to_naive(self) -> Option<NaiveDateTime> {
        let nanos = u32::try_from(self.nanoseconds).ok()?;
        Some(ChronoDateTime::from_timestamp(self.seconds, nanos)?.naive_utc())
    }
}

/// A calendar-aware span of time.
///
/// Months and days have no fixed length in seconds, so the components are
/// kept separate and never normalized across unit boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// Whole months.
    pub months: i64,
    /// Whole days.
    pub days: i64,
    /// Whole seconds.
    pub seconds: i64,
    /// Sub-second nanoseconds.
    pub nanoseconds: i64,
}

/// A point in 2D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2d {
    /// Spatial reference system identifier.
    pub srid: i64,
    /// X (or longitude) coordinate.
    pub x: f64,
    /// Y (or latitude) coordinate.
    pub y: f64,
}

/// A point in 3D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3d {
    /// Spatial reference system identifier.
    pub srid: i64,
    /// X (or longitude) coordinate.
    pub x: f64,
    /// Y (or latitude) coordinate.
    pub y: f64,
    /// Z (or height) coordinate.
    pub z: f64,
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_naive() {
            Some(d) => write!(f, "{}", d),
            None => write!(f, "{} days since epoch", self.days),
        }
    }
}
