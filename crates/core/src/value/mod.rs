//! Owned Rust representation of CMPI data
//!
//! [`Data`] mirrors `CMPIData`: a type tag, a validity state and an optional
//! payload. Null is carried by the state alone, so a value can be both a key
//! and null. Encapsulated payloads (references, instances, arrays) are owned
//! trees rather than handles; conversion to and from the raw ABI lives in
//! [`raw`].

pub mod query;
pub mod raw;

pub use query::{CondForm, PredOp, PredicateData, SelectExpData};

use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::datetime::CimDateTime;
use crate::flags::ValueState;
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::types;

/// A CIM value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Char16(u16),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Sint8(i8),
    Sint16(i16),
    Sint32(i32),
    Sint64(i64),
    Real32(f32),
    Real64(f64),
    String(String),
    /// Plain C string (`CMPI_chars`); stored by the broker as a string
    Chars(String),
    DateTime(CimDateTime),
    Ref(ObjectPathData),
    Instance(Box<InstanceData>),
    Array(ArrayData),
    /// Opaque memory block (`CMPI_ptr`), never dereferenced by the broker
    Ptr(PtrValue),
}

/// Address and length of a `CMPI_ptr` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PtrValue {
    pub addr: usize,
    pub length: u32,
}

impl Value {
    /// Type tag this value is encoded with
    pub fn type_tag(&self) -> CMPIType {
        match self {
            Value::Boolean(_) => CMPI_boolean,
            Value::Char16(_) => CMPI_char16,
            Value::Uint8(_) => CMPI_uint8,
            Value::Uint16(_) => CMPI_uint16,
            Value::Uint32(_) => CMPI_uint32,
            Value::Uint64(_) => CMPI_uint64,
            Value::Sint8(_) => CMPI_sint8,
            Value::Sint16(_) => CMPI_sint16,
            Value::Sint32(_) => CMPI_sint32,
            Value::Sint64(_) => CMPI_sint64,
            Value::Real32(_) => CMPI_real32,
            Value::Real64(_) => CMPI_real64,
            Value::String(_) => CMPI_string,
            Value::Chars(_) => CMPI_chars,
            Value::DateTime(_) => CMPI_dateTime,
            Value::Ref(_) => CMPI_ref,
            Value::Instance(_) => CMPI_instance,
            Value::Array(a) => types::array_of(a.element_type),
            Value::Ptr(_) => CMPI_ptr,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Chars(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer value widened to i128
    pub fn as_integer(&self) -> Option<i128> {
        Some(match *self {
            Value::Uint8(v) => v.into(),
            Value::Uint16(v) => v.into(),
            Value::Uint32(v) => v.into(),
            Value::Uint64(v) => v.into(),
            Value::Sint8(v) => v.into(),
            Value::Sint16(v) => v.into(),
            Value::Sint32(v) => v.into(),
            Value::Sint64(v) => v.into(),
            Value::Char16(v) => v.into(),
            _ => return None,
        })
    }

    /// Any numeric value as f64
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Real32(v) => Some(v.into()),
            Value::Real64(v) => Some(v),
            _ => self.as_integer().map(|v| v as f64),
        }
    }

    pub fn as_ref_path(&self) -> Option<&ObjectPathData> {
        match self {
            Value::Ref(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceData> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Store `chars` as `string`; the broker never keeps borrowed C strings
    pub(crate) fn normalized(self) -> Value {
        match self {
            Value::Chars(s) => Value::String(s),
            other => other,
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    i8 => Sint8,
    i16 => Sint16,
    i32 => Sint32,
    i64 => Sint64,
    f32 => Real32,
    f64 => Real64,
    String => String,
    &str => String,
    CimDateTime => DateTime,
    ObjectPathData => Ref,
    ArrayData => Array,
}

impl From<InstanceData> for Value {
    fn from(v: InstanceData) -> Self {
        Value::Instance(Box::new(v))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Value::Char16(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "{v}"),
            },
            Value::Uint8(v) => write!(f, "{v}"),
            Value::Uint16(v) => write!(f, "{v}"),
            Value::Uint32(v) => write!(f, "{v}"),
            Value::Uint64(v) => write!(f, "{v}"),
            Value::Sint8(v) => write!(f, "{v}"),
            Value::Sint16(v) => write!(f, "{v}"),
            Value::Sint32(v) => write!(f, "{v}"),
            Value::Sint64(v) => write!(f, "{v}"),
            Value::Real32(v) => write!(f, "{v}"),
            Value::Real64(v) => write!(f, "{v}"),
            Value::String(s) | Value::Chars(s) => write_quoted(f, s),
            Value::DateTime(dt) => write!(f, "\"{dt}\""),
            Value::Ref(p) => write_quoted(f, &p.to_string()),
            Value::Instance(i) => write!(f, "{i}"),
            Value::Array(a) => {
                f.write_char('{')?;
                for (i, e) in a.elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_char('}')
            }
            Value::Ptr(p) => write!(f, "ptr(0x{:x}, {})", p.addr, p.length),
        }
    }
}

fn write_quoted(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

/// Tagged value with validity state, the owned form of `CMPIData`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Data {
    #[serde(rename = "type", serialize_with = "serialize_type")]
    pub ty: CMPIType,
    #[serde(serialize_with = "serialize_state")]
    pub state: ValueState,
    pub value: Option<Value>,
}

fn serialize_type<S: Serializer>(ty: &CMPIType, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&types::type_name(*ty))
}

fn serialize_state<S: Serializer>(state: &ValueState, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(state.bits())
}

impl Data {
    /// Good value, tag taken from the value
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            ty: value.type_tag(),
            state: ValueState::GOOD,
            value: Some(value),
        }
    }

    /// Key value
    pub fn key(value: impl Into<Value>) -> Self {
        Self::new(value).with_state(ValueState::KEY)
    }

    /// Null value of a type
    pub fn null(ty: CMPIType) -> Self {
        Self {
            ty,
            state: ValueState::NULL,
            value: None,
        }
    }

    /// Result of a failed lookup by name or index
    pub fn not_found() -> Self {
        Self {
            ty: CMPI_null,
            state: ValueState::NULL | ValueState::NOT_FOUND,
            value: None,
        }
    }

    /// Add state bits; setting `NULL` drops the payload
    pub fn with_state(mut self, state: ValueState) -> Self {
        self.state |= state;
        if self.state.has_no_payload() {
            self.value = None;
        }
        self
    }

    pub fn is_null(&self) -> bool {
        self.state.contains(ValueState::NULL) || self.value.is_none()
    }

    pub fn is_key(&self) -> bool {
        self.state.contains(ValueState::KEY)
    }

    pub fn is_not_found(&self) -> bool {
        self.state.contains(ValueState::NOT_FOUND)
    }

    /// The payload, or `None` for null and not-found values
    pub fn value(&self) -> Option<&Value> {
        if self.state.has_no_payload() {
            None
        } else {
            self.value.as_ref()
        }
    }

    pub fn into_value(self) -> Option<Value> {
        if self.state.has_no_payload() {
            None
        } else {
            self.value
        }
    }

    pub(crate) fn normalized(mut self) -> Data {
        if types::element_type(self.ty) == CMPI_chars {
            self.ty = if types::is_array(self.ty) {
                CMPI_stringA
            } else {
                CMPI_string
            };
        }
        self.value = self.value.map(Value::normalized);
        self
    }
}

impl<T: Into<Value>> From<T> for Data {
    fn from(v: T) -> Self {
        Data::new(v)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("NULL"),
        }
    }
}

/// Ordered name -> data collection with case-insensitive names
///
/// Backs args, context entries and object path keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NamedData {
    entries: Vec<(String, Data)>,
}

impl NamedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace (keeps the original position on replace)
    pub fn set(&mut self, name: &str, data: Data) {
        match self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, d)) => *d = data,
            None => self.entries.push((name.to_string(), data)),
        }
    }

    pub fn with(mut self, name: &str, data: impl Into<Data>) -> Self {
        self.set(name, data.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Data> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, d)| d)
    }

    pub fn get_at(&self, index: usize) -> Option<(&str, &Data)> {
        self.entries.get(index).map(|(n, d)| (n.as_str(), d))
    }

    pub fn remove(&mut self, name: &str) -> Option<Data> {
        let pos = self
            .entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Data)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }
}

/// Method arguments
pub type ArgsData = NamedData;

/// Identity of a class or instance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectPathData {
    pub host: String,
    pub namespace: String,
    pub class_name: String,
    pub keys: NamedData,
}

impl ObjectPathData {
    pub fn new(namespace: &str, class_name: &str) -> Self {
        Self {
            host: String::new(),
            namespace: namespace.to_string(),
            class_name: class_name.to_string(),
            keys: NamedData::new(),
        }
    }

    /// Builder form of [`add_key`](Self::add_key) that panics on non-key types;
    /// intended for literals in provider code and tests.
    pub fn with_key(mut self, name: &str, value: impl Into<Value>) -> Self {
        let data = Data::new(value);
        let ty = data.ty;
        if self.add_key(name, data).is_err() {
            panic!("{} is not a key type", types::type_name(ty));
        }
        self
    }

    /// Add or replace a key binding
    ///
    /// Only scalar key types are accepted; the stored value is marked as a key.
    pub fn add_key(&mut self, name: &str, data: Data) -> CmpiResult<()> {
        if !types::is_key_type(data.ty) {
            return Err(CmpiError::type_mismatch(format!(
                "{} cannot be a key binding",
                types::type_name(data.ty)
            )));
        }
        self.keys.set(name, data.normalized().with_state(ValueState::KEY));
        Ok(())
    }

    pub fn key(&self, name: &str) -> Option<&Data> {
        self.keys.get(name)
    }

    /// Class path: no keys
    pub fn is_class_path(&self) -> bool {
        self.keys.is_empty()
    }

    /// Path identity: namespace, class and key names compare case-insensitively
    pub fn same_identity(&self, other: &ObjectPathData) -> bool {
        self.namespace.eq_ignore_ascii_case(&other.namespace)
            && self.class_name.eq_ignore_ascii_case(&other.class_name)
            && self.keys.len() == other.keys.len()
            && self
                .keys
                .iter()
                .all(|(n, d)| other.keys.get(n).map(|o| o.value() == d.value()).unwrap_or(false))
    }

    /// Class path with the same namespace and class
    pub fn class_path(&self) -> ObjectPathData {
        ObjectPathData {
            host: self.host.clone(),
            namespace: self.namespace.clone(),
            class_name: self.class_name.clone(),
            keys: NamedData::new(),
        }
    }
}

/// WBEM URI form: `//host/ns:Class.k="v",n=1`
impl fmt::Display for ObjectPathData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.host.is_empty() {
            write!(f, "//{}/", self.host)?;
        }
        if !self.namespace.is_empty() {
            write!(f, "{}:", self.namespace)?;
        }
        f.write_str(&self.class_name)?;
        for (i, (name, data)) in self.keys.iter().enumerate() {
            f.write_char(if i == 0 { '.' } else { ',' })?;
            write!(f, "{name}={data}")?;
        }
        Ok(())
    }
}

impl FromStr for ObjectPathData {
    type Err = CmpiError;

    /// Parse the WBEM URI form produced by `Display`
    ///
    /// Unquoted integer keys become `sint64` (or `uint64` when too large),
    /// `TRUE`/`FALSE` become booleans and quoted values strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = |why: &str| CmpiError::invalid_parameter(format!("invalid object path '{s}': {why}"));

        let mut rest = s.trim();
        let mut path = ObjectPathData::default();

        if let Some(after) = rest.strip_prefix("//") {
            let slash = after.find('/').ok_or_else(|| bad("host without namespace"))?;
            path.host = after[..slash].to_string();
            rest = &after[slash + 1..];
        }

        let (head, keys) = match rest.find('.') {
            Some(dot) => (&rest[..dot], Some(&rest[dot + 1..])),
            None => (rest, None),
        };
        match head.rfind(':') {
            Some(colon) => {
                path.namespace = head[..colon].to_string();
                path.class_name = head[colon + 1..].to_string();
            }
            None => path.class_name = head.to_string(),
        }
        if path.class_name.is_empty() {
            return Err(bad("missing class name"));
        }

        if let Some(keys) = keys {
            for binding in split_bindings(keys).map_err(|e| bad(e))? {
                let (name, raw) = binding
                    .split_once('=')
                    .ok_or_else(|| bad("key binding without '='"))?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(bad("empty key name"));
                }
                let value = parse_key_value(raw.trim()).ok_or_else(|| bad("bad key value"))?;
                path.add_key(name, Data::new(value))?;
            }
        }
        Ok(path)
    }
}

fn split_bindings(s: &str) -> Result<Vec<&str>, &'static str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                out.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quoted {
        return Err("unterminated string");
    }
    out.push(&s[start..]);
    Ok(out)
}

fn parse_key_value(raw: &str) -> Option<Value> {
    if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                out.push(chars.next()?);
            } else {
                out.push(c);
            }
        }
        return Some(Value::String(out));
    }
    if raw.eq_ignore_ascii_case("true") {
        return Some(Value::Boolean(true));
    }
    if raw.eq_ignore_ascii_case("false") {
        return Some(Value::Boolean(false));
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Some(Value::Sint64(v));
    }
    if let Ok(v) = raw.parse::<u64>() {
        return Some(Value::Uint64(v));
    }
    raw.parse::<f64>().ok().map(Value::Real64)
}

/// One instance property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyData {
    pub name: String,
    pub data: Data,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// CIM instance: object path plus ordered properties
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstanceData {
    pub path: ObjectPathData,
    pub properties: Vec<PropertyData>,
    /// Property filter; `None` accepts every property
    #[serde(skip)]
    filter: Option<Vec<String>>,
}

impl InstanceData {
    pub fn new(path: ObjectPathData) -> Self {
        Self {
            path,
            properties: Vec::new(),
            filter: None,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.path.class_name
    }

    /// Builder form of [`set_property`](Self::set_property)
    pub fn with_property(mut self, name: &str, data: impl Into<Data>) -> Self {
        self.set_property(name, data.into(), None);
        self
    }

    /// Set or replace a property; ignored when a filter excludes it
    ///
    /// Returns whether the property was stored.
    pub fn set_property(&mut self, name: &str, data: Data, origin: Option<&str>) -> bool {
        if !self.accepts(name) {
            return false;
        }
        let data = data.normalized();
        match self
            .properties
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(p) => {
                p.data = data;
                if origin.is_some() {
                    p.origin = origin.map(str::to_string);
                }
            }
            None => self.properties.push(PropertyData {
                name: name.to_string(),
                data,
                origin: origin.map(str::to_string),
            }),
        }
        true
    }

    pub fn property(&self, name: &str) -> Option<&Data> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.data)
    }

    pub fn property_at(&self, index: usize) -> Option<&PropertyData> {
        self.properties.get(index)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Restrict properties to `list` plus `keys`
    ///
    /// Existing properties outside the filter are dropped and later sets of
    /// them are ignored. `None` removes the filter.
    pub fn set_filter(&mut self, list: Option<&[String]>, keys: &[String]) {
        self.filter = list.map(|l| l.iter().chain(keys).cloned().collect());
        let properties = std::mem::take(&mut self.properties);
        self.properties = properties
            .into_iter()
            .filter(|p| self.accepts(&p.name))
            .collect();
    }

    pub fn accepts(&self, name: &str) -> bool {
        match &self.filter {
            Some(list) => {
                list.iter().any(|n| n.eq_ignore_ascii_case(name)) || self.path.key(name).is_some()
            }
            None => true,
        }
    }

    /// Copy keeping only the listed properties (and key properties)
    pub fn projected(&self, properties: Option<&[String]>) -> InstanceData {
        match properties {
            None => self.clone(),
            Some(list) => {
                let mut out = InstanceData::new(self.path.clone());
                out.properties = self
                    .properties
                    .iter()
                    .filter(|p| {
                        list.iter().any(|n| n.eq_ignore_ascii_case(&p.name))
                            || self.path.key(&p.name).is_some()
                    })
                    .cloned()
                    .collect();
                out
            }
        }
    }
}

/// MOF-like rendering used by `toString`
impl fmt::Display for InstanceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "instance of {} {{", self.path.class_name)?;
        for p in &self.properties {
            writeln!(f, "    {} = {};", p.name, p.data)?;
        }
        f.write_str("};")
    }
}

/// Fixed element type array
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayData {
    #[serde(serialize_with = "serialize_type")]
    pub element_type: CMPIType,
    pub elements: Vec<Data>,
}

impl ArrayData {
    /// `size` null elements of `element_type`
    pub fn new(element_type: CMPIType, size: usize) -> Self {
        let element_type = types::element_type(element_type);
        Self {
            element_type,
            elements: vec![Data::null(element_type); size],
        }
    }

    pub fn from_values<V: Into<Value>>(element_type: CMPIType, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            element_type: types::element_type(element_type),
            elements: values.into_iter().map(|v| Data::new(v.into())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Data> {
        self.elements.get(index)
    }

    /// Replace an element; the type must match the element type
    ///
    /// `chars` is accepted for string arrays.
    pub fn set(&mut self, index: usize, data: Data) -> CmpiResult<()> {
        let compatible = data.ty == self.element_type
            || (self.element_type == CMPI_string && data.ty == CMPI_chars)
            || data.is_null();
        if !compatible {
            return Err(CmpiError::type_mismatch(format!(
                "{} element into {} array",
                types::type_name(data.ty),
                types::type_name(self.element_type)
            )));
        }
        let len = self.elements.len();
        let slot = self
            .elements
            .get_mut(index)
            .ok_or_else(|| CmpiError::no_such_property(&format!("index {index} of {len}")))?;
        let mut data = data.normalized();
        data.ty = self.element_type;
        *slot = data;
        Ok(())
    }
}

/// Structured extended error (`CMPIError`)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorData {
    pub error_type: CMPIErrorType,
    pub other_error_type: Option<String>,
    pub owning_entity: Option<String>,
    pub message_id: Option<String>,
    pub message: Option<String>,
    pub perceived_severity: CMPIErrorSeverity,
    pub probable_cause: CMPIErrorProbableCause,
    pub probable_cause_description: Option<String>,
    pub recommended_actions: Option<Vec<String>>,
    pub error_source: Option<String>,
    pub error_source_format: CMPIErrorSrcFormat,
    pub other_error_source_format: Option<String>,
    pub cim_status_code: CMPIrc,
    pub cim_status_code_description: Option<String>,
    pub message_arguments: Option<Vec<String>>,
}

impl ErrorData {
    /// Fields set by `newCMPIError`
    pub fn new(
        owner: &str,
        message_id: &str,
        message: &str,
        severity: CMPIErrorSeverity,
        cause: CMPIErrorProbableCause,
        status: CMPIrc,
    ) -> Self {
        Self {
            owning_entity: Some(owner.to_string()),
            message_id: Some(message_id.to_string()),
            message: Some(message.to_string()),
            perceived_severity: severity,
            probable_cause: cause,
            cim_status_code: status,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_tags() {
        assert_eq!(Value::from(true).type_tag(), CMPI_boolean);
        assert_eq!(Value::from(7u16).type_tag(), CMPI_uint16);
        assert_eq!(Value::from(-7i64).type_tag(), CMPI_sint64);
        assert_eq!(Value::from("x").type_tag(), CMPI_string);
        assert_eq!(
            Value::from(ArrayData::from_values(CMPI_uint8, [1u8, 2])).type_tag(),
            CMPI_uint8A
        );
    }

    #[test]
    fn test_null_and_key_are_independent() {
        let d = Data::key(5u32).with_state(ValueState::NULL);
        assert!(d.is_key());
        assert!(d.is_null());
        assert_eq!(d.ty, CMPI_uint32);
        assert_eq!(d.value(), None);

        let d = Data::key("abc");
        assert!(d.is_key() && !d.is_null());
        assert_eq!(d.value().and_then(Value::as_str), Some("abc"));
    }

    #[test]
    fn test_null_payload_is_hidden() {
        let mut d = Data::new(1u8);
        d.state = ValueState::NULL;
        assert_eq!(d.value(), None);
        assert_eq!(d.clone().into_value(), None);
        assert_eq!(d.to_string(), "NULL");
    }

    #[test]
    fn test_named_data_case_insensitive_replace() {
        let mut n = NamedData::new().with("Name", "a").with("Count", 1u32);
        n.set("NAME", Data::new("b"));
        assert_eq!(n.len(), 2);
        assert_eq!(n.get_at(0).map(|(k, _)| k), Some("Name"));
        assert_eq!(n.get("name").and_then(|d| d.value()).and_then(Value::as_str), Some("b"));
        assert!(n.remove("count").is_some());
        assert!(n.get("Count").is_none());
    }

    #[test]
    fn test_object_path_display() {
        let p = ObjectPathData::new("root/cimv2", "Sample_Thing")
            .with_key("Id", 3i64)
            .with_key("Name", "a \"b\"");
        assert_eq!(p.to_string(), r#"root/cimv2:Sample_Thing.Id=3,Name="a \"b\"""#);

        let mut hosted = p.class_path();
        hosted.host = "srv".into();
        assert_eq!(hosted.to_string(), "//srv/root/cimv2:Sample_Thing");
    }

    #[test]
    fn test_object_path_parse() {
        let p: ObjectPathData = r#"//srv/root/cimv2:Sample.Id=3,Name="x,y",On=TRUE"#
            .parse()
            .unwrap();
        assert_eq!(p.host, "srv");
        assert_eq!(p.namespace, "root/cimv2");
        assert_eq!(p.class_name, "Sample");
        assert_eq!(p.key("id").and_then(|d| d.value()), Some(&Value::Sint64(3)));
        assert_eq!(
            p.key("Name").and_then(|d| d.value()).and_then(Value::as_str),
            Some("x,y")
        );
        assert_eq!(p.key("On").and_then(|d| d.value()), Some(&Value::Boolean(true)));
        assert!(p.key("Id").map(Data::is_key).unwrap_or(false));

        let reparsed: ObjectPathData = p.to_string().parse().unwrap();
        assert!(reparsed.same_identity(&p));
    }

    #[test]
    fn test_object_path_parse_errors() {
        assert!("".parse::<ObjectPathData>().is_err());
        assert!("ns:.A=1".parse::<ObjectPathData>().is_err());
        assert!(r#"ns:C.A="open"#.parse::<ObjectPathData>().is_err());
        assert!("ns:C.A".parse::<ObjectPathData>().is_err());
    }

    #[test]
    fn test_key_types_are_restricted() {
        let mut p = ObjectPathData::new("ns", "C");
        assert!(p.add_key("A", Data::new(1u32)).is_ok());
        let inst = InstanceData::new(ObjectPathData::new("ns", "E"));
        let err = p.add_key("B", Data::new(inst)).unwrap_err();
        assert_eq!(err.rc(), CMPI_RC_ERR_TYPE_MISMATCH);
        let arr = ArrayData::new(CMPI_uint8, 1);
        assert!(p.add_key("C", Data::new(arr)).is_err());
    }

    #[test]
    fn test_same_identity_ignores_case() {
        let a = ObjectPathData::new("root/CIMV2", "Sample").with_key("Id", "1");
        let b = ObjectPathData::new("root/cimv2", "SAMPLE").with_key("ID", "1");
        let c = ObjectPathData::new("root/cimv2", "Sample").with_key("Id", "2");
        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&c));
    }

    #[test]
    fn test_instance_property_filter() {
        let path = ObjectPathData::new("ns", "C").with_key("Id", 1i64);
        let mut inst = InstanceData::new(path)
            .with_property("Id", Data::key(1i64))
            .with_property("A", 1u8)
            .with_property("B", 2u8);

        inst.set_filter(Some(&["A".to_string()]), &[]);
        assert!(inst.property("B").is_none());
        assert!(inst.property("Id").is_some());
        assert!(!inst.set_property("C", Data::new(3u8), None));
        assert!(inst.set_property("a", Data::new(9u8), Some("C")));
        assert_eq!(inst.property("A").and_then(|d| d.value()), Some(&Value::Uint8(9)));
        assert_eq!(inst.property_at(1).and_then(|p| p.origin.as_deref()), Some("C"));
    }

    #[test]
    fn test_instance_projection_keeps_keys() {
        let path = ObjectPathData::new("ns", "C").with_key("Id", 1i64);
        let inst = InstanceData::new(path)
            .with_property("Id", Data::key(1i64))
            .with_property("A", 1u8)
            .with_property("B", 2u8);
        let p = inst.projected(Some(&["b".to_string()]));
        let names: Vec<_> = p.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Id", "B"]);
    }

    #[test]
    fn test_chars_normalized_to_string() {
        let mut inst = InstanceData::new(ObjectPathData::new("ns", "C"));
        inst.set_property("S", Data::new(Value::Chars("x".into())), None);
        let d = inst.property("S").unwrap();
        assert_eq!(d.ty, CMPI_string);
        assert_eq!(d.value(), Some(&Value::String("x".into())));
    }

    #[test]
    fn test_array_set_checks_type_and_bounds() {
        let mut a = ArrayData::new(CMPI_uint32A, 2);
        assert_eq!(a.element_type, CMPI_uint32);
        assert!(a.get(0).map(Data::is_null).unwrap_or(false));
        a.set(1, Data::new(7u32)).unwrap();
        assert_eq!(
            a.set(0, Data::new("x")).unwrap_err().rc(),
            CMPI_RC_ERR_TYPE_MISMATCH
        );
        assert_eq!(
            a.set(2, Data::new(1u32)).unwrap_err().rc(),
            CMPI_RC_ERR_NO_SUCH_PROPERTY
        );

        let mut s = ArrayData::new(CMPI_string, 1);
        s.set(0, Data::new(Value::Chars("c".into()))).unwrap();
        assert_eq!(s.get(0).map(|d| d.ty), Some(CMPI_string));
    }

    #[test]
    fn test_instance_json() {
        let inst = InstanceData::new(ObjectPathData::new("ns", "C").with_key("Id", 1i64))
            .with_property("Name", "n");
        let json = serde_json::to_value(&inst).unwrap();
        assert_eq!(json["path"]["class_name"], "C");
        assert_eq!(json["properties"][0]["data"]["type"], "string");
        assert_eq!(json["properties"][0]["data"]["value"], "n");
    }
}
