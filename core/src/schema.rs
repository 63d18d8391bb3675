//! Declarative JSON ⇄ record conversion with empty-field trimming.
//!
//! # Design
//! A `Schema` is an ordered list of field declarations. `load` turns a wire
//! JSON mapping into an immutable `Record` keyed by the declared field
//! names; `dump` goes the other way and drops "empty" fields — null values,
//! and empty sequences for collection fields — because the remote API
//! treats absent and null/empty as equivalent.
//!
//! Records are value objects: cheap to clone, never mutated. Any "change"
//! goes through `Record::with`, which rebuilds a fresh record.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::Error;

/// Semantic type of a declared field.
#[derive(Debug, Clone)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    /// Accepts any JSON value unchanged.
    Raw,
    /// A nested mapping handled by an inner schema.
    Nested(Arc<Schema>),
}

impl FieldType {
    fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Integer => "an integer",
            FieldType::Float => "a number",
            FieldType::Boolean => "a boolean",
            FieldType::Raw => "any value",
            FieldType::Nested(_) => "a mapping",
        }
    }
}

/// One declared field: record name, optional wire alias, type, and flags.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    attribute: Option<String>,
    ty: FieldType,
    required: bool,
    allow_none: bool,
    many: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            attribute: None,
            ty,
            required: false,
            allow_none: false,
            many: false,
        }
    }

    /// Fail `load` when the wire mapping lacks this field.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Accept an explicit JSON null on load.
    pub fn allow_none(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Collection-valued: the wire value is a sequence and every element is
    /// coerced individually.
    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    /// Use `wire_name` on the wire while keeping `name` on the record.
    pub fn attribute(mut self, wire_name: impl Into<String>) -> Self {
        self.attribute = Some(wire_name.into());
        self
    }

    fn wire_name(&self) -> &str {
        self.attribute.as_deref().unwrap_or(&self.name)
    }
}

/// A loaded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    /// A coerced scalar or raw JSON value.
    Scalar(Value),
    /// A nested record produced by an inner schema.
    Record(Record),
    /// A sequence of element values for `many` fields.
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }
}

/// An immutable, named-field value object produced by `Schema::load`.
///
/// Field names are exactly the schema's declared names. Cloning is cheap;
/// the underlying storage is shared and never written through.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Arc<BTreeMap<String, FieldValue>>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Rebuild this record with `name` replaced by `value`. The original is
    /// untouched. Unknown names fail rather than growing the record.
    pub fn with(&self, name: &str, value: FieldValue) -> Result<Record, Error> {
        if !self.fields.contains_key(name) {
            return Err(Error::Validation(format!("record has no field `{name}`")));
        }
        let mut fields = (*self.fields).clone();
        fields.insert(name.to_string(), value);
        Ok(Record {
            fields: Arc::new(fields),
        })
    }
}

/// Input accepted by `Schema::dump`: either a typed record or a plain
/// field-name→value mapping, resolved once at the start of the dump.
pub enum DumpSource<'a> {
    Record(&'a Record),
    Mapping(&'a Map<String, Value>),
}

impl<'a> From<&'a Record> for DumpSource<'a> {
    fn from(record: &'a Record) -> Self {
        DumpSource::Record(record)
    }
}

impl<'a> From<&'a Map<String, Value>> for DumpSource<'a> {
    fn from(mapping: &'a Map<String, Value>) -> Self {
        DumpSource::Mapping(mapping)
    }
}

/// An ordered field mapping performing wire JSON ⇄ record conversion.
#[derive(Debug)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Convert a wire mapping into a typed record.
    ///
    /// Each declared field is read by its wire name, checked against
    /// `required`/`allow_none`, and coerced to its declared type. Absent
    /// optional fields load as `Null`.
    pub fn load(&self, wire: &Map<String, Value>) -> Result<Record, Error> {
        let mut fields = BTreeMap::new();
        for field in &self.fields {
            let value = match wire.get(field.wire_name()) {
                None => {
                    if field.required {
                        return Err(Error::Validation(format!(
                            "field `{}` is required",
                            field.name
                        )));
                    }
                    FieldValue::Null
                }
                Some(Value::Null) => {
                    if field.allow_none {
                        FieldValue::Null
                    } else {
                        return Err(Error::Validation(format!(
                            "field `{}` may not be null",
                            field.name
                        )));
                    }
                }
                Some(value) => coerce(field, value)?,
            };
            fields.insert(field.name.clone(), value);
        }
        Ok(Record {
            fields: Arc::new(fields),
        })
    }

    /// Convert a record or plain mapping into a wire mapping.
    ///
    /// Fields whose value is null, or an empty sequence for `many` fields,
    /// are trimmed from the output. Everything else — including falsy values
    /// like `0`, `false`, and `""` — is emitted under its wire name.
    pub fn dump<'a>(&self, source: impl Into<DumpSource<'a>>) -> Result<Map<String, Value>, Error> {
        let source = source.into();
        let mut wire = Map::new();
        for field in &self.fields {
            let value = match &source {
                DumpSource::Record(record) => match record.get(&field.name) {
                    Some(value) => self.field_value_to_json(field, value)?,
                    None => Value::Null,
                },
                DumpSource::Mapping(mapping) => match mapping.get(&field.name) {
                    Some(value) => self.mapping_value_to_json(field, value)?,
                    None => Value::Null,
                },
            };
            if is_trimmed(field, &value) {
                continue;
            }
            wire.insert(field.wire_name().to_string(), value);
        }
        Ok(wire)
    }

    fn field_value_to_json(&self, field: &Field, value: &FieldValue) -> Result<Value, Error> {
        match value {
            FieldValue::Null => Ok(Value::Null),
            FieldValue::Scalar(value) => Ok(value.clone()),
            FieldValue::Record(record) => {
                let FieldType::Nested(inner) = &field.ty else {
                    return Err(Error::Validation(format!(
                        "field `{}` is not nested but holds a record",
                        field.name
                    )));
                };
                Ok(Value::Object(inner.dump(record)?))
            }
            FieldValue::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.field_value_to_json(field, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(values))
            }
        }
    }

    fn mapping_value_to_json(&self, field: &Field, value: &Value) -> Result<Value, Error> {
        let FieldType::Nested(inner) = &field.ty else {
            return Ok(value.clone());
        };
        // Nested values recurse through the inner schema so every level
        // trims its own empty fields.
        match value {
            Value::Null => Ok(Value::Null),
            Value::Array(items) if field.many => {
                let values = items
                    .iter()
                    .map(|item| match item {
                        Value::Object(map) => Ok(Value::Object(inner.dump(map)?)),
                        other => Err(Error::Validation(format!(
                            "field `{}` expects mappings, got {other}",
                            field.name
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(values))
            }
            Value::Object(map) => Ok(Value::Object(inner.dump(map)?)),
            other => Err(Error::Validation(format!(
                "field `{}` expects a mapping, got {other}",
                field.name
            ))),
        }
    }
}

/// Dump policy: null values and empty collections are never emitted.
fn is_trimmed(field: &Field, value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) if field.many => items.is_empty(),
        _ => false,
    }
}

fn coerce(field: &Field, value: &Value) -> Result<FieldValue, Error> {
    if field.many {
        let Value::Array(items) = value else {
            return Err(Error::Validation(format!(
                "field `{}` expects a sequence",
                field.name
            )));
        };
        let coerced = items
            .iter()
            .map(|item| coerce_single(field, item))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(FieldValue::List(coerced));
    }
    coerce_single(field, value)
}

fn coerce_single(field: &Field, value: &Value) -> Result<FieldValue, Error> {
    let type_error = || {
        Error::Validation(format!(
            "field `{}` expects {}, got {value}",
            field.name,
            field.ty.describe()
        ))
    };
    match &field.ty {
        FieldType::String => value
            .as_str()
            .map(|s| FieldValue::Scalar(Value::String(s.to_string())))
            .ok_or_else(type_error),
        FieldType::Integer => value
            .as_i64()
            .map(|n| FieldValue::Scalar(Value::from(n)))
            .ok_or_else(type_error),
        FieldType::Float => value
            .as_f64()
            .map(|n| FieldValue::Scalar(Value::from(n)))
            .ok_or_else(type_error),
        FieldType::Boolean => value
            .as_bool()
            .map(|b| FieldValue::Scalar(Value::Bool(b)))
            .ok_or_else(type_error),
        FieldType::Raw => Ok(FieldValue::Scalar(value.clone())),
        FieldType::Nested(inner) => match value {
            Value::Object(map) => Ok(FieldValue::Record(inner.load(map)?)),
            _ => Err(type_error()),
        },
    }
}
