//! Field paths and patch operators for JSON documents
//!
//! A [`DocPath`] addresses zero or more nested values. Segments are either
//! object fields or array-element filters that select every element whose
//! `field` equals a given value:
//!
//! ```text
//! steps[number == 2].labels[key == "os"].val
//! ```
//!
//! [`set`] and [`push`] apply to every addressed location and report how many
//! they touched, so callers can branch on "matched nothing".

use serde_json::{Map, Value};
use std::fmt;

/// One step of a [`DocPath`]
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Object field
    Field(String),
    /// Every array element whose `field` equals `equals`
    Match {
        /// Field compared on each element
        field: String,
        /// Value the field must equal
        equals: Value,
    },
}

/// Path into a JSON document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocPath {
    segments: Vec<Segment>,
}

impl DocPath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Descend into an object field
    pub fn field(mut self, name: &str) -> Self {
        self.segments.push(Segment::Field(name.to_string()));
        self
    }

    /// Select array elements whose `field` equals `equals`
    pub fn matching(mut self, field: &str, equals: impl Into<Value>) -> Self {
        self.segments.push(Segment::Match {
            field: field.to_string(),
            equals: equals.into(),
        });
        self
    }

    /// Path segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn split_last_field(&self) -> Option<(&[Segment], &str)> {
        match self.segments.split_last() {
            Some((Segment::Field(name), parent)) => Some((parent, name.as_str())),
            _ => None,
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{}", name)?,
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Match { field, equals } => write!(f, "[{} == {}]", field, equals)?,
            }
        }
        Ok(())
    }
}

/// Collect every value addressed by `path`
pub fn get<'a>(doc: &'a Value, path: &DocPath) -> Vec<&'a Value> {
    let mut found = Vec::new();
    collect(doc, path.segments(), &mut found);
    found
}

/// Number of values addressed by `path`
pub fn count(doc: &Value, path: &DocPath) -> usize {
    get(doc, path).len()
}

/// Set the final field of `path` to `value` at every addressed location
///
/// The path must end in a field. Missing final fields are created; missing
/// intermediate fields match nothing. Returns the number of fields written.
pub fn set(doc: &mut Value, path: &DocPath, value: &Value) -> usize {
    let Some((parent, name)) = path.split_last_field() else {
        return 0;
    };
    visit_mut(doc, parent, &mut |target: &mut Value| match target.as_object_mut() {
        Some(obj) => {
            obj.insert(name.to_string(), value.clone());
            true
        }
        None => false,
    })
}

/// Append `value` to the array at the final field of `path`
///
/// A missing final field is created as an empty array first. Locations where
/// the field holds a non-array are skipped. Returns the number of arrays
/// appended to.
pub fn push(doc: &mut Value, path: &DocPath, value: &Value) -> usize {
    let Some((parent, name)) = path.split_last_field() else {
        return 0;
    };
    visit_mut(doc, parent, &mut |target: &mut Value| {
        let Some(obj) = target.as_object_mut() else {
            return false;
        };
        match obj
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => {
                items.push(value.clone());
                true
            }
            _ => false,
        }
    })
}

/// Build an object value from field/value pairs
pub fn object<const N: usize>(fields: [(&str, Value); N]) -> Value {
    let mut map = Map::with_capacity(N);
    for (name, value) in fields {
        map.insert(name.to_string(), value);
    }
    Value::Object(map)
}

fn collect<'a>(value: &'a Value, segments: &[Segment], found: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };
    match head {
        Segment::Field(name) => {
            if let Some(child) = value.get(name) {
                collect(child, rest, found);
            }
        }
        Segment::Match { field, equals } => {
            if let Some(items) = value.as_array() {
                for item in items.iter().filter(|item| item.get(field) == Some(equals)) {
                    collect(item, rest, found);
                }
            }
        }
    }
}

fn visit_mut(
    value: &mut Value,
    segments: &[Segment],
    f: &mut dyn FnMut(&mut Value) -> bool,
) -> usize {
    let Some((head, rest)) = segments.split_first() else {
        return usize::from(f(value));
    };
    match head {
        Segment::Field(name) => value
            .get_mut(name.as_str())
            .map(|child| visit_mut(child, rest, f))
            .unwrap_or(0),
        Segment::Match { field, equals } => match value.as_array_mut() {
            Some(items) => items
                .iter_mut()
                .filter(|item| item.get(field.as_str()) == Some(&*equals))
                .map(|item| visit_mut(item, rest, f))
                .sum(),
            None => 0,
        },
    }
}
