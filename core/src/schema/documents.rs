//! Smithy document types, representing untyped data from the Smithy data
//! model.
//!
//! Document types are a protocol-agnostic view of untyped data. Protocols
//! should attempt to smooth over protocol incompatibilities with the Smithy
//! data model.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::schema::prelude;
use crate::schema::{Schema, SchemaRef, ShapeType};
use crate::{BigDecimal, BigInt, Bytes, FxIndexMap, SerdeError, Timestamp, lazy_schema, traits};

/// An untyped value tree from the Smithy data model.
#[derive(Clone, PartialEq, Debug, Default)]
pub enum DocumentValue {
    #[default]
    Null,
    Boolean(bool),
    Blob(Bytes),
    String(String),
    Timestamp(Timestamp),
    Number(NumberValue),
    List(Vec<DocumentValue>),
    Map(FxIndexMap<String, DocumentValue>),
}

/// Represents numbers in the Smithy data model.
///
/// Smithy number types include: byte, short, integer, long, float, double,
/// bigInteger, bigDecimal.
///
/// *Note*: `IntEnum` shapes are represented as integers in the Smithy data model.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberValue {
    Integer(NumberInteger),
    Float(NumberFloat),
}

/// Integer numeric types in the Smithy data model.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberInteger {
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    BigInt(BigInt),
}

/// Floating-point numeric types in the Smithy data model.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberFloat {
    Float(f32),
    Double(f64),
    BigDecimal(BigDecimal),
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to convert document to type {0}")]
    DocumentConversion(String),
    #[error(transparent)]
    DocumentSerde(#[from] SerdeError),
}

/// A document value paired with the schema describing it.
///
/// The schema is used when projecting a document onto or from typed shapes
/// and for member lookup in structure-shaped documents. Two documents are
/// equal when their values are equal; the schema is ignored.
#[derive(Clone, Debug)]
pub struct Document {
    pub(crate) schema: SchemaRef,
    pub(crate) value: DocumentValue,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Document {
    pub fn new(schema: SchemaRef, value: DocumentValue) -> Self {
        Document { schema, value }
    }

    /// An untyped document wrapping the given value.
    pub fn untyped(value: DocumentValue) -> Self {
        Document {
            schema: schema_for_value(&value).clone(),
            value,
        }
    }

    /// Get the schema of the document.
    #[must_use]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Get the value of the document.
    #[must_use]
    pub fn value(&self) -> &DocumentValue {
        &self.value
    }

    /// The shape type the document serializes as.
    ///
    /// Member schemas report the type of the member target.
    #[must_use]
    pub fn shape_type(&self) -> ShapeType {
        *self.schema.shape_type()
    }

    /// Get the size of the document.
    ///
    /// **NOTE**: Scalar documents always return a size of 1.
    #[must_use]
    pub fn size(&self) -> usize {
        match &self.value {
            DocumentValue::List(array) => array.len(),
            DocumentValue::Map(map) => map.len(),
            DocumentValue::Null => 0,
            _ => 1,
        }
    }

    /// Get a member of a structure-shaped document.
    ///
    /// The returned document carries the member schema of the parent so
    /// that downstream projections retain fidelity.
    #[must_use]
    pub fn get_member(&self, member_name: &str) -> Option<Document> {
        let DocumentValue::Map(map) = &self.value else {
            return None;
        };
        let value = map.get(member_name)?.clone();
        match self.schema.get_member(member_name) {
            Some(member) => Some(Document::new(member.clone(), value)),
            None => Some(Document::untyped(value)),
        }
    }

    /// Set a member of a structure-shaped document.
    ///
    /// Overwrites the value if the member is already present. Fails if the
    /// document is not map-shaped.
    pub fn set_member(
        &mut self,
        member_name: &str,
        value: DocumentValue,
    ) -> Result<(), DocumentError> {
        let DocumentValue::Map(map) = &mut self.value else {
            return Err(DocumentError::DocumentConversion(
                "cannot set a member on a non-map document".to_string(),
            ));
        };
        map.insert(member_name.to_string(), value);
        Ok(())
    }
}

// AS-ers to borrow the document value as a type if possible
impl Document {
    /// Get the blob value of the document if it is a blob.
    #[must_use]
    pub fn as_blob(&self) -> Option<&Bytes> {
        if let DocumentValue::Blob(b) = &self.value {
            Some(b)
        } else {
            None
        }
    }

    /// Get the boolean value of the document if it is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let &DocumentValue::Boolean(b) = &self.value {
            Some(b)
        } else {
            None
        }
    }

    /// Get the string value of the document if it is a string.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        if let DocumentValue::String(s) = &self.value {
            Some(s)
        } else {
            None
        }
    }

    /// Get the timestamp value of the document if it is a timestamp.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        if let DocumentValue::Timestamp(ts) = &self.value {
            Some(ts)
        } else {
            None
        }
    }

    /// Get the integer value of the document if it can be converted into one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match &self.value {
            DocumentValue::Number(NumberValue::Integer(ni)) => match ni {
                &NumberInteger::Byte(b) => Some(b.into()),
                &NumberInteger::Short(s) => Some(s.into()),
                &NumberInteger::Integer(i) => Some(i),
                &NumberInteger::Long(l) => l.try_into().ok(),
                NumberInteger::BigInt(b) => i32::try_from(b.clone()).ok(),
            },
            _ => None,
        }
    }

    /// Get the long value of the document if it can be converted into one.
    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match &self.value {
            DocumentValue::Number(NumberValue::Integer(ni)) => match ni {
                &NumberInteger::Byte(b) => Some(b.into()),
                &NumberInteger::Short(s) => Some(s.into()),
                &NumberInteger::Integer(i) => Some(i.into()),
                &NumberInteger::Long(l) => Some(l),
                NumberInteger::BigInt(b) => i64::try_from(b.clone()).ok(),
            },
            _ => None,
        }
    }

    /// Get the double value of the document if it can be converted into one.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match &self.value {
            DocumentValue::Number(NumberValue::Float(nf)) => match nf {
                &NumberFloat::Float(f) => Some(f.into()),
                &NumberFloat::Double(d) => Some(d),
                NumberFloat::BigDecimal(_) => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&Vec<DocumentValue>> {
        if let DocumentValue::List(document_list) = &self.value {
            Some(document_list)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&FxIndexMap<String, DocumentValue>> {
        if let DocumentValue::Map(document_map) = &self.value {
            Some(document_map)
        } else {
            None
        }
    }
}

impl DocumentValue {
    pub fn integer(value: i32) -> DocumentValue {
        DocumentValue::Number(NumberValue::Integer(NumberInteger::Integer(value)))
    }

    pub fn long(value: i64) -> DocumentValue {
        DocumentValue::Number(NumberValue::Integer(NumberInteger::Long(value)))
    }

    pub fn double(value: f64) -> DocumentValue {
        DocumentValue::Number(NumberValue::Float(NumberFloat::Double(value)))
    }
}

/// Get the prelude schema matching an untyped value.
fn schema_for_value(value: &DocumentValue) -> &'static SchemaRef {
    match value {
        DocumentValue::Null | DocumentValue::Map(_) => &prelude::DOCUMENT,
        DocumentValue::Boolean(_) => &prelude::BOOLEAN,
        DocumentValue::Blob(_) => &prelude::BLOB,
        DocumentValue::String(_) => &prelude::STRING,
        DocumentValue::Timestamp(_) => &prelude::TIMESTAMP,
        DocumentValue::Number(NumberValue::Integer(ni)) => match ni {
            NumberInteger::Byte(_) => &prelude::BYTE,
            NumberInteger::Short(_) => &prelude::SHORT,
            NumberInteger::Integer(_) => &prelude::INTEGER,
            NumberInteger::Long(_) => &prelude::LONG,
            NumberInteger::BigInt(_) => &prelude::BIG_INTEGER,
        },
        DocumentValue::Number(NumberValue::Float(nf)) => match nf {
            NumberFloat::Float(_) => &prelude::FLOAT,
            NumberFloat::Double(_) => &prelude::DOUBLE,
            NumberFloat::BigDecimal(_) => &prelude::BIG_DECIMAL,
        },
        DocumentValue::List(_) => &LIST_DOCUMENT_SCHEMA,
    }
}


lazy_schema!(
    LIST_DOCUMENT_SCHEMA,
    Schema::list_builder(prelude::DOCUMENT.id().clone(), traits![])
        .put_member("member", &*prelude::DOCUMENT, traits![])
        .build()
);
lazy_schema!(
    MAP_DOCUMENT_SCHEMA,
    Schema::map_builder(prelude::DOCUMENT.id().clone(), traits![])
        .put_member("key", &*prelude::STRING, traits![])
        .put_member("value", &*prelude::DOCUMENT, traits![])
        .build()
);

//////////////////////////////////////////////////////////////////
// Conversions of documents to other types
//////////////////////////////////////////////////////////////////

macro_rules! try_from_integer {
    ($target:ty, $name:literal) => {
        impl TryFrom<Document> for $target {
            type Error = DocumentError;

            fn try_from(value: Document) -> Result<Self, Self::Error> {
                match value.value {
                    DocumentValue::Number(NumberValue::Integer(ni)) => match ni {
                        NumberInteger::Byte(b) => <$target>::try_from(b).ok(),
                        NumberInteger::Short(s) => <$target>::try_from(s).ok(),
                        NumberInteger::Integer(i) => <$target>::try_from(i).ok(),
                        NumberInteger::Long(l) => <$target>::try_from(l).ok(),
                        NumberInteger::BigInt(b) => <$target>::try_from(b).ok(),
                    }
                    .ok_or_else(|| DocumentError::DocumentConversion($name.to_string())),
                    _ => Err(DocumentError::DocumentConversion($name.to_string())),
                }
            }
        }
    };
}

try_from_integer!(i8, "i8");
try_from_integer!(i16, "i16");
try_from_integer!(i32, "i32");
try_from_integer!(i64, "i64");

impl TryFrom<Document> for bool {
    type Error = DocumentError;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        if let DocumentValue::Boolean(b) = value.value {
            Ok(b)
        } else {
            Err(DocumentError::DocumentConversion("boolean".to_string()))
        }
    }
}

impl TryFrom<Document> for String {
    type Error = DocumentError;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        if let DocumentValue::String(s) = value.value {
            Ok(s)
        } else {
            Err(DocumentError::DocumentConversion("string".to_string()))
        }
    }
}

impl TryFrom<Document> for Bytes {
    type Error = DocumentError;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        if let DocumentValue::Blob(b) = value.value {
            Ok(b)
        } else {
            Err(DocumentError::DocumentConversion("blob".to_string()))
        }
    }
}

impl TryFrom<Document> for DateTime<Utc> {
    type Error = DocumentError;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        if let DocumentValue::Timestamp(ts) = value.value {
            Ok(ts)
        } else {
            Err(DocumentError::DocumentConversion("timestamp".to_string()))
        }
    }
}

impl TryFrom<Document> for f32 {
    type Error = DocumentError;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        match value.value {
            DocumentValue::Number(NumberValue::Float(NumberFloat::Float(f))) => Ok(f),
            _ => Err(DocumentError::DocumentConversion("f32".to_string())),
        }
    }
}

impl TryFrom<Document> for f64 {
    type Error = DocumentError;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        match value.value {
            DocumentValue::Number(NumberValue::Float(nf)) => match nf {
                NumberFloat::Float(f) => Ok(f64::from(f)),
                NumberFloat::Double(d) => Ok(d),
                NumberFloat::BigDecimal(_) => {
                    Err(DocumentError::DocumentConversion("f64".to_string()))
                }
            },
            _ => Err(DocumentError::DocumentConversion("f64".to_string())),
        }
    }
}

impl<T: TryFrom<Document, Error = DocumentError>> TryFrom<Document> for Vec<T> {
    type Error = DocumentError;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        let DocumentValue::List(values) = value.value else {
            return Err(DocumentError::DocumentConversion("Vec".to_string()));
        };
        let mut result: Vec<T> = Vec::with_capacity(values.len());
        for doc in values {
            result.push(T::try_from(Document::untyped(doc))?);
        }
        Ok(result)
    }
}

//////////////////////////////////////////////////////////////////
// Conversions INTO Document types
//////////////////////////////////////////////////////////////////

macro_rules! document_from {
    ($source:ty, $schema:ident, $variant:expr) => {
        impl From<$source> for DocumentValue {
            fn from(value: $source) -> Self {
                $variant(value)
            }
        }

        impl From<$source> for Document {
            fn from(value: $source) -> Self {
                Document {
                    schema: prelude::$schema.clone(),
                    value: $variant(value),
                }
            }
        }
    };
}

document_from!(bool, BOOLEAN, DocumentValue::Boolean);
document_from!(Bytes, BLOB, DocumentValue::Blob);
document_from!(Timestamp, TIMESTAMP, DocumentValue::Timestamp);
document_from!(String, STRING, DocumentValue::String);
document_from!(i8, BYTE, |v| DocumentValue::Number(NumberValue::Integer(
    NumberInteger::Byte(v)
)));
document_from!(i16, SHORT, |v| DocumentValue::Number(NumberValue::Integer(
    NumberInteger::Short(v)
)));
document_from!(i32, INTEGER, |v| DocumentValue::Number(
    NumberValue::Integer(NumberInteger::Integer(v))
));
document_from!(i64, LONG, |v| DocumentValue::Number(NumberValue::Integer(
    NumberInteger::Long(v)
)));
document_from!(f32, FLOAT, |v| DocumentValue::Number(NumberValue::Float(
    NumberFloat::Float(v)
)));
document_from!(f64, DOUBLE, |v| DocumentValue::Number(NumberValue::Float(
    NumberFloat::Double(v)
)));
document_from!(BigInt, BIG_INTEGER, |v| DocumentValue::Number(
    NumberValue::Integer(NumberInteger::BigInt(v))
));
document_from!(BigDecimal, BIG_DECIMAL, |v| DocumentValue::Number(
    NumberValue::Float(NumberFloat::BigDecimal(v))
));

impl From<&str> for DocumentValue {
    fn from(value: &str) -> Self {
        DocumentValue::String(value.to_string())
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Document {
            schema: prelude::STRING.clone(),
            value: DocumentValue::String(value.to_string()),
        }
    }
}

impl<T: Into<DocumentValue>> From<Vec<T>> for Document {
    fn from(value: Vec<T>) -> Self {
        let result = value.into_iter().map(Into::into).collect();
        Document {
            schema: LIST_DOCUMENT_SCHEMA.clone(),
            value: DocumentValue::List(result),
        }
    }
}

impl<T: Into<DocumentValue>> From<FxIndexMap<String, T>> for Document {
    fn from(value: FxIndexMap<String, T>) -> Self {
        let mut result = FxIndexMap::default();
        for (key, value) in value {
            result.insert(key, value.into());
        }
        Document {
            schema: MAP_DOCUMENT_SCHEMA.clone(),
            value: DocumentValue::Map(result),
        }
    }
}
