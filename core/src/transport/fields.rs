use thiserror::Error;

use crate::FxIndexMap;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field names must be unique, found repeated name: {0}")]
pub struct DuplicateFieldError(String);

/// Where a field is carried within a transport message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldPosition {
    #[default]
    Header,
    Trailer,
}

/// A name-value pair representing a single field in a request or response.
///
/// Field names are case-insensitive and case variance must be treated as
/// equivalent. Names are normalized for lookup but preserved for accuracy
/// during transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    values: Vec<String>,
    kind: FieldPosition,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            values: Vec::new(),
            kind: FieldPosition::Header,
        }
    }

    pub fn with_values<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Field {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
            kind: FieldPosition::Header,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: FieldPosition) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    #[must_use]
    pub fn position(&self) -> FieldPosition {
        self.kind
    }

    /// Append a value to the field.
    pub fn add(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    /// Overwrite the existing field values.
    pub fn set(&mut self, values: Vec<String>) {
        self.values = values;
    }

    /// Remove all matching values from the field.
    pub fn remove(&mut self, value: &str) {
        self.values.retain(|v| v != value);
    }

    /// Get a delimited string of all values.
    ///
    /// A field with zero values renders as the empty string and a field
    /// with exactly one value renders that value unmodified. Multi-value
    /// fields join values with ", "; any value that contains a comma or a
    /// double quote is surrounded by double quotes, with pre-existing
    /// double quotes and backslashes escaped by a backslash.
    #[must_use]
    pub fn as_string(&self) -> String {
        match self.values.len() {
            0 => String::new(),
            1 => self.values[0].clone(),
            _ => self
                .values
                .iter()
                .map(|v| quote_and_escape_field_value(v))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Get a list of `(name, value)` tuples, one per value.
    #[must_use]
    pub fn as_tuples(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|v| (self.name.clone(), v.clone()))
            .collect()
    }
}

/// Escapes and quotes a single [`Field`] value if necessary.
///
/// See [`Field::as_string`] for the quoting and escaping rules.
#[must_use]
pub fn quote_and_escape_field_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

/// Ordered collection of [`Field`] entries keyed by case-insensitive name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fields {
    entries: FxIndexMap<String, Field>,
}

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from an initial list of fields.
    ///
    /// Duplicate normalized names in the initial list are a construction
    /// error.
    pub fn from_fields<I: IntoIterator<Item = Field>>(
        initial: I,
    ) -> Result<Self, DuplicateFieldError> {
        let mut fields = Fields::new();
        for field in initial {
            let normalized = normalize(&field.name);
            if fields.entries.contains_key(&normalized) {
                return Err(DuplicateFieldError(normalized));
            }
            fields.entries.insert(normalized, field);
        }
        Ok(fields)
    }

    /// Set or replace the entry for the field's name.
    pub fn set_field(&mut self, field: Field) {
        self.entries.insert(normalize(&field.name), field);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.entries.get(&normalize(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.entries.get_mut(&normalize(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.entries.shift_remove(&normalize(name))
    }

    /// Merge the entries of `other` into this collection.
    ///
    /// For every field of `other`: if the normalized name already exists,
    /// the values from `other` are appended; otherwise the field is added.
    /// Insertion order of this collection is preserved and new names are
    /// appended in `other`'s order.
    pub fn extend(&mut self, other: Fields) {
        for (normalized, field) in other.entries {
            match self.entries.get_mut(&normalized) {
                Some(existing) => {
                    for value in field.values {
                        existing.add(value);
                    }
                }
                None => {
                    self.entries.insert(normalized, field);
                }
            }
        }
    }

    /// All fields carried in the given position.
    pub fn get_by_position(&self, kind: FieldPosition) -> impl Iterator<Item = &Field> {
        self.entries.values().filter(move |f| f.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = &'a Field;
    type IntoIter = indexmap::map::Values<'a, String, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_renders_unmodified() {
        let field = Field::with_values("x", ["a,b"]);
        assert_eq!(field.as_string(), "a,b");
    }

    #[test]
    fn multi_value_rendering_quotes_commas() {
        let field = Field::with_values("x", ["a,b", "c"]);
        assert_eq!(field.as_string(), "\"a,b\", c");
    }

    #[test]
    fn multi_value_rendering_escapes_quotes() {
        let field = Field::with_values("x", ["say \"hi\"", "plain"]);
        assert_eq!(field.as_string(), "\"say \\\"hi\\\"\", plain");
    }

    #[test]
    fn duplicate_initial_names_are_rejected() {
        let result = Fields::from_fields([
            Field::with_values("Content-Type", ["application/json"]),
            Field::with_values("content-type", ["text/plain"]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn set_replaces_existing_field() {
        let mut fields = Fields::new();
        fields.set_field(Field::with_values("X-Test", ["a"]));
        fields.set_field(Field::with_values("x-test", ["b"]));
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("X-TEST").unwrap().values(), ["b"]);
    }

    #[test]
    fn extend_appends_values_and_preserves_order() {
        let mut fields = Fields::from_fields([
            Field::with_values("a", ["1"]),
            Field::with_values("b", ["2"]),
        ])
        .unwrap();
        let other = Fields::from_fields([
            Field::with_values("b", ["3"]),
            Field::with_values("c", ["4"]),
        ])
        .unwrap();
        fields.extend(other);

        let names: Vec<&str> = fields.iter().map(Field::name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(fields.get("b").unwrap().values(), ["2", "3"]);
    }

    #[test]
    fn lookup_is_case_insensitive_but_preserves_case() {
        let mut fields = Fields::new();
        fields.set_field(Field::with_values("X-Amz-Date", ["20150830T123600Z"]));
        assert!(fields.contains("x-amz-date"));
        assert_eq!(fields.get("x-AMZ-date").unwrap().name(), "X-Amz-Date");
    }
}
