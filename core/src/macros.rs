/// Build a [`Vec`] of trait references from trait implementations.
///
/// This is primarily used to construct [`crate::schema::Schema`]s:
///
/// ```rust,ignore
/// Schema::create_string("com.example#MyString", traits![SensitiveTrait])
/// ```
#[macro_export]
macro_rules! traits {
    () => { vec![] };
    ($($x:expr),+ $(,)?) => (
        vec![$($crate::schema::TraitRef::from($x)),*]
    );
}

/// Declare a lazily-initialized static [`crate::schema::ShapeId`].
#[macro_export]
macro_rules! lazy_shape_id {
    ($id_name:ident, $identifier:literal) => {
        static $id_name: std::sync::LazyLock<$crate::schema::ShapeId> =
            std::sync::LazyLock::new(|| $crate::schema::ShapeId::from($identifier));
    };
}

/// Declare a lazily-initialized static [`crate::schema::SchemaRef`].
#[macro_export]
macro_rules! lazy_schema {
    ($schema_name:ident, $schema:expr) => {
        pub static $schema_name: std::sync::LazyLock<$crate::schema::SchemaRef> =
            std::sync::LazyLock::new(|| $schema);
    };
}
