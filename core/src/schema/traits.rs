//! Smithy trait definitions and associated utilities.
//!
//! Traits provide structured metadata for a [`crate::schema::Schema`] and
//! are the primary mechanism for customizing runtime and serde behavior of
//! shapes. The catalog of well-known traits used by the HTTP binding layer
//! and the signers lives in [`prelude`].
//!
//! Traits on a schema are queried either dynamically by ID
//! ([`crate::schema::Schema::get_trait`]) or downcast to a concrete
//! implementation ([`crate::schema::Schema::get_trait_as`]). Traits with no
//! concrete implementation are represented by [`DynamicTrait`], an inert
//! document-valued holder.

use std::{collections::BTreeMap, fmt::Debug, ops::Deref};

use downcast_rs::{DowncastSync, impl_downcast};

use crate::{Ref, schema::ShapeId, schema::documents::DocumentValue};

mod prelude;
pub use prelude::*;

/// Base trait for all Smithy trait implementations.
///
/// This trait can be downcast into a specific trait implementation:
///
/// ```rust,ignore
/// my_trait.downcast_ref::<SpecificTraitImpl>()
/// ```
pub trait SmithyTrait: DowncastSync {
    /// The ID of the trait as expressed in the Smithy model.
    fn id(&self) -> &ShapeId;

    /// The data stored inside the trait as a document value.
    fn value(&self) -> &DocumentValue;
}
impl_downcast!(sync SmithyTrait);

impl Debug for dyn SmithyTrait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "dyn SmithyTrait {{ id: {:?}, value: {:?} }}",
            self.id(),
            self.value()
        )
    }
}

/// Smithy traits with an ID known at compile time.
///
/// Implementations that do not provide a static ID cannot be downcast into
/// by [`crate::schema::Schema::get_trait_as`].
pub trait StaticTraitId: SmithyTrait {
    /// Static trait ID as found in the Smithy model definition of the trait.
    fn trait_id() -> &'static ShapeId;
}

/// Cheaply-cloneable reference to a dynamic trait object.
#[derive(Debug, Clone)]
#[repr(transparent)]
pub struct TraitRef(Ref<dyn SmithyTrait>);

impl PartialEq for TraitRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id() && self.value() == other.value()
    }
}

impl Deref for TraitRef {
    type Target = dyn SmithyTrait;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl From<Ref<dyn SmithyTrait>> for TraitRef {
    #[inline]
    fn from(value: Ref<dyn SmithyTrait>) -> Self {
        Self(value)
    }
}

impl<T: SmithyTrait> From<T> for TraitRef {
    #[inline]
    fn from(value: T) -> Self {
        Self(Ref::new(value))
    }
}

/// Representation of a trait with no pre-defined Rust implementation.
///
/// Allows user-defined traits with no generated implementation to be read
/// by runtime code via their shape ID. The first time a consumer asks for a
/// known trait class the schema upgrades the holder to the typed trait.
///
/// **NOTE**: Dynamic implementations cannot be downcast into a concrete
/// implementation.
#[derive(Debug, Clone)]
pub struct DynamicTrait {
    id: ShapeId,
    value: DocumentValue,
}

impl DynamicTrait {
    /// Create a new [`SmithyTrait`] with no corresponding concrete implementation.
    pub fn new<I: Into<ShapeId>>(id: I, value: DocumentValue) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

impl SmithyTrait for DynamicTrait {
    fn id(&self) -> &ShapeId {
        &self.id
    }

    fn value(&self) -> &DocumentValue {
        &self.value
    }
}

/// Map used to track the traits applied to a [`crate::schema::Schema`].
#[derive(Clone, Debug, PartialEq, Default)]
pub(crate) struct TraitMap {
    // NOTE: BTreeMap is used here b/c it outperforms HashMap for access and memory usage
    //       when the collection size is small. Schemas typically have very few traits.
    map: BTreeMap<ShapeId, TraitRef>,
}
impl Eq for TraitMap {}

impl TraitMap {
    pub fn new() -> TraitMap {
        TraitMap {
            map: BTreeMap::new(),
        }
    }

    /// Returns true if the map contains a value for the specified trait ID.
    #[must_use]
    #[inline]
    pub fn contains(&self, id: &ShapeId) -> bool {
        self.map.contains_key(id)
    }

    /// Returns true if the map contains a trait of type `T`.
    #[must_use]
    #[inline]
    pub fn contains_type<T: StaticTraitId>(&self) -> bool {
        self.contains(T::trait_id())
    }

    /// Returns a reference to the trait with the given ID, if present.
    #[must_use]
    #[inline]
    pub fn get(&self, id: &ShapeId) -> Option<&TraitRef> {
        self.map.get(id)
    }

    /// Gets a trait as a specific implementation if it exists.
    #[must_use]
    #[inline]
    pub fn get_as<T: SmithyTrait + StaticTraitId>(&self) -> Option<&T> {
        self.get(T::trait_id())
            .and_then(|dyn_trait| dyn_trait.downcast_ref::<T>())
    }

    /// Extends the collection with the contents of another [`TraitMap`].
    pub fn extend(&mut self, trait_map: &TraitMap) {
        self.map.extend(trait_map.map.clone());
    }

    /// Create a new [`TraitMap`] from a list of trait references.
    ///
    /// This method is primarily used for constructing schemas.
    pub(crate) fn of(traits: Vec<TraitRef>) -> Self {
        let mut map: TraitMap = TraitMap::new();
        for smithy_trait in traits {
            map.map.insert(smithy_trait.id().clone(), smithy_trait);
        }
        map
    }
}
