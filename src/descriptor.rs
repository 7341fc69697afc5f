//! Type descriptors: the keys of the binding registry.
//!
//! A [`TypeDescriptor`] names a value's shape. It is either an exact type or
//! a parameterized shape such as `Vec` of `i32`, whose raw name and type
//! arguments analyzer factories can inspect. Lookups are keyed by
//! [`TypeKey`], so two descriptors of the same Rust type always hit the same
//! registry entry.
//!
//! Types take part in binding by implementing [`JsonType`]. The
//! [`JsonType::structure`] hook hands analyzer factories pre-built recipes
//! for synthesizing a converter, which is how a `Vec<T>` converter can be
//! produced for any registered `T` without reflection.

use crate::registry::{BindingRegistry, ReadFn, WriteFn};
use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a Rust type, with its name kept for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// What shape of value a descriptor denotes.
///
/// # Examples
///
/// ```rust
/// use jsonbind::{JsonType, TypeDescriptor};
///
/// let descriptor = <Vec<Option<i32>>>::descriptor();
/// assert_eq!(descriptor.raw_name(), "Vec");
/// assert_eq!(descriptor.args()[0].raw_name(), "Option");
/// assert_eq!(descriptor.to_string(), "Vec<Option<i32>>");
/// assert_eq!(i32::descriptor(), TypeDescriptor::exact::<i32>());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// A concrete type looked up as is.
    Exact(TypeKey),
    /// A parameterized shape: raw type name plus its type arguments.
    Generic {
        key: TypeKey,
        raw: &'static str,
        args: Arc<[TypeDescriptor]>,
    },
}

impl TypeDescriptor {
    #[must_use]
    pub fn exact<T: ?Sized + 'static>() -> Self {
        TypeDescriptor::Exact(TypeKey::of::<T>())
    }

    #[must_use]
    pub fn generic<T: ?Sized + 'static>(raw: &'static str, args: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Generic {
            key: TypeKey::of::<T>(),
            raw,
            args: args.into(),
        }
    }

    /// The registry key.
    #[must_use]
    pub fn key(&self) -> TypeKey {
        match self {
            TypeDescriptor::Exact(key) | TypeDescriptor::Generic { key, .. } => *key,
        }
    }

    /// Raw type name: `"Vec"` for `Vec<i32>`, the full name for exact types.
    #[must_use]
    pub fn raw_name(&self) -> &'static str {
        match self {
            TypeDescriptor::Exact(key) => key.name,
            TypeDescriptor::Generic { raw, .. } => raw,
        }
    }

    #[must_use]
    pub fn args(&self) -> &[TypeDescriptor] {
        match self {
            TypeDescriptor::Exact(_) => &[],
            TypeDescriptor::Generic { args, .. } => args,
        }
    }

    #[must_use]
    pub fn is_generic(&self) -> bool {
        matches!(self, TypeDescriptor::Generic { .. })
    }

    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.key().is::<T>()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Exact(key) => f.write_str(key.name),
            TypeDescriptor::Generic { raw, args, .. } => {
                f.write_str(raw)?;
                f.write_str("<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(arg, f)?;
                }
                f.write_str(">")
            }
        }
    }
}

/// Structural category of a type, as seen by analyzer factories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// No structure the built-in analyzers understand.
    Opaque,
    /// Sequence of elements, written as a JSON array.
    Collection,
    /// Nullable wrapper; `null` is absence.
    Optional,
    /// String-keyed map, written as a JSON object.
    Map,
    /// Transparent indirection.
    Boxed,
}

/// Recipe for building a converter for `T` out of registry lookups.
pub type BuildReader<T> = fn(&BindingRegistry) -> Option<ReadFn<T>>;
pub type BuildWriter<T> = fn(&BindingRegistry) -> Option<WriteFn<T>>;

/// A type's shape plus the recipes analyzers use to synthesize converters.
pub struct Structure<T> {
    shape: Shape,
    reader: Option<BuildReader<T>>,
    writer: Option<BuildWriter<T>>,
}

impl<T> Structure<T> {
    #[must_use]
    pub fn opaque() -> Self {
        Structure {
            shape: Shape::Opaque,
            reader: None,
            writer: None,
        }
    }

    #[must_use]
    pub fn new(shape: Shape, reader: BuildReader<T>, writer: BuildWriter<T>) -> Self {
        Structure {
            shape,
            reader: Some(reader),
            writer: Some(writer),
        }
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub(crate) fn build_reader(&self, registry: &BindingRegistry) -> Option<ReadFn<T>> {
        self.reader.and_then(|build| build(registry))
    }

    pub(crate) fn build_writer(&self, registry: &BindingRegistry) -> Option<WriteFn<T>> {
        self.writer.and_then(|build| build(registry))
    }
}

/// A type that can be bound through a [`BindingRegistry`].
///
/// Plain types only need an empty impl and a registered converter:
///
/// ```rust
/// use jsonbind::{JsonType, RegistryBuilder};
///
/// struct Celsius(f64);
/// impl JsonType for Celsius {}
///
/// let registry = RegistryBuilder::new()
///     .register_reader::<Celsius, _>(|r| Ok(Celsius(r.read_f64()?)))
///     .build();
/// assert!(registry.try_find_reader::<Celsius>().is_some());
/// assert!(registry.try_find_reader::<Vec<Celsius>>().is_some());
/// ```
pub trait JsonType: Sized + Send + Sync + 'static {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::exact::<Self>()
    }

    fn structure() -> Structure<Self> {
        Structure::opaque()
    }
}
