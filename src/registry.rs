//! Type-keyed converter registry.
//!
//! Registration happens on a [`RegistryBuilder`]; [`RegistryBuilder::build`]
//! freezes it into a [`BindingRegistry`] that is cheap to clone and safe to
//! share between threads. After the freeze the only mutation is
//! memoization: converters produced by deferred registrations or analyzer
//! factories are cached under their exact type key, so each distinct
//! instantiation pays its synthesis cost once.
//!
//! ## Lookup order
//!
//! 1. exact converters (registered or previously memoized)
//! 2. deferred registrations, which receive the frozen registry
//! 3. analyzer factories, in registration order
//!
//! ## Converter contract
//!
//! A reader is called with [`Reader::last`] on the first byte of the value
//! and returns with it on the value's last byte. A writer appends exactly
//! one value.
//!
//! ```rust
//! use jsonbind::{Reader, RegistryBuilder};
//!
//! let registry = RegistryBuilder::new().build();
//! let read = registry.try_find_reader::<Vec<Option<u16>>>().unwrap();
//!
//! let mut reader = Reader::from_slice(b"[1, null, 3]");
//! reader.advance().unwrap();
//! assert_eq!(read(&mut reader).unwrap(), vec![Some(1), None, Some(3)]);
//! ```

use crate::descriptor::{JsonType, Shape, TypeDescriptor, TypeKey};
use crate::error::{Error, Result};
use crate::object::ObjectDescription;
use crate::reader::Reader;
use crate::writer::Writer;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

/// Reads one `T` starting at the reader's current token.
pub type ReadFn<T> = Arc<dyn Fn(&mut Reader<'_>) -> Result<T> + Send + Sync>;
/// Writes one `T`.
pub type WriteFn<T> = Arc<dyn Fn(&mut Writer<'_>, &T) -> Result<()> + Send + Sync>;
/// Reads one `T` into an existing instance.
pub type BindFn<T> = Arc<dyn Fn(&mut Reader<'_>, &mut T) -> Result<()> + Send + Sync>;

/// A reader whose value type has been erased.
#[derive(Clone)]
pub struct ErasedReader {
    key: TypeKey,
    read: Arc<dyn Any + Send + Sync>,
}

impl ErasedReader {
    #[must_use]
    pub fn new<T: 'static>(read: ReadFn<T>) -> Self {
        ErasedReader {
            key: TypeKey::of::<T>(),
            read: Arc::new(read),
        }
    }

    /// Type the reader produces.
    #[must_use]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[must_use]
    pub fn downcast<T: 'static>(&self) -> Option<ReadFn<T>> {
        self.read.downcast_ref::<ReadFn<T>>().cloned()
    }
}

/// A writer whose value type has been erased.
#[derive(Clone)]
pub struct ErasedWriter {
    key: TypeKey,
    write: Arc<dyn Any + Send + Sync>,
}

impl ErasedWriter {
    #[must_use]
    pub fn new<T: 'static>(write: WriteFn<T>) -> Self {
        ErasedWriter {
            key: TypeKey::of::<T>(),
            write: Arc::new(write),
        }
    }

    #[must_use]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[must_use]
    pub fn downcast<T: 'static>(&self) -> Option<WriteFn<T>> {
        self.write.downcast_ref::<WriteFn<T>>().cloned()
    }
}

/// What an analyzer factory is asked to resolve.
pub struct Request<'r, C> {
    descriptor: &'r TypeDescriptor,
    shape: Shape,
    registry: &'r BindingRegistry,
    synthesize: &'r dyn Fn() -> Option<C>,
}

pub type ReaderRequest<'r> = Request<'r, ErasedReader>;
pub type WriterRequest<'r> = Request<'r, ErasedWriter>;

impl<'r, C> Request<'r, C> {
    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        self.descriptor
    }

    /// Raw type name, e.g. `"Vec"` for `Vec<i32>`.
    #[must_use]
    pub fn raw_name(&self) -> &'static str {
        self.descriptor.raw_name()
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub fn registry(&self) -> &BindingRegistry {
        self.registry
    }

    /// Builds a converter from the type's own structural recipe, looking
    /// up element converters in the registry.
    #[must_use]
    pub fn synthesize(&self) -> Option<C> {
        (self.synthesize)()
    }
}

/// Analyzer factory: tried in order when no exact converter exists.
pub type Factory<C> = Arc<dyn Fn(&Request<'_, C>) -> Option<C> + Send + Sync>;
pub type ReaderFactory = Factory<ErasedReader>;
pub type WriterFactory = Factory<ErasedWriter>;

type Deferred<C> = Arc<dyn Fn(&BindingRegistry) -> Option<C> + Send + Sync>;
type AnyArc = Arc<dyn Any + Send + Sync>;

struct Inner {
    readers: DashMap<TypeKey, ErasedReader>,
    writers: DashMap<TypeKey, ErasedWriter>,
    binders: DashMap<TypeKey, AnyArc>,
    deferred_binders: HashMap<TypeKey, Deferred<AnyArc>>,
    deferred_readers: HashMap<TypeKey, Deferred<ErasedReader>>,
    deferred_writers: HashMap<TypeKey, Deferred<ErasedWriter>>,
    reader_factories: Vec<ReaderFactory>,
    writer_factories: Vec<WriterFactory>,
    defaults: HashMap<TypeKey, AnyArc>,
}

/// One side of the registry: readers or writers.
trait Slot: Clone + Send + Sync + 'static {
    const KIND: &'static str;
    fn key(&self) -> TypeKey;
    fn cache(inner: &Inner) -> &DashMap<TypeKey, Self>;
    fn deferred(inner: &Inner) -> &HashMap<TypeKey, Deferred<Self>>;
    fn factories(inner: &Inner) -> &[Factory<Self>];
}

impl Slot for ErasedReader {
    const KIND: &'static str = "reader";
    fn key(&self) -> TypeKey {
        self.key
    }
    fn cache(inner: &Inner) -> &DashMap<TypeKey, Self> {
        &inner.readers
    }
    fn deferred(inner: &Inner) -> &HashMap<TypeKey, Deferred<Self>> {
        &inner.deferred_readers
    }
    fn factories(inner: &Inner) -> &[Factory<Self>] {
        &inner.reader_factories
    }
}

impl Slot for ErasedWriter {
    const KIND: &'static str = "writer";
    fn key(&self) -> TypeKey {
        self.key
    }
    fn cache(inner: &Inner) -> &DashMap<TypeKey, Self> {
        &inner.writers
    }
    fn deferred(inner: &Inner) -> &HashMap<TypeKey, Deferred<Self>> {
        &inner.deferred_writers
    }
    fn factories(inner: &Inner) -> &[Factory<Self>] {
        &inner.writer_factories
    }
}

thread_local! {
    /// Lookups in progress on this thread: (registry, key, kind).
    static RESOLVING: RefCell<Vec<(usize, TypeKey, &'static str)>> = RefCell::new(Vec::new());
}

struct ResolveGuard;

impl ResolveGuard {
    fn enter(registry: usize, key: TypeKey, kind: &'static str) -> Option<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&(registry, key, kind)) {
                tracing::warn!(
                    type_name = key.name(),
                    kind,
                    "converter lookup cycle; use a lazy converter for recursive types"
                );
                return None;
            }
            stack.push((registry, key, kind));
            Some(ResolveGuard)
        })
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Collects registrations before the registry is frozen.
///
/// [`RegistryBuilder::new`] starts with converters for primitives, strings,
/// [`Decimal`](crate::Decimal), [`Value`](crate::Value) and the analyzers
/// for collections, options, maps and boxes. [`RegistryBuilder::empty`]
/// starts with nothing.
pub struct RegistryBuilder {
    readers: HashMap<TypeKey, ErasedReader>,
    writers: HashMap<TypeKey, ErasedWriter>,
    binders: HashMap<TypeKey, AnyArc>,
    deferred_binders: HashMap<TypeKey, Deferred<AnyArc>>,
    deferred_readers: HashMap<TypeKey, Deferred<ErasedReader>>,
    deferred_writers: HashMap<TypeKey, Deferred<ErasedWriter>>,
    reader_factories: Vec<ReaderFactory>,
    writer_factories: Vec<WriterFactory>,
    defaults: HashMap<TypeKey, AnyArc>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Creates a builder preloaded with the built-in converters.
    #[must_use]
    pub fn new() -> Self {
        crate::converters::install(Self::empty())
    }

    /// Creates a builder with no converters at all.
    #[must_use]
    pub fn empty() -> Self {
        RegistryBuilder {
            readers: HashMap::new(),
            writers: HashMap::new(),
            binders: HashMap::new(),
            deferred_binders: HashMap::new(),
            deferred_readers: HashMap::new(),
            deferred_writers: HashMap::new(),
            reader_factories: Vec::new(),
            writer_factories: Vec::new(),
            defaults: HashMap::new(),
        }
    }

    /// Registers the reader for exactly `T`. The last registration wins.
    #[must_use]
    pub fn register_reader<T, F>(self, read: F) -> Self
    where
        T: 'static,
        F: Fn(&mut Reader<'_>) -> Result<T> + Send + Sync + 'static,
    {
        self.register_read_fn::<T>(Arc::new(read))
    }

    #[must_use]
    pub fn register_read_fn<T: 'static>(mut self, read: ReadFn<T>) -> Self {
        let key = TypeKey::of::<T>();
        self.deferred_readers.remove(&key);
        self.readers.insert(key, ErasedReader::new(read));
        self
    }

    /// Registers the writer for exactly `T`. The last registration wins.
    #[must_use]
    pub fn register_writer<T, F>(self, write: F) -> Self
    where
        T: 'static,
        F: Fn(&mut Writer<'_>, &T) -> Result<()> + Send + Sync + 'static,
    {
        self.register_write_fn::<T>(Arc::new(write))
    }

    #[must_use]
    pub fn register_write_fn<T: 'static>(mut self, write: WriteFn<T>) -> Self {
        let key = TypeKey::of::<T>();
        self.deferred_writers.remove(&key);
        self.writers.insert(key, ErasedWriter::new(write));
        self
    }

    /// Registers an in-place reader for `T`, used by
    /// [`BindingRegistry::try_find_binder`].
    #[must_use]
    pub fn register_binder<T, F>(mut self, bind: F) -> Self
    where
        T: 'static,
        F: Fn(&mut Reader<'_>, &mut T) -> Result<()> + Send + Sync + 'static,
    {
        let bind: BindFn<T> = Arc::new(bind);
        let key = TypeKey::of::<T>();
        self.deferred_binders.remove(&key);
        self.binders.insert(key, Arc::new(bind));
        self
    }

    /// Registers an in-place reader built from the frozen registry on first
    /// lookup.
    #[must_use]
    pub fn register_binder_with<T, F>(mut self, build: F) -> Self
    where
        T: 'static,
        F: Fn(&BindingRegistry) -> Option<BindFn<T>> + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        self.binders.remove(&key);
        self.deferred_binders.insert(
            key,
            Arc::new(move |registry: &BindingRegistry| {
                build(registry).map(|bind| Arc::new(bind) as AnyArc)
            }),
        );
        self
    }

    /// Registers a reader for `T` that is built from the frozen registry on
    /// first lookup. `build` may return `None` when a dependency is not
    /// available; the lookup then reports "not found".
    #[must_use]
    pub fn register_reader_with<T, F>(mut self, build: F) -> Self
    where
        T: 'static,
        F: Fn(&BindingRegistry) -> Option<ReadFn<T>> + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        self.readers.remove(&key);
        self.deferred_readers.insert(
            key,
            Arc::new(move |registry: &BindingRegistry| build(registry).map(ErasedReader::new)),
        );
        self
    }

    /// Writer counterpart of [`RegistryBuilder::register_reader_with`].
    #[must_use]
    pub fn register_writer_with<T, F>(mut self, build: F) -> Self
    where
        T: 'static,
        F: Fn(&BindingRegistry) -> Option<WriteFn<T>> + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        self.writers.remove(&key);
        self.deferred_writers.insert(
            key,
            Arc::new(move |registry: &BindingRegistry| build(registry).map(ErasedWriter::new)),
        );
        self
    }

    /// Appends a reader factory to the fallback chain.
    #[must_use]
    pub fn register_reader_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ReaderRequest<'_>) -> Option<ErasedReader> + Send + Sync + 'static,
    {
        self.reader_factories.push(Arc::new(factory));
        self
    }

    /// Appends a writer factory to the fallback chain.
    #[must_use]
    pub fn register_writer_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&WriterRequest<'_>) -> Option<ErasedWriter> + Send + Sync + 'static,
    {
        self.writer_factories.push(Arc::new(factory));
        self
    }

    /// Registers the value substituted for an absent `T`.
    #[must_use]
    pub fn register_default<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.defaults.insert(TypeKey::of::<T>(), Arc::new(value));
        self
    }

    /// Binds `T` through its `serde` implementations, streaming through the
    /// reader and writer without an intermediate tree.
    #[must_use]
    pub fn register_serde<T>(self) -> Self
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
    {
        self.register_reader::<T, _>(|reader| {
            let mut de = crate::de::Deserializer::new(reader);
            T::deserialize(&mut de)
        })
        .register_writer::<T, _>(|writer, value| {
            let mut ser = crate::ser::Serializer::new(writer);
            value.serialize(&mut ser)
        })
    }

    /// Registers reader, writer and binder produced by an object description.
    #[must_use]
    pub fn register_object<T>(self, description: ObjectDescription<T>) -> Self
    where
        T: Default + Send + Sync + 'static,
    {
        description.install(self)
    }

    /// Freezes the registrations into a shareable registry.
    #[must_use]
    pub fn build(self) -> BindingRegistry {
        tracing::debug!(
            readers = self.readers.len(),
            writers = self.writers.len(),
            deferred = self.deferred_readers.len() + self.deferred_writers.len(),
            factories = self.reader_factories.len() + self.writer_factories.len(),
            "binding registry frozen"
        );
        BindingRegistry {
            inner: Arc::new(Inner {
                readers: self.readers.into_iter().collect(),
                writers: self.writers.into_iter().collect(),
                binders: self.binders.into_iter().collect(),
                deferred_binders: self.deferred_binders,
                deferred_readers: self.deferred_readers,
                deferred_writers: self.deferred_writers,
                reader_factories: self.reader_factories,
                writer_factories: self.writer_factories,
                defaults: self.defaults,
            }),
        }
    }
}

/// Frozen, shareable converter registry.
#[derive(Clone)]
pub struct BindingRegistry {
    inner: Arc<Inner>,
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("readers", &self.inner.readers.len())
            .field("writers", &self.inner.writers.len())
            .field("reader_factories", &self.inner.reader_factories.len())
            .field("writer_factories", &self.inner.writer_factories.len())
            .finish()
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        RegistryBuilder::new().build()
    }
}

impl BindingRegistry {
    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn resolve<C: Slot>(
        &self,
        key: TypeKey,
        descriptor: &dyn Fn() -> TypeDescriptor,
        shape: Shape,
        synthesize: &dyn Fn() -> Option<C>,
    ) -> Option<C> {
        let cache = C::cache(&self.inner);
        if let Some(found) = cache.get(&key) {
            return Some(found.clone());
        }
        let _guard = ResolveGuard::enter(self.id(), key, C::KIND)?;

        if let Some(build) = C::deferred(&self.inner).get(&key) {
            let built = build(self)?;
            if built.key() != key {
                tracing::warn!(type_name = key.name(), kind = C::KIND, "deferred converter has the wrong type");
                return None;
            }
            tracing::debug!(type_name = key.name(), kind = C::KIND, "resolved deferred converter");
            return Some(cache.entry(key).or_insert(built).clone());
        }

        let descriptor = descriptor();
        let request = Request {
            descriptor: &descriptor,
            shape,
            registry: self,
            synthesize,
        };
        for factory in C::factories(&self.inner) {
            let Some(made) = factory(&request) else {
                continue;
            };
            if made.key() != key {
                tracing::warn!(
                    descriptor = %descriptor,
                    produced = made.key().name(),
                    kind = C::KIND,
                    "factory returned a converter for a different type"
                );
                continue;
            }
            tracing::debug!(descriptor = %descriptor, kind = C::KIND, "factory synthesized converter");
            return Some(cache.entry(key).or_insert(made).clone());
        }
        None
    }

    /// Finds the reader for `T`, consulting deferred registrations and the
    /// factory chain on a miss. Successful resolutions are cached.
    #[must_use]
    pub fn try_find_reader<T: JsonType>(&self) -> Option<ReadFn<T>> {
        let structure = T::structure();
        let erased = self.resolve::<ErasedReader>(
            TypeKey::of::<T>(),
            &T::descriptor,
            structure.shape(),
            &|| structure.build_reader(self).map(ErasedReader::new),
        )?;
        erased.downcast::<T>()
    }

    /// Finds the writer for `T`; see [`BindingRegistry::try_find_reader`].
    #[must_use]
    pub fn try_find_writer<T: JsonType>(&self) -> Option<WriteFn<T>> {
        let structure = T::structure();
        let erased = self.resolve::<ErasedWriter>(
            TypeKey::of::<T>(),
            &T::descriptor,
            structure.shape(),
            &|| structure.build_writer(self).map(ErasedWriter::new),
        )?;
        erased.downcast::<T>()
    }

    /// Like [`BindingRegistry::try_find_reader`] but fails with
    /// [`Error::NoConverterFound`].
    pub fn find_reader<T: JsonType>(&self) -> Result<ReadFn<T>> {
        self.try_find_reader::<T>()
            .ok_or_else(|| Error::no_converter(format!("reader for {}", T::descriptor())))
    }

    pub fn find_writer<T: JsonType>(&self) -> Result<WriteFn<T>> {
        self.try_find_writer::<T>()
            .ok_or_else(|| Error::no_converter(format!("writer for {}", T::descriptor())))
    }

    /// Erased reader lookup by descriptor. Factories are consulted but cannot
    /// use [`Request::synthesize`], since no static recipe is available.
    #[must_use]
    pub fn reader_for(&self, descriptor: &TypeDescriptor) -> Option<ErasedReader> {
        self.resolve::<ErasedReader>(descriptor.key(), &|| descriptor.clone(), Shape::Opaque, &|| None)
    }

    #[must_use]
    pub fn writer_for(&self, descriptor: &TypeDescriptor) -> Option<ErasedWriter> {
        self.resolve::<ErasedWriter>(descriptor.key(), &|| descriptor.clone(), Shape::Opaque, &|| None)
    }

    /// Finds an in-place reader for `T`. Without a registered binder, one
    /// is derived from the reader that replaces the target wholesale.
    #[must_use]
    pub fn try_find_binder<T: JsonType>(&self) -> Option<BindFn<T>> {
        let key = TypeKey::of::<T>();
        if let Some(found) = self.inner.binders.get(&key) {
            return found.downcast_ref::<BindFn<T>>().cloned();
        }
        if let Some(build) = self.inner.deferred_binders.get(&key) {
            let _guard = ResolveGuard::enter(self.id(), key, "binder")?;
            let built = build(self)?;
            let bind = built.downcast_ref::<BindFn<T>>().cloned()?;
            tracing::debug!(type_name = key.name(), kind = "binder", "resolved deferred converter");
            self.inner.binders.entry(key).or_insert(built);
            return Some(bind);
        }
        let read = self.try_find_reader::<T>()?;
        Some(Arc::new(move |reader: &mut Reader<'_>, target: &mut T| {
            *target = read(reader)?;
            Ok(())
        }))
    }

    /// The value registered for an absent `T`, if any.
    #[must_use]
    pub fn default_value<T: Clone + 'static>(&self) -> Option<T> {
        self.inner
            .defaults
            .get(&TypeKey::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Whether a converter for `T` is already cached.
    #[must_use]
    pub fn is_cached<T: 'static>(&self) -> bool {
        self.inner.readers.contains_key(&TypeKey::of::<T>())
            || self.inner.writers.contains_key(&TypeKey::of::<T>())
    }

    /// Non-owning handle, for converters stored inside the registry.
    #[must_use]
    pub fn downgrade(&self) -> WeakRegistry {
        WeakRegistry(Arc::downgrade(&self.inner))
    }
}

/// Weak handle to a [`BindingRegistry`].
#[derive(Clone)]
pub struct WeakRegistry(Weak<Inner>);

impl WeakRegistry {
    #[must_use]
    pub fn upgrade(&self) -> Option<BindingRegistry> {
        self.0.upgrade().map(|inner| BindingRegistry { inner })
    }
}

impl fmt::Debug for WeakRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakRegistry")
    }
}

fn dropped_registry() -> Error {
    Error::custom("binding registry was dropped")
}

/// Reader for `T` resolved on first use.
///
/// Lets converters refer to types that are registered later or that
/// contain themselves.
pub struct LazyReader<T> {
    registry: WeakRegistry,
    cell: OnceCell<ReadFn<T>>,
}

impl<T: JsonType> LazyReader<T> {
    #[must_use]
    pub fn new(registry: &BindingRegistry) -> Self {
        LazyReader {
            registry: registry.downgrade(),
            cell: OnceCell::new(),
        }
    }

    fn get(&self) -> Result<&ReadFn<T>> {
        self.cell.get_or_try_init(|| {
            self.registry
                .upgrade()
                .ok_or_else(dropped_registry)?
                .find_reader::<T>()
        })
    }

    pub fn read(&self, reader: &mut Reader<'_>) -> Result<T> {
        (self.get()?)(reader)
    }
}

/// Writer for `T` resolved on first use.
pub struct LazyWriter<T> {
    registry: WeakRegistry,
    cell: OnceCell<WriteFn<T>>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: JsonType> LazyWriter<T> {
    #[must_use]
    pub fn new(registry: &BindingRegistry) -> Self {
        LazyWriter {
            registry: registry.downgrade(),
            cell: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    fn get(&self) -> Result<&WriteFn<T>> {
        self.cell.get_or_try_init(|| {
            self.registry
                .upgrade()
                .ok_or_else(dropped_registry)?
                .find_writer::<T>()
        })
    }

    pub fn write(&self, writer: &mut Writer<'_>, value: &T) -> Result<()> {
        (self.get()?)(writer, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Meters(u32);
    impl JsonType for Meters {}

    #[test]
    fn last_registration_wins() {
        let registry = RegistryBuilder::empty()
            .register_reader::<Meters, _>(|_| Ok(Meters(1)))
            .register_reader::<Meters, _>(|_| Ok(Meters(2)))
            .build();
        let read = registry.try_find_reader::<Meters>().unwrap();
        let mut reader = Reader::from_slice(b"0");
        reader.advance().unwrap();
        assert_eq!(read(&mut reader).unwrap(), Meters(2));
    }

    #[test]
    fn factories_run_in_order_and_are_memoized() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let (f, s) = (first.clone(), second.clone());
        let registry = RegistryBuilder::empty()
            .register_reader_factory(move |req| {
                f.fetch_add(1, Ordering::SeqCst);
                req.descriptor()
                    .is::<Meters>()
                    .then(|| ErasedReader::new::<Meters>(Arc::new(|_| Ok(Meters(7)))))
            })
            .register_reader_factory(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
                None
            })
            .build();
        assert!(registry.try_find_reader::<Meters>().is_some());
        assert!(registry.try_find_reader::<Meters>().is_some());
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert!(registry.is_cached::<Meters>());
    }

    #[test]
    fn wrong_typed_factory_results_are_ignored() {
        let registry = RegistryBuilder::empty()
            .register_reader_factory(|_| Some(ErasedReader::new::<u8>(Arc::new(|_| Ok(0)))))
            .build();
        assert!(registry.try_find_reader::<Meters>().is_none());
    }

    #[test]
    fn deferred_registration_sees_frozen_registry() {
        let registry = RegistryBuilder::empty()
            .register_reader_with::<Meters, _>(|registry| {
                let inner = registry.try_find_reader::<u32>()?;
                let read: ReadFn<Meters> =
                    Arc::new(move |r: &mut Reader<'_>| -> Result<Meters> { Ok(Meters(inner(r)?)) });
                Some(read)
            })
            .register_reader::<u32, _>(|r| r.read_int())
            .build();
        let read = registry.try_find_reader::<Meters>().unwrap();
        let mut reader = Reader::from_slice(b"12");
        reader.advance().unwrap();
        assert_eq!(read(&mut reader).unwrap(), Meters(12));
    }

    #[test]
    fn deferred_cycles_report_not_found() {
        let registry = RegistryBuilder::empty()
            .register_reader_with::<Meters, _>(|registry| {
                registry.try_find_reader::<Meters>()
            })
            .build();
        assert!(registry.try_find_reader::<Meters>().is_none());
    }

    #[test]
    fn defaults_and_binders() {
        let registry = RegistryBuilder::new()
            .register_default::<String>("n/a".to_string())
            .build();
        assert_eq!(registry.default_value::<String>().as_deref(), Some("n/a"));
        assert_eq!(registry.default_value::<u8>(), None);

        let bind = registry.try_find_binder::<Vec<u8>>().unwrap();
        let mut target = vec![9];
        let mut reader = Reader::from_slice(b"[1,2]");
        reader.advance().unwrap();
        bind(&mut reader, &mut target).unwrap();
        assert_eq!(target, vec![1, 2]);
    }

    #[test]
    fn lazy_reader_fails_cleanly_without_converter() {
        let registry = RegistryBuilder::empty().build();
        let lazy = LazyReader::<Meters>::new(&registry);
        let mut reader = Reader::from_slice(b"1");
        reader.advance().unwrap();
        assert_eq!(
            lazy.read(&mut reader).unwrap_err().kind(),
            crate::ErrorKind::NoConverterFound
        );
    }
}
