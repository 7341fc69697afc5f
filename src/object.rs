//! Field-by-field binding for struct-like types.
//!
//! An [`ObjectDescription`] lists a type's fields with an accessor pair
//! each. Registering it produces a reader, an in-place binder and a writer.
//! Field converters are looked up lazily after the registry is frozen, so
//! descriptions may refer to each other (or to themselves) in any order.
//!
//! Two encodings are supported:
//!
//! - object format, `{"x":1,"y":2}`, dispatched on the FNV-1a hash of each
//!   key and confirmed by name;
//! - array format, `[1,2]`, positional in declaration order, enabled per
//!   description with [`ObjectDescription::with_array_format`].
//!
//! ```rust
//! use jsonbind::{Engine, JsonType, ObjectDescription, RegistryBuilder};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//! impl JsonType for Point {}
//!
//! let registry = RegistryBuilder::new()
//!     .register_object(
//!         ObjectDescription::<Point>::new("Point")
//!             .mandatory_field("x", |p| &p.x, |p, v| p.x = v)
//!             .field("y", |p| &p.y, |p, v| p.y = v),
//!     )
//!     .build();
//! let engine = Engine::with_registry(registry);
//!
//! let json = br#"{"y":2,"x":1}"#;
//! let point: Point = engine.deserialize_bytes(json, json.len()).unwrap();
//! assert_eq!(point, Point { x: 1, y: 2 });
//! assert_eq!(engine.to_string(&point).unwrap(), r#"{"x":1,"y":2}"#);
//! ```

use crate::descriptor::JsonType;
use crate::error::{Error, Result};
use crate::options::{Options, UnknownFieldPolicy};
use crate::reader::Reader;
use crate::registry::{BindFn, BindingRegistry, LazyReader, LazyWriter, ReadFn, RegistryBuilder, WriteFn};
use crate::text;
use crate::writer::Writer;
use std::fmt;
use std::sync::Arc;

type FieldRead<T> = Box<dyn Fn(&mut Reader<'_>, &mut T) -> Result<()> + Send + Sync>;
type FieldWrite<T> = Box<dyn Fn(&mut Writer<'_>, &T) -> Result<()> + Send + Sync>;
type FieldDefault<T> = Box<dyn Fn(&mut T) + Send + Sync>;
type FieldEncode<T> = Box<dyn Fn(&Options, &T) -> Result<Option<Vec<u8>>> + Send + Sync>;
type MakeField<T> = Box<dyn Fn(&BindingRegistry) -> FieldOps<T> + Send + Sync>;

struct FieldOps<T> {
    read: FieldRead<T>,
    write: FieldWrite<T>,
    /// Encodes the field alone; `None` when it is `null` or its default.
    encode_unless_default: FieldEncode<T>,
    fill_default: Option<FieldDefault<T>>,
}

struct FieldSpec<T> {
    name: &'static str,
    mandatory: bool,
    make: MakeField<T>,
}

/// Declarative description of how `T` maps to a JSON object.
pub struct ObjectDescription<T> {
    type_name: &'static str,
    fields: Vec<FieldSpec<T>>,
    array_format: bool,
}

impl<T> fmt::Debug for ObjectDescription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDescription")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields.iter().map(|f| f.name).collect::<Vec<_>>())
            .field("array_format", &self.array_format)
            .finish()
    }
}

impl<T: Default + Send + Sync + 'static> ObjectDescription<T> {
    /// Starts a description; `type_name` appears in error messages.
    #[must_use]
    pub fn new(type_name: &'static str) -> Self {
        ObjectDescription {
            type_name,
            fields: Vec::new(),
            array_format: false,
        }
    }

    /// Adds an optional field. When it is absent from the input, the
    /// registry default for `F` is applied if one exists; otherwise the
    /// value from `T::default()` stays. That same value counts as the
    /// field's default for [`Options::omit_defaults`].
    #[must_use]
    pub fn field<F, G, S>(self, name: &'static str, get: G, set: S) -> Self
    where
        F: JsonType + Clone,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        S: Fn(&mut T, F) + Send + Sync + 'static,
    {
        self.push_field(name, false, get, set)
    }

    /// Adds a field whose absence fails with [`Error::MissingField`].
    #[must_use]
    pub fn mandatory_field<F, G, S>(self, name: &'static str, get: G, set: S) -> Self
    where
        F: JsonType + Clone,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        S: Fn(&mut T, F) + Send + Sync + 'static,
    {
        self.push_field(name, true, get, set)
    }

    /// Also accept (and allow writing) the positional array format.
    #[must_use]
    pub fn with_array_format(mut self) -> Self {
        self.array_format = true;
        self
    }

    fn push_field<F, G, S>(mut self, name: &'static str, mandatory: bool, get: G, set: S) -> Self
    where
        F: JsonType + Clone,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        S: Fn(&mut T, F) + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let set = Arc::new(set);
        let make = move |registry: &BindingRegistry| {
            let lazy_reader = LazyReader::<F>::new(registry);
            let lazy_writer = Arc::new(LazyWriter::<F>::new(registry));
            let (get, set_read) = (get.clone(), set.clone());
            let registered = registry.default_value::<F>();
            let fill_default = registered.clone().map(|value| {
                let set = set.clone();
                Box::new(move |target: &mut T| set(target, value.clone())) as FieldDefault<T>
            });
            let (get_encode, writer_encode) = (get.clone(), lazy_writer.clone());
            let encode_unless_default = move |options: &Options, source: &T| -> Result<Option<Vec<u8>>> {
                let mut scratch = Writer::with_options(options);
                writer_encode.write(&mut scratch, get_encode(source))?;
                let encoded = scratch.into_inner();
                if encoded == b"null" {
                    return Ok(None);
                }
                let mut scratch = Writer::with_options(options);
                match &registered {
                    Some(value) => writer_encode.write(&mut scratch, value)?,
                    None => writer_encode.write(&mut scratch, get_encode(&T::default()))?,
                }
                Ok((encoded != scratch.into_inner()).then_some(encoded))
            };
            FieldOps {
                read: Box::new(move |reader: &mut Reader<'_>, target: &mut T| -> Result<()> {
                    let value = lazy_reader.read(reader)?;
                    set_read(target, value);
                    Ok(())
                }),
                write: Box::new(move |writer: &mut Writer<'_>, source: &T| -> Result<()> {
                    lazy_writer.write(writer, get(source))
                }),
                encode_unless_default: Box::new(encode_unless_default),
                fill_default,
            }
        };
        self.fields.push(FieldSpec {
            name,
            mandatory,
            make: Box::new(make),
        });
        self
    }

    fn bind(&self, registry: &BindingRegistry) -> Bound<T> {
        Bound {
            type_name: self.type_name,
            array_format: self.array_format,
            fields: self
                .fields
                .iter()
                .map(|spec| {
                    let mut key = Vec::with_capacity(spec.name.len() + 3);
                    text::write_escaped(&mut key, spec.name);
                    key.push(b':');
                    BoundField {
                        name: spec.name,
                        hash: text::name_hash(spec.name.as_bytes()),
                        key,
                        mandatory: spec.mandatory,
                        ops: (spec.make)(registry),
                    }
                })
                .collect(),
        }
    }

    /// Registers reader, binder and writer for `T`.
    pub(crate) fn install(self, builder: RegistryBuilder) -> RegistryBuilder {
        let description = Arc::new(self);
        let (for_reader, for_binder) = (description.clone(), description.clone());
        builder
            .register_reader_with::<T, _>(move |registry| {
                let bound = for_reader.bind(registry);
                let read: ReadFn<T> = Arc::new(move |reader: &mut Reader<'_>| -> Result<T> {
                    let mut value = T::default();
                    bound.read_into(reader, &mut value, true)?;
                    Ok(value)
                });
                Some(read)
            })
            .register_binder_with::<T, _>(move |registry| {
                let bound = for_binder.bind(registry);
                let bind: BindFn<T> = Arc::new(move |reader: &mut Reader<'_>, target: &mut T| {
                    bound.read_into(reader, target, false)
                });
                Some(bind)
            })
            .register_writer_with::<T, _>(move |registry| {
                let bound = description.bind(registry);
                let write: WriteFn<T> =
                    Arc::new(move |writer: &mut Writer<'_>, value: &T| bound.write(writer, value));
                Some(write)
            })
    }
}

struct BoundField<T> {
    name: &'static str,
    hash: u32,
    /// Escaped, quoted name followed by `:`.
    key: Vec<u8>,
    mandatory: bool,
    ops: FieldOps<T>,
}

struct Bound<T> {
    type_name: &'static str,
    array_format: bool,
    fields: Vec<BoundField<T>>,
}

impl<T> Bound<T> {
    /// Reads into `target`. Registered defaults fill absent fields only when
    /// `fill_defaults` is set; binding into an existing value keeps them.
    fn read_into(&self, reader: &mut Reader<'_>, target: &mut T, fill_defaults: bool) -> Result<()> {
        match reader.last() {
            b'{' => self.read_object(reader, target, fill_defaults),
            b'[' if self.array_format && reader.options().allow_array_format => {
                self.read_array(reader, target, fill_defaults)
            }
            _ if self.array_format => Err(reader.unexpected("'{' or '['")),
            _ => Err(reader.unexpected("'{'")),
        }
    }

    fn lookup(&self, hash: u32, reader: &Reader<'_>) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.hash == hash && reader.was_last_name(f.name.as_bytes()))
    }

    fn read_object(&self, reader: &mut Reader<'_>, target: &mut T, fill_defaults: bool) -> Result<()> {
        reader.enter()?;
        let mut seen = vec![false; self.fields.len()];
        if reader.advance()? != b'}' {
            loop {
                if reader.last() != b'"' {
                    return Err(reader.unexpected("field name"));
                }
                let at = reader.position().saturating_sub(1);
                let hash = reader.fill_name()?;
                reader.advance()?;
                match self.lookup(hash, reader) {
                    Some(i) => {
                        (self.fields[i].ops.read)(reader, target)?;
                        seen[i] = true;
                    }
                    None => match reader.options().unknown_fields {
                        UnknownFieldPolicy::Skip => reader.skip_value()?,
                        UnknownFieldPolicy::Fail => {
                            return Err(Error::unknown_field(at, reader.last_name(), self.type_name))
                        }
                    },
                }
                match reader.advance()? {
                    b',' => {
                        reader.advance()?;
                    }
                    b'}' => break,
                    _ => return Err(reader.unexpected("',' or '}'")),
                }
            }
        }
        reader.leave();
        self.complete(&seen, target, reader.position(), fill_defaults)
    }

    fn read_array(&self, reader: &mut Reader<'_>, target: &mut T, fill_defaults: bool) -> Result<()> {
        reader.enter()?;
        let mut seen = vec![false; self.fields.len()];
        if reader.advance()? != b']' {
            let mut index = 0;
            loop {
                let Some(field) = self.fields.get(index) else {
                    return Err(reader.unexpected("']'"));
                };
                (field.ops.read)(reader, target)?;
                seen[index] = true;
                index += 1;
                match reader.advance()? {
                    b',' => {
                        reader.advance()?;
                    }
                    b']' => break,
                    _ => return Err(reader.unexpected("',' or ']'")),
                }
            }
        }
        reader.leave();
        self.complete(&seen, target, reader.position(), fill_defaults)
    }

    /// Fails on absent mandatory fields and applies defaults to the rest.
    fn complete(&self, seen: &[bool], target: &mut T, offset: u64, fill_defaults: bool) -> Result<()> {
        for (field, _) in self.fields.iter().zip(seen).filter(|(_, seen)| !**seen) {
            if field.mandatory {
                return Err(Error::missing_field(offset, field.name, self.type_name));
            }
            if !fill_defaults {
                continue;
            }
            if let Some(fill) = &field.ops.fill_default {
                fill(target);
            }
        }
        Ok(())
    }

    fn write(&self, writer: &mut Writer<'_>, value: &T) -> Result<()> {
        if self.array_format && writer.options().prefer_array_format {
            writer.write_byte(b'[');
            for (i, field) in self.fields.iter().enumerate() {
                if i > 0 {
                    writer.write_byte(b',');
                }
                (field.ops.write)(writer, value)?;
            }
            writer.write_byte(b']');
        } else {
            let omit = writer.options().omit_defaults;
            writer.write_byte(b'{');
            let mut first = true;
            for field in &self.fields {
                // Mandatory fields are always written so the output reads back.
                let encoded = if omit && !field.mandatory {
                    match (field.ops.encode_unless_default)(writer.options(), value)? {
                        Some(encoded) => Some(encoded),
                        None => continue,
                    }
                } else {
                    None
                };
                if !first {
                    writer.write_byte(b',');
                }
                first = false;
                writer.write_raw(&field.key);
                match encoded {
                    Some(encoded) => writer.write_raw(&encoded),
                    None => (field.ops.write)(writer, value)?,
                }
            }
            writer.write_byte(b'}');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::options::Options;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Node {
        value: i32,
        label: Option<String>,
        children: Vec<Node>,
    }
    impl JsonType for Node {}

    fn registry() -> BindingRegistry {
        RegistryBuilder::new()
            .register_object(
                ObjectDescription::<Node>::new("Node")
                    .mandatory_field("value", |n| &n.value, |n, v| n.value = v)
                    .field("label", |n| &n.label, |n, v| n.label = v)
                    .field("children", |n| &n.children, |n, v| n.children = v)
                    .with_array_format(),
            )
            .build()
    }

    fn read_with(registry: &BindingRegistry, options: &Options, json: &str) -> Result<Node> {
        let read = registry.find_reader::<Node>()?;
        let mut reader = Reader::with_options(json.as_bytes(), options);
        reader.advance()?;
        let node = read(&mut reader)?;
        reader.finish()?;
        Ok(node)
    }

    fn write_with(registry: &BindingRegistry, options: &Options, node: &Node) -> String {
        let write = registry.find_writer::<Node>().unwrap();
        let mut writer = Writer::with_options(options);
        write(&mut writer, node).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn recursive_object_format() {
        let registry = registry();
        let options = Options::default();
        let json = r#"{"value":1,"children":[{"value":2,"label":"leaf","children":[]}]}"#;
        let node = read_with(&registry, &options, json).unwrap();
        assert_eq!(node.children[0].label.as_deref(), Some("leaf"));
        assert_eq!(
            write_with(&registry, &options, &node),
            r#"{"value":1,"label":null,"children":[{"value":2,"label":"leaf","children":[]}]}"#
        );
    }

    #[test]
    fn array_format_round_trip() {
        let registry = registry();
        let options = Options::new().with_prefer_array_format(true);
        let node = read_with(&registry, &options, r#"[5,"x",[[6]]]"#).unwrap();
        assert_eq!(node.value, 5);
        assert_eq!(node.children[0].value, 6);
        assert_eq!(write_with(&registry, &options, &node), r#"[5,"x",[[6,null,[]]]]"#);

        let strict = Options::new().with_array_format(false);
        assert_eq!(
            read_with(&registry, &strict, "[5]").unwrap_err().kind(),
            ErrorKind::InvalidToken
        );
        assert_eq!(
            read_with(&registry, &options, "[1,null,[],2]").unwrap_err().kind(),
            ErrorKind::InvalidToken
        );
    }

    #[test]
    fn unknown_and_missing_fields() {
        let registry = registry();
        let lenient = Options::default();
        let node = read_with(&registry, &lenient, r#"{"extra":{"a":[1,2]},"value":3}"#).unwrap();
        assert_eq!(node.value, 3);

        let strict = Options::new().with_unknown_fields(UnknownFieldPolicy::Fail);
        let err = read_with(&registry, &strict, r#"{"value":3,"extra":0}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownField);
        assert_eq!(err.offset(), Some(11));

        let err = read_with(&registry, &lenient, r#"{"label":"x"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
    }

    #[test]
    fn registered_defaults_fill_absent_fields() {
        let registry = RegistryBuilder::new()
            .register_default::<Option<String>>(Some("anonymous".to_string()))
            .register_object(
                ObjectDescription::<Node>::new("Node")
                    .field("value", |n| &n.value, |n, v| n.value = v)
                    .field("label", |n| &n.label, |n, v| n.label = v),
            )
            .build();
        let node = read_with(&registry, &Options::default(), "{}").unwrap();
        assert_eq!(node.label.as_deref(), Some("anonymous"));
    }

    #[test]
    fn binder_updates_in_place() {
        let registry = registry();
        let bind = registry.try_find_binder::<Node>().unwrap();
        let mut node = Node {
            value: 0,
            label: Some("kept".into()),
            children: Vec::new(),
        };
        let mut reader = Reader::from_slice(br#"{"value":9}"#);
        reader.advance().unwrap();
        bind(&mut reader, &mut node).unwrap();
        assert_eq!(node.value, 9);
        assert_eq!(node.label.as_deref(), Some("kept"));
    }

    #[test]
    fn binder_keeps_fields_that_have_registered_defaults() {
        let registry = RegistryBuilder::new()
            .register_default::<Option<String>>(Some("anonymous".to_string()))
            .register_object(
                ObjectDescription::<Node>::new("Node")
                    .field("value", |n| &n.value, |n, v| n.value = v)
                    .field("label", |n| &n.label, |n, v| n.label = v),
            )
            .build();
        let bind = registry.try_find_binder::<Node>().unwrap();
        let mut node = Node {
            value: 1,
            label: Some("kept".into()),
            children: Vec::new(),
        };
        let mut reader = Reader::from_slice(br#"{"value":2}"#);
        reader.advance().unwrap();
        bind(&mut reader, &mut node).unwrap();
        assert_eq!(node.value, 2);
        assert_eq!(node.label.as_deref(), Some("kept"));
    }

    #[test]
    fn omitting_defaults() {
        let registry = registry();
        let options = Options::new().with_omit_defaults(true);
        let node = Node {
            value: 0,
            label: None,
            children: vec![Node {
                value: 4,
                label: Some("leaf".into()),
                children: Vec::new(),
            }],
        };
        assert_eq!(
            write_with(&registry, &options, &node),
            r#"{"value":0,"children":[{"value":4,"label":"leaf"}]}"#
        );
        let back = read_with(&registry, &options, &write_with(&registry, &options, &node)).unwrap();
        assert_eq!(back, node);

        let compact = options.clone().with_prefer_array_format(true);
        assert_eq!(write_with(&registry, &compact, &node), r#"[0,null,[[4,"leaf",[]]]]"#);
    }

    #[test]
    fn omitting_registered_defaults() {
        let registry = RegistryBuilder::new()
            .register_default::<i32>(7)
            .register_object(
                ObjectDescription::<Node>::new("Node")
                    .field("value", |n| &n.value, |n, v| n.value = v)
                    .field("label", |n| &n.label, |n, v| n.label = v),
            )
            .build();
        let options = Options::new().with_omit_defaults(true);
        let mut node = Node::default();
        assert_eq!(write_with(&registry, &options, &node), r#"{"value":0}"#);
        node.value = 7;
        node.label = Some(String::new());
        assert_eq!(write_with(&registry, &options, &node), r#"{"label":""}"#);
    }
}
