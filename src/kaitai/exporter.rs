// Tue Jan 20 2026 - Alex

use crate::config::KaitaiConfig;
use crate::format::Primitive;
use crate::kaitai::ExportError;
use crate::layout::{
    ArrayLayout, Layout, LayoutRef, NamedLayout, OptionalKind, OptionalLayout, StructLayout, VariantLayout,
    VectorKind, VectorLayout, POINTER_WIDTH,
};
use crate::value::Value;
use ahash::{AHashMap, AHashSet};
use serde_json::Value as Json;
use std::sync::Arc;

/// Every generated type reads relative to this parameter, the absolute position of its slot.
const OFFSET_PARAM: &str = "ofs";

/// Lowercase identifier usable as a Kaitai id.
pub fn snake_case(name: &str) -> String {
    let mut out = String::new();
    let mut boundary = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            boundary = false;
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
            boundary = true;
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            boundary = false;
        }
    }
    let out = out.trim_end_matches('_');
    match out.chars().next() {
        None => "unnamed".to_string(),
        Some(c) if !c.is_ascii_lowercase() => format!("n_{}", out),
        Some(_) => out.to_string(),
    }
}

fn claim(taken: &mut AHashSet<String>, candidate: String) -> String {
    if taken.insert(candidate.clone()) {
        return candidate;
    }
    let mut suffix = 2;
    loop {
        let name = format!("{}_{}", candidate, suffix);
        if taken.insert(name.clone()) {
            return name;
        }
        suffix += 1;
    }
}

fn at(base: &str, offset: usize) -> String {
    match (base, offset) {
        (_, 0) => base.to_string(),
        ("0", _) => offset.to_string(),
        _ => format!("{} + {}", base, offset),
    }
}

fn builtin(primitive: Primitive) -> Option<&'static str> {
    Some(match primitive {
        Primitive::Int8 => "s1",
        Primitive::Int16 => "s2",
        Primitive::Int32 => "s4",
        Primitive::Uint8 | Primitive::Bool => "u1",
        Primitive::Uint16 => "u2",
        Primitive::Uint32 => "u4",
        Primitive::Double => "f8",
        Primitive::String | Primitive::Buffer => return None,
    })
}

fn literal(value: &Value) -> Result<String, ExportError> {
    match value {
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Float(f) if f.is_finite() => Ok(f.to_string()),
        Value::String(s) if !s.contains(['\'', '"', '\\']) => Ok(format!("\"'{}'\"", s)),
        other => Err(ExportError::UnsupportedConstant(format!("{:?}", other))),
    }
}

/// What a slot reads as: a Kaitai builtin, or a generated type taking the slot position.
#[derive(Debug, Clone)]
enum FieldType {
    Builtin {
        name: &'static str,
        enumeration: Option<String>,
    },
    User(String),
}

impl FieldType {
    fn name(&self) -> &str {
        match self {
            Self::Builtin { name, .. } => name,
            Self::User(name) => name,
        }
    }

    /// Distinguishes helper types: an enum field is a `u1` that still needs its own helper.
    fn label(&self) -> &str {
        self.enumeration().unwrap_or_else(|| self.name())
    }

    fn at(&self, position: &str) -> String {
        match self {
            Self::Builtin { name, .. } => name.to_string(),
            Self::User(name) => format!("{}({})", name, position),
        }
    }

    fn enumeration(&self) -> Option<&str> {
        match self {
            Self::Builtin { enumeration, .. } => enumeration.as_deref(),
            Self::User(_) => None,
        }
    }
}

/// One instance inside a generated type.
struct Entry {
    id: String,
    attrs: Vec<(&'static str, String)>,
}

impl Entry {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            attrs: Vec::new(),
        }
    }

    fn attr(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((key, value.into()));
        self
    }

    fn field(id: &str, field: &FieldType, position: &str) -> Self {
        let entry = Self::new(id).attr("pos", position).attr("type", field.at(position));
        match field.enumeration() {
            Some(name) => entry.attr("enum", name),
            None => entry,
        }
    }

    fn render(&self, out: &mut String, indent: usize) {
        let pad = " ".repeat(indent);
        out.push_str(&format!("{}{}:\n", pad, self.id));
        for (key, value) in &self.attrs {
            if value.contains('\n') {
                out.push_str(&format!("{}  {}:\n", pad, key));
                for line in value.lines() {
                    out.push_str(&format!("{}    {}\n", pad, line));
                }
            } else {
                out.push_str(&format!("{}  {}: {}\n", pad, key, value));
            }
        }
    }
}

fn type_block(name: &str, doc: Option<&str>, entries: &[Entry]) -> String {
    let mut block = String::new();
    block.push_str(&format!("  {}:\n", name));
    if let Some(doc) = doc {
        block.push_str(&format!("    doc: {}\n", Json::String(doc.to_string())));
    }
    block.push_str("    params:\n");
    block.push_str(&format!("      - id: {}\n", OFFSET_PARAM));
    block.push_str("        type: u4\n");
    if !entries.is_empty() {
        block.push_str("    instances:\n");
        for entry in entries {
            entry.render(&mut block, 6);
        }
    }
    block
}

/// Cross-compiles a layout graph into a Kaitai Struct declaration.
pub struct KaitaiExporter<'a> {
    config: &'a KaitaiConfig,
    /// Layout address to generated type name, for structs, variants, enums and named layouts.
    names: AHashMap<usize, String>,
    /// Helper key (kind plus element) to generated type name.
    helpers: AHashMap<String, String>,
    taken: AHashSet<String>,
    types: Vec<String>,
    enums: Vec<(String, Vec<String>)>,
    anonymous: usize,
}

impl<'a> KaitaiExporter<'a> {
    pub fn new(config: &'a KaitaiConfig) -> Self {
        Self {
            config,
            names: AHashMap::new(),
            helpers: AHashMap::new(),
            taken: AHashSet::new(),
            types: Vec::new(),
            enums: Vec::new(),
            anonymous: 0,
        }
    }

    pub fn export(mut self, root: &LayoutRef, version: u32) -> Result<String, ExportError> {
        let field = self.field_type(root)?;

        let mut out = String::new();
        out.push_str("meta:\n");
        out.push_str(&format!("  id: {}\n", snake_case(&self.config.id)));
        if let Some(title) = &self.config.title {
            out.push_str(&format!("  title: {}\n", Json::String(title.clone())));
        }
        out.push_str("  endian: le\n");
        out.push_str(&format!("doc: Layout version {}\n", version));
        out.push_str("seq:\n");
        out.push_str("  - id: root\n");
        out.push_str(&format!("    type: {}\n", field.at("0")));
        if let Some(name) = field.enumeration() {
            out.push_str(&format!("    enum: {}\n", name));
        }
        if !self.types.is_empty() {
            out.push_str("types:\n");
            for block in &self.types {
                out.push_str(block);
            }
        }
        if !self.enums.is_empty() {
            out.push_str("enums:\n");
            for (name, values) in &self.enums {
                out.push_str(&format!("  {}:\n", name));
                for (index, value) in values.iter().enumerate() {
                    out.push_str(&format!("    {}: {}\n", index, value));
                }
            }
        }
        log::debug!("Exported Kaitai declaration with {} types", self.types.len());
        Ok(out)
    }

    fn next_anonymous(&mut self, prefix: &str) -> String {
        self.anonymous += 1;
        claim(&mut self.taken, format!("{}_{}", prefix, self.anonymous))
    }

    /// Type of a slot holding `layout`, generating any types it needs.
    fn field_type(&mut self, layout: &LayoutRef) -> Result<FieldType, ExportError> {
        let address = Arc::as_ptr(layout) as usize;
        if let Some(name) = self.names.get(&address) {
            return Ok(match layout.as_ref() {
                Layout::Enum(_) => FieldType::Builtin {
                    name: "u1",
                    enumeration: Some(name.clone()),
                },
                _ => FieldType::User(name.clone()),
            });
        }

        match layout.as_ref() {
            Layout::Primitive(primitive) => Ok(match builtin(*primitive) {
                Some(name) => FieldType::Builtin { name, enumeration: None },
                None => FieldType::User(self.pointer_pair(*primitive)?),
            }),
            Layout::Composed(composed) => self.field_type(&composed.layout),
            Layout::Named(named) => self.named_type(address, named),
            Layout::Struct(body) => {
                let candidate = match &body.tag {
                    Some(tag) => claim(&mut self.taken, snake_case(tag)),
                    None => self.next_anonymous("struct"),
                };
                self.names.insert(address, candidate.clone());
                let block = self.struct_block(&candidate, body)?;
                self.types.push(block);
                Ok(FieldType::User(candidate))
            }
            Layout::Variant(variant) => {
                let name = self.next_anonymous("variant");
                self.names.insert(address, name.clone());
                let block = self.variant_block(&name, variant)?;
                self.types.push(block);
                Ok(FieldType::User(name))
            }
            Layout::Enum(values) => {
                let name = self.next_anonymous("enum");
                self.names.insert(address, name.clone());
                let mut labels = AHashSet::new();
                let values = values
                    .iter()
                    .enumerate()
                    .map(|(index, value)| match value {
                        Value::String(s) => claim(&mut labels, snake_case(s)),
                        _ => claim(&mut labels, format!("value_{}", index)),
                    })
                    .collect();
                self.enums.push((name.clone(), values));
                Ok(FieldType::Builtin {
                    name: "u1",
                    enumeration: Some(name),
                })
            }
            Layout::Array(array) => self.array_type(array),
            Layout::Vector(vector) => self.vector_type(vector),
            Layout::Optional(optional) => self.optional_type(optional),
            Layout::Constant(value) => {
                let value = literal(value)?;
                let key = format!("constant:{}", value);
                if let Some(name) = self.helpers.get(&key) {
                    return Ok(FieldType::User(name.clone()));
                }
                let name = self.next_anonymous("constant");
                self.helpers.insert(key, name.clone());
                let entries = [Entry::new("value").attr("value", value)];
                self.types.push(type_block(&name, None, &entries));
                Ok(FieldType::User(name))
            }
        }
    }

    /// Instance for a slot at `position`. Arrays repeat in place and constants become value instances.
    fn entry(&mut self, id: &str, layout: &LayoutRef, position: &str) -> Result<Entry, ExportError> {
        match layout.as_ref() {
            Layout::Constant(value) => Ok(Entry::new(id).attr("value", literal(value)?)),
            Layout::Array(array) => self.array_entry(id, array, position),
            Layout::Composed(composed) => self.entry(id, &composed.layout, position),
            _ => {
                let field = self.field_type(layout)?;
                Ok(Entry::field(id, &field, position))
            }
        }
    }

    fn helper<F>(&mut self, key: String, candidate: String, build: F) -> Result<String, ExportError>
    where
        F: FnOnce(&mut Self, &str) -> Result<String, ExportError>,
    {
        if let Some(name) = self.helpers.get(&key) {
            return Ok(name.clone());
        }
        let name = claim(&mut self.taken, candidate);
        self.helpers.insert(key, name.clone());
        let block = build(self, &name)?;
        self.types.push(block);
        Ok(name)
    }

    /// String and buffer slots: a length word and an absolute data offset.
    fn pointer_pair(&mut self, primitive: Primitive) -> Result<String, ExportError> {
        let string = primitive == Primitive::String;
        let candidate = if string { "schema_string" } else { "schema_buffer" };
        self.helper(primitive.name().to_string(), candidate.to_string(), |_, name| {
            let entries = if string {
                vec![
                    Entry::new("length").attr("pos", OFFSET_PARAM).attr("type", "s4"),
                    Entry::new("data").attr("pos", at(OFFSET_PARAM, 4)).attr("type", "u4"),
                    Entry::new("narrow")
                        .attr("pos", "data")
                        .attr("size", "length")
                        .attr("type", "str")
                        .attr("encoding", "ISO-8859-1")
                        .attr("if", "length >= 0"),
                    Entry::new("wide")
                        .attr("pos", "data")
                        .attr("size", "-length * 2")
                        .attr("type", "str")
                        .attr("encoding", "UTF-16LE")
                        .attr("if", "length < 0"),
                ]
            } else {
                vec![
                    Entry::new("length").attr("pos", OFFSET_PARAM).attr("type", "u4"),
                    Entry::new("data").attr("pos", at(OFFSET_PARAM, 4)).attr("type", "u4"),
                    Entry::new("bytes").attr("pos", "data").attr("size", "length"),
                ]
            };
            Ok(type_block(name, None, &entries))
        })
    }

    fn named_type(&mut self, address: usize, named: &NamedLayout) -> Result<FieldType, ExportError> {
        let target = named
            .target()
            .ok_or_else(|| ExportError::Unbound(named.name().to_string()))?;
        let name = claim(&mut self.taken, snake_case(named.name()));
        self.names.insert(address, name.clone());
        let body = match target.as_ref() {
            Layout::Composed(composed) => &composed.layout,
            _ => target,
        };
        let block = match body.as_ref() {
            Layout::Struct(body_struct) => {
                self.names.insert(Arc::as_ptr(body) as usize, name.clone());
                self.struct_block(&name, body_struct)?
            }
            _ => {
                let entry = self.entry("value", target, OFFSET_PARAM)?;
                type_block(&name, Some(named.name()), &[entry])
            }
        };
        self.types.push(block);
        Ok(FieldType::User(name))
    }

    fn struct_block(&mut self, name: &str, body: &StructLayout) -> Result<String, ExportError> {
        let mut ids = AHashSet::new();
        ids.insert(OFFSET_PARAM.to_string());
        let mut entries = Vec::with_capacity(body.members.len() + 1);
        if let Some(base) = &body.base {
            let id = claim(&mut ids, "base".to_string());
            entries.push(self.entry(&id, base, OFFSET_PARAM)?);
        }
        for member in &body.members {
            let id = claim(&mut ids, snake_case(&member.name));
            let position = at(OFFSET_PARAM, member.offset);
            if member.pointer {
                let pointer = claim(&mut ids, format!("{}_ofs", id));
                entries.push(Entry::new(&pointer).attr("pos", position).attr("type", "u4"));
                let entry = self.entry(&id, &member.layout, &pointer)?;
                entries.push(entry.attr("if", format!("{} != 0", pointer)));
            } else {
                entries.push(self.entry(&id, &member.layout, &position)?);
            }
        }
        let doc = body.tag.as_ref().map(|tag| format!("tag {}", tag));
        Ok(type_block(name, doc.as_deref(), &entries))
    }

    fn variant_block(&mut self, name: &str, variant: &VariantLayout) -> Result<String, ExportError> {
        let mut cases = String::from("switch-on: arm\ncases:\n");
        for (index, arm) in variant.arms.iter().enumerate() {
            let field = self.field_type(arm)?;
            cases.push_str(&format!("  {}: {}\n", index, field.at("data")));
        }
        let entries = [
            Entry::new("data").attr("pos", OFFSET_PARAM).attr("type", "u4"),
            Entry::new("arm").attr("pos", at(OFFSET_PARAM, POINTER_WIDTH)).attr("type", "u1"),
            Entry::new("value").attr("pos", "data").attr("type", cases),
        ];
        Ok(type_block(name, None, &entries))
    }

    /// `length` elements `stride` apart starting at `position`.
    fn repeat(
        &mut self,
        id: &str,
        element: &LayoutRef,
        position: &str,
        count: &str,
    ) -> Result<Entry, ExportError> {
        let field = self.field_type(element)?;
        let traits = element.traits();
        let stride = traits.stride.unwrap_or(traits.size);
        let ty = match &field {
            FieldType::Builtin { .. } => field.at(position),
            FieldType::User(name) => format!("{}({} + _index * {})", name, position, stride),
        };
        let mut entry = Entry::new(id)
            .attr("pos", position)
            .attr("type", ty)
            .attr("repeat", "expr")
            .attr("repeat-expr", count);
        if let Some(name) = field.enumeration() {
            entry = entry.attr("enum", name);
        }
        Ok(entry)
    }

    fn array_entry(&mut self, id: &str, array: &ArrayLayout, position: &str) -> Result<Entry, ExportError> {
        self.repeat(id, &array.element, position, &array.length.to_string())
    }

    fn array_type(&mut self, array: &ArrayLayout) -> Result<FieldType, ExportError> {
        let element = self.field_type(&array.element)?;
        let key = format!("array:{}:{}", element.label(), array.length);
        let candidate = format!("array_{}_{}", element.label(), array.length);
        let name = self.helper(key, candidate, |this, name| {
            let entry = this.array_entry("items", array, OFFSET_PARAM)?;
            Ok(type_block(name, None, &[entry]))
        })?;
        Ok(FieldType::User(name))
    }

    fn vector_type(&mut self, vector: &VectorLayout) -> Result<FieldType, ExportError> {
        let element = self.field_type(&vector.element)?;
        let name = match vector.kind {
            VectorKind::Dense { stride } => {
                let key = format!("dense:{}:{}", element.label(), stride);
                self.helper(key, format!("dense_{}", element.label()), |this, name| {
                    let items = this.repeat("items", &vector.element, "data", "count")?;
                    let entries = [
                        Entry::new("count").attr("pos", OFFSET_PARAM).attr("type", "u4"),
                        Entry::new("data").attr("pos", at(OFFSET_PARAM, 4)).attr("type", "u4"),
                        items,
                    ];
                    Ok(type_block(name, None, &entries))
                })?
            }
            VectorKind::List => {
                let key = format!("list:{}", element.label());
                let payload = vector.node_payload();
                self.helper(key, format!("list_{}", element.label()), |this, name| {
                    let node = claim(&mut this.taken, format!("list_node_{}", element.label()));
                    let links = [
                        Entry::new("next").attr("pos", OFFSET_PARAM).attr("type", "u4"),
                        Entry::field("value", &element, &at(OFFSET_PARAM, payload)),
                        Entry::new("following")
                            .attr("pos", "next")
                            .attr("type", format!("{}(next)", node))
                            .attr("if", "next != 0"),
                    ];
                    this.types.push(type_block(&node, None, &links));
                    let entries = [
                        Entry::new("head").attr("pos", OFFSET_PARAM).attr("type", "u4"),
                        Entry::new("first")
                            .attr("pos", "head")
                            .attr("type", format!("{}(head)", node))
                            .attr("if", "head != 0"),
                    ];
                    Ok(type_block(name, None, &entries))
                })?
            }
        };
        Ok(FieldType::User(name))
    }

    fn optional_type(&mut self, optional: &OptionalLayout) -> Result<FieldType, ExportError> {
        let element = self.field_type(&optional.element)?;
        let name = match optional.kind {
            OptionalKind::Inline { marker } => {
                let key = format!("optional:{}:{}", element.label(), marker);
                self.helper(key, format!("optional_{}", element.label()), |_, name| {
                    let entries = [
                        Entry::new("present").attr("pos", at(OFFSET_PARAM, marker)).attr("type", "u1"),
                        Entry::field("value", &element, OFFSET_PARAM).attr("if", "present != 0"),
                    ];
                    Ok(type_block(name, None, &entries))
                })?
            }
            OptionalKind::Pointer => {
                let key = format!("optional-pointer:{}", element.label());
                self.helper(key, format!("optional_{}", element.label()), |_, name| {
                    let entries = [
                        Entry::new("target").attr("pos", OFFSET_PARAM).attr("type", "u4"),
                        Entry::field("value", &element, "target").attr("if", "target != 0"),
                    ];
                    Ok(type_block(name, None, &entries))
                })?
            }
        };
        Ok(FieldType::User(name))
    }
}
