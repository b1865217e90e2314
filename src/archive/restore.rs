// Mon Jan 19 2026 - Alex

use crate::archive::writer::is_identifier;
use crate::archive::ArchiveError;
use crate::format::{Format, FormatRef, Primitive, StructFormat};
use crate::layout::{
    align_to, is_aligned, ArrayLayout, ComposedLayout, Layout, LayoutRef, MemberLayout, NamedLayout, OptionalKind,
    OptionalLayout, StructLayout, Traits, VariantLayout, VectorKind, VectorLayout,
};
use crate::value::Value;
use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use serde_json::{Map, Value as Json};
use std::sync::Arc;

/// Declarations of an archive, in source order, plus the exported root.
#[derive(Debug)]
pub struct ArchiveSource {
    pub declarations: IndexMap<String, Json>,
    pub export: Json,
}

/// Reads `const NAME = <json>;` lines and the final `export default <json>;`.
pub fn parse(text: &str) -> Result<ArchiveSource, ArchiveError> {
    let mut parser = Parser { text, pos: 0 };
    let mut declarations = IndexMap::new();
    loop {
        parser.skip_trivia();
        if parser.at_end() {
            return Err(parser.error("missing `export default`"));
        }
        let keyword = parser.word();
        match keyword {
            "const" => {
                parser.skip_trivia();
                let line = parser.line();
                let name = parser.word();
                if !is_identifier(name) {
                    return Err(ArchiveError::Syntax {
                        line,
                        message: format!("expected a declaration name, found `{}`", name),
                    });
                }
                parser.expect('=')?;
                let body = parser.json()?;
                parser.expect(';')?;
                if declarations.insert(name.to_string(), body).is_some() {
                    return Err(ArchiveError::DuplicateDeclaration(name.to_string()));
                }
            }
            "export" => {
                parser.skip_trivia();
                if parser.word() != "default" {
                    return Err(parser.error("expected `default` after `export`"));
                }
                let export = parser.json()?;
                parser.expect(';')?;
                parser.skip_trivia();
                if !parser.at_end() {
                    return Err(parser.error("unexpected text after `export default`"));
                }
                return Ok(ArchiveSource { declarations, export });
            }
            other => return Err(parser.error(&format!("unexpected `{}`", other))),
        }
    }
}

struct Parser<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Parser<'t> {
    fn rest(&self) -> &'t str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn line(&self) -> usize {
        self.text[..self.pos].matches('\n').count() + 1
    }

    fn error(&self, message: &str) -> ArchiveError {
        ArchiveError::Syntax {
            line: self.line(),
            message: message.to_string(),
        }
    }

    /// Whitespace and `//` line comments.
    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if !trimmed.starts_with("//") {
                return;
            }
            self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
        }
    }

    fn word(&mut self) -> &'t str {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn expect(&mut self, token: char) -> Result<(), ArchiveError> {
        self.skip_trivia();
        if self.rest().starts_with(token) {
            self.pos += token.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected `{}`", token)))
        }
    }

    fn json(&mut self) -> Result<Json, ArchiveError> {
        self.skip_trivia();
        let mut stream = serde_json::Deserializer::from_str(self.rest()).into_iter::<Json>();
        match stream.next() {
            Some(Ok(value)) => {
                self.pos += stream.byte_offset();
                Ok(value)
            }
            Some(Err(err)) => Err(ArchiveError::Syntax {
                line: self.line() + err.line().saturating_sub(1),
                message: err.to_string(),
            }),
            None => Err(self.error("expected a JSON value")),
        }
    }
}

/// Rebuilds layouts from parsed declarations, reattaching interceptors from a template format.
pub struct Restorer<'s> {
    source: &'s ArchiveSource,
    named: AHashMap<String, LayoutRef>,
    binding: AHashSet<String>,
    shared: AHashMap<String, LayoutRef>,
    detached: bool,
}

fn unresolved(path: &str, reason: impl Into<String>) -> ArchiveError {
    ArchiveError::Unresolved {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn malformed(path: &str, reason: impl Into<String>) -> ArchiveError {
    ArchiveError::Malformed {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn field<'j>(object: &'j Map<String, Json>, key: &str, path: &str) -> Result<&'j Json, ArchiveError> {
    object
        .get(key)
        .ok_or_else(|| malformed(path, format!("missing `{}`", key)))
}

fn number(object: &Map<String, Json>, key: &str, path: &str) -> Result<usize, ArchiveError> {
    field(object, key, path)?
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| malformed(path, format!("`{}` is not a number", key)))
}

fn flag(object: &Map<String, Json>, key: &str, path: &str) -> Result<bool, ArchiveError> {
    field(object, key, path)?
        .as_bool()
        .ok_or_else(|| malformed(path, format!("`{}` is not a boolean", key)))
}

/// Archived struct traits must be packable: a power-of-two alignment and, when present, the
/// stride that alignment implies.
fn check_traits(traits: Traits, path: &str) -> Result<(), ArchiveError> {
    if !traits.align.is_power_of_two() {
        return Err(malformed(path, format!("alignment {} is not a power of two", traits.align)));
    }
    match traits.stride {
        Some(stride) if stride != align_to(traits.size, traits.align) => Err(malformed(
            path,
            format!("stride {} does not match size {}", stride, traits.size),
        )),
        _ => Ok(()),
    }
}

/// Members, sorted by offset, must sit after the base, aligned, without overlapping and inside
/// the struct.
fn check_members(
    members: &[MemberLayout],
    base: Option<&LayoutRef>,
    traits: Traits,
    path: &str,
) -> Result<(), ArchiveError> {
    let mut end = base.filter(|b| !b.is_pending()).map_or(0, |b| b.traits().size);
    for member in members {
        let member_path = format!("{}.{}", path, member.name);
        if member.offset < end {
            return Err(malformed(&member_path, format!("offset {} overlaps the previous slot", member.offset)));
        }
        // A named layout still being restored has no traits yet.
        let slot = if member.pointer || !member.layout.is_pending() {
            member.slot_traits()
        } else {
            Traits::new(1, 0, None)
        };
        if slot.align > traits.align || !is_aligned(member.offset, slot.align) {
            return Err(malformed(&member_path, format!("offset {} is misaligned", member.offset)));
        }
        end = member.offset + slot.size;
    }
    if end > traits.size {
        return Err(malformed(path, format!("members end at {} past size {}", end, traits.size)));
    }
    Ok(())
}

impl<'s> Restorer<'s> {
    pub fn new(source: &'s ArchiveSource, detached: bool) -> Self {
        let named = source
            .declarations
            .iter()
            .filter_map(|(name, body)| body.get("named").map(|_| name))
            .map(|name| (name.clone(), Arc::new(Layout::Named(NamedLayout::new(name)))))
            .collect();
        Self {
            source,
            named,
            binding: AHashSet::new(),
            shared: AHashMap::new(),
            detached,
        }
    }

    pub fn restore_root(&mut self, template: Option<&FormatRef>) -> Result<LayoutRef, ArchiveError> {
        let export = &self.source.export;
        self.node(export, template, "$")
    }

    /// Drops template wrappers the archive does not have at this position.
    fn align_template<'f>(&self, json: &Json, template: Option<&'f FormatRef>) -> Option<&'f FormatRef> {
        let mut template = template?;
        let archived_named = json
            .get("ref")
            .and_then(Json::as_str)
            .map_or(false, |name| self.named.contains_key(name))
            || json.get("named").is_some();
        let archived_composed = json.get("composed").is_some();
        loop {
            match template.as_ref() {
                Format::Named(named) if !archived_named => match named.target() {
                    Some(target) => template = target,
                    None => return Some(template),
                },
                Format::Composed { base, .. } if !archived_named && !archived_composed => template = base,
                _ => return Some(template),
            }
        }
    }

    fn node(&mut self, json: &Json, template: Option<&FormatRef>, path: &str) -> Result<LayoutRef, ArchiveError> {
        let template = self.align_template(json, template);
        match json {
            Json::String(name) => {
                let primitive: Primitive = name
                    .parse()
                    .map_err(|_| malformed(path, format!("unknown primitive `{}`", name)))?;
                if let Some(format) = template {
                    match format.as_ref() {
                        Format::Primitive(expected) if *expected == primitive => {}
                        other => {
                            return Err(unresolved(
                                path,
                                format!("archived {} but the template has {}", primitive, describe_format(other)),
                            ))
                        }
                    }
                }
                Ok(Arc::new(Layout::Primitive(primitive)))
            }
            Json::Object(object) => {
                if let Some(reference) = object.get("ref") {
                    let name = reference
                        .as_str()
                        .ok_or_else(|| malformed(path, "`ref` is not a string"))?;
                    return self.reference(name, template, path);
                }
                self.structure(object, template, path)
            }
            _ => Err(malformed(path, "expected a string or an object")),
        }
    }

    fn reference(&mut self, name: &str, template: Option<&FormatRef>, path: &str) -> Result<LayoutRef, ArchiveError> {
        let body = self
            .source
            .declarations
            .get(name)
            .ok_or_else(|| ArchiveError::UnknownDeclaration(name.to_string()))?;

        if let Some(node) = self.named.get(name).cloned() {
            let target = match template.map(|t| t.as_ref()) {
                Some(Format::Named(named)) => {
                    if named.name() != name {
                        return Err(unresolved(
                            path,
                            format!("archived named layout {} but the template names {}", name, named.name()),
                        ));
                    }
                    named.target()
                }
                _ => template,
            };
            let bound = matches!(node.as_ref(), Layout::Named(n) if n.is_bound());
            if !bound && self.binding.insert(name.to_string()) {
                let object = body
                    .as_object()
                    .ok_or_else(|| malformed(name, "declaration is not an object"))?;
                let inner = self.node(field(object, "layout", name)?, target, name)?;
                if let Layout::Named(named) = node.as_ref() {
                    named.bind(inner)?;
                }
            }
            return Ok(node);
        }

        if let Some(layout) = self.shared.get(name) {
            return Ok(layout.clone());
        }
        let layout = self.node(body, template, name)?;
        self.shared.insert(name.to_string(), layout.clone());
        Ok(layout)
    }

    fn element_template<'f>(
        template: Option<&'f FormatRef>,
        kind: &'static str,
        path: &str,
    ) -> Result<Option<&'f FormatRef>, ArchiveError> {
        let Some(format) = template else {
            return Ok(None);
        };
        let element = match (kind, format.as_ref()) {
            ("array", Format::Array { element, .. }) => element,
            ("vector", Format::Vector(element)) => element,
            ("optional", Format::Optional(element)) => element,
            (_, other) => {
                return Err(unresolved(
                    path,
                    format!("archived {} but the template has {}", kind, describe_format(other)),
                ))
            }
        };
        Ok(Some(element))
    }

    fn structure(
        &mut self,
        object: &Map<String, Json>,
        template: Option<&FormatRef>,
        path: &str,
    ) -> Result<LayoutRef, ArchiveError> {
        if let Some(inner) = object.get("named") {
            let name = inner.as_str().ok_or_else(|| malformed(path, "`named` is not a string"))?;
            return self.reference(name, template, path);
        }
        if let Some(element) = object.get("array") {
            let element_template = Self::element_template(template, "array", path)?;
            let element = self.node(element, element_template, &format!("{}[]", path))?;
            let length = number(object, "length", path)?;
            return Ok(Arc::new(Layout::Array(ArrayLayout { length, element })));
        }
        if let Some(element) = object.get("vector") {
            let element_template = Self::element_template(template, "vector", path)?;
            let element = self.node(element, element_template, &format!("{}[]", path))?;
            let stride = number(object, "stride", path)?;
            let expected = if element.is_pending() { None } else { element.traits().stride };
            if expected != Some(stride) {
                return Err(malformed(path, format!("stride {} does not match the element", stride)));
            }
            return Ok(Arc::new(Layout::Vector(VectorLayout {
                kind: VectorKind::Dense { stride },
                element,
            })));
        }
        if let Some(element) = object.get("list") {
            let element_template = Self::element_template(template, "vector", path)?;
            let element = self.node(element, element_template, &format!("{}[]", path))?;
            return Ok(Arc::new(Layout::Vector(VectorLayout {
                kind: VectorKind::List,
                element,
            })));
        }
        if let Some(element) = object.get("optional") {
            let element_template = Self::element_template(template, "optional", path)?;
            let element = self.node(element, element_template, &format!("{}?", path))?;
            let kind = if flag(object, "pointer", path)? {
                OptionalKind::Pointer
            } else {
                OptionalKind::Inline {
                    marker: element.traits().size,
                }
            };
            return Ok(Arc::new(Layout::Optional(OptionalLayout { kind, element })));
        }
        if let Some(values) = object.get("enum") {
            let values = values
                .as_array()
                .ok_or_else(|| malformed(path, "`enum` is not an array"))?
                .iter()
                .map(Value::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            self.expect_kind(template, "enum", path)?;
            return Ok(Arc::new(Layout::Enum(values)));
        }
        if let Some(value) = object.get("constant") {
            self.expect_kind(template, "constant", path)?;
            return Ok(Arc::new(Layout::Constant(Value::from_json(value)?)));
        }
        if let Some(shape) = object.get("struct") {
            let shape = shape
                .as_object()
                .ok_or_else(|| malformed(path, "`struct` is not an object"))?;
            let traits = object
                .get("traits")
                .and_then(Json::as_object)
                .ok_or_else(|| malformed(path, "missing `traits`"))?;
            return self.struct_layout(shape, traits, template, path);
        }
        if let Some(arms) = object.get("variant") {
            let arms = arms
                .as_array()
                .ok_or_else(|| malformed(path, "`variant` is not an array"))?;
            let arm_templates = match template.map(|t| t.as_ref()) {
                None => None,
                Some(Format::Variant(formats)) if formats.len() == arms.len() => Some(formats),
                Some(other) => {
                    return Err(unresolved(
                        path,
                        format!("archived variant of {} arms but the template has {}", arms.len(), describe_format(other)),
                    ))
                }
            };
            let mut layouts = Vec::with_capacity(arms.len());
            for (index, arm) in arms.iter().enumerate() {
                let arm_template = arm_templates.map(|formats| &formats[index]);
                layouts.push(self.node(arm, arm_template, &format!("{}#{}", path, index))?);
            }
            return Ok(Arc::new(Layout::Variant(VariantLayout { arms: layouts })));
        }
        if let Some(inner) = object.get("composed") {
            let label = object.get("interceptor").and_then(Json::as_str);
            let (base, interceptor) = match template.map(|t| t.as_ref()) {
                Some(Format::Composed { base, interceptor }) => {
                    if let Some(label) = label.filter(|l| *l != interceptor.label()) {
                        return Err(unresolved(
                            path,
                            format!("archived interceptor {} but the template has {}", label, interceptor.label()),
                        ));
                    }
                    (Some(base), Some(interceptor.clone()))
                }
                None if self.detached => (None, None),
                _ => return Err(unresolved(path, "the template has no interceptor here")),
            };
            let layout = self.node(inner, base, path)?;
            return Ok(Arc::new(Layout::Composed(ComposedLayout { layout, interceptor })));
        }
        Err(malformed(path, "unrecognized layout node"))
    }

    fn expect_kind(&self, template: Option<&FormatRef>, kind: &'static str, path: &str) -> Result<(), ArchiveError> {
        match template {
            Some(format) if format.kind() != kind => Err(unresolved(
                path,
                format!("archived {} but the template has {}", kind, describe_format(format)),
            )),
            _ => Ok(()),
        }
    }

    fn struct_layout(
        &mut self,
        shape: &Map<String, Json>,
        traits: &Map<String, Json>,
        template: Option<&FormatRef>,
        path: &str,
    ) -> Result<LayoutRef, ArchiveError> {
        let format: Option<&StructFormat> = match template.map(|t| t.as_ref()) {
            None => None,
            Some(Format::Struct(format)) => Some(format),
            Some(other) => {
                return Err(unresolved(
                    path,
                    format!("archived struct but the template has {}", describe_format(other)),
                ))
            }
        };

        let base = match shape.get("base") {
            Some(base) => {
                let base_template = match format {
                    Some(format) => Some(
                        format
                            .base
                            .as_ref()
                            .ok_or_else(|| unresolved(path, "the template struct has no base"))?,
                    ),
                    None => None,
                };
                Some(self.node(base, base_template, &format!("{}^", path))?)
            }
            None => None,
        };

        let members_json = shape
            .get("members")
            .and_then(Json::as_object)
            .ok_or_else(|| malformed(path, "missing `members`"))?;
        let mut members = Vec::with_capacity(members_json.len());
        for (name, member) in members_json {
            let member_path = format!("{}.{}", path, name);
            let member = member
                .as_object()
                .ok_or_else(|| malformed(&member_path, "member is not an object"))?;
            let member_template = match format {
                Some(format) => Some(
                    format
                        .fields
                        .iter()
                        .find(|(field, _)| field == name)
                        .map(|(_, field)| field)
                        .ok_or_else(|| unresolved(&member_path, "the template struct has no such member"))?,
                ),
                None => None,
            };
            members.push(MemberLayout {
                name: name.clone(),
                offset: number(member, "offset", &member_path)?,
                pointer: flag(member, "pointer", &member_path)?,
                layout: self.node(field(member, "layout", &member_path)?, member_template, &member_path)?,
            });
        }
        members.sort_by(|a, b| a.offset.cmp(&b.offset).then_with(|| a.name.cmp(&b.name)));

        let stride = traits.get("stride").and_then(Json::as_u64).map(|s| s as usize);
        let traits = Traits::new(number(traits, "align", path)?, number(traits, "size", path)?, stride);
        check_traits(traits, path)?;
        check_members(&members, base.as_ref(), traits, path)?;
        Ok(Arc::new(Layout::Struct(StructLayout {
            base,
            members,
            tag: shape.get("tag").and_then(Json::as_str).map(str::to_string),
            traits,
        })))
    }
}

fn describe_format(format: &Format) -> String {
    match format {
        Format::Primitive(primitive) => primitive.to_string(),
        Format::Named(named) => format!("named {}", named.name()),
        Format::Composed { interceptor, .. } => format!("composed {}", interceptor.label()),
        other => other.kind().to_string(),
    }
}

