// Mon Jan 19 2026 - Alex

use crate::archive::{render, ArchiveError};
use crate::config::ArchiveConfig;
use crate::layout::{Layout, LayoutError, LayoutRef, OptionalKind, Traits, VectorKind};
use ahash::{AHashMap, AHashSet};
use serde_json::{json, Map, Value as Json};
use std::sync::Arc;

pub const ARCHIVE_HEADER: &str = "// schema-pack layout archive";
pub const SHARED_PREFIX: &str = "Shared";

fn address(layout: &LayoutRef) -> usize {
    Arc::as_ptr(layout) as usize
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

pub(crate) fn traits_json(traits: Traits) -> Json {
    let mut map = Map::new();
    map.insert("align".to_string(), json!(traits.align));
    map.insert("size".to_string(), json!(traits.size));
    if let Some(stride) = traits.stride {
        map.insert("stride".to_string(), json!(stride));
    }
    Json::Object(map)
}

/// Serializes a layout graph into declarations, dependencies first.
pub struct ArchiveWriter<'a> {
    config: &'a ArchiveConfig,
    references: AHashMap<usize, usize>,
    names: AHashMap<usize, String>,
    taken: AHashMap<String, usize>,
    started: AHashSet<usize>,
    declarations: Vec<(String, Json)>,
    shared: usize,
}

impl<'a> ArchiveWriter<'a> {
    pub fn new(config: &'a ArchiveConfig) -> Self {
        Self {
            config,
            references: AHashMap::new(),
            names: AHashMap::new(),
            taken: AHashMap::new(),
            started: AHashSet::new(),
            declarations: Vec::new(),
            shared: 0,
        }
    }

    pub fn write(mut self, root: &LayoutRef) -> Result<String, ArchiveError> {
        self.count(root)?;
        let export = self.reference(root)?;

        let mut text = String::new();
        if self.config.header {
            text.push_str(ARCHIVE_HEADER);
            text.push('\n');
        }
        for (name, body) in &self.declarations {
            text.push_str(&format!("const {} = {};\n", name, render(body)));
        }
        text.push_str(&format!("export default {};\n", render(&export)));
        log::debug!("Archived layout with {} declarations", self.declarations.len());
        Ok(text)
    }

    /// Counts incoming edges per node and claims the names of named layouts.
    fn count(&mut self, layout: &LayoutRef) -> Result<(), ArchiveError> {
        let seen = self.references.entry(address(layout)).or_insert(0);
        *seen += 1;
        if *seen > 1 {
            return Ok(());
        }
        if let Layout::Named(named) = layout.as_ref() {
            let name = named.name();
            if !is_identifier(name) {
                return Err(ArchiveError::InvalidName(name.to_string()));
            }
            if let Some(owner) = self.taken.insert(name.to_string(), address(layout)) {
                if owner != address(layout) {
                    return Err(ArchiveError::DuplicateDeclaration(name.to_string()));
                }
            }
            self.names.insert(address(layout), name.to_string());
        }
        for child in children(layout) {
            self.count(&child)?;
        }
        Ok(())
    }

    fn is_hoisted(&self, layout: &LayoutRef) -> bool {
        match layout.as_ref() {
            Layout::Named(_) => true,
            Layout::Primitive(_) => false,
            _ => self.config.hoist_shared && self.references.get(&address(layout)).copied().unwrap_or(0) > 1,
        }
    }

    fn declaration_name(&mut self, layout: &LayoutRef) -> String {
        if let Some(name) = self.names.get(&address(layout)) {
            return name.clone();
        }
        let name = loop {
            self.shared += 1;
            let candidate = format!("{}{}", SHARED_PREFIX, self.shared);
            if !self.taken.contains_key(&candidate) {
                break candidate;
            }
        };
        self.taken.insert(name.clone(), address(layout));
        self.names.insert(address(layout), name.clone());
        name
    }

    fn reference(&mut self, layout: &LayoutRef) -> Result<Json, ArchiveError> {
        if !self.is_hoisted(layout) {
            return self.body(layout);
        }
        let name = self.declaration_name(layout);
        if self.started.insert(address(layout)) {
            let body = self.body(layout)?;
            self.declarations.push((name.clone(), body));
        }
        Ok(json!({ "ref": name }))
    }

    fn body(&mut self, layout: &LayoutRef) -> Result<Json, ArchiveError> {
        Ok(match layout.as_ref() {
            Layout::Named(named) => {
                let target = named
                    .target()
                    .ok_or_else(|| LayoutError::Unbound(named.name().to_string()))?;
                json!({ "named": named.name(), "layout": self.reference(target)? })
            }
            Layout::Primitive(primitive) => json!(primitive.name()),
            Layout::Array(array) => json!({ "array": self.reference(&array.element)?, "length": array.length }),
            Layout::Vector(vector) => match vector.kind {
                VectorKind::Dense { stride } => json!({ "vector": self.reference(&vector.element)?, "stride": stride }),
                VectorKind::List => json!({ "list": self.reference(&vector.element)? }),
            },
            Layout::Optional(optional) => json!({
                "optional": self.reference(&optional.element)?,
                "pointer": optional.kind == OptionalKind::Pointer,
            }),
            Layout::Enum(values) => {
                let values = values.iter().map(|v| v.to_json()).collect::<Result<Vec<_>, _>>()?;
                json!({ "enum": values })
            }
            Layout::Constant(value) => json!({ "constant": value.to_json()? }),
            Layout::Struct(body) => {
                let mut shape = Map::new();
                if let Some(base) = &body.base {
                    shape.insert("base".to_string(), self.reference(base)?);
                }
                let mut members = Map::new();
                for member in &body.members {
                    members.insert(
                        member.name.clone(),
                        json!({
                            "layout": self.reference(&member.layout)?,
                            "offset": member.offset,
                            "pointer": member.pointer,
                        }),
                    );
                }
                shape.insert("members".to_string(), Json::Object(members));
                if let Some(tag) = &body.tag {
                    shape.insert("tag".to_string(), json!(tag));
                }
                json!({ "struct": shape, "traits": traits_json(body.traits) })
            }
            Layout::Variant(variant) => {
                let arms = variant
                    .arms
                    .iter()
                    .map(|arm| self.reference(arm))
                    .collect::<Result<Vec<_>, _>>()?;
                json!({ "variant": arms })
            }
            Layout::Composed(composed) => {
                let mut shape = Map::new();
                shape.insert("composed".to_string(), self.reference(&composed.layout)?);
                if let Some(interceptor) = &composed.interceptor {
                    shape.insert("interceptor".to_string(), json!(interceptor.label()));
                }
                Json::Object(shape)
            }
        })
    }
}

/// Direct children of a layout node, in archive order.
fn children(layout: &LayoutRef) -> Vec<LayoutRef> {
    match layout.as_ref() {
        Layout::Named(named) => named.target().cloned().into_iter().collect(),
        Layout::Primitive(_) | Layout::Enum(_) | Layout::Constant(_) => Vec::new(),
        Layout::Array(array) => vec![array.element.clone()],
        Layout::Vector(vector) => vec![vector.element.clone()],
        Layout::Optional(optional) => vec![optional.element.clone()],
        Layout::Struct(body) => body
            .base
            .iter()
            .cloned()
            .chain(body.members.iter().map(|m| m.layout.clone()))
            .collect(),
        Layout::Variant(variant) => variant.arms.clone(),
        Layout::Composed(composed) => vec![composed.layout.clone()],
    }
}
