// Sat Jan 17 2026 - Alex

use crate::format::{Format, FormatRef, Interceptor, StructFormat};
use crate::layout::{
    align_to, ArrayLayout, ComposedLayout, Layout, LayoutError, LayoutRef, MemberLayout, NamedLayout,
    OptionalKind, OptionalLayout, StructLayout, Traits, VariantLayout, VectorKind, VectorLayout, POINTER_WIDTH,
};
use ahash::{AHashMap, AHashSet};
use std::sync::Arc;

const MAX_CHOICES: usize = 256;

/// Optionals whose payload fits in two pointer widths are stored inline.
pub const INLINE_OPTIONAL_LIMIT: usize = POINTER_WIDTH * 2;

fn identity<T>(node: &Arc<T>) -> usize {
    Arc::as_ptr(node) as *const () as usize
}

/// Identities of every format reachable from `root`, following named targets.
fn reachable_from(root: &FormatRef) -> AHashSet<usize> {
    let mut seen = AHashSet::new();
    let mut stack = vec![root.clone()];
    while let Some(format) = stack.pop() {
        if !seen.insert(identity(&format)) {
            continue;
        }
        match format.as_ref() {
            Format::Array { element, .. } | Format::Vector(element) | Format::Optional(element) => {
                stack.push(element.clone())
            }
            Format::Struct(body) => {
                stack.extend(body.base.iter().cloned());
                stack.extend(body.fields.iter().map(|(_, field)| field.clone()));
            }
            Format::Variant(arms) => stack.extend(arms.iter().cloned()),
            Format::Composed { base, .. } => stack.push(base.clone()),
            Format::Named(named) => stack.extend(named.target().cloned()),
            Format::Primitive(_) | Format::Enum(_) | Format::Constant(_) => {}
        }
    }
    seen
}

/// Turns formats into layouts, memoized by format identity.
///
/// A format referenced from several places resolves to one shared layout node. The memo keeps
/// each format alive so its address cannot be reused by another format.
///
/// A reference to a named format that leads back to the referring node closes a cycle. Such a
/// reference is always stored indirectly (pointer member, list vector, pointer optional) and its
/// target is bound after the referring node is complete. The representation of a format
/// therefore never depends on which format was resolved first.
#[derive(Default)]
pub struct Resolver {
    memo: AHashMap<usize, (FormatRef, LayoutRef)>,
    /// Formats reachable from each named format met by the resolve in progress. Forward
    /// declarations can be bound between calls, so this is rebuilt every time.
    reach: AHashMap<usize, AHashSet<usize>>,
    /// Memo entries added by the resolve in progress.
    journal: Vec<usize>,
    /// Named nodes reached through a cycle-closing reference, still waiting for their target.
    deferred: Vec<(FormatRef, LayoutRef)>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    pub fn get(&self, format: &FormatRef) -> Option<&LayoutRef> {
        self.memo.get(&identity(format)).map(|(_, layout)| layout)
    }

    /// Resolves `format`. On failure every layout remembered along the way is forgotten again,
    /// so no partially built named layout stays reachable from the memo.
    pub fn resolve(&mut self, format: &FormatRef) -> Result<LayoutRef, LayoutError> {
        self.reach.clear();
        let result = self.resolve_node(format).and_then(|layout| {
            while let Some((named, node)) = self.deferred.pop() {
                self.bind_named(&named, &node)?;
            }
            Ok(layout)
        });
        let added = std::mem::take(&mut self.journal);
        self.deferred.clear();
        if result.is_err() {
            for key in added {
                self.memo.remove(&key);
            }
        }
        result
    }

    fn resolve_node(&mut self, format: &FormatRef) -> Result<LayoutRef, LayoutError> {
        if let Some(layout) = self.get(format).cloned() {
            // Reached directly this time, so the target is needed now.
            if let Some(index) = self.deferred.iter().position(|(named, _)| Arc::ptr_eq(named, format)) {
                let (named, node) = self.deferred.swap_remove(index);
                self.bind_named(&named, &node)?;
            }
            return Ok(layout);
        }
        let site = identity(format);
        let layout = match format.as_ref() {
            Format::Named(named) => {
                if named.target().is_none() {
                    return Err(LayoutError::Unbound(named.name().to_string()));
                }
                let node = self.placeholder(format, named.name());
                self.bind_named(format, &node)?;
                return Ok(node);
            }
            Format::Primitive(primitive) => Layout::Primitive(*primitive),
            Format::Array { length, element } => self.resolve_array(*length, element)?,
            Format::Vector(element) => self.resolve_vector(site, element)?,
            Format::Optional(element) => self.resolve_optional(site, element)?,
            Format::Enum(values) => {
                if values.is_empty() || values.len() > MAX_CHOICES {
                    return Err(LayoutError::EnumArity(values.len()));
                }
                Layout::Enum(values.clone())
            }
            Format::Constant(value) => Layout::Constant(value.clone()),
            Format::Struct(fields) => Layout::Struct(self.resolve_struct(site, fields)?),
            Format::Variant(arms) => self.resolve_variant(site, arms)?,
            Format::Composed { base, interceptor } => self.resolve_composed(base, interceptor)?,
        };
        Ok(self.remember(format, Arc::new(layout)))
    }

    /// First insertion wins, so a format reached again while resolving itself keeps one identity.
    fn remember(&mut self, format: &FormatRef, layout: LayoutRef) -> LayoutRef {
        let key = identity(format);
        if let Some((_, known)) = self.memo.get(&key) {
            return known.clone();
        }
        self.journal.push(key);
        self.memo.insert(key, (format.clone(), layout.clone()));
        layout
    }

    /// True when `child` is a named format that leads back to the node at `site`.
    fn closes_cycle(&mut self, site: usize, child: &FormatRef) -> bool {
        if !matches!(child.as_ref(), Format::Named(_)) {
            return false;
        }
        self.reach
            .entry(identity(child))
            .or_insert_with(|| reachable_from(child))
            .contains(&site)
    }

    /// Named node registered before its target is resolved, so the target can refer back to it.
    fn placeholder(&mut self, format: &FormatRef, name: &str) -> LayoutRef {
        self.remember(format, Arc::new(Layout::Named(NamedLayout::new(name))))
    }

    fn bind_named(&mut self, format: &FormatRef, node: &LayoutRef) -> Result<(), LayoutError> {
        let (name, target) = match format.as_ref() {
            Format::Named(named) => (named.name(), named.target()),
            _ => return Ok(()),
        };
        let target = target.ok_or_else(|| LayoutError::Unbound(name.to_string()))?;
        let inner = self.resolve_node(target)?;
        if inner.is_pending() {
            return Err(LayoutError::UnboundedRecursion(name.to_string()));
        }
        if let Layout::Named(named) = node.as_ref() {
            named.bind(inner)?;
        }
        log::debug!("Resolved layout {} {}", name, node.traits());
        Ok(())
    }

    /// Resolves a child stored behind an offset. Returns true when the child closes a cycle, in
    /// which case its target may still be unbound.
    fn resolve_indirect(&mut self, site: usize, child: &FormatRef) -> Result<(bool, LayoutRef), LayoutError> {
        if !self.closes_cycle(site, child) {
            return Ok((false, self.resolve_node(child)?));
        }
        if let Some(layout) = self.get(child) {
            return Ok((true, layout.clone()));
        }
        let node = self.placeholder(child, child.name().unwrap_or_default());
        self.deferred.push((child.clone(), node.clone()));
        Ok((true, node))
    }

    /// Resolves a child stored inline. Its size must be known, so it cannot be mid-resolution.
    fn resolve_sized(&mut self, format: &FormatRef) -> Result<LayoutRef, LayoutError> {
        let layout = self.resolve_node(format)?;
        if let Some(name) = layout.name().filter(|_| layout.is_pending()) {
            return Err(LayoutError::UnboundedRecursion(name.to_string()));
        }
        Ok(layout)
    }

    fn resolve_array(&mut self, length: usize, element: &FormatRef) -> Result<Layout, LayoutError> {
        let element = self.resolve_sized(element)?;
        if element.traits().stride.is_none() {
            return Err(LayoutError::UnsupportedArrayElement(describe_kind(&element)));
        }
        Ok(Layout::Array(ArrayLayout { length, element }))
    }

    fn resolve_vector(&mut self, site: usize, element: &FormatRef) -> Result<Layout, LayoutError> {
        let (indirect, element) = self.resolve_indirect(site, element)?;
        let kind = match element.traits().stride {
            Some(stride) if !indirect => VectorKind::Dense { stride },
            _ => VectorKind::List,
        };
        Ok(Layout::Vector(VectorLayout { kind, element }))
    }

    fn resolve_optional(&mut self, site: usize, element: &FormatRef) -> Result<Layout, LayoutError> {
        let (indirect, element) = self.resolve_indirect(site, element)?;
        let size = element.traits().size;
        let kind = if !indirect && size <= INLINE_OPTIONAL_LIMIT {
            OptionalKind::Inline { marker: size }
        } else {
            OptionalKind::Pointer
        };
        Ok(Layout::Optional(OptionalLayout { kind, element }))
    }

    fn resolve_struct(&mut self, site: usize, format: &StructFormat) -> Result<StructLayout, LayoutError> {
        let base = match &format.base {
            Some(base) => {
                let layout = self.resolve_sized(base)?;
                if layout.as_struct().is_none() {
                    return Err(LayoutError::InvalidBase(describe_kind(&layout)));
                }
                Some(layout)
            }
            None => None,
        };
        let base_traits = base.as_ref().map(|b| b.traits());
        let mut seen: AHashSet<String> = base
            .as_deref()
            .and_then(Layout::as_struct)
            .map(|b| b.all_members().iter().map(|m| m.name.clone()).collect())
            .unwrap_or_default();

        let mut members = Vec::with_capacity(format.fields.len());
        for (name, field) in &format.fields {
            if !seen.insert(name.clone()) {
                return Err(LayoutError::DuplicateMember(name.clone()));
            }
            let (pointer, layout) = self.resolve_indirect(site, field)?;
            members.push(MemberLayout {
                name: name.clone(),
                offset: 0,
                pointer,
                layout,
            });
        }

        // Physical order: descending size, ties by ascending name.
        members.sort_by(|a, b| {
            b.slot_traits()
                .size
                .cmp(&a.slot_traits().size)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut offset = base_traits.map_or(0, |t| t.size);
        let mut align = base_traits.map_or(1, |t| t.align);
        let mut fixed = base_traits.map_or(true, |t| t.is_fixed());
        for member in &mut members {
            let slot = member.slot_traits();
            offset = align_to(offset, slot.align);
            member.offset = offset;
            offset += slot.size;
            align = align.max(slot.align);
            fixed &= slot.is_fixed();
        }

        let traits = if fixed {
            Traits::dense(align, offset)
        } else {
            Traits::variable(align, offset)
        };
        Ok(StructLayout {
            base,
            members,
            tag: format.tag.clone(),
            traits,
        })
    }

    fn resolve_variant(&mut self, site: usize, arms: &[FormatRef]) -> Result<Layout, LayoutError> {
        if arms.is_empty() || arms.len() > MAX_CHOICES {
            return Err(LayoutError::VariantArity(arms.len()));
        }
        let mut tags = AHashSet::new();
        let mut layouts = Vec::with_capacity(arms.len());
        for (index, arm) in arms.iter().enumerate() {
            // Checked on the format side: a recursive arm has no bound layout yet.
            let tag = arm.tag().ok_or(LayoutError::UntaggedArm(index))?;
            if !tags.insert(tag.to_string()) {
                return Err(LayoutError::DuplicateTag(tag.to_string()));
            }
            let (_, layout) = self.resolve_indirect(site, arm)?;
            layouts.push(layout);
        }
        Ok(Layout::Variant(VariantLayout { arms: layouts }))
    }

    fn resolve_composed(&mut self, base: &FormatRef, interceptor: &Interceptor) -> Result<Layout, LayoutError> {
        let layout = self.resolve_sized(base)?;
        if let Interceptor::Overlay(class) = interceptor {
            if layout.as_struct().is_none() {
                return Err(LayoutError::OverlayTarget(class.name().to_string()));
            }
        }
        Ok(Layout::Composed(ComposedLayout {
            layout,
            interceptor: Some(interceptor.clone()),
        }))
    }
}

fn describe_kind(layout: &Layout) -> String {
    match layout.name() {
        Some(name) => format!("{} {}", layout.unnamed().kind(), name),
        None => layout.kind().to_string(),
    }
}
