// Sun Jan 18 2026 - Alex

use crate::layout::{Layout, LayoutRef};
use ahash::AHashSet;
use std::sync::Arc;

/// Structural equality of two layout graphs: same kinds, traits, member offsets and names.
///
/// Interceptor behavior cannot be compared, so composed nodes only need matching labels when
/// both sides carry one. Cycles through named layouts are assumed equal on re-entry.
pub fn structural_eq(left: &LayoutRef, right: &LayoutRef) -> bool {
    LayoutComparator::default().eq(left, right)
}

#[derive(Default)]
struct LayoutComparator {
    assumed: AHashSet<(usize, usize)>,
}

impl LayoutComparator {
    fn eq(&mut self, left: &LayoutRef, right: &LayoutRef) -> bool {
        if Arc::ptr_eq(left, right) {
            return true;
        }
        if left.traits() != right.traits() {
            return false;
        }
        match (left.as_ref(), right.as_ref()) {
            (Layout::Named(a), Layout::Named(b)) => {
                if a.name() != b.name() {
                    return false;
                }
                let pair = (Arc::as_ptr(left) as usize, Arc::as_ptr(right) as usize);
                if !self.assumed.insert(pair) {
                    return true;
                }
                match (a.target(), b.target()) {
                    (Some(a), Some(b)) => self.eq(a, b),
                    (None, None) => true,
                    _ => false,
                }
            }
            (Layout::Primitive(a), Layout::Primitive(b)) => a == b,
            (Layout::Array(a), Layout::Array(b)) => a.length == b.length && self.eq(&a.element, &b.element),
            (Layout::Vector(a), Layout::Vector(b)) => a.kind == b.kind && self.eq(&a.element, &b.element),
            (Layout::Optional(a), Layout::Optional(b)) => a.kind == b.kind && self.eq(&a.element, &b.element),
            (Layout::Enum(a), Layout::Enum(b)) => a == b,
            (Layout::Constant(a), Layout::Constant(b)) => a == b,
            (Layout::Struct(a), Layout::Struct(b)) => {
                if a.tag != b.tag || a.members.len() != b.members.len() {
                    return false;
                }
                let bases = match (&a.base, &b.base) {
                    (Some(x), Some(y)) => self.eq(x, y),
                    (None, None) => true,
                    _ => false,
                };
                bases
                    && a.members.iter().zip(&b.members).all(|(x, y)| {
                        x.name == y.name && x.offset == y.offset && x.pointer == y.pointer && self.eq(&x.layout, &y.layout)
                    })
            }
            (Layout::Variant(a), Layout::Variant(b)) => {
                a.arms.len() == b.arms.len() && a.arms.iter().zip(&b.arms).all(|(x, y)| self.eq(x, y))
            }
            (Layout::Composed(a), Layout::Composed(b)) => {
                let labels = match (&a.interceptor, &b.interceptor) {
                    (Some(x), Some(y)) => x.label() == y.label(),
                    _ => true,
                };
                labels && self.eq(&a.layout, &b.layout)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{declare, struct_of, vector, Primitive};
    use crate::layout::Resolver;

    #[test]
    fn test_independent_resolutions_are_equal() {
        let build = || declare("Pair", struct_of([("left", Primitive::Int16), ("right", Primitive::Double)]));
        let a = Resolver::new().resolve(&build()).unwrap();
        let b = Resolver::new().resolve(&build()).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(structural_eq(&a, &b));
    }

    #[test]
    fn test_member_change_is_detected() {
        let a = Resolver::new().resolve(&struct_of([("x", Primitive::Int32)])).unwrap();
        let b = Resolver::new().resolve(&struct_of([("x", Primitive::Uint32)])).unwrap();
        let c = Resolver::new().resolve(&vector(Primitive::Int32)).unwrap();
        assert!(!structural_eq(&a, &b));
        assert!(!structural_eq(&a, &c));
    }
}
