// Sat Jan 17 2026 - Alex

use crate::format::{FormatRef, IntoFormat};
use std::marker::PhantomData;

/// A format paired with the host type its values convert to.
pub struct Typed<T> {
    format: FormatRef,
    _marker: PhantomData<fn() -> T>,
}

pub fn with_type<T>(format: impl IntoFormat) -> Typed<T> {
    Typed {
        format: format.into_format(),
        _marker: PhantomData,
    }
}

impl<T> Typed<T> {
    pub fn format(&self) -> &FormatRef {
        &self.format
    }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        Self {
            format: self.format.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> IntoFormat for &Typed<T> {
    fn into_format(self) -> FormatRef {
        self.format.clone()
    }
}
