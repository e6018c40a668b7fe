//! Optional shared handle to a face collection.

use std::sync::Arc;

use crate::Brep;

/// A possibly-empty shared reference to a face collection.
///
/// Host layers hand these around before geometry is loaded; check
/// [`BrepRef::is_empty`] (or use [`BrepRef::get`]) before use. There is no
/// implicit dereference.
#[derive(Debug)]
pub struct BrepRef<B = Brep>(Option<Arc<B>>);

impl<B> BrepRef<B> {
    /// A handle that refers to nothing.
    pub fn empty() -> Self {
        Self(None)
    }

    /// Take ownership of `brep` behind a new handle.
    pub fn new(brep: B) -> Self {
        Self(Some(Arc::new(brep)))
    }

    /// Wrap an existing shared face collection.
    pub fn from_arc(brep: Arc<B>) -> Self {
        Self(Some(brep))
    }

    /// True if the handle refers to nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the referenced collection.
    pub fn get(&self) -> Option<&B> {
        self.0.as_deref()
    }

    /// A new shared owner of the referenced collection.
    pub fn shared(&self) -> Option<Arc<B>> {
        self.0.clone()
    }
}

impl<B> Default for BrepRef<B> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<B> Clone for BrepRef<B> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<B> From<Arc<B>> for BrepRef<B> {
    fn from(brep: Arc<B>) -> Self {
        Self::from_arc(brep)
    }
}
