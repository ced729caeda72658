//! Copy-on-write edits of cached values, and client-only annotations.
//!
//! # Design
//! A mutator receives a draft that it may edit in place or replace
//! wholesale. The draft is a clone of the current value; when the value is
//! built from `Arc`s (as [`Annotated`] lists are) the clone only copies
//! pointers, and `Arc::make_mut` copies just the parts that are written.
//! Everything the mutator leaves alone stays shared with the original.

use std::sync::Arc;

/// Apply `mutator` to a copy of `current`.
///
/// The mutator edits the draft and returns `None`, or returns
/// `Some(replacement)` to discard the draft. An absent value stays absent
/// and the mutator is not called. `current` itself is never modified.
pub fn update<T, F>(current: Option<&T>, mutator: F) -> Option<T>
where
    T: Clone,
    F: FnOnce(&mut T) -> Option<T>,
{
    let mut draft = current?.clone();
    Some(mutator(&mut draft).unwrap_or(draft))
}

/// [`update`] for shared values. When the result equals the original, the
/// original `Arc` is returned so pointer comparisons still see "unchanged".
pub fn update_shared<T, F>(current: Option<&Arc<T>>, mutator: F) -> Option<Arc<T>>
where
    T: Clone + PartialEq,
    F: FnOnce(&mut T) -> Option<T>,
{
    let current = current?;
    let next = update(Some(current.as_ref()), mutator)?;
    if next == **current {
        Some(Arc::clone(current))
    } else {
        Some(Arc::new(next))
    }
}

/// Presentation-only state attached to a server record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientMeta {
    pub selected: bool,
    pub modified: bool,
    pub is_new: bool,
}

/// A server record plus [`ClientMeta`]. The record sits behind an `Arc`, so
/// copying an `Annotated` (or a list of them) never copies server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotated<T> {
    pub data: Arc<T>,
    pub meta: ClientMeta,
}

impl<T> Annotated<T> {
    pub fn new(data: T) -> Self {
        Self::shared(Arc::new(data))
    }

    pub fn shared(data: Arc<T>) -> Self {
        Self {
            data,
            meta: ClientMeta::default(),
        }
    }

    /// A record created locally and not yet known to the server.
    pub fn new_record(data: T) -> Self {
        Self {
            data: Arc::new(data),
            meta: ClientMeta {
                is_new: true,
                ..ClientMeta::default()
            },
        }
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.meta.selected = selected;
    }
}

impl<T: Clone> Annotated<T> {
    /// Edit the record in place (copying it first if it is shared) and flag
    /// it as modified.
    pub fn edit(&mut self, f: impl FnOnce(&mut T)) {
        f(Arc::make_mut(&mut self.data));
        self.meta.modified = true;
    }
}

/// Wrap every record of a fetched list.
pub fn annotate_all<T>(items: impl IntoIterator<Item = T>) -> Vec<Annotated<T>> {
    items.into_iter().map(Annotated::new).collect()
}
