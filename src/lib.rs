//! An ordered multimap backed by an AVL tree, plus the iCalendar plumbing that fills one with
//! calendar events keyed by their start time.
//!
//! ## AVL multimap
//!
//! A Binary Search Tree is a data structure supporting operations to
//! insert, find, and delete stored records. BSTs are typically defined
//! recursively using the notion of a `Node`. Each `Node` here stores a key,
//! every value that was inserted under that key, and sometimes child `Node`s.
//! The most important invariants of a BST are:
//!
//! 1. For every `Node` in a BST, all the `Node`s in its left subtree have a
//!    key less than its own key.
//! 2. For every `Node` in a BST, all the `Node`s in its right subtree have a
//!    key greater than its own key.
//!
//! An AVL tree additionally keeps the heights of every `Node`'s two subtrees
//! within one of each other, rotating `Node`s after inserts and deletes when
//! they drift further apart. That bounds the height at `O(lg N)` so searching,
//! inserting, and deleting all take `O(lg N)`. Sorted iteration falls out of
//! visiting the left subtree, then the subtree root, then the right subtree.
//!
//! See [`multimap::Tree`].
//!
//! ## Calendars
//!
//! The [`ics`] module decodes iCalendar content lines, resolves their
//! date/time values to Unix timestamps, and loads every `VEVENT` of a
//! document into a [`multimap::Tree`] keyed by start time.

#![deny(missing_docs, clippy::clone_on_ref_ptr)]

pub mod error;
pub mod ics;
pub mod multimap;

#[cfg(test)]
mod test;
