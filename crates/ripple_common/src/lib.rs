//! Shared foundational types used across the ripple logic simulator.
//!
//! This crate provides the bit-mask arithmetic every layer of the kernel relies
//! on, the [`BitWidth`] newtype, the ID-indexed [`Arena`], and
//! [`InternalError`] for broken kernel invariants.

#![warn(missing_docs)]

pub mod arena;
pub mod bits;
pub mod internal;

pub use arena::{Arena, ArenaId};
pub use bits::{field_mask, mask, BitWidth, MAX_BITS};
pub use internal::InternalError;
