//! Deterministic hash-based identity for reflected types.
//!
//! [`TypeHash`] is a 64-bit hash computed from a fully qualified name. Two
//! descriptors of the same Rust type always agree on it, which makes it a cheap
//! identity check when comparing struct types behind pointers and values.
//!
//! # Examples
//!
//! ```
//! use reflectify_core::TypeHash;
//!
//! let a = TypeHash::from_name("app::models::User");
//! let b = TypeHash::from_name("app::models::User");
//! assert_eq!(a, b);
//!
//! // Pointers live in their own domain
//! assert_ne!(a.pointer_to(), a);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// A struct and a pointer to it hash apart.
pub mod hash_constants {
    /// Domain marker for type hashes
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for pointer types
    pub const POINTER: u64 = 0x9a7f3d5e2b8c4601;
}

/// A deterministic 64-bit hash identifying a type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a pointer to the type identified by `self`.
    #[inline]
    pub fn pointer_to(self) -> Self {
        TypeHash(hash_constants::POINTER ^ self.0.rotate_left(13))
    }

    /// Check if this is the empty hash.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_deterministic() {
        assert_eq!(
            TypeHash::from_name("app::User"),
            TypeHash::from_name("app::User")
        );
        assert_ne!(
            TypeHash::from_name("app::User"),
            TypeHash::from_name("app::Account")
        );
    }

    #[test]
    fn pointer_hash_differs_from_pointee() {
        let user = TypeHash::from_name("app::User");
        assert_ne!(user, user.pointer_to());
        assert_eq!(user.pointer_to(), user.pointer_to());
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::from_name("int").is_empty());
    }

    #[test]
    fn debug_and_display() {
        let hash = TypeHash(0xff);
        assert_eq!(format!("{}", hash), "00000000000000ff");
        assert!(format!("{:?}", hash).starts_with("TypeHash(0x"));
    }
}
