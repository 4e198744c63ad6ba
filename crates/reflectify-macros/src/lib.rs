//! Reflectify Proc Macros
//!
//! Provides `#[derive(Reflect)]`, which generates the static metadata table and
//! the object and conversion impls the runtime descriptor works with.
//!
//! # Example
//!
//! ```ignore
//! use reflectify::Reflect;
//!
//! #[derive(Clone, Default, Reflect)]
//! #[reflect(methods(greet))]
//! pub struct User {
//!     #[reflect(rename = "user_name")]
//!     pub name: String,
//!     pub age: i64,
//! }
//! ```

use proc_macro::TokenStream;

mod attrs;
mod derive_reflect;

/// Derive reflection support for a struct with named fields.
///
/// The struct must implement `Clone`, and every field must implement
/// `Default` (the zero instance is built field by field). Visible fields must
/// also implement the runtime's `Reflect`, `FromValue` and `IntoValue`.
///
/// # Attributes
///
/// - `#[reflect(name = "...")]` - Override the reported type name
/// - `#[reflect(methods(a, b))]` - Export inherent methods into the method set
/// - `#[reflect(crate_path = "...")]` - Path of the runtime crate
///
/// # Field Attributes
///
/// - `#[reflect(rename = "...")]` - Override the key used by weak decoding
/// - `#[reflect(skip)]` - Hide the field; it keeps its default value
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    derive_reflect::derive_reflect_impl(input)
}
