//! Runtime reflection and dynamic invocation.
//!
//! A [`Reflection`] wraps one value together with its runtime type. It names
//! and classifies the value, builds zero instances, fills structs from loose
//! string-keyed maps, enumerates methods and parameters, and invokes
//! callables with parameters materialized by an ordered chain of resolvers.
//!
//! ## Key Types
//!
//! - [`Reflection`]: the descriptor, built with [`reflect`] or [`reflect_fn`]
//! - [`ParamResolver`] / [`Resolution`]: pluggable parameter resolution
//! - [`Invocation`]: the outcome of [`Reflection::call`]
//! - [`weak_decode`]: loose map-to-struct decoding
//!
//! Everything from `reflectify-core` ([`Value`], [`Type`], [`Function`],
//! [`Mapper`], ...) is re-exported here.
//!
//! ## Example
//!
//! ```ignore
//! use reflectify::{reflect_fn, Resolution, Value};
//!
//! let mut refl = reflect_fn(|user: Ptr<User>, greeting: String| {
//!     format!("{greeting}, {}", user.borrow().name)
//! });
//! refl.add_resolver(move |param, _raw| {
//!     if param.is_pointer() && param.name() == "User" {
//!         Resolution::provide(current_user.clone())
//!     } else {
//!         Resolution::Declined
//!     }
//! });
//! let out = refl.call(&[Value::from("Hello")])?;
//! ```

// Generated code names this crate by its absolute path
extern crate self as reflectify;

pub mod decode;
pub mod invoke;
pub mod reflection;
pub mod resolver;

pub use reflectify_core::*;

pub use decode::weak_decode;
pub use invoke::Invocation;
pub use reflection::{Reflection, reflect, reflect_fn};
pub use resolver::{ParamResolver, Resolution};

#[cfg(feature = "derive")]
pub use reflectify_macros::Reflect;
