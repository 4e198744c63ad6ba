//! Core building blocks for runtime reflection.
//!
//! This crate is the host introspection layer the `reflectify` descriptor is
//! built on. It knows nothing about resolvers or invocation policy; it only
//! answers "what is this value", "what does its type look like" and "run this
//! callable with these arguments".
//!
//! ## Key Types
//!
//! - [`Value`]: dynamic value (scalars, collections, structs, pointers, callables, errors)
//! - [`Type`]: structural type descriptor with [`TypeFlags`] classification
//! - [`StructInfo`]: static metadata table generated by `#[derive(Reflect)]`
//! - [`Object`] / [`ObjectRef`] / [`Ptr`]: type-erased and shared struct instances
//! - [`Function`]: type-erased callable with a [`Signature`]
//! - [`Mapper`]: total coercion between text, integer and boolean

pub mod convert;
pub mod error;
pub mod function;
pub mod mapper;
pub mod object;
pub mod ty;
pub mod type_hash;
pub mod value;

pub use convert::{FromValue, IntoResults, IntoValue, Reflect};
pub use error::{ConversionError, DecodeError, DecodeErrors, ReflectError};
pub use function::{ByMut, ByRef, CallContext, Function, IntoFunction, IntoMethod, NativeCallable};
pub use mapper::{Mapper, Primitive};
pub use object::{FieldInfo, MethodInfo, Object, ObjectRef, Ptr, StaticStruct, StructInfo};
pub use ty::{IntWidth, Signature, Type, TypeFlags};
pub use type_hash::TypeHash;
pub use value::{ErrorValue, Value, ValueMap};
