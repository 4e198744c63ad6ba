//! Type-erased callables.
//!
//! A [`Function`] pairs a [`NativeCallable`] with its [`Signature`] and a full
//! name. Plain Rust functions and closures become functions through
//! [`IntoFunction`]; inherent methods through [`IntoMethod`], which turns the
//! receiver into an explicit first parameter.
//!
//! ## Example
//!
//! ```ignore
//! fn greet(name: String, times: i64) -> String { /* ... */ }
//!
//! let f = Function::new(greet);
//! assert_eq!(f.signature().arity(), 2);
//! let out = f.call(&[Value::from("Ada"), Value::Int(2)])?;
//! ```

use std::fmt;
use std::rc::Rc;

use crate::{
    ConversionError, FromValue, IntoResults, ReflectError, Reflect, Signature, StaticStruct,
    Type, Value,
};

/// Trait for type-erased native callables.
///
/// The callable reads its arguments from the [`CallContext`] and leaves its
/// results there.
pub trait NativeCallable {
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), ReflectError>;
}

// Implement NativeCallable for closures that take CallContext
impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> Result<(), ReflectError>,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), ReflectError> {
        (self)(ctx)
    }
}

/// Pins a closure to the [`NativeCallable`] signature so its argument
/// lifetimes are inferred as higher-ranked.
fn native<F>(f: F) -> F
where
    F: Fn(&mut CallContext<'_>) -> Result<(), ReflectError> + 'static,
{
    f
}

/// Arguments and results of one native call.
pub struct CallContext<'a> {
    /// Full name of the callable, for error reporting
    function: &'a str,
    args: &'a [Value],
    results: Vec<Value>,
}

impl<'a> CallContext<'a> {
    pub fn new(function: &'a str, args: &'a [Value]) -> Self {
        Self {
            function,
            args,
            results: Vec::new(),
        }
    }

    pub fn function(&self) -> &'a str {
        self.function
    }

    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Get a raw reference to an argument.
    pub fn arg_slot(&self, index: usize) -> Result<&'a Value, ReflectError> {
        self.args
            .get(index)
            .ok_or(ReflectError::ArgumentIndexOutOfBounds {
                index,
                count: self.args.len(),
            })
    }

    /// Get a typed argument value.
    ///
    /// ```ignore
    /// let name: String = ctx.arg(0)?;
    /// let times: i64 = ctx.arg(1)?;
    /// ```
    pub fn arg<T: FromValue>(&self, index: usize) -> Result<T, ReflectError> {
        let slot = self.arg_slot(index)?;
        T::from_value(slot).map_err(|source| self.argument_error(index, source))
    }

    /// Run `f` with a shared borrow of the struct receiver at `index`.
    ///
    /// The receiver may be held by value or behind a pointer.
    pub fn with_receiver<T, R>(&self, index: usize, f: impl FnOnce(&T) -> R) -> Result<R, ReflectError>
    where
        T: StaticStruct,
    {
        let expected = T::static_info().name;
        match self.arg_slot(index)? {
            Value::Struct(object) => match object.downcast_ref::<T>() {
                Some(this) => Ok(f(this)),
                None => Err(self.argument_error(
                    index,
                    ConversionError::mismatch(expected, object.struct_info().name),
                )),
            },
            Value::Pointer(pointer) => {
                let ptr = pointer.downcast::<T>().ok_or_else(|| {
                    self.argument_error(
                        index,
                        ConversionError::mismatch(expected, pointer.struct_info().name),
                    )
                })?;
                let this = ptr.try_borrow().map_err(|_| {
                    self.argument_error(index, ConversionError::AlreadyBorrowed { type_name: expected })
                })?;
                Ok(f(&this))
            }
            other => Err(self.argument_error(
                index,
                ConversionError::mismatch(expected, other.type_name()),
            )),
        }
    }

    /// Run `f` with an exclusive borrow of the pointer receiver at `index`.
    ///
    /// Only pointers qualify; a struct held by value has nowhere to keep the
    /// mutation.
    pub fn with_receiver_mut<T, R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, ReflectError>
    where
        T: StaticStruct,
    {
        let expected = T::static_info().name;
        let ptr = match self.arg_slot(index)? {
            Value::Pointer(pointer) => pointer.downcast::<T>().ok_or_else(|| {
                self.argument_error(
                    index,
                    ConversionError::mismatch(format!("Ptr<{expected}>"), pointer.struct_info().name),
                )
            })?,
            other => {
                return Err(self.argument_error(
                    index,
                    ConversionError::mismatch(format!("Ptr<{expected}>"), other.type_name()),
                ));
            }
        };
        let mut this = ptr.try_borrow_mut().map_err(|_| {
            self.argument_error(index, ConversionError::AlreadyBorrowed { type_name: expected })
        })?;
        Ok(f(&mut this))
    }

    fn argument_error(&self, index: usize, source: ConversionError) -> ReflectError {
        ReflectError::Argument {
            index,
            function: self.function.to_string(),
            source,
        }
    }

    /// Replace the results with raw values.
    pub fn set_results(&mut self, results: Vec<Value>) {
        self.results = results;
    }

    /// Set typed results, spread over as many slots as the type declares.
    pub fn set_return<T: IntoResults>(&mut self, value: T) {
        self.results = value.into_results();
    }

    pub fn push_result(&mut self, value: Value) {
        self.results.push(value);
    }

    pub fn into_results(self) -> Vec<Value> {
        self.results
    }
}

/// A named, type-erased callable.
///
/// Cheap to clone; clones share the underlying callable.
#[derive(Clone)]
pub struct Function {
    full_name: Rc<str>,
    signature: Rc<Signature>,
    inner: Rc<dyn NativeCallable>,
}

impl Function {
    /// Wrap a Rust function or closure.
    ///
    /// The full name is the Rust path of the function item; closures report
    /// the synthetic last segment `{{closure}}`.
    pub fn new<M, F: IntoFunction<M>>(f: F) -> Self {
        let full_name = std::any::type_name::<F>();
        Self::from_native(full_name, F::signature(), f.into_callable())
    }

    /// Wrap an inherent method. The receiver becomes the first parameter and
    /// the full name is `<module>::<Type>:<method>`.
    pub fn method<T, M, F>(name: &str, f: F) -> Self
    where
        T: StaticStruct,
        F: IntoMethod<T, M>,
    {
        let info = T::static_info();
        let full_name = format!("{}:{}", info.full_name(), name);
        Self {
            full_name: full_name.into(),
            signature: Rc::new(F::signature()),
            inner: f.into_callable(),
        }
    }

    /// Assemble a function from its parts.
    pub fn from_native(
        full_name: &str,
        signature: Signature,
        callable: Rc<dyn NativeCallable>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            signature: Rc::new(signature),
            inner: callable,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Last segment of the full name.
    pub fn name(&self) -> &str {
        self.full_name.rsplit(':').next().unwrap_or(&self.full_name)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn signature_rc(&self) -> Rc<Signature> {
        Rc::clone(&self.signature)
    }

    pub fn params(&self) -> &[Type] {
        self.signature.params()
    }

    pub fn results(&self) -> &[Type] {
        self.signature.results()
    }

    /// Invoke positionally and collect the results.
    pub fn call(&self, args: &[Value]) -> Result<Vec<Value>, ReflectError> {
        let mut ctx = CallContext::new(&self.full_name, args);
        self.inner.call(&mut ctx)?;
        Ok(ctx.into_results())
    }

    /// The method value with `receiver` pre-supplied as the first argument.
    ///
    /// The bound function keeps the name and drops the receiver parameter.
    pub fn bind(&self, receiver: Value) -> Function {
        let inner = Rc::clone(&self.inner);
        let callable = native(move |ctx| {
            let mut args = Vec::with_capacity(ctx.arg_count() + 1);
            args.push(receiver.clone());
            args.extend_from_slice(ctx.args());
            let mut bound = CallContext::new(ctx.function(), &args);
            inner.call(&mut bound)?;
            ctx.set_results(bound.into_results());
            Ok(())
        });
        Function {
            full_name: Rc::clone(&self.full_name),
            signature: Rc::new(self.signature.without_first_param()),
            inner: Rc::new(callable),
        }
    }

    /// Whether both handles share the same callable.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.inner), Rc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.full_name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Conversion of a Rust function or closure into a [`Function`].
///
/// `Marker` is the function-pointer shape of the implementation and only
/// serves to keep the per-arity impls apart.
pub trait IntoFunction<Marker> {
    fn signature() -> Signature;

    fn into_callable(self) -> Rc<dyn NativeCallable>;
}

/// Marker for `&self` methods.
pub struct ByRef;

/// Marker for `&mut self` methods.
pub struct ByMut;

/// Conversion of an inherent method of `T` into a [`Function`].
///
/// `&self` methods take the struct as receiver; `&mut self` methods take a
/// pointer to it.
pub trait IntoMethod<T: StaticStruct, Marker> {
    /// Signature including the receiver.
    fn signature() -> Signature;

    fn into_callable(self) -> Rc<dyn NativeCallable>;
}

macro_rules! impl_into_function {
    ($($arg:ident $idx:tt),*) => {
        impl<Func, Ret, $($arg,)*> IntoFunction<fn($($arg,)*) -> Ret> for Func
        where
            Func: Fn($($arg),*) -> Ret + 'static,
            Ret: IntoResults,
            $($arg: FromValue + Reflect,)*
        {
            fn signature() -> Signature {
                Signature::new(vec![$($arg::reflect_type()),*], Ret::result_types())
            }

            fn into_callable(self) -> Rc<dyn NativeCallable> {
                Rc::new(native(move |ctx| {
                    let results = (self)($(ctx.arg::<$arg>($idx)?),*);
                    ctx.set_return(results);
                    Ok(())
                }))
            }
        }

        impl<T, Func, Ret, $($arg,)*> IntoMethod<T, (ByRef, fn($($arg,)*) -> Ret)> for Func
        where
            T: StaticStruct,
            Func: Fn(&T, $($arg),*) -> Ret + 'static,
            Ret: IntoResults,
            $($arg: FromValue + Reflect,)*
        {
            fn signature() -> Signature {
                Signature::new(
                    vec![Type::Struct(T::static_info()), $($arg::reflect_type()),*],
                    Ret::result_types(),
                )
            }

            fn into_callable(self) -> Rc<dyn NativeCallable> {
                Rc::new(native(move |ctx| {
                    $(let $arg = ctx.arg::<$arg>($idx + 1)?;)*
                    let results = ctx.with_receiver(0, |this: &T| (self)(this, $($arg),*))?;
                    ctx.set_return(results);
                    Ok(())
                }))
            }
        }

        impl<T, Func, Ret, $($arg,)*> IntoMethod<T, (ByMut, fn($($arg,)*) -> Ret)> for Func
        where
            T: StaticStruct,
            Func: Fn(&mut T, $($arg),*) -> Ret + 'static,
            Ret: IntoResults,
            $($arg: FromValue + Reflect,)*
        {
            fn signature() -> Signature {
                Signature::new(
                    vec![Type::Pointer(T::static_info()), $($arg::reflect_type()),*],
                    Ret::result_types(),
                )
            }

            fn into_callable(self) -> Rc<dyn NativeCallable> {
                Rc::new(native(move |ctx| {
                    $(let $arg = ctx.arg::<$arg>($idx + 1)?;)*
                    let results = ctx.with_receiver_mut(0, |this: &mut T| (self)(this, $($arg),*))?;
                    ctx.set_return(results);
                    Ok(())
                }))
            }
        }
    };
}

#[allow(non_snake_case)]
mod arities {
    use super::*;

    impl_into_function!();
    impl_into_function!(A0 0);
    impl_into_function!(A0 0, A1 1);
    impl_into_function!(A0 0, A1 1, A2 2);
    impl_into_function!(A0 0, A1 1, A2 2, A3 3);
    impl_into_function!(A0 0, A1 1, A2 2, A3 3, A4 4);
    impl_into_function!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5);
    impl_into_function!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6);
    impl_into_function!(A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6, A7 7);
}
