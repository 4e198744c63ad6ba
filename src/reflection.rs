//! The reflection descriptor.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use reflectify_core::{
    ConversionError, DecodeError, DecodeErrors, Function, IntoFunction, IntoValue, MethodInfo,
    Reflect, StructInfo, Type, Value, ValueMap,
};

use crate::decode::weak_decode;
use crate::resolver::{self, ParamResolver, Resolution};

/// Describe a Rust value.
pub fn reflect<T: Reflect + IntoValue>(value: T) -> Reflection {
    Reflection::with_type(value.into_value(), T::reflect_type())
}

/// Describe a Rust function or closure.
pub fn reflect_fn<M, F: IntoFunction<M>>(f: F) -> Reflection {
    Reflection::from_value(Value::Func(Function::new(f)))
}

/// One value together with its runtime type.
///
/// A descriptor owns its resolver chain and its current element. The element
/// starts as the described value and is replaced by [`Reflection::new_instance`].
#[derive(Clone)]
pub struct Reflection {
    pub(crate) value: Value,
    pub(crate) ty: Type,
    pub(crate) resolvers: Vec<ParamResolver>,
    pub(crate) fallback: Option<ParamResolver>,
    pub(crate) is_receiver: bool,
    pub(crate) element: Value,
}

impl Reflection {
    /// Describe a dynamic value; the type is inferred from it.
    pub fn from_value(value: Value) -> Self {
        let ty = Type::of_value(&value);
        Self::with_type(value, ty)
    }

    /// Describe the zero value of `ty`.
    pub fn of_type(ty: Type) -> Self {
        Self::with_type(ty.zero(), ty)
    }

    fn with_type(value: Value, ty: Type) -> Self {
        Self {
            element: value.clone(),
            value,
            ty,
            resolvers: Vec::new(),
            fallback: Some(resolver::fallback()),
            is_receiver: false,
        }
    }

    // ------------------------------------------------------------------
    // Naming & classification
    // ------------------------------------------------------------------

    /// Unqualified name. Callables report the last segment of their path,
    /// pointers the name of their struct.
    pub fn name(&self) -> String {
        match &self.value {
            Value::Func(function) => function.name().to_string(),
            _ => self.ty.name(),
        }
    }

    /// Name including the module path; methods read `<Type full name>:<method>`.
    pub fn full_name(&self) -> String {
        match &self.value {
            Value::Func(function) => function.full_name().to_string(),
            _ => self.ty.full_name(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.ty.kind_name()
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The described value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// True for structs and pointers to structs.
    pub fn is_struct(&self) -> bool {
        self.ty.is_struct()
    }

    /// True for integers, text and booleans.
    pub fn is_scalar(&self) -> bool {
        self.ty.is_scalar()
    }

    pub fn is_pointer(&self) -> bool {
        self.ty.is_pointer()
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.value, Value::Func(_))
    }

    /// Same name and same pointer-ness.
    ///
    /// A struct and a pointer to that struct are not instances of one another.
    pub fn instance_of(&self, other: &Reflection) -> bool {
        self.name() == other.name() && self.is_pointer() == other.is_pointer()
    }

    /// Whether this descriptor stands for the receiver of the method being
    /// invoked. Only ever set on parameter descriptors.
    pub fn is_receiver(&self) -> bool {
        self.is_receiver
    }

    // ------------------------------------------------------------------
    // Element
    // ------------------------------------------------------------------

    /// Replace the element with a fresh zero instance and return it.
    ///
    /// Pointer types yield a new pointer to a zero struct.
    pub fn new_instance(&mut self) -> Value {
        self.element = self.ty.zero();
        self.element.clone()
    }

    /// The current element.
    pub fn element(&self) -> &Value {
        &self.element
    }

    /// Weak-decode `source` into the element and return it.
    ///
    /// Fields that fail to decode are skipped; use [`Reflection::try_fill`]
    /// to see why.
    pub fn fill(&mut self, source: &ValueMap) -> Value {
        match self.try_fill(source) {
            Ok(value) => value,
            Err(errors) => {
                debug!(target: "reflectify::decode", name = %self.name(), %errors, "dropping decode errors");
                self.element.clone()
            }
        }
    }

    /// Weak-decode `source` into the element, reporting every field failure.
    ///
    /// Struct elements are updated in place; pointer elements are written
    /// through, so every holder of the pointer sees the new field values.
    pub fn try_fill(&mut self, source: &ValueMap) -> Result<Value, DecodeErrors> {
        match &mut self.element {
            Value::Struct(object) => weak_decode(source, &mut **object)?,
            Value::Pointer(pointer) => {
                let info = pointer.struct_info();
                let mut object = pointer
                    .try_borrow_mut()
                    .map_err(|_| single_error(ConversionError::AlreadyBorrowed { type_name: info.name }))?;
                weak_decode(source, &mut *object)?;
            }
            other => {
                return Err(single_error(ConversionError::mismatch("struct", other.type_name())));
            }
        }
        Ok(self.element.clone())
    }

    /// Name and descriptor of every visible field of the element.
    pub fn fields(&self) -> Vec<(&'static str, Reflection)> {
        let Some(info) = self.ty.struct_info() else {
            return Vec::new();
        };
        info.fields
            .iter()
            .map(|field| {
                let ty = field.ty();
                let value = self.field_value(field.name).unwrap_or_else(|| ty.zero());
                (field.name, Reflection::with_type(value, ty))
            })
            .collect()
    }

    fn field_value(&self, name: &str) -> Option<Value> {
        match &self.element {
            Value::Struct(object) => object.field(name),
            Value::Pointer(pointer) => pointer.try_borrow().ok()?.field(name),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Methods & parameters
    // ------------------------------------------------------------------

    /// Methods by name.
    ///
    /// A callable maps its own name to itself. Structs list their `&self`
    /// methods, pointers every method; each entry is the unbound method whose
    /// first parameter is the receiver.
    pub fn methods(&self) -> FxHashMap<String, Reflection> {
        let mut result = FxHashMap::default();
        if self.is_callable() {
            result.insert(self.name(), Reflection::from(self));
            return result;
        }
        for (info, function) in self.method_set() {
            result.insert(
                info.name.to_string(),
                Reflection::from_value(Value::Func(function)),
            );
        }
        result
    }

    /// The named method bound to the current element.
    ///
    /// A callable returns itself whatever the name. `None` if the type has
    /// no such method.
    pub fn method_by_name(&self, name: &str) -> Option<Reflection> {
        if self.is_callable() {
            return Some(Reflection::from(self));
        }
        self.method_set()
            .find(|(info, _)| info.name == name)
            .map(|(_, function)| {
                Reflection::from_value(Value::Func(function.bind(self.element.clone())))
            })
    }

    /// Methods callable on this descriptor's type, with their functions.
    fn method_set(&self) -> impl Iterator<Item = (&'static MethodInfo, Function)> + '_ {
        let methods: &'static [MethodInfo] = self.ty.struct_info().map_or(&[], |info| info.methods);
        methods
            .iter()
            .map(|info| (info, info.function()))
            .filter(|(_, function)| in_method_set(&self.ty, function))
    }

    /// One zero-valued descriptor per declared parameter, receiver excluded.
    pub fn params(&self) -> Vec<Reflection> {
        let Value::Func(function) = &self.value else {
            return Vec::new();
        };
        let skip = usize::from(self.has_receiver());
        function
            .params()
            .iter()
            .skip(skip)
            .map(|ty| Reflection::of_type(ty.clone()))
            .collect()
    }

    /// Whether the first parameter is the receiver of this method.
    ///
    /// True when the callable has a first parameter of struct or pointer type
    /// whose method set contains a method named like the callable. An
    /// ordinary function whose first parameter happens to have a same-named
    /// method is classified the same way.
    pub fn has_receiver(&self) -> bool {
        let Value::Func(function) = &self.value else {
            return false;
        };
        let Some(first) = function.params().first() else {
            return false;
        };
        let Some(info) = first.struct_info() else {
            return false;
        };
        receiver_has_method(first, info, function.name())
    }

    // ------------------------------------------------------------------
    // Resolver chain
    // ------------------------------------------------------------------

    /// Append a resolver. Resolvers are consulted in registration order.
    pub fn add_resolver<F>(&mut self, resolver: F) -> &mut Self
    where
        F: Fn(&mut Reflection, Option<&Value>) -> Resolution + 'static,
    {
        self.resolvers.push(Rc::new(resolver));
        self
    }

    /// Replace the resolver consulted after the chain; `None` disables it.
    pub fn set_fallback(&mut self, fallback: Option<ParamResolver>) -> &mut Self {
        self.fallback = fallback;
        self
    }

    pub(crate) fn chain(&self) -> impl Iterator<Item = &ParamResolver> {
        self.resolvers.iter().chain(self.fallback.iter())
    }
}

/// `&mut self` methods take a pointer receiver and are missing from the
/// method set of a struct held by value.
fn in_method_set(ty: &Type, function: &Function) -> bool {
    ty.is_pointer() || !function.params().first().is_some_and(Type::is_pointer)
}

fn receiver_has_method(receiver: &Type, info: &'static StructInfo, name: &str) -> bool {
    info.method(name)
        .is_some_and(|method| in_method_set(receiver, &method.function()))
}

fn single_error(source: ConversionError) -> DecodeErrors {
    let mut errors = DecodeErrors::new();
    errors.push(DecodeError {
        path: String::new(),
        source,
    });
    errors
}

/// Re-wrap: same value and type, fresh chain, not a receiver.
impl From<&Reflection> for Reflection {
    fn from(other: &Reflection) -> Self {
        Reflection::with_type(other.value.clone(), other.ty.clone())
    }
}

impl fmt::Debug for Reflection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reflection")
            .field("name", &self.name())
            .field("type", &self.ty)
            .field("element", &self.element)
            .field("resolvers", &self.resolvers.len())
            .field("fallback", &self.fallback.is_some())
            .field("is_receiver", &self.is_receiver)
            .finish()
    }
}
