//! Struct metadata and type-erased struct instances.
//!
//! `#[derive(Reflect)]` emits one static [`StructInfo`] per struct plus the
//! [`Object`] and [`StaticStruct`] impls that tie instances to it. Everything in
//! the table is a `&'static` slice or a plain `fn` pointer, so the table is a
//! `static` with no lazy initialization, and field and method types are
//! resolved on demand (a struct may mention itself through a pointer).
//!
//! Shared instances live behind [`ObjectRef`] (untyped) or [`Ptr<T>`] (typed);
//! both are views of the same `Rc<RefCell<T>>` allocation.

use std::any::Any;
use std::cell::{BorrowError, BorrowMutError, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::{ConversionError, Function, Type, TypeHash, Value};

/// Static metadata table for a reflected struct.
pub struct StructInfo {
    /// Reported name (the Rust ident unless renamed).
    pub name: &'static str,
    /// `module_path!()` of the declaring module.
    pub module: &'static str,
    /// Visible fields in declaration order.
    pub fields: &'static [FieldInfo],
    /// Exported methods in declaration order.
    pub methods: &'static [MethodInfo],
    /// Build a zero instance by value.
    pub zero: fn() -> Box<dyn Object>,
    /// Build a zero instance behind a fresh pointer.
    pub zero_ref: fn() -> ObjectRef,
}

impl StructInfo {
    /// `module::Name`.
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }

    pub fn type_hash(&self) -> TypeHash {
        TypeHash::from_name(&self.full_name())
    }

    /// Look up a field by its exact name.
    pub fn field(&self, name: &str) -> Option<&'static FieldInfo> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Look up an exported method by name.
    pub fn method(&self, name: &str) -> Option<&'static MethodInfo> {
        self.methods.iter().find(|method| method.name == name)
    }
}

impl fmt::Debug for StructInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructInfo")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// One field of a reflected struct.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    /// Rust field name.
    pub name: &'static str,
    /// Key the weak decoder looks for.
    pub key: &'static str,
    /// Resolves the field type.
    pub type_of: fn() -> Type,
}

impl FieldInfo {
    pub fn ty(&self) -> Type {
        (self.type_of)()
    }
}

/// One exported method of a reflected struct.
#[derive(Debug, Clone, Copy)]
pub struct MethodInfo {
    pub name: &'static str,
    /// Builds the unbound method; its first parameter is the receiver.
    pub function: fn() -> Function,
}

impl MethodInfo {
    pub fn function(&self) -> Function {
        (self.function)()
    }
}

/// A type-erased struct instance.
///
/// Implemented by `#[derive(Reflect)]`; hand-written impls must keep
/// [`Object::struct_info`] consistent with the concrete type.
pub trait Object: Any {
    fn struct_info(&self) -> &'static StructInfo;

    /// Read a field by its Rust name.
    fn field(&self, name: &str) -> Option<Value>;

    /// Overwrite a field by its Rust name. The value must already have the
    /// field's kind; no coercion happens here.
    fn set_field(&mut self, name: &str, value: &Value) -> Result<(), ConversionError>;

    fn clone_object(&self) -> Box<dyn Object>;

    /// Move this instance behind a fresh shared pointer.
    fn into_shared(self: Box<Self>) -> ObjectRef;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Object {
    pub fn is<T: Object>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Object>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl Clone for Box<dyn Object> {
    fn clone(&self) -> Self {
        self.clone_object()
    }
}

impl fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.struct_info();
        let mut out = f.debug_struct(info.name);
        for field in info.fields {
            match self.field(field.name) {
                Some(value) => out.field(field.name, &value),
                None => out.field(field.name, &"?"),
            };
        }
        out.finish()
    }
}

/// Typed access to the static metadata of a derived struct.
pub trait StaticStruct: Object + Clone + Sized {
    fn static_info() -> &'static StructInfo;

    /// The instance with every field at its zero value.
    fn zero() -> Self;
}

/// Zero-instance constructors referenced from generated [`StructInfo`] tables.
pub fn zero_object<T: StaticStruct>() -> Box<dyn Object> {
    Box::new(T::zero())
}

pub fn zero_shared<T: StaticStruct>() -> ObjectRef {
    ObjectRef::new(T::zero())
}

/// A shared, untyped pointer to a struct instance.
#[derive(Clone)]
pub struct ObjectRef {
    info: &'static StructInfo,
    cell: Rc<RefCell<dyn Object>>,
    erased: Rc<dyn Any>,
}

impl ObjectRef {
    pub fn new<T: Object>(value: T) -> Self {
        Self::from_rc(Rc::new(RefCell::new(value)))
    }

    fn from_rc<T: Object>(rc: Rc<RefCell<T>>) -> Self {
        let info = rc.borrow().struct_info();
        let cell: Rc<RefCell<dyn Object>> = rc.clone();
        let erased: Rc<dyn Any> = rc;
        Self { info, cell, erased }
    }

    pub fn struct_info(&self) -> &'static StructInfo {
        self.info
    }

    pub fn borrow(&self) -> Ref<'_, dyn Object> {
        self.cell.borrow()
    }

    pub fn try_borrow(&self) -> Result<Ref<'_, dyn Object>, BorrowError> {
        self.cell.try_borrow()
    }

    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, dyn Object>, BorrowMutError> {
        self.cell.try_borrow_mut()
    }

    /// A by-value copy of the pointee.
    pub fn snapshot(&self) -> Box<dyn Object> {
        self.cell.borrow().clone_object()
    }

    /// Recover the typed pointer; `None` if the pointee is not a `T`.
    pub fn downcast<T: Object>(&self) -> Option<Ptr<T>> {
        self.erased
            .clone()
            .downcast::<RefCell<T>>()
            .ok()
            .map(|inner| Ptr { inner })
    }

    /// Pointer identity.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.erased), Rc::as_ptr(&other.erased))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(object) => write!(f, "&{:?}", &*object),
            Err(_) => write!(f, "&{}(<borrowed>)", self.info.name),
        }
    }
}

/// A typed shared pointer to a reflected struct.
///
/// This is the Rust spelling of a pointer parameter: a function taking
/// `Ptr<User>` declares a `Type::Pointer` parameter, and resolvers see a
/// pointer descriptor for it.
pub struct Ptr<T: Object> {
    inner: Rc<RefCell<T>>,
}

impl<T: Object> Ptr<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    pub fn try_borrow(&self) -> Result<Ref<'_, T>, BorrowError> {
        self.inner.try_borrow()
    }

    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, T>, BorrowMutError> {
        self.inner.try_borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Ptr<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Erase the type, sharing the same allocation.
    pub fn to_object_ref(&self) -> ObjectRef {
        ObjectRef::from_rc(self.inner.clone())
    }
}

impl<T: Object> Clone for Ptr<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Object + fmt::Debug> fmt::Debug for Ptr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(value) => write!(f, "&{:?}", &*value),
            Err(_) => write!(f, "&<borrowed>"),
        }
    }
}

impl<T: StaticStruct> Default for Ptr<T> {
    fn default() -> Self {
        Ptr::new(T::zero())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    //! A hand-written reflected struct, standing in for derive output.

    use super::*;
    use crate::{FromValue, IntWidth, IntoValue, Reflect, Signature};

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Point {
        pub x: i64,
        pub label: String,
    }

    impl Point {
        pub fn describe(&self) -> String {
            format!("{}@{}", self.label, self.x)
        }

        pub fn shift(&mut self, by: i64) {
            self.x += by;
        }
    }

    fn describe_method() -> Function {
        Function::method::<Point, _, _>("describe", Point::describe)
    }

    fn shift_method() -> Function {
        Function::method::<Point, _, _>("shift", Point::shift)
    }

    static POINT_FIELDS: &[FieldInfo] = &[
        FieldInfo {
            name: "x",
            key: "x",
            type_of: <i64 as Reflect>::reflect_type,
        },
        FieldInfo {
            name: "label",
            key: "label",
            type_of: <String as Reflect>::reflect_type,
        },
    ];

    static POINT_METHODS: &[MethodInfo] = &[
        MethodInfo {
            name: "describe",
            function: describe_method,
        },
        MethodInfo {
            name: "shift",
            function: shift_method,
        },
    ];

    static POINT_INFO: StructInfo = StructInfo {
        name: "Point",
        module: "geometry",
        fields: POINT_FIELDS,
        methods: POINT_METHODS,
        zero: zero_object::<Point>,
        zero_ref: zero_shared::<Point>,
    };

    impl Object for Point {
        fn struct_info(&self) -> &'static StructInfo {
            &POINT_INFO
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "x" => Some(self.x.into_value()),
                "label" => Some(self.label.clone().into_value()),
                _ => None,
            }
        }

        fn set_field(&mut self, name: &str, value: &Value) -> Result<(), ConversionError> {
            match name {
                "x" => self.x = i64::from_value(value)?,
                "label" => self.label = String::from_value(value)?,
                _ => {
                    return Err(ConversionError::UnknownField {
                        type_name: "Point",
                        field: name.to_string(),
                    });
                }
            }
            Ok(())
        }

        fn clone_object(&self) -> Box<dyn Object> {
            Box::new(self.clone())
        }

        fn into_shared(self: Box<Self>) -> ObjectRef {
            ObjectRef::new(*self)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl StaticStruct for Point {
        fn static_info() -> &'static StructInfo {
            &POINT_INFO
        }

        fn zero() -> Self {
            Point::default()
        }
    }

    impl Reflect for Point {
        fn reflect_type() -> Type {
            Type::Struct(&POINT_INFO)
        }
    }

    impl IntoValue for Point {
        fn into_value(self) -> Value {
            Value::Struct(Box::new(self))
        }
    }

    impl FromValue for Point {
        fn from_value(value: &Value) -> Result<Self, ConversionError> {
            crate::convert::struct_from_value(value)
        }
    }

    impl crate::IntoResults for Point {
        fn result_types() -> Vec<Type> {
            vec![Point::reflect_type()]
        }

        fn into_results(self) -> Vec<Value> {
            vec![self.into_value()]
        }
    }

    #[test]
    fn struct_info_lookup() {
        assert_eq!(POINT_INFO.full_name(), "geometry::Point");
        assert_eq!(POINT_INFO.field("x").map(|f| f.ty()), Some(Type::Int(IntWidth::W64)));
        assert!(POINT_INFO.field("missing").is_none());
        assert!(POINT_INFO.method("describe").is_some());
    }

    #[test]
    fn object_ref_shares_allocation_with_ptr() {
        let ptr = Ptr::new(Point::default());
        let erased = ptr.to_object_ref();

        ptr.borrow_mut().x = 7;
        assert_eq!(erased.borrow().field("x"), Some(Value::Int(7)));

        let back = erased.downcast::<Point>().expect("same type");
        assert!(back.ptr_eq(&ptr));
        assert!(erased.ptr_eq(&ptr.to_object_ref()));
    }

    #[test]
    fn snapshot_is_a_copy() {
        let shared = ObjectRef::new(Point {
            x: 1,
            label: "a".into(),
        });
        let copy = shared.snapshot();
        shared.try_borrow_mut().unwrap().set_field("x", &Value::Int(9)).unwrap();
        assert_eq!(copy.field("x"), Some(Value::Int(1)));
    }

    #[test]
    fn set_field_rejects_wrong_kind() {
        let mut point = Point::default();
        assert!(point.set_field("x", &Value::Str("1".into())).is_err());
        assert!(matches!(
            point.set_field("nope", &Value::Int(1)),
            Err(ConversionError::UnknownField { .. })
        ));
    }

    #[test]
    fn dyn_object_debug_lists_fields() {
        let boxed: Box<dyn Object> = Box::new(Point {
            x: 3,
            label: "p".into(),
        });
        let debug = format!("{:?}", boxed);
        assert!(debug.starts_with("Point"));
        assert!(debug.contains("Int(3)"));
    }

    #[test]
    fn method_signatures_carry_receivers() {
        let describe = describe_method();
        assert_eq!(describe.full_name(), "geometry::Point:describe");
        assert_eq!(describe.name(), "describe");
        assert_eq!(
            describe.signature(),
            &Signature::new(vec![Type::Struct(&POINT_INFO)], vec![Type::String])
        );

        let shift = shift_method();
        assert_eq!(shift.signature().params()[0], Type::Pointer(&POINT_INFO));
    }
}
