//! Implementation of the `#[derive(Reflect)]` macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, Path, Type, parse_macro_input, parse_quote};

use crate::attrs::{FieldAttrs, TypeAttrs};

pub fn derive_reflect_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_reflect_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// A named field with its parsed attributes.
struct ReflectedField<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    key: String,
    skip: bool,
}

fn derive_reflect_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = TypeAttrs::from_attrs(&input.attrs)?;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect cannot be derived for generic types",
        ));
    }

    let fields = collect_fields(input)?;
    let krate: Path = attrs
        .crate_path
        .clone()
        .unwrap_or_else(|| parse_quote!(::reflectify));

    // Reported name, defaults to the Rust ident
    let reflect_name = attrs.name.clone().unwrap_or_else(|| name.to_string());

    let table = generate_table(name, &reflect_name, &fields, &attrs.methods, &krate);
    let object_impl = generate_object_impl(name, &reflect_name, &fields, &krate);
    let conversion_impls = generate_conversion_impls(name, &krate);

    Ok(quote! {
        const _: () = {
            #table
            #object_impl
            #conversion_impls
        };
    })
}

fn collect_fields(input: &DeriveInput) -> syn::Result<Vec<ReflectedField<'_>>> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Reflect can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &data.fields,
            "Reflect requires a struct with named fields",
        ));
    };

    let mut fields = Vec::new();
    for field in &named.named {
        let field_attrs = FieldAttrs::from_attrs(&field.attrs)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        fields.push(ReflectedField {
            ident,
            ty: &field.ty,
            key: field_attrs.rename.unwrap_or_else(|| ident.to_string()),
            skip: field_attrs.skip,
        });
    }
    Ok(fields)
}

/// Generate the static `StructInfo` table and its field and method entries.
fn generate_table(
    name: &Ident,
    reflect_name: &str,
    fields: &[ReflectedField<'_>],
    methods: &[Ident],
    krate: &Path,
) -> TokenStream2 {
    let field_entries = fields.iter().filter(|f| !f.skip).map(|field| {
        let field_name = field.ident.to_string();
        let key = &field.key;
        let ty = field.ty;
        quote! {
            #krate::FieldInfo {
                name: #field_name,
                key: #key,
                type_of: <#ty as #krate::Reflect>::reflect_type,
            }
        }
    });

    let method_fns = methods.iter().map(|method| {
        let helper = format_ident!("__reflect_method_{}", method);
        let method_name = method.to_string();
        quote! {
            fn #helper() -> #krate::Function {
                #krate::Function::method::<#name, _, _>(#method_name, #name::#method)
            }
        }
    });

    let method_entries = methods.iter().map(|method| {
        let helper = format_ident!("__reflect_method_{}", method);
        let method_name = method.to_string();
        quote! {
            #krate::MethodInfo {
                name: #method_name,
                function: #helper,
            }
        }
    });

    quote! {
        #(#method_fns)*

        static __REFLECT_FIELDS: &[#krate::FieldInfo] = &[#(#field_entries),*];

        static __REFLECT_METHODS: &[#krate::MethodInfo] = &[#(#method_entries),*];

        static __REFLECT_INFO: #krate::StructInfo = #krate::StructInfo {
            name: #reflect_name,
            module: ::core::module_path!(),
            fields: __REFLECT_FIELDS,
            methods: __REFLECT_METHODS,
            zero: #krate::object::zero_object::<#name>,
            zero_ref: #krate::object::zero_shared::<#name>,
        };
    }
}

/// Generate the `Object` and `StaticStruct` impls.
fn generate_object_impl(
    name: &Ident,
    reflect_name: &str,
    fields: &[ReflectedField<'_>],
    krate: &Path,
) -> TokenStream2 {
    let visible: Vec<&ReflectedField<'_>> = fields.iter().filter(|f| !f.skip).collect();

    let getters = visible.iter().map(|field| {
        let ident = field.ident;
        let field_name = ident.to_string();
        quote! {
            #field_name => ::core::option::Option::Some(
                #krate::IntoValue::into_value(::core::clone::Clone::clone(&self.#ident))
            ),
        }
    });

    let setters = visible.iter().map(|field| {
        let ident = field.ident;
        let ty = field.ty;
        let field_name = ident.to_string();
        quote! {
            #field_name => self.#ident = <#ty as #krate::FromValue>::from_value(value)?,
        }
    });

    let zero_fields = fields.iter().map(|field| {
        let ident = field.ident;
        quote! { #ident: ::core::default::Default::default() }
    });

    quote! {
        impl #krate::Object for #name {
            fn struct_info(&self) -> &'static #krate::StructInfo {
                &__REFLECT_INFO
            }

            fn field(&self, name: &str) -> ::core::option::Option<#krate::Value> {
                match name {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: &#krate::Value,
            ) -> ::core::result::Result<(), #krate::ConversionError> {
                match name {
                    #(#setters)*
                    _ => {
                        return ::core::result::Result::Err(#krate::ConversionError::UnknownField {
                            type_name: #reflect_name,
                            field: ::std::string::ToString::to_string(name),
                        });
                    }
                }
                ::core::result::Result::Ok(())
            }

            fn clone_object(&self) -> ::std::boxed::Box<dyn #krate::Object> {
                ::std::boxed::Box::new(::core::clone::Clone::clone(self))
            }

            fn into_shared(self: ::std::boxed::Box<Self>) -> #krate::ObjectRef {
                #krate::ObjectRef::new(*self)
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }
        }

        impl #krate::StaticStruct for #name {
            fn static_info() -> &'static #krate::StructInfo {
                &__REFLECT_INFO
            }

            fn zero() -> Self {
                Self {
                    #(#zero_fields),*
                }
            }
        }
    }
}

/// Generate `Reflect`, `IntoValue`, `FromValue` and `IntoResults`.
fn generate_conversion_impls(name: &Ident, krate: &Path) -> TokenStream2 {
    quote! {
        impl #krate::Reflect for #name {
            fn reflect_type() -> #krate::Type {
                #krate::Type::Struct(&__REFLECT_INFO)
            }
        }

        impl #krate::IntoValue for #name {
            fn into_value(self) -> #krate::Value {
                #krate::Value::Struct(::std::boxed::Box::new(self))
            }
        }

        impl #krate::FromValue for #name {
            fn from_value(
                value: &#krate::Value,
            ) -> ::core::result::Result<Self, #krate::ConversionError> {
                #krate::convert::struct_from_value(value)
            }
        }

        impl #krate::IntoResults for #name {
            fn result_types() -> ::std::vec::Vec<#krate::Type> {
                ::std::vec![<#name as #krate::Reflect>::reflect_type()]
            }

            fn into_results(self) -> ::std::vec::Vec<#krate::Value> {
                ::std::vec![#krate::IntoValue::into_value(self)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(input: DeriveInput) -> syn::Result<String> {
        derive_reflect_inner(&input).map(|tokens| tokens.to_string())
    }

    #[test]
    fn emits_table_and_impls() {
        let output = expand(parse_quote! {
            #[reflect(name = "Account", methods(describe))]
            struct User {
                #[reflect(rename = "user_name")]
                name: String,
                #[reflect(skip)]
                cache: u8,
            }
        })
        .unwrap();

        assert!(output.contains("\"Account\""));
        assert!(output.contains("\"user_name\""));
        assert!(output.contains("__reflect_method_describe"));
        assert!(output.contains("reflectify :: Object for User"));
        // skipped fields still get a zero value but no table entry
        assert!(output.contains("cache :"));
        assert!(!output.contains("\"cache\""));
    }

    #[test]
    fn custom_crate_path() {
        let output = expand(parse_quote! {
            #[reflect(crate_path = "reflectify_core")]
            struct Point { x: i64 }
        })
        .unwrap();
        assert!(output.contains("reflectify_core :: Object for Point"));
    }

    #[test]
    fn rejects_tuple_structs() {
        let err = expand(parse_quote! { struct Pair(i64, i64); }).unwrap_err();
        assert!(err.to_string().contains("named fields"));
    }

    #[test]
    fn rejects_enums() {
        let err = expand(parse_quote! { enum Kind { A, B } }).unwrap_err();
        assert!(err.to_string().contains("only be derived for structs"));
    }

    #[test]
    fn rejects_generics() {
        let err = expand(parse_quote! { struct Wrapper<T> { inner: T } }).unwrap_err();
        assert!(err.to_string().contains("generic"));
    }
}
