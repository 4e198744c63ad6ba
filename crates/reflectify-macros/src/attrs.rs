//! Attribute parsing for `#[reflect(...)]`.

use syn::{Attribute, Ident, LitStr, Path};

/// Parsed `#[reflect(...)]` attributes on a type.
#[derive(Debug, Default)]
pub struct TypeAttrs {
    /// Override the reported name (default: Rust struct name)
    pub name: Option<String>,
    /// Inherent methods exported into the method set
    pub methods: Vec<Ident>,
    /// Path of the runtime crate (default: `::reflectify`)
    pub crate_path: Option<Path>,
}

/// Parsed `#[reflect(...)]` attributes on a field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Override the decode key
    pub rename: Option<String>,
    /// Hide from enumeration and decoding
    pub skip: bool,
}

impl TypeAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("reflect") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else if meta.path.is_ident("methods") {
                    meta.parse_nested_meta(|method| {
                        let ident = method
                            .path
                            .get_ident()
                            .cloned()
                            .ok_or_else(|| method.error("expected a method name"))?;
                        result.methods.push(ident);
                        Ok(())
                    })?;
                } else if meta.path.is_ident("crate_path") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.crate_path = Some(value.parse()?);
                } else {
                    return Err(meta.error(format!(
                        "unknown reflect attribute: {}",
                        meta.path.get_ident().map(|i| i.to_string()).unwrap_or_default()
                    )));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}

impl FieldAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("reflect") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.rename = Some(value.value());
                } else if meta.path.is_ident("skip") {
                    result.skip = true;
                } else {
                    return Err(meta.error(format!(
                        "unknown reflect field attribute: {}",
                        meta.path.get_ident().map(|i| i.to_string()).unwrap_or_default()
                    )));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn type_attrs() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[reflect(name = "User")]),
            parse_quote!(#[reflect(methods(greet, rename))]),
        ];
        let parsed = TypeAttrs::from_attrs(&attrs).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("User"));
        let methods: Vec<String> = parsed.methods.iter().map(|m| m.to_string()).collect();
        assert_eq!(methods, ["greet", "rename"]);
        assert!(parsed.crate_path.is_none());
    }

    #[test]
    fn field_attrs() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[reflect(rename = "user_name", skip)])];
        let parsed = FieldAttrs::from_attrs(&attrs).unwrap();
        assert_eq!(parsed.rename.as_deref(), Some("user_name"));
        assert!(parsed.skip);
    }

    #[test]
    fn unknown_attribute_is_an_error() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[reflect(bogus)])];
        assert!(TypeAttrs::from_attrs(&attrs).is_err());
        assert!(FieldAttrs::from_attrs(&attrs).is_err());
    }

    #[test]
    fn foreign_attributes_are_ignored() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[serde(rename = "x")])];
        assert!(FieldAttrs::from_attrs(&attrs).unwrap().rename.is_none());
    }
}
