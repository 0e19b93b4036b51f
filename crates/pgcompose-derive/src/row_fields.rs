//! RowFields derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

struct FieldAttrs {
    column: Option<String>,
    skip: bool,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "RowFields can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "RowFields can only be derived for structs",
            ));
        }
    };

    let mut inserts = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(field)?;
        if attrs.skip {
            continue;
        }
        let column = attrs
            .column
            .unwrap_or_else(|| ident.unraw().to_string().to_lowercase());

        inserts.push(quote! {
            map.insert(
                #column.to_string(),
                pgcompose::Value::from(::core::clone::Clone::clone(&self.#ident)),
            );
        });
    }

    Ok(quote! {
        impl #impl_generics pgcompose::RowFields for #name #ty_generics #where_clause {
            fn field_map(&self) -> pgcompose::FieldMap {
                let mut map = pgcompose::FieldMap::new();
                #(#inserts)*
                map
            }
        }
    })
}

fn parse_field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut attrs = FieldAttrs {
        column: None,
        skip: false,
    };

    for attr in &field.attrs {
        if !attr.path().is_ident("fields") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.column = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("skip") {
                attrs.skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `column = \"...\"` or `skip`"))
            }
        })?;
    }

    Ok(attrs)
}
