//! Entity derive macro implementation

use crate::attrs::{column_name, field_attr, named_fields, table_name};
use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(&input, "Entity")?;

    let table = match table_name(&input)? {
        Some(table) => table,
        None => name.to_string().to_snake_case(),
    };

    let mut columns = Vec::with_capacity(fields.len());
    let mut primary_key: Option<String> = None;
    let mut values = Vec::new();

    for field in fields {
        let attr = field_attr(field)?;
        let column = column_name(field, &attr);

        if attr.is_id {
            if primary_key.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "only one field can be marked #[orm(id)]",
                ));
            }
            primary_key = Some(column.clone());
        }

        if !attr.skip_filter {
            let field_name = &field.ident;
            values.push(quote! {
                ::sessorm::FieldValue {
                    column: #column,
                    value: ::sessorm::Param::new(::core::clone::Clone::clone(&self.#field_name)),
                    is_default: ::sessorm::is_zero(&self.#field_name),
                }
            });
        }

        columns.push(column);
    }

    let primary_key = match primary_key {
        Some(pk) => quote! { ::core::option::Option::Some(#pk) },
        None => quote! { ::core::option::Option::None },
    };

    Ok(quote! {
        impl #impl_generics ::sessorm::Entity for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            const COLUMNS: &'static [&'static str] = &[#(#columns),*];
            const PRIMARY_KEY: ::core::option::Option<&'static str> = #primary_key;

            fn field_values(&self) -> ::std::vec::Vec<::sessorm::FieldValue> {
                ::std::vec![#(#values),*]
            }
        }
    })
}
