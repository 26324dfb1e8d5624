//! FromRow derive macro implementation

use crate::attrs::{column_name, field_attr, named_fields};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(&input, "FromRow")?;

    let field_extracts = fields
        .iter()
        .map(|field| {
            let field_name = &field.ident;
            let column = column_name(field, &field_attr(field)?);
            Ok(quote! {
                #field_name: row.try_get_column(#column)?
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::sessorm::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &::sessorm::tokio_postgres::Row) -> ::sessorm::OrmResult<Self> {
                use ::sessorm::RowExt;
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
