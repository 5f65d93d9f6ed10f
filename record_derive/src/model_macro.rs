use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Error, Fields};

use crate::parsing::has_attribute;

/// Adds `Debug`, `Clone`, `sqlx::FromRow` and `Record` derives, and marks
/// relation fields `#[sqlx(skip)]` so row decoding leaves them empty.
pub fn model_attribute(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(item as DeriveInput);

    let fields = match &mut input.data {
        Data::Struct(data) => match &mut data.fields {
            Fields::Named(named) => &mut named.named,
            _ => {
                return Error::new_spanned(&input.ident, "model needs a struct with named fields")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return Error::new_spanned(&input.ident, "model can only be used on structs")
                .to_compile_error()
                .into()
        }
    };

    for field in fields.iter_mut() {
        if has_attribute(&field.attrs, "relation") {
            field.attrs.push(parse_quote!(#[sqlx(skip)]));
        }
    }

    let expanded = quote! {
        #[derive(Debug, Clone, ::sqlx::FromRow, ::record_store::Record)]
        #input
    };

    TokenStream::from(expanded)
}
