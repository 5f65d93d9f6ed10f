//! Procedural macros declaring record metadata
//!
//! `#[derive(Record)]` implements `record_store::Record` from the struct
//! definition: table name, alias, columns, primary key, column binders,
//! relation descriptors and conventional timestamp fields. `#[model]` adds
//! the derives a record needs in one attribute.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, Error};

mod generation;
mod model_macro;
mod parsing;

use generation::generate_record_impl;
use model_macro::model_attribute;
use parsing::{parse_fields, parse_record_attributes};

/// Derive macro for the `Record` trait
///
/// ```rust,ignore
/// #[derive(Debug, Clone, sqlx::FromRow, Record)]
/// #[record(table = "test_models", alias = "test_model")]
/// pub struct TestModel {
///     #[primary_key]
///     pub id: String,
///     pub name: String,
///     pub created_at: DateTime<Utc>,
///
///     #[sqlx(skip)]
///     #[relation(has_one, join = "id=test_model_id", persist)]
///     pub related: Option<TestRelated>,
/// }
/// ```
///
/// Without `#[record(...)]` the table is the pluralised snake-case struct
/// name and the alias the snake-case struct name. Relation fields are
/// `Option<T>` (`has_one`) or `Vec<T>` (`has_many`); the join column is a
/// field of `T` with the same type as the base column. When that field is
/// renamed with `#[sqlx(rename)]`, name it with `join_field`:
/// `#[relation(has_many, join = "id=parent_ref", join_field = "parent_id")]`.
#[proc_macro_derive(Record, attributes(record, primary_key, relation))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return Error::new_spanned(&input.generics, "Record cannot be derived for generic structs")
            .to_compile_error()
            .into();
    }

    let record_info = match parse_record_attributes(&input) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    let field_info = match parse_fields(&input.data) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    TokenStream::from(generate_record_impl(&input.ident, &record_info, &field_info))
}

/// Convenience attribute macro that adds all necessary derives for a record
///
/// ```rust,ignore
/// #[model]
/// #[record(table = "users")]
/// pub struct User {
///     #[primary_key]
///     pub id: Uuid,
///     pub name: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    model_attribute(attr, item)
}
