//! Code generation for the `Record` implementation

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::Ident;

use crate::parsing::{type_name, FieldInfo, RecordInfo, RelationInfo, RelationKind};

pub fn generate_record_impl(name: &Ident, record: &RecordInfo, fields: &FieldInfo) -> TokenStream {
    let table = &record.table;
    let alias = &record.alias;

    let column_names: Vec<&str> = fields.columns.iter().map(|c| c.column.as_str()).collect();
    let column_idents: Vec<&Ident> = fields.columns.iter().map(|c| &c.ident).collect();
    let primary_keys: Vec<&str> = fields
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.column.as_str())
        .collect();

    let relations = generate_relations(name, fields);
    let timestamps = generate_set_timestamps(fields);

    quote! {
        impl ::record_store::Record for #name {
            fn table_name() -> &'static str {
                #table
            }

            fn alias() -> &'static str {
                #alias
            }

            fn columns() -> &'static [&'static str] {
                &[#(#column_names),*]
            }

            fn primary_key() -> &'static [&'static str] {
                &[#(#primary_keys),*]
            }

            fn push_column<'q>(
                &'q self,
                column: &str,
                builder: &mut ::record_store::sqlx::QueryBuilder<'q, ::record_store::sqlx::Postgres>,
            ) -> bool {
                match column {
                    #(#column_names => {
                        builder.push_bind(&self.#column_idents);
                        true
                    })*
                    _ => false,
                }
            }

            #relations

            #timestamps
        }
    }
}

fn generate_relations(name: &Ident, fields: &FieldInfo) -> TokenStream {
    if fields.relations.is_empty() {
        return TokenStream::new();
    }

    let descriptors = fields
        .relations
        .iter()
        .map(|relation| generate_relation(name, fields, relation));

    quote! {
        fn relations() -> ::std::vec::Vec<::record_store::Relation<Self>> {
            ::std::vec![#(#descriptors),*]
        }
    }
}

fn generate_relation(name: &Ident, fields: &FieldInfo, relation: &RelationInfo) -> TokenStream {
    let field = &relation.ident;
    let related = &relation.related;
    let relation_name = field.to_string();
    let join_field = &relation.join_field;
    let join_column_name = &relation.join_column;
    let base_column_name = &relation.base_column;

    // parse_fields already checked the base column exists
    let (base_field, key_type) = match fields.column(base_column_name) {
        Some(column) => (&column.ident, &column.ty),
        None => return quote! {},
    };

    let cascade = if relation.persist {
        quote! { ::record_store::relation::Cascade::Persist }
    } else {
        quote! { ::record_store::relation::Cascade::None }
    };

    let (constructor, accessors) = match relation.kind {
        RelationKind::HasOne => (
            quote! { ::record_store::relation::HasOne::new },
            quote! {
                fn get(m: &#name) -> ::std::option::Option<&#related> {
                    m.#field.as_ref()
                }
                fn set(m: &mut #name, value: ::std::option::Option<#related>) {
                    m.#field = value;
                }
            },
        ),
        RelationKind::HasMany => (
            quote! { ::record_store::relation::HasMany::new },
            quote! {
                fn get(m: &#name) -> &[#related] {
                    &m.#field
                }
                fn set(m: &mut #name, value: ::std::vec::Vec<#related>) {
                    m.#field = value;
                }
            },
        ),
    };

    quote! {
        {
            fn parent_key(m: &#name) -> &#key_type {
                &m.#base_field
            }
            fn child_key(r: &#related) -> &#key_type {
                &r.#join_field
            }
            #accessors

            #constructor(
                ::record_store::relation::RelationDef {
                    name: #relation_name,
                    base_column: #base_column_name,
                    join_column: #join_column_name,
                    cascade: #cascade,
                },
                parent_key,
                child_key,
                get,
                set,
            )
        }
    }
}

/// `set_timestamps` for records with `created_at` / `updated_at` fields of a
/// `DateTime` type.
fn generate_set_timestamps(fields: &FieldInfo) -> TokenStream {
    let timestamp_field = |name: &str| {
        fields
            .columns
            .iter()
            .find(|c| c.ident == name && type_name(&c.ty).as_deref() == Some("DateTime"))
            .map(|c| &c.ident)
    };

    let created = timestamp_field("created_at");
    let updated = timestamp_field("updated_at");
    if created.is_none() && updated.is_none() {
        return TokenStream::new();
    }

    let is_create = if created.is_some() {
        format_ident!("is_create")
    } else {
        format_ident!("_is_create")
    };
    let set_created = created.map(|field| {
        quote! {
            if #is_create {
                self.#field = ::core::convert::Into::into(now);
            }
        }
    });
    let set_updated = updated.map(|field| {
        quote! {
            self.#field = ::core::convert::Into::into(now);
        }
    });

    quote! {
        fn set_timestamps(
            &mut self,
            now: ::record_store::chrono::DateTime<::record_store::chrono::Utc>,
            #is_create: bool,
        ) {
            #set_created
            #set_updated
        }
    }
}
