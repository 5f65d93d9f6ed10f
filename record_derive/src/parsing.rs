//! Parsing of `#[record]`, `#[primary_key]`, `#[relation]` and `#[sqlx]`
//! attributes, and compile-time validation of identifiers.

use syn::{
    Attribute, Data, DeriveInput, Error, Fields, GenericArgument, Ident, LitStr, PathArguments,
    Result, Token, Type,
};

/// Same rules as `record_store::validation::validate_identifier`, checked at
/// compile time.
pub fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    let first_char = name
        .chars()
        .next()
        .ok_or_else(|| "name cannot be empty".to_string())?;

    if name.len() > 63 {
        return Err(format!(
            "name '{}' is too long: {} characters (max 63)",
            name,
            name.len()
        ));
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(format!(
            "name '{}' must start with a letter or underscore",
            name
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("name '{}' contains invalid characters: only alphanumeric characters and underscores are allowed", name));
    }

    Ok(())
}

fn validate_syn(kind: &str, name: &str, span: proc_macro2::Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("invalid {} '{}': {}", kind, name, e)))
}

/// `TestModel` -> `test_model`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if i > 0 && (prev_lower || (next_lower && chars[i - 1].is_ascii_uppercase())) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}

/// `test_model` -> `test_models`, `category` -> `categories`
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if word.ends_with(['s', 'x', 'z']) || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

#[derive(Debug)]
pub struct RecordInfo {
    pub table: String,
    pub alias: String,
}

pub fn parse_record_attributes(input: &DeriveInput) -> Result<RecordInfo> {
    let mut table = None;
    let mut alias = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                validate_syn("table name", &value.value(), value.span())?;
                table = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("alias") {
                let value: LitStr = meta.value()?.parse()?;
                validate_syn("alias", &value.value(), value.span())?;
                alias = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `table = \"...\"` or `alias = \"...\"`"))
            }
        })?;
    }

    let snake = snake_case(&input.ident.to_string());
    Ok(RecordInfo {
        table: table.unwrap_or_else(|| pluralize(&snake)),
        alias: alias.unwrap_or(snake),
    })
}

#[derive(Debug)]
pub struct ColumnInfo {
    pub ident: Ident,
    pub column: String,
    pub ty: Type,
    pub primary_key: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    HasOne,
    HasMany,
}

#[derive(Debug)]
pub struct RelationInfo {
    pub ident: Ident,
    pub kind: RelationKind,
    pub related: Type,
    pub base_column: String,
    pub join_column: String,
    /// Field of the related struct holding the join column.
    pub join_field: Ident,
    pub persist: bool,
}

#[derive(Debug)]
pub struct FieldInfo {
    pub columns: Vec<ColumnInfo>,
    pub relations: Vec<RelationInfo>,
}

impl FieldInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.column == name)
    }
}

pub fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

#[derive(Default)]
struct SqlxOptions {
    skip: bool,
    rename: Option<String>,
}

/// The parts of `#[sqlx(...)]` that change which column a field maps to.
fn parse_sqlx_options(attrs: &[Attribute]) -> Result<SqlxOptions> {
    let mut options = SqlxOptions::default();
    for attr in attrs {
        if !attr.path().is_ident("sqlx") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                options.rename = Some(value.value());
            } else if meta.input.peek(Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                let _content;
                syn::parenthesized!(_content in meta.input);
            }
            Ok(())
        })?;
    }
    Ok(options)
}

/// `Option<T>` / `Vec<T>` -> `T`
fn inner_type<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

/// Last path segment of a type, e.g. `DateTime` for `chrono::DateTime<Utc>`.
pub fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

fn parse_relation(field_ident: &Ident, ty: &Type, attr: &Attribute) -> Result<RelationInfo> {
    let mut kind = None;
    let mut join = None;
    let mut join_field = None;
    let mut persist = false;

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("has_one") {
            kind = Some(RelationKind::HasOne);
        } else if meta.path.is_ident("has_many") {
            kind = Some(RelationKind::HasMany);
        } else if meta.path.is_ident("persist") || meta.path.is_ident("update") {
            persist = true;
        } else if meta.path.is_ident("join") {
            join = Some(meta.value()?.parse::<LitStr>()?);
        } else if meta.path.is_ident("join_field") {
            join_field = Some(meta.value()?.parse::<LitStr>()?);
        } else {
            return Err(meta.error(
                "expected `has_one`, `has_many`, `join = \"base=join\"`, `join_field`, `persist` or `update`",
            ));
        }
        Ok(())
    })?;

    let kind = kind.ok_or_else(|| {
        Error::new_spanned(attr, "relation needs a kind: `has_one` or `has_many`")
    })?;
    let join = join.ok_or_else(|| {
        Error::new_spanned(attr, "relation needs `join = \"base_column=join_column\"`")
    })?;

    let join_value = join.value();
    let (base, joined) = join_value
        .split_once('=')
        .map(|(b, j)| (b.trim(), j.trim()))
        .ok_or_else(|| Error::new(join.span(), "join must look like \"base_column=join_column\""))?;
    validate_syn("join column", base, join.span())?;
    validate_syn("join column", joined, join.span())?;

    // A renamed join column lives in a field with a different name.
    let join_field = match join_field {
        Some(lit) => {
            let value = lit.value();
            validate_syn("join field", &value, lit.span())?;
            Ident::new(&value, lit.span())
        }
        None => Ident::new(joined, join.span()),
    };

    let related = match kind {
        RelationKind::HasOne => inner_type(ty, "Option").ok_or_else(|| {
            Error::new_spanned(ty, "has_one relation fields must be `Option<T>`")
        })?,
        RelationKind::HasMany => inner_type(ty, "Vec").ok_or_else(|| {
            Error::new_spanned(ty, "has_many relation fields must be `Vec<T>`")
        })?,
    };

    Ok(RelationInfo {
        ident: field_ident.clone(),
        kind,
        related: related.clone(),
        base_column: base.to_string(),
        join_column: joined.to_string(),
        join_field,
        persist,
    })
}

pub fn parse_fields(data: &Data) -> Result<FieldInfo> {
    let Data::Struct(data_struct) = data else {
        return Err(Error::new(
            proc_macro2::Span::call_site(),
            "Record can only be derived for structs",
        ));
    };
    let Fields::Named(fields_named) = &data_struct.fields else {
        return Err(Error::new(
            proc_macro2::Span::call_site(),
            "Record can only be derived for structs with named fields",
        ));
    };

    let mut columns = Vec::new();
    let mut relations = Vec::new();

    for field in &fields_named.named {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "field must have a name"))?;

        if let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("relation")) {
            relations.push(parse_relation(ident, &field.ty, attr)?);
            continue;
        }

        let sqlx = parse_sqlx_options(&field.attrs)?;
        if sqlx.skip {
            continue;
        }

        let column = sqlx.rename.unwrap_or_else(|| ident.to_string());
        validate_syn("column name", &column, ident.span())?;

        columns.push(ColumnInfo {
            ident: ident.clone(),
            column,
            ty: field.ty.clone(),
            primary_key: has_attribute(&field.attrs, "primary_key"),
        });
    }

    if columns.is_empty() {
        return Err(Error::new(
            proc_macro2::Span::call_site(),
            "Record needs at least one column",
        ));
    }

    let info = FieldInfo { columns, relations };
    for relation in &info.relations {
        if info.column(&relation.base_column).is_none() {
            return Err(Error::new_spanned(
                &relation.ident,
                format!("relation joins on unknown column '{}'", relation.base_column),
            ));
        }
    }

    Ok(info)
}
