use quote::format_ident;
use syn::{Attribute, Data, DeriveInput, Error, Field, Fields, Lit, Meta, NestedMeta};

use super::types::{
    get_option_inner_type, map_rust_type_to_sql, FieldData, ForeignKeyInfo, ObjectSpec,
};

fn parse_table_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    for attr in attrs {
        if !attr.path.is_ident("table_name") {
            continue;
        }
        return match attr.parse_meta()? {
            Meta::NameValue(mnv) => match mnv.lit {
                Lit::Str(lit_str) => Ok(Some(lit_str.value())),
                other => Err(Error::new_spanned(other, "table_name attribute value must be a string literal")),
            },
            other => Err(Error::new_spanned(
                other,
                "table_name attribute must be a name-value pair like #[table_name = \"my_table\"]",
            )),
        };
    }
    Ok(None)
}

/// `#[unique_index("user_id", "badge_id")]`, may be repeated.
fn parse_unique_indexes(attrs: &[Attribute]) -> syn::Result<Vec<Vec<String>>> {
    let mut indexes = Vec::new();
    for attr in attrs {
        if !attr.path.is_ident("unique_index") {
            continue;
        }
        let Meta::List(meta_list) = attr.parse_meta()? else {
            return Err(Error::new_spanned(attr, "unique_index expects a list of column names"));
        };
        let mut columns = Vec::new();
        for nested in meta_list.nested.iter() {
            match nested {
                NestedMeta::Lit(Lit::Str(lit_str)) => columns.push(lit_str.value()),
                other => return Err(Error::new_spanned(other, "unique_index columns must be string literals")),
            }
        }
        if columns.len() < 2 {
            return Err(Error::new_spanned(attr, "unique_index needs at least two columns; use #[unique] for one"));
        }
        indexes.push(columns);
    }
    Ok(indexes)
}

fn parse_foreign_key_attr(field: &Field) -> syn::Result<Option<ForeignKeyInfo>> {
    for attr in field.attrs.iter() {
        if !attr.path.is_ident("foreign_key") {
            continue;
        }
        let Meta::List(meta_list) = attr.parse_meta()? else {
            return Err(Error::new_spanned(attr, "foreign_key must be a list like #[foreign_key(referenced_table = \"users\", related_rust_type = \"User\")]"));
        };

        let mut referenced_table = None;
        let mut related_rust_type = None;
        for nested in meta_list.nested.iter() {
            if let NestedMeta::Meta(Meta::NameValue(mnv)) = nested {
                if let Lit::Str(lit_str) = &mnv.lit {
                    if mnv.path.is_ident("referenced_table") {
                        referenced_table = Some(lit_str.value());
                    } else if mnv.path.is_ident("related_rust_type") {
                        related_rust_type = Some(format_ident!("{}", lit_str.value()));
                    }
                }
            }
        }

        return match (referenced_table, related_rust_type) {
            (Some(referenced_table), Some(related_rust_type)) => Ok(Some(ForeignKeyInfo {
                referenced_table,
                related_rust_type,
            })),
            _ => Err(Error::new_spanned(attr, "foreign_key needs both referenced_table and related_rust_type")),
        };
    }
    Ok(None)
}

fn has_flag_attr(field: &Field, name: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path.is_ident(name))
}

fn parse_field(field: &Field) -> syn::Result<FieldData> {
    let field_ident = field.ident.as_ref()
        .ok_or_else(|| Error::new_spanned(field, "SqlxObject fields must be named"))?;

    let inner_ty = get_option_inner_type(&field.ty).cloned();
    let is_option = inner_ty.is_some();
    let inner_ty = inner_ty.unwrap_or_else(|| field.ty.clone());

    let (sql_type, storage) = map_rust_type_to_sql(&inner_ty)
        .map_err(|msg| Error::new_spanned(&field.ty, msg))?;

    let is_pk = field_ident == "id";
    if is_pk && is_option {
        return Err(Error::new_spanned(field, "the `id` primary key cannot be optional"));
    }

    Ok(FieldData {
        name: field_ident.to_string(),
        ty: field.ty.clone(),
        inner_ty,
        is_option,
        is_pk,
        storage,
        sql_type,
        foreign_key: parse_foreign_key_attr(field)?,
        unique: has_flag_attr(field, "unique"),
        indexed: has_flag_attr(field, "indexed"),
    })
}

pub fn parse_object(input: &DeriveInput) -> syn::Result<ObjectSpec> {
    let Data::Struct(data_struct) = &input.data else {
        return Err(Error::new_spanned(&input.ident, "SqlxObject can only be derived for structs"));
    };
    let Fields::Named(named) = &data_struct.fields else {
        return Err(Error::new_spanned(&input.ident, "SqlxObject requires named fields"));
    };

    let table_name = parse_table_name(&input.attrs)?
        .ok_or_else(|| Error::new_spanned(&input.ident, "missing #[table_name = \"...\"] attribute"))?;

    let fields = named.named.iter()
        .map(parse_field)
        .collect::<syn::Result<Vec<_>>>()?;

    let unique_indexes = parse_unique_indexes(&input.attrs)?;
    for columns in &unique_indexes {
        for column in columns {
            if !fields.iter().any(|f| &f.name == column) {
                return Err(Error::new_spanned(
                    &input.ident,
                    format!("unique_index refers to unknown column `{}`", column),
                ));
            }
        }
    }

    let spec = ObjectSpec {
        ident: input.ident.clone(),
        table_name,
        unique_indexes,
        fields,
    };

    if spec.pk().is_none() {
        return Err(Error::new_spanned(&input.ident, "SqlxObject requires an `id` field"));
    }

    Ok(spec)
}
