use syn::{GenericArgument, PathArguments, Type};

#[derive(Debug)]
pub struct ForeignKeyInfo {
    pub referenced_table: String,
    pub related_rust_type: syn::Ident,
}

/// How a field travels between Rust and its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Bound and fetched as-is.
    Native,
    /// Stored as TEXT through `Display` / `FromStr` (enums).
    Text,
}

pub struct FieldData {
    pub name: String,
    pub ty: Type,
    /// `ty` with any `Option<..>` removed.
    pub inner_ty: Type,
    pub is_option: bool,
    pub is_pk: bool,
    pub storage: Storage,
    pub sql_type: String,
    pub foreign_key: Option<ForeignKeyInfo>,
    pub unique: bool,
    pub indexed: bool,
}

impl FieldData {
    /// `created_at` / `updated_at` are filled in by the database.
    pub fn is_db_timestamp(&self) -> bool {
        self.name == "created_at" || self.name == "updated_at"
    }
}

pub struct ObjectSpec {
    pub ident: syn::Ident,
    pub table_name: String,
    pub unique_indexes: Vec<Vec<String>>,
    pub fields: Vec<FieldData>,
}

impl ObjectSpec {
    pub fn pk(&self) -> Option<&FieldData> {
        self.fields.iter().find(|f| f.is_pk)
    }

    pub fn has_updated_at(&self) -> bool {
        self.fields.iter().any(|f| f.name == "updated_at")
    }
}

pub fn get_fully_qualified_type_string(ty: &Type) -> String {
    quote::quote!(#ty).to_string().replace(' ', "")
}

fn single_generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else { return None };
    let last_segment = type_path.path.segments.last()?;
    if last_segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(angle_args) = &last_segment.arguments else { return None };
    if angle_args.args.len() != 1 {
        return None;
    }
    match &angle_args.args[0] {
        GenericArgument::Type(inner_ty) => Some(inner_ty),
        _ => None,
    }
}

pub fn get_option_inner_type(ty: &Type) -> Option<&Type> {
    single_generic_arg(ty, "Option")
}

pub fn get_vec_inner_type(ty: &Type) -> Option<&Type> {
    single_generic_arg(ty, "Vec")
}

fn is_json_type(type_str: &str) -> bool {
    type_str.starts_with("Json<")
        || type_str.starts_with("::sqlx::types::Json<")
        || type_str.starts_with("sqlx::types::Json<")
}

/// SQL type for a scalar (non-Option) Rust type that sqlx encodes natively.
fn native_sql_type(type_str: &str) -> Option<&'static str> {
    let sql = match type_str {
        "String" | "std::string::String" => "TEXT",
        "i16" => "SMALLINT",
        "i32" => "INTEGER",
        "i64" => "BIGINT",
        "f32" => "REAL",
        "f64" => "DOUBLE PRECISION",
        "bool" => "BOOLEAN",
        "Vec<u8>" => "BYTEA",
        "Uuid" | "::sqlx::types::Uuid" | "sqlx::types::Uuid" | "uuid::Uuid" | "::uuid::Uuid" => "UUID",
        "DateTime<Utc>" | "::chrono::DateTime<::chrono::Utc>" | "chrono::DateTime<chrono::Utc>" => "TIMESTAMPTZ",
        "NaiveDate" | "::chrono::NaiveDate" | "chrono::NaiveDate" => "DATE",
        s if is_json_type(s) => "JSONB",
        _ => return None,
    };
    Some(sql)
}

/// Maps a field type to its SQL column type and storage strategy.
pub fn map_rust_type_to_sql(ty: &Type) -> Result<(String, Storage), String> {
    let type_str = get_fully_qualified_type_string(ty);

    if let Some(sql) = native_sql_type(&type_str) {
        return Ok((sql.to_string(), Storage::Native));
    }

    if let Some(inner) = get_vec_inner_type(ty) {
        let inner_str = get_fully_qualified_type_string(inner);
        return match native_sql_type(&inner_str) {
            Some(sql) if sql != "JSONB" && sql != "BYTEA" => Ok((format!("{}[]", sql), Storage::Native)),
            _ => Err(format!(
                "Vec<{}> cannot be stored as an SQL array; wrap it in Json<..> instead",
                inner_str
            )),
        };
    }

    if get_option_inner_type(ty).is_some() {
        return Err(format!("nested Option is not supported: {}", type_str));
    }

    match ty {
        Type::Path(_) => Ok(("TEXT".to_string(), Storage::Text)),
        _ => Err(format!("unsupported field type for SqlxObject: {}", type_str)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn maps_native_text_and_arrays() {
        let uuid: Type = parse_quote!(Uuid);
        assert_eq!(map_rust_type_to_sql(&uuid).unwrap(), ("UUID".to_string(), Storage::Native));

        let tier: Type = parse_quote!(BadgeTier);
        assert_eq!(map_rust_type_to_sql(&tier).unwrap(), ("TEXT".to_string(), Storage::Text));

        let tags: Type = parse_quote!(Vec<String>);
        assert_eq!(map_rust_type_to_sql(&tags).unwrap(), ("TEXT[]".to_string(), Storage::Native));

        let nested: Type = parse_quote!(Vec<Vec<u8>>);
        assert!(map_rust_type_to_sql(&nested).is_err());
    }

    #[test]
    fn unwraps_option() {
        let ty: Type = parse_quote!(Option<Uuid>);
        let inner = get_option_inner_type(&ty).unwrap();
        assert_eq!(get_fully_qualified_type_string(inner), "Uuid");
        assert!(get_option_inner_type(inner).is_none());
    }
}
