use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_quote, Ident, Type};

use super::types::{FieldData, ObjectSpec, Storage};

fn quoted(name: &str) -> String {
    format!("\"{}\"", name)
}

fn all_columns_sql(spec: &ObjectSpec) -> String {
    spec.fields.iter().map(|f| quoted(&f.name)).collect::<Vec<_>>().join(", ")
}

fn insert_fields(spec: &ObjectSpec) -> Vec<&FieldData> {
    spec.fields.iter().filter(|f| !f.is_db_timestamp()).collect()
}

fn update_fields(spec: &ObjectSpec) -> Vec<&FieldData> {
    spec.fields.iter().filter(|f| !f.is_db_timestamp() && !f.is_pk).collect()
}

pub fn generate_row_struct(row_struct_name: &Ident, spec: &ObjectSpec) -> TokenStream {
    let defs = spec.fields.iter().map(|field| {
        let field_ident = format_ident!("{}", field.name);
        let row_ty: Type = match (field.storage, field.is_option) {
            (Storage::Text, true) => parse_quote!(Option<String>),
            (Storage::Text, false) => parse_quote!(String),
            (Storage::Native, _) => field.ty.clone(),
        };
        quote! { pub #field_ident: #row_ty }
    });

    quote! {
        #[derive(::sqlx::FromRow, Debug, Clone)]
        #[doc(hidden)]
        pub struct #row_struct_name {
            #(#defs),*
        }
    }
}

fn generate_from_row_assignments(spec: &ObjectSpec) -> Vec<TokenStream> {
    spec.fields.iter().map(|field| {
        let field_ident = format_ident!("{}", field.name);
        let column = &field.name;
        let inner_ty = &field.inner_ty;
        let decode_err = quote! {
            |e| ::sqlx::Error::Decode(format!("column `{}`: {}", #column, e).into())
        };

        match (field.storage, field.is_option) {
            (Storage::Native, _) => quote! { #field_ident: row.#field_ident },
            (Storage::Text, false) => quote! {
                #field_ident: row.#field_ident.parse::<#inner_ty>().map_err(#decode_err)?
            },
            (Storage::Text, true) => quote! {
                #field_ident: match row.#field_ident {
                    Some(raw) => Some(raw.parse::<#inner_ty>().map_err(#decode_err)?),
                    None => None,
                }
            },
        }
    }).collect()
}

fn generate_bind(field: &FieldData) -> TokenStream {
    let field_ident = format_ident!("{}", field.name);
    match (field.storage, field.is_option) {
        (Storage::Native, _) => quote! { .bind(self.#field_ident.clone()) },
        (Storage::Text, false) => quote! { .bind(self.#field_ident.to_string()) },
        (Storage::Text, true) => quote! { .bind(self.#field_ident.as_ref().map(|v| v.to_string())) },
    }
}

/// Returns the CREATE TABLE statement and the CREATE INDEX statements.
pub fn generate_create_table_sql(spec: &ObjectSpec) -> (String, Vec<String>) {
    let table = &spec.table_name;
    let mut parts: Vec<String> = Vec::new();
    let mut constraints: Vec<String> = Vec::new();
    let mut indexes: Vec<String> = Vec::new();

    for field in &spec.fields {
        let mut col_def = vec![quoted(&field.name)];

        if field.is_pk {
            col_def.push(field.sql_type.clone());
            col_def.push("PRIMARY KEY".to_string());
            if field.sql_type == "UUID" {
                col_def.push("DEFAULT gen_random_uuid()".to_string());
            }
        } else if field.is_db_timestamp() {
            col_def.push("BIGINT NOT NULL DEFAULT floor(extract(epoch from now()))".to_string());
        } else {
            col_def.push(field.sql_type.clone());
            if !field.is_option {
                col_def.push("NOT NULL".to_string());
            }
            if field.unique {
                col_def.push("UNIQUE".to_string());
            }
        }
        parts.push(col_def.join(" "));

        if let Some(fk) = &field.foreign_key {
            let on_delete = if field.is_option { "SET NULL" } else { "CASCADE" };
            constraints.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}(\"id\") ON DELETE {} ON UPDATE CASCADE",
                quoted(&field.name), quoted(&fk.referenced_table), on_delete
            ));
        }

        if field.indexed || (field.foreign_key.is_some() && !field.unique) {
            indexes.push(format!(
                "CREATE INDEX IF NOT EXISTS \"idx_{}_{}\" ON {}({})",
                table, field.name, quoted(table), quoted(&field.name)
            ));
        }
    }

    for columns in &spec.unique_indexes {
        constraints.push(format!(
            "CONSTRAINT \"uq_{}_{}\" UNIQUE ({})",
            table,
            columns.join("_"),
            columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ")
        ));
    }

    parts.extend(constraints);
    let create = format!("CREATE TABLE IF NOT EXISTS {} ({})", quoted(table), parts.join(", "));
    (create, indexes)
}

pub fn generate_insert_sql(spec: &ObjectSpec, if_absent: bool) -> String {
    let fields = insert_fields(spec);
    let columns = fields.iter().map(|f| quoted(&f.name)).collect::<Vec<_>>().join(", ");
    let placeholders = (1..=fields.len()).map(|i| format!("${}", i)).collect::<Vec<_>>().join(", ");
    let conflict = if if_absent { " ON CONFLICT DO NOTHING" } else { "" };

    format!(
        "INSERT INTO {} ({}) VALUES ({}){} RETURNING {}",
        quoted(&spec.table_name), columns, placeholders, conflict, all_columns_sql(spec)
    )
}

pub fn generate_update_sql(spec: &ObjectSpec) -> String {
    let fields = update_fields(spec);
    if fields.is_empty() {
        return format!(
            "SELECT {} FROM {} WHERE \"id\" = $1",
            all_columns_sql(spec), quoted(&spec.table_name)
        );
    }

    let set_clauses = fields.iter().enumerate()
        .map(|(i, f)| format!("{} = ${}", quoted(&f.name), i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "UPDATE {} SET {} WHERE \"id\" = ${} RETURNING {}",
        quoted(&spec.table_name), set_clauses, fields.len() + 1, all_columns_sql(spec)
    )
}

pub fn generate_trigger_sql(spec: &ObjectSpec) -> String {
    if !spec.has_updated_at() {
        return String::new();
    }
    format!(
        "DROP TRIGGER IF EXISTS {trigger} ON \"{table}\"; CREATE TRIGGER {trigger} BEFORE UPDATE ON \"{table}\" FOR EACH ROW EXECUTE PROCEDURE set_updated_at_unix_timestamp();",
        trigger = format!("set_updated_at_{}", spec.table_name),
        table = spec.table_name
    )
}

pub fn generate_sqlx_schema_impl(spec: &ObjectSpec, row_struct_name: &Ident) -> TokenStream {
    let struct_name = &spec.ident;
    let table_name = &spec.table_name;
    let pk_ty = spec.pk().map(|f| f.ty.clone()).unwrap_or_else(|| parse_quote!(::sqlx::types::Uuid));

    let columns: Vec<&String> = spec.fields.iter().map(|f| &f.name).collect();
    let from_row_assignments = generate_from_row_assignments(spec);

    let (create_table_sql, index_sqls) = generate_create_table_sql(spec);
    let drop_table_sql = format!("DROP TABLE IF EXISTS \"{}\" CASCADE", table_name);
    let insert_sql = generate_insert_sql(spec, false);
    let insert_if_absent_sql = generate_insert_sql(spec, true);
    let update_sql = generate_update_sql(spec);
    let trigger_sql = generate_trigger_sql(spec);

    quote! {
        #[automatically_derived]
        impl ::agora_database::SqlxSchema for #struct_name {
            type Id = #pk_ty;
            type Row = #row_struct_name;

            const TABLE_NAME: &'static str = #table_name;
            const ID_COLUMN_NAME: &'static str = "id";
            const COLUMNS: &'static [&'static str] = &[#( #columns ),*];
            const INDEXES_SQL: &'static [&'static str] = &[#( #index_sqls ),*];

            fn get_id_value(&self) -> Self::Id { self.id.clone() }

            fn from_row(row: Self::Row) -> Result<Self, ::sqlx::Error> {
                Ok(Self {
                    #(#from_row_assignments),*
                })
            }

            fn create_table_sql() -> String { #create_table_sql.to_string() }
            fn drop_table_sql() -> String { #drop_table_sql.to_string() }
            fn insert_sql() -> String { #insert_sql.to_string() }
            fn insert_if_absent_sql() -> String { #insert_if_absent_sql.to_string() }
            fn update_by_id_sql() -> String { #update_sql.to_string() }
            fn trigger_sql() -> String { #trigger_sql.to_string() }
        }
    }
}

pub fn generate_sqlx_crud_impl(spec: &ObjectSpec) -> TokenStream {
    let struct_name = &spec.ident;
    let insert_bindings: Vec<TokenStream> = insert_fields(spec).into_iter().map(generate_bind).collect();
    let update_bindings: Vec<TokenStream> = update_fields(spec).into_iter().map(generate_bind).collect();

    quote! {
        #[automatically_derived]
        #[::async_trait::async_trait]
        impl ::agora_database::SqlxCrud for #struct_name {
            fn bind_insert<'q>(
                &self,
                query: ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::agora_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments>
            ) -> ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::agora_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments> {
                query #(#insert_bindings)*
            }

            fn bind_update<'q>(
                &self,
                query: ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::agora_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments>
            ) -> ::sqlx::query::QueryAs<'q, ::sqlx::Postgres, <Self as ::agora_database::SqlxSchema>::Row, ::sqlx::postgres::PgArguments> {
                query #(#update_bindings)* .bind(self.id.clone())
            }
        }

        #[automatically_derived]
        #[::async_trait::async_trait]
        impl ::agora_database::SqlxFilterQuery for #struct_name {}
    }
}

pub fn generate_fetch_helpers(spec: &ObjectSpec) -> TokenStream {
    let struct_name = &spec.ident;
    let methods: Vec<TokenStream> = spec.fields.iter().filter_map(|field| {
        let fk = field.foreign_key.as_ref()?;
        let field_ident = format_ident!("{}", field.name);
        let method_name = format_ident!("fetch_{}", field.name);
        let related_type = &fk.related_rust_type;

        let lookup = quote! {
            <#related_type as ::agora_database::SqlxFilterQuery>::find_one_by_criteria(
                ::agora_database::QueryCriteria::by_id(id),
                executor,
            ).await
        };

        let body = if field.is_option {
            quote! {
                match self.#field_ident.clone() {
                    Some(id) => #lookup,
                    None => Ok(None),
                }
            }
        } else {
            quote! {
                let id = self.#field_ident.clone();
                #lookup
            }
        };

        Some(quote! {
            pub async fn #method_name<'exe, E>(&self, executor: E) -> Result<Option<#related_type>, ::sqlx::Error>
            where
                E: ::sqlx::Executor<'exe, Database = ::sqlx::Postgres> + Send,
            {
                #body
            }
        })
    }).collect();

    if methods.is_empty() {
        return TokenStream::new();
    }

    quote! {
        #[automatically_derived]
        impl #struct_name {
            #(#methods)*
        }
    }
}
