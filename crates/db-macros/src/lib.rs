//! `#[derive(SqlxObject)]`: PostgreSQL table mapping for plain structs.
//!
//! Struct attributes:
//! - `#[table_name = "users"]` (required)
//! - `#[unique_index("user_id", "badge_id")]` composite unique constraint, repeatable
//!
//! Field attributes:
//! - `#[foreign_key(referenced_table = "users", related_rust_type = "User")]`
//!   adds the constraint, an index and a `fetch_<field>` helper
//! - `#[unique]`, `#[indexed]`
//!
//! The `id` field is the primary key and decides `SqlxSchema::Id`. `created_at`
//! and `updated_at` are filled in by the database. Fields whose type is not a
//! native sqlx type are stored as TEXT through `Display` and `FromStr`.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, DeriveInput};

mod internals;

use internals::codegen::{
    generate_fetch_helpers, generate_row_struct, generate_sqlx_crud_impl, generate_sqlx_schema_impl,
};
use internals::parse::parse_object;

#[proc_macro_derive(SqlxObject, attributes(table_name, unique_index, foreign_key, unique, indexed))]
pub fn sqlx_object_derive(input: TokenStream) -> TokenStream {
    let input_ast = parse_macro_input!(input as DeriveInput);

    let spec = match parse_object(&input_ast) {
        Ok(spec) => spec,
        Err(err) => return err.to_compile_error().into(),
    };

    let row_struct_name = format_ident!("{}Row", spec.ident);

    let row_struct = generate_row_struct(&row_struct_name, &spec);
    let schema_impl = generate_sqlx_schema_impl(&spec, &row_struct_name);
    let crud_impl = generate_sqlx_crud_impl(&spec);
    let fetch_helpers = generate_fetch_helpers(&spec);

    TokenStream::from(quote! {
        #row_struct
        #schema_impl
        #crud_impl
        #fetch_helpers
    })
}
