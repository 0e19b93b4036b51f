//! Derive macros for pgcompose
//!
//! Provides `#[derive(RowFields)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod row_fields;

/// Derive `RowFields` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use pgcompose::RowFields;
///
/// #[derive(RowFields)]
/// struct Ad {
///     id: i64,
///     #[fields(column = "pdf_url")]
///     pdf: Option<String>,
///     #[fields(skip)]
///     cached_html: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[fields(column = "name")]` - Map field to a different column name
/// - `#[fields(skip)]` - Leave the field out of the map
///
/// Columns default to the lowercased field name. Field types must be `Clone` and convert into
/// `pgcompose::Value`.
#[proc_macro_derive(RowFields, attributes(fields))]
pub fn derive_row_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    row_fields::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
