//! Derive macros for `crudless` request types.
//!
//! `#[derive(Request)]` and `#[derive(PolicyBase)]` turn `#[crudless(...)]`
//! marker attributes into the trait implementations the mediator reads when
//! it plans a request's decorator chain.
//!
//! ```rust,ignore
//! #[derive(PolicyBase)]
//! #[crudless(name = "read-only", skip_transaction)]
//! struct ReadOnly;
//!
//! #[derive(Request)]
//! #[crudless(result = Vec<Todo>, maybe_validate, base = ReadOnly)]
//! struct SearchTodos { query: String }
//! ```

mod attribute_parser;
mod code_generator;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Implements `crudless::Request`.
///
/// Keys: `result = Type` (defaults to `NoResult`), `base = Path`,
/// `skip_validation`, `validate`, `maybe_validate`, `skip_transaction`.
#[proc_macro_derive(Request, attributes(crudless))]
pub fn derive_request(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    code_generator::generate_request_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `crudless::PolicyBase`.
///
/// Keys: `name = "..."` (defaults to the type name), `base = Path` and the
/// same marker flags as `Request`.
#[proc_macro_derive(PolicyBase, attributes(crudless))]
pub fn derive_policy_base(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    code_generator::generate_policy_base_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
