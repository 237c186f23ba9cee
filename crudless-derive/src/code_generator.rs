use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::attribute_parser::{PolicyAttributes, parse_policy_attributes};

/// Builds the `RequestPolicy` expression for the parsed markers.
fn policy_expr(attrs: &PolicyAttributes) -> TokenStream {
    let mut calls = Vec::new();
    if attrs.skip_validation {
        calls.push(quote! { .skip_validation() });
    }
    if attrs.validate {
        calls.push(quote! { .validate() });
    }
    if attrs.maybe_validate {
        calls.push(quote! { .maybe_validate() });
    }
    if attrs.skip_transaction {
        calls.push(quote! { .skip_transaction() });
    }
    for base in &attrs.bases {
        calls.push(quote! { .with_base::<#base>() });
    }

    quote! { ::crudless::RequestPolicy::new() #(#calls)* }
}

/// `policy()` is only emitted when a marker is present so the trait default
/// stays in effect otherwise.
fn policy_fn(attrs: &PolicyAttributes) -> TokenStream {
    if !attrs.has_markers() {
        return TokenStream::new();
    }
    let policy = policy_expr(attrs);
    quote! {
        fn policy() -> ::crudless::RequestPolicy {
            #policy
        }
    }
}

pub(crate) fn generate_request_impl(input: &DeriveInput) -> syn::Result<TokenStream> {
    let attrs = parse_policy_attributes(&input.attrs)?;
    if let Some(name) = &attrs.name {
        return Err(syn::Error::new_spanned(
            &input.ident,
            format!("`name = \"{name}\"` is only valid on #[derive(PolicyBase)]"),
        ));
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let result = attrs
        .result
        .as_ref()
        .map_or_else(|| quote! { ::crudless::NoResult }, |ty| quote! { #ty });
    let policy = policy_fn(&attrs);

    Ok(quote! {
        impl #impl_generics ::crudless::Request for #ident #ty_generics #where_clause {
            type Result = #result;
            #policy
        }
    })
}

pub(crate) fn generate_policy_base_impl(input: &DeriveInput) -> syn::Result<TokenStream> {
    let attrs = parse_policy_attributes(&input.attrs)?;
    if attrs.result.is_some() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "`result` is only valid on #[derive(Request)]",
        ));
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let name = attrs.name.clone().unwrap_or_else(|| ident.to_string());
    let policy = policy_fn(&attrs);

    Ok(quote! {
        impl #impl_generics ::crudless::PolicyBase for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
            #policy
        }
    })
}
