use syn::{Attribute, LitStr, Path, Type};

/// Markers collected from every `#[crudless(...)]` attribute on a type.
#[derive(Default)]
pub(crate) struct PolicyAttributes {
    pub result: Option<Type>,
    pub name: Option<String>,
    pub skip_validation: bool,
    pub validate: bool,
    pub maybe_validate: bool,
    pub skip_transaction: bool,
    pub bases: Vec<Path>,
}

impl PolicyAttributes {
    pub fn has_markers(&self) -> bool {
        self.skip_validation
            || self.validate
            || self.maybe_validate
            || self.skip_transaction
            || !self.bases.is_empty()
    }
}

/// Parses `#[crudless(...)]` attributes.
///
/// Accepted keys: `result = Type`, `name = "..."`, `base = Path` (repeatable)
/// and the flags `skip_validation`, `validate`, `maybe_validate`,
/// `skip_transaction`.
pub(crate) fn parse_policy_attributes(attrs: &[Attribute]) -> syn::Result<PolicyAttributes> {
    let mut parsed = PolicyAttributes::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("crudless")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip_validation") {
                parsed.skip_validation = true;
            } else if meta.path.is_ident("validate") {
                parsed.validate = true;
            } else if meta.path.is_ident("maybe_validate") {
                parsed.maybe_validate = true;
            } else if meta.path.is_ident("skip_transaction") {
                parsed.skip_transaction = true;
            } else if meta.path.is_ident("base") {
                parsed.bases.push(meta.value()?.parse::<Path>()?);
            } else if meta.path.is_ident("result") {
                if parsed.result.is_some() {
                    return Err(meta.error("duplicate `result` key"));
                }
                parsed.result = Some(meta.value()?.parse::<Type>()?);
            } else if meta.path.is_ident("name") {
                parsed.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error(
                    "unknown crudless key; expected one of: result, name, base, \
                     skip_validation, validate, maybe_validate, skip_transaction",
                ));
            }
            Ok(())
        })?;
    }

    if parsed.skip_validation && (parsed.validate || parsed.maybe_validate) {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "`skip_validation` cannot be combined with `validate` or `maybe_validate`",
        ));
    }

    Ok(parsed)
}
