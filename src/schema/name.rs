use heck::ToUpperCamelCase;

/// Deconstructed local name of an ontology resource.
///
/// CIDOC CRM resources end in names like `E21_Person` or
/// `P74_has_current_or_former_residence`. Three derived forms are kept: the
/// type identifier (`E21Person`), the safe accessor name (`E21_Person`) and
/// the bare code (`E21`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalName {
    type_name: String,
    safe_name: String,
    code: String,
}

impl LocalName {
    /// Splits the fragment (or final path segment) of an IRI into naming parts.
    #[must_use]
    pub fn parse(iri: &str) -> Self {
        let delimiter = if iri.contains('#') { '#' } else { '/' };
        let raw = iri
            .trim_end_matches(delimiter)
            .rsplit(delimiter)
            .next()
            .unwrap_or(iri);
        let safe_name = raw.replace('-', "_");
        let type_name = safe_name.to_upper_camel_case();
        let code = safe_name
            .split('_')
            .next()
            .unwrap_or(safe_name.as_str())
            .to_owned();
        Self {
            type_name,
            safe_name,
            code,
        }
    }

    /// Normalized type identifier, e.g. `E21Person`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Accessor-safe form of the original local name, e.g. `E21_Person`.
    #[must_use]
    pub fn safe_name(&self) -> &str {
        &self.safe_name
    }

    /// Leading CRM code, e.g. `E21` or `P74`.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Inverse property declarations carry an `i` suffix on their code
    /// (`P74i_is_current_or_former_residence_of`) and duplicate the forward
    /// declaration.
    #[must_use]
    pub fn is_inverse(&self) -> bool {
        self.code.len() > 1 && self.code.ends_with('i')
    }
}
