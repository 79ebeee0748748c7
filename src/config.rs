//! Build configuration.

use serde::{Deserialize, Serialize};

/// Settings driving one model build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Locator handed to the schema loader: URL, filesystem path, or raw
    /// RDF/XML document.
    pub schema: String,
    /// Policy applied when a property names a class absent from the schema.
    #[serde(default)]
    pub unresolved: UnresolvedPolicy,
}

impl ModelSettings {
    /// Creates settings for the supplied schema locator with the strict
    /// reference policy.
    #[must_use]
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            unresolved: UnresolvedPolicy::default(),
        }
    }

    /// Parses settings from a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

/// What to do when a property's domain or range names an unknown class.
///
/// The strict default aborts the build; the lenient variant documents the
/// alternative of treating the reference as unconstrained, which attaches
/// the relationship to the hierarchy roots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// Abort the build with an unresolved-reference error.
    #[default]
    Fail,
    /// Downgrade the reference to an unconstrained relationship end.
    Unconstrained,
}

#[cfg(test)]
mod tests {
    use super::{ModelSettings, UnresolvedPolicy};

    #[test]
    fn defaults_to_the_strict_policy() {
        let settings = ModelSettings::new("https://example.org/crm.rdfs.xml");
        assert_eq!(settings.unresolved, UnresolvedPolicy::Fail);
    }

    #[test]
    fn parses_yaml_settings() {
        let settings = ModelSettings::from_yaml(
            "schema: /srv/ontology/cidoc_crm_v7.1.3.rdfs.xml\nunresolved: unconstrained\n",
        )
        .expect("valid settings");
        assert_eq!(settings.schema, "/srv/ontology/cidoc_crm_v7.1.3.rdfs.xml");
        assert_eq!(settings.unresolved, UnresolvedPolicy::Unconstrained);
    }
}
