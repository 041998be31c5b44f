//! Locale-keyed label lookups with per-operation state.
//!
//! A label source is shared immutably across operations; the loaded catalog
//! is not. Each logical operation (an export, a send batch) loads its own
//! [`LabelCatalog`] and owns it for the duration of the operation, so two
//! operations running concurrently with different locales can never observe
//! each other's labels. Sharing one mutable catalog across operations is the
//! bug this layout rules out by construction.

use std::collections::HashMap;
use std::sync::Arc;

use tracing_error::SpanTrace;

/// Trait implemented by sources of localized country names.
///
/// Implementations are read-only and safe to share across concurrent
/// operations.
#[async_trait::async_trait]
pub trait LoadLabels: Send + Sync {
    /// Produce the ISO 3166 alpha-2 code to country-name map for a locale.
    async fn country_names(&self, locale: &str) -> Result<HashMap<String, String>, LabelsError>;
}

/// Country-name catalog loaded for one logical operation.
///
/// Owned by the operation that loaded it; never shared mutably.
#[derive(Debug, Clone)]
pub struct LabelCatalog {
    locale: String,
    names: HashMap<String, String>,
}

impl LabelCatalog {
    /// Load a catalog for `locale` from the given source.
    #[tracing::instrument(skip(source))]
    pub async fn load(source: &dyn LoadLabels, locale: &str) -> Result<Self, LabelsError> {
        let names = source.country_names(locale).await?;
        tracing::debug!(locale, entries = names.len(), "Loaded label catalog");
        Ok(Self {
            locale: locale.to_owned(),
            names,
        })
    }

    /// The locale this catalog was loaded for.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Look up a country name by ISO code. Case-insensitive.
    pub fn country_name(&self, iso2_code: &str) -> Option<&str> {
        self.names
            .get(&iso2_code.to_uppercase())
            .map(String::as_str)
    }
}

/// Static in-memory label source for tests and demos.
#[derive(Clone, Default)]
pub struct StaticLabels {
    locales: Arc<HashMap<String, HashMap<String, String>>>,
}

impl StaticLabels {
    /// Build a source from `(locale, iso2, name)` triples.
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let mut locales: HashMap<String, HashMap<String, String>> = HashMap::new();
        for (locale, code, name) in entries {
            locales
                .entry(locale.to_owned())
                .or_default()
                .insert(code.to_uppercase(), name.to_owned());
        }
        Self {
            locales: Arc::new(locales),
        }
    }
}

#[async_trait::async_trait]
impl LoadLabels for StaticLabels {
    async fn country_names(&self, locale: &str) -> Result<HashMap<String, String>, LabelsError> {
        self.locales
            .get(locale)
            .cloned()
            .ok_or_else(|| LabelsError::unknown_locale(locale))
    }
}

/// Error raised by label sources.
#[derive(Debug)]
pub struct LabelsError {
    context: SpanTrace,
    kind: LabelsErrorKind,
}

/// Label error kinds.
#[derive(Debug)]
pub enum LabelsErrorKind {
    /// The source has no data for the requested locale.
    UnknownLocale(String),
    /// The underlying source failed.
    Source(tower::BoxError),
}

impl LabelsError {
    fn unknown_locale(locale: &str) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind: LabelsErrorKind::UnknownLocale(locale.to_owned()),
        }
    }

    /// Create a source-related label error.
    pub fn from_source(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind: LabelsErrorKind::Source(err),
        }
    }

    /// The error kind.
    pub fn kind(&self) -> &LabelsErrorKind {
        &self.kind
    }
}

impl std::fmt::Display for LabelsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            LabelsErrorKind::UnknownLocale(locale) => writeln!(f, "Unknown locale: {locale}"),
            LabelsErrorKind::Source(err) => writeln!(f, "Source error: {err}"),
        }?;
        self.context.fmt(f)
    }
}

impl std::error::Error for LabelsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            LabelsErrorKind::UnknownLocale(_) => None,
            LabelsErrorKind::Source(err) => Some(err.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> StaticLabels {
        StaticLabels::new([
            ("en", "RO", "Romania"),
            ("en", "ES", "Spain"),
            ("fr", "RO", "Roumanie"),
            ("fr", "ES", "Espagne"),
        ])
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let catalog = LabelCatalog::load(&source(), "en").await.unwrap();
        assert_eq!(catalog.country_name("rO"), Some("Romania"));
        assert_eq!(catalog.country_name("ES"), Some("Spain"));
        assert_eq!(catalog.country_name("XX"), None);
    }

    #[tokio::test]
    async fn unknown_locale_is_an_error() {
        let err = LabelCatalog::load(&source(), "de").await.unwrap_err();
        assert!(matches!(err.kind(), LabelsErrorKind::UnknownLocale(_)));
    }

    #[tokio::test]
    async fn concurrent_operations_do_not_share_state() {
        let labels = source();

        // Each task loads and owns its own catalog; a shared mutable catalog
        // would let one locale's load leak into the other task's lookups.
        let en = {
            let labels = labels.clone();
            tokio::spawn(async move {
                let catalog = LabelCatalog::load(&labels, "en").await.unwrap();
                tokio::task::yield_now().await;
                catalog.country_name("RO").map(str::to_owned)
            })
        };
        let fr = {
            let labels = labels.clone();
            tokio::spawn(async move {
                let catalog = LabelCatalog::load(&labels, "fr").await.unwrap();
                tokio::task::yield_now().await;
                catalog.country_name("RO").map(str::to_owned)
            })
        };

        assert_eq!(en.await.unwrap().as_deref(), Some("Romania"));
        assert_eq!(fr.await.unwrap().as_deref(), Some("Roumanie"));
    }
}
