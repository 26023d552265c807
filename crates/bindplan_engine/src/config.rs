//! Generation run configuration.

/// Settings that influence a generation run.
///
/// ```
/// use bindplan_engine::GeneratorConfig;
///
/// let config = GeneratorConfig::default()
///     .with_module_name("geometry")
///     .with_emit_docs(false);
/// assert_eq!(config.module_name, "geometry");
/// assert!(config.warn_on_unknown_base);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Name of the module being generated; consulted by `only_expose_in`.
    pub module_name: String,
    /// Warn when `hide_base`/`inline_base` names a class that is not a base.
    pub warn_on_unknown_base: bool,
    /// Attach documentation comments to emitted records.
    pub emit_docs: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            module_name: "module".to_string(),
            warn_on_unknown_base: true,
            emit_docs: true,
        }
    }
}

impl GeneratorConfig {
    /// Sets the module name.
    #[must_use]
    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    /// Enables or disables `unknown-base` warnings.
    #[must_use]
    pub fn with_unknown_base_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_unknown_base = enabled;
        self
    }

    /// Enables or disables documentation in records.
    #[must_use]
    pub fn with_emit_docs(mut self, enabled: bool) -> Self {
        self.emit_docs = enabled;
        self
    }
}
