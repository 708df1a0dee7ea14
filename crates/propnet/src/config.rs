/// Knobs of a single compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileConfig {
    /// Normalization passes before giving up on reaching a fixed point.
    pub max_normalization_passes: usize,
    /// Duplicate rules whose variables stand for compound terms, once per compound shape.
    pub specialize_compound_variables: bool,
    /// Largest number of assignments a single domain may grow to.
    pub max_domain_size: Option<usize>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            max_normalization_passes: 64,
            specialize_compound_variables: true,
            max_domain_size: None,
        }
    }
}

impl CompileConfig {
    pub fn new(
        max_normalization_passes: usize,
        specialize_compound_variables: bool,
        max_domain_size: Option<usize>,
    ) -> Self {
        Self {
            max_normalization_passes,
            specialize_compound_variables,
            max_domain_size,
        }
    }

    /// No domain limit and a generous pass budget, for large descriptions.
    pub fn permissive() -> Self {
        Self {
            max_normalization_passes: 1024,
            specialize_compound_variables: true,
            max_domain_size: None,
        }
    }

    /// Fails fast on descriptions whose grounding explodes.
    pub fn strict() -> Self {
        Self {
            max_normalization_passes: 16,
            specialize_compound_variables: true,
            max_domain_size: Some(1 << 16),
        }
    }
}
