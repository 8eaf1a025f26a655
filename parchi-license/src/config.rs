//! Embedded secret material for the license scheme.

/// Fixed secret/salt configuration, constructed once at startup.
///
/// These values ship inside the distributed client binary and are NOT a
/// real secret boundary: anyone who can run the client can extract
/// them. Their job is to raise the cost of casual tampering and license
/// sharing, nothing more. Any confidentiality claim about the license
/// scheme must be scoped accordingly.
#[derive(Debug, Clone)]
pub struct SecretConfig {
    /// Secret appended to every digest input.
    pub secret: String,
    /// Additional salt mixed into envelope key material.
    pub salt: String,
    /// Schema version written into new bundles.
    pub schema_version: String,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            secret: "mYp@rCh1_2024_$ecure_K3y!".to_string(),
            salt: "mP_sAlt_2024_x!9@".to_string(),
            schema_version: "v2.0.0".to_string(),
        }
    }
}
