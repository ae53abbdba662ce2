// toolgate-mcp/src/embedded.rs
// ============================================================================
// Module: Embedded Configurations
// Description: YAML documents compiled into the binary.
// Purpose: Ship runnable sample configurations for --embedded-config.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! A small set of sample documents is embedded so the gateway can start
//! without any file on disk. Embedded documents still pass through the
//! template preprocessor, so they may reference environment variables.

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Embedded documents by filename.
const EMBEDDED: &[(&str, &str)] = &[
    ("echo.yaml", include_str!("../configs/echo.yaml")),
    ("guarded-echo.yaml", include_str!("../configs/guarded-echo.yaml")),
];

/// Returns the sorted list of embedded document names.
#[must_use]
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = EMBEDDED.iter().map(|(name, _)| *name).collect();
    names.sort_unstable();
    names
}

/// Returns the embedded document with the given filename.
#[must_use]
pub fn load(name: &str) -> Option<&'static str> {
    EMBEDDED.iter().find(|(candidate, _)| *candidate == name).map(|(_, body)| *body)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use super::load;
    use super::names;
    use crate::config::GatewayConfig;
    use crate::render::render_config;

    #[test]
    fn embedded_documents_render_and_validate() {
        for name in names() {
            let raw = load(name).expect("embedded document");
            let rendered = render_config(raw).expect("render");
            GatewayConfig::from_yaml(&rendered).expect("valid embedded config");
        }
    }

    #[test]
    fn unknown_names_return_none() {
        assert!(load("missing.yaml").is_none());
    }
}
