//! Component export-shape contract and sanitation.
//!
//! Every deployed file must import React and default-export the component
//! under its fixed name. Apply output that drifts from that shape is patched
//! at the string level; output with no component at all is rejected.

use reel_core::{strip_code_fences, ApplyError, ConfigError, ReelError, ReelResult};
use regex::Regex;

/// Result of sanitizing apply output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub content: String,
    pub injected_import: bool,
    pub injected_export: bool,
}

impl Sanitized {
    /// Whether any statement had to be injected.
    pub fn was_patched(&self) -> bool {
        self.injected_import || self.injected_export
    }
}

/// Compiled checks for one component name.
#[derive(Debug, Clone)]
pub struct ComponentContract {
    name: String,
    import_re: Regex,
    named_export_re: Regex,
    any_default_export_re: Regex,
    definition_re: Regex,
}

impl ComponentContract {
    /// Build the contract for `name`, which must be a JS identifier.
    pub fn new(name: &str) -> ReelResult<Self> {
        if !is_identifier(name) {
            return Err(ReelError::Config(ConfigError::InvalidValue {
                field: "component_name".to_string(),
                value: name.to_string(),
                reason: "component name must be a JavaScript identifier".to_string(),
            }));
        }

        let escaped = regex::escape(name);
        Ok(Self {
            name: name.to_string(),
            import_re: compile(r"(?m)^\s*import\s+(?:\*\s+as\s+)?React\b")?,
            named_export_re: compile(&format!(
                r"(?m)^\s*export\s+(?:default\s+(?:function\s+|class\s+)?{0}\b|\{{[^}}]*\b{0}\s+as\s+default\b)",
                escaped
            ))?,
            any_default_export_re: compile(
                r"(?m)^\s*export\s+(?:default\b|\{[^}]*\bas\s+default\b)",
            )?,
            definition_re: compile(&format!(
                r"\b(?:const|let|var|function|class)\s+{}\b",
                escaped
            ))?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when `source` already satisfies the contract.
    pub fn is_compliant(&self, source: &str) -> bool {
        self.import_re.is_match(source) && self.named_export_re.is_match(source)
    }

    /// Force `raw` into the contract shape.
    ///
    /// Strips code fences, then prepends `import React from 'react';` and/or
    /// appends `export default <Name>;` when missing. Idempotent. Fails with
    /// `ApplyError::ContractViolation` when the output is empty, defines no
    /// component named `<Name>`, or default-exports something else.
    pub fn sanitize(&self, raw: &str) -> ReelResult<Sanitized> {
        let body = strip_code_fences(raw);
        if body.is_empty() {
            return Err(violation("apply output is empty"));
        }

        let injected_export = if self.named_export_re.is_match(&body) {
            false
        } else if self.any_default_export_re.is_match(&body) {
            return Err(violation(format!(
                "default export is not {}",
                self.name
            )));
        } else if self.definition_re.is_match(&body) {
            true
        } else {
            return Err(violation(format!("no component named {} is defined", self.name)));
        };

        let injected_import = !self.import_re.is_match(&body);

        let mut content = String::with_capacity(body.len() + 64);
        if injected_import {
            content.push_str("import React from 'react';\n\n");
        }
        content.push_str(&body);
        if injected_export {
            content.push_str("\n\nexport default ");
            content.push_str(&self.name);
            content.push(';');
        }

        Ok(Sanitized {
            content,
            injected_import,
            injected_export,
        })
    }
}

fn compile(pattern: &str) -> ReelResult<Regex> {
    Regex::new(pattern).map_err(|e| {
        ReelError::Config(ConfigError::InvalidValue {
            field: "component_name".to_string(),
            value: pattern.to_string(),
            reason: e.to_string(),
        })
    })
}

fn violation(reason: impl Into<String>) -> ReelError {
    ReelError::ApplyFailed(ApplyError::ContractViolation {
        reason: reason.into(),
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn body_strategy() -> impl Strategy<Value = String> {
        // Lines of JS-ish text without backticks so fences are never formed.
        prop::collection::vec("[a-zA-Z0-9 (){};=<>/.,'\"+-]{0,40}", 0..8)
            .prop_map(|lines| lines.join("\n"))
    }

    proptest! {
        /// Sanitizing twice gives the same result as sanitizing once.
        #[test]
        fn prop_sanitize_idempotent(
            prefix in body_strategy(),
            suffix in body_strategy(),
            import in prop::option::of(prop::sample::select(vec![
                "import React from 'react';",
                "import React, { useState } from 'react';",
                "import * as React from 'react';",
                "import   *  as React from \"react\";",
            ])),
            with_export in any::<bool>(),
        ) {
            let contract = ComponentContract::new("GameZone").unwrap();
            let mut raw = String::new();
            if let Some(import) = import {
                raw.push_str(import);
                raw.push('\n');
            }
            raw.push_str(&prefix);
            raw.push_str("\nconst GameZone = () => null;\n");
            raw.push_str(&suffix);
            if with_export {
                raw.push_str("\nexport default GameZone;");
            }

            if let Ok(once) = contract.sanitize(&raw) {
                prop_assert!(contract.is_compliant(&once.content));
                let twice = contract.sanitize(&once.content).unwrap();
                prop_assert_eq!(&twice.content, &once.content);
                prop_assert!(!twice.was_patched());
                prop_assert_eq!(once.injected_import, import.is_none());
            }
        }
    }
}
