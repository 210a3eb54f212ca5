//! Scaffold component used when nothing has been deployed yet.

/// Placeholder component for `component_name`, matching the hosting
/// template's initial file.
pub fn scaffold(component_name: &str) -> String {
    format!(
        r#"import React from 'react';

const {name} = ({{ currentGame }}) => {{
  return (
    <div className="game-zone">
      <div className="game-content">
        <h2>{{currentGame || "Loading next game..."}}</h2>
        <div className="game-preview">
          <p>Scroll to play!</p>
        </div>
      </div>
    </div>
  );
}};

export default {name};"#,
        name = component_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComponentContract;

    #[test]
    fn test_scaffold_satisfies_contract() {
        let contract = ComponentContract::new("GameZone").unwrap();
        let source = scaffold("GameZone");
        assert!(contract.is_compliant(&source));

        let sanitized = contract.sanitize(&source).unwrap();
        assert_eq!(sanitized.content, source);
    }
}
