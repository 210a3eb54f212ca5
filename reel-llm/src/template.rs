//! Offline code generator rendering a fixed GameZone template.

use crate::CodeGenerator;
use async_trait::async_trait;
use reel_core::{Idea, ReelResult, DEFAULT_COMPONENT_NAME};

/// Renders a static card component announcing the idea.
///
/// Lets the feed run end to end with no model behind it.
#[derive(Debug, Clone)]
pub struct TemplateCodeGenerator {
    component_name: String,
}

impl TemplateCodeGenerator {
    pub fn new(component_name: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
        }
    }

    /// Render the component source for an idea.
    pub fn render(&self, idea: &Idea) -> String {
        let title = escape_jsx_text(idea.as_str());
        let name = &self.component_name;

        format!(
            r#"import React from 'react';

const {name} = () => {{
  return (
    <div className="game-zone">
      <div className="game-content">
        <h2>{title}</h2>
        <p>Welcome to {title}!</p>
        <div style={{{{
          background: 'linear-gradient(45deg, #ff6b6b, #4ecdc4)',
          padding: '15px',
          borderRadius: '8px',
          color: 'white',
          margin: '15px 0',
          textAlign: 'center',
          fontWeight: 'bold'
        }}}}>
          Current Game: {title}
        </div>
      </div>
    </div>
  );
}};

export default {name};
"#
        )
    }
}

impl Default for TemplateCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_COMPONENT_NAME)
    }
}

#[async_trait]
impl CodeGenerator for TemplateCodeGenerator {
    async fn generate(&self, idea: &Idea) -> ReelResult<String> {
        Ok(self.render(idea))
    }
}

/// Escape characters JSX treats specially inside element text.
pub fn escape_jsx_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}
