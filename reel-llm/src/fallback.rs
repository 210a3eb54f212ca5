//! Deterministic local idea generator.
//!
//! Used when the external idea service fails, and as the idea source when no
//! LLM provider is configured. Never fails.

use crate::IdeaSource;
use async_trait::async_trait;
use reel_core::{Idea, ReelResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Built-in catalogue of classic arcade games.
pub const DEFAULT_CATALOGUE: &[&str] = &[
    "Snake Game - Eat the apples!",
    "Pong - Classic paddle game",
    "Tetris - Stack the blocks",
    "Space Invaders - Defend Earth!",
    "Pac-Man - Eat all the dots",
    "Breakout - Break all the bricks",
    "Frogger - Cross the road safely",
];

/// Cycles through a fixed catalogue of ideas.
#[derive(Debug)]
pub struct LocalIdeaGenerator {
    catalogue: Vec<Idea>,
    cursor: AtomicUsize,
}

impl LocalIdeaGenerator {
    pub fn new() -> Self {
        Self::with_catalogue(DEFAULT_CATALOGUE.iter().copied().map(Idea::from).collect())
    }

    /// Use a custom catalogue. An empty catalogue falls back to the default.
    pub fn with_catalogue(catalogue: Vec<Idea>) -> Self {
        let catalogue = if catalogue.is_empty() {
            DEFAULT_CATALOGUE.iter().copied().map(Idea::from).collect()
        } else {
            catalogue
        };

        Self {
            catalogue,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next idea in catalogue order, wrapping around.
    pub fn next(&self) -> Idea {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.catalogue.len();
        self.catalogue[idx].clone()
    }

    pub fn len(&self) -> usize {
        self.catalogue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogue.is_empty()
    }
}

impl Default for LocalIdeaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdeaSource for LocalIdeaGenerator {
    async fn next_idea(&self) -> ReelResult<Idea> {
        Ok(self.next())
    }

    fn name(&self) -> &str {
        "local"
    }
}
