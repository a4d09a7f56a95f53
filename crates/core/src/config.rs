//! Rendering configuration.
//!
//! [`RenderOptions`] controls the ASCII tree produced by
//! [`GraphNode::render_with`](crate::graph::GraphNode::render_with). It is
//! serde-friendly so callers can keep it alongside their own settings:
//!
//! ```
//! use lineage_core::RenderOptions;
//!
//! let options: RenderOptions = serde_json::from_str(r#"{"max_depth": 2}"#).unwrap();
//! assert_eq!(options.max_depth, Some(2));
//! assert!(options.show_metadata);
//! ```

use serde::{Deserialize, Serialize};

/// Options for ASCII tree rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Emit `[arbitrary]` and `[value]` metadata lines under leaves.
    pub show_metadata: bool,
    /// Stop descending below this depth (the root is depth 0).
    pub max_depth: Option<usize>,
    /// Truncate rendered values longer than this many characters.
    pub value_width: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_metadata: true,
            max_depth: None,
            value_width: None,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, show: bool) -> Self {
        self.show_metadata = show;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_value_width(mut self, width: usize) -> Self {
        self.value_width = Some(width);
        self
    }
}
