use std::sync::Arc;
use crate::core::config::GraphTuning;

/// Largest vector dimension a field accepts unless its selector says otherwise.
pub const DEFAULT_MAX_DIMENSIONS: usize = 1024;

/// Per-field vector format parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorFormat {
    pub max_dimensions: usize,
    pub max_connections: usize,
    pub beam_width: usize,
}

impl Default for VectorFormat {
    fn default() -> Self {
        VectorFormat {
            max_dimensions: DEFAULT_MAX_DIMENSIONS,
            max_connections: 16,
            beam_width: 100,
        }
    }
}

/// Resolves the vector format for a field name.
pub type FormatSelector = Arc<dyn Fn(&str) -> VectorFormat + Send + Sync>;

pub fn default_selector() -> FormatSelector {
    Arc::new(|_field: &str| VectorFormat::default())
}

/// Selector that lifts the dimension ceiling for `field` to `dimension` and
/// carries the graph tuning; other fields keep the defaults.
pub fn high_dimension_selector(field: &str, dimension: usize, tuning: GraphTuning) -> FormatSelector {
    let field = field.to_string();
    Arc::new(move |name: &str| {
        if name == field {
            VectorFormat {
                max_dimensions: dimension.max(DEFAULT_MAX_DIMENSIONS),
                max_connections: tuning.max_connections,
                beam_width: tuning.beam_width,
            }
        } else {
            VectorFormat::default()
        }
    })
}
