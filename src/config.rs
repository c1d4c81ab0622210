use crate::blockmap::DEFAULT_CELL_SIZE;
use crate::geom::Coord;

/// Knobs for turning a parsed map into a runtime [`Map`](crate::map::Map).
#[derive(Clone, Debug, PartialEq)]
pub struct BuildConfig {
    /// How many units of front/back imbalance one split is worth when
    /// choosing a partition.
    pub split_cost_factor: u64,
    /// Largest edge of a leaf block in the builder's superblockmap.
    pub superblock_size: Coord,
    /// Edge of one cell of the subsector blockmap.  Must be positive;
    /// [`Map::from_bare`](crate::map::Map::from_bare) refuses anything else.
    pub blockmap_cell_size: Coord,
    /// Treat vertices at the same position as one.
    pub merge_duplicate_vertices: bool,
    /// Drop unused vertices, sidedefs and sectors, and zero-length lines,
    /// once the BSP is built.
    pub prune: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            split_cost_factor: 7,
            superblock_size: 256.0,
            blockmap_cell_size: DEFAULT_CELL_SIZE,
            merge_duplicate_vertices: true,
            prune: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_usual_node_builder_settings() {
        let config = BuildConfig::default();
        assert_eq!(config.split_cost_factor, 7);
        assert_eq!(config.blockmap_cell_size, DEFAULT_CELL_SIZE);
        assert_eq!(DEFAULT_CELL_SIZE, 128.0);
        assert!(config.merge_duplicate_vertices);
        assert!(config.prune);
    }
}
