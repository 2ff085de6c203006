//! In-memory R-tree indexes for neighborhood attribution and nearest
//! supplier lookup.

use geo::{BoundingRect as _, Contains as _, Point, Polygon};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree, RTreeObject};

/// A neighborhood polygon stored in the R-tree with its identifier.
struct NeighborhoodEntry {
    id: String,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon<f64>,
}

impl RTreeObject for NeighborhoodEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Point-in-polygon lookup over a set of neighborhood boundaries.
pub struct NeighborhoodIndex {
    tree: RTree<NeighborhoodEntry>,
}

impl NeighborhoodIndex {
    /// Bulk-loads the index from `(id, boundary)` pairs.
    pub fn build<'a, I>(neighborhoods: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Polygon<f64>)>,
    {
        let entries: Vec<NeighborhoodEntry> = neighborhoods
            .into_iter()
            .filter_map(|(id, polygon)| {
                let rect = polygon.bounding_rect()?;
                Some(NeighborhoodEntry {
                    id: id.to_string(),
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    polygon: polygon.clone(),
                })
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Indexed {} neighborhood boundaries", tree.size());
        Self { tree }
    }

    /// Returns the id of a neighborhood containing `point`.
    ///
    /// Generated neighborhoods occupy disjoint grid cells, so the first
    /// match is the only match.
    #[must_use]
    pub fn lookup(&self, point: Point<f64>) -> Option<&str> {
        let query = AABB::from_point([point.x(), point.y()]);
        self.tree
            .locate_in_envelope_intersecting(&query)
            .find(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.id.as_str())
    }

    /// Number of indexed boundaries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no boundaries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// Nearest-neighbour lookup over supplier depots.
///
/// Distances inside the tree are planar in degrees, which ranks candidates
/// correctly at city scale; callers convert the winner's distance to
/// kilometres with [`crate::haversine_km`].
pub struct SupplierIndex {
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl SupplierIndex {
    /// Bulk-loads depot locations; the payload is each point's position in
    /// the input slice.
    #[must_use]
    pub fn build(locations: &[Point<f64>]) -> Self {
        let entries = locations
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new([p.x(), p.y()], i))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Index of the depot nearest to `point`, or `None` if empty.
    #[must_use]
    pub fn nearest(&self, point: Point<f64>) -> Option<usize> {
        self.tree
            .nearest_neighbor(&[point.x(), point.y()])
            .map(|entry| entry.data)
    }
}
