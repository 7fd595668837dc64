use crate::bounds::BoundingBox;
use crate::config::CouplingConfig;
use crate::entity::{EntityId, EntityKind, EntityStore, Ownership};
use crate::error::CacError;
use crate::quadrature::{EstimationMode, InteractionCounts, NeighborStatistics};
use crate::rebuild::CoupledIndex;
use js_sys::{Array, Uint32Array};
use rand::prelude::*;
use rand::rngs::StdRng;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(typescript_custom_section)]
const TS_CONSTANTS_ENTITY: &'static str = r#"
export const ENTITY_TYPE_PARTICLE = 0;
export const ENTITY_TYPE_HEX8 = 1;
"#;

/// WASM wrapper around an entity store and its rebuild driver.
#[wasm_bindgen(js_name = CoupledSystem3D)]
pub struct CoupledSystem3D {
    store: EntityStore,
    index: CoupledIndex,
    sub_domain: BoundingBox<3>,
    stats: Option<NeighborStatistics>,
}

#[wasm_bindgen(js_class = CoupledSystem3D)]
impl CoupledSystem3D {
    #[wasm_bindgen(constructor)]
    pub fn new(
        min_x: f64,
        min_y: f64,
        min_z: f64,
        max_x: f64,
        max_y: f64,
        max_z: f64,
        cutoff: f64,
        quadrature_rank: u32,
        one_layer: bool,
        outer_shell_only: bool,
    ) -> Result<CoupledSystem3D, JsError> {
        let mut config = CouplingConfig::new(cutoff);
        config.quadrature_rank = quadrature_rank;
        config.one_layer = one_layer;
        config.outer_shell_only = outer_shell_only;
        let sub_domain = checked_sub_domain([min_x, min_y, min_z], [max_x, max_y, max_z])?;
        let store = EntityStore::new();
        let index = CoupledIndex::new(config, &store)?;
        Ok(CoupledSystem3D {
            store,
            index,
            sub_domain,
            stats: None,
        })
    }

    pub fn add_particle(&mut self, x: f64, y: f64, z: f64, ghost: bool) -> Result<usize, JsError> {
        let id = self.store.push_particle([x, y, z], ownership(ghost))?;
        Ok(id.index())
    }

    /// Adds an element from a type tag and flat `[x, y, z, ...]` nodal coordinates.
    pub fn add_element(
        &mut self,
        type_tag: i32,
        nodes: &[f64],
        scale: &[u32],
        poly_count: u32,
        ghost: bool,
    ) -> Result<usize, JsError> {
        let EntityKind::Element(family) = EntityKind::from_tag(type_tag)? else {
            return Err(CacError::InvalidEntity("use add_particle for particles".into()).into());
        };
        if nodes.len() % 3 != 0 || scale.len() != 3 {
            return Err(CacError::InvalidEntity("nodes must be xyz triples and scale must have 3 entries".into()).into());
        }
        let points: Vec<[f64; 3]> = nodes.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        let id = self.store.push_element(
            family,
            [scale[0], scale[1], scale[2]],
            poly_count,
            &points,
            ownership(ghost),
        )?;
        Ok(id.index())
    }

    /// Scatters `count` local particles uniformly over the sub-domain.
    pub fn random_particles(&mut self, count: usize) -> Result<(), JsError> {
        let mut rng = StdRng::seed_from_u64(get_seed());
        let b = self.sub_domain;
        for _ in 0..count {
            let p = [
                rng.gen_range(b.min[0]..b.max[0]),
                rng.gen_range(b.min[1]..b.max[1]),
                rng.gen_range(b.min[2]..b.max[2]),
            ];
            self.store.push_particle(p, Ownership::Local)?;
        }
        Ok(())
    }

    pub fn clear_ghosts(&mut self) {
        self.store.clear_ghosts();
    }

    /// Supplies interaction counters from the last force pass as flat `[inner, outer, additional, ...]` triples.
    pub fn set_neighbor_counts(&mut self, counts: &[u32]) {
        let counts = counts
            .chunks_exact(3)
            .map(|c| InteractionCounts::new(c[0] as u64, c[1] as u64, c[2] as u64))
            .collect();
        self.stats = Some(NeighborStatistics::new(counts));
    }

    /// Runs one rebuild, consuming any pending neighbor counts.
    pub fn rebuild(&mut self) -> Result<(), JsError> {
        let mode = EstimationMode::select(self.stats.take(), self.store.local_count());
        self.index.rebuild(&mut self.store, &self.sub_domain, mode)?;
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn count_entities(&self) -> usize {
        self.store.len()
    }

    #[wasm_bindgen(getter)]
    pub fn count_local(&self) -> usize {
        self.store.local_count()
    }

    pub fn load_weights(&self) -> Vec<f64> {
        self.store.load_weights().iter().map(|&w| w as f64).collect()
    }

    pub fn entity_bins(&self, index: usize) -> Vec<u32> {
        self.index.binner().entity_bins(EntityId(index)).iter().map(|&b| b as u32).collect()
    }

    pub fn crossing(&self) -> Vec<u32> {
        self.index.binner().crossing().iter().map(|id| id.index() as u32).collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.index.memory_usage()
    }

    // wasm-bindgen does not support nested vectors directly
    #[wasm_bindgen(js_name = binMembers)]
    pub fn wasm_bin_members(&self) -> Array {
        let bins = self.index.binner().bins();
        let result = Array::new_with_length(bins.len() as u32);
        for (i, members) in bins.iter().enumerate() {
            let ids: Vec<u32> = members.iter().map(|id| id.index() as u32).collect();
            result.set(i as u32, Uint32Array::from(ids.as_slice()).into());
        }
        result
    }
}

/// Sub-domain box, which must have a positive extent on every axis.
fn checked_sub_domain(min: [f64; 3], max: [f64; 3]) -> crate::Result<BoundingBox<3>> {
    let sub_domain = BoundingBox::new(min, max);
    if !sub_domain.has_volume() {
        return Err(CacError::InvalidConfig(format!(
            "sub-domain {:?}..{:?} must have a positive extent on every axis",
            min, max
        )));
    }
    Ok(sub_domain)
}

fn ownership(ghost: bool) -> Ownership {
    if ghost { Ownership::Ghost } else { Ownership::Local }
}

fn get_seed() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        (js_sys::Math::random() * 4294967296.0) as u64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        123456789 // Fixed seed for tests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_sub_domain() {
        let b = checked_sub_domain([0.0; 3], [10.0, 5.0, 2.0]).unwrap();
        assert_eq!(b.max, [10.0, 5.0, 2.0]);
        assert!(matches!(
            checked_sub_domain([0.0; 3], [10.0, 0.0, 2.0]),
            Err(CacError::InvalidConfig(_))
        ));
        assert!(checked_sub_domain([0.0; 3], [10.0, 5.0, f64::NAN]).is_err());
        assert!(checked_sub_domain([1.0; 3], [0.0; 3]).is_err());
    }
}
