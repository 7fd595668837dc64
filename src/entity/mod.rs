use crate::bounds::BoundingBox;
use crate::error::{CacError, Result};

/// Stable handle of an entity inside an [`EntityStore`].
///
/// Handles are dense indices: locals occupy `0..local_count`, ghosts follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Supported finite-element families.
///
/// The set is closed: every family-specific rule is an exhaustive `match`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementFamily {
    /// Eight-node hexahedron. Corner 0 is the local origin, corners 1, 3 and 4
    /// sit at the far end of the first, second and third local axis.
    Hex8,
}

impl ElementFamily {
    pub const fn tag(self) -> i32 {
        match self {
            ElementFamily::Hex8 => 1,
        }
    }

    pub const fn nodes_per_element(self) -> usize {
        match self {
            ElementFamily::Hex8 => 8,
        }
    }

    /// Node pairs whose separation spans each local axis.
    pub const fn axis_corners(self) -> [(usize, usize); 3] {
        match self {
            ElementFamily::Hex8 => [(0, 1), (0, 3), (0, 4)],
        }
    }
}

/// Particle or element, decoded from the container's integer type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Particle,
    Element(ElementFamily),
}

impl EntityKind {
    /// Decodes a type tag: 0 is a particle, positive values are element families.
    pub fn from_tag(tag: i32) -> Result<Self> {
        match tag {
            0 => Ok(EntityKind::Particle),
            t if t == ElementFamily::Hex8.tag() => Ok(EntityKind::Element(ElementFamily::Hex8)),
            _ => Err(CacError::InvalidEntity(format!("element type {} is not defined", tag))),
        }
    }

    /// Nodes stored per replicate copy.
    pub fn nodes_per_copy(self) -> usize {
        match self {
            EntityKind::Particle => 1,
            EntityKind::Element(family) => family.nodes_per_element(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// Owned by this process.
    Local,
    /// Read-only copy of an entity owned by a neighboring process.
    Ghost,
}

/// Read-only view of one entity.
#[derive(Clone, Copy, Debug)]
pub struct Entity<'a> {
    pub id: EntityId,
    pub kind: EntityKind,
    pub ownership: Ownership,
    /// Nodal positions, copy-major: `nodes[copy * nodes_per_copy + node]`.
    pub nodes: &'a [[f64; 3]],
    pub scale: [u32; 3],
    pub poly_count: u32,
    pub load_weight: u64,
}

impl<'a> Entity<'a> {
    /// Nodes of one replicate copy.
    pub fn copy_nodes(&self, copy: usize) -> &'a [[f64; 3]] {
        let n = self.kind.nodes_per_copy();
        &self.nodes[copy * n..(copy + 1) * n]
    }

    /// Axis-aligned box around all nodal positions. Degenerates to a point for particles.
    pub fn footprint(&self) -> BoundingBox<3> {
        BoundingBox::enclosing(self.nodes)
            .unwrap_or_else(|| BoundingBox::new([f64::NAN; 3], [f64::NAN; 3]))
    }
}

/// Structure-of-arrays container for particles and elements.
///
/// Local entities always precede ghosts, so `0..local_count` is the
/// range this process owns and estimates load for.
#[derive(Clone, Debug)]
pub struct EntityStore {
    coupled: bool,
    kinds: Vec<EntityKind>,
    scales: Vec<[u32; 3]>,
    poly_counts: Vec<u32>,
    node_ranges: Vec<(usize, usize)>,
    nodes: Vec<[f64; 3]>,
    load_weights: Vec<u64>,
    local_count: usize,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// Creates an empty container with coupled particle/element support.
    pub fn new() -> Self {
        Self {
            coupled: true,
            kinds: Vec::new(),
            scales: Vec::new(),
            poly_counts: Vec::new(),
            node_ranges: Vec::new(),
            nodes: Vec::new(),
            load_weights: Vec::new(),
            local_count: 0,
        }
    }

    /// Creates a container without coupled-model support (plain particles only).
    pub fn atomistic_only() -> Self {
        Self { coupled: false, ..Self::new() }
    }

    pub fn is_coupled(&self) -> bool {
        self.coupled
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn local_count(&self) -> usize {
        self.local_count
    }

    pub fn ghost_count(&self) -> usize {
        self.kinds.len() - self.local_count
    }

    pub fn push_particle(&mut self, position: [f64; 3], ownership: Ownership) -> Result<EntityId> {
        if !position.iter().all(|v| v.is_finite()) {
            return Err(CacError::InvalidEntity(format!("particle position {:?} is not finite", position)));
        }
        self.push(EntityKind::Particle, [1, 1, 1], 1, &[position], ownership)
    }

    /// Adds an element with `poly_count` replicate copies.
    ///
    /// `nodes` holds `family.nodes_per_element() * poly_count` positions, copy-major.
    pub fn push_element(
        &mut self,
        family: ElementFamily,
        scale: [u32; 3],
        poly_count: u32,
        nodes: &[[f64; 3]],
        ownership: Ownership,
    ) -> Result<EntityId> {
        let kind = EntityKind::Element(family);
        if poly_count < 1 {
            return Err(CacError::InvalidEntity("poly_count less than one".into()));
        }
        if scale.iter().any(|&s| s == 0) {
            return Err(CacError::InvalidEntity(format!("element scale {:?} must be positive", scale)));
        }
        validate_element_nodes(family, poly_count, nodes, Some(EntityId(self.len())))?;
        self.push(kind, scale, poly_count, nodes, ownership)
    }

    fn push(
        &mut self,
        kind: EntityKind,
        scale: [u32; 3],
        poly_count: u32,
        nodes: &[[f64; 3]],
        ownership: Ownership,
    ) -> Result<EntityId> {
        if ownership == Ownership::Local && self.ghost_count() > 0 {
            return Err(CacError::InvalidEntity("local entities must precede ghosts".into()));
        }
        let id = EntityId(self.kinds.len());
        self.kinds.push(kind);
        self.scales.push(scale);
        self.poly_counts.push(poly_count);
        self.node_ranges.push((self.nodes.len(), nodes.len()));
        self.nodes.extend_from_slice(nodes);
        self.load_weights.push(1);
        if ownership == Ownership::Local {
            self.local_count += 1;
        }
        Ok(id)
    }

    /// Moves an entity. The node count must match the stored layout.
    pub fn set_nodes(&mut self, id: EntityId, nodes: &[[f64; 3]]) -> Result<()> {
        let (start, len) = *self
            .node_ranges
            .get(id.0)
            .ok_or_else(|| CacError::InvalidEntity(format!("unknown entity {:?}", id)))?;
        if nodes.len() != len {
            return Err(CacError::InvalidEntity(format!(
                "entity {:?} stores {} nodes, got {}",
                id,
                len,
                nodes.len()
            )));
        }
        match self.kinds[id.0] {
            EntityKind::Particle => {
                if !nodes[0].iter().all(|v| v.is_finite()) {
                    return Err(CacError::InvalidEntity(format!("particle position {:?} is not finite", nodes[0])));
                }
            }
            EntityKind::Element(family) => {
                validate_element_nodes(family, self.poly_counts[id.0], nodes, Some(id))?;
            }
        }
        self.nodes[start..start + len].copy_from_slice(nodes);
        Ok(())
    }

    /// Drops every ghost, keeping locals intact. Called before a ghost refresh.
    pub fn clear_ghosts(&mut self) {
        let n = self.local_count;
        let node_end = self.node_ranges.get(n).map_or(self.nodes.len(), |&(start, _)| start);
        self.kinds.truncate(n);
        self.scales.truncate(n);
        self.poly_counts.truncate(n);
        self.node_ranges.truncate(n);
        self.load_weights.truncate(n);
        self.nodes.truncate(node_end);
    }

    pub fn get(&self, id: EntityId) -> Option<Entity<'_>> {
        let i = id.0;
        let &(start, len) = self.node_ranges.get(i)?;
        Some(Entity {
            id,
            kind: self.kinds[i],
            ownership: if i < self.local_count { Ownership::Local } else { Ownership::Ghost },
            nodes: &self.nodes[start..start + len],
            scale: self.scales[i],
            poly_count: self.poly_counts[i],
            load_weight: self.load_weights[i],
        })
    }

    /// Every entity, locals first.
    pub fn iter(&self) -> impl Iterator<Item = Entity<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.get(EntityId(i)))
    }

    pub fn locals(&self) -> impl Iterator<Item = Entity<'_>> + '_ {
        (0..self.local_count).filter_map(move |i| self.get(EntityId(i)))
    }

    /// Cached load weights of the local entities.
    pub fn load_weights(&self) -> &[u64] {
        &self.load_weights[..self.local_count]
    }

    pub(crate) fn set_load_weight(&mut self, id: EntityId, weight: u64) {
        self.load_weights[id.0] = weight;
    }
}

fn validate_element_nodes(
    family: ElementFamily,
    poly_count: u32,
    nodes: &[[f64; 3]],
    id: Option<EntityId>,
) -> Result<()> {
    let per_copy = family.nodes_per_element();
    let expected = per_copy * poly_count as usize;
    if nodes.len() != expected {
        return Err(CacError::InvalidEntity(format!(
            "element needs {} nodes ({} per copy x {} copies), got {}",
            expected,
            per_copy,
            poly_count,
            nodes.len()
        )));
    }
    if !nodes.iter().flatten().all(|v| v.is_finite()) {
        return Err(CacError::InvalidEntity("element has non-finite nodal positions".into()));
    }
    for copy in nodes.chunks(per_copy) {
        for (axis, &(a, b)) in family.axis_corners().iter().enumerate() {
            let dx = copy[a][0] - copy[b][0];
            let dy = copy[a][1] - copy[b][1];
            let dz = copy[a][2] - copy[b][2];
            if dx * dx + dy * dy + dz * dz == 0.0 {
                return Err(CacError::DegenerateAxis { id, axis });
            }
        }
    }
    Ok(())
}

/// Nodes of an axis-aligned hexahedron spanning `min..max`, in [`ElementFamily::Hex8`] order.
pub fn hex8_nodes(min: [f64; 3], max: [f64; 3]) -> [[f64; 3]; 8] {
    [
        [min[0], min[1], min[2]],
        [max[0], min[1], min[2]],
        [max[0], max[1], min[2]],
        [min[0], max[1], min[2]],
        [min[0], min[1], max[2]],
        [max[0], min[1], max[2]],
        [max[0], max[1], max[2]],
        [min[0], max[1], max[2]],
    ]
}
