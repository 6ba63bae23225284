//! Connected component labeling for voxel grids and mesh vertex graphs
//!
//! Labels are assigned by breadth-first flood fill in scan order, so label 1
//! is the component containing the first active element. Label 0 marks
//! inactive elements.

use std::collections::VecDeque;
use voxmesh_core::{Error, Result, VertexAdjacency};

/// Voxel neighborhood used when flooding a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Face neighbors only
    #[default]
    Six,
    /// Face, edge and corner neighbors
    TwentySix,
}

impl Connectivity {
    fn offsets(self) -> Vec<[isize; 3]> {
        match self {
            Connectivity::Six => vec![
                [-1, 0, 0],
                [1, 0, 0],
                [0, -1, 0],
                [0, 1, 0],
                [0, 0, -1],
                [0, 0, 1],
            ],
            Connectivity::TwentySix => {
                let mut out = Vec::with_capacity(26);
                for dz in -1..=1 {
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            if dx != 0 || dy != 0 || dz != 0 {
                                out.push([dx, dy, dz]);
                            }
                        }
                    }
                }
                out
            }
        }
    }
}

/// Result of a labeling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLabels {
    /// One label per element, 0 for inactive elements
    pub labels: Vec<u32>,
    /// `sizes[k]` is the element count of label `k + 1`
    pub sizes: Vec<usize>,
}

impl ComponentLabels {
    /// Number of components found
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Label with the most elements, first discovered on ties.
    pub fn largest(&self) -> Option<u32> {
        largest_by(&self.sizes)
    }

    /// Element count of `label`, 0 for background or unknown labels.
    pub fn size_of(&self, label: u32) -> usize {
        if label == 0 {
            return 0;
        }
        self.sizes.get(label as usize - 1).copied().unwrap_or(0)
    }
}

/// Label with the highest weight, earliest label on ties.
pub fn largest_by<W: PartialOrd + Copy>(weights: &[W]) -> Option<u32> {
    let mut best: Option<(usize, W)> = None;
    for (i, &w) in weights.iter().enumerate() {
        if best.map_or(true, |(_, b)| w > b) {
            best = Some((i, w));
        }
    }
    best.map(|(i, _)| i as u32 + 1)
}

/// Label the `true` voxels of an x-fastest mask of size `dims`.
pub fn label_volume(
    mask: &[bool],
    dims: [usize; 3],
    connectivity: Connectivity,
) -> Result<ComponentLabels> {
    let [nx, ny, nz] = dims;
    let n = nx * ny * nz;
    if mask.len() != n {
        return Err(Error::InvalidData(format!(
            "mask has {} elements but dimensions {}x{}x{} need {}",
            mask.len(),
            nx,
            ny,
            nz,
            n
        )));
    }

    let mut labels = Vec::new();
    labels.try_reserve_exact(n)?;
    labels.resize(n, 0u32);

    let offsets = connectivity.offsets();
    let mut sizes = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..n {
        if !mask[seed] || labels[seed] != 0 {
            continue;
        }
        let label = sizes.len() as u32 + 1;
        labels[seed] = label;
        queue.push_back(seed);
        let mut size = 0usize;

        while let Some(idx) = queue.pop_front() {
            size += 1;
            let x = (idx % nx) as isize;
            let y = ((idx / nx) % ny) as isize;
            let z = (idx / (nx * ny)) as isize;

            for d in &offsets {
                let (qx, qy, qz) = (x + d[0], y + d[1], z + d[2]);
                if qx < 0
                    || qy < 0
                    || qz < 0
                    || qx >= nx as isize
                    || qy >= ny as isize
                    || qz >= nz as isize
                {
                    continue;
                }
                let q = qx as usize + nx * (qy as usize + ny * qz as usize);
                if mask[q] && labels[q] == 0 {
                    labels[q] = label;
                    queue.push_back(q);
                }
            }
        }
        sizes.push(size);
    }

    Ok(ComponentLabels { labels, sizes })
}

/// Label the active vertices of a mesh through its adjacency graph.
pub fn label_graph(adjacency: &VertexAdjacency, active: &[bool]) -> Result<ComponentLabels> {
    let n = adjacency.len();
    if active.len() != n {
        return Err(Error::InvalidData(format!(
            "activity mask has {} entries for {} vertices",
            active.len(),
            n
        )));
    }

    let mut labels = vec![0u32; n];
    let mut sizes = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..n {
        if !active[seed] || labels[seed] != 0 {
            continue;
        }
        let label = sizes.len() as u32 + 1;
        labels[seed] = label;
        queue.push_back(seed);
        let mut size = 0usize;

        while let Some(v) = queue.pop_front() {
            size += 1;
            for &w in adjacency.neighbors(v) {
                if active[w] && labels[w] == 0 {
                    labels[w] = label;
                    queue.push_back(w);
                }
            }
        }
        sizes.push(size);
    }

    Ok(ComponentLabels { labels, sizes })
}
