//! A minimal in-memory R-tree over tile MBRs, built once when a fragment
//! is opened and stored alongside its metadata.
//!
//! A plain `Vec`-backed node tree, bulk-loaded once at open (an STR-style
//! sort-and-bucket build, not incrementally maintained -- fragments are
//! immutable once written, so there's never an insert after
//! construction).

use crate::coord::CoordValue;

const FANOUT: usize = 8;

#[derive(Clone, Debug)]
pub struct Mbr {
    pub lo: Vec<CoordValue>,
    pub hi: Vec<CoordValue>,
}

impl Mbr {
    pub fn intersects(&self, query: &[(CoordValue, CoordValue)]) -> bool {
        for (i, (qlo, qhi)) in query.iter().enumerate() {
            if self.hi[i].cmp_total(qlo) == std::cmp::Ordering::Less
                || self.lo[i].cmp_total(qhi) == std::cmp::Ordering::Greater
            {
                return false;
            }
        }
        true
    }

    fn union(&self, other: &Mbr) -> Mbr {
        let lo = self
            .lo
            .iter()
            .zip(other.lo.iter())
            .map(|(a, b)| {
                if a.cmp_total(b) == std::cmp::Ordering::Greater {
                    b.clone()
                } else {
                    a.clone()
                }
            })
            .collect();
        let hi = self
            .hi
            .iter()
            .zip(other.hi.iter())
            .map(|(a, b)| {
                if a.cmp_total(b) == std::cmp::Ordering::Less {
                    b.clone()
                } else {
                    a.clone()
                }
            })
            .collect();
        Mbr { lo, hi }
    }

    fn centroid_key(&self) -> f64 {
        self.lo
            .iter()
            .zip(self.hi.iter())
            .map(|(l, h)| (l.as_f64() + h.as_f64()) / 2.0)
            .sum()
    }
}

enum Node {
    Leaf { mbr: Mbr, tile_idx: usize },
    Internal { mbr: Mbr, children: Vec<Node> },
}

impl Node {
    fn mbr(&self) -> &Mbr {
        match self {
            Node::Leaf { mbr, .. } => mbr,
            Node::Internal { mbr, .. } => mbr,
        }
    }

    fn query(&self, range: &[(CoordValue, CoordValue)], out: &mut Vec<usize>) {
        if !self.mbr().intersects(range) {
            return;
        }
        match self {
            Node::Leaf { tile_idx, .. } => out.push(*tile_idx),
            Node::Internal { children, .. } => {
                for c in children.iter() {
                    c.query(range, out);
                }
            }
        }
    }
}

pub struct RTree {
    root: Option<Node>,
}

impl RTree {
    /// Bulk-loads an R-tree from the given per-tile MBRs (index == tile
    /// index). Empty `mbrs` produces an empty tree whose queries always
    /// return nothing.
    pub fn bulk_load(mbrs: Vec<Mbr>) -> Self {
        if mbrs.is_empty() {
            return RTree { root: None };
        }
        let mut leaves: Vec<Node> = mbrs
            .into_iter()
            .enumerate()
            .map(|(idx, mbr)| Node::Leaf { mbr, tile_idx: idx })
            .collect();

        // STR-style packing: repeatedly sort by centroid and bucket into
        // FANOUT-sized groups until a single root remains.
        while leaves.len() > 1 {
            leaves.sort_by(|a, b| {
                a.mbr()
                    .centroid_key()
                    .partial_cmp(&b.mbr().centroid_key())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let mut next = vec![];
            let mut drain = leaves.into_iter();
            loop {
                let group: Vec<Node> = (&mut drain).take(FANOUT).collect();
                if group.is_empty() {
                    break;
                }
                let mut mbr = group[0].mbr().clone();
                for n in &group[1..] {
                    mbr = mbr.union(n.mbr());
                }
                next.push(Node::Internal { mbr, children: group });
            }
            leaves = next;
        }

        RTree { root: leaves.into_iter().next() }
    }

    pub fn query(&self, range: &[(CoordValue, CoordValue)]) -> Vec<usize> {
        let mut out = vec![];
        if let Some(root) = &self.root {
            root.query(range, &mut out);
        }
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mbr(lo: i32, hi: i32) -> Mbr {
        Mbr {
            lo: vec![CoordValue::Int32(lo)],
            hi: vec![CoordValue::Int32(hi)],
        }
    }

    #[test]
    fn query_finds_overlapping_tiles_only() {
        let tree = RTree::bulk_load(vec![
            mbr(0, 10),
            mbr(11, 20),
            mbr(21, 30),
        ]);
        let hits = tree.query(&[(CoordValue::Int32(15), CoordValue::Int32(25))]);
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn empty_tree_queries_are_empty() {
        let tree = RTree::bulk_load(vec![]);
        assert!(tree.query(&[(CoordValue::Int32(0), CoordValue::Int32(1))]).is_empty());
    }
}
