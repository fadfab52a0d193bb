//! Union-Find (disjoint set union)
//!
//! Path compression plus union by rank; near-constant amortized `find`.
//! Elements are dense `u32` ids and grow on demand, so callers intern their
//! keys and hand out ids in first-seen order.

#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    /// Parent pointers (self-loop = root)
    parent: Vec<u32>,

    /// Rank (tree height upper bound)
    rank: Vec<u8>,

    /// Number of disjoint sets
    set_count: usize,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fresh singleton and return its id
    pub fn make_set(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        self.rank.push(0);
        self.set_count += 1;
        id
    }

    /// Representative of `x`, compressing the path on the way
    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut current = x;
        while self.parent[current as usize] != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }
        root
    }

    /// Union by rank; returns `(new_root, absorbed_root)`, or `None` when
    /// already joined
    pub fn union(&mut self, x: u32, y: u32) -> Option<(u32, u32)> {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return None;
        }
        let (rx, ry) = (root_x as usize, root_y as usize);
        let (root, absorbed) = if self.rank[rx] < self.rank[ry] {
            (root_y, root_x)
        } else {
            if self.rank[rx] == self.rank[ry] {
                self.rank[rx] += 1;
            }
            (root_x, root_y)
        };
        self.parent[absorbed as usize] = root;
        self.set_count -= 1;
        Some((root, absorbed))
    }

    pub fn connected(&mut self, x: u32, y: u32) -> bool {
        self.find(x) == self.find(y)
    }

    /// Number of disjoint sets
    pub fn count(&self) -> usize {
        self.set_count
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_and_count() {
        let mut uf = UnionFind::new();
        let ids: Vec<u32> = (0..4).map(|_| uf.make_set()).collect();
        assert_eq!(uf.count(), 4);
        assert!(uf.union(ids[0], ids[1]).is_some());
        assert!(uf.union(ids[2], ids[3]).is_some());
        assert!(uf.union(ids[1], ids[0]).is_none());
        assert_eq!(uf.count(), 2);
        assert!(uf.connected(ids[0], ids[1]));
        assert!(!uf.connected(ids[0], ids[3]));
        uf.union(ids[0], ids[3]);
        assert!(uf.connected(ids[1], ids[2]));
        assert_eq!(uf.count(), 1);
        assert_eq!(uf.len(), 4);
    }
}
