//! Disjoint-set over record indices.
//!
//! If A matches B and B matches C, then {A, B, C} forms a single group
//! even if A doesn't directly match C. Every member reaches the same root,
//! so later merges are visible from any earlier member.

/// Union-find with path compression and union by size.
///
/// Each root also owns its member list, kept in ascending index order
/// (which is registration order for the clustering engine).
#[derive(Debug, Clone, Default)]
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
    members: Vec<Vec<usize>>,
}

impl DisjointSet {
    /// Create an empty disjoint-set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a singleton set and return its index
    pub fn push(&mut self) -> usize {
        let index = self.parent.len();
        self.parent.push(index);
        self.size.push(1);
        self.members.push(vec![index]);
        index
    }

    /// Find the root of `x`, compressing the path behind it
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    /// Find the root of `x` without modifying the structure
    pub fn root(&self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        root
    }

    /// True if `a` and `b` share a set
    pub fn same_set(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Merge the sets of `a` and `b`, returning the new root
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return root_a;
        }

        let (root, child) = if self.size[root_a] >= self.size[root_b] {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };

        self.parent[child] = root;
        self.size[root] += self.size[child];

        let moved = std::mem::take(&mut self.members[child]);
        let kept = std::mem::take(&mut self.members[root]);
        self.members[root] = merge_sorted(kept, moved);

        root
    }

    /// Members of the set containing `x`, ascending
    pub fn members(&self, x: usize) -> &[usize] {
        &self.members[self.root(x)]
    }
}

fn merge_sorted(left: Vec<usize>, right: Vec<usize>) -> Vec<usize> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut l, mut r) = (left.into_iter().peekable(), right.into_iter().peekable());

    loop {
        let next = match (l.peek().copied(), r.peek().copied()) {
            (Some(a), Some(b)) if a <= b => l.next(),
            (Some(_), Some(_)) => r.next(),
            (Some(_), None) => l.next(),
            (None, Some(_)) => r.next(),
            (None, None) => break,
        };
        merged.extend(next);
    }

    merged
}
