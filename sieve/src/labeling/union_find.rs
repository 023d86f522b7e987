/// Union-find over provisional run labels `1..=len`.
///
/// The root of every set is its smallest label, so flattening in label
/// order numbers sets by their first-created member.
#[derive(Debug, Default, Clone)]
pub(super) struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    pub(super) fn new() -> Self {
        Self {
            parent: Vec::with_capacity(256),
        }
    }

    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            parent: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub(super) fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    #[inline]
    pub(super) fn make_set(&mut self) -> u32 {
        let label = self.parent.len() as u32 + 1;
        self.parent.push(label);
        label
    }

    /// Find root with iterative path compression (two-pass).
    #[inline]
    pub(super) fn find(&mut self, label: u32) -> u32 {
        debug_assert!(label >= 1 && label as usize <= self.parent.len());

        let mut root = label;
        loop {
            let parent = self.parent[(root - 1) as usize];
            if parent == root {
                break;
            }
            root = parent;
        }

        let mut current = label;
        while current != root {
            let idx = (current - 1) as usize;
            let parent = self.parent[idx];
            self.parent[idx] = root;
            current = parent;
        }

        root
    }

    #[inline]
    pub(super) fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (smaller, larger) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[(larger - 1) as usize] = smaller;
        }
    }

    /// Append the sets of `other`, shifting its labels past ours.
    /// Returns the shift.
    pub(super) fn append(&mut self, other: &UnionFind) -> u32 {
        let offset = self.parent.len() as u32;
        self.parent
            .extend(other.parent.iter().map(|&parent| parent + offset));
        offset
    }

    /// Map every provisional label to a final label `1..=n`, numbered in
    /// order of each set's smallest member. Index 0 maps to 0.
    pub(super) fn flatten(&mut self) -> (Vec<u32>, usize) {
        let len = self.parent.len();
        let mut label_map = vec![0u32; len + 1];
        let mut num_labels = 0u32;

        for i in 1..=len as u32 {
            let root = self.find(i);
            if label_map[root as usize] == 0 {
                num_labels += 1;
                label_map[root as usize] = num_labels;
            }
            label_map[i as usize] = label_map[root as usize];
        }

        (label_map, num_labels as usize)
    }
}
