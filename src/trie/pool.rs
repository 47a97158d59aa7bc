/// Index of a block in the pool.
pub type PoolIndex = usize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildSlot {
    pub valid: bool,
    pub index: PoolIndex,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodePayload {
    /// never built
    #[default]
    Empty,
    Internal(Vec<ChildSlot>),
    Leaf(Box<[u8]>),
}

/// One reusable block of the pool. A block is never freed; it only moves between
/// free -> built(level) -> orphaned -> rebuilt(level') as the replacement engine reuses it.
#[derive(Debug, Clone, Default)]
pub struct PoolNode {
    pub valid: bool,
    pub parent_valid: bool,
    /// pinned blocks are never chosen as victims
    pub locked: bool,
    pub level: usize,
    pub dirty: bool,
    pub reference: u8,
    /// block address, meaningful for data blocks only
    pub tag: u64,
    /// top index slot at level 1, the parent's pool index deeper down
    pub parent: usize,
    pub payload: NodePayload,
}

impl PoolNode {
    pub fn is_orphaned(&self) -> bool {
        self.valid && !self.parent_valid
    }

    pub fn children(&self) -> &[ChildSlot] {
        match &self.payload {
            NodePayload::Internal(children) => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [ChildSlot] {
        match &mut self.payload {
            NodePayload::Internal(children) => children,
            _ => &mut [],
        }
    }

    pub fn data(&self) -> Option<&[u8]> {
        match &self.payload {
            NodePayload::Leaf(data) => Some(data),
            _ => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.payload {
            NodePayload::Leaf(data) => Some(data),
            _ => None,
        }
    }

    pub fn touch(&mut self, max_reference: u8) {
        if self.reference < max_reference {
            self.reference += 1;
        }
    }
}

/// Fixed-capacity array of blocks backing every BTH table and data block.
#[derive(Debug)]
pub struct BlockPool {
    nodes: Vec<PoolNode>,
}

impl BlockPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: vec![PoolNode::default(); capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolIndex, &PoolNode)> {
        self.nodes.iter().enumerate()
    }

    pub fn set_locked(&mut self, index: PoolIndex, locked: bool) {
        self.nodes[index].locked = locked;
    }
}

impl std::ops::Index<PoolIndex> for BlockPool {
    type Output = PoolNode;

    fn index(&self, index: PoolIndex) -> &PoolNode {
        &self.nodes[index]
    }
}

impl std::ops::IndexMut<PoolIndex> for BlockPool {
    fn index_mut(&mut self, index: PoolIndex) -> &mut PoolNode {
        &mut self.nodes[index]
    }
}
