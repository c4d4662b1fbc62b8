//! Metadata nodes and named metadata.

use smallvec::SmallVec;

/// An opaque reference to [`MdNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MdNodeId(pub u32);
cranelift_entity::entity_impl!(MdNodeId);

/// A metadata attachment kind id.
///
/// Kind 0 is always the standard `dbg` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MdKind(pub u32);

/// The standard debug-location attachment kind.
pub const MD_DBG: MdKind = MdKind(0);

#[derive(Debug, Clone, Default)]
pub struct MdNode {
    pub operands: SmallVec<[MdOperand; 4]>,
}

#[derive(Debug, Clone)]
pub enum MdOperand {
    Node(MdNodeId),
    Str(String),
    Int(i64),
}

/// A module-level named metadata node.
#[derive(Debug, Clone)]
pub struct NamedMdNode {
    pub name: String,
    pub operands: Vec<MdNodeId>,
}
