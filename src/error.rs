//! Programmer and configuration errors raised by the tree.
//!
//! Interaction outcomes such as "nothing focusable" or "command not
//! applicable" are ordinary return values and never show up here.

use thiserror::Error;

use crate::node::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0:?} does not exist")]
    MissingNode(NodeId),
    #[error("node {child:?} is already attached to {parent:?}")]
    AlreadyAttached { child: NodeId, parent: NodeId },
    #[error("attaching {child:?} beneath {parent:?} would make it its own ancestor")]
    WouldCycle { child: NodeId, parent: NodeId },
    #[error("node {node:?} is not a descendant of {ancestor:?}")]
    NotInHierarchy { node: NodeId, ancestor: NodeId },
    #[error("layout cycle detected involving node {node:?} ({name})")]
    LayoutCycle { node: NodeId, name: String },
    #[error("tab index {index} cannot be assigned to node {node:?}")]
    TabIndexOutOfRange { node: NodeId, index: usize },
}

pub type Result<T, E = TreeError> = std::result::Result<T, E>;
