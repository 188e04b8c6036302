//! Error kinds surfaced by the graph core and reservation engine.
//!
//! Every fallible operation returns `Result<T, GraphError>`. `InternalInvariant`
//! is the only kind that indicates a bug rather than a caller mistake; every
//! other kind is reported without mutating state.

use thiserror::Error;

use crate::ids::{EdgeId, VertexId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
	#[error("vertex {0:?} already exists")]
	DuplicateId(VertexId),
	#[error("unknown identifier: {0}")]
	UnknownId(String),
	#[error("edge length must be a positive integer")]
	BadLength,
	#[error("offset {0} is out of range for this edge")]
	BadOffset(i64),
	#[error("a vertex cannot be connected to itself")]
	SameVertex,
	#[error("the join's two sides resolve to the same edge")]
	SameEdgeJoin,
	#[error("{0:?} and {1:?} are already directly connected")]
	AlreadyConnected(VertexId, VertexId),
	#[error("{0:?} and {1:?} are not connected by a single edge")]
	NotConnected(VertexId, VertexId),
	#[error("merge would place the surviving vertex twice on edge {0:?}")]
	MergeOnSameEdge(EdgeId),
	#[error("merge would leave edges {0:?} and {1:?} sharing two vertices")]
	DoubleConnectionAfterMerge(EdgeId, EdgeId),
	#[error("split target vertex {0:?} is not isolated")]
	SplitOntoOccupiedVertex(VertexId),
	#[error("no path exists between the requested endpoints")]
	NoPath,
	#[error("endpoint does not reference a valid edge position")]
	InvalidEndpoint,
	#[error("search exceeded its frontier budget of {0} pops")]
	SearchBudgetExceeded(usize),
	#[error("internal invariant violated: {0}")]
	InternalInvariant(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
