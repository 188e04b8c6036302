//! The geometry-agnostic graph core: vertices, edges, junction pairs, and a
//! pair-respecting breadth-first path search.
//!
//! Pairs are stored as plain values — a canonical `(edge, sign)` 2-set — rather
//! than references into an edge's own array, so a split never leaves anything
//! dangling: every lookup re-resolves the pair against the edge's current
//! vertex list.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};

use crate::error::{GraphError, GraphResult};
use crate::ids::{EdgeId, IdMinter, VertexId};

/// One side of a pair: the edge, and which direction along it (`+1` toward
/// increasing position, `-1` toward decreasing position).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Side(pub EdgeId, pub i8);

/// A canonical, unordered 2-set of sides, authorizing through-traversal
/// between them at the vertex that holds it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Pair(Side, Side);

/// Replaces `Side(from_edge, from_sign)` with `Side(to_edge, to_sign)` inside
/// a pair, re-canonicalizing afterward since the edge id ordering may change.
fn rewrite_side(pair: &mut Pair, from_edge: EdgeId, from_sign: i8, to_edge: EdgeId, to_sign: i8) {
	let (mut a, mut b) = pair.sides();
	if a == Side(from_edge, from_sign) {
		a = Side(to_edge, to_sign);
	} else if b == Side(from_edge, from_sign) {
		b = Side(to_edge, to_sign);
	} else {
		return;
	}
	*pair = Pair::canonical(a, b);
}

impl Pair {
	fn canonical(a: Side, b: Side) -> Self {
		let ka = (a.0.raw(), a.1);
		let kb = (b.0.raw(), b.1);
		if ka <= kb {
			Pair(a, b)
		} else {
			Pair(b, a)
		}
	}

	pub fn sides(&self) -> (Side, Side) {
		(self.0, self.1)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VertexQuery {
	Nearest,
	After,
	Before,
}

#[derive(Clone, Debug, Default)]
struct Vertex {
	holders: IndexSet<EdgeId>,
	pairs: Vec<Pair>,
}

#[derive(Clone, Debug)]
struct Edge {
	/// Sorted ascending by position; first is `(0, _)`, last is `(length, _)`.
	vertices: Vec<(i64, VertexId)>,
	siblings: HashSet<EdgeId>,
}

impl Edge {
	fn length(&self) -> i64 {
		self.vertices.last().unwrap().0
	}

	fn index_of(&self, v: VertexId) -> Option<usize> {
		self.vertices.iter().position(|(_, id)| *id == v)
	}
}

#[derive(Clone, Debug)]
pub struct EdgeDetails {
	pub edge: EdgeId,
	pub low_vertex: VertexId,
	pub high_vertex: VertexId,
	pub length: i64,
	pub siblings: Vec<EdgeId>,
	pub vertices: Vec<(i64, VertexId)>,
}

/// The pair of fresh edges a `split` produces, and enough detail for a
/// caller tracking per-edge side state (such as the reservation engine) to
/// re-key its own bookkeeping from `old_edge` onto the two replacements.
#[derive(Clone, Copy, Debug)]
pub struct SplitOutcome {
	pub via: VertexId,
	pub old_edge: EdgeId,
	/// Covers what used to be `[0, boundary]` of `old_edge`.
	pub low_edge: EdgeId,
	/// Covers what used to be `[boundary, old_edge.length]` of `old_edge`.
	pub high_edge: EdgeId,
	pub boundary: i64,
}

/// The result of resolving the single edge directly connecting two vertices.
#[derive(Clone, Debug)]
pub struct Segment {
	pub edge: EdgeId,
	/// `+1` if `low` precedes `high` on the edge, `-1` otherwise.
	pub sign: i8,
	pub distance: i64,
	/// Interior vertices strictly between `low` and `high`, in travel order.
	pub interior: Vec<VertexId>,
}

/// One endpoint of a `search` call.
#[derive(Clone, Copy, Debug)]
pub enum Endpoint {
	Vertex(VertexId),
	OnEdge { edge: EdgeId, at: i64, prev_vertex: Option<VertexId> },
}

pub const DEFAULT_SEARCH_BUDGET: usize = 10_000;

#[derive(Clone, Debug, Default)]
pub struct Graph {
	vertices: IndexMap<VertexId, Vertex>,
	edges: IndexMap<EdgeId, Edge>,
	vertex_ids: IdMinter<VertexId>,
	edge_ids: IdMinter<EdgeId>,
}

impl Graph {
	pub fn new() -> Self {
		Self::default()
	}

	fn vertex(&self, v: VertexId) -> GraphResult<&Vertex> {
		self.vertices.get(&v).ok_or_else(|| GraphError::UnknownId(format!("{:?}", v)))
	}

	fn vertex_mut(&mut self, v: VertexId) -> GraphResult<&mut Vertex> {
		self.vertices.get_mut(&v).ok_or_else(|| GraphError::UnknownId(format!("{:?}", v)))
	}

	fn edge(&self, e: EdgeId) -> GraphResult<&Edge> {
		self.edges.get(&e).ok_or_else(|| GraphError::UnknownId(format!("{:?}", e)))
	}

	fn edge_mut(&mut self, e: EdgeId) -> GraphResult<&mut Edge> {
		self.edges.get_mut(&e).ok_or_else(|| GraphError::UnknownId(format!("{:?}", e)))
	}

	// -- construction -----------------------------------------------------

	pub fn add_vertex(&mut self, id: Option<VertexId>) -> GraphResult<VertexId> {
		let id = match id {
			Some(id) => {
				if self.vertices.contains_key(&id) {
					return Err(GraphError::DuplicateId(id));
				}
				self.vertex_ids.observe(id);
				id
			}
			None => self.vertex_ids.mint(),
		};
		self.vertices.insert(id, Vertex::default());
		Ok(id)
	}

	pub fn connect(&mut self, a: VertexId, b: VertexId, length: i64) -> GraphResult<EdgeId> {
		if a == b {
			return Err(GraphError::SameVertex);
		}
		if length <= 0 {
			return Err(GraphError::BadLength);
		}
		self.vertex(a)?;
		self.vertex(b)?;
		for e in self.vertex(a)?.holders.iter() {
			if self.edge(*e)?.index_of(b).is_some() {
				return Err(GraphError::AlreadyConnected(a, b));
			}
		}

		let id = self.edge_ids.mint();
		self.edges.insert(id, Edge { vertices: vec![(0, a), (length, b)], siblings: HashSet::new() });
		self.vertex_mut(a)?.holders.insert(id);
		self.vertex_mut(b)?.holders.insert(id);
		self.rebuild_all_siblings();
		log::debug!("connected {:?}--{:?} as {:?} ({} units)", a, b, id, length);
		Ok(id)
	}

	/// Inserts `via` as an interior vertex between `a` and `b`, which must be
	/// directly (and solely) connected by one edge. The old edge is replaced
	/// by two fresh ones; any pair at `a` or `b` that pointed across the old
	/// edge is rewired to point at the new one on its side, and a new
	/// straight-through pair is created at `via`.
	pub fn split(&mut self, a: VertexId, via: Option<VertexId>, b: VertexId, at: i64) -> GraphResult<SplitOutcome> {
		let seg = self.find_between(a, b)?;
		if !seg.interior.is_empty() {
			return Err(GraphError::NotConnected(a, b));
		}
		let old_edge = seg.edge;
		let length = seg.distance;
		let adjusted = if at < 0 { length + at } else { at };
		if adjusted <= 0 || adjusted >= length {
			return Err(GraphError::BadOffset(at));
		}
		// `boundary` is measured from the edge's own low vertex, independent
		// of whether the caller's `a` happens to be that low vertex.
		let boundary = if seg.sign > 0 { adjusted } else { length - adjusted };
		let (low, high) = {
			let edge = self.edge(old_edge)?;
			(edge.vertices.first().unwrap().1, edge.vertices.last().unwrap().1)
		};

		let via = match via {
			Some(id) => {
				if let Some(existing) = self.vertices.get(&id) {
					if !existing.holders.is_empty() {
						return Err(GraphError::SplitOntoOccupiedVertex(id));
					}
				} else {
					self.vertex_ids.observe(id);
					self.vertices.insert(id, Vertex::default());
				}
				id
			}
			None => self.add_vertex(None)?,
		};

		let low_edge = self.edge_ids.mint();
		self.edges.insert(low_edge, Edge { vertices: vec![(0, low), (boundary, via)], siblings: HashSet::new() });
		let high_edge = self.edge_ids.mint();
		self.edges.insert(high_edge, Edge { vertices: vec![(0, via), (length - boundary, high)], siblings: HashSet::new() });

		self.vertex_mut(low)?.holders.shift_remove(&old_edge);
		self.vertex_mut(low)?.holders.insert(low_edge);
		self.vertex_mut(high)?.holders.shift_remove(&old_edge);
		self.vertex_mut(high)?.holders.insert(high_edge);
		self.vertex_mut(via)?.holders.insert(low_edge);
		self.vertex_mut(via)?.holders.insert(high_edge);
		self.edges.shift_remove(&old_edge);

		// `low` sits at position 0 on both the old and new low-side edge, so
		// its pair sides pointing across the old edge (sign +1) carry over
		// unchanged except for the edge id; symmetric for `high` (sign -1).
		for p in self.vertex_mut(low)?.pairs.iter_mut() {
			rewrite_side(p, old_edge, 1, low_edge, 1);
		}
		for p in self.vertex_mut(high)?.pairs.iter_mut() {
			rewrite_side(p, old_edge, -1, high_edge, -1);
		}
		let through = Pair::canonical(Side(low_edge, -1), Side(high_edge, 1));
		self.vertex_mut(via)?.pairs.push(through);

		self.rebuild_all_siblings();
		log::debug!("split {:?} into {:?}/{:?} via {:?} at {}", old_edge, low_edge, high_edge, via, boundary);
		Ok(SplitOutcome { via, old_edge, low_edge, high_edge, boundary })
	}

	pub fn join(&mut self, a: VertexId, via: VertexId, b: VertexId) -> GraphResult<bool> {
		let side_a = self.side_toward(via, a)?;
		let side_b = self.side_toward(via, b)?;
		if side_a.0 == side_b.0 {
			return Err(GraphError::SameEdgeJoin);
		}
		let pair = Pair::canonical(side_a, side_b);
		let vertex = self.vertex_mut(via)?;
		if vertex.pairs.contains(&pair) {
			return Ok(false);
		}
		vertex.pairs.push(pair);
		log::debug!("joined {:?}--{:?}--{:?}", a, via, b);
		Ok(true)
	}

	/// Finds the `Side` at `from` whose direction leads immediately to `to`.
	fn side_toward(&self, from: VertexId, to: VertexId) -> GraphResult<Side> {
		for e in self.vertex(from)?.holders.iter().copied() {
			let edge = self.edge(e)?;
			if let Some(idx) = edge.index_of(from) {
				for sign in [1i8, -1i8] {
					if self.adjacent_index(edge, idx, sign).map(|i| edge.vertices[i].1) == Some(to) {
						return Ok(Side(e, sign));
					}
				}
			}
		}
		Err(GraphError::NotConnected(from, to))
	}

	pub fn merge(&mut self, a: VertexId, b: VertexId) -> GraphResult<VertexId> {
		if a == b {
			return Ok(a);
		}
		self.vertex(a)?;
		self.vertex(b)?;
		let (survivor, loser) = if self.vertex(a)?.holders.len() >= self.vertex(b)?.holders.len() { (a, b) } else { (b, a) };

		let loser_edges: Vec<EdgeId> = self.vertex(loser)?.holders.iter().copied().collect();
		let survivor_edges: Vec<EdgeId> = self.vertex(survivor)?.holders.iter().copied().collect();
		let mut union: IndexSet<EdgeId> = survivor_edges.iter().copied().collect();
		union.extend(loser_edges.iter().copied());
		let union: Vec<EdgeId> = union.into_iter().collect();

		// Preflight: no rewrite may place `survivor` twice on one edge, and no
		// two distinct edges may end up sharing two vertices.
		let mut rewritten: HashMap<EdgeId, HashSet<VertexId>> = HashMap::new();
		for &e in &union {
			let edge = self.edge(e)?;
			let mut verts: HashSet<VertexId> = HashSet::new();
			let mut survivor_count = 0usize;
			for &(_, v) in &edge.vertices {
				let v = if v == loser { survivor } else { v };
				if v == survivor {
					survivor_count += 1;
				}
				verts.insert(v);
			}
			if survivor_count > 1 {
				return Err(GraphError::MergeOnSameEdge(e));
			}
			rewritten.insert(e, verts);
		}
		for i in 0..union.len() {
			for j in (i + 1)..union.len() {
				let (ei, ej) = (union[i], union[j]);
				let shared = rewritten[&ei].intersection(&rewritten[&ej]).count();
				if shared > 1 {
					return Err(GraphError::DoubleConnectionAfterMerge(ei, ej));
				}
			}
		}

		// Mutate.
		for &e in &loser_edges {
			let edge = self.edge_mut(e)?;
			for (_, v) in edge.vertices.iter_mut() {
				if *v == loser {
					*v = survivor;
				}
			}
		}
		let loser_pairs = self.vertex(loser)?.pairs.clone();
		let loser_holders: Vec<EdgeId> = self.vertex(loser)?.holders.iter().copied().collect();
		{
			let survivor_vertex = self.vertex_mut(survivor)?;
			for e in loser_holders {
				survivor_vertex.holders.insert(e);
			}
			for p in loser_pairs {
				if !survivor_vertex.pairs.contains(&p) {
					survivor_vertex.pairs.push(p);
				}
			}
		}
		self.vertices.shift_remove(&loser);
		self.rebuild_all_siblings();
		log::debug!("merged {:?} into {:?}", loser, survivor);
		Ok(survivor)
	}

	/// Recomputes every edge's sibling set from scratch. Cheap relative to the
	/// structural mutations that trigger it, and immune to staleness from
	/// edges that get deleted outright (as `split` and rejoin-on-cleanup do).
	fn rebuild_all_siblings(&mut self) {
		for edge in self.edges.values_mut() {
			edge.siblings.clear();
		}
		let vertex_ids: Vec<VertexId> = self.vertices.keys().copied().collect();
		for v in vertex_ids {
			let holders: Vec<EdgeId> = self.vertices[&v].holders.iter().copied().collect();
			for i in 0..holders.len() {
				for j in 0..holders.len() {
					if i != j {
						self.edges.get_mut(&holders[i]).unwrap().siblings.insert(holders[j]);
					}
				}
			}
		}
	}

	// -- queries ------------------------------------------------------------

	pub fn edge_details(&self, e: EdgeId) -> GraphResult<EdgeDetails> {
		let edge = self.edge(e)?;
		Ok(EdgeDetails {
			edge: e,
			low_vertex: edge.vertices.first().unwrap().1,
			high_vertex: edge.vertices.last().unwrap().1,
			length: edge.length(),
			siblings: edge.siblings.iter().copied().collect(),
			vertices: edge.vertices.clone(),
		})
	}

	fn adjacent_index(&self, edge: &Edge, idx: usize, sign: i8) -> Option<usize> {
		match sign {
			1 => {
				if idx + 1 < edge.vertices.len() {
					Some(idx + 1)
				} else {
					None
				}
			}
			-1 => idx.checked_sub(1),
			_ => None,
		}
	}

	pub fn find_vertex(&self, e: EdgeId, at: i64, query: VertexQuery) -> GraphResult<Option<VertexId>> {
		let edge = self.edge(e)?;
		match query {
			VertexQuery::After => Ok(edge.vertices.iter().find(|(p, _)| *p > at).map(|(_, v)| *v)),
			VertexQuery::Before => Ok(edge.vertices.iter().rev().find(|(p, _)| *p < at).map(|(_, v)| *v)),
			VertexQuery::Nearest => Ok(edge
				.vertices
				.iter()
				.min_by_key(|(p, _)| ((*p - at).abs(), *p))
				.map(|(_, v)| *v)),
		}
	}

	pub fn exact_vertex(&self, e: EdgeId, at: i64) -> GraphResult<Option<VertexId>> {
		let edge = self.edge(e)?;
		Ok(edge.vertices.iter().find(|(p, _)| *p == at).map(|(_, v)| *v))
	}

	pub fn vertex_on_edge(&self, e: EdgeId, v: VertexId) -> GraphResult<(i64, Option<VertexId>, Option<VertexId>)> {
		let edge = self.edge(e)?;
		let idx = edge.index_of(v).ok_or_else(|| GraphError::UnknownId(format!("{:?} not on {:?}", v, e)))?;
		let pos = edge.vertices[idx].0;
		let prev = self.adjacent_index(edge, idx, -1).map(|i| edge.vertices[i].1);
		let next = self.adjacent_index(edge, idx, 1).map(|i| edge.vertices[i].1);
		Ok((pos, prev, next))
	}

	pub fn pairs_at(&self, v: VertexId) -> GraphResult<Vec<(VertexId, VertexId)>> {
		let vertex = self.vertex(v)?;
		let mut out = Vec::new();
		for pair in &vertex.pairs {
			let (sa, sb) = pair.sides();
			let na = self.resolve_side(v, sa)?;
			let nb = self.resolve_side(v, sb)?;
			out.push((na, nb));
		}
		for &e in vertex.holders.iter() {
			let edge = self.edge(e)?;
			let idx = edge.index_of(v).unwrap();
			if idx > 0 && idx + 1 < edge.vertices.len() {
				out.push((edge.vertices[idx - 1].1, edge.vertices[idx + 1].1));
			}
		}
		Ok(out)
	}

	fn resolve_side(&self, v: VertexId, side: Side) -> GraphResult<VertexId> {
		let edge = self.edge(side.0)?;
		let idx = edge.index_of(v).ok_or_else(|| GraphError::InternalInvariant(format!("pair at {:?} references edge {:?} it isn't on", v, side.0)))?;
		self.adjacent_index(edge, idx, side.1)
			.map(|i| edge.vertices[i].1)
			.ok_or_else(|| GraphError::InternalInvariant(format!("pair side {:?} at {:?} has no neighbour", side, v)))
	}

	pub fn dirs_from(&self, v: VertexId) -> GraphResult<Vec<VertexId>> {
		let vertex = self.vertex(v)?;
		let mut seen = IndexSet::new();
		for &e in vertex.holders.iter() {
			let edge = self.edge(e)?;
			let idx = edge.index_of(v).unwrap();
			if let Some(i) = self.adjacent_index(edge, idx, 1) {
				seen.insert(edge.vertices[i].1);
			}
			if let Some(i) = self.adjacent_index(edge, idx, -1) {
				seen.insert(edge.vertices[i].1);
			}
		}
		Ok(seen.into_iter().collect())
	}

	pub fn find_between(&self, low: VertexId, high: VertexId) -> GraphResult<Segment> {
		self.vertex(low)?;
		self.vertex(high)?;
		if low == high {
			return Err(GraphError::NotConnected(low, high));
		}
		let mut found = None;
		for &e in self.vertex(low)?.holders.iter() {
			let edge = self.edge(e)?;
			if let (Some(ilow), Some(ihigh)) = (edge.index_of(low), edge.index_of(high)) {
				found = Some((e, ilow, ihigh));
				break;
			}
		}
		let (e, ilow, ihigh) = found.ok_or(GraphError::NotConnected(low, high))?;
		let edge = self.edge(e)?;
		let sign: i8 = if ilow < ihigh { 1 } else { -1 };
		let (from, to) = if ilow < ihigh { (ilow, ihigh) } else { (ihigh, ilow) };
		let mut interior: Vec<VertexId> = edge.vertices[from + 1..to].iter().map(|(_, v)| *v).collect();
		if sign < 0 {
			interior.reverse();
		}
		let distance = (edge.vertices[ihigh].0 - edge.vertices[ilow].0).abs();
		Ok(Segment { edge: e, sign, distance, interior })
	}

	pub fn all_vertices(&self) -> Vec<VertexId> {
		self.vertices.keys().copied().collect()
	}

	pub fn all_edges(&self) -> Vec<EdgeId> {
		self.edges.keys().copied().collect()
	}

	// -- path search ----------------------------------------------------------

	fn materialize_endpoint(&mut self, ep: Endpoint, synthesized: &mut Vec<VertexId>) -> GraphResult<(VertexId, bool, Option<VertexId>, Option<SplitOutcome>)> {
		match ep {
			Endpoint::Vertex(v) => {
				self.vertex(v)?;
				Ok((v, false, None, None))
			}
			Endpoint::OnEdge { edge, at, prev_vertex } => {
				let (low, high, length) = {
					let e = self.edge(edge)?;
					(e.vertices.first().unwrap().1, e.vertices.last().unwrap().1, e.length())
				};
				if at < 0 || at > length {
					return Err(GraphError::InvalidEndpoint);
				}
				if at == 0 {
					return Ok((low, false, prev_vertex, None));
				}
				if at == length {
					return Ok((high, false, prev_vertex, None));
				}
				let outcome = self.split(low, None, high, at)?;
				synthesized.push(outcome.via);
				Ok((outcome.via, true, prev_vertex, Some(outcome)))
			}
		}
	}

	/// Rewrites `ep` onto whichever of `outcome`'s two new edges now covers
	/// its position, if `ep` referenced `outcome.old_edge` at all. Needed
	/// when both `search` endpoints land on the same edge: materializing the
	/// first splits it out from under the second's edge id.
	fn redirect_onto_split(ep: Endpoint, outcome: &SplitOutcome) -> Endpoint {
		match ep {
			Endpoint::OnEdge { edge, at, prev_vertex } if edge == outcome.old_edge => {
				if at <= outcome.boundary {
					Endpoint::OnEdge { edge: outcome.low_edge, at, prev_vertex }
				} else {
					Endpoint::OnEdge { edge: outcome.high_edge, at: at - outcome.boundary, prev_vertex }
				}
			}
			other => other,
		}
	}

	/// The endpoint of `e` that isn't `v`. Every edge has exactly two.
	pub fn other_endpoint(&self, e: EdgeId, v: VertexId) -> GraphResult<VertexId> {
		let edge = self.edge(e)?;
		let (low, high) = (edge.vertices.first().unwrap().1, edge.vertices.last().unwrap().1);
		if low == v {
			Ok(high)
		} else if high == v {
			Ok(low)
		} else {
			Err(GraphError::UnknownId(format!("{:?} not on {:?}", v, e)))
		}
	}

	/// Reverses a `split`: `via` must still be a plain interior vertex with
	/// exactly its original straight-through pair and no other edges, pairs,
	/// or (per the caller's `occupied` predicate) reservations on it.
	fn unsplit(&mut self, via: VertexId) -> GraphResult<()> {
		let vertex = self.vertex(via)?;
		if vertex.holders.len() != 2 || vertex.pairs.len() != 1 {
			return Err(GraphError::InternalInvariant(format!("{:?} cannot be cleaned up: not a plain split vertex", via)));
		}
		let holders: Vec<EdgeId> = vertex.holders.iter().copied().collect();
		let (e1, e2) = (holders[0], holders[1]);
		let l1 = self.other_endpoint(e1, via)?;
		let l2 = self.other_endpoint(e2, via)?;
		let total_len = self.edge(e1)?.length() + self.edge(e2)?.length();

		self.vertex_mut(l1)?.holders.shift_remove(&e1);
		self.vertex_mut(l2)?.holders.shift_remove(&e2);
		self.edges.shift_remove(&e1);
		self.edges.shift_remove(&e2);
		self.vertices.shift_remove(&via);
		self.connect(l1, l2, total_len)?;
		log::debug!("unsplit {:?}, rejoining {:?}--{:?} ({} units)", via, l1, l2, total_len);
		Ok(())
	}

	fn cleanup_synthesized(&mut self, synthesized: &[VertexId], occupied: &dyn Fn(VertexId) -> bool) -> GraphResult<()> {
		for &via in synthesized {
			if !self.vertices.contains_key(&via) {
				log::trace!("synthesized vertex {:?} already folded back in, skipping cleanup", via);
				continue; // already folded back in (from-endpoint == to-endpoint case)
			}
			if occupied(via) {
				log::trace!("synthesized vertex {:?} is occupied, leaving the split in place", via);
				continue;
			}
			self.unsplit(via)?;
		}
		Ok(())
	}

	pub fn search(
		&mut self,
		from: Endpoint,
		to: Endpoint,
		budget: Option<usize>,
		occupied: &dyn Fn(VertexId) -> bool,
	) -> GraphResult<Vec<Option<VertexId>>> {
		log::trace!("search attempt from {:?} to {:?} (budget {:?})", from, to, budget);
		let mut synthesized = Vec::new();
		let (source, source_synth, source_hint, split) = self.materialize_endpoint(from, &mut synthesized)?;
		let to = match &split {
			Some(outcome) => Self::redirect_onto_split(to, outcome),
			None => to,
		};
		let (target, target_synth, _, _) = self.materialize_endpoint(to, &mut synthesized)?;

		let result = self.run_search(source, source_hint, target, budget.unwrap_or(DEFAULT_SEARCH_BUDGET));
		self.cleanup_synthesized(&synthesized, occupied)?;
		let seq = result;
		match &seq {
			Ok(path) => log::debug!("search found a path of {} vertices", path.len()),
			Err(e) => log::debug!("search failed: {}", e),
		}
		let mut seq = seq?;
		let last = seq.len() - 1;
		Ok(seq
			.drain(..)
			.enumerate()
			.map(|(i, v)| if (i == 0 && source_synth) || (i == last && target_synth) { None } else { Some(v) })
			.collect())
	}

	fn run_search(&self, source: VertexId, source_hint: Option<VertexId>, target: VertexId, budget: usize) -> GraphResult<Vec<VertexId>> {
		log::trace!("run_search {:?} -> {:?} (hint {:?}, budget {})", source, target, source_hint, budget);
		if source == target {
			return Ok(vec![source]);
		}
		let mut queue: VecDeque<(VertexId, VertexId)> = VecDeque::new();
		let mut parent: HashMap<(VertexId, VertexId), Option<(VertexId, VertexId)>> = HashMap::new();
		let mut visited: HashSet<(VertexId, VertexId)> = HashSet::new();

		if let Some(prev) = source_hint {
			queue.push_back((prev, source));
			parent.insert((prev, source), None);
		} else {
			for w in self.dirs_from(source)? {
				let key = (source, w);
				parent.entry(key).or_insert(None);
				queue.push_back(key);
			}
		}

		let mut pops = 0usize;
		let mut found = None;
		while let Some(arrival) = queue.pop_front() {
			if visited.contains(&arrival) {
				continue;
			}
			visited.insert(arrival);
			pops += 1;
			if pops > budget {
				log::trace!("run_search exhausted its budget of {} pops", budget);
				return Err(GraphError::SearchBudgetExceeded(budget));
			}
			let (prev, v) = arrival;
			if v == target {
				found = Some(arrival);
				break;
			}
			for (n1, n2) in self.pairs_at(v)? {
				for (side_in, side_out) in [(n1, n2), (n2, n1)] {
					if side_in == prev {
						let key = (v, side_out);
						if !visited.contains(&key) {
							parent.entry(key).or_insert(Some(arrival));
							queue.push_back(key);
						}
					}
				}
			}
		}

		let found = found.ok_or(GraphError::NoPath)?;
		let mut seq = Vec::new();
		let mut cur = Some(found);
		while let Some(arr) = cur {
			seq.push(arr.1);
			cur = *parent.get(&arr).unwrap();
		}
		seq.reverse();
		if seq.first() != Some(&source) {
			seq.insert(0, source);
		}
		Ok(seq)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn line(g: &mut Graph, n: usize, len: i64) -> Vec<VertexId> {
		let vs: Vec<_> = (0..n).map(|_| g.add_vertex(None).unwrap()).collect();
		for w in vs.windows(2) {
			g.connect(w[0], w[1], len).unwrap();
		}
		vs
	}

	#[test]
	fn simple_connect_and_query() {
		let mut g = Graph::new();
		let a = g.add_vertex(None).unwrap();
		let b = g.add_vertex(None).unwrap();
		let e = g.connect(a, b, 100).unwrap();
		let details = g.edge_details(e).unwrap();
		assert_eq!(details.low_vertex, a);
		assert_eq!(details.high_vertex, b);
		assert_eq!(details.length, 100);
		assert_eq!(g.find_vertex(e, 0, VertexQuery::Nearest).unwrap(), Some(a));
		assert_eq!(g.find_vertex(e, 100, VertexQuery::Nearest).unwrap(), Some(b));
		assert_eq!(g.find_vertex(e, 0, VertexQuery::Before).unwrap(), None);
		assert_eq!(g.find_vertex(e, 100, VertexQuery::After).unwrap(), None);
	}

	#[test]
	fn split_preserves_straight_through() {
		let mut g = Graph::new();
		let a = g.add_vertex(None).unwrap();
		let b = g.add_vertex(None).unwrap();
		g.connect(a, b, 100).unwrap();
		let outcome = g.split(a, None, b, 40).unwrap();
		let m = outcome.via;
		let pairs = g.pairs_at(m).unwrap();
		assert_eq!(pairs, vec![(a, b)]);
		assert!(g.edge_details(outcome.old_edge).is_err());
		assert_eq!(g.edge_details(outcome.low_edge).unwrap().length, 40);
		assert_eq!(g.edge_details(outcome.high_edge).unwrap().length, 60);
		let path = g.search(Endpoint::Vertex(a), Endpoint::Vertex(b), None, &|_| false).unwrap();
		assert_eq!(path, vec![Some(a), Some(m), Some(b)]);
	}

	#[test]
	fn triangle_is_legal() {
		let mut g = Graph::new();
		let a = g.add_vertex(None).unwrap();
		let b = g.add_vertex(None).unwrap();
		let c = g.add_vertex(None).unwrap();
		g.connect(a, b, 100).unwrap();
		g.connect(b, c, 100).unwrap();
		g.connect(c, a, 100).unwrap();
	}

	#[test]
	fn double_connection_refused() {
		let mut g = Graph::new();
		let a = g.add_vertex(None).unwrap();
		let b = g.add_vertex(None).unwrap();
		let a2 = g.add_vertex(None).unwrap();
		let b2 = g.add_vertex(None).unwrap();
		g.connect(a, b, 10).unwrap();
		g.connect(a2, b2, 10).unwrap();
		g.merge(a, a2).unwrap();
		let err = g.merge(b, b2).unwrap_err();
		assert!(matches!(err, GraphError::DoubleConnectionAfterMerge(_, _)));
	}

	#[test]
	fn join_restricts_oracle_candidates() {
		let mut g = Graph::new();
		let a = g.add_vertex(None).unwrap();
		let m = g.add_vertex(None).unwrap();
		let b = g.add_vertex(None).unwrap();
		let c = g.add_vertex(None).unwrap();
		g.connect(a, m, 10).unwrap();
		g.connect(m, b, 10).unwrap();
		g.connect(m, c, 10).unwrap();
		g.join(a, m, b).unwrap();
		let pairs = g.pairs_at(m).unwrap();
		assert_eq!(pairs, vec![(a, b)]);
		assert!(g.search(Endpoint::Vertex(a), Endpoint::Vertex(c), None, &|_| false).is_err());
	}

	#[test]
	fn split_offset_boundaries() {
		let mut g = Graph::new();
		let a = g.add_vertex(None).unwrap();
		let b = g.add_vertex(None).unwrap();
		g.connect(a, b, 10).unwrap();
		assert!(g.split(a, None, b, 0).is_err());
		assert!(g.split(a, None, b, 10).is_err());
		assert!(g.split(a, None, b, 11).is_err());

		let mut g2 = Graph::new();
		let a2 = g2.add_vertex(None).unwrap();
		let b2 = g2.add_vertex(None).unwrap();
		g2.connect(a2, b2, 10).unwrap();
		assert!(g2.split(a2, None, b2, 1).is_ok());

		let mut g3 = Graph::new();
		let a3 = g3.add_vertex(None).unwrap();
		let b3 = g3.add_vertex(None).unwrap();
		g3.connect(a3, b3, 10).unwrap();
		assert!(g3.split(a3, None, b3, 9).is_ok());
	}

	#[test]
	fn search_cleans_up_synthesized_vertex() {
		let mut g = Graph::new();
		let vs = line(&mut g, 2, 100);
		let (a, b) = (vs[0], vs[1]);
		let edge = g.all_edges()[0];
		let path = g
			.search(Endpoint::OnEdge { edge, at: 30, prev_vertex: None }, Endpoint::Vertex(b), None, &|_| false)
			.unwrap();
		assert_eq!(path.first(), Some(&None));
		assert_eq!(path.last(), Some(&Some(b)));
		// the synthesized vertex should have been rejoined away again
		assert_eq!(g.all_vertices().len(), 2);
		assert_eq!(g.all_edges().len(), 1);
		assert_eq!(g.find_between(a, b).unwrap().distance, 100);
	}

	/// Both endpoints land on the same original edge: materializing the
	/// first splits that edge out from under the second's reference, so the
	/// second must be redirected onto whichever half the split left it on.
	#[test]
	fn search_between_two_points_on_the_same_edge() {
		let mut g = Graph::new();
		let vs = line(&mut g, 2, 100);
		let (a, b) = (vs[0], vs[1]);
		let edge = g.all_edges()[0];
		let path = g
			.search(Endpoint::OnEdge { edge, at: 30, prev_vertex: None }, Endpoint::OnEdge { edge, at: 70, prev_vertex: None }, None, &|_| false)
			.unwrap();
		assert_eq!(path, vec![None, None]);
		// both synthesized vertices get rejoined away again
		assert_eq!(g.all_vertices().len(), 2);
		assert_eq!(g.all_edges().len(), 1);
		assert_eq!(g.find_between(a, b).unwrap().distance, 100);
	}
}
