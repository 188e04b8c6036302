//! Per-edge interval reservations for snakes growing and shrinking across the
//! graph, plus the bookkeeping needed to keep those reservations valid across
//! a structural split.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};

use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, SplitOutcome};
use crate::ids::{EdgeId, IdMinter, SnakeId, VertexId};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum End {
	Head,
	Tail,
}

impl End {
	pub fn opposite(self) -> End {
		match self {
			End::Head => End::Tail,
			End::Tail => End::Head,
		}
	}
}

#[derive(Clone, Copy, Debug)]
struct Interval {
	low: i64,
	high: i64,
	snake: SnakeId,
}

/// A snake's body: `vertex_sequence[0]` is the head's bracket vertex, the
/// last entry is the tail's. Both brackets stay in the sequence even while
/// an end still has slack before reaching (or after retreating from) them;
/// `head_offset`/`tail_offset` are the remaining distance from each end's
/// actual position to that bracket, zero exactly when the end sits on it.
#[derive(Clone, Debug)]
struct SnakeRecord {
	length: i64,
	vertex_sequence: Vec<VertexId>,
	head_offset: i64,
	tail_offset: i64,
}

/// A read-only snapshot of one snake's current body, for rendering or tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnakeState {
	pub length: i64,
	pub vertex_sequence: Vec<VertexId>,
	pub head_offset: i64,
	pub tail_offset: i64,
}

/// Candidate-choosing policy consulted whenever a growing end sits exactly
/// on a vertex and must pick which incident edge to continue into.
pub type Oracle<'a> = dyn FnMut(VertexId, &[VertexId]) -> Option<VertexId> + 'a;

#[derive(Clone, Debug, Default)]
pub struct ReservationEngine {
	edge_intervals: IndexMap<EdgeId, Vec<Interval>>,
	vertex_occupants: HashMap<VertexId, HashSet<SnakeId>>,
	snakes: IndexMap<SnakeId, SnakeRecord>,
	snake_ids: IdMinter<SnakeId>,
}

impl ReservationEngine {
	pub fn new() -> Self {
		Self::default()
	}

	fn record(&self, s: SnakeId) -> GraphResult<&SnakeRecord> {
		self.snakes.get(&s).ok_or_else(|| GraphError::UnknownId(format!("{:?}", s)))
	}

	fn record_mut(&mut self, s: SnakeId) -> GraphResult<&mut SnakeRecord> {
		self.snakes.get_mut(&s).ok_or_else(|| GraphError::UnknownId(format!("{:?}", s)))
	}

	pub fn add_snake(&mut self, at: VertexId) -> SnakeId {
		let id = self.snake_ids.mint();
		self.snakes.insert(id, SnakeRecord { length: 0, vertex_sequence: vec![at], head_offset: 0, tail_offset: 0 });
		self.vertex_occupants.entry(at).or_default().insert(id);
		log::debug!("snake {:?} placed at {:?}", id, at);
		id
	}

	pub fn remove_snake(&mut self, s: SnakeId) -> GraphResult<()> {
		let record = self.snakes.shift_remove(&s).ok_or_else(|| GraphError::UnknownId(format!("{:?}", s)))?;
		for v in &record.vertex_sequence {
			if let Some(set) = self.vertex_occupants.get_mut(v) {
				set.remove(&s);
				if set.is_empty() {
					self.vertex_occupants.remove(v);
				}
			}
		}
		for list in self.edge_intervals.values_mut() {
			list.retain(|iv| iv.snake != s);
		}
		log::debug!("snake {:?} removed", s);
		Ok(())
	}

	pub fn snake_state(&self, s: SnakeId) -> GraphResult<SnakeState> {
		let r = self.record(s)?;
		Ok(SnakeState { length: r.length, vertex_sequence: r.vertex_sequence.clone(), head_offset: r.head_offset, tail_offset: r.tail_offset })
	}

	/// Other snakes currently sharing any vertex with `s`. A bracket vertex
	/// only counts while its end's offset is exactly 0; every vertex strictly
	/// between the brackets is always occupied.
	pub fn query(&self, s: SnakeId) -> GraphResult<Vec<SnakeId>> {
		let r = self.record(s)?;
		let last = r.vertex_sequence.len() - 1;
		let mut out = IndexSet::new();
		for (i, v) in r.vertex_sequence.iter().enumerate() {
			let touches = if i == 0 { r.head_offset == 0 } else if i == last { r.tail_offset == 0 } else { true };
			if !touches {
				continue;
			}
			if let Some(set) = self.vertex_occupants.get(v) {
				for &o in set {
					if o != s {
						out.insert(o);
					}
				}
			}
		}
		Ok(out.into_iter().collect())
	}

	/// True if any snake other than `s` currently sits on `v`.
	pub fn is_occupied_by_other(&self, v: VertexId, s: SnakeId) -> bool {
		self.vertex_occupants.get(&v).map_or(false, |set| set.iter().any(|&o| o != s))
	}

	/// True if any snake at all currently sits on `v`.
	pub fn is_occupied(&self, v: VertexId) -> bool {
		self.vertex_occupants.get(&v).map_or(false, |set| !set.is_empty())
	}

	fn free_space(&self, edge: EdgeId, position: i64, direction: i8, edge_length: i64, mine: SnakeId) -> i64 {
		let boundary = if direction > 0 { edge_length } else { 0 };
		let mut limit = boundary;
		if let Some(list) = self.edge_intervals.get(&edge) {
			for iv in list {
				if iv.snake == mine {
					continue;
				}
				if direction > 0 {
					if iv.low >= position && iv.low < limit {
						limit = iv.low;
					}
				} else if iv.high <= position && iv.high > limit {
					limit = iv.high;
				}
			}
		}
		(limit - position).abs()
	}

	fn set_interval(&mut self, edge: EdgeId, snake: SnakeId, low: i64, high: i64) {
		let list = self.edge_intervals.entry(edge).or_default();
		list.retain(|iv| iv.snake != snake);
		if low < high {
			list.push(Interval { low, high, snake });
			list.sort_by_key(|iv| iv.low);
		}
		if list.is_empty() {
			self.edge_intervals.shift_remove(&edge);
		}
	}

	/// The vertices `s` genuinely touches right now: both brackets only count
	/// while their end's offset is 0, every vertex strictly between them
	/// always counts.
	fn touched(r: &SnakeRecord) -> HashSet<VertexId> {
		let last = r.vertex_sequence.len() - 1;
		r.vertex_sequence
			.iter()
			.enumerate()
			.filter(|&(i, _)| if i == 0 { r.head_offset == 0 } else if i == last { r.tail_offset == 0 } else { true })
			.map(|(_, v)| *v)
			.collect()
	}

	/// Brings `vertex_occupants` back in sync with `s`'s current body after a
	/// `grow`/`shrink` call, however many hops it crossed.
	fn reconcile_occupancy(&mut self, s: SnakeId, before: &HashSet<VertexId>, after: &HashSet<VertexId>) {
		for v in before.difference(after) {
			if let Some(set) = self.vertex_occupants.get_mut(v) {
				set.remove(&s);
				if set.is_empty() {
					self.vertex_occupants.remove(v);
				}
			}
		}
		for v in after.difference(before) {
			self.vertex_occupants.entry(*v).or_default().insert(s);
		}
	}

	/// The vertex immediately behind `end`'s bracket in the body (its partner
	/// on the current hop), used both to steer the oracle away from doubling
	/// back and to resolve the edge a still-approaching end travels on.
	fn partner_of(&self, s: SnakeId, end: End) -> GraphResult<Option<VertexId>> {
		let r = self.record(s)?;
		let len = r.vertex_sequence.len();
		Ok(match end {
			End::Head if len >= 2 => Some(r.vertex_sequence[1]),
			End::Tail if len >= 2 => Some(r.vertex_sequence[len - 2]),
			_ => None,
		})
	}

	fn candidates_at(&self, graph: &Graph, vertex: VertexId, prev: Option<VertexId>) -> GraphResult<Vec<VertexId>> {
		match prev {
			Some(p) => Ok(graph
				.pairs_at(vertex)?
				.into_iter()
				.filter_map(|(n1, n2)| if n1 == p { Some(n2) } else if n2 == p { Some(n1) } else { None })
				.collect()),
			None => graph.dirs_from(vertex),
		}
	}

	/// Extends `s` at `end` by up to `by` units, consulting `oracle` whenever
	/// the end sits exactly on a vertex and must choose the next edge.
	/// Returns the amount actually grown, in `[0, by]`.
	pub fn grow(&mut self, graph: &Graph, s: SnakeId, end: End, by: i64, oracle: &mut Oracle<'_>) -> GraphResult<i64> {
		if by < 0 {
			return Err(GraphError::BadOffset(by));
		}
		let before = Self::touched(self.record(s)?);
		let mut remaining = by;
		let mut grown = 0i64;
		while remaining > 0 {
			let len = self.record(s)?.vertex_sequence.len();
			let bracket = match end {
				End::Head => self.record(s)?.vertex_sequence[0],
				End::Tail => self.record(s)?.vertex_sequence[len - 1],
			};
			let offset = match end {
				End::Head => self.record(s)?.head_offset,
				End::Tail => self.record(s)?.tail_offset,
			};

			if offset == 0 {
				// A shared vertex halts progress from this end until occupancy
				// drops back to just this snake.
				if self.is_occupied_by_other(bracket, s) {
					break;
				}
				let prev = self.partner_of(s, end)?;
				let candidates = self.candidates_at(graph, bracket, prev)?;
				let chosen = oracle(bracket, &candidates);
				let Some(next_vertex) = chosen else {
					break;
				};
				if !candidates.contains(&next_vertex) {
					return Err(GraphError::InternalInvariant(format!("oracle chose {:?}, not a valid candidate at {:?}", next_vertex, bracket)));
				}
				let seg = graph.find_between(bracket, next_vertex)?;
				let hop_len = seg.distance;
				let anchor = graph.vertex_on_edge(seg.edge, bracket)?.0;
				let direction: i8 = if anchor == 0 { 1 } else { -1 };
				let free = self.free_space(seg.edge, anchor, direction, hop_len, s);
				if free <= 0 {
					break;
				}
				let consume = remaining.min(free);
				let tip = anchor + direction as i64 * consume;
				self.set_interval(seg.edge, s, anchor.min(tip), anchor.max(tip));
				self.push_bracket(s, end, next_vertex, hop_len - consume)?;
				remaining -= consume;
				grown += consume;
			} else {
				let partner = self.partner_of(s, end)?.ok_or_else(|| GraphError::InternalInvariant(format!("{:?} has a nonzero offset with no partner vertex", s)))?;
				let seg = graph.find_between(partner, bracket)?;
				let hop_len = seg.distance;
				let anchor = graph.vertex_on_edge(seg.edge, partner)?.0;
				let direction: i8 = if anchor == 0 { 1 } else { -1 };
				let reach = self.free_space(seg.edge, anchor, direction, hop_len, s);
				let room = reach - (hop_len - offset);
				if room <= 0 {
					break;
				}
				let consume = remaining.min(room);
				let new_offset = offset - consume;
				let tip = anchor + direction as i64 * (hop_len - new_offset);
				self.set_interval(seg.edge, s, anchor.min(tip), anchor.max(tip));
				self.set_offset(s, end, new_offset)?;
				remaining -= consume;
				grown += consume;
			}
		}
		self.record_mut(s)?.length += grown;
		let after = Self::touched(self.record(s)?);
		self.reconcile_occupancy(s, &before, &after);
		log::trace!("snake {:?} grew {:?} by {} (requested {})", s, end, grown, by);
		Ok(grown)
	}

	/// Installs `vertex` as the new bracket on `end`, pushing the old bracket
	/// one step further into the body's interior.
	fn push_bracket(&mut self, s: SnakeId, end: End, vertex: VertexId, offset: i64) -> GraphResult<()> {
		let r = self.record_mut(s)?;
		match end {
			End::Head => {
				r.vertex_sequence.insert(0, vertex);
				r.head_offset = offset;
			}
			End::Tail => {
				r.vertex_sequence.push(vertex);
				r.tail_offset = offset;
			}
		}
		Ok(())
	}

	fn set_offset(&mut self, s: SnakeId, end: End, offset: i64) -> GraphResult<()> {
		let r = self.record_mut(s)?;
		match end {
			End::Head => r.head_offset = offset,
			End::Tail => r.tail_offset = offset,
		}
		Ok(())
	}

	/// Drops `end`'s bracket vertex, promoting the vertex behind it to the
	/// new bracket with offset 0 (the end now sits exactly on it).
	fn pop_bracket(&mut self, s: SnakeId, end: End) -> GraphResult<()> {
		let r = self.record_mut(s)?;
		match end {
			End::Head => {
				r.vertex_sequence.remove(0);
				r.head_offset = 0;
			}
			End::Tail => {
				r.vertex_sequence.pop();
				r.tail_offset = 0;
			}
		}
		if r.vertex_sequence.len() == 1 {
			r.head_offset = 0;
			r.tail_offset = 0;
		}
		Ok(())
	}

	/// Contracts `s` at `end` by up to `by` units, collapsing to a zero-length
	/// point at the opposite end if `by` exceeds the current length.
	pub fn shrink(&mut self, graph: &Graph, s: SnakeId, end: End, by: i64) -> GraphResult<i64> {
		if by < 0 {
			return Err(GraphError::BadOffset(by));
		}
		let before = Self::touched(self.record(s)?);
		let mut remaining = by.min(self.record(s)?.length);
		let mut shrunk = 0i64;
		while remaining > 0 {
			let len = self.record(s)?.vertex_sequence.len();
			if len == 1 {
				break;
			}
			let (offset, opposite_offset) = match end {
				End::Head => (self.record(s)?.head_offset, self.record(s)?.tail_offset),
				End::Tail => (self.record(s)?.tail_offset, self.record(s)?.head_offset),
			};
			let bracket = match end {
				End::Head => self.record(s)?.vertex_sequence[0],
				End::Tail => self.record(s)?.vertex_sequence[len - 1],
			};
			let partner = self.partner_of(s, end)?.unwrap();
			let seg = graph.find_between(partner, bracket)?;
			let hop_len = seg.distance;
			// Retreating toward `partner` raises this end's own offset. With
			// only these two vertices left, the opposite end shares the same
			// hop and caps how far this end may retreat before crossing it.
			let room = if len == 2 { hop_len - offset - opposite_offset } else { hop_len - offset };
			if room <= 0 {
				break;
			}
			let consume = remaining.min(room);
			let new_offset = offset + consume;
			let anchor = graph.vertex_on_edge(seg.edge, partner)?.0;
			let direction: i8 = if anchor == 0 { 1 } else { -1 };
			let tip = anchor + direction as i64 * (hop_len - new_offset);
			self.set_interval(seg.edge, s, anchor.min(tip), anchor.max(tip));
			if new_offset == hop_len {
				self.pop_bracket(s, end)?;
			} else {
				self.set_offset(s, end, new_offset)?;
			}
			remaining -= consume;
			shrunk += consume;
		}
		self.record_mut(s)?.length = (self.record(s)?.length - shrunk).max(0);
		let after = Self::touched(self.record(s)?);
		self.reconcile_occupancy(s, &before, &after);
		log::trace!("snake {:?} shrank {:?} by {} (requested {})", s, end, shrunk, by);
		Ok(shrunk)
	}

	/// Sugar: grows `end` by `by`, then shrinks the opposite end by the same
	/// amount, so total length is preserved. Returns the net displacement.
	pub fn advance(&mut self, graph: &Graph, s: SnakeId, end: End, by: i64, oracle: &mut Oracle<'_>) -> GraphResult<i64> {
		let grown = self.grow(graph, s, end, by, oracle)?;
		let shrunk = self.shrink(graph, s, end.opposite(), grown)?;
		Ok(grown.min(shrunk))
	}

	/// Re-keys every reservation and snake-body reference from `old_edge`
	/// onto the two edges a `split` replaced it with. A body that has
	/// already fully passed both `low_vertex` and `high_vertex` just gets
	/// `via` spliced into its interior. A body still mid-transit across
	/// `old_edge` needs its bracket or partner (whichever `via` now sits
	/// between) and, if that's the bracket, its offset re-based onto `via`.
	pub fn rekey_split(&mut self, graph: &Graph, outcome: &SplitOutcome, low_vertex: VertexId, high_vertex: VertexId) -> GraphResult<()> {
		let SplitOutcome { via, old_edge, low_edge, high_edge, boundary } = *outcome;
		if let Some(list) = self.edge_intervals.shift_remove(&old_edge) {
			let mut low_list = Vec::new();
			let mut high_list = Vec::new();
			for iv in list {
				if iv.high <= boundary {
					low_list.push(iv);
				} else if iv.low >= boundary {
					high_list.push(Interval { low: iv.low - boundary, high: iv.high - boundary, snake: iv.snake });
				} else {
					low_list.push(Interval { low: iv.low, high: boundary, snake: iv.snake });
					high_list.push(Interval { low: 0, high: iv.high - boundary, snake: iv.snake });
				}
			}
			if !low_list.is_empty() {
				self.edge_intervals.insert(low_edge, low_list);
			}
			if !high_list.is_empty() {
				self.edge_intervals.insert(high_edge, high_list);
			}
		}

		let high_len = graph.edge_details(high_edge)?.length;
		let hop_len = boundary + high_len;
		let ids: Vec<SnakeId> = self.snakes.keys().copied().collect();
		for s in ids {
			let before = Self::touched(self.record(s)?);

			let len = self.record(s)?.vertex_sequence.len();
			if len >= 4 {
				let snapshot = self.record(s)?.vertex_sequence.clone();
				for idx in 1..len - 2 {
					let (a, b) = (snapshot[idx], snapshot[idx + 1]);
					if (a, b) == (low_vertex, high_vertex) || (a, b) == (high_vertex, low_vertex) {
						self.record_mut(s)?.vertex_sequence.insert(idx + 1, via);
						break;
					}
				}
			}

			if len == 2 {
				self.rekey_shared_hop(s, low_vertex, high_vertex, via, boundary, hop_len)?;
			} else {
				self.rekey_solo_hop(s, End::Head, low_vertex, high_vertex, via, boundary, hop_len)?;
				self.rekey_solo_hop(s, End::Tail, low_vertex, high_vertex, via, boundary, hop_len)?;
			}

			let after = Self::touched(self.record(s)?);
			self.reconcile_occupancy(s, &before, &after);
		}
		log::debug!("rekeyed reservations from {:?} onto {:?}/{:?} across {:?}", old_edge, low_edge, high_edge, via);
		Ok(())
	}

	/// Re-keys one end's own hop when it's the only snake body on `old_edge`
	/// (the two brackets are at least two hops apart, so head's and tail's
	/// hops onto `old_edge` can never be the same pair). A no-op unless this
	/// end's bracket/partner pair is exactly `{low_vertex, high_vertex}`.
	fn rekey_solo_hop(&mut self, s: SnakeId, end: End, low_vertex: VertexId, high_vertex: VertexId, via: VertexId, boundary: i64, hop_len: i64) -> GraphResult<()> {
		let (len, bracket, partner, offset) = {
			let r = self.record(s)?;
			let len = r.vertex_sequence.len();
			if len < 2 {
				return Ok(());
			}
			let (bracket_idx, partner_idx) = match end {
				End::Head => (0, 1),
				End::Tail => (len - 1, len - 2),
			};
			let offset = match end {
				End::Head => r.head_offset,
				End::Tail => r.tail_offset,
			};
			(len, r.vertex_sequence[bracket_idx], r.vertex_sequence[partner_idx], offset)
		};
		let partner_is_low = partner == low_vertex && bracket == high_vertex;
		let partner_is_high = partner == high_vertex && bracket == low_vertex;
		if !partner_is_low && !partner_is_high {
			return Ok(());
		}
		let dist_from_low = if partner_is_low { hop_len - offset } else { offset };
		let bracket_idx = match end {
			End::Head => 0,
			End::Tail => len - 1,
		};
		let partner_idx = match end {
			End::Head => 1,
			End::Tail => len - 2,
		};

		let r = self.record_mut(s)?;
		if dist_from_low == boundary {
			r.vertex_sequence[bracket_idx] = via;
			match end {
				End::Head => r.head_offset = 0,
				End::Tail => r.tail_offset = 0,
			}
		} else if dist_from_low < boundary {
			if partner_is_low {
				r.vertex_sequence[bracket_idx] = via;
				let new_offset = boundary - dist_from_low;
				match end {
					End::Head => r.head_offset = new_offset,
					End::Tail => r.tail_offset = new_offset,
				}
			} else {
				r.vertex_sequence[partner_idx] = via;
			}
		} else if partner_is_low {
			r.vertex_sequence[partner_idx] = via;
		} else {
			r.vertex_sequence[bracket_idx] = via;
			let new_offset = dist_from_low - boundary;
			match end {
				End::Head => r.head_offset = new_offset,
				End::Tail => r.tail_offset = new_offset,
			}
		}
		Ok(())
	}

	/// Re-keys a two-vertex body where both ends currently share the single
	/// hop being split. Unlike `rekey_solo_hop`, head and tail read and write
	/// the same two array slots, so they're resolved together: if both ends'
	/// actual positions land on the same side of `via`, only that shared
	/// slot changes; if they straddle it, `via` is spliced in as a genuine
	/// third vertex and neither offset needs to move.
	fn rekey_shared_hop(&mut self, s: SnakeId, low_vertex: VertexId, high_vertex: VertexId, via: VertexId, boundary: i64, hop_len: i64) -> GraphResult<()> {
		let (v0, v1, head_offset, tail_offset) = {
			let r = self.record(s)?;
			if r.vertex_sequence.len() != 2 {
				return Ok(());
			}
			(r.vertex_sequence[0], r.vertex_sequence[1], r.head_offset, r.tail_offset)
		};
		let v0_is_low = v0 == low_vertex && v1 == high_vertex;
		let v0_is_high = v0 == high_vertex && v1 == low_vertex;
		if !v0_is_low && !v0_is_high {
			return Ok(());
		}
		// head's bracket is v0 (partner v1); tail's bracket is v1 (partner v0)
		let head_dist = if v0_is_high { hop_len - head_offset } else { head_offset };
		let tail_dist = if v0_is_low { hop_len - tail_offset } else { tail_offset };

		let r = self.record_mut(s)?;
		if head_dist <= boundary && tail_dist <= boundary {
			// both ends sit at or before `via`; the high-side slot becomes it
			if v0_is_high {
				r.vertex_sequence[0] = via;
				r.head_offset = boundary - head_dist;
			} else {
				r.vertex_sequence[1] = via;
				r.tail_offset = boundary - tail_dist;
			}
		} else if head_dist >= boundary && tail_dist >= boundary {
			// both ends sit at or past `via`; the low-side slot becomes it
			if v0_is_low {
				r.vertex_sequence[0] = via;
				r.head_offset = head_dist - boundary;
			} else {
				r.vertex_sequence[1] = via;
				r.tail_offset = tail_dist - boundary;
			}
		} else {
			// the ends straddle `via`; it becomes a genuine waypoint between
			// them and neither offset (still measured to its own unchanged
			// bracket) needs to change
			r.vertex_sequence.insert(1, via);
		}
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::graph::Graph;

	/// A chain of `n` vertices with a through-pair authorized at every interior
	/// junction, so growth can freely traverse the whole line.
	fn line(g: &mut Graph, n: usize, len: i64) -> Vec<VertexId> {
		let vs: Vec<_> = (0..n).map(|_| g.add_vertex(None).unwrap()).collect();
		for w in vs.windows(2) {
			g.connect(w[0], w[1], len).unwrap();
		}
		for w in vs.windows(3) {
			g.join(w[0], w[1], w[2]).unwrap();
		}
		vs
	}

	fn first_candidate() -> impl FnMut(VertexId, &[VertexId]) -> Option<VertexId> {
		|_from, candidates| candidates.first().copied()
	}

	#[test]
	fn add_and_grow_along_a_line() {
		let mut g = Graph::new();
		let vs = line(&mut g, 3, 10);
		let mut re = ReservationEngine::new();
		let s = re.add_snake(vs[0]);
		let mut oracle = first_candidate();
		let grown = re.grow(&g, s, End::Head, 15, &mut oracle).unwrap();
		assert_eq!(grown, 15);
		let state = re.snake_state(s).unwrap();
		assert_eq!(state.length, 15);
		assert_eq!(state.vertex_sequence, vec![vs[2], vs[1], vs[0]]);
		assert_eq!(state.head_offset, 5);
		assert_eq!(state.tail_offset, 0);
	}

	#[test]
	fn shrink_collapses_to_a_point() {
		let mut g = Graph::new();
		let vs = line(&mut g, 2, 10);
		let mut re = ReservationEngine::new();
		let s = re.add_snake(vs[0]);
		let mut oracle = first_candidate();
		re.grow(&g, s, End::Head, 10, &mut oracle).unwrap();
		let shrunk = re.shrink(&g, s, End::Tail, 100).unwrap();
		assert_eq!(shrunk, 10);
		let state = re.snake_state(s).unwrap();
		assert_eq!(state.length, 0);
		assert_eq!(state.vertex_sequence, vec![vs[1]]);
	}

	#[test]
	fn contention_halts_growth_past_a_shared_vertex() {
		let mut g = Graph::new();
		let vs = line(&mut g, 3, 10);
		let mut re = ReservationEngine::new();
		let s1 = re.add_snake(vs[0]);
		let s2 = re.add_snake(vs[1]);
		let mut oracle = first_candidate();
		// s1 may still land on vs[1] and share it with s2, but growth halts
		// there rather than continuing on toward vs[2] in the same call.
		let grown = re.grow(&g, s1, End::Head, 15, &mut oracle).unwrap();
		assert_eq!(grown, 10);
		assert_eq!(re.snake_state(s1).unwrap().vertex_sequence, vec![vs[1], vs[0]]);
		assert_eq!(re.query(s1).unwrap(), vec![s2]);

		// and a later call starting from that shared vertex makes no progress
		// at all until s2 moves off it.
		let grown = re.grow(&g, s1, End::Head, 5, &mut oracle).unwrap();
		assert_eq!(grown, 0);
	}

	#[test]
	fn shrinking_past_the_shared_hub_is_bounded_by_the_opposite_end() {
		let mut g = Graph::new();
		let vs = line(&mut g, 2, 100);
		let mut re = ReservationEngine::new();
		let s = re.add_snake(vs[0]);
		let mut oracle = first_candidate();
		re.grow(&g, s, End::Head, 100, &mut oracle).unwrap();
		// tail retreats from vs[0] back into the edge, head sits exactly on vs[1]
		let shrunk = re.shrink(&g, s, End::Tail, 80).unwrap();
		assert_eq!(shrunk, 80);
		let state = re.snake_state(s).unwrap();
		assert_eq!(state.length, 20);
		assert_eq!(state.vertex_sequence, vec![vs[1], vs[0]]);
		assert_eq!(state.head_offset, 0);
		assert_eq!(state.tail_offset, 80);

		// the head now has only 20 units of room before it would cross the
		// tail on the same shared hop, so a request for 25 is capped at 20.
		let shrunk = re.shrink(&g, s, End::Head, 25).unwrap();
		assert_eq!(shrunk, 20);
		let state = re.snake_state(s).unwrap();
		assert_eq!(state.length, 0);
		assert_eq!(state.head_offset, 20);
		assert_eq!(state.tail_offset, 80);
	}

	#[test]
	fn interval_conflict_blocks_partial_growth() {
		let mut g = Graph::new();
		let vs = line(&mut g, 2, 10);
		let mut re = ReservationEngine::new();
		let s1 = re.add_snake(vs[0]);
		let s2 = re.add_snake(vs[1]);
		let mut oracle = first_candidate();
		// s2 grows its tail backward from vs[1] toward vs[0], claiming the far
		// half of the shared edge before s1 tries to grow into it.
		re.grow(&g, s2, End::Tail, 4, &mut oracle).unwrap();
		let grown = re.grow(&g, s1, End::Head, 10, &mut oracle).unwrap();
		assert_eq!(grown, 6);
	}

	#[test]
	fn advance_preserves_length() {
		let mut g = Graph::new();
		let vs = line(&mut g, 3, 10);
		let mut re = ReservationEngine::new();
		let s = re.add_snake(vs[0]);
		let mut oracle = first_candidate();
		re.grow(&g, s, End::Head, 12, &mut oracle).unwrap();
		let moved = re.advance(&g, s, End::Head, 5, &mut oracle).unwrap();
		assert_eq!(moved, 5);
		assert_eq!(re.snake_state(s).unwrap().length, 12);
	}
}
