//! The single owner of one graph and one reservation engine: forwards
//! structural edits (re-keying reservations across a split), drives snakes
//! forward tick by tick with a bounce-on-block policy, and notifies
//! subscribers after each tick.

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::error::GraphResult;
use crate::graph::{EdgeDetails, Endpoint, Graph, SplitOutcome};
use crate::ids::{EdgeId, SnakeId, VertexId};
use crate::reservation::{End, ReservationEngine, SnakeState};

/// Where a newly registered snake, or a new interior vertex, should land.
#[derive(Clone, Copy, Debug)]
pub enum Placement {
	Vertex(VertexId),
	OnEdge { edge: EdgeId, at: i64 },
}

/// The policy consulted whenever a snake's leading end sits on a vertex and
/// must choose which incident edge to continue into.
#[derive(Clone, Debug)]
pub enum OraclePolicy {
	FirstCandidate,
	Random,
	/// Prefer candidates in this order; fall back to the first remaining one.
	Preference(Vec<VertexId>),
}

impl OraclePolicy {
	fn choose(&self, candidates: &[VertexId]) -> Option<VertexId> {
		if candidates.is_empty() {
			return None;
		}
		match self {
			OraclePolicy::FirstCandidate => candidates.first().copied(),
			OraclePolicy::Random => candidates.choose(&mut thread_rng()).copied(),
			OraclePolicy::Preference(order) => order
				.iter()
				.find(|v| candidates.contains(v))
				.copied()
				.or_else(|| candidates.first().copied()),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Event {
	Update,
	UpdateSnakes,
}

#[derive(Clone, Copy, Debug)]
struct Registration {
	leading: End,
}

pub struct Session {
	graph: Graph,
	reservation: ReservationEngine,
	oracle: OraclePolicy,
	registered: Vec<(SnakeId, Registration)>,
	subscribers: Vec<(Event, Box<dyn FnMut(Event)>)>,
}

impl Default for Session {
	fn default() -> Self {
		Self::new(OraclePolicy::FirstCandidate)
	}
}

impl Session {
	pub fn new(oracle: OraclePolicy) -> Self {
		Self { graph: Graph::new(), reservation: ReservationEngine::new(), oracle, registered: Vec::new(), subscribers: Vec::new() }
	}

	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	pub fn reservation(&self) -> &ReservationEngine {
		&self.reservation
	}

	pub fn set_oracle(&mut self, oracle: OraclePolicy) {
		self.oracle = oracle;
	}

	// -- structural edits, forwarded with reservation re-keying --------------

	pub fn add_vertex(&mut self, id: Option<VertexId>) -> GraphResult<VertexId> {
		self.graph.add_vertex(id)
	}

	pub fn connect(&mut self, a: VertexId, b: VertexId, length: i64) -> GraphResult<EdgeId> {
		self.graph.connect(a, b, length)
	}

	pub fn split(&mut self, a: VertexId, via: Option<VertexId>, b: VertexId, at: i64) -> GraphResult<SplitOutcome> {
		let details = self.edge_details_between(a, b)?;
		let outcome = self.graph.split(a, via, b, at)?;
		self.reservation.rekey_split(&self.graph, &outcome, details.low_vertex, details.high_vertex)?;
		log::debug!("split {:?}--{:?} at {} via {:?}", a, b, at, outcome.via);
		Ok(outcome)
	}

	pub fn join(&mut self, a: VertexId, via: VertexId, b: VertexId) -> GraphResult<bool> {
		self.graph.join(a, via, b)
	}

	/// Merging a vertex that currently carries live reservations is not
	/// supported: nothing re-keys `vertex_occupants`/snake bodies across a
	/// merge, so callers must only merge vertices before snakes reach them.
	pub fn merge(&mut self, a: VertexId, b: VertexId) -> GraphResult<VertexId> {
		self.graph.merge(a, b)
	}

	fn edge_details_between(&self, a: VertexId, b: VertexId) -> GraphResult<EdgeDetails> {
		let seg = self.graph.find_between(a, b)?;
		self.graph.edge_details(seg.edge)
	}

	// -- snakes ---------------------------------------------------------------

	pub fn add_snake_at(&mut self, placement: Placement) -> GraphResult<SnakeId> {
		let vertex = match placement {
			Placement::Vertex(v) => v,
			Placement::OnEdge { edge, at } => {
				let details = self.graph.edge_details(edge)?;
				if at == 0 {
					details.low_vertex
				} else if at == details.length {
					details.high_vertex
				} else {
					let outcome = self.graph.split(details.low_vertex, None, details.high_vertex, at)?;
					self.reservation.rekey_split(&self.graph, &outcome, details.low_vertex, details.high_vertex)?;
					outcome.via
				}
			}
		};
		let id = self.reservation.add_snake(vertex);
		self.registered.push((id, Registration { leading: End::Head }));
		log::debug!("registered snake {:?} on the session at {:?}", id, vertex);
		Ok(id)
	}

	pub fn remove_snake(&mut self, s: SnakeId) -> GraphResult<()> {
		self.registered.retain(|(id, _)| *id != s);
		self.reservation.remove_snake(s)
	}

	pub fn snake_state(&self, s: SnakeId) -> GraphResult<SnakeState> {
		self.reservation.snake_state(s)
	}

	pub fn search(&mut self, from: Endpoint, to: Endpoint, budget: Option<usize>) -> GraphResult<Vec<Option<VertexId>>> {
		let reservation = &self.reservation;
		self.graph.search(from, to, budget, &|v| reservation.is_occupied(v))
	}

	/// Advances every registered snake by `delta`. A snake that can't fully
	/// grow, or that ends the tick sharing a vertex with another snake,
	/// flips which end leads from the next tick on.
	pub fn step(&mut self, delta: i64) -> GraphResult<()> {
		log::trace!("step delta={} across {} snake(s)", delta, self.registered.len());
		let ids: Vec<SnakeId> = self.registered.iter().map(|(id, _)| *id).collect();
		for s in ids {
			let leading = self.registered.iter().find(|(id, _)| *id == s).unwrap().1.leading;
			let policy = &self.oracle;
			let mut oracle = |_from: VertexId, candidates: &[VertexId]| policy.choose(candidates);
			let moved = self.reservation.advance(&self.graph, s, leading, delta, &mut oracle)?;
			let collided = !self.reservation.query(s)?.is_empty();
			if moved < delta || collided {
				log::debug!("snake {:?} bounced (moved {}/{}, collided {})", s, moved, delta, collided);
				if let Some(entry) = self.registered.iter_mut().find(|(id, _)| *id == s) {
					entry.1.leading = leading.opposite();
				}
			}
		}
		self.notify(Event::UpdateSnakes);
		self.notify(Event::Update);
		Ok(())
	}

	pub fn subscribe(&mut self, event: Event, callback: impl FnMut(Event) + 'static) {
		self.subscribers.push((event, Box::new(callback)));
	}

	fn notify(&mut self, event: Event) {
		for (subscribed, callback) in self.subscribers.iter_mut() {
			if *subscribed == event {
				callback(event);
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn snake_bounces_off_a_dead_end() {
		let mut s = Session::new(OraclePolicy::FirstCandidate);
		let a = s.add_vertex(None).unwrap();
		let b = s.add_vertex(None).unwrap();
		s.connect(a, b, 5).unwrap();
		let snake = s.add_snake_at(Placement::Vertex(a)).unwrap();
		s.step(5).unwrap();
		let state = s.snake_state(snake).unwrap();
		assert_eq!(state.length, 0);
		assert_eq!(state.vertex_sequence, vec![b]);
		// the next tick tries to grow back from b toward a
		s.step(5).unwrap();
		let state = s.snake_state(snake).unwrap();
		assert_eq!(state.vertex_sequence, vec![a]);
	}

	#[test]
	fn split_mid_session_rekeys_reservations() {
		let mut s = Session::new(OraclePolicy::FirstCandidate);
		let a = s.add_vertex(None).unwrap();
		let b = s.add_vertex(None).unwrap();
		s.connect(a, b, 100).unwrap();
		let snake = s.add_snake_at(Placement::Vertex(a)).unwrap();
        s.step(40).unwrap();
		let outcome = s.split(a, None, b, 70).unwrap();
		let state = s.snake_state(snake).unwrap();
		assert!(state.vertex_sequence.contains(&a));
		assert_eq!(outcome.boundary, 70);
	}
}
