//! Opaque, monotonic, never-reused identifiers for vertices, edges and snakes.
//!
//! Each kind mints its own ids from a counter owned by the structure that
//! needs them (`Graph` for vertices/edges, `ReservationEngine` for snakes),
//! not a process-global, so independent instances never collide.

use std::fmt;

macro_rules! id_type {
	($name:ident, $prefix:literal) => {
		#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
		pub struct $name(u64);

		impl $name {
			pub(crate) fn from_raw(raw: u64) -> Self {
				Self(raw)
			}

			pub fn raw(self) -> u64 {
				self.0
			}
		}

		impl fmt::Debug for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}{}", $prefix, self.0)
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				fmt::Debug::fmt(self, f)
			}
		}
	};
}

id_type!(VertexId, "V");
id_type!(EdgeId, "E");
id_type!(SnakeId, "S");

/// A counter that mints ids of one kind, optionally seeded to a specific next value
/// so that explicitly-chosen ids (`add_vertex(Some(id))`) don't get reused later.
#[derive(Clone, Debug)]
pub struct IdMinter<T> {
	next: u64,
	_marker: std::marker::PhantomData<T>,
}

impl<T> Default for IdMinter<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> IdMinter<T> {
	pub fn new() -> Self {
		Self { next: 0, _marker: std::marker::PhantomData }
	}
}

impl IdMinter<VertexId> {
	pub fn mint(&mut self) -> VertexId {
		let id = VertexId::from_raw(self.next);
		self.next += 1;
		id
	}

	pub fn observe(&mut self, id: VertexId) {
		if id.raw() >= self.next {
			self.next = id.raw() + 1;
		}
	}
}

impl IdMinter<EdgeId> {
	pub fn mint(&mut self) -> EdgeId {
		let id = EdgeId::from_raw(self.next);
		self.next += 1;
		id
	}
}

impl IdMinter<SnakeId> {
	pub fn mint(&mut self) -> SnakeId {
		let id = SnakeId::from_raw(self.next);
		self.next += 1;
		id
	}
}
