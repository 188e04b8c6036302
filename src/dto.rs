//! Scenario file format for the CLI harness: a graph plus its initial snakes,
//! replayed against a fresh [`Session`] in file order. This is harness-only —
//! the core crate has no notion of a scenario file.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::ids::{SnakeId, VertexId};
use crate::session::{OraclePolicy, Placement, Session};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EdgeSpec {
	pub a: String,
	pub b: String,
	pub length: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PairSpec {
	pub a: String,
	pub via: String,
	pub b: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SnakeSpec {
	pub at: String,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum OracleSpec {
	FirstCandidate,
	Random,
	/// Prefer these vertices, by name, in order.
	Preference { vertices: Vec<String> },
}

impl Default for OracleSpec {
	fn default() -> Self {
		OracleSpec::FirstCandidate
	}
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RunParameters {
	pub ticks: u32,
	pub tick_size: i64,
	#[serde(default)]
	pub oracle: OracleSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Scenario {
	pub vertices: Vec<String>,
	#[serde(default)]
	pub edges: Vec<EdgeSpec>,
	#[serde(default)]
	pub pairs: Vec<PairSpec>,
	#[serde(default)]
	pub snakes: Vec<SnakeSpec>,
	pub run: RunParameters,
}

/// A built session plus the label lookup needed to report results back by name.
pub struct Built {
	pub session: Session,
	pub vertex_names: HashMap<String, VertexId>,
	pub snake_ids: Vec<SnakeId>,
}

impl Scenario {
	pub fn build(&self) -> GraphResult<Built> {
		let mut session = Session::new(OraclePolicy::FirstCandidate);
		let mut vertex_names: HashMap<String, VertexId> = HashMap::new();

		for name in &self.vertices {
			let id = session.add_vertex(None)?;
			vertex_names.insert(name.clone(), id);
		}
		let resolve = |names: &HashMap<String, VertexId>, name: &str| -> GraphResult<VertexId> {
			names.get(name).copied().ok_or_else(|| GraphError::UnknownId(name.to_string()))
		};

		let oracle = match &self.run.oracle {
			OracleSpec::FirstCandidate => OraclePolicy::FirstCandidate,
			OracleSpec::Random => OraclePolicy::Random,
			OracleSpec::Preference { vertices } => {
				let order = vertices.iter().map(|n| resolve(&vertex_names, n)).collect::<GraphResult<Vec<_>>>()?;
				OraclePolicy::Preference(order)
			}
		};
		session.set_oracle(oracle);

		for e in &self.edges {
			let a = resolve(&vertex_names, &e.a)?;
			let b = resolve(&vertex_names, &e.b)?;
			session.connect(a, b, e.length)?;
			log::debug!("connected {} -- {} ({} units)", e.a, e.b, e.length);
		}
		for p in &self.pairs {
			let a = resolve(&vertex_names, &p.a)?;
			let via = resolve(&vertex_names, &p.via)?;
			let b = resolve(&vertex_names, &p.b)?;
			session.join(a, via, b)?;
			log::debug!("joined {} -- {} -- {}", p.a, p.via, p.b);
		}
		let mut snake_ids = Vec::with_capacity(self.snakes.len());
		for s in &self.snakes {
			let at = resolve(&vertex_names, &s.at)?;
			let id = session.add_snake_at(Placement::Vertex(at))?;
			log::debug!("added snake {:?} at {}", id, s.at);
			snake_ids.push(id);
		}
		Ok(Built { session, vertex_names, snake_ids })
	}
}
