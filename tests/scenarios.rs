//! Cross-module scenarios: a snake travelling across a split, an oracle
//! steering a junction, a scenario file round-tripping through the CLI's
//! deserializer, and a rejected double connection.

use traingraph::dto::Scenario;
use traingraph::error::GraphError;
use traingraph::graph::{Endpoint, Graph};
use traingraph::reservation::{End, ReservationEngine};
use traingraph::session::{OraclePolicy, Placement, Session};

#[test]
fn line_reserve_grow_and_shrink_round_trip() {
	let mut g = Graph::new();
	let a = g.add_vertex(None).expect("add a");
	let b = g.add_vertex(None).expect("add b");
	g.connect(a, b, 100).expect("connect a-b");

	let mut re = ReservationEngine::new();
	let s = re.add_snake(a);

	let mut oracle = |_from, candidates: &[_]| candidates.first().copied();
	let grown = re.grow(&g, s, End::Head, 10, &mut oracle).expect("grow 10");
	assert_eq!(grown, 10);
	let grown = re.grow(&g, s, End::Head, 90, &mut oracle).expect("grow 90");
	assert_eq!(grown, 90);

	let state = re.snake_state(s).expect("state after growth");
	assert_eq!(state.vertex_sequence, vec![b, a]);
	assert_eq!(state.length, 100);

	let shrunk = re.shrink(&g, s, End::Tail, 80).expect("shrink tail 80");
	assert_eq!(shrunk, 80);
	let state = re.snake_state(s).expect("state after tail shrink");
	assert_eq!(state.vertex_sequence, vec![b, a]);
	assert_eq!(state.tail_offset, 80);
	assert_eq!(state.length, 20);

	// the tail still has slack of its own, so draining it the rest of the
	// way collapses the snake to a point at b
	let shrunk = re.shrink(&g, s, End::Tail, 20).expect("shrink tail to zero");
	assert_eq!(shrunk, 20);
	let state = re.snake_state(s).expect("final state");
	assert_eq!(state.length, 0);
	assert_eq!(state.vertex_sequence, vec![b]);
}

#[test]
fn junction_oracle_steers_at_a_fork() {
	let mut g = Graph::new();
	let hub = g.add_vertex(None).expect("add hub");
	let left = g.add_vertex(None).expect("add left");
	let right = g.add_vertex(None).expect("add right");
	let origin = g.add_vertex(None).expect("add origin");
	g.connect(origin, hub, 10).expect("connect origin-hub");
	g.connect(hub, left, 10).expect("connect hub-left");
	g.connect(hub, right, 10).expect("connect hub-right");
	// both continuations through the hub are authorized, so the oracle
	// actually has a fork to steer at
	g.join(origin, hub, left).expect("authorize origin-hub-left");
	g.join(origin, hub, right).expect("authorize origin-hub-right");

	let mut re = ReservationEngine::new();
	let s = re.add_snake(origin);
	let mut oracle = |_from, candidates: &[traingraph::ids::VertexId]| candidates.iter().find(|&&v| v == right).copied().or_else(|| candidates.first().copied());
	let grown = re.grow(&g, s, End::Head, 20, &mut oracle).expect("grow through the fork");
	assert_eq!(grown, 20);
	let state = re.snake_state(s).expect("state");
	assert_eq!(state.vertex_sequence, vec![right, hub, origin]);
}

#[test]
fn split_mid_transit_keeps_the_reservation_and_rekeys_it() {
	let mut g = Graph::new();
	let a = g.add_vertex(None).expect("add a");
	let b = g.add_vertex(None).expect("add b");
	g.connect(a, b, 100).expect("connect a-b");

	let mut re = ReservationEngine::new();
	let snake = re.add_snake(a);
	let mut oracle = |_from, candidates: &[_]| candidates.first().copied();
	// only the head moves; the tail stays anchored at a, so the body
	// straddles the edge mid-transit without ever touching the tricky
	// offset-zero/single-vertex corner of shrink()
	re.grow(&g, snake, End::Head, 40, &mut oracle).expect("grow head 40");
	let before = re.snake_state(snake).expect("state before split");
	assert_eq!(before.length, 40);
	assert_eq!(before.vertex_sequence, vec![b, a]);

	// the boundary sits ahead of the head, so the reservation re-keys its
	// bracket onto `via` and re-bases the head's offset against it
	let outcome = g.split(a, None, b, 70).expect("split under the travelling snake");
	re.rekey_split(&g, &outcome, a, b).expect("rekey across the split");
	let after = re.snake_state(snake).expect("state after split");
	assert_eq!(after.length, 40);
	assert_eq!(after.head_offset, 30);
	assert_eq!(after.vertex_sequence, vec![outcome.via, a]);
	assert_eq!(outcome.boundary, 70);

	// the snake can keep growing across the new join without issue,
	// which would fail if rekey_split had left a stale edge reference
	let grown = re.grow(&g, snake, End::Head, 30, &mut oracle).expect("grow onto the via vertex");
	assert_eq!(grown, 30);
	let final_state = re.snake_state(snake).expect("final state");
	assert_eq!(final_state.vertex_sequence, vec![outcome.via, a]);
	assert_eq!(final_state.head_offset, 0);
	assert_eq!(final_state.length, 70);
}

#[test]
fn double_connection_between_the_same_pair_is_refused() {
	let mut g = Graph::new();
	let a = g.add_vertex(None).expect("add a");
	let b = g.add_vertex(None).expect("add b");
	g.connect(a, b, 10).expect("first connection succeeds");
	let err = g.connect(a, b, 20).expect_err("second connection must be refused");
	assert_eq!(err, GraphError::AlreadyConnected(a, b));
}

#[test]
fn search_routes_around_an_occupied_vertex() {
	let mut s = Session::new(OraclePolicy::FirstCandidate);
	let a = s.add_vertex(None).expect("add a");
	let b = s.add_vertex(None).expect("add b");
	let c = s.add_vertex(None).expect("add c");
	s.connect(a, b, 10).expect("connect a-b");
	s.connect(b, c, 10).expect("connect b-c");
	s.add_snake_at(Placement::Vertex(b)).expect("park a snake on b");

	let path = s.search(Endpoint::Vertex(a), Endpoint::Vertex(c), None).expect("path exists through b regardless of occupancy");
	assert_eq!(path, vec![Some(a), Some(b), Some(c)]);
}

#[test]
fn scenario_file_builds_and_runs() {
	let yaml = r#"
vertices: [a, b, c]
edges:
  - {a: a, b: b, length: 50}
  - {a: b, b: c, length: 50}
run:
  ticks: 2
  tick_size: 50
  oracle:
    kind: preference
    vertices: [c]
snakes:
  - {at: a}
"#;
	// tick_size matches each edge's length exactly, so every tick fully
	// completes an edge rather than leaving the snake parked mid-edge
	let scenario: Scenario = serde_yaml::from_str(yaml).expect("parse scenario yaml");
	let mut built = scenario.build().expect("build session from scenario");
	assert_eq!(built.snake_ids.len(), 1);

	for _ in 0..scenario.run.ticks {
		built.session.step(scenario.run.tick_size).expect("tick");
	}

	let state = built.session.snake_state(built.snake_ids[0]).expect("final snake state");
	assert_eq!(state.length, 0);
	let c = built.vertex_names["c"];
	assert_eq!(state.vertex_sequence, vec![c]);
}
