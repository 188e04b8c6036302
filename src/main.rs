//! Scenario runner: loads a graph + snake scenario, ticks it forward, and
//! reports the resulting snake states as JSON.

use std::collections::HashMap;
use std::fs::File;

use clap::{crate_version, App, Arg, SubCommand};
use thiserror::Error;

use traingraph::dto::Scenario;
use traingraph::error::GraphError;

#[derive(Error, Debug)]
enum CliError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error("invalid JSON scenario: {0}")]
	Json(#[from] serde_json::Error),
	#[error("invalid YAML scenario: {0}")]
	Yaml(#[from] serde_yaml::Error),
	#[error("{0}")]
	Graph(#[from] GraphError),
}

fn load_scenario(path: &str) -> Result<Scenario, CliError> {
	let file = File::open(path)?;
	if path.ends_with(".json") {
		Ok(serde_json::from_reader(file)?)
	} else {
		Ok(serde_yaml::from_reader(file)?)
	}
}

#[derive(serde::Serialize)]
struct SnakeReport {
	id: String,
	length: i64,
	vertex_sequence: Vec<String>,
	head_offset: i64,
	tail_offset: i64,
}

fn main() -> Result<(), CliError> {
	env_logger::init_from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"));
	let matches = App::new("Train Graph Runner")
		.version(crate_version!())
		.about("Run a snake/reservation scenario against the non-Euclidean graph core")
		.subcommand(
			SubCommand::with_name("run")
				.about("Load a scenario, tick it forward, and report snake states")
				.arg(Arg::with_name("scenario").takes_value(true).required(true).index(1).help("Scenario YAML or JSON"))
				.arg(Arg::with_name("output").takes_value(true).required(true).index(2).help("Output JSON")),
		)
		.get_matches();

	if let Some(matches) = matches.subcommand_matches("run") {
		let scenario = load_scenario(matches.value_of("scenario").unwrap())?;
		log::info!("Loaded scenario: {} vertices, {} edges, {} snakes", scenario.vertices.len(), scenario.edges.len(), scenario.snakes.len());

		let mut built = scenario.build()?;
		let names: HashMap<_, _> = built.vertex_names.iter().map(|(k, v)| (*v, k.clone())).collect();

		for tick in 0..scenario.run.ticks {
			built.session.step(scenario.run.tick_size)?;
			log::debug!("tick {} complete", tick);
		}
		log::info!("Ran {} ticks", scenario.run.ticks);

		let report: Vec<SnakeReport> = built
			.snake_ids
			.iter()
			.map(|&id| {
				let state = built.session.snake_state(id).unwrap();
				SnakeReport {
					id: format!("{:?}", id),
					length: state.length,
					vertex_sequence: state.vertex_sequence.iter().map(|v| names.get(v).cloned().unwrap_or_else(|| format!("{:?}", v))).collect(),
					head_offset: state.head_offset,
					tail_offset: state.tail_offset,
				}
			})
			.collect();
		serde_json::to_writer_pretty(File::create(matches.value_of("output").unwrap())?, &report)?;
		log::info!("Wrote results");
	}
	Ok(())
}
