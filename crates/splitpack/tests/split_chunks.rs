//! End-to-end scenario: a two-page app with lazy routes, run through the
//! default split-chunks configuration.

use splitpack::{optimize_chunks, SplitChunksError, SplitChunksOptions};
use splitpack_core::{ChunkGraph, ChunkGroupId, ChunkGroupKind, ChunkGroupOptions, ChunkId, Module};

fn init_tracing() {
  let _ = tracing_subscriber::fmt::SubscriberBuilder::default()
    .with_max_level(tracing::Level::DEBUG)
    .try_init();
}

fn add_entry(graph: &mut ChunkGraph, name: &str) -> (ChunkId, ChunkGroupId) {
  let chunk = graph.add_chunk(Some(name));
  let group = graph.create_entrypoint(name);
  graph.connect_chunk_group_and_chunk(group, chunk);
  (chunk, group)
}

fn add_route(
  graph: &mut ChunkGraph,
  parent: ChunkGroupId,
  name: &str,
) -> (ChunkId, ChunkGroupId) {
  let chunk = graph.add_chunk(Some(name));
  let group = graph.create_chunk_group(
    ChunkGroupKind::Normal,
    ChunkGroupOptions {
      name: Some(name.to_owned()),
      ..Default::default()
    },
  );
  graph.connect_chunk_group_and_chunk(group, chunk);
  graph.connect_group_parent_and_child(parent, group);
  let block = graph.alloc_block();
  graph.connect_block_and_chunk_group(block, group);
  (chunk, group)
}

fn place(graph: &mut ChunkGraph, chunk: ChunkId, modules: &[(&str, f64)]) {
  for (identifier, size) in modules {
    let existing = graph
      .module_ids()
      .find(|m| graph.module(*m).identifier == *identifier);
    let module = match existing {
      Some(module) => module,
      None => graph.add_module(Module::new(*identifier, *size)),
    };
    graph.connect_chunk_and_module(chunk, module);
  }
}

fn identifiers(graph: &ChunkGraph, chunk: ChunkId) -> Vec<String> {
  let mut ids: Vec<String> = graph
    .get_chunk_modules_iterable(chunk)
    .map(|m| graph.module(m).identifier.clone())
    .collect();
  ids.sort();
  ids
}

#[test]
fn test_two_page_app_with_lazy_routes() -> anyhow::Result<()> {
  init_tracing();

  let mut graph = ChunkGraph::new();
  let (home, home_group) = add_entry(&mut graph, "home");
  let (admin, _) = add_entry(&mut graph, "admin");
  let (settings, settings_group) = add_route(&mut graph, home_group, "settings");
  let (reports, reports_group) = add_route(&mut graph, home_group, "reports");

  place(&mut graph, home, &[("src/home.js", 5_000.0)]);
  place(&mut graph, admin, &[("src/admin.js", 5_000.0)]);
  for chunk in [settings, reports] {
    place(
      &mut graph,
      chunk,
      &[
        ("/node_modules/charts/index.js", 80_000.0),
        ("src/widgets.js", 45_000.0),
      ],
    );
  }
  place(&mut graph, settings, &[("src/settings.js", 2_000.0)]);
  place(&mut graph, reports, &[("src/reports.js", 2_000.0)]);

  optimize_chunks(&mut graph, SplitChunksOptions::default())?;
  graph.check_constraints()?;

  // The vendor library and the shared widgets each land in their own chunk;
  // the route chunks keep only their route module.
  let vendors = graph
    .get_named_chunk("vendors~reports~settings")
    .or_else(|| graph.get_named_chunk("vendors~settings~reports"))
    .expect("vendors chunk");
  assert_eq!(identifiers(&graph, vendors), vec!["/node_modules/charts/index.js"]);

  let shared = graph
    .get_named_chunk("default~reports~settings")
    .or_else(|| graph.get_named_chunk("default~settings~reports"))
    .expect("shared chunk");
  assert_eq!(identifiers(&graph, shared), vec!["src/widgets.js"]);

  assert_eq!(identifiers(&graph, settings), vec!["src/settings.js"]);
  assert_eq!(identifiers(&graph, reports), vec!["src/reports.js"]);
  // Entry chunks are untouched under the default async filter.
  assert_eq!(identifiers(&graph, home), vec!["src/home.js"]);
  assert_eq!(identifiers(&graph, admin), vec!["src/admin.js"]);

  // Both split chunks load before their source chunks in both route groups.
  for group in [settings_group, reports_group] {
    let chunks = graph.group(group).chunks();
    assert_eq!(chunks.len(), 3);
    let route = *chunks.last().unwrap();
    assert!(route == settings || route == reports);
    assert!(chunks.contains(&vendors));
    assert!(chunks.contains(&shared));
  }

  // The new chunks are reachable as async chunks from the entry chunk.
  let async_chunks = graph.get_all_async_chunks(home);
  for chunk in [vendors, shared, settings, reports] {
    assert!(async_chunks.contains(&chunk));
  }

  Ok(())
}

#[test]
fn test_filename_misconfiguration_surfaces_through_anyhow() {
  init_tracing();

  let mut graph = ChunkGraph::new();
  let (home, home_group) = add_entry(&mut graph, "home");
  let (lazy, _) = add_route(&mut graph, home_group, "lazy");
  place(&mut graph, home, &[("src/home.js", 1_000.0)]);
  place(&mut graph, lazy, &[("src/lazy.js", 50_000.0)]);

  let options: SplitChunksOptions = serde_json::from_str(
    r#"{"cacheGroups": {
      "broken": {"name": "broken", "filename": "broken.js", "priority": 1}
    }}"#,
  )
  .unwrap();

  let error = optimize_chunks(&mut graph, options).unwrap_err();
  assert!(matches!(
    error.downcast_ref::<SplitChunksError>(),
    Some(SplitChunksError::FilenameOnNonInitialChunk { key, .. }) if key == "broken"
  ));
}
