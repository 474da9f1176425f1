//! End-to-end: push a function batch into an empty catalog, then compile a
//! matching graph document against it.

use std::sync::Arc;

use botflow_core::store::CatalogStore;
use botflow_core::types::StateKind;
use botflow_core::{
    compile, load_snapshot, FunctionDef, GraphDocument, Job, MemoryCatalog, ParamDef, Reconciler,
};
use uuid::Uuid;

fn def(name: &str, params: &[(&str, &str)]) -> FunctionDef {
    FunctionDef {
        name: name.to_string(),
        description: None,
        parameters: params
            .iter()
            .map(|(n, t)| ParamDef {
                name: n.to_string(),
                ty: t.to_string(),
            })
            .collect(),
    }
}

const GRAPH: &[u8] = br#"{
  "nodes": [
    {"id": "n-start", "type": "start", "data": {"label": "start"}},
    {"id": "n-fetch", "type": "function", "data": {"label": "Fetch"}},
    {"id": "n-exit", "type": "exit", "data": {"label": "exit"}}
  ],
  "edges": [
    {"id": "e1", "source": "n-start", "target": "n-fetch",
     "sourceHandle": "t0", "targetHandle": "in"},
    {"id": "e2", "source": "n-fetch", "target": "n-exit",
     "sourceHandle": "t0", "targetHandle": "in"}
  ]
}"#;

#[tokio::test]
async fn push_batch_then_compile_linear_worker() {
    let store = Arc::new(MemoryCatalog::new());
    let job = Job {
        id: Uuid::now_v7(),
        title: "Linear worker".into(),
        owner: "scope-owner".into(),
    };
    store.add_job(job.clone()).await;
    store.put_graph(job.id, GRAPH.to_vec()).await;

    // Push start/exit/Fetch into the empty catalog.
    let reconciler = Reconciler::new(Arc::clone(&store) as Arc<dyn CatalogStore>);
    let report = reconciler
        .reconcile(
            job.id,
            vec![
                def("start", &[]),
                def("exit", &[]),
                def("Fetch", &[("url", "text")]),
            ],
        )
        .await
        .expect("push");
    assert_eq!(report.created.len(), 3);

    // Every created function is attributed to the scope owner, not the
    // pushing caller.
    for f in store.functions(job.id).await.expect("functions") {
        assert_eq!(store.author_of(f.id).await.as_deref(), Some("scope-owner"));
    }

    // Compile the persisted graph against the reconciled catalog.
    let blob = store.graph_blob(job.id).await.expect("blob").expect("saved");
    let doc = GraphDocument::parse(&blob).expect("parse");
    let snapshot = load_snapshot(store.as_ref(), job.id)
        .await
        .expect("load")
        .expect("scope exists");
    let set = compile(&doc, &snapshot).expect("compile");

    assert_eq!(set.name, "Linear worker");

    // Snapshot order is by name: Fetch, exit, start.
    let states: Vec<(StateKind, &str, &str)> = set
        .states
        .iter()
        .map(|s| (s.kind, s.name.as_str(), s.function.as_str()))
        .collect();
    assert_eq!(
        states,
        vec![
            (StateKind::State, "Fetch state", "Fetch"),
            (StateKind::Fallback, "exit state", "exit"),
            (StateKind::Start, "start state", "start"),
        ]
    );

    assert_eq!(set.functions.len(), 3);
    let fetch = set.functions.iter().find(|f| f.name == "Fetch").unwrap();
    assert_eq!(fetch.parameters[0].name, "url");
    assert_eq!(fetch.parameters[0].connect_var, "");

    let transitions: Vec<(&str, &str, i64)> = set
        .transitions
        .iter()
        .map(|t| (t.from.as_str(), t.to.as_str(), t.outcome))
        .collect();
    assert_eq!(
        transitions,
        vec![("start", "Fetch", 0), ("Fetch", "exit", 0)]
    );
}
