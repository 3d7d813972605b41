//! End-to-end tests for the search pipeline.
//!
//! Trees are written as Turtle, parsed with the same parser the HTTP fetcher
//! uses, and served from memory.

use std::sync::Arc;
use std::time::Duration;

use oxigraph::io::RdfFormat;

use tree_complete::agent::QueryAgent;
use tree_complete::aggregator::QueryAggregator;
use tree_complete::autocomplete::{AutoComplete, AutoCompleteConfig};
use tree_complete::event::{QueryEmitter, SearchEvent, VecSink};
use tree_complete::fact::Fact;
use tree_complete::fetch::{MemoryFetcher, parse_document};
use tree_complete::similarity::presets;
use tree_complete::unique::ResultUniqueFilter;

const PREFIXES: &str = "@prefix tree: <https://w3id.org/tree#> .\n@prefix schema: <http://schema.org/> .\n";

fn turtle(base: &str, body: &str) -> Vec<Fact> {
    parse_document(format!("{PREFIXES}{body}").as_bytes(), RdfFormat::Turtle, base).unwrap()
}

/// Register a two-level tree under `host`: a root linking to one page per
/// key, each page naming some people. Returns the root URI.
fn tree(fetcher: &MemoryFetcher, host: &str, root_extra: &str, pages: &[(&str, Vec<(&str, &str)>)]) -> String {
    let root = format!("{host}/root");
    let mut relations: String = pages
        .iter()
        .map(|(key, _)| format!("<> tree:relation [ tree:node <{key}> ; tree:value \"{key}\" ] .\n"))
        .collect();
    relations.push_str(root_extra);
    fetcher.insert(root.clone(), turtle(&root, &relations));

    for (key, people) in pages {
        let page = format!("{host}/{key}");
        let body: String = people
            .iter()
            .map(|(subject, name)| format!("<{subject}> schema:name \"{name}\" .\n"))
            .collect();
        fetcher.insert(page.clone(), turtle(&page, &body));
    }
    root
}

fn data(events: &[SearchEvent]) -> Vec<&SearchEvent> {
    events
        .iter()
        .filter(|e| matches!(e, SearchEvent::Data { .. }))
        .collect()
}

fn ends(events: &[SearchEvent]) -> usize {
    events.iter().filter(|e| e.is_end()).count()
}

/// Data counts between consecutive resets.
fn burst_sizes(events: &[SearchEvent]) -> Vec<usize> {
    let mut sizes = Vec::new();
    for event in events {
        match event {
            SearchEvent::Reset { .. } => sizes.push(0),
            SearchEvent::Data { .. } => {
                if let Some(last) = sizes.last_mut() {
                    *last += 1;
                }
            }
            SearchEvent::End { .. } => {}
        }
    }
    sizes
}

#[tokio::test]
async fn same_name_in_two_trees_yields_one_result() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let a = tree(&fetcher, "https://a.org", "", &[("an", vec![("anne", "anne")]), ("bo", vec![("bob", "bob")])]);
    let b = tree(&fetcher, "https://b.org", "", &[("an", vec![("anne", "anne")])]);

    let search = AutoComplete::new(AutoCompleteConfig::fuzzy(vec![a, b], 1), fetcher.clone()).unwrap();
    let sink = Arc::new(VecSink::new());
    let _sub = search.subscribe(sink.clone());

    search.query("ann").await;

    let events = sink.events();
    assert!(burst_sizes(&events).iter().all(|n| *n <= 1));
    assert_eq!(ends(&events), 1);

    let results = search.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].fact.object.value(), "anne");
    assert_eq!(results[0].overlap, vec![(0, 2)]);
    assert_eq!(fetcher.fetch_count("https://a.org/bo"), 0);
}

#[tokio::test]
async fn duplicate_subject_and_value_across_sources_is_emitted_once() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let shared = vec![("https://people.org/anne", "Anne")];
    let a = tree(&fetcher, "https://a.org", "", &[("an", shared.clone())]);
    let b = tree(&fetcher, "https://b.org", "", &[("an", shared)]);

    let relations = presets::fuzzy().relations;
    let agents: Vec<Arc<dyn QueryEmitter>> = [a, b]
        .into_iter()
        .map(|root| Arc::new(QueryAgent::new(root, fetcher.clone(), relations.clone())) as Arc<dyn QueryEmitter>)
        .collect();
    let unique = ResultUniqueFilter::new(QueryAggregator::new(agents));
    let sink = Arc::new(VecSink::new());
    let _sub = unique.subscribe(sink.clone());

    unique.query("ann").await;

    let events = sink.events();
    assert_eq!(data(&events).len(), 1);
    assert_eq!(ends(&events), 1);
}

#[tokio::test]
async fn aggregator_ends_once_after_every_agent() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let roots: Vec<String> = ["https://a.org", "https://b.org", "https://c.org"]
        .into_iter()
        .map(|host| tree(&fetcher, host, "", &[("an", vec![("anne", "Anne"), ("andre", "Andre")])]))
        .collect();

    let relations = presets::fuzzy().relations;
    let agents: Vec<Arc<QueryAgent>> = roots
        .into_iter()
        .map(|root| Arc::new(QueryAgent::new(root, fetcher.clone(), relations.clone())))
        .collect();
    let aggregator = QueryAggregator::new(agents.iter().map(|a| a.clone() as Arc<dyn QueryEmitter>).collect());
    let sink = Arc::new(VecSink::new());
    let _sub = aggregator.subscribe(sink.clone());

    aggregator.query("an").await;

    let events = sink.events();
    assert_eq!(ends(&events), 1);
    assert!(events.last().is_some_and(SearchEvent::is_end));
    assert_eq!(data(&events).len(), 6);
    assert!(agents.iter().all(|a| a.active_query_count() == 0));
}

#[tokio::test]
async fn repeated_query_replays_without_fetching() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let root = tree(&fetcher, "https://a.org", "", &[("an", vec![("anne", "Anne"), ("annabel", "Annabel")])]);
    let search = AutoComplete::new(AutoCompleteConfig::fuzzy(vec![root], 5), fetcher.clone()).unwrap();
    let sink = Arc::new(VecSink::new());
    let _sub = search.subscribe(sink.clone());

    search.query("ann").await;
    let fetched = fetcher.total_fetches();
    let first = search.results();
    sink.clear();

    search.query("Ann").await;

    assert_eq!(fetcher.total_fetches(), fetched);
    let events = sink.events();
    assert!(matches!(events.first(), Some(SearchEvent::Reset { .. })));
    assert_eq!(data(&events).len(), first.len());
    assert!(events.last().is_some_and(SearchEvent::is_end));
    assert_eq!(search.results(), first);
}

#[tokio::test(start_paused = true)]
async fn superseded_query_never_surfaces_results() {
    let fetcher = Arc::new(MemoryFetcher::new().with_latency(Duration::from_millis(50)));
    let root = tree(
        &fetcher,
        "https://a.org",
        "<https://a.org/index> schema:name \"Alphabetical index\" .\n",
        &[("an", vec![("anne", "Anne"), ("abel", "Abel")])],
    );
    let search = Arc::new(AutoComplete::new(AutoCompleteConfig::fuzzy(vec![root], 5), fetcher.clone()).unwrap());
    let sink = Arc::new(VecSink::new());
    let _sub = search.subscribe(sink.clone());

    let first = {
        let search = search.clone();
        tokio::spawn(async move { search.query("a").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = {
        let search = search.clone();
        tokio::spawn(async move { search.query("ab").await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;

    let agent = &search.agents()[0];
    assert!(!agent.is_active("a"));
    assert!(agent.is_active("ab"));

    first.await.unwrap();
    second.await.unwrap();

    let events = sink.events();
    assert!(data(&events).iter().all(|e| e.query() == "ab"));
    assert!(!data(&events).is_empty());
    let end_a = events.iter().position(|e| e.is_end() && e.query() == "a").unwrap();
    let end_ab = events.iter().position(|e| e.is_end() && e.query() == "ab").unwrap();
    assert!(end_a < end_ab);
    assert_eq!(agent.active_query_count(), 0);
}

#[tokio::test]
async fn capitalized_query_follows_lowercase_relation_keys() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let root = tree(&fetcher, "https://a.org", "", &[("an", vec![("anne", "Anne")])]);
    let search = AutoComplete::new(AutoCompleteConfig::strict(vec![root], 5), fetcher.clone()).unwrap();
    let sink = Arc::new(VecSink::new());
    let _sub = search.subscribe(sink.clone());

    search.query("Anne").await;

    assert_eq!(fetcher.fetch_count("https://a.org/an"), 1);
    let results = search.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].fact.object.value(), "Anne");
    // Events keep the query as typed.
    assert!(sink.events().iter().all(|e| e.query() == "Anne"));
    assert_eq!(search.current_query().as_deref(), Some("Anne"));
}

#[tokio::test]
async fn empty_query_ranks_root_literals_shortest_first() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let root = tree(
        &fetcher,
        "https://a.org",
        "<https://a.org/frank> schema:name \"Anne Frank\" .\n\
         <https://a.org/bob> schema:name \"Bob\" .\n\
         <https://a.org/annabel> schema:name \"Annabel\" .\n",
        &[("an", vec![("anne", "Anne")])],
    );

    for config in [
        AutoCompleteConfig::strict(vec![root.clone()], 2),
        AutoCompleteConfig::fuzzy(vec![root.clone()], 2),
    ] {
        let search = AutoComplete::new(config, fetcher.clone()).unwrap();
        let sink = Arc::new(VecSink::new());
        let _sub = search.subscribe(sink.clone());

        search.query("").await;

        // Every stage scores zero except length, so the shortest names win.
        let results = search.results();
        let values: Vec<&str> = results.iter().map(|e| e.fact.object.value()).collect();
        assert_eq!(values, vec!["Bob", "Annabel"]);
        assert_eq!(results[0].scores.as_slice(), &[0.0, 0.0, -3.0]);
        assert_eq!(results[1].scores.as_slice(), &[0.0, 0.0, -7.0]);
        assert!(results.iter().all(|e| e.overlap.is_empty()));
        assert_eq!(ends(&sink.events()), 1);
    }
    assert_eq!(fetcher.fetch_count("https://a.org/an"), 0);
}

#[tokio::test]
async fn empty_query_ends_without_results() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let root = tree(&fetcher, "https://a.org", "", &[("an", vec![("anne", "Anne")])]);

    for config in [
        AutoCompleteConfig::strict(vec![root.clone()], 5),
        AutoCompleteConfig::fuzzy(vec![root.clone()], 5),
    ] {
        let search = AutoComplete::new(config, fetcher.clone()).unwrap();
        let sink = Arc::new(VecSink::new());
        let _sub = search.subscribe(sink.clone());

        search.query("").await;

        let events = sink.events();
        assert!(data(&events).is_empty());
        assert_eq!(ends(&events), 1);
        assert!(search.results().is_empty());
    }
    // No relation key is eligible for an empty query: only the roots were read.
    assert_eq!(fetcher.fetch_count("https://a.org/an"), 0);
    assert_eq!(fetcher.fetch_count(&root), 2);
}

#[tokio::test]
async fn unreachable_source_does_not_block_the_others() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let good = tree(&fetcher, "https://a.org", "", &[("an", vec![("anne", "Anne")])]);
    let bad = tree(&fetcher, "https://b.org", "", &[("an", vec![("annet", "Annet")])]);
    fetcher.fail(bad.clone());

    let search = AutoComplete::new(AutoCompleteConfig::strict(vec![good, bad], 5), fetcher).unwrap();
    let sink = Arc::new(VecSink::new());
    let _sub = search.subscribe(sink.clone());

    search.query("anne").await;

    assert_eq!(ends(&sink.events()), 1);
    let values: Vec<String> = search.results().iter().map(|e| e.fact.object.value().to_string()).collect();
    assert_eq!(values, vec!["Anne"]);
}

#[tokio::test]
async fn resolve_subject_describes_a_result() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let root = "https://a.org/root".to_string();
    fetcher.insert(
        root.clone(),
        turtle(&root, "<> tree:relation [ tree:node <an> ; tree:value \"an\" ] .\n"),
    );
    fetcher.insert(
        "https://a.org/an",
        turtle(
            "https://a.org/an",
            "<anne> schema:name \"Anne\" ; schema:alternateName \"Anneke\"@nl ;\n\
             schema:birthDate \"1929-06-12\"^^<http://www.w3.org/2001/XMLSchema#date> .\n",
        ),
    );
    let search = AutoComplete::new(AutoCompleteConfig::strict(vec![root], 5), fetcher).unwrap();

    search.query("anne").await;

    let facts = search.resolve_subject("https://a.org/anne");
    // Only textual facts travel down the pipeline, so only those are indexed.
    assert_eq!(facts.len(), 2);
    assert!(facts.iter().any(|f| f.predicate == "http://schema.org/alternateName"));
    assert!(!facts.iter().any(|f| f.predicate == "http://schema.org/birthDate"));
}
