//! End-to-end scenarios: feed text through to active rules and match queries.

use std::sync::Arc;

use url_blocklist_r::{
    compile, compile_feed, normalize_url, BlocklistEngine, BlocklistError, EngineOptions,
    ExcludedDomains, MemoryRuleStore, NetworkErrorKind, RefreshOutcome, RuleRecord, RuleStore,
    StaticFeedFetcher, RULE_ID_OFFSET,
};

fn patterns_for(feed: &str) -> Vec<String> {
    compile_feed(feed, &ExcludedDomains::default(), RULE_ID_OFFSET, 64)
        .unwrap()
        .rule_set
        .patterns()
}

fn engine_for(feed: &str) -> BlocklistEngine {
    BlocklistEngine::new(EngineOptions::default())
        .with_fetcher(Arc::new(StaticFeedFetcher::new(feed)))
}

#[test]
fn test_link_and_description_with_trailing_punctuation() {
    let feed = r#"
<item>
  <link>https://example.org/page</link>
  <description>see http://sub.example.org/a/b), thanks</description>
</item>"#;
    assert_eq!(
        patterns_for(feed),
        vec!["||example.org/page", "||sub.example.org/a/b"]
    );
}

#[test]
fn test_excluded_publisher_domain() {
    let feed = "<item><link>https://minjust.gov.ru/some/page</link></item>";
    assert!(patterns_for(feed).is_empty());
}

#[test]
fn test_root_link_becomes_domain_rule() {
    let feed = "<item><link>https://example.org/</link></item>";
    assert_eq!(patterns_for(feed), vec!["||example.org"]);
}

#[test]
fn test_trailing_space_duplicate_collapses() {
    let feed = r#"
<item><link>https://example.org/page</link></item>
<item><description>"https://example.org/page "</description></item>"#;
    let report = compile_feed(feed, &ExcludedDomains::default(), RULE_ID_OFFSET, 64).unwrap();
    assert_eq!(report.raw_candidates, 2);
    assert_eq!(report.rule_set.patterns(), vec!["||example.org/page"]);
}

#[test]
fn test_trailing_space_variant_normalizes_to_same_rule() {
    let excluded = ExcludedDomains::default();
    let plain = normalize_url("https://example.org/page", &excluded).unwrap();
    let spaced = normalize_url("https://example.org/page ", &excluded).unwrap();
    assert_eq!(plain.pattern(), "||example.org/page");
    assert_eq!(spaced, plain);

    let set = compile([plain, spaced], RULE_ID_OFFSET, 64).unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.patterns(), vec!["||example.org/page"]);
}

#[test]
fn test_network_failure_keeps_previous_rules() {
    let store = Arc::new(MemoryRuleStore::new());
    let feed = r#"
<item><link>https://a.example/1</link></item>
<item><link>https://b.example/2</link></item>
<item><link>https://c.example/</link></item>"#;

    let engine = engine_for(feed).with_rule_store(store.clone());
    engine.refresh().unwrap();
    let before = engine.get_active_rules();
    assert_eq!(before.len(), 3);

    let offline = engine.with_fetcher(Arc::new(StaticFeedFetcher::unreachable()));
    let err = offline.refresh().unwrap_err();
    assert!(matches!(
        err,
        BlocklistError::Network {
            kind: NetworkErrorKind::Transport,
            ..
        }
    ));

    assert_eq!(offline.get_active_rules(), before);
    assert_eq!(store.list_active_rules().unwrap().len(), 3);
    assert!(offline.match_url("https://c.example/anything"));
}

#[test]
fn test_prefix_match_property() {
    let engine = engine_for("<link>https://a.com/x</link>");
    engine.refresh().unwrap();

    assert!(engine.match_url("https://a.com/x"));
    assert!(engine.match_url("https://www.a.com/x"));
    assert!(engine.match_url("https://a.com/xyz"));
    assert!(!engine.match_url("https://b.com/x"));
}

#[test]
fn test_rule_records_exposed_to_store() {
    let store = Arc::new(MemoryRuleStore::new());
    let engine = engine_for("<link>https://a.com/x</link><link>https://b.com</link>")
        .with_rule_store(store.clone());
    engine.refresh().unwrap();

    let records = store.list_active_rules().unwrap();
    assert_eq!(
        records,
        vec![
            RuleRecord::block(1000, "||a.com/x"),
            RuleRecord::block(1001, "||b.com"),
        ]
    );
    assert!(records.iter().all(|r| r.priority == 1 && r.id >= RULE_ID_OFFSET));
}

#[test]
fn test_custom_excluded_domains() {
    let options = EngineOptions::new()
        .with_excluded_domains(ExcludedDomains::new(["feed.example", "www.social.example"]));
    let engine = BlocklistEngine::new(options).with_fetcher(Arc::new(StaticFeedFetcher::new(
        r#"<link>https://feed.example/rss</link>
<link>https://social.example/u/1</link>
<link>https://vk.com/club1</link>"#,
    )));

    let outcome = engine.refresh().unwrap();
    assert!(matches!(outcome, RefreshOutcome::Updated(s) if s.excluded == 2));
    assert_eq!(engine.get_active_rules(), vec!["||vk.com/club1"]);
}

#[test]
fn test_rules_survive_restart_through_store() {
    let store = Arc::new(MemoryRuleStore::new());
    engine_for("<link>https://a.com/x</link>")
        .with_rule_store(store.clone())
        .refresh()
        .unwrap();

    let restarted = BlocklistEngine::default()
        .with_fetcher(Arc::new(StaticFeedFetcher::unreachable()))
        .with_rule_store(store);
    assert!(!restarted.match_url("https://a.com/x"));

    restarted.restore_from_store().unwrap();
    assert!(restarted.match_url("https://a.com/x"));
}
