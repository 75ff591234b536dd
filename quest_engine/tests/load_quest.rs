use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use quest_data::ValidationError;
use quest_engine::loader::{DocumentFormat, parse_quest};
use quest_engine::{LoadWarning, QuestCatalog, build_graph, load_graph};
use serde_json::json;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn keys<'a, S: AsRef<str> + ?Sized + 'a>(iter: impl Iterator<Item = &'a S>) -> BTreeSet<&'a str> {
    iter.map(AsRef::as_ref).collect()
}

#[test]
fn registries_match_declared_entries() {
    let doc = json!({
        "internalName": "keys",
        "title": "Keys",
        "startScreen": "one",
        "items": { "a": "A", "b": { "title": "B" } },
        "recipes": {
            "ab": "a + b = b",
            "explicit": { "ingredients": { "a": 2 }, "results": { "b": 3 } }
        },
        "variables": { "flag": true, "count": 2, "label": "x" },
        "screens": [
            { "internalName": "one", "title": "One" },
            { "title": "Unnamed" },
            { "internalName": "two", "title": "Two" }
        ],
        "relays": [ { "internalName": "r1", "forks": [] }, { "internalName": "r2", "forks": [] } ]
    });
    let def = serde_json::from_value(doc).unwrap();
    let (graph, report) = build_graph(&def);
    assert!(report.is_clean(), "{:?}", report.warnings);

    assert_eq!(keys(graph.items().keys()), BTreeSet::from(["a", "b"]));
    assert_eq!(keys(graph.recipes().keys()), BTreeSet::from(["ab", "explicit"]));
    assert_eq!(keys(graph.variable_defaults().keys()), BTreeSet::from(["count", "flag", "label"]));
    assert_eq!(keys(graph.screen_names()), BTreeSet::from(["one", "two"]));
    assert_eq!(keys(graph.relays().keys()), BTreeSet::from(["r1", "r2"]));
    assert_eq!(graph.screens().len(), 3);
    assert_eq!(graph.screen(1).unwrap().title, "Unnamed");

    let explicit = graph.recipe("explicit").unwrap();
    assert_eq!(explicit.ingredients[0].amount, 2);
    assert_eq!(explicit.results[0].amount, 3);
}

#[test]
fn duplicates_and_dangling_references_are_reported_not_fatal() {
    let doc = json!({
        "internalName": "messy",
        "startScreen": "start",
        "screens": [
            { "internalName": "start", "title": "First",
              "choices": [{ "title": "Go", "action": ["jump void", "give ghost"] }] },
            { "internalName": "start", "title": "Second" }
        ]
    });
    let def = serde_json::from_value(doc).unwrap();
    let (graph, report) = build_graph(&def);

    assert_eq!(graph.screen_by_name("start").unwrap().title, "Second");
    assert!(report.warnings.contains(&LoadWarning::Document(ValidationError::DuplicateId {
        kind: "screen",
        id: "start".into()
    })));
    let script_warnings = report
        .warnings
        .iter()
        .filter(|w| matches!(w, LoadWarning::Script { .. }))
        .count();
    assert_eq!(script_warnings, 2);
}

#[test]
fn json_toml_and_ron_documents_load_alike() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = write(
        dir.path(),
        "quest.json",
        r#"{ "internalName": "fmt", "title": "Formats", "startScreen": "s",
             "items": { "coin": "Coin" },
             "screens": [ { "internalName": "s", "title": "S", "text": "hello",
                            "choices": [ { "title": "Take", "action": "give coin" } ] } ] }"#,
    );
    let toml_path = write(
        dir.path(),
        "quest.toml",
        r#"
internalName = "fmt"
title = "Formats"
startScreen = "s"

[items]
coin = "Coin"

[[screens]]
internalName = "s"
title = "S"
text = "hello"

[[screens.choices]]
title = "Take"
action = "give coin"
"#,
    );
    let ron_path = write(
        dir.path(),
        "quest.ron",
        r#"(
    internalName: "fmt",
    title: "Formats",
    startScreen: "s",
    items: { "coin": "Coin" },
    screens: [
        (
            internalName: Some("s"),
            title: "S",
            text: "hello",
            choices: [ (title: "Take", action: "give coin") ],
        ),
    ],
)"#,
    );

    for path in [json_path, toml_path, ron_path] {
        let (graph, report) = load_graph(&path).unwrap_or_else(|e| panic!("{}: {e:#}", path.display()));
        assert!(report.is_clean(), "{}: {:?}", path.display(), report.warnings);
        assert_eq!(graph.internal_name(), "fmt");
        assert_eq!(graph.item_title("coin"), "Coin");
        let screen = graph.screen_by_name("s").unwrap();
        assert_eq!(screen.joined_text(), "hello");
        assert_eq!(screen.choices[0].action.commands(), ["give coin"]);
    }
}

#[test]
fn unsupported_or_broken_files_fail_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let txt = write(dir.path(), "quest.txt", "{}");
    let broken = write(dir.path(), "broken.json", "{ not json");
    assert!(load_graph(&txt).is_err());
    assert!(load_graph(&broken).is_err());
    assert!(load_graph(&dir.path().join("missing.json")).is_err());
    assert!(parse_quest("internalName = 1", DocumentFormat::Toml).is_err());
}

#[test]
fn catalog_loads_a_directory_and_skips_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a.json",
        r#"{ "internalName": "alpha", "startScreen": "s", "screens": [ { "internalName": "s", "title": "S" } ] }"#,
    );
    write(
        dir.path(),
        "b.toml",
        "internalName = \"beta\"\nstartScreen = \"s\"\n\n[[screens]]\ninternalName = \"s\"\ntitle = \"S\"\n",
    );
    write(dir.path(), "c.json", "not a quest");
    write(dir.path(), "notes.md", "# ignored");

    let mut catalog = QuestCatalog::default();
    let reports = catalog.load_dir(dir.path()).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["alpha", "beta"]);

    let mut session = catalog.new_session("beta").unwrap();
    session.start().unwrap();
    assert_eq!(session.current_screen().unwrap().title, "S");

    assert!(catalog.load_dir(&dir.path().join("nope")).is_err());
}

#[test]
fn bundled_demo_quest_loads_cleanly() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/quest.json");
    let (graph, report) = load_graph(&path).unwrap();
    assert!(report.is_clean(), "{:?}", report.warnings);
    assert_eq!(graph.start_screen(), "gate");
}
