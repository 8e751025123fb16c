//! Integration tests for per-locale configuration sets.

use confmap::{ConfigSection, LocaleSet, MapError, Schema};
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[derive(Debug, Clone, Default)]
struct Messages {
    welcome: String,
    farewell: String,
    errors: BTreeMap<String, String>,
}

impl ConfigSection for Messages {
    fn schema() -> Schema<Self> {
        Schema::<Self>::builder()
            .constructor(Self::default)
            .field("welcome", |s| &s.welcome, |s| &mut s.welcome)
            .comment("Shown on login")
            .field("farewell", |s| &s.farewell, |s| &mut s.farewell)
            .field("errors", |s| &s.errors, |s| &mut s.errors)
            .build()
    }
}

/// Defaults read from `<dir>/{locale}.yml`, as an application would ship them.
fn shipped_defaults(dir: &std::path::Path) -> impl Fn(&str) -> Option<String> + '_ {
    move |locale: &str| fs::read_to_string(dir.join(format!("{}.yml", locale))).ok()
}

#[test]
fn test_each_locale_merges_its_own_defaults() {
    let temp = TempDir::new().unwrap();
    let shipped = temp.path().join("shipped");
    fs::create_dir_all(&shipped).unwrap();
    fs::write(shipped.join("en.yml"), "welcome: Welcome\nfarewell: Bye\n").unwrap();
    fs::write(shipped.join("de.yml"), "welcome: Willkommen\nfarewell: Tschüss\n").unwrap();

    let root = temp.path().join("lang");
    fs::create_dir_all(root.join("de")).unwrap();
    fs::write(root.join("de").join("messages.yml"), "welcome: Hallo\n").unwrap();

    let set = LocaleSet::<Messages>::new(&root, "messages", ["en", "de"], shipped_defaults(&shipped))
        .unwrap();
    let en = set.get("en").unwrap();
    let de = set.get("de").unwrap();
    assert_eq!(en.welcome, "Welcome");
    assert_eq!(de.welcome, "Hallo");
    assert_eq!(de.farewell, "Tschüss");
    assert!(de.errors.is_empty());
}

#[test]
fn test_save_writes_commented_file_per_locale() {
    let temp = TempDir::new().unwrap();
    let set = LocaleSet::<Messages>::new(temp.path(), "messages", ["en"], |_| {
        Some("welcome: Hi\nfarewell: Bye\nerrors:\n  e404: Not found\n".to_string())
    })
    .unwrap();
    set.save("en").unwrap();

    let text = fs::read_to_string(temp.path().join("en").join("messages.yml")).unwrap();
    assert_eq!(
        text,
        "# Shown on login\nwelcome: Hi\nfarewell: Bye\nerrors:\n  e404: Not found\n"
    );
}

#[test]
fn test_concurrent_first_access_materializes_once() {
    let temp = TempDir::new().unwrap();
    let set = Arc::new(
        LocaleSet::<Messages>::new(temp.path(), "messages", ["en"], |_| {
            Some("welcome: Hi\n".to_string())
        })
        .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let set = Arc::clone(&set);
            thread::spawn(move || set.get("en").unwrap())
        })
        .collect();
    let loaded: Vec<Arc<Messages>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for other in &loaded[1..] {
        assert!(Arc::ptr_eq(&loaded[0], other));
    }
}

#[test]
fn test_unknown_locale_is_an_error() {
    let temp = TempDir::new().unwrap();
    let set = LocaleSet::<Messages>::new(temp.path(), "messages", ["en"], |_| None).unwrap();
    assert!(matches!(set.get("jp"), Err(MapError::UnknownLocale(_))));
    assert!(set.mapper("en").is_ok());
}

#[test]
fn test_edits_survive_save_and_reload() {
    let temp = TempDir::new().unwrap();
    let set = LocaleSet::<Messages>::new(temp.path(), "messages", ["en"], |_| {
        Some("welcome: Hi\nfarewell: Bye\n".to_string())
    })
    .unwrap();
    assert_eq!(set.get("en").unwrap().welcome, "Hi");

    set.update("en", |m| m.welcome = "Hello".to_string()).unwrap();
    set.save_all().unwrap();
    assert_eq!(set.reload("en").unwrap().welcome, "Hello");

    let mut replaced = (*set.get("en").unwrap()).clone();
    replaced.farewell = "Ciao".to_string();
    set.replace("en", replaced).unwrap();
    set.save("en").unwrap();
    let reread = set.reload("en").unwrap();
    assert_eq!(reread.welcome, "Hello");
    assert_eq!(reread.farewell, "Ciao");
}

#[test]
fn test_mapper_writes_are_kept_after_reload() {
    let temp = TempDir::new().unwrap();
    let set = LocaleSet::<Messages>::new(temp.path(), "messages", ["en"], |_| {
        Some("welcome: Hi\n".to_string())
    })
    .unwrap();
    assert_eq!(set.get("en").unwrap().welcome, "Hi");

    let edited = Messages {
        welcome: "Hello".to_string(),
        ..Messages::default()
    };
    set.mapper("en").unwrap().save(&edited).unwrap();
    set.reload("en").unwrap();
    set.save("en").unwrap();

    let text = fs::read_to_string(temp.path().join("en").join("messages.yml")).unwrap();
    assert!(text.contains("welcome: Hello"));
    assert_eq!(set.get("en").unwrap().welcome, "Hello");
}
