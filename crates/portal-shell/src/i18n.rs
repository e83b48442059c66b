//! Locale tables and the translation overlay engine.
//!
//! Strings carrying the `::` marker are translation references. The overlay
//! engine walks an arbitrary settings tree and substitutes marked strings
//! with locale text, always building a fresh copy. The canonical document is
//! never touched, so any number of locale views can be derived from it
//! concurrently.

use std::{
    collections::HashMap,
    env, fs,
    sync::{Arc, OnceLock, RwLock},
};

use anyhow::Result;
use locale_config::Locale;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map as JsonMap, Value};
use tracing::debug;

use crate::{error::ShellError, paths::Layout};

/// Reserved prefix flagging a string as subject to locale translation.
pub const TRANSLATION_MARKER: &str = "::";

const LOCALE_ENV_KEY: &str = "PORTAL_LANG";
const FALLBACK_LOCALE: &str = "en-us";

/// Source of locale text, keyed by `(locale, namespace, key)`.
///
/// A miss is not an error; the overlay engine falls back to the
/// marker-stripped original.
pub trait LocaleProvider: Send + Sync {
    fn lookup(&self, locale: &str, namespace: &str, key: &str) -> Option<String>;
}

type LocaleTables = HashMap<String, HashMap<String, HashMap<String, String>>>;

/// In-memory locale tables, loaded from `locales/<locale>.toml` files.
///
/// Each file holds one locale; its top-level TOML tables are namespaces
/// mapping translation keys to text.
#[derive(Clone, Default)]
pub struct LocaleStore {
    inner: Arc<RwLock<LocaleTables>>,
}

static GLOBAL: OnceLock<LocaleStore> = OnceLock::new();

impl LocaleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide table instance.
    pub fn global() -> LocaleStore {
        GLOBAL.get_or_init(LocaleStore::new).clone()
    }

    /// Load every locale table found in the workspace.
    pub fn load(&self, layout: &Layout) -> Result<()> {
        let dir = layout.locales_dir();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)
            .map_err(|source| ShellError::ReadLocale { path: dir.to_path_buf(), source })?
        {
            let entry = entry
                .map_err(|source| ShellError::ReadLocale { path: dir.to_path_buf(), source })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let locale = locale.to_ascii_lowercase();

            let content = fs::read_to_string(&path)
                .map_err(|source| ShellError::ReadLocale { path: path.clone(), source })?;
            let namespaces: HashMap<String, HashMap<String, String>> =
                toml_edit::de::from_str(&content)
                    .map_err(|source| ShellError::ParseLocale { path: path.clone(), source })?;

            debug!(locale = %locale, namespaces = namespaces.len(), "locale table loaded");
            let mut tables = self.inner.write().expect("locale store poisoned");
            tables.insert(locale, namespaces);
        }
        Ok(())
    }

    /// Insert a single entry. Hosts and tests seed tables this way.
    pub fn insert(
        &self,
        locale: impl Into<String>,
        namespace: impl Into<String>,
        key: impl Into<String>,
        text: impl Into<String>,
    ) {
        let mut tables = self.inner.write().expect("locale store poisoned");
        tables
            .entry(locale.into())
            .or_default()
            .entry(namespace.into())
            .or_default()
            .insert(key.into(), text.into());
    }

    /// Locales with at least one table loaded.
    pub fn locales(&self) -> Vec<String> {
        let tables = self.inner.read().expect("locale store poisoned");
        let mut locales: Vec<String> = tables.keys().cloned().collect();
        locales.sort();
        locales
    }
}

impl LocaleProvider for LocaleStore {
    fn lookup(&self, locale: &str, namespace: &str, key: &str) -> Option<String> {
        let tables = self.inner.read().expect("locale store poisoned");
        tables.get(locale)?.get(namespace)?.get(key).cloned()
    }
}

/// Split a marked string into its lookup key.
///
/// The key is the full remainder after the marker; a bare `::` yields the
/// empty key.
pub fn strip_marker(value: &str) -> Option<&str> {
    value.strip_prefix(TRANSLATION_MARKER)
}

/// Translate one string. Unmarked input passes through unchanged.
pub fn translate_str(
    provider: &dyn LocaleProvider,
    locale: &str,
    namespace: &str,
    value: &str,
) -> String {
    match strip_marker(value) {
        Some(key) => provider
            .lookup(locale, namespace, key)
            .unwrap_or_else(|| key.to_string()),
        None => value.to_string(),
    }
}

/// Produce a locale view of an arbitrary value tree.
///
/// The result is a disjoint deep copy: fresh containers at every level, same
/// shape as the input. Mapping keys are never translated. Numbers, booleans
/// and null are copied unchanged.
pub fn translate_value(
    provider: &dyn LocaleProvider,
    locale: &str,
    namespace: &str,
    value: &Value,
) -> Value {
    match value {
        Value::String(text) => Value::String(translate_str(provider, locale, namespace, text)),
        Value::Array(items) => Value::Array(
            items.iter().map(|item| translate_value(provider, locale, namespace, item)).collect(),
        ),
        Value::Object(fields) => {
            let mut translated = JsonMap::with_capacity(fields.len());
            for (key, field) in fields {
                translated.insert(key.clone(), translate_value(provider, locale, namespace, field));
            }
            Value::Object(translated)
        }
        other => other.clone(),
    }
}

/// Produce a locale view of a typed document via its serde shape.
pub fn translate<T>(provider: &dyn LocaleProvider, locale: &str, namespace: &str, value: &T) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let tree = serde_json::to_value(value).map_err(|source| ShellError::TranslateShape { source })?;
    let translated = translate_value(provider, locale, namespace, &tree);
    let typed = serde_json::from_value(translated)
        .map_err(|source| ShellError::TranslateShape { source })?;
    Ok(typed)
}

/// Locale used when a request does not name one.
///
/// `PORTAL_LANG` wins, then the system locale, then `en-us`.
pub fn default_locale() -> String {
    if let Ok(value) = env::var(LOCALE_ENV_KEY) {
        if let Some(tag) = normalize_locale_tag(&value) {
            return tag;
        }
    }

    let locale = Locale::user_default();
    for (_category, tag) in locale.tags() {
        if let Some(tag) = normalize_locale_tag(tag.as_ref()) {
            return tag;
        }
    }

    FALLBACK_LOCALE.to_string()
}

/// Normalize a raw locale tag to the lowercase `xx-yy` form the tables use.
pub fn normalize_locale_tag(raw: &str) -> Option<String> {
    let mut normalized = raw
        .trim()
        .split('=')
        .next_back()
        .unwrap_or(raw)
        .replace('_', "-")
        .to_ascii_lowercase();

    if let Some(idx) = normalized.find('@') {
        normalized.truncate(idx);
    }
    if let Some(idx) = normalized.find('.') {
        normalized.truncate(idx);
    }

    if normalized.is_empty() {
        return None;
    }
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_demo_entries() -> LocaleStore {
        let store = LocaleStore::new();
        store.insert("zh-cn", "app", "Demo Application", "示例应用");
        store.insert("zh-cn", "app", "Demo", "演示");
        store.insert("zh-cn", "app", "Another portal application", "又一个门户应用");
        store
    }

    #[test]
    fn strips_marker_and_keeps_plain_strings() {
        assert_eq!(strip_marker("::Demo"), Some("Demo"));
        assert_eq!(strip_marker("Demo"), None);
        assert_eq!(strip_marker("::"), Some(""));
    }

    #[test]
    fn translates_marked_string_on_hit() {
        let store = store_with_demo_entries();
        assert_eq!(translate_str(&store, "zh-cn", "app", "::Demo Application"), "示例应用");
    }

    #[test]
    fn miss_falls_back_to_stripped_original() {
        let store = store_with_demo_entries();
        assert_eq!(translate_str(&store, "fr-fr", "app", "::Demo Application"), "Demo Application");
        // unknown namespace behaves like a per-key miss
        assert_eq!(translate_str(&store, "zh-cn", "menu", "::Demo Application"), "Demo Application");
    }

    #[test]
    fn unmarked_string_is_untouched_for_any_locale() {
        let store = store_with_demo_entries();
        assert_eq!(translate_str(&store, "zh-cn", "app", "Demo Application"), "Demo Application");
        assert_eq!(translate_str(&store, "fr-fr", "app", ""), "");
    }

    #[test]
    fn empty_key_after_marker_falls_back_to_empty() {
        let store = store_with_demo_entries();
        assert_eq!(translate_str(&store, "zh-cn", "app", "::"), "");
    }

    #[test]
    fn overlay_never_mutates_its_input() {
        let store = store_with_demo_entries();
        let source = json!({
            "name": "::Demo Application",
            "menu": { "process": "flows.app.menu", "args": ["demo"] },
            "tags": ["::Demo", "plain"],
            "count": 3,
            "enabled": true,
            "nothing": null
        });
        let before = source.clone();

        let translated = translate_value(&store, "zh-cn", "app", &source);
        assert_eq!(source, before);
        assert_eq!(translated["name"], "示例应用");
        assert_eq!(translated["tags"][0], "演示");
        assert_eq!(translated["tags"][1], "plain");
        // process names are plain strings, not markers
        assert_eq!(translated["menu"]["process"], "flows.app.menu");
        assert_eq!(translated["count"], 3);
        assert_eq!(translated["enabled"], true);
        assert_eq!(translated["nothing"], Value::Null);
    }

    #[test]
    fn overlay_preserves_shape() {
        let store = store_with_demo_entries();
        let source = json!({
            "a": { "b": ["::Demo", { "c": "::Demo Application" }] },
            "d": 1.5
        });
        let translated = translate_value(&store, "zh-cn", "app", &source);

        assert!(translated.is_object());
        assert_eq!(translated.as_object().unwrap().len(), source.as_object().unwrap().len());
        assert_eq!(
            translated["a"]["b"].as_array().unwrap().len(),
            source["a"]["b"].as_array().unwrap().len()
        );
        assert_eq!(translated["d"], source["d"]);
    }

    #[test]
    fn mapping_keys_are_never_translated() {
        let store = LocaleStore::new();
        store.insert("zh-cn", "app", "key", "值");
        let source = json!({ "::key": "::key" });
        let translated = translate_value(&store, "zh-cn", "app", &source);
        assert!(translated.get("::key").is_some());
        assert_eq!(translated["::key"], "值");
    }

    #[test]
    fn typed_translation_round_trips_the_document() {
        use crate::settings::AppSettings;

        let store = store_with_demo_entries();
        let mut settings = AppSettings {
            name: "::Demo Application".into(),
            short: "::Demo".into(),
            description: "::Another portal application".into(),
            ..Default::default()
        };
        settings.menu.process = "flows.app.menu".into();
        settings.menu.args = vec!["demo".into()];
        settings.optional.hide_notification = true;

        let view: AppSettings = translate(&store, "zh-cn", "app", &settings).unwrap();
        assert_eq!(view.name, "示例应用");
        assert_eq!(view.short, "演示");
        assert_eq!(view.description, "又一个门户应用");
        assert_eq!(view.menu.process, "flows.app.menu");
        assert_eq!(view.menu.args, vec!["demo".to_string()]);
        assert!(view.optional.hide_notification);

        // the canonical document keeps its markers
        assert_eq!(settings.name, "::Demo Application");
        assert_eq!(settings.short, "::Demo");
    }

    #[test]
    fn loads_tables_from_locale_files() {
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().to_path_buf());
        layout.ensure().unwrap();
        fs::write(
            layout.locale_table_path("zh-CN"),
            "[app]\n\"Demo Application\" = \"示例应用\"\n",
        )
        .unwrap();

        let store = LocaleStore::new();
        store.load(&layout).unwrap();
        // file stems are normalized to lowercase tags
        assert_eq!(store.locales(), vec!["zh-cn".to_string()]);
        assert_eq!(store.lookup("zh-cn", "app", "Demo Application").as_deref(), Some("示例应用"));
    }

    #[test]
    fn global_tables_are_process_wide() {
        LocaleStore::global().insert("ja-jp", "app", "Demo", "デモ");
        assert_eq!(LocaleStore::global().lookup("ja-jp", "app", "Demo").as_deref(), Some("デモ"));
    }

    #[test]
    fn normalizes_locale_tags() {
        assert_eq!(normalize_locale_tag("zh_CN.UTF-8").as_deref(), Some("zh-cn"));
        assert_eq!(normalize_locale_tag("  en-US ").as_deref(), Some("en-us"));
        assert_eq!(normalize_locale_tag("").as_deref(), None);
    }
}
