//! UI strings for the reorder panel.
//!
//! Strings live under `{ language: { "pluginCollectionsDocsOrder": { key: text } } }`
//! and are merged into the host's translation registry. Host entries win.

use serde_json::{Map, Value, json};

pub const NAMESPACE: &str = "pluginCollectionsDocsOrder";

pub const FALLBACK_LANGUAGE: &str = "en";

pub const KEYS: [&str; 9] = [
    "sortItems",
    "asc",
    "desc",
    "loaded",
    "save",
    "cancel",
    "loadMore",
    "success",
    "error",
];

/// `pluginCollectionsDocsOrder:<name>`
pub fn key(name: &str) -> String {
    format!("{}:{}", NAMESPACE, name)
}

/// Translations shipped with the plugin.
pub fn bundled() -> Value {
    json!({
        "en": { NAMESPACE: {
            "sortItems": "Sort items",
            "asc": "Ascending",
            "desc": "Descending",
            "loaded": "Loaded",
            "save": "Save",
            "cancel": "Cancel",
            "loadMore": "Load more",
            "success": "Order saved",
            "error": "Could not save the new order"
        }},
        "de": { NAMESPACE: {
            "sortItems": "Einträge sortieren",
            "asc": "Aufsteigend",
            "desc": "Absteigend",
            "loaded": "Geladen",
            "save": "Speichern",
            "cancel": "Abbrechen",
            "loadMore": "Mehr laden",
            "success": "Reihenfolge gespeichert",
            "error": "Die Reihenfolge konnte nicht gespeichert werden"
        }},
        "es": { NAMESPACE: {
            "sortItems": "Ordenar elementos",
            "asc": "Ascendente",
            "desc": "Descendente",
            "loaded": "Cargados",
            "save": "Guardar",
            "cancel": "Cancelar",
            "loadMore": "Cargar más",
            "success": "Orden guardado",
            "error": "No se pudo guardar el nuevo orden"
        }},
        "fr": { NAMESPACE: {
            "sortItems": "Trier les éléments",
            "asc": "Croissant",
            "desc": "Décroissant",
            "loaded": "Chargés",
            "save": "Enregistrer",
            "cancel": "Annuler",
            "loadMore": "Charger plus",
            "success": "Ordre enregistré",
            "error": "Impossible d'enregistrer le nouvel ordre"
        }}
    })
}

/// Recursively merge `overrides` into `base`. Objects are merged key by key;
/// any other value in `overrides` replaces the one in `base`.
pub fn deep_merge(base: Value, overrides: Value) -> Value {
    match (base, overrides) {
        (Value::Object(mut base), Value::Object(overrides)) => {
            for (k, v) in overrides {
                let merged = match base.remove(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => v,
                };
                base.insert(k, merged);
            }
            Value::Object(base)
        }
        (_, overrides) => overrides,
    }
}

/// Resolves `namespace:key` strings for one language.
#[derive(Debug, Clone)]
pub struct Translator {
    translations: Value,
    language: String,
}

impl Translator {
    pub fn new(translations: Value, language: &str) -> Self {
        Self {
            translations,
            language: language.to_string(),
        }
    }

    /// Bundled strings only.
    pub fn bundled(language: &str) -> Self {
        Self::new(bundled(), language)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Look up `namespace:key`, falling back to English and then to the
    /// key itself.
    pub fn t(&self, full_key: &str) -> String {
        let (namespace, name) = full_key.split_once(':').unwrap_or((NAMESPACE, full_key));
        self.lookup(&self.language, namespace, name)
            .or_else(|| self.lookup(FALLBACK_LANGUAGE, namespace, name))
            .unwrap_or_else(|| full_key.to_string())
    }

    fn lookup(&self, language: &str, namespace: &str, name: &str) -> Option<String> {
        self.translations
            .get(language)
            .and_then(|l| l.get(namespace))
            .and_then(|n| n.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Languages present in a translation registry.
pub fn languages(translations: &Value) -> Vec<String> {
    translations
        .as_object()
        .map(Map::keys)
        .map(|keys| keys.cloned().collect())
        .unwrap_or_default()
}
