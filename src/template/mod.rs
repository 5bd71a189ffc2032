//! Keyed cache from JS template file name to rendered text (SPEC_FULL.md §4.3).
//!
//! Ported from the original tool's `TemplateLoader`: load once from disk, cache by
//! name, substitute `__VAR__` placeholders on every render. Missing placeholders
//! are left intact since a gate may not know every variable another gate
//! publishes (I1 only requires that a variable a script *does* reference was
//! produced by some gate, not that every gate knows every variable).

use dashmap::DashMap;
use std::path::{Path, PathBuf};

use crate::error::{GateCaptureError, GateCaptureResult};
use crate::plan::TemplateVars;

/// Loads and caches JS patch templates from a directory on disk.
pub struct TemplateLoader {
    js_dir: PathBuf,
    cache: DashMap<String, String>,
}

impl TemplateLoader {
    /// `js_dir` must exist at construction time; a missing directory is a
    /// configuration error raised once at startup rather than per-template.
    pub fn new(js_dir: PathBuf) -> GateCaptureResult<Self> {
        if !js_dir.is_dir() {
            return Err(GateCaptureError::configuration(format!(
                "template directory not found: {}",
                js_dir.display()
            )));
        }
        Ok(Self {
            js_dir,
            cache: DashMap::new(),
        })
    }

    fn load_raw(&self, name: &str) -> GateCaptureResult<String> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(cached.clone());
        }
        let path = self.template_path(name);
        let text = std::fs::read_to_string(&path)?;
        self.cache.insert(name.to_string(), text.clone());
        Ok(text)
    }

    fn template_path(&self, name: &str) -> PathBuf {
        self.js_dir.join(name)
    }

    /// Load `name` (caching the raw text) and substitute every `__KEY__`
    /// placeholder in `vars`. Keys are upper-cased and wrapped in `__..__` if not
    /// already in that form.
    pub fn load_and_render(&self, name: &str, vars: &TemplateVars) -> GateCaptureResult<String> {
        let mut rendered = self.load_raw(name)?;
        for (key, value) in vars.iter() {
            let placeholder = if key.starts_with("__") && key.ends_with("__") {
                key.clone()
            } else {
                format!("__{}__", key.to_uppercase())
            };
            rendered = rendered.replace(&placeholder, value);
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dir_is_configuration_error() {
        let result = TemplateLoader::new(PathBuf::from("/nonexistent/path/for/sure"));
        assert!(matches!(result, Err(GateCaptureError::Configuration(_))));
    }

    #[test]
    fn renders_known_placeholder_leaves_unknown_intact() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("t.js"), "ua=__UA__; tz=__TIMEZONE__;")
            .expect("write template");
        let loader = TemplateLoader::new(dir.path().to_path_buf()).expect("loader");
        let mut vars = TemplateVars::new();
        vars.insert("ua".to_string(), "TestUA".to_string());
        let rendered = loader.load_and_render("t.js", &vars).expect("render");
        assert_eq!(rendered, "ua=TestUA; tz=__TIMEZONE__;");
    }
}
