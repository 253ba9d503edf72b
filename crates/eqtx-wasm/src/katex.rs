//! KaTeX loaded by the host page.

use std::collections::BTreeMap;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use eqtx_core::{RenderOptions, TypesetError, Typesetter};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = katex, js_name = renderToString, catch)]
    fn render_to_string(source: &str, options: &JsValue) -> Result<String, JsValue>;
}

/// Options object passed to `katex.renderToString`. Serialized JSON-compatible
/// so `macros` becomes a plain object.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct KatexOptions<'a> {
    display_mode: bool,
    output: &'static str,
    throw_on_error: bool,
    strict: bool,
    trust: bool,
    macros: &'a BTreeMap<String, String>,
}

impl<'a> From<&'a RenderOptions> for KatexOptions<'a> {
    fn from(options: &'a RenderOptions) -> Self {
        Self {
            display_mode: options.display_mode,
            output: "html",
            throw_on_error: !options.error_tolerant,
            strict: options.strict,
            trust: options.trust,
            macros: &options.macros,
        }
    }
}

/// Typesetter calling the page's global `katex`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserKatex;

impl Typesetter for BrowserKatex {
    fn render(&self, source: &str, options: &RenderOptions) -> Result<String, TypesetError> {
        let options = KatexOptions::from(options)
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| TypesetError::Engine(e.to_string()))?;

        render_to_string(source, &options).map_err(|e| {
            let message = e
                .dyn_ref::<js_sys::Error>()
                .map(|err| String::from(err.message()))
                .or_else(|| e.as_string())
                .unwrap_or_else(|| "KaTeX failed".to_string());
            TypesetError::Malformed(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqtx_core::models::config::TypesetConfig;

    #[test]
    fn test_options_shape() {
        let options = RenderOptions::preview(&TypesetConfig::default());
        let json = serde_json::to_value(KatexOptions::from(&options)).unwrap();

        assert_eq!(json["displayMode"], true);
        assert_eq!(json["output"], "html");
        assert_eq!(json["throwOnError"], false);
        assert_eq!(json["strict"], false);
        assert_eq!(json["macros"]["\\bm"], "\\boldsymbol");
    }

    #[test]
    fn test_inline_options_throw() {
        let json = serde_json::to_value(KatexOptions::from(&RenderOptions::inline())).unwrap();
        assert_eq!(json["displayMode"], false);
        assert_eq!(json["throwOnError"], true);
    }
}
