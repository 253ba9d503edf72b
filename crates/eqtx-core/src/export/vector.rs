//! Self-contained vector document for download and textual fallback.

use crate::models::config::ExportConfig;

use super::stage::StagedClone;

/// Rule appended after the engine styles so the document renders the same
/// outside the page that produced it.
pub const KATEX_OVERRIDE_STYLE: &str = concat!(
    ".katex {\n",
    "  font-size: 1.21em !important;\n",
    "  line-height: 1.2 !important;\n",
    "  font-family: KaTeX_Main, \"Times New Roman\", serif !important;\n",
    "  color: black !important;\n",
    "}"
);

/// MIME type used when saving the document.
pub const VECTOR_MIME_TYPE: &str = "image/svg+xml;charset=utf-8";

/// Serialize the staged clone into an SVG document.
///
/// The canvas has a fixed size; a single `foreignObject` sized to the
/// measured bound wraps the cloned markup. The output depends only on its
/// inputs.
pub fn vector_document(staged: &StagedClone, engine_styles: &str, config: &ExportConfig) -> String {
    let width = config.canvas_width;
    let height = config.canvas_height;
    let offset = config.canvas_offset;

    let mut styles = String::new();
    if !engine_styles.trim().is_empty() {
        styles.push_str(engine_styles.trim_end());
        styles.push('\n');
    }
    styles.push_str(KATEX_OVERRIDE_STYLE);

    format!(
        concat!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            "<defs>\n<style>\n{styles}\n</style>\n</defs>\n",
            "<foreignObject x=\"{x}\" y=\"{y}\" width=\"{fw}\" height=\"{fh}\">\n",
            "<div xmlns=\"http://www.w3.org/1999/xhtml\">{markup}</div>\n",
            "</foreignObject>\n",
            "</svg>\n"
        ),
        w = width,
        h = height,
        styles = escape_style(&styles),
        x = offset,
        y = offset,
        fw = staged.bounds.pixel_width(),
        fh = staged.bounds.pixel_height(),
        markup = staged.markup,
    )
}

fn escape_style(styles: &str) -> String {
    styles.replace('&', "&amp;").replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::geometry::measure_content;
    use crate::export::stage::RenderedPreview;
    use crate::export::stage::testing::FixedPreview;
    use pretty_assertions::assert_eq;

    fn staged() -> (FixedPreview, StagedClone) {
        let preview = FixedPreview::equation();
        let bounds = measure_content(&preview.leaf_boxes()).unwrap();
        let staged = StagedClone::stage(&preview, bounds);
        (preview, staged)
    }

    #[test]
    fn test_document_structure() {
        let (preview, staged) = staged();
        let doc = vector_document(&staged, &preview.engine_styles(), &ExportConfig::default());

        assert!(doc.starts_with(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="800" height="200" viewBox="0 0 800 200">"#
        ));
        assert!(doc.contains(r#"<foreignObject x="10" y="10" width="62" height="26">"#));
        assert!(doc.contains(r#"<div xmlns="http://www.w3.org/1999/xhtml"><div class="eqtx-staged""#));
        assert_eq!(doc.matches("<foreignObject").count(), 1);
    }

    #[test]
    fn test_override_follows_engine_styles() {
        let (preview, staged) = staged();
        let doc = vector_document(&staged, &preview.engine_styles(), &ExportConfig::default());

        let engine = doc.find(".katex{font:normal").unwrap();
        let override_rule = doc.find("font-size: 1.21em !important").unwrap();
        assert!(engine < override_rule);
        assert!(doc.contains("color: black !important;"));
    }

    #[test]
    fn test_document_is_deterministic() {
        let (preview, staged) = staged();
        let config = ExportConfig::default();
        assert_eq!(
            vector_document(&staged, &preview.engine_styles(), &config),
            vector_document(&staged, &preview.engine_styles(), &config)
        );
    }

    #[test]
    fn test_canvas_size_follows_config() {
        let (_, staged) = staged();
        let config = ExportConfig {
            canvas_width: 400,
            canvas_height: 100,
            canvas_offset: 4,
            ..ExportConfig::default()
        };
        let doc = vector_document(&staged, "", &config);
        assert!(doc.contains(r#"viewBox="0 0 400 100""#));
        assert!(doc.contains(r#"<foreignObject x="4" y="4""#));
        assert!(doc.contains("<style>\n.katex {"));
    }
}
