//! Self-contained HTML fragments for the explanation panels.
//!
//! Charts are inline SVG built with `format!`, so the fragments can be
//! dropped into any page or written to disk without external scripts.

mod force_plot;
mod lime_report;

pub use force_plot::force_plot;
pub use lime_report::lime_report;

pub const SHAP_PANEL_HEIGHT: u32 = 300;
pub const LIME_PANEL_HEIGHT: u32 = 600;

pub(crate) const POSITIVE_RED: &str = "#ff0d57";
pub(crate) const NEGATIVE_BLUE: &str = "#1e88e5";

/// Escape text for element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap a fragment in a scrollable region `height` pixels high.
pub fn embed(html: &str, height: u32) -> String {
    format!("<div class=\"panel\" style=\"height:{height}px;overflow:auto\">{html}</div>")
}

/// Full HTML document around one fragment, used for files written to disk.
pub fn standalone(title: &str, html: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n<body style=\"font-family:sans-serif\">\n{html}\n</body></html>\n",
        escape(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape("PHQ评估"), "PHQ评估");
    }

    #[test]
    fn embed_sets_height() {
        let html = embed("<p>x</p>", SHAP_PANEL_HEIGHT);
        assert!(html.contains("height:300px"));
        assert!(html.contains("overflow:auto"));
        assert!(standalone("t<", "<p/>").contains("<title>t&lt;</title>"));
    }
}
