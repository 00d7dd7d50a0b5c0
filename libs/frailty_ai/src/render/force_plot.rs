use frailty_model::{FeatureVector, Indicator, Locale};

use super::{escape, NEGATIVE_BLUE, POSITIVE_RED};
use crate::explain::shap::ClassAttribution;

const WIDTH: f64 = 860.0;
const MARGIN: f64 = 30.0;
const BAR_Y: f64 = 70.0;
const BAR_H: f64 = 22.0;
const MIN_LABEL_PX: f64 = 40.0;

struct Segment {
    indicator: Indicator,
    value: u8,
    contribution: f64,
    start: f64,
    end: f64,
}

/// Additive force plot of one class probability.
///
/// Positive contributions are stacked in red up to `f(x)` from the left,
/// negative ones in blue from `f(x)` to the right; the base value sits where
/// the two stacks would cancel.
pub fn force_plot(attribution: &ClassAttribution, features: &FeatureVector, locale: Locale) -> String {
    let fx = attribution.output_value();
    let base = attribution.base_value;
    let ranked = attribution.nonzero(features);

    let mut segments = Vec::with_capacity(ranked.len());
    let (mut left, mut right) = (fx, fx);
    for &(indicator, value, contribution) in ranked.iter().filter(|r| r.2 > 0.0) {
        segments.push(Segment {
            indicator,
            value,
            contribution,
            start: left - contribution,
            end: left,
        });
        left -= contribution;
    }
    for &(indicator, value, contribution) in ranked.iter().filter(|r| r.2 < 0.0) {
        segments.push(Segment {
            indicator,
            value,
            contribution,
            start: right,
            end: right - contribution,
        });
        right -= contribution;
    }

    let lo = left.min(base).min(fx);
    let hi = right.max(base).max(fx);
    let span = if hi - lo > 0.0 { hi - lo } else { 1.0 };
    let pad = span * 0.05;
    let (lo, hi) = (lo - pad, hi + pad);
    let x = |v: f64| MARGIN + (v - lo) / (hi - lo) * (WIDTH - 2.0 * MARGIN);

    let (higher, lower, base_label) = match locale {
        Locale::En => ("higher", "lower", "base value"),
        Locale::Zh => ("更高", "更低", "基准值"),
    };

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"160\" font-size=\"11\">"
    ));
    svg.push_str(&format!(
        "<line x1=\"{MARGIN}\" y1=\"{BAR_Y}\" x2=\"{:.1}\" y2=\"{BAR_Y}\" stroke=\"#999\"/>",
        WIDTH - MARGIN
    ));
    for tick in 0..=4 {
        let v = lo + (hi - lo) * tick as f64 / 4.0;
        let tx = x(v);
        svg.push_str(&format!(
            "<line x1=\"{tx:.1}\" y1=\"{:.1}\" x2=\"{tx:.1}\" y2=\"{BAR_Y}\" stroke=\"#999\"/>\
             <text x=\"{tx:.1}\" y=\"{:.1}\" text-anchor=\"middle\" fill=\"#666\">{v:.3}</text>",
            BAR_Y - 4.0,
            BAR_Y - 8.0
        ));
    }

    for seg in &segments {
        let (x0, x1) = (x(seg.start), x(seg.end));
        let color = if seg.contribution > 0.0 {
            POSITIVE_RED
        } else {
            NEGATIVE_BLUE
        };
        let label = format!(
            "{} = {}",
            seg.indicator.column_name(locale),
            seg.value
        );
        svg.push_str(&format!(
            "<rect x=\"{x0:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{BAR_H}\" fill=\"{color}\" stroke=\"#fff\">\
             <title>{} ({:+.4})</title></rect>",
            BAR_Y + 4.0,
            (x1 - x0).max(0.5),
            escape(&label),
            seg.contribution
        ));
        if x1 - x0 >= MIN_LABEL_PX {
            svg.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" fill=\"{color}\">{}</text>",
                (x0 + x1) / 2.0,
                BAR_Y + BAR_H + 20.0,
                escape(&label)
            ));
        }
    }

    let fx_x = x(fx);
    svg.push_str(&format!(
        "<line x1=\"{fx_x:.1}\" y1=\"{:.1}\" x2=\"{fx_x:.1}\" y2=\"{:.1}\" stroke=\"#000\"/>\
         <text x=\"{fx_x:.1}\" y=\"24\" text-anchor=\"middle\" font-weight=\"bold\" font-size=\"14\">f(x) = {fx:.3}</text>",
        BAR_Y - 30.0,
        BAR_Y + BAR_H + 4.0
    ));
    let base_x = x(base);
    svg.push_str(&format!(
        "<line x1=\"{base_x:.1}\" y1=\"{:.1}\" x2=\"{base_x:.1}\" y2=\"{:.1}\" stroke=\"#666\" stroke-dasharray=\"3,2\"/>\
         <text x=\"{base_x:.1}\" y=\"{:.1}\" text-anchor=\"middle\" fill=\"#666\">{} = {base:.3}</text>",
        BAR_Y + 2.0,
        BAR_Y + BAR_H + 30.0,
        BAR_Y + BAR_H + 44.0,
        escape(base_label)
    ));
    svg.push_str("</svg>");

    format!(
        "<div class=\"force-plot\">\
         <div class=\"force-plot-legend\">{}: \
         <span style=\"color:{POSITIVE_RED}\">{higher} &#8594;</span> \
         <span style=\"color:{NEGATIVE_BLUE}\">&#8592; {lower}</span></div>\
         {svg}</div>",
        escape(attribution.class.outcome_name(locale))
    )
}
