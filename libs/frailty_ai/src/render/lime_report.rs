use frailty_model::{FeatureVector, Locale};

use super::escape;
use crate::explain::lime::LimeExplanation;
use crate::predict::{PredictionResult, RiskClass};

const EXPLAINED_ORANGE: &str = "#ff7f0e";
const OTHER_BLUE: &str = "#1f77b4";
const BAR_MAX_PX: f64 = 160.0;

struct Labels {
    probabilities: &'static str,
    not: &'static str,
    feature: &'static str,
    value: &'static str,
}

fn labels(locale: Locale) -> Labels {
    match locale {
        Locale::En => Labels {
            probabilities: "Prediction probabilities",
            not: "NOT",
            feature: "Feature",
            value: "Value",
        },
        Locale::Zh => Labels {
            probabilities: "预测概率",
            not: "非",
            feature: "特征",
            value: "取值",
        },
    }
}

/// LIME report: class probabilities, surrogate weights and the instance's
/// values of the explained features.
pub fn lime_report(
    explanation: &LimeExplanation,
    features: &FeatureVector,
    prediction: &PredictionResult,
    locale: Locale,
) -> String {
    let l = labels(locale);
    let explained = explanation.label;
    let color = |class: RiskClass| {
        if class == explained {
            EXPLAINED_ORANGE
        } else {
            OTHER_BLUE
        }
    };

    let mut html = String::from("<div class=\"lime-report\" style=\"display:flex;gap:24px;align-items:flex-start\">");

    html.push_str(&format!(
        "<div class=\"lime-proba\"><h4>{}</h4><table>",
        escape(l.probabilities)
    ));
    for class in RiskClass::ALL {
        let p = prediction.probability(class);
        html.push_str(&format!(
            "<tr><td>{}</td><td><div style=\"background:{};width:{:.0}px;height:14px\"></div></td><td>{p:.2}</td></tr>",
            escape(class.class_name(locale)),
            color(class),
            p * BAR_MAX_PX
        ));
    }
    html.push_str("</table></div>");

    let max_w = explanation
        .weights
        .iter()
        .map(|w| w.weight.abs())
        .fold(0.0, f64::max);
    let scale = if max_w > 0.0 { BAR_MAX_PX / max_w } else { 0.0 };
    html.push_str(&format!(
        "<div class=\"lime-weights\"><h4><span style=\"color:{OTHER_BLUE}\">{} {}</span> | <span style=\"color:{EXPLAINED_ORANGE}\">{}</span></h4><table>",
        escape(l.not),
        escape(explained.class_name(locale)),
        escape(explained.class_name(locale))
    ));
    for w in &explanation.weights {
        let width = w.weight.abs() * scale;
        let bar = |c: &str| format!("<div style=\"background:{c};width:{width:.0}px;height:14px\"></div>");
        let (left, right) = if w.weight >= 0.0 {
            (String::new(), bar(EXPLAINED_ORANGE))
        } else {
            (bar(OTHER_BLUE), String::new())
        };
        html.push_str(&format!(
            "<tr><td style=\"text-align:right\">{left}</td><td>{}<br><small>{:.4}</small></td><td>{right}</td></tr>",
            escape(&w.description),
            w.weight
        ));
    }
    html.push_str("</table></div>");

    html.push_str(&format!(
        "<div class=\"lime-table\"><table border=\"1\" cellpadding=\"3\" style=\"border-collapse:collapse\"><tr><th>{}</th><th>{}</th></tr>",
        escape(l.feature),
        escape(l.value)
    ));
    for w in &explanation.weights {
        let shade = if w.weight >= 0.0 {
            EXPLAINED_ORANGE
        } else {
            OTHER_BLUE
        };
        let value = features.get(w.indicator);
        let option = w.indicator.option_label(value, locale).unwrap_or_default();
        html.push_str(&format!(
            "<tr><td style=\"border-left:4px solid {shade}\">{}</td><td>{value} ({})</td></tr>",
            escape(w.indicator.column_name(locale)),
            escape(option)
        ));
    }
    html.push_str("</table></div></div>");
    html
}
