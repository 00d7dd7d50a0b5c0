//! Text and JSON views of an evaluation, shared by the CLI and the JSON API.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use frailty_ai::{
    format_percent, Advice, ClassAttribution, Evaluation, ExplainError, LimeWeight,
    PredictionResult,
};
use frailty_model::{Indicator, Locale};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelError {
    pub error: String,
}

impl From<&ExplainError> for PanelError {
    fn from(e: &ExplainError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

/// Serializable summary of an [`Evaluation`] without the rendered HTML.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub features: BTreeMap<String, u8>,
    pub prediction: PredictionResult,
    pub advice: Advice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shap: Option<Result<ClassAttribution, PanelError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lime: Option<Result<Vec<LimeWeight>, PanelError>>,
}

impl From<&Evaluation> for EvaluationReport {
    fn from(ev: &Evaluation) -> Self {
        Self {
            features: ev.features.to_map(),
            prediction: ev.prediction,
            advice: ev.advice.clone(),
            shap: ev
                .shap
                .as_ref()
                .map(|r| r.as_ref().map(|p| p.attribution).map_err(PanelError::from)),
            lime: ev.lime.as_ref().map(|r| {
                r.as_ref()
                    .map(|p| p.explanation.weights.clone())
                    .map_err(PanelError::from)
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureInfo {
    pub key: &'static str,
    pub column: &'static str,
    pub question: &'static str,
    pub options: [&'static str; 2],
}

pub fn catalogue(locale: Locale) -> Vec<FeatureInfo> {
    Indicator::ALL
        .iter()
        .map(|&i| FeatureInfo {
            key: i.key(),
            column: i.column_name(locale),
            question: i.question(locale),
            options: [
                i.option_label(0, locale).unwrap_or_default(),
                i.option_label(1, locale).unwrap_or_default(),
            ],
        })
        .collect()
}

pub fn render_catalogue(locale: Locale, mode: OutputMode) -> Result<String, serde_json::Error> {
    let items = catalogue(locale);
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&items),
        OutputMode::Text => {
            let mut out = String::new();
            for (i, item) in items.iter().enumerate() {
                let _ = writeln!(out, "{i:>2}  {:<26} {}", item.key, item.column);
                let _ = writeln!(out, "    {}", item.question);
                let _ = writeln!(out, "    0 = {}  1 = {}", item.options[0], item.options[1]);
            }
            Ok(out)
        }
    }
}

pub fn render_evaluation(
    ev: &Evaluation,
    locale: Locale,
    mode: OutputMode,
) -> Result<String, serde_json::Error> {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&EvaluationReport::from(ev)),
        OutputMode::Text => Ok(evaluation_text(ev, locale)),
    }
}

fn evaluation_text(ev: &Evaluation, locale: Locale) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", ev.prediction.headline(locale));
    let _ = writeln!(out, "{}", ev.prediction.probability_line(locale));
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", ev.advice.text);

    match &ev.shap {
        Some(Ok(panel)) => {
            let a = &panel.attribution;
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "SHAP ({}): base {:.4} -> f(x) {:.4}",
                a.class.outcome_name(locale),
                a.base_value,
                a.output_value()
            );
            for (indicator, value, phi) in a.nonzero(&ev.features) {
                let _ = writeln!(
                    out,
                    "  {:+.4}  {} = {value}",
                    phi,
                    indicator.column_name(locale)
                );
            }
        }
        Some(Err(e)) => {
            let _ = writeln!(out, "\nSHAP unavailable: {e}");
        }
        None => {}
    }

    match &ev.lime {
        Some(Ok(panel)) => {
            let x = &panel.explanation;
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "LIME ({}): local prediction {}, score {:.3}",
                x.label.class_name(locale),
                format_percent(x.local_prediction),
                x.score
            );
            for w in &x.weights {
                let _ = writeln!(out, "  {:+.4}  {}", w.weight, w.description);
            }
        }
        Some(Err(e)) => {
            let _ = writeln!(out, "\nLIME unavailable: {e}");
        }
        None => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn catalogue_follows_training_order() {
        let items = catalogue(Locale::Zh);
        assert_eq!(items.len(), 15);
        assert_eq!(items[1].column, "睡眠时长");
        assert_eq!(items[8].key, "phq");
        assert!(items.iter().all(|i| !i.options[0].is_empty() && !i.options[1].is_empty()));
    }

    #[test]
    fn catalogue_text_has_one_block_per_indicator() {
        let text = render_catalogue(Locale::En, OutputMode::Text).unwrap();
        assert_eq!(text.lines().count(), 45);
        assert!(text.starts_with(" 0  hard_food"));
    }

    #[test]
    fn catalogue_json_is_an_array() {
        let json = render_catalogue(Locale::En, OutputMode::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v.as_array().map(Vec::len), Some(15));
        assert_eq!(v[14]["key"], "childhood_economy");
    }
}
