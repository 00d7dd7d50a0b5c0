//! Server-rendered questionnaire page.

use frailty_ai::render::escape;
use frailty_ai::Evaluation;
use frailty_model::{FeatureVector, Indicator, Locale};

struct Text {
    title: &'static str,
    intro: &'static str,
    submit: &'static str,
    result: &'static str,
    advice: &'static str,
    shap: &'static str,
    lime: &'static str,
    unavailable: &'static str,
}

fn text(locale: Locale) -> Text {
    match locale {
        Locale::En => Text {
            title: "Frailty Risk Predictor",
            intro: "Please answer the questions below and press Predict to get a frailty risk assessment.",
            submit: "Predict",
            result: "Prediction",
            advice: "Health advice",
            shap: "SHAP feature contributions",
            lime: "LIME feature contributions",
            unavailable: "explanation unavailable",
        },
        Locale::Zh => Text {
            title: "衰弱风险预测器",
            intro: "请填写以下信息，点击预测获取衰弱风险评估结果",
            submit: "预测",
            result: "📊 预测结果",
            advice: "💡 健康建议",
            shap: "🔍 SHAP特征贡献解释",
            lime: "🔍 LIME特征贡献解释",
            unavailable: "解释不可用",
        },
    }
}

/// The form with `answers` preselected, an optional error and an optional
/// evaluation below it.
pub fn page(
    locale: Locale,
    answers: &FeatureVector,
    error: Option<&str>,
    evaluation: Option<&Evaluation>,
) -> String {
    let t = text(locale);
    let lang = match locale {
        Locale::En => "en",
        Locale::Zh => "zh-CN",
    };
    let mut html = format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\"><head><meta charset=\"utf-8\">\
         <title>{title}</title>\
         <style>body{{font-family:sans-serif;max-width:960px;margin:2em auto}}\
         label{{display:block;margin-top:.6em}}.error{{color:#b00020}}</style></head>\n<body>\
         <h1>{title}</h1><h3>{intro}</h3>\n",
        title = escape(t.title),
        intro = escape(t.intro)
    );

    if let Some(msg) = error {
        html.push_str(&format!("<p class=\"error\" role=\"alert\">{}</p>\n", escape(msg)));
    }

    html.push_str("<form method=\"post\" action=\"/predict\">\n");
    for indicator in Indicator::ALL {
        html.push_str(&select(indicator, answers.get(indicator), locale));
    }
    html.push_str(&format!(
        "<p><button type=\"submit\">{}</button></p>\n</form>\n",
        escape(t.submit)
    ));

    if let Some(ev) = evaluation {
        html.push_str(&results(ev, locale, &t));
    }
    html.push_str("</body></html>\n");
    html
}

fn select(indicator: Indicator, selected: u8, locale: Locale) -> String {
    let key = indicator.key();
    let mut s = format!(
        "<label for=\"{key}\">{}</label><select id=\"{key}\" name=\"{key}\">",
        escape(indicator.question(locale))
    );
    for code in [0u8, 1] {
        let label = indicator.option_label(code, locale).unwrap_or_default();
        let attr = if code == selected { " selected" } else { "" };
        s.push_str(&format!(
            "<option value=\"{code}\"{attr}>{}</option>",
            escape(label)
        ));
    }
    s.push_str("</select>\n");
    s
}

fn results(ev: &Evaluation, locale: Locale, t: &Text) -> String {
    let mut html = format!(
        "<section id=\"result\"><h2>{}</h2><p><strong>{}</strong></p><p>{}</p>\n",
        escape(t.result),
        escape(&ev.prediction.headline(locale)),
        escape(&ev.prediction.probability_line(locale))
    );
    html.push_str(&format!(
        "<h2>{}</h2><p>{}</p>\n",
        escape(t.advice),
        escape(&ev.advice.text)
    ));
    if let Some(panel) = &ev.shap {
        html.push_str(&format!("<h2>{}</h2>", escape(t.shap)));
        match panel {
            Ok(p) => html.push_str(&p.html),
            Err(e) => html.push_str(&unavailable(t, &e.to_string())),
        }
        html.push('\n');
    }
    if let Some(panel) = &ev.lime {
        html.push_str(&format!("<h2>{}</h2>", escape(t.lime)));
        match panel {
            Ok(p) => html.push_str(&p.html),
            Err(e) => html.push_str(&unavailable(t, &e.to_string())),
        }
        html.push('\n');
    }
    html.push_str("</section>\n");
    html
}

fn unavailable(t: &Text, reason: &str) -> String {
    format!(
        "<p class=\"error\">{}: {}</p>",
        escape(t.unavailable),
        escape(reason)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_form_defaults_every_answer_to_zero() {
        let html = page(Locale::En, &FeatureVector::all_zero(), None, None);
        assert_eq!(html.matches("<select").count(), 15);
        assert_eq!(html.matches("<option value=\"0\" selected>").count(), 15);
        assert!(!html.contains("id=\"result\""));
        assert!(html.contains("action=\"/predict\""));
    }

    #[test]
    fn keeps_submitted_answers_and_shows_error() {
        let answers = FeatureVector::all_zero().with(Indicator::Phq, true);
        let html = page(Locale::Zh, &answers, Some("phq: code 7 is not 0 or 1"), None);
        assert_eq!(html.matches("<option value=\"1\" selected>").count(), 1);
        assert!(html.contains("衰弱风险预测器"));
        assert!(html.contains("role=\"alert\""));
    }
}
