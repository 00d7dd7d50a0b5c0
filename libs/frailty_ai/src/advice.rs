use frailty_model::Locale;
use serde::{Deserialize, Serialize};

use crate::predict::{PredictionResult, RiskClass};

/// Narrative recommendation for one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub class: RiskClass,
    /// `probabilities[class] * 100`.
    pub confidence_percent: f64,
    pub text: String,
}

/// Pick the template for the predicted class and fill in its confidence.
pub fn advise(prediction: &PredictionResult, locale: Locale) -> Advice {
    let p = prediction.confidence_percent();
    let text = match (prediction.class, locale) {
        (RiskClass::High, Locale::En) => format!(
            "The model predicts a HIGH frailty risk (probability {p:.1}%). \
             Please arrange a comprehensive frailty assessment at a medical facility soon, \
             with particular attention to nutrition (e.g. difficulty eating hard food), \
             sleep quality and mental health (PHQ screening). \
             Add suitable physical exercise where possible and improve the living environment \
             (e.g. install bathroom handrails)."
        ),
        (RiskClass::Low, Locale::En) => format!(
            "The model predicts a LOW frailty risk (probability {p:.1}%). \
             Keep up your current healthy lifestyle and attend regular health check-ups. \
             Keep an eye on potential influences such as childhood health and economic circumstances, \
             and maintain regular exercise together with good economic and sleep conditions."
        ),
        (RiskClass::High, Locale::Zh) => format!(
            "模型预测您的衰弱风险为高风险（概率{p:.1}%）。\
             建议尽快前往医疗机构进行全面的衰弱评估，重点关注营养摄入（如硬食食用困难）、睡眠质量、心理健康（PHQ评估）等方面，\
             同时可根据自身情况增加适宜的体育锻炼，改善生活环境（如加装洗手扶手）。"
        ),
        (RiskClass::Low, Locale::Zh) => format!(
            "模型预测您的衰弱风险为低风险（概率{p:.1}%）。\
             建议保持现有健康生活方式，定期进行健康体检，关注童年健康/经济等潜在影响因素，\
             持续维持规律锻炼和良好的经济、睡眠状况。"
        ),
    };
    Advice {
        class: prediction.class,
        confidence_percent: p,
        text,
    }
}
