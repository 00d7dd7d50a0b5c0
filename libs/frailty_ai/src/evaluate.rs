//! One evaluation of the questionnaire: prediction, advice and both
//! explanation panels.

use std::sync::Arc;
use std::time::Instant;

use frailty_model::{Classifier, FeatureVector, Locale, RandomForest, ReferenceDataset};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::advice::{advise, Advice};
use crate::explain::lime::{LimeExplanation, LimeSettings, LimeTabularExplainer};
use crate::explain::shap::{ClassAttribution, TreeExplainer};
use crate::explain::ExplainError;
use crate::predict::{predict, PredictionResult};
use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    pub locale: Locale,
    pub shap: bool,
    pub lime: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            locale: Locale::En,
            shap: true,
            lime: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapPanel {
    pub attribution: ClassAttribution,
    /// Force plot inside a 300 px region.
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimePanel {
    pub explanation: LimeExplanation,
    /// Report inside a 600 px region.
    pub html: String,
}

/// Result of one evaluation. `None` panels were switched off; an `Err`
/// panel failed without affecting the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub features: FeatureVector,
    pub prediction: PredictionResult,
    pub advice: Advice,
    pub shap: Option<Result<ShapPanel, ExplainError>>,
    pub lime: Option<Result<LimePanel, ExplainError>>,
}

/// Read-only context shared by every request.
#[derive(Debug, Clone)]
pub struct Evaluator {
    model: Arc<RandomForest>,
    shap: TreeExplainer,
    lime: Result<LimeTabularExplainer, ExplainError>,
}

impl Evaluator {
    /// Build both explainers. A LIME set-up failure is kept and reported
    /// with every evaluation that asks for the LIME panel.
    pub fn new(model: RandomForest, reference: &ReferenceDataset, lime: LimeSettings) -> Self {
        let model = Arc::new(model);
        let shap = TreeExplainer::new(Arc::clone(&model));
        let lime = LimeTabularExplainer::new(reference, lime);
        if let Err(e) = &lime {
            warn!("LIME explainer unavailable: {e}");
        }
        Self { model, shap, lime }
    }

    pub fn model(&self) -> &RandomForest {
        &self.model
    }

    pub fn tree_explainer(&self) -> &TreeExplainer {
        &self.shap
    }

    pub fn lime_explainer(&self) -> Result<&LimeTabularExplainer, &ExplainError> {
        self.lime.as_ref()
    }

    pub fn evaluate(&self, features: &FeatureVector, options: &EvaluationOptions) -> Evaluation {
        let started = Instant::now();
        let prediction = predict(self.model.as_ref(), features);
        let advice = advise(&prediction, options.locale);
        debug!("prediction for {features}: {prediction:?}");

        let shap = options.shap.then(|| self.shap_panel(features, &prediction, options.locale));
        let lime = options.lime.then(|| self.lime_panel(features, &prediction, options.locale));

        info!(
            "evaluated: class {} confidence {:.1}% in {:?}",
            prediction.class,
            prediction.confidence_percent(),
            started.elapsed()
        );
        Evaluation {
            features: *features,
            prediction,
            advice,
            shap,
            lime,
        }
    }

    fn shap_panel(
        &self,
        features: &FeatureVector,
        prediction: &PredictionResult,
        locale: Locale,
    ) -> Result<ShapPanel, ExplainError> {
        let started = Instant::now();
        let attribution = self
            .shap
            .shap_values(features)
            .map(|values| values.for_class(prediction.class))
            .inspect_err(|e| warn!("SHAP explanation failed: {e}"))?;
        let html = render::embed(
            &render::force_plot(&attribution, features, locale),
            render::SHAP_PANEL_HEIGHT,
        );
        debug!("shap panel in {:?}", started.elapsed());
        Ok(ShapPanel { attribution, html })
    }

    fn lime_panel(
        &self,
        features: &FeatureVector,
        prediction: &PredictionResult,
        locale: Locale,
    ) -> Result<LimePanel, ExplainError> {
        let started = Instant::now();
        let explainer = self.lime.as_ref().map_err(Clone::clone)?;
        let model = self.model.as_ref();
        let explanation = explainer
            .explain(features, |rows| model.predict_proba_batch(rows), locale)
            .inspect_err(|e| warn!("LIME explanation failed: {e}"))?;
        let html = render::embed(
            &render::lime_report(&explanation, features, prediction, locale),
            render::LIME_PANEL_HEIGHT,
        );
        debug!(
            "lime panel in {:?}: {} features, score {:.4}",
            started.elapsed(),
            explanation.weights.len(),
            explanation.score
        );
        Ok(LimePanel { explanation, html })
    }
}
