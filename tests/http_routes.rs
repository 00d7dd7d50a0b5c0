use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use frailty::server::{router, AppState};
use frailty_ai::EvaluationOptions;
use frailty_model::{Indicator, Locale};
use http_body_util::BodyExt;
use tests::demo_evaluator;
use tower::ServiceExt;

fn app(locale: Locale) -> axum::Router {
    let options = EvaluationOptions {
        locale,
        ..EvaluationOptions::default()
    };
    router(AppState::new(demo_evaluator(), options))
}

async fn read_body(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

fn all_answers(code: u8) -> String {
    Indicator::ALL
        .iter()
        .map(|i| format!("{}={code}", i.key()))
        .collect::<Vec<_>>()
        .join("&")
}

#[tokio::test]
async fn chinese_form_round_trip_with_all_risk_factors() {
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(all_answers(1)))
        .expect("request");
    let response = app(Locale::Zh).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let html = read_body(response).await;
    assert!(html.contains("衰弱风险等级：1（高风险）"));
    assert!(html.contains("📊 预测结果"));
    assert!(html.contains("💡 健康建议"));
    assert!(html.contains("🔍 SHAP特征贡献解释"));
    assert!(html.contains("🔍 LIME特征贡献解释"));
    assert_eq!(html.matches("<option value=\"1\" selected>").count(), 15);
}

#[tokio::test]
async fn missing_form_field_is_rejected() {
    let body = all_answers(0).replace("&phq=0", "");
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("request");
    let response = app(Locale::En).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = read_body(response).await;
    assert!(html.contains("missing answer for &#39;phq&#39;"));
    assert!(!html.contains("id=\"result\""));
}

#[tokio::test]
async fn json_prediction_for_all_zero_answers() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"codes":[0,0,0,0,0,0,0,0,0,0,0,0,0,0,0]}"#))
        .expect("request");
    let response = app(Locale::En).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let v: serde_json::Value = serde_json::from_str(&read_body(response).await).expect("json");
    assert_eq!(v["prediction"]["class"], "low");
    let p = v["prediction"]["probabilities"].as_array().expect("probabilities");
    let sum: f64 = p.iter().filter_map(serde_json::Value::as_f64).sum();
    assert!((sum - 1.0).abs() < 1e-9);
    assert_eq!(v["advice"]["class"], "low");
    assert_eq!(v["shap"]["Ok"]["class"], "low");
}

#[tokio::test]
async fn wrong_code_count_is_a_json_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"codes":[0,1]}"#))
        .expect("request");
    let response = app(Locale::En).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let v: serde_json::Value = serde_json::from_str(&read_body(response).await).expect("json");
    assert_eq!(v["error"], "expected 15 values, got 2");
}

#[tokio::test]
async fn non_integer_code_is_a_json_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"codes":[0,0,0,0,0,0,0,0,0.5,0,0,0,0,0,0]}"#))
        .expect("request");
    let response = app(Locale::En).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let v: serde_json::Value = serde_json::from_str(&read_body(response).await).expect("json");
    assert!(v["error"].as_str().expect("error text").contains("codes"));
}

#[tokio::test]
async fn missing_content_type_keeps_the_json_error_shape() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .body(Body::from(r#"{"codes":[0]}"#))
        .expect("request");
    let response = app(Locale::En).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let v: serde_json::Value = serde_json::from_str(&read_body(response).await).expect("json");
    assert!(v["error"].is_string());
}
