use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::commands::seeded_rng;
use caltrack_core::education::{TOPICS, Topic, find_topic};
use caltrack_core::foods::{
    FOOD_DATABASE, Food, NutrientAnalysis, analyze_food, find_food, search_foods,
};
use caltrack_core::metabolism::EnergyProfile;
use caltrack_core::models::{
    DEFAULT_CALORIE_GOAL, GoalsUpdate, ProgressEntry, UserProfile, parse_activity_level,
    parse_diet_type, parse_gender, validate_meal_type,
};
use caltrack_core::service::CalTrackService;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB
const MAX_SESSIONS: usize = 1000;

#[derive(Clone)]
struct AppState {
    sessions: Arc<Mutex<HashMap<String, CalTrackService>>>,
    max_sessions: usize,
    api_key: Option<String>,
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct EnergyRequest {
    age: u32,
    gender: String,
    weight_kg: f64,
    height_cm: f64,
    activity_level: String,
}

#[derive(Serialize)]
struct EnergyResponse {
    bmr: f64,
    tdee: f64,
    activity_level: &'static str,
}

#[derive(Deserialize)]
struct FoodListQuery {
    search: Option<String>,
}

#[derive(Deserialize)]
struct AnalysisQuery {
    amount_g: Option<f64>,
}

#[derive(Deserialize)]
struct SuggestionQuery {
    calorie_goal: Option<u32>,
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct RecommendationQuery {
    diet: Option<String>,
    calorie_target: Option<u32>,
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct MealPlanQuery {
    calorie_goal: Option<u32>,
}

#[derive(Deserialize)]
struct AddMealItemRequest {
    food: String,
    #[serde(default = "default_amount_g")]
    amount_g: f64,
}

fn default_amount_g() -> f64 {
    100.0
}

#[derive(Deserialize)]
struct CalorieGoalRequest {
    calorie_goal: u32,
}

#[derive(Deserialize)]
struct ProgressRequest {
    date: Option<String>,
    #[serde(default)]
    weight_kg: f64,
    #[serde(default)]
    body_fat_pct: f64,
    #[serde(default)]
    waist_cm: f64,
    #[serde(default)]
    chest_cm: f64,
    #[serde(default)]
    arms_cm: f64,
    #[serde(default)]
    thighs_cm: f64,
}

#[derive(Deserialize)]
struct GoalsRequest {
    target_weight_kg: Option<f64>,
    target_body_fat_pct: Option<f64>,
    target_date: Option<String>,
}

#[derive(Deserialize)]
struct ActivityQuery {
    days: Option<u32>,
}

#[derive(Serialize)]
struct TrackerStatus {
    connected: bool,
    calorie_goal: u32,
    last_sync: Option<String>,
}

#[derive(Serialize)]
struct TopicSummary {
    number: usize,
    title: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn bad_request(err: anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err:#}"))
}

#[allow(clippy::needless_pass_by_value)]
fn not_found(err: anyhow::Error) -> ApiError {
    ApiError::NotFound(format!("{err:#}"))
}

fn parse_iso_date(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{s}'. Use YYYY-MM-DD")))
}

/// Run `f` against one session while holding the session map lock.
fn with_session<T>(
    state: &AppState,
    id: &str,
    f: impl FnOnce(&mut CalTrackService) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let mut sessions = state
        .sessions
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let svc = sessions
        .get_mut(id)
        .ok_or_else(|| ApiError::NotFound(format!("Session '{id}' not found")))?;
    f(svc)
}

fn tracker_status(svc: &CalTrackService) -> TrackerStatus {
    TrackerStatus {
        connected: svc.tracker_connected(),
        calorie_goal: svc.calorie_goal(),
        last_sync: svc
            .last_sync()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Stateless handlers ---

async fn list_foods(Query(q): Query<FoodListQuery>) -> Json<Vec<&'static Food>> {
    match q.search.as_deref() {
        Some(query) => Json(search_foods(query)),
        None => Json(FOOD_DATABASE.iter().collect()),
    }
}

async fn get_food_analysis(
    Path(name): Path<String>,
    Query(q): Query<AnalysisQuery>,
) -> Result<Json<NutrientAnalysis>, ApiError> {
    if find_food(&name).is_none() {
        return Err(ApiError::NotFound(format!("Food '{name}' not found")));
    }
    analyze_food(&name, q.amount_g.unwrap_or(100.0))
        .map(Json)
        .map_err(bad_request)
}

async fn estimate_energy(Json(req): Json<EnergyRequest>) -> Result<Json<EnergyResponse>, ApiError> {
    let profile = UserProfile {
        age: req.age,
        gender: parse_gender(&req.gender).map_err(bad_request)?,
        weight_kg: req.weight_kg,
        height_cm: req.height_cm,
        activity_level: parse_activity_level(&req.activity_level).map_err(bad_request)?,
    };
    let energy = EnergyProfile::from_profile(&profile).map_err(bad_request)?;
    Ok(Json(EnergyResponse {
        bmr: energy.bmr,
        tdee: energy.tdee,
        activity_level: energy.activity_level.label(),
    }))
}

async fn get_suggestions(
    Query(q): Query<SuggestionQuery>,
) -> Result<Json<Vec<caltrack_core::suggest::SuggestedMeal>>, ApiError> {
    let goal = q.calorie_goal.unwrap_or(DEFAULT_CALORIE_GOAL);
    let plan = caltrack_core::suggest::suggest_meal_plan(goal, &mut seeded_rng(q.seed))
        .map_err(bad_request)?;
    Ok(Json(plan))
}

async fn get_recommendations(
    Query(q): Query<RecommendationQuery>,
) -> Result<Json<caltrack_core::recommendations::Recommendation>, ApiError> {
    let diet = parse_diet_type(q.diet.as_deref().unwrap_or("balanced")).map_err(bad_request)?;
    let target = q.calorie_target.unwrap_or(DEFAULT_CALORIE_GOAL);
    let rec = caltrack_core::recommendations::recommend_meals(
        diet,
        target,
        &mut seeded_rng(q.seed),
    )
    .map_err(bad_request)?;
    Ok(Json(rec))
}

async fn list_topics() -> Json<Vec<TopicSummary>> {
    Json(
        TOPICS
            .iter()
            .enumerate()
            .map(|(i, t)| TopicSummary {
                number: i + 1,
                title: t.title,
            })
            .collect(),
    )
}

async fn get_topic(Path(topic): Path<String>) -> Result<Json<&'static Topic>, ApiError> {
    find_topic(&topic).map(Json).map_err(not_found)
}

// --- Sessions ---

async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let mut sessions = state
        .sessions
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if sessions.len() >= state.max_sessions {
        tracing::warn!(limit = state.max_sessions, "session limit reached");
        return Err(ApiError::Unavailable(format!(
            "Session limit of {} reached. Delete an unused session and retry",
            state.max_sessions
        )));
    }
    let svc = CalTrackService::new();
    let id = svc.session_id().to_string();
    sessions.insert(id.clone(), svc);
    tracing::info!(session = %id, open = sessions.len(), "session created");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "session_id": id })),
    ))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .sessions
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id);
    if removed.is_none() {
        return Err(ApiError::NotFound(format!("Session '{id}' not found")));
    }
    tracing::info!(session = %id, "session deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_meal_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<MealPlanQuery>,
) -> Result<Json<caltrack_core::models::MealPlanSummary>, ApiError> {
    with_session(&state, &id, |svc| {
        svc.meal_plan_summary(q.calorie_goal)
            .map(Json)
            .map_err(bad_request)
    })
}

async fn add_meal_item(
    State(state): State<AppState>,
    Path((id, meal)): Path<(String, String)>,
    Json(req): Json<AddMealItemRequest>,
) -> Result<(StatusCode, Json<caltrack_core::models::MealItem>), ApiError> {
    with_session(&state, &id, |svc| {
        let item = svc
            .add_meal_item(&meal, &req.food, req.amount_g)
            .map_err(bad_request)?;
        Ok((StatusCode::CREATED, Json(item)))
    })
}

async fn remove_meal_item(
    State(state): State<AppState>,
    Path((id, meal, index)): Path<(String, String, usize)>,
) -> Result<Json<caltrack_core::models::MealItem>, ApiError> {
    validate_meal_type(&meal).map_err(bad_request)?;
    with_session(&state, &id, |svc| {
        svc.remove_meal_item(&meal, index)
            .map(Json)
            .map_err(not_found)
    })
}

async fn set_calorie_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CalorieGoalRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    with_session(&state, &id, |svc| {
        svc.set_calorie_goal(req.calorie_goal).map_err(bad_request)?;
        Ok(Json(serde_json::json!({ "calorie_goal": svc.calorie_goal() })))
    })
}

async fn log_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ProgressRequest>,
) -> Result<(StatusCode, Json<ProgressEntry>), ApiError> {
    let date = match req.date.as_deref() {
        Some(d) => parse_iso_date(d)?,
        None => Local::now().date_naive(),
    };
    let entry = ProgressEntry {
        date,
        weight_kg: req.weight_kg,
        body_fat_pct: req.body_fat_pct,
        waist_cm: req.waist_cm,
        chest_cm: req.chest_cm,
        arms_cm: req.arms_cm,
        thighs_cm: req.thighs_cm,
    };
    with_session(&state, &id, |svc| {
        let entry = svc.log_progress(entry).map_err(bad_request)?;
        Ok((StatusCode::CREATED, Json(entry)))
    })
}

async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ProgressEntry>>, ApiError> {
    with_session(&state, &id, |svc| Ok(Json(svc.progress_entries())))
}

async fn get_progress_changes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    with_session(&state, &id, |svc| {
        Ok(Json(serde_json::json!({
            "entries": svc.progress().len(),
            "changes": svc.progress_changes(),
        })))
    })
}

async fn get_goals(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<caltrack_core::service::GoalsView>, ApiError> {
    let today = Local::now().date_naive();
    with_session(&state, &id, |svc| Ok(Json(svc.goals(today))))
}

async fn set_goals(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<GoalsRequest>,
) -> Result<Json<caltrack_core::service::GoalsView>, ApiError> {
    let today = Local::now().date_naive();
    let update = GoalsUpdate {
        target_weight_kg: req.target_weight_kg,
        target_body_fat_pct: req.target_body_fat_pct,
        target_date: req.target_date.as_deref().map(parse_iso_date).transpose()?,
    };
    with_session(&state, &id, |svc| {
        svc.update_goals(&update, today).map_err(bad_request)?;
        Ok(Json(svc.goals(today)))
    })
}

async fn connect_tracker(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrackerStatus>, ApiError> {
    with_session(&state, &id, |svc| {
        svc.connect_tracker()?;
        Ok(Json(tracker_status(svc)))
    })
}

async fn disconnect_tracker(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrackerStatus>, ApiError> {
    with_session(&state, &id, |svc| {
        svc.disconnect_tracker();
        Ok(Json(tracker_status(svc)))
    })
}

async fn get_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ActivityQuery>,
) -> Result<Json<caltrack_core::service::ActivityDashboard>, ApiError> {
    let today = Local::now().date_naive();
    with_session(&state, &id, |svc| {
        if !svc.tracker_connected() {
            return Err(ApiError::BadRequest(
                "Fitness tracker is not connected".to_string(),
            ));
        }
        svc.activity_dashboard(q.days, today)
            .map(Json)
            .map_err(bad_request)
    })
}

async fn sync_tracker(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<caltrack_core::models::SyncOutcome>, ApiError> {
    let now = Local::now().naive_local();
    with_session(&state, &id, |svc| {
        if !svc.tracker_connected() {
            return Err(ApiError::BadRequest(
                "Fitness tracker is not connected".to_string(),
            ));
        }
        Ok(Json(svc.sync_tracker(now)?))
    })
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/foods", get(list_foods))
        .route("/api/foods/{name}", get(get_food_analysis))
        .route("/api/energy", post(estimate_energy))
        .route("/api/suggestions", get(get_suggestions))
        .route("/api/recommendations", get(get_recommendations))
        .route("/api/education", get(list_topics))
        .route("/api/education/{topic}", get(get_topic))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", delete(delete_session))
        .route("/api/sessions/{id}/meal-plan", get(get_meal_plan))
        .route("/api/sessions/{id}/meal-plan/{meal}", post(add_meal_item))
        .route(
            "/api/sessions/{id}/meal-plan/{meal}/{index}",
            delete(remove_meal_item),
        )
        .route(
            "/api/sessions/{id}/calorie-goal",
            put(set_calorie_goal),
        )
        .route(
            "/api/sessions/{id}/progress",
            post(log_progress).get(get_progress),
        )
        .route(
            "/api/sessions/{id}/progress/changes",
            get(get_progress_changes),
        )
        .route("/api/sessions/{id}/goals", get(get_goals).put(set_goals))
        .route("/api/sessions/{id}/tracker/connect", post(connect_tracker))
        .route(
            "/api/sessions/{id}/tracker/disconnect",
            post(disconnect_tracker),
        )
        .route("/api/sessions/{id}/tracker/activity", get(get_activity))
        .route("/api/sessions/{id}/tracker/sync", post(sync_tracker))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of `key`, or `None` when the key is too short
/// to hide anything.
fn key_hint(key: &str) -> Option<String> {
    if key.len() < 12 {
        return None;
    }
    Some(format!("{}...{}", key.get(..4)?, key.get(key.len() - 4..)?))
}

pub async fn start_server(
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        sessions: Arc::new(Mutex::new(HashMap::new())),
        max_sessions: MAX_SESSIONS,
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        if new_api_key {
            eprintln!("Generated new API key: {key}");
        } else if let Some(hint) = key_hint(key) {
            eprintln!("API key: {hint} (see api_key file in data directory)");
        } else {
            eprintln!("API key loaded (see api_key file in data directory)");
        }
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    tracing::info!("Listening on http://{bind}:{port}");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(api_key: Option<String>) -> AppState {
        AppState {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_sessions: MAX_SESSIONS,
            api_key,
        }
    }

    fn test_app(api_key: Option<String>) -> Router {
        build_router(test_state(api_key))
    }

    async fn send(
        app: &Router,
        request: axum::http::Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    fn put_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::put(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let request = axum::http::Request::post("/api/sessions")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        json["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app.oneshot(get("/api/foods")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/foods")
                    .header("Authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/foods")
                    .header("Authorization", "Bearer test-key-abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_auth_mode_allows_requests() {
        let app = test_app(None);
        let (status, json) = send(&app, get("/api/foods")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app(None);

        let response = app.oneshot(get("/api/education")).await.unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn security_headers_on_auth_failure() {
        let app = test_app(Some("secret".to_string()));

        let response = app.oneshot(get("/api/foods")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app(None);

        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/energy")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret tracker token abc"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
        assert!(!json["error"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn food_analysis_and_lookup_errors() {
        let app = test_app(None);

        let (status, json) = send(&app, get("/api/foods/salmon?amount_g=200")).await;
        assert_eq!(status, StatusCode::OK);
        assert!((json["nutrients"]["calories"].as_f64().unwrap() - 412.0).abs() < 1e-9);

        let (status, _) = send(&app, get("/api/foods/pizza")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = send(&app, get("/api/foods/salmon?amount_g=-5")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let (status, json) = send(&app, get("/api/foods?search=rice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["name"], "Brown Rice");
    }

    #[tokio::test]
    async fn energy_estimate_and_validation() {
        let app = test_app(None);
        let body = serde_json::json!({
            "age": 30,
            "gender": "male",
            "weight_kg": 70.0,
            "height_cm": 170.0,
            "activity_level": "sedentary"
        });
        let (status, json) = send(&app, post_json("/api/energy", &body)).await;
        assert_eq!(status, StatusCode::OK);
        let bmr = json["bmr"].as_f64().unwrap();
        let tdee = json["tdee"].as_f64().unwrap();
        assert!((tdee - bmr * 1.2).abs() < 1e-9);

        let body = serde_json::json!({
            "age": 30,
            "gender": "robot",
            "weight_kg": 70.0,
            "height_cm": 170.0,
            "activity_level": "sedentary"
        });
        let (status, _) = send(&app, post_json("/api/energy", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn seeded_suggestions_are_reproducible() {
        let app = test_app(None);
        let (status, a) = send(&app, get("/api/suggestions?calorie_goal=1800&seed=7")).await;
        assert_eq!(status, StatusCode::OK);
        let (_, b) = send(&app, get("/api/suggestions?calorie_goal=1800&seed=7")).await;
        assert_eq!(a, b);
        assert_eq!(a.as_array().unwrap().len(), 4);

        let (status, _) = send(&app, get("/api/suggestions?calorie_goal=500")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = "/api/recommendations?diet=vegan&calorie_target=2200&seed=3";
        let (status, json) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["diet"], "vegan");
        assert_eq!(json["meals"].as_array().unwrap().len(), 4);

        let (status, _) = send(&app, get("/api/recommendations?diet=carnivore")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn education_topics() {
        let app = test_app(None);
        let (status, json) = send(&app, get("/api/education")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), TOPICS.len());

        let (status, json) = send(&app, get("/api/education/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["title"], TOPICS[0].title);

        let (status, _) = send(&app, get("/api/education/astrology")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_session_returns_404() {
        let app = test_app(None);
        let (status, json) = send(&app, get("/api/sessions/nope/meal-plan")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Session 'nope' not found");
    }

    #[tokio::test]
    async fn meal_plan_session_flow() {
        let app = test_app(None);
        let id = new_session(&app).await;

        let body = serde_json::json!({ "food": "salmon", "amount_g": 150.0 });
        let uri = format!("/api/sessions/{id}/meal-plan/dinner");
        let (status, json) = send(&app, post_json(&uri, &body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["food"], "Salmon");

        let body = serde_json::json!({ "food": "pizza", "amount_g": 100.0 });
        let (status, _) = send(&app, post_json(&uri, &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body = serde_json::json!({ "food": "salmon", "amount_g": 100.0 });
        let bad_meal = format!("/api/sessions/{id}/meal-plan/brunch");
        let (status, _) = send(&app, post_json(&bad_meal, &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/sessions/{id}/meal-plan?calorie_goal=2000");
        let (status, json) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert!((json["totals"]["calories"].as_f64().unwrap() - 309.0).abs() < 1e-9);
        assert_eq!(json["goal"]["calorie_goal"], 2000);

        let uri = format!("/api/sessions/{id}/meal-plan/dinner/5");
        let request = axum::http::Request::delete(&uri).body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/api/sessions/{id}/meal-plan/dinner/0");
        let request = axum::http::Request::delete(&uri).body(Body::empty()).unwrap();
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["food"], "Salmon");

        let uri = format!("/api/sessions/{id}");
        let request = axum::http::Request::delete(&uri).body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let request = axum::http::Request::delete(&uri).body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn calorie_goal_validation() {
        let app = test_app(None);
        let id = new_session(&app).await;
        let uri = format!("/api/sessions/{id}/calorie-goal");

        let (status, json) =
            send(&app, put_json(&uri, &serde_json::json!({ "calorie_goal": 1800 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["calorie_goal"], 1800);

        let (status, _) =
            send(&app, put_json(&uri, &serde_json::json!({ "calorie_goal": 6000 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn progress_and_goals_flow() {
        let app = test_app(None);
        let id = new_session(&app).await;
        let uri = format!("/api/sessions/{id}/progress");

        for (date, weight) in [("2024-05-01", 80.0), ("2024-05-15", 78.0)] {
            let body =
                serde_json::json!({ "date": date, "weight_kg": weight, "body_fat_pct": 20.0 });
            let (status, _) = send(&app, post_json(&uri, &body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let body = serde_json::json!({ "date": "2024-05-20", "weight_kg": 900.0 });
        let (status, _) = send(&app, post_json(&uri, &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body = serde_json::json!({ "date": "20/05/2024", "weight_kg": 70.0 });
        let (status, _) = send(&app, post_json(&uri, &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 2);

        let (_, json) = send(&app, get(&format!("{uri}/changes"))).await;
        assert_eq!(json["entries"], 2);
        assert!((json["changes"][0]["change"].as_f64().unwrap() + 2.0).abs() < 1e-9);

        let goals_uri = format!("/api/sessions/{id}/goals");
        let (_, json) = send(&app, get(&goals_uri)).await;
        assert_eq!(json["is_set"], false);

        let target_date = (Local::now().date_naive() + chrono::Duration::days(60))
            .format("%Y-%m-%d")
            .to_string();
        let body = serde_json::json!({ "target_weight_kg": 76.0, "target_date": target_date });
        let (status, json) = send(&app, put_json(&goals_uri, &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["is_set"], true);
        assert!((json["weight_progress"]["percent"].as_f64().unwrap() - 50.0).abs() < 1e-9);

        let body = serde_json::json!({ "target_date": "2000-01-01" });
        let (status, _) = send(&app, put_json(&goals_uri, &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tracker_flow() {
        let app = test_app(None);
        let id = new_session(&app).await;

        let activity = format!("/api/sessions/{id}/tracker/activity?days=3");
        let (status, _) = send(&app, get(&activity)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let connect = format!("/api/sessions/{id}/tracker/connect");
        let request = axum::http::Request::post(&connect).body(Body::empty()).unwrap();
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["connected"], true);

        let (status, json) = send(&app, get(&activity)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["records"].as_array().unwrap().len(), 4);

        let sync = format!("/api/sessions/{id}/tracker/sync");
        let request = axum::http::Request::post(&sync).body(Body::empty()).unwrap();
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        let goal = json["calorie_goal"].as_u64().unwrap();
        assert!([1900, 2000, 2200].contains(&goal));

        let disconnect = format!("/api/sessions/{id}/tracker/disconnect");
        let request = axum::http::Request::post(&disconnect).body(Body::empty()).unwrap();
        let (_, json) = send(&app, request).await;
        assert_eq!(json["connected"], false);
        assert!(json["last_sync"].is_string());
    }

    #[tokio::test]
    async fn activity_days_out_of_range_rejected() {
        let app = test_app(None);
        let id = new_session(&app).await;
        let connect = format!("/api/sessions/{id}/tracker/connect");
        let request = axum::http::Request::post(&connect).body(Body::empty()).unwrap();
        send(&app, request).await;

        let uri = format!("/api/sessions/{id}/tracker/activity?days=4294967295");
        let (status, json) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("between 0 and 365"));

        let uri = format!("/api/sessions/{id}/tracker/activity?days=366");
        let (status, _) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/sessions/{id}/tracker/activity?days=365");
        let (status, json) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["records"].as_array().unwrap().len(), 366);
    }

    #[tokio::test]
    async fn session_limit_returns_503() {
        let state = AppState {
            max_sessions: 2,
            ..test_state(None)
        };
        let app = build_router(state.clone());
        let first = new_session(&app).await;
        new_session(&app).await;

        let create = || {
            axum::http::Request::post("/api/sessions")
                .body(Body::empty())
                .unwrap()
        };
        let (status, json) = send(&app, create()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(json["error"].as_str().unwrap().contains("Session limit"));
        assert_eq!(state.sessions.lock().unwrap().len(), 2);

        let request = axum::http::Request::delete(format!("/api/sessions/{first}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, create()).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn partial_goals_update_keeps_lapsed_date() {
        let state = test_state(None);
        let app = build_router(state.clone());
        let id = new_session(&app).await;

        let lapsed = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        {
            let mut sessions = state.sessions.lock().unwrap();
            let svc = sessions.get_mut(&id).unwrap();
            let update = GoalsUpdate {
                target_weight_kg: Some(80.0),
                target_date: Some(lapsed),
                ..GoalsUpdate::default()
            };
            svc.update_goals(&update, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
                .unwrap();
        }

        let goals_uri = format!("/api/sessions/{id}/goals");
        let body = serde_json::json!({ "target_weight_kg": 72.0 });
        let (status, json) = send(&app, put_json(&goals_uri, &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert!((json["goals"]["target_weight_kg"].as_f64().unwrap() - 72.0).abs() < 1e-9);
        assert_eq!(json["goals"]["target_date"], "2020-02-01");

        let body = serde_json::json!({ "target_date": "2020-03-01" });
        let (status, _) = send(&app, put_json(&goals_uri, &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn key_hint_handles_short_and_multibyte_keys() {
        let key = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        assert_eq!(key_hint(key).as_deref(), Some("0123...cdef"));
        assert_eq!(key_hint(""), None);
        assert_eq!(key_hint("abc"), None);
        assert_eq!(key_hint("aéééééé"), None);
        assert_eq!(key_hint("abcdefgh-ijklmnop").as_deref(), Some("abcd...mnop"));
    }
}
