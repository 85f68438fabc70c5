use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use matchmate_core::{Error, UserId};
use matchmate_storage::{RecommendationLedger, RecommendationSource};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::facade::RecommendationFacade;
use crate::scheduler::{daily_refresh, RefreshScheduler};

const DEFAULT_SAVED_LIMIT: usize = 10;

/// Shared state of every handler
pub struct AppState {
    pub facade: Arc<RecommendationFacade>,
    pub ledger: Arc<RecommendationLedger>,
    pub scheduler: Arc<dyn RefreshScheduler>,
    /// Used when a schedule request names no expression
    pub refresh_cron: String,
}

#[derive(Deserialize)]
struct RecommendQuery {
    n: Option<usize>,
}

#[derive(Deserialize)]
struct SavedQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct ScheduleRequest {
    cron: Option<String>,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: Arc<AppState>, host: String, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .configure(routes)
        })
        .bind((host.as_str(), port))?
        .run()
        .await
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/recommendations/{user_id}", web::get().to(get_recommendations))
        .route("/recommendations/{user_id}/saved", web::get().to(saved_recommendations))
        .route("/recommendations/{user_id}/schedule", web::put().to(schedule_refresh))
        .route("/recommendations/{user_id}/schedule", web::delete().to(cancel_refresh))
        .route("/recommendations/{user_id}/{rec_id}/dismiss", web::post().to(dismiss_recommendation))
        .route("/recommendations/{user_id}/{rec_id}/save", web::post().to(save_recommendation))
        .route("/users/{user_id}/sync", web::post().to(sync_user))
        .route("/model/train", web::post().to(train_model));
}

fn error_response(e: &Error) -> HttpResponse {
    match e {
        Error::UserNotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "User not found"
        })),
        Error::PreferencesNotSet(_) => HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Please set your preferences first"
        })),
        Error::InvalidSchedule(reason) => HttpResponse::BadRequest().json(serde_json::json!({
            "error": reason
        })),
        Error::NotConfigured => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "error": "AI service not configured"
        })),
        e if e.is_upstream() => HttpResponse::BadGateway().json(serde_json::json!({
            "error": e.to_string()
        })),
        e => {
            error!(error = %e, "request failed");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Error generating recommendations"
            }))
        }
    }
}

fn recommendation_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "Recommendation not found"
    }))
}

async fn health(state: web::Data<Arc<AppState>>) -> ActixResult<HttpResponse> {
    let stats = state.facade.stats();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "ai_service": state.facade.has_service(),
        "primary_responses": stats.primary_responses,
        "fallback_responses": stats.fallback_responses,
        "ledger_entries": state.ledger.len(),
    })))
}

async fn get_recommendations(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    query: web::Query<RecommendQuery>,
) -> ActixResult<HttpResponse> {
    let user_id = UserId::new(path.into_inner());
    let limit = query.n.unwrap_or(0);

    match state.facade.get_recommendations(&user_id, limit).await {
        Ok(response) => {
            state.facade.record(&user_id, &response, RecommendationSource::Manual);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

async fn saved_recommendations(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    query: web::Query<SavedQuery>,
) -> ActixResult<HttpResponse> {
    let user_id = UserId::new(path.into_inner());
    let limit = query.limit.unwrap_or(DEFAULT_SAVED_LIMIT);
    Ok(HttpResponse::Ok().json(state.ledger.active_for(&user_id, limit)))
}

async fn dismiss_recommendation(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ActixResult<HttpResponse> {
    let (user_id, rec_id) = path.into_inner();
    let Ok(rec_id) = Uuid::parse_str(&rec_id) else {
        return Ok(recommendation_not_found());
    };

    if state.ledger.dismiss(&UserId::new(user_id), &rec_id) {
        Ok(HttpResponse::Ok().json(serde_json::json!({ "dismissed": true })))
    } else {
        Ok(recommendation_not_found())
    }
}

async fn save_recommendation(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ActixResult<HttpResponse> {
    let (user_id, rec_id) = path.into_inner();
    let Ok(rec_id) = Uuid::parse_str(&rec_id) else {
        return Ok(recommendation_not_found());
    };

    if state.ledger.save(&UserId::new(user_id), &rec_id) {
        Ok(HttpResponse::Ok().json(serde_json::json!({ "saved": true })))
    } else {
        Ok(recommendation_not_found())
    }
}

/// An empty body selects the default schedule
fn parse_schedule_request(body: &[u8]) -> std::result::Result<ScheduleRequest, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ScheduleRequest { cron: None });
    }
    serde_json::from_slice(body).map_err(|e| format!("Invalid schedule request: {}", e))
}

async fn schedule_refresh(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let user_id = UserId::new(path.into_inner());
    let req = match parse_schedule_request(&body) {
        Ok(req) => req,
        Err(reason) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "error": reason })));
        }
    };
    if let Err(e) = state.facade.require_user(&user_id).await {
        return Ok(error_response(&e));
    }
    let cron = req.cron.unwrap_or_else(|| state.refresh_cron.clone());

    let callback = daily_refresh(state.facade.clone());
    match state.scheduler.schedule_recurring(&user_id, &cron, callback) {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "user_id": user_id,
            "cron": cron,
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn cancel_refresh(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let user_id = UserId::new(path.into_inner());
    if let Err(e) = state.facade.require_user(&user_id).await {
        return Ok(error_response(&e));
    }
    if state.scheduler.cancel(&user_id) {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "No refresh scheduled"
        })))
    }
}

async fn sync_user(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let user_id = UserId::new(path.into_inner());
    match state.facade.sync_user(&user_id).await {
        Ok(answer) => Ok(HttpResponse::Ok().json(answer)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn train_model(state: web::Data<Arc<AppState>>) -> ActixResult<HttpResponse> {
    match state.facade.retrain().await {
        Ok(answer) => Ok(HttpResponse::Ok().json(answer)),
        Err(e) => Ok(error_response(&e)),
    }
}
