//! HTTP handler functions for the civic map API.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use civic_map_dashboard::MapAction;
use civic_map_dashboard::views;
use civic_map_domain_models::NewTicket;
use civic_map_server_models::{
    ApiError, ApiHealth, AreaSearchParams, DashboardQueryParams, MissionsQueryParams,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_configured: state.dashboard.store().is_configured(),
    })
}

/// `GET /api/dashboard`
///
/// Runs a load cycle and returns the resulting snapshot. A failed cycle
/// still answers 200 with the message in the snapshot's `error` field.
pub async fn dashboard(
    state: web::Data<AppState>,
    params: web::Query<DashboardQueryParams>,
) -> HttpResponse {
    let snapshot = state.dashboard.load(params.into_inner().into_request()).await;
    HttpResponse::Ok().json(snapshot.as_ref())
}

/// `POST /api/dashboard/retry`
pub async fn retry(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.dashboard.retry().await;
    HttpResponse::Ok().json(snapshot.as_ref())
}

/// `GET /api/areas?q=`
pub async fn search_areas(
    state: web::Data<AppState>,
    params: web::Query<AreaSearchParams>,
) -> HttpResponse {
    let snapshot = state.dashboard.snapshot();
    HttpResponse::Ok().json(views::area_search(&snapshot, &params.q))
}

/// `GET /api/areas/{id}`
pub async fn area_dashboard(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let area_id = path.into_inner();
    let snapshot = state.dashboard.snapshot();

    match views::area_dashboard(&snapshot, &area_id, Utc::now()) {
        Some(dashboard) => HttpResponse::Ok().json(dashboard),
        None => HttpResponse::NotFound().json(ApiError::new(format!(
            "Area {area_id} is not loaded"
        ))),
    }
}

/// `GET /api/map`
pub async fn map_view(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.dashboard.snapshot();
    let map_state = state.map_state().clone();
    HttpResponse::Ok().json(views::map_view(&snapshot, &map_state, Utc::now()))
}

/// `GET /api/scenario`
pub async fn get_scenario(state: web::Data<AppState>) -> HttpResponse {
    let map_state = state.map_state().clone();
    HttpResponse::Ok().json(map_state)
}

/// `POST /api/scenario`
///
/// Applies one tagged [`MapAction`] and returns the new state.
pub async fn apply_scenario_action(
    state: web::Data<AppState>,
    action: web::Json<MapAction>,
) -> HttpResponse {
    let action = action.into_inner();
    log::debug!("Applying map action {action:?}");

    let map_state = {
        let mut guard = state.map_state();
        guard.apply(action);
        guard.clone()
    };
    HttpResponse::Ok().json(map_state)
}

/// `GET /api/facilities/{id}`
pub async fn facility_card(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let facility_id = path.into_inner();
    let snapshot = state.dashboard.snapshot();

    match views::facility_card(&snapshot, &facility_id, Utc::now()) {
        Some(card) => HttpResponse::Ok().json(card),
        None => HttpResponse::NotFound().json(ApiError::new(format!(
            "Facility {facility_id} is not loaded"
        ))),
    }
}

/// `GET /api/missions`
pub async fn missions(
    state: web::Data<AppState>,
    params: web::Query<MissionsQueryParams>,
) -> HttpResponse {
    let filter = params.into_inner().into_filter();
    match state.dashboard.missions(Utc::now(), &filter).await {
        Ok(board) => HttpResponse::Ok().json(board),
        Err(e) => {
            log::error!("Failed to fetch missions: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(e.to_string()))
        }
    }
}

/// `POST /api/tickets`
pub async fn submit_ticket(
    state: web::Data<AppState>,
    ticket: web::Json<NewTicket>,
) -> HttpResponse {
    match state.dashboard.submit_ticket(&ticket).await {
        Ok(receipt) => HttpResponse::Created().json(receipt),
        Err(e) => {
            log::warn!("Ticket submission failed: {e}");
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
    }
}

/// `GET /api/admin`
pub async fn admin_board(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.dashboard.snapshot();
    HttpResponse::Ok().json(views::admin_board(&snapshot, Utc::now()))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test, web};
    use civic_map_dashboard::{MapState, Scenario};
    use civic_map_store::{NOT_CONFIGURED_MESSAGE, PostgrestStore};
    use serde_json::json;

    use crate::{AppState, configure};

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState::new(PostgrestStore::unconfigured()))
    }

    #[actix_web::test]
    async fn health_reports_store_configuration() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["healthy"], true);
        assert_eq!(body["storeConfigured"], false);
    }

    #[actix_web::test]
    async fn unconfigured_load_reports_error_in_snapshot() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/dashboard?areaId=a")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["error"], NOT_CONFIGURED_MESSAGE);
        assert_eq!(body["loading"], false);
    }

    #[actix_web::test]
    async fn ticket_failure_is_bad_request() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/tickets")
            .set_json(json!({
                "facilityId": null,
                "areaId": "a",
                "issueType": "safety",
                "severity": "medium",
                "description": "Broken railing",
                "coordinates": null,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], NOT_CONFIGURED_MESSAGE);
    }

    #[actix_web::test]
    async fn scenario_actions_update_shared_state() {
        let state = state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/scenario")
            .set_json(json!({"action": "set_scenario", "scenario": "safety"}))
            .to_request();
        let body: MapState = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.scenario, Scenario::Safety);
        assert_eq!(body.facility_type_filter, ["cctv", "police_station"]);
        assert_eq!(state.map_state().scenario, Scenario::Safety);
    }

    #[actix_web::test]
    async fn unknown_facility_is_not_found() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/facilities/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn area_search_and_admin_read_the_snapshot() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/areas?q=abc").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!([]));

        let req = test::TestRequest::get().uri("/api/admin").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"tickets": [], "upcoming": []}));
    }

    #[actix_web::test]
    async fn missions_without_store_is_server_error() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/missions?areaId=all&type=park&q=lamp")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.status(),
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
