use crate::{error::Error, state::AppState};
use axum::{
    Router,
    extract::State,
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
};
use libqrtrack::{Location, qr};
use minijinja::context;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/qr.png", get(qr_code))
}

async fn index(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let map_key = state
        .config
        .map
        .key()
        .ok_or_else(|| Error::Environment("no map key is configured".to_string()))?
        .to_string();
    let location = state.storage.last_known().await;
    let position = location.location().and_then(Location::position);
    Ok(state.render_template(
        "index.html.j2",
        context!(
            details => &state.config.details,
            location => &location,
            position => position,
            map_key => map_key,
            public_url => state.public_url(),
        ),
    ))
}

async fn qr_code(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let png = qr::render_png(&state.public_url())?;
    Ok((
        [(CONTENT_TYPE, "image/png"), (CACHE_CONTROL, "no-cache")],
        png,
    ))
}
