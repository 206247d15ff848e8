use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::AppState;
use crate::auth::bearer_token;
use crate::error::{ApiError, MISSING_BEARER_TOKEN};

/// Bearer authentication for every protected route.
///
/// Resolves the token to a `Principal` and stores it in the request
/// extensions. Which kind of principal a route accepts is decided by the
/// service the handler calls.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = bearer_token(header)
        .ok_or_else(|| ApiError::unauthorized(MISSING_BEARER_TOKEN))?
        .to_string();

    let principal = state.auth.authenticate(&token).await?;
    tracing::debug!(kind = ?principal.kind(), path = %request.uri().path(), "Authenticated request");

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
