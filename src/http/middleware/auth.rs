//! Authentication stage.
//!
//! Optional mode (plain methods): a valid credential attaches an `Identity`,
//! anything else proceeds anonymously. Required mode (secure methods):
//! a missing credential is `Unauthorized` (401), a bad one `AuthJwtInvalid` (403).

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{ErrorCode, ErrorEnvelope};
use crate::http::middleware::StageContext;
use crate::security::credentials::{bearer_token, CredentialError, Identity};

pub async fn authenticate_middleware(
    State(ctx): State<StageContext>,
    mut request: Request,
    next: Next,
) -> Response {
    let required = ctx.route.secure;

    let token = bearer_token(request.headers()).map(|t| t.map(str::to_owned));
    let outcome = match token {
        Ok(Some(token)) => verify(&ctx, &token).await.map(Some),
        Ok(None) => Ok(None),
        Err(e) => Err(AuthFailure::from(e)),
    };

    match outcome {
        Ok(Some(identity)) => {
            tracing::debug!(route = %ctx.route.name, subject = %identity.subject, "Authenticated");
            request.extensions_mut().insert(identity);
        }
        Ok(None) if required => {
            return ErrorEnvelope::new(ErrorCode::Unauthorized).into_response();
        }
        Ok(None) => {}
        Err(e) if required => {
            return ErrorEnvelope::with_cause(ErrorCode::AuthJwtInvalid, e).into_response();
        }
        Err(e) => {
            tracing::warn!(
                route = %ctx.route.name,
                error = %e,
                "Ignoring invalid optional credentials"
            );
        }
    }

    next.run(request).await
}

async fn verify(ctx: &StageContext, token: &str) -> Result<Identity, AuthFailure> {
    let verifier = ctx.shared.verifier.as_ref().ok_or(AuthFailure::NoVerifier)?;
    Ok(verifier.verify(token).await?)
}

#[derive(Debug, thiserror::Error)]
enum AuthFailure {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("no credential verifier configured")]
    NoVerifier,
}
