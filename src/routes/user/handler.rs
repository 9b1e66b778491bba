use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    error::AppError,
    utils::{escape_html, hash_password, is_valid_email, success_to_api_response, verify_password},
};

use super::model::{NewUser, SessionUser, SignInRequest, SignOutResponse, SignUpRequest, User};
use super::session::{session_user, set_session_user};

/// Creates an account and signs it in. Any session the client already had is dropped first.
#[axum::debug_handler]
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<SignUpRequest>, FormRejection>,
) -> Response {
    let jar = state.sessions.session_destroy(jar);
    let outcome = match submission(form) {
        Ok(req) => register(&state, req).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(user) => start_user_session(&state, jar, &user),
        Err(e) => (jar, e).into_response(),
    }
}

/// Checks credentials and signs the user in. Any session the client already had is dropped first.
#[axum::debug_handler]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<SignInRequest>, FormRejection>,
) -> Response {
    let jar = state.sessions.session_destroy(jar);
    let outcome = match submission(form) {
        Ok(req) => authenticate(&state, req).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(user) => start_user_session(&state, jar, &user),
        Err(e) => (jar, e).into_response(),
    }
}

#[axum::debug_handler]
pub async fn home(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .sessions
        .session_check(&jar)
        .ok_or(AppError::NoSession)?;
    let user = session_user(session.as_ref())?;
    Ok(success_to_api_response(user))
}

#[axum::debug_handler]
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = state.sessions.session_destroy(jar);
    (jar, success_to_api_response(SignOutResponse {}))
}

/// Unreadable bodies (wrong content type, malformed encoding) get the same reply as incomplete ones.
fn submission<T>(form: Result<Form<T>, FormRejection>) -> Result<T, AppError> {
    form.map(|Form(req)| req).map_err(|e| {
        tracing::debug!("rejected form submission: {}", e);
        AppError::InvalidSubmission
    })
}

async fn register(state: &AppState, req: SignUpRequest) -> Result<User, AppError> {
    let name = escape_html(&req.name);
    let email = escape_html(&req.email);
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidSubmission);
    }
    if !is_valid_email(&email) {
        return Err(AppError::InvalidEmail);
    }

    let password_hash = hash_password(&req.password, state.config.bcrypt_cost)?;
    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
        })
        .await?;
    Ok(user)
}

async fn authenticate(state: &AppState, req: SignInRequest) -> Result<User, AppError> {
    let email = escape_html(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidSubmission);
    }
    if !is_valid_email(&email) {
        return Err(AppError::InvalidEmail);
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        tracing::debug!("sign in for unknown email");
        return Err(AppError::AuthenticationFailed);
    };
    if !verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "sign in with wrong password");
        return Err(AppError::AuthenticationFailed);
    }
    Ok(user)
}

fn start_user_session(state: &AppState, jar: CookieJar, user: &User) -> Response {
    match state.sessions.session_start(jar.clone()) {
        Ok((jar, session)) => {
            set_session_user(session.as_ref(), user);
            tracing::info!(user_id = user.id, "user signed in");
            (jar, success_to_api_response(SessionUser::from(user))).into_response()
        }
        Err(e) => (jar, AppError::from(e)).into_response(),
    }
}
