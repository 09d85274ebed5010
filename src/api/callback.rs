use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};

use crate::{
    spotify::AuthApi,
    types::AuthResultMessage,
    utils::{callback_message, render_callback_page},
    warning,
};

/// The popup's callback page.
///
/// This is the only place an authorization code is redeemed. The page it
/// renders posts the outcome back to `/message` from this server's origin.
pub async fn callback<A: AuthApi>(
    Query(params): Query<HashMap<String, String>>,
    Extension(backend): Extension<Arc<A>>,
) -> Html<String> {
    let message = if let Some(error) = params.get("error") {
        AuthResultMessage::Error {
            error: error.clone(),
        }
    } else if let Some(code) = params.get("code") {
        let state = params.get("state").map(String::as_str).unwrap_or_default();
        match backend.exchange_code(code, state).await {
            Ok(response) => callback_message(response),
            Err(e) => {
                warning!("Authorization code exchange failed: {}", e);
                AuthResultMessage::Error {
                    error: e.to_string(),
                }
            }
        }
    } else {
        AuthResultMessage::Error {
            error: "Missing authorization code".to_string(),
        }
    };

    Html(render_callback_page(&message))
}
