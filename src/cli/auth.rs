use super::{context::Context, waiting_spinner};
use crate::{error, info, success};

pub async fn login() {
    let ctx = Context::from_env().await;
    if let Some(user) = ctx.session.state().user {
        info!(
            "Currently connected as {}, signing in again.",
            user.display_name.as_deref().unwrap_or(&user.id)
        );
    }

    ctx.spawn_callback_server();
    let spinner = waiting_spinner("Waiting for Spotify authorization in your browser...");
    let result = ctx.session.login().await;
    spinner.finish_and_clear();

    match result {
        Ok(r) if r.success => {
            let state = ctx.session.state();
            let name = state
                .user
                .map(|u| u.display_name.unwrap_or(u.id))
                .unwrap_or_default();
            success!("Connected to Spotify as {}", name);
        }
        Ok(r) => error!(
            "Spotify login failed: {}",
            r.error.unwrap_or_else(|| "unknown error".to_string())
        ),
        Err(e) if e.is_timeout() => error!("Spotify login timed out, no answer from the browser."),
        Err(e) => error!("Spotify login failed: {}", e),
    }
}

pub async fn logout() {
    let ctx = Context::from_env().await;
    if !ctx.session.is_authenticated() {
        info!("Not connected to Spotify.");
        return;
    }

    match ctx.session.logout().await {
        Ok(()) => success!("Disconnected from Spotify."),
        Err(e) => error!("Failed to disconnect from Spotify: {}", e),
    }
}
