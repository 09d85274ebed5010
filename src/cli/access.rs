use tabled::Table;

use super::{
    context::{Context, load_umbrella},
    waiting_spinner,
};
use crate::{error, info, success, types::StatusTableRow};

pub async fn status() {
    let ctx = Context::from_env().await;
    let state = ctx.session.state();
    let umbrella = load_umbrella().await;
    let resolved = ctx.resolver.resolve(umbrella.as_ref()).await;

    let yes_no = |b: bool| String::from(if b { "yes" } else { "no" });
    let rows = vec![
        StatusTableRow {
            key: "Spotify connected".to_string(),
            value: yes_no(state.is_authenticated),
        },
        StatusTableRow {
            key: "Spotify user".to_string(),
            value: state
                .user
                .as_ref()
                .map(|u| u.display_name.clone().unwrap_or_else(|| u.id.clone()))
                .unwrap_or_else(|| "-".to_string()),
        },
        StatusTableRow {
            key: "Umbrella user".to_string(),
            value: umbrella
                .as_ref()
                .map(|s| s.user_id.clone())
                .unwrap_or_else(|| "-".to_string()),
        },
        StatusTableRow {
            key: "Access method".to_string(),
            value: resolved.access_method.to_string(),
        },
        StatusTableRow {
            key: "Token available".to_string(),
            value: yes_no(resolved.access_token.is_some()),
        },
        StatusTableRow {
            key: "Premium".to_string(),
            value: yes_no(resolved.is_premium()),
        },
    ];

    println!("{}", Table::new(rows));
}

pub async fn token() {
    let ctx = Context::from_env().await;
    let Some(umbrella) = load_umbrella().await else {
        error!("No application session. Run bandruption session set first.");
    };

    let resolved = ctx.resolver.resolve(Some(&umbrella)).await;
    match resolved.access_token {
        Some(token) => println!("{}", token),
        None => error!(
            "No Spotify token available (access method: {}). Run bandruption link.",
            resolved.access_method
        ),
    }
}

pub async fn link() {
    let ctx = Context::from_env().await;
    let Some(umbrella) = load_umbrella().await else {
        error!("No application session. Run bandruption session set first.");
    };

    ctx.spawn_callback_server();
    let spinner = waiting_spinner("Linking Spotify account, continue in your browser...");
    let result = ctx.resolver.ensure_access(&umbrella).await;
    spinner.finish_and_clear();

    match result {
        Ok(r) if r.success => {
            let method = ctx.resolver.current_method(Some(&umbrella)).await;
            success!("Spotify access ready ({}).", method);
        }
        Ok(r) => error!(
            "Spotify linking failed: {}",
            r.error.unwrap_or_else(|| "unknown error".to_string())
        ),
        Err(e) if e.is_timeout() => error!("Spotify linking timed out, no answer from the browser."),
        Err(e) => error!("Spotify linking failed: {}", e),
    }
}

pub async fn unlink() {
    let ctx = Context::from_env().await;
    let Some(umbrella) = load_umbrella().await else {
        info!("No application session, nothing to unlink.");
        return;
    };

    match ctx.resolver.unlink(&umbrella).await {
        Ok(()) => success!("Spotify account unlinked."),
        Err(e) => error!("Failed to unlink Spotify account: {}", e),
    }
}
