use crate::types::{AuthResultMessage, CallbackResponse};

/// Turns the backend's code-exchange answer into the message the callback
/// page posts back.
pub fn callback_message(response: CallbackResponse) -> AuthResultMessage {
    match response {
        CallbackResponse {
            success: true,
            user_id: Some(user_id),
            access_token: Some(access_token),
            user_data: Some(user_data),
            refresh_token,
            expires_in,
            ..
        } => AuthResultMessage::Success {
            user_id,
            access_token,
            user_data,
            refresh_token,
            expires_in,
        },
        CallbackResponse {
            success: true,
            error,
            ..
        } => AuthResultMessage::Error {
            error: error.unwrap_or_else(|| "Incomplete authentication response".to_string()),
        },
        CallbackResponse { error, .. } => AuthResultMessage::Error {
            error: error.unwrap_or_else(|| "Authentication failed".to_string()),
        },
    }
}

/// Makes serialized JSON safe to embed inside a `<script>` element.
pub fn escape_script_json(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn render_callback_page(message: &AuthResultMessage) -> String {
    let heading = match message {
        AuthResultMessage::Success { .. } => "Authentication successful.",
        AuthResultMessage::Error { .. } => "Authentication failed.",
    };
    let json = serde_json::to_string(message).unwrap_or_else(|_| "null".to_string());

    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Bandruption</title></head>
<body>
<h2>{heading}</h2>
<p>You can close this window.</p>
<script>
const message = {payload};
fetch("/message", {{
  method: "POST",
  headers: {{ "Content-Type": "application/json" }},
  body: JSON.stringify(message),
  keepalive: true
}});
window.addEventListener("pagehide", () => navigator.sendBeacon("/closed"));
</script>
</body>
</html>
"#,
        heading = heading,
        payload = escape_script_json(&json),
    )
}
