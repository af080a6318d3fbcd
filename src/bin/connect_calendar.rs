use std::env;
use std::sync::Arc;

use surgisync::components::calendar::auth::{AuthOutcome, AuthorizationFlow};
use surgisync::components::calendar::token::UserId;
use surgisync::components::storage::StorageActor;
use surgisync::error::{other_error, Error};
use surgisync::startup;

/// The implicit grant returns the token in the URL fragment, which the
/// browser never sends to a server. This page moves the fragment into a
/// query string, scrubbing it from the address bar first, and
/// re-requests /capture so the process can read it.
const RELAY_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Connecting calendar</title></head>
<body>
<p>Completing calendar connection...</p>
<script>
  var fragment = window.location.hash.substring(1);
  window.history.replaceState(null, "", window.location.pathname);
  window.location.replace("/capture?" + fragment);
</script>
</body>
</html>"#;

#[tokio::main]
async fn main() -> miette::Result<()> {
    startup::init_logging()?;

    // The host user connecting their calendar
    let user = env::args()
        .nth(1)
        .map(UserId::new)
        .ok_or_else(|| other_error("Usage: connect_calendar <user-id>"))?;

    // Load configuration
    let config = startup::load_config().await?;

    // Create the storage actor
    let (mut storage_actor, storage_handle) = StorageActor::new(Arc::clone(&config));

    // Spawn storage actor task
    let _storage_task = tokio::spawn(async move {
        storage_actor.run().await;
    });

    let flow = AuthorizationFlow::new(
        user,
        Arc::clone(&config),
        Arc::new(storage_handle.clone()),
    );

    let port = config.read().await.oauth_redirect_port;

    // Persist the CSRF state and build the consent URL
    let request = flow.initiate().await?;

    // Open browser for authorization
    println!("Opening browser for calendar authorization...");
    webbrowser::open(&request.authorize_url).map_err(Error::from)?;

    // Start local server to receive the callback
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| other_error(&format!("Failed to start callback server: {}", e)))?;
    println!("Waiting for authorization callback on port {}...", port);

    let html_header = tiny_http::Header::from_bytes(
        &b"Content-Type"[..],
        &b"text/html; charset=utf-8"[..],
    )
    .expect("static header is valid");

    let outcome = loop {
        let callback = server.recv().map_err(Error::from)?;
        let url = callback.url().to_string();
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, query),
            None => (url.as_str(), ""),
        };

        if path != "/capture" {
            // Provider redirect landed; hand the browser the relay page
            let response =
                tiny_http::Response::from_string(RELAY_PAGE).with_header(html_header.clone());
            callback.respond(response).map_err(Error::from)?;
            continue;
        }

        match flow.complete_from_callback(query).await {
            Ok(outcome) => {
                let message = match outcome {
                    AuthOutcome::Connected => {
                        "Calendar connected! You can close this window."
                    }
                    AuthOutcome::Denied => {
                        "Authorization was declined. You can close this window."
                    }
                };
                let response = tiny_http::Response::from_string(message);
                callback.respond(response).map_err(Error::from)?;
                break outcome;
            }
            Err(e) => {
                let response = tiny_http::Response::from_string(
                    "Authorization failed. Check the application logs.",
                );
                let _ = callback.respond(response);
                return Err(e.into());
            }
        }
    };

    match outcome {
        AuthOutcome::Connected => println!("Calendar connected and token stored."),
        AuthOutcome::Denied => println!("Authorization declined; no token stored."),
    }

    storage_handle.shutdown().await?;

    Ok(())
}
