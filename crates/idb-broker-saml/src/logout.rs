//! Logout flow selection and backchannel delivery.
//!
//! Logout toward the IdP takes one of four shapes. No SLO URL means
//! logout is a local-only no-op. When the IdP supports backchannel
//! logout, the broker always uses it, ignoring any front-channel binding
//! preference; the outbound POST is best-effort and its outcome only
//! affects logging. Otherwise the logout request travels through the
//! user's browser over the configured front-channel binding.

use crate::config::ProviderConfig;
use crate::types::{RELAY_STATE_PARAM, SAML_REQUEST_PARAM};

/// How a logout request reaches the IdP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutFlow {
    /// No single logout service configured: nothing to send.
    NoSloConfigured,
    /// Direct SP-to-IdP POST; terminal regardless of HTTP outcome.
    Backchannel,
    /// Browser-routed POST form.
    FrontChannelPost,
    /// Browser-routed redirect.
    FrontChannelRedirect,
}

/// Selects the logout flow for the given configuration.
#[must_use]
pub fn select_logout_flow(config: &ProviderConfig) -> LogoutFlow {
    if !config.has_single_logout_service() {
        return LogoutFlow::NoSloConfigured;
    }
    if config.backchannel_supported {
        return LogoutFlow::Backchannel;
    }
    if config.post_binding_logout {
        LogoutFlow::FrontChannelPost
    } else {
        LogoutFlow::FrontChannelRedirect
    }
}

/// Delivers a logout request over the backchannel.
///
/// Posts the encoded request and relay state as form fields to the IdP's
/// SLO URL and blocks until the IdP answers. Any HTTP status in the
/// 200–399 range counts as delivered; everything else, including
/// transport errors, is logged as a warning and otherwise ignored so the
/// surrounding session termination can always proceed. The host bounds
/// the call's duration through the timeout policy of the `reqwest`
/// client it supplies.
///
/// The returned flag reports delivery for logging and tests only;
/// callers must not fail logout on it.
pub async fn send_backchannel_logout(
    client: &reqwest::Client,
    destination: &str,
    encoded_request: &str,
    relay_state: &str,
) -> bool {
    let result = client
        .post(destination)
        .form(&[
            (SAML_REQUEST_PARAM, encoded_request),
            (RELAY_STATE_PARAM, relay_state),
        ])
        .send()
        .await;

    match result {
        Ok(response) => {
            let status = response.status().as_u16();
            let delivered = (200..400).contains(&status);
            if !delivered {
                tracing::warn!(
                    "Failed saml backchannel broker logout to: {destination} (status {status})"
                );
            }
            delivered
        }
        Err(e) => {
            tracing::warn!("Failed saml backchannel broker logout to: {destination}: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_slo() -> ProviderConfig {
        ProviderConfig {
            single_logout_service_url: Some("https://idp.example.com/slo".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn no_slo_url_is_a_noop() {
        let config = ProviderConfig::default();
        assert_eq!(select_logout_flow(&config), LogoutFlow::NoSloConfigured);

        let config = ProviderConfig {
            single_logout_service_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(select_logout_flow(&config), LogoutFlow::NoSloConfigured);
    }

    #[test]
    fn backchannel_wins_over_front_channel_preference() {
        let config = ProviderConfig {
            backchannel_supported: true,
            post_binding_logout: true,
            ..config_with_slo()
        };
        assert_eq!(select_logout_flow(&config), LogoutFlow::Backchannel);
    }

    #[test]
    fn front_channel_binding_follows_logout_flag() {
        let config = ProviderConfig {
            post_binding_logout: true,
            ..config_with_slo()
        };
        assert_eq!(select_logout_flow(&config), LogoutFlow::FrontChannelPost);

        let config = config_with_slo();
        assert_eq!(select_logout_flow(&config), LogoutFlow::FrontChannelRedirect);
    }

    #[tokio::test]
    async fn backchannel_delivery_statuses() {
        use axum::{http::StatusCode, routing::post, Router};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/ok", post(|| async { StatusCode::OK }))
            .route("/boom", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::new();
        assert!(
            send_backchannel_logout(&client, &format!("http://{addr}/ok"), "ZW5j", "rs").await
        );
        assert!(
            !send_backchannel_logout(&client, &format!("http://{addr}/boom"), "ZW5j", "rs").await
        );
        // Unreachable endpoint: logged, never raised.
        assert!(
            !send_backchannel_logout(&client, "http://127.0.0.1:1/slo", "ZW5j", "rs").await
        );
    }
}
