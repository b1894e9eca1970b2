//! Authorization URL construction

use url::Url;

use etsymcp_auth::{build_authorization_url, create_authorization_request, PkceChallenge};
use etsymcp_core::AuthConfig;

#[test]
fn url_carries_all_oauth_parameters() {
    let pkce = PkceChallenge::generate();
    let url = build_authorization_url(
        "https://www.etsy.com/oauth/connect",
        "keystring",
        "http://localhost:8477/callback",
        &["shops_r".to_string(), "listings_w".to_string()],
        &pkce.challenge,
        "state_abc",
    )
    .unwrap();

    let parsed = Url::parse(&url).unwrap();
    let get = |name: &str| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.to_string())
    };

    assert_eq!(parsed.host_str(), Some("www.etsy.com"));
    assert_eq!(get("response_type").as_deref(), Some("code"));
    assert_eq!(get("client_id").as_deref(), Some("keystring"));
    assert_eq!(
        get("redirect_uri").as_deref(),
        Some("http://localhost:8477/callback")
    );
    assert_eq!(get("scope").as_deref(), Some("shops_r listings_w"));
    assert_eq!(get("state").as_deref(), Some("state_abc"));
    assert_eq!(get("code_challenge").as_deref(), Some(pkce.challenge.as_str()));
    assert_eq!(get("code_challenge_method").as_deref(), Some("S256"));
}

#[test]
fn request_generates_fresh_state_and_verifier_per_attempt() {
    let config = AuthConfig::new("keystring").unwrap();
    let scopes = vec!["shops_r".to_string()];

    let first = create_authorization_request(&config, &scopes).unwrap();
    let second = create_authorization_request(&config, &scopes).unwrap();

    assert_ne!(first.state, second.state);
    assert_ne!(first.code_verifier, second.code_verifier);
    assert_ne!(first.authorization_url, second.authorization_url);
}
