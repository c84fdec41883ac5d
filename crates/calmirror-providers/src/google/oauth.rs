//! OAuth 2.0 PKCE flow for Google Calendar.
//!
//! Authorization Code flow with PKCE, using a loopback redirect: a one-shot
//! HTTP listener on 127.0.0.1 receives Google's redirect carrying the code,
//! which is then exchanged (together with the verifier) for tokens.
//!
//! Mirroring needs write access, so the flow is normally run with the full
//! `calendar` scope rather than `calendar.readonly`.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long the user has to complete consent in the browser.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth client for Google APIs.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Runs the interactive PKCE flow and returns the obtained tokens.
    ///
    /// Binds the first free port in `port_range`, opens the browser on the
    /// consent page (printing the URL if no browser can be opened) and waits
    /// up to five minutes for the redirect.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback_server(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth flow, opening browser...");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let callback = wait_for_callback(listener)?;
        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            ));
        }

        info!("received authorization code, exchanging for tokens...");
        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Obtains a fresh access token from a refresh token.
    ///
    /// Returns the new access token and its lifetime in seconds.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token_response = self.post_token_request(&params, "token refresh").await?;
        info!("refreshed Google access token");
        Ok((token_response.access_token, token_response.expires_in))
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let token_response = self.post_token_request(&params, "token exchange").await?;
        if token_response.refresh_token.is_none() {
            warn!("Google did not return a refresh token; re-run auth with --force if runs start failing");
        }

        info!("successfully obtained tokens");
        Ok(TokenInfo::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            scopes.to_vec(),
        ))
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }
}

/// Binds a TCP listener on the first available port in the range.
fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            debug!("bound loopback server on port {}", port);
            return Ok((listener, port));
        }
    }
    Err(ProviderError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Accepts connections until one carries the OAuth redirect, or the timeout
/// expires.
fn wait_for_callback(listener: TcpListener) -> ProviderResult<CallbackParams> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = handle_connection(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => error!("failed to accept connection: {}", e),
            }
        }
    });

    match rx.recv_timeout(CALLBACK_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(ProviderError::authentication("OAuth callback timeout"))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ProviderError::internal("callback channel disconnected"))
        }
    }
}

/// Reads one request, answers the browser, and returns the parsed callback.
/// Requests that are not the callback (e.g. favicon) yield `None`.
fn handle_connection(mut stream: TcpStream) -> Option<ProviderResult<CallbackParams>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let result = parse_callback(&request_line)?;

    let response = if result.is_ok() {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>calmirror is authorized</h1>\
        <p>You can close this window and return to the terminal.</p></body></html>"
    } else {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization failed</h1>\
        <p>You can close this window.</p></body></html>"
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(result)
}

/// Code and state extracted from the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CallbackParams {
    code: String,
    state: String,
}

/// Parses a request line such as `GET /callback?code=...&state=... HTTP/1.1`.
fn parse_callback(request_line: &str) -> Option<ProviderResult<CallbackParams>> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != "/callback" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut denied = None;

    for (key, value) in query.split('&').filter_map(|p| p.split_once('=')) {
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => denied = Some(value),
            _ => {}
        }
    }

    if let Some(reason) = denied {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            reason
        ))));
    }

    Some(match code {
        Some(code) => Ok(CallbackParams {
            code,
            state: state.unwrap_or_default(),
        }),
        None => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}

/// PKCE verifier, challenge and state (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 of the verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the Google consent URL. `access_type=offline` together with
    /// `prompt=consent` makes Google return a refresh token.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Response from Google's token endpoint.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}
