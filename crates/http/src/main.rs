//! `portalgate-probe`: send one request through the pipeline and print the
//! normalized outcome.
//!
//! Usage: `portalgate-probe <METHOD> <PATH> [JSON_BODY]`
//!
//! Environment: `PORTALGATE_API_URL` (required), `PORTALGATE_TOKEN`,
//! `PORTALGATE_INSTANCE`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};

use portalgate_auth::{TokenClaims, validate_claims};
use portalgate_http::{Method, Pipeline, PipelineConfig, ReqwestTransport};
use portalgate_session::{SessionStore, StaticProvider, TokenSet};

fn parse_method(s: &str) -> anyhow::Result<Method> {
    Ok(match s.to_ascii_uppercase().as_str() {
        "GET" => Method::Get,
        "HEAD" => Method::Head,
        "OPTIONS" => Method::Options,
        "POST" => Method::Post,
        "PUT" => Method::Put,
        "PATCH" => Method::Patch,
        "DELETE" => Method::Delete,
        other => bail!("unsupported method '{other}'"),
    })
}

/// Token set for an out-of-band bearer token.
///
/// A JWT must be inside its validity window. Opaque tokens cannot be checked
/// and are assumed valid for an hour.
fn token_set(token: String, now: DateTime<Utc>) -> anyhow::Result<TokenSet> {
    let expires_at = match TokenClaims::from_jwt(&token) {
        Ok(claims) => {
            validate_claims(&claims, now).context("PORTALGATE_TOKEN is not usable")?;
            claims.expires_at
        }
        Err(e) => {
            tracing::debug!(error = %e, "PORTALGATE_TOKEN is not a JWT; treating as opaque");
            now + chrono::Duration::hours(1)
        }
    };

    Ok(TokenSet {
        access_token: token,
        refresh_token: None,
        expires_at,
        provider_session_expires_at: None,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    portalgate_observability::init();

    let mut args = std::env::args().skip(1);
    let method = parse_method(&args.next().context("missing METHOD argument")?)?;
    let path = args.next().context("missing PATH argument")?;
    let body = args
        .next()
        .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
        .transpose()
        .context("JSON_BODY is not valid JSON")?;

    let api_url = std::env::var("PORTALGATE_API_URL").context("PORTALGATE_API_URL not set")?;
    let config = match std::env::var("PORTALGATE_INSTANCE") {
        Ok(code) => PipelineConfig::instance(api_url, code),
        Err(_) => PipelineConfig::hub(api_url),
    };

    let session = SessionStore::new(Arc::new(StaticProvider));
    match std::env::var("PORTALGATE_TOKEN") {
        Ok(token) => session.establish(token_set(token, Utc::now())?),
        Err(_) => tracing::warn!("PORTALGATE_TOKEN not set; sending unauthenticated requests"),
    }

    let jar = Arc::new(reqwest::cookie::Jar::default());
    let transport = ReqwestTransport::with_cookie_jar(jar.clone(), Duration::from_secs(30))?;
    let pipeline = Pipeline::builder(config, session, Arc::new(transport))
        .cookies(jar)
        .build()?;

    let descriptor = pipeline.describe(method, &path)?;
    match pipeline.dispatch(descriptor, body).await {
        Ok(resp) => {
            println!("{}", resp.status);
            println!("{}", resp.text());
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err)?);
            std::process::exit(1);
        }
    }
}
