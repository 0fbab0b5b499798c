//! `adsight settings ...`

use std::io::Write;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use adsight_client::{SettingsApi, SettingsSyncClient};
use adsight_core::DotPath;
use adsight_core::path::{get as lookup, get_or};
use adsight_core::registry::{KNOWN_PATHS, is_known};

/// Interpret a command-line value: JSON if it parses, otherwise a string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn write_json(out: &mut impl Write, value: &Value) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn parse_path(raw: &str) -> Result<DotPath> {
    let path = DotPath::parse(raw).with_context(|| format!("Invalid setting path '{raw}'"))?;
    if !is_known(path.as_str()) {
        tracing::warn!(%path, "path is not a registered setting");
    }
    Ok(path)
}

/// Print the resolved tree.
pub async fn fetch<A: SettingsApi>(
    client: &SettingsSyncClient<A>,
    account: &str,
    out: &mut impl Write,
) -> Result<()> {
    let tree = client
        .fetch_all(account)
        .await
        .with_context(|| format!("Failed to fetch settings for {account}"))?;
    write_json(out, &tree)
}

/// Print the value at `raw_path`, or `default` when absent.
pub async fn get<A: SettingsApi>(
    client: &SettingsSyncClient<A>,
    account: &str,
    raw_path: &str,
    default: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let path = parse_path(raw_path)?;
    let tree = client
        .fetch_all(account)
        .await
        .with_context(|| format!("Failed to fetch settings for {account}"))?;

    let value = match (lookup(&tree, &path), default) {
        (Some(value), _) => value.clone(),
        (None, Some(default)) => parse_value(default),
        (None, None) => bail!("'{path}' is not set for account {account}"),
    };
    write_json(out, &value)
}

/// Write `raw_value` at `raw_path` and print the value the server settled on.
pub async fn set<A: SettingsApi>(
    client: &SettingsSyncClient<A>,
    account: &str,
    raw_path: &str,
    raw_value: &str,
    out: &mut impl Write,
) -> Result<()> {
    let path = parse_path(raw_path)?;
    let value = parse_value(raw_value);

    client
        .fetch_all(account)
        .await
        .with_context(|| format!("Failed to fetch settings for {account}"))?;
    let tree = client
        .update_path(account, &path, value)
        .await
        .with_context(|| format!("Failed to update '{path}' for {account}"))?;

    tracing::info!(account, %path, "setting updated");
    write_json(out, get_or(&tree, &path, &Value::Null))
}

/// List every registered setting path.
pub fn paths(out: &mut impl Write) -> Result<()> {
    for path in KNOWN_PATHS {
        writeln!(out, "{path}")?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use adsight_client::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ROUTE: &str = "/api/accounts/acct-1/settings";

    async fn server_with(tree: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path(ROUTE))
            .respond_with(ResponseTemplate::new(200).set_body_json(tree))
            .mount(&server)
            .await;
        server
    }

    fn client_for(server: &MockServer) -> SettingsSyncClient {
        SettingsSyncClient::from_config(&ClientConfig::new(server.uri())).unwrap()
    }

    fn output(buf: Vec<u8>) -> Value {
        serde_json::from_slice(&buf).unwrap()
    }

    // ------------------------------------------------------------------------
    // parse_value
    // ------------------------------------------------------------------------

    #[test]
    fn test_parse_value_json() {
        assert_eq!(parse_value("4.5"), json!(4.5));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value(r#"["spend","roas"]"#), json!(["spend", "roas"]));
        assert_eq!(parse_value(r#""EUR""#), json!("EUR"));
    }

    #[test]
    fn test_parse_value_plain_string() {
        assert_eq!(parse_value("EUR"), json!("EUR"));
        assert_eq!(parse_value("last 7 days"), json!("last 7 days"));
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    #[test]
    fn test_paths_lists_registry() {
        let mut buf = Vec::new();
        paths(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), KNOWN_PATHS.len());
        assert!(text.lines().any(|l| l == "display.currency"));
    }

    #[tokio::test]
    async fn test_fetch_prints_tree() {
        let server = server_with(json!({"display": {"currency": "USD"}})).await;
        let mut buf = Vec::new();
        fetch(&client_for(&server), "acct-1", &mut buf).await.unwrap();
        assert_eq!(output(buf), json!({"display": {"currency": "USD"}}));
    }

    #[tokio::test]
    async fn test_get_present_and_default() {
        let server = server_with(json!({"display": {"currency": "USD"}})).await;
        let client = client_for(&server);

        let mut buf = Vec::new();
        get(&client, "acct-1", "display.currency", None, &mut buf).await.unwrap();
        assert_eq!(output(buf), json!("USD"));

        let mut buf = Vec::new();
        get(&client, "acct-1", "goals.roasTarget", Some("3"), &mut buf)
            .await
            .unwrap();
        assert_eq!(output(buf), json!(3));
    }

    #[tokio::test]
    async fn test_get_absent_without_default() {
        let server = server_with(json!({})).await;
        let err = get(&client_for(&server), "acct-1", "goals.cpaTarget", None, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("is not set"));
    }

    #[tokio::test]
    async fn test_get_invalid_path() {
        let server = server_with(json!({})).await;
        let err = get(&client_for(&server), "acct-1", "goals..x", None, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid setting path"));
    }

    #[tokio::test]
    async fn test_set_sends_sparse_patch() {
        let server = server_with(json!({"goals": {"roasTarget": 3.0}})).await;
        Mock::given(method("PATCH"))
            .and(url_path(ROUTE))
            .and(body_json(json!({"goals": {"roasTarget": 4.5}})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"goals": {"roasTarget": 4.5}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut buf = Vec::new();
        set(&client_for(&server), "acct-1", "goals.roasTarget", "4.5", &mut buf)
            .await
            .unwrap();
        assert_eq!(output(buf), json!(4.5));
    }

    #[tokio::test]
    async fn test_set_rejected() {
        let server = server_with(json!({})).await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad value"))
            .mount(&server)
            .await;

        let err = set(&client_for(&server), "acct-1", "display.currency", "XX", &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to update 'display.currency'"));
    }
}
