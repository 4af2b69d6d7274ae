use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::browser::{DocumentSession, ElementRef, Root, SessionFactory};
use crate::error::ScrapeError;

/// W3C key under which element references travel on the wire.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4a5bf00e104e";

const FIND_HOST_SCRIPT: &str = r#"
const host = document.getElementsByTagName(arguments[0])[0];
return host && host.shadowRoot ? host : null;
"#;

const SHADOW_QUERY_SCRIPT: &str = r#"
const root = arguments[0].shadowRoot;
return root ? root.querySelector(arguments[1]) : null;
"#;

const SHADOW_QUERY_ALL_SCRIPT: &str = r#"
const root = arguments[0].shadowRoot;
return root ? Array.from(root.querySelectorAll(arguments[1])) : [];
"#;

const CLICK_SCRIPT: &str = "arguments[0].click();";
const READY_STATE_SCRIPT: &str = "return document.readyState;";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Starts one Chrome session per cycle through a chromedriver-compatible endpoint.
pub struct WebDriverFactory {
    client: reqwest::Client,
    base_url: String,
    headless: bool,
}

impl WebDriverFactory {
    pub fn new(base_url: &str, headless: bool) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headless,
        })
    }

    /// No `--user-data-dir`: chromedriver then owns a temporary profile and
    /// removes it when the session is deleted.
    fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-application-cache".to_string(),
            "--disk-cache-size=0".to_string(),
            "--disable-gpu".to_string(),
            "--window-size=1920,1080".to_string(),
            format!("user-agent={USER_AGENT}"),
        ];
        if self.headless {
            args.insert(0, "--headless=new".to_string());
        }
        args
    }
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    async fn acquire(&self) -> Result<Box<dyn DocumentSession>, ScrapeError> {
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": self.chrome_args() }
                }
            }
        });
        let url = format!("{}/session", self.base_url);
        let value = send(&self.client, Method::POST, &url, Some(body)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ScrapeError::Session("new session response had no sessionId".to_string())
            })?
            .to_string();

        info!(session_id = %session_id, "WebDriver session started");
        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", self.base_url, session_id),
        }))
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct WebDriverSession {
    client: reqwest::Client,
    /// `{base}/session/{id}`
    session_url: String,
}

impl WebDriverSession {
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ScrapeError> {
        let url = format!("{}{}", self.session_url, path);
        send(&self.client, method, &url, body).await
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, ScrapeError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }
}

#[async_trait]
impl DocumentSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        debug!(url, "navigate");
        self.command(Method::POST, "/url", Some(json!({ "url": url }))).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ScrapeError> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn ready_state(&self) -> Result<String, ScrapeError> {
        let value = self.execute(READY_STATE_SCRIPT, vec![]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn find_host(&self, tag: &str) -> Result<Option<ElementRef>, ScrapeError> {
        let value = self.execute(FIND_HOST_SCRIPT, vec![json!(tag)]).await?;
        Ok(parse_element(&value))
    }

    async fn query(&self, root: &Root, selector: &str) -> Result<Option<ElementRef>, ScrapeError> {
        match root {
            Root::Shadow(host) => {
                let value = self
                    .execute(SHADOW_QUERY_SCRIPT, vec![element_arg(host), json!(selector)])
                    .await?;
                Ok(parse_element(&value))
            }
            // The singular find endpoint reports absence as an error; the plural one
            // returns an empty list, which is what "optional" means here.
            Root::Element(_) => Ok(self.query_all(root, selector).await?.into_iter().next()),
        }
    }

    async fn query_all(&self, root: &Root, selector: &str) -> Result<Vec<ElementRef>, ScrapeError> {
        let value = match root {
            Root::Shadow(host) => {
                self.execute(SHADOW_QUERY_ALL_SCRIPT, vec![element_arg(host), json!(selector)])
                    .await?
            }
            Root::Element(el) => {
                self.command(
                    Method::POST,
                    &format!("/element/{}/elements", el.0),
                    Some(json!({ "using": "css selector", "value": selector })),
                )
                .await?
            }
        };
        Ok(value
            .as_array()
            .map(|items| items.iter().filter_map(parse_element).collect())
            .unwrap_or_default())
    }

    async fn text(&self, element: &ElementRef) -> Result<String, ScrapeError> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.0), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, ScrapeError> {
        let value = self
            .command(Method::GET, &format!("/element/{}/attribute/{}", element.0, name), None)
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), ScrapeError> {
        self.execute(CLICK_SCRIPT, vec![element_arg(element)]).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        send(&self.client, Method::DELETE, &self.session_url, None).await?;
        info!("WebDriver session closed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

async fn send(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, ScrapeError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response: Value = request.send().await?.json().await?;
    unwrap_value(response)
}

/// Pull `value` out of a WebDriver response, mapping protocol errors onto the
/// scrape taxonomy.
fn unwrap_value(mut response: Value) -> Result<Value, ScrapeError> {
    let value = response.get_mut("value").map(Value::take).unwrap_or(Value::Null);
    let Some(error) = value.get("error").and_then(Value::as_str) else {
        return Ok(value);
    };
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();
    Err(match error {
        "stale element reference" | "detached shadow root" => ScrapeError::StaleReference(message),
        _ => ScrapeError::Session(format!("{error}: {message}")),
    })
}

fn element_arg(element: &ElementRef) -> Value {
    json!({ ELEMENT_KEY: element.0 })
}

fn parse_element(value: &Value) -> Option<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementRef(id.to_string()))
}
