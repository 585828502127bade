//! W3C WebDriver wire types
//!
//! Only the subset of the protocol the runner uses.
//! See: https://www.w3.org/TR/webdriver2/

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::common::config::{BrowserKind, Viewport};

/// Key the protocol uses to mark a JSON object as an element reference
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Every WebDriver response wraps its payload in `value`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub value: T,
}

/// Error payload returned with a non-2xx status
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// Response body of `POST /session`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResponse {
    pub session_id: String,
}

/// Response body of `GET /status`
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub message: String,
}

/// Serialized element reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    pub id: String,
}

/// Element location strategy
#[derive(Debug, Serialize)]
pub struct Locator<'a> {
    pub using: &'static str,
    pub value: &'a str,
}

impl<'a> Locator<'a> {
    pub fn css(selector: &'a str) -> Self {
        Self {
            using: "css selector",
            value: selector,
        }
    }
}

/// Session timeouts in milliseconds
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeouts {
    pub page_load: u64,
    pub script: u64,
    pub implicit: u64,
}

/// Arguments of `POST /execute/sync`
#[derive(Debug, Serialize)]
pub struct ExecuteScript<'a> {
    pub script: &'a str,
    pub args: Vec<Value>,
}

/// Build the `capabilities` object for a new session
pub fn capabilities(browser: BrowserKind, headless: bool, viewport: Viewport) -> Value {
    let window = format!("--window-size={},{}", viewport.width, viewport.height);
    let always_match = match browser {
        BrowserKind::Chrome => {
            let mut args = vec![window, "--disable-gpu".to_string()];
            if headless {
                args.push("--headless=new".to_string());
            }
            json!({
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            })
        }
        BrowserKind::Firefox => {
            let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
            json!({
                "browserName": "firefox",
                "moz:firefoxOptions": { "args": args }
            })
        }
    };
    json!({ "capabilities": { "alwaysMatch": always_match } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_ref_wire_format() {
        let value = json!([{ ELEMENT_KEY: "abc-123" }]);
        let refs: Vec<ElementRef> = serde_json::from_value(value).unwrap();
        assert_eq!(refs, vec![ElementRef { id: "abc-123".to_string() }]);
    }

    #[test]
    fn test_error_body() {
        let body: Envelope<ErrorBody> = serde_json::from_value(json!({
            "value": {
                "error": "no such element",
                "message": "Unable to locate element",
                "stacktrace": ""
            }
        }))
        .unwrap();
        assert_eq!(body.value.error, "no such element");
        assert_eq!(body.value.message, "Unable to locate element");
    }

    #[test]
    fn test_new_session_response_keeps_only_the_id() {
        let created: Envelope<NewSessionResponse> = serde_json::from_value(json!({
            "value": {
                "sessionId": "4f2a",
                "capabilities": { "browserName": "chrome" }
            }
        }))
        .unwrap();
        assert_eq!(created.value.session_id, "4f2a");
    }

    #[test]
    fn test_chrome_headless_capabilities() {
        let caps = capabilities(BrowserKind::Chrome, true, Viewport { width: 1024, height: 768 });
        let args = &caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"];
        let args: Vec<&str> = args.as_array().unwrap().iter().filter_map(|a| a.as_str()).collect();
        assert!(args.contains(&"--headless=new"));
        assert!(args.contains(&"--window-size=1024,768"));
    }

    #[test]
    fn test_timeouts_serialize_camel_case() {
        let value = serde_json::to_value(Timeouts {
            page_load: 60_000,
            script: 30_000,
            implicit: 0,
        })
        .unwrap();
        assert_eq!(value, json!({ "pageLoad": 60000, "script": 30000, "implicit": 0 }));
    }
}
