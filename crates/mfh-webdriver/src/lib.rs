//! [`Browser`] and [`Page`] over a WebDriver server (chromedriver or compatible).
//!
//! Every browsing context is its own WebDriver session, so contexts never share cookies or
//! DOM state.

use mfh_harvester::{async_trait, Browser, BrowserError, BrowserResult, Locator, Page};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thirtyfour::prelude::*;

const SCROLL_HEIGHT: &str = r#"
const el = document.querySelector(arguments[0]);
return el ? el.scrollHeight : null;
"#;

const SCROLL_TO: &str = r#"
const el = document.querySelector(arguments[0]);
if (!el) return false;
el.scrollTo(0, arguments[1]);
return true;
"#;

const TEXT_VISIBLE: &str = r#"
const needle = arguments[0];
for (const el of document.querySelectorAll('body *')) {
  const own = [...el.childNodes].some(n => n.nodeType === Node.TEXT_NODE && n.textContent.includes(needle));
  if (own) {
    const box = el.getBoundingClientRect();
    if (box.width > 0 && box.height > 0) return true;
  }
}
return false;
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebDriverConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Browser UI language, selectors and the end-of-list text depend on it
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            language: default_language(),
        }
    }
}

fn default_server_url() -> String {
    String::from("http://localhost:9515")
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_language() -> String {
    String::from("en-AU")
}

fn driver_error(e: WebDriverError) -> BrowserError {
    BrowserError::Driver(e.to_string())
}

#[derive(Debug, Clone)]
pub struct WebDriverBrowser {
    config: WebDriverConfig,
}

impl WebDriverBrowser {
    pub fn new(config: WebDriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    type Page = WebDriverPage;

    async fn new_page(&self) -> BrowserResult<WebDriverPage> {
        let mut caps = DesiredCapabilities::chrome();
        if self.config.headless {
            caps.set_headless().map_err(driver_error)?;
        }
        caps.add_chrome_arg(&format!(
            "--window-size={},{}",
            self.config.window_width, self.config.window_height
        ))
        .map_err(driver_error)?;
        caps.add_chrome_arg(&format!("--lang={}", self.config.language))
            .map_err(driver_error)?;

        let driver = WebDriver::new(&self.config.server_url, caps)
            .await
            .map_err(driver_error)?;
        log::debug!("Opened WebDriver session on {}", self.config.server_url);
        Ok(WebDriverPage { driver })
    }
}

pub struct WebDriverPage {
    driver: WebDriver,
}

impl WebDriverPage {
    async fn script(&self, script: &str, args: Vec<Value>) -> BrowserResult<Value> {
        let ret = self
            .driver
            .execute(script, args)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(ret.json().clone())
    }

    async fn locate(&self, target: &Locator) -> BrowserResult<WebElement> {
        let mut found = self
            .driver
            .find_all(By::Css(target.selector.as_str()))
            .await
            .map_err(driver_error)?;
        if target.index >= found.len() {
            return Err(BrowserError::NotFound(target.clone()));
        }
        let elem = found.swap_remove(target.index);
        match &target.child {
            Some(child) => elem
                .find(By::Css(child.as_str()))
                .await
                .map_err(|_| BrowserError::NotFound(target.clone())),
            None => Ok(elem),
        }
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        self.driver.goto(url).await.map_err(driver_error)
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        let found = self
            .driver
            .find_all(By::Css(selector))
            .await
            .map_err(driver_error)?;
        Ok(found.len())
    }

    async fn scroll_height(&self, selector: &str) -> BrowserResult<u64> {
        self.script(SCROLL_HEIGHT, vec![json!(selector)])
            .await?
            .as_u64()
            .ok_or_else(|| BrowserError::NotFound(Locator::first(selector)))
    }

    async fn scroll_to(&self, selector: &str, top: u64) -> BrowserResult<()> {
        let done = self
            .script(SCROLL_TO, vec![json!(selector), json!(top)])
            .await?;
        if done.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(BrowserError::NotFound(Locator::first(selector)))
        }
    }

    async fn text_visible(&self, text: &str) -> BrowserResult<bool> {
        let visible = self.script(TEXT_VISIBLE, vec![json!(text)]).await?;
        Ok(visible.as_bool().unwrap_or(false))
    }

    async fn scroll_into_view(&self, target: &Locator) -> BrowserResult<()> {
        self.locate(target)
            .await?
            .scroll_into_view()
            .await
            .map_err(driver_error)
    }

    async fn click(&self, target: &Locator) -> BrowserResult<()> {
        self.locate(target).await?.click().await.map_err(driver_error)
    }

    async fn outer_html(&self, target: &Locator) -> BrowserResult<String> {
        self.locate(target)
            .await?
            .outer_html()
            .await
            .map_err(driver_error)
    }

    async fn close(&self) -> BrowserResult<()> {
        self.driver.clone().quit().await.map_err(driver_error)
    }
}
