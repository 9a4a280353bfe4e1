//! Headless Chromium as the rendering surface.

use std::path::Path;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use chromiumoxide::page::ScreenshotParams;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::surface::{RenderSurface, SurfaceLauncher};
use crate::config::PipelineConfig;

#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumLauncher;

pub struct ChromiumSurface {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    closed: bool,
}

#[async_trait]
impl SurfaceLauncher for ChromiumLauncher {
    type Surface = ChromiumSurface;

    async fn launch(&self, config: &PipelineConfig) -> anyhow::Result<ChromiumSurface> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(config.width, config.height)
            .viewport(Viewport {
                width: config.width,
                height: config.height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .arg("--disable-setuid-sandbox")
            .arg("--hide-scrollbars")
            .arg("--allow-file-access-from-files");
        if let Some(exe) = &config.browser_executable {
            builder = builder.chrome_executable(exe);
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow!("invalid browser configuration: {e}"))?;

        info!("Launching headless browser ({}x{})", config.width, config.height);
        let (browser, mut events) = Browser::launch(browser_config)
            .await
            .context("failed to launch headless browser")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!("browser handler stopped: {e}");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let mut browser = browser;
                if let Some(Err(kill)) = browser.kill().await {
                    warn!("failed to kill browser after page error: {kill}");
                }
                handler.abort();
                return Err(anyhow::Error::new(e).context("failed to open browser page"));
            }
        };

        Ok(ChromiumSurface {
            browser,
            page,
            handler,
            closed: false,
        })
    }
}

async fn eval(page: &Page, expression: String) -> anyhow::Result<()> {
    let params = EvaluateParams::builder()
        .expression(expression)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|e| anyhow!("invalid evaluate params: {e}"))?;
    page.evaluate_expression(params).await?;
    Ok(())
}

#[async_trait]
impl RenderSurface for ChromiumSurface {
    async fn load(&mut self, url: &str) -> anyhow::Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("failed to load template {url}"))?;
        Ok(())
    }

    async fn set_timeline(&mut self, timeline_json: &str) -> anyhow::Result<()> {
        eval(&self.page, format!("window.setSubtitles({timeline_json})"))
            .await
            .context("failed to inject caption timeline")
    }

    async fn seek(&mut self, seconds: f64) -> anyhow::Result<()> {
        eval(&self.page, format!("window.seek({seconds})")).await
    }

    async fn capture(&mut self, path: &Path) -> anyhow::Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .save_screenshot(params, path)
            .await
            .with_context(|| format!("screenshot to {} failed", path.display()))?;
        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.browser.close().await.context("graceful browser close failed")?;
        self.browser.wait().await.context("browser did not exit")?;
        self.closed = true;
        self.handler.abort();
        debug!("Headless browser released");
        Ok(())
    }

    async fn kill(&mut self) -> anyhow::Result<()> {
        self.closed = true;
        let result = match self.browser.kill().await {
            Some(Err(e)) => Err(anyhow::Error::new(e).context("failed to kill browser")),
            _ => Ok(()),
        };
        self.handler.abort();
        debug!("Headless browser killed");
        result
    }
}

impl Drop for ChromiumSurface {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
