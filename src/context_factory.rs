//! Context factory (SPEC_FULL.md §4.6): resolves the session, launches the
//! browser, assembles context parameters, and invokes the orchestrator's
//! header/script installation phases before handing back a ready page.

use std::path::PathBuf;
use std::sync::Arc;

use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::Page;
use futures::StreamExt;
use tracing::info;

use crate::error::{GateCaptureError, GateCaptureResult};
use crate::gates::GateConfig;
use crate::orchestrator::Orchestrator;
use crate::plan::{ContextParams, ProxyConfig, Size, SpoofingPlan};
use crate::resolver::{DynamicResolver, ResolvedSession};
use crate::ua::Engine;

pub struct LaunchOptions {
    pub headless: bool,
    pub proxy: Option<ProxyConfig>,
    pub accept_downloads: bool,
    pub chrome_data_dir: Option<PathBuf>,
}

/// Build `ContextParams` from a resolved `GateConfig`; shared between the
/// orchestrator (which returns it as part of the frozen `SpoofingPlan`) and the
/// context factory (which feeds it to the driver at launch).
#[must_use]
pub fn context_params_from(config: &GateConfig) -> ContextParams {
    ContextParams {
        user_agent: config.user_agent.user_agent.clone(),
        locale: config
            .user_agent
            .accept_language
            .as_deref()
            .and_then(|al| al.split(',').next())
            .unwrap_or("en-US")
            .to_string(),
        timezone_id: config
            .timezone
            .resolved_timezone_id
            .clone()
            .unwrap_or_else(|| "UTC".to_string()),
        viewport: Size { width: 1920, height: 1080 },
        screen: Size { width: 1920, height: 1080 },
        geolocation: config.geolocation.geolocation,
        proxy: None,
        ignore_tls_errors: true,
        accept_downloads: true,
    }
}

/// SPEC_FULL.md §4.6 steps 1-7. `gate_config` carries the raw, unresolved
/// selection criteria from CLI options.
pub async fn create_context(
    resolver: &DynamicResolver<'_>,
    orchestrator: &Orchestrator,
    gate_config: GateConfig,
    launch: LaunchOptions,
    resource_data: Arc<crate::capture::ResourceData>,
) -> GateCaptureResult<(Browser, Page, SpoofingPlan, ResolvedSession)> {
    let resolved = resolver.resolve(gate_config)?;
    let mut params = context_params_from(&resolved.gate_config);
    params.viewport = Size {
        width: resolved.base_profile.screen_width,
        height: resolved.base_profile.screen_height,
    };
    params.screen = params.viewport;
    params.proxy = launch.proxy.clone();
    params.accept_downloads = launch.accept_downloads;

    let chrome_path = match crate::browser_setup::find_browser_executable().await {
        Ok(path) => path,
        Err(_) => crate::browser_setup::download_managed_browser()
            .await
            .map_err(|e| GateCaptureError::ContextLaunch(e.to_string()))?,
    };
    let user_data_dir = launch
        .chrome_data_dir
        .unwrap_or_else(|| std::env::temp_dir().join(format!("gatecapture_{}", std::process::id())));
    std::fs::create_dir_all(&user_data_dir)?;

    let mut builder = BrowserConfigBuilder::default()
        .window_size(params.viewport.width, params.viewport.height)
        .user_data_dir(user_data_dir)
        .chrome_executable(chrome_path);

    builder = if launch.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    if matches!(resolved.engine, Engine::Chromium) {
        builder = builder.arg("--disable-blink-features=AutomationControlled");
    }
    if let Some(ua) = &params.user_agent {
        builder = builder.arg(format!("--user-agent={ua}"));
    }
    if let Some(proxy) = &params.proxy {
        builder = builder.arg(format!("--proxy-server={}", proxy.uri));
    }

    let config = builder
        .build()
        .map_err(|e| GateCaptureError::ContextLaunch(e.to_string()))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| GateCaptureError::ContextLaunch(e.to_string()))?;
    tokio::spawn(async move {
        while handler.next().await.is_some() {}
    });

    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| GateCaptureError::ContextLaunch(e.to_string()))?;

    if let Some(geo) = params.geolocation {
        if let Err(e) = page
            .execute(chromiumoxide::cdp::browser_protocol::emulation::SetGeolocationOverrideParams {
                latitude: Some(geo.latitude),
                longitude: Some(geo.longitude),
                accuracy: Some(geo.accuracy_meters),
            })
            .await
        {
            info!(error = %e, "geolocation override failed, JS patch still covers this surface");
        }
    }
    if let Err(e) = page
        .execute(chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams {
            timezone_id: params.timezone_id.clone(),
        })
        .await
    {
        info!(error = %e, "timezone override failed, relying on JS patch only");
    }
    if let Err(e) = page
        .execute(chromiumoxide::cdp::browser_protocol::emulation::SetLocaleOverrideParams {
            locale: Some(params.locale.clone()),
        })
        .await
    {
        info!(error = %e, "locale override failed");
    }

    let plan = orchestrator
        .install(&page, resolved.engine, resolved.gate_config.clone(), Some(resource_data))
        .await?;

    Ok((browser, page, plan, resolved))
}
