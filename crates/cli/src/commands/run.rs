//! The `run` command: launch the external tool, embed its window, and keep
//! the session alive until the tool exits or the user interrupts.

use std::path::PathBuf;

use anyhow::Context;
use opcon_embed::EmbedConfig;

pub struct RunOptions {
    pub exe: Option<PathBuf>,
    pub container: String,
    pub host_window: Option<String>,
    pub title: Option<String>,
    pub keywords: Vec<String>,
    pub config: Option<PathBuf>,
    pub no_manual: bool,
}

/// Merges the optional config file with flag overrides; flags win.
pub fn resolve_config(opts: &RunOptions) -> anyhow::Result<EmbedConfig> {
    let mut config = match &opts.config {
        Some(path) => EmbedConfig::from_file(path).with_context(|| format!("reading {}", path.display()))?,
        None => EmbedConfig::default(),
    };

    if let Some(exe) = &opts.exe {
        config.executable = exe.clone();
    }
    if let Some(title) = &opts.title {
        config.target_title = title.clone();
    }
    if !opts.keywords.is_empty() {
        config.title_keywords = opts.keywords.clone();
    }

    if config.executable.as_os_str().is_empty() {
        anyhow::bail!("no executable given (use --exe or a config file)");
    }
    if config.target_title.is_empty() && config.title_keywords.is_empty() {
        anyhow::bail!("no window identification given (use --title or --keyword)");
    }
    Ok(config)
}

#[cfg(windows)]
pub async fn execute(opts: RunOptions) -> anyhow::Result<()> {
    use std::sync::Arc;
    use std::time::Duration;

    use opcon_embed::window_system::win32::Win32WindowSystem;
    use opcon_embed::{EmbedderError, EmbeddingSession, HandleHostSurface, SessionState, TracingSink, WindowHandle, WindowSystem};

    use crate::cli::parse_handle;
    use crate::picker::StdinPicker;

    let config = resolve_config(&opts)?;
    let container = WindowHandle(parse_handle(&opts.container)?);
    let host_window = match &opts.host_window {
        Some(text) => WindowHandle(parse_handle(text)?),
        None => container,
    };

    let ws: Arc<dyn WindowSystem> = Arc::new(Win32WindowSystem::new());
    let host = Arc::new(HandleHostSurface::new(Arc::clone(&ws), container, host_window));
    let session = EmbeddingSession::new(config, ws, host, Arc::new(TracingSink));

    session.launch().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.teardown().await;
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => match session.state() {
                SessionState::TimedOut => {
                    if opts.no_manual {
                        let attempts = session.poll_attempts();
                        session.teardown().await;
                        return Err(EmbedderError::DiscoveryTimeout { attempts }.into());
                    }
                    if !session.select_manually(&StdinPicker).await? {
                        break;
                    }
                }
                // The session rests in idle once the tool exits or embedding
                // is abandoned.
                SessionState::Idle => break,
                _ => {}
            },
        }
    }
    Ok(())
}

#[cfg(not(windows))]
pub async fn execute(opts: RunOptions) -> anyhow::Result<()> {
    let _ = resolve_config(&opts)?;
    anyhow::bail!("window embedding requires Windows")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RunOptions {
        RunOptions {
            exe: Some(PathBuf::from("C:/tools/master.exe")),
            container: "100".to_string(),
            host_window: Some("200".to_string()),
            title: Some("Item List".to_string()),
            keywords: Vec::new(),
            config: None,
            no_manual: false,
        }
    }

    #[test]
    fn flags_alone_are_enough() {
        let config = resolve_config(&options()).unwrap();
        assert_eq!(config.executable, PathBuf::from("C:/tools/master.exe"));
        assert_eq!(config.target_title, "Item List");
        assert_eq!(config.poll_limit, 30);
    }

    #[test]
    fn flags_override_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embed.json");
        std::fs::write(
            &path,
            r#"{ "executable": "C:/other.exe", "target_title": "Other", "poll_limit": 5 }"#,
        )
        .unwrap();

        let mut opts = options();
        opts.config = Some(path);
        let config = resolve_config(&opts).unwrap();
        assert_eq!(config.executable, PathBuf::from("C:/tools/master.exe"));
        assert_eq!(config.target_title, "Item List");
        assert_eq!(config.poll_limit, 5);
    }

    #[test]
    fn missing_executable_is_rejected() {
        let mut opts = options();
        opts.exe = None;
        assert!(resolve_config(&opts).is_err());
    }

    #[test]
    fn missing_identification_is_rejected() {
        let mut opts = options();
        opts.title = None;
        assert!(resolve_config(&opts).is_err());
    }
}
