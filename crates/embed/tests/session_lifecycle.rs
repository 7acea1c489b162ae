//! End-to-end state machine coverage over the fake window system, with
//! throwaway shell scripts standing in for the external tool.

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use opcon_embed::window_system::fake::FakeWindowSystem;
use opcon_embed::{
	DiagLevel, EmbedConfig, EmbedderError, EmbeddingSession, HandleHostSurface, MemorySink, SessionState, Size, WindowHandle, WindowPicker,
	WindowSystem,
};

struct Fixture {
	session: EmbeddingSession,
	sink: Arc<MemorySink>,
	ws: FakeWindowSystem,
	container: WindowHandle,
	host_window: WindowHandle,
	_dir: tempfile::TempDir,
}

fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
	use std::os::unix::fs::PermissionsExt;

	let path = dir.path().join(name);
	std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
	std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
	path
}

/// Builds a session around `script` with a container sized 800x600. Script
/// names must be unique per test: teardown sweeps processes by name.
fn fixture(script_name: &str, script_body: &str, tune: impl FnOnce(&mut EmbedConfig)) -> Fixture {
	let dir = tempfile::tempdir().unwrap();
	let script = write_script(&dir, script_name, script_body);

	let mut config = EmbedConfig {
		executable: script,
		target_title: "Item List".to_string(),
		title_keywords: vec!["Target".to_string()],
		kill_settle_ms: 10,
		..EmbedConfig::default()
	};
	tune(&mut config);

	let ws = FakeWindowSystem::new();
	let container = ws.add_window("Container");
	let host_window = ws.add_window("Host Shell");
	ws.set_client_size(container, Size::new(800, 600));

	let ws_arc: Arc<dyn WindowSystem> = Arc::new(ws.clone());
	let host = Arc::new(HandleHostSurface::new(Arc::clone(&ws_arc), container, host_window));
	let sink = Arc::new(MemorySink::new());
	let session = EmbeddingSession::new(config, ws_arc, host, sink.clone());

	Fixture {
		session,
		sink,
		ws,
		container,
		host_window,
		_dir: dir,
	}
}

async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
	for _ in 0..500 {
		if cond() {
			return;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("timed out waiting for: {what}");
}

struct TitlePicker(&'static str);

impl WindowPicker for TitlePicker {
	fn pick(&self, titles: &[String]) -> Option<usize> {
		titles.iter().position(|t| t == self.0)
	}
}

struct DecliningPicker;

impl WindowPicker for DecliningPicker {
	fn pick(&self, _titles: &[String]) -> Option<usize> {
		None
	}
}

#[tokio::test]
async fn immediate_exit_surfaces_launch_error_and_rests_idle() {
	// Real clock: the script has to actually exit inside the grace period.
	let f = fixture("lc-exits", "echo boom 1>&2\nexit 1", |c| {
		c.launch_grace_ms = 400;
	});

	let err = f.session.launch().await.unwrap_err();
	let text = err.to_string();
	assert!(text.contains("launch failed"), "unexpected error: {text}");
	assert_eq!(f.session.state(), SessionState::Idle);

	let records = f.sink.records();
	let last = records.last().unwrap();
	assert_eq!(last.level, DiagLevel::Error);
	assert!(last.message.contains("boom"), "diagnostic was: {}", last.message);
}

#[tokio::test(start_paused = true)]
async fn discovery_times_out_after_the_configured_budget() {
	let f = fixture("lc-timeout", "sleep 60", |_| {});

	f.session.launch().await.unwrap();
	assert_eq!(f.session.state(), SessionState::Polling);

	// 30 fruitless ticks, timeout on the 31st.
	tokio::time::sleep(Duration::from_millis(31_500)).await;

	assert_eq!(f.session.state(), SessionState::TimedOut);
	assert_eq!(f.session.poll_attempts(), 31);

	let timeouts = f
		.sink
		.records()
		.iter()
		.filter(|r| r.message.contains("manual selection available"))
		.count();
	assert_eq!(timeouts, 1, "timed-out must be entered exactly once");

	f.session.teardown().await;
	assert_eq!(f.session.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn matching_window_is_embedded_and_resynced() {
	let f = fixture("lc-embed", "sleep 60", |_| {});
	let target = f.ws.add_window("Target App");

	f.session.launch().await.unwrap();
	tokio::time::sleep(Duration::from_millis(1100)).await;

	assert_eq!(f.session.state(), SessionState::Embedded);
	assert_eq!(f.ws.parent_of(target), Some(f.container));
	assert!(f.ws.chrome_stripped(target));
	assert_eq!(f.ws.placements().first(), Some(&(target, Size::new(800, 600))));

	// Delayed post-embed resync fires ~250ms later.
	tokio::time::sleep(Duration::from_millis(300)).await;
	assert_eq!(f.session.last_synced_size(), Some(Size::new(800, 600)));

	f.session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_embed_is_retried_on_the_next_tick() {
	let f = fixture("lc-retry", "sleep 60", |_| {});
	f.ws.add_window("Target App");
	f.ws.set_fail_reparent(true);

	f.session.launch().await.unwrap();
	tokio::time::sleep(Duration::from_millis(2_500)).await;
	assert_eq!(f.session.state(), SessionState::Polling);
	assert!(f.sink.records().iter().any(|r| r.message.contains("reparent-rejected")));

	f.ws.set_fail_reparent(false);
	tokio::time::sleep(Duration::from_millis(1_100)).await;
	assert_eq!(f.session.state(), SessionState::Embedded);

	f.session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn reentrant_launch_is_a_noop() {
	let f = fixture("lc-reenter", "sleep 60", |_| {});

	f.session.launch().await.unwrap();
	assert_eq!(f.session.state(), SessionState::Polling);

	// A second launch while polling must not restart anything.
	f.session.launch().await.unwrap();
	assert_eq!(f.session.state(), SessionState::Polling);
	let launches = f.sink.records().iter().filter(|r| r.message.starts_with("launching")).count();
	assert_eq!(launches, 1);

	f.session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_selection_embeds_the_chosen_window() {
	let f = fixture("lc-manual", "sleep 60", |c| {
		c.poll_limit = 2;
		c.title_keywords = vec!["ZZZ-no-such".to_string()];
		c.target_title = "ZZZ-no-such".to_string();
	});
	f.ws.add_window("Notepad");
	let target = f.ws.add_window("Target App");
	f.ws.add_window("Calculator");

	f.session.launch().await.unwrap();
	tokio::time::sleep(Duration::from_millis(3_500)).await;
	assert_eq!(f.session.state(), SessionState::TimedOut);

	let embedded = f.session.select_manually(&TitlePicker("Target App")).await.unwrap();
	assert!(embedded);
	assert_eq!(f.session.state(), SessionState::Embedded);
	assert_eq!(f.ws.parent_of(target), Some(f.container));

	f.session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn teardown_during_launch_grace_is_a_quiet_cancel() {
	let f = fixture("lc-cancel", "sleep 60", |_| {});

	let session = f.session.clone();
	let launch = tokio::spawn(async move { session.launch().await });

	// Land the teardown inside the 2s launch grace.
	tokio::time::sleep(Duration::from_millis(100)).await;
	f.session.teardown().await;

	launch.await.unwrap().unwrap();
	assert_eq!(f.session.state(), SessionState::Idle);
	assert!(
		f.sink.records().iter().all(|r| r.level != DiagLevel::Error),
		"a cancelled launch must not report a failure: {:?}",
		f.sink.records()
	);
}

#[tokio::test(start_paused = true)]
async fn empty_manual_selection_surfaces_discovery_timeout() {
	let f = fixture("lc-nowin", "sleep 60", |c| {
		c.poll_limit = 1;
		c.target_title = "ZZZ-no-such".to_string();
		c.title_keywords.clear();
	});
	f.ws.set_visible(f.container, false);
	f.ws.set_visible(f.host_window, false);

	f.session.launch().await.unwrap();
	tokio::time::sleep(Duration::from_millis(2_500)).await;
	assert_eq!(f.session.state(), SessionState::TimedOut);

	let err = f.session.select_manually(&DecliningPicker).await.unwrap_err();
	match err {
		EmbedderError::DiscoveryTimeout { attempts } => assert_eq!(attempts, 2),
		other => panic!("expected DiscoveryTimeout, got {other:?}"),
	}
	assert_eq!(f.session.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn declined_manual_selection_tears_down_to_idle() {
	let f = fixture("lc-decline", "sleep 60", |c| {
		c.poll_limit = 2;
		c.target_title = "ZZZ-no-such".to_string();
		c.title_keywords.clear();
	});

	f.session.launch().await.unwrap();
	tokio::time::sleep(Duration::from_millis(3_500)).await;
	assert_eq!(f.session.state(), SessionState::TimedOut);

	let embedded = f.session.select_manually(&DecliningPicker).await.unwrap();
	assert!(!embedded);
	assert_eq!(f.session.state(), SessionState::Idle);
	assert_eq!(f.session.poll_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn teardown_after_embed_is_idempotent() {
	let f = fixture("lc-teardown", "sleep 60", |_| {});
	let target = f.ws.add_window("Target App");

	f.session.launch().await.unwrap();
	tokio::time::sleep(Duration::from_millis(1_100)).await;
	assert_eq!(f.session.state(), SessionState::Embedded);

	f.session.teardown().await;
	assert_eq!(f.session.state(), SessionState::Idle);
	assert_eq!(f.session.poll_attempts(), 0);
	assert_eq!(f.session.last_synced_size(), None);
	assert!(!f.ws.is_visible(target), "teardown closes the foreign window");

	let records_after_first = f.sink.records().len();
	f.session.teardown().await;
	assert_eq!(f.session.state(), SessionState::Idle);
	assert_eq!(f.sink.records().len(), records_after_first, "second teardown emits nothing");
}

#[tokio::test]
async fn foreign_process_death_while_embedded_returns_to_idle() {
	// Real clock: a short-lived process dies underneath the session.
	let f = fixture("lc-dies", "sleep 1", |c| {
		c.launch_grace_ms = 100;
		c.poll_interval_ms = 50;
	});
	f.ws.add_window("Target App");

	f.session.launch().await.unwrap();
	wait_until("embed", || f.session.state() == SessionState::Embedded).await;

	wait_until("death detection", || f.session.state() == SessionState::Idle).await;

	let deaths = f
		.sink
		.records()
		.iter()
		.filter(|r| r.message.contains("foreign process exited"))
		.count();
	assert_eq!(deaths, 1, "death must emit exactly one diagnostic record");
	assert!(!f.session.is_embedded());
}

#[tokio::test(start_paused = true)]
async fn detach_to_foreground_keeps_the_session_embedded() {
	let f = fixture("lc-detach", "sleep 60", |_| {});
	f.ws.add_window("Target App");

	f.session.launch().await.unwrap();
	tokio::time::sleep(Duration::from_millis(1_100)).await;
	assert_eq!(f.session.state(), SessionState::Embedded);

	f.session.detach_to_foreground().unwrap();
	assert_eq!(f.session.state(), SessionState::Embedded);
	assert!(
		f.ws.calls()
			.iter()
			.any(|c| matches!(c, opcon_embed::window_system::fake::WindowCall::Maximize(_)))
	);

	f.session.teardown().await;
}
