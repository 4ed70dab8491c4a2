//! Headless debug session against an adapter spawned over stdio.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, info, warn};

use sling_config::Config;
use sling_dap::transport::{pump_frames, write_frames};
use sling_dap::{
    BreakpointSpec, ChannelTransport, ClientOptions, ConsoleCategory, ConsoleOutputEntry,
    DapClient, SessionEvent, SessionState,
};

use crate::cli::Args;

/// How long the adapter gets to exit after `disconnect`.
const ADAPTER_EXIT_GRACE: Duration = Duration::from_secs(5);

pub(crate) fn client_options(config: &Config) -> ClientOptions {
    ClientOptions {
        client_id: config.client.client_id.clone(),
        client_name: config.client.client_name.clone(),
        adapter_id: config.client.adapter_id.clone(),
        locale: config.client.locale.clone(),
        request_timeout: config.request_timeout(),
    }
}

/// The `[launch]` table as JSON, with `program` replaced when given.
pub(crate) fn launch_arguments(config: &Config, program: Option<&str>) -> Result<serde_json::Value> {
    let mut args =
        serde_json::to_value(&config.launch).context("[launch] is not representable as JSON")?;
    if let (Some(program), Some(map)) = (program, args.as_object_mut()) {
        map.insert("program".into(), serde_json::Value::String(program.into()));
    }
    Ok(args)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("cannot resolve current directory")?
        .join(path))
}

/// Run one session to completion. Returns the debuggee's exit code.
pub(crate) async fn run(config: Config, args: Args) -> Result<i32> {
    let Some(command) = config.adapter.command.as_deref() else {
        bail!("no debug adapter configured; set [adapter] command in config.toml");
    };

    let mut child = Command::new(command)
        .args(&config.adapter.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn debug adapter '{command}'"))?;
    let stdin = child.stdin.take().context("could not capture adapter stdin")?;
    let stdout = child.stdout.take().context("could not capture adapter stdout")?;
    info!(command, "debug adapter started");

    let (transport, outbound) = ChannelTransport::channel();
    let client = DapClient::with_options(transport, client_options(&config));
    let mut events = client.subscribe();

    tokio::spawn(async move {
        if let Err(e) = write_frames(stdin, outbound).await {
            warn!(error = %e, "writing to debug adapter failed");
        }
    });
    tokio::spawn(pump_frames(stdout, client.clone()));

    let caps = client.initialize().await.context("initialize failed")?;
    debug!(?caps, "adapter capabilities");

    // Adapters may hold the launch response until configurationDone.
    let launch = {
        let client = client.clone();
        let arguments = launch_arguments(&config, args.program.as_deref())?;
        tokio::spawn(async move { client.launch(arguments).await })
    };

    if !wait_for_initialized(&mut events).await {
        bail!("debug adapter ended the session before it was initialized");
    }

    for bp in &args.breakpoints {
        client
            .add_breakpoint(BreakpointSpec::new(absolute(&bp.file)?, bp.line))
            .await;
    }
    let files = client.session().await.breakpoints().files();
    for file in files {
        for bp in client
            .set_breakpoints_for_file(&file)
            .await
            .with_context(|| format!("setBreakpoints failed for {}", file.display()))?
        {
            let status = if bp.verified { "verified" } else { "pending" };
            println!("breakpoint {}:{} {status}", file.display(), bp.line);
        }
    }
    if caps.supports_configuration_done_request {
        client
            .configuration_done()
            .await
            .context("configurationDone failed")?;
    }
    launch
        .await
        .context("launch task panicked")?
        .context("launch failed")?;

    let exit_code = drive(&client, &mut events).await;

    if !client.is_closed().await {
        if let Err(e) = client.disconnect(Some(true)).await {
            debug!(error = %e, "disconnect failed");
        }
    }
    match tokio::time::timeout(ADAPTER_EXIT_GRACE, child.wait()).await {
        Ok(status) => debug!(?status, "debug adapter exited"),
        Err(_) => {
            warn!("debug adapter did not exit; killing it");
            let _ = child.kill().await;
        }
    }
    Ok(exit_code)
}

async fn wait_for_initialized(events: &mut Receiver<SessionEvent>) -> bool {
    loop {
        match events.recv().await {
            Ok(SessionEvent::StateChanged(SessionState::Running)) => return true,
            Ok(SessionEvent::Output(entry)) => print_output(&entry),
            Ok(SessionEvent::Terminated | SessionEvent::Disconnected) => return false,
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => warn!(skipped = n, "session events lagged"),
            Err(RecvError::Closed) => return false,
        }
    }
}

/// Print events until the session ends, continuing after every stop.
async fn drive(client: &DapClient, events: &mut Receiver<SessionEvent>) -> i32 {
    let mut exit_code = 0;
    loop {
        match events.recv().await {
            Ok(SessionEvent::Stopped { reason, thread_id }) => {
                let thread_id = match thread_id {
                    Some(id) => id,
                    None => match client.session().await.current_thread_id() {
                        Some(id) => id,
                        None => match client.threads().await {
                            Ok(threads) if !threads.is_empty() => threads[0].id,
                            _ => {
                                warn!("stopped without a known thread");
                                continue;
                            }
                        },
                    },
                };
                report_stop(client, &reason, thread_id).await;
                if let Err(e) = client.continue_(thread_id).await {
                    eprintln!("sling: continue failed: {e}");
                }
            }
            Ok(SessionEvent::Output(entry)) => print_output(&entry),
            Ok(SessionEvent::Exited(code)) => {
                println!("debuggee exited with code {code}");
                exit_code = i32::try_from(code).unwrap_or(1);
            }
            Ok(SessionEvent::Terminated) | Ok(SessionEvent::Disconnected) => break,
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => warn!(skipped = n, "session events lagged"),
            Err(RecvError::Closed) => break,
        }
    }
    exit_code
}

async fn report_stop(client: &DapClient, reason: &str, thread_id: i64) {
    match client.stack_trace(thread_id, Some(0), Some(1)).await {
        Ok(frames) => match frames.first() {
            Some(frame) => {
                let location = frame
                    .source
                    .as_ref()
                    .and_then(|s| s.path.as_deref().or(s.name.as_deref()))
                    .unwrap_or("<unknown>");
                println!(
                    "stopped ({reason}) thread {thread_id} in {} at {location}:{}",
                    frame.name, frame.line
                );
            }
            None => println!("stopped ({reason}) thread {thread_id}"),
        },
        Err(e) => {
            println!("stopped ({reason}) thread {thread_id}");
            warn!(error = %e, "stackTrace failed");
        }
    }
}

fn print_output(entry: &ConsoleOutputEntry) {
    match entry.category {
        ConsoleCategory::Stderr => eprint!("{}", entry.text),
        ConsoleCategory::Stdout | ConsoleCategory::Console => print!("{}", entry.text),
    }
}
