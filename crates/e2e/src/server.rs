//! Dev server management: reuse a running instance or spawn one

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use reqwest::{Client, Url};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::wait::{poll_until, Predicate, Sample, WaitPolicy};

pub const DEFAULT_SERVER_COMMAND: &str = "task run:test";

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(500);
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Configuration for the system under test
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shell command that starts the server
    pub command: String,

    /// URL that must answer once the server is up
    pub url: Url,

    /// Working directory for the command
    pub working_dir: Option<PathBuf>,

    /// Timeout for server startup
    pub startup_timeout: Duration,

    /// Use a server that is already answering instead of spawning one
    pub reuse_existing: bool,
}

impl ServerConfig {
    /// Defaults for `url`; reuse is disabled on CI.
    pub fn new(url: Url, ci: bool) -> Self {
        Self {
            command: DEFAULT_SERVER_COMMAND.to_string(),
            url,
            working_dir: None,
            startup_timeout: Duration::from_secs(120),
            reuse_existing: !ci,
        }
    }
}

/// Statuses that mean a server is up, even if the root needs auth.
fn is_available(status: u16) -> bool {
    (200..400).contains(&status) || (400..=403).contains(&status)
}

/// Handle to the server the run talks to
pub struct ServerHandle {
    child: Option<Child>,
    url: Url,
}

impl ServerHandle {
    /// Reuse an answering server when allowed, otherwise spawn the
    /// command and wait for it to answer.
    pub async fn ensure(config: &ServerConfig) -> E2eResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(2)).build()?;

        if config.reuse_existing && is_answering(&client, &config.url).await {
            info!("Reusing server already running at {}", config.url);
            return Ok(Self {
                child: None,
                url: config.url.clone(),
            });
        }

        let mut child = spawn(config)?;
        info!("Spawned `{}` (pid: {})", config.command, child.id());

        match wait_until_answering(&client, config, &mut child).await {
            Ok(()) => {
                info!("Server is answering at {}", config.url);
                Ok(Self {
                    child: Some(child),
                    url: config.url.clone(),
                })
            }
            Err(e) => {
                terminate(&mut child);
                Err(e)
            }
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether this handle owns the process.
    pub fn is_spawned(&self) -> bool {
        self.child.is_some()
    }

    /// SIGTERM the process group, then kill. No-op for reused servers.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            info!("Stopping server (pid: {})", child.id());
            terminate(&mut child);
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn(config: &ServerConfig) -> E2eResult<Child> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(&config.command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit());
    if let Some(dir) = &config.working_dir {
        cmd.current_dir(dir);
    }

    // Own process group so the shell's children are signalled too.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    cmd.spawn()
        .map_err(|e| E2eError::ServerStartup(format!("Failed to spawn `{}`: {}", config.command, e)))
}

async fn is_answering(client: &Client, url: &Url) -> bool {
    match client.get(url.clone()).send().await {
        Ok(resp) => is_available(resp.status().as_u16()),
        Err(e) => {
            debug!("{} not answering: {}", url, e);
            false
        }
    }
}

async fn wait_until_answering(client: &Client, config: &ServerConfig, child: &mut Child) -> E2eResult<()> {
    let policy = WaitPolicy {
        timeout: config.startup_timeout,
        interval: HEALTH_POLL_INTERVAL,
        pause_first: false,
    };
    let condition = Predicate::new("an available status", |status: &u16| is_available(*status));
    let url = &config.url;
    let command = config.command.as_str();

    let result = poll_until(url.as_str(), &condition, &policy, || {
        let exited = child.try_wait();
        async move {
            match exited {
                Err(e) => return Err(E2eError::Io(e)),
                Ok(Some(status)) => {
                    return Err(E2eError::ServerStartup(format!(
                        "`{}` exited early with {}",
                        command, status
                    )))
                }
                Ok(None) => {}
            }
            let sample = match client.get(url.clone()).send().await {
                Ok(resp) => Sample::Value(resp.status().as_u16()),
                Err(e) if e.is_connect() || e.is_timeout() => Sample::Missing,
                Err(e) => {
                    warn!("Health check error: {}", e);
                    Sample::Missing
                }
            };
            Ok::<_, E2eError>(sample)
        }
    })
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if e.is_deadline() => Err(E2eError::ServerStartup(format!(
            "{} did not answer within {}s",
            url,
            config.startup_timeout.as_secs()
        ))),
        Err(e) => Err(e),
    }
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let pgid = Pid::from_raw(child.id() as i32);
        if killpg(pgid, Signal::SIGTERM).is_ok() {
            std::thread::sleep(SHUTDOWN_GRACE);
        }
        if let Ok(None) = child.try_wait() {
            let _ = killpg(pgid, Signal::SIGKILL);
        }
    }

    let _ = child.kill();
    let _ = child.wait();
}
