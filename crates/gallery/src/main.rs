use anyhow::{bail, Context, Result};
use clap::Parser;
use gallery_core::{App, AppConfig, DownloadConfig, Error, GuardConfig, Server, ServerConfig};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "gallery", version, about = "Random image gallery with comments")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 80)]
    port: u16,

    /// Runtime worker threads (defaults to the number of CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Directory holding the pages, favicon and persisted files
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Folder scanned for images; repeat for several (defaults to ~/Downloads, ~/Documents, ~/Pictures)
    #[arg(long = "image-dir")]
    image_dirs: Vec<PathBuf>,

    /// Archive served by /download_modpack
    #[arg(long)]
    modpack: Option<PathBuf>,

    /// File name offered for the download
    #[arg(long)]
    download_name: Option<String>,

    /// Content type sent with the download
    #[arg(long)]
    download_type: Option<String>,

    /// Comments file, relative to --root unless absolute
    #[arg(long)]
    comments_file: Option<PathBuf>,

    /// Ban list file, relative to --root unless absolute
    #[arg(long)]
    bans_file: Option<PathBuf>,

    /// Offenses within an hour that get an address banned
    #[arg(long, default_value_t = 1)]
    strikes: usize,

    /// Minutes an offense counts towards a ban
    #[arg(long, default_value_t = 60)]
    ban_window: u64,

    /// Largest accepted request body in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    max_body_bytes: usize,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let config = ServerConfig::new().hostname(self.host.clone()).port(self.port);
        match self.workers {
            Some(workers) => config.workers(workers),
            None => config,
        }
    }

    fn app_config(&self) -> AppConfig {
        let guard = GuardConfig::default()
            .strikes(self.strikes)
            .window(Duration::from_secs(self.ban_window * 60));
        let mut config = AppConfig::new()
            .guard(guard)
            .max_body_bytes(self.max_body_bytes);

        if let Some(path) = &self.comments_file {
            config = config.comments_file(path);
        }
        if let Some(path) = &self.bans_file {
            config = config.bans_file(path);
        }
        if !self.image_dirs.is_empty() {
            config = config.image_dirs(self.image_dirs.clone());
        }
        let mut download = match &self.modpack {
            Some(path) => DownloadConfig::new(path),
            None => DownloadConfig::default(),
        };
        if let Some(name) = &self.download_name {
            download = download.file_name(name);
        }
        if let Some(content_type) = &self.download_type {
            download = download.content_type(content_type);
        }
        config = config.download(download);

        config.rooted_at(&self.root)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let server_config = args.server_config();
    let app = App::load(args.app_config()).context("Cannot load application state")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(server_config.workers)
        .enable_all()
        .build()
        .context("Cannot start runtime")?;

    let _guard = runtime.enter();
    let server = match Server::bind(&server_config) {
        Ok(server) => server,
        Err(Error::PermissionDenied { port }) => {
            tracing::warn!(port, "permission denied, privileged port needs elevated rights");
            let port = prompt_port()?;
            Server::bind(&server_config.clone().port(port))
                .with_context(|| format!("Cannot bind port {}", port))?
        }
        Err(e) => return Err(e).context("Cannot start server"),
    };

    tracing::info!(
        addr = %server.local_addr(),
        workers = server_config.workers,
        "gallery server started"
    );
    runtime.block_on(server.run(Arc::new(app)))?;
    Ok(())
}

/// Ask on stdin for a port to use instead.
fn prompt_port() -> Result<u16> {
    print!("Enter a different port number (e.g., 8080): ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("No port given");
    }

    line.trim()
        .parse()
        .with_context(|| format!("Invalid port: {}", line.trim()))
}
