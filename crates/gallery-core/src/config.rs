//! Server and application configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    /// Runtime worker threads
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "0.0.0.0".to_string(),
            port: 80,
            workers: num_cpus::get(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// Downloadable archive served on `/download_modpack`
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Absolute location of the archive
    pub path: PathBuf,
    /// File name offered in `Content-Disposition`
    pub file_name: String,
    pub content_type: String,
    /// Read size per streamed chunk
    pub chunk_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("Documents").join("WEB").join("data").join("modpack.zip"),
            file_name: "modpack.zip".to_string(),
            content_type: "application/zip".to_string(),
            chunk_size: 64 * 1024,
        }
    }
}

impl DownloadConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Admission guard policy
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Trailing window over which offenses are counted
    pub window: Duration,
    /// In-window offenses that trigger a ban
    pub strikes: usize,
    /// Body sent to a client at the moment it gets banned
    pub ban_message: String,
    /// Body sent to an already banned client on GET/HEAD and other methods
    pub banned_get_message: String,
    /// Body sent to an already banned client on POST
    pub banned_post_message: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60 * 60),
            strikes: 1,
            ban_message: "GET LOST!".to_string(),
            banned_get_message: "GET LOST!".to_string(),
            banned_post_message: "BACK OFF!".to_string(),
        }
    }
}

impl GuardConfig {
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn strikes(mut self, strikes: usize) -> Self {
        self.strikes = strikes.max(1);
        self
    }

    pub fn messages(
        mut self,
        ban: impl Into<String>,
        banned_get: impl Into<String>,
        banned_post: impl Into<String>,
    ) -> Self {
        self.ban_message = ban.into();
        self.banned_get_message = banned_get.into();
        self.banned_post_message = banned_post.into();
        self
    }
}

/// Everything the application needs besides the listener
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Home page, loaded once at startup
    pub home_page: PathBuf,
    /// Secondary page, read on each request
    pub secondary_page: PathBuf,
    pub favicon: PathBuf,
    /// Root of the fallback static file handler
    pub static_root: PathBuf,
    pub comments_file: PathBuf,
    pub bans_file: PathBuf,
    /// Directories scanned recursively for images at startup
    pub image_dirs: Vec<PathBuf>,
    pub download: DownloadConfig,
    pub guard: GuardConfig,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let image_dirs = match dirs::home_dir() {
            Some(home) => ["Downloads", "Documents", "Pictures"]
                .iter()
                .map(|d| home.join(d))
                .collect(),
            None => Vec::new(),
        };

        Self {
            home_page: PathBuf::from("mainpage.html"),
            secondary_page: PathBuf::from("minecraft.html"),
            favicon: PathBuf::from("favicon.ico"),
            static_root: PathBuf::from("."),
            comments_file: PathBuf::from("comments.json"),
            bans_file: PathBuf::from("banned_ips.json"),
            image_dirs,
            download: DownloadConfig::default(),
            guard: GuardConfig::default(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every relative file location against `root`.
    ///
    /// The static root itself becomes `root`.
    pub fn rooted_at(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let rebase = |p: &PathBuf| if p.is_absolute() { p.clone() } else { root.join(p) };
        self.home_page = rebase(&self.home_page);
        self.secondary_page = rebase(&self.secondary_page);
        self.favicon = rebase(&self.favicon);
        self.comments_file = rebase(&self.comments_file);
        self.bans_file = rebase(&self.bans_file);
        self.static_root = root.to_path_buf();
        self
    }

    pub fn image_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.image_dirs = dirs;
        self
    }

    pub fn download(mut self, download: DownloadConfig) -> Self {
        self.download = download;
        self
    }

    pub fn guard(mut self, guard: GuardConfig) -> Self {
        self.guard = guard;
        self
    }

    pub fn comments_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.comments_file = path.into();
        self
    }

    pub fn bans_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.bans_file = path.into();
        self
    }

    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }
}
