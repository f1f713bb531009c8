//! Application routes
//!
//! Home page, favicon, random image, comments, secondary page and the
//! archive download. Every failure is answered here; nothing propagates
//! past the request.

use crate::catalog::{image_mime_type, ImageCatalog};
use crate::config::{AppConfig, DownloadConfig};
use crate::store::CommentStore;
use crate::{Error, Request, Response, ResponseBuilder, Result, StatusCode};
use bytes::Bytes;
use std::path::PathBuf;

const IMAGE_CHUNK_SIZE: usize = 64 * 1024;

/// State behind the application routes
pub struct Gallery {
    home_page: Bytes,
    secondary_page: PathBuf,
    favicon: PathBuf,
    catalog: ImageCatalog,
    comments: CommentStore,
    download: DownloadConfig,
}

impl Gallery {
    /// Load the home page, comment store and image catalog from `config`.
    pub fn load(config: &AppConfig) -> Result<Self> {
        let home_page = std::fs::read(&config.home_page).map_err(|source| Error::Template {
            path: config.home_page.clone(),
            source,
        })?;

        Ok(Self::new(
            Bytes::from(home_page),
            config,
            ImageCatalog::scan(&config.image_dirs)?,
            CommentStore::load(&config.comments_file)?,
        ))
    }

    pub fn new(
        home_page: Bytes,
        config: &AppConfig,
        catalog: ImageCatalog,
        comments: CommentStore,
    ) -> Self {
        Self {
            home_page,
            secondary_page: config.secondary_page.clone(),
            favicon: config.favicon.clone(),
            catalog,
            comments,
            download: config.download.clone(),
        }
    }

    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    pub fn comments(&self) -> &CommentStore {
        &self.comments
    }

    /// `GET /`
    pub fn home(&self) -> Response {
        Response::html(self.home_page.clone())
    }

    /// `GET /favicon.ico`
    pub async fn favicon(&self) -> Response {
        match tokio::fs::read(&self.favicon).await {
            Ok(bytes) => ResponseBuilder::new(StatusCode::OK)
                .header("Content-Type", "image/x-icon")
                .body(bytes)
                .build(),
            Err(_) => Response::not_found("Favicon not found"),
        }
    }

    /// `GET /random_image`
    pub async fn random_image(&self) -> Response {
        let Some(path) = self.catalog.choose() else {
            return Response::not_found("No images found");
        };

        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "cannot open image");
                return Response::internal_error("Error serving image");
            }
        };

        let mut builder = ResponseBuilder::new(StatusCode::OK)
            .header("Content-Type", image_mime_type(path))
            .header("X-Image-Path", path.to_string_lossy());
        if let Ok(meta) = file.metadata().await {
            builder = builder.header("Content-Length", meta.len().to_string());
        }

        tracing::info!(path = %path.display(), "serving image");
        builder.file(file, IMAGE_CHUNK_SIZE).build()
    }

    /// `GET /get_comments?image_path=P`
    pub fn get_comments(&self, req: &Request) -> Response {
        let comments = match req.query_param("image_path") {
            Some(image) => self.comments.get(&image),
            None => Vec::new(),
        };

        match serde_json::to_vec(&comments) {
            Ok(body) => Response::json(body),
            Err(e) => {
                tracing::error!(error = %e, "cannot encode comments");
                Response::internal_error("Error reading comments")
            }
        }
    }

    /// `POST /add_comment`
    pub fn add_comment(&self, req: &Request) -> Response {
        let image = req.form_param("image_path").filter(|v| !v.is_empty());
        let comment = req.form_param("comment").filter(|v| !v.is_empty());

        let (Some(image), Some(comment)) = (image, comment) else {
            return Response::bad_request("Bad Request");
        };

        match self.comments.add(&image, &comment) {
            Ok(()) => Response::json(r#"{"status":"success"}"#),
            Err(e) => {
                tracing::error!(image = %image, error = %e, "failed to save comment");
                Response::internal_error("Error saving comment")
            }
        }
    }

    /// `GET /minecraft`, read from disk on every request
    pub async fn secondary_page(&self) -> Response {
        match tokio::fs::read(&self.secondary_page).await {
            Ok(bytes) => Response::html(bytes),
            Err(_) => Response::not_found("Page not found"),
        }
    }

    /// `GET /download_modpack`
    pub async fn download(&self) -> Response {
        let file = match tokio::fs::File::open(&self.download.path).await {
            Ok(file) => file,
            Err(_) => return Response::not_found("Modpack not found"),
        };

        let len = match file.metadata().await {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::error!(path = %self.download.path.display(), error = %e, "cannot stat download");
                return Response::internal_error("Error serving download");
            }
        };

        ResponseBuilder::new(StatusCode::OK)
            .header("Content-Type", self.download.content_type.clone())
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.download.file_name),
            )
            .header("Content-Length", len.to_string())
            .file(file, self.download.chunk_size)
            .build()
    }
}
