use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower::Service;
use tower_http::services::ServeFile;

use common::volume::Volume;

use super::not_found_handler;

/// Serve a file from a volume's public url. Only files the connector would
/// list are handed out: no symlinked components, no hidden entries unless the
/// volume shows them, nothing outside the volume. The thumbnail cache is
/// always served.
pub async fn serve(volume: Arc<Volume>, rest: String, request: Request) -> Response {
    let lookup = {
        let volume = Arc::clone(&volume);
        tokio::task::spawn_blocking(move || servable_path(&volume, &rest))
    };

    let path = match lookup.await {
        Ok(Some(path)) => path,
        Ok(None) => {
            tracing::debug!(
                volume = %volume.id(),
                path = %request.uri().path(),
                "refused volume file"
            );
            return not_found_handler(request.uri().clone(), request.headers().clone()).await;
        }
        Err(err) => {
            tracing::error!(volume = %volume.id(), error = %err, "volume file lookup panicked");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match ServeFile::new(path).call(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

fn servable_path(volume: &Volume, rest: &str) -> Option<PathBuf> {
    let components: Vec<&str> = rest.split('/').filter(|c| !c.is_empty()).collect();
    if components.is_empty()
        || components
            .iter()
            .any(|c| matches!(*c, "." | "..") || c.contains(['\\', '\0']))
    {
        return None;
    }

    let virtual_path = format!("/{}", components.join("/"));
    let real = volume.resolve(&virtual_path).ok()?;
    let in_thumbnails = virtual_path.starts_with(&format!("{}/", volume.thumbnails_path()));

    let mut current = volume.base_dir().to_path_buf();
    for name in &components {
        current.push(name);
        let file_type = fs::symlink_metadata(&current).ok()?.file_type();
        if file_type.is_symlink() {
            return None;
        }
        if !in_thumbnails && !volume.is_visible(name, file_type) {
            return None;
        }
    }

    current.is_file().then_some(real)
}
