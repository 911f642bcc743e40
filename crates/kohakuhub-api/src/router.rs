//! Mounts every route in the REST/Git/LFS surface (spec §6) onto one
//! [`AppState`].

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{commit, git, lfs, listing, repos, resolve};
use crate::state::AppState;

/// Builds the full API router.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    let rest = Router::new()
        .route("/api/repos/create", post(repos::create_repo))
        .route("/api/repos/delete", axum::routing::delete(repos::delete_repo))
        .route("/api/{repo_type}/{namespace}/{name}", get(repos::get_repo_info))
        .route("/api/{repo_type}/{namespace}/{name}/settings", put(repos::update_repo_settings))
        .route("/api/{repo_type}/{namespace}/{name}/preupload/{revision}", post(commit::preupload))
        .route("/api/{repo_type}/{namespace}/{name}/commit/{revision}", post(commit::commit))
        .route("/api/{repo_type}/{namespace}/{name}/tree/{revision}", get(listing::tree_root))
        .route("/api/{repo_type}/{namespace}/{name}/tree/{revision}/{*path}", get(listing::tree))
        .route("/api/{repo_type}/{namespace}/{name}/paths-info/{revision}", post(listing::paths_info_handler))
        .route(
            "/{repo_type}/{namespace}/{name}/resolve/{revision}/{*path}",
            get(resolve::download).head(resolve::download_head),
        )
        .route("/{repo_type}/{namespace}/{name}/commits/{branch}", get(listing::commits))
        .route("/api/{namespace}/{name}/info/lfs/verify", post(lfs::verify))
        .route("/{namespace}/{name}/info/lfs/objects/batch", post(lfs::batch))
        .route("/{namespace}/{name}/info/refs", get(git::info_refs))
        .route("/{namespace}/{name}/git-upload-pack", post(git::upload_pack))
        .route("/{namespace}/{name}/git-receive-pack", post(git::receive_pack))
        .route("/{namespace}/{name}/HEAD", get(git::head));

    rest.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use kohakuhub_blobstore::MemoryBlobStore;
    use kohakuhub_vstore::MemoryVersionedStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let db = kohakuhub_db::Db::from_pool(sqlx::PgPool::connect_lazy("postgres://unused/unused").unwrap());
        AppState::new(
            db,
            Arc::new(MemoryVersionedStore::new()),
            Arc::new(MemoryBlobStore::new()),
            crate::state::HubConfig::default(),
        )
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = create_router(test_state());
        let response =
            app.oneshot(Request::builder().uri("/nonexistent").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
