//! Audio streaming endpoint.

use actix_files::NamedFile;
use actix_web::http::header::{self, HeaderValue};
use actix_web::http::Method;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::media;
use crate::state::MusicDirResolver;

/// Path of the single content endpoint.
pub const MEDIA_PATH: &str = "/media";

/// Query string of the media endpoint.
#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    /// File to stream, as known to the UI.
    #[serde(default)]
    pub path: Option<String>,
}

/// Empty success advertising what the endpoint accepts.
fn preflight() -> HttpResponse {
    HttpResponse::NoContent()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, "Range, Content-Type"))
        .finish()
}

/// Resolve the music directories and check the requested file against them.
///
/// Resolver failures are internal errors. A missing file whose parent
/// directory lies in a music directory is not found; any other failure to
/// prove containment is a containment error.
fn authorize(resolver: &dyn MusicDirResolver, requested: &str) -> AppResult<PathBuf> {
    let dirs = resolver.music_dirs().map_err(|e| {
        tracing::error!(error = %e, "Failed to resolve music directories");
        AppError::Internal("invalid music directory".to_string())
    })?;

    let path = Path::new(requested);
    media::ensure_within(&dirs, path).map_err(|e| match e {
        AppError::Containment(_) => e,
        AppError::NotFound(_) if parent_within(&dirs, path) => {
            AppError::NotFound("file not found".to_string())
        }
        other => {
            tracing::debug!(requested = %requested, error = %other, "Unresolvable stream path");
            AppError::outside_music_dirs()
        }
    })
}

fn parent_within(dirs: &[PathBuf], path: &Path) -> bool {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| media::is_within(dirs, parent))
        .unwrap_or(false)
}

/// Stream an audio file from the music directories.
///
/// GET /media?path=<file>
///
/// Supports range requests for seeking.
pub async fn stream_media(
    req: HttpRequest,
    resolver: web::Data<dyn MusicDirResolver>,
) -> AppResult<HttpResponse> {
    match *req.method() {
        Method::OPTIONS => return Ok(preflight()),
        Method::GET => {}
        _ => return Err(AppError::MethodNotAllowed),
    }

    let requested = web::Query::<MediaQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().path)
        .filter(|p| !p.is_empty())
        .ok_or_else(AppError::path_required)?;

    let mime = media::mime_for(Path::new(&requested)).ok_or_else(AppError::unsupported_audio)?;

    let resolver = resolver.into_inner();
    let file_path = web::block(move || authorize(resolver.as_ref(), &requested))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let open_path = file_path.clone();
    let file = web::block(move || std::fs::File::open(open_path))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::from_io(e, file_path.display()))?;

    let named = NamedFile::from_file(file, &file_path)?.disable_content_disposition();

    let mut response = named.into_response(&req);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    tracing::debug!(
        path = %file_path.display(),
        status = response.status().as_u16(),
        "Streaming audio"
    );
    Ok(response)
}

/// Configure the streaming route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource(MEDIA_PATH).to(stream_media));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use std::fs;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    struct Library {
        dir: TempDir,
        music: PathBuf,
        song: String,
    }

    /// A music folder holding a 1000-byte `song.mp3`.
    fn library() -> Library {
        let dir = tempdir().unwrap();
        let music = dir.path().join("music");
        fs::create_dir(&music).unwrap();
        let music = fs::canonicalize(music).unwrap();
        let bytes: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        fs::write(music.join("song.mp3"), &bytes).unwrap();
        let song = music.join("song.mp3").to_str().unwrap().to_string();
        Library { dir, music, song }
    }

    fn resolver_for(dirs: Vec<PathBuf>) -> Arc<dyn MusicDirResolver> {
        Arc::new(move || -> AppResult<Vec<PathBuf>> { Ok(dirs.clone()) })
    }

    macro_rules! app {
        ($resolver:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::from($resolver))
                    .configure(configure),
            )
            .await
        };
    }

    fn media_uri(path: &str) -> String {
        format!("{}?path={}", MEDIA_PATH, path)
    }

    #[actix_web::test]
    async fn test_full_content() {
        let lib = library();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        let req = test::TestRequest::get().uri(&media_uri(&lib.song)).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "audio/mpeg");
        assert_eq!(resp.headers().get(header::ACCEPT_RANGES).unwrap(), "bytes");
        assert!(resp.headers().get(header::CONTENT_RANGE).is_none());
        let body = test::read_body(resp).await;
        assert_eq!(body.len(), 1000);
        assert_eq!(body[250], (250 % 251) as u8);
    }

    #[actix_web::test]
    async fn test_range_request() {
        let lib = library();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        let req = test::TestRequest::get()
            .uri(&media_uri(&lib.song))
            .insert_header((header::RANGE, "bytes=0-99"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            resp.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes 0-99/1000"
        );
        let body = test::read_body(resp).await;
        assert_eq!(body.len(), 100);
        assert_eq!(body[99], 99);
    }

    #[actix_web::test]
    async fn test_range_in_the_middle() {
        let lib = library();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        let req = test::TestRequest::get()
            .uri(&media_uri(&lib.song))
            .insert_header((header::RANGE, "bytes=900-"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            resp.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes 900-999/1000"
        );
        assert_eq!(test::read_body(resp).await.len(), 100);
    }

    #[actix_web::test]
    async fn test_unsatisfiable_range() {
        let lib = library();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        let req = test::TestRequest::get()
            .uri(&media_uri(&lib.song))
            .insert_header((header::RANGE, "bytes=5000-6000"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    }

    #[actix_web::test]
    async fn test_content_type_follows_extension() {
        let lib = library();
        fs::write(lib.music.join("track.M4A"), b"data").unwrap();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        let path = lib.music.join("track.M4A");
        let req = test::TestRequest::get()
            .uri(&media_uri(path.to_str().unwrap()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "audio/mp4");
    }

    #[actix_web::test]
    async fn test_preflight() {
        let lib = library();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri(MEDIA_PATH)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let methods = resp.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap();
        assert!(methods.to_str().unwrap().contains("GET"));
        let allowed = resp.headers().get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap();
        assert!(allowed.to_str().unwrap().contains("Range"));
    }

    #[actix_web::test]
    async fn test_method_not_allowed() {
        let lib = library();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        for method in [Method::POST, Method::PUT, Method::HEAD] {
            let req = test::TestRequest::default()
                .method(method)
                .uri(&media_uri(&lib.song))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        }
    }

    #[actix_web::test]
    async fn test_path_required() {
        let lib = library();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        for uri in [MEDIA_PATH.to_string(), format!("{}?path=", MEDIA_PATH)] {
            let req = test::TestRequest::get().uri(&uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body = test::read_body(resp).await;
            assert!(String::from_utf8_lossy(&body).contains("path is required"));
        }
    }

    #[actix_web::test]
    async fn test_unsupported_type() {
        let lib = library();
        fs::write(lib.music.join("notes.txt"), b"hi").unwrap();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        let path = lib.music.join("notes.txt");
        let req = test::TestRequest::get()
            .uri(&media_uri(path.to_str().unwrap()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&body).contains("unsupported audio type"));
    }

    #[actix_web::test]
    async fn test_resolver_failure_is_internal_error() {
        let lib = library();
        let failing: Arc<dyn MusicDirResolver> = Arc::new(|| -> AppResult<Vec<PathBuf>> {
            Err(AppError::Internal("state unreadable".to_string()))
        });
        let app = app!(failing);

        let req = test::TestRequest::get().uri(&media_uri(&lib.song)).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_traversal_forbidden() {
        let lib = library();
        fs::write(lib.dir.path().join("passwd.mp3"), b"secret").unwrap();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        let sneaky = format!("{}/../passwd.mp3", lib.music.display());
        let req = test::TestRequest::get().uri(&media_uri(&sneaky)).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = test::read_body(resp).await;
        assert!(!String::from_utf8_lossy(&body).contains("secret"));
    }

    #[actix_web::test]
    async fn test_relative_traversal_forbidden() {
        let lib = library();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        let req = test::TestRequest::get()
            .uri(&media_uri("../../etc/passwd.mp3"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[cfg(unix)]
    #[actix_web::test]
    async fn test_symlink_escape_forbidden() {
        let lib = library();
        let outside = lib.dir.path().join("outside.mp3");
        fs::write(&outside, b"secret").unwrap();
        let link = lib.music.join("link.mp3");
        std::os::unix::fs::symlink(&outside, &link).unwrap();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        let req = test::TestRequest::get()
            .uri(&media_uri(link.to_str().unwrap()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_missing_file_in_music_dir_not_found() {
        let lib = library();
        fs::create_dir(lib.music.join("album")).unwrap();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        for missing in [lib.music.join("missing.mp3"), lib.music.join("album/gone.mp3")] {
            let req = test::TestRequest::get()
                .uri(&media_uri(missing.to_str().unwrap()))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }

    #[actix_web::test]
    async fn test_missing_file_elsewhere_forbidden() {
        let lib = library();
        let app = app!(resolver_for(vec![lib.music.clone()]));

        for missing in [
            lib.dir.path().join("missing.mp3"),
            lib.music.join("no-such-dir/missing.mp3"),
        ] {
            let req = test::TestRequest::get()
                .uri(&media_uri(missing.to_str().unwrap()))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        }
    }
}
