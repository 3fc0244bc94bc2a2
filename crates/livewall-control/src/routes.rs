//! Request dispatch for the control plane.

use std::io::Read;
use std::path::{Component, Path, PathBuf};

use livewall_ipc::EngineCommand;
use serde_json::json;
use tiny_http::{Header, Method, Request, Response, StatusCode};
use tracing::{info, warn};

use crate::mime::content_type_for;
use crate::server::ControlContext;

/// Paths that skip token auth so external tools can drive the engine
/// and discover its port.
pub const PUBLIC_PATHS: [&str; 4] = ["/", "/reload", "/quit", "/port"];

pub(crate) fn handle(request: Request, ctx: &ControlContext, port: u16) {
    let path = match request.url().split('?').next() {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => "/".to_string(),
    };

    if *request.method() == Method::Options {
        respond(request, preflight_response());
        return;
    }

    if !PUBLIC_PATHS.contains(&path.as_str()) && !authorized(&request, ctx) {
        let addr = request
            .remote_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        warn!(%addr, %path, "forbidden request, bad or missing auth token");
        respond(request, text_response(403, "Forbidden: Invalid Auth Token"));
        return;
    }

    match *request.method() {
        Method::Get => handle_get(request, ctx, &path, port),
        Method::Post => handle_post(request, ctx, &path),
        _ => respond(request, text_response(405, "Method Not Allowed")),
    }
}

fn handle_get(request: Request, ctx: &ControlContext, path: &str, port: u16) {
    match path {
        "/" => {
            let resolved = livewall_config::resolve(&ctx.store, &ctx.paths);
            serve_file(request, &resolved.root_document, Some("text/html"), true);
        }
        "/port" => {
            let body = json!({ "http_port": port }).to_string();
            respond(request, json_response(200, body, true));
        }
        "/reload" => {
            info!("reload requested, scheduling engine restart");
            ctx.flags.request_restart();
            let _ = ctx.commands.send(EngineCommand::Reload);
            respond(request, text_response(200, "Restarting application..."));
        }
        "/quit" => {
            info!("quit requested");
            let _ = ctx.commands.send(EngineCommand::Quit);
            respond(request, text_response(200, "Quitting..."));
        }
        "/pause" => {
            let _ = ctx.commands.send(EngineCommand::Pause);
            respond(request, text_response(200, "Paused"));
        }
        "/resume" => {
            let _ = ctx.commands.send(EngineCommand::Resume);
            respond(request, text_response(200, "Resumed"));
        }
        "/config" => {
            let theme = ctx.store.load().active_theme;
            serve_file(request, &ctx.paths.manifest(&theme), Some("application/json"), true);
        }
        "/widget.json" => {
            let theme = ctx.store.load().active_theme;
            serve_file(request, &ctx.paths.widget_layout(&theme), Some("application/json"), true);
        }
        "/app_config.json" => match ctx.store.raw_bytes() {
            Ok(bytes) => respond(request, data_response(200, bytes, "application/json", true)),
            Err(err) => {
                warn!(%err, "app config unreadable");
                respond(request, text_response(404, "app config not found"));
            }
        },
        "/model" => {
            let resolved = livewall_config::resolve(&ctx.store, &ctx.paths);
            match resolved.manifest.model_file.as_deref() {
                Some(name) => {
                    let file = resolved.theme_dir.join(name);
                    serve_file(request, &file, Some("model/gltf-binary"), false);
                }
                None => respond(request, text_response(404, "no model file configured")),
            }
        }
        _ => {
            let Some(relative) = sanitize(path) else {
                respond(request, text_response(404, "Not Found"));
                return;
            };
            let engine_bundled = path.starts_with("/build/")
                || path.starts_with("/library/")
                || path.starts_with("/hdr/");
            let file = if engine_bundled {
                ctx.paths.root().join(relative)
            } else {
                let theme = ctx.store.load().active_theme;
                ctx.paths.theme_dir(&theme).join(relative)
            };
            serve_file(request, &file, None, false);
        }
    }
}

fn handle_post(mut request: Request, ctx: &ControlContext, path: &str) {
    if path != "/save_widget_positions" {
        respond(request, text_response(404, "Not Found"));
        return;
    }
    let mut body = Vec::new();
    if let Err(err) = request.as_reader().read_to_end(&mut body) {
        warn!(%err, "failed to read widget layout body");
        respond(request, text_response(500, "Error reading body"));
        return;
    }
    let theme = ctx.store.load().active_theme;
    let target = ctx.paths.widget_layout(&theme);
    match livewall_config::write_widget_layout(&target, &body) {
        Ok(()) => {
            info!(path = %target.display(), "widget layout saved");
            respond(request, json_response(200, json!({"status": "success"}).to_string(), false));
        }
        Err(err) => {
            warn!(%err, "failed to persist widget layout");
            respond(request, text_response(500, "Error saving positions"));
        }
    }
}

fn authorized(request: &Request, ctx: &ControlContext) -> bool {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("User-Agent"))
        .map(|h| h.value.as_str() == ctx.auth_token)
        .unwrap_or(false)
}

/// Turns a request path into a relative path, refusing anything that
/// could escape the serving root.
fn sanitize(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let candidate = PathBuf::from(trimmed);
    for component in candidate.components() {
        match component {
            Component::Normal(_) => {}
            _ => return None,
        }
    }
    Some(candidate)
}

fn serve_file(request: Request, file: &Path, content_type: Option<&str>, no_store: bool) {
    match std::fs::read(file) {
        Ok(bytes) => {
            let mime = content_type.unwrap_or_else(|| content_type_for(file));
            respond(request, data_response(200, bytes, mime, no_store));
        }
        Err(_) => {
            respond(
                request,
                text_response(404, &format!("File not found: {}", file.display())),
            );
        }
    }
}

fn respond(request: Request, response: Response<std::io::Cursor<Vec<u8>>>) {
    if let Err(err) = request.respond(response) {
        warn!(%err, "failed to write response");
    }
}

fn header(name: &[u8], value: &[u8]) -> Header {
    Header::from_bytes(name, value).unwrap()
}

fn cors_header() -> Header {
    header(b"Access-Control-Allow-Origin", b"*")
}

fn no_store_header() -> Header {
    header(b"Cache-Control", b"no-cache, no-store, must-revalidate")
}

fn data_response(
    status: u16,
    bytes: Vec<u8>,
    content_type: &str,
    no_store: bool,
) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_data(bytes)
        .with_status_code(StatusCode(status))
        .with_header(header(b"Content-Type", content_type.as_bytes()))
        .with_header(cors_header());
    if no_store {
        response = response.with_header(no_store_header());
    }
    response
}

fn json_response(status: u16, body: String, no_store: bool) -> Response<std::io::Cursor<Vec<u8>>> {
    data_response(status, body.into_bytes(), "application/json", no_store)
}

fn text_response(status: u16, body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    data_response(status, body.as_bytes().to_vec(), "text/plain", false)
}

fn preflight_response() -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_data(Vec::new())
        .with_status_code(StatusCode(204))
        .with_header(cors_header())
        .with_header(header(b"Access-Control-Allow-Methods", b"GET, POST, OPTIONS"))
        .with_header(header(b"Access-Control-Allow-Headers", b"Content-Type, User-Agent"))
}

#[cfg(test)]
mod tests {
    use std::io::{Read as _, Write as _};
    use std::net::TcpStream;
    use std::sync::Arc;

    use crossbeam_channel::Receiver;
    use livewall_config::{ConfigStore, EnginePaths};
    use livewall_ipc::{command_channel, EngineCommand, SessionFlags};
    use tempfile::TempDir;

    use super::*;
    use crate::server::ControlServer;

    const TOKEN: &str = "sekrit-token-for-tests";

    struct Fixture {
        _root: TempDir,
        server: ControlServer,
        flags: Arc<SessionFlags>,
        commands: Receiver<EngineCommand>,
        theme_dir: PathBuf,
    }

    fn fixture(manifest: &str) -> Fixture {
        let root = TempDir::new().unwrap();
        let theme_dir = root.path().join("wallpapers").join("defolt");
        std::fs::create_dir_all(&theme_dir).unwrap();
        std::fs::write(theme_dir.join("config.json"), manifest).unwrap();
        std::fs::write(theme_dir.join("widget.json"), br#"{"clock":{"x":1}}"#).unwrap();
        std::fs::write(theme_dir.join("index.html"), b"<html>theme</html>").unwrap();
        std::fs::write(root.path().join("index.html"), b"<html>engine</html>").unwrap();
        std::fs::write(
            root.path().join("app_config.json"),
            br#"{"active_theme": "defolt", "port": 60600}"#,
        )
        .unwrap();

        let paths = EnginePaths::new(root.path());
        let store = ConfigStore::new(paths.app_config());
        let flags = Arc::new(SessionFlags::default());
        let (tx, rx) = command_channel();
        let ctx = Arc::new(ControlContext {
            auth_token: TOKEN.to_string(),
            paths,
            store,
            commands: tx,
            flags: Arc::clone(&flags),
        });
        let server = ControlServer::bind(0, ctx).unwrap();
        Fixture {
            _root: root,
            server,
            flags,
            commands: rx,
            theme_dir,
        }
    }

    fn request(port: u16, raw: &str) -> (u16, String) {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.write_all(raw.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        let status = response
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        (status, response)
    }

    fn get(port: u16, path: &str, token: Option<&str>) -> (u16, String) {
        let ua = token
            .map(|t| format!("User-Agent: {t}\r\n"))
            .unwrap_or_default();
        request(
            port,
            &format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1\r\n{ua}Connection: close\r\n\r\n"),
        )
    }

    #[test]
    fn port_endpoint_is_public_and_exact() {
        let fx = fixture("{}");
        let port = fx.server.bound_port();
        let (status, body) = get(port, "/port", None);
        assert_eq!(status, 200);
        assert!(body.contains(&format!("\"http_port\":{port}")));
        assert!(body.contains("no-store"));
    }

    #[test]
    fn secured_path_without_token_is_forbidden() {
        let fx = fixture("{}");
        let (status, _) = get(fx.server.bound_port(), "/config", None);
        assert_eq!(status, 403);
        assert!(!fx.flags.is_restarting());
    }

    #[test]
    fn manifest_served_verbatim_with_token() {
        let manifest = r#"{"renderMode": "video", "mediaFile": "loop.mp4"}"#;
        let fx = fixture(manifest);
        let (status, body) = get(fx.server.bound_port(), "/config", Some(TOKEN));
        assert_eq!(status, 200);
        assert!(body.contains("loop.mp4"));
        assert!(body.contains("no-store"));
    }

    #[test]
    fn root_serves_theme_entry_in_html_mode() {
        let fx = fixture(r#"{"renderMode": "html", "htmlEntryFile": "index.html"}"#);
        let (status, body) = get(fx.server.bound_port(), "/", None);
        assert_eq!(status, 200);
        assert!(body.contains("<html>theme</html>"));
    }

    #[test]
    fn root_serves_engine_page_in_scene_mode() {
        let fx = fixture(r#"{"renderMode": "scene"}"#);
        let (status, body) = get(fx.server.bound_port(), "/", None);
        assert_eq!(status, 200);
        assert!(body.contains("<html>engine</html>"));
    }

    #[test]
    fn reload_sets_restart_flag_and_notifies_ui() {
        let fx = fixture("{}");
        let (status, _) = get(fx.server.bound_port(), "/reload", None);
        assert_eq!(status, 200);
        assert!(fx.flags.is_restarting());
        assert_eq!(fx.commands.recv().unwrap(), EngineCommand::Reload);
    }

    #[test]
    fn quit_leaves_restart_flag_clear() {
        let fx = fixture("{}");
        let (status, _) = get(fx.server.bound_port(), "/quit", None);
        assert_eq!(status, 200);
        assert!(!fx.flags.is_restarting());
        assert_eq!(fx.commands.recv().unwrap(), EngineCommand::Quit);
    }

    #[test]
    fn pause_requires_token_and_forwards_command() {
        let fx = fixture("{}");
        let (status, _) = get(fx.server.bound_port(), "/pause", None);
        assert_eq!(status, 403);
        let (status, _) = get(fx.server.bound_port(), "/pause", Some(TOKEN));
        assert_eq!(status, 200);
        assert_eq!(fx.commands.recv().unwrap(), EngineCommand::Pause);
    }

    #[test]
    fn save_widget_positions_overwrites_layout() {
        let fx = fixture("{}");
        let body = r#"{"clock":{"x":420,"y":69}}"#;
        let raw = format!(
            "POST /save_widget_positions HTTP/1.1\r\nHost: 127.0.0.1\r\nUser-Agent: {TOKEN}\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (status, response) = request(fx.server.bound_port(), &raw);
        assert_eq!(status, 200);
        assert!(response.contains("success"));
        let saved = std::fs::read_to_string(fx.theme_dir.join("widget.json")).unwrap();
        assert_eq!(saved, body);
    }

    #[test]
    fn model_endpoint_404s_without_field_or_file() {
        let fx = fixture("{}");
        let (status, _) = get(fx.server.bound_port(), "/model", Some(TOKEN));
        assert_eq!(status, 404);

        let fx = fixture(r#"{"modelFile": "missing.glb"}"#);
        let (status, _) = get(fx.server.bound_port(), "/model", Some(TOKEN));
        assert_eq!(status, 404);
    }

    #[test]
    fn model_endpoint_streams_configured_file() {
        let fx = fixture(r#"{"modelFile": "scene.glb"}"#);
        std::fs::write(fx.theme_dir.join("scene.glb"), b"binary-scene-bytes").unwrap();
        let (status, body) = get(fx.server.bound_port(), "/model", Some(TOKEN));
        assert_eq!(status, 200);
        assert!(body.contains("model/gltf-binary"));
        assert!(body.contains("binary-scene-bytes"));
    }

    #[test]
    fn app_config_requires_token_and_serves_shared_bytes() {
        let fx = fixture("{}");
        let (status, _) = get(fx.server.bound_port(), "/app_config.json", None);
        assert_eq!(status, 403);

        let (status, body) = get(fx.server.bound_port(), "/app_config.json", Some(TOKEN));
        assert_eq!(status, 200);
        assert!(body.contains(r#""active_theme": "defolt""#));
        assert!(body.contains("no-store"));
    }

    #[test]
    fn traversal_is_rejected() {
        let fx = fixture("{}");
        let (status, _) = get(fx.server.bound_port(), "/../app_config.json", Some(TOKEN));
        assert_eq!(status, 404);
    }

    #[test]
    fn theme_asset_passthrough_sets_mime() {
        let fx = fixture("{}");
        std::fs::write(fx.theme_dir.join("style.css"), b"body{}").unwrap();
        let (status, body) = get(fx.server.bound_port(), "/style.css", Some(TOKEN));
        assert_eq!(status, 200);
        assert!(body.contains("text/css"));
    }

    #[test]
    fn preflight_allows_any_origin() {
        let fx = fixture("{}");
        let raw = "OPTIONS /config HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n";
        let (status, response) = request(fx.server.bound_port(), raw);
        assert_eq!(status, 204);
        assert!(response.contains("Access-Control-Allow-Origin: *"));
    }
}
