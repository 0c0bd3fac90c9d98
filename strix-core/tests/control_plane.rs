//! Control-plane calls over real HTTP against a loopback host.

use std::net::TcpListener;
use std::sync::Arc;
use std::thread::JoinHandle;

use tiny_http::{Header, Response, Server, StatusCode};

use strix_core::control::{ReqwestTransport, Url};
use strix_core::{ControlPlaneClient, NOT_SESSION_OWNER, RequestLogLevel, StrixError, VersionQuad};

/// Answer each request with the next canned `(status, body)`, returning
/// the `METHOD /path?query` of every request seen.
fn serve(replies: Vec<(u16, &'static str)>) -> (Url, JoinHandle<Vec<String>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let base = Url::parse(&format!("http://{addr}/")).unwrap();

    let handle = std::thread::spawn(move || {
        let content_type = Header::from_bytes("Content-Type", "text/xml").unwrap();
        let mut seen = Vec::new();
        for (status, body) in replies {
            let request = server.recv().unwrap();
            seen.push(format!("{} {}", request.method(), request.url()));

            let response = Response::from_string(body)
                .with_status_code(StatusCode(status))
                .with_header(content_type.clone());
            request.respond(response).unwrap();
        }
        seen
    });
    (base, handle)
}

fn client(base: &Url) -> ControlPlaneClient {
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    ControlPlaneClient::with_transport("127.0.0.1", base.clone(), base.clone(), "0123456789ABCDEF", transport)
}

const SERVER_INFO: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<root status_code="200">
  <hostname>den-pc</hostname>
  <appversion>7.1.431.0</appversion>
  <GfeVersion>3.23.0.74</GfeVersion>
  <ServerCodecModeSupport>259</ServerCodecModeSupport>
  <state>SUNSHINE_SERVER_BUSY</state>
  <currentgame>881448767</currentgame>
  <SupportedDisplayMode>
    <DisplayMode><Width>3840</Width><Height>2160</Height><RefreshRate>60</RefreshRate></DisplayMode>
    <DisplayMode><Width>1920</Width><Height>1080</Height><RefreshRate>120</RefreshRate></DisplayMode>
  </SupportedDisplayMode>
</root>"#;

#[test]
fn server_info_round_trip() {
    let (base, server) = serve(vec![(200, SERVER_INFO)]);
    let info = client(&base).get_server_info(RequestLogLevel::Verbose).unwrap();

    assert_eq!(info.hostname, "den-pc");
    assert_eq!(info.app_version, VersionQuad::Known([7, 1, 431, 0]));
    assert_eq!(info.current_game, 881448767);
    assert!(info.supports_hevc());
    assert!(info.supports_4k_at(60));
    assert_eq!(info.best_display_mode().map(|m| m.width), Some(3840));

    let seen = server.join().unwrap();
    assert!(seen[0].starts_with("GET /serverinfo?uniqueid=0123456789ABCDEF&uuid="));
}

#[test]
fn unauthorized_secure_request_retries_plain() {
    let (base, server) = serve(vec![
        (200, r#"<root status_code="401" status_message="The client is not authorized. Certificate verification failed."/>"#),
        (200, SERVER_INFO),
    ]);
    assert!(client(&base).get_server_info(RequestLogLevel::Error).is_ok());
    assert_eq!(server.join().unwrap().len(), 2);
}

#[test]
fn quit_from_another_client_is_rejected() {
    let (base, server) = serve(vec![(200, r#"<root status_code="200"/>"#), (200, SERVER_INFO)]);

    let err = client(&base).quit_app().unwrap_err();
    assert_eq!(err.status_code(), Some(NOT_SESSION_OWNER));

    let seen = server.join().unwrap();
    assert!(seen[0].starts_with("GET /cancel?"));
    assert!(seen[1].starts_with("GET /serverinfo?"));
}

#[test]
fn bare_http_error_keeps_status() {
    let (base, server) = serve(vec![(404, "not found")]);
    let err = client(&base).get_app_list().unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    server.join().unwrap();
}

#[test]
fn unreachable_host_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
    drop(listener);

    let err = client(&base).get_server_info(RequestLogLevel::Silent).unwrap_err();
    assert!(matches!(err, StrixError::Transport(_)));
}
