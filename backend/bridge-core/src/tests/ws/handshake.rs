// Unit tests for the HTTP upgrade exchange

use crate::error::ws::WsError;
use crate::ws::handshake::{build_request, request_query, skip_response};

use common::RedactedToken;

use tokio::io::{AsyncReadExt, BufReader};

const RESPONSE: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
\r\n";

/// **VALUE**: Verifies the request line and headers of the upgrade request.
#[test]
fn given_credentials_when_building_request_then_all_headers_present() {
    let token = RedactedToken::new("tok");
    let query = request_query("js.neutralino.discord", &token);

    let request = build_request("127.0.0.1", 5173, &query, "dGhlIHNhbXBsZSBub25jZQ==");

    assert!(request.starts_with(
        "GET /?extensionId=js.neutralino.discord&connectToken=tok HTTP/1.1\r\n"
    ));
    assert!(request.contains("Host: 127.0.0.1:5173\r\n"));
    assert!(request.contains("Upgrade: websocket\r\n"));
    assert!(request.contains("Connection: Upgrade\r\n"));
    assert!(request.contains("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n"));
    assert!(request.contains("Sec-WebSocket-Version: 13\r\n"));
    assert!(request.ends_with("\r\n\r\n"));
}

/// **VALUE**: Verifies credentials are percent-encoded into the query.
///
/// **BUG THIS CATCHES**: Would catch a token containing `&` or `=` splitting into
/// extra parameters and failing authentication.
#[test]
fn given_reserved_characters_when_building_query_then_encoded() {
    let token = RedactedToken::new("a&b=c d");

    let query = request_query("ext/id", &token);

    assert_eq!(query, "extensionId=ext%2Fid&connectToken=a%26b%3Dc+d");
}

/// **VALUE**: Verifies the header is consumed exactly, leaving a following frame intact.
///
/// **WHY THIS MATTERS**: Servers often send the first event in the same TCP segment
/// as the 101 response. Over-reading would swallow that event.
#[tokio::test]
async fn given_response_followed_by_frame_when_skipped_then_frame_bytes_remain() {
    let mut wire = RESPONSE.to_vec();
    wire.extend_from_slice(&[0x81, 0x02, b'{', b'}']);
    let mut reader = BufReader::new(wire.as_slice());

    let head = skip_response(&mut reader, 16 * 1024).await.expect("response");
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).await.expect("rest");

    assert_eq!(head.status_line, "HTTP/1.1 101 Switching Protocols");
    assert!(head.is_switching_protocols());
    assert_eq!(head.bytes_consumed, RESPONSE.len());
    assert_eq!(rest, [0x81, 0x02, b'{', b'}']);
}

/// **VALUE**: Verifies a non-101 status is reported but not treated as an error.
#[tokio::test]
async fn given_forbidden_response_when_skipped_then_head_returned() {
    let wire = b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n";

    let head = skip_response(&mut BufReader::new(&wire[..]), 1024)
        .await
        .expect("response");

    assert!(!head.is_switching_protocols());
}

/// **VALUE**: Verifies the header byte ceiling and early EOF.
///
/// **BUG THIS CATCHES**: Would catch a peer streaming endless header lines keeping the
/// bridge in the handshake forever.
#[tokio::test]
async fn given_oversized_or_truncated_response_when_skipped_then_handshake_error() {
    let endless = b"HTTP/1.1 101 Switching Protocols\r\nX-Padding: aaaaaaaaaaaaaaaaaaaa\r\n\r\n";
    let truncated = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n";

    let too_long = skip_response(&mut BufReader::new(&endless[..]), 40).await;
    let cut_short = skip_response(&mut BufReader::new(&truncated[..]), 1024).await;

    assert!(matches!(too_long, Err(WsError::Handshake { .. })));
    assert!(matches!(cut_short, Err(WsError::Handshake { .. })));
}
