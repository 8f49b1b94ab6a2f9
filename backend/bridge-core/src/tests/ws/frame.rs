// Unit tests for inbound WebSocket frame decoding

use super::encode_frame;
use crate::error::ws::WsError;
use crate::ws::frame::read_frame;
use crate::ws::{FrameHeader, FrameOpcode, LengthField};

const LIMIT: u64 = 16 * 1024 * 1024;

/// **VALUE**: Verifies all three length encodings decode to the full payload.
///
/// **WHY THIS MATTERS**: Album art URLs and long titles push messages past 125 bytes;
/// playlists can push past 64 KiB. Each size class uses a different header layout.
///
/// **BUG THIS CATCHES**: Would catch little-endian extended lengths, or the 16-bit
/// length being read for the 64-bit marker.
#[tokio::test]
async fn given_each_length_class_when_read_then_payload_intact() {
    for (len, expected_field) in [
        (10usize, LengthField::Short(10)),
        (200, LengthField::Extended16),
        (70_000, LengthField::Extended64),
    ] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let bytes = encode_frame(true, 0x2, &payload, None);

        let header = FrameHeader::parse([bytes[0], bytes[1]]).expect("header");
        let frame = read_frame(&mut bytes.as_slice(), LIMIT).await.expect("frame");

        assert_eq!(header.length_field, expected_field);
        assert_eq!(
            header.length_field.extra_bytes(),
            bytes.len() - 2 - payload.len()
        );
        assert_eq!(frame.opcode, FrameOpcode::Binary);
        assert_eq!(frame.payload, payload, "length {len}");
    }
}

/// **VALUE**: Verifies masked frames are unmasked instead of rejected.
#[tokio::test]
async fn given_masked_frame_when_read_then_unmasked() {
    let bytes = encode_frame(true, 0x1, b"{\"event\":\"x\"}", Some([0x37, 0xfa, 0x21, 0x3d]));

    let frame = read_frame(&mut bytes.as_slice(), LIMIT).await.expect("frame");

    assert_eq!(frame.payload, b"{\"event\":\"x\"}");
    assert!(frame.fin);
}

/// **VALUE**: Verifies header violations are decode errors.
///
/// **BUG THIS CATCHES**: Would catch compressed (RSV1) frames being parsed as JSON
/// garbage, and reserved opcodes being treated as data.
#[test]
fn given_reserved_bits_or_opcodes_when_parsed_then_decode_error() {
    assert!(matches!(
        FrameHeader::parse([0x80 | 0x40 | 0x1, 0x00]),
        Err(WsError::Decode { .. })
    ));
    assert!(matches!(
        FrameHeader::parse([0x80 | 0x3, 0x00]),
        Err(WsError::Decode { .. })
    ));
    assert!(matches!(
        FrameHeader::parse([0x80 | 0xB, 0x00]),
        Err(WsError::Decode { .. })
    ));
    assert!(FrameOpcode::Ping.is_control());
    assert!(!FrameOpcode::Continuation.is_control());
}

/// **VALUE**: Verifies control frames must be short and unfragmented.
#[tokio::test]
async fn given_malformed_control_frames_when_read_then_decode_error() {
    let long_ping = encode_frame(true, 0x9, &[0u8; 126], None);
    let fragmented_close = encode_frame(false, 0x8, &[], None);

    for bytes in [long_ping, fragmented_close] {
        let result = read_frame(&mut bytes.as_slice(), LIMIT).await;
        assert!(matches!(result, Err(WsError::Decode { .. })), "{result:?}");
    }
}

/// **VALUE**: Verifies oversized and high-bit lengths are refused before allocation.
///
/// **WHY THIS MATTERS**: A corrupt length would otherwise make the bridge try to
/// allocate exabytes and abort.
#[tokio::test]
async fn given_huge_lengths_when_read_then_decode_error() {
    let mut high_bit = vec![0x82, 127];
    high_bit.extend_from_slice(&(1u64 << 63).to_be_bytes());
    let over_limit = encode_frame(true, 0x2, &[0u8; 300], None);

    let high_bit_result = read_frame(&mut high_bit.as_slice(), LIMIT).await;
    let over_limit_result = read_frame(&mut over_limit.as_slice(), 200).await;

    assert!(matches!(high_bit_result, Err(WsError::Decode { .. })));
    assert!(matches!(over_limit_result, Err(WsError::Decode { .. })));
}

/// **VALUE**: Verifies a stream ending mid-frame reads as the peer closing.
#[tokio::test]
async fn given_truncated_frame_when_read_then_peer_closed() {
    let bytes = encode_frame(true, 0x1, b"{\"event\":\"discord:clear\"}", None);

    let result = read_frame(&mut &bytes[..bytes.len() - 3], LIMIT).await;

    assert!(matches!(result, Err(WsError::PeerClosed { .. })));
}
