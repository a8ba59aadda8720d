//! Codec Tests
//!
//! Tests for request/response framing and payload bodies.

use std::io::Cursor;
use twiniverse::protocol::{
    decode_credentials, decode_image_batch, decode_login_result, encode_credentials,
    encode_image_batch, encode_length, encode_request, encode_response, error_sentinel,
    read_frame, read_request, read_response, write_frame, write_request, write_response,
    CommandType, Credentials, LoginResult, Request, Response, ResponseShape, MAX_NAME_LEN,
};
use twiniverse::TwinError;

// =============================================================================
// Helper Functions
// =============================================================================

fn be(n: i32) -> [u8; 4] {
    n.to_be_bytes()
}

fn named_body(name_len: i32, name: &[u8], data_len: i32, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&be(name_len));
    body.extend_from_slice(name);
    body.extend_from_slice(&be(data_len));
    body.extend_from_slice(data);
    body
}

// =============================================================================
// Frame Tests
// =============================================================================

#[test]
fn test_frame_round_trip_preserves_length() {
    for len in [0usize, 1, 1023, 1024, 65_537, 1 << 20] {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();

        let mut buffer = Vec::new();
        write_frame(&mut buffer, &data).unwrap();
        assert_eq!(buffer.len(), 4 + len);

        let decoded = read_frame(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(decoded.len(), len);
        assert_eq!(decoded, data);
    }
}

#[test]
fn test_encode_length_rejects_oversized() {
    assert_eq!(encode_length(5).unwrap(), [0, 0, 0, 5]);
    let result = encode_length(i32::MAX as usize + 1);
    assert!(matches!(result, Err(TwinError::FramingViolation(_))));
}

#[test]
fn test_negative_frame_length_is_framing_violation() {
    let result = read_frame(&mut Cursor::new(be(-1).to_vec()));
    assert!(matches!(result, Err(TwinError::FramingViolation(_))));
}

#[test]
fn test_truncated_frame_is_short_read() {
    let mut bytes = be(10).to_vec();
    bytes.extend_from_slice(b"abc");

    match read_frame(&mut Cursor::new(bytes)) {
        Err(TwinError::ShortRead { expected, received }) => {
            assert_eq!(expected, 10);
            assert_eq!(received, 3);
        }
        other => panic!("Expected ShortRead, got {:?}", other),
    }
}

#[test]
fn test_truncated_length_prefix_is_short_read() {
    let result = read_frame(&mut Cursor::new(vec![0x00, 0x00]));
    assert!(matches!(result, Err(TwinError::ShortRead { .. })));
}

// =============================================================================
// Request Tests
// =============================================================================

#[test]
fn test_wire_format_request() {
    let request = Request::new(CommandType::GetByHash, b"abcd".to_vec());
    let encoded = encode_request(&request).unwrap();

    // Expected: [0x04][0x00 0x00 0x00 0x04][a b c d]
    //           cmd   payload_len(4)       payload
    assert_eq!(encoded[0], 0x04);
    assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x00, 0x04]);
    assert_eq!(&encoded[5..], b"abcd");
}

#[test]
fn test_write_request_wire_bytes() {
    let payload: Vec<u8> = (0..70_000u32).map(|i| (i % 253) as u8).collect();
    let request = Request::new(CommandType::Video, payload.clone());

    let mut buffer = Vec::new();
    write_request(&mut buffer, &request).unwrap();

    let mut expected = vec![0x03];
    expected.extend_from_slice(&70_000i32.to_be_bytes());
    expected.extend_from_slice(&payload);
    assert_eq!(buffer, expected);
    assert_eq!(encode_request(&request).unwrap(), expected);
}

#[test]
fn test_write_response_matches_encode_response() {
    let response = Response::named("m.glb", vec![9u8; 4096]);

    let mut buffer = Vec::new();
    write_response(&mut buffer, ResponseShape::NamedData, &response).unwrap();
    assert_eq!(
        buffer,
        encode_response(ResponseShape::NamedData, &response).unwrap()
    );
    assert_eq!(&buffer[..9], &[0, 0, 0, 5, b'm', b'.', b'g', b'l', b'b']);
}

#[test]
fn test_stream_write_read_request() {
    let requests = vec![
        Request::new(CommandType::Login, b"{}".to_vec()),
        Request::new(CommandType::Image, vec![0, 0, 0, 0]),
        Request::new(CommandType::Video, Vec::new()),
        Request::new(CommandType::GetByHash, b"hash".to_vec()),
    ];

    let mut buffer = Vec::new();
    for request in &requests {
        write_request(&mut buffer, request).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &requests {
        let decoded = read_request(&mut cursor, 1024).unwrap().unwrap();
        assert_eq!(&decoded, expected);
    }
    assert!(read_request(&mut cursor, 1024).unwrap().is_none());
}

#[test]
fn test_unknown_command_type() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = read_request(&mut Cursor::new(bytes.to_vec()), 1024);
    assert!(result.unwrap_err().to_string().contains("Unknown command type"));
}

#[test]
fn test_request_over_limit_rejected() {
    let bytes = [0x03, 0x00, 0x00, 0x10, 0x00];
    let result = read_request(&mut Cursor::new(bytes.to_vec()), 100);
    assert!(matches!(result, Err(TwinError::FramingViolation(_))));
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_named_response_round_trip() {
    let response = Response::named("abc.glb", b"glTF-binary".to_vec());

    let mut buffer = Vec::new();
    write_response(&mut buffer, ResponseShape::NamedData, &response).unwrap();

    let decoded = read_response(&mut Cursor::new(buffer), ResponseShape::NamedData).unwrap();
    assert_eq!(decoded, response);
}

#[test]
fn test_named_response_without_name_sends_placeholder() {
    let response = Response::data(b"x".to_vec());
    let encoded = encode_response(ResponseShape::NamedData, &response).unwrap();
    assert_eq!(encoded, named_body(8, b"NullName", 1, b"x"));
}

#[test]
fn test_zero_name_length_reads_no_name() {
    let body = named_body(0, b"", 2, b"hi");
    let decoded = read_response(&mut Cursor::new(body), ResponseShape::NamedData).unwrap();
    assert_eq!(decoded.filename, None);
    assert_eq!(decoded.data, b"hi");
}

#[test]
fn test_name_length_bound() {
    // 1024 is accepted even when the name bytes are not valid UTF-8
    let garbage = vec![0xFFu8; MAX_NAME_LEN];
    let body = named_body(1024, &garbage, 3, b"abc");
    let decoded = read_response(&mut Cursor::new(body), ResponseShape::NamedData).unwrap();
    assert_eq!(decoded.data, b"abc");
    assert!(decoded.filename.is_some());

    let body = named_body(1025, &[b'a'; 1025], 3, b"abc");
    let result = read_response(&mut Cursor::new(body), ResponseShape::NamedData);
    assert!(matches!(result, Err(TwinError::FramingViolation(_))));
}

#[test]
fn test_negative_name_length_rejected() {
    let body = named_body(-5, b"", 0, b"");
    let result = read_response(&mut Cursor::new(body), ResponseShape::NamedData);
    assert!(matches!(result, Err(TwinError::FramingViolation(_))));
}

#[test]
fn test_negative_data_length_rejected() {
    let body = named_body(3, b"abc", -1, b"");
    let result = read_response(&mut Cursor::new(body), ResponseShape::NamedData);
    assert!(matches!(result, Err(TwinError::FramingViolation(_))));
}

#[test]
fn test_wire_format_data_response() {
    let encoded = encode_response(ResponseShape::Data, &Response::data(b"hi".to_vec())).unwrap();
    assert_eq!(encoded, vec![0x00, 0x00, 0x00, 0x02, b'h', b'i']);
}

// =============================================================================
// Payload Body Tests
// =============================================================================

#[test]
fn test_image_batch_wire_format() {
    let a: Vec<u8> = vec![0xA1, 0xA2, 0xA3];
    let b: Vec<u8> = vec![0xB1, 0xB2, 0xB3, 0xB4, 0xB5];
    let payload = encode_image_batch(&[a.clone(), b.clone()]).unwrap();

    let mut expected = vec![0, 0, 0, 2, 0, 0, 0, 3];
    expected.extend_from_slice(&a);
    expected.extend_from_slice(&[0, 0, 0, 5]);
    expected.extend_from_slice(&b);
    assert_eq!(payload, expected);

    let images = decode_image_batch(&payload).unwrap();
    assert_eq!(images, vec![a, b]);
}

#[test]
fn test_image_batch_truncated() {
    let mut payload = encode_image_batch(&[vec![1u8; 10]]).unwrap();
    payload.truncate(payload.len() - 1);
    assert!(matches!(
        decode_image_batch(&payload),
        Err(TwinError::FramingViolation(_))
    ));

    // Count promises more images than the payload can hold
    assert!(decode_image_batch(&[0, 0, 0, 9]).is_err());
    assert!(decode_image_batch(&[0, 0]).is_err());
}

#[test]
fn test_credentials_use_short_field_names() {
    let body = encode_credentials(&Credentials::new("alice", "pw")).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["u"], "alice");
    assert_eq!(value["p"], "pw");

    let decoded = decode_credentials(&body).unwrap();
    assert_eq!(decoded.username, "alice");
}

#[test]
fn test_decode_login_result() {
    assert_eq!(
        decode_login_result(b"[false, true]").unwrap(),
        LoginResult::rejected()
    );
    assert_eq!(
        decode_login_result(b"[true,true]").unwrap(),
        LoginResult::accepted()
    );

    let bad_bodies: [&[u8]; 5] = [
        b"[true]",
        b"[true,true,true]",
        b"{\"a\":1}",
        b"not json",
        b"",
    ];
    for bad in bad_bodies {
        assert!(matches!(
            decode_login_result(bad),
            Err(TwinError::Decode(_))
        ));
    }
}

// =============================================================================
// Error Sentinel Tests
// =============================================================================

#[test]
fn test_error_sentinel_threshold() {
    let mut short = b"ERROR_NOTFOUND".to_vec();
    short.resize(1023, b' ');
    assert_eq!(error_sentinel(&short), Some("ERROR_NOTFOUND".to_string()));

    let mut at_threshold = b"ERROR_NOTFOUND".to_vec();
    at_threshold.resize(1024, b' ');
    assert_eq!(error_sentinel(&at_threshold), None);

    let mut long = b"ERROR_NOTFOUND".to_vec();
    long.resize(2000, 0x00);
    assert_eq!(error_sentinel(&long), None);
}

#[test]
fn test_error_sentinel_requires_prefix() {
    assert_eq!(error_sentinel(b"glTF\x02\x00\x00\x00"), None);
    assert_eq!(error_sentinel(b"error_lowercase"), None);
    assert_eq!(error_sentinel(b""), None);
    assert_eq!(
        error_sentinel(b"ERROR_HASH_NOT_FOUND"),
        Some("ERROR_HASH_NOT_FOUND".to_string())
    );
}
