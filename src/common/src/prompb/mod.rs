//! Prometheus remote_read wire codec
//!
//! Requests and responses are protobuf messages compressed with snappy
//! (block format, not framed).

pub mod proto;

use prost::Message;

pub use proto::{
    Label, LabelMatcher, Query, QueryResult, ReadHints, ReadRequest, ReadResponse, Sample,
    TimeSeries, label_matcher,
};

/// Content type for remote_read requests and responses
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Content encoding for remote_read bodies (snappy compression)
pub const SNAPPY_CONTENT_ENCODING: &str = "snappy";

/// Errors raised while decoding or encoding remote_read bodies
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Snappy decompression failed: {0}")]
    Decompress(#[source] snap::Error),
    #[error("Snappy compression failed: {0}")]
    Compress(#[source] snap::Error),
    #[error("Protobuf decode failed: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("Protobuf encode failed: {0}")]
    Encode(#[from] prost::EncodeError),
}

/// Decode a snappy-compressed protobuf ReadRequest from raw bytes
pub fn decode_read_request(data: &[u8]) -> Result<ReadRequest, CodecError> {
    let decompressed = snap::raw::Decoder::new()
        .decompress_vec(data)
        .map_err(CodecError::Decompress)?;

    Ok(ReadRequest::decode(decompressed.as_slice())?)
}

/// Encode a ReadResponse as snappy-compressed protobuf
pub fn encode_read_response(response: &ReadResponse) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(response.encoded_len());
    response.encode(&mut buf)?;

    snap::raw::Encoder::new()
        .compress_vec(&buf)
        .map_err(CodecError::Compress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress(bytes: &[u8]) -> Vec<u8> {
        snap::raw::Encoder::new().compress_vec(bytes).unwrap()
    }

    #[test]
    fn test_decode_read_request() {
        let request = ReadRequest {
            queries: vec![Query {
                start_timestamp_ms: 1_000_000,
                end_timestamp_ms: 2_000_000,
                matchers: vec![LabelMatcher {
                    r#type: label_matcher::Type::Re as i32,
                    name: "__name__".to_string(),
                    value: "cpu.*".to_string(),
                }],
                hints: None,
            }],
            accepted_response_types: vec![],
        };

        let decoded = decode_read_request(&compress(&request.encode_to_vec())).unwrap();

        assert_eq!(decoded.queries.len(), 1);
        let query = &decoded.queries[0];
        assert_eq!(query.start_timestamp_ms, 1_000_000);
        assert_eq!(query.end_timestamp_ms, 2_000_000);
        assert_eq!(query.matchers[0].r#type(), label_matcher::Type::Re);
        assert_eq!(query.matchers[0].value, "cpu.*");
    }

    #[test]
    fn test_decode_rejects_uncompressed_body() {
        let err = decode_read_request(&[0xff; 8]).unwrap_err();
        assert!(matches!(err, CodecError::Decompress(_)));
    }

    #[test]
    fn test_decode_rejects_garbage_protobuf() {
        let err = decode_read_request(&compress(&[0xff, 0xff, 0xff])).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn test_encode_read_response() {
        let response = ReadResponse {
            results: vec![QueryResult {
                timeseries: vec![TimeSeries {
                    labels: vec![Label {
                        name: "__name__".to_string(),
                        value: "up".to_string(),
                    }],
                    samples: vec![Sample {
                        value: 1.0,
                        timestamp: 1_000,
                    }],
                }],
            }],
        };

        let encoded = encode_read_response(&response).unwrap();
        let raw = snap::raw::Decoder::new().decompress_vec(&encoded).unwrap();

        assert_eq!(ReadResponse::decode(raw.as_slice()).unwrap(), response);
    }
}
