use crate::{CoreError, FrameBatch, FrameRecord, decode_frame_data, tests::frames::jpeg_data_url};

use serde_json::json;

/// WHAT: Data URL payload decodes to the original bytes
/// WHY: Saved files must be byte-identical to what the sender encoded
#[test]
#[allow(clippy::unwrap_used)]
fn given_jpeg_data_url_when_decoding_then_original_bytes_returned() {
    // Given: JPEG magic bytes wrapped in a data URL
    let bytes = [0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];
    let data = jpeg_data_url(&bytes);

    // When: Decoding
    let decoded = decode_frame_data(&data).unwrap();

    // Then: Bytes match
    assert_eq!(decoded, bytes);
}

/// WHAT: Data without a comma is rejected
/// WHY: A missing data-URL prefix means the sender sent something else
#[test]
fn given_bare_base64_when_decoding_then_decode_error() {
    // Given: Base64 with no data-URL prefix
    let data = "/9j/4AAQ";

    // When: Decoding
    let result = decode_frame_data(data);

    // Then: DecodeWrite error
    assert!(matches!(result, Err(CoreError::DecodeWrite { .. })));
}

/// WHAT: Invalid base64 after the prefix is rejected
/// WHY: Corrupt frames must fail the batch, not write garbage
#[test]
#[allow(clippy::unwrap_used)]
fn given_invalid_base64_when_decoding_then_decode_error() {
    // Given: A prefix followed by non-base64 text
    let data = "data:image/jpeg;base64,@@not-base64@@";

    // When: Decoding
    let result = decode_frame_data(data);

    // Then: DecodeWrite error mentioning base64
    let err = result.unwrap_err();
    assert!(matches!(err, CoreError::DecodeWrite { .. }));
    assert!(err.reason().contains("base64"));
}

/// WHAT: Batch JSON uses camelCase metadata and accepts numeric ids
/// WHY: Wire format produced by browser senders
#[test]
#[allow(clippy::unwrap_used)]
fn given_sender_json_when_deserializing_then_batch_fields_populated() {
    // Given: A request body as sent by the browser
    let body = json!({
        "frames": [
            { "id": 1710417660001_i64, "timestamp": 1710417660001_i64, "data": "data:image/jpeg;base64,AAEC" },
            { "id": "abc", "data": "data:image/jpeg;base64,AwQF" }
        ],
        "metadata": {
            "totalFrames": 2,
            "timestamp": 1710417660500_i64,
            "resolution": { "width": 1280, "height": 720 }
        }
    });

    // When: Deserializing
    let batch: FrameBatch = serde_json::from_value(body).unwrap();

    // Then: Fields populated, ids usable for file names
    assert_eq!(batch.frames.len(), 2);
    assert_eq!(batch.metadata.total_frames, 2);
    assert_eq!(batch.metadata.resolution.width, 1280);
    assert_eq!(batch.frames[0].file_id().unwrap(), "1710417660001");
    assert_eq!(batch.frames[1].file_id().unwrap(), "abc");
    assert!(batch.frames[1].timestamp.is_null());
}

/// WHAT: Ids that could escape the frames directory are rejected
/// WHY: File names are built from sender-controlled ids
#[test]
fn given_unsafe_ids_when_building_file_id_then_rejected() {
    for id in [json!("../etc"), json!("a/b"), json!("a\\b"), json!(""), json!(null), json!({})] {
        // Given: A frame with an unsafe id
        let frame = FrameRecord {
            id: id.clone(),
            timestamp: json!(0),
            data: String::new(),
        };

        // When: Building the file id
        let result = frame.file_id();

        // Then: DecodeWrite error
        assert!(
            matches!(result, Err(CoreError::DecodeWrite { .. })),
            "expected rejection for {id}"
        );
    }
}

/// WHAT: Captured JPEGs become records the receiver can store
/// WHY: The batch sender and the receiver share one wire format
#[test]
#[allow(clippy::unwrap_used)]
fn given_captured_jpeg_when_building_record_then_data_url_and_millisecond_id() {
    // Given: JPEG bytes captured at a known instant
    let at = crate::tests::support::utc(2024, 3, 14, 12, 1, 0);
    let bytes = [0xff, 0xd8, 0xff, 0xd9];

    // When: Building the record and a batch around it
    let record = FrameRecord::jpeg(&bytes, at);
    let batch = FrameBatch::new(
        vec![record.clone()],
        crate::Resolution {
            width: 640,
            height: 480,
        },
        at,
    );

    // Then: Data URL decodes back, id is the epoch millis, metadata counts the frame
    assert!(record.data.starts_with("data:image/jpeg;base64,"));
    assert_eq!(decode_frame_data(&record.data).unwrap(), bytes);
    assert_eq!(record.file_id().unwrap(), at.timestamp_millis().to_string());
    assert_eq!(batch.metadata.total_frames, 1);
    assert_eq!(batch.metadata.timestamp, at.timestamp_millis());
}
