use crate::JpegSplitter;

fn jpeg(body: &[u8]) -> Vec<u8> {
    let mut frame = vec![0xff, 0xd8];
    frame.extend_from_slice(body);
    frame.extend_from_slice(&[0xff, 0xd9]);
    frame
}

/// WHAT: Back-to-back images in one read come out as separate frames
/// WHY: The encoder writes frames into the pipe with no framing of its own
#[test]
fn given_two_images_in_one_read_when_splitting_then_two_frames_in_order() {
    // Given: Two concatenated JPEGs
    let mut splitter = JpegSplitter::new();
    let bytes = [jpeg(b"first"), jpeg(b"second")].concat();

    // When: Pushing them at once
    let frames = splitter.push(&bytes);

    // Then: Two frames, nothing held back
    assert_eq!(frames, vec![jpeg(b"first"), jpeg(b"second")]);
    assert_eq!(splitter.pending_len(), 0);
}

/// WHAT: A frame split across reads is emitted once its end marker arrives
/// WHY: Pipe reads cut frames at arbitrary points, even inside a marker
#[test]
fn given_frame_split_inside_end_marker_when_splitting_then_emitted_after_last_part() {
    // Given: A JPEG cut between the two bytes of its end marker
    let mut splitter = JpegSplitter::new();
    let frame = jpeg(b"payload");
    let (head, tail) = frame.split_at(frame.len() - 1);

    // When: Pushing the parts separately
    let first = splitter.push(head);
    let second = splitter.push(tail);

    // Then: Nothing until the marker completes, then the whole frame
    assert!(first.is_empty());
    assert_eq!(second, vec![frame]);
}

/// WHAT: Bytes before a start marker are dropped
/// WHY: A feed may be joined mid-frame
#[test]
fn given_leading_garbage_when_splitting_then_only_whole_frames_emitted() {
    // Given: The tail of an earlier frame followed by a whole one
    let mut splitter = JpegSplitter::new();
    let bytes = [b"tail-of-previous\xff\xd9".to_vec(), jpeg(b"whole")].concat();

    // When: Pushing
    let frames = splitter.push(&bytes);

    // Then: Only the whole frame
    assert_eq!(frames, vec![jpeg(b"whole")]);
}

/// WHAT: A start marker split across reads is still found
/// WHY: Keeping a trailing 0xff avoids losing the next frame
#[test]
fn given_start_marker_split_across_reads_when_splitting_then_frame_found() {
    // Given: Garbage ending in the first byte of a start marker
    let mut splitter = JpegSplitter::new();
    let frame = jpeg(b"next");

    // When: Pushing the garbage and then the rest of the frame
    let first = splitter.push(b"noise\xff");
    let second = splitter.push(frame.get(1..).unwrap_or_default());

    // Then: The frame is emitted whole
    assert!(first.is_empty());
    assert_eq!(second, vec![frame]);
}
