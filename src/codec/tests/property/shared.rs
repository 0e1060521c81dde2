//! Shared proptest helpers for decoder property tests.

use std::ops::Range;

use bytes::BytesMut;
use proptest::{
    collection::vec,
    prelude::{Just, Strategy, any, prop_oneof},
    test_runner::{Config as ProptestConfig, RngAlgorithm, TestCaseError, TestRng, TestRunner},
};
use tokio_util::codec::Decoder;

use crate::codec::{CodecError, Frame, FrameDecoder};

pub fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}

/// Payloads biased towards the empty and single-byte boundaries.
pub fn payload_strategy(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![Just(0usize), Just(1usize), 0usize..=max_len]
        .prop_flat_map(|len| vec(any::<u8>(), len))
}

pub fn payload_sequence_strategy(
    max_len: usize,
    sequence_lengths: Range<usize>,
) -> impl Strategy<Value = Vec<Vec<u8>>> {
    vec(payload_strategy(max_len), sequence_lengths)
}

/// Feed `wire` to `decoder` in chunks of `chunk` bytes, then signal EOF.
///
/// Returns the decoded frames and the EOF outcome.
pub fn decode_chunked(
    decoder: &mut FrameDecoder,
    wire: &[u8],
    chunk: usize,
) -> Result<(Vec<Frame>, Result<(), CodecError>), TestCaseError> {
    let mut buf = BytesMut::new();
    let mut frames = Vec::new();
    for piece in wire.chunks(chunk.max(1)) {
        buf.extend_from_slice(piece);
        while let Some(frame) = decoder
            .decode(&mut buf)
            .map_err(|err| TestCaseError::fail(format!("decode failed: {err}")))?
        {
            frames.push(frame);
        }
    }
    loop {
        match decoder.decode_eof(&mut buf) {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => return Ok((frames, Ok(()))),
            Err(err) => return Ok((frames, Err(err))),
        }
    }
}
