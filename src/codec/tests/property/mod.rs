//! Generated checks for the framing properties of each partitioner.

use bytes::BytesMut;
use proptest::{
    collection::vec,
    prelude::{Strategy, any},
    prop_assert,
    prop_assert_eq,
    test_runner::TestCaseError,
};
use rstest::rstest;

use crate::{
    codec::{CodecError, EofError, FrameDecoder},
    partition::{Endianness, LengthFormat, LengthWidth, Partitioner},
};

mod shared;

use shared::{decode_chunked, deterministic_runner, payload_sequence_strategy};

#[rstest]
#[case(b"\n".as_slice(), 128)]
#[case(b"\r\n".as_slice(), 96)]
#[case(b"--8<--".as_slice(), 64)]
fn delimiter_frames_rejoin_into_the_original_stream(#[case] delimiter: &[u8], #[case] cases: u32) {
    let mut runner = deterministic_runner(cases);
    let first = delimiter[0];
    // Payload bytes never contain the delimiter's first byte, so no
    // delimiter can appear inside a payload.
    let strategy = (
        vec(
            vec(any::<u8>().prop_filter("delimiter byte", move |b| *b != first), 0..48),
            1..12,
        ),
        1usize..32,
    );

    runner
        .run(&strategy, |(payloads, chunk)| {
            let mut wire = Vec::new();
            for payload in &payloads {
                wire.extend_from_slice(payload);
                wire.extend_from_slice(delimiter);
            }

            let partitioner =
                Partitioner::delimiter(delimiter.to_vec()).expect("non-empty delimiter");
            let mut decoder = FrameDecoder::new(partitioner);
            let (frames, eof) = decode_chunked(&mut decoder, &wire, chunk)?;
            prop_assert!(eof.is_ok());
            prop_assert_eq!(frames.len(), payloads.len());

            let rejoined: Vec<u8> = frames.iter().flat_map(|f| f.data().to_vec()).collect();
            prop_assert_eq!(&rejoined, &wire);
            for (frame, payload) in frames.iter().zip(&payloads) {
                prop_assert!(frame.data().ends_with(delimiter));
                let framed_payload = frame.payload();
                prop_assert_eq!(framed_payload.as_ref(), payload.as_slice());
            }
            Ok(())
        })
        .expect("delimiter frames should rejoin into the original stream");
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(16)]
fn fixed_frames_cut_the_stream_evenly(#[case] size: usize) {
    let mut runner = deterministic_runner(96);
    let strategy = (vec(any::<u8>(), 0..256), 1usize..40);

    runner
        .run(&strategy, |(wire, chunk)| {
            let partitioner = Partitioner::fixed(size).expect("non-zero size");
            let mut decoder = FrameDecoder::new(partitioner);
            let (frames, eof) = decode_chunked(&mut decoder, &wire, chunk)?;

            let whole = wire.len() / size;
            let remainder = wire.len() % size;
            prop_assert_eq!(frames.len(), whole);
            for (index, frame) in frames.iter().enumerate() {
                prop_assert_eq!(frame.data().as_ref(), &wire[index * size..(index + 1) * size]);
            }
            match eof {
                Ok(()) => prop_assert_eq!(remainder, 0),
                Err(CodecError::Eof(EofError::TrailingData { bytes })) => {
                    prop_assert_eq!(bytes, remainder);
                }
                Err(other) => {
                    return Err(TestCaseError::fail(format!("unexpected error: {other}")));
                }
            }
            Ok(())
        })
        .expect("fixed frames should cut the stream evenly");
}

#[rstest]
#[case(Endianness::Little)]
#[case(Endianness::Big)]
fn binary_u32_payloads_round_trip(#[case] endianness: Endianness) {
    let mut runner = deterministic_runner(128);
    let strategy = (payload_sequence_strategy(300, 1..12), 1usize..64);
    let format = LengthFormat::new(LengthWidth::U32, endianness);

    runner
        .run(&strategy, |(payloads, chunk)| {
            let mut wire = BytesMut::new();
            for payload in &payloads {
                format
                    .write_len(payload.len(), &mut wire)
                    .map_err(|err| TestCaseError::fail(format!("encode failed: {err}")))?;
                wire.extend_from_slice(payload);
            }

            let mut decoder = FrameDecoder::new(Partitioner::binary(0, format));
            let (frames, eof) = decode_chunked(&mut decoder, &wire, chunk)?;
            prop_assert!(eof.is_ok());

            let recovered: Vec<Vec<u8>> = frames.iter().map(|f| f.payload().to_vec()).collect();
            prop_assert_eq!(recovered, payloads);
            Ok(())
        })
        .expect("binary payloads should round-trip");
}
