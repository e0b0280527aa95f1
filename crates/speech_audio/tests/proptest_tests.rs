//! Property-based tests for payload decoding and cache keys

use proptest::prelude::*;
use speech_audio::decoder::decode_pcm16le;
use speech_audio::{CacheKey, PcmSpec, VoiceId};

fn to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

proptest! {
    #[test]
    fn pcm_frame_count_matches_byte_length(
        channels in 1_u16..=4,
        frames in 1_usize..512,
        seed in any::<i16>(),
    ) {
        let samples: Vec<i16> = (0..frames * usize::from(channels))
            .map(|i| seed.wrapping_add(i16::try_from(i % 1000).unwrap()))
            .collect();
        let bytes = to_bytes(&samples);

        let buffer = decode_pcm16le(&bytes, PcmSpec::new(24000, channels)).unwrap();

        prop_assert_eq!(buffer.frame_count(), bytes.len() / (2 * usize::from(channels)));
        prop_assert_eq!(buffer.channel_count(), channels);
    }

    #[test]
    fn pcm_samples_are_scaled_by_32768(samples in prop::collection::vec(any::<i16>(), 1..256)) {
        let buffer = decode_pcm16le(&to_bytes(&samples), PcmSpec::new(24000, 1)).unwrap();
        let decoded = buffer.channel(0).unwrap();

        for (raw, value) in samples.iter().zip(decoded) {
            prop_assert_eq!(*value, f32::from(*raw) / 32768.0);
            prop_assert!((-1.0..1.0).contains(value));
        }
    }

    #[test]
    fn pcm_channels_are_deinterleaved_in_order(
        frames in prop::collection::vec((any::<i16>(), any::<i16>()), 1..128)
    ) {
        let interleaved: Vec<i16> = frames.iter().flat_map(|(l, r)| [*l, *r]).collect();

        let buffer = decode_pcm16le(&to_bytes(&interleaved), PcmSpec::new(24000, 2)).unwrap();

        for (i, (left, right)) in frames.iter().enumerate() {
            prop_assert_eq!(buffer.channel(0).unwrap()[i], f32::from(*left) / 32768.0);
            prop_assert_eq!(buffer.channel(1).unwrap()[i], f32::from(*right) / 32768.0);
        }
    }

    #[test]
    fn pcm_partial_frames_are_rejected(
        channels in 1_u16..=4,
        frames in 0_usize..64,
        extra in 1_usize..8,
    ) {
        let frame_bytes = 2 * usize::from(channels);
        prop_assume!(extra % frame_bytes != 0);
        let bytes = vec![0_u8; frames * frame_bytes + extra];

        prop_assert!(decode_pcm16le(&bytes, PcmSpec::new(24000, channels)).is_err());
    }

    #[test]
    fn cache_keys_differ_per_voice(text in "\\PC{1,64}") {
        let kore = CacheKey::new(&VoiceId::kore(), &text);
        let puck = CacheKey::new(&VoiceId::puck(), &text);

        prop_assert_ne!(&kore, &puck);
        prop_assert_eq!(kore, CacheKey::new(&VoiceId::kore(), &text));
    }

    #[test]
    fn voice_labels_without_separator_are_accepted(label in "[A-Za-z][A-Za-z0-9_-]{0,15}") {
        let voice = VoiceId::new(label.clone()).unwrap();
        prop_assert_eq!(voice.as_str(), label.as_str());
    }
}
