// Unit tests for capture options and the audioData payload encoding.

use microphone_stream::{AudioData, CaptureOptions, Config};

#[test]
fn test_capture_options_default() {
    let options = CaptureOptions::default();

    assert_eq!(options.sample_rate, 44100, "Default should be 44.1kHz");
    assert_eq!(options.channels_per_frame, 1, "Default should be mono");
    assert_eq!(options.bits_per_channel, 16, "Default should be 16-bit PCM");
    assert_eq!(options.buffer_size, 8192, "Default chunk should be 8192 samples");
    assert_eq!(options.device, None, "Default device is the system default");
}

#[test]
fn test_channel_layout_coercion() {
    let mut options = CaptureOptions::default();

    options.channels_per_frame = 1;
    assert_eq!(options.channel_layout(), 1);

    options.channels_per_frame = 2;
    assert_eq!(options.channel_layout(), 2);

    // Every other case falls back to mono.
    options.channels_per_frame = 0;
    assert_eq!(options.channel_layout(), 1);
    options.channels_per_frame = 3;
    assert_eq!(options.channel_layout(), 1);
}

#[test]
fn test_bit_depth_coercion() {
    let mut options = CaptureOptions::default();

    options.bits_per_channel = 16;
    assert_eq!(options.bit_depth(), 16);

    options.bits_per_channel = 8;
    assert_eq!(options.bit_depth(), 8);

    // Only 8-bit and 16-bit PCM are supported.
    options.bits_per_channel = 24;
    assert_eq!(options.bit_depth(), 16);
    options.bits_per_channel = 12;
    assert_eq!(options.bit_depth(), 16);
}

#[test]
fn test_partial_options_fill_defaults() {
    let options: CaptureOptions = serde_json::from_str(r#"{"sample_rate": 16000}"#).unwrap();

    assert_eq!(options.sample_rate, 16000);
    assert_eq!(options.channels_per_frame, 1);
    assert_eq!(options.bits_per_channel, 16);
    assert_eq!(options.buffer_size, 8192);
    assert_eq!(options.device, None);
}

#[test]
fn test_audio_data_serialization() {
    let event = AudioData::from_samples(&[100, -200, 300, -400], 16000, 1, 16, 5);

    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"data\":"));
    assert!(json.contains("\"sample_rate\":16000"));
    assert!(json.contains("\"sequence\":5"));

    let deserialized: AudioData = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, event);
}

#[test]
fn test_pcm_encoding_roundtrip_16_bit() {
    let original_samples: Vec<i16> = vec![100, -200, 300, -400];

    let event = AudioData::from_samples(&original_samples, 16000, 1, 16, 0);

    let bytes = event.pcm_bytes().unwrap();
    assert_eq!(bytes.len(), original_samples.len() * 2, "16-bit: two bytes per sample");

    let decoded = event.samples().unwrap();
    assert_eq!(decoded, original_samples);
}

#[test]
fn test_pcm_encoding_roundtrip_8_bit() {
    // 8-bit encoding keeps only the high byte, so multiples of 256 survive
    // the round trip exactly.
    let original_samples: Vec<i16> = vec![0, 256, -256, 32512, -32768];

    let event = AudioData::from_samples(&original_samples, 16000, 1, 8, 0);

    let bytes = event.pcm_bytes().unwrap();
    assert_eq!(bytes.len(), original_samples.len(), "8-bit: one byte per sample");

    let decoded = event.samples().unwrap();
    assert_eq!(decoded, original_samples);
}

#[test]
fn test_audio_data_carries_format() {
    let event = AudioData::from_samples(&[0i16; 10], 48000, 2, 8, 3);

    assert_eq!(event.sample_rate, 48000);
    assert_eq!(event.channels, 2);
    assert_eq!(event.bits_per_channel, 8);
    assert_eq!(event.sequence, 3);
    assert!(!event.timestamp.is_empty());
}

#[test]
fn test_config_load_missing_file_uses_defaults() {
    let cfg = Config::load("this-config-does-not-exist").unwrap();

    assert_eq!(cfg.service.name, "microphone-stream");
    assert_eq!(cfg.capture.sample_rate, 44100);
    assert_eq!(cfg.output.recordings_path, "recordings");
    assert_eq!(cfg.output.chunk_duration_secs, 300);
}
