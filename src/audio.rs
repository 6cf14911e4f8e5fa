use base64::Engine;

/// Sample rate the live API expects for PCM16 audio, in Hz.
pub const LIVE_API_SAMPLE_RATE: u32 = 16_000;
/// MIME type attached to realtime audio chunks.
pub const PCM_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Encodes a slice of f32 samples into little-endian PCM16 bytes.
/// Samples outside [-1.0, 1.0] are clamped; no wraparound can occur.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let v = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decodes little-endian PCM16 bytes into f32 samples normalized to [-1.0, 1.0].
/// A trailing incomplete sample is dropped.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            (v as f32 / 32768.0).clamp(-1.0, 1.0)
        })
        .collect()
}

/// Encodes raw bytes as base64, the payload format for media chunks.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decodes a base64 media payload back into raw bytes.
/// Invalid base64 yields an empty buffer rather than an error.
pub fn decode_base64(fragment: &str) -> Vec<u8> {
    match base64::engine::general_purpose::STANDARD.decode(fragment) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::error!("Failed to decode base64 media fragment");
            Vec::new()
        }
    }
}
