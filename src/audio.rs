//! PCM16 helpers.

/// Sample rate of the service's `pcm16` format.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
/// Suggested duration of one appended chunk.
pub const DEFAULT_CHUNK_MS: u32 = 200;

const WAV_HEADER_LEN: usize = 44;

/// Bytes of mono PCM16 covering `ms` milliseconds at `sample_rate`.
#[must_use]
pub fn pcm16_bytes_for(ms: u32, sample_rate: u32) -> usize {
    let bytes = u64::from(ms) * u64::from(sample_rate) * 2 / 1000;
    usize::try_from(bytes).unwrap_or(usize::MAX)
}

/// Little-endian byte encoding of PCM16 samples.
#[must_use]
pub fn pcm16_from_samples(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|sample| sample.to_le_bytes()).collect()
}

/// Wrap mono PCM16 bytes in a 44-byte RIFF/WAVE header.
#[must_use]
pub fn wav_from_pcm16_mono(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    const CHANNELS: u16 = 1;
    const BITS_PER_SAMPLE: u16 = 16;
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = u32::try_from(pcm.len()).unwrap_or(u32::MAX);

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&data_len.saturating_add(36).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_at_default_rate() {
        assert_eq!(pcm16_bytes_for(DEFAULT_CHUNK_MS, DEFAULT_SAMPLE_RATE), 9_600);
        assert_eq!(pcm16_bytes_for(0, DEFAULT_SAMPLE_RATE), 0);
    }

    #[test]
    fn samples_are_little_endian() {
        assert_eq!(pcm16_from_samples(&[1, -2]), vec![0x01, 0x00, 0xFE, 0xFF]);
    }

    #[test]
    fn wav_header_layout() {
        let pcm = [0u8; 8];
        let wav = wav_from_pcm16_mono(&pcm, DEFAULT_SAMPLE_RATE);
        assert_eq!(wav.len(), 52);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 44);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 24_000);
        assert_eq!(u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]), 48_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 8);
    }
}
