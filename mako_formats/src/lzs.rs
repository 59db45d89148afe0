use anyhow::{ensure, Result};

const WINDOW_SIZE: usize = 0x1000;
const WINDOW_START: usize = 0xFEE;
const MIN_REFERENCE: usize = 3;

/// Decompress an LZSS payload: a u32 little-endian payload size followed by
/// control-byte groups of eight literal/reference units. References index a
/// 4 KiB circular window whose write position starts at 0xFEE, matching the
/// layout the field archives use.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    ensure!(data.len() >= 4, "LZSS payload shorter than its size prefix");
    let declared = u32::from_le_bytes(data[..4].try_into().unwrap()) as usize;
    let end = 4 + declared;
    ensure!(
        end <= data.len(),
        "LZSS size prefix {declared} exceeds available {} byte(s)",
        data.len() - 4
    );

    let mut window = [0u8; WINDOW_SIZE];
    let mut window_pos = WINDOW_START;
    let mut out = Vec::with_capacity(declared * 2);
    let mut pos = 4;

    while pos < end {
        let control = data[pos];
        pos += 1;
        for bit in 0..8 {
            if pos >= end {
                break;
            }
            if control >> bit & 1 == 1 {
                let byte = data[pos];
                pos += 1;
                window[window_pos] = byte;
                window_pos = (window_pos + 1) % WINDOW_SIZE;
                out.push(byte);
            } else {
                ensure!(
                    pos + 2 <= end,
                    "LZSS reference truncated at offset {pos}"
                );
                let low = data[pos] as usize;
                let high = data[pos + 1] as usize;
                pos += 2;
                let offset = (high & 0xF0) << 4 | low;
                let length = (high & 0x0F) + MIN_REFERENCE;
                for index in 0..length {
                    let byte = window[(offset + index) % WINDOW_SIZE];
                    window[window_pos] = byte;
                    window_pos = (window_pos + 1) % WINDOW_SIZE;
                    out.push(byte);
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_pass_through() {
        // Control byte of all literals, three bytes of payload.
        let payload = [0b0000_0111u8, b'm', b'a', b'p'];
        let mut data = (payload.len() as u32).to_le_bytes().to_vec();
        data.extend_from_slice(&payload);
        assert_eq!(decompress(&data).unwrap(), b"map");
    }

    #[test]
    fn reference_reads_back_through_the_window() {
        // Two literals then a reference at the initial write position with
        // length 3; the third copied byte re-reads the first copied byte
        // (overlap), producing "ababa".
        let payload = [
            0b0000_0011u8,
            b'a',
            b'b',
            (WINDOW_START & 0xFF) as u8,
            ((WINDOW_START >> 4) & 0xF0) as u8, // length nibble 0 -> 3
        ];
        let mut data = (payload.len() as u32).to_le_bytes().to_vec();
        data.extend_from_slice(&payload);
        assert_eq!(decompress(&data).unwrap(), b"ababa");
    }

    #[test]
    fn oversized_prefix_is_rejected() {
        let data = [0xFFu8, 0x00, 0x00, 0x00, 0x01];
        assert!(decompress(&data).is_err());
    }

    #[test]
    fn truncated_reference_is_rejected() {
        let payload = [0b0000_0000u8, 0x12];
        let mut data = (payload.len() as u32).to_le_bytes().to_vec();
        data.extend_from_slice(&payload);
        assert!(decompress(&data).is_err());
    }
}
