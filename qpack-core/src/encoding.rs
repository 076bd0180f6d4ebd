/// Convert raw file bytes to the UTF-8 stream the pack stores. UTF-16 is
/// detected by BOM and transcoded (invalid sequences are replaced); a UTF-8
/// BOM is stripped; anything else passes through unchanged, since the query
/// side tolerates non-UTF-8 bytes.
pub fn convert_to_utf8(data: Vec<u8>) -> Vec<u8> {
    if data.starts_with(&[0xef, 0xbb, 0xbf]) {
        return data[3..].to_vec();
    }
    if data.starts_with(&[0xff, 0xfe]) {
        return utf16_to_utf8(&data[2..], u16::from_le_bytes);
    }
    if data.starts_with(&[0xfe, 0xff]) {
        return utf16_to_utf8(&data[2..], u16::from_be_bytes);
    }
    data
}

fn utf16_to_utf8(data: &[u8], read_unit: fn([u8; 2]) -> u16) -> Vec<u8> {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| read_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units).into_bytes()
}
