use qpack_core::encoding::convert_to_utf8;

#[test]
fn utf8_passes_through_unchanged() {
    let data = b"fn main() {}\n".to_vec();
    assert_eq!(convert_to_utf8(data.clone()), data);
}

#[test]
fn utf8_bom_is_stripped() {
    let mut data = vec![0xef, 0xbb, 0xbf];
    data.extend_from_slice(b"hello");
    assert_eq!(convert_to_utf8(data), b"hello");
}

#[test]
fn utf16_le_is_transcoded() {
    let mut data = vec![0xff, 0xfe];
    for unit in "ok\n".encode_utf16() {
        data.extend_from_slice(&unit.to_le_bytes());
    }
    assert_eq!(convert_to_utf8(data), b"ok\n");
}

#[test]
fn utf16_be_is_transcoded() {
    let mut data = vec![0xfe, 0xff];
    for unit in "höhe".encode_utf16() {
        data.extend_from_slice(&unit.to_be_bytes());
    }
    assert_eq!(convert_to_utf8(data), "höhe".as_bytes());
}

#[test]
fn arbitrary_bytes_are_preserved() {
    let data = vec![0x00, 0x7f, 0x80, 0xfd];
    assert_eq!(convert_to_utf8(data.clone()), data);
}
