//! MARC-8文字セットからUnicodeへの変換
//!
//! 基本ラテン（ASCII）と拡張ラテン（ANSEL）に対応する。
//! ANSELの結合文字は基底文字の前に置かれるため、基底文字の後ろへ並べ替える。
//! エスケープシーケンスで切り替えたそれ以外の文字セットの文字は
//! U+FFFDに置き換える。結果はNFCに正規化しない。

const ESC: u8 = 0x1B;
const REPLACEMENT: char = '\u{FFFD}';

/// ANSELの非結合文字
fn ansel_spacing(byte: u8) -> Option<char> {
    let c = match byte {
        0xA1 => '\u{0141}',
        0xA2 => '\u{00D8}',
        0xA3 => '\u{0110}',
        0xA4 => '\u{00DE}',
        0xA5 => '\u{00C6}',
        0xA6 => '\u{0152}',
        0xA7 => '\u{02B9}',
        0xA8 => '\u{00B7}',
        0xA9 => '\u{266D}',
        0xAA => '\u{00AE}',
        0xAB => '\u{00B1}',
        0xAC => '\u{01A0}',
        0xAD => '\u{01AF}',
        0xAE => '\u{02BC}',
        0xB0 => '\u{02BB}',
        0xB1 => '\u{0142}',
        0xB2 => '\u{00F8}',
        0xB3 => '\u{0111}',
        0xB4 => '\u{00FE}',
        0xB5 => '\u{00E6}',
        0xB6 => '\u{0153}',
        0xB7 => '\u{02BA}',
        0xB8 => '\u{0131}',
        0xB9 => '\u{00A3}',
        0xBA => '\u{00F0}',
        0xBC => '\u{01A1}',
        0xBD => '\u{01B0}',
        0xC0 => '\u{00B0}',
        0xC1 => '\u{2113}',
        0xC2 => '\u{2117}',
        0xC3 => '\u{00A9}',
        0xC4 => '\u{266F}',
        0xC5 => '\u{00BF}',
        0xC6 => '\u{00A1}',
        0xC7 => '\u{00DF}',
        0xC8 => '\u{20AC}',
        _ => return None,
    };
    Some(c)
}

/// ANSELの結合文字（ダイアクリティカルマーク）
fn ansel_combining(byte: u8) -> Option<char> {
    let c = match byte {
        0xE0 => '\u{0309}',
        0xE1 => '\u{0300}',
        0xE2 => '\u{0301}',
        0xE3 => '\u{0302}',
        0xE4 => '\u{0303}',
        0xE5 => '\u{0304}',
        0xE6 => '\u{0306}',
        0xE7 => '\u{0307}',
        0xE8 => '\u{0308}',
        0xE9 => '\u{030C}',
        0xEA => '\u{030A}',
        0xEB => '\u{FE20}',
        0xEC => '\u{FE21}',
        0xED => '\u{0315}',
        0xEE => '\u{030B}',
        0xEF => '\u{0310}',
        0xF0 => '\u{0327}',
        0xF1 => '\u{0328}',
        0xF2 => '\u{0323}',
        0xF3 => '\u{0324}',
        0xF4 => '\u{0325}',
        0xF5 => '\u{0333}',
        0xF6 => '\u{0332}',
        0xF7 => '\u{0326}',
        0xF8 => '\u{031C}',
        0xF9 => '\u{032E}',
        0xFA => '\u{FE22}',
        0xFB => '\u{FE23}',
        0xFE => '\u{0313}',
        _ => return None,
    };
    Some(c)
}

/// エスケープシーケンスを読み飛ばす
///
/// ISO 2022の形式（中間バイト0x20-0x2F、終端バイト0x30-0x7E）。
/// 戻り値は次に読む位置と、G0が基本ラテンに戻ったかどうか。
/// G1の切り替えは無視する。
fn read_escape(bytes: &[u8], start: usize) -> (usize, Option<bool>) {
    let mut pos = start + 1;
    let intermediates_from = pos;
    while pos < bytes.len() && (0x20..=0x2F).contains(&bytes[pos]) {
        pos += 1;
    }
    let intermediates = &bytes[intermediates_from..pos];
    let Some(&last) = bytes.get(pos) else {
        return (pos, None);
    };
    let next = pos + 1;

    let g0 = match (intermediates, last) {
        (b"" | b"(" | b",", b'B') | (b"", b's') => Some(true),
        (b"" | b"(" | b"," | b"$" | b"$,", _) => Some(false),
        _ => None,
    };
    (next, g0)
}

/// MARC-8のバイト列をUnicode文字列に変換する
pub fn decode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut pending_marks: Vec<char> = Vec::new();
    let mut basic_latin = true;
    let mut pos = 0;

    while pos < bytes.len() {
        let byte = bytes[pos];
        if byte == ESC {
            let (next, g0) = read_escape(bytes, pos);
            if let Some(g0) = g0 {
                basic_latin = g0;
            }
            pos = next;
            continue;
        }
        pos += 1;

        if let Some(mark) = ansel_combining(byte) {
            pending_marks.push(mark);
            continue;
        }

        let base = match byte {
            0x00..=0x20 => byte as char,
            0x21..=0x7E if basic_latin => byte as char,
            _ => ansel_spacing(byte).unwrap_or(REPLACEMENT),
        };
        out.push(base);
        out.extend(pending_marks.drain(..));
    }

    out.extend(pending_marks);
    out
}
