//! ISO 2709（MARC）書誌レコードから書名を取り出す
//!
//! レコードの構造解析は`marc`クレートに任せ、ここでは文字コードの判定と
//! 書名の組み立てだけを行う。

use marc::Record;
use thiserror::Error;

use super::marc8;

/// レコードラベル（リーダー）の長さ
const LEADER_LEN: usize = 24;
/// リーダー内の文字コード指示の位置（'a'ならUCS/Unicode、それ以外はMARC-8）
const CODING_SCHEME_POS: usize = 9;
const UNICODE_CODING_SCHEME: u8 = b'a';

/// 書名タグ
const TITLE_TAG: &[u8; 3] = b"245";

/// 生の書名末尾から取り除く文字数（例: " /"）
pub const TITLE_SUFFIX_LEN: usize = 2;

/// 書誌レコードのデコードエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogRecordError {
    /// ISO 2709として解析できない
    #[error("malformed ISO 2709 record: {0}")]
    Malformed(String),

    /// Unicodeと宣言されたレコードがUTF-8として不正
    #[error("record declares Unicode but {0}")]
    Encoding(String),

    /// 245フィールドまたは$aが存在しない
    #[error("record has no title (245 $a)")]
    MissingTitle,
}

/// リーダーの文字コード指示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodingScheme {
    Unicode,
    Marc8,
}

impl CodingScheme {
    fn from_leader(data: &[u8]) -> Self {
        match data.get(CODING_SCHEME_POS) {
            Some(&UNICODE_CODING_SCHEME) => CodingScheme::Unicode,
            _ => CodingScheme::Marc8,
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<String, CatalogRecordError> {
        match self {
            CodingScheme::Unicode => std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|e| CatalogRecordError::Encoding(e.to_string())),
            CodingScheme::Marc8 => Ok(marc8::decode(bytes)),
        }
    }
}

/// 生の書名（245 $a、$bがあれば空白で連結）を取り出す
///
/// 245が繰り返される場合は最初のものを使う。
pub fn raw_title(data: &[u8]) -> Result<String, CatalogRecordError> {
    if data.len() < LEADER_LEN {
        return Err(CatalogRecordError::Malformed(format!(
            "record is shorter than the 24-byte leader ({} bytes)",
            data.len()
        )));
    }
    let coding = CodingScheme::from_leader(data);
    let record = Record::parse(data).map_err(|e| CatalogRecordError::Malformed(e.to_string()))?;

    let fields = record.field(TITLE_TAG);
    let field = fields.first().ok_or(CatalogRecordError::MissingTitle)?;
    let title_a = field
        .subfield(b'a')
        .first()
        .map(|subfield| subfield.get_data::<[u8]>().to_vec())
        .ok_or(CatalogRecordError::MissingTitle)?;

    let mut title = coding.decode(&title_a)?;
    if let Some(remainder) = field.subfield(b'b').first() {
        title.push(' ');
        title.push_str(&coding.decode(remainder.get_data::<[u8]>())?);
    }
    Ok(title)
}

/// 生の書名から末尾の区切り文字列を取り除く
///
/// 末尾の`TITLE_SUFFIX_LEN`文字（バイトではなく文字）を削る。
/// 書名が`TITLE_SUFFIX_LEN`文字未満の場合は空文字列になる。
pub fn strip_title_suffix(raw_title: &str) -> String {
    let keep = raw_title.chars().count().saturating_sub(TITLE_SUFFIX_LEN);
    raw_title.chars().take(keep).collect()
}

/// 書誌レコードから表示用の書名を取得する
pub fn book_title(raw_record: impl AsRef<[u8]>) -> Result<String, CatalogRecordError> {
    let title = raw_title(raw_record.as_ref())?;
    Ok(strip_title_suffix(&title))
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// テスト用にISO 2709レコードを組み立てる
    ///
    /// `coding`はリーダー9桁目。`fields`は(タグ, フィールド本体)で、
    /// 本体にはフィールド終端子を含めない。
    pub fn build_record_bytes(coding: u8, fields: &[(&str, &[u8])]) -> Vec<u8> {
        let mut directory = Vec::new();
        let mut body = Vec::new();
        for (tag, content) in fields {
            let length = content.len() + 1;
            let entry = format!("{}{:04}{:05}", tag, length, body.len());
            directory.extend_from_slice(entry.as_bytes());
            body.extend_from_slice(content);
            body.push(0x1e);
        }
        directory.push(0x1e);
        body.push(0x1d);

        let base_address = 24 + directory.len();
        let record_length = base_address + body.len();
        let leader = format!(
            "{:05}nam {}22{:05} a 4500",
            record_length, coding as char, base_address
        );

        let mut record = leader.into_bytes();
        record.extend(directory);
        record.extend(body);
        record
    }

    /// UTF-8と宣言したレコードを組み立てる
    pub fn build_record(fields: &[(&str, &str)]) -> String {
        let fields: Vec<(&str, &[u8])> = fields
            .iter()
            .map(|(tag, content)| (*tag, content.as_bytes()))
            .collect();
        String::from_utf8(build_record_bytes(b'a', &fields)).unwrap()
    }

    pub fn record_with_title(title_a: &str) -> String {
        build_record(&[
            ("001", "000123"),
            ("245", &format!("10\u{1f}a{}", title_a)),
        ])
    }
}
