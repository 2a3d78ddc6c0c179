use chrono_tz::Tz;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOANS_RELATION: &str = "loans";
const DEFAULT_LIBRARY_TIMEZONE: Tz = chrono_tz::UTC;

/// 設定エラー
///
/// いずれもクエリ実行前に致命的エラーとして扱う。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("failed to load .env file: {0}")]
    DotEnv(String),
}

/// SMTPリレーの接続設定
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// 送信元アドレス（認証ユーザーを兼ねる）
    pub sender: String,
    pub password: String,
    pub timeout: Duration,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// 貸出ストアの接続設定
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    /// 貸出を保持するテーブルまたはビュー（スキーマ修飾可）
    pub loans_relation: String,
    /// 接続とクエリそれぞれに適用するタイムアウト
    pub timeout: Duration,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("loans_relation", &self.loans_relation)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// ジョブ全体の設定
#[derive(Debug, Clone)]
pub struct Config {
    pub smtp: SmtpConfig,
    pub database: DatabaseConfig,
    /// 基準日・選択・表示の暦日を決めるタイムゾーン
    pub timezone: Tz,
    /// trueなら送信せずログ出力のみ
    pub dry_run: bool,
}

impl Config {
    /// 環境変数から設定を読み込む
    ///
    /// カレントディレクトリに`.env`があれば先に読み込む（既存の環境変数は上書きしない）。
    /// `.env`が無いのは正常、読めない・解析できない場合はエラー。
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv_outcome(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から設定を読み込む
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let smtp = SmtpConfig {
            host: required("SMTP_HOST")?,
            port: parse_or(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
            sender: required("SMTP_SENDER")?,
            password: required("SMTP_PASSWORD")?,
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "SMTP_TIMEOUT_SECS",
                DEFAULT_SMTP_TIMEOUT_SECS,
            )?),
        };

        let loans_relation =
            lookup("LOANS_RELATION").unwrap_or_else(|| DEFAULT_LOANS_RELATION.to_string());
        if !is_valid_relation_name(&loans_relation) {
            return Err(ConfigError::Invalid {
                key: "LOANS_RELATION",
                value: loans_relation,
                reason: "must be an SQL identifier, optionally schema-qualified",
            });
        }

        let database = DatabaseConfig {
            host: required("DB_HOST")?,
            port: parse_or(&lookup, "DB_PORT", DEFAULT_DB_PORT)?,
            user: required("DB_USER")?,
            password: required("DB_PASSWORD")?,
            name: required("DB_NAME")?,
            loans_relation,
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "DB_TIMEOUT_SECS",
                DEFAULT_DB_TIMEOUT_SECS,
            )?),
        };

        let timezone = match lookup("LIBRARY_TIMEZONE") {
            None => DEFAULT_LIBRARY_TIMEZONE,
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "LIBRARY_TIMEZONE",
                value,
                reason: "must be an IANA time zone name such as America/Sao_Paulo",
            })?,
        };

        let dry_run = match lookup("NOTIFY_DRY_RUN") {
            None => false,
            Some(value) => {
                let flag = value.trim().to_ascii_lowercase();
                match flag.as_str() {
                    "" | "0" | "false" | "no" => false,
                    "1" | "true" | "yes" => true,
                    _ => {
                        return Err(ConfigError::Invalid {
                            key: "NOTIFY_DRY_RUN",
                            value,
                            reason: "expected true or false",
                        });
                    }
                }
            }
        };

        Ok(Self {
            smtp,
            database,
            timezone,
            dry_run,
        })
    }
}

/// `.env`読み込み結果を判定する
fn dotenv_outcome<T>(result: dotenvy::Result<T>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::DotEnv(e.to_string())),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value,
            reason: "must be a non-negative integer",
        }),
    }
}

/// `name`または`schema.name`の形式のみ許可する
///
/// リレーション名はクエリ文字列に埋め込まれるため、識別子以外は拒否する。
fn is_valid_relation_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
