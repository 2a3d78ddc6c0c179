use crate::config::SmtpConfig;
use crate::domain::notice::Notification;
use crate::ports::mailer::{Mailer as MailerTrait, MailerError};
use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// 認証失敗を示すSMTP応答コード
///
/// 530: 認証が必要、534: 認証方式が弱い、535: 認証情報が不正
const AUTHENTICATION_FAILURE_CODES: [u16; 3] = [530, 534, 535];

/// リレーが共通の認証方式を提示しなかった場合のクライアントエラー文言
const NO_COMPATIBLE_MECHANISM: &str = "No compatible authentication mechanism";

fn parse_mailbox(address: &str) -> Result<Mailbox, MailerError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| MailerError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// 認証の失敗か（認証情報の拒否、または使える認証方式がない）
///
/// どちらも後続の送信で回復しないため、キュー全体を打ち切る対象になる。
fn is_authentication_failure(status: Option<u16>, is_client: bool, message: &str) -> bool {
    match status {
        Some(code) => AUTHENTICATION_FAILURE_CODES.contains(&code),
        None => is_client && message.contains(NO_COMPATIBLE_MECHANISM),
    }
}

/// lettreのSMTPエラーをポートのエラーに分類する
fn classify_smtp_error(err: lettre::transport::smtp::Error) -> MailerError {
    let message = err.to_string();
    if is_authentication_failure(err.status().map(u16::from), err.is_client(), &message) {
        MailerError::Authentication(message)
    } else {
        MailerError::Delivery(message)
    }
}

/// SMTPによるMailer実装
///
/// STARTTLSでリレーに接続し、送信元アドレスとパスワードで認証する。
/// コネクションプールは使わず、1通ごとに接続・送信・切断を行う。
pub struct Mailer {
    config: SmtpConfig,
    sender: Mailbox,
}

impl Mailer {
    pub fn new(config: SmtpConfig) -> Result<Self, MailerError> {
        let sender = parse_mailbox(&config.sender)?;
        Ok(Self { config, sender })
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailerError> {
        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            .map_err(|e| MailerError::Delivery(e.to_string()))?;

        Ok(builder
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.sender.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(self.config.timeout))
            .build())
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, MailerError> {
        let recipient = parse_mailbox(&notification.recipient)?;

        Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject("")
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|e| MailerError::Build(e.to_string()))
    }
}

#[async_trait]
impl MailerTrait for Mailer {
    /// 1通送信する
    ///
    /// トランスポートは送信ごとに生成し、送信後に破棄する。
    async fn send(&self, notification: &Notification) -> Result<(), MailerError> {
        let message = self.build_message(notification)?;
        let transport = self.build_transport()?;

        transport
            .send(message)
            .await
            .map_err(classify_smtp_error)?;

        tracing::debug!(recipient = %notification.recipient, "message accepted by relay");
        Ok(())
    }
}
