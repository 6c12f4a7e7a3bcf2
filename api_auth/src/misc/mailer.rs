use async_trait::async_trait;
use common::{env_config::OtpConfig, error::Res};

/// Delivers one-time passcodes to users.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, email_address: &str, otp: &str) -> Res<()>;
}

/// Writes the passcode to the log instead of sending mail.
///
/// Live codes are never written out, only the fact that one was issued.
/// The static development code is logged at debug level.
pub struct LogMailer {
    redact: bool,
}

impl LogMailer {
    pub fn new(otp: &OtpConfig) -> Self {
        Self { redact: otp.live }
    }

    fn entry(&self, email_address: &str, otp: &str) -> String {
        if self.redact {
            format!("OTP issued for {}", email_address)
        } else {
            format!("OTP for {}: {}", email_address, otp)
        }
    }
}

#[async_trait]
impl OtpMailer for LogMailer {
    async fn send_otp(&self, email_address: &str, otp: &str) -> Res<()> {
        let entry = self.entry(email_address, otp);
        if self.redact {
            log::info!("{}", entry);
        } else {
            log::debug!("{}", entry);
        }
        Ok(())
    }
}
