use crate::error::{NotifyError, Result};
use crate::template;
use crate::AlertDispatcher;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vpsmon_common::types::AlertContext;

/// SMTP settings plus recipient lists, deserialized from the engine's
/// configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    /// Optional HTML template with `{{key}}` placeholders. Without one, a
    /// minimal HTML rendering of the plain body is used.
    #[serde(default)]
    pub template_path: Option<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from: String::new(),
            recipients: Vec::new(),
            cc: Vec::new(),
            template_path: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

/// Sends one email per alert over SMTP, with the plain-text body alongside
/// an HTML rendering. Delivery is retried up to three times with exponential
/// backoff before the error is surfaced.
pub struct EmailDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    recipients: Vec<String>,
    cc: Vec<String>,
    template: Option<String>,
}

impl EmailDispatcher {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        if settings.smtp_host.is_empty() {
            return Err(NotifyError::InvalidConfig(
                "smtp_host is required".to_string(),
            ));
        }
        if settings.from.is_empty() {
            return Err(NotifyError::InvalidConfig("from is required".to_string()));
        }

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)?
                .port(settings.smtp_port);

        if let (Some(user), Some(pass)) = (&settings.smtp_username, &settings.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let template = match &settings.template_path {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => None,
        };

        Ok(Self {
            transport: builder.build(),
            from: settings.from.clone(),
            recipients: settings.recipients.clone(),
            cc: settings.cc.clone(),
            template,
        })
    }

    fn render_html(&self, subject: &str, body: &str, context: &AlertContext) -> String {
        match &self.template {
            Some(tpl) => {
                let mut vars: HashMap<&str, String> = HashMap::new();
                vars.insert("subject", subject.to_string());
                vars.insert("text", template::escape_html(body));
                vars.insert(
                    "timestamp",
                    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                );
                vars.insert("vpsName", context.vps_name.clone());
                vars.insert("plan", context.plan.clone());
                vars.insert("alertItems", context.alert_items_html.clone());
                vars.insert("latestDataTime", context.latest_data_time.clone());
                template::render(tpl, &vars)
            }
            None => format!("<b>{}</b>", template::escape_html(body).replace('\n', "<br>")),
        }
    }

    async fn send_with_retry(&self, email: Message) -> Result<()> {
        let mut last_err = None;
        for attempt in 0..3u32 {
            match self.transport.send(email.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "Email send failed, retrying"
                    );
                    last_err = Some(e);
                    if attempt < 2 {
                        tokio::time::sleep(std::time::Duration::from_millis(
                            100 * 2u64.pow(attempt),
                        ))
                        .await;
                    }
                }
            }
        }
        Err(last_err.expect("retry loop always records an error").into())
    }
}

#[async_trait]
impl AlertDispatcher for EmailDispatcher {
    async fn send(
        &self,
        subject: &str,
        body: &str,
        context: &AlertContext,
    ) -> Result<()> {
        if self.recipients.is_empty() {
            tracing::warn!("No alert recipients configured, skipping email send");
            return Ok(());
        }

        let html = self.render_html(subject, body, context);

        let mut builder = Message::builder()
            .from(self.from.parse()?)
            .subject(subject.to_string());
        for recipient in &self.recipients {
            builder = builder.to(recipient.parse()?);
        }
        for cc in &self.cc {
            builder = builder.cc(cc.parse()?);
        }

        let email =
            builder.multipart(MultiPart::alternative_plain_html(body.to_string(), html))?;

        self.send_with_retry(email).await?;
        tracing::info!(
            recipients = self.recipients.len(),
            cc = self.cc.len(),
            "Alert email sent"
        );
        Ok(())
    }
}
