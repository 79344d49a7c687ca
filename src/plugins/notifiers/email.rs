use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::models::NotificationKind;
use crate::plugins::traits::{NotificationContext, NotificationResult, Notifier};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Subject, plain text and HTML body for one notification.
pub fn render(kind: NotificationKind, context: &NotificationContext) -> RenderedMessage {
    let price = context.formatted_price();

    let (subject, headline) = match kind {
        NotificationKind::Available => (
            format!("{} is now available", context.name),
            format!("{} is now available for a price of {}.", context.name, price),
        ),
        NotificationKind::Price => (
            format!("{} now costs {}", context.name, price),
            format!("The price of {} changed to {}.", context.name, price),
        ),
        NotificationKind::Unavailable => (
            format!("{} is no longer available", context.name),
            format!("{} is no longer available.", context.name),
        ),
    };

    let text = format!("{}\n\n{}\n", headline, context.url);

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; }}
        .product {{ font-size: 18px; font-weight: bold; }}
        .button {{ display: inline-block; padding: 8px 15px; margin-top: 15px; text-decoration: none; border-radius: 3px; background: #007cba; color: white; }}
    </style>
</head>
<body>
    <div class="product">{headline}</div>
    <a href="{url}" class="button">View Product</a>
</body>
</html>
"#,
        headline = escape_html(&headline),
        url = escape_html(&context.url),
    );

    RenderedMessage {
        subject,
        text,
        html,
    }
}

/// Sends notifications through an SMTP relay.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailNotifier {
    /// Builds the transport. No connection is made until the first send.
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        let mut builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let address = config
            .from_address
            .as_ref()
            .or(config.username.as_ref())
            .ok_or_else(|| AppError::Notification("no sender address configured".to_string()))?;
        let from = Mailbox::new(Some(config.from_name.clone()), address.parse()?);

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(
        &self,
        kind: NotificationKind,
        context: &NotificationContext,
        recipients: &[String],
    ) -> Result<Message> {
        let rendered = render(kind, context);

        let mut builder = Message::builder().from(self.from.clone());
        for recipient in recipients {
            builder = builder.to(recipient.parse::<Mailbox>()?);
        }

        Ok(builder
            .subject(rendered.subject)
            .multipart(MultiPart::alternative_plain_html(rendered.text, rendered.html))?)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn dispatch(
        &self,
        kind: NotificationKind,
        context: &NotificationContext,
        recipients: &[String],
    ) -> Result<NotificationResult> {
        if recipients.is_empty() {
            return Ok(NotificationResult::skipped());
        }

        let message = self.build_message(kind, context, recipients)?;
        let response = self.transport.send(message).await?;

        metrics::counter!("sniper_notifications_total", "kind" => kind.as_str()).increment(1);

        Ok(NotificationResult {
            success: response.is_positive(),
            message_id: response.first_line().map(str::to_string),
            recipients: recipients.len(),
        })
    }
}
