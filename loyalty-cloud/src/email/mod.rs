//! Transactional email via SES

use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use shared::models::EmployeeRole;
use shared::util::format_cents;

use crate::error::BoxError;

/// Subject and plain-text body of an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

pub fn invitation_email(shop_name: &str, role: EmployeeRole, link: &str, ttl_hours: i64) -> Email {
    Email {
        subject: format!("You're invited to join {shop_name}"),
        body: format!(
            "You have been invited to join the {shop_name} team as {role}.\n\n\
             Create your account here:\n{link}\n\n\
             This link expires in {ttl_hours} hours.",
            role = role.as_str(),
        ),
    }
}

pub fn gift_card_email(
    shop_name: &str,
    amount_cents: i64,
    serial_number: &str,
    message: Option<&str>,
    claim_link: &str,
) -> Email {
    let amount = format_cents(amount_cents);
    let note = message
        .map(|m| format!("\nMessage from the sender:\n\"{m}\"\n"))
        .unwrap_or_default();
    Email {
        subject: format!("You received a {amount} {shop_name} gift card"),
        body: format!(
            "Someone sent you a {amount} gift card for {shop_name}!\n{note}\n\
             Card number: {serial_number}\n\n\
             Add it to your account and wallet:\n{claim_link}"
        ),
    }
}

pub async fn send(ses: &SesClient, from: &str, to: &str, email: &Email) -> Result<(), BoxError> {
    let subject = Content::builder().data(&email.subject).build()?;

    let body = Body::builder()
        .text(Content::builder().data(&email.body).build()?)
        .build();

    let message = Message::builder().subject(subject).body(body).build();

    ses.send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(to).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await?;

    tracing::info!(to = to, subject = %email.subject, "Email sent");
    Ok(())
}

/// Fire-and-forget send; failures are logged and never reach the caller.
pub fn send_in_background(ses: SesClient, from: String, to: String, email: Email) {
    tokio::spawn(async move {
        if let Err(e) = send(&ses, &from, &to, &email).await {
            tracing::error!(to = %to, error = %e, "Failed to send email");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_email() {
        let email = invitation_email(
            "Corner Coffee",
            EmployeeRole::Staff,
            "https://app.example.com/invite/abc",
            168,
        );
        assert_eq!(email.subject, "You're invited to join Corner Coffee");
        assert!(email.body.contains("as staff"));
        assert!(email.body.contains("https://app.example.com/invite/abc"));
        assert!(email.body.contains("168 hours"));
    }

    #[test]
    fn test_gift_card_email() {
        let email = gift_card_email(
            "Corner Coffee",
            2_500,
            "7KQF-M2XD-9RTA",
            Some("Happy birthday"),
            "https://app.example.com/claim/xyz",
        );
        assert_eq!(email.subject, "You received a $25.00 Corner Coffee gift card");
        assert!(email.body.contains("\"Happy birthday\""));
        assert!(email.body.contains("7KQF-M2XD-9RTA"));

        let plain = gift_card_email("Corner Coffee", 1_000, "S", None, "L");
        assert!(!plain.body.contains("Message from the sender"));
    }
}
