//! Email delivery of meeting notifications.
//!
//! Every notification produces one HTML email per party. Messages go out
//! through an SMTP relay or, for local development, are written to a
//! directory as `.eml` files.

use crate::config::{EmailConfig, EmailTransportConfig};
use crate::errors::MsError;
use crate::models::{format_meeting_time, Meeting, Parties};
use crate::services::notifier::{NotificationKind, Notifier};
use async_trait::async_trait;
use common::secret::ExposeSecret;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::path::Path;
use tracing::{debug, instrument, warn};

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

/// One rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to_address: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
}

/// Notifier that emails both parties.
pub struct EmailNotifier {
    transport: EmailTransport,
    from: Mailbox,
}

impl EmailNotifier {
    /// Build the transport described by the email configuration.
    ///
    /// The log transport has no mailer; use `LogNotifier` for it.
    pub fn new(config: &EmailConfig) -> Result<Self, MsError> {
        let transport = match &config.transport {
            EmailTransportConfig::Smtp(smtp) => {
                if !smtp.use_tls {
                    warn!(
                        target: "ms.services.email",
                        host = %smtp.host,
                        "SMTP TLS is disabled - this is not recommended for production"
                    );
                }

                let mut builder = if smtp.use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                        &smtp.host,
                    ))
                }
                .map_err(|e| MsError::Internal(format!("create SMTP transport: {e}")))?
                .port(smtp.port);

                if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
                    builder = builder.credentials(Credentials::new(
                        username.clone(),
                        password.expose_secret().to_string(),
                    ));
                }

                EmailTransport::Smtp(builder.build())
            }
            EmailTransportConfig::File { dir } => {
                let emails_dir = Path::new(dir);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| {
                        MsError::Internal(format!("create emails directory: {e}"))
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
            EmailTransportConfig::Log => {
                return Err(MsError::Internal(
                    "log transport does not send email".to_string(),
                ))
            }
        };

        let from_address = config
            .from_address
            .parse::<Address>()
            .map_err(|e| MsError::Internal(format!("parse from address: {e}")))?;

        Ok(Self {
            transport,
            from: Mailbox::new(Some(config.from_name.clone()), from_address),
        })
    }

    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), MsError> {
        let to_address = email
            .to_address
            .parse::<Address>()
            .map_err(|e| MsError::Internal(format!("parse recipient address: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(Some(email.to_name.clone()), to_address))
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| MsError::Internal(format!("build email message: {e}")))?;

        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| {
                    MsError::ServiceUnavailable(format!("send SMTP email: {e}"))
                })?;
            }
            EmailTransport::File(file) => {
                file.send(message)
                    .await
                    .map_err(|e| MsError::Internal(format!("write email file: {e}")))?;
            }
        }

        debug!(target: "ms.services.email", subject = %email.subject, "Email sent");
        Ok(())
    }

    /// Send both emails, attempting the second even if the first fails.
    #[instrument(skip_all, name = "ms.email.deliver", fields(kind = kind.as_str(), meeting_id = %meeting.meeting_id))]
    async fn deliver(
        &self,
        kind: NotificationKind,
        parties: &Parties,
        meeting: &Meeting,
        reason: Option<&str>,
    ) -> Result<(), MsError> {
        let mut first_error = None;

        for email in compose(kind, parties, meeting, reason) {
            if let Err(e) = self.send_email(&email).await {
                warn!(
                    target: "ms.services.email",
                    error = %e,
                    subject = %email.subject,
                    "Failed to send email"
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify_booked(&self, parties: &Parties, meeting: &Meeting) -> Result<(), MsError> {
        self.deliver(NotificationKind::Booked, parties, meeting, None)
            .await
    }

    async fn notify_accepted(
        &self,
        parties: &Parties,
        meeting: &Meeting,
    ) -> Result<(), MsError> {
        self.deliver(NotificationKind::Accepted, parties, meeting, None)
            .await
    }

    async fn notify_rejected(
        &self,
        parties: &Parties,
        meeting: &Meeting,
        reason: &str,
    ) -> Result<(), MsError> {
        self.deliver(NotificationKind::Rejected, parties, meeting, Some(reason))
            .await
    }

    async fn notify_cancelled(
        &self,
        parties: &Parties,
        meeting: &Meeting,
        reason: &str,
    ) -> Result<(), MsError> {
        self.deliver(NotificationKind::Cancelled, parties, meeting, Some(reason))
            .await
    }

    async fn notify_reminder(
        &self,
        parties: &Parties,
        meeting: &Meeting,
    ) -> Result<(), MsError> {
        self.deliver(NotificationKind::Reminder, parties, meeting, None)
            .await
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Escape text interpolated into HTML bodies.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .footer {{ margin-top: 30px; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <h2>{title}</h2>
{body}
        <div class="footer">
            <p>This is an automated message, please do not reply to this email.</p>
        </div>
    </div>
</body>
</html>"#
    )
}

fn meeting_details(meeting: &Meeting) -> String {
    format!(
        r#"        <h3>Meeting Details:</h3>
        <ul>
            <li><strong>Date:</strong> {date}</li>
            <li><strong>Time:</strong> {time}</li>
            <li><strong>Duration:</strong> {duration} minutes</li>
            <li><strong>Topic:</strong> {topic}</li>
        </ul>
"#,
        date = meeting.date.format("%A, %B %-d, %Y"),
        time = format_meeting_time(meeting.time),
        duration = meeting.duration.minutes(),
        topic = escape_html(&meeting.topic),
    )
}

fn student_details(parties: &Parties) -> String {
    let student = &parties.student;
    let optional = |label: &str, value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(|v| format!("            <li><strong>{label}:</strong> {}</li>\n", escape_html(v)))
            .unwrap_or_default()
    };

    let interests = if student.areas_of_interest.is_empty() {
        String::new()
    } else {
        format!(
            "            <li><strong>Areas of Interest:</strong> {}</li>\n",
            escape_html(&student.areas_of_interest.join(", "))
        )
    };

    let mut section = format!(
        "        <h3>Student Details:</h3>\n        <ul>\n            <li><strong>Name:</strong> {}</li>\n{}{}{}        </ul>\n",
        escape_html(&student.full_name()),
        optional("Education", &student.education_level),
        optional("School/University", &student.current_school),
        interests,
    );

    if let Some(goals) = student.goals.as_deref().filter(|g| !g.trim().is_empty()) {
        section.push_str(&format!(
            "        <h3>Student Goals:</h3>\n        <p>{}</p>\n",
            escape_html(goals)
        ));
    }

    section
}

fn mentor_details(parties: &Parties) -> String {
    let mentor = &parties.mentor;
    let expertise = if mentor.areas_of_interest.is_empty() {
        "Various fields".to_string()
    } else {
        mentor.areas_of_interest.join(", ")
    };

    format!(
        "        <h3>Mentor Details:</h3>\n        <ul>\n            <li><strong>Name:</strong> {}</li>\n            <li><strong>Expertise:</strong> {}</li>\n        </ul>\n",
        escape_html(&mentor.full_name()),
        escape_html(&expertise),
    )
}

fn paragraph(text: &str) -> String {
    format!("        <p>{text}</p>\n")
}

/// Render the student's and the mentor's email for a notification.
///
/// Returns `[to_student, to_mentor]`.
pub fn compose(
    kind: NotificationKind,
    parties: &Parties,
    meeting: &Meeting,
    reason: Option<&str>,
) -> [OutgoingEmail; 2] {
    let mentor_name = parties.mentor.full_name();
    let student_name = parties.student.full_name();
    let mentor_html = escape_html(&mentor_name);
    let student_html = escape_html(&student_name);
    let when = format!(
        "{} at {}",
        meeting.date.format("%A, %B %-d, %Y"),
        format_meeting_time(meeting.time)
    );
    let reason_html = escape_html(reason.unwrap_or_default());
    let details = meeting_details(meeting);

    let (student_subject, student_title, student_body, mentor_subject, mentor_title, mentor_body) =
        match kind {
            NotificationKind::Booked => (
                format!("Meeting Request Confirmation with {mentor_name}"),
                "Meeting Request Confirmation",
                format!(
                    "{}{}{}{}",
                    paragraph(&format!(
                        "Your meeting request with {mentor_html} has been sent."
                    )),
                    details,
                    paragraph("The mentor will review your request and confirm soon."),
                    mentor_details(parties),
                ),
                format!("New Meeting Request from {student_name}"),
                "New Meeting Request",
                format!(
                    "{}{}{}{}",
                    paragraph(&format!(
                        "You have a new meeting request from {student_html}."
                    )),
                    details,
                    student_details(parties),
                    paragraph("Please accept or decline this request."),
                ),
            ),
            NotificationKind::Accepted => (
                format!("Meeting Accepted: {mentor_name}"),
                "Meeting Accepted",
                format!(
                    "{}{}{}",
                    paragraph(&format!(
                        "Good news! {mentor_html} has accepted your meeting request."
                    )),
                    details,
                    paragraph("You can join the call from your dashboard 15 minutes before the start."),
                ),
                format!("Meeting Confirmation with {student_name}"),
                "Meeting Confirmation",
                format!(
                    "{}{}",
                    paragraph(&format!(
                        "You have accepted a meeting request from {student_html}."
                    )),
                    details,
                ),
            ),
            NotificationKind::Rejected => (
                "Meeting Request Declined".to_string(),
                "Meeting Request Declined",
                format!(
                    "{}{}{}",
                    paragraph(&format!(
                        "{mentor_html} is unable to accept your meeting request for {when}."
                    )),
                    paragraph(&format!("<strong>Reason:</strong> {reason_html}")),
                    paragraph("You can book another time or reach out to a different mentor."),
                ),
                "Meeting Rejection Confirmation".to_string(),
                "Meeting Rejection Confirmation",
                format!(
                    "{}{}",
                    paragraph(&format!(
                        "You have declined a meeting request from {student_html} for {when}."
                    )),
                    paragraph(&format!("<strong>Reason given:</strong> {reason_html}")),
                ),
            ),
            NotificationKind::Cancelled => (
                "Meeting Cancellation Confirmation".to_string(),
                "Meeting Cancellation Confirmation",
                format!(
                    "{}{}",
                    paragraph(&format!(
                        "Your meeting with {mentor_html} scheduled for {when} has been cancelled."
                    )),
                    paragraph(&format!("<strong>Reason:</strong> {reason_html}")),
                ),
                format!("Meeting Cancellation: {student_name}"),
                "Meeting Cancellation Notice",
                format!(
                    "{}{}",
                    paragraph(&format!(
                        "Your meeting with {student_html} scheduled for {when} has been cancelled."
                    )),
                    paragraph(&format!("<strong>Reason:</strong> {reason_html}")),
                ),
            ),
            NotificationKind::Reminder => (
                format!("Reminder: Meeting with {mentor_name} in 30 minutes"),
                "Meeting Reminder",
                format!(
                    "{}{}",
                    paragraph(&format!(
                        "Your meeting with {mentor_html} is scheduled to start in 30 minutes."
                    )),
                    details,
                ),
                format!("Reminder: Meeting with {student_name} in 30 minutes"),
                "Meeting Reminder",
                format!(
                    "{}{}",
                    paragraph(&format!(
                        "Your meeting with {student_html} is scheduled to start in 30 minutes."
                    )),
                    details,
                ),
            ),
        };

    [
        OutgoingEmail {
            to_address: parties.student.email.clone(),
            to_name: student_name,
            subject: student_subject,
            html: page(student_title, &student_body),
        },
        OutgoingEmail {
            to_address: parties.mentor.email.clone(),
            to_name: mentor_name,
            subject: mentor_subject,
            html: page(mentor_title, &mentor_body),
        },
    ]
}
