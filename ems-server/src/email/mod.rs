//! Outgoing email via AWS SES v2
//!
//! Every send attempt is written to `email_logs`, successful or not.
//! Callers treat failures as non-fatal: business state is committed before
//! any email goes out.

pub mod mime;
pub mod templates;

use std::sync::Arc;

use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::primitives::Blob;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message, RawMessage};
use rust_decimal::Decimal;
use shared::models::{EmailKind, EmailStatus, PanelInterest, Registration, Ticket};
use sqlx::PgPool;

use crate::config::Config;
use crate::error::BoxError;
use crate::tickets::{TicketDocument, document, qr_payload, render_ticket_pdf};
use crate::{db, util};

use mime::Attachment;
use templates::{EventInfo, Rendered};

#[derive(Clone)]
pub struct EmailService {
    ses: SesClient,
    pool: PgPool,
    config: Arc<Config>,
}

impl EmailService {
    pub fn new(ses: SesClient, pool: PgPool, config: Arc<Config>) -> Self {
        Self { ses, pool, config }
    }

    fn event(&self) -> EventInfo<'_> {
        EventInfo {
            name: &self.config.event_name,
            venue: &self.config.event_venue,
            date: &self.config.event_date,
        }
    }

    /// Confirmation (or resend) with one PDF per ticket attached
    pub async fn send_tickets(
        &self,
        registration: &Registration,
        ticket_type_name: &str,
        tickets: &[Ticket],
        resend: bool,
    ) -> Result<(), BoxError> {
        let rendered = templates::ticket_confirmation(
            &self.event(),
            registration,
            ticket_type_name,
            tickets,
            &self.config.currency,
            resend,
        );

        let attachments = tickets
            .iter()
            .map(|t| -> Result<Attachment, BoxError> {
                let payload = qr_payload(&t.ticket_number, &self.config.ticket_signing_secret);
                let pdf = render_ticket_pdf(&TicketDocument {
                    event_name: &self.config.event_name,
                    event_venue: &self.config.event_venue,
                    event_date: &self.config.event_date,
                    attendee_name: &t.attendee_name,
                    company: registration.company.as_deref(),
                    ticket_type_name,
                    ticket_number: &t.ticket_number,
                    qr_payload: &payload,
                    registration_id: registration.id,
                    issued_at: t.created_at,
                })?;
                Ok(Attachment {
                    filename: format!("ticket-{}.pdf", t.ticket_number),
                    content_type: document::CONTENT_TYPE,
                    data: pdf,
                })
            })
            .collect::<Result<Vec<Attachment>, BoxError>>()?;

        let kind = if resend {
            EmailKind::TicketResend
        } else {
            EmailKind::TicketConfirmation
        };
        self.deliver(
            &registration.email,
            rendered,
            &attachments,
            kind,
            Some(registration.id),
        )
        .await
    }

    pub async fn send_reservation_expired(
        &self,
        registration: &Registration,
        ticket_type_name: &str,
    ) -> Result<(), BoxError> {
        let rendered = templates::reservation_expired(&self.event(), registration, ticket_type_name);
        self.deliver(
            &registration.email,
            rendered,
            &[],
            EmailKind::ReservationExpired,
            Some(registration.id),
        )
        .await
    }

    pub async fn send_panel_interest_ack(&self, interest: &PanelInterest) -> Result<(), BoxError> {
        let rendered = templates::panel_interest_ack(&self.event(), interest);
        self.deliver(&interest.email, rendered, &[], EmailKind::PanelInterestAck, None)
            .await
    }

    pub async fn send_refund_processed(
        &self,
        registration: &Registration,
        amount: Decimal,
    ) -> Result<(), BoxError> {
        let rendered =
            templates::refund_processed(&self.event(), registration, amount, &self.config.currency);
        self.deliver(
            &registration.email,
            rendered,
            &[],
            EmailKind::RefundProcessed,
            Some(registration.id),
        )
        .await
    }

    /// Send and log the outcome
    async fn deliver(
        &self,
        to: &str,
        rendered: Rendered,
        attachments: &[Attachment],
        kind: EmailKind,
        registration_id: Option<i64>,
    ) -> Result<(), BoxError> {
        let result = self.send_via_ses(to, &rendered, attachments).await;

        let (status, error) = match &result {
            Ok(()) => {
                tracing::info!(to = to, kind = ?kind, registration_id = ?registration_id, "Email sent");
                (EmailStatus::Sent, None)
            }
            Err(e) => {
                tracing::error!(to = to, kind = ?kind, registration_id = ?registration_id, error = %e, "Email send failed");
                (EmailStatus::Failed, Some(e.to_string()))
            }
        };

        if let Err(e) = db::email_logs::insert(
            &self.pool,
            util::snowflake_id(),
            to,
            &rendered.subject,
            kind,
            registration_id,
            status,
            error.as_deref(),
            util::now_millis(),
        )
        .await
        {
            tracing::warn!(error = %e, "Failed to write email log");
        }

        result
    }

    async fn send_via_ses(
        &self,
        to: &str,
        rendered: &Rendered,
        attachments: &[Attachment],
    ) -> Result<(), BoxError> {
        let from = self.config.ses_from_email.as_str();

        let content = if attachments.is_empty() {
            let subject = Content::builder().data(&rendered.subject).build()?;
            let body = Body::builder()
                .text(Content::builder().data(&rendered.body).build()?)
                .build();
            let message = Message::builder().subject(subject).body(body).build();
            EmailContent::builder().simple(message).build()
        } else {
            let raw = mime::build_message(from, to, &rendered.subject, &rendered.body, attachments);
            let raw = RawMessage::builder().data(Blob::new(raw)).build()?;
            EmailContent::builder().raw(raw).build()
        };

        self.ses
            .send_email()
            .from_email_address(from)
            .destination(Destination::builder().to_addresses(to).build())
            .content(content)
            .send()
            .await?;
        Ok(())
    }
}
