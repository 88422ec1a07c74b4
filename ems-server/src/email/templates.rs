//! Email bodies
//!
//! Plain text only. Each template returns the subject and body; attachments
//! are added by the caller.

use rust_decimal::Decimal;
use shared::models::{PanelInterest, Registration, Ticket};

/// Event details shared by every template
pub struct EventInfo<'a> {
    pub name: &'a str,
    pub venue: &'a str,
    pub date: &'a str,
}

pub struct Rendered {
    pub subject: String,
    pub body: String,
}

fn money(amount: Decimal, currency: &str) -> String {
    format!("{} {:.2}", currency.to_uppercase(), amount)
}

pub fn ticket_confirmation(
    event: &EventInfo<'_>,
    registration: &Registration,
    ticket_type_name: &str,
    tickets: &[Ticket],
    currency: &str,
    resend: bool,
) -> Rendered {
    let subject = if resend {
        format!("Your tickets for {} (resent)", event.name)
    } else {
        format!("Your tickets for {}", event.name)
    };

    let mut body = format!(
        "Dear {},\n\n\
         Thank you for registering for {} at {} on {}.\n\n\
         Booking reference: {}\n\
         Ticket type: {} x {}\n",
        registration.first_name,
        event.name,
        event.venue,
        event.date,
        registration.id,
        ticket_type_name,
        registration.quantity,
    );

    if registration.is_ems_client {
        body.push_str("Price: complimentary (EMS client)\n");
    } else if registration.discount.is_zero() {
        body.push_str(&format!("Total paid: {}\n", money(registration.total, currency)));
    } else {
        body.push_str(&format!(
            "Subtotal: {}\nDiscount{}: -{}\nTotal paid: {}\n",
            money(registration.subtotal, currency),
            registration
                .coupon_code
                .as_deref()
                .map(|c| format!(" ({c})"))
                .unwrap_or_default(),
            money(registration.discount, currency),
            money(registration.total, currency),
        ));
    }

    body.push_str("\nYour tickets:\n");
    for ticket in tickets {
        body.push_str(&format!(
            "  {}  {}\n",
            ticket.ticket_number, ticket.attendee_name
        ));
    }

    body.push_str(
        "\nEach ticket is attached as a separate PDF. Show its QR code \
         at the entrance. Every ticket admits one person once.\n\n\
         See you there!\n",
    );

    Rendered { subject, body }
}

pub fn reservation_expired(
    event: &EventInfo<'_>,
    registration: &Registration,
    ticket_type_name: &str,
) -> Rendered {
    Rendered {
        subject: format!("Your {} reservation has expired", event.name),
        body: format!(
            "Dear {},\n\n\
             We did not receive payment for your reservation of {} x {} \
             (booking reference {}), so the tickets have been released.\n\n\
             You are welcome to register again while tickets are available.\n",
            registration.first_name, registration.quantity, ticket_type_name, registration.id,
        ),
    }
}

pub fn panel_interest_ack(event: &EventInfo<'_>, interest: &PanelInterest) -> Rendered {
    let topic = interest
        .topic
        .as_deref()
        .map(|t| format!(" on \"{t}\""))
        .unwrap_or_default();
    Rendered {
        subject: format!("Thank you for your interest in speaking at {}", event.name),
        body: format!(
            "Dear {},\n\n\
             We have received your interest in joining a panel{topic} at {}.\n\
             Our programme team will get back to you shortly.\n",
            interest.name, event.name,
        ),
    }
}

pub fn refund_processed(
    event: &EventInfo<'_>,
    registration: &Registration,
    amount: Decimal,
    currency: &str,
) -> Rendered {
    Rendered {
        subject: format!("Refund processed for {}", event.name),
        body: format!(
            "Dear {},\n\n\
             Your refund of {} for booking reference {} has been processed.\n\
             The amount will be returned to your original payment method.\n\
             Any unused tickets from this booking are no longer valid.\n",
            registration.first_name,
            money(amount, currency),
            registration.id,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{RegistrationStatus, TicketStatus};

    const EVENT: EventInfo<'static> = EventInfo {
        name: "EMS Trade Fair",
        venue: "VR Room Malta",
        date: "2026-11-20",
    };

    fn registration() -> Registration {
        Registration {
            id: 42,
            first_name: "Maria".to_string(),
            last_name: "Borg".to_string(),
            email: "maria@example.com".to_string(),
            phone: None,
            company: None,
            is_ems_client: false,
            ticket_type_id: 1,
            quantity: 2,
            attendee_names: vec![],
            coupon_id: Some(9),
            coupon_code: Some("EARLY20".to_string()),
            unit_price: Decimal::new(2500, 2),
            subtotal: Decimal::new(5000, 2),
            discount: Decimal::new(1000, 2),
            total: Decimal::new(4000, 2),
            status: RegistrationStatus::Confirmed,
            expires_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn ticket(number: &str) -> Ticket {
        Ticket {
            id: 1,
            registration_id: 42,
            ticket_type_id: 1,
            ticket_number: number.to_string(),
            attendee_name: "Maria Borg".to_string(),
            status: TicketStatus::Issued,
            checked_in_at: None,
            checked_in_by: None,
            created_at: 0,
        }
    }

    #[test]
    fn confirmation_lists_tickets_and_discount() {
        let tickets = [ticket("EMS-AAAA2222"), ticket("EMS-BBBB3333")];
        let r = ticket_confirmation(&EVENT, &registration(), "Visitor", &tickets, "eur", false);
        assert_eq!(r.subject, "Your tickets for EMS Trade Fair");
        assert!(r.body.contains("EMS-AAAA2222"));
        assert!(r.body.contains("EMS-BBBB3333"));
        assert!(r.body.contains("Discount (EARLY20): -EUR 10.00"));
        assert!(r.body.contains("Total paid: EUR 40.00"));
    }

    #[test]
    fn ems_client_confirmation_shows_complimentary() {
        let mut reg = registration();
        reg.is_ems_client = true;
        let r = ticket_confirmation(&EVENT, &reg, "Visitor", &[], "eur", true);
        assert!(r.subject.ends_with("(resent)"));
        assert!(r.body.contains("complimentary"));
        assert!(!r.body.contains("Total paid"));
    }

    #[test]
    fn refund_mentions_amount() {
        let r = refund_processed(&EVENT, &registration(), Decimal::new(4000, 2), "eur");
        assert!(r.body.contains("EUR 40.00"));
        assert!(r.body.contains("42"));
    }
}
