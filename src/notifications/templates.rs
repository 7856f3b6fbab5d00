//! Plain-text bodies for every email the service sends.

use crate::domain::booking::BookingView;
use crate::domain::contact::ContactMessage;
use crate::domain::ports::EmailMessage;
use crate::domain::user::User;

const BRAND: &str = "Azure Horizon";

fn signature() -> String {
    format!("Best regards,\nThe {BRAND} Team")
}

fn booking_lines(booking: &BookingView) -> String {
    booking
        .lines
        .iter()
        .map(|l| format!("  - {} x{} @ {} = {}", l.service_name, l.quantity, l.unit_price, l.total_price))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn welcome(user: &User) -> EmailMessage {
    EmailMessage {
        to: user.email.clone(),
        subject: format!("Welcome to {BRAND} | Login Details"),
        body: format!(
            "Hello {},\n\nThank you for registering with us!\n\n\
             Username: {}\nEmail: {}\n\n\
             Sign in with the password you chose at registration.\n\n{}",
            user.full_name,
            user.username,
            user.email,
            signature()
        ),
    }
}

pub fn password_reset(user: &User, frontend_url: &str, token: &str) -> EmailMessage {
    let url = format!(
        "{}/reset-password/?token={token}&username={}",
        frontend_url.trim_end_matches('/'),
        user.username
    );
    EmailMessage {
        to: user.email.clone(),
        subject: "Password Reset Request".to_string(),
        body: format!(
            "Hello {},\n\nWe received a request to reset your password.\n\
             Follow this link to choose a new one:\n\n{url}\n\n\
             If you did not ask for this, you can ignore this email.\n\n{}",
            user.full_name,
            signature()
        ),
    }
}

pub fn booking_confirmation(booking: &BookingView) -> EmailMessage {
    EmailMessage {
        to: booking.guest_email.clone(),
        subject: format!("Booking Confirmation | {} | {BRAND}", booking.booking_number),
        body: format!(
            "Dear {},\n\nThank you for your booking.\n\n\
             Booking number: {}\nDate: {}\nGuests: {}\n\nServices:\n{}\n\n\
             Subtotal: {}\nTax: {}\nTotal: {}\n\n{}",
            booking.guest_name,
            booking.booking_number,
            booking.booking_date,
            booking.number_of_guests,
            booking_lines(booking),
            booking.totals.subtotal,
            booking.totals.tax,
            booking.totals.total_amount,
            signature()
        ),
    }
}

pub fn booking_admin_notice(booking: &BookingView, admin_email: &str) -> EmailMessage {
    EmailMessage {
        to: admin_email.to_string(),
        subject: format!("New Booking Received | {} | {BRAND}", booking.booking_number),
        body: format!(
            "A new booking was placed.\n\n\
             Booking number: {}\nGuest: {} <{}> {}\nDate: {}\nGuests: {}\n\n\
             Services:\n{}\n\nTotal: {}\nSpecial requests: {}",
            booking.booking_number,
            booking.guest_name,
            booking.guest_email,
            booking.guest_phone,
            booking.booking_date,
            booking.number_of_guests,
            booking_lines(booking),
            booking.totals.total_amount,
            booking.special_requests.as_deref().unwrap_or("-"),
        ),
    }
}

pub fn payment_confirmation(booking: &BookingView) -> EmailMessage {
    EmailMessage {
        to: booking.guest_email.clone(),
        subject: format!("Payment Confirmation | {} | {BRAND}", booking.booking_number),
        body: format!(
            "Dear {},\n\nWe have received your payment for booking {}.\n\n\
             Total: {}\nPaid: {}\nPayment status: {}\n\n{}",
            booking.guest_name,
            booking.booking_number,
            booking.totals.total_amount,
            booking.total_paid(),
            booking.payment_status.as_str(),
            signature()
        ),
    }
}

pub fn contact_acknowledgement(message: &ContactMessage) -> EmailMessage {
    EmailMessage {
        to: message.email.clone(),
        subject: format!("Received Your Enquiry | {} | {BRAND}", message.subject),
        body: format!(
            "Dear {},\n\nThank you for contacting us. We have received your enquiry \
             and will get back to you shortly.\n\nYour message:\n{}\n\n{}",
            message.full_name(),
            message.message,
            signature()
        ),
    }
}

pub fn contact_admin_notice(message: &ContactMessage, admin_email: &str) -> EmailMessage {
    EmailMessage {
        to: admin_email.to_string(),
        subject: format!("New Enquiry Received | {} | {BRAND}", message.subject),
        body: format!(
            "From: {} <{}> {}\nPreferred dates: {}\nGuests: {}\n\n{}",
            message.full_name(),
            message.email,
            message.phone,
            message.preferred_dates.as_deref().unwrap_or("-"),
            message
                .number_of_guests
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            message.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            full_name: "Ada Lovelace".to_string(),
            phone: "555".to_string(),
            gender: None,
            is_staff: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reset_link_points_at_frontend() {
        let email = password_reset(&user(), "https://resort.test/", "tok123");
        assert!(email
            .body
            .contains("https://resort.test/reset-password/?token=tok123&username=ada"));
        assert_eq!(email.to, "ada@example.com");
    }

    #[test]
    fn welcome_greets_by_name() {
        let email = welcome(&user());
        assert!(email.subject.starts_with("Welcome to Azure Horizon"));
        assert!(email.body.contains("Ada Lovelace"));
    }
}
