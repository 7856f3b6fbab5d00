use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::contact::{ContactMessage, NewContactMessage};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(max = 200))]
    pub preferred_dates: Option<String>,
    pub number_of_guests: Option<i32>,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

impl From<ContactMessage> for ContactResponse {
    fn from(m: ContactMessage) -> Self {
        Self {
            id: m.id,
            first_name: m.first_name,
            last_name: m.last_name,
            email: m.email,
            subject: m.subject,
            created_at: m.created_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/contacts",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Enquiry received", body = ContactResponse),
        (status = 400, description = "Validation failed", body = crate::handlers::ErrorResponse),
    ),
    tag = "contacts"
)]
pub async fn submit_contact(
    state: web::Data<AppState>,
    body: web::Json<ContactRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let stored = state
        .contacts
        .submit(NewContactMessage {
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
            phone: body.phone,
            subject: body.subject,
            preferred_dates: body.preferred_dates,
            number_of_guests: body.number_of_guests,
            message: body.message,
        })
        .await?;
    Ok(HttpResponse::Created().json(ContactResponse::from(stored)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/contacts", web::post().to(submit_contact));
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::json;

    use crate::handlers::testing::TestApp;
    use crate::notifications::testing::drain;

    fn enquiry(guests: i32) -> serde_json::Value {
        json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "email": "grace@example.com",
            "phone": "555-0199",
            "subject": "Wedding",
            "number_of_guests": guests,
            "message": "Can you host eighty people on the beach?"
        })
    }

    #[actix_web::test]
    async fn enquiry_is_stored_and_both_sides_emailed() {
        let mut ctx = TestApp::new();
        let app = test::init_service(ctx.app()).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/contacts")
            .set_json(enquiry(80))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        assert_eq!(ctx.store.contact_count(), 1);

        let sent = drain(&mut ctx.outbox);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "bookings@resort.test");
        assert_eq!(sent[1].to, "grace@example.com");
    }

    #[actix_web::test]
    async fn non_positive_guest_count_is_rejected() {
        let ctx = TestApp::new();
        let app = test::init_service(ctx.app()).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/contacts")
            .set_json(enquiry(0))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ctx.store.contact_count(), 0);
    }
}
