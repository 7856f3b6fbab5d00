use std::io;
use std::sync::Arc;

use resort_service::domain::ports::Mailer;
use resort_service::infrastructure::mailer::{LogMailer, SmtpMailer};
use resort_service::infrastructure::stripe::StripeGateway;
use resort_service::notifications::{EmailQueue, DEFAULT_QUEUE_CAPACITY};
use resort_service::{build_server, create_pool, logging, run_migrations, AppState, Repositories, Settings};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::other(format!("{context}: {err}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let settings = Settings::from_env().map_err(|e| startup_error("invalid configuration", e))?;

    let pool = create_pool(&settings.database_url).map_err(|e| startup_error("database pool", e))?;
    run_migrations(&pool).map_err(|e| startup_error("migrations", e))?;

    let gateway = StripeGateway::new(
        &settings.stripe_api_base,
        &settings.stripe_secret_key,
        &settings.stripe_webhook_secret,
    )
    .map_err(|e| startup_error("payment gateway", e))?;

    let mailer: Arc<dyn Mailer> = match &settings.smtp {
        Some(smtp) => Arc::new(
            SmtpMailer::new(
                &smtp.host,
                smtp.port,
                smtp.username.clone(),
                smtp.password.clone(),
                &settings.default_from_email,
            )
            .map_err(|e| startup_error("smtp", e))?,
        ),
        None => {
            log::warn!(target: "email", "SMTP_HOST not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };
    let emails = EmailQueue::start(mailer, settings.retry_policy(), DEFAULT_QUEUE_CAPACITY);

    let state = AppState::new(Repositories::diesel(pool), Arc::new(gateway), emails, &settings);

    log::info!(target: "server", "Starting server at http://{}:{}", settings.host, settings.port);

    build_server(state, &settings.host, settings.port)?.await
}
