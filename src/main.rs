mod telemetry;

use telemetry::{get_subscriber, init_subscriber};
use warden_engine::Application;
use warden_infra::{run_migration, setup_context};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    openssl_probe::init_ssl_cert_env_vars();

    let subscriber = get_subscriber("warden".into(), "info".into());
    init_subscriber(subscriber);

    run_migration()
        .await
        .expect("Database migrations to succeed");

    let context = setup_context().await;

    let app = Application::new(context);
    app.start().await
}
