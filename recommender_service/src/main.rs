use common::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use recommender_service::{
    configuration::get_configuration,
    startup::{Application, ApplicationError},
};

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    let tracing_subscriber =
        get_tracing_subscriber("recommender_service".into(), "info".into(), std::io::stdout);
    init_tracing_subscriber(tracing_subscriber)?;

    let configuration = get_configuration()?;

    // Fails on a collection created for another model or distance
    let application = Application::build(configuration).await?;

    application.run_until_stopped().await?;

    Ok(())
}
