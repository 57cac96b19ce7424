use docforge_infra::GeneratorConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docforge_observability::init();

    let config = GeneratorConfig::from_env()?;
    let services = docforge_worker::build_services(config).await?;

    docforge_worker::run(services).await
}
