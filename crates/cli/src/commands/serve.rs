//! `switchboard serve`: start the WebSocket gateway.

pub async fn run(
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(host) = host_override {
        config.gateway.host = host;
    }
    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    config.validate()?;

    let engine = super::build_engine(&config)?;

    println!("Switchboard Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model);
    println!("   Entry:     {}", engine.entry());

    switchboard_gateway::start(config, engine).await?;

    Ok(())
}
