use anyhow::Result;
use clap::Parser;
use log::info;
use netgraph::capture::source::PacketSource;
use netgraph::config::{load_config, load_resolver, CliArgs};
use netgraph::logging::logger;
use netgraph::{Aggregator, Clock, EngineState};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = load_config(&args)?;
    logger::setup_logging(&config.logging)?;

    info!(
        "Starting netgraph in {} mode, averaging over {:?}",
        config.engine.mode, config.engine.averaging_time
    );

    let (source, receiver) = PacketSource::new(args.input.clone());
    let source_h = source.start_capture_loop();

    let clock = if args.replay { Clock::Packets } else { Clock::Wall };
    let resolver = load_resolver(&config.resolver)?;
    let engine = EngineState::with_resolver(config.engine.clone(), resolver);
    let aggregator = Aggregator::new(receiver, engine, config.report.clone(), clock);

    // The engine shares packets through Rc, so it stays on this thread.
    let engine = aggregator.run().await?;
    info!("Shutting down after {} packets", engine.ingested());

    source_h.abort();
    Ok(())
}
