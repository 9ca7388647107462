use clap::Parser;
use clap_derive::Parser;
use anyhow::anyhow;
use arqlink::config::ProtocolKind;
use arqlink::frame::FrameKind;
use arqlink::test_util::loss_model::{LossModel, Lossless, RandomLoss};
use arqlink::test_util::simulation::{Side, Simulation, SimulationSetup};
use num_enum::TryFromPrimitive;
use tracing::{info, Level};

/// Runs two terminals against each other over a simulated lossy channel
#[derive(Parser)]
struct Args {
    /// 1 Utopian, 2 Simplex (sender on A), 3 Simplex (receiver on A), 4 Stop&Wait, 5 Go-Back-N,
    ///  6 Selective Repeat
    #[clap(long, default_value_t = 5)]
    protocol: u8,

    #[clap(long, default_value_t = 20)]
    packets_a: u32,

    #[clap(long, default_value_t = 0)]
    packets_b: u32,

    #[clap(long, default_value_t = 4)]
    send_window: u32,

    #[clap(long, default_value_t = 7)]
    max_sequence: u32,

    #[clap(long, default_value_t = 300)]
    timeout: u64,

    #[clap(long, default_value_t = 0.0)]
    drop_rate: f64,

    #[clap(long, default_value_t = 0.0)]
    corrupt_rate: f64,

    #[clap(long, default_value_t = 1)]
    seed: u64,

    #[clap(short, long, default_value_t = false)]
    verbose: bool,

    #[clap(long, default_value_t = false)]
    very_verbose: bool,
}

pub fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match (args.verbose, args.very_verbose) {
        (_, true) => Level::TRACE,
        (true, _) => Level::DEBUG,
        (false, false) => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init()
        .ok();

    let protocol = ProtocolKind::try_from_primitive(args.protocol)
        .map_err(|_| anyhow!("unknown protocol number {}", args.protocol))?;

    let mut setup = SimulationSetup::new(protocol, args.packets_a, args.packets_b);
    setup.config.send_window = args.send_window;
    setup.config.max_sequence = args.max_sequence;
    setup.config.timeout = args.timeout;

    let loss: Box<dyn LossModel> = if args.drop_rate > 0.0 || args.corrupt_rate > 0.0 {
        Box::new(RandomLoss::new(args.seed, args.drop_rate, args.corrupt_rate)?)
    }
    else {
        Box::new(Lossless)
    };

    let report = Simulation::new(setup, loss)?.run();

    info!("simulation {} at time {}", if report.finished { "finished" } else { "stopped" }, report.end_time);
    for side in Side::BOTH {
        let terminal = report.terminal(side);
        info!("terminal {}: sent {} payloads, delivered {} ({} out of order, {} invalid)",
            side, terminal.payloads_sent, terminal.delivered.len(), terminal.out_of_order, terminal.invalid);
        info!("terminal {}: {} data / {} ack / {} nak frames, {} transmissions, {} data timeouts, {} ack timeouts, {} malformed frames received",
            side,
            terminal.count_emitted(FrameKind::Data),
            terminal.count_emitted(FrameKind::Ack),
            terminal.count_emitted(FrameKind::Nak),
            terminal.transmissions_completed,
            terminal.data_timeouts,
            terminal.ack_timeouts,
            terminal.malformed_received,
        );
    }
    for violation in &report.violations {
        info!("violation: {}", violation);
    }

    Ok(())
}
