use clap::Parser;

use stun_probe::config::Cli;
use stun_probe::startup;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    simple_logger::init_with_level(cli.log_level.as_level())?;

    let report = startup(&cli)?;

    println!("NAT type: {:?}", report.nat_type);
    println!();
    println!("trace:");
    for event in &report.trace {
        println!("  {:<14} target={:<22} {}", event.test, event.target, event.outcome);
    }

    Ok(())
}
