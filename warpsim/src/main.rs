mod routing;
mod sim;
mod topology;

use std::io::{stdin, BufRead};
use std::process::exit;

use log::{error, info, set_boxed_logger, set_max_level, LevelFilter};
use simplelog::*;

use crate::sim::Simulation;

fn main() -> anyhow::Result<()> {
    set_max_level(LevelFilter::Info);
    set_boxed_logger(TermLogger::new(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ))
    .expect("Failed to init logger");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut simulation = match args.as_slice() {
        [] => Simulation::new(),
        [path] => match topology::load(path) {
            Ok(loaded) => loaded,
            Err(err) => {
                error!("{err:#}");
                exit(1);
            }
        },
        _ => {
            error!("usage: warpsim [topology.json]");
            exit(1);
        }
    };

    info!("WARP mesh simulator");
    info!("Type \"help\" for help");

    let mut quit_on_transmit = false;

    for line in stdin().lock().lines() {
        let input = line?;
        let split: Vec<&str> = input.split_whitespace().collect();
        if split.is_empty() {
            continue;
        }
        match split[0] {
            "help" => {
                info!(
                    r#"Help:
                - help -- shows this page
                - exit -- leaves the simulator
                [topology]
                - load <file> -- replaces the network with a topology file
                - view [node] -- summarizes every node, or one in detail
                - toggle <node> -- administratively flips a node up/down
                [traffic]
                - send <src> <dst> <bytes> [--quit-on-transmit] -- originates a transfer
                - topk <node> <k> -- sets how many paths a node keeps per destination
                - run <seconds> -- advances the simulation clock
                "#
                );
            }
            "exit" | "quit" => {
                break;
            }
            "load" => {
                if split.len() != 2 {
                    error!("Expected one argument");
                    continue;
                }
                match topology::load(split[1]) {
                    Ok(loaded) => {
                        simulation = loaded;
                        info!("Loaded {}", split[1]);
                    }
                    Err(err) => error!("{err:#}"),
                }
            }
            "send" => {
                if split.len() < 4 || split.len() > 5 {
                    error!("Expected: send <src> <dst> <bytes> [--quit-on-transmit]");
                    continue;
                }
                let Ok(size) = split[3].parse::<u64>() else {
                    error!("Failed to parse byte count {}", split[3]);
                    continue;
                };
                if split.len() == 5 && split[4] != "--quit-on-transmit" {
                    error!("Unknown flag {}", split[4]);
                    continue;
                }
                if simulation.send(split[1], split[2], size) && split.len() == 5 {
                    quit_on_transmit = true;
                }
            }
            "topk" => {
                if split.len() != 3 {
                    error!("Expected: topk <node> <k>");
                    continue;
                }
                match split[2].parse::<usize>() {
                    Ok(top_k) if top_k > 0 => simulation.set_top_k(split[1], top_k),
                    _ => error!("Failed to parse path count {}", split[2]),
                }
            }
            "toggle" => {
                if split.len() != 2 {
                    error!("Expected one argument");
                    continue;
                }
                if simulation.toggle(split[1]).is_none() {
                    error!("No node {} found", split[1]);
                }
            }
            "view" => {
                simulation.view(split.get(1).copied());
            }
            "run" => {
                if split.len() != 2 {
                    error!("Expected one argument");
                    continue;
                }
                let Ok(seconds) = split[1].parse::<f64>() else {
                    error!("Failed to parse seconds {}", split[1]);
                    continue;
                };
                let delivered = simulation.run(seconds);
                info!(
                    "Advanced to t={:.2}s, {delivered} transfers completed",
                    simulation.time
                );
                if quit_on_transmit && delivered > 0 {
                    break;
                }
            }
            &_ => {
                error!("Unknown command, please try again or type \"help\" for help.")
            }
        }
    }

    Ok(())
}
